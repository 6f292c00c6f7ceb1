//! Namespaces, display helpers and the OWL / SHACL terms the validator reads.

use oxigraph::model::NamedNodeRef;

pub const SYS_NS: &str = "http://nkllon.com/sys#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const SH_NS: &str = "http://www.w3.org/ns/shacl#";

/// Prefixes used when compacting IRIs in human-readable output.
pub const DISPLAY_PREFIXES: &[(&str, &str)] = &[
    ("", SYS_NS),
    ("sh", SH_NS),
    ("owl", OWL_NS),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

pub mod owl {
    use super::NamedNodeRef;

    pub const CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Class");
}

pub mod sh {
    use super::NamedNodeRef;

    macro_rules! sh_terms {
        ($($name:ident => $local:literal),* $(,)?) => {
            $(
                pub const $name: NamedNodeRef<'static> =
                    NamedNodeRef::new_unchecked(concat!("http://www.w3.org/ns/shacl#", $local));
            )*
        };
    }

    sh_terms! {
        NODE_SHAPE => "NodeShape",
        PROPERTY_SHAPE => "PropertyShape",
        PROPERTY => "property",
        PATH => "path",
        INVERSE_PATH => "inversePath",
        ALTERNATIVE_PATH => "alternativePath",
        ZERO_OR_MORE_PATH => "zeroOrMorePath",
        ONE_OR_MORE_PATH => "oneOrMorePath",
        ZERO_OR_ONE_PATH => "zeroOrOnePath",
        TARGET_CLASS => "targetClass",
        TARGET_NODE => "targetNode",
        TARGET_SUBJECTS_OF => "targetSubjectsOf",
        TARGET_OBJECTS_OF => "targetObjectsOf",
        SEVERITY => "severity",
        MESSAGE => "message",
        DEACTIVATED => "deactivated",
        INFO => "Info",
        WARNING => "Warning",
        VIOLATION => "Violation",
        CLASS => "class",
        DATATYPE => "datatype",
        NODE_KIND => "nodeKind",
        MIN_COUNT => "minCount",
        MAX_COUNT => "maxCount",
        MIN_LENGTH => "minLength",
        MAX_LENGTH => "maxLength",
        PATTERN => "pattern",
        FLAGS => "flags",
        MIN_INCLUSIVE => "minInclusive",
        MAX_INCLUSIVE => "maxInclusive",
        MIN_EXCLUSIVE => "minExclusive",
        MAX_EXCLUSIVE => "maxExclusive",
        IN => "in",
        HAS_VALUE => "hasValue",
        NODE => "node",
        NOT => "not",
        SPARQL => "sparql",
        SELECT => "select",
        PREFIXES => "prefixes",
        DECLARE => "declare",
        PREFIX => "prefix",
        NAMESPACE => "namespace",
        IRI => "IRI",
        BLANK_NODE => "BlankNode",
        LITERAL => "Literal",
        BLANK_NODE_OR_IRI => "BlankNodeOrIRI",
        BLANK_NODE_OR_LITERAL => "BlankNodeOrLiteral",
        IRI_OR_LITERAL => "IRIOrLiteral",
    }
}

/// Compact an IRI with [`DISPLAY_PREFIXES`], or wrap it in angle brackets.
pub fn compact_iri(iri: &str) -> String {
    for (prefix, namespace) in DISPLAY_PREFIXES {
        if let Some(local) = iri.strip_prefix(namespace)
            && !local.is_empty()
            && !local.contains(['/', '#'])
        {
            return format!("{prefix}:{local}");
        }
    }
    format!("<{iri}>")
}

/// Display form of an IRI: the text after the last `#`, otherwise after the
/// last `/`.
pub fn local_name(iri: &str) -> &str {
    match iri.rsplit_once('#') {
        Some((_, local)) => local,
        None => iri.rsplit('/').next().unwrap_or(iri),
    }
}
