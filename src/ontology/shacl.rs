//! SHACL (Shapes Constraint Language) Validation
//!
//! Validates a data graph against the shapes of a shapes graph. The supported
//! subset is SHACL Core minus `sh:closed`, the logical `sh:and` / `sh:or` /
//! `sh:xone` and qualified value shapes, plus SPARQL-based constraints
//! (`sh:sparql`).
//!
//! # Components
//!
//! - **ShapeValidator**: parses the shapes graph once and validates data graphs
//! - **Shape / Constraint / PropertyPath**: parsed form of the shapes graph
//! - **ValidationReport**: structured results and the textual report
//!
//! # Example
//!
//! ```rust,ignore
//! use nkllon::ontology::{ShapeValidator, load_graph};
//!
//! let validator = ShapeValidator::from_file("ontology/system_constraints.shacl.ttl")?;
//! let data = load_graph("data/physical_deployment.ttl".as_ref())?;
//! let report = validator.validate(&data)?;
//!
//! if !report.conforms() {
//!     println!("{}", report.to_text());
//! }
//! ```
//!
//! The data graph is expected to be closed under RDFS already (see
//! [`super::inference`]); `sh:class` and `sh:targetClass` still follow
//! `rdfs:subClassOf` chains so un-materialized graphs are handled as well.

use super::graph::{TopologyGraph, as_subject, load_graph};
use super::inference::subclasses;
use super::vocab::{compact_iri, owl, sh};
use crate::error::{Result, TopologyError};
use indexmap::{IndexMap, IndexSet};
use oxigraph::model::vocab::{rdf, rdfs, xsd};
use oxigraph::model::{Literal, NamedNode, NamedOrBlankNode, Term};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

const MAX_SHAPE_DEPTH: usize = 32;
const MAX_LIST_LENGTH: usize = 10_000;

// =============================================================================
// Severity Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Violation,
}

impl Severity {
    pub fn from_iri(iri: &NamedNode) -> Self {
        match iri.as_ref() {
            i if i == sh::INFO => Severity::Info,
            i if i == sh::WARNING => Severity::Warning,
            _ => Severity::Violation,
        }
    }

    pub fn to_iri(&self) -> NamedNode {
        match self {
            Severity::Info => sh::INFO.into_owned(),
            Severity::Warning => sh::WARNING.into_owned(),
            Severity::Violation => sh::VIOLATION.into_owned(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Warning => write!(f, "Warning"),
            Severity::Violation => write!(f, "Violation"),
        }
    }
}

// =============================================================================
// Validation Result
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The node that caused the violation
    focus_node: String,
    /// The property path (if applicable)
    result_path: Option<String>,
    /// The value that violated the constraint
    value: Option<String>,
    /// Human-readable message
    message: String,
    /// Severity level
    severity: Severity,
    /// The source shape that was violated
    source_shape: String,
    /// The constraint component IRI
    source_constraint_component: String,
}

impl ValidationResult {
    pub fn new(
        focus_node: String,
        message: String,
        severity: Severity,
        source_shape: String,
        component: &str,
    ) -> Self {
        Self {
            focus_node,
            result_path: None,
            value: None,
            message,
            severity,
            source_shape,
            source_constraint_component: format!("{}{}", super::vocab::SH_NS, component),
        }
    }

    pub fn with_path(mut self, path: Option<String>) -> Self {
        self.result_path = path;
        self
    }

    pub fn with_value(mut self, value: String) -> Self {
        self.value = Some(value);
        self
    }

    pub fn focus_node(&self) -> &str {
        &self.focus_node
    }

    pub fn result_path(&self) -> Option<&str> {
        self.result_path.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn source_shape(&self) -> &str {
        &self.source_shape
    }

    pub fn source_constraint_component(&self) -> &str {
        &self.source_constraint_component
    }
}

// =============================================================================
// Validation Report
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub violations: usize,
    pub warnings: usize,
    pub infos: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    results: Vec<ValidationResult>,
    conforms: bool,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            conforms: true,
        }
    }

    pub fn add_result(&mut self, result: ValidationResult) {
        if result.severity == Severity::Violation {
            self.conforms = false;
        }
        self.results.push(result);
    }

    pub fn conforms(&self) -> bool {
        self.conforms
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn violations(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Violation)
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for result in &self.results {
            match result.severity {
                Severity::Violation => summary.violations += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
        }
        summary
    }

    /// Render the conventional plain-text SHACL report.
    pub fn to_text(&self) -> String {
        let mut out = String::from("Validation Report\n");
        out.push_str(&format!(
            "Conforms: {}\n",
            if self.conforms { "True" } else { "False" }
        ));
        if self.results.is_empty() {
            return out;
        }
        out.push_str(&format!("Results ({}):\n", self.results.len()));
        for result in &self.results {
            let component = &result.source_constraint_component;
            let local = component.rsplit('#').next().unwrap_or(component);
            out.push_str(&format!(
                "Constraint {} in {} ({}):\n",
                result.severity, local, component
            ));
            out.push_str(&format!(
                "\tSeverity: {}\n",
                compact_iri(result.severity.to_iri().as_str())
            ));
            out.push_str(&format!(
                "\tSource Shape: {}\n",
                display_node(&result.source_shape)
            ));
            out.push_str(&format!(
                "\tFocus Node: {}\n",
                display_node(&result.focus_node)
            ));
            if let Some(value) = &result.value {
                out.push_str(&format!("\tValue Node: {}\n", display_node(value)));
            }
            if let Some(path) = &result.result_path {
                out.push_str(&format!("\tResult Path: {}\n", display_node(path)));
            }
            out.push_str(&format!("\tMessage: {}\n", result.message));
        }
        out
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Canonical string for a term in results: bare IRI, `_:id`, or the
/// N-Triples form of a literal.
fn term_key(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        other => other.to_string(),
    }
}

fn display_node(key: &str) -> String {
    if key.starts_with('"') || key.starts_with("_:") || key.contains(' ') {
        key.to_string()
    } else {
        compact_iri(key)
    }
}

fn display_term(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => compact_iri(node.as_str()),
        Term::Literal(literal) => literal.value().to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// Property Paths
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyPath {
    Predicate(NamedNode),
    Inverse(Box<PropertyPath>),
    Sequence(Vec<PropertyPath>),
    Alternative(Vec<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    OneOrMore(Box<PropertyPath>),
    ZeroOrOne(Box<PropertyPath>),
}

impl PropertyPath {
    /// Value nodes reached from `focus`.
    pub fn evaluate(&self, graph: &TopologyGraph, focus: &Term) -> Result<Vec<Term>> {
        let mut out = IndexSet::new();
        self.collect(graph, focus, &mut out)?;
        Ok(out.into_iter().collect())
    }

    fn collect(&self, graph: &TopologyGraph, focus: &Term, out: &mut IndexSet<Term>) -> Result<()> {
        match self {
            PropertyPath::Predicate(predicate) => {
                if let Some(subject) = as_subject(focus) {
                    out.extend(graph.objects(subject, predicate.as_ref())?);
                }
            }
            PropertyPath::Inverse(inner) => match inner.as_ref() {
                PropertyPath::Predicate(predicate) => {
                    out.extend(
                        graph
                            .subjects(predicate.as_ref(), focus.as_ref())?
                            .into_iter()
                            .map(Term::from),
                    );
                }
                other => other.inverted().collect(graph, focus, out)?,
            },
            PropertyPath::Sequence(steps) => {
                let mut current = IndexSet::from([focus.clone()]);
                for step in steps {
                    let mut next = IndexSet::new();
                    for node in &current {
                        step.collect(graph, node, &mut next)?;
                    }
                    current = next;
                }
                out.extend(current);
            }
            PropertyPath::Alternative(options) => {
                for option in options {
                    option.collect(graph, focus, out)?;
                }
            }
            PropertyPath::ZeroOrMore(inner) => {
                out.insert(focus.clone());
                out.extend(inner.reachable(graph, focus)?);
            }
            PropertyPath::OneOrMore(inner) => {
                out.extend(inner.reachable(graph, focus)?);
            }
            PropertyPath::ZeroOrOne(inner) => {
                out.insert(focus.clone());
                inner.collect(graph, focus, out)?;
            }
        }
        Ok(())
    }

    /// Nodes reachable in one or more steps.
    fn reachable(&self, graph: &TopologyGraph, start: &Term) -> Result<IndexSet<Term>> {
        let mut seen = IndexSet::new();
        let mut frontier = vec![start.clone()];
        while let Some(node) = frontier.pop() {
            let mut step = IndexSet::new();
            self.collect(graph, &node, &mut step)?;
            for next in step {
                if seen.insert(next.clone()) {
                    frontier.push(next);
                }
            }
        }
        Ok(seen)
    }

    fn inverted(&self) -> PropertyPath {
        match self {
            PropertyPath::Predicate(_) => PropertyPath::Inverse(Box::new(self.clone())),
            PropertyPath::Inverse(inner) => inner.as_ref().clone(),
            PropertyPath::Sequence(steps) => {
                PropertyPath::Sequence(steps.iter().rev().map(PropertyPath::inverted).collect())
            }
            PropertyPath::Alternative(options) => {
                PropertyPath::Alternative(options.iter().map(PropertyPath::inverted).collect())
            }
            PropertyPath::ZeroOrMore(inner) => PropertyPath::ZeroOrMore(Box::new(inner.inverted())),
            PropertyPath::OneOrMore(inner) => PropertyPath::OneOrMore(Box::new(inner.inverted())),
            PropertyPath::ZeroOrOne(inner) => PropertyPath::ZeroOrOne(Box::new(inner.inverted())),
        }
    }

    /// SPARQL property path syntax, used for `$PATH` in SPARQL constraints.
    pub fn to_sparql(&self) -> String {
        match self {
            PropertyPath::Predicate(p) => format!("<{}>", p.as_str()),
            PropertyPath::Inverse(inner) => format!("^({})", inner.to_sparql()),
            PropertyPath::Sequence(steps) => steps
                .iter()
                .map(|s| format!("({})", s.to_sparql()))
                .collect::<Vec<_>>()
                .join("/"),
            PropertyPath::Alternative(options) => options
                .iter()
                .map(|s| format!("({})", s.to_sparql()))
                .collect::<Vec<_>>()
                .join("|"),
            PropertyPath::ZeroOrMore(inner) => format!("({})*", inner.to_sparql()),
            PropertyPath::OneOrMore(inner) => format!("({})+", inner.to_sparql()),
            PropertyPath::ZeroOrOne(inner) => format!("({})?", inner.to_sparql()),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::Predicate(p) => write!(f, "{}", p.as_str()),
            PropertyPath::Inverse(inner) => write!(f, "^{inner}"),
            PropertyPath::Sequence(steps) => {
                let parts: Vec<String> = steps.iter().map(|s| s.to_string()).collect();
                write!(f, "({})", parts.join(" / "))
            }
            PropertyPath::Alternative(options) => {
                let parts: Vec<String> = options.iter().map(|s| s.to_string()).collect();
                write!(f, "({})", parts.join(" | "))
            }
            PropertyPath::ZeroOrMore(inner) => write!(f, "{inner}*"),
            PropertyPath::OneOrMore(inner) => write!(f, "{inner}+"),
            PropertyPath::ZeroOrOne(inner) => write!(f, "{inner}?"),
        }
    }
}

// =============================================================================
// Shapes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    fn from_iri(iri: &NamedNode) -> Option<Self> {
        let iri = iri.as_ref();
        Some(match iri {
            i if i == sh::IRI => NodeKind::Iri,
            i if i == sh::BLANK_NODE => NodeKind::BlankNode,
            i if i == sh::LITERAL => NodeKind::Literal,
            i if i == sh::BLANK_NODE_OR_IRI => NodeKind::BlankNodeOrIri,
            i if i == sh::BLANK_NODE_OR_LITERAL => NodeKind::BlankNodeOrLiteral,
            i if i == sh::IRI_OR_LITERAL => NodeKind::IriOrLiteral,
            _ => return None,
        })
    }

    fn matches(&self, term: &Term) -> bool {
        let (iri, blank, literal) = match term {
            Term::NamedNode(_) => (true, false, false),
            Term::BlankNode(_) => (false, true, false),
            Term::Literal(_) => (false, false, true),
            #[allow(unreachable_patterns)]
            _ => (false, false, false),
        };
        match self {
            NodeKind::Iri => iri,
            NodeKind::BlankNode => blank,
            NodeKind::Literal => literal,
            NodeKind::BlankNodeOrIri => blank || iri,
            NodeKind::BlankNodeOrLiteral => blank || literal,
            NodeKind::IriOrLiteral => iri || literal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SparqlConstraint {
    select: String,
    prefixes: String,
    message: Option<String>,
}

#[derive(Debug, Clone)]
enum Constraint {
    Class(NamedNode),
    Datatype(NamedNode),
    NodeKind(NodeKind),
    MinCount(usize),
    MaxCount(usize),
    MinLength(usize),
    MaxLength(usize),
    Pattern { regex: Regex, source: String },
    MinInclusive(Literal),
    MaxInclusive(Literal),
    MinExclusive(Literal),
    MaxExclusive(Literal),
    In(Vec<Term>),
    HasValue(Term),
    Node(Term),
    Not(Term),
    Property(Term),
    Sparql(SparqlConstraint),
}

#[derive(Debug, Clone)]
enum Target {
    Class(NamedNode),
    Node(Term),
    SubjectsOf(NamedNode),
    ObjectsOf(NamedNode),
}

#[derive(Debug, Clone)]
struct Shape {
    id: Term,
    path: Option<PropertyPath>,
    targets: Vec<Target>,
    constraints: Vec<Constraint>,
    severity: Severity,
    message: Option<String>,
    deactivated: bool,
}

// =============================================================================
// Shape Parsing
// =============================================================================

struct ShapeParser<'a> {
    shapes: &'a TopologyGraph,
}

impl<'a> ShapeParser<'a> {
    fn parse_all(&self) -> Result<IndexMap<Term, Shape>> {
        let mut ids: IndexSet<Term> = IndexSet::new();

        for class in [sh::NODE_SHAPE, sh::PROPERTY_SHAPE] {
            for subject in self.shapes.subjects(rdf::TYPE, class.into())? {
                ids.insert(subject.into());
            }
        }
        for predicate in [
            sh::TARGET_CLASS,
            sh::TARGET_NODE,
            sh::TARGET_SUBJECTS_OF,
            sh::TARGET_OBJECTS_OF,
        ] {
            for triple in self.shapes.triples_with_predicate(predicate)? {
                ids.insert(triple.subject.into());
            }
        }

        let mut pending: Vec<Term> = ids.iter().cloned().collect();
        while let Some(id) = pending.pop() {
            for predicate in [sh::PROPERTY, sh::NODE, sh::NOT] {
                let Some(subject) = as_subject(&id) else {
                    continue;
                };
                for referenced in self.shapes.objects(subject, predicate)? {
                    if ids.insert(referenced.clone()) {
                        pending.push(referenced);
                    }
                }
            }
        }

        let mut ordered: Vec<Term> = ids.into_iter().collect();
        ordered.sort_by_key(term_key);

        let mut shapes = IndexMap::new();
        for id in ordered {
            let shape = self.parse_shape(&id)?;
            shapes.insert(id, shape);
        }
        Ok(shapes)
    }

    fn parse_shape(&self, id: &Term) -> Result<Shape> {
        let subject = as_subject(id).ok_or_else(|| {
            TopologyError::validation(format!("shape {} is not an IRI or blank node", id))
        })?;
        let get = |p| self.shapes.objects(subject, p);

        let path = match self.shapes.object(subject, sh::PATH)? {
            Some(term) => Some(self.parse_path(&term, 0)?),
            None => None,
        };

        let mut targets = Vec::new();
        for class in get(sh::TARGET_CLASS)? {
            targets.push(Target::Class(expect_iri(&class, "sh:targetClass")?));
        }
        for node in get(sh::TARGET_NODE)? {
            targets.push(Target::Node(node));
        }
        for predicate in get(sh::TARGET_SUBJECTS_OF)? {
            targets.push(Target::SubjectsOf(expect_iri(&predicate, "sh:targetSubjectsOf")?));
        }
        for predicate in get(sh::TARGET_OBJECTS_OF)? {
            targets.push(Target::ObjectsOf(expect_iri(&predicate, "sh:targetObjectsOf")?));
        }
        // Implicit class target: a shape that is also an rdfs:Class or owl:Class.
        let types = get(rdf::TYPE)?;
        if let Term::NamedNode(node) = id
            && [rdfs::CLASS, owl::CLASS]
                .iter()
                .any(|class| types.contains(&Term::from(class.into_owned())))
        {
            targets.push(Target::Class(node.clone()));
        }

        let severity = match self.shapes.object(subject, sh::SEVERITY)? {
            Some(Term::NamedNode(iri)) => Severity::from_iri(&iri),
            _ => Severity::Violation,
        };
        let message = self
            .shapes
            .object(subject, sh::MESSAGE)?
            .and_then(|t| literal_string(&t));
        let deactivated = self
            .shapes
            .object(subject, sh::DEACTIVATED)?
            .is_some_and(|t| literal_string(&t).as_deref() == Some("true"));

        let mut constraints = Vec::new();
        for class in get(sh::CLASS)? {
            constraints.push(Constraint::Class(expect_iri(&class, "sh:class")?));
        }
        for datatype in get(sh::DATATYPE)? {
            constraints.push(Constraint::Datatype(expect_iri(&datatype, "sh:datatype")?));
        }
        for kind in get(sh::NODE_KIND)? {
            let iri = expect_iri(&kind, "sh:nodeKind")?;
            let kind = NodeKind::from_iri(&iri).ok_or_else(|| {
                TopologyError::validation(format!("unknown sh:nodeKind {}", iri))
            })?;
            constraints.push(Constraint::NodeKind(kind));
        }
        for count in get(sh::MIN_COUNT)? {
            constraints.push(Constraint::MinCount(expect_count(&count, "sh:minCount")?));
        }
        for count in get(sh::MAX_COUNT)? {
            constraints.push(Constraint::MaxCount(expect_count(&count, "sh:maxCount")?));
        }
        for length in get(sh::MIN_LENGTH)? {
            constraints.push(Constraint::MinLength(expect_count(&length, "sh:minLength")?));
        }
        for length in get(sh::MAX_LENGTH)? {
            constraints.push(Constraint::MaxLength(expect_count(&length, "sh:maxLength")?));
        }
        let flags = self
            .shapes
            .object(subject, sh::FLAGS)?
            .and_then(|t| literal_string(&t))
            .unwrap_or_default();
        for pattern in get(sh::PATTERN)? {
            let source = literal_string(&pattern).ok_or_else(|| {
                TopologyError::validation(format!("sh:pattern on {} must be a literal", id))
            })?;
            constraints.push(Constraint::Pattern {
                regex: compile_pattern(&source, &flags)?,
                source,
            });
        }
        for (predicate, build) in [
            (sh::MIN_INCLUSIVE, Constraint::MinInclusive as fn(Literal) -> Constraint),
            (sh::MAX_INCLUSIVE, Constraint::MaxInclusive),
            (sh::MIN_EXCLUSIVE, Constraint::MinExclusive),
            (sh::MAX_EXCLUSIVE, Constraint::MaxExclusive),
        ] {
            for bound in get(predicate)? {
                match bound {
                    Term::Literal(literal) => constraints.push(build(literal)),
                    other => {
                        return Err(TopologyError::validation(format!(
                            "range bound {} on {} must be a literal",
                            other, id
                        )));
                    }
                }
            }
        }
        for list in get(sh::IN)? {
            constraints.push(Constraint::In(self.parse_list(&list)?));
        }
        for value in get(sh::HAS_VALUE)? {
            constraints.push(Constraint::HasValue(value));
        }
        for node in get(sh::NODE)? {
            constraints.push(Constraint::Node(node));
        }
        for node in get(sh::NOT)? {
            constraints.push(Constraint::Not(node));
        }
        for property in get(sh::PROPERTY)? {
            constraints.push(Constraint::Property(property));
        }
        for sparql in get(sh::SPARQL)? {
            if let Some(constraint) = self.parse_sparql(&sparql, id)? {
                constraints.push(Constraint::Sparql(constraint));
            }
        }

        Ok(Shape {
            id: id.clone(),
            path,
            targets,
            constraints,
            severity,
            message,
            deactivated,
        })
    }

    fn parse_path(&self, term: &Term, depth: usize) -> Result<PropertyPath> {
        if depth > MAX_SHAPE_DEPTH {
            return Err(TopologyError::validation("property path nested too deeply"));
        }
        let node = match term {
            Term::NamedNode(predicate) => return Ok(PropertyPath::Predicate(predicate.clone())),
            Term::BlankNode(node) => NamedOrBlankNode::from(node.clone()),
            other => {
                return Err(TopologyError::validation(format!(
                    "unsupported sh:path {}",
                    other
                )));
            }
        };
        let subject = node.as_ref();

        if self.shapes.object(subject, rdf::FIRST)?.is_some() {
            let steps = self
                .parse_list(term)?
                .iter()
                .map(|step| self.parse_path(step, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            return Ok(PropertyPath::Sequence(steps));
        }
        if let Some(list) = self.shapes.object(subject, sh::ALTERNATIVE_PATH)? {
            let options = self
                .parse_list(&list)?
                .iter()
                .map(|option| self.parse_path(option, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            return Ok(PropertyPath::Alternative(options));
        }

        let unary: [(_, fn(Box<PropertyPath>) -> PropertyPath); 4] = [
            (sh::INVERSE_PATH, PropertyPath::Inverse),
            (sh::ZERO_OR_MORE_PATH, PropertyPath::ZeroOrMore),
            (sh::ONE_OR_MORE_PATH, PropertyPath::OneOrMore),
            (sh::ZERO_OR_ONE_PATH, PropertyPath::ZeroOrOne),
        ];
        for (predicate, build) in unary {
            if let Some(inner) = self.shapes.object(subject, predicate)? {
                return Ok(build(Box::new(self.parse_path(&inner, depth + 1)?)));
            }
        }

        Err(TopologyError::validation(format!(
            "unsupported property path {}",
            term
        )))
    }

    fn parse_list(&self, head: &Term) -> Result<Vec<Term>> {
        let mut values = Vec::new();
        let mut current = head.clone();

        loop {
            if current == Term::from(rdf::NIL.into_owned()) {
                break;
            }
            let Some(subject) = as_subject(&current) else {
                return Err(TopologyError::validation(format!(
                    "malformed RDF list at {}",
                    current
                )));
            };
            match self.shapes.object(subject, rdf::FIRST)? {
                Some(first) => values.push(first),
                None => {
                    return Err(TopologyError::validation(format!(
                        "RDF list node {} has no rdf:first",
                        current
                    )));
                }
            }
            let rest = self.shapes.object(subject, rdf::REST)?.ok_or_else(|| {
                TopologyError::validation(format!("RDF list node {} has no rdf:rest", current))
            })?;
            current = rest;
            if values.len() > MAX_LIST_LENGTH {
                return Err(TopologyError::validation("RDF list is cyclic or too long"));
            }
        }

        Ok(values)
    }

    fn parse_sparql(&self, node: &Term, shape: &Term) -> Result<Option<SparqlConstraint>> {
        let subject = as_subject(node).ok_or_else(|| {
            TopologyError::validation(format!("sh:sparql on {} must be a node", shape))
        })?;

        if self
            .shapes
            .object(subject, sh::DEACTIVATED)?
            .is_some_and(|t| literal_string(&t).as_deref() == Some("true"))
        {
            return Ok(None);
        }

        let select = self
            .shapes
            .object(subject, sh::SELECT)?
            .and_then(|t| literal_string(&t))
            .ok_or_else(|| {
                TopologyError::validation(format!("SPARQL constraint of {} has no sh:select", shape))
            })?;
        let message = self
            .shapes
            .object(subject, sh::MESSAGE)?
            .and_then(|t| literal_string(&t));

        let mut prefixes = String::new();
        for owner in self.shapes.objects(subject, sh::PREFIXES)? {
            let Some(owner) = as_subject(&owner) else {
                continue;
            };
            for declaration in self.shapes.objects(owner, sh::DECLARE)? {
                let Some(declaration) = as_subject(&declaration) else {
                    continue;
                };
                let prefix = self
                    .shapes
                    .object(declaration, sh::PREFIX)?
                    .and_then(|t| literal_string(&t));
                let namespace = self
                    .shapes
                    .object(declaration, sh::NAMESPACE)?
                    .and_then(|t| literal_string(&t));
                if let (Some(prefix), Some(namespace)) = (prefix, namespace) {
                    prefixes.push_str(&format!("PREFIX {prefix}: <{namespace}>\n"));
                }
            }
        }

        Ok(Some(SparqlConstraint {
            select,
            prefixes,
            message,
        }))
    }
}

fn literal_string(term: &Term) -> Option<String> {
    match term {
        Term::Literal(literal) => Some(literal.value().to_string()),
        _ => None,
    }
}

fn expect_iri(term: &Term, what: &str) -> Result<NamedNode> {
    match term {
        Term::NamedNode(node) => Ok(node.clone()),
        other => Err(TopologyError::validation(format!(
            "{what} expects an IRI, found {other}"
        ))),
    }
}

fn expect_count(term: &Term, what: &str) -> Result<usize> {
    literal_string(term)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            TopologyError::validation(format!(
                "{what} expects a non-negative integer, found {term}"
            ))
        })
}

fn compile_pattern(source: &str, flags: &str) -> Result<Regex> {
    let inline: String = flags
        .chars()
        .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
        .collect();
    let pattern = if inline.is_empty() {
        source.to_string()
    } else {
        format!("(?{inline}){source}")
    };
    Regex::new(&pattern)
        .map_err(|e| TopologyError::validation(format!("invalid sh:pattern {source:?}: {e}")))
}

// =============================================================================
// Shape Validator
// =============================================================================

pub struct ShapeValidator {
    shapes: IndexMap<Term, Shape>,
}

impl ShapeValidator {
    /// Parse every shape of a shapes graph.
    pub fn from_graph(shapes_graph: &TopologyGraph) -> Result<Self> {
        let shapes = ShapeParser {
            shapes: shapes_graph,
        }
        .parse_all()?;
        tracing::debug!(shapes = shapes.len(), "parsed shapes graph");
        Ok(Self { shapes })
    }

    /// Create a new validator from a shapes file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_graph(&load_graph(path.as_ref())?)
    }

    /// Create a validator from Turtle-formatted string
    pub fn from_turtle(turtle: &str) -> Result<Self> {
        Self::from_graph(&TopologyGraph::from_turtle(turtle, "<shapes>")?)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Validate a data graph against all targeted shapes. Validation does not
    /// stop at the first failing shape.
    pub fn validate(&self, data: &TopologyGraph) -> Result<ValidationReport> {
        let mut context = ValidationContext {
            data,
            validator: self,
            class_cache: HashMap::new(),
        };
        let mut report = ValidationReport::new();

        for shape in self.shapes.values() {
            if shape.deactivated || shape.targets.is_empty() {
                continue;
            }
            let focus_nodes = context.focus_nodes(shape)?;
            tracing::debug!(
                shape = %shape.id,
                focus_nodes = focus_nodes.len(),
                "validating shape"
            );
            for focus in &focus_nodes {
                let mut results = Vec::new();
                context.validate_shape(shape, focus, &mut results, 0)?;
                for result in results {
                    report.add_result(result);
                }
            }
        }

        Ok(report)
    }

    fn shape(&self, id: &Term) -> Result<&Shape> {
        self.shapes
            .get(id)
            .ok_or_else(|| TopologyError::validation(format!("unknown shape {}", id)))
    }
}

struct ValidationContext<'a> {
    data: &'a TopologyGraph,
    validator: &'a ShapeValidator,
    class_cache: HashMap<NamedNode, HashSet<NamedNode>>,
}

impl<'a> ValidationContext<'a> {
    fn focus_nodes(&mut self, shape: &Shape) -> Result<Vec<Term>> {
        let mut nodes: IndexSet<Term> = IndexSet::new();
        for target in &shape.targets {
            match target {
                Target::Class(class) => {
                    for class in self.subclasses(class)? {
                        nodes.extend(
                            self.data
                                .subjects(rdf::TYPE, class.as_ref().into())?
                                .into_iter()
                                .map(Term::from),
                        );
                    }
                }
                Target::Node(node) => {
                    nodes.insert(node.clone());
                }
                Target::SubjectsOf(predicate) => {
                    nodes.extend(
                        self.data
                            .triples_with_predicate(predicate.as_ref())?
                            .into_iter()
                            .map(|t| Term::from(t.subject)),
                    );
                }
                Target::ObjectsOf(predicate) => {
                    nodes.extend(
                        self.data
                            .triples_with_predicate(predicate.as_ref())?
                            .into_iter()
                            .map(|t| t.object),
                    );
                }
            }
        }
        let mut nodes: Vec<Term> = nodes.into_iter().collect();
        nodes.sort_by_key(term_key);
        Ok(nodes)
    }

    fn subclasses(&mut self, class: &NamedNode) -> Result<HashSet<NamedNode>> {
        if let Some(cached) = self.class_cache.get(class) {
            return Ok(cached.clone());
        }
        let closure = subclasses(self.data, class)?;
        self.class_cache.insert(class.clone(), closure.clone());
        Ok(closure)
    }

    fn is_instance(&mut self, value: &Term, class: &NamedNode) -> Result<bool> {
        let Some(subject) = as_subject(value) else {
            return Ok(false);
        };
        let types = self.data.objects(subject, rdf::TYPE)?;
        if types.is_empty() {
            return Ok(false);
        }
        let accepted = self.subclasses(class)?;
        Ok(types.iter().any(|t| match t {
            Term::NamedNode(n) => accepted.contains(n),
            _ => false,
        }))
    }

    fn conforms(&mut self, shape_id: &Term, value: &Term, depth: usize) -> Result<bool> {
        let validator = self.validator;
        let shape = validator.shape(shape_id)?;
        let mut results = Vec::new();
        self.validate_shape(shape, value, &mut results, depth + 1)?;
        Ok(results.is_empty())
    }

    fn validate_shape(
        &mut self,
        shape: &Shape,
        focus: &Term,
        out: &mut Vec<ValidationResult>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_SHAPE_DEPTH {
            return Err(TopologyError::validation(format!(
                "shape {} recurses deeper than {} levels",
                shape.id, MAX_SHAPE_DEPTH
            )));
        }
        if shape.deactivated {
            return Ok(());
        }

        let values = match &shape.path {
            Some(path) => path.evaluate(self.data, focus)?,
            None => vec![focus.clone()],
        };

        for constraint in &shape.constraints {
            self.check(shape, constraint, focus, &values, out, depth)?;
        }
        Ok(())
    }

    fn check(
        &mut self,
        shape: &Shape,
        constraint: &Constraint,
        focus: &Term,
        values: &[Term],
        out: &mut Vec<ValidationResult>,
        depth: usize,
    ) -> Result<()> {
        let path_key = shape.path.as_ref().map(|p| p.to_string());
        let focus_text = display_term(focus);
        let emit = |out: &mut Vec<ValidationResult>,
                    component: &str,
                    value: Option<&Term>,
                    default_message: String| {
            let message = shape
                .message
                .as_ref()
                .map(|template| {
                    template
                        .replace("{$this}", &focus_text)
                        .replace("{?this}", &focus_text)
                        .replace("{$value}", &value.map(display_term).unwrap_or_default())
                        .replace("{?value}", &value.map(display_term).unwrap_or_default())
                })
                .unwrap_or(default_message);
            let mut result = ValidationResult::new(
                term_key(focus),
                message,
                shape.severity,
                term_key(&shape.id),
                component,
            )
            .with_path(path_key.clone());
            if let Some(value) = value {
                result = result.with_value(term_key(value));
            }
            out.push(result);
        };
        let path_text = shape
            .path
            .as_ref()
            .map(|p| match p {
                PropertyPath::Predicate(n) => compact_iri(n.as_str()),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "value".to_string());

        match constraint {
            Constraint::MinCount(min) => {
                if values.len() < *min {
                    emit(
                        out,
                        "MinCountConstraintComponent",
                        None,
                        format!("Less than {min} values on {focus_text}->{path_text}"),
                    );
                }
            }
            Constraint::MaxCount(max) => {
                if values.len() > *max {
                    emit(
                        out,
                        "MaxCountConstraintComponent",
                        None,
                        format!("More than {max} values on {focus_text}->{path_text}"),
                    );
                }
            }
            Constraint::Class(class) => {
                for value in values {
                    if !self.is_instance(value, class)? {
                        emit(
                            out,
                            "ClassConstraintComponent",
                            Some(value),
                            format!(
                                "Value {} does not have class {}",
                                display_term(value),
                                compact_iri(class.as_str())
                            ),
                        );
                    }
                }
            }
            Constraint::Datatype(datatype) => {
                for value in values {
                    let ok = matches!(value, Term::Literal(l) if l.datatype() == datatype.as_ref());
                    if !ok {
                        emit(
                            out,
                            "DatatypeConstraintComponent",
                            Some(value),
                            format!(
                                "Value {} is not a literal of datatype {}",
                                display_term(value),
                                compact_iri(datatype.as_str())
                            ),
                        );
                    }
                }
            }
            Constraint::NodeKind(kind) => {
                for value in values {
                    if !kind.matches(value) {
                        emit(
                            out,
                            "NodeKindConstraintComponent",
                            Some(value),
                            format!("Value {} is not of node kind {:?}", display_term(value), kind),
                        );
                    }
                }
            }
            Constraint::MinLength(min) => {
                for value in values {
                    let ok = string_form(value).is_some_and(|s| s.chars().count() >= *min);
                    if !ok {
                        emit(
                            out,
                            "MinLengthConstraintComponent",
                            Some(value),
                            format!("String length of {} is less than {min}", display_term(value)),
                        );
                    }
                }
            }
            Constraint::MaxLength(max) => {
                for value in values {
                    let ok = string_form(value).is_some_and(|s| s.chars().count() <= *max);
                    if !ok {
                        emit(
                            out,
                            "MaxLengthConstraintComponent",
                            Some(value),
                            format!("String length of {} is more than {max}", display_term(value)),
                        );
                    }
                }
            }
            Constraint::Pattern { regex, source } => {
                for value in values {
                    let ok = string_form(value).is_some_and(|s| regex.is_match(s));
                    if !ok {
                        emit(
                            out,
                            "PatternConstraintComponent",
                            Some(value),
                            format!(
                                "Value {} does not match pattern \"{source}\"",
                                display_term(value)
                            ),
                        );
                    }
                }
            }
            Constraint::MinInclusive(bound)
            | Constraint::MaxInclusive(bound)
            | Constraint::MinExclusive(bound)
            | Constraint::MaxExclusive(bound) => {
                let (component, symbol) = match constraint {
                    Constraint::MinInclusive(_) => ("MinInclusiveConstraintComponent", ">="),
                    Constraint::MaxInclusive(_) => ("MaxInclusiveConstraintComponent", "<="),
                    Constraint::MinExclusive(_) => ("MinExclusiveConstraintComponent", ">"),
                    _ => ("MaxExclusiveConstraintComponent", "<"),
                };
                let accepts: fn(Ordering) -> bool = match constraint {
                    Constraint::MinInclusive(_) => Ordering::is_ge,
                    Constraint::MaxInclusive(_) => Ordering::is_le,
                    Constraint::MinExclusive(_) => Ordering::is_gt,
                    _ => Ordering::is_lt,
                };
                for value in values {
                    let ok = compare_literals(value, bound).is_some_and(accepts);
                    if !ok {
                        emit(
                            out,
                            component,
                            Some(value),
                            format!(
                                "Value {} is not {symbol} {}",
                                display_term(value),
                                bound.value()
                            ),
                        );
                    }
                }
            }
            Constraint::In(allowed) => {
                for value in values {
                    if !allowed.contains(value) {
                        let options: Vec<String> = allowed.iter().map(display_term).collect();
                        emit(
                            out,
                            "InConstraintComponent",
                            Some(value),
                            format!(
                                "Value {} not in list [{}]",
                                display_term(value),
                                options.join(", ")
                            ),
                        );
                    }
                }
            }
            Constraint::HasValue(expected) => {
                if !values.contains(expected) {
                    emit(
                        out,
                        "HasValueConstraintComponent",
                        None,
                        format!(
                            "Node {focus_text}->{path_text} does not contain value {}",
                            display_term(expected)
                        ),
                    );
                }
            }
            Constraint::Node(node_shape) => {
                for value in values {
                    if !self.conforms(node_shape, value, depth)? {
                        emit(
                            out,
                            "NodeConstraintComponent",
                            Some(value),
                            format!(
                                "Value {} does not conform to shape {}",
                                display_term(value),
                                display_term(node_shape)
                            ),
                        );
                    }
                }
            }
            Constraint::Not(node_shape) => {
                for value in values {
                    if self.conforms(node_shape, value, depth)? {
                        emit(
                            out,
                            "NotConstraintComponent",
                            Some(value),
                            format!(
                                "Value {} conforms to shape {}",
                                display_term(value),
                                display_term(node_shape)
                            ),
                        );
                    }
                }
            }
            Constraint::Property(property_shape) => {
                let validator = self.validator;
                let property_shape = validator.shape(property_shape)?;
                for value in values {
                    self.validate_shape(property_shape, value, out, depth + 1)?;
                }
            }
            Constraint::Sparql(sparql) => {
                self.check_sparql(shape, sparql, focus, out)?;
            }
        }
        Ok(())
    }

    fn check_sparql(
        &mut self,
        shape: &Shape,
        sparql: &SparqlConstraint,
        focus: &Term,
        out: &mut Vec<ValidationResult>,
    ) -> Result<()> {
        let Term::NamedNode(focus_iri) = focus else {
            tracing::debug!(
                shape = %shape.id,
                focus = %focus,
                "skipping SPARQL constraint for non-IRI focus node"
            );
            return Ok(());
        };

        let query = bind_this(
            &sparql.prefixes,
            &sparql.select,
            focus_iri,
            shape.path.as_ref(),
        );
        let context = format!("SPARQL constraint of {}", display_term(&shape.id));
        let solutions = self.data.select(&query, &context)?;

        for solution in solutions {
            let value = solution.get("value").cloned();
            let path = match solution.get("path") {
                Some(Term::NamedNode(p)) => Some(p.as_str().to_string()),
                _ => shape.path.as_ref().map(|p| p.to_string()),
            };

            let template = sparql
                .message
                .as_ref()
                .or(shape.message.as_ref())
                .cloned()
                .unwrap_or_else(|| {
                    format!(
                        "SPARQL constraint violated by {}",
                        display_term(focus)
                    )
                });
            let mut message = template
                .replace("{$this}", &display_term(focus))
                .replace("{?this}", &display_term(focus));
            for (variable, term) in solution.iter() {
                let rendered = display_term(term);
                message = message
                    .replace(&format!("{{?{}}}", variable.as_str()), &rendered)
                    .replace(&format!("{{${}}}", variable.as_str()), &rendered);
            }

            let mut result = ValidationResult::new(
                term_key(focus),
                message,
                shape.severity,
                term_key(&shape.id),
                "SPARQLConstraintComponent",
            )
            .with_path(path);
            result = result.with_value(term_key(value.as_ref().unwrap_or(focus)));
            out.push(result);
        }
        Ok(())
    }
}

/// Pre-bind `$this` by renaming it to `?this` and injecting a `VALUES` block
/// at the start of the outermost group pattern.
fn bind_this(
    prefixes: &str,
    select: &str,
    focus: &NamedNode,
    path: Option<&PropertyPath>,
) -> String {
    let mut body = select.replace("$this", "?this");
    if let Some(path) = path {
        body = body.replace("$PATH", &path.to_sparql());
    }
    let values = format!("\n  VALUES ?this {{ <{}> }}\n", focus.as_str());
    match body.find('{') {
        Some(open) => body.insert_str(open + 1, &values),
        None => body.push_str(&values),
    }
    format!("{prefixes}{body}")
}

fn string_form(term: &Term) -> Option<&str> {
    match term {
        Term::NamedNode(node) => Some(node.as_str()),
        Term::Literal(literal) => Some(literal.value()),
        _ => None,
    }
}

fn is_numeric(literal: &Literal) -> bool {
    let datatype = literal.datatype();
    datatype == xsd::INTEGER
        || datatype == xsd::DECIMAL
        || datatype == xsd::DOUBLE
        || datatype == xsd::FLOAT
        || datatype == xsd::INT
        || datatype == xsd::LONG
        || datatype == xsd::SHORT
        || datatype == xsd::NON_NEGATIVE_INTEGER
        || datatype == xsd::POSITIVE_INTEGER
}

/// Order `value` relative to `bound`; `None` when they are not comparable.
fn compare_literals(value: &Term, bound: &Literal) -> Option<Ordering> {
    let Term::Literal(value) = value else {
        return None;
    };
    if is_numeric(value) && is_numeric(bound) {
        let left = value.value().parse::<f64>().ok()?;
        let right = bound.value().parse::<f64>().ok()?;
        return left.partial_cmp(&right);
    }
    if value.datatype() == bound.datatype() {
        return Some(value.value().cmp(bound.value()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIXES: &str = r#"
        @prefix : <http://nkllon.com/sys#> .
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
    "#;

    fn validate(shapes: &str, data: &str) -> anyhow::Result<ValidationReport> {
        let validator = ShapeValidator::from_turtle(&format!("{PREFIXES}{shapes}"))?;
        let data = TopologyGraph::from_turtle(&format!("{PREFIXES}{data}"), "data.ttl")?;
        Ok(validator.validate(&data)?)
    }

    #[test]
    fn test_severity_conversion() {
        let violation = Severity::Violation;
        let iri = violation.to_iri();
        assert_eq!(iri.as_str(), "http://www.w3.org/ns/shacl#Violation");
        assert_eq!(Severity::from_iri(&iri), Severity::Violation);
        assert_eq!(Severity::from_iri(&Severity::Warning.to_iri()), Severity::Warning);
    }

    #[test]
    fn test_validation_report() {
        let mut report = ValidationReport::new();
        assert!(report.conforms());

        report.add_result(ValidationResult::new(
            "http://example.org/node1".to_string(),
            "Just so you know".to_string(),
            Severity::Info,
            "http://example.org/shape1".to_string(),
            "MinCountConstraintComponent",
        ));
        assert!(report.conforms(), "info results do not break conformance");

        report.add_result(ValidationResult::new(
            "http://example.org/node1".to_string(),
            "Test violation".to_string(),
            Severity::Violation,
            "http://example.org/shape1".to_string(),
            "MinCountConstraintComponent",
        ));
        assert!(!report.conforms());
        assert_eq!(report.results().len(), 2);
        assert_eq!(report.violations().count(), 1);
        assert_eq!(report.summary().infos, 1);
    }

    #[test]
    fn min_count_on_target_class() -> anyhow::Result<()> {
        let report = validate(
            r#"
            :DeviceShape a sh:NodeShape ;
                sh:targetClass :Device ;
                sh:property [ sh:path :hasPort ; sh:minCount 1 ] .
            "#,
            r#"
            :Host rdfs:subClassOf :Device .
            :Mac a :Host ; :hasPort :Mac_USBC .
            :Denon a :Device .
            "#,
        )?;
        assert!(!report.conforms());
        assert_eq!(report.results().len(), 1);
        let result = &report.results()[0];
        assert_eq!(result.focus_node(), "http://nkllon.com/sys#Denon");
        assert_eq!(result.result_path(), Some("http://nkllon.com/sys#hasPort"));
        assert!(result.source_constraint_component().ends_with("MinCountConstraintComponent"));
        Ok(())
    }

    #[test]
    fn class_and_datatype_constraints() -> anyhow::Result<()> {
        let report = validate(
            r#"
            :CableShape a sh:NodeShape ;
                sh:targetClass :Cable ;
                sh:property [ sh:path :connectsTo ; sh:class :Port ; sh:maxCount 1 ] ;
                sh:property [ sh:path :isBidirectional ; sh:datatype xsd:boolean ] .
            "#,
            r#"
            :C1 a :Cable ; :connectsTo :P1 ; :isBidirectional true .
            :P1 a :Port .
            :C2 a :Cable ; :connectsTo :NotAPort ; :isBidirectional "yes" .
            "#,
        )?;
        let components: Vec<&str> = report
            .results()
            .iter()
            .map(|r| r.source_constraint_component().rsplit('#').next().unwrap_or(""))
            .collect();
        assert_eq!(report.results().len(), 2, "{}", report.to_text());
        assert!(components.contains(&"ClassConstraintComponent"));
        assert!(components.contains(&"DatatypeConstraintComponent"));
        assert!(report.results().iter().all(|r| r.focus_node().ends_with("#C2")));
        Ok(())
    }

    #[test]
    fn in_pattern_and_length() -> anyhow::Result<()> {
        let report = validate(
            r#"
            :PortShape a sh:NodeShape ;
                sh:targetClass :Port ;
                sh:property [ sh:path :portPriority ; sh:in ( "High-Priority" "Standard" ) ] ;
                sh:property [ sh:path :physicalForm ; sh:pattern "^[A-Za-z]" ; sh:maxLength 12 ] .
            "#,
            r#"
            :P1 a :Port ; :portPriority "Standard" ; :physicalForm "DisplayPort" .
            :P2 a :Port ; :portPriority "Urgent" ; :physicalForm "3.5mm-jack-with-adapter" .
            "#,
        )?;
        assert_eq!(report.violations().count(), 3, "{}", report.to_text());
        Ok(())
    }

    #[test]
    fn inverse_and_sequence_paths() -> anyhow::Result<()> {
        let report = validate(
            r#"
            :CableUseShape a sh:NodeShape ;
                sh:targetClass :Cable ;
                sh:property [ sh:path [ sh:inversePath :connectsVia ] ; sh:minCount 1 ] .
            :DisplayShape a sh:NodeShape ;
                sh:targetClass :SmartDisplay ;
                sh:property [
                    sh:path ( :hasPort :connectsVia :connectsTo :belongsToDevice ) ;
                    sh:class :PreAmp ;
                    sh:minCount 1
                ] .
            "#,
            r#"
            :TV a :SmartDisplay ; :hasPort :TV_eARC .
            :TV_eARC :connectsVia :Cable_eARC .
            :Cable_eARC a :Cable ; :connectsTo :Amp_In .
            :Amp_In :belongsToDevice :Amp .
            :Amp a :PreAmp .
            :Spare a :Cable .
            "#,
        )?;
        assert_eq!(report.results().len(), 1, "{}", report.to_text());
        assert!(report.results()[0].focus_node().ends_with("#Spare"));
        Ok(())
    }

    #[test]
    fn warning_severity_keeps_conformance() -> anyhow::Result<()> {
        let report = validate(
            r#"
            :LabelShape a sh:NodeShape ;
                sh:targetClass :Device ;
                sh:property [
                    sh:path rdfs:label ;
                    sh:minCount 1 ;
                    sh:severity sh:Warning ;
                    sh:message "Device {$this} has no label"
                ] .
            "#,
            ":Mac a :Device .",
        )?;
        assert!(report.conforms());
        assert_eq!(report.summary().warnings, 1);
        assert_eq!(report.results()[0].message(), "Device :Mac has no label");
        Ok(())
    }

    #[test]
    fn sparql_constraint_binds_this() -> anyhow::Result<()> {
        let report = validate(
            r#"
            <http://nkllon.com/sys/shapes> sh:declare [
                sh:prefix "" ;
                sh:namespace "http://nkllon.com/sys#"^^xsd:anyURI
            ] .
            :AudioShape a sh:NodeShape ;
                sh:targetClass :AudioInterface ;
                sh:sparql [
                    sh:message "{$this} connects to KVM {?value}" ;
                    sh:prefixes <http://nkllon.com/sys/shapes> ;
                    sh:select """
                        SELECT $this ?value WHERE {
                            $this :hasPort ?port .
                            ?port :connectsVia ?cable .
                            ?cable :connectsTo ?target .
                            ?target :belongsToDevice ?value .
                            ?value a :KVM .
                        }
                    """
                ] .
            "#,
            r#"
            :Motu a :AudioInterface ; :hasPort :Motu_Out .
            :Motu_Out :connectsVia :C1 .
            :C1 :connectsTo :Kvm_In .
            :Kvm_In :belongsToDevice :Kvm .
            :Kvm a :KVM .
            :Focusrite a :AudioInterface .
            "#,
        )?;
        assert_eq!(report.results().len(), 1, "{}", report.to_text());
        let result = &report.results()[0];
        assert_eq!(result.message(), ":Motu connects to KVM :Kvm");
        assert_eq!(result.value(), Some("http://nkllon.com/sys#Kvm"));
        Ok(())
    }

    #[test]
    fn node_and_not_constraints() -> anyhow::Result<()> {
        let report = validate(
            r#"
            :LabelledShape a sh:NodeShape ;
                sh:property [ sh:path rdfs:label ; sh:minCount 1 ] .
            :PortOwnerShape a sh:NodeShape ;
                sh:targetClass :Port ;
                sh:property [ sh:path :belongsToDevice ; sh:node :LabelledShape ] ;
                sh:not [ sh:property [ sh:path :portPriority ; sh:hasValue "Deprecated" ] ] .
            "#,
            r#"
            :P1 a :Port ; :belongsToDevice :Kvm .
            :Kvm rdfs:label "TESmart KVM" .
            :P2 a :Port ; :belongsToDevice :Unlabelled ; :portPriority "Deprecated" .
            "#,
        )?;
        let components: HashSet<&str> = report
            .results()
            .iter()
            .map(|r| r.source_constraint_component().rsplit('#').next().unwrap_or(""))
            .collect();
        assert_eq!(report.results().len(), 2, "{}", report.to_text());
        assert!(components.contains("NodeConstraintComponent"));
        assert!(components.contains("NotConstraintComponent"));
        Ok(())
    }

    #[test]
    fn numeric_ranges() -> anyhow::Result<()> {
        let report = validate(
            r#"
            :KvmShape a sh:NodeShape ;
                sh:targetNode :Kvm ;
                sh:property [ sh:path :portCount ; sh:minInclusive 2 ; sh:maxExclusive 16 ] .
            "#,
            ":Kvm :portCount 16 .",
        )?;
        assert_eq!(report.results().len(), 1);
        assert!(
            report.results()[0]
                .source_constraint_component()
                .ends_with("MaxExclusiveConstraintComponent")
        );
        Ok(())
    }

    #[test]
    fn deactivated_shapes_are_skipped() -> anyhow::Result<()> {
        let report = validate(
            r#"
            :Off a sh:NodeShape ;
                sh:deactivated true ;
                sh:targetClass :Device ;
                sh:property [ sh:path :hasPort ; sh:minCount 1 ] .
            "#,
            ":Mac a :Device .",
        )?;
        assert!(report.conforms());
        assert!(report.results().is_empty());
        Ok(())
    }

    #[test]
    fn malformed_shapes_are_execution_errors() {
        let err = ShapeValidator::from_turtle(&format!(
            "{PREFIXES} :S a sh:NodeShape ; sh:property [ sh:path :p ; sh:pattern \"([\" ] ."
        ))
        .err()
        .expect("bad regex");
        assert_eq!(err.code(), crate::error::ErrorCode::ValidationError);

        let err = ShapeValidator::from_turtle(&format!(
            "{PREFIXES} :S a sh:NodeShape ; sh:property [ sh:path :p ; sh:minCount \"many\" ] ."
        ))
        .err()
        .expect("bad count");
        assert_eq!(err.code(), crate::error::ErrorCode::ValidationError);
    }

    #[test]
    fn text_report_layout() -> anyhow::Result<()> {
        let report = validate(
            r#"
            :DeviceShape a sh:NodeShape ;
                sh:targetClass :Device ;
                sh:property [ sh:path :hasPort ; sh:minCount 1 ] .
            "#,
            ":Denon a :Device .",
        )?;
        let text = report.to_text();
        assert!(text.starts_with("Validation Report\nConforms: False\nResults (1):\n"));
        assert!(text.contains("Constraint Violation in MinCountConstraintComponent"));
        assert!(text.contains("\tSource Shape: :DeviceShape\n"));
        assert!(text.contains("\tFocus Node: :Denon\n"));
        assert!(text.contains("\tResult Path: :hasPort\n"));
        Ok(())
    }

    #[test]
    fn bind_this_injects_values_block() {
        let focus = NamedNode::new_unchecked("http://nkllon.com/sys#TV");
        let query = bind_this(
            "PREFIX : <http://nkllon.com/sys#>\n",
            "SELECT $this WHERE { $this :hasPort ?p }",
            &focus,
            None,
        );
        assert!(query.starts_with("PREFIX : <http://nkllon.com/sys#>\nSELECT ?this WHERE {"));
        assert!(query.contains("VALUES ?this { <http://nkllon.com/sys#TV> }"));
    }
}
