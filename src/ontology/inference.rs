//! RDFS entailment, materialized into a [`TopologyGraph`].
//!
//! | Rule   | Pattern                                     | Inference             |
//! |--------|---------------------------------------------|-----------------------|
//! | rdfs2  | `P rdfs:domain C`, `S P O`                  | `S rdf:type C`        |
//! | rdfs3  | `P rdfs:range C`, `S P O`, O not a literal  | `O rdf:type C`        |
//! | rdfs5  | `P subPropertyOf Q`, `Q subPropertyOf R`    | `P subPropertyOf R`   |
//! | rdfs7  | `P rdfs:subPropertyOf Q`, `S P O`           | `S Q O`               |
//! | rdfs9  | `C rdfs:subClassOf D`, `X rdf:type C`       | `X rdf:type D`        |
//! | rdfs11 | `C subClassOf D`, `D subClassOf E`          | `C subClassOf E`      |
//!
//! Rules are applied round by round until a round adds nothing.

use super::graph::{TopologyGraph, as_subject};
use crate::error::Result;
use oxigraph::model::vocab::{rdf, rdfs};
use oxigraph::model::{NamedNode, NamedOrBlankNode, Term, Triple};
use std::collections::{HashMap, HashSet};

const MAX_ROUNDS: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferenceStats {
    pub rounds: usize,
    pub inferred: usize,
}

/// Materialize the RDFS closure of `graph` in place.
pub fn materialize_rdfs(graph: &TopologyGraph) -> Result<InferenceStats> {
    let mut stats = InferenceStats::default();

    loop {
        stats.rounds += 1;
        let schema = Schema::collect(graph)?;
        let mut added = 0;

        for triple in graph.triples()? {
            for inferred in schema.entailments(&triple) {
                if graph.insert(inferred.as_ref())? {
                    added += 1;
                }
            }
        }

        stats.inferred += added;
        if added == 0 || stats.rounds >= MAX_ROUNDS {
            break;
        }
    }

    tracing::debug!(
        rounds = stats.rounds,
        inferred = stats.inferred,
        "RDFS materialization complete"
    );
    Ok(stats)
}

/// Sub-classes of `class` under `rdfs:subClassOf*`, including `class`.
pub fn subclasses(graph: &TopologyGraph, class: &NamedNode) -> Result<HashSet<NamedNode>> {
    let mut seen = HashSet::from([class.clone()]);
    let mut frontier = vec![class.clone()];

    while let Some(current) = frontier.pop() {
        for subject in graph.subjects(rdfs::SUB_CLASS_OF, current.as_ref().into())? {
            if let NamedOrBlankNode::NamedNode(node) = subject
                && seen.insert(node.clone())
            {
                frontier.push(node);
            }
        }
    }
    Ok(seen)
}

/// Schema triples relevant to the rules, indexed by their subject.
struct Schema {
    domains: HashMap<NamedNode, Vec<Term>>,
    ranges: HashMap<NamedNode, Vec<Term>>,
    super_properties: HashMap<NamedNode, Vec<NamedNode>>,
    super_classes: HashMap<Term, Vec<Term>>,
}

impl Schema {
    fn collect(graph: &TopologyGraph) -> Result<Self> {
        let mut domains: HashMap<NamedNode, Vec<Term>> = HashMap::new();
        for t in graph.triples_with_predicate(rdfs::DOMAIN)? {
            if let NamedOrBlankNode::NamedNode(p) = t.subject {
                domains.entry(p).or_default().push(t.object);
            }
        }

        let mut ranges: HashMap<NamedNode, Vec<Term>> = HashMap::new();
        for t in graph.triples_with_predicate(rdfs::RANGE)? {
            if let NamedOrBlankNode::NamedNode(p) = t.subject {
                ranges.entry(p).or_default().push(t.object);
            }
        }

        let mut super_properties: HashMap<NamedNode, Vec<NamedNode>> = HashMap::new();
        for t in graph.triples_with_predicate(rdfs::SUB_PROPERTY_OF)? {
            if let (NamedOrBlankNode::NamedNode(p), Term::NamedNode(q)) = (t.subject, t.object) {
                super_properties.entry(p).or_default().push(q);
            }
        }

        let mut super_classes: HashMap<Term, Vec<Term>> = HashMap::new();
        for t in graph.triples_with_predicate(rdfs::SUB_CLASS_OF)? {
            super_classes
                .entry(Term::from(t.subject))
                .or_default()
                .push(t.object);
        }

        Ok(Self {
            domains,
            ranges,
            super_properties,
            super_classes,
        })
    }

    fn entailments(&self, triple: &Triple) -> Vec<Triple> {
        let mut out = Vec::new();
        let predicate = &triple.predicate;
        let rdf_type = rdf::TYPE.into_owned();

        // rdfs2
        if let Some(classes) = self.domains.get(predicate) {
            for class in classes {
                out.push(Triple::new(
                    triple.subject.clone(),
                    rdf_type.clone(),
                    class.clone(),
                ));
            }
        }

        // rdfs3
        if let Some(classes) = self.ranges.get(predicate)
            && let Some(object) = as_subject(&triple.object)
        {
            for class in classes {
                out.push(Triple::new(object.into_owned(), rdf_type.clone(), class.clone()));
            }
        }

        // rdfs7
        if let Some(supers) = self.super_properties.get(predicate) {
            for super_property in supers {
                out.push(Triple::new(
                    triple.subject.clone(),
                    super_property.clone(),
                    triple.object.clone(),
                ));
            }
        }
        // rdfs5
        if predicate.as_ref() == rdfs::SUB_PROPERTY_OF
            && let Term::NamedNode(q) = &triple.object
            && let Some(grand) = self.super_properties.get(q)
        {
            for r in grand {
                out.push(Triple::new(
                    triple.subject.clone(),
                    rdfs::SUB_PROPERTY_OF.into_owned(),
                    r.clone(),
                ));
            }
        }

        // rdfs9
        if predicate.as_ref() == rdf::TYPE
            && let Some(supers) = self.super_classes.get(&triple.object)
        {
            for super_class in supers {
                out.push(Triple::new(
                    triple.subject.clone(),
                    rdf_type.clone(),
                    super_class.clone(),
                ));
            }
        }

        // rdfs11
        if predicate.as_ref() == rdfs::SUB_CLASS_OF
            && let Some(supers) = self.super_classes.get(&triple.object)
        {
            for super_class in supers {
                out.push(Triple::new(
                    triple.subject.clone(),
                    rdfs::SUB_CLASS_OF.into_owned(),
                    super_class.clone(),
                ));
            }
        }

        out
    }
}
