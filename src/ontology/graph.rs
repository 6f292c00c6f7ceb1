//! In-memory RDF graph backed by an oxigraph [`Store`].
//!
//! All topology data lives in the store's default graph. Parsing goes through
//! [`RdfParser`] first so that syntax errors surface as
//! [`TopologyError::Parse`] with the offending file, before anything touches
//! the store.

use crate::error::{Result, TopologyError};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{
    GraphNameRef, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, Term, TermRef,
    Triple, TripleRef,
};
use oxigraph::sparql::{QueryResults, QuerySolution, SparqlEvaluator};
use oxigraph::store::Store;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub struct TopologyGraph {
    store: Store,
}

impl TopologyGraph {
    pub fn new() -> Result<Self> {
        Ok(Self {
            store: Store::new()?,
        })
    }

    /// Build a graph from Turtle text; `source` names it in parse errors.
    pub fn from_turtle(turtle: &str, source: impl AsRef<Path>) -> Result<Self> {
        let graph = Self::new()?;
        graph.load_turtle(turtle.as_bytes(), source.as_ref())?;
        Ok(graph)
    }

    /// Parse Turtle from `reader` and add every triple. Returns the number of
    /// parsed statements.
    pub fn load_turtle(&self, reader: impl Read, source: &Path) -> Result<usize> {
        let quads = RdfParser::from_format(RdfFormat::Turtle)
            .for_reader(reader)
            .collect::<std::result::Result<Vec<Quad>, _>>()
            .map_err(|e| TopologyError::parse(source, e))?;

        for quad in &quads {
            self.store.insert(quad)?;
        }
        Ok(quads.len())
    }

    /// Add every triple of `other` to this graph.
    pub fn merge(&self, other: &TopologyGraph) -> Result<()> {
        for quad in other.store.iter() {
            self.store.insert(&quad?)?;
        }
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.store.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.store.is_empty()?)
    }

    /// Add `triple`. Returns `false` when it was already present.
    pub fn insert(&self, triple: TripleRef<'_>) -> Result<bool> {
        let quad = triple.in_graph(GraphNameRef::DefaultGraph);
        if self.store.contains(quad)? {
            return Ok(false);
        }
        self.store.insert(quad)?;
        Ok(true)
    }

    pub fn contains(&self, triple: TripleRef<'_>) -> Result<bool> {
        Ok(self
            .store
            .contains(triple.in_graph(GraphNameRef::DefaultGraph))?)
    }

    pub fn objects(
        &self,
        subject: NamedOrBlankNodeRef<'_>,
        predicate: NamedNodeRef<'_>,
    ) -> Result<Vec<Term>> {
        self.store
            .quads_for_pattern(
                Some(subject),
                Some(predicate),
                None,
                Some(GraphNameRef::DefaultGraph),
            )
            .map(|quad| Ok(quad?.object))
            .collect()
    }

    pub fn object(
        &self,
        subject: NamedOrBlankNodeRef<'_>,
        predicate: NamedNodeRef<'_>,
    ) -> Result<Option<Term>> {
        let next = self
            .store
            .quads_for_pattern(
                Some(subject),
                Some(predicate),
                None,
                Some(GraphNameRef::DefaultGraph),
            )
            .next();
        match next {
            Some(quad) => Ok(Some(quad?.object)),
            None => Ok(None),
        }
    }

    pub fn subjects(
        &self,
        predicate: NamedNodeRef<'_>,
        object: TermRef<'_>,
    ) -> Result<Vec<NamedOrBlankNode>> {
        self.store
            .quads_for_pattern(
                None,
                Some(predicate),
                Some(object),
                Some(GraphNameRef::DefaultGraph),
            )
            .map(|quad| Ok(quad?.subject))
            .collect()
    }

    pub fn triples_with_predicate(&self, predicate: NamedNodeRef<'_>) -> Result<Vec<Triple>> {
        self.store
            .quads_for_pattern(
                None,
                Some(predicate),
                None,
                Some(GraphNameRef::DefaultGraph),
            )
            .map(|quad| {
                let quad = quad?;
                Ok(Triple::new(quad.subject, quad.predicate, quad.object))
            })
            .collect()
    }

    pub fn triples(&self) -> Result<Vec<Triple>> {
        self.store
            .iter()
            .map(|quad| {
                let quad = quad?;
                Ok(Triple::new(quad.subject, quad.predicate, quad.object))
            })
            .collect()
    }

    /// Run a SELECT query; `context` names the query in error messages.
    pub fn select(&self, query: &str, context: &str) -> Result<Vec<QuerySolution>> {
        match self.evaluate(query, context)? {
            QueryResults::Solutions(solutions) => solutions
                .map(|solution| solution.map_err(|e| TopologyError::Query(format!("{context}: {e}"))))
                .collect(),
            _ => Err(TopologyError::Query(format!(
                "{context}: expected a SELECT query"
            ))),
        }
    }

    /// Run an ASK query.
    pub fn ask(&self, query: &str, context: &str) -> Result<bool> {
        match self.evaluate(query, context)? {
            QueryResults::Boolean(answer) => Ok(answer),
            _ => Err(TopologyError::Query(format!(
                "{context}: expected an ASK query"
            ))),
        }
    }

    fn evaluate(&self, query: &str, context: &str) -> Result<QueryResults> {
        tracing::trace!(context, "evaluating SPARQL query");
        SparqlEvaluator::new()
            .parse_query(query)
            .map_err(|e| TopologyError::QuerySyntax {
                context: context.to_string(),
                message: e.to_string(),
            })?
            .on_store(&self.store)
            .execute()
            .map_err(|e| TopologyError::Query(format!("{context}: {e}")))
    }
}

/// Load a Turtle file into a fresh graph.
pub fn load_graph(path: &Path) -> Result<TopologyGraph> {
    if !path.exists() {
        return Err(TopologyError::FileNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let graph = TopologyGraph::new()?;
    let count = graph.load_turtle(BufReader::new(file), path)?;
    tracing::debug!(path = %path.display(), triples = count, "loaded graph");
    Ok(graph)
}

/// Load several Turtle files into one graph, in order.
pub fn load_merged(paths: &[&Path]) -> Result<TopologyGraph> {
    let merged = TopologyGraph::new()?;
    for path in paths {
        merged.merge(&load_graph(path)?)?;
    }
    Ok(merged)
}

/// Subject view of a term, if the term can stand in subject position.
pub fn as_subject(term: &Term) -> Option<NamedOrBlankNodeRef<'_>> {
    match term {
        Term::NamedNode(node) => Some(node.as_ref().into()),
        Term::BlankNode(node) => Some(node.as_ref().into()),
        _ => None,
    }
}
