//! Typed access to the variables of one SPARQL solution.
//!
//! Row mappers read resources and literals through [`TypedBinding`] so that an
//! unexpected binding names the offending variable instead of panicking.

use crate::ontology::vocab::local_name;
use oxigraph::model::{Literal, Term};
use oxigraph::sparql::QuerySolution;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingError {
    #[error("?{0} is not bound")]
    Unbound(String),

    #[error("?{var} should be {expected} but is {actual}")]
    TypeMismatch {
        var: String,
        expected: String,
        actual: String,
    },
}

pub struct TypedBinding<'a> {
    solution: &'a QuerySolution,
}

impl<'a> TypedBinding<'a> {
    pub fn new(solution: &'a QuerySolution) -> Self {
        Self { solution }
    }

    pub fn get_term(&self, var: &str) -> Result<&'a Term, BindingError> {
        self.solution
            .get(var)
            .ok_or_else(|| BindingError::Unbound(var.to_string()))
    }

    /// Full IRI of a named-node binding.
    pub fn get_iri(&self, var: &str) -> Result<String, BindingError> {
        match self.get_term(var)? {
            Term::NamedNode(node) => Ok(node.as_str().to_string()),
            other => Err(mismatch(var, "an IRI", other)),
        }
    }

    /// Lexical form of a literal binding, whatever its datatype.
    pub fn get_literal(&self, var: &str) -> Result<String, BindingError> {
        Ok(self.literal(var)?.value().to_string())
    }

    /// IRI or `_:label` of a resource binding. Literals are rejected.
    pub fn get_node(&self, var: &str) -> Result<String, BindingError> {
        match self.get_term(var)? {
            Term::NamedNode(node) => Ok(node.as_str().to_string()),
            Term::BlankNode(node) => Ok(format!("_:{}", node.as_str())),
            other => Err(mismatch(var, "an IRI or blank node", other)),
        }
    }

    /// Local name for IRIs, lexical form for literals.
    pub fn get_display(&self, var: &str) -> Result<String, BindingError> {
        self.get_term(var).map(display_term)
    }

    fn literal(&self, var: &str) -> Result<&'a Literal, BindingError> {
        match self.get_term(var)? {
            Term::Literal(literal) => Ok(literal),
            other => Err(mismatch(var, "a literal", other)),
        }
    }
}

pub fn display_term(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => local_name(node.as_str()).to_string(),
        Term::Literal(lit) => lit.value().to_string(),
        other => other.to_string(),
    }
}

fn mismatch(var: &str, expected: &str, term: &Term) -> BindingError {
    BindingError::TypeMismatch {
        var: var.to_string(),
        expected: expected.to_string(),
        actual: term_type_name(term),
    }
}

fn term_type_name(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => format!("the IRI <{}>", node.as_str()),
        Term::BlankNode(node) => format!("the blank node _:{}", node.as_str()),
        Term::Literal(lit) => format!("a literal of type xsd:{}", local_name(lit.datatype().as_str())),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}
