//! Row mapping: turn SPARQL solutions into typed rows.

use super::typed_binding::{BindingError, TypedBinding};
use crate::error::TopologyError;
use oxigraph::sparql::QuerySolution;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum MappingError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("{} row(s) could not be mapped:\n{}", .0.len(), .0.join("\n"))]
    Multiple(Vec<String>),
}

impl From<MappingError> for TopologyError {
    fn from(err: MappingError) -> Self {
        TopologyError::Query(err.to_string())
    }
}

/// A row type built from the variables of one solution.
pub trait FromSparql: Sized {
    fn from_binding(binding: &TypedBinding<'_>) -> Result<Self, MappingError>;

    fn from_solution(solution: &QuerySolution) -> Result<Self, MappingError> {
        Self::from_binding(&TypedBinding::new(solution))
    }
}

pub struct ResultMapper;

impl ResultMapper {
    /// Map every solution. Failures are collected per row so one bad binding
    /// does not hide the others.
    pub fn map_many<T: FromSparql>(solutions: &[QuerySolution]) -> Result<Vec<T>, MappingError> {
        let (rows, failures): (Vec<_>, Vec<_>) = solutions
            .iter()
            .map(T::from_solution)
            .enumerate()
            .partition(|(_, mapped)| mapped.is_ok());

        if !failures.is_empty() {
            return Err(MappingError::Multiple(
                failures
                    .into_iter()
                    .filter_map(|(row, mapped)| mapped.err().map(|e| format!("row {row}: {e}")))
                    .collect(),
            ));
        }

        Ok(rows.into_iter().filter_map(|(_, mapped)| mapped.ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::TopologyGraph;

    #[derive(Debug)]
    struct Owner {
        port: String,
        device: String,
    }

    impl FromSparql for Owner {
        fn from_binding(binding: &TypedBinding<'_>) -> Result<Self, MappingError> {
            Ok(Self {
                port: binding.get_display("port")?,
                device: binding.get_iri("device")?,
            })
        }
    }

    #[test]
    fn maps_rows_and_accumulates_errors() -> anyhow::Result<()> {
        let graph = TopologyGraph::from_turtle(
            r#"
            @prefix : <http://nkllon.com/sys#> .
            :Kvm_In1 :belongsToDevice :Kvm .
            :Odd_Port :belongsToDevice "not a device" .
            "#,
            "owners.ttl",
        )?;
        let rows = graph.select(
            "PREFIX : <http://nkllon.com/sys#>
             SELECT ?port ?device WHERE { ?port :belongsToDevice ?device } ORDER BY ?port",
            "owners",
        )?;

        let err = ResultMapper::map_many::<Owner>(&rows).err().expect("one bad row");
        assert!(matches!(&err, MappingError::Multiple(errors) if errors.len() == 1));

        let owners = ResultMapper::map_many::<Owner>(&rows[..1])?;
        assert_eq!(owners[0].port, "Kvm_In1");
        assert_eq!(owners[0].device, "http://nkllon.com/sys#Kvm");
        Ok(())
    }
}
