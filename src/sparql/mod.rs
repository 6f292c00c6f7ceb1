//! SPARQL plumbing: typed extraction of bindings, row mapping, and the fixed
//! topology queries used by the `query`, `diff` and `visualize` commands.

pub mod queries;
pub mod result_mapper;
pub mod typed_binding;

pub use queries::{AudioConnection, BidirectionalCable, ConnectionRow, DeviceRow, UptimeCriticalPort};
pub use result_mapper::{FromSparql, MappingError, ResultMapper};
pub use typed_binding::{BindingError, TypedBinding, display_term};
