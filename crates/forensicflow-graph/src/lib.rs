//! # ForensicFlow Graph
//!
//! Input validation and construction of the directed transfer graph.
//!
//! ## Kernels
//! - `RecordValidator` - Batch kernel, raw records to typed transactions
//! - `GraphBuilder` - Batch kernel, O(E) adjacency and statistics build

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod graph;
pub mod messages;
pub mod types;
pub mod validation;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::*;
    pub use crate::graph::*;
    pub use crate::messages::*;
    pub use crate::types::*;
    pub use crate::validation::{parse_amount, parse_timestamp, validate_records, RecordValidator};
}

/// Register all graph construction kernels with a registry.
pub fn register_all(
    registry: &forensicflow_core::registry::KernelRegistry,
) -> forensicflow_core::error::Result<()> {
    tracing::info!("Registering graph construction kernels");

    registry.register(&validation::RecordValidator::new())?;
    registry.register(&builder::GraphBuilder::new())?;

    tracing::info!("Registered 2 graph construction kernels");
    Ok(())
}
