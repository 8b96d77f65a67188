//! # ForensicFlow Detection
//!
//! Pattern detectors that read the immutable transfer graph.
//!
//! ## Kernels
//! - `CycleDetector` - Batch kernel, SCC-pruned DFS for 3-5 account loops
//! - `SmurfingDetector` - Batch kernel, fan-in / fan-out with temporal density
//! - `ShellNetworkDetector` - Batch kernel, greedy layering chains
//! - `LegitimacyFilter` - Batch kernel, merchant / payroll recognition
//!
//! The three pattern detectors are independent of each other and may run
//! concurrently on a shared `Arc<TransactionGraph>`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cycles;
pub mod legitimacy;
pub mod messages;
pub mod shell;
pub mod smurfing;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::cycles::*;
    pub use crate::legitimacy::*;
    pub use crate::messages::*;
    pub use crate::shell::*;
    pub use crate::smurfing::*;
    pub use crate::types::*;
}

/// Register all detection kernels with a registry.
pub fn register_all(
    registry: &forensicflow_core::registry::KernelRegistry,
) -> forensicflow_core::error::Result<()> {
    tracing::info!("Registering detection kernels");

    // Pattern detectors (3)
    registry.register(&cycles::CycleDetector::new())?;
    registry.register(&smurfing::SmurfingDetector::new())?;
    registry.register(&shell::ShellNetworkDetector::new())?;

    // False-positive filtering (1)
    registry.register(&legitimacy::LegitimacyFilter::new())?;

    tracing::info!("Registered 4 detection kernels");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forensicflow_core::domain::Domain;
    use forensicflow_core::registry::KernelRegistry;

    #[test]
    fn test_register_all() {
        let registry = KernelRegistry::new();
        register_all(&registry).expect("Failed to register detection kernels");
        assert_eq!(registry.total_count(), 4);
        assert_eq!(registry.by_domain(Domain::PatternDetection).len(), 3);
        assert_eq!(registry.by_domain(Domain::FalsePositiveFiltering).len(), 1);
    }
}
