//! # ForensicFlow Scoring
//!
//! Turns detector findings into per-account suspicion scores and fraud rings.
//!
//! ## Kernels
//! - `SuspicionScorer` - Batch kernel, ordered score composition

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod messages;
pub mod scorer;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::messages::*;
    pub use crate::scorer::*;
    pub use crate::types::*;
}

/// Register all scoring kernels with a registry.
pub fn register_all(
    registry: &forensicflow_core::registry::KernelRegistry,
) -> forensicflow_core::error::Result<()> {
    tracing::info!("Registering scoring kernels");
    registry.register(&scorer::SuspicionScorer::new())?;
    tracing::info!("Registered 1 scoring kernel");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forensicflow_core::registry::KernelRegistry;

    #[test]
    fn test_register_all() {
        let registry = KernelRegistry::new();
        register_all(&registry).expect("Failed to register scoring kernels");
        assert_eq!(registry.total_count(), 1);
        assert!(registry.get("scoring/suspicion").is_ok());
    }
}
