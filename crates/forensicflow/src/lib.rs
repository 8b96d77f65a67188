//! # ForensicFlow
//!
//! Graph-based money muling detection over batches of money transfers.
//!
//! Transactions become a directed graph of accounts. Three detectors look
//! for laundering shapes on that graph:
//!
//! - **Cycles**: funds returning to their origin through 3 to 5 accounts
//! - **Smurfing**: many small transfers fanning into or out of one account
//!   inside a 72 hour window
//! - **Shell networks**: money layered through low-activity pass-through
//!   accounts
//!
//! Merchants and payroll accounts are recognized and discounted, every
//! account gets a 0-100 suspicion score, and detected groups are reported as
//! fraud rings (`RING_001`, `RING_002`, ...).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use forensicflow::prelude::*;
//!
//! let records = vec![
//!     TransactionRecord::new("T1", "A", "B", "100", "2024-01-01 10:00:00"),
//!     TransactionRecord::new("T2", "B", "C", "100", "2024-01-01 12:00:00"),
//!     TransactionRecord::new("T3", "C", "A", "100", "2024-01-01 14:00:00"),
//! ];
//!
//! let analysis = Pipeline::new().analyze(&records)?;
//! println!("{}", analysis.report.to_json_pretty()?);
//! ```
//!
//! ## Crates
//!
//! | Crate | Kernels | Description |
//! |-------|---------|-------------|
//! | `forensicflow-graph` | 2 | Record validation, graph construction |
//! | `forensicflow-detect` | 4 | Cycles, smurfing, shell chains, legitimacy |
//! | `forensicflow-scoring` | 1 | Suspicion scores and fraud rings |
//! | `forensicflow` | 1 | Pipeline, report, projection |

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export member crates
pub use forensicflow_core as core;
pub use forensicflow_detect as detect;
pub use forensicflow_graph as graph;
pub use forensicflow_scoring as scoring;

pub mod messages;
pub mod pipeline;
pub mod projection;
pub mod report;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use forensicflow::prelude::*;
/// ```
pub mod prelude {
    pub use forensicflow_core::prelude::*;

    pub use forensicflow_graph::graph::TransactionGraph;
    pub use forensicflow_graph::types::{Transaction, TransactionRecord};
    pub use forensicflow_scoring::types::{FraudRing, PatternTag, PatternType};

    pub use crate::messages::{AnalysisInput, AnalysisOutput};
    pub use crate::pipeline::{NoProgress, Pipeline, ProgressEvent, ProgressObserver, Stage};
    pub use crate::projection::GraphProjection;
    pub use crate::report::{Analysis, AnalysisReport, Diagnostics, SuspiciousAccount, Summary};
}

/// Version information.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Kernel catalog providing an overview of the analysis stages.
pub mod catalog {
    use forensicflow_core::domain::Domain;
    use forensicflow_core::error::Result;
    use forensicflow_core::registry::KernelRegistry;

    /// Domain information.
    #[derive(Debug, Clone)]
    pub struct DomainInfo {
        /// Domain enum value.
        pub domain: Domain,
        /// Human-readable name.
        pub name: &'static str,
        /// Description.
        pub description: &'static str,
        /// Number of kernels.
        pub kernel_count: usize,
    }

    /// Get all domain information.
    pub fn domains() -> Vec<DomainInfo> {
        vec![
            DomainInfo {
                domain: Domain::GraphConstruction,
                name: "Graph Construction",
                description: "Record validation and directed transfer graph build",
                kernel_count: 2,
            },
            DomainInfo {
                domain: Domain::PatternDetection,
                name: "Pattern Detection",
                description: "Cycles, fan-in / fan-out smurfing, shell network chains",
                kernel_count: 3,
            },
            DomainInfo {
                domain: Domain::FalsePositiveFiltering,
                name: "False-Positive Filtering",
                description: "Merchant and payroll recognition",
                kernel_count: 1,
            },
            DomainInfo {
                domain: Domain::Scoring,
                name: "Scoring",
                description: "Suspicion score composition and fraud ring assembly",
                kernel_count: 1,
            },
            DomainInfo {
                domain: Domain::Pipeline,
                name: "Pipeline",
                description: "End-to-end analysis and report assembly",
                kernel_count: 1,
            },
        ]
    }

    /// Get total kernel count across all domains.
    pub fn total_kernel_count() -> usize {
        domains().iter().map(|d| d.kernel_count).sum()
    }

    /// Build a registry holding every kernel.
    pub fn registry() -> Result<KernelRegistry> {
        let registry = KernelRegistry::new();
        crate::register_all(&registry)?;
        Ok(registry)
    }
}

/// Register every kernel into a registry.
///
/// # Errors
///
/// Returns an error if any kernel registration fails.
pub fn register_all(
    registry: &forensicflow_core::registry::KernelRegistry,
) -> forensicflow_core::error::Result<()> {
    forensicflow_graph::register_all(registry)?;
    forensicflow_detect::register_all(registry)?;
    forensicflow_scoring::register_all(registry)?;

    tracing::info!("Registering pipeline kernel");
    registry.register(&pipeline::Pipeline::new())?;

    Ok(())
}
