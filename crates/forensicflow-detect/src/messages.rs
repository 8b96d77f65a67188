//! Batch message types for detection kernels.
//!
//! Every detector reads the same immutable graph, shared by `Arc`.

use crate::types::{CycleSearchResult, LegitimateAccount, ShellChain, SmurfingPattern};
use forensicflow_graph::graph::TransactionGraph;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Detection input shared by all detectors.
#[derive(Debug, Clone)]
pub struct DetectionInput {
    /// The transfer graph.
    pub graph: Arc<TransactionGraph>,
}

impl DetectionInput {
    /// Create a new detection input.
    pub fn new(graph: Arc<TransactionGraph>) -> Self {
        Self { graph }
    }
}

impl From<TransactionGraph> for DetectionInput {
    fn from(graph: TransactionGraph) -> Self {
        Self::new(Arc::new(graph))
    }
}

// ============================================================================
// Detector Outputs
// ============================================================================

/// Cycle detection output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOutput {
    /// Search result with truncation indicator.
    pub result: CycleSearchResult,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

/// Smurfing detection output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmurfingOutput {
    /// Fan-in and fan-out patterns, in account-list order.
    pub patterns: Vec<SmurfingPattern>,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

/// Shell network detection output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellOutput {
    /// Qualifying chains, in start-account order.
    pub chains: Vec<ShellChain>,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

/// Legitimacy filter output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegitimacyOutput {
    /// Accounts matching a legitimate profile, in account-list order.
    pub accounts: Vec<LegitimateAccount>,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}
