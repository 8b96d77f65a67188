//! Batch message types for the pipeline kernel.

use crate::report::Analysis;
use forensicflow_graph::types::TransactionRecord;
use serde::{Deserialize, Serialize};

/// Pipeline input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// Raw records, in input order.
    pub records: Vec<TransactionRecord>,
}

impl AnalysisInput {
    /// Create a new pipeline input.
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }
}

/// Pipeline output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Report, diagnostics and optional projection.
    pub analysis: Analysis,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}
