//! Batch message types for graph kernels.

use crate::graph::TransactionGraph;
use crate::types::{Transaction, TransactionRecord};
use serde::{Deserialize, Serialize};

// ============================================================================
// Validation Messages
// ============================================================================

/// Record validation input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationInput {
    /// Raw records, in input order.
    pub records: Vec<TransactionRecord>,
}

impl ValidationInput {
    /// Create a new validation input.
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }
}

/// Record validation output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutput {
    /// Validated transactions, in input order.
    pub transactions: Vec<Transaction>,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

// ============================================================================
// Graph Construction Messages
// ============================================================================

/// Graph construction input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphBuildInput {
    /// Transactions to ingest.
    pub transactions: Vec<Transaction>,
}

impl GraphBuildInput {
    /// Create a new graph construction input.
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }
}

/// Graph construction output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphBuildOutput {
    /// The constructed graph.
    pub graph: TransactionGraph,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}
