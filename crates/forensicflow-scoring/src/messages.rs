//! Batch message types for the scoring kernel.

use crate::types::{Detections, ScoreBoard};
use forensicflow_graph::graph::TransactionGraph;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Scoring input.
#[derive(Debug, Clone)]
pub struct ScoringInput {
    /// The transfer graph the detections were made on.
    pub graph: Arc<TransactionGraph>,
    /// Detector findings.
    pub detections: Detections,
}

impl ScoringInput {
    /// Create a new scoring input.
    pub fn new(graph: Arc<TransactionGraph>, detections: Detections) -> Self {
        Self { graph, detections }
    }
}

/// Scoring output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringOutput {
    /// Account scores and rings.
    pub board: ScoreBoard,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}
