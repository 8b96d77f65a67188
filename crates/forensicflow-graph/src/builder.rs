//! Graph construction kernel.

use crate::graph::TransactionGraph;
use crate::messages::{GraphBuildInput, GraphBuildOutput};
use crate::types::Transaction;
use async_trait::async_trait;
use forensicflow_core::error::Result;
use forensicflow_core::traits::BatchKernel;
use forensicflow_core::{domain::Domain, kernel::KernelMetadata, traits::AnalysisKernel};
use std::time::Instant;
use tracing::debug;

// ============================================================================
// Graph Builder Kernel
// ============================================================================

/// Graph builder kernel.
///
/// Single O(E) pass: each transfer is appended to the sender's outgoing list
/// and the receiver's incoming list, and both accounts' statistics are
/// updated. Input is assumed to be validated.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    metadata: KernelMetadata,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Create a new graph builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: KernelMetadata::batch("graph/build", Domain::GraphConstruction)
                .with_description("Directed transfer graph with per-account statistics")
                .with_throughput(1_000_000)
                .with_latency_us(10.0),
        }
    }

    /// Build the graph from transactions.
    pub fn compute(transactions: &[Transaction]) -> TransactionGraph {
        let mut graph = TransactionGraph::with_capacity(transactions.len().min(1 << 16));
        for tx in transactions {
            graph.add_transaction(tx);
        }
        debug!(
            accounts = graph.num_accounts(),
            transactions = graph.num_transactions(),
            "built transaction graph"
        );
        graph
    }
}

impl AnalysisKernel for GraphBuilder {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchKernel<GraphBuildInput, GraphBuildOutput> for GraphBuilder {
    async fn execute(&self, input: GraphBuildInput) -> Result<GraphBuildOutput> {
        let start = Instant::now();
        let graph = Self::compute(&input.transactions);
        Ok(GraphBuildOutput {
            graph,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }
}
