//! Smurfing (fan-in / fan-out) detection.

use crate::messages::{DetectionInput, SmurfingOutput};
use crate::types::{SmurfingPattern, SmurfingType};
use async_trait::async_trait;
use forensicflow_core::config::SmurfingConfig;
use forensicflow_core::error::{FlowError, Result};
use forensicflow_core::traits::BatchKernel;
use forensicflow_core::{domain::Domain, kernel::KernelMetadata, traits::AnalysisKernel};
use forensicflow_graph::graph::TransactionGraph;
use forensicflow_graph::types::{AccountIdx, Edge};
use std::time::Instant;
use tracing::debug;

/// Largest share of `timestamps_ms` that falls inside any window of
/// `window_ms`. Fewer than two events yield 0.
pub fn temporal_density(timestamps_ms: &[i64], window_ms: i64) -> f64 {
    if timestamps_ms.len() < 2 {
        return 0.0;
    }
    let mut sorted = timestamps_ms.to_vec();
    sorted.sort_unstable();

    let mut best = 0usize;
    let mut lo = 0usize;
    for hi in 0..sorted.len() {
        while sorted[hi] - sorted[lo] > window_ms {
            lo += 1;
        }
        best = best.max(hi - lo + 1);
    }
    best as f64 / sorted.len() as f64
}

/// Smurfing detection kernel.
///
/// Flags accounts that concentrate transfers from (fan-in) or to (fan-out)
/// many distinct counterparties.
#[derive(Debug, Clone)]
pub struct SmurfingDetector {
    metadata: KernelMetadata,
    config: SmurfingConfig,
}

impl Default for SmurfingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SmurfingDetector {
    /// Create a new smurfing detector with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SmurfingConfig::default())
    }

    /// Create a smurfing detector with the given thresholds.
    #[must_use]
    pub fn with_config(config: SmurfingConfig) -> Self {
        Self {
            metadata: KernelMetadata::batch("detect/smurfing", Domain::PatternDetection)
                .with_description("Fan-in / fan-out concentration with temporal density")
                .with_throughput(500_000)
                .with_latency_us(200.0),
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SmurfingConfig {
        &self.config
    }

    fn check(
        graph: &TransactionGraph,
        center: AccountIdx,
        edges: &[Edge],
        pattern_type: SmurfingType,
        config: &SmurfingConfig,
    ) -> Option<SmurfingPattern> {
        let connected = match pattern_type {
            SmurfingType::FanIn => graph.predecessors(center),
            SmurfingType::FanOut => graph.successors(center),
        };
        if connected.len() < config.min_unique_counterparties {
            return None;
        }

        let timestamps: Vec<i64> = edges.iter().map(|e| e.timestamp_ms).collect();
        let density = temporal_density(&timestamps, config.window_ms());
        if density <= config.min_temporal_density {
            return None;
        }

        Some(SmurfingPattern {
            pattern_type,
            center: graph.account_id(center).to_string(),
            connected: connected
                .into_iter()
                .map(|idx| graph.account_id(idx).to_string())
                .collect(),
            temporal_score: density,
            total_amount: edges.iter().map(|e| e.amount).sum(),
            transaction_count: edges.len(),
        })
    }

    /// Detect fan-in and fan-out patterns in account-list order.
    pub fn compute(graph: &TransactionGraph, config: &SmurfingConfig) -> Vec<SmurfingPattern> {
        let mut patterns = Vec::new();
        for (idx, _, stats) in graph.iter() {
            if stats.in_degree >= config.min_degree {
                if let Some(p) =
                    Self::check(graph, idx, graph.incoming(idx), SmurfingType::FanIn, config)
                {
                    patterns.push(p);
                }
            }
            if stats.out_degree >= config.min_degree {
                if let Some(p) =
                    Self::check(graph, idx, graph.outgoing(idx), SmurfingType::FanOut, config)
                {
                    patterns.push(p);
                }
            }
        }
        debug!(patterns = patterns.len(), "smurfing detection finished");
        patterns
    }
}

impl AnalysisKernel for SmurfingDetector {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        if self.config.min_degree == 0 || self.config.min_unique_counterparties == 0 {
            return Err(FlowError::config("smurfing thresholds must be positive"));
        }
        if self.config.window_hours == 0 {
            return Err(FlowError::config("smurfing.window_hours must be positive"));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchKernel<DetectionInput, SmurfingOutput> for SmurfingDetector {
    async fn execute(&self, input: DetectionInput) -> Result<SmurfingOutput> {
        self.validate()?;
        let start = Instant::now();
        let patterns = Self::compute(&input.graph, &self.config);
        Ok(SmurfingOutput {
            patterns,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }
}
