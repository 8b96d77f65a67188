//! False-positive filtering for merchant and payroll profiles.

use crate::messages::{DetectionInput, LegitimacyOutput};
use crate::types::{LegitimacyKind, LegitimateAccount};
use async_trait::async_trait;
use forensicflow_core::config::LegitimacyConfig;
use forensicflow_core::error::{FlowError, Result};
use forensicflow_core::traits::BatchKernel;
use forensicflow_core::{domain::Domain, kernel::KernelMetadata, traits::AnalysisKernel};
use forensicflow_graph::graph::TransactionGraph;
use forensicflow_graph::types::Edge;
use std::time::Instant;
use tracing::debug;

/// Coefficient of variation (population std-dev / mean).
///
/// `None` for empty input or a non-positive mean.
pub fn coefficient_of_variation(values: impl ExactSizeIterator<Item = f64> + Clone) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    if mean <= 0.0 {
        return None;
    }
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    Some(variance.sqrt() / mean)
}

fn uniform_amounts(edges: &[Edge], max_cv: f64) -> bool {
    coefficient_of_variation(edges.iter().map(|e| e.amount)).is_some_and(|cv| cv < max_cv)
}

/// Legitimacy filter kernel.
///
/// Marks merchants (many uniform incoming payments) and payroll payers
/// (many uniform outgoing payments) so that their scores can be discounted.
#[derive(Debug, Clone)]
pub struct LegitimacyFilter {
    metadata: KernelMetadata,
    config: LegitimacyConfig,
}

impl Default for LegitimacyFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LegitimacyFilter {
    /// Create a new legitimacy filter with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LegitimacyConfig::default())
    }

    /// Create a legitimacy filter with the given thresholds.
    #[must_use]
    pub fn with_config(config: LegitimacyConfig) -> Self {
        Self {
            metadata: KernelMetadata::batch("filter/legitimacy", Domain::FalsePositiveFiltering)
                .with_description("Merchant and payroll profile recognition")
                .with_throughput(1_000_000)
                .with_latency_us(100.0),
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &LegitimacyConfig {
        &self.config
    }

    /// Accounts matching a legitimate profile, in account-list order.
    pub fn compute(graph: &TransactionGraph, config: &LegitimacyConfig) -> Vec<LegitimateAccount> {
        let mut accounts = Vec::new();
        for (idx, id, stats) in graph.iter() {
            let merchant = stats.in_degree >= config.merchant_min_in_degree
                && stats.out_degree <= config.merchant_max_out_degree
                && uniform_amounts(graph.incoming(idx), config.merchant_max_cv);
            let payroll = !merchant
                && stats.out_degree >= config.payroll_min_out_degree
                && stats.in_degree <= config.payroll_max_in_degree
                && uniform_amounts(graph.outgoing(idx), config.payroll_max_cv);

            let kind = if merchant {
                LegitimacyKind::Merchant
            } else if payroll {
                LegitimacyKind::Payroll
            } else {
                continue;
            };
            accounts.push(LegitimateAccount {
                account_id: id.to_string(),
                kind,
            });
        }
        debug!(accounts = accounts.len(), "legitimacy filter finished");
        accounts
    }
}

impl AnalysisKernel for LegitimacyFilter {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        if self.config.merchant_max_cv <= 0.0 || self.config.payroll_max_cv <= 0.0 {
            return Err(FlowError::config("legitimacy CV limits must be positive"));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchKernel<DetectionInput, LegitimacyOutput> for LegitimacyFilter {
    async fn execute(&self, input: DetectionInput) -> Result<LegitimacyOutput> {
        self.validate()?;
        let start = Instant::now();
        let accounts = Self::compute(&input.graph, &self.config);
        Ok(LegitimacyOutput {
            accounts,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forensicflow_graph::builder::GraphBuilder;
    use forensicflow_graph::types::Transaction;

    fn merchant(amounts: &[f64]) -> TransactionGraph {
        let txs: Vec<Transaction> = amounts
            .iter()
            .enumerate()
            .map(|(i, &a)| Transaction::at_epoch(format!("T{i}"), format!("C{i:02}"), "SHOP", a, i as i64 * 86_400))
            .collect();
        GraphBuilder::compute(&txs)
    }

    #[test]
    fn test_legitimacy_filter_metadata() {
        let kernel = LegitimacyFilter::new();
        assert_eq!(kernel.metadata().id, "filter/legitimacy");
        assert_eq!(kernel.metadata().domain, Domain::FalsePositiveFiltering);
    }

    #[test]
    fn test_coefficient_of_variation() {
        let values = [10.0, 10.0, 10.0];
        assert_eq!(coefficient_of_variation(values.iter().copied()), Some(0.0));
        let values = [5.0, 15.0];
        assert_eq!(coefficient_of_variation(values.iter().copied()), Some(0.5));
        let values = [0.0, 0.0];
        assert_eq!(coefficient_of_variation(values.iter().copied()), None);
        assert_eq!(coefficient_of_variation(std::iter::empty::<f64>()), None);
    }

    #[test]
    fn test_uniform_merchant() {
        let amounts: Vec<f64> = (0..25).map(|i| 40.0 + (i % 3) as f64).collect();
        let g = merchant(&amounts);
        let legit = LegitimacyFilter::compute(&g, &LegitimacyConfig::default());
        assert_eq!(
            legit,
            vec![LegitimateAccount {
                account_id: "SHOP".to_string(),
                kind: LegitimacyKind::Merchant,
            }]
        );
    }

    #[test]
    fn test_erratic_merchant_rejected() {
        let amounts: Vec<f64> = (0..25)
            .map(|i| if i % 2 == 0 { 1.0 } else { 500.0 })
            .collect();
        let g = merchant(&amounts);
        assert!(LegitimacyFilter::compute(&g, &LegitimacyConfig::default()).is_empty());
    }

    #[test]
    fn test_payroll() {
        let txs: Vec<Transaction> = (0..22)
            .map(|i| Transaction::at_epoch(format!("T{i}"), "EMPLOYER", format!("E{i:02}"), 3_000.0, 0))
            .collect();
        let g = GraphBuilder::compute(&txs);
        let legit = LegitimacyFilter::compute(&g, &LegitimacyConfig::default());
        assert_eq!(legit.len(), 1);
        assert_eq!(legit[0].kind, LegitimacyKind::Payroll);
    }

    #[tokio::test]
    async fn test_legitimacy_filter_execute() {
        let kernel = LegitimacyFilter::new();
        let g = merchant(&[10.0; 20]);
        let out = kernel.execute(DetectionInput::from(g)).await.unwrap();
        assert_eq!(out.accounts.len(), 1);
    }
}
