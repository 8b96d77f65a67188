//! Layered shell network detection.
//!
//! A shell account carries only a handful of transfers (2-3 by default) and
//! both sends and receives. Chains are traced greedily from every non-shell
//! account through shell receivers.

use crate::messages::{DetectionInput, ShellOutput};
use crate::types::ShellChain;
use async_trait::async_trait;
use forensicflow_core::config::ShellConfig;
use forensicflow_core::error::{FlowError, Result};
use forensicflow_core::traits::BatchKernel;
use forensicflow_core::{domain::Domain, kernel::KernelMetadata, traits::AnalysisKernel};
use forensicflow_graph::graph::TransactionGraph;
use forensicflow_graph::types::AccountIdx;
use std::time::Instant;
use tracing::debug;

/// Shell network detection kernel.
#[derive(Debug, Clone)]
pub struct ShellNetworkDetector {
    metadata: KernelMetadata,
    config: ShellConfig,
}

impl Default for ShellNetworkDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellNetworkDetector {
    /// Create a new shell network detector with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ShellConfig::default())
    }

    /// Create a shell network detector with the given thresholds.
    #[must_use]
    pub fn with_config(config: ShellConfig) -> Self {
        Self {
            metadata: KernelMetadata::batch("detect/shell-networks", Domain::PatternDetection)
                .with_description("Greedy layering chains through low-activity accounts")
                .with_throughput(500_000)
                .with_latency_us(300.0),
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Shell-candidate flag per account.
    pub fn shell_candidates(graph: &TransactionGraph, config: &ShellConfig) -> Vec<bool> {
        graph
            .iter()
            .map(|(_, _, s)| {
                (config.min_shell_tx..=config.max_shell_tx).contains(&s.tx_count)
                    && s.is_bidirectional()
            })
            .collect()
    }

    /// Greedy chain from `start`.
    fn trace(
        graph: &TransactionGraph,
        start: AccountIdx,
        is_shell: &[bool],
        config: &ShellConfig,
    ) -> Vec<AccountIdx> {
        let mut chain = vec![start];
        let mut in_chain = vec![false; graph.num_accounts()];
        in_chain[start] = true;
        let mut current = start;

        loop {
            let edges = graph.outgoing(current);
            let next_shell = edges
                .iter()
                .map(|e| e.counterparty)
                .find(|&r| is_shell[r] && !in_chain[r]);

            let Some(next) = next_shell else {
                if let Some(exit) = edges
                    .iter()
                    .map(|e| e.counterparty)
                    .find(|&r| !is_shell[r] && !in_chain[r])
                {
                    chain.push(exit);
                }
                break;
            };

            chain.push(next);
            in_chain[next] = true;
            current = next;

            if chain.len() > config.max_chain_nodes {
                break;
            }
        }
        chain
    }

    /// Detect shell chains, one greedy walk per non-shell account.
    pub fn compute(graph: &TransactionGraph, config: &ShellConfig) -> Vec<ShellChain> {
        let is_shell = Self::shell_candidates(graph, config);
        let mut chains = Vec::new();

        for start in 0..graph.num_accounts() {
            if config.max_chains.is_some_and(|max| chains.len() >= max) {
                break;
            }
            if is_shell[start] {
                continue;
            }

            let chain = Self::trace(graph, start, &is_shell, config);
            let intermediaries: Vec<AccountIdx> = match chain.len() {
                0..=2 => Vec::new(),
                len => chain[1..len - 1]
                    .iter()
                    .copied()
                    .filter(|&idx| is_shell[idx])
                    .collect(),
            };

            if chain.len() > config.min_hops && !intermediaries.is_empty() {
                let name = |idx: &AccountIdx| graph.account_id(*idx).to_string();
                chains.push(ShellChain {
                    hop_count: chain.len() - 1,
                    accounts: chain.iter().map(name).collect(),
                    intermediaries: intermediaries.iter().map(name).collect(),
                });
            }
        }

        debug!(chains = chains.len(), "shell network detection finished");
        chains
    }
}

impl AnalysisKernel for ShellNetworkDetector {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        let c = &self.config;
        if c.min_shell_tx == 0 || c.min_shell_tx > c.max_shell_tx {
            return Err(FlowError::config("shell transaction bounds are inconsistent"));
        }
        if c.max_chain_nodes <= c.min_hops {
            return Err(FlowError::config("shell.max_chain_nodes must exceed min_hops"));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchKernel<DetectionInput, ShellOutput> for ShellNetworkDetector {
    async fn execute(&self, input: DetectionInput) -> Result<ShellOutput> {
        self.validate()?;
        let start = Instant::now();
        let chains = Self::compute(&input.graph, &self.config);
        Ok(ShellOutput {
            chains,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }
}
