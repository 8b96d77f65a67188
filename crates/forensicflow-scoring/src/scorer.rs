//! Suspicion score composition.
//!
//! Scores are accumulated in a fixed order:
//! 1. Cycle membership
//! 2. Smurfing centers and counterparties
//! 3. Shell chain membership
//! 4. Per-account velocity, degree anomaly and pass-through factors
//! 5. Legitimacy discount
//! 6. Clamp to the maximum score
//! 7. Ring risk as the mean of member scores
//!
//! Each pattern instance becomes a ring. An account keeps the first ring it
//! was assigned to.

use crate::messages::{ScoringInput, ScoringOutput};
use crate::types::{ring_id, AccountScore, Detections, FraudRing, PatternTag, PatternType, ScoreBoard};
use async_trait::async_trait;
use forensicflow_core::config::ScoringConfig;
use forensicflow_core::error::{FlowError, Result};
use forensicflow_core::traits::BatchKernel;
use forensicflow_core::{domain::Domain, kernel::KernelMetadata, traits::AnalysisKernel};
use forensicflow_graph::graph::TransactionGraph;
use forensicflow_graph::types::{AccountIdx, NodeStats};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::debug;

/// Round to one decimal, ties to even.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Round to two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

struct Ledger<'a> {
    graph: &'a TransactionGraph,
    scores: Vec<f64>,
    tags: Vec<BTreeSet<PatternTag>>,
    first_ring: Vec<Option<String>>,
    rings: Vec<FraudRing>,
}

impl<'a> Ledger<'a> {
    fn new(graph: &'a TransactionGraph) -> Self {
        let n = graph.num_accounts();
        Self {
            graph,
            scores: vec![0.0; n],
            tags: vec![BTreeSet::new(); n],
            first_ring: vec![None; n],
            rings: Vec::new(),
        }
    }

    fn resolve(&self, account: &str) -> Result<AccountIdx> {
        self.graph.require_index(account, Domain::Scoring)
    }

    fn next_ring_id(&self) -> String {
        ring_id(self.rings.len() + 1)
    }

    fn credit(&mut self, idx: AccountIdx, points: f64, tag: PatternTag) {
        self.scores[idx] += points;
        self.tags[idx].insert(tag);
    }

    fn join_ring(&mut self, idx: AccountIdx, ring: &str) {
        if self.first_ring[idx].is_none() {
            self.first_ring[idx] = Some(ring.to_string());
        }
    }
}

fn high_velocity(stats: &NodeStats, config: &ScoringConfig) -> bool {
    let n = stats.timestamps.len();
    if n < config.velocity_min_events || n < 2 {
        return false;
    }
    let (Some(first), Some(last)) = (
        stats.timestamps.iter().min(),
        stats.timestamps.iter().max(),
    ) else {
        return false;
    };
    let avg_ms = (last - first) as f64 / (n - 1) as f64;
    avg_ms > 0.0 && avg_ms < (config.velocity_max_avg_interval_secs * 1_000) as f64
}

fn degree_anomaly(stats: &NodeStats, config: &ScoringConfig) -> bool {
    if stats.in_degree == 0 || stats.out_degree == 0 {
        return false;
    }
    let hi = stats.in_degree.max(stats.out_degree) as f64;
    let lo = stats.in_degree.min(stats.out_degree) as f64;
    hi / lo > config.degree_ratio_threshold
}

fn pass_through(stats: &NodeStats, config: &ScoringConfig) -> bool {
    if stats.total_in <= 0.0 || stats.total_out <= 0.0 {
        return false;
    }
    let ratio = stats.total_in.min(stats.total_out) / stats.total_in.max(stats.total_out);
    ratio > config.pass_through_ratio && stats.tx_count >= config.pass_through_min_tx
}

/// Suspicion scoring kernel.
#[derive(Debug, Clone)]
pub struct SuspicionScorer {
    metadata: KernelMetadata,
    config: ScoringConfig,
}

impl Default for SuspicionScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspicionScorer {
    /// Create a new scorer with default weights.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ScoringConfig::default())
    }

    /// Create a scorer with the given weights.
    #[must_use]
    pub fn with_config(config: ScoringConfig) -> Self {
        Self {
            metadata: KernelMetadata::batch("scoring/suspicion", Domain::Scoring)
                .with_description("Composite suspicion scores and fraud ring assembly")
                .with_throughput(1_000_000)
                .with_latency_us(150.0),
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score every account and assemble rings.
    ///
    /// Fails with an invariant violation when a detection names an account
    /// the graph does not contain.
    pub fn compute(
        graph: &TransactionGraph,
        detections: &Detections,
        config: &ScoringConfig,
    ) -> Result<ScoreBoard> {
        let mut ledger = Ledger::new(graph);

        // 1. Cycles
        for cycle in &detections.cycles {
            let tag = PatternTag::cycle_length(cycle.len()).ok_or_else(|| {
                FlowError::invariant(
                    Domain::Scoring,
                    format!("cycle of {} accounts is outside 3..=5", cycle.len()),
                )
            })?;
            let id = ledger.next_ring_id();
            for account in &cycle.members {
                let idx = ledger.resolve(account)?;
                ledger.credit(idx, config.cycle_points, tag);
                ledger.join_ring(idx, &id);
            }
            ledger.rings.push(FraudRing {
                ring_id: id,
                member_accounts: cycle.members.clone(),
                pattern_type: PatternType::Cycle,
                risk_score: 0.0,
                cycle_length: Some(cycle.len()),
                temporal_score: None,
                hop_count: None,
            });
        }

        // 2. Smurfing
        for pattern in &detections.smurfing {
            let id = ledger.next_ring_id();
            let center = ledger.resolve(&pattern.center)?;
            ledger.credit(
                center,
                config.smurfing_center_points,
                PatternTag::center(pattern.pattern_type),
            );
            ledger.tags[center].insert(PatternTag::HighVelocity);
            ledger.join_ring(center, &id);

            let mut members = Vec::with_capacity(pattern.connected.len() + 1);
            members.push(pattern.center.clone());
            for account in &pattern.connected {
                let idx = ledger.resolve(account)?;
                ledger.credit(
                    idx,
                    config.smurfing_member_points,
                    PatternTag::member(pattern.pattern_type),
                );
                ledger.join_ring(idx, &id);
                members.push(account.clone());
            }

            ledger.rings.push(FraudRing {
                ring_id: id,
                member_accounts: members,
                pattern_type: pattern.pattern_type.into(),
                risk_score: 0.0,
                cycle_length: None,
                temporal_score: Some(pattern.temporal_score),
                hop_count: None,
            });
        }

        // 3. Shell chains
        for chain in &detections.shell_chains {
            let id = ledger.next_ring_id();
            for account in &chain.accounts {
                let idx = ledger.resolve(account)?;
                ledger.credit(idx, config.shell_points, PatternTag::ShellNetwork);
                if chain.intermediaries.contains(account) {
                    ledger.tags[idx].insert(PatternTag::ShellIntermediary);
                }
                ledger.join_ring(idx, &id);
            }
            ledger.rings.push(FraudRing {
                ring_id: id,
                member_accounts: chain.accounts.clone(),
                pattern_type: PatternType::ShellNetwork,
                risk_score: 0.0,
                cycle_length: None,
                temporal_score: None,
                hop_count: Some(chain.hop_count),
            });
        }

        // 4. Per-account factors
        for (idx, _, stats) in graph.iter() {
            if high_velocity(stats, config) {
                ledger.credit(idx, config.velocity_points, PatternTag::HighVelocity);
            }
            if degree_anomaly(stats, config) {
                ledger.credit(idx, config.degree_anomaly_points, PatternTag::DegreeAnomaly);
            }
            if pass_through(stats, config) {
                ledger.credit(idx, config.pass_through_points, PatternTag::PassThrough);
            }
        }

        // 5. Legitimacy discount
        for legit in &detections.legitimate {
            let idx = ledger.resolve(&legit.account_id)?;
            ledger.scores[idx] = (ledger.scores[idx] * config.legitimacy_discount).round_ties_even();
            ledger.tags[idx].insert(PatternTag::LikelyLegitimate);
        }

        // 6. Clamp
        for score in &mut ledger.scores {
            *score = round1(*score).clamp(0.0, config.max_score);
        }

        // 7. Ring risk
        for i in 0..ledger.rings.len() {
            let members = &ledger.rings[i].member_accounts;
            if members.is_empty() {
                continue;
            }
            let mut total = 0.0;
            for account in members {
                total += ledger.scores[ledger.resolve(account)?];
            }
            let mean = total / members.len() as f64;
            ledger.rings[i].risk_score = round1(mean);
        }

        let Ledger {
            scores,
            tags,
            first_ring,
            rings,
            ..
        } = ledger;
        let accounts: Vec<AccountScore> = graph
            .accounts()
            .iter()
            .zip(scores)
            .zip(tags)
            .zip(first_ring)
            .map(|(((account_id, score), tags), ring_id)| AccountScore {
                account_id: account_id.clone(),
                score,
                tags,
                ring_id,
            })
            .collect();

        debug!(
            accounts = accounts.len(),
            flagged = accounts.iter().filter(|a| a.score > 0.0).count(),
            rings = rings.len(),
            "suspicion scoring finished"
        );

        Ok(ScoreBoard { accounts, rings })
    }
}

impl AnalysisKernel for SuspicionScorer {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        let c = &self.config;
        if !(c.legitimacy_discount > 0.0 && c.legitimacy_discount <= 1.0) {
            return Err(FlowError::config("scoring.legitimacy_discount must be in (0, 1]"));
        }
        if c.max_score <= 0.0 {
            return Err(FlowError::config("scoring.max_score must be positive"));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchKernel<ScoringInput, ScoringOutput> for SuspicionScorer {
    async fn execute(&self, input: ScoringInput) -> Result<ScoringOutput> {
        self.validate()?;
        let start = Instant::now();
        let board = Self::compute(&input.graph, &input.detections, &self.config)?;
        Ok(ScoringOutput {
            board,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forensicflow_core::config::CycleConfig;
    use forensicflow_detect::cycles::CycleDetector;
    use forensicflow_detect::types::{
        Cycle, LegitimacyKind, LegitimateAccount, ShellChain, SmurfingPattern, SmurfingType,
    };
    use forensicflow_graph::builder::GraphBuilder;
    use forensicflow_graph::types::Transaction;
    use std::sync::Arc;

    const HOUR: i64 = 3_600;

    fn triangle() -> TransactionGraph {
        GraphBuilder::compute(&[
            Transaction::at_epoch("T1", "A", "B", 100.0, 0),
            Transaction::at_epoch("T2", "B", "C", 100.0, 2 * HOUR),
            Transaction::at_epoch("T3", "C", "A", 100.0, 4 * HOUR),
        ])
    }

    fn cycle(members: &[&str]) -> Cycle {
        Cycle {
            members: members.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn tags(board: &ScoreBoard, id: &str) -> Vec<&'static str> {
        board.get(id).unwrap().tags.iter().map(PatternTag::as_str).collect()
    }

    #[test]
    fn test_scorer_metadata() {
        let kernel = SuspicionScorer::new();
        assert_eq!(kernel.metadata().id, "scoring/suspicion");
        assert!(kernel.validate().is_ok());
    }

    #[test]
    fn test_rounding_ties_even() {
        assert_eq!(round1(26.25), 26.2);
        assert_eq!(round1(80.0 / 3.0), 26.7);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(12.5f64.round_ties_even(), 12.0);
    }

    #[test]
    fn test_cycle_scoring() {
        let g = triangle();
        let detections = Detections {
            cycles: vec![cycle(&["A", "B", "C"])],
            ..Default::default()
        };
        let board = SuspicionScorer::compute(&g, &detections, &ScoringConfig::default()).unwrap();

        for id in ["A", "B", "C"] {
            let account = board.get(id).unwrap();
            assert_eq!(account.score, 30.0);
            assert_eq!(account.ring_id.as_deref(), Some("RING_001"));
        }
        assert_eq!(tags(&board, "A"), vec!["cycle_length_3"]);
        assert_eq!(board.rings.len(), 1);
        assert_eq!(board.rings[0].risk_score, 30.0);
        assert_eq!(board.rings[0].cycle_length, Some(3));
    }

    #[test]
    fn test_scoring_on_deserialized_graph() {
        let json = serde_json::to_string(&triangle()).unwrap();
        let g: TransactionGraph = serde_json::from_str(&json).unwrap();

        let search = CycleDetector::compute(&g, &CycleConfig::default());
        assert_eq!(search.cycles.len(), 1);

        let detections = Detections {
            cycles: search.cycles,
            ..Default::default()
        };
        let board = SuspicionScorer::compute(&g, &detections, &ScoringConfig::default()).unwrap();
        assert_eq!(board.get("A").unwrap().score, 30.0);
        assert_eq!(board.rings.len(), 1);
    }

    #[test]
    fn test_first_ring_wins_and_discount() {
        let g = triangle();
        let detections = Detections {
            cycles: vec![cycle(&["A", "B", "C"])],
            smurfing: vec![SmurfingPattern {
                pattern_type: SmurfingType::FanIn,
                center: "A".to_string(),
                connected: vec!["B".to_string()],
                temporal_score: 0.9,
                total_amount: 100.0,
                transaction_count: 1,
            }],
            legitimate: vec![
                LegitimateAccount {
                    account_id: "A".to_string(),
                    kind: LegitimacyKind::Merchant,
                },
                LegitimateAccount {
                    account_id: "B".to_string(),
                    kind: LegitimacyKind::Merchant,
                },
            ],
            ..Default::default()
        };
        let board = SuspicionScorer::compute(&g, &detections, &ScoringConfig::default()).unwrap();

        // A: (30 + 25) * 0.5 = 27.5 -> 28; B: (30 + 15) * 0.5 = 22.5 -> 22.
        assert_eq!(board.get("A").unwrap().score, 28.0);
        assert_eq!(board.get("B").unwrap().score, 22.0);
        assert_eq!(board.get("C").unwrap().score, 30.0);
        assert_eq!(board.get("B").unwrap().ring_id.as_deref(), Some("RING_001"));
        assert_eq!(
            tags(&board, "A"),
            vec!["cycle_length_3", "fan_in", "high_velocity", "likely_legitimate"]
        );
        assert_eq!(
            tags(&board, "B"),
            vec!["cycle_length_3", "smurfing_fan_in", "likely_legitimate"]
        );

        assert_eq!(board.rings[0].risk_score, 26.7);
        assert_eq!(board.rings[1].ring_id, "RING_002");
        assert_eq!(board.rings[1].pattern_type, PatternType::FanIn);
        assert_eq!(board.rings[1].member_accounts, vec!["A", "B"]);
        assert_eq!(board.rings[1].risk_score, 25.0);
        assert_eq!(board.rings[1].temporal_score, Some(0.9));
    }

    #[test]
    fn test_shell_scoring() {
        let g = GraphBuilder::compute(&[
            Transaction::at_epoch("T1", "SRC", "S1", 1_000.0, 0),
            Transaction::at_epoch("T2", "S1", "S2", 990.0, 2 * HOUR),
            Transaction::at_epoch("T3", "S2", "DST", 980.0, 4 * HOUR),
        ]);
        let detections = Detections {
            shell_chains: vec![ShellChain {
                accounts: vec!["SRC".into(), "S1".into(), "S2".into(), "DST".into()],
                intermediaries: vec!["S1".into(), "S2".into()],
                hop_count: 3,
            }],
            ..Default::default()
        };
        let board = SuspicionScorer::compute(&g, &detections, &ScoringConfig::default()).unwrap();
        assert_eq!(board.get("SRC").unwrap().score, 20.0);
        assert_eq!(tags(&board, "SRC"), vec!["shell_network"]);
        assert_eq!(tags(&board, "S1"), vec!["shell_network", "shell_intermediary"]);
        assert_eq!(board.rings[0].pattern_type, PatternType::ShellNetwork);
        assert_eq!(board.rings[0].hop_count, Some(3));
    }

    #[test]
    fn test_velocity_factor() {
        let txs: Vec<Transaction> = (0..5)
            .map(|i| Transaction::at_epoch(format!("T{i}"), "X", format!("R{i}"), 10.0, i * 60))
            .collect();
        let g = GraphBuilder::compute(&txs);
        let board = SuspicionScorer::compute(&g, &Detections::default(), &ScoringConfig::default())
            .unwrap();
        assert_eq!(board.get("X").unwrap().score, 10.0);
        assert_eq!(tags(&board, "X"), vec!["high_velocity"]);
        assert_eq!(board.get("R0").unwrap().score, 0.0);
    }

    #[test]
    fn test_same_instant_is_not_velocity() {
        let txs: Vec<Transaction> = (0..6)
            .map(|i| Transaction::at_epoch(format!("T{i}"), "X", format!("R{i}"), 10.0, 0))
            .collect();
        let g = GraphBuilder::compute(&txs);
        let board = SuspicionScorer::compute(&g, &Detections::default(), &ScoringConfig::default())
            .unwrap();
        assert_eq!(board.get("X").unwrap().score, 0.0);
    }

    #[test]
    fn test_degree_anomaly_and_pass_through() {
        let mut txs: Vec<Transaction> = (0..6)
            .map(|i| Transaction::at_epoch(format!("I{i}"), format!("S{i}"), "Y", 100.0, i * 2 * HOUR))
            .collect();
        txs.push(Transaction::at_epoch("O1", "Y", "OUT", 100.0, 20 * HOUR));
        txs.push(Transaction::at_epoch("Z1", "P", "Z", 500.0, 0));
        txs.push(Transaction::at_epoch("Z2", "P", "Z", 500.0, 2 * HOUR));
        txs.push(Transaction::at_epoch("Z3", "Z", "Q", 480.0, 4 * HOUR));
        txs.push(Transaction::at_epoch("Z4", "Z", "Q", 480.0, 6 * HOUR));
        let g = GraphBuilder::compute(&txs);
        let board = SuspicionScorer::compute(&g, &Detections::default(), &ScoringConfig::default())
            .unwrap();

        assert_eq!(board.get("Y").unwrap().score, 10.0);
        assert_eq!(tags(&board, "Y"), vec!["degree_anomaly"]);
        assert_eq!(board.get("Z").unwrap().score, 5.0);
        assert_eq!(tags(&board, "Z"), vec!["pass_through"]);
    }

    #[test]
    fn test_score_capped() {
        let g = triangle();
        let detections = Detections {
            cycles: vec![cycle(&["A", "B", "C"]); 4],
            ..Default::default()
        };
        let board = SuspicionScorer::compute(&g, &detections, &ScoringConfig::default()).unwrap();
        assert_eq!(board.get("A").unwrap().score, 100.0);
        assert_eq!(board.rings.len(), 4);
        assert_eq!(board.rings[3].ring_id, "RING_004");
        assert!(board.rings.iter().all(|r| r.risk_score == 100.0));
    }

    #[test]
    fn test_unknown_account_is_invariant_violation() {
        let g = triangle();
        let detections = Detections {
            cycles: vec![cycle(&["A", "B", "GHOST"])],
            ..Default::default()
        };
        let err = SuspicionScorer::compute(&g, &detections, &ScoringConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            FlowError::InvariantViolation {
                domain: Domain::Scoring,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_scorer_execute() {
        let kernel = SuspicionScorer::new();
        let input = ScoringInput::new(
            Arc::new(triangle()),
            Detections {
                cycles: vec![cycle(&["B", "C", "A"])],
                ..Default::default()
            },
        );
        let out = kernel.execute(input).await.unwrap();
        assert_eq!(out.board.rings[0].member_accounts, vec!["B", "C", "A"]);
    }
}
