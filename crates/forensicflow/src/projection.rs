//! Node/edge projection for rendering.
//!
//! Large graphs are pruned: ring members and suspicious accounts always stay,
//! remaining slots go to the busiest accounts, then a little context around
//! high-risk accounts is added. Edges between kept accounts are aggregated per
//! (sender, receiver) pair and capped.

use crate::report::AnalysisReport;
use forensicflow_core::config::ProjectionConfig;
use forensicflow_graph::graph::TransactionGraph;
use forensicflow_scoring::scorer::{round1, round2};
use forensicflow_scoring::types::{PatternTag, ScoreBoard};
use serde::{Deserialize, Serialize};
use hashbrown::HashMap;

/// Node category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Member of at least one ring.
    Ring,
    /// Positive score, no ring.
    Suspicious,
    /// Everything else.
    Normal,
}

/// A rendered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionNode {
    /// Account id.
    pub id: String,
    /// Category.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Final score.
    pub score: f64,
    /// Incoming transfers.
    pub in_degree: usize,
    /// Outgoing transfers.
    pub out_degree: usize,
    /// Incoming volume, two decimals.
    pub total_in: f64,
    /// Outgoing volume, two decimals.
    pub total_out: f64,
    /// Transfers touching the account.
    pub tx_count: usize,
    /// First ring.
    pub ring_id: Option<String>,
    /// Pattern tags.
    pub patterns: Vec<PatternTag>,
    /// Display size, grows with log volume up to 50.
    pub size_val: f64,
}

/// An aggregated sender to receiver flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionEdge {
    /// `sender->receiver`.
    pub id: String,
    /// Sender.
    pub source: String,
    /// Receiver.
    pub target: String,
    /// Summed amount, two decimals.
    pub total_amount: f64,
    /// Number of transfers.
    pub tx_count: usize,
    /// Both ends suspicious, or both ends ring members.
    pub suspicious: bool,
    /// Larger endpoint score, one decimal.
    pub suspicion_score: f64,
    /// Display weight in [1, 5].
    pub weight: f64,
}

/// Pruned graph view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphProjection {
    /// Rendered accounts, in account-list order.
    pub nodes: Vec<ProjectionNode>,
    /// Rendered flows.
    pub edges: Vec<ProjectionEdge>,
    /// Accounts in the full graph.
    pub total_nodes: usize,
    /// Accounts rendered.
    pub rendered_nodes: usize,
    /// True when pruning applied.
    pub is_filtered: bool,
}

struct Selection {
    keep: Vec<bool>,
    count: usize,
}

impl Selection {
    fn new(n: usize) -> Self {
        Self {
            keep: vec![false; n],
            count: 0,
        }
    }

    fn add(&mut self, idx: usize) {
        if !self.keep[idx] {
            self.keep[idx] = true;
            self.count += 1;
        }
    }
}

impl GraphProjection {
    /// Build the projection from the final scores and report.
    pub fn build(
        graph: &TransactionGraph,
        board: &ScoreBoard,
        report: &AnalysisReport,
        config: &ProjectionConfig,
    ) -> Self {
        let n = graph.num_accounts();

        let mut in_ring = vec![false; n];
        for ring in &board.rings {
            for member in &ring.member_accounts {
                if let Some(idx) = graph.index_of(member) {
                    in_ring[idx] = true;
                }
            }
        }
        let suspicious: Vec<bool> = (0..n)
            .map(|i| board.accounts.get(i).is_some_and(|a| a.score > 0.0))
            .collect();
        let score = |i: usize| board.accounts.get(i).map_or(0.0, |a| a.score);

        let is_filtered = n > config.max_nodes;
        let mut selection = Selection::new(n);
        if is_filtered {
            for idx in 0..n {
                if in_ring[idx] || suspicious[idx] {
                    selection.add(idx);
                }
            }

            if selection.count < config.max_nodes {
                let slots = config.max_nodes - selection.count;
                let mut others: Vec<usize> = (0..n).filter(|&i| !selection.keep[i]).collect();
                others.sort_by(|&a, &b| {
                    graph
                        .stats(b)
                        .total_degree()
                        .cmp(&graph.stats(a).total_degree())
                });
                for idx in others.into_iter().take(slots) {
                    selection.add(idx);
                }
            }

            let ceiling = config.max_nodes + config.neighbor_buffer;
            for account in report
                .suspicious_accounts
                .iter()
                .filter(|a| a.suspicion_score >= config.high_risk_score)
            {
                if selection.count >= ceiling {
                    break;
                }
                let Some(idx) = graph.index_of(&account.account_id) else {
                    continue;
                };
                for edge in graph.outgoing(idx).iter().take(config.max_neighbors) {
                    selection.add(edge.counterparty);
                }
                for edge in graph.incoming(idx).iter().take(config.max_neighbors) {
                    selection.add(edge.counterparty);
                }
            }
        } else {
            for idx in 0..n {
                selection.add(idx);
            }
        }

        let nodes: Vec<ProjectionNode> = graph
            .iter()
            .filter(|(idx, _, _)| selection.keep[*idx])
            .map(|(idx, id, stats)| {
                let kind = if in_ring[idx] {
                    NodeKind::Ring
                } else if suspicious[idx] {
                    NodeKind::Suspicious
                } else {
                    NodeKind::Normal
                };
                let volume = stats.total_in + stats.total_out;
                let entry = board.accounts.get(idx);
                ProjectionNode {
                    id: id.to_string(),
                    kind,
                    score: score(idx),
                    in_degree: stats.in_degree,
                    out_degree: stats.out_degree,
                    total_in: round2(stats.total_in),
                    total_out: round2(stats.total_out),
                    tx_count: stats.tx_count,
                    ring_id: entry.and_then(|a| a.ring_id.clone()),
                    patterns: entry.map(|a| a.tags.iter().copied().collect()).unwrap_or_default(),
                    size_val: round1((20.0 + (volume + 1.0).log2() * 3.0).min(50.0)),
                }
            })
            .collect();

        // (sender, receiver) -> (amount, count), in first-seen order.
        let mut pair_index: HashMap<(usize, usize), usize> = HashMap::new();
        let mut pairs: Vec<(usize, usize, f64, usize)> = Vec::new();
        for sender in (0..n).filter(|&i| selection.keep[i]) {
            for edge in graph.outgoing(sender) {
                let receiver = edge.counterparty;
                if !selection.keep[receiver] {
                    continue;
                }
                let slot = *pair_index.entry((sender, receiver)).or_insert_with(|| {
                    pairs.push((sender, receiver, 0.0, 0));
                    pairs.len() - 1
                });
                pairs[slot].2 += edge.amount;
                pairs[slot].3 += 1;
            }
        }

        if pairs.len() > config.max_edges {
            let flagged = |i: usize| suspicious[i] || in_ring[i];
            pairs.sort_by(|a, b| {
                let a_low = !(flagged(a.0) || flagged(a.1));
                let b_low = !(flagged(b.0) || flagged(b.1));
                a_low.cmp(&b_low).then_with(|| b.2.total_cmp(&a.2))
            });
            pairs.truncate(config.max_edges);
        }

        let edges = pairs
            .into_iter()
            .map(|(s, r, total, count)| {
                let source = graph.account_id(s).to_string();
                let target = graph.account_id(r).to_string();
                ProjectionEdge {
                    id: format!("{source}->{target}"),
                    suspicious: (suspicious[s] && suspicious[r]) || (in_ring[s] && in_ring[r]),
                    suspicion_score: round1(score(s).max(score(r))),
                    weight: round2(((total + 1.0).log2() * 0.5).clamp(1.0, 5.0)),
                    total_amount: round2(total),
                    tx_count: count,
                    source,
                    target,
                }
            })
            .collect();

        Self {
            rendered_nodes: nodes.len(),
            nodes,
            edges,
            total_nodes: n,
            is_filtered,
        }
    }
}
