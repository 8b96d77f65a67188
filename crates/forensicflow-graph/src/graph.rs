//! Directed transfer graph.
//!
//! Accounts are interned to dense indices in first-seen order. That order is
//! the canonical account list every downstream stage iterates in.

use crate::types::{AccountIdx, Edge, NodeStats, Transaction};
use forensicflow_core::domain::Domain;
use forensicflow_core::error::{FlowError, Result};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Immutable directed multigraph of transfers.
///
/// Deserialization rebuilds the id lookup and checks that the adjacency
/// tables agree with the account list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphRepr")]
pub struct TransactionGraph {
    /// Account ids by index, in first-seen order.
    accounts: Vec<String>,
    /// Account id to index.
    #[serde(skip)]
    index: HashMap<String, AccountIdx>,
    /// Outgoing transfers per account, in input order.
    outgoing: Vec<Vec<Edge>>,
    /// Incoming transfers per account, in input order.
    incoming: Vec<Vec<Edge>>,
    /// Per-account statistics.
    stats: Vec<NodeStats>,
    /// Number of transfers ingested.
    transaction_count: usize,
}

impl TransactionGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with room for the given number of accounts.
    pub fn with_capacity(accounts: usize) -> Self {
        Self {
            accounts: Vec::with_capacity(accounts),
            index: HashMap::with_capacity(accounts),
            outgoing: Vec::with_capacity(accounts),
            incoming: Vec::with_capacity(accounts),
            stats: Vec::with_capacity(accounts),
            transaction_count: 0,
        }
    }

    fn intern(&mut self, id: &str) -> AccountIdx {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.accounts.len();
        self.accounts.push(id.to_string());
        self.index.insert(id.to_string(), idx);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.stats.push(NodeStats::default());
        idx
    }

    /// Append one transfer, updating both endpoints' adjacency and statistics.
    pub fn add_transaction(&mut self, tx: &Transaction) {
        let sender = self.intern(&tx.sender_id);
        let receiver = self.intern(&tx.receiver_id);
        let ts = tx.epoch_ms();

        self.outgoing[sender].push(Edge {
            counterparty: receiver,
            amount: tx.amount,
            timestamp_ms: ts,
            tx_id: tx.id.clone(),
        });
        self.incoming[receiver].push(Edge {
            counterparty: sender,
            amount: tx.amount,
            timestamp_ms: ts,
            tx_id: tx.id.clone(),
        });

        let s = &mut self.stats[sender];
        s.out_degree += 1;
        s.total_out += tx.amount;
        s.tx_count += 1;
        s.timestamps.push(ts);

        let r = &mut self.stats[receiver];
        r.in_degree += 1;
        r.total_in += tx.amount;
        r.tx_count += 1;
        r.timestamps.push(ts);

        self.transaction_count += 1;
    }

    /// Number of distinct accounts.
    pub fn num_accounts(&self) -> usize {
        self.accounts.len()
    }

    /// Number of transfers.
    pub fn num_transactions(&self) -> usize {
        self.transaction_count
    }

    /// True when no transfer has been ingested.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Account ids in first-seen order.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Account id for an index.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of range.
    pub fn account_id(&self, idx: AccountIdx) -> &str {
        &self.accounts[idx]
    }

    /// Index for an account id.
    pub fn index_of(&self, id: &str) -> Option<AccountIdx> {
        self.index.get(id).copied()
    }

    /// Index for an account id, or an invariant violation raised on behalf
    /// of `domain` when the account is unknown.
    pub fn require_index(&self, id: &str, domain: Domain) -> Result<AccountIdx> {
        self.index_of(id).ok_or_else(|| {
            FlowError::invariant(domain, format!("account {id:?} is not in the graph"))
        })
    }

    /// Outgoing transfers, in input order.
    pub fn outgoing(&self, idx: AccountIdx) -> &[Edge] {
        &self.outgoing[idx]
    }

    /// Incoming transfers, in input order.
    pub fn incoming(&self, idx: AccountIdx) -> &[Edge] {
        &self.incoming[idx]
    }

    /// Statistics of an account.
    pub fn stats(&self, idx: AccountIdx) -> &NodeStats {
        &self.stats[idx]
    }

    /// Distinct receivers, in order of first transfer.
    pub fn successors(&self, idx: AccountIdx) -> Vec<AccountIdx> {
        unique_counterparties(&self.outgoing[idx])
    }

    /// Distinct senders, in order of first transfer.
    pub fn predecessors(&self, idx: AccountIdx) -> Vec<AccountIdx> {
        unique_counterparties(&self.incoming[idx])
    }

    /// Iterate `(index, id, stats)` in account-list order.
    pub fn iter(&self) -> impl Iterator<Item = (AccountIdx, &str, &NodeStats)> + '_ {
        self.accounts
            .iter()
            .zip(self.stats.iter())
            .enumerate()
            .map(|(idx, (id, stats))| (idx, id.as_str(), stats))
    }
}

/// Serialized form of [`TransactionGraph`], without the id lookup.
#[derive(Deserialize)]
struct GraphRepr {
    accounts: Vec<String>,
    outgoing: Vec<Vec<Edge>>,
    incoming: Vec<Vec<Edge>>,
    stats: Vec<NodeStats>,
    transaction_count: usize,
}

impl TryFrom<GraphRepr> for TransactionGraph {
    type Error = String;

    fn try_from(repr: GraphRepr) -> std::result::Result<Self, Self::Error> {
        let n = repr.accounts.len();
        if repr.outgoing.len() != n || repr.incoming.len() != n || repr.stats.len() != n {
            return Err(format!(
                "graph tables disagree: {n} accounts, {} outgoing, {} incoming, {} stats",
                repr.outgoing.len(),
                repr.incoming.len(),
                repr.stats.len()
            ));
        }
        let out_of_range = repr
            .outgoing
            .iter()
            .chain(repr.incoming.iter())
            .flatten()
            .find(|e| e.counterparty >= n);
        if let Some(edge) = out_of_range {
            return Err(format!(
                "edge {} points at account index {} of {n}",
                edge.tx_id, edge.counterparty
            ));
        }

        let mut index = HashMap::with_capacity(n);
        for (idx, id) in repr.accounts.iter().enumerate() {
            if index.insert(id.clone(), idx).is_some() {
                return Err(format!("duplicate account {id:?}"));
            }
        }

        Ok(Self {
            accounts: repr.accounts,
            index,
            outgoing: repr.outgoing,
            incoming: repr.incoming,
            stats: repr.stats,
            transaction_count: repr.transaction_count,
        })
    }
}

fn unique_counterparties(edges: &[Edge]) -> Vec<AccountIdx> {
    let mut seen = hashbrown::HashSet::with_capacity(edges.len());
    edges
        .iter()
        .map(|e| e.counterparty)
        .filter(|c| seen.insert(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str, f64, i64)]) -> TransactionGraph {
        let mut g = TransactionGraph::new();
        for (i, (s, r, amount, secs)) in edges.iter().enumerate() {
            g.add_transaction(&Transaction::at_epoch(format!("T{i}"), *s, *r, *amount, *secs));
        }
        g
    }

    #[test]
    fn test_first_seen_order() {
        let g = graph(&[("C", "A", 1.0, 0), ("B", "C", 2.0, 10), ("A", "D", 3.0, 20)]);
        assert_eq!(g.accounts(), &["C", "A", "B", "D"]);
        assert_eq!(g.index_of("B"), Some(2));
        assert_eq!(g.account_id(3), "D");
        assert_eq!(g.num_transactions(), 3);
    }

    #[test]
    fn test_stats_and_adjacency() {
        let g = graph(&[("A", "B", 10.0, 0), ("A", "B", 5.0, 60), ("B", "C", 12.0, 120)]);
        let a = g.index_of("A").unwrap();
        let b = g.index_of("B").unwrap();

        let sa = g.stats(a);
        assert_eq!((sa.in_degree, sa.out_degree, sa.tx_count), (0, 2, 2));
        assert_eq!(sa.total_out, 15.0);

        let sb = g.stats(b);
        assert_eq!((sb.in_degree, sb.out_degree, sb.tx_count), (2, 1, 3));
        assert_eq!(sb.total_in, 15.0);
        assert_eq!(sb.total_out, 12.0);
        assert_eq!(sb.timestamps, vec![0, 60_000, 120_000]);

        assert_eq!(g.outgoing(a).len(), 2);
        assert_eq!(g.successors(a), vec![b]);
        assert_eq!(g.predecessors(b), vec![a]);
        assert_eq!(g.incoming(b)[1].tx_id, "T1");
    }

    #[test]
    fn test_self_transfer() {
        let g = graph(&[("A", "A", 7.0, 0)]);
        let stats = g.stats(0);
        assert_eq!((stats.in_degree, stats.out_degree, stats.tx_count), (1, 1, 2));
        assert_eq!(g.num_accounts(), 1);
    }

    #[test]
    fn test_require_index() {
        let g = graph(&[("A", "B", 1.0, 0)]);
        assert_eq!(g.require_index("A", Domain::Scoring).unwrap(), 0);
        let err = g.require_index("Z", Domain::Scoring).unwrap_err();
        assert!(matches!(err, FlowError::InvariantViolation { .. }));
    }

    #[test]
    fn test_serde_roundtrip_restores_lookup() {
        let g = graph(&[("A", "B", 1.0, 0), ("B", "C", 1.0, 1)]);
        let json = serde_json::to_string(&g).unwrap();
        let back: TransactionGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index_of("C"), Some(2));
        assert_eq!(back.require_index("A", Domain::Scoring).unwrap(), 0);
        assert_eq!(back.accounts(), g.accounts());
        assert_eq!(back.successors(1), g.successors(1));
        assert_eq!(back.num_transactions(), 2);
    }

    #[test]
    fn test_deserialize_rejects_inconsistent_graph() {
        let g = graph(&[("A", "B", 1.0, 0)]);
        let mut value = serde_json::to_value(&g).unwrap();

        let mut duplicated = value.clone();
        duplicated["accounts"] = serde_json::json!(["A", "A"]);
        let err = serde_json::from_value::<TransactionGraph>(duplicated).unwrap_err();
        assert!(err.to_string().contains("duplicate account"));

        value["stats"].as_array_mut().unwrap().pop();
        let err = serde_json::from_value::<TransactionGraph>(value).unwrap_err();
        assert!(err.to_string().contains("graph tables disagree"));
    }
}
