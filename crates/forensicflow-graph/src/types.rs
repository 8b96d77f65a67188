//! Transaction and graph element types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Dense account index, assigned in first-seen order.
pub type AccountIdx = usize;

// ============================================================================
// Transaction Types
// ============================================================================

/// A validated monetary transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: String,
    /// Sending account.
    pub sender_id: String,
    /// Receiving account.
    pub receiver_id: String,
    /// Non-negative amount.
    pub amount: f64,
    /// Absolute instant of the transfer.
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction.
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            amount,
            timestamp,
        }
    }

    /// Create a transaction from Unix epoch seconds, or `None` when the
    /// epoch is outside the representable range.
    pub fn from_epoch(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        amount: f64,
        epoch_secs: i64,
    ) -> Option<Self> {
        let timestamp = Utc.timestamp_opt(epoch_secs, 0).single()?;
        Some(Self::new(id, sender_id, receiver_id, amount, timestamp))
    }

    /// Fixture constructor for tests and benchmarks.
    ///
    /// Out-of-range epochs are clamped to the Unix epoch; use
    /// [`Transaction::from_epoch`] for untrusted input.
    pub fn at_epoch(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        amount: f64,
        epoch_secs: i64,
    ) -> Self {
        let timestamp = Utc
            .timestamp_opt(epoch_secs, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self::new(id, sender_id, receiver_id, amount, timestamp)
    }

    /// Timestamp as Unix epoch milliseconds.
    pub fn epoch_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// A raw input record as supplied by the upload/parsing collaborator.
///
/// Every field is optional so that absence can be reported precisely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction ID.
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Sending account.
    #[serde(default)]
    pub sender_id: Option<String>,
    /// Receiving account.
    #[serde(default)]
    pub receiver_id: Option<String>,
    /// Amount as text; JSON numbers are accepted as well.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<String>,
    /// Timestamp as text.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl TransactionRecord {
    /// Create a fully populated record.
    pub fn new(
        transaction_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        amount: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            sender_id: Some(sender_id.into()),
            receiver_id: Some(receiver_id.into()),
            amount: Some(amount.into()),
            timestamp: Some(timestamp.into()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientAmount {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<LenientAmount>::deserialize(deserializer)?.map(|v| match v {
            LenientAmount::Int(i) => i.to_string(),
            LenientAmount::Float(f) => f.to_string(),
            LenientAmount::Text(s) => s,
        }),
    )
}

// ============================================================================
// Graph Types
// ============================================================================

/// One directed transfer as seen from an account's adjacency list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// The other account (receiver for outgoing, sender for incoming).
    pub counterparty: AccountIdx,
    /// Transfer amount.
    pub amount: f64,
    /// Unix epoch milliseconds.
    pub timestamp_ms: i64,
    /// Originating transaction ID.
    pub tx_id: String,
}

/// Per-account statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Number of incoming transfers.
    pub in_degree: usize,
    /// Number of outgoing transfers.
    pub out_degree: usize,
    /// Sum of incoming amounts.
    pub total_in: f64,
    /// Sum of outgoing amounts.
    pub total_out: f64,
    /// Transfers touching this account (in + out).
    pub tx_count: usize,
    /// Epoch milliseconds of every transfer touching this account, in input order.
    pub timestamps: Vec<i64>,
}

impl NodeStats {
    /// True when the account both sends and receives.
    pub fn is_bidirectional(&self) -> bool {
        self.in_degree > 0 && self.out_degree > 0
    }

    /// In-degree plus out-degree.
    pub fn total_degree(&self) -> usize {
        self.in_degree + self.out_degree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accepts_numeric_amount() {
        let record: TransactionRecord = serde_json::from_str(
            r#"{"transaction_id":"T1","sender_id":"A","receiver_id":"B","amount":250.5,"timestamp":"2024-01-01 10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(record.amount.as_deref(), Some("250.5"));

        let record: TransactionRecord =
            serde_json::from_str(r#"{"transaction_id":"T2","amount":"12"}"#).unwrap();
        assert_eq!(record.amount.as_deref(), Some("12"));
        assert_eq!(record.sender_id, None);
    }

    #[test]
    fn test_transaction_epoch() {
        let tx = Transaction::at_epoch("T1", "A", "B", 10.0, 3_600);
        assert_eq!(tx.epoch_ms(), 3_600_000);
    }

    #[test]
    fn test_from_epoch_range() {
        let tx = Transaction::from_epoch("T1", "A", "B", 10.0, 1_704_067_200).unwrap();
        assert_eq!(tx.timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        assert!(Transaction::from_epoch("T2", "A", "B", 10.0, i64::MAX).is_none());
        assert_eq!(Transaction::at_epoch("T2", "A", "B", 10.0, i64::MAX).epoch_ms(), 0);
    }

    #[test]
    fn test_node_stats_helpers() {
        let stats = NodeStats {
            in_degree: 2,
            out_degree: 1,
            ..Default::default()
        };
        assert!(stats.is_bidirectional());
        assert_eq!(stats.total_degree(), 3);
        assert!(!NodeStats::default().is_bidirectional());
    }
}
