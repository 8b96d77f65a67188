//! Input record validation.
//!
//! Converts raw [`TransactionRecord`]s into typed [`Transaction`]s. The first
//! invalid row rejects the whole input; no row is silently dropped.

use crate::messages::{ValidationInput, ValidationOutput};
use crate::types::{Transaction, TransactionRecord};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use forensicflow_core::error::{FlowError, Result};
use forensicflow_core::traits::BatchKernel;
use forensicflow_core::{domain::Domain, kernel::KernelMetadata, traits::AnalysisKernel};
use std::time::Instant;
use tracing::debug;

/// Naive timestamp layouts, tried in order after RFC 3339.
pub const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

// ============================================================================
// Field Parsing
// ============================================================================

/// Parse a timestamp. Naive values are interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    })
}

/// Parse an amount, returning the rejection reason on failure.
pub fn parse_amount(raw: &str) -> std::result::Result<f64, &'static str> {
    let value: f64 = raw.trim().parse().map_err(|_| "not a number")?;
    if !value.is_finite() {
        return Err("not finite");
    }
    if value < 0.0 {
        return Err("negative");
    }
    Ok(value)
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Validate a single record. `row` is 1-based.
pub fn validate_record(row: usize, record: &TransactionRecord) -> Result<Transaction> {
    let id = present(&record.transaction_id);
    let sender = present(&record.sender_id);
    let receiver = present(&record.receiver_id);
    let amount = present(&record.amount);
    let timestamp = present(&record.timestamp);

    let missing: Vec<String> = [
        ("transaction_id", id.is_none()),
        ("sender_id", sender.is_none()),
        ("receiver_id", receiver.is_none()),
        ("amount", amount.is_none()),
        ("timestamp", timestamp.is_none()),
    ]
    .into_iter()
    .filter(|(_, absent)| *absent)
    .map(|(name, _)| name.to_string())
    .collect();

    let transaction_id = id.map(str::to_string);
    let (Some(id), Some(sender), Some(receiver), Some(amount), Some(timestamp)) =
        (id, sender, receiver, amount, timestamp)
    else {
        return Err(FlowError::MissingFields {
            row,
            transaction_id,
            fields: missing,
        });
    };

    let amount = parse_amount(amount).map_err(|reason| FlowError::InvalidAmount {
        row,
        transaction_id: transaction_id.clone(),
        value: amount.to_string(),
        reason: reason.to_string(),
    })?;

    let timestamp = parse_timestamp(timestamp).ok_or_else(|| FlowError::InvalidTimestamp {
        row,
        transaction_id: transaction_id.clone(),
        value: timestamp.to_string(),
    })?;

    Ok(Transaction::new(id, sender, receiver, amount, timestamp))
}

/// Validate every record, stopping at the first invalid one.
pub fn validate_records(records: &[TransactionRecord]) -> Result<Vec<Transaction>> {
    let transactions = records
        .iter()
        .enumerate()
        .map(|(i, record)| validate_record(i + 1, record))
        .collect::<Result<Vec<_>>>()?;
    debug!(records = transactions.len(), "validated transaction records");
    Ok(transactions)
}

// ============================================================================
// Record Validation Kernel
// ============================================================================

/// Record validation kernel.
///
/// Rejects the input on the first row with a missing field, a negative or
/// non-numeric amount, or an unparsable timestamp.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    metadata: KernelMetadata,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordValidator {
    /// Create a new record validator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: KernelMetadata::batch("graph/validate", Domain::GraphConstruction)
                .with_description("Transaction record validation and timestamp parsing")
                .with_throughput(2_000_000)
                .with_latency_us(5.0),
        }
    }

    /// Validate records.
    pub fn compute(records: &[TransactionRecord]) -> Result<Vec<Transaction>> {
        validate_records(records)
    }
}

impl AnalysisKernel for RecordValidator {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchKernel<ValidationInput, ValidationOutput> for RecordValidator {
    async fn execute(&self, input: ValidationInput) -> Result<ValidationOutput> {
        let start = Instant::now();
        let transactions = Self::compute(&input.records)?;
        Ok(ValidationOutput {
            transactions,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn record(id: &str, amount: &str, ts: &str) -> TransactionRecord {
        TransactionRecord::new(id, "A", "B", amount, ts)
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let iso = parse_timestamp("2024-03-05 14:30:00").unwrap();
        assert_eq!((iso.year(), iso.month(), iso.day()), (2024, 3, 5));
        assert_eq!((iso.hour(), iso.minute()), (14, 30));

        let day_first = parse_timestamp("05-03-2024 14:30").unwrap();
        assert_eq!(day_first, iso);

        let slashed = parse_timestamp("2024/03/05 14:30:00").unwrap();
        assert_eq!(slashed, iso);

        let t_sep = parse_timestamp("2024-03-05T14:30:00").unwrap();
        assert_eq!(t_sep, iso);

        let rfc = parse_timestamp("2024-03-05T16:30:00+02:00").unwrap();
        assert_eq!(rfc, iso);
    }

    #[test]
    fn test_month_first_fallback() {
        // Day 25 cannot be a month, so only the month-first layout matches.
        let ts = parse_timestamp("12-25-2024 08:00").unwrap();
        assert_eq!((ts.month(), ts.day()), (12, 25));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-45 99:00:00").is_none());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 125.50 "), Ok(125.5));
        assert_eq!(parse_amount("0"), Ok(0.0));
        assert_eq!(parse_amount("-3"), Err("negative"));
        assert_eq!(parse_amount("abc"), Err("not a number"));
        assert_eq!(parse_amount("inf"), Err("not finite"));
        assert_eq!(parse_amount("NaN"), Err("not finite"));
    }

    #[test]
    fn test_validate_records_ok() {
        let records = vec![
            record("T1", "100", "2024-01-01 10:00:00"),
            record("T2", "250.75", "2024-01-01 11:00:00"),
        ];
        let txs = validate_records(&records).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].id, "T2");
        assert_eq!(txs[1].amount, 250.75);
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let records = vec![
            record("T1", "100", "2024-01-01 10:00:00"),
            TransactionRecord {
                transaction_id: Some("T2".to_string()),
                sender_id: Some("  ".to_string()),
                receiver_id: Some("B".to_string()),
                amount: None,
                timestamp: Some("2024-01-01 10:00:00".to_string()),
            },
        ];
        match validate_records(&records) {
            Err(FlowError::MissingFields {
                row,
                transaction_id,
                fields,
            }) => {
                assert_eq!(row, 2);
                assert_eq!(transaction_id.as_deref(), Some("T2"));
                assert_eq!(fields, vec!["sender_id", "amount"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_first_bad_row_wins() {
        let records = vec![
            record("T1", "-5", "2024-01-01 10:00:00"),
            record("T2", "10", "never"),
        ];
        let err = validate_records(&records).unwrap_err();
        assert!(matches!(err, FlowError::InvalidAmount { row: 1, .. }));

        let err = validate_records(&records[1..]).unwrap_err();
        assert!(matches!(err, FlowError::InvalidTimestamp { row: 1, .. }));
    }

    #[test]
    fn test_empty_input() {
        assert!(validate_records(&[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validator_kernel() {
        let kernel = RecordValidator::new();
        assert_eq!(kernel.id(), "graph/validate");
        let out = kernel
            .execute(ValidationInput::new(vec![record(
                "T1",
                "1",
                "2024-01-01 00:00:00",
            )]))
            .await
            .unwrap();
        assert_eq!(out.transactions.len(), 1);
    }
}
