//! Analysis report and diagnostics.

use crate::pipeline::Stage;
use crate::projection::GraphProjection;
use forensicflow_core::error::Result;
use forensicflow_detect::types::TruncationReason;
use forensicflow_scoring::scorer::round2;
use forensicflow_scoring::types::{FraudRing, PatternTag, ScoreBoard};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Report
// ============================================================================

/// One flagged account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    /// Account id.
    pub account_id: String,
    /// Score in (0, 100].
    pub suspicion_score: f64,
    /// Pattern tags.
    pub detected_patterns: Vec<PatternTag>,
    /// First ring the account belongs to; serialized as `null` when absent.
    pub ring_id: Option<String>,
}

/// Aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Distinct accounts in the graph.
    pub total_accounts_analyzed: usize,
    /// Transactions ingested.
    pub total_transactions: usize,
    /// Accounts with a positive score.
    pub suspicious_accounts_flagged: usize,
    /// Rings produced.
    pub fraud_rings_detected: usize,
    /// Wall time, two decimals.
    pub processing_time_seconds: f64,
}

/// The analysis output object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Flagged accounts, highest score first.
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    /// Rings, highest risk first.
    pub fraud_rings: Vec<FraudRing>,
    /// Aggregate counts.
    pub summary: Summary,
}

impl AnalysisReport {
    /// Assemble the report from final scores.
    ///
    /// Sorting is stable: equal scores keep account-list order and equal
    /// risks keep ring id order.
    pub fn assemble(board: &ScoreBoard, total_transactions: usize, elapsed: Duration) -> Self {
        let mut suspicious_accounts: Vec<SuspiciousAccount> = board
            .accounts
            .iter()
            .filter(|a| a.score > 0.0)
            .map(|a| SuspiciousAccount {
                account_id: a.account_id.clone(),
                suspicion_score: a.score,
                detected_patterns: a.tags.iter().copied().collect(),
                ring_id: a.ring_id.clone(),
            })
            .collect();
        suspicious_accounts.sort_by(|a, b| b.suspicion_score.total_cmp(&a.suspicion_score));

        let mut fraud_rings = board.rings.clone();
        fraud_rings.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));

        Self {
            summary: Summary {
                total_accounts_analyzed: board.accounts.len(),
                total_transactions,
                suspicious_accounts_flagged: suspicious_accounts.len(),
                fraud_rings_detected: fraud_rings.len(),
                processing_time_seconds: round2(elapsed.as_secs_f64()),
            },
            suspicious_accounts,
            fraud_rings,
        }
    }

    /// Compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Timing and output size of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    /// Stage.
    pub stage: Stage,
    /// Wall time in microseconds.
    pub elapsed_us: u64,
    /// Items the stage produced.
    pub items: usize,
}

/// Run diagnostics that are not part of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Why the cycle search stopped early, if it did.
    pub cycle_truncation: Option<TruncationReason>,
    /// Cycle search start candidates.
    pub cycle_candidates: usize,
    /// Cycle search starts actually walked.
    pub cycle_starts_searched: usize,
    /// Per-stage timings, in completion order.
    pub stages: Vec<StageTiming>,
}

impl Diagnostics {
    /// Record a finished stage.
    pub fn record(&mut self, stage: Stage, elapsed: Duration, items: usize) {
        self.stages.push(StageTiming {
            stage,
            elapsed_us: elapsed.as_micros() as u64,
            items,
        });
    }

    /// Timing entry for a stage.
    pub fn stage(&self, stage: Stage) -> Option<&StageTiming> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Full result of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// The report.
    pub report: AnalysisReport,
    /// Run diagnostics.
    pub diagnostics: Diagnostics,
    /// Node/edge projection, when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<GraphProjection>,
}
