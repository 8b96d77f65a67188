//! Detector result types.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Cycle Types
// ============================================================================

/// A directed loop of distinct accounts, in the order the search walked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Member accounts, starting at the search's start node.
    pub members: Vec<String>,
}

impl Cycle {
    /// Number of accounts (and edges) in the loop.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True for an empty cycle.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Rotation of the members that starts at the smallest account id.
    pub fn canonical(&self) -> Vec<&str> {
        let Some(pivot) = self
            .members
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        else {
            return Vec::new();
        };
        self.members[pivot..]
            .iter()
            .chain(self.members[..pivot].iter())
            .map(String::as_str)
            .collect()
    }
}

/// Why a cycle search stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    /// The wall-clock deadline expired.
    Timeout,
    /// The configured cycle cap was reached.
    CycleLimit,
}

impl fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TruncationReason::Timeout => write!(f, "timeout"),
            TruncationReason::CycleLimit => write!(f, "cycle_limit"),
        }
    }
}

/// Result of a bounded cycle search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleSearchResult {
    /// Distinct cycles, in discovery order.
    pub cycles: Vec<Cycle>,
    /// Set when the search stopped before exhausting its start nodes.
    pub truncated: Option<TruncationReason>,
    /// Start nodes eligible for the search.
    pub candidates: usize,
    /// Start nodes whose walk ran.
    pub starts_searched: usize,
}

// ============================================================================
// Smurfing Types
// ============================================================================

/// Direction of a smurfing concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmurfingType {
    /// Many senders to one receiver.
    FanIn,
    /// One sender to many receivers.
    FanOut,
}

impl SmurfingType {
    /// Wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SmurfingType::FanIn => "fan_in",
            SmurfingType::FanOut => "fan_out",
        }
    }
}

impl fmt::Display for SmurfingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fan-in or fan-out concentration around one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmurfingPattern {
    /// Direction.
    pub pattern_type: SmurfingType,
    /// Center account.
    pub center: String,
    /// Unique counterparties, in first-seen order.
    pub connected: Vec<String>,
    /// Share of transfers inside the busiest window, in (0, 1].
    pub temporal_score: f64,
    /// Sum of the concentrated transfer amounts.
    pub total_amount: f64,
    /// Number of concentrated transfers.
    pub transaction_count: usize,
}

// ============================================================================
// Shell Network Types
// ============================================================================

/// A layering chain through low-activity intermediaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellChain {
    /// Accounts along the chain.
    pub accounts: Vec<String>,
    /// Shell accounts strictly between the first and last member.
    pub intermediaries: Vec<String>,
    /// Number of transfers along the chain.
    pub hop_count: usize,
}

// ============================================================================
// Legitimacy Types
// ============================================================================

/// Benign high-volume profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegitimacyKind {
    /// Many similar incoming payments, few outgoing.
    Merchant,
    /// Many similar outgoing payments, few incoming.
    Payroll,
}

/// An account matching a legitimate profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegitimateAccount {
    /// Account id.
    pub account_id: String,
    /// Matched profile.
    pub kind: LegitimacyKind,
}
