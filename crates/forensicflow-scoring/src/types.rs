//! Scoring types.

use forensicflow_detect::types::{Cycle, LegitimateAccount, ShellChain, SmurfingPattern, SmurfingType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Pattern Tags
// ============================================================================

/// Pattern tag attached to an account.
///
/// Declaration order is the order tags are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatternTag {
    /// Member of a 3-account cycle.
    #[serde(rename = "cycle_length_3")]
    CycleLength3,
    /// Member of a 4-account cycle.
    #[serde(rename = "cycle_length_4")]
    CycleLength4,
    /// Member of a 5-account cycle.
    #[serde(rename = "cycle_length_5")]
    CycleLength5,
    /// Center of a fan-in.
    #[serde(rename = "fan_in")]
    FanIn,
    /// Center of a fan-out.
    #[serde(rename = "fan_out")]
    FanOut,
    /// Rapid transfer activity.
    #[serde(rename = "high_velocity")]
    HighVelocity,
    /// Sender into a fan-in.
    #[serde(rename = "smurfing_fan_in")]
    SmurfingFanIn,
    /// Receiver of a fan-out.
    #[serde(rename = "smurfing_fan_out")]
    SmurfingFanOut,
    /// Member of a shell chain.
    #[serde(rename = "shell_network")]
    ShellNetwork,
    /// Shell account inside a chain.
    #[serde(rename = "shell_intermediary")]
    ShellIntermediary,
    /// Strongly skewed in/out degree.
    #[serde(rename = "degree_anomaly")]
    DegreeAnomaly,
    /// Forwards almost everything it receives.
    #[serde(rename = "pass_through")]
    PassThrough,
    /// Matches a merchant or payroll profile.
    #[serde(rename = "likely_legitimate")]
    LikelyLegitimate,
}

impl PatternTag {
    /// Wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PatternTag::CycleLength3 => "cycle_length_3",
            PatternTag::CycleLength4 => "cycle_length_4",
            PatternTag::CycleLength5 => "cycle_length_5",
            PatternTag::FanIn => "fan_in",
            PatternTag::FanOut => "fan_out",
            PatternTag::HighVelocity => "high_velocity",
            PatternTag::SmurfingFanIn => "smurfing_fan_in",
            PatternTag::SmurfingFanOut => "smurfing_fan_out",
            PatternTag::ShellNetwork => "shell_network",
            PatternTag::ShellIntermediary => "shell_intermediary",
            PatternTag::DegreeAnomaly => "degree_anomaly",
            PatternTag::PassThrough => "pass_through",
            PatternTag::LikelyLegitimate => "likely_legitimate",
        }
    }

    /// Tag for a cycle of `len` accounts.
    pub const fn cycle_length(len: usize) -> Option<Self> {
        match len {
            3 => Some(PatternTag::CycleLength3),
            4 => Some(PatternTag::CycleLength4),
            5 => Some(PatternTag::CycleLength5),
            _ => None,
        }
    }

    /// Tag for the center of a smurfing pattern.
    pub const fn center(kind: SmurfingType) -> Self {
        match kind {
            SmurfingType::FanIn => PatternTag::FanIn,
            SmurfingType::FanOut => PatternTag::FanOut,
        }
    }

    /// Tag for the counterparties of a smurfing pattern.
    pub const fn member(kind: SmurfingType) -> Self {
        match kind {
            SmurfingType::FanIn => PatternTag::SmurfingFanIn,
            SmurfingType::FanOut => PatternTag::SmurfingFanOut,
        }
    }
}

impl fmt::Display for PatternTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Fraud Rings
// ============================================================================

/// Pattern that produced a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Directed cycle.
    Cycle,
    /// Fan-in concentration.
    FanIn,
    /// Fan-out concentration.
    FanOut,
    /// Shell layering chain.
    ShellNetwork,
}

impl PatternType {
    /// Wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PatternType::Cycle => "cycle",
            PatternType::FanIn => "fan_in",
            PatternType::FanOut => "fan_out",
            PatternType::ShellNetwork => "shell_network",
        }
    }
}

impl From<SmurfingType> for PatternType {
    fn from(kind: SmurfingType) -> Self {
        match kind {
            SmurfingType::FanIn => PatternType::FanIn,
            SmurfingType::FanOut => PatternType::FanOut,
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group of accounts implicated by one pattern instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudRing {
    /// Sequential id, `RING_001` onwards.
    pub ring_id: String,
    /// Member accounts.
    pub member_accounts: Vec<String>,
    /// Producing pattern.
    pub pattern_type: PatternType,
    /// Mean final score of the members, one decimal.
    pub risk_score: f64,
    /// Cycle length, for cycle rings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_length: Option<usize>,
    /// Temporal density, for fan rings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_score: Option<f64>,
    /// Hop count, for shell rings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hop_count: Option<usize>,
}

/// Format a 1-based ring number as a ring id.
pub fn ring_id(n: usize) -> String {
    format!("RING_{n:03}")
}

// ============================================================================
// Scores
// ============================================================================

/// Final score of one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountScore {
    /// Account id.
    pub account_id: String,
    /// Score in [0, 100], one decimal.
    pub score: f64,
    /// Pattern tags, in tag order.
    pub tags: BTreeSet<PatternTag>,
    /// First ring the account was assigned to.
    pub ring_id: Option<String>,
}

/// Scoring result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBoard {
    /// One entry per account, in account-list order.
    pub accounts: Vec<AccountScore>,
    /// Rings in creation order.
    pub rings: Vec<FraudRing>,
}

impl ScoreBoard {
    /// Score entry for an account id.
    pub fn get(&self, account_id: &str) -> Option<&AccountScore> {
        self.accounts.iter().find(|a| a.account_id == account_id)
    }
}

/// Everything the detectors found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detections {
    /// Distinct cycles.
    pub cycles: Vec<Cycle>,
    /// Smurfing patterns.
    pub smurfing: Vec<SmurfingPattern>,
    /// Shell chains.
    pub shell_chains: Vec<ShellChain>,
    /// Accounts with a legitimate profile.
    pub legitimate: Vec<LegitimateAccount>,
}
