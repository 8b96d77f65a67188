//! Stage domains for kernel categorization.
//!
//! Every kernel belongs to one analysis stage. Domains are used for
//! kernel discovery, error attribution and progress reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Analysis stage a kernel belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    /// Record validation and graph construction.
    GraphConstruction,

    /// Pattern detectors: cycles, smurfing, shell networks.
    PatternDetection,

    /// False-positive filtering of legitimate high-volume accounts.
    FalsePositiveFiltering,

    /// Score composition and ring assembly.
    Scoring,

    /// End-to-end orchestration.
    Pipeline,
}

impl Domain {
    /// All domains in pipeline order.
    pub const ALL: &'static [Domain] = &[
        Domain::GraphConstruction,
        Domain::PatternDetection,
        Domain::FalsePositiveFiltering,
        Domain::Scoring,
        Domain::Pipeline,
    ];

    /// Returns the domain name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::GraphConstruction => "GraphConstruction",
            Domain::PatternDetection => "PatternDetection",
            Domain::FalsePositiveFiltering => "FalsePositiveFiltering",
            Domain::Scoring => "Scoring",
            Domain::Pipeline => "Pipeline",
        }
    }

    /// Short prefix used in kernel ids (e.g. `detect/cycles`).
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Domain::GraphConstruction => "graph",
            Domain::PatternDetection => "detect",
            Domain::FalsePositiveFiltering => "filter",
            Domain::Scoring => "scoring",
            Domain::Pipeline => "pipeline",
        }
    }

    /// Parse a domain from a name or id prefix (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().to_lowercase() == s || d.prefix() == s)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
