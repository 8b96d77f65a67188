//! Analysis Configuration
//!
//! Thresholds and limits for every stage of the analysis, plus logging:
//! - Cycle search budget
//! - Smurfing thresholds and temporal window
//! - Shell chain limits
//! - Legitimacy (false-positive) filter
//! - Scoring weights
//! - Visualization projection limits
//!
//! # Example
//!
//! ```rust,ignore
//! use forensicflow_core::config::AnalysisConfig;
//!
//! // Load from environment
//! let config = AnalysisConfig::from_env()?;
//!
//! // Or load from file
//! let config = AnalysisConfig::from_file("forensicflow.toml")?;
//! config.validate()?;
//! ```

use crate::error::{FlowError, Result};
use crate::observability::{LogConfig, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Cycle search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Wall-clock budget for the whole search, in milliseconds
    pub timeout_ms: u64,
    /// Stop after this many distinct cycles (`None` = unbounded, `"none"` in TOML)
    #[serde(with = "cap")]
    pub max_cycles: Option<usize>,
    /// Restrict the search to strongly connected components of 3+ nodes
    pub scc_prefilter: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_cycles: Some(200),
            scc_prefilter: true,
        }
    }
}

impl CycleConfig {
    /// Search budget as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fan-in / fan-out configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmurfingConfig {
    /// Minimum in/out degree before an account is examined
    pub min_degree: usize,
    /// Minimum number of unique counterparties
    pub min_unique_counterparties: usize,
    /// Sliding window for temporal density, in hours
    pub window_hours: u64,
    /// Density must be strictly greater than this value
    pub min_temporal_density: f64,
}

impl Default for SmurfingConfig {
    fn default() -> Self {
        Self {
            min_degree: 10,
            min_unique_counterparties: 10,
            window_hours: 72,
            min_temporal_density: 0.0,
        }
    }
}

impl SmurfingConfig {
    /// Window length in milliseconds, saturating at `i64::MAX`.
    pub fn window_ms(&self) -> i64 {
        self.checked_window_ms().unwrap_or(i64::MAX)
    }

    fn checked_window_ms(&self) -> Option<i64> {
        i64::try_from(self.window_hours)
            .ok()?
            .checked_mul(3_600_000)
    }
}

/// Shell network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Minimum total transactions for a shell candidate
    pub min_shell_tx: usize,
    /// Maximum total transactions for a shell candidate
    pub max_shell_tx: usize,
    /// Minimum hops (edges) for a qualifying chain
    pub min_hops: usize,
    /// Stop extending once the chain holds more than this many accounts
    pub max_chain_nodes: usize,
    /// Stop after this many chains (`None` = unbounded, `"none"` in TOML)
    #[serde(with = "cap")]
    pub max_chains: Option<usize>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            min_shell_tx: 2,
            max_shell_tx: 3,
            min_hops: 3,
            max_chain_nodes: 10,
            max_chains: Some(100),
        }
    }
}

/// Legitimacy filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegitimacyConfig {
    /// Merchant: minimum in-degree
    pub merchant_min_in_degree: usize,
    /// Merchant: maximum out-degree
    pub merchant_max_out_degree: usize,
    /// Merchant: incoming amount CV must be below this
    pub merchant_max_cv: f64,
    /// Payroll: minimum out-degree
    pub payroll_min_out_degree: usize,
    /// Payroll: maximum in-degree
    pub payroll_max_in_degree: usize,
    /// Payroll: outgoing amount CV must be below this
    pub payroll_max_cv: f64,
}

impl Default for LegitimacyConfig {
    fn default() -> Self {
        Self {
            merchant_min_in_degree: 20,
            merchant_max_out_degree: 3,
            merchant_max_cv: 0.5,
            payroll_min_out_degree: 20,
            payroll_max_in_degree: 3,
            payroll_max_cv: 0.3,
        }
    }
}

/// Scoring weights and behavioural factor thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points per cycle membership
    pub cycle_points: f64,
    /// Points for a smurfing hub
    pub smurfing_center_points: f64,
    /// Points for each smurfing counterparty
    pub smurfing_member_points: f64,
    /// Points per shell chain membership
    pub shell_points: f64,
    /// Points for high transaction velocity
    pub velocity_points: f64,
    /// Points for a degree anomaly
    pub degree_anomaly_points: f64,
    /// Points for pass-through behaviour
    pub pass_through_points: f64,
    /// Minimum timestamps for the velocity factor
    pub velocity_min_events: usize,
    /// Average inter-arrival must be below this, in seconds
    pub velocity_max_avg_interval_secs: u64,
    /// max(in, out) / min(in, out) must exceed this
    pub degree_ratio_threshold: f64,
    /// min(totalIn, totalOut) / max(totalIn, totalOut) must exceed this
    pub pass_through_ratio: f64,
    /// Minimum transactions for the pass-through factor
    pub pass_through_min_tx: usize,
    /// Multiplier applied to legitimate accounts
    pub legitimacy_discount: f64,
    /// Upper clamp for every score
    pub max_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            cycle_points: 30.0,
            smurfing_center_points: 25.0,
            smurfing_member_points: 15.0,
            shell_points: 20.0,
            velocity_points: 10.0,
            degree_anomaly_points: 10.0,
            pass_through_points: 5.0,
            velocity_min_events: 5,
            velocity_max_avg_interval_secs: 3_600,
            degree_ratio_threshold: 5.0,
            pass_through_ratio: 0.85,
            pass_through_min_tx: 4,
            legitimacy_discount: 0.5,
            max_score: 100.0,
        }
    }
}

/// Visualization projection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Build the node/edge projection alongside the report
    pub enabled: bool,
    /// Node budget before pruning kicks in
    pub max_nodes: usize,
    /// Extra nodes allowed for high-risk neighbourhoods
    pub neighbor_buffer: usize,
    /// Neighbours taken per direction for each high-risk account
    pub max_neighbors: usize,
    /// Score at which an account's neighbourhood is included
    pub high_risk_score: f64,
    /// Edge budget
    pub max_edges: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_nodes: 300,
            neighbor_buffer: 50,
            max_neighbors: 5,
            high_risk_score: 50.0,
            max_edges: 2_000,
        }
    }
}

/// Unified analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Environment name
    pub environment: String,
    /// Cycle search
    pub cycles: CycleConfig,
    /// Fan-in / fan-out
    pub smurfing: SmurfingConfig,
    /// Shell networks
    pub shell: ShellConfig,
    /// Legitimacy filter
    pub legitimacy: LegitimacyConfig,
    /// Scoring
    pub scoring: ScoringConfig,
    /// Visualization projection
    pub projection: ProjectionConfig,
    /// Logging
    pub logging: LogConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            cycles: CycleConfig::default(),
            smurfing: SmurfingConfig::default(),
            shell: ShellConfig::default(),
            legitimacy: LegitimacyConfig::default(),
            scoring: ScoringConfig::default(),
            projection: ProjectionConfig::default(),
            logging: LogConfig::production(),
        }
    }
}

impl AnalysisConfig {
    /// Create development configuration
    pub fn development() -> Self {
        Self {
            environment: "development".to_string(),
            projection: ProjectionConfig {
                enabled: true,
                ..Default::default()
            },
            logging: LogConfig::development(),
            ..Default::default()
        }
    }

    /// Testing configuration: generous cycle budget, quiet logs
    pub fn testing() -> Self {
        Self {
            environment: "testing".to_string(),
            cycles: CycleConfig {
                timeout_ms: 60_000,
                ..Default::default()
            },
            logging: LogConfig {
                level: LogLevel::Warn,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("FORENSICFLOW_ENV")
            .as_deref()
            .unwrap_or("production")
        {
            "development" | "dev" => Self::development(),
            "testing" | "test" => Self::testing(),
            _ => Self::default(),
        };

        if let Ok(val) = std::env::var("FORENSICFLOW_CYCLE_TIMEOUT_MS") {
            config.cycles.timeout_ms = val.parse().map_err(|e| {
                FlowError::config(format!("FORENSICFLOW_CYCLE_TIMEOUT_MS={val}: {e}"))
            })?;
        }

        if let Ok(val) = std::env::var("FORENSICFLOW_MAX_CYCLES") {
            config.cycles.max_cycles = match val.as_str() {
                "none" | "unbounded" => None,
                _ => Some(val.parse().map_err(|e| {
                    FlowError::config(format!("FORENSICFLOW_MAX_CYCLES={val}: {e}"))
                })?),
            };
        }

        if let Ok(val) = std::env::var("FORENSICFLOW_LOG_LEVEL") {
            config.logging.level = val.parse().map_err(FlowError::config)?;
        }

        if let Ok(val) = std::env::var("FORENSICFLOW_LOG_JSON") {
            config.logging.structured = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("FORENSICFLOW_PROJECTION") {
            config.projection.enabled = parse_flag(&val);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| FlowError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FlowError::config(format!("Failed to parse config: {}", e)))
    }

    /// Serialize configuration to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FlowError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = self.to_toml_string()?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| FlowError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cycles.timeout_ms == 0 {
            return Err(FlowError::config("cycles.timeout_ms must be positive"));
        }
        if self.cycles.max_cycles == Some(0) {
            return Err(FlowError::config("cycles.max_cycles must be positive or unset"));
        }

        let s = &self.smurfing;
        if s.min_degree == 0 || s.min_unique_counterparties == 0 {
            return Err(FlowError::config("smurfing thresholds must be positive"));
        }
        if s.window_hours == 0 {
            return Err(FlowError::config("smurfing.window_hours must be positive"));
        }
        if s.checked_window_ms().is_none() {
            return Err(FlowError::config(format!(
                "smurfing.window_hours = {} overflows the millisecond window",
                s.window_hours
            )));
        }
        if !(0.0..1.0).contains(&s.min_temporal_density) {
            return Err(FlowError::config(
                "smurfing.min_temporal_density must be in [0, 1)",
            ));
        }

        let sh = &self.shell;
        if sh.min_shell_tx == 0 || sh.min_shell_tx > sh.max_shell_tx {
            return Err(FlowError::config(
                "shell transaction bounds must satisfy 0 < min_shell_tx <= max_shell_tx",
            ));
        }
        if sh.min_hops < 2 || sh.max_chain_nodes <= sh.min_hops {
            return Err(FlowError::config(
                "shell.min_hops must be >= 2 and shell.max_chain_nodes > shell.min_hops",
            ));
        }
        if sh.max_chains == Some(0) {
            return Err(FlowError::config("shell.max_chains must be positive or unset"));
        }

        let l = &self.legitimacy;
        if l.merchant_max_cv <= 0.0 || l.payroll_max_cv <= 0.0 {
            return Err(FlowError::config("legitimacy CV limits must be positive"));
        }

        let sc = &self.scoring;
        if !(sc.legitimacy_discount > 0.0 && sc.legitimacy_discount <= 1.0) {
            return Err(FlowError::config(
                "scoring.legitimacy_discount must be in (0, 1]",
            ));
        }
        if sc.max_score <= 0.0 {
            return Err(FlowError::config("scoring.max_score must be positive"));
        }
        let points = [
            sc.cycle_points,
            sc.smurfing_center_points,
            sc.smurfing_member_points,
            sc.shell_points,
            sc.velocity_points,
            sc.degree_anomaly_points,
            sc.pass_through_points,
        ];
        if points.iter().any(|p| *p < 0.0 || !p.is_finite()) {
            return Err(FlowError::config("scoring points must be finite and non-negative"));
        }

        if self.projection.max_nodes == 0 || self.projection.max_edges == 0 {
            return Err(FlowError::config("projection budgets must be positive"));
        }

        if self.environment == "production" && self.cycles.max_cycles.is_none() {
            tracing::warn!("Production configuration with an unbounded cycle search");
        }

        Ok(())
    }

    /// Set environment
    pub fn with_environment(mut self, env: impl Into<String>) -> Self {
        self.environment = env.into();
        self
    }

    /// Set cycle search budget
    pub fn with_cycle_timeout(mut self, timeout: Duration) -> Self {
        self.cycles.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Enable or disable the visualization projection
    pub fn with_projection(mut self, enabled: bool) -> Self {
        self.projection.enabled = enabled;
        self
    }
}

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Optional limits written as an integer, or `"none"` when unbounded.
///
/// TOML has no null, so a bare `Option` would drop the key and the
/// default cap would come back on load.
mod cap {
    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    const UNBOUNDED: &str = "none";

    pub fn serialize<S: Serializer>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => serializer.serialize_u64(*n as u64),
            None => serializer.serialize_str(UNBOUNDED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        deserializer.deserialize_any(CapVisitor)
    }

    struct CapVisitor;

    impl<'de> Visitor<'de> for CapVisitor {
        type Value = Option<usize>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or \"none\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            usize::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            match u64::try_from(v) {
                Ok(v) => self.visit_u64(v),
                Err(_) => Err(E::invalid_value(Unexpected::Signed(v), &self)),
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            match v {
                "none" | "unbounded" => Ok(None),
                _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
            }
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }
}
