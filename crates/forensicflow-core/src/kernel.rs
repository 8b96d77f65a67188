//! Kernel metadata.
//!
//! Every analysis component carries a `KernelMetadata` describing its id,
//! stage and performance expectations.

use crate::domain::Domain;
use serde::{Deserialize, Serialize};

/// Kernel metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelMetadata {
    /// Unique kernel identifier (e.g., "detect/cycles").
    pub id: String,

    /// Stage the kernel belongs to.
    pub domain: Domain,

    /// Human-readable description.
    pub description: String,

    /// Expected throughput in transactions per second.
    pub expected_throughput: u64,

    /// Target latency in microseconds for a reference-sized batch.
    pub target_latency_us: f64,

    /// Version of the kernel implementation.
    pub version: u32,
}

impl KernelMetadata {
    /// Create metadata for a batch kernel.
    #[must_use]
    pub fn batch(id: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: id.into(),
            domain,
            description: String::new(),
            expected_throughput: 10_000,
            target_latency_us: 50.0,
            version: 1,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the expected throughput.
    #[must_use]
    pub fn with_throughput(mut self, ops_per_sec: u64) -> Self {
        self.expected_throughput = ops_per_sec;
        self
    }

    /// Set the target latency.
    #[must_use]
    pub fn with_latency_us(mut self, latency_us: f64) -> Self {
        self.target_latency_us = latency_us;
        self
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Kernel name without the stage prefix (e.g. "cycles").
    #[must_use]
    pub fn name(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }
}

impl Default for KernelMetadata {
    fn default() -> Self {
        Self::batch("unnamed", Domain::Pipeline)
    }
}
