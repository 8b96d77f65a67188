//! # ForensicFlow Core
//!
//! Core abstractions shared by every ForensicFlow crate.
//!
//! This crate provides:
//! - Stage domains and kernel metadata
//! - Trait definitions for analysis and batch kernels
//! - Kernel registry
//! - Unified analysis configuration (TOML / environment)
//! - Error types
//! - Logging setup

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod error;
pub mod kernel;
pub mod observability;
pub mod registry;
pub mod traits;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        AnalysisConfig, CycleConfig, LegitimacyConfig, ProjectionConfig, ScoringConfig,
        ShellConfig, SmurfingConfig,
    };
    pub use crate::domain::Domain;
    pub use crate::error::{FlowError, Result};
    pub use crate::kernel::KernelMetadata;
    pub use crate::observability::{LogConfig, LogLevel};
    pub use crate::registry::{KernelRegistry, RegistryStats};
    pub use crate::traits::{AnalysisKernel, BatchKernel};
}
