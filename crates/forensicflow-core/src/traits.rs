//! Core kernel traits.
//!
//! - `AnalysisKernel`: base trait for every pipeline component
//! - `BatchKernel`: async batch entry point with typed input and output

use crate::error::{FlowError, Result};
use crate::kernel::KernelMetadata;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Base trait for all analysis kernels.
pub trait AnalysisKernel: Send + Sync + Debug {
    /// Returns the kernel metadata.
    fn metadata(&self) -> &KernelMetadata;

    /// Validate kernel configuration.
    ///
    /// Called before execution to ensure thresholds are consistent.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Returns the kernel ID.
    fn id(&self) -> &str {
        &self.metadata().id
    }
}

/// Trait for batch kernels.
///
/// # Type Parameters
///
/// - `I`: Input type
/// - `O`: Output type
#[async_trait]
pub trait BatchKernel<I, O>: AnalysisKernel
where
    I: Send + Sync,
    O: Send + Sync,
{
    /// Execute the kernel with the given input.
    async fn execute(&self, input: I) -> Result<O>;

    /// Validate the input before execution.
    fn validate_input(&self, _input: &I) -> Result<()> {
        Ok(())
    }

    /// Execute the kernel with a timeout.
    async fn execute_with_timeout(&self, input: I, timeout: Duration) -> Result<O>
    where
        I: 'async_trait,
    {
        match tokio::time::timeout(timeout, self.execute(input)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(FlowError::Timeout(timeout)),
        }
    }
}
