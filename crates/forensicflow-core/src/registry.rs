//! Kernel registry.
//!
//! The registry records the metadata of every kernel so callers can list
//! and look up the analysis stages that are available.

use crate::domain::Domain;
use crate::error::{FlowError, Result};
use crate::kernel::KernelMetadata;
use crate::traits::AnalysisKernel;
use hashbrown::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Registry statistics.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    /// Total number of registered kernels.
    pub total: usize,
    /// Kernels by domain.
    pub by_domain: HashMap<Domain, usize>,
}

/// Central registry of kernel metadata.
#[derive(Debug, Default)]
pub struct KernelRegistry {
    kernels: RwLock<HashMap<String, KernelMetadata>>,
}

impl KernelRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register kernel metadata.
    pub fn register_metadata(&self, metadata: KernelMetadata) -> Result<()> {
        let mut kernels = self
            .kernels
            .write()
            .map_err(|_| FlowError::internal("kernel registry lock poisoned"))?;

        if kernels.contains_key(&metadata.id) {
            return Err(FlowError::KernelAlreadyRegistered(metadata.id));
        }

        debug!(kernel = %metadata.id, domain = %metadata.domain, "Registered kernel");
        kernels.insert(metadata.id.clone(), metadata);
        Ok(())
    }

    /// Register a kernel instance by its metadata.
    pub fn register<K: AnalysisKernel>(&self, kernel: &K) -> Result<()> {
        self.register_metadata(kernel.metadata().clone())
    }

    /// Look up a kernel by id.
    pub fn get(&self, id: &str) -> Result<KernelMetadata> {
        self.kernels
            .read()
            .map_err(|_| FlowError::internal("kernel registry lock poisoned"))?
            .get(id)
            .cloned()
            .ok_or_else(|| FlowError::not_found(id))
    }

    /// All registered kernels, sorted by domain then id.
    #[must_use]
    pub fn all(&self) -> Vec<KernelMetadata> {
        let mut all: Vec<KernelMetadata> = match self.kernels.read() {
            Ok(kernels) => kernels.values().cloned().collect(),
            Err(_) => Vec::new(),
        };
        all.sort_by(|a, b| a.domain.cmp(&b.domain).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Kernels belonging to one domain, sorted by id.
    #[must_use]
    pub fn by_domain(&self, domain: Domain) -> Vec<KernelMetadata> {
        self.all()
            .into_iter()
            .filter(|m| m.domain == domain)
            .collect()
    }

    /// Total number of registered kernels.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.kernels.read().map(|k| k.len()).unwrap_or(0)
    }

    /// Registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for meta in self.all() {
            stats.total += 1;
            *stats.by_domain.entry(meta.domain).or_insert(0) += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = KernelRegistry::new();
        registry
            .register_metadata(KernelMetadata::batch("detect/cycles", Domain::PatternDetection))
            .unwrap();
        registry
            .register_metadata(KernelMetadata::batch("scoring/suspicion", Domain::Scoring))
            .unwrap();

        assert_eq!(registry.total_count(), 2);
        assert_eq!(registry.get("detect/cycles").unwrap().domain, Domain::PatternDetection);
        assert!(matches!(
            registry.get("detect/unknown"),
            Err(FlowError::KernelNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = KernelRegistry::new();
        let meta = KernelMetadata::batch("detect/cycles", Domain::PatternDetection);
        registry.register_metadata(meta.clone()).unwrap();
        assert!(matches!(
            registry.register_metadata(meta),
            Err(FlowError::KernelAlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_ordering_and_stats() {
        let registry = KernelRegistry::new();
        registry
            .register_metadata(KernelMetadata::batch("scoring/suspicion", Domain::Scoring))
            .unwrap();
        registry
            .register_metadata(KernelMetadata::batch("detect/shell", Domain::PatternDetection))
            .unwrap();
        registry
            .register_metadata(KernelMetadata::batch("detect/cycles", Domain::PatternDetection))
            .unwrap();

        let ids: Vec<String> = registry.all().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["detect/cycles", "detect/shell", "scoring/suspicion"]);

        let stats = registry.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_domain.get(&Domain::PatternDetection), Some(&2));
        assert_eq!(registry.by_domain(Domain::Scoring).len(), 1);
    }
}
