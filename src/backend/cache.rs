use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::foundation::error::FxResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct KernelKey {
    radius_px: u32,
    sigma_bits: u64,
}

/// Process-wide store of quantized Gaussian kernels shared by concurrent evaluations.
///
/// Lookups take the read lock only. A missing kernel is built with no lock held and then
/// published with an insert-or-return-existing step, so two threads racing on the same key both
/// end up with the winner's kernel and the loser's candidate is dropped.
#[derive(Default)]
pub struct KernelCache {
    kernels: RwLock<HashMap<KernelKey, Arc<[u32]>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

static GLOBAL: LazyLock<Arc<KernelCache>> = LazyLock::new(|| Arc::new(KernelCache::default()));

impl KernelCache {
    /// The cache shared by every raster backend that wasn't given its own.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Existing kernel for `(radius_px, sigma)` or a freshly built one.
    pub fn get_or_build(
        &self,
        radius_px: u32,
        sigma: f64,
        build: impl FnOnce(u32, f64) -> FxResult<Vec<u32>>,
    ) -> FxResult<Arc<[u32]>> {
        let key = KernelKey {
            radius_px,
            sigma_bits: sigma.to_bits(),
        };
        if let Some(k) = self.find(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(k);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let candidate: Arc<[u32]> = build(radius_px, sigma)?.into();
        Ok(self.add(key, candidate))
    }

    fn find(&self, key: &KernelKey) -> Option<Arc<[u32]>> {
        let kernels = self.kernels.read().unwrap_or_else(PoisonError::into_inner);
        kernels.get(key).cloned()
    }

    fn add(&self, key: KernelKey, candidate: Arc<[u32]>) -> Arc<[u32]> {
        let mut kernels = self.kernels.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(kernels.entry(key).or_insert(candidate))
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.kernels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/cache.rs"]
mod tests;
