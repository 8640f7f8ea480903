use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::Backend;
use crate::backend::image::ColorSpace;
use crate::geometry::irect::IRect;
use crate::geometry::space::LayerSpace;
use crate::mapping::Mapping;
use crate::paint::sampling::TileMode;

/// Counters recorded while evaluating one filter graph.
///
/// Purely observational; nothing reads them to make decisions.
#[derive(Debug, Default)]
pub struct Stats {
    visited_filters: AtomicU64,
    cache_hits: AtomicU64,
    offscreen_surfaces: AtomicU64,
    shader_clamped_draws: AtomicU64,
    shader_tiled_draws: AtomicU64,
}

/// Plain copy of [`Stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatsSnapshot {
    pub visited_filters: u64,
    pub cache_hits: u64,
    pub offscreen_surfaces: u64,
    pub shader_clamped_draws: u64,
    pub shader_tiled_draws: u64,
}

impl Stats {
    pub fn mark_visited_filter(&self) {
        self.visited_filters.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_new_surface(&self) {
        self.offscreen_surfaces.fetch_add(1, Ordering::Relaxed);
    }

    /// Clamp tiling is counted apart from the other tile modes.
    pub fn mark_shader_based_tiling_required(&self, tile_mode: TileMode) {
        let counter = if tile_mode == TileMode::Clamp {
            &self.shader_clamped_draws
        } else {
            &self.shader_tiled_draws
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            visited_filters: self.visited_filters.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            offscreen_surfaces: self.offscreen_surfaces.load(Ordering::Relaxed),
            shader_clamped_draws: self.shader_clamped_draws.load(Ordering::Relaxed),
            shader_tiled_draws: self.shader_tiled_draws.load(Ordering::Relaxed),
        }
    }

    /// Emit the counters as a debug event.
    pub fn report(&self) {
        let s = self.snapshot();
        tracing::debug!(
            visited_filters = s.visited_filters,
            cache_hits = s.cache_hits,
            offscreen_surfaces = s.offscreen_surfaces,
            shader_clamped_draws = s.shader_clamped_draws,
            shader_tiled_draws = s.shader_tiled_draws,
            "image filter stats"
        );
    }
}

/// Everything a filter operation needs besides its input: where output is wanted, how layer
/// space relates to the device, the working color space, and the backend that allocates
/// surfaces.
///
/// Derived contexts share the same [`Stats`].
#[derive(Clone)]
pub struct Context {
    backend: Arc<dyn Backend>,
    mapping: Mapping,
    desired_output: LayerSpace<IRect>,
    color_space: ColorSpace,
    stats: Arc<Stats>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("mapping", &self.mapping)
            .field("desired_output", &self.desired_output)
            .field("color_space", &self.color_space)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(
        backend: Arc<dyn Backend>,
        mapping: Mapping,
        desired_output: LayerSpace<IRect>,
        color_space: ColorSpace,
    ) -> Self {
        Self {
            backend,
            mapping,
            desired_output,
            color_space,
            stats: Arc::new(Stats::default()),
        }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn desired_output(&self) -> LayerSpace<IRect> {
        self.desired_output
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn with_new_desired_output(&self, desired_output: LayerSpace<IRect>) -> Self {
        Self {
            desired_output,
            ..self.clone()
        }
    }

    pub fn with_new_mapping(&self, mapping: Mapping) -> Self {
        Self {
            mapping,
            ..self.clone()
        }
    }

    pub fn with_new_color_space(&self, color_space: ColorSpace) -> Self {
        Self {
            color_space,
            ..self.clone()
        }
    }

    pub fn mark_new_surface(&self) {
        self.stats.mark_new_surface();
    }

    pub fn mark_shader_based_tiling_required(&self, tile_mode: TileMode) {
        self.stats.mark_shader_based_tiling_required(tile_mode);
    }
}

#[cfg(test)]
#[path = "../tests/unit/context.rs"]
mod tests;
