use std::sync::Arc;

use super::*;
use crate::backend::ColorSpace;
use crate::backend::cache::KernelCache;
use crate::backend::raster::{RasterBackend, RasterBackendOpts};
use crate::foundation::core::{Point, Rect};
use crate::geometry::irect::ISize;
use crate::mapping::Mapping;
use crate::paint::Paint;

fn ctx_with(opts: RasterBackendOpts, mapping: Mapping) -> Context {
    let backend = RasterBackend::with_kernel_cache(opts, Arc::new(KernelCache::default()));
    Context::new(
        Arc::new(backend),
        mapping,
        LayerSpace::new(IRect::from_ltrb(0, 0, 32, 32)),
        ColorSpace::Srgb,
    )
}

#[test]
fn snap_places_pixels_at_bounds_origin() {
    let ctx = ctx_with(RasterBackendOpts::default(), Mapping::default());
    let bounds = LayerSpace::new(IRect::from_ltrb(4, 6, 8, 9));
    let mut surface = AutoSurface::new(&ctx, bounds, false, None);

    let device = surface.device().unwrap();
    assert_eq!(device.dev_clip_bounds(), IRect::from_ltrb(0, 0, 4, 3));
    // Draws are in layer space.
    device.clip_rect(Rect::new(5.0, 6.0, 6.0, 7.0), false);
    device.draw_paint(&Paint::default().with_color(Color4f::WHITE));

    let result = surface.snap();
    assert_eq!(result.layer_bounds(), bounds);
    let image = result.image().unwrap();
    assert_eq!(image.dimensions(), ISize::new(4, 3));
    assert_eq!(image.pixel(1, 0), [255; 4]);
    assert_eq!(image.pixel(0, 0), [0; 4]);
    assert_eq!(ctx.stats().snapshot().offscreen_surfaces, 1);
}

#[test]
fn empty_bounds_still_count_as_a_surface() {
    let ctx = ctx_with(RasterBackendOpts::default(), Mapping::default());
    let mut surface = AutoSurface::new(&ctx, LayerSpace::<IRect>::empty(), false, None);
    assert!(surface.device().is_none());
    assert!(surface.snap().is_transparent());
    assert_eq!(ctx.stats().snapshot().offscreen_surfaces, 1);
}

#[test]
fn refused_allocation_snaps_transparent() {
    let ctx = ctx_with(
        RasterBackendOpts::default().with_max_surface_dim(4),
        Mapping::default(),
    );
    let mut surface = AutoSurface::new(&ctx, LayerSpace::new(IRect::from_ltrb(0, 0, 8, 8)), false, None);
    assert!(surface.device().is_none());
    assert!(surface.snap().is_transparent());
}

#[test]
fn parameter_space_rendering_applies_layer_matrix() {
    let ctx = ctx_with(
        RasterBackendOpts::default(),
        Mapping::new(Matrix::scale(2.0, 2.0)),
    );
    let mut surface = AutoSurface::new(&ctx, LayerSpace::new(IRect::from_ltrb(2, 2, 10, 10)), true, None);
    let device = surface.device().unwrap();
    assert_eq!(device.local_to_device().map_xy(3.0, 3.0), Point::new(4.0, 4.0));
}
