use std::sync::Arc;

use super::*;
use crate::backend::cache::KernelCache;
use crate::backend::raster::{RasterBackend, RasterBackendOpts};
use crate::backend::{ColorSpace, Pixmap};
use crate::foundation::core::Point;
use crate::geometry::irect::ISize;
use crate::mapping::Mapping;

fn ctx() -> Context {
    let backend = RasterBackend::with_kernel_cache(
        RasterBackendOpts::default(),
        Arc::new(KernelCache::default()),
    );
    Context::new(
        Arc::new(backend),
        Mapping::default(),
        LayerSpace::new(IRect::from_ltrb(0, 0, 32, 32)),
        ColorSpace::Srgb,
    )
}

fn white(w: u32, h: u32) -> SpecialImage {
    let data = vec![255; (w * h * 4) as usize];
    SpecialImage::from_pixmap(Pixmap::from_premul_rgba8(w, h, data, ColorSpace::Srgb).unwrap())
}

fn scale(s: f64) -> LayerSpace<Size> {
    LayerSpace::new(Size::new(s, s))
}

fn surfaces(ctx: &Context) -> u64 {
    ctx.stats().snapshot().offscreen_surfaces
}

#[test]
fn step_counts() {
    assert_eq!(downscale_step_count(1.0), 0);
    assert_eq!(downscale_step_count(2.0), 0);
    assert_eq!(downscale_step_count(0.9995), 0);
    assert_eq!(downscale_step_count(0.9), 1);
    assert_eq!(downscale_step_count(0.5), 1);
    // 0.45 needs one halving and then 0.9, which is close enough to fold away.
    assert_eq!(downscale_step_count(0.45), 1);
    assert_eq!(downscale_step_count(0.3), 2);
    assert_eq!(downscale_step_count(0.25), 2);
    assert_eq!(downscale_step_count(0.07), 4);
}

#[test]
fn unit_scale_without_effects_is_a_subset() {
    let ctx = ctx();
    let source = white(8, 8);
    let r = FilterResult::new(source.clone(), LayerSpace::new(IPoint::ZERO));
    let same = r.rescale(&ctx, scale(1.0), false);
    assert!(SpecialImage::ptr_eq(same.image().unwrap(), &source));
    assert_eq!(same.layer_bounds(), r.layer_bounds());
    assert_eq!(surfaces(&ctx), 0);
}

#[test]
fn degenerate_inputs_are_transparent() {
    let ctx = ctx();
    assert!(FilterResult::transparent()
        .rescale(&ctx, scale(0.5), false)
        .is_transparent());
    let r = FilterResult::new(white(8, 8), LayerSpace::new(IPoint::ZERO));
    assert!(r.rescale(&ctx, scale(0.0), false).is_transparent());
    assert!(r.rescale(&ctx, LayerSpace::new(Size::new(0.5, -1.0)), false).is_transparent());
}

#[test]
fn half_scale_is_one_padded_pass() {
    let ctx = ctx();
    let r = FilterResult::new(white(8, 8), LayerSpace::new(IPoint::ZERO));
    let small = r.rescale(&ctx, scale(0.5), true);
    assert_eq!(surfaces(&ctx), 1);
    assert_eq!(small.layer_bounds(), r.layer_bounds());
    assert_eq!(small.tile_mode(), TileMode::Decal);

    let image = small.image().unwrap();
    // 4x4 of content plus one pixel of transparent padding on each side.
    assert_eq!(image.dimensions(), ISize::new(6, 6));
    assert_eq!(image.pixel(2, 2), [255; 4]);
    assert_eq!(image.pixel(0, 0)[3], 0);
    // Upscaled back so the content lands on the original bounds.
    assert_eq!(small.transform().get().map_xy(1.0, 1.0), Point::new(0.0, 0.0));
    assert_eq!(small.transform().get().map_xy(5.0, 5.0), Point::new(8.0, 8.0));
}

#[test]
fn padding_becomes_clamp_without_decal() {
    let ctx = ctx();
    let r = FilterResult::new(white(8, 8), LayerSpace::new(IPoint::ZERO));
    let small = r.rescale(&ctx, scale(0.5), false);
    assert_eq!(small.tile_mode(), TileMode::Clamp);
}

#[test]
fn quarter_scale_takes_two_passes() {
    let ctx = ctx();
    let r = FilterResult::new(white(16, 16), LayerSpace::new(IPoint::ZERO));
    let small = r.rescale(&ctx, scale(0.25), true);
    assert_eq!(surfaces(&ctx), 2);
    assert_eq!(small.layer_bounds(), r.layer_bounds());
    assert_eq!(small.transform().get().map_xy(1.0, 1.0), Point::new(0.0, 0.0));
}

#[test]
fn unusable_scales_are_transparent() {
    let ctx = ctx();
    let r = FilterResult::new(white(8, 8), LayerSpace::new(IPoint::ZERO));
    for s in [0.0, -0.5, 1e-12, f64::NAN, f64::INFINITY] {
        assert!(r.rescale(&ctx, scale(s), false).image().is_none(), "scale {s}");
    }
    let lopsided = LayerSpace::new(Size::new(0.5, f64::NAN));
    assert!(r.rescale(&ctx, lopsided, false).image().is_none());
    assert_eq!(surfaces(&ctx), 0);
}
