use std::sync::Arc;

use super::*;
use crate::backend::cache::KernelCache;
use crate::backend::raster::{RasterBackend, RasterBackendOpts};
use crate::backend::{ColorSpace, Pixmap, SpecialImage};
use crate::foundation::core::Color4f;
use crate::geometry::irect::IPoint;
use crate::mapping::Mapping;
use crate::paint::blend::BlendMode;

fn ctx_with(opts: RasterBackendOpts) -> Context {
    let backend = RasterBackend::with_kernel_cache(opts, Arc::new(KernelCache::default()));
    Context::new(
        Arc::new(backend),
        Mapping::default(),
        LayerSpace::new(IRect::from_ltrb(0, 0, 32, 32)),
        ColorSpace::Srgb,
    )
}

fn ctx() -> Context {
    ctx_with(RasterBackendOpts::default())
}

fn solid(w: u32, h: u32, px: [u8; 4]) -> SpecialImage {
    let data = px.repeat((w * h) as usize);
    SpecialImage::from_pixmap(Pixmap::from_premul_rgba8(w, h, data, ColorSpace::Srgb).unwrap())
}

fn at(image: SpecialImage, x: i32, y: i32) -> FilterResult {
    FilterResult::new(image, LayerSpace::new(IPoint::new(x, y)))
}

fn layer(l: i32, t: i32, r: i32, b: i32) -> LayerSpace<IRect> {
    LayerSpace::new(IRect::from_ltrb(l, t, r, b))
}

fn surfaces(ctx: &Context) -> u64 {
    ctx.stats().snapshot().offscreen_surfaces
}

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

#[test]
fn merging_one_input_returns_it() {
    let ctx = ctx();
    let image = solid(4, 4, RED);
    let merged = Builder::new(&ctx).add(at(image.clone(), 1, 1)).merge();
    assert!(SpecialImage::ptr_eq(merged.image().unwrap(), &image));
    assert_eq!(merged.layer_bounds(), layer(1, 1, 5, 5));
    assert_eq!(surfaces(&ctx), 0);
}

#[test]
fn merge_draws_inputs_in_order() {
    let ctx = ctx();
    let merged = Builder::new(&ctx)
        .add(at(solid(4, 4, RED), 0, 0))
        .add(at(solid(4, 4, BLUE), 2, 2))
        .add(FilterResult::transparent())
        .merge();
    assert_eq!(surfaces(&ctx), 1);
    assert_eq!(merged.layer_bounds(), layer(0, 0, 6, 6));
    let image = merged.image().unwrap();
    assert_eq!(image.pixel(0, 0), RED);
    assert_eq!(image.pixel(3, 3), BLUE);
    assert_eq!(image.pixel(5, 0), [0; 4]);
}

#[test]
fn merge_is_limited_to_desired_output() {
    let ctx = ctx();
    let merged = Builder::new(&ctx)
        .add(at(solid(4, 4, RED), -2, -2))
        .add(at(solid(4, 4, BLUE), 30, 30))
        .merge();
    assert_eq!(merged.layer_bounds(), layer(0, 0, 32, 32));
    let image = merged.image().unwrap();
    assert_eq!(image.pixel(1, 1), RED);
    assert_eq!(image.pixel(31, 31), BLUE);
}

#[test]
fn blur_spreads_by_three_sigma() {
    let ctx = ctx();
    let blurred = Builder::new(&ctx)
        .add(at(solid(8, 8, [255; 4]), 4, 4))
        .blur(LayerSpace::new(Size::new(1.0, 1.0)));
    assert_eq!(blurred.layer_bounds(), layer(1, 1, 15, 15));
    let image = blurred.image().unwrap();
    // Layer (8, 8) is more than one kernel radius inside the square.
    assert_eq!(image.pixel(7, 7), [255; 4]);
    assert!(image.pixel(0, 0)[3] < 16);
}

#[test]
fn blur_without_engine_is_transparent() {
    let ctx = ctx_with(RasterBackendOpts::default().with_blur_enabled(false));
    let blurred = Builder::new(&ctx)
        .add(at(solid(8, 8, [255; 4]), 4, 4))
        .blur(LayerSpace::new(Size::new(1.0, 1.0)));
    assert!(blurred.is_transparent());
}

#[test]
fn blur_of_transparent_is_transparent() {
    let ctx = ctx();
    let blurred = Builder::new(&ctx)
        .add(FilterResult::transparent())
        .blur(LayerSpace::new(Size::new(2.0, 2.0)));
    assert!(blurred.is_transparent());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "above maximum")]
fn blur_sigma_above_maximum_is_rejected() {
    let ctx = ctx_with(RasterBackendOpts::default().with_max_blur_sigma(2.0));
    let _ = Builder::new(&ctx)
        .add(at(solid(8, 8, [255; 4]), 4, 4))
        .blur(LayerSpace::new(Size::new(3.0, 1.0)));
}

#[test]
fn eval_draws_shader_over_output_bounds() {
    let ctx = ctx();
    let mut seen = Vec::new();
    let result = Builder::new(&ctx)
        .add(at(solid(4, 4, RED), 0, 0))
        .add(FilterResult::transparent())
        .eval(
            |inputs| {
                seen = inputs.iter().map(Option::is_some).collect();
                let blue = Shader::color(Color4f::new(0.0, 0.0, 1.0, 1.0));
                Some(Shader::blend(BlendMode::SrcOver, blue, inputs[0].clone()?))
            },
            Some(layer(2, 2, 8, 8)),
            false,
        );
    assert_eq!(seen, vec![true, false]);
    assert_eq!(result.layer_bounds(), layer(2, 2, 8, 8));
    let image = result.image().unwrap();
    // Layer (3, 3) is inside the red input; layer (6, 6) only has the blue backdrop.
    assert_eq!(image.pixel(1, 1), RED);
    assert_eq!(image.pixel(4, 4), BLUE);
}

#[test]
fn eval_with_disjoint_output_skips_shader() {
    let ctx = ctx();
    let mut called = false;
    let result = Builder::new(&ctx).add(at(solid(4, 4, RED), 0, 0)).eval(
        |_| {
            called = true;
            None
        },
        Some(layer(40, 40, 48, 48)),
        false,
    );
    assert!(result.is_transparent());
    assert!(!called);
    assert_eq!(surfaces(&ctx), 0);
}

#[test]
fn eval_in_parameter_space_adapts_inputs() {
    let backend = RasterBackend::with_kernel_cache(
        RasterBackendOpts::default(),
        Arc::new(KernelCache::default()),
    );
    let ctx = Context::new(
        Arc::new(backend),
        Mapping::new(Matrix::scale(2.0, 2.0)),
        LayerSpace::new(IRect::from_ltrb(0, 0, 8, 8)),
        ColorSpace::Srgb,
    );
    let result = Builder::new(&ctx)
        .add(at(solid(8, 8, RED), 0, 0))
        .eval(|inputs| inputs[0].clone(), None, true);
    let image = result.image().unwrap();
    assert_eq!(image.pixel(3, 3), RED);
}
