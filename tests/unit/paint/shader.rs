use super::*;
use crate::backend::image::Pixmap;
use crate::geometry::irect::IRect;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn image(w: u32, h: u32, px: &[[u8; 4]]) -> SpecialImage {
    let data = px.iter().flatten().copied().collect::<Vec<_>>();
    let pixmap = Pixmap::from_premul_rgba8(w, h, data, ColorSpace::Srgb).unwrap();
    SpecialImage::from_pixmap(pixmap)
}

fn quad() -> SpecialImage {
    image(2, 2, &[RED, GREEN, BLUE, WHITE])
}

fn eval(s: &Shader, x: f64, y: f64) -> [u8; 4] {
    s.eval(Point::new(x, y), ColorSpace::Srgb).to_rgba8_premul()
}

fn shader(img: SpecialImage, tile: TileMode, sampling: SamplingOptions) -> Shader {
    Shader::image(img, tile, sampling, &Matrix::IDENTITY, true).unwrap()
}

#[test]
fn nearest_reads_pixel_under_point() {
    let s = shader(quad(), TileMode::Decal, SamplingOptions::NEAREST);
    assert_eq!(eval(&s, 0.5, 0.5), RED);
    assert_eq!(eval(&s, 1.9, 0.1), GREEN);
    assert_eq!(eval(&s, 0.2, 1.7), BLUE);
    assert_eq!(eval(&s, -0.5, 0.5), [0, 0, 0, 0]);
}

#[test]
fn linear_at_shared_corner_averages_all_four() {
    let s = shader(quad(), TileMode::Clamp, SamplingOptions::LINEAR);
    assert_eq!(eval(&s, 1.0, 1.0), [128, 128, 128, 255]);
    assert_eq!(eval(&s, 0.5, 0.5), RED);
}

#[test]
fn tile_modes_extend_outside_bounds() {
    let clamp = shader(quad(), TileMode::Clamp, SamplingOptions::NEAREST);
    assert_eq!(eval(&clamp, -5.0, 0.5), RED);
    let repeat = shader(quad(), TileMode::Repeat, SamplingOptions::NEAREST);
    assert_eq!(eval(&repeat, 2.5, 0.5), RED);
    let mirror = shader(quad(), TileMode::Mirror, SamplingOptions::NEAREST);
    assert_eq!(eval(&mirror, 2.5, 0.5), GREEN);
}

#[test]
fn strict_tiles_at_subset_fast_at_backing_store() {
    let full = image(4, 1, &[RED, GREEN, BLUE, WHITE]);
    let sub = full.make_subset(IRect::from_ltrb(1, 0, 3, 1)).unwrap();
    let strict =
        Shader::image(sub.clone(), TileMode::Clamp, SamplingOptions::NEAREST, &Matrix::IDENTITY, true)
            .unwrap();
    let fast =
        Shader::image(sub, TileMode::Clamp, SamplingOptions::NEAREST, &Matrix::IDENTITY, false)
            .unwrap();
    assert_eq!(eval(&strict, -0.5, 0.5), GREEN);
    assert_eq!(eval(&fast, -0.5, 0.5), RED);
    assert_eq!(eval(&strict, 0.5, 0.5), GREEN);
    assert_eq!(eval(&fast, 1.5, 0.5), BLUE);
}

#[test]
fn local_matrix_maps_image_into_shader_space() {
    let local = Matrix::translate(10.0, 20.0);
    let s = Shader::image(quad(), TileMode::Decal, SamplingOptions::NEAREST, &local, true).unwrap();
    assert_eq!(eval(&s, 11.5, 20.5), GREEN);
    assert!(Shader::image(quad(), TileMode::Decal, SamplingOptions::NEAREST, &Matrix::scale(0.0, 1.0), true).is_none());
}

#[test]
fn decal_mask_falls_off_over_half_pixel() {
    let s = Shader::decal_mask(Rect::new(0.0, 0.0, 10.0, 10.0), Shader::color(Color4f::WHITE));
    let inside = s.eval(Point::new(5.0, 5.0), ColorSpace::Srgb);
    let edge = s.eval(Point::new(0.0, 5.0), ColorSpace::Srgb);
    let outside = s.eval(Point::new(-0.5, 5.0), ColorSpace::Srgb);
    assert!(inside.nearly_eq(Color4f::WHITE, 1e-6));
    assert!(edge.nearly_eq(Color4f::WHITE.scale(0.5), 1e-6));
    assert!(outside.is_transparent());
}

#[test]
fn color_filter_wrapper_applies_after_child() {
    let filter = ColorFilter::blend(Color4f::BLACK, BlendMode::SrcIn);
    let s = Shader::color(Color4f::WHITE.scale(0.5)).with_color_filter(&filter);
    let c = s.eval(Point::ZERO, ColorSpace::Srgb);
    assert!(c.nearly_eq(Color4f::new(0.0, 0.0, 0.0, 0.5), 1e-6));
}

#[test]
fn cubic_reproduces_flat_regions() {
    let img = image(4, 4, &[WHITE; 16]);
    let s = shader(img, TileMode::Clamp, SamplingOptions::Cubic(CubicResampler::CATMULL_ROM));
    assert_eq!(eval(&s, 1.3, 2.7), WHITE);
}
