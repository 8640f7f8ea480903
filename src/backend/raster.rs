//! CPU backend: premultiplied RGBA8 devices shaded one pixel center at a time.

use std::sync::Arc;

use crate::backend::blur::GaussianBlur;
use crate::backend::cache::KernelCache;
use crate::backend::device::{Device, SrcRectConstraint};
use crate::backend::image::{ColorSpace, ColorType, Picture, Pixmap, SpecialImage};
use crate::backend::{Backend, BlurEngine, SurfaceProps, for_each_row};
use crate::foundation::core::{Color4f, Point, Rect};
use crate::foundation::error::{FxError, FxResult};
use crate::geometry::irect::{IRect, ISize};
use crate::geometry::matrix::Matrix;
use crate::geometry::rect::RectExt;
use crate::paint::Paint;
use crate::paint::blend::BlendMode;
use crate::paint::sampling::{SamplingOptions, TileMode};
use crate::paint::shader::Shader;

/// Options for the raster backend.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RasterBackendOpts {
    /// Properties given to devices created without an explicit override.
    pub surface_props: SurfaceProps,
    /// Devices wider or taller than this are refused.
    pub max_surface_dim: u32,
    /// Whether [`Backend::blur_engine`] offers the Gaussian blur.
    pub blur_enabled: bool,
    /// Largest sigma the Gaussian blur accepts.
    pub max_blur_sigma: f64,
    /// Draws touching at least this many pixels shade rows in parallel.
    pub parallel_threshold_px: u64,
}

impl Default for RasterBackendOpts {
    fn default() -> Self {
        Self {
            surface_props: SurfaceProps::default(),
            max_surface_dim: 16_384,
            blur_enabled: true,
            max_blur_sigma: 32.0,
            parallel_threshold_px: 256 * 256,
        }
    }
}

impl RasterBackendOpts {
    /// Parse options from JSON; missing fields keep their defaults.
    pub fn from_json(s: &str) -> FxResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| FxError::config(format!("raster backend opts: {e}")))?;
        if opts.max_surface_dim == 0 {
            return Err(FxError::config("max_surface_dim must be > 0"));
        }
        if !(opts.max_blur_sigma.is_finite() && opts.max_blur_sigma > 0.0) {
            return Err(FxError::config("max_blur_sigma must be finite and > 0"));
        }
        Ok(opts)
    }

    pub fn with_surface_props(mut self, props: SurfaceProps) -> Self {
        self.surface_props = props;
        self
    }

    pub fn with_max_surface_dim(mut self, dim: u32) -> Self {
        self.max_surface_dim = dim;
        self
    }

    pub fn with_blur_enabled(mut self, enabled: bool) -> Self {
        self.blur_enabled = enabled;
        self
    }

    pub fn with_max_blur_sigma(mut self, sigma: f64) -> Self {
        self.max_blur_sigma = sigma;
        self
    }

    pub fn with_parallel_threshold_px(mut self, px: u64) -> Self {
        self.parallel_threshold_px = px;
        self
    }
}

/// [`Backend`] producing [`RasterDevice`]s.
pub struct RasterBackend {
    opts: RasterBackendOpts,
    blur: Option<GaussianBlur>,
}

impl RasterBackend {
    /// Backend sharing the process-wide kernel cache.
    pub fn new(opts: RasterBackendOpts) -> Self {
        Self::with_kernel_cache(opts, KernelCache::global())
    }

    pub fn with_kernel_cache(opts: RasterBackendOpts, kernels: Arc<KernelCache>) -> Self {
        let blur = opts.blur_enabled.then(|| {
            GaussianBlur::new(opts.max_blur_sigma, opts.parallel_threshold_px, kernels)
        });
        Self { opts, blur }
    }

    pub fn opts(&self) -> &RasterBackendOpts {
        &self.opts
    }
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new(RasterBackendOpts::default())
    }
}

impl Backend for RasterBackend {
    fn make_device(
        &self,
        size: ISize,
        color_space: ColorSpace,
        props: Option<&SurfaceProps>,
    ) -> Option<Box<dyn Device>> {
        let max = self.opts.max_surface_dim as i32;
        if size.is_empty() || size.width > max || size.height > max {
            tracing::trace!(?size, max, "refusing device allocation");
            return None;
        }
        let pixmap = match Pixmap::new(size.width as u32, size.height as u32, color_space) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(%err, "device allocation failed");
                return None;
            }
        };
        let props = props.copied().unwrap_or(self.opts.surface_props);
        Some(Box::new(RasterDevice::new(
            pixmap,
            props,
            self.opts.parallel_threshold_px,
        )))
    }

    fn make_image(&self, subset: IRect, pixmap: &Arc<Pixmap>) -> Option<SpecialImage> {
        SpecialImage::new(Arc::clone(pixmap), subset)
    }

    fn get_cached_bitmap(&self, bitmap: &::image::RgbaImage) -> Option<SpecialImage> {
        Pixmap::from_rgba_image(bitmap, ColorSpace::Srgb)
            .ok()
            .map(SpecialImage::from_pixmap)
    }

    fn blur_engine(&self) -> Option<&dyn BlurEngine> {
        self.blur.as_ref().map(|b| b as &dyn BlurEngine)
    }

    fn color_type(&self) -> ColorType {
        ColorType::Rgba8Premul
    }

    fn surface_props(&self) -> &SurfaceProps {
        &self.opts.surface_props
    }
}

/// Coverage of a rect drawn under some local-to-device transform.
#[derive(Clone, Copy, Debug)]
enum RectCoverage {
    /// The transform kept the rect axis-aligned; coverage is measured in device pixels.
    Device { rect: Rect, anti_alias: bool },
    /// Coverage is measured in local units at each pixel center.
    Local {
        inverse: Matrix,
        rect: Rect,
        anti_alias: bool,
        dev_bounds: IRect,
    },
}

impl RectCoverage {
    fn new(ctm: &Matrix, rect: Rect, anti_alias: bool) -> Option<Self> {
        if rect.is_empty_rect() {
            return None;
        }
        if ctm.rect_stays_rect() {
            return Some(Self::Device {
                rect: ctm.map_rect(&rect),
                anti_alias,
            });
        }
        let inverse = ctm.invert()?;
        Some(Self::Local {
            inverse,
            rect,
            anti_alias,
            dev_bounds: IRect::round_out_exact(&ctm.map_rect(&rect)),
        })
    }

    fn device_bounds(&self) -> IRect {
        match self {
            Self::Device { rect, .. } => IRect::round_out_exact(rect),
            Self::Local { dev_bounds, .. } => *dev_bounds,
        }
    }

    fn coverage(&self, x: i32, y: i32) -> f32 {
        let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
        match self {
            Self::Device { rect, anti_alias } => {
                if *anti_alias {
                    let (px, py) = (f64::from(x), f64::from(y));
                    let w = ((px + 1.0).min(rect.x1) - px.max(rect.x0)).max(0.0);
                    let h = ((py + 1.0).min(rect.y1) - py.max(rect.y0)).max(0.0);
                    (w * h) as f32
                } else {
                    inside(rect, center)
                }
            }
            Self::Local {
                inverse,
                rect,
                anti_alias,
                ..
            } => {
                let p = inverse.map_point(center);
                if *anti_alias {
                    let ramp = |d: f64| (d + 0.5).clamp(0.0, 1.0);
                    (ramp(p.x - rect.x0)
                        * ramp(p.y - rect.y0)
                        * ramp(rect.x1 - p.x)
                        * ramp(rect.y1 - p.y)) as f32
                } else {
                    inside(rect, p)
                }
            }
        }
    }
}

fn inside(rect: &Rect, p: Point) -> f32 {
    if rect.x0 <= p.x && p.x < rect.x1 && rect.y0 <= p.y && p.y < rect.y1 {
        1.0
    } else {
        0.0
    }
}

#[derive(Clone, Copy, Debug)]
struct SavedState {
    ctm: Matrix,
    clip_len: usize,
}

/// Raster render target over an RGBA8 premultiplied [`Pixmap`].
///
/// Pixels are shared copy-on-write with images snapped from the device, so drawing after a
/// snapshot never alters the snapshot.
pub struct RasterDevice {
    pixmap: Arc<Pixmap>,
    props: SurfaceProps,
    ctm: Matrix,
    clips: Vec<RectCoverage>,
    saved: Vec<SavedState>,
    immutable: bool,
    parallel_threshold_px: u64,
}

impl RasterDevice {
    pub fn new(pixmap: Pixmap, props: SurfaceProps, parallel_threshold_px: u64) -> Self {
        Self {
            pixmap: Arc::new(pixmap),
            props,
            ctm: Matrix::IDENTITY,
            clips: Vec::new(),
            saved: Vec::new(),
            immutable: false,
            parallel_threshold_px,
        }
    }

    pub fn surface_props(&self) -> &SurfaceProps {
        &self.props
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Blend `source` into every pixel of `area` that the clip touches.
    ///
    /// `source` receives the device-space pixel center and returns the source color plus its
    /// geometric coverage.
    fn shade<S>(&mut self, area: IRect, blend: BlendMode, source: S)
    where
        S: Fn(i32, i32, Point) -> (Color4f, f32) + Send + Sync,
    {
        if self.immutable {
            tracing::trace!("draw ignored on immutable device");
            return;
        }
        let Some(area) = area.intersect(&self.dev_clip_bounds()) else {
            return;
        };
        let clips = &self.clips;
        let row_len = self.pixmap.width() as usize * 4;
        let (top, bottom) = (area.top as usize, area.bottom as usize);
        let data = Arc::make_mut(&mut self.pixmap).data_mut();
        let rows = &mut data[top * row_len..bottom * row_len];
        for_each_row(rows, row_len, self.parallel_threshold_px, |j, row| {
            let y = area.top + j as i32;
            for x in area.left..area.right {
                let clip_cov = clips.iter().fold(1.0f32, |acc, c| {
                    if acc <= 0.0 {
                        acc
                    } else {
                        acc * c.coverage(x, y)
                    }
                });
                if clip_cov <= 0.0 {
                    continue;
                }
                let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                let (src, geom) = source(x, y, center);
                let cov = clip_cov * geom;
                if cov <= 0.0 {
                    continue;
                }
                let idx = x as usize * 4;
                let px = &mut row[idx..idx + 4];
                let dst = Color4f::from_rgba8_premul([px[0], px[1], px[2], px[3]]);
                let out = dst.lerp(blend.blend(src, dst), cov);
                px.copy_from_slice(&out.to_rgba8_premul());
            }
        });
    }
}

impl Device for RasterDevice {
    fn size(&self) -> ISize {
        self.pixmap.size()
    }

    fn color_space(&self) -> ColorSpace {
        self.pixmap.color_space()
    }

    fn local_to_device(&self) -> Matrix {
        self.ctm
    }

    fn set_local_to_device(&mut self, m: Matrix) {
        self.ctm = m;
    }

    fn dev_clip_bounds(&self) -> IRect {
        let full = IRect::from_size(self.pixmap.size());
        self.clips
            .iter()
            .try_fold(full, |acc, c| acc.intersect(&c.device_bounds()))
            .unwrap_or(IRect::EMPTY)
    }

    fn clip_rect(&mut self, rect: Rect, anti_alias: bool) {
        let clip = RectCoverage::new(&self.ctm, rect, anti_alias).unwrap_or(RectCoverage::Device {
            rect: Rect::ZERO,
            anti_alias: false,
        });
        self.clips.push(clip);
    }

    fn push_clip_stack(&mut self) {
        self.saved.push(SavedState {
            ctm: self.ctm,
            clip_len: self.clips.len(),
        });
    }

    fn pop_clip_stack(&mut self) {
        match self.saved.pop() {
            Some(state) => {
                self.ctm = state.ctm;
                self.clips.truncate(state.clip_len);
            }
            None => debug_assert!(false, "unbalanced pop_clip_stack"),
        }
    }

    fn reset_clip_stack(&mut self) {
        self.saved.clear();
        self.clips.clear();
        self.ctm = Matrix::IDENTITY;
    }

    fn draw_paint(&mut self, paint: &Paint) {
        let cs = self.color_space();
        let inverse = match &paint.shader {
            Some(_) => match self.ctm.invert() {
                Some(inv) => inv,
                None => return,
            },
            None => Matrix::IDENTITY,
        };
        let area = IRect::from_size(self.pixmap.size());
        self.shade(area, paint.blend_mode, |_, _, p| {
            let c = match &paint.shader {
                Some(s) => s.eval(inverse.map_point(p), cs),
                None => paint.color,
            };
            let c = match &paint.color_filter {
                Some(cf) => cf.filter_color(c),
                None => c,
            };
            (c, 1.0)
        });
    }

    fn draw_special(
        &mut self,
        image: &SpecialImage,
        local: &Matrix,
        sampling: SamplingOptions,
        paint: &Paint,
        constraint: SrcRectConstraint,
    ) {
        let total = self.ctm.pre_concat(local);
        let strict = constraint == SrcRectConstraint::Strict;
        let Some(shader) = Shader::image(image.clone(), TileMode::Clamp, sampling, &total, strict)
        else {
            return;
        };
        let bounds = IRect::from_size(image.dimensions()).to_rect();
        let Some(geometry) = RectCoverage::new(&total, bounds, paint.anti_alias) else {
            return;
        };
        let cs = self.color_space();
        self.shade(geometry.device_bounds(), paint.blend_mode, |x, y, p| {
            let cov = geometry.coverage(x, y);
            if cov <= 0.0 {
                return (Color4f::TRANSPARENT, 0.0);
            }
            let c = shader.eval(p, cs);
            let c = match &paint.color_filter {
                Some(cf) => cf.filter_color(c),
                None => c,
            };
            (c, cov)
        });
    }

    fn draw_picture(&mut self, picture: &Picture) {
        let Some(a) = self.ctm.to_affine() else {
            tracing::trace!("picture playback under perspective is not supported");
            return;
        };
        let size = self.pixmap.size();
        let Some(mut rendered) =
            resvg::tiny_skia::Pixmap::new(size.width as u32, size.height as u32)
        else {
            return;
        };
        let [sx, ky, kx, sy, tx, ty] = a.as_coeffs();
        let transform = resvg::tiny_skia::Transform::from_row(
            sx as f32, ky as f32, kx as f32, sy as f32, tx as f32, ty as f32,
        );
        resvg::render(picture.tree(), transform, &mut rendered.as_mut());

        let cs = self.color_space();
        let width = size.width as usize;
        let bytes = rendered.data();
        let area = IRect::from_size(size);
        self.shade(area, BlendMode::SrcOver, |x, y, _| {
            let idx = (y as usize * width + x as usize) * 4;
            let px = [bytes[idx], bytes[idx + 1], bytes[idx + 2], bytes[idx + 3]];
            if px[3] == 0 {
                return (Color4f::TRANSPARENT, 0.0);
            }
            let c = ColorSpace::Srgb.convert(Color4f::from_rgba8_premul(px), cs);
            (c, 1.0)
        });
    }

    fn set_immutable(&mut self) {
        self.immutable = true;
    }

    fn snap_special(&mut self, subset: IRect) -> Option<SpecialImage> {
        SpecialImage::new(Arc::clone(&self.pixmap), subset)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/raster.rs"]
mod tests;
