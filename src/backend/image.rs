//! Backing pixel storage and the subset views that filter results sample from.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::{Color4f, Rect};
use crate::foundation::error::{FxError, FxResult};
use crate::geometry::irect::{IRect, ISize};
use crate::geometry::matrix::Matrix;
use crate::paint::sampling::{SamplingOptions, TileMode};
use crate::paint::shader::Shader;

/// Color space pixel values are encoded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    /// sRGB primaries with the sRGB transfer curve.
    #[default]
    Srgb,
    /// sRGB primaries with a linear transfer curve.
    LinearSrgb,
}

impl ColorSpace {
    /// Re-encode a premultiplied color from `self` into `dst`.
    pub fn convert(self, c: Color4f, dst: ColorSpace) -> Color4f {
        if self == dst || c.is_transparent() {
            return c;
        }
        let [r, g, b, a] = c.unpremul();
        let f = match (self, dst) {
            (Self::Srgb, Self::LinearSrgb) => srgb_to_linear,
            _ => linear_to_srgb,
        };
        Color4f::from_straight(f(r), f(g), f(b), a)
    }
}

fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// In-memory pixel layout of device buffers and images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorType {
    /// Four 8-bit channels, color premultiplied by alpha.
    #[default]
    Rgba8Premul,
}

/// Owned premultiplied RGBA8 pixels.
#[derive(Clone, PartialEq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    data: Vec<u8>,
}

impl fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pixmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("color_space", &self.color_space)
            .finish_non_exhaustive()
    }
}

impl Pixmap {
    /// Allocate a transparent pixmap.
    pub fn new(width: u32, height: u32, color_space: ColorSpace) -> FxResult<Self> {
        let len = byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            color_space,
            data: vec![0; len],
        })
    }

    /// Wrap bytes that are already premultiplied RGBA8.
    pub fn from_premul_rgba8(
        width: u32,
        height: u32,
        data: Vec<u8>,
        color_space: ColorSpace,
    ) -> FxResult<Self> {
        let len = byte_len(width, height)?;
        if data.len() != len {
            return Err(FxError::validation(format!(
                "pixmap byte len mismatch: expected {len}, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            color_space,
            data,
        })
    }

    /// Premultiply a straight-alpha bitmap.
    pub fn from_rgba_image(img: &image::RgbaImage, color_space: ColorSpace) -> FxResult<Self> {
        let (width, height) = img.dimensions();
        let mut data = img.as_raw().clone();
        premultiply_rgba8_in_place(&mut data);
        Self::from_premul_rgba8(width, height, data, color_space)
    }

    /// Decode any format the `image` crate understands. Pixels are tagged sRGB.
    pub fn decode(bytes: &[u8]) -> FxResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        Self::from_rgba_image(&dyn_img.to_rgba8(), ColorSpace::Srgb)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> ISize {
        ISize::new(self.width as i32, self.height as i32)
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Premultiplied pixel; out-of-range coordinates read transparent.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

fn byte_len(width: u32, height: u32) -> FxResult<usize> {
    if width == 0 || height == 0 {
        return Err(FxError::validation("pixmap dimensions must be non-zero"));
    }
    if width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(FxError::validation("pixmap dimensions exceed i32"));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| FxError::allocation(format!("pixmap {width}x{height} overflows usize")))
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

/// An immutable rectangular view into shared pixels.
///
/// The subset is expressed in backing-store pixels. All coordinates taken by methods on this
/// type are relative to the subset's top-left corner.
#[derive(Clone)]
pub struct SpecialImage {
    pixmap: Arc<Pixmap>,
    subset: IRect,
}

impl fmt::Debug for SpecialImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecialImage")
            .field("subset", &self.subset)
            .field("backing", &self.pixmap.size())
            .finish()
    }
}

impl SpecialImage {
    /// `None` unless `subset` is non-empty and lies within the pixmap.
    pub fn new(pixmap: Arc<Pixmap>, subset: IRect) -> Option<Self> {
        let bounds = IRect::from_size(pixmap.size());
        bounds
            .contains(&subset)
            .then_some(Self { pixmap, subset })
    }

    /// View the whole pixmap.
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        let subset = IRect::from_size(pixmap.size());
        Self {
            pixmap: Arc::new(pixmap),
            subset,
        }
    }

    pub fn width(&self) -> i32 {
        self.subset.width()
    }

    pub fn height(&self) -> i32 {
        self.subset.height()
    }

    pub fn dimensions(&self) -> ISize {
        self.subset.size()
    }

    /// Subset within the backing store.
    pub fn subset(&self) -> IRect {
        self.subset
    }

    pub fn backing_store_dimensions(&self) -> ISize {
        self.pixmap.size()
    }

    /// Whether the subset covers the whole backing store.
    pub fn is_exact_fit(&self) -> bool {
        self.subset.size() == self.pixmap.size()
    }

    pub fn color_space(&self) -> ColorSpace {
        self.pixmap.color_space()
    }

    pub fn color_type(&self) -> ColorType {
        ColorType::Rgba8Premul
    }

    pub fn pixmap(&self) -> &Arc<Pixmap> {
        &self.pixmap
    }

    /// Sub-view over `rect` (relative to this view), clipped to this view.
    pub fn make_subset(&self, rect: IRect) -> Option<Self> {
        let abs = rect.offset(self.subset.left, self.subset.top);
        let clipped = abs.intersect(&self.subset)?;
        Some(Self {
            pixmap: Arc::clone(&self.pixmap),
            subset: clipped,
        })
    }

    /// Whether both views share the same backing store and subset.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.pixmap, &b.pixmap) && a.subset == b.subset
    }

    /// Pixel relative to the subset; outside the subset reads transparent.
    pub fn pixel(&self, x: i32, y: i32) -> [u8; 4] {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return [0; 4];
        }
        self.pixmap.pixel(
            (x + self.subset.left) as u32,
            (y + self.subset.top) as u32,
        )
    }

    pub(crate) fn backing_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixmap.pixel(x, y)
    }

    /// Copy the subset's pixels into a tightly packed buffer.
    pub fn to_premul_rgba8(&self) -> Vec<u8> {
        let row_bytes = self.pixmap.width() as usize * 4;
        let mut out = Vec::with_capacity(self.subset.size().area() as usize * 4);
        for y in self.subset.top..self.subset.bottom {
            let start = y as usize * row_bytes + self.subset.left as usize * 4;
            out.extend_from_slice(&self.pixmap.data()[start..start + self.width() as usize * 4]);
        }
        out
    }

    /// Shader sampling this image. `local` maps subset-local pixels into shader space.
    pub fn as_shader(
        &self,
        tile: TileMode,
        sampling: SamplingOptions,
        local: &Matrix,
        strict: bool,
    ) -> Option<Shader> {
        Shader::image(self.clone(), tile, sampling, local, strict)
    }
}

/// Recorded vector content that devices can play back at any transform.
#[derive(Clone)]
pub struct Picture {
    tree: Arc<usvg::Tree>,
    cull_rect: Rect,
}

impl fmt::Debug for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Picture")
            .field("cull_rect", &self.cull_rect)
            .finish_non_exhaustive()
    }
}

impl Picture {
    /// Parse an SVG document. The cull rect is the document's viewport.
    pub fn from_svg_data(bytes: &[u8]) -> FxResult<Self> {
        let opts = usvg::Options::default();
        let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
        let size = tree.size();
        let cull_rect = Rect::new(0.0, 0.0, f64::from(size.width()), f64::from(size.height()));
        Ok(Self {
            tree: Arc::new(tree),
            cull_rect,
        })
    }

    /// Conservative bounds of everything the picture draws.
    pub fn cull_rect(&self) -> Rect {
        self.cull_rect
    }

    pub(crate) fn tree(&self) -> &usvg::Tree {
        &self.tree
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/image.rs"]
mod tests;
