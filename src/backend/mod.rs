//! Services the compositing core consumes: render targets, image wrapping and blur kernels.
//!
//! [`Backend`] is the capability surface selected once per evaluation. The crate ships a CPU
//! implementation in [`raster`].

pub mod blur;
pub mod cache;
pub mod device;
pub mod image;
pub mod raster;

use std::sync::Arc;

use crate::foundation::core::Size;
use crate::geometry::irect::{IRect, ISize};

pub use self::device::{Device, SrcRectConstraint};
pub use self::image::{ColorSpace, ColorType, Picture, Pixmap, SpecialImage};

/// Subpixel layout of the physical display, used by text rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelGeometry {
    #[default]
    Unknown,
    RgbH,
    BgrH,
    RgbV,
    BgrV,
}

/// Properties propagated to every surface a backend creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SurfaceProps {
    pub pixel_geometry: PixelGeometry,
    pub use_device_independent_fonts: bool,
}

impl SurfaceProps {
    pub fn clone_with_pixel_geometry(&self, pixel_geometry: PixelGeometry) -> Self {
        Self {
            pixel_geometry,
            ..*self
        }
    }
}

/// Allocation and wrapping services for one kind of device.
pub trait Backend: Send + Sync {
    /// A cleared render target, or `None` when allocation fails.
    ///
    /// `props` overrides [`Backend::surface_props`] for this device only.
    fn make_device(
        &self,
        size: ISize,
        color_space: ColorSpace,
        props: Option<&SurfaceProps>,
    ) -> Option<Box<dyn Device>>;

    /// Wrap `subset` of `pixmap` as an image this backend can draw.
    fn make_image(&self, subset: IRect, pixmap: &Arc<Pixmap>) -> Option<SpecialImage>;

    /// Import a straight-alpha bitmap.
    fn get_cached_bitmap(&self, bitmap: &::image::RgbaImage) -> Option<SpecialImage>;

    fn blur_engine(&self) -> Option<&dyn BlurEngine>;

    fn color_type(&self) -> ColorType;

    fn surface_props(&self) -> &SurfaceProps;
}

/// Provider of blur algorithms.
pub trait BlurEngine: Send + Sync {
    /// An algorithm able to blur `color_type` images at `sigma`, if any.
    fn find_algorithm(&self, sigma: Size, color_type: ColorType) -> Option<&dyn BlurAlgorithm>;
}

/// A Gaussian blur implementation.
pub trait BlurAlgorithm: Send + Sync {
    /// Largest per-axis sigma `blur` accepts.
    fn max_sigma(&self) -> f64;

    /// Blur `src` and return the pixels covering `dst_rect`.
    ///
    /// Both rects are relative to `src`. Pixels outside `src_rect` are produced by tiling
    /// `src_rect` with `tile_mode`. The result is `dst_rect.size()` pixels.
    fn blur(
        &self,
        sigma: Size,
        src: &SpecialImage,
        src_rect: IRect,
        tile_mode: crate::paint::sampling::TileMode,
        dst_rect: IRect,
    ) -> Option<SpecialImage>;
}

/// Run `f(row_index, row_bytes)` over every `row_len`-byte row of `data`, on rayon when there
/// are at least `parallel_threshold_px` pixels.
pub(crate) fn for_each_row<F>(data: &mut [u8], row_len: usize, parallel_threshold_px: u64, f: F)
where
    F: Fn(usize, &mut [u8]) + Send + Sync,
{
    use rayon::prelude::*;

    if row_len == 0 {
        return;
    }
    let px = (data.len() / 4) as u64;
    if px >= parallel_threshold_px {
        data.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    } else {
        data.chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }
}
