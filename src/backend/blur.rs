//! Separable Gaussian blur over premultiplied RGBA8, with Q16 fixed-point kernels.

use std::sync::Arc;

use crate::backend::cache::KernelCache;
use crate::backend::for_each_row;
use crate::backend::image::{ColorType, Pixmap, SpecialImage};
use crate::backend::{BlurAlgorithm, BlurEngine};
use crate::foundation::core::Size;
use crate::foundation::error::{FxError, FxResult};
use crate::geometry::irect::IRect;
use crate::paint::sampling::TileMode;

/// Sigmas at or below this blur nothing visible.
const MIN_SIGMA: f64 = 0.03;

/// Kernel half-width covering three standard deviations.
pub fn blur_radius(sigma: f64) -> u32 {
    if sigma <= MIN_SIGMA || !sigma.is_finite() {
        0
    } else {
        (3.0 * sigma).ceil() as u32
    }
}

/// `2 * radius + 1` weights summing to exactly `1 << 16`.
pub fn gaussian_kernel_q16(radius: u32, sigma: f64) -> FxResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(FxError::validation("blur sigma must be finite and > 0"));
    }

    let r = radius as i32;
    let denom = 2.0 * sigma * sigma;
    let weights_f = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect::<Vec<_>>();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(FxError::validation("gaussian kernel sum is zero"));
    }

    let mut weights = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect::<Vec<_>>();
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

/// CPU Gaussian blur offered by the raster backend.
pub struct GaussianBlur {
    max_sigma: f64,
    parallel_threshold_px: u64,
    kernels: Arc<KernelCache>,
}

impl GaussianBlur {
    pub fn new(max_sigma: f64, parallel_threshold_px: u64, kernels: Arc<KernelCache>) -> Self {
        Self {
            max_sigma,
            parallel_threshold_px,
            kernels,
        }
    }

    fn kernel(&self, sigma: f64) -> Option<Arc<[u32]>> {
        let radius = blur_radius(sigma);
        match self.kernels.get_or_build(radius, sigma, gaussian_kernel_q16) {
            Ok(k) => Some(k),
            Err(err) => {
                tracing::warn!(%err, sigma, "blur kernel unavailable");
                None
            }
        }
    }
}

impl BlurEngine for GaussianBlur {
    fn find_algorithm(&self, _sigma: Size, color_type: ColorType) -> Option<&dyn BlurAlgorithm> {
        match color_type {
            ColorType::Rgba8Premul => Some(self),
        }
    }
}

impl BlurAlgorithm for GaussianBlur {
    fn max_sigma(&self) -> f64 {
        self.max_sigma
    }

    #[tracing::instrument(skip(self, src), fields(src = ?src.dimensions()))]
    fn blur(
        &self,
        sigma: Size,
        src: &SpecialImage,
        src_rect: IRect,
        tile_mode: TileMode,
        dst_rect: IRect,
    ) -> Option<SpecialImage> {
        if src_rect.is_empty() || dst_rect.is_empty() {
            return None;
        }
        if sigma.width > self.max_sigma || sigma.height > self.max_sigma {
            tracing::trace!(max = self.max_sigma, "sigma above supported maximum");
            return None;
        }
        let kx = self.kernel(sigma.width)?;
        let ky = self.kernel(sigma.height)?;
        let rx = (kx.len() / 2) as i32;
        let ry = (ky.len() / 2) as i32;

        let dw = dst_rect.width() as usize;
        let dh = dst_rect.height() as usize;
        let pw = dw + 2 * rx as usize;
        let ph = dh + 2 * ry as usize;

        // Tiled source over dst_rect grown by the kernel radii.
        let (sw, sh) = (src_rect.width64(), src_rect.height64());
        let mut padded = vec![0u8; pw * ph * 4];
        for_each_row(&mut padded, pw * 4, self.parallel_threshold_px, |j, row| {
            let y = i64::from(dst_rect.top - ry) + j as i64 - i64::from(src_rect.top);
            let Some(ty) = tile_mode.tile_coord(y, sh) else {
                return;
            };
            for (i, px) in row.chunks_exact_mut(4).enumerate() {
                let x = i64::from(dst_rect.left - rx) + i as i64 - i64::from(src_rect.left);
                if let Some(tx) = tile_mode.tile_coord(x, sw) {
                    px.copy_from_slice(&src.pixel(
                        tx as i32 + src_rect.left,
                        ty as i32 + src_rect.top,
                    ));
                }
            }
        });

        let mut horizontal = vec![0u8; dw * ph * 4];
        for_each_row(&mut horizontal, dw * 4, self.parallel_threshold_px, |j, row| {
            let src_row = &padded[j * pw * 4..(j + 1) * pw * 4];
            for (i, out) in row.chunks_exact_mut(4).enumerate() {
                let mut acc = [0u64; 4];
                for (t, &w) in kx.iter().enumerate() {
                    let idx = (i + t) * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(w) * u64::from(src_row[idx + c]);
                    }
                }
                for c in 0..4 {
                    out[c] = q16_to_u8(acc[c]);
                }
            }
        });

        let mut out = vec![0u8; dw * dh * 4];
        for_each_row(&mut out, dw * 4, self.parallel_threshold_px, |j, row| {
            for (i, px) in row.chunks_exact_mut(4).enumerate() {
                let mut acc = [0u64; 4];
                for (t, &w) in ky.iter().enumerate() {
                    let idx = ((j + t) * dw + i) * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(w) * u64::from(horizontal[idx + c]);
                    }
                }
                for c in 0..4 {
                    px[c] = q16_to_u8(acc[c]);
                }
            }
        });

        let pixmap = Pixmap::from_premul_rgba8(dw as u32, dh as u32, out, src.color_space()).ok()?;
        Some(SpecialImage::from_pixmap(pixmap))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/blur.rs"]
mod tests;
