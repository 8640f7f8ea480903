use crate::backend::SpecialImage;
use crate::context::Context;
use crate::filter_result::{AutoSurface, BoundsAnalysis, FilterResult, extract_subset};
use crate::foundation::core::{Rect, Size};
use crate::foundation::math::{ROUND_EPSILON, next_log2};
use crate::geometry::irect::{IPoint, IRect};
use crate::geometry::matrix::Matrix;
use crate::geometry::space::LayerSpace;
use crate::paint::Paint;
use crate::paint::sampling::{SamplingOptions, TileMode};

/// Remaining scale above which a multi-pass rescale drops its last pass.
const MULTI_PASS_LIMIT: f64 = 0.8;
/// Remaining scale above which a single pass is skipped entirely.
const NEAR_IDENTITY_LIMIT: f64 = 1.0 - ROUND_EPSILON;
/// Smallest scale whose pass count fits in the step counter.
const MIN_SCALE: f64 = 1.0 / u32::MAX as f64;

/// Number of passes to reach `scale`: halvings, then one pass between 1/2 and 1.
///
/// The last pass is folded into the previous halving when it is close to the identity.
pub(crate) fn downscale_step_count(scale: f64) -> u32 {
    let mut steps = next_log2((1.0 / scale).ceil() as u32);
    if steps > 0 {
        let final_step_scale = scale * f64::from(1u32 << (steps - 1));
        let limit = if steps == 1 {
            NEAR_IDENTITY_LIMIT
        } else {
            MULTI_PASS_LIMIT
        };
        if final_step_scale >= limit {
            steps -= 1;
        }
    }
    steps
}

impl FilterResult {
    /// Downscale by `scale` per axis in passes of at most 2x, returning a value that is upscaled
    /// back to the original layer bounds.
    ///
    /// With `enforce_decal` the result reports decal tiling.
    #[tracing::instrument(level = "trace", skip(self, ctx), fields(bounds = ?self.layer_bounds))]
    pub fn rescale(&self, ctx: &Context, scale: LayerSpace<Size>, enforce_decal: bool) -> Self {
        let desired = ctx.desired_output();
        let Some(image) = &self.image else {
            return Self::default();
        };
        let Some(visible_layer_bounds) = self.layer_bounds.intersect(&desired) else {
            return Self::default();
        };
        let usable = |s: f64| s.is_finite() && s >= MIN_SCALE;
        if !usable(scale.width()) || !usable(scale.height()) {
            return Self::default();
        }

        let mut x_steps = downscale_step_count(scale.width());
        let mut y_steps = downscale_step_count(scale.height());

        // Before the first pass, pixel space is layer space.
        let pixel_origin = self.transform.nearly_integer_translation();
        let analysis = self.analyze_bounds(&desired);

        let can_defer_tiling = pixel_origin.is_some()
            && !analysis.contains(BoundsAnalysis::REQUIRES_LAYER_CROP)
            && !(enforce_decal && analysis.contains(BoundsAnalysis::HAS_LAYER_FILLING_EFFECT));
        let has_effects_to_apply = !can_defer_tiling
            || self.color_filter.is_some()
            || image.color_type() != ctx.backend().color_type()
            || image.color_space() != ctx.color_space();
        tracing::trace!(x_steps, y_steps, can_defer_tiling, "rescale plan");

        let mut origin = pixel_origin.unwrap_or(LayerSpace::new(IPoint::ZERO));
        if x_steps == 0 && y_steps == 0 && !has_effects_to_apply {
            if analysis.contains(BoundsAnalysis::HAS_LAYER_FILLING_EFFECT) {
                // Only the tiling is visible; it keeps working from the same image.
                let mut noop = self.clone();
                noop.layer_bounds = visible_layer_bounds;
                return noop;
            }
            return extract_subset(image, origin, &visible_layer_bounds, false);
        }

        let (src_rect, mut tile_mode) =
            if can_defer_tiling && analysis.contains(BoundsAnalysis::HAS_LAYER_FILLING_EFFECT) {
                // Downscale the untiled image and tile the small result.
                let rect = IRect::from_origin_size(*origin.get(), image.dimensions());
                (LayerSpace::new(rect), self.tile_mode)
            } else {
                (visible_layer_bounds, TileMode::Decal)
            };
        let src_rect = src_rect.relevant_subset(&desired, tile_mode);
        if src_rect.is_empty() {
            return Self::default();
        }

        // The logical size is tracked in floats so rounding doesn't accumulate across passes.
        // Pixel bounds carry one pixel of padding that holds the tiled or transparent edge.
        let mut step_bounds = src_rect.to_rect().into_inner();
        let mut step_pixel_bounds = src_rect.get().outset(1, 1);

        let mut current: Option<SpecialImage> = None;
        while current.is_none() || x_steps > 0 || y_steps > 0 {
            let mut sx = 1.0;
            if x_steps > 0 {
                sx = if x_steps > 1 {
                    0.5
                } else {
                    f64::from(src_rect.width()) * scale.width() / step_bounds.width()
                };
                x_steps -= 1;
            }
            let mut sy = 1.0;
            if y_steps > 0 {
                sy = if y_steps > 1 {
                    0.5
                } else {
                    f64::from(src_rect.height()) * scale.height() / step_bounds.height()
                };
                y_steps -= 1;
            }

            let dst_bounds = Rect::new(
                0.0,
                0.0,
                step_bounds.width() * sx,
                step_bounds.height() * sy,
            );
            let mut dst_pixel_bounds = IRect::round_out(&dst_bounds);
            if matches!(tile_mode, TileMode::Clamp | TileMode::Decal) {
                // Pad far enough that bilinear taps never reach past the padded source texel.
                // The left edge stays pixel aligned, so measure from the right.
                let src_frac_x = f64::from(step_pixel_bounds.right) - step_bounds.x1 - 0.5;
                let dst_frac_x = f64::from(dst_pixel_bounds.right) - dst_bounds.x1 - 0.5;
                let px = ((sx * src_frac_x - dst_frac_x).ceil() as i32).max(1);

                let src_frac_y = f64::from(step_pixel_bounds.bottom) - step_bounds.y1 - 0.5;
                let dst_frac_y = f64::from(dst_pixel_bounds.bottom) - dst_bounds.y1 - 0.5;
                let py = ((sy * src_frac_y - dst_frac_y).ceil() as i32).max(1);

                dst_pixel_bounds = dst_pixel_bounds.outset(px, py);
            }

            let Some(scale_xform) = Matrix::rect_to_rect(&step_bounds, &dst_bounds) else {
                return Self::default();
            };
            let mut surface = AutoSurface::new(ctx, LayerSpace::new(dst_pixel_bounds), false, None);
            let Some(device) = surface.device() else {
                tracing::trace!("rescale pass has no surface");
                return Self::default();
            };
            device.concat(&scale_xform);

            let shader = match &current {
                None => {
                    // The decal edge is restored by the final upscale, so it isn't needed here.
                    let mut first = self.analyze_bounds_with(&scale_xform, &dst_pixel_bounds);
                    first.remove(BoundsAnalysis::REQUIRES_DECAL_IN_LAYER_SPACE);
                    self.analyzed_shader_view(ctx, self.sampling, first)
                }
                Some(previous) => {
                    if !previous.is_exact_fit() {
                        ctx.mark_shader_based_tiling_required(tile_mode);
                    }
                    let local = Matrix::translate(f64::from(origin.x()), f64::from(origin.y()));
                    previous.as_shader(tile_mode, SamplingOptions::LINEAR, &local, true)
                }
            };
            if let Some(shader) = shader {
                device.draw_paint(&Paint::default().with_shader(shader));
            }

            if tile_mode == TileMode::Decal {
                // The transparent border is baked into the padding now.
                tile_mode = TileMode::Clamp;
            }

            let Some((image, snapped_origin)) = surface.snap().into_image_and_origin() else {
                return Self::default();
            };
            current = Some(image);
            origin = snapped_origin;
            step_bounds = dst_bounds;
            step_pixel_bounds = dst_pixel_bounds;
        }

        let Some(image) = current else {
            return Self::default();
        };
        let Some(upscale) = Matrix::rect_to_rect(&step_bounds, &src_rect.to_rect().into_inner())
        else {
            return Self::default();
        };
        let mut result = Self::new(image, origin);
        result.transform = result.transform.post_concat(&LayerSpace::new(upscale));
        result.layer_bounds = visible_layer_bounds;
        result.tile_mode = if enforce_decal {
            // Labelling only: the padding already holds the transparent edge.
            debug_assert_eq!(tile_mode, TileMode::Clamp);
            TileMode::Decal
        } else {
            tile_mode
        };
        result
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter_result/rescale.rs"]
mod tests;
