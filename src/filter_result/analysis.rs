use bitflags::bitflags;

use crate::filter_result::FilterResult;
use crate::foundation::math::{ROUND_EPSILON, nearly_equal};
use crate::geometry::irect::IRect;
use crate::geometry::matrix::Matrix;
use crate::geometry::quad::{quad_contains_rect, quad_contains_rect_mask};
use crate::geometry::rect::RectExt;
use crate::geometry::space::LayerSpace;
use crate::paint::color_filter::ColorFilter;
use crate::paint::sampling::{SamplingOptions, TileMode};

bitflags! {
    /// Which deferred effects of a [`FilterResult`] are visible over a destination region.
    ///
    /// Always derived from the current state at the point of a decision and never stored.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BoundsAnalysis: u8 {
        /// Some destination pixels fall outside the transformed image.
        const DST_BOUNDS_NOT_COVERED = 1 << 0;
        /// Pixels outside the image are filled, by tiling or by a color filter that changes
        /// transparent black.
        const HAS_LAYER_FILLING_EFFECT = 1 << 1;
        /// The layer bounds cut off visible content, so they must be applied as a clip or by
        /// resolving first.
        const REQUIRES_LAYER_CROP = 1 << 2;
        /// Filter taps leave the image subset across an edge that isn't the backing store's.
        const REQUIRES_SHADER_TILING = 1 << 3;
        /// The decal edge is visible under a non-unit scale and has to be antialiased in layer
        /// space.
        const REQUIRES_DECAL_IN_LAYER_SPACE = 1 << 4;
    }
}

bitflags! {
    /// How the shader returned by [`FilterResult::as_shader`] will be sampled.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ShaderFlags: u8 {
        /// Evaluated more than once per output pixel.
        const SAMPLED_REPEATEDLY = 1 << 0;
        /// Sample coordinates are not pixel aligned.
        const NON_TRIVIAL_SAMPLING = 1 << 1;
    }
}

/// Net scale factors within this distance of 1 leave the decal edge crisp enough.
const DECAL_SCALE_TOLERANCE: f64 = 0.2;

impl FilterResult {
    /// Analyze this result as drawn over `dst_bounds` in layer space.
    pub fn analyze_bounds(&self, dst_bounds: &LayerSpace<IRect>) -> BoundsAnalysis {
        self.analyze_bounds_with(&Matrix::IDENTITY, dst_bounds.get())
    }

    /// Analyze this result as drawn through `xtra` over `dst_bounds`, which is in the output
    /// space of `xtra`. A transparent result has nothing to analyze.
    pub(crate) fn analyze_bounds_with(&self, xtra: &Matrix, dst_bounds: &IRect) -> BoundsAnalysis {
        let Some(image) = self.image() else {
            return BoundsAnalysis::empty();
        };
        let mut analysis = BoundsAnalysis::empty();
        let fills_layer_bounds = self.tile_mode() != TileMode::Decal
            || self
                .color_filter()
                .is_some_and(ColorFilter::affects_transparent_black);

        // Is the layer bounds edge visible in the destination?
        let layer_bounds = self.layer_bounds().into_inner();
        let mut pixel_centers = dst_bounds.to_rect();
        if !quad_contains_rect(xtra, &layer_bounds.to_rect(), &pixel_centers, ROUND_EPSILON) {
            let requires_layer_crop = fills_layer_bounds || {
                let image_bounds = self
                    .transform()
                    .get()
                    .map_irect(&IRect::from_size(image.dimensions()));
                !layer_bounds.contains(&image_bounds)
            };
            if requires_layer_crop {
                analysis |= BoundsAnalysis::REQUIRES_LAYER_CROP;
                // The crop is applied outside the sampling, so sampling can stop at it. Disjoint
                // bounds keep the full destination.
                let in_dst = xtra.map_irect(&layer_bounds).to_rect();
                if let Some(r) = pixel_centers.intersection(&in_dst) {
                    pixel_centers = r;
                }
            }
        }

        // Are tiling or the color filter visible where the image is sampled?
        let image_bounds = IRect::from_size(image.dimensions()).to_rect();
        let net = self.transform().get().post_concat(xtra);
        if !quad_contains_rect(&net, &image_bounds, &pixel_centers, ROUND_EPSILON) {
            analysis |= BoundsAnalysis::DST_BOUNDS_NOT_COVERED;
            if fills_layer_bounds {
                analysis |= BoundsAnalysis::HAS_LAYER_FILLING_EFFECT;
            }
        }

        // Would filter taps read outside the subset without shader clamping?
        let sampling = self.sampling();
        let radius = sampling.sample_radius();
        let mut safe_bounds = image_bounds.inset_xy(radius, radius);
        if sampling == Self::DEFAULT_SAMPLING && !net.is_nearly_integer_translation() {
            // A bilinear tap exactly half a pixel in still touches the neighbor with zero weight.
            safe_bounds = safe_bounds.inset_xy(ROUND_EPSILON, ROUND_EPSILON);
        }
        let pixel_centers = pixel_centers.inset_xy(0.5, 0.5);

        let edges = quad_contains_rect_mask(&net, &safe_bounds, &pixel_centers, ROUND_EPSILON);
        if !edges.iter().all(|&inside| inside) {
            let subset = image.subset();
            let backing = image.backing_store_dimensions();
            // Top, right, bottom, left.
            let mut hw_edges = [
                subset.top == 0,
                subset.right == backing.width,
                subset.bottom == backing.height,
                subset.left == 0,
            ];
            if self.tile_mode().is_periodic() {
                // Periodic tiling needs both edges of an axis to be backing store edges.
                hw_edges = [
                    hw_edges[0] && hw_edges[2],
                    hw_edges[1] && hw_edges[3],
                    hw_edges[2] && hw_edges[0],
                    hw_edges[3] && hw_edges[1],
                ];
            }
            if !edges.iter().zip(hw_edges).all(|(&e, hw)| e || hw) {
                analysis |= BoundsAnalysis::REQUIRES_SHADER_TILING;
            }

            if self.tile_mode() == TileMode::Decal && sampling != SamplingOptions::NEAREST {
                let unit_scale = net.min_max_scales().is_some_and(|(lo, hi)| {
                    nearly_equal(lo, 1.0, DECAL_SCALE_TOLERANCE)
                        && nearly_equal(hi, 1.0, DECAL_SCALE_TOLERANCE)
                });
                if !unit_scale {
                    analysis |= BoundsAnalysis::REQUIRES_DECAL_IN_LAYER_SPACE;
                }
            }
        }

        analysis
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter_result/analysis.rs"]
mod tests;
