//! Deferred image values and the operations that compose them.
//!
//! A [`FilterResult`] is an image plus a layer-space transform, sampling, tiling, a color filter
//! and a crop, all of which are applied lazily. Each operation first tries to fold its effect
//! into that metadata and only renders a new image when the composition would be visibly wrong.

mod analysis;
mod builder;
mod draw;
mod rescale;
mod surface;

use std::sync::Arc;

use crate::backend::{PixelGeometry, Picture, Pixmap, SpecialImage, SrcRectConstraint};
use crate::context::Context;
use crate::foundation::core::{Color4f, Rect};
use crate::foundation::math::saturate_i32;
use crate::geometry::irect::{IPoint, IRect, ISize};
use crate::geometry::matrix::Matrix;
use crate::geometry::space::{LayerSpace, ParameterSpace};
use crate::paint::Paint;
use crate::paint::color_filter::ColorFilter;
use crate::paint::sampling::{SamplingOptions, TileMode, compatible_sampling};
use crate::paint::shader::Shader;

pub use analysis::{BoundsAnalysis, ShaderFlags};
pub use builder::Builder;
pub(crate) use surface::AutoSurface;

/// Lazily evaluated image in layer space.
///
/// Without an image the value is fully transparent and every other field is ignored. Values are
/// immutable: each operation returns a new value, and values freely share backing images.
#[derive(Clone, Debug)]
pub struct FilterResult {
    image: Option<SpecialImage>,
    /// Maps the image's subset-local pixels into layer space.
    transform: LayerSpace<Matrix>,
    sampling: SamplingOptions,
    tile_mode: TileMode,
    /// Applied after sampling and tiling, before the layer bounds crop.
    color_filter: Option<ColorFilter>,
    /// Transparent outside, for decal tiling. For the other modes this is the area the tiling
    /// fills.
    layer_bounds: LayerSpace<IRect>,
}

impl Default for FilterResult {
    fn default() -> Self {
        Self {
            image: None,
            transform: LayerSpace::<Matrix>::identity(),
            sampling: Self::DEFAULT_SAMPLING,
            tile_mode: TileMode::Decal,
            color_filter: None,
            layer_bounds: LayerSpace::<IRect>::empty(),
        }
    }
}

impl FilterResult {
    /// Sampling used when a transform doesn't ask for anything else.
    pub const DEFAULT_SAMPLING: SamplingOptions = SamplingOptions::LINEAR;

    /// `image` placed with its top-left at `origin`, decal tiled.
    pub fn new(image: SpecialImage, origin: LayerSpace<IPoint>) -> Self {
        let transform = LayerSpace::<Matrix>::translate(origin);
        let layer_bounds =
            transform.map_irect(&LayerSpace::new(IRect::from_size(image.dimensions())));
        Self {
            image: Some(image),
            transform,
            layer_bounds,
            ..Self::default()
        }
    }

    /// The fully transparent value.
    pub fn transparent() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&SpecialImage> {
        self.image.as_ref()
    }

    pub fn is_transparent(&self) -> bool {
        self.image.is_none()
    }

    pub fn transform(&self) -> &LayerSpace<Matrix> {
        &self.transform
    }

    pub fn sampling(&self) -> SamplingOptions {
        self.sampling
    }

    pub fn tile_mode(&self) -> TileMode {
        self.tile_mode
    }

    pub fn color_filter(&self) -> Option<&ColorFilter> {
        self.color_filter.as_ref()
    }

    pub fn layer_bounds(&self) -> LayerSpace<IRect> {
        self.layer_bounds
    }

    /// Render every deferred effect over the layer bounds and return the pixels with their
    /// layer-space origin.
    pub fn image_and_offset(&self, ctx: &Context) -> Option<(SpecialImage, LayerSpace<IPoint>)> {
        self.resolve(ctx, self.layer_bounds, false).into_image_and_origin()
    }

    /// Image and origin of a value whose transform is the plain translation set by
    /// [`FilterResult::new`].
    fn into_image_and_origin(self) -> Option<(SpecialImage, LayerSpace<IPoint>)> {
        let origin = self.layer_bounds.top_left();
        self.image.map(|image| (image, origin))
    }

    fn update_tile_mode(&mut self, ctx: &Context, tile_mode: TileMode) {
        if self.image.is_some() {
            self.tile_mode = tile_mode;
            if tile_mode != TileMode::Decal {
                self.layer_bounds = ctx.desired_output();
            }
        }
    }

    /// Crop to `crop` and extend the cropped content with `tile_mode`.
    #[tracing::instrument(level = "trace", skip(self, ctx), fields(bounds = ?self.layer_bounds))]
    pub fn apply_crop(&self, ctx: &Context, crop: LayerSpace<IRect>, tile_mode: TileMode) -> Self {
        let desired = ctx.desired_output();
        if crop.is_empty() || desired.is_empty() {
            return Self::default();
        }
        let Some(image) = &self.image else {
            return Self::default();
        };
        // The part of the crop that can hold anything but transparent black.
        let Some(crop_content) = crop.intersect(&self.layer_bounds) else {
            return Self::default();
        };

        // The part of the crop that matters for tiling the desired output.
        let mut fitted_crop = crop.relevant_subset(&desired, tile_mode);
        // Narrow the content only, so transparent padding survives periodic tiling.
        let Some(mut crop_content) = crop_content.intersect(&fitted_crop) else {
            return Self::default();
        };

        if let Some(periodic) = periodic_axis_transform(tile_mode, &fitted_crop, &desired) {
            tracing::trace!("single period covers output, tiling becomes a transform");
            return self.apply_transform(ctx, &periodic, Self::DEFAULT_SAMPLING);
        }

        let mut tile_mode = tile_mode;
        let mut preserve_transparency_in_crop = false;
        if tile_mode == TileMode::Decal {
            fitted_crop = crop_content;
        } else if fitted_crop.contains(&desired) {
            tile_mode = TileMode::Decal;
            fitted_crop = desired;
        } else if !crop_content.contains(&fitted_crop) {
            // Transparency inside the crop is part of what gets tiled.
            preserve_transparency_in_crop = true;
            if self.tile_mode == TileMode::Decal && tile_mode == TileMode::Clamp {
                // One pixel of the old decal edge is clamped outward.
                crop_content = crop_content.outset(LayerSpace::new(ISize::new(1, 1)));
                fitted_crop = fitted_crop.intersect(&crop_content).unwrap_or(fitted_crop);
            }
        }

        let double_clamp = self.tile_mode == TileMode::Clamp && tile_mode == TileMode::Clamp;
        let origin = if preserve_transparency_in_crop {
            None
        } else {
            self.transform.nearly_integer_translation()
        };
        let origin = origin.filter(|_| {
            double_clamp
                || !self
                    .analyze_bounds(&fitted_crop)
                    .contains(BoundsAnalysis::HAS_LAYER_FILLING_EFFECT)
        });

        if let Some(origin) = origin {
            tracing::trace!("crop by subset extraction");
            let mut restricted = extract_subset(image, origin, &fitted_crop, double_clamp);
            if restricted.image.is_some() {
                restricted.color_filter = self.color_filter.clone();
            }
            restricted.update_tile_mode(ctx, tile_mode);
            restricted
        } else if tile_mode == TileMode::Decal {
            debug_assert!(!preserve_transparency_in_crop);
            tracing::trace!("crop by layer bounds");
            let mut restricted = self.clone();
            restricted.layer_bounds = fitted_crop;
            restricted
        } else {
            tracing::trace!(?tile_mode, "crop by resolving before tiling");
            let mut tiled = self.resolve(ctx, fitted_crop, true);
            tiled.update_tile_mode(ctx, tile_mode);
            tiled
        }
    }

    /// Apply `filter` to every pixel, including the transparent ones it can make visible.
    #[tracing::instrument(level = "trace", skip(self, ctx, filter), fields(bounds = ?self.layer_bounds))]
    pub fn apply_color_filter(&self, ctx: &Context, filter: &ColorFilter) -> Self {
        let desired = ctx.desired_output();
        if desired.is_empty() {
            return Self::default();
        }

        let visible = match self.image {
            Some(_) => self.layer_bounds.intersect(&desired),
            None => None,
        };
        let new_layer_bounds = if filter.affects_transparent_black() {
            let Some(visible) = visible else {
                // Transparent input becomes one solid color, clamp tiled over the output.
                tracing::trace!("filter floods transparent input");
                let pixel = IRect::from_xywh(desired.left(), desired.top(), 1, 1);
                let mut surface = AutoSurface::new(ctx, LayerSpace::new(pixel), false, None);
                if let Some(device) = surface.device() {
                    let paint = Paint::default()
                        .with_color(Color4f::TRANSPARENT)
                        .with_color_filter(Some(filter.clone()));
                    device.draw_paint(&paint);
                }
                let mut solid = surface.snap();
                solid.update_tile_mode(ctx, TileMode::Clamp);
                return solid;
            };

            if self
                .analyze_bounds(&desired)
                .contains(BoundsAnalysis::REQUIRES_LAYER_CROP)
            {
                // The flood must not erase the current crop, so bake it in first.
                tracing::trace!("resolving crop before flooding filter");
                let bounds = visible
                    .outset(LayerSpace::new(ISize::new(1, 1)))
                    .intersect(&desired)
                    .unwrap_or(visible);
                let mut filtered = self.resolve(ctx, bounds, true);
                if filtered.image.is_some() {
                    filtered.color_filter = Some(filter.clone());
                }
                filtered.update_tile_mode(ctx, TileMode::Clamp);
                return filtered;
            }
            desired
        } else {
            match visible {
                Some(visible) => visible,
                None => return Self::default(),
            }
        };

        let mut filtered = self.clone();
        filtered.layer_bounds = new_layer_bounds;
        filtered.color_filter = Some(ColorFilter::compose(filter, self.color_filter.as_ref()));
        filtered
    }

    /// Transform the value by `transform`, resampling with `sampling`.
    #[tracing::instrument(level = "trace", skip(self, ctx), fields(bounds = ?self.layer_bounds))]
    pub fn apply_transform(
        &self,
        ctx: &Context,
        transform: &LayerSpace<Matrix>,
        sampling: SamplingOptions,
    ) -> Self {
        let desired = ctx.desired_output();
        if self.image.is_none() || desired.is_empty() {
            return Self::default();
        }

        let current_is_integer = self.transform.is_nearly_integer_translation();
        let next_is_integer = transform.is_nearly_integer_translation();
        debug_assert!(!current_is_integer || self.sampling == Self::DEFAULT_SAMPLING);
        let next_sampling = if next_is_integer {
            Self::DEFAULT_SAMPLING
        } else {
            sampling
        };

        // A visible crop edge can't move under a non-integer transform without resampling it.
        let is_cropped = !next_is_integer
            && self
                .analyze_bounds_with(transform.get(), desired.get())
                .contains(BoundsAnalysis::REQUIRES_LAYER_CROP);
        let merged = if is_cropped {
            None
        } else {
            compatible_sampling(self.sampling, current_is_integer, next_sampling, next_is_integer)
        };

        let (mut transformed, next_sampling) = match merged {
            Some(merged) => {
                tracing::trace!(?merged, "transform folded into previous");
                (self.clone(), merged)
            }
            None => {
                tracing::trace!(is_cropped, "resolving before transform");
                let Some(tight) = transform.inverse_map_irect(&desired) else {
                    return Self::default();
                };
                let resolved = self.resolve(ctx, tight, false);
                if resolved.image.is_none() {
                    return Self::default();
                }
                (resolved, next_sampling)
            }
        };

        transformed.transform = transformed.transform.post_concat(transform);
        // Fractional steps can cancel out; integer placement never resamples.
        transformed.sampling = if transformed.transform.is_nearly_integer_translation() {
            Self::DEFAULT_SAMPLING
        } else {
            next_sampling
        };
        // Map the old bounds rather than the image so earlier crops are kept.
        let Some(bounds) = transform
            .map_irect(&transformed.layer_bounds)
            .intersect(&desired)
        else {
            return Self::default();
        };
        transformed.layer_bounds = bounds;
        transformed
    }

    /// Play `picture` back in parameter space, clipped to `cull_rect`.
    #[tracing::instrument(level = "trace", skip(ctx, picture))]
    pub fn make_from_picture(
        ctx: &Context,
        picture: &Picture,
        cull_rect: ParameterSpace<Rect>,
    ) -> Self {
        let Some(dst_bounds) = ctx
            .mapping()
            .param_to_layer(&cull_rect)
            .round_out()
            .intersect(&ctx.desired_output())
        else {
            return Self::default();
        };

        // Content is rendered at a resolution unrelated to the display's subpixel layout.
        let props = ctx
            .backend()
            .surface_props()
            .clone_with_pixel_geometry(PixelGeometry::Unknown);
        let mut surface = AutoSurface::new(ctx, dst_bounds, true, Some(&props));
        if let Some(device) = surface.device() {
            device.clip_rect(cull_rect.into_inner(), false);
            device.draw_picture(picture);
        }
        surface.snap()
    }

    /// Fill the desired output with `shader`, which is evaluated in parameter space.
    #[tracing::instrument(level = "trace", skip(ctx))]
    pub fn make_from_shader(ctx: &Context, shader: &Shader) -> Self {
        let mut surface = AutoSurface::new(ctx, ctx.desired_output(), true, None);
        if let Some(device) = surface.device() {
            device.draw_paint(&Paint::default().with_shader(shader.clone()));
        }
        surface.snap()
    }

    /// Draw `src_rect` of `pixmap` into `dst_rect`.
    ///
    /// An integral `src_rect` is wrapped directly and transformed lazily. Otherwise the image
    /// is drawn with sampling restricted to `src_rect`.
    #[tracing::instrument(level = "trace", skip(ctx, pixmap))]
    pub fn make_from_image(
        ctx: &Context,
        pixmap: &Arc<Pixmap>,
        src_rect: Rect,
        dst_rect: ParameterSpace<Rect>,
        sampling: SamplingOptions,
    ) -> Self {
        let Some(src_to_dst) = Matrix::rect_to_rect(&src_rect, dst_rect.get()) else {
            return Self::default();
        };
        let src_subset = IRect::round_out(&src_rect);
        if src_subset.to_rect() == src_rect {
            let Some(image) = ctx.backend().make_image(src_subset, pixmap) else {
                return Self::default();
            };
            // The subset's top-left stands in for layer space; the source-to-destination and
            // layer transforms are folded into one.
            let subset = Self::new(image, LayerSpace::new(src_subset.top_left()));
            let transform = Matrix::concat(ctx.mapping().layer_matrix(), &src_to_dst);
            return subset.apply_transform(ctx, &LayerSpace::new(transform), sampling);
        }

        let Some(dst_bounds) = ctx
            .mapping()
            .param_to_layer(&dst_rect)
            .round_out()
            .intersect(&ctx.desired_output())
        else {
            return Self::default();
        };
        let backing = IRect::from_size(pixmap.size());
        let Some(image) = src_subset
            .intersect(&backing)
            .and_then(|subset| ctx.backend().make_image(subset, pixmap))
        else {
            return Self::default();
        };

        let mut surface = AutoSurface::new(ctx, dst_bounds, true, None);
        if let Some(device) = surface.device() {
            let subset = image.subset();
            let local = src_to_dst.pre_translate(f64::from(subset.left), f64::from(subset.top));
            device.clip_rect(dst_rect.into_inner(), true);
            let paint = Paint::default().with_anti_alias(true);
            device.draw_special(&image, &local, sampling, &paint, SrcRectConstraint::Strict);
        }
        surface.snap()
    }
}

/// The part of `image` placed at `origin` that is relevant to `dst_bounds`, assuming decal
/// tiling. With `clamp_if_disjoint` a disjoint image keeps its closest edge pixels instead.
fn extract_subset(
    image: &SpecialImage,
    origin: LayerSpace<IPoint>,
    dst_bounds: &LayerSpace<IRect>,
    clamp_if_disjoint: bool,
) -> FilterResult {
    let tile_mode = if clamp_if_disjoint {
        TileMode::Clamp
    } else {
        TileMode::Decal
    };
    let image_bounds = LayerSpace::new(IRect::from_origin_size(*origin.get(), image.dimensions()))
        .relevant_subset(dst_bounds, tile_mode);
    if image_bounds.is_empty() {
        return FilterResult::default();
    }

    // Subtract edge by edge; negating `origin` may overflow.
    let subset = IRect::from_ltrb(
        image_bounds.left() - origin.x(),
        image_bounds.top() - origin.y(),
        image_bounds.right() - origin.x(),
        image_bounds.bottom() - origin.y(),
    );
    match image.make_subset(subset) {
        Some(sub) => FilterResult::new(sub, image_bounds.top_left()),
        None => FilterResult::default(),
    }
}

/// The transform equivalent to tiling `crop` periodically over `output`, when no more than one
/// period is visible per axis.
fn periodic_axis_transform(
    tile_mode: TileMode,
    crop: &LayerSpace<IRect>,
    output: &LayerSpace<IRect>,
) -> Option<LayerSpace<Matrix>> {
    if !tile_mode.is_periodic() {
        return None;
    }

    let crop_l = f64::from(crop.left());
    let crop_t = f64::from(crop.top());
    let crop_w = f64::from(crop.right()) - crop_l;
    let crop_h = f64::from(crop.bottom()) - crop_t;

    // Period indices of the output edges relative to the crop.
    let period_l = ((f64::from(output.left()) - crop_l) / crop_w).floor() as i64;
    let period_t = ((f64::from(output.top()) - crop_t) / crop_h).floor() as i64;
    let period_r = ((f64::from(output.right()) - crop_l) / crop_w).ceil() as i64;
    let period_b = ((f64::from(output.bottom()) - crop_t) / crop_h).ceil() as i64;
    if period_r - period_l > 1 || period_b - period_t > 1 {
        return None;
    }

    let (mut sx, mut sy) = (1.0, 1.0);
    let (mut tx, mut ty) = (-crop_l, -crop_t);
    if tile_mode == TileMode::Mirror {
        // Odd periods are flipped.
        if period_l % 2 != 0 {
            sx = -1.0;
            tx = crop_w - tx;
        }
        if period_t % 2 != 0 {
            sy = -1.0;
            ty = crop_h - ty;
        }
    }
    tx += period_l as f64 * crop_w + crop_l;
    ty += period_t as f64 * crop_h + crop_t;

    // The translation must stay an exact pixel offset.
    if f64::from(saturate_i32(tx)) != tx || f64::from(saturate_i32(ty)) != ty {
        return None;
    }
    Some(LayerSpace::new(Matrix::scale_translate(sx, sy, tx, ty)))
}

#[cfg(test)]
#[path = "../../tests/unit/filter_result/mod.rs"]
mod tests;
