use crate::backend::{Device, SrcRectConstraint, SurfaceProps};
use crate::context::Context;
use crate::filter_result::{AutoSurface, BoundsAnalysis, FilterResult, ShaderFlags, extract_subset};
use crate::foundation::core::Color4f;
use crate::geometry::irect::IRect;
use crate::geometry::matrix::Matrix;
use crate::geometry::space::LayerSpace;
use crate::mapping::decompose_transform;
use crate::paint::Paint;
use crate::paint::blend::BlendMode;
use crate::paint::sampling::{SamplingOptions, TileMode, compatible_sampling};
use crate::paint::shader::Shader;

impl FilterResult {
    /// Render every deferred effect into a plain image covering `dst_bounds`.
    ///
    /// Unless `preserve_transparency` is set, `dst_bounds` is first narrowed to the layer bounds,
    /// so the result may be smaller than asked for.
    #[tracing::instrument(level = "trace", skip(self, ctx))]
    pub fn resolve(
        &self,
        ctx: &Context,
        dst_bounds: LayerSpace<IRect>,
        preserve_transparency: bool,
    ) -> FilterResult {
        let Some(image) = &self.image else {
            return FilterResult::default();
        };
        let dst_bounds = if preserve_transparency {
            dst_bounds
        } else {
            match dst_bounds.intersect(&self.layer_bounds) {
                Some(bounds) => bounds,
                None => return FilterResult::default(),
            }
        };

        let subset_compatible = self.color_filter.is_none()
            && self.tile_mode == TileMode::Decal
            && !preserve_transparency;
        if subset_compatible && let Some(origin) = self.transform.nearly_integer_translation() {
            tracing::trace!("resolved by subset extraction");
            return extract_subset(image, origin, &dst_bounds, false);
        }

        // Intermediate stages never use the display's surface props.
        let props = SurfaceProps::default();
        let mut surface = AutoSurface::new(ctx, dst_bounds, false, Some(&props));
        if let Some(device) = surface.device() {
            self.draw_into(ctx, device, false, None);
        }
        surface.snap()
    }

    /// Draw into `device`, whose local space is reset to the mapping's layer-to-device transform
    /// for the duration of the call.
    ///
    /// `blender` defaults to source-over.
    pub fn draw(&self, ctx: &Context, device: &mut dyn Device, blender: Option<BlendMode>) {
        let saved = device.local_to_device();
        device.set_local_to_device(*ctx.mapping().layer_to_device_matrix());
        self.draw_into(ctx, device, true, blender);
        device.set_local_to_device(saved);
    }

    /// Draw into `device` in its current local space.
    ///
    /// With `preserve_device_state` any clip pushed for the layer bounds is popped again.
    pub(crate) fn draw_into(
        &self,
        ctx: &Context,
        device: &mut dyn Device,
        preserve_device_state: bool,
        blender: Option<BlendMode>,
    ) {
        let blend_affects_transparent_black =
            blender.is_some_and(BlendMode::affects_transparent_black);
        let Some(image) = &self.image else {
            if let Some(mode) = blender.filter(|_| blend_affects_transparent_black) {
                let clear = Paint::default()
                    .with_color(Color4f::TRANSPARENT)
                    .with_blend_mode(mode);
                device.draw_paint(&clear);
            }
            return;
        };

        let local_to_device = device.local_to_device();
        let analysis = self.analyze_bounds_with(&local_to_device, &device.dev_clip_bounds());

        let layer_crop = analysis.contains(BoundsAnalysis::REQUIRES_LAYER_CROP);
        if layer_crop {
            if blend_affects_transparent_black {
                // A clip would let the blend touch pixels outside the crop, so bake the crop in.
                tracing::trace!("resolving crop for transparency-affecting blend");
                let Some(dst_bounds) = LayerSpace::new(local_to_device)
                    .inverse_map_irect(&LayerSpace::new(device.dev_clip_bounds()))
                else {
                    return;
                };
                let clipped = self.resolve(ctx, dst_bounds, false);
                clipped.draw_into(ctx, device, preserve_device_state, blender);
                return;
            }
            if preserve_device_state {
                device.push_clip_stack();
            }
            device.clip_rect(self.layer_bounds.get().to_rect(), true);
        }

        // Bilinear sampling between integer translations lands on pixel centers.
        let mut sampling = self.sampling;
        if sampling == Self::DEFAULT_SAMPLING
            && self.transform.is_nearly_integer_translation()
            && local_to_device.is_nearly_integer_translation()
        {
            sampling = SamplingOptions::NEAREST;
        }

        let paint = Paint::default()
            .with_anti_alias(true)
            .with_blend_mode(blender.unwrap_or(BlendMode::SrcOver));

        if analysis.contains(BoundsAnalysis::HAS_LAYER_FILLING_EFFECT)
            || (blend_affects_transparent_black
                && analysis.contains(BoundsAnalysis::DST_BOUNDS_NOT_COVERED))
        {
            tracing::trace!(?analysis, "drawing as shader fill");
            if let Some(shader) = self.analyzed_shader_view(ctx, sampling, analysis) {
                device.draw_paint(&paint.with_shader(shader));
            }
        } else {
            let constraint = if analysis.contains(BoundsAnalysis::REQUIRES_SHADER_TILING) {
                ctx.mark_shader_based_tiling_required(TileMode::Clamp);
                SrcRectConstraint::Strict
            } else {
                SrcRectConstraint::Fast
            };
            tracing::trace!(?constraint, "drawing image directly");
            let paint = paint.with_color_filter(self.color_filter.clone());
            device.draw_special(image, self.transform.get(), sampling, &paint, constraint);
        }

        if preserve_device_state && layer_crop {
            device.pop_clip_stack();
        }
    }

    /// Shader evaluating this value in layer space, for use as another shader's input.
    ///
    /// `sampling` is the resampling the consumer applies, `sample_bounds` the layer-space area it
    /// reads. Deferred effects that can't be folded into a shader, or a crop visible within
    /// `sample_bounds`, are resolved first.
    #[tracing::instrument(level = "trace", skip(self, ctx))]
    pub fn as_shader(
        &self,
        ctx: &Context,
        sampling: SamplingOptions,
        flags: ShaderFlags,
        sample_bounds: LayerSpace<IRect>,
    ) -> Option<Shader> {
        let image = self.image.as_ref()?;
        let current_is_integer = self.transform.is_nearly_integer_translation();
        let next_is_integer = !flags.contains(ShaderFlags::NON_TRIVIAL_SAMPLING);
        let analysis = self.analyze_bounds(&sample_bounds);

        // Per-sample cost of deferred work, except for cheap blend-mode color filters.
        let costly_filter = self.color_filter.as_ref().is_some_and(|cf| {
            !cf.as_a_color_mode()
                .is_some_and(|(_, mode)| mode.is_coeff_mode())
        });
        let repeated_cost = flags.contains(ShaderFlags::SAMPLED_REPEATEDLY)
            && (costly_filter || image.color_space() != ctx.color_space());
        let merged = if repeated_cost {
            None
        } else {
            compatible_sampling(self.sampling, current_is_integer, sampling, next_is_integer)
        };
        let needs_resolve = repeated_cost
            || merged.is_none()
            || analysis.contains(BoundsAnalysis::REQUIRES_LAYER_CROP);

        let mut sampling = merged.unwrap_or(sampling);
        if sampling == Self::DEFAULT_SAMPLING
            && next_is_integer
            && (needs_resolve || current_is_integer)
        {
            sampling = SamplingOptions::NEAREST;
        }

        if needs_resolve {
            tracing::trace!(repeated_cost, "resolving before wrapping as shader");
            let (pixels, origin) = self
                .resolve(ctx, self.layer_bounds, false)
                .into_image_and_origin()?;
            let local = Matrix::translate(f64::from(origin.x()), f64::from(origin.y()));
            if !pixels.is_exact_fit() {
                ctx.mark_shader_based_tiling_required(TileMode::Decal);
            }
            pixels.as_shader(TileMode::Decal, sampling, &local, true)
        } else {
            self.analyzed_shader_view(ctx, sampling, analysis)
        }
    }

    /// Shader built straight from the image with the transform, tiling and color filter folded
    /// in, skipping whatever `analysis` shows to be invisible.
    ///
    /// The layer bounds crop is left to the caller, as a device clip or by resolving.
    pub fn analyzed_shader_view(
        &self,
        ctx: &Context,
        final_sampling: SamplingOptions,
        analysis: BoundsAnalysis,
    ) -> Option<Shader> {
        let image = self.image.as_ref()?;
        let local = *self.transform.get();
        let image_bounds = IRect::from_size(image.dimensions()).to_rect();
        let decal_in_layer_space = analysis.contains(BoundsAnalysis::REQUIRES_DECAL_IN_LAYER_SPACE);

        // The decal edge is antialiased at layer resolution: after the transform when it keeps
        // rects axis aligned, otherwise between its scaling and non-scaling parts.
        let (post_decal, pre_decal) = if local.rect_stays_rect() || !decal_in_layer_space {
            (Matrix::IDENTITY, local)
        } else {
            decompose_transform(&local, image_bounds.center())
        };

        // Tiling that no pixel can see, or that the decal mask already implements, becomes
        // the cheaper clamp.
        let tile_mode = if !analysis.contains(BoundsAnalysis::DST_BOUNDS_NOT_COVERED)
            || decal_in_layer_space
        {
            TileMode::Clamp
        } else {
            self.tile_mode
        };
        let strict = analysis.contains(BoundsAnalysis::REQUIRES_SHADER_TILING);
        if strict {
            ctx.mark_shader_based_tiling_required(tile_mode);
        }

        let mut shader = image.as_shader(tile_mode, final_sampling, &pre_decal, strict)?;
        if decal_in_layer_space {
            debug_assert_eq!(self.tile_mode, TileMode::Decal);
            shader = Shader::decal_mask(pre_decal.map_rect(&image_bounds), shader);
        }
        if !post_decal.is_identity() {
            shader = shader.with_local_matrix(&post_decal)?;
        }
        if let Some(cf) = &self.color_filter {
            shader = shader.with_color_filter(cf);
        }
        Some(shader)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter_result/draw.rs"]
mod tests;
