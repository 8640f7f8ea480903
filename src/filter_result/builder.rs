use smallvec::SmallVec;

use crate::context::Context;
use crate::filter_result::{AutoSurface, FilterResult, ShaderFlags};
use crate::foundation::core::Size;
use crate::geometry::irect::IRect;
use crate::geometry::matrix::Matrix;
use crate::geometry::space::LayerSpace;
use crate::paint::Paint;
use crate::paint::sampling::{SamplingOptions, TileMode};
use crate::paint::shader::Shader;

/// An input plus how the combining shader will sample it.
#[derive(Clone, Debug)]
struct SampledInput {
    image: FilterResult,
    sample_bounds: Option<LayerSpace<IRect>>,
    sampling: SamplingOptions,
    flags: ShaderFlags,
}

impl SampledInput {
    fn is_plain(&self) -> bool {
        self.sample_bounds.is_none()
            && self.sampling == FilterResult::DEFAULT_SAMPLING
            && self.flags.is_empty()
    }
}

/// Collects the inputs of one filter and combines them into a single [`FilterResult`].
///
/// ```ignore
/// let merged = Builder::new(&ctx).add(background).add(foreground).merge();
/// ```
pub struct Builder<'a> {
    context: &'a Context,
    inputs: SmallVec<[SampledInput; 1]>,
}

impl<'a> Builder<'a> {
    pub fn new(context: &'a Context) -> Self {
        Self {
            context,
            inputs: SmallVec::new(),
        }
    }

    /// Add an input sampled once per output pixel with the default sampling.
    pub fn add(self, input: FilterResult) -> Self {
        self.add_with(
            input,
            None,
            ShaderFlags::empty(),
            FilterResult::DEFAULT_SAMPLING,
        )
    }

    /// Add an input read only within `sample_bounds` (the output bounds when `None`).
    pub fn add_with(
        mut self,
        input: FilterResult,
        sample_bounds: Option<LayerSpace<IRect>>,
        flags: ShaderFlags,
        sampling: SamplingOptions,
    ) -> Self {
        self.inputs.push(SampledInput {
            image: input,
            sample_bounds,
            sampling,
            flags,
        });
        self
    }

    /// Fill the output with the shader `shader_fn` builds from the input shaders.
    ///
    /// Inputs that are transparent appear as `None`. The output covers the desired output,
    /// narrowed to `explicit_output` when given. With `evaluate_in_parameter_space` the shader
    /// is evaluated in parameter space and inputs are adapted to match.
    #[tracing::instrument(level = "trace", skip(self, shader_fn), fields(inputs = self.inputs.len()))]
    pub fn eval<F>(
        self,
        shader_fn: F,
        explicit_output: Option<LayerSpace<IRect>>,
        evaluate_in_parameter_space: bool,
    ) -> FilterResult
    where
        F: FnOnce(&[Option<Shader>]) -> Option<Shader>,
    {
        let output_bounds = self.output_bounds(explicit_output);
        if output_bounds.is_empty() {
            return FilterResult::default();
        }
        let inputs = self.create_input_shaders(output_bounds, evaluate_in_parameter_space);
        self.draw_shader(shader_fn(&inputs), output_bounds, evaluate_in_parameter_space)
    }

    /// Composite the inputs in order with source-over.
    ///
    /// A single input is returned as is.
    #[tracing::instrument(level = "trace", skip(self), fields(inputs = self.inputs.len()))]
    pub fn merge(self) -> FilterResult {
        debug_assert!(!self.inputs.is_empty(), "merge needs at least one input");
        if let [only] = self.inputs.as_slice() {
            debug_assert!(only.is_plain());
            return only.image.clone();
        }

        let merged_bounds = self
            .inputs
            .iter()
            .fold(LayerSpace::<IRect>::empty(), |acc, input| {
                acc.join(&input.image.layer_bounds())
            });
        let output_bounds = self.output_bounds(Some(merged_bounds));

        let mut surface = AutoSurface::new(self.context, output_bounds, false, None);
        if let Some(device) = surface.device() {
            for input in &self.inputs {
                debug_assert!(input.is_plain());
                input.image.draw_into(self.context, device, true, None);
            }
        }
        surface.snap()
    }

    /// Gaussian blur of the single input with per-axis standard deviation `sigma`.
    ///
    /// `sigma` must not exceed the blur algorithm's maximum.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn blur(self, sigma: LayerSpace<Size>) -> FilterResult {
        debug_assert_eq!(self.inputs.len(), 1, "blur takes exactly one input");
        let Some(input) = self.inputs.first() else {
            return FilterResult::default();
        };
        let backend = self.context.backend();
        let Some(engine) = backend.blur_engine() else {
            tracing::trace!("backend has no blur engine");
            return FilterResult::default();
        };
        let Some(algorithm) = engine.find_algorithm(sigma.into_inner(), backend.color_type())
        else {
            tracing::trace!("no blur algorithm for color type");
            return FilterResult::default();
        };
        let max_sigma = algorithm.max_sigma();
        debug_assert!(
            sigma.width() <= max_sigma && sigma.height() <= max_sigma,
            "blur sigma {sigma:?} above maximum {max_sigma}"
        );

        let radii = LayerSpace::new(Size::new(3.0 * sigma.width(), 3.0 * sigma.height())).ceil();
        let max_output = input.image.layer_bounds().outset(radii);
        let output_bounds = self.output_bounds(Some(max_output));
        if output_bounds.is_empty() {
            return FilterResult::default();
        }

        // The blur reads exactly one radius beyond the output.
        let sample_bounds = output_bounds.outset(radii);
        let Some((image, origin)) = input
            .image
            .resolve(self.context, sample_bounds, false)
            .into_image_and_origin()
        else {
            return FilterResult::default();
        };

        let src_relative_output = output_bounds
            .get()
            .offset(origin.x().saturating_neg(), origin.y().saturating_neg());
        match algorithm.blur(
            sigma.into_inner(),
            &image,
            IRect::from_size(image.dimensions()),
            TileMode::Decal,
            src_relative_output,
        ) {
            Some(blurred) => FilterResult::new(blurred, output_bounds.top_left()),
            None => FilterResult::default(),
        }
    }

    fn create_input_shaders(
        &self,
        output_bounds: LayerSpace<IRect>,
        evaluate_in_parameter_space: bool,
    ) -> SmallVec<[Option<Shader>; 1]> {
        let mut xtra_flags = ShaderFlags::empty();
        let mut layer_to_param = None;
        if evaluate_in_parameter_space {
            // Parameter-space sample points are mapped back into layer space for the inputs.
            layer_to_param = self.context.mapping().layer_matrix().invert();
            debug_assert!(layer_to_param.is_some(), "layer matrix must be invertible");
            if !layer_to_param
                .as_ref()
                .is_some_and(Matrix::is_nearly_integer_translation)
            {
                xtra_flags |= ShaderFlags::NON_TRIVIAL_SAMPLING;
            }
        }

        self.inputs
            .iter()
            .map(|input| {
                let sample_bounds = input.sample_bounds.unwrap_or(output_bounds);
                let shader = input.image.as_shader(
                    self.context,
                    input.sampling,
                    input.flags | xtra_flags,
                    sample_bounds,
                )?;
                match &layer_to_param {
                    Some(m) => shader.with_local_matrix(m),
                    None => Some(shader),
                }
            })
            .collect()
    }

    /// Desired output, narrowed to `explicit_output` when given. Empty when they're disjoint.
    fn output_bounds(&self, explicit_output: Option<LayerSpace<IRect>>) -> LayerSpace<IRect> {
        let output = self.context.desired_output();
        match explicit_output {
            Some(explicit) => output
                .intersect(&explicit)
                .unwrap_or(LayerSpace::<IRect>::empty()),
            None => output,
        }
    }

    fn draw_shader(
        &self,
        shader: Option<Shader>,
        output_bounds: LayerSpace<IRect>,
        evaluate_in_parameter_space: bool,
    ) -> FilterResult {
        debug_assert!(!output_bounds.is_empty());
        let Some(shader) = shader else {
            return FilterResult::default();
        };
        let mut surface = AutoSurface::new(
            self.context,
            output_bounds,
            evaluate_in_parameter_space,
            None,
        );
        if let Some(device) = surface.device() {
            device.draw_paint(&Paint::default().with_shader(shader));
        }
        surface.snap()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter_result/builder.rs"]
mod tests;
