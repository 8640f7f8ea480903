//! Deferred image-filter compositing.
//!
//! A filter graph evaluator walks its nodes bottom-up and hands each node's output to its
//! parent as a [`FilterResult`]: an image plus transform, sampling, tiling, color filter and crop
//! that are applied lazily. Each operation decides whether its effect can be folded into that
//! metadata or whether pixels have to be rendered first.
//!
//! - Describe where output is wanted with a [`Context`] and its [`Mapping`]
//! - Transform values with [`FilterResult::apply_crop`], [`FilterResult::apply_transform`] and
//!   [`FilterResult::apply_color_filter`]
//! - Combine inputs with a [`Builder`]
//! - Produce pixels with [`FilterResult::resolve`] or [`FilterResult::draw`]
//!
//! Rendering goes through the [`Backend`] trait; [`RasterBackend`] is the CPU implementation.
#![forbid(unsafe_code)]

/// Render targets, images and blur services.
pub mod backend;
/// Per-evaluation state shared by every operation.
pub mod context;
/// The deferred image value and its operations.
pub mod filter_result;
/// Scalar math, colors and errors.
pub mod foundation;
/// Integer and float geometry, matrices and coordinate-space tags.
pub mod geometry;
/// Parameter, layer and device space transforms.
pub mod mapping;
/// Sampling, tiling, blending, color filters and shaders.
pub mod paint;

pub use crate::backend::raster::{RasterBackend, RasterBackendOpts, RasterDevice};
pub use crate::backend::{
    Backend, BlurAlgorithm, BlurEngine, ColorSpace, ColorType, Device, Picture, Pixmap,
    SpecialImage, SurfaceProps,
};
pub use crate::context::{Context, Stats, StatsSnapshot};
pub use crate::filter_result::{BoundsAnalysis, Builder, FilterResult, ShaderFlags};
pub use crate::foundation::core::{Color4f, Point, Rect, Size};
pub use crate::foundation::error::{FxError, FxResult};
pub use crate::geometry::irect::{IPoint, IRect, ISize};
pub use crate::geometry::matrix::Matrix;
pub use crate::geometry::space::{DeviceSpace, LayerSpace, ParameterSpace};
pub use crate::mapping::{Mapping, MatrixCapability};
pub use crate::paint::blend::BlendMode;
pub use crate::paint::color_filter::ColorFilter;
pub use crate::paint::sampling::{SamplingOptions, TileMode};
pub use crate::paint::shader::Shader;
pub use crate::paint::Paint;
