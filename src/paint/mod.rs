//! Pixel-producing primitives consumed by devices: tiling, sampling, blending, color filters and
//! shaders.

pub mod blend;
pub mod color_filter;
pub mod sampling;
pub mod shader;

use crate::foundation::core::Color4f;
use blend::BlendMode;
use color_filter::ColorFilter;
use shader::Shader;

/// Everything a device needs to shade one draw call.
///
/// The source color is the shader when present, otherwise `color`. The color filter applies to
/// the source before it is blended onto the destination.
#[derive(Clone, Debug)]
pub struct Paint {
    pub shader: Option<Shader>,
    pub color_filter: Option<ColorFilter>,
    pub blend_mode: BlendMode,
    pub anti_alias: bool,
    pub color: Color4f,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            shader: None,
            color_filter: None,
            blend_mode: BlendMode::SrcOver,
            anti_alias: false,
            color: Color4f::BLACK,
        }
    }
}

impl Paint {
    pub fn with_shader(mut self, shader: Shader) -> Self {
        self.shader = Some(shader);
        self
    }

    pub fn with_color_filter(mut self, filter: Option<ColorFilter>) -> Self {
        self.color_filter = filter;
        self
    }

    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn with_anti_alias(mut self, aa: bool) -> Self {
        self.anti_alias = aa;
        self
    }

    pub fn with_color(mut self, color: Color4f) -> Self {
        self.color = color;
        self
    }
}
