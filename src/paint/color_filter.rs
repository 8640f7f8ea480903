use std::fmt;
use std::sync::Arc;

use crate::foundation::core::Color4f;
use crate::paint::blend::BlendMode;

#[derive(Debug)]
enum Filter {
    /// 4x5 row-major matrix applied to unpremultiplied RGBA, last column is the bias.
    Matrix([f32; 20]),
    /// Blend a constant color over the input.
    Mode { color: Color4f, mode: BlendMode },
    /// `outer(inner(c))`.
    Compose { outer: ColorFilter, inner: ColorFilter },
}

/// Shared, immutable pointwise color transform.
#[derive(Clone)]
pub struct ColorFilter(Arc<Filter>);

impl fmt::Debug for ColorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ColorFilter {
    pub fn matrix(m: [f32; 20]) -> Self {
        Self(Arc::new(Filter::Matrix(m)))
    }

    /// Blend the premultiplied `color` onto every input color with `mode`.
    pub fn blend(color: Color4f, mode: BlendMode) -> Self {
        Self(Arc::new(Filter::Mode { color, mode }))
    }

    /// `outer(inner(c))`. A missing `inner` returns `outer` unchanged.
    pub fn compose(outer: &Self, inner: Option<&Self>) -> Self {
        match inner {
            Some(inner) => Self(Arc::new(Filter::Compose {
                outer: outer.clone(),
                inner: inner.clone(),
            })),
            None => outer.clone(),
        }
    }

    /// Filter applying `inner` first and then `self`.
    pub fn compose_with(&self, inner: &Self) -> Self {
        Self::compose(self, Some(inner))
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Apply the filter to one premultiplied color.
    pub fn filter_color(&self, c: Color4f) -> Color4f {
        match &*self.0 {
            Filter::Matrix(m) => {
                let [r, g, b, a] = c.unpremul();
                let row = |i: usize| {
                    (m[i] * r + m[i + 1] * g + m[i + 2] * b + m[i + 3] * a + m[i + 4])
                        .clamp(0.0, 1.0)
                };
                Color4f::from_straight(row(0), row(5), row(10), row(15))
            }
            Filter::Mode { color, mode } => mode.blend(*color, c).clamp_premul(),
            Filter::Compose { outer, inner } => outer.filter_color(inner.filter_color(c)),
        }
    }

    /// Whether transparent black input can produce a visible color.
    pub fn affects_transparent_black(&self) -> bool {
        !self.filter_color(Color4f::TRANSPARENT).is_transparent()
    }

    /// The constant color and mode when this is a plain mode filter.
    pub fn as_a_color_mode(&self) -> Option<(Color4f, BlendMode)> {
        match &*self.0 {
            Filter::Mode { color, mode } => Some((*color, *mode)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paint/color_filter.rs"]
mod tests;
