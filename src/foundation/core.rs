use crate::foundation::math::unit_to_u8;

pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Premultiplied RGBA color with unit-range float channels.
#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Color4f {
    /// Red channel premultiplied by alpha.
    pub r: f32,
    /// Green channel premultiplied by alpha.
    pub g: f32,
    /// Blue channel premultiplied by alpha.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl Color4f {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Build from channels that are already premultiplied.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Premultiply straight-alpha channels.
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self::new(r * a, g * a, b * a, a)
    }

    /// Decode a premultiplied RGBA8 pixel.
    pub fn from_rgba8_premul(px: [u8; 4]) -> Self {
        Self::new(
            f32::from(px[0]) / 255.0,
            f32::from(px[1]) / 255.0,
            f32::from(px[2]) / 255.0,
            f32::from(px[3]) / 255.0,
        )
    }

    /// Encode as premultiplied RGBA8, keeping color channels at or below alpha.
    pub fn to_rgba8_premul(self) -> [u8; 4] {
        let a = self.a.clamp(0.0, 1.0);
        [
            unit_to_u8(self.r.clamp(0.0, a)),
            unit_to_u8(self.g.clamp(0.0, a)),
            unit_to_u8(self.b.clamp(0.0, a)),
            unit_to_u8(a),
        ]
    }

    /// Straight-alpha channels. Transparent colors unpremultiply to transparent black.
    pub fn unpremul(self) -> [f32; 4] {
        if self.a <= 0.0 {
            return [0.0; 4];
        }
        let inv = 1.0 / self.a;
        [self.r * inv, self.g * inv, self.b * inv, self.a]
    }

    /// Return `true` when alpha is zero.
    pub fn is_transparent(self) -> bool {
        self.a <= 0.0
    }

    /// Multiply every channel by `s`.
    pub fn scale(self, s: f32) -> Self {
        Self::new(self.r * s, self.g * s, self.b * s, self.a * s)
    }

    /// Channel-wise `self + (other - self) * t`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Keep channels inside the valid premultiplied range.
    pub fn clamp_premul(self) -> Self {
        let a = self.a.clamp(0.0, 1.0);
        Self::new(
            self.r.clamp(0.0, a),
            self.g.clamp(0.0, a),
            self.b.clamp(0.0, a),
            a,
        )
    }

    pub(crate) fn nearly_eq(self, other: Self, tol: f32) -> bool {
        (self.r - other.r).abs() <= tol
            && (self.g - other.g).abs() <= tol
            && (self.b - other.b).abs() <= tol
            && (self.a - other.a).abs() <= tol
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
