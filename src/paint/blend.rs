use crate::foundation::core::Color4f;

/// Porter-Duff and separable blend modes over premultiplied colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Clear,
    Src,
    Dst,
    #[default]
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcATop,
    DstATop,
    Xor,
    Plus,
    Modulate,
    Screen,
    Multiply,
}

impl BlendMode {
    /// Last mode expressible as `src * f(src, dst) + dst * g(src, dst)` coefficients.
    pub const LAST_COEFF_MODE: Self = Self::Screen;

    pub fn is_coeff_mode(self) -> bool {
        (self as u8) <= (Self::LAST_COEFF_MODE as u8)
    }

    /// Whether blending transparent black over an arbitrary destination changes it.
    pub fn affects_transparent_black(self) -> bool {
        matches!(
            self,
            Self::Clear
                | Self::Src
                | Self::SrcIn
                | Self::DstIn
                | Self::SrcOut
                | Self::DstATop
                | Self::Modulate
        )
    }

    /// Blend premultiplied `src` onto premultiplied `dst`.
    pub fn blend(self, src: Color4f, dst: Color4f) -> Color4f {
        let (sa, da) = (src.a, dst.a);
        let mix = |s: f32, d: f32, fs: f32, fd: f32| s * fs + d * fd;
        let coeff = |fs: f32, fd: f32| {
            Color4f::new(
                mix(src.r, dst.r, fs, fd),
                mix(src.g, dst.g, fs, fd),
                mix(src.b, dst.b, fs, fd),
                mix(sa, da, fs, fd),
            )
        };
        match self {
            Self::Clear => Color4f::TRANSPARENT,
            Self::Src => src,
            Self::Dst => dst,
            Self::SrcOver => coeff(1.0, 1.0 - sa),
            Self::DstOver => coeff(1.0 - da, 1.0),
            Self::SrcIn => coeff(da, 0.0),
            Self::DstIn => coeff(0.0, sa),
            Self::SrcOut => coeff(1.0 - da, 0.0),
            Self::DstOut => coeff(0.0, 1.0 - sa),
            Self::SrcATop => coeff(da, 1.0 - sa),
            Self::DstATop => coeff(1.0 - da, sa),
            Self::Xor => coeff(1.0 - da, 1.0 - sa),
            Self::Plus => Color4f::new(
                (src.r + dst.r).min(1.0),
                (src.g + dst.g).min(1.0),
                (src.b + dst.b).min(1.0),
                (sa + da).min(1.0),
            ),
            Self::Modulate => Color4f::new(src.r * dst.r, src.g * dst.g, src.b * dst.b, sa * da),
            Self::Screen => Color4f::new(
                src.r + dst.r - src.r * dst.r,
                src.g + dst.g - src.g * dst.g,
                src.b + dst.b - src.b * dst.b,
                sa + da - sa * da,
            ),
            Self::Multiply => {
                let ch = |s: f32, d: f32| s * (1.0 - da) + d * (1.0 - sa) + s * d;
                Color4f::new(
                    ch(src.r, dst.r),
                    ch(src.g, dst.g),
                    ch(src.b, dst.b),
                    sa + da - sa * da,
                )
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paint/blend.rs"]
mod tests;
