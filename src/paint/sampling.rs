/// How an image is extended outside its bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileMode {
    /// Repeat the edge pixels.
    Clamp,
    /// Tile periodically.
    Repeat,
    /// Tile periodically, flipping every other period.
    Mirror,
    /// Transparent black outside the bounds.
    #[default]
    Decal,
}

impl TileMode {
    pub fn is_periodic(self) -> bool {
        matches!(self, Self::Repeat | Self::Mirror)
    }

    /// Fold an integer texel coordinate into `0..len`, or `None` when decal leaves it transparent.
    pub fn tile_coord(self, v: i64, len: i64) -> Option<i64> {
        if len <= 0 {
            return None;
        }
        match self {
            Self::Decal => (0..len).contains(&v).then_some(v),
            Self::Clamp => Some(v.clamp(0, len - 1)),
            Self::Repeat => Some(v.rem_euclid(len)),
            Self::Mirror => {
                let m = v.rem_euclid(2 * len);
                Some(if m < len { m } else { 2 * len - 1 - m })
            }
        }
    }
}

/// Mitchell-Netravali style cubic resampler parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CubicResampler {
    pub b: f32,
    pub c: f32,
}

impl CubicResampler {
    pub const MITCHELL: Self = Self {
        b: 1.0 / 3.0,
        c: 1.0 / 3.0,
    };
    pub const CATMULL_ROM: Self = Self { b: 0.0, c: 0.5 };
}

/// Filter applied when an image is resampled.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingOptions {
    Nearest,
    Linear,
    Cubic(CubicResampler),
    /// Anisotropic filtering with the given maximum anisotropy (at least 1).
    Aniso(u32),
}

impl SamplingOptions {
    pub const NEAREST: Self = Self::Nearest;
    pub const LINEAR: Self = Self::Linear;

    pub fn aniso(max_aniso: u32) -> Self {
        Self::Aniso(max_aniso.max(1))
    }

    pub fn is_aniso(self) -> bool {
        matches!(self, Self::Aniso(_))
    }

    pub fn is_cubic(self) -> bool {
        matches!(self, Self::Cubic(_))
    }

    /// Whether the base (non-cubic, non-anisotropic) filter is bilinear.
    ///
    /// Cubic and anisotropic options report a point base filter.
    fn has_linear_filter(self) -> bool {
        matches!(self, Self::Linear)
    }

    /// Reach of the reconstruction kernel in pixels, measured from a pixel center.
    pub fn sample_radius(self) -> f64 {
        if self.is_cubic() { 1.5 } else { 0.5 }
    }
}

/// Decide whether two consecutive resampling passes can be folded into one.
///
/// `current` belongs to the transform already deferred and `next` to the one being applied.
/// Each `*_integer` flag says whether that transform is an integer translation, which leaves
/// nearest-neighbor texels untouched. Returns the sampling to carry forward, or `None` when
/// nearest-neighbor texels would be visibly resampled and both passes must be kept.
pub fn compatible_sampling(
    current: SamplingOptions,
    current_integer: bool,
    next: SamplingOptions,
    next_integer: bool,
) -> Option<SamplingOptions> {
    use SamplingOptions as S;

    match (current, next) {
        (S::Aniso(a), S::Aniso(b)) => Some(S::Aniso(a.max(b))),
        (S::Aniso(_), S::Linear) => Some(current),
        (S::Linear, S::Aniso(_)) => Some(next),
        (S::Cubic(_), S::Linear) => Some(current),
        (S::Cubic(a), S::Cubic(b)) if a == b => Some(current),
        (S::Linear, S::Cubic(_)) => Some(next),
        (S::Linear, S::Linear) => Some(next),
        _ if !next.has_linear_filter() && current_integer => Some(next),
        _ if !current.has_linear_filter() && next_integer => Some(current),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paint/sampling.rs"]
mod tests;
