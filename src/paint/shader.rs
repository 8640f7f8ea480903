use std::sync::Arc;

use crate::backend::image::{ColorSpace, SpecialImage};
use crate::foundation::core::{Color4f, Point, Rect};
use crate::geometry::matrix::Matrix;
use crate::paint::blend::BlendMode;
use crate::paint::color_filter::ColorFilter;
use crate::paint::sampling::{CubicResampler, SamplingOptions, TileMode};

enum Node {
    Color(Color4f),
    Image {
        image: SpecialImage,
        tile: TileMode,
        sampling: SamplingOptions,
        /// Shader space to subset-local pixel space.
        inverse: Matrix,
        strict: bool,
    },
    DecalMask {
        bounds: Rect,
        child: Shader,
    },
    LocalMatrix {
        inverse: Matrix,
        child: Shader,
    },
    Filtered {
        filter: ColorFilter,
        child: Shader,
    },
    Blend {
        mode: BlendMode,
        dst: Shader,
        src: Shader,
    },
}

/// Immutable per-pixel color source, evaluated at points in its own coordinate space.
#[derive(Clone)]
pub struct Shader(Arc<Node>);

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &*self.0 {
            Node::Color(_) => "color",
            Node::Image { .. } => "image",
            Node::DecalMask { .. } => "decal_mask",
            Node::LocalMatrix { .. } => "local_matrix",
            Node::Filtered { .. } => "color_filter",
            Node::Blend { .. } => "blend",
        };
        f.debug_tuple("Shader").field(&kind).finish()
    }
}

impl Shader {
    pub fn color(c: Color4f) -> Self {
        Self(Arc::new(Node::Color(c)))
    }

    /// Sample `image` through `local`, which maps the image's subset-local pixel space into
    /// shader space.
    ///
    /// `strict` tiles at the subset edges. Otherwise tiling happens at the backing store edges
    /// and filter taps may read pixels just outside the subset. Returns `None` when `local` is
    /// singular.
    pub fn image(
        image: SpecialImage,
        tile: TileMode,
        sampling: SamplingOptions,
        local: &Matrix,
        strict: bool,
    ) -> Option<Self> {
        let inverse = local.invert()?;
        Some(Self(Arc::new(Node::Image {
            image,
            tile,
            sampling,
            inverse,
            strict,
        })))
    }

    /// Multiply `child` by a coverage ramp that falls from 1 to 0 across the half-pixel band
    /// around `bounds`.
    pub fn decal_mask(bounds: Rect, child: Self) -> Self {
        Self(Arc::new(Node::DecalMask { bounds, child }))
    }

    /// Wrap so that `matrix` maps this shader's space into the returned shader's space.
    pub fn with_local_matrix(&self, matrix: &Matrix) -> Option<Self> {
        if matrix.is_identity() {
            return Some(self.clone());
        }
        let inverse = matrix.invert()?;
        Some(Self(Arc::new(Node::LocalMatrix {
            inverse,
            child: self.clone(),
        })))
    }

    pub fn with_color_filter(&self, filter: &ColorFilter) -> Self {
        Self(Arc::new(Node::Filtered {
            filter: filter.clone(),
            child: self.clone(),
        }))
    }

    pub fn blend(mode: BlendMode, dst: Self, src: Self) -> Self {
        Self(Arc::new(Node::Blend { mode, dst, src }))
    }

    /// Premultiplied color at `p`, expressed in `dst_space`.
    pub fn eval(&self, p: Point, dst_space: ColorSpace) -> Color4f {
        match &*self.0 {
            Node::Color(c) => *c,
            Node::Image {
                image,
                tile,
                sampling,
                inverse,
                strict,
            } => {
                let q = inverse.map_point(p);
                let c = sample_image(image, *tile, *sampling, *strict, q);
                image.color_space().convert(c, dst_space)
            }
            Node::DecalMask { bounds, child } => {
                let coverage = decal_coverage(bounds, p);
                if coverage <= 0.0 {
                    Color4f::TRANSPARENT
                } else {
                    child.eval(p, dst_space).scale(coverage)
                }
            }
            Node::LocalMatrix { inverse, child } => child.eval(inverse.map_point(p), dst_space),
            Node::Filtered { filter, child } => filter.filter_color(child.eval(p, dst_space)),
            Node::Blend { mode, dst, src } => {
                mode.blend(src.eval(p, dst_space), dst.eval(p, dst_space))
            }
        }
    }
}

fn decal_coverage(bounds: &Rect, p: Point) -> f32 {
    let ramp = |d: f64| (d + 0.5).clamp(0.0, 1.0);
    (ramp(p.x - bounds.x0) * ramp(p.y - bounds.y0) * ramp(bounds.x1 - p.x) * ramp(bounds.y1 - p.y))
        as f32
}

/// Tiling domain in backing-store pixels plus the offset from subset-local to backing coords.
struct TileDomain {
    left: i64,
    top: i64,
    width: i64,
    height: i64,
    origin_x: i64,
    origin_y: i64,
}

impl TileDomain {
    fn for_image(image: &SpecialImage, strict: bool) -> Self {
        let subset = image.subset();
        let (left, top, width, height) = if strict {
            (
                i64::from(subset.left),
                i64::from(subset.top),
                subset.width64(),
                subset.height64(),
            )
        } else {
            let backing = image.backing_store_dimensions();
            (0, 0, i64::from(backing.width), i64::from(backing.height))
        };
        Self {
            left,
            top,
            width,
            height,
            origin_x: i64::from(subset.left),
            origin_y: i64::from(subset.top),
        }
    }

    /// Backing-store coordinate for a subset-local tap, or `None` for decal misses.
    fn resolve(&self, x: i64, y: i64, tile: TileMode) -> Option<(u32, u32)> {
        let bx = tile.tile_coord(x + self.origin_x - self.left, self.width)? + self.left;
        let by = tile.tile_coord(y + self.origin_y - self.top, self.height)? + self.top;
        Some((bx as u32, by as u32))
    }
}

fn sample_image(
    image: &SpecialImage,
    tile: TileMode,
    sampling: SamplingOptions,
    strict: bool,
    q: Point,
) -> Color4f {
    if !q.x.is_finite() || !q.y.is_finite() {
        return Color4f::TRANSPARENT;
    }
    let domain = TileDomain::for_image(image, strict);
    let fetch = |x: i64, y: i64| match domain.resolve(x, y, tile) {
        Some((bx, by)) => Color4f::from_rgba8_premul(image.backing_pixel(bx, by)),
        None => Color4f::TRANSPARENT,
    };

    match sampling {
        SamplingOptions::Nearest => fetch(q.x.floor() as i64, q.y.floor() as i64),
        SamplingOptions::Linear | SamplingOptions::Aniso(_) => {
            let fx = q.x - 0.5;
            let fy = q.y - 0.5;
            let (x0, y0) = (fx.floor(), fy.floor());
            let (tx, ty) = ((fx - x0) as f32, (fy - y0) as f32);
            let (x0, y0) = (x0 as i64, y0 as i64);
            let top = fetch(x0, y0).lerp(fetch(x0 + 1, y0), tx);
            let bottom = fetch(x0, y0 + 1).lerp(fetch(x0 + 1, y0 + 1), tx);
            top.lerp(bottom, ty)
        }
        SamplingOptions::Cubic(cubic) => {
            let fx = q.x - 0.5;
            let fy = q.y - 0.5;
            let (x1, y1) = (fx.floor(), fy.floor());
            let wx = cubic_weights((fx - x1) as f32, cubic);
            let wy = cubic_weights((fy - y1) as f32, cubic);
            let (x1, y1) = (x1 as i64, y1 as i64);
            let mut acc = Color4f::TRANSPARENT;
            for (j, wyj) in wy.iter().enumerate() {
                for (i, wxi) in wx.iter().enumerate() {
                    let c = fetch(x1 - 1 + i as i64, y1 - 1 + j as i64);
                    let w = wxi * wyj;
                    acc = Color4f::new(
                        acc.r + c.r * w,
                        acc.g + c.g * w,
                        acc.b + c.b * w,
                        acc.a + c.a * w,
                    );
                }
            }
            acc.clamp_premul()
        }
    }
}

fn cubic_weights(t: f32, k: CubicResampler) -> [f32; 4] {
    let (b, c) = (k.b, k.c);
    let kernel = |x: f32| {
        let x = x.abs();
        if x < 1.0 {
            ((12.0 - 9.0 * b - 6.0 * c) * x * x * x
                + (-18.0 + 12.0 * b + 6.0 * c) * x * x
                + (6.0 - 2.0 * b))
                / 6.0
        } else if x < 2.0 {
            ((-b - 6.0 * c) * x * x * x
                + (6.0 * b + 30.0 * c) * x * x
                + (-12.0 * b - 48.0 * c) * x
                + (8.0 * b + 24.0 * c))
                / 6.0
        } else {
            0.0
        }
    };
    [kernel(1.0 + t), kernel(t), kernel(1.0 - t), kernel(2.0 - t)]
}

#[cfg(test)]
#[path = "../../tests/unit/paint/shader.rs"]
mod tests;
