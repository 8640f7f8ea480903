use crate::foundation::core::{Affine, Point, Rect, Size, Vec2};
use crate::foundation::math::{NEARLY_ZERO, ROUND_EPSILON, nearly_equal, nearly_zero, saturate_i32};
use crate::geometry::irect::{IPoint, IRect};
use crate::geometry::rect::RectExt;

/// Homogeneous points closer than this to the `w = 0` plane are clipped when mapping rects.
const W0_PLANE_DISTANCE: f64 = 1.0 / 16384.0;

/// Row-major 3x3 projective transform.
///
/// A point `(x, y)` maps to `(X / W, Y / W)` where
/// `X = sx*x + kx*y + tx`, `Y = ky*x + sy*y + ty` and `W = p0*x + p1*y + p2`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Matrix {
    m: [f64; 9],
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const SCALE_X: usize = 0;
    pub const SKEW_X: usize = 1;
    pub const TRANS_X: usize = 2;
    pub const SKEW_Y: usize = 3;
    pub const SCALE_Y: usize = 4;
    pub const TRANS_Y: usize = 5;
    pub const PERSP_0: usize = 6;
    pub const PERSP_1: usize = 7;
    pub const PERSP_2: usize = 8;

    pub const IDENTITY: Self = Self {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    pub const fn from_row_major(m: [f64; 9]) -> Self {
        Self { m }
    }

    pub const fn translate(dx: f64, dy: f64) -> Self {
        Self::scale_translate(1.0, 1.0, dx, dy)
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::scale_translate(sx, sy, 0.0, 0.0)
    }

    pub const fn scale_translate(sx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            m: [sx, 0.0, tx, 0.0, sy, ty, 0.0, 0.0, 1.0],
        }
    }

    /// Lift a kurbo affine into a 3x3 matrix.
    pub fn from_affine(a: Affine) -> Self {
        let [a, b, c, d, e, f] = a.as_coeffs();
        Self {
            m: [a, c, e, b, d, f, 0.0, 0.0, 1.0],
        }
    }

    /// The affine part, or `None` when the matrix has perspective.
    pub fn to_affine(&self) -> Option<Affine> {
        if self.has_perspective() {
            return None;
        }
        let m = &self.m;
        Some(Affine::new([m[0], m[3], m[1], m[4], m[2], m[5]]))
    }

    /// Scale-translate matrix mapping `src` onto `dst` (fill, no aspect preservation).
    pub fn rect_to_rect(src: &Rect, dst: &Rect) -> Option<Self> {
        if src.is_empty_rect() {
            return None;
        }
        let sx = dst.width() / src.width();
        let sy = dst.height() / src.height();
        Some(Self::scale_translate(
            sx,
            sy,
            dst.x0 - src.x0 * sx,
            dst.y0 - src.y0 * sy,
        ))
    }

    pub fn get(&self, i: usize) -> f64 {
        self.m[i]
    }

    /// Element at `row`, `col`.
    pub fn rc(&self, row: usize, col: usize) -> f64 {
        self.m[row * 3 + col]
    }

    pub fn scale_x(&self) -> f64 {
        self.m[Self::SCALE_X]
    }

    pub fn scale_y(&self) -> f64 {
        self.m[Self::SCALE_Y]
    }

    pub fn skew_x(&self) -> f64 {
        self.m[Self::SKEW_X]
    }

    pub fn skew_y(&self) -> f64 {
        self.m[Self::SKEW_Y]
    }

    pub fn translate_x(&self) -> f64 {
        self.m[Self::TRANS_X]
    }

    pub fn translate_y(&self) -> f64 {
        self.m[Self::TRANS_Y]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn has_perspective(&self) -> bool {
        self.m[6] != 0.0 || self.m[7] != 0.0 || self.m[8] != 1.0
    }

    pub fn is_scale_translate(&self) -> bool {
        !self.has_perspective() && self.m[1] == 0.0 && self.m[3] == 0.0
    }

    pub fn is_translate(&self) -> bool {
        self.is_scale_translate() && self.m[0] == 1.0 && self.m[4] == 1.0
    }

    /// True when axis-aligned rects map to axis-aligned rects (scales or 90 degree rotations).
    pub fn rect_stays_rect(&self) -> bool {
        if self.has_perspective() {
            return false;
        }
        let [sx, kx, _, ky, sy, ..] = self.m;
        (kx == 0.0 && ky == 0.0 && sx != 0.0 && sy != 0.0)
            || (sx == 0.0 && sy == 0.0 && kx != 0.0 && ky != 0.0)
    }

    /// `a * b`: the result applies `b` first, then `a`.
    pub fn concat(a: &Self, b: &Self) -> Self {
        let mut out = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                out[r * 3 + c] = a.rc(r, 0) * b.rc(0, c)
                    + a.rc(r, 1) * b.rc(1, c)
                    + a.rc(r, 2) * b.rc(2, c);
            }
        }
        Self { m: out }
    }

    /// `self * other`: `other` is applied before `self`.
    pub fn pre_concat(&self, other: &Self) -> Self {
        Self::concat(self, other)
    }

    /// `other * self`: `other` is applied after `self`.
    pub fn post_concat(&self, other: &Self) -> Self {
        Self::concat(other, self)
    }

    pub fn pre_scale(&self, sx: f64, sy: f64) -> Self {
        self.pre_concat(&Self::scale(sx, sy))
    }

    pub fn pre_translate(&self, dx: f64, dy: f64) -> Self {
        self.pre_concat(&Self::translate(dx, dy))
    }

    pub fn post_translate(&self, dx: f64, dy: f64) -> Self {
        self.post_concat(&Self::translate(dx, dy))
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
            + m[2] * (m[3] * m[7] - m[4] * m[6])
    }

    /// Inverse matrix, or `None` when the matrix is (nearly) singular.
    pub fn invert(&self) -> Option<Self> {
        let m = &self.m;
        if self.is_scale_translate() {
            if m[0] == 0.0 || m[4] == 0.0 {
                return None;
            }
            let (isx, isy) = (1.0 / m[0], 1.0 / m[4]);
            let inv = Self::scale_translate(isx, isy, -m[2] * isx, -m[5] * isy);
            return inv.is_finite().then_some(inv);
        }

        let det = self.determinant();
        if !det.is_finite() || det.abs() <= NEARLY_ZERO * NEARLY_ZERO * NEARLY_ZERO {
            return None;
        }
        let inv_det = 1.0 / det;
        let adj = [
            m[4] * m[8] - m[5] * m[7],
            m[2] * m[7] - m[1] * m[8],
            m[1] * m[5] - m[2] * m[4],
            m[5] * m[6] - m[3] * m[8],
            m[0] * m[8] - m[2] * m[6],
            m[2] * m[3] - m[0] * m[5],
            m[3] * m[7] - m[4] * m[6],
            m[1] * m[6] - m[0] * m[7],
            m[0] * m[4] - m[1] * m[3],
        ];
        let mut out = [0.0; 9];
        for (o, a) in out.iter_mut().zip(adj) {
            *o = a * inv_det;
        }
        let mut inv = Self { m: out };
        if !self.has_perspective() {
            // Keep affine inverses exactly affine.
            inv.m[6] = 0.0;
            inv.m[7] = 0.0;
            inv.m[8] = 1.0;
        }
        inv.is_finite().then_some(inv)
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|v| v.is_finite())
    }

    /// Homogeneous `[X, Y, W]` for `(x, y, 1)`.
    pub fn map_homogeneous(&self, x: f64, y: f64) -> [f64; 3] {
        let m = &self.m;
        [
            m[0] * x + m[1] * y + m[2],
            m[3] * x + m[4] * y + m[5],
            m[6] * x + m[7] * y + m[8],
        ]
    }

    pub fn map_xy(&self, x: f64, y: f64) -> Point {
        let [px, py, w] = self.map_homogeneous(x, y);
        if self.has_perspective() {
            Point::new(px / w, py / w)
        } else {
            Point::new(px, py)
        }
    }

    pub fn map_point(&self, p: Point) -> Point {
        self.map_xy(p.x, p.y)
    }

    /// Maps a direction. Translation is ignored; with perspective the vector is measured from
    /// the mapped origin.
    pub fn map_vector(&self, v: Vec2) -> Vec2 {
        if self.has_perspective() {
            let origin = self.map_xy(0.0, 0.0);
            return self.map_xy(v.x, v.y) - origin;
        }
        let m = &self.m;
        Vec2::new(m[0] * v.x + m[1] * v.y, m[3] * v.x + m[4] * v.y)
    }

    /// Bounding box of the mapped rect. Perspective corners behind the viewer are clipped.
    pub fn map_rect(&self, r: &Rect) -> Rect {
        if !self.has_perspective() {
            let pts = [
                self.map_xy(r.x0, r.y0),
                self.map_xy(r.x1, r.y0),
                self.map_xy(r.x1, r.y1),
                self.map_xy(r.x0, r.y1),
            ];
            return bounds_of(&pts).unwrap_or(Rect::ZERO);
        }

        let corners = [
            self.map_homogeneous(r.x0, r.y0),
            self.map_homogeneous(r.x1, r.y0),
            self.map_homogeneous(r.x1, r.y1),
            self.map_homogeneous(r.x0, r.y1),
        ];
        let mut pts = Vec::with_capacity(8);
        for i in 0..4 {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            let a_in = a[2] >= W0_PLANE_DISTANCE;
            let b_in = b[2] >= W0_PLANE_DISTANCE;
            if a_in {
                pts.push(Point::new(a[0] / a[2], a[1] / a[2]));
            }
            if a_in != b_in {
                let t = (W0_PLANE_DISTANCE - a[2]) / (b[2] - a[2]);
                let x = a[0] + (b[0] - a[0]) * t;
                let y = a[1] + (b[1] - a[1]) * t;
                pts.push(Point::new(x / W0_PLANE_DISTANCE, y / W0_PLANE_DISTANCE));
            }
        }
        bounds_of(&pts).unwrap_or(Rect::ZERO)
    }

    /// Integer-preserving rect mapping.
    ///
    /// Scale-translate matrices are evaluated in f64 and snapped with [`ROUND_EPSILON`] so that
    /// exact integer results never pick up an extra row or column; other matrices map the corners
    /// and round the bounds out.
    pub fn map_irect(&self, r: &IRect) -> IRect {
        if r.is_empty() {
            return IRect::EMPTY;
        }
        if self.is_scale_translate() {
            let (sx, sy, tx, ty) = (self.m[0], self.m[4], self.m[2], self.m[5]);
            let l = sx * f64::from(r.left) + tx;
            let rt = sx * f64::from(r.right) + tx;
            let t = sy * f64::from(r.top) + ty;
            let b = sy * f64::from(r.bottom) + ty;
            return snap_scale_translate_bounds(l, t, rt, b);
        }
        IRect::round_out(&self.map_rect(&r.to_rect()))
    }

    /// Inverse-maps a float rect. Empty rects succeed with an empty result.
    pub fn inverse_map_rect(&self, r: &Rect) -> Option<Rect> {
        if r.is_empty_rect() {
            return Some(Rect::ZERO);
        }
        let inv = self.invert()?;
        Some(inv.map_rect(r))
    }

    /// Inverse of [`Matrix::map_irect`], with the same f64 path for scale-translate matrices.
    pub fn inverse_map_irect(&self, r: &IRect) -> Option<IRect> {
        if r.is_empty() {
            return Some(IRect::EMPTY);
        }
        if self.is_scale_translate() {
            let (sx, sy, tx, ty) = (self.m[0], self.m[4], self.m[2], self.m[5]);
            if sx == 0.0 || sy == 0.0 {
                return None;
            }
            let l = (f64::from(r.left) - tx) / sx;
            let rt = (f64::from(r.right) - tx) / sx;
            let t = (f64::from(r.top) - ty) / sy;
            let b = (f64::from(r.bottom) - ty) / sy;
            return Some(snap_scale_translate_bounds(l, t, rt, b));
        }
        let mapped = self.inverse_map_rect(&r.to_rect())?;
        Some(IRect::round_out(&mapped))
    }

    /// Split into `(scale, remaining)` with `self == remaining * Scale(scale)`.
    ///
    /// Fails for perspective or degenerate axes.
    pub fn decompose_scale(&self) -> Option<(Size, Self)> {
        if self.has_perspective() {
            return None;
        }
        let sx = self.m[0].hypot(self.m[3]);
        let sy = self.m[1].hypot(self.m[4]);
        if !sx.is_finite() || !sy.is_finite() || nearly_zero(sx) || nearly_zero(sy) {
            return None;
        }
        Some((Size::new(sx, sy), self.pre_scale(1.0 / sx, 1.0 / sy)))
    }

    /// Local area scale factor at `p`: `|det(J)|` of the projective map.
    ///
    /// Points behind the `w = 0` plane report infinity.
    pub fn differential_area_scale(&self, p: Point) -> f64 {
        let [_, _, w] = self.map_homogeneous(p.x, p.y);
        if w < NEARLY_ZERO {
            return f64::INFINITY;
        }
        (self.determinant() / (w * w * w)).abs()
    }

    /// `(min, max)` singular values of the linear part. `None` with perspective.
    pub fn min_max_scales(&self) -> Option<(f64, f64)> {
        if self.has_perspective() {
            return None;
        }
        let [sx, kx, _, ky, sy, ..] = self.m;
        let a = sx * sx + ky * ky;
        let b = sx * kx + ky * sy;
        let c = kx * kx + sy * sy;
        let half_trace = 0.5 * (a + c);
        let disc = (0.25 * (a - c) * (a - c) + b * b).sqrt();
        let lo = (half_trace - disc).max(0.0).sqrt();
        let hi = (half_trace + disc).sqrt();
        (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
    }

    /// The integer offset when every element is within [`ROUND_EPSILON`] of an integer
    /// translation.
    pub fn nearly_integer_translation(&self) -> Option<IPoint> {
        let tx = (self.m[2] / self.m[8]).round();
        let ty = (self.m[5] / self.m[8]).round();
        let expected = Self::translate(tx, ty);
        let all_near = self
            .m
            .iter()
            .zip(expected.m.iter())
            .all(|(&a, &e)| nearly_equal(e, a, ROUND_EPSILON));
        all_near.then(|| IPoint::new(saturate_i32(tx), saturate_i32(ty)))
    }

    pub fn is_nearly_integer_translation(&self) -> bool {
        self.nearly_integer_translation().is_some()
    }

    pub(crate) fn as_row_major(&self) -> &[f64; 9] {
        &self.m
    }
}

fn snap_scale_translate_bounds(l: f64, t: f64, r: f64, b: f64) -> IRect {
    IRect::from_ltrb(
        saturate_i32((l.min(r) + ROUND_EPSILON).floor()),
        saturate_i32((t.min(b) + ROUND_EPSILON).floor()),
        saturate_i32((l.max(r) - ROUND_EPSILON).ceil()),
        saturate_i32((t.max(b) - ROUND_EPSILON).ceil()),
    )
}

fn bounds_of(pts: &[Point]) -> Option<Rect> {
    let first = pts.first()?;
    let mut out = Rect::new(first.x, first.y, first.x, first.y);
    for p in &pts[1..] {
        out.x0 = out.x0.min(p.x);
        out.y0 = out.y0.min(p.y);
        out.x1 = out.x1.max(p.x);
        out.y1 = out.y1.max(p.y);
    }
    Some(out)
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/matrix.rs"]
mod tests;
