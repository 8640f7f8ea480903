use crate::foundation::core::Rect;
use crate::foundation::math::{ROUND_EPSILON, saturate_i32};

/// Integer point or offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IPoint {
    pub x: i32,
    pub y: i32,
}

impl IPoint {
    pub const ZERO: Self = Self::new(0, 0);

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer width and height. Negative values are never produced by this crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ISize {
    pub width: i32,
    pub height: i32,
}

impl ISize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }
}

/// Half-open integer rectangle `[left, right) x [top, bottom)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IRect {
    pub const EMPTY: Self = Self::from_ltrb(0, 0, 0, 0);

    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::from_ltrb(x, y, x.saturating_add(w), y.saturating_add(h))
    }

    pub fn from_size(size: ISize) -> Self {
        Self::from_ltrb(0, 0, size.width, size.height)
    }

    pub fn from_origin_size(origin: IPoint, size: ISize) -> Self {
        Self::from_xywh(origin.x, origin.y, size.width, size.height)
    }

    /// Width as i64 so that extreme rects don't overflow.
    pub fn width64(&self) -> i64 {
        i64::from(self.right) - i64::from(self.left)
    }

    pub fn height64(&self) -> i64 {
        i64::from(self.bottom) - i64::from(self.top)
    }

    pub fn width(&self) -> i32 {
        saturate_i32(self.width64() as f64)
    }

    pub fn height(&self) -> i32 {
        saturate_i32(self.height64() as f64)
    }

    pub fn size(&self) -> ISize {
        ISize::new(self.width(), self.height())
    }

    pub fn top_left(&self) -> IPoint {
        IPoint::new(self.left, self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Overlap of two rects, `None` when they don't intersect.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let out = Self::from_ltrb(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!out.is_empty()).then_some(out)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.intersect(other).is_some()
    }

    /// True when `other` is non-empty and lies entirely inside `self`.
    pub fn contains(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Smallest rect covering both. Empty rects are ignored.
    pub fn join(&self, other: &Self) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Self::from_ltrb(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    pub fn outset(&self, dx: i32, dy: i32) -> Self {
        Self::from_ltrb(
            self.left.saturating_sub(dx),
            self.top.saturating_sub(dy),
            self.right.saturating_add(dx),
            self.bottom.saturating_add(dy),
        )
    }

    pub fn inset(&self, dx: i32, dy: i32) -> Self {
        self.outset(dx.saturating_neg(), dy.saturating_neg())
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::from_ltrb(
            self.left.saturating_add(dx),
            self.top.saturating_add(dy),
            self.right.saturating_add(dx),
            self.bottom.saturating_add(dy),
        )
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            f64::from(self.left),
            f64::from(self.top),
            f64::from(self.right),
            f64::from(self.bottom),
        )
    }

    /// Nearest row, column or corner of `src` facing `dst` when the two are disjoint.
    ///
    /// Overlapping axes keep the overlap. Empty inputs produce an empty rect.
    pub fn closest_disjoint_edge(src: &Self, dst: &Self) -> Self {
        if src.is_empty() || dst.is_empty() {
            return Self::EMPTY;
        }
        let (mut l, mut r) = (src.left, src.right);
        if r <= dst.left {
            l = r - 1;
        } else if l >= dst.right {
            r = l + 1;
        } else {
            l = l.max(dst.left);
            r = r.min(dst.right);
        }
        let (mut t, mut b) = (src.top, src.bottom);
        if b <= dst.top {
            t = b - 1;
        } else if t >= dst.bottom {
            b = t + 1;
        } else {
            t = t.max(dst.top);
            b = b.min(dst.bottom);
        }
        Self::from_ltrb(l, t, r, b)
    }

    /// Plain floor/ceil of the float bounds.
    pub fn round_out_exact(r: &Rect) -> Self {
        Self::from_ltrb(
            saturate_i32(r.x0.floor()),
            saturate_i32(r.y0.floor()),
            saturate_i32(r.x1.ceil()),
            saturate_i32(r.y1.ceil()),
        )
    }

    /// Round out after shrinking by [`ROUND_EPSILON`], so near-integer edges don't grow a pixel.
    pub fn round_out(r: &Rect) -> Self {
        Self::round_out_exact(&Rect::new(
            r.x0 + ROUND_EPSILON,
            r.y0 + ROUND_EPSILON,
            r.x1 - ROUND_EPSILON,
            r.y1 - ROUND_EPSILON,
        ))
    }

    /// Round in after growing by [`ROUND_EPSILON`], so near-integer edges don't lose a pixel.
    pub fn round_in(r: &Rect) -> Self {
        Self::from_ltrb(
            saturate_i32((r.x0 - ROUND_EPSILON).ceil()),
            saturate_i32((r.y0 - ROUND_EPSILON).ceil()),
            saturate_i32((r.x1 + ROUND_EPSILON).floor()),
            saturate_i32((r.y1 + ROUND_EPSILON).floor()),
        )
    }

    /// Round each edge to the nearest integer.
    pub fn round(r: &Rect) -> Self {
        Self::from_ltrb(
            saturate_i32(r.x0.round()),
            saturate_i32(r.y0.round()),
            saturate_i32(r.x1.round()),
            saturate_i32(r.y1.round()),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/irect.rs"]
mod tests;
