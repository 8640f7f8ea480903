//! Coordinate-space tagging.
//!
//! Filter evaluation juggles three frames: parameter space (the filter's own local coordinates),
//! layer space (the raster frame a filter subgraph renders in) and device space (the final
//! output). Geometry is wrapped in [`Spaced`] with an uninhabited unit marker so that values from
//! different frames cannot be mixed without going through a [`crate::Mapping`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::foundation::core::{Point, Rect, Size, Vec2};
use crate::foundation::math::{ROUND_EPSILON, saturate_i32};
use crate::geometry::irect::{IPoint, IRect, ISize};
use crate::geometry::matrix::Matrix;
use crate::geometry::rect::RectExt;
use crate::paint::sampling::TileMode;

/// Unit marker for filter-local parameter space.
pub enum ParameterUnit {}
/// Unit marker for the working raster space of a filter subgraph.
pub enum LayerUnit {}
/// Unit marker for the final output space.
pub enum DeviceUnit {}

/// A geometry value tagged with the coordinate space `U` it belongs to.
pub struct Spaced<T, U> {
    value: T,
    _unit: PhantomData<fn() -> U>,
}

/// Geometry in parameter space.
pub type ParameterSpace<T> = Spaced<T, ParameterUnit>;
/// Geometry in layer space.
pub type LayerSpace<T> = Spaced<T, LayerUnit>;
/// Geometry in device space.
pub type DeviceSpace<T> = Spaced<T, DeviceUnit>;

impl<T, U> Spaced<T, U> {
    pub const fn new(value: T) -> Self {
        Self {
            value,
            _unit: PhantomData,
        }
    }

    /// Borrow the untagged value.
    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Clone, U> Clone for Spaced<T, U> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T: Copy, U> Copy for Spaced<T, U> {}

impl<T: PartialEq, U> PartialEq for Spaced<T, U> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq, U> Eq for Spaced<T, U> {}

impl<T: Hash, U> Hash for Spaced<T, U> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: Default, U> Default for Spaced<T, U> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug, U> fmt::Debug for Spaced<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// Geometry that can be carried from one coordinate space to another by a matrix.
pub trait Mappable: Sized {
    fn map_by(&self, matrix: &Matrix) -> Self;
}

impl Mappable for Rect {
    fn map_by(&self, matrix: &Matrix) -> Self {
        if self.is_empty_rect() {
            Rect::ZERO
        } else {
            matrix.map_rect(self)
        }
    }
}

impl Mappable for IRect {
    fn map_by(&self, matrix: &Matrix) -> Self {
        matrix.map_irect(self)
    }
}

impl Mappable for Point {
    fn map_by(&self, matrix: &Matrix) -> Self {
        matrix.map_point(*self)
    }
}

impl Mappable for IPoint {
    fn map_by(&self, matrix: &Matrix) -> Self {
        let p = matrix.map_xy(f64::from(self.x), f64::from(self.y));
        IPoint::new(saturate_i32(p.x.round()), saturate_i32(p.y.round()))
    }
}

impl Mappable for Vec2 {
    fn map_by(&self, matrix: &Matrix) -> Self {
        matrix.map_vector(*self)
    }
}

/// Sizes are unpositioned lengths of the local X and Y axes; the result is the lengths of the
/// mapped axes.
impl Mappable for Size {
    fn map_by(&self, matrix: &Matrix) -> Self {
        if matrix.is_scale_translate() {
            let v = matrix.map_vector(Vec2::new(self.width, self.height));
            return Size::new(v.x.abs(), v.y.abs());
        }
        let x_axis = matrix.map_vector(Vec2::new(self.width, 0.0));
        let y_axis = matrix.map_vector(Vec2::new(0.0, self.height));
        Size::new(x_axis.length(), y_axis.length())
    }
}

impl Mappable for ISize {
    fn map_by(&self, matrix: &Matrix) -> Self {
        let s = Size::new(f64::from(self.width), f64::from(self.height)).map_by(matrix);
        ceil_size(s)
    }
}

/// A transform acting inside the source space, re-expressed to act inside the destination space:
/// `matrix * m * matrix^-1`.
impl Mappable for Matrix {
    fn map_by(&self, matrix: &Matrix) -> Self {
        let Some(inv) = matrix.invert() else {
            debug_assert!(false, "mapping a transform through a singular matrix");
            return *self;
        };
        Matrix::concat(&Matrix::concat(matrix, self), &inv)
    }
}

fn ceil_size(s: Size) -> ISize {
    ISize::new(
        saturate_i32((s.width - ROUND_EPSILON).ceil()),
        saturate_i32((s.height - ROUND_EPSILON).ceil()),
    )
}

impl<U> Spaced<IPoint, U> {
    pub fn x(&self) -> i32 {
        self.value.x
    }

    pub fn y(&self) -> i32 {
        self.value.y
    }

    pub fn to_point(&self) -> Spaced<Point, U> {
        Spaced::new(Point::new(f64::from(self.value.x), f64::from(self.value.y)))
    }
}

impl<U> Spaced<Point, U> {
    pub fn x(&self) -> f64 {
        self.value.x
    }

    pub fn y(&self) -> f64 {
        self.value.y
    }
}

impl<U> Spaced<ISize, U> {
    pub fn width(&self) -> i32 {
        self.value.width
    }

    pub fn height(&self) -> i32 {
        self.value.height
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl<U> Spaced<Size, U> {
    pub fn width(&self) -> f64 {
        self.value.width
    }

    pub fn height(&self) -> f64 {
        self.value.height
    }

    /// Round each dimension to the nearest integer.
    pub fn round(&self) -> Spaced<ISize, U> {
        Spaced::new(ISize::new(
            saturate_i32(self.value.width.round()),
            saturate_i32(self.value.height.round()),
        ))
    }

    /// Ceil after subtracting [`ROUND_EPSILON`].
    pub fn ceil(&self) -> Spaced<ISize, U> {
        Spaced::new(ceil_size(self.value))
    }

    /// Floor after adding [`ROUND_EPSILON`].
    pub fn floor(&self) -> Spaced<ISize, U> {
        Spaced::new(ISize::new(
            saturate_i32((self.value.width + ROUND_EPSILON).floor()),
            saturate_i32((self.value.height + ROUND_EPSILON).floor()),
        ))
    }
}

impl<U> Spaced<IRect, U> {
    pub fn empty() -> Self {
        Self::new(IRect::EMPTY)
    }

    pub fn from_size(size: Spaced<ISize, U>) -> Self {
        Self::new(IRect::from_size(size.into_inner()))
    }

    pub fn left(&self) -> i32 {
        self.value.left
    }

    pub fn top(&self) -> i32 {
        self.value.top
    }

    pub fn right(&self) -> i32 {
        self.value.right
    }

    pub fn bottom(&self) -> i32 {
        self.value.bottom
    }

    pub fn width(&self) -> i32 {
        self.value.width()
    }

    pub fn height(&self) -> i32 {
        self.value.height()
    }

    pub fn size(&self) -> Spaced<ISize, U> {
        Spaced::new(self.value.size())
    }

    pub fn top_left(&self) -> Spaced<IPoint, U> {
        Spaced::new(self.value.top_left())
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        self.value.intersect(&other.value).map(Spaced::new)
    }

    pub fn contains(&self, other: &Self) -> bool {
        self.value.contains(&other.value)
    }

    pub fn join(&self, other: &Self) -> Self {
        Spaced::new(self.value.join(&other.value))
    }

    pub fn outset(&self, delta: Spaced<ISize, U>) -> Self {
        Spaced::new(self.value.outset(delta.width(), delta.height()))
    }

    pub fn inset(&self, delta: Spaced<ISize, U>) -> Self {
        Spaced::new(self.value.inset(delta.width(), delta.height()))
    }

    pub fn offset(&self, v: Spaced<IPoint, U>) -> Self {
        Spaced::new(self.value.offset(v.x(), v.y()))
    }

    pub fn to_rect(&self) -> Spaced<Rect, U> {
        Spaced::new(self.value.to_rect())
    }

    /// The part of `self`, used as tiling source, that is needed to fill `dst` under `tile_mode`.
    ///
    /// Decal and clamp only need the overlap. When disjoint, decal needs nothing and clamp needs
    /// the single row, column or corner facing `dst`. Periodic modes need the whole source.
    pub fn relevant_subset(&self, dst: &Self, tile_mode: TileMode) -> Self {
        match tile_mode {
            TileMode::Decal | TileMode::Clamp => match self.intersect(dst) {
                Some(overlap) => overlap,
                None if tile_mode == TileMode::Decal => Self::empty(),
                None => Spaced::new(IRect::closest_disjoint_edge(&self.value, &dst.value)),
            },
            TileMode::Repeat | TileMode::Mirror => *self,
        }
    }
}

impl<U> Spaced<Rect, U> {
    pub fn empty() -> Self {
        Self::new(Rect::ZERO)
    }

    pub fn left(&self) -> f64 {
        self.value.x0
    }

    pub fn top(&self) -> f64 {
        self.value.y0
    }

    pub fn right(&self) -> f64 {
        self.value.x1
    }

    pub fn bottom(&self) -> f64 {
        self.value.y1
    }

    pub fn width(&self) -> f64 {
        self.value.width()
    }

    pub fn height(&self) -> f64 {
        self.value.height()
    }

    pub fn size(&self) -> Spaced<Size, U> {
        Spaced::new(Size::new(self.width(), self.height()))
    }

    pub fn center(&self) -> Spaced<Point, U> {
        Spaced::new(self.value.center())
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty_rect()
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        self.value.intersection(&other.value).map(Spaced::new)
    }

    pub fn contains(&self, other: &Self) -> bool {
        self.value.encloses(&other.value)
    }

    pub fn outset(&self, dx: f64, dy: f64) -> Self {
        Spaced::new(self.value.outset_xy(dx, dy))
    }

    pub fn inset(&self, dx: f64, dy: f64) -> Self {
        Spaced::new(self.value.inset_xy(dx, dy))
    }

    /// Round out with [`ROUND_EPSILON`] tolerance.
    pub fn round_out(&self) -> Spaced<IRect, U> {
        Spaced::new(IRect::round_out(&self.value))
    }

    /// Round in with [`ROUND_EPSILON`] tolerance.
    pub fn round_in(&self) -> Spaced<IRect, U> {
        Spaced::new(IRect::round_in(&self.value))
    }

    pub fn round(&self) -> Spaced<IRect, U> {
        Spaced::new(IRect::round(&self.value))
    }
}

impl<U> Spaced<Matrix, U> {
    pub fn identity() -> Self {
        Self::new(Matrix::IDENTITY)
    }

    pub fn translate(v: Spaced<IPoint, U>) -> Self {
        Self::new(Matrix::translate(f64::from(v.x()), f64::from(v.y())))
    }

    pub fn map_rect(&self, r: &Spaced<Rect, U>) -> Spaced<Rect, U> {
        Spaced::new(r.value.map_by(&self.value))
    }

    /// Like rounding out `map_rect`, but exact for large integer coordinates.
    pub fn map_irect(&self, r: &Spaced<IRect, U>) -> Spaced<IRect, U> {
        Spaced::new(r.value.map_by(&self.value))
    }

    pub fn map_point(&self, p: &Spaced<Point, U>) -> Spaced<Point, U> {
        Spaced::new(p.value.map_by(&self.value))
    }

    pub fn map_vector(&self, v: &Spaced<Vec2, U>) -> Spaced<Vec2, U> {
        Spaced::new(v.value.map_by(&self.value))
    }

    pub fn map_size(&self, s: &Spaced<Size, U>) -> Spaced<Size, U> {
        Spaced::new(s.value.map_by(&self.value))
    }

    /// `None` when the matrix is singular. Empty input always maps to empty.
    pub fn inverse_map_rect(&self, r: &Spaced<Rect, U>) -> Option<Spaced<Rect, U>> {
        self.value.inverse_map_rect(&r.value).map(Spaced::new)
    }

    pub fn inverse_map_irect(&self, r: &Spaced<IRect, U>) -> Option<Spaced<IRect, U>> {
        self.value.inverse_map_irect(&r.value).map(Spaced::new)
    }

    pub fn invert(&self) -> Option<Self> {
        self.value.invert().map(Spaced::new)
    }

    /// `self * other`.
    pub fn pre_concat(&self, other: &Self) -> Self {
        Spaced::new(self.value.pre_concat(&other.value))
    }

    /// `other * self`.
    pub fn post_concat(&self, other: &Self) -> Self {
        Spaced::new(self.value.post_concat(&other.value))
    }

    pub fn rect_stays_rect(&self) -> bool {
        self.value.rect_stays_rect()
    }

    pub fn has_perspective(&self) -> bool {
        self.value.has_perspective()
    }

    pub fn nearly_integer_translation(&self) -> Option<Spaced<IPoint, U>> {
        self.value.nearly_integer_translation().map(Spaced::new)
    }

    pub fn is_nearly_integer_translation(&self) -> bool {
        self.value.is_nearly_integer_translation()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/space.rs"]
mod tests;
