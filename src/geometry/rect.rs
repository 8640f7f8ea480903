use crate::foundation::core::Rect;

/// Sorted-rect predicates and set operations on [`kurbo::Rect`].
///
/// A rect is empty unless `x0 < x1 && y0 < y1`; NaN edges are empty.
pub trait RectExt {
    fn is_empty_rect(&self) -> bool;
    fn intersection(&self, other: &Rect) -> Option<Rect>;
    fn encloses(&self, other: &Rect) -> bool;
    fn outset_xy(&self, dx: f64, dy: f64) -> Rect;
    fn inset_xy(&self, dx: f64, dy: f64) -> Rect;
}

impl RectExt for Rect {
    fn is_empty_rect(&self) -> bool {
        !(self.x0 < self.x1 && self.y0 < self.y1)
    }

    fn intersection(&self, other: &Rect) -> Option<Rect> {
        let out = Rect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        (!out.is_empty_rect()).then_some(out)
    }

    fn encloses(&self, other: &Rect) -> bool {
        !self.is_empty_rect()
            && !other.is_empty_rect()
            && self.x0 <= other.x0
            && self.y0 <= other.y0
            && self.x1 >= other.x1
            && self.y1 >= other.y1
    }

    fn outset_xy(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x0 - dx, self.y0 - dy, self.x1 + dx, self.y1 + dy)
    }

    fn inset_xy(&self, dx: f64, dy: f64) -> Rect {
        self.outset_xy(-dx, -dy)
    }
}
