use crate::foundation::core::Rect;
use crate::geometry::matrix::Matrix;
use crate::geometry::rect::RectExt;

/// For each edge of `m(a)` ordered top, right, bottom, left: whether every corner of `b` lies on
/// the inner side of that edge, within `tol` pixels.
///
/// `b` is assumed to already be in the output space of `m`. An empty `a`, or one mapped entirely
/// behind the viewer, contains nothing.
pub fn quad_contains_rect_mask(m: &Matrix, a: &Rect, b: &Rect, tol: f64) -> [bool; 4] {
    if a.is_empty_rect() {
        return [false; 4];
    }

    let corners = [
        m.map_homogeneous(a.x0, a.y0),
        m.map_homogeneous(a.x1, a.y0),
        m.map_homogeneous(a.x1, a.y1),
        m.map_homogeneous(a.x0, a.y1),
    ];
    if corners.iter().all(|c| c[2] < 0.0) {
        return [false; 4];
    }

    // Homogeneous line through consecutive corners: cross product of the two points.
    let mut lines = [[0.0f64; 3]; 4];
    for (i, line) in lines.iter_mut().enumerate() {
        let [x0, y0, w0] = corners[i];
        let [x1, y1, w1] = corners[(i + 1) % 4];
        *line = [y0 * w1 - w0 * y1, w0 * x1 - x0 * w1, x0 * y1 - y0 * x1];
    }

    // Corners were clockwise before mapping; a mirroring matrix flips the normals.
    let winding = lines[0][0] * lines[1][1] - lines[0][1] * lines[1][0];
    let sign = if winding < 0.0 { -1.0 } else { 1.0 };

    let probes = [(b.x0, b.y0), (b.x1, b.y0), (b.x1, b.y1), (b.x0, b.y1)];
    let mut mask = [false; 4];
    for (edge, [la, lb, lc]) in mask.iter_mut().zip(lines) {
        let len = la.hypot(lb);
        if !(len > 0.0) || !len.is_finite() {
            continue;
        }
        *edge = probes
            .iter()
            .all(|&(x, y)| sign * (la * x + lb * y + lc) / len >= -tol);
    }
    mask
}

pub fn quad_contains_rect(m: &Matrix, a: &Rect, b: &Rect, tol: f64) -> bool {
    quad_contains_rect_mask(m, a, b, tol).iter().all(|&e| e)
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/quad.rs"]
mod tests;
