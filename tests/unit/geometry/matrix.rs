use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn concat_applies_right_operand_first() {
    let t = Matrix::translate(10.0, 0.0);
    let s = Matrix::scale(2.0, 2.0);
    let ts = Matrix::concat(&t, &s);
    assert_eq!(ts.map_xy(1.0, 1.0), Point::new(12.0, 2.0));
    assert_eq!(s.post_concat(&t), ts);
    assert_eq!(t.pre_concat(&s), ts);
}

#[test]
fn affine_round_trip() {
    let a = Affine::rotate(0.3).then_translate(Vec2::new(4.0, -2.0));
    let m = Matrix::from_affine(a);
    let p = Point::new(3.0, 7.0);
    let q = m.map_point(p);
    let expect = a * p;
    assert!(approx(q.x, expect.x) && approx(q.y, expect.y));
    assert_eq!(m.to_affine().unwrap().as_coeffs(), a.as_coeffs());
}

#[test]
fn invert_general_and_singular() {
    let m = Matrix::from_affine(Affine::rotate(0.7).then_scale(3.0));
    let inv = m.invert().unwrap();
    let id = Matrix::concat(&m, &inv);
    for i in 0..9 {
        assert!(approx(id.get(i), Matrix::IDENTITY.get(i)));
    }
    assert!(Matrix::scale(0.0, 1.0).invert().is_none());
    assert!(
        Matrix::from_row_major([1.0, 2.0, 0.0, 2.0, 4.0, 0.0, 0.0, 0.0, 1.0])
            .invert()
            .is_none()
    );
}

#[test]
fn perspective_inverse_maps_back() {
    let m = Matrix::from_row_major([1.0, 0.2, 3.0, 0.1, 1.5, -2.0, 0.001, 0.002, 1.0]);
    let inv = m.invert().unwrap();
    let p = Point::new(12.0, 9.0);
    let back = inv.map_point(m.map_point(p));
    assert!((back.x - p.x).abs() < 1e-6 && (back.y - p.y).abs() < 1e-6);
}

#[test]
fn classification() {
    assert!(Matrix::IDENTITY.is_identity());
    assert!(Matrix::translate(1.0, 2.0).is_translate());
    assert!(Matrix::scale(2.0, 3.0).is_scale_translate());
    assert!(Matrix::scale(2.0, 3.0).rect_stays_rect());
    let rot90 = Matrix::from_row_major([0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    assert!(rot90.rect_stays_rect());
    assert!(!rot90.is_scale_translate());
    let rot = Matrix::from_affine(Affine::rotate(0.5));
    assert!(!rot.rect_stays_rect());
    let persp = Matrix::from_row_major([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.01, 0.0, 1.0]);
    assert!(persp.has_perspective());
    assert!(!persp.rect_stays_rect());
}

#[test]
fn map_irect_is_exact_for_large_integer_translations() {
    let r = IRect::from_ltrb(-7, 3, 25, 40);
    for t in [1.0, 1_000.0, 999_999.0, 1_000_000.0, -1_000_000.0] {
        let m = Matrix::translate(t, -t);
        let mapped = m.map_irect(&r);
        let ti = t as i32;
        assert_eq!(
            mapped,
            IRect::from_ltrb(-7 + ti, 3 - ti, 25 + ti, 40 - ti),
            "translation {t}"
        );
        assert_eq!(m.inverse_map_irect(&mapped), Some(r));
    }
}

#[test]
fn map_irect_snaps_near_integer_scale() {
    let m = Matrix::scale_translate(1.0 + 1e-5, 1.0, 0.4999, 0.0);
    let mapped = m.map_irect(&IRect::from_ltrb(0, 0, 10, 10));
    assert_eq!(mapped, IRect::from_ltrb(0, 0, 11, 10));
    let m = Matrix::scale_translate(1.0, 1.0, 1e-4, -1e-4);
    assert_eq!(
        m.map_irect(&IRect::from_ltrb(2, 2, 8, 8)),
        IRect::from_ltrb(2, 2, 8, 8)
    );
}

#[test]
fn map_irect_with_rotation_rounds_out() {
    let m = Matrix::from_affine(Affine::rotate(std::f64::consts::FRAC_PI_4));
    let r = m.map_irect(&IRect::from_ltrb(0, 0, 10, 10));
    assert_eq!(r, IRect::from_ltrb(-8, 0, 8, 15));
}

#[test]
fn inverse_map_of_empty_succeeds_even_if_singular() {
    let singular = Matrix::scale(0.0, 0.0);
    assert_eq!(singular.inverse_map_irect(&IRect::EMPTY), Some(IRect::EMPTY));
    assert_eq!(
        singular.inverse_map_irect(&IRect::from_ltrb(0, 0, 1, 1)),
        None
    );
    assert_eq!(singular.inverse_map_rect(&Rect::ZERO), Some(Rect::ZERO));
}

#[test]
fn decompose_scale_factors_rotation() {
    let m = Matrix::from_affine(Affine::rotate(0.4).then_scale(2.0)).pre_scale(1.0, 3.0);
    let (scale, rest) = m.decompose_scale().unwrap();
    assert!(approx(scale.width, 2.0));
    assert!(approx(scale.height, 6.0));
    let rebuilt = rest.pre_scale(scale.width, scale.height);
    for i in 0..9 {
        assert!(approx(rebuilt.get(i), m.get(i)));
    }
    let persp = Matrix::from_row_major([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.01, 0.0, 1.0]);
    assert!(persp.decompose_scale().is_none());
}

#[test]
fn differential_area_scale_matches_affine_determinant() {
    let m = Matrix::scale(2.0, 3.0);
    assert!(approx(m.differential_area_scale(Point::new(5.0, 5.0)), 6.0));
    let persp = Matrix::from_row_major([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0]);
    assert!(persp.differential_area_scale(Point::ORIGIN).is_infinite());
}

#[test]
fn min_max_scales_of_rotated_scale() {
    let m = Matrix::from_affine(Affine::rotate(1.1)).pre_scale(0.5, 4.0);
    let (lo, hi) = m.min_max_scales().unwrap();
    assert!((lo - 0.5).abs() < 1e-9);
    assert!((hi - 4.0).abs() < 1e-9);
}

#[test]
fn nearly_integer_translation_tolerates_noise() {
    let m = Matrix::from_row_major([1.0 + 1e-4, 0.0, 5.0002, 0.0, 1.0, -3.0, 0.0, 0.0, 1.0]);
    assert_eq!(m.nearly_integer_translation(), Some(IPoint::new(5, -3)));
    assert!(Matrix::translate(0.5, 0.0).nearly_integer_translation().is_none());
    assert!(Matrix::scale(2.0, 1.0).nearly_integer_translation().is_none());
}

#[test]
fn perspective_map_rect_clips_behind_viewer() {
    let m = Matrix::from_row_major([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.1, 0.0, 1.0]);
    let r = m.map_rect(&Rect::new(-20.0, 0.0, 0.0, 10.0));
    assert!(r.x0.is_finite() && r.x1.is_finite());
    assert!(r.x1 <= 0.0 + 1e-9);
}

#[test]
fn rect_to_rect_maps_corners() {
    let src = Rect::new(0.0, 0.0, 4.0, 2.0);
    let dst = Rect::new(10.0, 10.0, 12.0, 14.0);
    let m = Matrix::rect_to_rect(&src, &dst).unwrap();
    assert_eq!(m.map_xy(0.0, 0.0), Point::new(10.0, 10.0));
    assert_eq!(m.map_xy(4.0, 2.0), Point::new(12.0, 14.0));
    assert!(Matrix::rect_to_rect(&Rect::ZERO, &dst).is_none());
}
