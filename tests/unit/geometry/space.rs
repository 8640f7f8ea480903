use super::*;

type L<T> = LayerSpace<T>;

#[test]
fn relevant_subset_decal_and_clamp() {
    let src = L::new(IRect::from_ltrb(0, 0, 10, 10));
    let overlapping = L::new(IRect::from_ltrb(5, 5, 20, 20));
    let disjoint = L::new(IRect::from_ltrb(0, 30, 10, 40));

    assert_eq!(
        src.relevant_subset(&overlapping, TileMode::Decal).into_inner(),
        IRect::from_ltrb(5, 5, 10, 10)
    );
    assert!(src.relevant_subset(&disjoint, TileMode::Decal).is_empty());

    let edge = src.relevant_subset(&disjoint, TileMode::Clamp);
    assert!(!edge.is_empty());
    assert_eq!(edge.height(), 1);
    assert_eq!(edge.into_inner(), IRect::from_ltrb(0, 9, 10, 10));
}

#[test]
fn relevant_subset_periodic_keeps_source() {
    let src = L::new(IRect::from_ltrb(0, 0, 10, 10));
    let far = L::new(IRect::from_ltrb(100, 100, 110, 110));
    assert_eq!(src.relevant_subset(&far, TileMode::Repeat), src);
    assert_eq!(src.relevant_subset(&far, TileMode::Mirror), src);
}

#[test]
fn relevant_subset_decal_empty_iff_disjoint() {
    let src = L::new(IRect::from_ltrb(-3, 4, 7, 9));
    for (dx, dy) in [(-20, 0), (0, -20), (5, 5), (9, 0), (10, 0), (0, 5), (0, 6)] {
        let dst = src.offset(L::new(IPoint::new(dx, dy)));
        let dst = L::new(dst.into_inner().inset(1, 1));
        let empty = src.relevant_subset(&dst, TileMode::Decal).is_empty();
        assert_eq!(empty, src.intersect(&dst).is_none(), "offset ({dx}, {dy})");
    }
}

#[test]
fn size_rounding_uses_epsilon() {
    let s = L::new(Size::new(4.0005, 3.9995));
    assert_eq!(s.ceil().into_inner(), ISize::new(4, 4));
    assert_eq!(s.floor().into_inner(), ISize::new(4, 4));
    assert_eq!(
        L::new(Size::new(2.5, 2.4)).round().into_inner(),
        ISize::new(3, 2)
    );
}

#[test]
fn matrix_maps_sizes_as_axis_lengths() {
    let rot = L::new(Matrix::from_affine(kurbo::Affine::rotate(
        std::f64::consts::FRAC_PI_2,
    )));
    let s = rot.map_size(&L::new(Size::new(3.0, 5.0)));
    assert!((s.width() - 3.0).abs() < 1e-9);
    assert!((s.height() - 5.0).abs() < 1e-9);
    let flip = L::new(Matrix::scale(-2.0, 0.5));
    let s = flip.map_size(&L::new(Size::new(3.0, 4.0)));
    assert_eq!(s.into_inner(), Size::new(6.0, 2.0));
}

#[test]
fn isize_mapping_ceils_with_tolerance() {
    let m = Matrix::scale(1.0 / 3.0, 0.5);
    assert_eq!(ISize::new(9, 9).map_by(&m), ISize::new(3, 5));
}

#[test]
fn matrix_mapping_conjugates() {
    let to_dev = Matrix::scale(2.0, 2.0);
    let layer_shift = Matrix::translate(1.0, 1.0);
    let dev_shift = layer_shift.map_by(&to_dev);
    assert_eq!(dev_shift, Matrix::translate(2.0, 2.0));
}

#[test]
fn inverse_map_rect_of_empty_is_empty() {
    let singular = L::new(Matrix::scale(0.0, 1.0));
    assert!(
        singular
            .inverse_map_irect(&L::<IRect>::empty())
            .unwrap()
            .is_empty()
    );
    assert!(
        singular
            .inverse_map_rect(&L::new(Rect::new(0.0, 0.0, 1.0, 1.0)))
            .is_none()
    );
}
