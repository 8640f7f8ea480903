use super::*;

#[test]
fn intersect_and_contains() {
    let a = IRect::from_ltrb(0, 0, 10, 10);
    let b = IRect::from_ltrb(5, -5, 15, 5);
    assert_eq!(a.intersect(&b), Some(IRect::from_ltrb(5, 0, 10, 5)));
    assert_eq!(a.intersect(&IRect::from_ltrb(10, 0, 20, 10)), None);
    assert!(a.contains(&IRect::from_ltrb(2, 2, 8, 8)));
    assert!(!a.contains(&IRect::EMPTY));
    assert!(!IRect::EMPTY.contains(&IRect::EMPTY));
}

#[test]
fn join_ignores_empty() {
    let a = IRect::from_ltrb(0, 0, 2, 2);
    assert_eq!(a.join(&IRect::EMPTY), a);
    assert_eq!(IRect::EMPTY.join(&a), a);
    assert_eq!(
        a.join(&IRect::from_ltrb(5, 5, 6, 6)),
        IRect::from_ltrb(0, 0, 6, 6)
    );
}

#[test]
fn closest_disjoint_edge_picks_facing_strip() {
    let src = IRect::from_ltrb(0, 0, 10, 10);
    // dst entirely to the right: last column, overlapping rows
    let right = IRect::from_ltrb(20, 2, 30, 5);
    assert_eq!(
        IRect::closest_disjoint_edge(&src, &right),
        IRect::from_ltrb(9, 2, 10, 5)
    );
    // dst below-left: bottom-left corner pixel
    let below_left = IRect::from_ltrb(-10, 20, -5, 25);
    assert_eq!(
        IRect::closest_disjoint_edge(&src, &below_left),
        IRect::from_ltrb(0, 9, 1, 10)
    );
    assert!(IRect::closest_disjoint_edge(&src, &IRect::EMPTY).is_empty());
}

#[test]
fn rounding_uses_epsilon() {
    let r = Rect::new(1.0005, 2.9995, 9.0004, 10.0);
    assert_eq!(IRect::round_out(&r), IRect::from_ltrb(1, 3, 9, 10));
    assert_eq!(IRect::round_out_exact(&r), IRect::from_ltrb(1, 2, 10, 10));
    let r = Rect::new(0.9995, 2.0, 8.9995, 10.2);
    assert_eq!(IRect::round_in(&r), IRect::from_ltrb(1, 2, 9, 10));
    assert_eq!(
        IRect::round(&Rect::new(0.4, 0.6, 2.5, 3.49)),
        IRect::from_ltrb(0, 1, 3, 3)
    );
}

#[test]
fn outset_and_offset_saturate() {
    let r = IRect::from_ltrb(i32::MIN + 1, 0, i32::MAX - 1, 1);
    let o = r.outset(5, 0);
    assert_eq!(o.left, i32::MIN);
    assert_eq!(o.right, i32::MAX);
    assert_eq!(
        IRect::from_ltrb(0, 0, 2, 2).offset(3, -1),
        IRect::from_ltrb(3, -1, 5, 1)
    );
    assert_eq!(r.width64(), i64::from(i32::MAX) - 1 - (i64::from(i32::MIN) + 1));
}
