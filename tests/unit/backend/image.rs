use std::io::Cursor;

use super::*;

fn ramp(w: u32, h: u32) -> Pixmap {
    let mut data = Vec::new();
    for y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
        }
    }
    Pixmap::from_premul_rgba8(w, h, data, ColorSpace::Srgb).unwrap()
}

#[test]
fn pixmap_rejects_bad_buffers() {
    assert!(Pixmap::new(0, 4, ColorSpace::Srgb).is_err());
    let err = Pixmap::from_premul_rgba8(2, 2, vec![0; 15], ColorSpace::Srgb).unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
}

#[test]
fn decode_premultiplies() {
    let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50, 200, 128]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let pm = Pixmap::decode(&buf).unwrap();
    assert_eq!(
        pm.pixel(0, 0),
        [
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128
        ]
    );
    assert!(Pixmap::decode(b"not an image").is_err());
}

#[test]
fn subsets_are_relative_and_clipped() {
    let img = SpecialImage::from_pixmap(ramp(8, 8));
    assert!(img.is_exact_fit());

    let a = img.make_subset(IRect::from_ltrb(2, 3, 6, 7)).unwrap();
    assert_eq!(a.subset(), IRect::from_ltrb(2, 3, 6, 7));
    assert_eq!(a.pixel(0, 0), [2, 3, 0, 255]);
    assert!(!a.is_exact_fit());
    assert_eq!(a.backing_store_dimensions(), ISize::new(8, 8));

    let b = a.make_subset(IRect::from_ltrb(1, 1, 100, 100)).unwrap();
    assert_eq!(b.subset(), IRect::from_ltrb(3, 4, 6, 7));
    assert_eq!(b.pixel(0, 0), [3, 4, 0, 255]);
    assert_eq!(b.pixel(3, 0), [0; 4]);

    assert!(a.make_subset(IRect::from_ltrb(10, 10, 12, 12)).is_none());
}

#[test]
fn ptr_eq_tracks_storage_and_subset() {
    let img = SpecialImage::from_pixmap(ramp(4, 4));
    let same = img.make_subset(IRect::from_ltrb(0, 0, 4, 4)).unwrap();
    let smaller = img.make_subset(IRect::from_ltrb(0, 0, 2, 2)).unwrap();
    assert!(SpecialImage::ptr_eq(&img, &same));
    assert!(!SpecialImage::ptr_eq(&img, &smaller));
    let copy = SpecialImage::from_pixmap(ramp(4, 4));
    assert!(!SpecialImage::ptr_eq(&img, &copy));
}

#[test]
fn packed_copy_of_subset() {
    let img = SpecialImage::from_pixmap(ramp(4, 4));
    let sub = img.make_subset(IRect::from_ltrb(1, 2, 3, 3)).unwrap();
    assert_eq!(sub.to_premul_rgba8(), vec![1, 2, 0, 255, 2, 2, 0, 255]);
}

#[test]
fn srgb_linear_round_trip_is_stable() {
    let c = Color4f::from_straight(0.5, 0.25, 1.0, 0.5);
    let lin = ColorSpace::Srgb.convert(c, ColorSpace::LinearSrgb);
    assert!(lin.r < c.r);
    let back = ColorSpace::LinearSrgb.convert(lin, ColorSpace::Srgb);
    assert!(back.nearly_eq(c, 1e-5));
}

#[test]
fn picture_parses_viewport_as_cull_rect() {
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="12" height="7"></svg>"#;
    let pic = Picture::from_svg_data(svg).unwrap();
    assert_eq!(pic.cull_rect(), Rect::new(0.0, 0.0, 12.0, 7.0));
    assert!(Picture::from_svg_data(b"<svg").is_err());
}
