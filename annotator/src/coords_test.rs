#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-3;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn all_approx_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| approx_eq(*x, *y))
}

fn view(zoom: f64) -> PageView {
    PageView {
        page: 1,
        rect: PageRect { left: 20.0, top: 10.0, width: 600.0, height: 830.0 },
        zoom,
        padding_top: 15.0,
        padding_bottom: 15.0,
    }
}

// =============================================================
// Point / Rect
// =============================================================

#[test]
fn point_midpoint() {
    let m = Point::new(0.0, 0.0).midpoint(Point::new(4.0, -2.0));
    assert_eq!(m, Point::new(2.0, -1.0));
}

#[test]
fn rect_width_height() {
    let r = Rect::new(100.0, 50.0, 140.0, 65.0);
    assert_eq!(r.width(), 40.0);
    assert_eq!(r.height(), 15.0);
}

#[test]
fn rect_contains_is_inclusive() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(r.contains(Point::new(10.0, 0.0)));
    assert!(!r.contains(Point::new(10.1, 5.0)));
}

// =============================================================
// to_screen
// =============================================================

#[test]
fn to_screen_point_scales_and_flips() {
    let out = to_screen(&[75.0, 75.0], 800.0, 1.0).unwrap();
    assert!(all_approx_eq(&out, &[100.0, 700.0]));
}

#[test]
fn to_screen_applies_zoom() {
    let out = to_screen(&[75.0, 0.0], 800.0, 2.0).unwrap();
    assert!(all_approx_eq(&out, &[200.0, 800.0]));
}

#[test]
fn to_screen_quad_flips_every_y() {
    let quad = [0.0, 0.0, 3.0, 0.0, 3.0, 3.0, 0.0, 3.0];
    let out = to_screen(&quad, 100.0, 1.0).unwrap();
    assert!(all_approx_eq(&out, &[0.0, 100.0, 4.0, 100.0, 4.0, 96.0, 0.0, 96.0]));
}

#[test]
fn to_screen_rejects_zero_zoom() {
    assert_eq!(to_screen(&[1.0, 1.0], 800.0, 0.0), Err(GeometryError::InvalidZoom(0.0)));
}

#[test]
fn to_screen_rejects_zero_page_height() {
    assert_eq!(to_screen(&[1.0, 1.0], 0.0, 1.0), Err(GeometryError::InvalidPageHeight(0.0)));
}

#[test]
fn to_screen_rejects_nan_zoom() {
    assert!(matches!(to_screen(&[1.0, 1.0], 800.0, f64::NAN), Err(GeometryError::InvalidZoom(_))));
}

#[test]
fn to_screen_rejects_odd_length() {
    assert_eq!(to_screen(&[1.0, 2.0, 3.0], 800.0, 1.0), Err(GeometryError::OddCoordinates(3)));
}

// =============================================================
// to_document
// =============================================================

#[test]
fn to_document_inverts_point() {
    let out = to_document(&[100.0, 700.0], 800.0, 1.0).unwrap();
    assert!(all_approx_eq(&out, &[75.0, 75.0]));
}

#[test]
fn to_document_rounds_to_four_places() {
    let out = to_document(&[1.0, 799.0], 800.0, 3.0).unwrap();
    assert_eq!(out, vec![0.25, 0.25]);
    let out = to_document(&[1.0, 799.0], 800.0, 7.0).unwrap();
    assert_eq!(out, vec![0.1071, 0.1071]);
}

#[test]
fn to_document_rejects_negative_zoom() {
    assert!(to_document(&[1.0, 1.0], 800.0, -1.0).is_err());
}

#[test]
fn round_trip_holds_across_zooms() {
    let samples: [&[f64]; 3] = [
        &[12.5, 400.25],
        &[0.0, 0.0, 612.0, 0.0, 612.0, 792.0, 0.0, 792.0],
        &[33.3333, 17.1717, 1.0, 2.0],
    ];
    for zoom in [0.25, 0.5, 1.0, 1.37, 4.0] {
        for coords in samples {
            let screen = to_screen(coords, 1056.0, zoom).unwrap();
            let back = to_document(&screen, 1056.0, zoom).unwrap();
            assert!(all_approx_eq(coords, &back), "zoom {zoom}: {coords:?} -> {back:?}");
        }
    }
}

// =============================================================
// scale_for_resize
// =============================================================

#[test]
fn scale_for_resize_none_when_unchanged() {
    let saved = Dimensions { x: 600.0, y: 800.0 };
    let rect = PageRect { left: 0.0, top: 0.0, width: 600.0, height: 830.0 };
    assert_eq!(scale_for_resize(saved, rect, 1.0, 30.0), Ok(None));
}

#[test]
fn scale_for_resize_ignores_sub_unit_drift() {
    let saved = Dimensions { x: 600.0, y: 800.0 };
    let rect = PageRect { left: 0.0, top: 0.0, width: 600.6, height: 830.9 };
    assert_eq!(scale_for_resize(saved, rect, 1.0, 30.0), Ok(None));
}

#[test]
fn scale_for_resize_accounts_for_zoom() {
    let saved = Dimensions { x: 600.0, y: 800.0 };
    let rect = PageRect { left: 0.0, top: 0.0, width: 1200.0, height: 1630.0 };
    assert_eq!(scale_for_resize(saved, rect, 2.0, 30.0), Ok(None));
}

#[test]
fn scale_for_resize_returns_per_axis_multiplier() {
    let saved = Dimensions { x: 600.0, y: 800.0 };
    let rect = PageRect { left: 0.0, top: 0.0, width: 300.0, height: 430.0 };
    let scale = scale_for_resize(saved, rect, 1.0, 30.0).unwrap().unwrap();
    assert!(approx_eq(scale.x, 0.5));
    assert!(approx_eq(scale.y, 0.5));
}

#[test]
fn scale_for_resize_detects_height_only_change() {
    let saved = Dimensions { x: 600.0, y: 800.0 };
    let rect = PageRect { left: 0.0, top: 0.0, width: 600.0, height: 430.0 };
    let scale = scale_for_resize(saved, rect, 1.0, 30.0).unwrap().unwrap();
    assert!(approx_eq(scale.x, 1.0));
    assert!(approx_eq(scale.y, 0.5));
}

#[test]
fn scale_for_resize_rejects_zero_dimensions() {
    let saved = Dimensions { x: 0.0, y: 800.0 };
    let rect = PageRect { left: 0.0, top: 0.0, width: 600.0, height: 830.0 };
    assert!(matches!(
        scale_for_resize(saved, rect, 1.0, 30.0),
        Err(GeometryError::InvalidDimensions { .. })
    ));
}

#[test]
fn scale_for_resize_rejects_non_finite_dimensions() {
    let rect = PageRect { left: 0.0, top: 0.0, width: 600.0, height: 830.0 };
    for saved in [Dimensions { x: f64::NAN, y: 800.0 }, Dimensions { x: 600.0, y: f64::INFINITY }] {
        assert!(!saved.is_valid());
        assert!(matches!(
            scale_for_resize(saved, rect, 1.0, 30.0),
            Err(GeometryError::InvalidDimensions { .. })
        ));
    }
}

#[test]
fn dimension_scale_apply_alternates_axes() {
    let scale = DimensionScale { x: 2.0, y: 0.5 };
    assert_eq!(scale.apply(&[1.0, 4.0, 3.0, 8.0]), vec![2.0, 2.0, 6.0, 4.0]);
}

// =============================================================
// PageView
// =============================================================

#[test]
fn page_view_strips_padding() {
    let v = view(1.0);
    assert_eq!(v.page_height(), 800.0);
    assert_eq!(v.origin(), Point::new(20.0, 25.0));
}

#[test]
fn page_view_dimensions_are_zoom_independent() {
    let dims = view(2.0).dimensions();
    assert_eq!(dims, Dimensions { x: 300.0, y: 400.0 });
}

#[test]
fn page_view_client_round_trip() {
    let v = view(1.5);
    let client = Point::new(220.0, 325.0);
    let doc = v.document_from_client(client).unwrap();
    let back = v.browser_from_document(doc, None).unwrap();
    let local = v.to_page(client);
    assert!(approx_eq(back.x, local.x));
    assert!(approx_eq(back.y, local.y));
}

#[test]
fn page_view_rescales_saved_geometry() {
    let v = view(1.0);
    let saved = Dimensions { x: 1200.0, y: 1600.0 };
    let p = v.browser_from_document(Point::new(150.0, 0.0), Some(saved)).unwrap();
    assert!(approx_eq(p.x, 100.0));
    assert!(approx_eq(p.y, 800.0));
}

#[test]
fn page_view_zero_height_fails_fast() {
    let mut v = view(1.0);
    v.rect.height = 30.0;
    assert!(v.document_from_client(Point::new(1.0, 1.0)).is_err());
}

#[test]
fn document_mapper_matches_single_point_conversion() {
    let v = view(1.25);
    let saved = Some(Dimensions { x: 500.0, y: 700.0 });
    let map = v.document_mapper(saved).unwrap();
    let doc = Point::new(40.0, 90.0);
    let expected = v.browser_from_document(doc, saved).unwrap();
    let got = map(doc);
    assert!(approx_eq(got.x, expected.x));
    assert!(approx_eq(got.y, expected.y));
}

#[test]
fn document_mapper_rejects_unlaid_page() {
    let mut v = view(0.0);
    assert!(v.document_mapper(None).is_err());
    v.zoom = 1.0;
    v.rect.height = 0.0;
    assert!(v.document_mapper(None).is_err());
}
