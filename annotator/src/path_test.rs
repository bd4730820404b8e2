#![allow(clippy::float_cmp)]

use super::*;
use crate::fakes::{RecordingSink, Stroke};

fn browser_path(points: &[(f64, f64)]) -> DrawingPath {
    let mut path = DrawingPath::new();
    for &(x, y) in points {
        path.add_coordinate(Sample::at(x, y), Some(Point::new(x, y)));
    }
    path
}

// =============================================================
// add_coordinate
// =============================================================

#[test]
fn bounds_track_min_and_max() {
    let mut path = DrawingPath::new();
    path.add_coordinate(Sample::at(1.0, 2.0), None);
    path.add_coordinate(Sample::at(5.0, 6.0), None);
    let b = path.bounds();
    assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (1.0, 2.0, 5.0, 6.0));
}

#[test]
fn missing_component_is_ignored() {
    let mut path = DrawingPath::new();
    path.add_coordinate(Sample { x: None, y: Some(2.0) }, None);
    assert_eq!(path.len(), 0);
    assert!(path.is_empty());
    assert!(path.bounds().is_empty());
}

#[test]
fn non_finite_component_is_ignored() {
    let mut path = DrawingPath::new();
    path.add_coordinate(Sample::at(f64::NAN, 1.0), Some(Point::new(0.0, 0.0)));
    assert!(path.is_empty());
    assert!(path.browser_points().is_empty());
}

#[test]
fn browser_point_is_optional() {
    let mut path = DrawingPath::new();
    path.add_coordinate(Sample::at(1.0, 1.0), None);
    assert_eq!(path.len(), 1);
    assert!(path.browser_points().is_empty());
}

#[test]
fn missing_browser_point_drops_the_partial_browser_path() {
    let mut path = browser_path(&[(1.0, 1.0), (2.0, 2.0)]);
    path.add_coordinate(Sample::at(3.0, 3.0), None);
    assert_eq!(path.len(), 3);
    assert!(path.browser_points().is_empty());

    path.add_coordinate(Sample::at(4.0, 4.0), Some(Point::new(4.0, 4.0)));
    assert!(path.browser_points().is_empty(), "no browser path until regenerated");

    path.generate_browser_path(Some);
    assert_eq!(path.browser_points().len(), path.len());
}

// =============================================================
// generate_browser_path
// =============================================================

#[test]
fn generate_browser_path_maps_document_points() {
    let mut path = DrawingPath::new();
    path.add_coordinate(Sample::at(1.0, 2.0), None);
    path.add_coordinate(Sample::at(3.0, 4.0), None);
    path.generate_browser_path(|p| Some(Point::new(p.x * 10.0, p.y * 10.0)));
    assert_eq!(path.browser_points(), &[Point::new(10.0, 20.0), Point::new(30.0, 40.0)]);
    assert_eq!(path.points()[0], Point::new(1.0, 2.0));
}

#[test]
fn generate_browser_path_rejects_partial_mappings() {
    let mut path = browser_path(&[(1.0, 1.0), (2.0, 2.0)]);
    path.generate_browser_path(|p| (p.x > 1.5).then_some(p));
    assert!(path.browser_points().is_empty());
}

// =============================================================
// render
// =============================================================

#[test]
fn render_smooths_through_midpoints() {
    let path = browser_path(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)]);
    let mut sink = RecordingSink::default();
    path.render(&mut sink);
    assert_eq!(
        sink.ops,
        vec![
            Stroke::MoveTo(Point::new(0.0, 0.0)),
            Stroke::Curve(Point::new(10.0, 0.0), Point::new(10.0, 5.0)),
            Stroke::Curve(Point::new(10.0, 10.0), Point::new(15.0, 10.0)),
            Stroke::LineTo(Point::new(20.0, 10.0)),
        ]
    );
}

#[test]
fn render_two_points_is_a_line() {
    let path = browser_path(&[(0.0, 0.0), (4.0, 4.0)]);
    let mut sink = RecordingSink::default();
    path.render(&mut sink);
    assert_eq!(sink.ops, vec![Stroke::MoveTo(Point::new(0.0, 0.0)), Stroke::LineTo(Point::new(4.0, 4.0))]);
}

#[test]
fn render_single_tap_paints_a_dot() {
    let path = browser_path(&[(3.0, 3.0)]);
    let mut sink = RecordingSink::default();
    path.render(&mut sink);
    assert_eq!(sink.ops, vec![Stroke::MoveTo(Point::new(3.0, 3.0)), Stroke::LineTo(Point::new(3.0, 3.0))]);
}

#[test]
fn render_empty_path_is_silent() {
    let mut sink = RecordingSink::default();
    DrawingPath::new().render(&mut sink);
    assert!(sink.ops.is_empty());
}

// =============================================================
// BoundingBox / merge
// =============================================================

#[test]
fn merge_folds_bounds() {
    let a = browser_path(&[(0.0, 0.0), (2.0, 2.0)]);
    let b = browser_path(&[(-1.0, 5.0)]);
    let acc = DrawingPath::merge(&b, DrawingPath::merge(&a, BoundingBox::EMPTY));
    assert_eq!((acc.min_x, acc.min_y, acc.max_x, acc.max_y), (-1.0, 0.0, 2.0, 5.0));
}

#[test]
fn merging_an_empty_path_changes_nothing() {
    let a = browser_path(&[(1.0, 1.0)]);
    let acc = DrawingPath::merge(&DrawingPath::new(), a.bounds());
    assert_eq!(acc, a.bounds());
}

#[test]
fn expand_adds_slop_on_every_side() {
    let b = BoundingBox::EMPTY.include(Point::new(10.0, 10.0)).expand(5.0);
    assert!(b.contains(Point::new(5.0, 15.0)));
    assert!(!b.contains(Point::new(4.9, 10.0)));
    assert!(BoundingBox::EMPTY.expand(5.0).is_empty());
}

#[test]
fn record_conversion_recomputes_bounds() {
    let path = browser_path(&[(1.0, 2.0), (3.0, 4.0)]);
    let record = DrawingPathRecord::from(&path);
    let back = DrawingPath::from(&record);
    assert_eq!(back.points(), path.points());
    assert_eq!(back.bounds(), path.bounds());
    assert!(back.browser_points().is_empty());
}
