//! Highlight geometry: quad points from selection rectangles, and hit-testing.
//!
//! A quad point is four corners in document space. Vertex 1 is the
//! lower-left corner and the rest follow counter-clockwise (lower-right,
//! upper-right, upper-left). Quads of one highlight are stored in reading
//! order, left to right and top to bottom; the dialog anchor depends on that.

#[cfg(test)]
#[path = "quad_test.rs"]
mod quad_test;

use serde::{Deserialize, Serialize};

use crate::coords::{self, DimensionScale, Point, Rect};
use crate::error::GeometryError;

/// `[x1, y1, x2, y2, x3, y3, x4, y4]` in document units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuadPoint(pub [f64; 8]);

impl QuadPoint {
    /// The four vertices in stored order.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        let q = &self.0;
        [
            Point::new(q[0], q[1]),
            Point::new(q[2], q[3]),
            Point::new(q[4], q[5]),
            Point::new(q[6], q[7]),
        ]
    }

    fn from_slice(values: &[f64]) -> Result<Self, GeometryError> {
        <[f64; 8]>::try_from(values)
            .map(Self)
            .map_err(|_| GeometryError::OddCoordinates(values.len()))
    }
}

/// Quad for one selection rectangle.
///
/// `origin` is the client position of the page content's top-left corner;
/// subtracting it gives page-relative pixels, which are then converted to
/// document space.
///
/// # Errors
///
/// Fails when the page is not laid out (non-positive height or zoom).
pub fn quad_from_rect(rect: &Rect, origin: Point, page_height_px: f64, zoom: f64) -> Result<QuadPoint, GeometryError> {
    let left = rect.left - origin.x;
    let right = rect.right - origin.x;
    let top = rect.top - origin.y;
    let bottom = rect.bottom - origin.y;

    let screen = [left, bottom, right, bottom, right, top, left, top];
    let doc = coords::to_document(&screen, page_height_px, zoom)?;
    QuadPoint::from_slice(&doc)
}

/// Quads for every visually distinct run of a selection.
///
/// Zero-area rectangles (whitespace runs) are dropped, and the rest are
/// sorted top to bottom then left to right. An empty result is normal and
/// means no highlight can be created.
///
/// # Errors
///
/// Fails when the page is not laid out.
pub fn quads_from_rects(
    rects: &[Rect],
    origin: Point,
    page_height_px: f64,
    zoom: f64,
) -> Result<Vec<QuadPoint>, GeometryError> {
    let mut runs: Vec<&Rect> = rects
        .iter()
        .filter(|r| r.width() > 0.0 && r.height() > 0.0)
        .collect();
    runs.sort_by(|a, b| a.top.total_cmp(&b.top).then_with(|| a.left.total_cmp(&b.left)));

    runs.into_iter()
        .map(|r| quad_from_rect(r, origin, page_height_px, zoom))
        .collect()
}

/// Even-odd ray casting.
///
/// The vertical test is half-open (`yi <= y < yj`) and the crossing test is
/// strict, so a point on an edge shared by two abutting polygons lands in
/// exactly one of them.
#[must_use]
pub fn point_in_polygon(polygon: &[Point], x: f64, y: f64) -> bool {
    let mut inside = false;
    let Some(mut j) = polygon.len().checked_sub(1) else {
        return false;
    };
    for (i, pi) in polygon.iter().enumerate() {
        let pj = polygon[j];
        let spans = (pi.y <= y && y < pj.y) || (pj.y <= y && y < pi.y);
        if spans && x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Whether page-relative screen point `(x, y)` falls inside any quad.
///
/// `scale` maps geometry saved at other page dimensions onto the current
/// render. Stops at the first hit.
///
/// # Errors
///
/// Fails when the page is not laid out.
pub fn is_hit(
    quads: &[QuadPoint],
    scale: Option<DimensionScale>,
    page_height_px: f64,
    zoom: f64,
    x: f64,
    y: f64,
) -> Result<bool, GeometryError> {
    for quad in quads {
        let screen = screen_quad(quad, scale, page_height_px, zoom)?;
        if point_in_polygon(&screen.corners(), x, y) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Convert one quad to page-relative screen pixels.
///
/// # Errors
///
/// Fails when the page is not laid out.
pub fn screen_quad(
    quad: &QuadPoint,
    scale: Option<DimensionScale>,
    page_height_px: f64,
    zoom: f64,
) -> Result<QuadPoint, GeometryError> {
    let values = match scale {
        Some(s) => s.apply(&quad.0),
        None => quad.0.to_vec(),
    };
    let screen = coords::to_screen(&values, page_height_px, zoom)?;
    QuadPoint::from_slice(&screen)
}

/// `(max x, min y)` of the last quad: its visual bottom-right in document
/// space. Anchors the annotation dialog.
#[must_use]
pub fn lower_right_of_last_quad(quads: &[QuadPoint]) -> Option<Point> {
    let corners = quads.last()?.corners();
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    Some(Point::new(max_x, min_y))
}

