//! Conversions between document space and on-screen pixel space.
//!
//! Document space is the file's intrinsic coordinate system: units of 1/72",
//! origin at the bottom-left of the page, independent of zoom. Screen space is
//! CSS pixels relative to the top-left of the rendered page, and depends on the
//! current zoom scale.
//!
//! Coordinate lists are flat `[x, y, x, y, ...]` slices so that a single
//! point (2 values) and a quad point (8 values) go through the same path.

#[cfg(test)]
#[path = "coords_test.rs"]
mod coords_test;

use serde::{Deserialize, Serialize};

use crate::consts::{CSS_PX_TO_DOC_UNIT, DOC_PRECISION, DOC_UNIT_TO_CSS_PX, RESIZE_TOLERANCE};
use crate::error::GeometryError;

/// A point in either screen or document space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new(self.x + (other.x - self.x) / 2.0, self.y + (other.y - self.y) / 2.0)
    }
}

/// A client rectangle as reported by the host DOM, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

/// Bounding client rectangle of a rendered page, padding included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Page size at 100% zoom in document units, captured when an annotation is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub x: f64,
    pub y: f64,
}

impl Dimensions {
    /// Both axes positive and finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.x > 0.0 && self.y.is_finite() && self.y > 0.0
    }
}

/// Per-axis multiplier reconciling saved dimensions with the current render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionScale {
    pub x: f64,
    pub y: f64,
}

impl DimensionScale {
    /// Scale a flat coordinate list: even indices by `x`, odd indices by `y`.
    #[must_use]
    pub fn apply(&self, coords: &[f64]) -> Vec<f64> {
        coords
            .iter()
            .enumerate()
            .map(|(i, v)| if i % 2 == 0 { v * self.x } else { v * self.y })
            .collect()
    }
}

fn check_transform(coords: &[f64], page_height_px: f64, zoom: f64) -> Result<(), GeometryError> {
    if !zoom.is_finite() || zoom <= 0.0 {
        return Err(GeometryError::InvalidZoom(zoom));
    }
    if !page_height_px.is_finite() || page_height_px <= 0.0 {
        return Err(GeometryError::InvalidPageHeight(page_height_px));
    }
    if coords.len() % 2 != 0 {
        return Err(GeometryError::OddCoordinates(coords.len()));
    }
    Ok(())
}

/// Convert document-space coordinates into screen pixels relative to the page.
///
/// Each value is scaled by 4/3 and by `zoom`, then every Y is flipped against
/// `page_height_px` since the document origin is bottom-left.
///
/// # Errors
///
/// Fails when `zoom` or `page_height_px` is not positive and finite, or when
/// `coords` does not hold whole x/y pairs.
pub fn to_screen(coords: &[f64], page_height_px: f64, zoom: f64) -> Result<Vec<f64>, GeometryError> {
    check_transform(coords, page_height_px, zoom)?;
    Ok(coords
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let scaled = v * DOC_UNIT_TO_CSS_PX * zoom;
            if i % 2 == 0 { scaled } else { page_height_px - scaled }
        })
        .collect())
}

/// Inverse of [`to_screen`], rounded to four decimal places so persisted
/// values stay stable across save and reload.
///
/// # Errors
///
/// Same preconditions as [`to_screen`].
pub fn to_document(coords: &[f64], page_height_px: f64, zoom: f64) -> Result<Vec<f64>, GeometryError> {
    check_transform(coords, page_height_px, zoom)?;
    Ok(coords
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let flipped = if i % 2 == 0 { *v } else { page_height_px - v };
            round_doc(flipped * CSS_PX_TO_DOC_UNIT / zoom)
        })
        .collect())
}

fn round_doc(v: f64) -> f64 {
    (v * DOC_PRECISION).round() / DOC_PRECISION
}

/// Compare the dimensions saved with an annotation against the page's current
/// render and return the multiplier needed to map saved geometry onto it.
///
/// Returns `Ok(None)` when both axes agree within one document unit.
///
/// # Errors
///
/// Fails on an invalid zoom or when the saved dimensions are not positive and
/// finite.
pub fn scale_for_resize(
    saved: Dimensions,
    current: PageRect,
    zoom: f64,
    vertical_padding_px: f64,
) -> Result<Option<DimensionScale>, GeometryError> {
    if !zoom.is_finite() || zoom <= 0.0 {
        return Err(GeometryError::InvalidZoom(zoom));
    }
    if !saved.is_valid() {
        return Err(GeometryError::InvalidDimensions { x: saved.x, y: saved.y });
    }

    let width = current.width / zoom;
    let height = (current.height - vertical_padding_px) / zoom;

    if (width - saved.x).abs() > RESIZE_TOLERANCE || (height - saved.y).abs() > RESIZE_TOLERANCE {
        Ok(Some(DimensionScale { x: width / saved.x, y: height / saved.y }))
    } else {
        Ok(None)
    }
}

/// Snapshot of one page's geometry, taken once per dispatch so every thread
/// evaluated in the same tick sees the same numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageView {
    pub page: u32,
    pub rect: PageRect,
    pub zoom: f64,
    pub padding_top: f64,
    pub padding_bottom: f64,
}

impl PageView {
    /// Rendered page height without padding.
    #[must_use]
    pub fn page_height(&self) -> f64 {
        self.rect.height - self.padding_top - self.padding_bottom
    }

    /// Client-space origin of the page content.
    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.rect.left, self.rect.top + self.padding_top)
    }

    /// Page size at 100% zoom, stored with new annotations.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions { x: self.rect.width / self.zoom, y: self.page_height() / self.zoom }
    }

    /// Client point to page-relative screen point.
    #[must_use]
    pub fn to_page(&self, client: Point) -> Point {
        let origin = self.origin();
        Point::new(client.x - origin.x, client.y - origin.y)
    }

    /// Resize multiplier for geometry saved with `saved` dimensions.
    ///
    /// # Errors
    ///
    /// See [`scale_for_resize`].
    pub fn resize_scale(&self, saved: Option<Dimensions>) -> Result<Option<DimensionScale>, GeometryError> {
        match saved {
            Some(dims) => scale_for_resize(dims, self.rect, self.zoom, self.padding_top + self.padding_bottom),
            None => Ok(None),
        }
    }

    /// Map a document-space point saved with `saved` dimensions to a
    /// page-relative screen point.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn browser_from_document(&self, doc: Point, saved: Option<Dimensions>) -> Result<Point, GeometryError> {
        let mut coords = vec![doc.x, doc.y];
        if let Some(scale) = self.resize_scale(saved)? {
            coords = scale.apply(&coords);
        }
        let screen = to_screen(&coords, self.page_height(), self.zoom)?;
        Ok(Point::new(screen[0], screen[1]))
    }

    /// Validate the page once and hand back an infallible document-to-screen
    /// mapping, for converting whole paths.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn document_mapper(&self, saved: Option<Dimensions>) -> Result<impl Fn(Point) -> Point + use<>, GeometryError> {
        let scale = self.resize_scale(saved)?;
        let (height, zoom) = (self.page_height(), self.zoom);
        check_transform(&[], height, zoom)?;
        Ok(move |p: Point| {
            let (x, y) = match scale {
                Some(s) => (p.x * s.x, p.y * s.y),
                None => (p.x, p.y),
            };
            Point::new(x * DOC_UNIT_TO_CSS_PX * zoom, height - y * DOC_UNIT_TO_CSS_PX * zoom)
        })
    }

    /// Map a client point to document space.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn document_from_client(&self, client: Point) -> Result<Point, GeometryError> {
        let local = self.to_page(client);
        let doc = to_document(&[local.x, local.y], self.page_height(), self.zoom)?;
        Ok(Point::new(doc[0], doc[1]))
    }
}
