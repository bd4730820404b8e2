//! Freehand stroke capture and smoothed replay.

#[cfg(test)]
#[path = "path_test.rs"]
mod path_test;

use serde::{Deserialize, Serialize};

use crate::coords::Point;
use crate::host::StrokeSink;

/// Axis-aligned bounds in document units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Identity for [`BoundingBox::include`] and [`BoundingBox::union`].
    pub const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    #[must_use]
    pub fn include(self, p: Point) -> Self {
        Self {
            min_x: self.min_x.min(p.x),
            min_y: self.min_y.min(p.y),
            max_x: self.max_x.max(p.x),
            max_y: self.max_y.max(p.y),
        }
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grow every side by `by`. An empty box stays empty.
    #[must_use]
    pub fn expand(self, by: f64) -> Self {
        if self.is_empty() {
            return self;
        }
        Self {
            min_x: self.min_x - by,
            min_y: self.min_y - by,
            max_x: self.max_x + by,
            max_y: self.max_y + by,
        }
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A raw pointer sample. Either component may be missing while a drag is
/// starting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl Sample {
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y) }
    }

    fn point(self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point::new(x, y)),
            _ => None,
        }
    }
}

impl From<Point> for Sample {
    fn from(p: Point) -> Self {
        Self::at(p.x, p.y)
    }
}

/// One stroke: document coordinates are the source of truth, the browser
/// path is derived for rendering and regenerated after resize.
///
/// The browser path is either parallel to the document path or empty until
/// the next [`DrawingPath::generate_browser_path`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawingPath {
    path: Vec<Point>,
    browser_path: Vec<Point>,
    bounds: BoundingBox,
}

impl DrawingPath {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. Incomplete or non-finite samples are dropped.
    pub fn add_coordinate(&mut self, doc: Sample, browser: Option<Point>) {
        let Some(p) = doc.point() else {
            return;
        };
        let parallel = self.browser_path.len() == self.path.len();
        self.path.push(p);
        self.bounds = self.bounds.include(p);
        match browser {
            Some(b) if parallel => self.browser_path.push(b),
            _ => self.browser_path.clear(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.path.len()
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.path
    }

    #[must_use]
    pub fn browser_points(&self) -> &[Point] {
        &self.browser_path
    }

    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Rebuild the browser path by mapping every document point through
    /// `to_browser`. If the transform rejects any point the browser path is
    /// left empty.
    pub fn generate_browser_path<F>(&mut self, mut to_browser: F)
    where
        F: FnMut(Point) -> Option<Point>,
    {
        let mapped: Option<Vec<Point>> = self.path.iter().map(|p| to_browser(*p)).collect();
        self.browser_path = mapped.unwrap_or_default();
    }

    /// Replay the browser path as quadratic segments through successive
    /// midpoints. The caller owns `begin`/`finish` so several paths can share
    /// one stroke.
    pub fn render<S: StrokeSink + ?Sized>(&self, sink: &mut S) {
        let Some((first, rest)) = self.browser_path.split_first() else {
            return;
        };
        sink.move_to(*first);
        for pair in rest.windows(2) {
            sink.quadratic_curve_to(pair[0], pair[0].midpoint(pair[1]));
        }
        // a single tap ends on itself so round caps still paint a dot
        sink.line_to(rest.last().copied().unwrap_or(*first));
    }

    /// Fold this path's bounds into `acc`.
    #[must_use]
    pub fn merge(path: &DrawingPath, acc: BoundingBox) -> BoundingBox {
        acc.union(path.bounds)
    }
}

/// Persisted shape of one stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingPathRecord {
    pub path: Vec<Point>,
    pub bounds: BoundingBox,
}

impl From<&DrawingPath> for DrawingPathRecord {
    fn from(p: &DrawingPath) -> Self {
        Self { path: p.path.clone(), bounds: p.bounds }
    }
}

impl From<&DrawingPathRecord> for DrawingPath {
    fn from(record: &DrawingPathRecord) -> Self {
        let mut path = DrawingPath::new();
        for p in &record.path {
            path.add_coordinate(Sample::from(*p), None);
        }
        path
    }
}
