//! Persisted annotation records and their locations.
//!
//! These are the shapes exchanged with the persistence layer: the engine emits
//! [`AnnotationDraft`]s and receives [`Annotation`]s back. Geometry inside a
//! [`Location`] is always in document space.

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::Dimensions;
use crate::path::{BoundingBox, DrawingPathRecord};
use crate::quad::QuadPoint;

/// Unique identifier for a thread.
pub type ThreadId = Uuid;

/// Annotation flavor. Selects the thread implementation at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationType {
    /// Text highlight without comments.
    Highlight,
    /// Text highlight carrying at least one comment.
    HighlightComment,
    /// Comment pinned to a single point.
    Point,
    /// Freehand drawing.
    Draw,
}

impl AnnotationType {
    #[must_use]
    pub fn is_highlight(self) -> bool {
        matches!(self, Self::Highlight | Self::HighlightComment)
    }
}

/// Geometry of an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum LocationShape {
    Point { x: f64, y: f64 },
    Quads { quad_points: Vec<QuadPoint> },
    Drawing {
        paths: Vec<DrawingPathRecord>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bounds: Option<BoundingBox>,
    },
}

/// Where an annotation lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// 1-based page number.
    pub page: u32,
    /// Page size at 100% zoom when the annotation was created. Absent on
    /// legacy records, which are then drawn without rescaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(flatten)]
    pub shape: LocationShape,
}

impl Location {
    #[must_use]
    pub fn quads(page: u32, dimensions: Dimensions, quad_points: Vec<QuadPoint>) -> Self {
        Self { page, dimensions: Some(dimensions), shape: LocationShape::Quads { quad_points } }
    }

    #[must_use]
    pub fn point(page: u32, dimensions: Dimensions, x: f64, y: f64) -> Self {
        Self { page, dimensions: Some(dimensions), shape: LocationShape::Point { x, y } }
    }

    /// Quad points, empty for non-highlight shapes.
    #[must_use]
    pub fn quad_points(&self) -> &[QuadPoint] {
        match &self.shape {
            LocationShape::Quads { quad_points } => quad_points,
            _ => &[],
        }
    }
}

/// What the current user may do with an annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_edit: bool,
    pub can_delete: bool,
}

impl Permissions {
    /// Full rights, granted to optimistic local annotations.
    pub const OWNER: Self = Self { can_edit: true, can_delete: true };
}

/// A saved annotation as returned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Server id, or a temporary uuid while a create is in flight.
    pub id: String,
    /// Thread this annotation belongs to.
    pub thread_id: ThreadId,
    /// Human-facing thread number assigned by the server.
    #[serde(default)]
    pub thread_number: Option<String>,
    #[serde(rename = "type")]
    pub kind: AnnotationType,
    pub location: Location,
    /// Comment body. Empty on a plain highlight.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub permissions: Permissions,
}

/// Payload of a create request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDraft {
    pub thread_id: ThreadId,
    pub thread_number: Option<String>,
    #[serde(rename = "type")]
    pub kind: AnnotationType,
    pub location: Location,
    pub text: String,
    pub user: String,
}

impl AnnotationDraft {
    /// Local stand-in for this draft until the server answers.
    #[must_use]
    pub fn to_temporary(&self, id: String) -> Annotation {
        Annotation {
            id,
            thread_id: self.thread_id,
            thread_number: self.thread_number.clone(),
            kind: self.kind,
            location: self.location.clone(),
            text: self.text.clone(),
            user: self.user.clone(),
            permissions: Permissions::OWNER,
        }
    }
}

/// A highlight with exactly one comment-less annotation.
#[must_use]
pub fn is_plain_highlight(annotations: &[Annotation]) -> bool {
    matches!(annotations, [only] if only.text.is_empty())
}
