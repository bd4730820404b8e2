//! Error types shared across the annotator crate.

use crate::model::AnnotationType;

/// Precondition failures in the coordinate and quad geometry.
///
/// Raised when the page has not laid out yet (zero height, zero zoom) so the
/// caller can skip the frame instead of drawing at `NaN`/`Infinity`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("zoom scale must be positive and finite, got {0}")]
    InvalidZoom(f64),
    #[error("page height must be positive and finite, got {0}")]
    InvalidPageHeight(f64),
    #[error("saved dimensions must be positive, got {x}x{y}")]
    InvalidDimensions { x: f64, y: f64 },
    #[error("coordinate list must hold x/y pairs, got {0} values")]
    OddCoordinates(usize),
    #[error("page {0} is not laid out")]
    PageNotLaidOut(u32),
}

/// Rejected thread operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThreadError {
    #[error("unknown annotation {0}")]
    UnknownAnnotation(String),
    #[error("no permission to delete annotation {0}")]
    PermissionDenied(String),
    #[error("annotation {0} already has a request in flight")]
    RequestInFlight(String),
    #[error("location does not fit a {0:?} thread")]
    ShapeMismatch(AnnotationType),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Failures reported back by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("service rejected the request: {reason}")]
    Rejected { reason: String },
    #[error("service unavailable")]
    Unavailable,
}
