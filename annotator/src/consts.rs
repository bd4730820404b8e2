//! Shared numeric constants for the annotator crate.

// ── Units ───────────────────────────────────────────────────────

/// Document units (1/72") to CSS pixels at 100% zoom.
pub const DOC_UNIT_TO_CSS_PX: f64 = 4.0 / 3.0;

/// Inverse of [`DOC_UNIT_TO_CSS_PX`].
pub const CSS_PX_TO_DOC_UNIT: f64 = 3.0 / 4.0;

/// Rounding factor for document-space output (four decimal places).
pub const DOC_PRECISION: f64 = 10_000.0;

/// Saved and current dimensions within this many document units are treated as equal.
pub const RESIZE_TOLERANCE: f64 = 1.0;

// ── Page layout ─────────────────────────────────────────────────

/// Padding above each rendered page, in CSS pixels.
pub const PAGE_PADDING_TOP_PX: f64 = 15.0;

/// Padding below each rendered page, in CSS pixels.
pub const PAGE_PADDING_BOTTOM_PX: f64 = 15.0;

// ── Pointer timing ──────────────────────────────────────────────

/// Minimum interval between two processed pointer-move events.
pub const MOUSEMOVE_THROTTLE_MS: f64 = 50.0;

/// Delay before a hovered highlight falls back to inactive.
pub const HOVER_TIMEOUT_MS: f64 = 75.0;

/// Delay before the hover cursor override is removed.
pub const CURSOR_RESTORE_MS: f64 = 75.0;

/// Displacement (per axis) after which a press becomes a selection drag.
pub const DRAG_THRESHOLD_PX: f64 = 5.0;

// ── Drawing ─────────────────────────────────────────────────────

/// 60 FPS target.
pub const DRAW_RENDER_THRESHOLD_MS: f64 = 16.67;

/// Stroke width at 100% zoom.
pub const BASE_LINE_WIDTH_PX: f64 = 3.0;

/// Slop around a drawing's bounds when selecting it, in document units.
pub const DRAW_BORDER_OFFSET: f64 = 5.0;

// ── Point annotations ───────────────────────────────────────────

/// Hit radius around a point annotation marker, in CSS pixels.
pub const POINT_MARKER_RADIUS_PX: f64 = 16.0;
