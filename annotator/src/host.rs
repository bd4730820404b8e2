//! Seams between the engine and its host.
//!
//! The engine never reaches for globals. Page geometry, the text selection,
//! frame scheduling and pointer delivery come in through the traits below,
//! and everything visible goes out as [`Action`]s for the host to apply.

#[cfg(test)]
#[path = "host_test.rs"]
mod host_test;

use serde::{Deserialize, Serialize};

use crate::coords::{PageRect, Point, Rect};
use crate::error::ServiceError;
use crate::model::{AnnotationDraft, AnnotationType, ThreadId};
use crate::path::DrawingPath;
use crate::quad::QuadPoint;

// =============================================================
// Consumed interfaces
// =============================================================

/// Rendered page geometry. Queried fresh on every dispatch since zoom and
/// layout may change between frames.
pub trait PageSource {
    /// Bounding client rectangle of `page`, padding included. `None` when
    /// the page is not rendered.
    fn page_rect(&self, page: u32) -> Option<PageRect>;
    /// Uniform zoom scale, 1.0 being 100%.
    fn zoom_scale(&self) -> f64;
}

/// Adapter over the host's text selection and highlighter.
pub trait SelectionSource {
    fn has_selection(&self) -> bool;
    /// Client rectangles of each visually distinct run of the live
    /// selection on `page`.
    fn selection_rects(&mut self, page: u32) -> Vec<Rect>;
    fn clear(&mut self);
}

/// Opaque handle to a requested tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickHandle(pub i64);

/// Frame scheduling. The browser implementation wraps
/// `requestAnimationFrame`; tests and the replay harness use
/// [`FixedRateScheduler`].
pub trait Scheduler {
    /// Ask for one tick. `None` when the host cannot schedule.
    fn request_tick(&mut self) -> Option<TickHandle>;
    fn cancel_tick(&mut self, handle: TickHandle);
}

/// Delivers raw pointer events to the engine while attached.
pub trait PointerSource {
    fn attach(&mut self);
    fn detach(&mut self);
}

/// Scheduler driven by an external clock at a fixed interval.
///
/// At most one tick is outstanding: requesting while one is pending returns
/// the same handle.
#[derive(Debug, Clone)]
pub struct FixedRateScheduler {
    interval_ms: f64,
    next_id: i64,
    pending: Option<TickHandle>,
    requests: u64,
}

impl FixedRateScheduler {
    #[must_use]
    pub fn new(interval_ms: f64) -> Self {
        Self { interval_ms, next_id: 1, pending: None, requests: 0 }
    }

    #[must_use]
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    #[must_use]
    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }

    /// Number of distinct ticks handed out.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Consume the outstanding tick, if any. The caller then runs one frame.
    pub fn fire(&mut self) -> Option<TickHandle> {
        self.pending.take()
    }
}

impl Scheduler for FixedRateScheduler {
    fn request_tick(&mut self) -> Option<TickHandle> {
        if let Some(handle) = self.pending {
            return Some(handle);
        }
        let handle = TickHandle(self.next_id);
        self.next_id += 1;
        self.requests += 1;
        self.pending = Some(handle);
        Some(handle)
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

// =============================================================
// Painting
// =============================================================

/// Highlight fill, in the order a thread cycles through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightFill {
    Normal,
    Active,
    /// Cut the quad out without refilling it.
    Erase,
}

impl HighlightFill {
    #[must_use]
    pub fn css(self) -> &'static str {
        match self {
            Self::Normal => "rgba(255, 233, 23, 0.35)",
            Self::Active => "rgba(255, 233, 23, 0.5)",
            Self::Erase => "rgba(255, 255, 255, 1)",
        }
    }
}

/// Paints highlight quads given in page-relative screen pixels.
pub trait HighlightPainter {
    /// Clear the quad's area on the layer.
    fn erase_quad(&mut self, quad: &[f64; 8]);
    fn fill_quad(&mut self, quad: &[f64; 8], fill: HighlightFill);
}

/// Cut each quad out, then refill it unless erasing. Cutting first keeps
/// overlapping translucent highlights from stacking.
pub fn paint_quads<P: HighlightPainter + ?Sized>(painter: &mut P, quads: &[QuadPoint], fill: HighlightFill) {
    for quad in quads {
        painter.erase_quad(&quad.0);
        if fill != HighlightFill::Erase {
            painter.fill_quad(&quad.0, fill);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub line_width: f64,
}

/// Receives smoothed stroke geometry in page-relative screen pixels.
pub trait StrokeSink {
    fn set_style(&mut self, style: StrokeStyle);
    fn begin(&mut self);
    fn move_to(&mut self, p: Point);
    fn quadratic_curve_to(&mut self, control: Point, end: Point);
    fn line_to(&mut self, p: Point);
    /// Stroke everything since [`StrokeSink::begin`].
    fn finish(&mut self);
}

/// Replay `paths` as one stroke.
pub fn stroke_paths<S: StrokeSink + ?Sized>(sink: &mut S, style: StrokeStyle, paths: &[DrawingPath]) {
    sink.set_style(style);
    sink.begin();
    for path in paths {
        path.render(sink);
    }
    sink.finish();
}

// =============================================================
// Events in
// =============================================================

/// A pointer event as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Client-space position in CSS pixels.
    pub client: Point,
    /// Page under the event target, if any.
    #[serde(default)]
    pub page: Option<u32>,
    /// Thread whose dialog contains the event target, if any.
    #[serde(default)]
    pub dialog: Option<ThreadId>,
    #[serde(default)]
    pub dblclick: bool,
}

impl PointerEvent {
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self { client: Point::new(x, y), page: None, dialog: None, dblclick: false }
    }

    #[must_use]
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn in_dialog(mut self, thread: ThreadId) -> Self {
        self.dialog = Some(thread);
        self
    }

    #[must_use]
    pub fn double(mut self) -> Self {
        self.dblclick = true;
        self
    }
}

/// Events raised by a thread's dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DialogEvent {
    /// The user confirmed a pending highlight.
    Draw,
    /// The user opened the comment box.
    Comment,
    CommentPost { text: String },
    Cancel,
    /// Delete one annotation, or the first when `annotation_id` is absent.
    Delete {
        #[serde(default)]
        annotation_id: Option<String>,
    },
}

// =============================================================
// Actions out
// =============================================================

/// Canvas layer an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Highlight,
    Drawing,
    DrawingInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    /// Arrow cursor while over a highlight.
    Default,
    /// Back to the text cursor.
    Text,
}

/// Persistence request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Intent {
    Create { thread: ThreadId, temp_id: String, draft: AnnotationDraft },
    Delete { thread: ThreadId, annotation_id: String },
}

/// User-visible failure of a persistence request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum Failure {
    CreateFailed { thread: ThreadId, reason: String },
    DeleteFailed { thread: ThreadId, annotation_id: String, reason: String },
}

impl Failure {
    #[must_use]
    pub fn create(thread: ThreadId, err: &ServiceError) -> Self {
        Self::CreateFailed { thread, reason: err.to_string() }
    }

    #[must_use]
    pub fn delete(thread: ThreadId, annotation_id: String, err: &ServiceError) -> Self {
        Self::DeleteFailed { thread, annotation_id, reason: err.to_string() }
    }
}

/// Side effects requested by the engine, applied by the host in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Show (or move) a thread's dialog. `anchor` is page-relative screen px.
    ShowDialog { thread: ThreadId, page: u32, anchor: Point },
    HideDialog { thread: ThreadId },
    /// Quads are in page-relative screen pixels.
    PaintHighlight { thread: ThreadId, page: u32, quads: Vec<QuadPoint>, fill: HighlightFill },
    /// Place a point-annotation marker.
    PlaceMarker { thread: ThreadId, page: u32, at: Point },
    RemoveMarker { thread: ThreadId },
    ClearLayer { page: u32, layer: Layer },
    /// Replay these paths' browser coordinates onto `layer`.
    RenderDrawing { thread: ThreadId, page: u32, layer: Layer, style: StrokeStyle, paths: Vec<DrawingPath> },
    /// Outline a selected drawing: `[x, y, width, height]` in screen px.
    DrawBoundary { thread: ThreadId, page: u32, rect: [f64; 4] },
    SetCursor(Cursor),
    ClearSelection,
    Persist(Intent),
    Failure(Failure),
    ThreadCreated { thread: ThreadId, page: u32, kind: AnnotationType },
    ThreadDestroyed { thread: ThreadId, page: u32 },
    /// Undo/redo depth of a drawing thread.
    AvailableActions { thread: ThreadId, undo: usize, redo: usize },
}
