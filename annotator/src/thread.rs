//! Annotation threads: the live, stateful side of an annotation while its
//! page is visible.
//!
//! Threads never schedule anything themselves. Every entry point returns the
//! [`Action`]s it wants applied, and pointer moves return a [`MoveOutcome`]
//! so the engine owns all timers.
//!
//! | Thread | Location | Hit area |
//! |--------|----------|----------|
//! | [`HighlightThread`] | quad points | quads or its dialog |
//! | [`PointThread`] | single point | marker radius or its dialog |
//! | [`DrawingThread`](crate::drawing::DrawingThread) | stroke paths | slop-expanded bounds |

#[cfg(test)]
#[path = "thread_test.rs"]
mod thread_test;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::coords::{PageView, Point};
use crate::drawing::DrawingThread;
use crate::error::{GeometryError, ServiceError, ThreadError};
use crate::host::{Action, DialogEvent, Failure, HighlightFill, Intent, PointerEvent};
use crate::model::{Annotation, AnnotationDraft, AnnotationType, Location, LocationShape, ThreadId, is_plain_highlight};
use crate::quad::{self, QuadPoint};

/// Lifecycle of a thread. Destruction is not a state: the thread leaves the
/// registry instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Created by the user, nothing saved yet.
    Pending,
    /// Pending with the comment box open.
    PendingActive,
    /// Pointer over the annotation or its dialog.
    Hover,
    Inactive,
}

impl ThreadState {
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending | Self::PendingActive)
    }
}

/// What a thread wants after a pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Pointer is over this thread; draw it after the others reset.
    Delay,
    /// Pointer left; fall back to inactive after the hover debounce.
    ScheduleExit,
    Ignore,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingCreate {
    temp_id: String,
    prior_state: ThreadState,
    prior_kind: AnnotationType,
}

/// How a finished delete should be applied by the owning thread.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Nothing left.
    Destroy,
    /// Only a blank highlight record is left and it is deletable: remove it
    /// server-side too, then destroy.
    DestroyWithBlank(String),
    /// Only a blank highlight record is left and the user may not delete it.
    CancelFirstComment,
    /// Comments remain.
    Reshow,
    Failed(Failure),
}

/// State shared by every thread kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadData {
    pub id: ThreadId,
    pub location: Location,
    pub state: ThreadState,
    pub annotations: Vec<Annotation>,
    pub kind: AnnotationType,
    pub thread_number: Option<String>,
    /// Whether the host currently shows this thread's dialog.
    pub dialog_visible: bool,
    pending_create: Option<PendingCreate>,
    pending_delete: Option<String>,
}

impl ThreadData {
    /// Starts `Pending` without annotations and `Inactive` with them. The
    /// thread id comes from the first annotation when there is one.
    #[must_use]
    pub fn new(kind: AnnotationType, location: Location, annotations: Vec<Annotation>) -> Self {
        let (id, thread_number) = match annotations.first() {
            Some(first) => (first.thread_id, first.thread_number.clone()),
            None => (Uuid::new_v4(), None),
        };
        let state = if annotations.is_empty() { ThreadState::Pending } else { ThreadState::Inactive };
        Self {
            id,
            location,
            state,
            annotations,
            kind,
            thread_number,
            dialog_visible: false,
            pending_create: None,
            pending_delete: None,
        }
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.location.page
    }

    #[must_use]
    pub fn has_request_in_flight(&self) -> bool {
        self.pending_create.is_some() || self.pending_delete.is_some()
    }

    /// Optimistically add a temporary annotation and emit the create request.
    ///
    /// # Errors
    ///
    /// [`ThreadError::RequestInFlight`] while a previous create is unanswered.
    pub fn begin_create(&mut self, kind: AnnotationType, text: &str, user: &str) -> Result<Action, ThreadError> {
        if let Some(p) = &self.pending_create {
            return Err(ThreadError::RequestInFlight(p.temp_id.clone()));
        }
        let draft = AnnotationDraft {
            thread_id: self.id,
            thread_number: self.thread_number.clone(),
            kind,
            location: self.location.clone(),
            text: text.to_owned(),
            user: user.to_owned(),
        };
        let temp_id = Uuid::new_v4().to_string();
        self.annotations.push(draft.to_temporary(temp_id.clone()));
        self.pending_create = Some(PendingCreate { temp_id: temp_id.clone(), prior_state: self.state, prior_kind: self.kind });
        self.kind = kind;
        self.state = ThreadState::Hover;
        debug!(thread = %self.id, %temp_id, ?kind, "optimistic create");
        Ok(Action::Persist(Intent::Create { thread: self.id, temp_id, draft }))
    }

    /// Apply the answer to [`ThreadData::begin_create`]. On failure the
    /// temporary annotation is dropped and the prior state and kind restored.
    ///
    /// # Errors
    ///
    /// [`ThreadError::UnknownAnnotation`] when `temp_id` is not in flight.
    pub fn finish_create(
        &mut self,
        temp_id: &str,
        result: Result<Annotation, ServiceError>,
    ) -> Result<Option<Failure>, ThreadError> {
        let Some(pending) = self.pending_create.take_if(|p| p.temp_id == temp_id) else {
            return Err(ThreadError::UnknownAnnotation(temp_id.to_owned()));
        };
        match result {
            Ok(saved) => {
                if self.thread_number.is_none() {
                    self.thread_number.clone_from(&saved.thread_number);
                }
                match self.annotations.iter_mut().find(|a| a.id == temp_id) {
                    Some(slot) => *slot = saved,
                    None => self.annotations.push(saved),
                }
                debug!(thread = %self.id, %temp_id, "create confirmed");
                Ok(None)
            }
            Err(err) => {
                self.roll_back(&pending);
                warn!(thread = %self.id, %temp_id, error = %err, "create failed, rolled back");
                Ok(Some(Failure::create(self.id, &err)))
            }
        }
    }

    /// Withdraw a create whose request was never handed to the host.
    pub(crate) fn abandon_create(&mut self) {
        if let Some(pending) = self.pending_create.take() {
            self.roll_back(&pending);
            debug!(thread = %self.id, temp_id = %pending.temp_id, "create abandoned");
        }
    }

    fn roll_back(&mut self, pending: &PendingCreate) {
        self.annotations.retain(|a| a.id != pending.temp_id);
        self.state = pending.prior_state;
        self.kind = pending.prior_kind;
    }

    /// Check permissions and emit the delete request. The annotation stays
    /// until the service confirms.
    ///
    /// # Errors
    ///
    /// Unknown annotation, missing delete permission, or a delete already in flight.
    pub fn begin_delete(&mut self, annotation_id: &str) -> Result<Action, ThreadError> {
        let Some(annotation) = self.annotations.iter().find(|a| a.id == annotation_id) else {
            return Err(ThreadError::UnknownAnnotation(annotation_id.to_owned()));
        };
        if !annotation.permissions.can_delete {
            return Err(ThreadError::PermissionDenied(annotation_id.to_owned()));
        }
        if let Some(in_flight) = &self.pending_delete {
            return Err(ThreadError::RequestInFlight(in_flight.clone()));
        }
        self.pending_delete = Some(annotation_id.to_owned());
        debug!(thread = %self.id, annotation = annotation_id, "delete requested");
        Ok(Action::Persist(Intent::Delete { thread: self.id, annotation_id: annotation_id.to_owned() }))
    }

    /// Apply the answer to [`ThreadData::begin_delete`].
    ///
    /// # Errors
    ///
    /// [`ThreadError::UnknownAnnotation`] when no delete of `annotation_id` is in flight.
    pub fn finish_delete(
        &mut self,
        annotation_id: &str,
        result: Result<(), ServiceError>,
    ) -> Result<DeleteOutcome, ThreadError> {
        if self.pending_delete.take_if(|id| id.as_str() == annotation_id).is_none() {
            return Err(ThreadError::UnknownAnnotation(annotation_id.to_owned()));
        }
        if let Err(err) = result {
            warn!(thread = %self.id, annotation = annotation_id, error = %err, "delete failed");
            return Ok(DeleteOutcome::Failed(Failure::delete(self.id, annotation_id.to_owned(), &err)));
        }

        self.annotations.retain(|a| a.id != annotation_id);
        let outcome = match self.annotations.as_slice() {
            [] => DeleteOutcome::Destroy,
            [blank] if self.kind.is_highlight() && is_plain_highlight(&self.annotations) => {
                if blank.permissions.can_delete {
                    DeleteOutcome::DestroyWithBlank(blank.id.clone())
                } else {
                    DeleteOutcome::CancelFirstComment
                }
            }
            _ => DeleteOutcome::Reshow,
        };
        debug!(thread = %self.id, annotation = annotation_id, ?outcome, "delete confirmed");
        Ok(outcome)
    }

    pub(crate) fn show_dialog(&mut self, anchor: Point) -> Action {
        self.dialog_visible = true;
        Action::ShowDialog { thread: self.id, page: self.page(), anchor }
    }

    pub(crate) fn hide_dialog(&mut self) -> Option<Action> {
        if !self.dialog_visible {
            return None;
        }
        self.dialog_visible = false;
        Some(Action::HideDialog { thread: self.id })
    }

    /// Teardown common to every thread kind.
    pub(crate) fn destroy(&mut self) -> Vec<Action> {
        let mut actions: Vec<Action> = self.hide_dialog().into_iter().collect();
        if self.state == ThreadState::Pending {
            actions.push(Action::ClearSelection);
        }
        actions.push(Action::ThreadDestroyed { thread: self.id, page: self.page() });
        debug!(thread = %self.id, page = self.page(), "thread destroyed");
        actions
    }

    pub(crate) fn first_annotation_id(&self) -> Result<String, ThreadError> {
        self.annotations
            .first()
            .map(|a| a.id.clone())
            .ok_or_else(|| ThreadError::UnknownAnnotation(String::new()))
    }
}

// =============================================================
// HighlightThread
// =============================================================

/// A text highlight, optionally carrying comments.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightThread {
    data: ThreadData,
}

impl HighlightThread {
    /// A new, unsaved highlight.
    #[must_use]
    pub fn pending(location: Location) -> Self {
        Self { data: ThreadData::new(AnnotationType::Highlight, location, Vec::new()) }
    }

    /// Rebuild from saved records. A plain-typed highlight whose first record
    /// has text, or which has several records, is really a commented one.
    #[must_use]
    pub fn from_annotations(kind: AnnotationType, location: Location, annotations: Vec<Annotation>) -> Self {
        let promote = kind == AnnotationType::Highlight
            && annotations.first().is_some_and(|first| !first.text.is_empty() || annotations.len() > 1);
        let kind = if promote { AnnotationType::HighlightComment } else { kind };
        Self { data: ThreadData::new(kind, location, annotations) }
    }

    #[must_use]
    pub fn data(&self) -> &ThreadData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ThreadData {
        &mut self.data
    }

    #[must_use]
    pub fn quad_points(&self) -> &[QuadPoint] {
        self.data.location.quad_points()
    }

    fn screen_quads(&self, view: &PageView) -> Result<Vec<QuadPoint>, GeometryError> {
        let scale = view.resize_scale(self.data.location.dimensions)?;
        self.quad_points()
            .iter()
            .map(|q| quad::screen_quad(q, scale, view.page_height(), view.zoom))
            .collect()
    }

    /// Whether the event falls on one of this highlight's quads.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn is_in_highlight(&self, event: &PointerEvent, view: &PageView) -> Result<bool, GeometryError> {
        let local = view.to_page(event.client);
        let scale = view.resize_scale(self.data.location.dimensions)?;
        quad::is_hit(self.quad_points(), scale, view.page_height(), view.zoom, local.x, local.y)
    }

    fn is_in_dialog(&self, event: &PointerEvent) -> bool {
        event.dialog == Some(self.data.id)
    }

    /// Quads or dialog.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn is_on_highlight(&self, event: &PointerEvent, view: &PageView) -> Result<bool, GeometryError> {
        Ok(self.is_in_dialog(event) || self.is_in_highlight(event, view)?)
    }

    fn anchor(&self, view: &PageView) -> Result<Option<Point>, GeometryError> {
        quad::lower_right_of_last_quad(self.quad_points())
            .map(|p| view.browser_from_document(p, self.data.location.dimensions))
            .transpose()
    }

    fn paint(&self, view: &PageView, fill: HighlightFill) -> Result<Action, GeometryError> {
        Ok(Action::PaintHighlight {
            thread: self.data.id,
            page: self.data.page(),
            quads: self.screen_quads(view)?,
            fill,
        })
    }

    fn show_dialog(&mut self, view: &PageView) -> Result<Option<Action>, GeometryError> {
        Ok(self.anchor(view)?.map(|anchor| self.data.show_dialog(anchor)))
    }

    /// Draw according to the current state.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out; nothing is emitted then.
    pub fn show(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        let mut actions = Vec::new();
        match self.data.state {
            ThreadState::Pending => actions.extend(self.show_dialog(view)?),
            ThreadState::Inactive => {
                let paint = self.paint(view, HighlightFill::Normal)?;
                actions.extend(self.data.hide_dialog());
                actions.push(paint);
            }
            ThreadState::Hover | ThreadState::PendingActive => {
                let paint = self.paint(view, HighlightFill::Active)?;
                actions.extend(self.show_dialog(view)?);
                actions.push(paint);
            }
        }
        Ok(actions)
    }

    /// Cut the highlight out of the layer. Overlapping highlights lose the
    /// overlap too, so callers redraw the page afterwards.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn hide(&self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        Ok(vec![self.paint(view, HighlightFill::Erase)?])
    }

    /// Back to inactive and redraw.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn reset(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        self.data.state = ThreadState::Inactive;
        self.show(view)
    }

    /// Hide the dialog without repainting. Used when another thread's dialog
    /// takes precedence.
    pub fn hide_dialog(&mut self) -> Vec<Action> {
        self.data.hide_dialog().into_iter().collect()
    }

    pub fn destroy(&mut self) -> Vec<Action> {
        self.data.destroy()
    }

    /// A new press destroys a highlight that was never confirmed.
    pub fn on_mousedown(&mut self) -> Vec<Action> {
        if self.data.state == ThreadState::Pending {
            return self.destroy();
        }
        Vec::new()
    }

    /// Returns whether this thread claimed the click. When `consumed` is set
    /// another thread already claimed it and this one resets instead.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn on_click(
        &mut self,
        event: &PointerEvent,
        view: &PageView,
        consumed: bool,
    ) -> Result<(bool, Vec<Action>), GeometryError> {
        if !consumed && self.is_on_highlight(event, view)? {
            self.data.state = ThreadState::Hover;
            return Ok((true, Vec::new()));
        }
        Ok((false, self.reset(view)?))
    }

    /// Classify a pointer move without touching any timer.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn on_mousemove(&mut self, event: &PointerEvent, view: &PageView) -> Result<MoveOutcome, GeometryError> {
        // the comment box stays open until posted or cancelled
        if self.data.state == ThreadState::PendingActive {
            return Ok(MoveOutcome::Ignore);
        }
        if self.is_in_dialog(event) || self.is_in_highlight(event, view)? {
            self.data.state = ThreadState::Hover;
            return Ok(MoveOutcome::Delay);
        }
        if self.data.state == ThreadState::Inactive {
            return Ok(MoveOutcome::Ignore);
        }
        Ok(MoveOutcome::ScheduleExit)
    }

    /// Cancel from the dialog. Without annotations the thread goes away;
    /// otherwise it collapses back to inactive.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn cancel_first_comment(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        if self.data.annotations.is_empty() {
            return Ok(self.destroy());
        }
        if is_plain_highlight(&self.data.annotations) {
            self.data.kind = AnnotationType::Highlight;
        }
        self.reset(view)
    }

    /// # Errors
    ///
    /// See [`ThreadData::begin_create`].
    pub fn save_annotation(
        &mut self,
        kind: AnnotationType,
        text: &str,
        view: &PageView,
        user: &str,
    ) -> Result<Vec<Action>, ThreadError> {
        let persist = self.data.begin_create(kind, text, user)?;
        let shown = match self.show(view) {
            Ok(shown) => shown,
            Err(err) => {
                self.data.abandon_create();
                return Err(err.into());
            }
        };
        let mut actions = vec![Action::ClearSelection, persist];
        actions.extend(shown);
        Ok(actions)
    }

    /// # Errors
    ///
    /// See [`ThreadData::begin_delete`].
    pub fn delete_annotation(&mut self, annotation_id: &str) -> Result<Vec<Action>, ThreadError> {
        Ok(vec![self.data.begin_delete(annotation_id)?])
    }

    /// # Errors
    ///
    /// Unknown annotation, permission, in-flight, or layout failures.
    pub fn on_dialog_event(
        &mut self,
        event: &DialogEvent,
        view: &PageView,
        user: &str,
    ) -> Result<Vec<Action>, ThreadError> {
        match event {
            DialogEvent::Draw => {
                self.data.state = ThreadState::PendingActive;
                let mut actions = vec![Action::ClearSelection];
                actions.extend(self.show(view)?);
                Ok(actions)
            }
            DialogEvent::Comment => {
                self.data.state = ThreadState::PendingActive;
                Ok(Vec::new())
            }
            DialogEvent::CommentPost { text } => {
                let kind = if text.is_empty() { AnnotationType::Highlight } else { AnnotationType::HighlightComment };
                self.save_annotation(kind, text, view, user)
            }
            DialogEvent::Cancel => Ok(self.cancel_first_comment(view)?),
            DialogEvent::Delete { annotation_id } => {
                let id = match annotation_id {
                    Some(id) => id.clone(),
                    None => self.data.first_annotation_id()?,
                };
                self.delete_annotation(&id)
            }
        }
    }

    /// # Errors
    ///
    /// See [`ThreadData::finish_create`].
    pub fn on_create_result(
        &mut self,
        temp_id: &str,
        result: Result<Annotation, ServiceError>,
        view: &PageView,
    ) -> Result<Vec<Action>, ThreadError> {
        match self.data.finish_create(temp_id, result)? {
            None => Ok(Vec::new()),
            Some(failure) => {
                let mut actions = vec![Action::Failure(failure)];
                actions.extend(self.show(view)?);
                Ok(actions)
            }
        }
    }

    /// # Errors
    ///
    /// See [`ThreadData::finish_delete`].
    pub fn on_delete_result(
        &mut self,
        annotation_id: &str,
        result: Result<(), ServiceError>,
        view: &PageView,
    ) -> Result<Vec<Action>, ThreadError> {
        match self.data.finish_delete(annotation_id, result)? {
            DeleteOutcome::Destroy => Ok(self.destroy()),
            DeleteOutcome::DestroyWithBlank(blank) => {
                let mut actions =
                    vec![Action::Persist(Intent::Delete { thread: self.data.id, annotation_id: blank })];
                actions.extend(self.destroy());
                Ok(actions)
            }
            DeleteOutcome::CancelFirstComment => Ok(self.cancel_first_comment(view)?),
            DeleteOutcome::Reshow => Ok(self.show(view)?),
            DeleteOutcome::Failed(failure) => Ok(vec![Action::Failure(failure)]),
        }
    }
}

// =============================================================
// PointThread
// =============================================================

/// A comment pinned to one point on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PointThread {
    data: ThreadData,
    marker_radius_px: f64,
}

impl PointThread {
    #[must_use]
    pub fn new(location: Location, annotations: Vec<Annotation>, marker_radius_px: f64) -> Self {
        Self { data: ThreadData::new(AnnotationType::Point, location, annotations), marker_radius_px }
    }

    #[must_use]
    pub fn data(&self) -> &ThreadData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ThreadData {
        &mut self.data
    }

    fn marker(&self, view: &PageView) -> Result<Option<Point>, GeometryError> {
        let LocationShape::Point { x, y } = self.data.location.shape else {
            return Ok(None);
        };
        view.browser_from_document(Point::new(x, y), self.data.location.dimensions).map(Some)
    }

    /// Within the marker radius, or inside the dialog.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn is_on_marker(&self, event: &PointerEvent, view: &PageView) -> Result<bool, GeometryError> {
        if event.dialog == Some(self.data.id) {
            return Ok(true);
        }
        let Some(at) = self.marker(view)? else {
            return Ok(false);
        };
        let local = view.to_page(event.client);
        Ok((local.x - at.x).hypot(local.y - at.y) <= self.marker_radius_px)
    }

    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn show(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        let Some(at) = self.marker(view)? else {
            return Ok(Vec::new());
        };
        let mut actions = vec![Action::PlaceMarker { thread: self.data.id, page: self.data.page(), at }];
        if self.data.state == ThreadState::Inactive {
            actions.extend(self.data.hide_dialog());
        } else {
            actions.push(self.data.show_dialog(at));
        }
        Ok(actions)
    }

    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn reset(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        self.data.state = ThreadState::Inactive;
        self.show(view)
    }

    pub fn destroy(&mut self) -> Vec<Action> {
        let mut actions = vec![Action::RemoveMarker { thread: self.data.id }];
        actions.extend(self.data.destroy());
        actions
    }

    pub fn hide_dialog(&mut self) -> Vec<Action> {
        self.data.hide_dialog().into_iter().collect()
    }

    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn on_click(
        &mut self,
        event: &PointerEvent,
        view: &PageView,
        consumed: bool,
    ) -> Result<(bool, Vec<Action>), GeometryError> {
        if !consumed && self.is_on_marker(event, view)? {
            self.data.state = ThreadState::Hover;
            return Ok((true, Vec::new()));
        }
        Ok((false, self.reset(view)?))
    }

    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn on_mousemove(&mut self, event: &PointerEvent, view: &PageView) -> Result<MoveOutcome, GeometryError> {
        if self.data.state.is_pending() {
            return Ok(MoveOutcome::Ignore);
        }
        if self.is_on_marker(event, view)? {
            self.data.state = ThreadState::Hover;
            return Ok(MoveOutcome::Delay);
        }
        if self.data.state == ThreadState::Inactive {
            return Ok(MoveOutcome::Ignore);
        }
        Ok(MoveOutcome::ScheduleExit)
    }

    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn cancel(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        if self.data.annotations.is_empty() {
            return Ok(self.destroy());
        }
        self.reset(view)
    }

    /// # Errors
    ///
    /// Unknown annotation, permission, in-flight, or layout failures.
    pub fn on_dialog_event(
        &mut self,
        event: &DialogEvent,
        view: &PageView,
        user: &str,
    ) -> Result<Vec<Action>, ThreadError> {
        match event {
            DialogEvent::Draw => Ok(Vec::new()),
            DialogEvent::Comment => {
                self.data.state = ThreadState::PendingActive;
                Ok(Vec::new())
            }
            DialogEvent::CommentPost { text } => {
                let persist = self.data.begin_create(AnnotationType::Point, text, user)?;
                let shown = match self.show(view) {
                    Ok(shown) => shown,
                    Err(err) => {
                        self.data.abandon_create();
                        return Err(err.into());
                    }
                };
                let mut actions = vec![persist];
                actions.extend(shown);
                Ok(actions)
            }
            DialogEvent::Cancel => Ok(self.cancel(view)?),
            DialogEvent::Delete { annotation_id } => {
                let id = match annotation_id {
                    Some(id) => id.clone(),
                    None => self.data.first_annotation_id()?,
                };
                Ok(vec![self.data.begin_delete(&id)?])
            }
        }
    }

    /// # Errors
    ///
    /// See [`ThreadData::finish_create`].
    pub fn on_create_result(
        &mut self,
        temp_id: &str,
        result: Result<Annotation, ServiceError>,
        view: &PageView,
    ) -> Result<Vec<Action>, ThreadError> {
        match self.data.finish_create(temp_id, result)? {
            None => Ok(Vec::new()),
            Some(failure) => {
                let mut actions = vec![Action::Failure(failure)];
                actions.extend(self.show(view)?);
                Ok(actions)
            }
        }
    }

    /// # Errors
    ///
    /// See [`ThreadData::finish_delete`].
    pub fn on_delete_result(
        &mut self,
        annotation_id: &str,
        result: Result<(), ServiceError>,
        view: &PageView,
    ) -> Result<Vec<Action>, ThreadError> {
        match self.data.finish_delete(annotation_id, result)? {
            DeleteOutcome::Destroy | DeleteOutcome::DestroyWithBlank(_) => Ok(self.destroy()),
            DeleteOutcome::CancelFirstComment => Ok(self.cancel(view)?),
            DeleteOutcome::Reshow => Ok(self.show(view)?),
            DeleteOutcome::Failed(failure) => Ok(vec![Action::Failure(failure)]),
        }
    }
}

// =============================================================
// Thread
// =============================================================

/// Every live thread, one variant per annotation flavor.
#[derive(Debug, Clone, PartialEq)]
pub enum Thread {
    Highlight(HighlightThread),
    Point(PointThread),
    Drawing(DrawingThread),
}

impl Thread {
    /// Build the thread matching `kind`.
    ///
    /// # Errors
    ///
    /// [`ThreadError::ShapeMismatch`] when `location` does not fit `kind`, or
    /// a geometry error when its saved dimensions are not positive.
    pub fn create(
        kind: AnnotationType,
        location: Location,
        annotations: Vec<Annotation>,
        config: &EngineConfig,
    ) -> Result<Self, ThreadError> {
        if let Some(dims) = location.dimensions.filter(|d| !d.is_valid()) {
            return Err(GeometryError::InvalidDimensions { x: dims.x, y: dims.y }.into());
        }
        match (kind, &location.shape) {
            (AnnotationType::Highlight | AnnotationType::HighlightComment, LocationShape::Quads { .. }) => {
                if annotations.is_empty() {
                    Ok(Self::Highlight(HighlightThread::pending(location)))
                } else {
                    Ok(Self::Highlight(HighlightThread::from_annotations(kind, location, annotations)))
                }
            }
            (AnnotationType::Point, LocationShape::Point { .. }) => {
                Ok(Self::Point(PointThread::new(location, annotations, config.point_marker_radius_px)))
            }
            (AnnotationType::Draw, LocationShape::Drawing { .. }) => {
                Ok(Self::Drawing(DrawingThread::from_annotations(location, annotations, config)))
            }
            _ => Err(ThreadError::ShapeMismatch(kind)),
        }
    }

    #[must_use]
    pub fn data(&self) -> &ThreadData {
        match self {
            Self::Highlight(t) => t.data(),
            Self::Point(t) => t.data(),
            Self::Drawing(t) => t.data(),
        }
    }

    pub fn data_mut(&mut self) -> &mut ThreadData {
        match self {
            Self::Highlight(t) => t.data_mut(),
            Self::Point(t) => t.data_mut(),
            Self::Drawing(t) => t.data_mut(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ThreadId {
        self.data().id
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.data().page()
    }

    #[must_use]
    pub fn state(&self) -> ThreadState {
        self.data().state
    }

    #[must_use]
    pub fn kind(&self) -> AnnotationType {
        self.data().kind
    }

    #[must_use]
    pub fn is_highlight(&self) -> bool {
        matches!(self, Self::Highlight(_))
    }

    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn show(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        match self {
            Self::Highlight(t) => t.show(view),
            Self::Point(t) => t.show(view),
            Self::Drawing(t) => t.show(view),
        }
    }

    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn reset(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        match self {
            Self::Highlight(t) => t.reset(view),
            Self::Point(t) => t.reset(view),
            Self::Drawing(t) => Ok(t.reset()),
        }
    }

    pub fn hide_dialog(&mut self) -> Vec<Action> {
        match self {
            Self::Highlight(t) => t.hide_dialog(),
            Self::Point(t) => t.hide_dialog(),
            Self::Drawing(t) => t.hide_dialog(),
        }
    }

    pub fn destroy(&mut self) -> Vec<Action> {
        match self {
            Self::Highlight(t) => t.destroy(),
            Self::Point(t) => t.destroy(),
            Self::Drawing(t) => t.destroy(),
        }
    }

    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn on_mousemove(&mut self, event: &PointerEvent, view: &PageView) -> Result<MoveOutcome, GeometryError> {
        match self {
            Self::Highlight(t) => t.on_mousemove(event, view),
            Self::Point(t) => t.on_mousemove(event, view),
            Self::Drawing(_) => Ok(MoveOutcome::Ignore),
        }
    }

    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn on_click(
        &mut self,
        event: &PointerEvent,
        view: &PageView,
        consumed: bool,
    ) -> Result<(bool, Vec<Action>), GeometryError> {
        match self {
            Self::Highlight(t) => t.on_click(event, view, consumed),
            Self::Point(t) => t.on_click(event, view, consumed),
            Self::Drawing(t) => t.on_click(event, view, consumed),
        }
    }

    /// Dismiss an unsaved thread: point threads vanish, highlights go
    /// through their cancel path.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn cancel_pending(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        match self {
            Self::Highlight(t) => t.cancel_first_comment(view),
            Self::Point(t) => Ok(t.destroy()),
            Self::Drawing(t) => Ok(t.reset()),
        }
    }

    /// # Errors
    ///
    /// Unknown annotation, permission, in-flight, or layout failures.
    pub fn on_dialog_event(
        &mut self,
        event: &DialogEvent,
        view: &PageView,
        user: &str,
    ) -> Result<Vec<Action>, ThreadError> {
        match self {
            Self::Highlight(t) => t.on_dialog_event(event, view, user),
            Self::Point(t) => t.on_dialog_event(event, view, user),
            Self::Drawing(t) => t.on_dialog_event(event),
        }
    }

    /// # Errors
    ///
    /// See [`ThreadData::finish_create`].
    pub fn on_create_result(
        &mut self,
        temp_id: &str,
        result: Result<Annotation, ServiceError>,
        view: &PageView,
    ) -> Result<Vec<Action>, ThreadError> {
        match self {
            Self::Highlight(t) => t.on_create_result(temp_id, result, view),
            Self::Point(t) => t.on_create_result(temp_id, result, view),
            Self::Drawing(t) => t.on_create_result(temp_id, result, view),
        }
    }

    /// # Errors
    ///
    /// See [`ThreadData::finish_delete`].
    pub fn on_delete_result(
        &mut self,
        annotation_id: &str,
        result: Result<(), ServiceError>,
        view: &PageView,
    ) -> Result<Vec<Action>, ThreadError> {
        match self {
            Self::Highlight(t) => t.on_delete_result(annotation_id, result, view),
            Self::Point(t) => t.on_delete_result(annotation_id, result, view),
            Self::Drawing(t) => t.on_delete_result(annotation_id, result),
        }
    }
}
