//! Pointer-event orchestration across every live thread.
//!
//! The engine is passive. The host feeds it pointer events, dialog events,
//! persistence results and frame ticks, each stamped with the host clock in
//! milliseconds, and applies the [`Action`]s that come back. Debounces are
//! stored as deadlines and fired from [`Engine::on_frame`], so nothing here
//! owns a timer.
//!
//! Pointer moves are throttled: only the latest move is kept, and it is
//! processed on the first frame at least `throttle_ms` after the previous
//! processed one.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::coords::{PageView, Point};
use crate::drawing::{DrawState, DrawingThread};
use crate::error::{GeometryError, ServiceError};
use crate::host::{
    Action, Cursor, DialogEvent, Layer, PageSource, PointerEvent, PointerSource, Scheduler, SelectionSource,
    TickHandle,
};
use crate::model::{Annotation, AnnotationType, Location, ThreadId};
use crate::quad;
use crate::registry::ThreadRegistry;
use crate::thread::{HighlightThread, MoveOutcome, PointThread, Thread, ThreadState};

/// What a pointer press does on a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Select text to highlight; click to open threads.
    #[default]
    Highlight,
    /// Click to drop a point comment.
    Point,
    /// Press and drag to draw.
    Draw,
}

/// Orchestrates threads over explicit host collaborators.
pub struct Engine<P, S, T, E> {
    config: EngineConfig,
    pages: P,
    selection: S,
    scheduler: T,
    pointer: E,
    registry: ThreadRegistry,
    mode: Mode,
    attached: bool,
    tick: Option<TickHandle>,
    /// Client position of the current press.
    press: Option<Point>,
    dragged: bool,
    /// A press is down outside draw mode; moves belong to the text selection.
    creating: bool,
    pending_move: Option<PointerEvent>,
    last_move_ms: Option<f64>,
    hover_exits: HashMap<ThreadId, f64>,
    cursor: Cursor,
    cursor_restore_at: Option<f64>,
    /// Drawing currently receiving strokes.
    drawing: Option<ThreadId>,
}

impl<P, S, T, E> Engine<P, S, T, E>
where
    P: PageSource,
    S: SelectionSource,
    T: Scheduler,
    E: PointerSource,
{
    #[must_use]
    pub fn new(config: EngineConfig, pages: P, selection: S, scheduler: T, pointer: E) -> Self {
        Self {
            config,
            pages,
            selection,
            scheduler,
            pointer,
            registry: ThreadRegistry::new(),
            mode: Mode::default(),
            attached: false,
            tick: None,
            press: None,
            dragged: false,
            creating: false,
            pending_move: None,
            last_move_ms: None,
            hover_exits: HashMap::new(),
            cursor: Cursor::Text,
            cursor_restore_at: None,
            drawing: None,
        }
    }

    // --- Accessors ---

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ThreadRegistry {
        &self.registry
    }

    #[must_use]
    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.registry.get(id)
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    #[must_use]
    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    #[must_use]
    pub fn pointer(&self) -> &E {
        &self.pointer
    }

    pub fn pages_mut(&mut self) -> &mut P {
        &mut self.pages
    }

    pub fn selection_mut(&mut self) -> &mut S {
        &mut self.selection
    }

    /// The drawing currently receiving strokes.
    #[must_use]
    pub fn drawing(&self) -> Option<&DrawingThread> {
        match self.registry.get(self.drawing?) {
            Some(Thread::Drawing(d)) => Some(d),
            _ => None,
        }
    }

    fn drawing_mut(&mut self) -> Option<&mut DrawingThread> {
        match self.registry.get_mut(self.drawing?) {
            Some(Thread::Drawing(d)) => Some(d),
            _ => None,
        }
    }

    // --- Lifecycle ---

    /// Start receiving pointer events and ticks.
    pub fn attach(&mut self) {
        self.pointer.attach();
        self.attached = true;
        info!("annotator attached");
        self.ensure_tick();
    }

    /// Stop receiving pointer events. Outstanding ticks and timers are dropped.
    pub fn detach(&mut self) {
        if let Some(handle) = self.tick.take() {
            self.scheduler.cancel_tick(handle);
        }
        self.pointer.detach();
        self.attached = false;
        self.pending_move = None;
        self.hover_exits.clear();
        self.cursor_restore_at = None;
        info!("annotator detached");
    }

    /// Switch modes. Leaving draw mode commits the drawing in progress.
    pub fn set_mode(&mut self, mode: Mode) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.mode == Mode::Draw && mode != Mode::Draw {
            actions.extend(self.commit_drawing());
        }
        debug!(from = ?self.mode, to = ?mode, "mode changed");
        self.mode = mode;
        actions
    }

    fn ensure_tick(&mut self) {
        if self.attached && self.tick.is_none() {
            self.tick = self.scheduler.request_tick();
        }
    }

    fn needs_tick(&self) -> bool {
        self.pending_move.is_some()
            || !self.hover_exits.is_empty()
            || self.cursor_restore_at.is_some()
            || self.drawing().is_some_and(DrawingThread::wants_frame)
    }

    /// Snapshot of one page's geometry.
    fn view(&self, page: u32) -> Result<PageView, GeometryError> {
        let rect = self.pages.page_rect(page).ok_or(GeometryError::PageNotLaidOut(page))?;
        let zoom = self.pages.zoom_scale();
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(GeometryError::InvalidZoom(zoom));
        }
        let view = PageView {
            page,
            rect,
            zoom,
            padding_top: self.config.page_padding_top_px,
            padding_bottom: self.config.page_padding_bottom_px,
        };
        let height = view.page_height();
        if !height.is_finite() || height <= 0.0 {
            return Err(GeometryError::InvalidPageHeight(height));
        }
        Ok(view)
    }

    /// Page under the event, or the page of the dialog it landed in.
    fn event_page(&self, event: &PointerEvent) -> Option<u32> {
        event.page.or_else(|| event.dialog.and_then(|id| self.registry.get(id)).map(Thread::page))
    }

    // =============================================================
    // Pointer input
    // =============================================================

    pub fn on_mousedown(&mut self, event: PointerEvent, _now_ms: f64) -> Vec<Action> {
        self.press = Some(event.client);
        self.dragged = false;
        self.pending_move = None;
        self.hover_exits.clear();
        self.cursor_restore_at = None;

        if self.mode == Mode::Draw {
            return self.draw_start(&event);
        }
        if let Some(handle) = self.tick.take() {
            self.scheduler.cancel_tick(handle);
        }
        // presses inside a dialog belong to the dialog
        if event.dialog.is_some() {
            return Vec::new();
        }
        self.creating = true;

        let mut actions = Vec::new();
        let ids: Vec<ThreadId> = self.registry.threads().filter(|t| t.is_highlight()).map(Thread::id).collect();
        for id in ids {
            if let Some(Thread::Highlight(h)) = self.registry.get_mut(id) {
                actions.extend(h.on_mousedown());
            }
        }
        self.settle(actions)
    }

    pub fn on_mousemove(&mut self, event: PointerEvent, _now_ms: f64) -> Vec<Action> {
        if let Some(origin) = self.press {
            let threshold = self.config.drag_threshold_px;
            if (event.client.x - origin.x).abs() > threshold || (event.client.y - origin.y).abs() > threshold {
                self.dragged = true;
            }
        }
        if self.mode == Mode::Draw {
            return self.draw_move(&event);
        }
        if self.creating {
            return Vec::new();
        }
        self.pending_move = Some(event);
        self.ensure_tick();
        Vec::new()
    }

    pub fn on_mouseup(&mut self, event: PointerEvent, _now_ms: f64) -> Vec<Action> {
        let dragged = self.dragged;
        self.press = None;
        self.dragged = false;
        self.creating = false;

        match self.mode {
            Mode::Draw => self.drawing_mut().map(DrawingThread::handle_stop).unwrap_or_default(),
            Mode::Highlight if dragged || event.dblclick => self.create_highlight(&event),
            Mode::Highlight | Mode::Point => self.click(&event),
        }
    }

    /// Run due timers, the throttled pointer move and any drawing render.
    pub fn on_frame(&mut self, now_ms: f64) -> Vec<Action> {
        self.tick = None;
        let mut actions = self.fire_timers(now_ms);

        let threshold = self.config.draw_render_threshold_ms;
        if let Some(d) = self.drawing_mut() {
            actions.extend(d.on_frame(now_ms, threshold));
        }

        let throttle = self.config.throttle_ms;
        if self.pending_move.is_some() && self.last_move_ms.is_none_or(|last| now_ms - last >= throttle) {
            if let Some(event) = self.pending_move.take() {
                self.last_move_ms = Some(now_ms);
                actions.extend(self.process_move(event, now_ms));
            }
        } else if self.pending_move.is_some() {
            trace!(now_ms, "pointer move held by throttle");
        }

        if self.needs_tick() {
            self.ensure_tick();
        }
        self.settle(actions)
    }

    fn fire_timers(&mut self, now_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();

        let mut due: Vec<(f64, ThreadId)> =
            self.hover_exits.iter().filter(|(_, at)| **at <= now_ms).map(|(id, at)| (*at, *id)).collect();
        due.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, id) in due {
            self.hover_exits.remove(&id);
            let Some(page) = self.registry.get(id).map(Thread::page) else {
                continue;
            };
            let view = match self.view(page) {
                Ok(v) => v,
                Err(err) => {
                    warn!(page, error = %err, "hover exit skipped");
                    continue;
                }
            };
            if let Some(thread) = self.registry.get_mut(id) {
                if thread.state() == ThreadState::Hover {
                    match thread.reset(&view) {
                        Ok(a) => actions.extend(a),
                        Err(err) => warn!(thread = %id, error = %err, "hover exit skipped"),
                    }
                }
            }
        }

        if self.cursor_restore_at.is_some_and(|at| at <= now_ms) {
            self.cursor_restore_at = None;
            self.cursor = Cursor::Text;
            actions.push(Action::SetCursor(Cursor::Text));
        }
        actions
    }

    fn process_move(&mut self, event: PointerEvent, now_ms: f64) -> Vec<Action> {
        let Some(page) = self.event_page(&event) else {
            return Vec::new();
        };
        let view = match self.view(page) {
            Ok(v) => v,
            Err(err) => {
                warn!(page, error = %err, "pointer move skipped");
                return Vec::new();
            }
        };
        if self.registry.any_on_page(page, |t| t.state() == ThreadState::Pending) {
            return Vec::new();
        }

        let hover_timeout = self.config.hover_timeout_ms;
        let mut delayed = Vec::new();
        self.registry.begin_dispatch();
        for id in self.registry.page_ids(page) {
            let Some(thread) = self.registry.get_mut(id) else {
                continue;
            };
            match thread.on_mousemove(&event, &view) {
                Ok(MoveOutcome::Delay) => {
                    self.hover_exits.remove(&id);
                    delayed.push(id);
                }
                Ok(MoveOutcome::ScheduleExit) => {
                    self.hover_exits.entry(id).or_insert(now_ms + hover_timeout);
                }
                Ok(MoveOutcome::Ignore) => {}
                Err(err) => warn!(thread = %id, error = %err, "pointer move skipped"),
            }
        }
        self.registry.end_dispatch();

        let mut actions = self.update_cursor(!delayed.is_empty(), now_ms);
        let mut delayed = delayed.into_iter();
        let first = delayed.next();
        // overlapping threads: only the first in page order stays active
        for id in delayed {
            if let Some(thread) = self.registry.get_mut(id) {
                match thread.reset(&view) {
                    Ok(a) => actions.extend(a),
                    Err(err) => warn!(thread = %id, error = %err, "reset skipped"),
                }
            }
        }
        if let Some(id) = first {
            if let Some(thread) = self.registry.get_mut(id) {
                match thread.show(&view) {
                    Ok(a) => actions.extend(a),
                    Err(err) => warn!(thread = %id, error = %err, "show skipped"),
                }
            }
        }
        actions
    }

    fn update_cursor(&mut self, hovering: bool, now_ms: f64) -> Vec<Action> {
        if hovering {
            self.cursor_restore_at = None;
            if self.cursor != Cursor::Default {
                self.cursor = Cursor::Default;
                return vec![Action::SetCursor(Cursor::Default)];
            }
        } else if self.cursor == Cursor::Default && self.cursor_restore_at.is_none() {
            self.cursor_restore_at = Some(now_ms + self.config.cursor_restore_ms);
        }
        Vec::new()
    }

    // =============================================================
    // Create and click
    // =============================================================

    fn create_highlight(&mut self, event: &PointerEvent) -> Vec<Action> {
        let dialog_active = self.registry.threads().any(|t| t.state() == ThreadState::PendingActive);
        if event.dialog.is_some() || dialog_active {
            return Vec::new();
        }
        let Some(page) = event.page else {
            return Vec::new();
        };
        let view = match self.view(page) {
            Ok(v) => v,
            Err(err) => {
                warn!(page, error = %err, "highlight create skipped");
                return Vec::new();
            }
        };

        let mut actions = Vec::new();
        for id in self.registry.page_ids(page) {
            if let Some(thread) = self.registry.get_mut(id) {
                if thread.state() == ThreadState::Hover {
                    match thread.reset(&view) {
                        Ok(a) => actions.extend(a),
                        Err(err) => warn!(thread = %id, error = %err, "reset skipped"),
                    }
                }
            }
        }

        let rects = self.selection.selection_rects(page);
        if rects.is_empty() {
            return actions;
        }
        let quads = match quad::quads_from_rects(&rects, view.origin(), view.page_height(), view.zoom) {
            Ok(q) if !q.is_empty() => q,
            Ok(_) => return actions,
            Err(err) => {
                warn!(page, error = %err, "highlight create skipped");
                return actions;
            }
        };

        let mut thread = Thread::Highlight(HighlightThread::pending(Location::quads(page, view.dimensions(), quads)));
        actions.push(Action::ThreadCreated { thread: thread.id(), page, kind: AnnotationType::Highlight });
        match thread.show(&view) {
            Ok(a) => actions.extend(a),
            Err(err) => warn!(page, error = %err, "show skipped"),
        }
        debug!(thread = %thread.id(), page, "pending highlight created");
        self.registry.insert(thread);
        actions
    }

    fn click(&mut self, event: &PointerEvent) -> Vec<Action> {
        let actions = self.cancel_pending(event.dialog);
        let mut actions = self.settle(actions);

        let Some(page) = self.event_page(event) else {
            return actions;
        };
        let view = match self.view(page) {
            Ok(v) => v,
            Err(err) => {
                warn!(page, error = %err, "click skipped");
                return actions;
            }
        };

        let mut consumed = false;
        let mut active = None;
        self.registry.begin_dispatch();
        for id in self.registry.page_ids(page) {
            let Some(thread) = self.registry.get_mut(id) else {
                continue;
            };
            match thread.on_click(event, &view, consumed) {
                Ok((hit, a)) => {
                    if hit {
                        consumed = true;
                        active = Some(id);
                    }
                    actions.extend(a);
                }
                Err(err) => warn!(thread = %id, error = %err, "click skipped"),
            }
        }
        self.registry.end_dispatch();

        if let Some(id) = active {
            if let Some(thread) = self.registry.get_mut(id) {
                match thread.show(&view) {
                    Ok(a) => actions.extend(a),
                    Err(err) => warn!(thread = %id, error = %err, "show skipped"),
                }
            }
        }
        if self.registry.any_on_page(page, |t| matches!(t, Thread::Drawing(_))) {
            actions.extend(self.repaint_drawings(page));
        }

        let wants_point = self.mode == Mode::Point && !consumed && event.dialog.is_none();
        if wants_point && !self.selection.has_selection() {
            actions.extend(self.create_point(event, &view));
        }
        self.settle(actions)
    }

    /// Dismiss every unsaved thread except the one whose dialog was clicked.
    fn cancel_pending(&mut self, keep: Option<ThreadId>) -> Vec<Action> {
        let pending: Vec<(ThreadId, u32)> = self
            .registry
            .threads()
            .filter(|t| t.state().is_pending() && Some(t.id()) != keep)
            .map(|t| (t.id(), t.page()))
            .collect();
        let mut actions = Vec::new();
        for (id, page) in pending {
            let view = match self.view(page) {
                Ok(v) => v,
                Err(err) => {
                    warn!(page, error = %err, "cancel skipped");
                    continue;
                }
            };
            if let Some(thread) = self.registry.get_mut(id) {
                match thread.cancel_pending(&view) {
                    Ok(a) => actions.extend(a),
                    Err(err) => warn!(thread = %id, error = %err, "cancel skipped"),
                }
            }
        }
        actions
    }

    fn create_point(&mut self, event: &PointerEvent, view: &PageView) -> Vec<Action> {
        let doc = match view.document_from_client(event.client) {
            Ok(p) => p,
            Err(err) => {
                warn!(page = view.page, error = %err, "point create skipped");
                return Vec::new();
            }
        };
        let location = Location::point(view.page, view.dimensions(), doc.x, doc.y);
        let mut thread =
            Thread::Point(PointThread::new(location, Vec::new(), self.config.point_marker_radius_px));
        let mut actions =
            vec![Action::ThreadCreated { thread: thread.id(), page: view.page, kind: AnnotationType::Point }];
        match thread.show(view) {
            Ok(a) => actions.extend(a),
            Err(err) => warn!(page = view.page, error = %err, "show skipped"),
        }
        self.registry.insert(thread);
        actions
    }

    // =============================================================
    // Drawing
    // =============================================================

    fn draw_sample(&self, event: &PointerEvent) -> Option<(PageView, Point, Point)> {
        let page = event.page?;
        let located = self.view(page).and_then(|view| {
            let doc = view.document_from_client(event.client)?;
            Ok((view, doc, view.to_page(event.client)))
        });
        match located {
            Ok(sample) => Some(sample),
            Err(err) => {
                warn!(page, error = %err, "draw input skipped");
                None
            }
        }
    }

    fn draw_start(&mut self, event: &PointerEvent) -> Vec<Action> {
        let Some((view, doc, browser)) = self.draw_sample(event) else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        if self.drawing().is_some_and(|d| d.data().page() != view.page) {
            actions.extend(self.commit_drawing());
        }
        if self.drawing.is_none() {
            let thread = DrawingThread::new(view.page, view.dimensions(), &self.config);
            let id = thread.data().id;
            actions.push(Action::ThreadCreated { thread: id, page: view.page, kind: AnnotationType::Draw });
            self.registry.insert(Thread::Drawing(thread));
            self.drawing = Some(id);
        }
        if let Some(d) = self.drawing_mut() {
            d.handle_start(doc, browser, view.zoom);
        }
        self.ensure_tick();
        actions
    }

    fn draw_move(&mut self, event: &PointerEvent) -> Vec<Action> {
        let Some(current) = self.drawing().map(|d| (d.data().page(), d.draw_state())) else {
            return Vec::new();
        };
        if current.1 != DrawState::Draw {
            return Vec::new();
        }
        if event.page.is_some_and(|page| page != current.0) {
            // stroke crossed onto another page
            return self.draw_start(event);
        }
        let Some((_, doc, browser)) = self.draw_sample(event) else {
            return Vec::new();
        };
        if self.drawing_mut().is_some_and(|d| d.handle_move(doc, browser)) {
            self.ensure_tick();
        }
        Vec::new()
    }

    /// Save the drawing in progress. An empty drawing is discarded instead.
    pub fn commit_drawing(&mut self) -> Vec<Action> {
        let Some(id) = self.drawing.take() else {
            return Vec::new();
        };
        let user = self.config.user.clone();
        let Some(page) = self.registry.get(id).map(Thread::page) else {
            return Vec::new();
        };
        let view = self.view(page);
        let Some(Thread::Drawing(d)) = self.registry.get_mut(id) else {
            return Vec::new();
        };
        let actions = if d.is_empty() {
            debug!(thread = %id, "empty drawing discarded");
            d.destroy()
        } else {
            match view.map_err(Into::into).and_then(|view| d.save(&view, &user)) {
                Ok(a) => a,
                Err(err) => {
                    warn!(thread = %id, error = %err, "drawing save failed");
                    d.destroy()
                }
            }
        };
        self.settle(actions)
    }

    /// Throw away the drawing in progress.
    pub fn cancel_drawing(&mut self) -> Vec<Action> {
        let Some(id) = self.drawing.take() else {
            return Vec::new();
        };
        let actions = match self.registry.get_mut(id) {
            Some(thread) => thread.destroy(),
            None => Vec::new(),
        };
        self.settle(actions)
    }

    pub fn undo(&mut self) -> Vec<Action> {
        self.drawing_mut().map(DrawingThread::undo).unwrap_or_default()
    }

    pub fn redo(&mut self) -> Vec<Action> {
        self.drawing_mut().map(DrawingThread::redo).unwrap_or_default()
    }

    // =============================================================
    // Dialog and persistence
    // =============================================================

    pub fn on_dialog_event(&mut self, thread: ThreadId, event: &DialogEvent, _now_ms: f64) -> Vec<Action> {
        let user = self.config.user.clone();
        self.with_thread(thread, "dialog event", |t, view| t.on_dialog_event(event, view, &user))
    }

    /// Apply the service's answer to a create. `temp_id` is the id carried by
    /// the matching [`Intent::Create`](crate::host::Intent::Create).
    pub fn on_create_result(
        &mut self,
        thread: ThreadId,
        temp_id: &str,
        result: Result<Annotation, ServiceError>,
    ) -> Vec<Action> {
        self.with_thread(thread, "create result", |t, view| t.on_create_result(temp_id, result, view))
    }

    pub fn on_delete_result(
        &mut self,
        thread: ThreadId,
        annotation_id: &str,
        result: Result<(), ServiceError>,
    ) -> Vec<Action> {
        self.with_thread(thread, "delete result", |t, view| t.on_delete_result(annotation_id, result, view))
    }

    fn with_thread<F, R>(&mut self, id: ThreadId, what: &str, f: F) -> Vec<Action>
    where
        F: FnOnce(&mut Thread, &PageView) -> Result<Vec<Action>, R>,
        R: std::fmt::Display,
    {
        let Some(page) = self.registry.get(id).map(Thread::page) else {
            warn!(thread = %id, "{what} for unknown thread ignored");
            return Vec::new();
        };
        let view = match self.view(page) {
            Ok(v) => v,
            Err(err) => {
                warn!(thread = %id, error = %err, "{what} skipped");
                return Vec::new();
            }
        };
        let Some(thread) = self.registry.get_mut(id) else {
            return Vec::new();
        };
        match f(thread, &view) {
            Ok(actions) => self.settle(actions),
            Err(err) => {
                warn!(thread = %id, error = %err, "{what} rejected");
                Vec::new()
            }
        }
    }

    // =============================================================
    // Pages
    // =============================================================

    /// Rebuild a page's threads from saved records, grouped by thread id in
    /// first-seen order, and paint them.
    pub fn load_page(&mut self, page: u32, records: Vec<Annotation>) -> Vec<Action> {
        let mut order: Vec<ThreadId> = Vec::new();
        let mut groups: HashMap<ThreadId, Vec<Annotation>> = HashMap::new();
        for record in records {
            if record.location.page != page {
                warn!(page, annotation = %record.id, "record for another page ignored");
                continue;
            }
            let id = record.thread_id;
            let group = groups.entry(id).or_insert_with(|| {
                order.push(id);
                Vec::new()
            });
            group.push(record);
        }

        let mut actions = Vec::new();
        for id in order {
            let Some(group) = groups.remove(&id) else {
                continue;
            };
            if self.registry.get(id).is_some() {
                continue;
            }
            let Some(first) = group.first() else {
                continue;
            };
            let (kind, location) = (first.kind, first.location.clone());
            match Thread::create(kind, location, group, &self.config) {
                Ok(thread) => {
                    actions.push(Action::ThreadCreated { thread: id, page, kind: thread.kind() });
                    self.registry.insert(thread);
                }
                Err(err) => warn!(thread = %id, error = %err, "saved thread skipped"),
            }
        }
        info!(page, threads = self.registry.page_ids(page).len(), "page loaded");
        actions.extend(self.repaint_page(page));
        actions
    }

    /// Forget a page's threads, e.g. when the host recycles its DOM.
    pub fn unload_page(&mut self, page: u32) -> Vec<Action> {
        if self.drawing().is_some_and(|d| d.data().page() == page) {
            self.drawing = None;
        }
        let mut actions = Vec::new();
        for mut thread in self.registry.clear_page(page) {
            self.hover_exits.remove(&thread.id());
            actions.extend(thread.hide_dialog());
            if matches!(thread, Thread::Point(_)) {
                actions.push(Action::RemoveMarker { thread: thread.id() });
            }
        }
        actions
    }

    /// Re-layout after a zoom or resize: unsaved highlights are dropped and
    /// everything else is painted again.
    pub fn rerender_page(&mut self, page: u32) -> Vec<Action> {
        let pending: Vec<ThreadId> = self
            .registry
            .on_page(page)
            .filter(|t| t.is_highlight() && t.state().is_pending())
            .map(Thread::id)
            .collect();
        let mut actions = Vec::new();
        for id in pending {
            if let Some(mut thread) = self.forget(id) {
                actions.extend(thread.destroy());
            }
        }
        actions.extend(self.repaint_page(page));
        actions
    }

    pub fn rerender_all(&mut self) -> Vec<Action> {
        let pages: Vec<u32> = self.registry.pages().collect();
        pages.into_iter().flat_map(|page| self.rerender_page(page)).collect()
    }

    fn repaint_page(&mut self, page: u32) -> Vec<Action> {
        let mut actions = self.repaint_highlights(page);
        let view = match self.view(page) {
            Ok(v) => v,
            Err(err) => {
                warn!(page, error = %err, "repaint skipped");
                return actions;
            }
        };
        for id in self.registry.page_ids(page) {
            if let Some(thread @ Thread::Point(_)) = self.registry.get_mut(id) {
                match thread.show(&view) {
                    Ok(a) => actions.extend(a),
                    Err(err) => warn!(thread = %id, error = %err, "show skipped"),
                }
            }
        }
        actions.extend(self.repaint_drawings(page));
        actions
    }

    fn repaint_highlights(&mut self, page: u32) -> Vec<Action> {
        self.repaint_layer(page, Layer::Highlight, Thread::is_highlight)
    }

    fn repaint_drawings(&mut self, page: u32) -> Vec<Action> {
        let current = self.drawing;
        self.repaint_layer(page, Layer::Drawing, |t| match t {
            Thread::Drawing(d) => Some(d.data().id) != current && !d.is_empty(),
            _ => false,
        })
    }

    fn repaint_layer<F>(&mut self, page: u32, layer: Layer, wanted: F) -> Vec<Action>
    where
        F: Fn(&Thread) -> bool,
    {
        let view = match self.view(page) {
            Ok(v) => v,
            Err(err) => {
                warn!(page, error = %err, "repaint skipped");
                return Vec::new();
            }
        };
        let mut actions = vec![Action::ClearLayer { page, layer }];
        for id in self.registry.page_ids(page) {
            let Some(thread) = self.registry.get_mut(id) else {
                continue;
            };
            if !wanted(thread) {
                continue;
            }
            match thread.show(&view) {
                Ok(a) => actions.extend(a),
                Err(err) => warn!(thread = %id, error = %err, "show skipped"),
            }
        }
        actions
    }

    fn forget(&mut self, id: ThreadId) -> Option<Thread> {
        self.hover_exits.remove(&id);
        if self.drawing == Some(id) {
            self.drawing = None;
        }
        self.registry.remove(id)
    }

    /// Drop destroyed threads from the registry and repaint the layers they
    /// were painted on.
    fn settle(&mut self, actions: Vec<Action>) -> Vec<Action> {
        let mut highlight_pages = BTreeSet::new();
        let mut drawing_pages = BTreeSet::new();
        for action in &actions {
            let Action::ThreadDestroyed { thread, page } = action else {
                continue;
            };
            match self.forget(*thread) {
                Some(Thread::Highlight(_)) => {
                    highlight_pages.insert(*page);
                }
                Some(Thread::Drawing(_)) => {
                    drawing_pages.insert(*page);
                }
                Some(Thread::Point(_)) | None => {}
            }
        }

        let mut out = actions;
        for page in highlight_pages {
            out.extend(self.repaint_highlights(page));
        }
        for page in drawing_pages {
            out.extend(self.repaint_drawings(page));
        }
        out
    }
}
