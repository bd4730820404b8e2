//! Freehand drawing threads.
//!
//! A drawing collects strokes while the engine is in draw mode. Pointer input
//! only appends coordinates and marks the thread dirty; the in-progress layer
//! is repainted from [`DrawingThread::on_frame`] at most once per frame, so a
//! burst of moves costs one render.

#[cfg(test)]
#[path = "drawing_test.rs"]
mod drawing_test;

use tracing::debug;

use crate::config::EngineConfig;
use crate::coords::{Dimensions, PageView, Point};
use crate::error::{GeometryError, ServiceError, ThreadError};
use crate::host::{Action, DialogEvent, Layer, PointerEvent, StrokeSink, StrokeStyle, stroke_paths};
use crate::model::{Annotation, AnnotationType, Location, LocationShape};
use crate::path::{BoundingBox, DrawingPath, DrawingPathRecord, Sample};
use crate::strokes::StrokeStack;
use crate::thread::{DeleteOutcome, ThreadData, ThreadState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawState {
    Idle,
    /// A stroke is in progress.
    Draw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawingThread {
    data: ThreadData,
    draw_state: DrawState,
    strokes: StrokeStack<DrawingPath>,
    pending_path: Option<DrawingPath>,
    base_line_width: f64,
    line_width: f64,
    border_offset: f64,
    render_wanted: bool,
    last_render_ms: Option<f64>,
}

impl DrawingThread {
    /// An empty drawing on `page`, started by the first pointer-down.
    #[must_use]
    pub fn new(page: u32, dimensions: Dimensions, config: &EngineConfig) -> Self {
        let location = Location {
            page,
            dimensions: Some(dimensions),
            shape: LocationShape::Drawing { paths: Vec::new(), bounds: None },
        };
        Self::with_data(ThreadData::new(AnnotationType::Draw, location, Vec::new()), config)
    }

    /// Rebuild a saved drawing. Its strokes land in the history so they can
    /// be hit-tested and repainted.
    #[must_use]
    pub fn from_annotations(location: Location, annotations: Vec<Annotation>, config: &EngineConfig) -> Self {
        let mut thread = Self::with_data(ThreadData::new(AnnotationType::Draw, location, annotations), config);
        if let LocationShape::Drawing { paths, .. } = &thread.data.location.shape {
            for record in paths {
                thread.strokes.insert(DrawingPath::from(record));
            }
        }
        thread
    }

    fn with_data(data: ThreadData, config: &EngineConfig) -> Self {
        Self {
            data,
            draw_state: DrawState::Idle,
            strokes: StrokeStack::new(),
            pending_path: None,
            base_line_width: config.base_line_width_px,
            line_width: config.base_line_width_px,
            border_offset: config.draw_border_offset,
            render_wanted: false,
            last_render_ms: None,
        }
    }

    #[must_use]
    pub fn data(&self) -> &ThreadData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ThreadData {
        &mut self.data
    }

    #[must_use]
    pub fn draw_state(&self) -> DrawState {
        self.draw_state
    }

    #[must_use]
    pub fn strokes(&self) -> &StrokeStack<DrawingPath> {
        &self.strokes
    }

    /// True while no committed or in-progress stroke has any point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.pending_path.as_ref().is_none_or(DrawingPath::is_empty)
    }

    /// Whether the engine should keep a frame requested for this thread.
    #[must_use]
    pub fn wants_frame(&self) -> bool {
        self.render_wanted
    }

    fn style(&self) -> StrokeStyle {
        StrokeStyle { line_width: self.line_width }
    }

    // =============================================================
    // Stroke input
    // =============================================================

    /// Begin a stroke at `doc` (document space) / `browser` (page-relative
    /// screen space).
    pub fn handle_start(&mut self, doc: Point, browser: Point, zoom: f64) {
        self.draw_state = DrawState::Draw;
        self.line_width = self.base_line_width * zoom;
        let mut path = DrawingPath::new();
        path.add_coordinate(Sample::from(doc), Some(browser));
        self.pending_path = Some(path);
        self.render_wanted = true;
        debug!(thread = %self.data.id, page = self.data.page(), "stroke started");
    }

    /// Append to the current stroke. Returns false when no stroke is open.
    pub fn handle_move(&mut self, doc: Point, browser: Point) -> bool {
        if self.draw_state != DrawState::Draw {
            return false;
        }
        let Some(path) = self.pending_path.as_mut() else {
            return false;
        };
        path.add_coordinate(Sample::from(doc), Some(browser));
        self.render_wanted = true;
        true
    }

    /// Close the current stroke. Non-empty paths move into the history.
    pub fn handle_stop(&mut self) -> Vec<Action> {
        self.render_wanted = false;
        self.draw_state = DrawState::Idle;
        if let Some(path) = self.pending_path.take().filter(|p| !p.is_empty()) {
            debug!(thread = %self.data.id, points = path.len(), "stroke sealed");
            self.strokes.insert(path);
        }
        let mut actions = self.render_in_progress();
        actions.push(self.available_actions());
        actions
    }

    pub fn undo(&mut self) -> Vec<Action> {
        if !self.strokes.undo() {
            return Vec::new();
        }
        let mut actions = self.render_in_progress();
        actions.push(self.available_actions());
        actions
    }

    pub fn redo(&mut self) -> Vec<Action> {
        if !self.strokes.redo() {
            return Vec::new();
        }
        let mut actions = self.render_in_progress();
        actions.push(self.available_actions());
        actions
    }

    fn available_actions(&self) -> Action {
        let (undo, redo) = self.strokes.counts();
        Action::AvailableActions { thread: self.data.id, undo, redo }
    }

    /// Committed strokes followed by the open one.
    fn live_paths(&self) -> Vec<DrawingPath> {
        let mut paths = self.strokes.items().to_vec();
        paths.extend(self.pending_path.iter().filter(|p| !p.is_empty()).cloned());
        paths
    }

    /// Replay committed and open strokes into `sink`.
    pub fn render<S: StrokeSink + ?Sized>(&self, sink: &mut S) {
        stroke_paths(sink, self.style(), &self.live_paths());
    }

    fn render_in_progress(&self) -> Vec<Action> {
        let page = self.data.page();
        vec![
            Action::ClearLayer { page, layer: Layer::DrawingInProgress },
            Action::RenderDrawing {
                thread: self.data.id,
                page,
                layer: Layer::DrawingInProgress,
                style: self.style(),
                paths: self.live_paths(),
            },
        ]
    }

    /// Repaint the in-progress layer if something changed and at least
    /// `threshold_ms` passed since the previous render.
    pub fn on_frame(&mut self, now_ms: f64, threshold_ms: f64) -> Vec<Action> {
        if !self.render_wanted {
            return Vec::new();
        }
        if self.last_render_ms.is_some_and(|last| now_ms - last < threshold_ms) {
            return Vec::new();
        }
        self.render_wanted = false;
        self.last_render_ms = Some(now_ms);
        self.render_in_progress()
    }

    // =============================================================
    // Persistence
    // =============================================================

    /// Seal any open stroke and persist the drawing. Never call on an empty
    /// drawing; the engine destroys those instead.
    ///
    /// # Errors
    ///
    /// A create already in flight, or the page is not laid out.
    pub fn save(&mut self, view: &PageView, user: &str) -> Result<Vec<Action>, ThreadError> {
        let mut actions = Vec::new();
        if self.draw_state == DrawState::Draw {
            actions.extend(self.handle_stop());
        }
        let records: Vec<DrawingPathRecord> = self.strokes.items().iter().map(DrawingPathRecord::from).collect();
        self.data.location.shape =
            LocationShape::Drawing { paths: records, bounds: Some(self.strokes.bounding_box()) };
        let persist = self.data.begin_create(AnnotationType::Draw, "", user)?;
        self.data.state = ThreadState::Inactive;
        let shown = match self.show(view) {
            Ok(shown) => shown,
            Err(err) => {
                self.data.abandon_create();
                return Err(err.into());
            }
        };
        actions.push(persist);
        actions.push(Action::ClearLayer { page: self.data.page(), layer: Layer::DrawingInProgress });
        actions.extend(shown);
        Ok(actions)
    }

    /// # Errors
    ///
    /// See [`ThreadData::finish_create`].
    pub fn on_create_result(
        &mut self,
        temp_id: &str,
        result: Result<Annotation, ServiceError>,
        _view: &PageView,
    ) -> Result<Vec<Action>, ThreadError> {
        let Some(failure) = self.data.finish_create(temp_id, result)? else {
            return Ok(Vec::new());
        };
        let mut actions = vec![Action::Failure(failure)];
        // an unsaved drawing cannot be resumed once draw mode moved on
        if self.data.annotations.is_empty() {
            actions.extend(self.destroy());
        }
        Ok(actions)
    }

    /// # Errors
    ///
    /// See [`ThreadData::finish_delete`].
    pub fn on_delete_result(
        &mut self,
        annotation_id: &str,
        result: Result<(), ServiceError>,
    ) -> Result<Vec<Action>, ThreadError> {
        match self.data.finish_delete(annotation_id, result)? {
            DeleteOutcome::Destroy | DeleteOutcome::DestroyWithBlank(_) => Ok(self.destroy()),
            DeleteOutcome::CancelFirstComment | DeleteOutcome::Reshow => Ok(Vec::new()),
            DeleteOutcome::Failed(failure) => Ok(vec![Action::Failure(failure)]),
        }
    }

    // =============================================================
    // Selection and display
    // =============================================================

    /// Whether `doc` falls within the drawing's bounds widened by the
    /// selection slop.
    #[must_use]
    pub fn is_hit(&self, doc: Point) -> bool {
        self.strokes.bounding_box().expand(self.border_offset).contains(doc)
    }

    /// Slop-expanded bounds as `[x, y, width, height]` in page-relative
    /// screen pixels. `None` for an empty drawing.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn browser_boundary(&self, view: &PageView) -> Result<Option<[f64; 4]>, GeometryError> {
        let bounds: BoundingBox = self.strokes.bounding_box().expand(self.border_offset);
        if bounds.is_empty() {
            return Ok(None);
        }
        let map = view.document_mapper(self.data.location.dimensions)?;
        let a = map(Point::new(bounds.min_x, bounds.min_y));
        let b = map(Point::new(bounds.max_x, bounds.max_y));
        Ok(Some([a.x.min(b.x), a.y.min(b.y), (b.x - a.x).abs(), (b.y - a.y).abs()]))
    }

    /// Paint the committed strokes on the drawing layer, with the boundary
    /// and dialog while selected. Callers clear the layer first.
    ///
    /// # Errors
    ///
    /// Fails when the page is not laid out.
    pub fn show(&mut self, view: &PageView) -> Result<Vec<Action>, GeometryError> {
        let map = view.document_mapper(self.data.location.dimensions)?;
        self.strokes.apply_to_items(|path| path.generate_browser_path(|p| Some(map(p))), true);
        self.line_width = self.base_line_width * view.zoom;

        let page = self.data.page();
        let mut actions = vec![Action::RenderDrawing {
            thread: self.data.id,
            page,
            layer: Layer::Drawing,
            style: self.style(),
            paths: self.strokes.items().to_vec(),
        }];
        match (self.data.state, self.browser_boundary(view)?) {
            (ThreadState::Hover, Some(rect)) => {
                actions.push(Action::DrawBoundary { thread: self.data.id, page, rect });
                actions.push(self.data.show_dialog(Point::new(rect[0] + rect[2], rect[1])));
            }
            _ => actions.extend(self.data.hide_dialog()),
        }
        Ok(actions)
    }

    /// Deselect. The engine repaints the drawing layer afterwards.
    pub fn reset(&mut self) -> Vec<Action> {
        self.data.state = ThreadState::Inactive;
        self.data.hide_dialog().into_iter().collect()
    }

    pub fn hide_dialog(&mut self) -> Vec<Action> {
        self.data.hide_dialog().into_iter().collect()
    }

    pub fn destroy(&mut self) -> Vec<Action> {
        self.render_wanted = false;
        let mut actions = vec![Action::ClearLayer { page: self.data.page(), layer: Layer::DrawingInProgress }];
        actions.extend(self.data.destroy());
        actions
    }

    /// Select when the click lands inside the slop-expanded bounds or the
    /// dialog.
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
        let doc = view.document_from_client(event.client)?;
        if !consumed && (event.dialog == Some(self.data.id) || self.is_hit(doc)) {
            self.data.state = ThreadState::Hover;
            return Ok((true, Vec::new()));
        }
        Ok((false, self.reset()))
    }

    /// # Errors
    ///
    /// Unknown annotation, permission or in-flight failures.
    pub fn on_dialog_event(&mut self, event: &DialogEvent) -> Result<Vec<Action>, ThreadError> {
        match event {
            DialogEvent::Delete { annotation_id } => {
                let id = match annotation_id {
                    Some(id) => id.clone(),
                    None => self.data.first_annotation_id()?,
                };
                Ok(vec![self.data.begin_delete(&id)?])
            }
            DialogEvent::Cancel => Ok(self.reset()),
            DialogEvent::Draw | DialogEvent::Comment | DialogEvent::CommentPost { .. } => Ok(Vec::new()),
        }
    }
}
