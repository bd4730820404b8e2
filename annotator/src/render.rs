//! Canvas painting for engine actions.
//!
//! This module is the only place that draws on a [`web_sys::CanvasRenderingContext2d`].
//! Each page owns one canvas per [`Layer`](crate::host::Layer); the host
//! routes an [`Action`] to the right layer's context and calls
//! [`apply`]. Nothing here mutates engine state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.

use tracing::warn;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::coords::Point;
use crate::host::{Action, HighlightFill, HighlightPainter, StrokeSink, StrokeStyle, paint_quads, stroke_paths};

const STROKE_COLOR: &str = "#ff0000";
const BOUNDARY_COLOR: &str = "rgba(0, 0, 0, 0.5)";
const BOUNDARY_DASH_PX: f64 = 4.0;

/// Paint one action onto `ctx`. Actions with no pixels are ignored.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails.
pub fn apply(ctx: &CanvasRenderingContext2d, action: &Action) -> Result<(), JsValue> {
    match action {
        Action::ClearLayer { .. } => clear(ctx),
        Action::PaintHighlight { quads, fill, .. } => {
            let mut layer = CanvasLayer::new(ctx);
            paint_quads(&mut layer, quads, *fill);
            layer.finish_result()
        }
        Action::RenderDrawing { style, paths, .. } => {
            let mut layer = CanvasLayer::new(ctx);
            stroke_paths(&mut layer, *style, paths);
            layer.finish_result()
        }
        Action::DrawBoundary { rect, .. } => draw_boundary(ctx, *rect),
        _ => Ok(()),
    }
}

/// Wipe the whole canvas behind `ctx`.
///
/// # Errors
///
/// Returns `Err` if the context has lost its canvas.
pub fn clear(ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
    let canvas = ctx.canvas().ok_or_else(|| JsValue::from_str("context has no canvas"))?;
    ctx.clear_rect(0.0, 0.0, f64::from(canvas.width()), f64::from(canvas.height()));
    Ok(())
}

fn draw_boundary(ctx: &CanvasRenderingContext2d, [x, y, w, h]: [f64; 4]) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_stroke_style_str(BOUNDARY_COLOR);
    ctx.set_line_width(1.0);
    let dash = js_sys::Array::of2(&JsValue::from_f64(BOUNDARY_DASH_PX), &JsValue::from_f64(BOUNDARY_DASH_PX));
    ctx.set_line_dash(&dash)?;
    ctx.stroke_rect(x, y, w, h);
    ctx.restore();
    Ok(())
}

// =============================================================
// CanvasLayer
// =============================================================

/// [`HighlightPainter`] and [`StrokeSink`] over a 2D context.
///
/// The traits are infallible, so the first `Canvas2D` error is kept and
/// reported by [`CanvasLayer::finish_result`].
pub struct CanvasLayer<'a> {
    ctx: &'a CanvasRenderingContext2d,
    error: Option<JsValue>,
}

impl<'a> CanvasLayer<'a> {
    #[must_use]
    pub fn new(ctx: &'a CanvasRenderingContext2d) -> Self {
        Self { ctx, error: None }
    }

    /// # Errors
    ///
    /// The first `Canvas2D` failure seen while painting.
    pub fn finish_result(self) -> Result<(), JsValue> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&mut self, result: Result<(), JsValue>) {
        if let Err(err) = result {
            warn!(error = ?err, "canvas call failed");
            self.error.get_or_insert(err);
        }
    }

    fn trace_quad(&self, quad: &[f64; 8]) {
        self.ctx.begin_path();
        self.ctx.move_to(quad[0], quad[1]);
        self.ctx.line_to(quad[2], quad[3]);
        self.ctx.line_to(quad[4], quad[5]);
        self.ctx.line_to(quad[6], quad[7]);
        self.ctx.close_path();
    }
}

impl HighlightPainter for CanvasLayer<'_> {
    fn erase_quad(&mut self, quad: &[f64; 8]) {
        self.ctx.save();
        let mode = self.ctx.set_global_composite_operation("destination-out");
        self.record(mode);
        self.ctx.set_fill_style_str(HighlightFill::Erase.css());
        self.trace_quad(quad);
        self.ctx.fill();
        self.ctx.restore();
    }

    fn fill_quad(&mut self, quad: &[f64; 8], fill: HighlightFill) {
        self.ctx.save();
        self.ctx.set_fill_style_str(fill.css());
        self.trace_quad(quad);
        self.ctx.fill();
        self.ctx.restore();
    }
}

impl StrokeSink for CanvasLayer<'_> {
    fn set_style(&mut self, style: StrokeStyle) {
        self.ctx.set_line_width(style.line_width);
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");
        self.ctx.set_stroke_style_str(STROKE_COLOR);
    }

    fn begin(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, p: Point) {
        self.ctx.move_to(p.x, p.y);
    }

    fn quadratic_curve_to(&mut self, control: Point, end: Point) {
        self.ctx.quadratic_curve_to(control.x, control.y, end.x, end.y);
    }

    fn line_to(&mut self, p: Point) {
        self.ctx.line_to(p.x, p.y);
    }

    fn finish(&mut self) {
        self.ctx.stroke();
    }
}
