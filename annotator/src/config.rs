//! Engine tunables, with defaults and environment overrides.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::Deserialize;

use crate::consts::{
    BASE_LINE_WIDTH_PX, CURSOR_RESTORE_MS, DRAG_THRESHOLD_PX, DRAW_BORDER_OFFSET, DRAW_RENDER_THRESHOLD_MS,
    HOVER_TIMEOUT_MS, MOUSEMOVE_THROTTLE_MS, PAGE_PADDING_BOTTOM_PX, PAGE_PADDING_TOP_PX, POINT_MARKER_RADIUS_PX,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum interval between processed pointer moves.
    pub throttle_ms: f64,
    /// Hover-exit debounce for highlights.
    pub hover_timeout_ms: f64,
    /// Delay before the hover cursor is restored.
    pub cursor_restore_ms: f64,
    /// Per-axis displacement separating a drag from a click.
    pub drag_threshold_px: f64,
    /// Minimum interval between two drawing renders.
    pub draw_render_threshold_ms: f64,
    /// Stroke width at 100% zoom.
    pub base_line_width_px: f64,
    pub page_padding_top_px: f64,
    pub page_padding_bottom_px: f64,
    /// Slop around drawing bounds when selecting, in document units.
    pub draw_border_offset: f64,
    pub point_marker_radius_px: f64,
    /// Identity stamped on optimistic annotations.
    pub user: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            throttle_ms: MOUSEMOVE_THROTTLE_MS,
            hover_timeout_ms: HOVER_TIMEOUT_MS,
            cursor_restore_ms: CURSOR_RESTORE_MS,
            drag_threshold_px: DRAG_THRESHOLD_PX,
            draw_render_threshold_ms: DRAW_RENDER_THRESHOLD_MS,
            base_line_width_px: BASE_LINE_WIDTH_PX,
            page_padding_top_px: PAGE_PADDING_TOP_PX,
            page_padding_bottom_px: PAGE_PADDING_BOTTOM_PX,
            draw_border_offset: DRAW_BORDER_OFFSET,
            point_marker_radius_px: POINT_MARKER_RADIUS_PX,
            user: String::new(),
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// Recognized:
    /// - `ANNOTATOR_THROTTLE_MS`
    /// - `ANNOTATOR_HOVER_TIMEOUT_MS`
    /// - `ANNOTATOR_CURSOR_RESTORE_MS`
    /// - `ANNOTATOR_DRAG_THRESHOLD_PX`
    /// - `ANNOTATOR_DRAW_RENDER_THRESHOLD_MS`
    /// - `ANNOTATOR_BASE_LINE_WIDTH_PX`
    /// - `ANNOTATOR_USER`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            throttle_ms: env_parse("ANNOTATOR_THROTTLE_MS", defaults.throttle_ms),
            hover_timeout_ms: env_parse("ANNOTATOR_HOVER_TIMEOUT_MS", defaults.hover_timeout_ms),
            cursor_restore_ms: env_parse("ANNOTATOR_CURSOR_RESTORE_MS", defaults.cursor_restore_ms),
            drag_threshold_px: env_parse("ANNOTATOR_DRAG_THRESHOLD_PX", defaults.drag_threshold_px),
            draw_render_threshold_ms: env_parse("ANNOTATOR_DRAW_RENDER_THRESHOLD_MS", defaults.draw_render_threshold_ms),
            base_line_width_px: env_parse("ANNOTATOR_BASE_LINE_WIDTH_PX", defaults.base_line_width_px),
            user: std::env::var("ANNOTATOR_USER").unwrap_or(defaults.user.clone()),
            ..defaults
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
