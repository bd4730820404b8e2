//! Annotation engine for rendered documents.
//!
//! This crate is compiled to WebAssembly and runs in the browser next to a
//! document viewer. It owns the annotation side of the page: turning text
//! selections into highlight quads, point comments and freehand drawings,
//! tracking each thread's hover and dialog state, and deciding what to
//! repaint. The host JavaScript layer wires DOM events in, shows dialogs,
//! talks to the annotation service and applies the resulting
//! [`host::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Pointer-event orchestration, throttling and timers |
//! | [`thread`] | Highlight and point threads and their state machine |
//! | [`drawing`] | Freehand drawing threads |
//! | [`registry`] | Live threads by id and by page |
//! | [`coords`] | Document/screen conversions and page geometry |
//! | [`quad`] | Quad points, hit tests and dialog anchors |
//! | [`path`] | Smoothed drawing paths |
//! | [`strokes`] | Undo/redo stroke history |
//! | [`model`] | Persisted annotation shapes |
//! | [`host`] | Collaborator traits and the [`host::Action`] output |
//! | [`render`] | Canvas painting of actions |
//! | [`raf`] | `requestAnimationFrame` scheduler |
//! | [`config`] | Engine tunables |
//! | [`error`] | Error types |
//! | [`consts`] | Shared numeric constants |

pub mod config;
pub mod consts;
pub mod coords;
pub mod drawing;
pub mod engine;
pub mod error;
pub mod host;
pub mod model;
pub mod path;
pub mod quad;
pub mod raf;
pub mod registry;
pub mod render;
pub mod strokes;
pub mod thread;

#[cfg(test)]
#[path = "fakes_test.rs"]
pub(crate) mod fakes;
