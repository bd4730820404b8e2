//! [`Scheduler`] over `window.requestAnimationFrame`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::Window;

use crate::host::{Scheduler, TickHandle};

type FrameCallback = Closure<dyn FnMut(f64)>;

/// Requests browser frames and hands each timestamp to `on_tick`.
///
/// The host's `on_tick` typically borrows the engine and calls
/// [`Engine::on_frame`](crate::engine::Engine::on_frame); it runs after the
/// request returns, so the engine is never borrowed twice.
pub struct RafScheduler {
    window: Window,
    on_tick: Rc<dyn Fn(f64)>,
    /// Closures stay alive until their frame fires or is cancelled.
    live: Rc<RefCell<HashMap<i32, FrameCallback>>>,
}

impl RafScheduler {
    #[must_use]
    pub fn new(window: Window, on_tick: Rc<dyn Fn(f64)>) -> Self {
        Self { window, on_tick, live: Rc::new(RefCell::new(HashMap::new())) }
    }
}

impl Scheduler for RafScheduler {
    fn request_tick(&mut self) -> Option<TickHandle> {
        let on_tick = Rc::clone(&self.on_tick);
        let live = Rc::clone(&self.live);
        let id_slot: Rc<RefCell<Option<i32>>> = Rc::new(RefCell::new(None));
        let id_for_cb = Rc::clone(&id_slot);

        let cb = Closure::wrap(Box::new(move |ts: f64| {
            // drop our own closure after the call returns
            let own = id_for_cb.borrow_mut().take().and_then(|id| live.borrow_mut().remove(&id));
            on_tick(ts);
            drop(own);
        }) as Box<dyn FnMut(f64)>);

        match self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => {
                *id_slot.borrow_mut() = Some(id);
                self.live.borrow_mut().insert(id, cb);
                Some(TickHandle(i64::from(id)))
            }
            Err(err) => {
                warn!(error = ?err, "requestAnimationFrame failed");
                None
            }
        }
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        let Ok(id) = i32::try_from(handle.0) else {
            warn!(handle = handle.0, "tick handle out of range");
            return;
        };
        if let Err(err) = self.window.cancel_animation_frame(id) {
            warn!(error = ?err, "cancelAnimationFrame failed");
        }
        self.live.borrow_mut().remove(&id);
    }
}
