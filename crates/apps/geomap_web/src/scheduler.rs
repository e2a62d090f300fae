use runtime::{FrameScheduler, FrameToken, LoopError};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

/// Frame scheduling through `requestAnimationFrame`.
///
/// The callback receives the rAF timestamp in milliseconds. Dropping the scheduler drops
/// the callback, so it must not outlive a cancelled request.
pub struct RafScheduler {
    window: web_sys::Window,
    callback: Closure<dyn FnMut(f64)>,
}

impl RafScheduler {
    pub fn new(window: web_sys::Window, on_frame: impl FnMut(f64) + 'static) -> Self {
        Self {
            window,
            callback: Closure::new(on_frame),
        }
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> Result<FrameToken, LoopError> {
        self.window
            .request_animation_frame(self.callback.as_ref().unchecked_ref())
            .map(FrameToken)
            .map_err(|e| LoopError::RequestFailed(format!("{e:?}")))
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if let Err(e) = self.window.cancel_animation_frame(token.0) {
            tracing::warn!(error = ?e, "cancelAnimationFrame failed");
        }
    }
}
