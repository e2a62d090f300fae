//! Continuous redraw driven by a host frame scheduler.
//!
//! The host owns the platform primitive (`requestAnimationFrame` in the browser) behind
//! [`FrameScheduler`]; the loop decides when to ask for the next frame and runs the
//! per-frame steps in a fixed order:
//!
//! 1. advance tweens
//! 2. update camera controls
//! 3. render the 3D scene
//! 4. render the overlay layers
//! 5. schedule the next frame

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use foundation::time::Time;

use crate::frame::Frame;

/// Opaque id of a pending frame request, as returned by the host.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FrameToken(pub i32);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoopError {
    #[error("frame request failed: {0}")]
    RequestFailed(String),
    #[error("render loop already running")]
    AlreadyRunning,
}

pub trait FrameScheduler {
    fn request_frame(&mut self) -> Result<FrameToken, LoopError>;
    fn cancel_frame(&mut self, token: FrameToken);
}

impl<S: FrameScheduler + ?Sized> FrameScheduler for Box<S> {
    fn request_frame(&mut self) -> Result<FrameToken, LoopError> {
        (**self).request_frame()
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        (**self).cancel_frame(token)
    }
}

/// Work done once per frame. Render failures are logged and do not stop the loop.
pub trait FrameSteps {
    type Error: fmt::Display;

    fn advance_tweens(&mut self, frame: Frame);
    fn update_controls(&mut self, frame: Frame);
    fn render_scene(&mut self) -> Result<(), Self::Error>;
    fn render_overlays(&mut self) -> Result<(), Self::Error>;
}

/// Clonable stop switch for a [`RenderLoop`]. Once stopped, a loop never runs again.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    stopped: Rc<Cell<bool>>,
}

impl LoopHandle {
    pub fn stop(&self) {
        self.stopped.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    Stopped,
}

pub struct RenderLoop<S> {
    scheduler: S,
    handle: LoopHandle,
    pending: Option<FrameToken>,
    started: bool,
    frame: Option<Frame>,
}

impl<S: FrameScheduler> RenderLoop<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            handle: LoopHandle::default(),
            pending: None,
            started: false,
            frame: None,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.handle.is_stopped()
    }

    pub fn pending(&self) -> Option<FrameToken> {
        self.pending
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.frame
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Requests the first frame.
    pub fn start(&mut self) -> Result<(), LoopError> {
        if self.started {
            return Err(LoopError::AlreadyRunning);
        }
        if self.handle.is_stopped() {
            return Ok(());
        }
        self.pending = Some(self.scheduler.request_frame()?);
        self.started = true;
        tracing::debug!("render loop started");
        Ok(())
    }

    /// Runs one frame at host timestamp `now`, then schedules the next one.
    pub fn tick<T: FrameSteps>(&mut self, now: Time, steps: &mut T) -> Result<TickOutcome, LoopError> {
        self.pending = None;
        if self.handle.is_stopped() || !self.started {
            return Ok(TickOutcome::Stopped);
        }

        let frame = match self.frame {
            Some(prev) => prev.advance(now),
            None => Frame::first(now),
        };
        self.frame = Some(frame);

        steps.advance_tweens(frame);
        steps.update_controls(frame);
        if let Err(err) = steps.render_scene() {
            tracing::warn!(frame = frame.index, error = %err, "scene render failed");
        }
        if let Err(err) = steps.render_overlays() {
            tracing::warn!(frame = frame.index, error = %err, "overlay render failed");
        }

        // A step may have stopped the loop through a handle.
        if self.handle.is_stopped() {
            return Ok(TickOutcome::Stopped);
        }
        self.pending = Some(self.scheduler.request_frame()?);
        Ok(TickOutcome::Rendered)
    }

    /// Stops the loop and cancels the pending frame request.
    pub fn stop(&mut self) {
        self.handle.stop();
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }
        tracing::debug!(frames = self.frame.map(|f| f.index + 1).unwrap_or(0), "render loop stopped");
    }
}
