//! The per-frame state machine.
//!
//! `RenderLoop` owns the animation state and drives two collaborators: a
//! [`FrameTarget`] that turns [`FrameParams`] into pixels, and an
//! [`EventPump`] that reports quit and resize requests. Neither collaborator
//! sees the clock or the frame counter.

use anyhow::Result;

use crate::clock::AnimationClock;
use crate::fps::{FpsSample, FrameCounter};
use crate::runtime::{Micros, TimeSource};

/// Opaque black.
pub const CLEAR_COLOR: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

/// Everything the target needs to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub clear_color: [f64; 4],
    pub angle: f32,
    pub vertex_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Drawn,
    /// Nothing was drawn (for example the surface had to be reconfigured).
    Skipped,
}

/// Device side of a frame: clear, bind, draw, present.
pub trait FrameTarget {
    /// Clears to `frame.clear_color`, activates the pipeline, writes the angle
    /// uniform, binds the geometry, and draws a triangle strip.
    fn draw(&mut self, frame: &FrameParams) -> Result<FrameStatus>;

    /// Presents the frame drawn by the last successful [`draw`](Self::draw)
    /// and applies the vsync preference for the frames that follow.
    fn present(&mut self, vsync: bool) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32);

    fn vertex_count(&self) -> u32;

    /// Releases device resources. Must be safe to call more than once.
    fn release(&mut self);
}

/// Window-side requests observed between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    Stop,
    Resized { width: u32, height: u32 },
}

/// Drains pending window events without blocking.
pub trait EventPump {
    fn pump(&mut self) -> Vec<LoopEvent>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Animation state owned by the loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub clock: AnimationClock,
    pub counter: FrameCounter,
}

impl RenderState {
    pub fn new(now: Micros) -> Self {
        Self {
            clock: AnimationClock::new(now),
            counter: FrameCounter::new(now),
        }
    }
}

pub struct RenderLoop<T: FrameTarget, S: TimeSource> {
    target: T,
    time: S,
    render: RenderState,
    state: LoopState,
    vsync: bool,
}

impl<T: FrameTarget, S: TimeSource> RenderLoop<T, S> {
    pub fn new(target: T, mut time: S, vsync: bool) -> Self {
        let render = RenderState::new(time.now());
        Self {
            target,
            time,
            render,
            state: LoopState::Running,
            vsync,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            tracing::debug!("render loop stopping");
        }
        self.state = LoopState::Stopped;
    }

    /// Renders one frame and advances the clock and frame counter.
    ///
    /// The angle drawn is the one computed at the end of the previous frame.
    /// Skipped frames leave the clock untouched; the next tick absorbs the
    /// elapsed time. Returns the FPS sample if this frame closed a second.
    pub fn frame(&mut self) -> Result<Option<FpsSample>> {
        if self.state == LoopState::Stopped {
            return Ok(None);
        }

        let params = FrameParams {
            clear_color: CLEAR_COLOR,
            angle: self.render.clock.angle() as f32,
            vertex_count: self.target.vertex_count(),
        };
        if self.target.draw(&params)? == FrameStatus::Skipped {
            tracing::trace!("frame skipped");
            return Ok(None);
        }
        self.target.present(self.vsync)?;

        let now = self.time.now();
        self.render.clock.tick(now);
        Ok(self.render.counter.record_frame(now))
    }

    /// Runs frames until an event stops the loop.
    ///
    /// Events are pumped once per iteration after presentation, so at most
    /// one extra frame renders after a stop request arrives.
    pub fn run<P: EventPump>(&mut self, events: &mut P) -> Result<()> {
        while self.state == LoopState::Running {
            if let Some(sample) = self.frame()? {
                println!("{sample}");
                tracing::debug!(
                    fps = sample.frames(),
                    angle = self.render.clock.angle(),
                    "render stats"
                );
            }

            for event in events.pump() {
                match event {
                    LoopEvent::Stop => self.stop(),
                    LoopEvent::Resized { width, height } => self.target.resize(width, height),
                }
            }
        }
        Ok(())
    }

    /// Stops the loop and releases the target's device resources.
    pub fn shutdown(&mut self) {
        self.stop();
        self.target.release();
    }
}

impl<T: FrameTarget, S: TimeSource> Drop for RenderLoop<T, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
