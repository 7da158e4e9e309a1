use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowBuilder, WindowId};

use crate::error::RendererError;
use crate::gpu::{GpuContext, GpuRenderer};
use crate::program::link;
use crate::render::{EventPump, LoopEvent, RenderLoop};
use crate::runtime::SystemTimeSource;
use crate::shaders::{FRAGMENT, VERTEX};
use crate::types::RendererConfig;

/// Opens the window, builds the pipeline, and renders until a quit signal.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new()
        .map_err(|err| RendererError::context_init("failed to create event loop", err))?;

    let (width, height) = config.window_size;
    let mut builder = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height));
    if config.fullscreen {
        let monitor = event_loop.primary_monitor();
        if monitor.is_none() {
            tracing::warn!("no primary monitor reported; using the current one for fullscreen");
        }
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(monitor)));
    }
    let window = builder
        .build(&event_loop)
        .map_err(|err| RendererError::context_init("failed to create window", err))?;
    let window = Arc::new(window);

    let context = GpuContext::new(
        window.clone(),
        window.inner_size(),
        config.sample_count,
        config.vsync,
    )?;

    let vertex = VERTEX.compile()?;
    let fragment = FRAGMENT.compile()?;
    let program = link(vertex, fragment)?;
    tracing::debug!(?program, "linked quad program");

    let renderer = GpuRenderer::new(context, &program).context("failed to build quad pipeline")?;
    let mut render_loop = RenderLoop::new(renderer, SystemTimeSource::new(), config.vsync);
    let mut events = WinitEvents::new(event_loop, &window);

    let outcome = render_loop.run(&mut events);
    eprintln!("Exiting ...");
    render_loop.shutdown();
    // The surface must go before the event loop that owns its display connection.
    drop(render_loop);
    drop(events);
    outcome
}

/// Non-blocking window event source backed by `pump_events`.
struct WinitEvents {
    event_loop: EventLoop<()>,
    window_id: WindowId,
}

impl WinitEvents {
    fn new(event_loop: EventLoop<()>, window: &Window) -> Self {
        Self {
            event_loop,
            window_id: window.id(),
        }
    }
}

impl EventPump for WinitEvents {
    fn pump(&mut self) -> Vec<LoopEvent> {
        let window_id = self.window_id;
        let mut pending = Vec::new();
        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _elwt| {
                let Event::WindowEvent { window_id: id, event } = event else {
                    return;
                };
                if id != window_id {
                    return;
                }
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        pending.push(LoopEvent::Stop);
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if is_quit_key(&event.logical_key, event.state, event.repeat) {
                            pending.push(LoopEvent::Stop);
                        }
                    }
                    WindowEvent::Resized(size) => {
                        pending.push(LoopEvent::Resized {
                            width: size.width,
                            height: size.height,
                        });
                    }
                    _ => {}
                }
            });
        if let PumpStatus::Exit(code) = status {
            tracing::debug!(code, "event loop exited");
            pending.push(LoopEvent::Stop);
        }
        pending
    }
}

/// `Escape` or `Q` (either case), on first press only.
fn is_quit_key(key: &Key, state: ElementState, repeat: bool) -> bool {
    if state != ElementState::Pressed || repeat {
        return false;
    }
    match key {
        Key::Named(NamedKey::Escape) => true,
        Key::Character(value) => value.as_str().eq_ignore_ascii_case("q"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_and_q_quit() {
        let escape = Key::Named(NamedKey::Escape);
        assert!(is_quit_key(&escape, ElementState::Pressed, false));
        assert!(is_quit_key(&Key::Character("q".into()), ElementState::Pressed, false));
        assert!(is_quit_key(&Key::Character("Q".into()), ElementState::Pressed, false));
    }

    #[test]
    fn other_keys_releases_and_repeats_do_not_quit() {
        assert!(!is_quit_key(&Key::Character("w".into()), ElementState::Pressed, false));
        assert!(!is_quit_key(&Key::Named(NamedKey::Space), ElementState::Pressed, false));
        let escape = Key::Named(NamedKey::Escape);
        assert!(!is_quit_key(&escape, ElementState::Released, false));
        assert!(!is_quit_key(&escape, ElementState::Pressed, true));
    }
}
