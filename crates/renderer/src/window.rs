use std::sync::Arc;

use scheduler::{FrameScheduler, TickOutcome};
use tracing::{error, info};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::assets::{ShaderSources, SurfaceImages};
use crate::error::{RenderError, Result};
use crate::gpu::GpuState;
use crate::types::RendererConfig;

/// Opens the window, builds the GPU state and drives `scheduler` from redraw
/// events until it stops or the window closes.
pub(crate) fn run_window(
    config: &RendererConfig,
    mut scheduler: FrameScheduler,
    shaders: &ShaderSources,
    images: &SurfaceImages,
) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| {
        RenderError::SurfaceUnavailable(format!("failed to create event loop: {err}"))
    })?;

    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| {
            RenderError::SurfaceUnavailable(format!("failed to create window: {err}"))
        })?;
    let window = Arc::new(window);

    let mut gpu = pollster::block_on(GpuState::new(
        window.clone(),
        config.power,
        shaders,
        images,
    ))?;

    if let Err(err) = scheduler.start() {
        info!("{err}; not entering the frame loop");
        return Ok(());
    }
    window.request_redraw();

    let mut failure = None;
    let run_result = event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        let Event::WindowEvent { window_id, event } = event else {
            return;
        };
        if window_id != window.id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                scheduler.stop();
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                {
                    scheduler.stop();
                    elwt.exit();
                }
            }
            WindowEvent::Resized(new_size) => {
                gpu.resize(new_size);
            }
            WindowEvent::RedrawRequested => match scheduler.tick(&mut gpu) {
                Ok(TickOutcome::Rendered { .. } | TickOutcome::Skipped { .. }) => {
                    window.request_redraw()
                }
                Ok(TickOutcome::Stopped) => elwt.exit(),
                Ok(TickOutcome::Idle) => {}
                Err(err) => {
                    error!(error = %err, "frame loop terminated");
                    failure = Some(err);
                    elwt.exit();
                }
            },
            _ => {}
        }
    });

    info!(
        frames = scheduler.frame_count(),
        presented = scheduler.presented_count(),
        "frame loop stopped"
    );

    if let Some(err) = failure {
        return Err(err);
    }
    run_result.map_err(|err| {
        RenderError::SurfaceUnavailable(format!("window event loop error: {err}"))
    })
}
