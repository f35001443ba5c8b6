use std::sync::Arc;
use std::time::{Duration, Instant};

use scheduler::{FrameSink, FrameUniforms, QuadPass, Submission};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::assets::{ShaderSources, SurfaceImages};
use crate::error::{RenderError, Result};
use crate::types::GpuPowerPreference;

use super::context::GpuContext;
use super::pipeline::PlanetPipeline;
use super::uniforms::{write_uniforms, PlanetUniforms};

const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Frame-rate bookkeeping for the periodic `render stats` log line.
#[derive(Debug)]
struct RenderStats {
    last_update: Instant,
    frames_since_update: u32,
    presented: u64,
}

impl RenderStats {
    fn new(now: Instant) -> Self {
        Self {
            last_update: now,
            frames_since_update: 0,
            presented: 0,
        }
    }

    /// Counts one presented frame. Returns the measured rate once per interval.
    fn record(&mut self, now: Instant) -> Option<f32> {
        self.frames_since_update += 1;
        self.presented += 1;
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed < STATS_INTERVAL {
            return None;
        }
        let fps = self.frames_since_update as f32 / elapsed.as_secs_f32();
        self.frames_since_update = 0;
        self.last_update = now;
        Some(fps)
    }
}

/// GPU side of the frame loop: owns the device context and the planet
/// pipeline, and turns scheduler ticks into presented frames.
pub(crate) struct GpuState {
    context: GpuContext,
    planet: PlanetPipeline,
    last_uniforms: PlanetUniforms,
    stats: RenderStats,
}

impl GpuState {
    pub(crate) async fn new(
        window: Arc<Window>,
        power: GpuPowerPreference,
        shaders: &ShaderSources,
        images: &SurfaceImages,
    ) -> Result<Self> {
        let context = GpuContext::acquire(window, power).await?;
        let planet = PlanetPipeline::build(&context, shaders, images).await?;
        let size = context.size;
        Ok(Self {
            context,
            planet,
            last_uniforms: PlanetUniforms {
                resolution: [size.width as f32, size.height as f32],
                time: 0.0,
                reserved: 0.0,
            },
            stats: RenderStats::new(Instant::now()),
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    fn check_device(&self) -> Result<()> {
        match self.context.health.failure() {
            Some(reason) => Err(RenderError::RuntimeDeviceLoss(reason)),
            None => Ok(()),
        }
    }

    fn acquire_frame(&mut self) -> Result<Option<wgpu::SurfaceTexture>> {
        match self.context.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring and skipping frame");
                self.context.reconfigure();
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; skipping frame");
                Ok(None)
            }
            Err(err) => Err(RenderError::RuntimeDeviceLoss(err.to_string())),
        }
    }
}

impl FrameSink for GpuState {
    type Error = RenderError;

    fn surface_size(&self) -> (u32, u32) {
        (self.context.config.width, self.context.config.height)
    }

    fn upload_uniforms(&mut self, uniforms: &FrameUniforms) -> Result<()> {
        self.check_device()?;
        self.last_uniforms = PlanetUniforms::from(uniforms);
        write_uniforms(
            &self.context.queue,
            &self.planet.uniform_buffer,
            &self.last_uniforms,
        );
        Ok(())
    }

    fn submit(&mut self, pass: &QuadPass) -> Result<Submission> {
        self.check_device()?;
        let Some(frame) = self.acquire_frame()? else {
            return Ok(Submission::Skipped);
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("planet encoder"),
                });
        {
            let [r, g, b, a] = pass.clear;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("planet pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.planet.pipeline);
            render_pass.set_bind_group(pass.bind_group, &self.planet.bind_group, &[]);
            render_pass.draw(0..pass.vertex_count, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        if let Some(fps) = self.stats.record(Instant::now()) {
            debug!(
                fps = fps.round(),
                presented = self.stats.presented,
                time = self.last_uniforms.time,
                width = self.context.size.width,
                height = self.context.size.height,
                "render stats"
            );
        }
        Ok(Submission::Presented)
    }
}
