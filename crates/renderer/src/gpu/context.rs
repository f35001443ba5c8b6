use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::{RenderError, Result};
use crate::types::GpuPowerPreference;

/// Pixel size of a surface whose logical size is scaled by `density`.
///
/// An unknown or non-positive density counts as 1; each axis is at least 1.
pub fn physical_dimensions(
    logical_width: f64,
    logical_height: f64,
    density: Option<f64>,
) -> (u32, u32) {
    let density = density
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(1.0);
    let scale = |logical: f64| (logical * density).round().clamp(1.0, u32::MAX as f64) as u32;
    (scale(logical_width), scale(logical_height))
}

/// Records the first uncaptured device error so the frame loop can stop.
#[derive(Clone, Default)]
pub(crate) struct DeviceHealth {
    failed: Arc<AtomicBool>,
    reason: Arc<Mutex<Option<String>>>,
}

impl DeviceHealth {
    fn record(&self, message: String) {
        if !self.failed.swap(true, Ordering::SeqCst) {
            if let Ok(mut reason) = self.reason.lock() {
                *reason = Some(message);
            }
        }
    }

    /// The recorded failure, if any.
    pub(crate) fn failure(&self) -> Option<String> {
        if !self.failed.load(Ordering::SeqCst) {
            return None;
        }
        let reason = self
            .reason
            .lock()
            .ok()
            .and_then(|reason| reason.clone())
            .unwrap_or_else(|| "unknown device error".to_string());
        Some(reason)
    }
}

/// Adapter, device and configured presentation surface.
pub(crate) struct GpuContext {
    /// Held for the lifetime of `surface`.
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub format: wgpu::TextureFormat,
    pub health: DeviceHealth,
}

impl GpuContext {
    pub(crate) async fn acquire(window: Arc<Window>, power: GpuPowerPreference) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let logical = window.inner_size().to_logical::<f64>(window.scale_factor());
        let (width, height) =
            physical_dimensions(logical.width, logical.height, Some(window.scale_factor()));

        let surface = instance
            .create_surface(window)
            .map_err(|err| RenderError::SurfaceUnavailable(err.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power.to_wgpu(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| {
                RenderError::BackendUnavailable(format!("no suitable adapter: {err}"))
            })?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            %power,
            "selected GPU adapter"
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("earthshade device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await
            .map_err(|err| {
                RenderError::BackendUnavailable(format!("device request failed: {err}"))
            })?;

        let health = DeviceHealth::default();
        let handler_health = health.clone();
        device.on_uncaptured_error(Box::new(move |error| {
            tracing::error!(%error, "uncaptured GPU error");
            handler_health.record(error.to_string());
        }));

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| {
                RenderError::SurfaceUnavailable("surface reports no supported formats".into())
            })?;

        let alpha_mode = if caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            let fallback = caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto);
            tracing::warn!(
                ?fallback,
                "premultiplied alpha not supported by surface; falling back"
            );
            fallback
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::info!(width, height, ?format, ?alpha_mode, "configured surface");

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size: PhysicalSize::new(width, height),
            format,
            health,
        })
    }

    /// Reconfigures the surface for a new pixel size. Zero sizes are ignored.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        tracing::debug!(width = new_size.width, height = new_size.height, "resized surface");
    }

    /// Applies the current configuration again after the surface was lost.
    pub(crate) fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}
