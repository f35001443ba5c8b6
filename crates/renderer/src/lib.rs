//! Renderer crate for earthshade, a planet lit by a moving sun.
//!
//! A full-screen quad is drawn every display refresh; the fragment program
//! samples a day and a night texture and blends them across the terminator.
//! The overall flow is:
//!
//! ```text
//!   CLI / earthshade
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ load_assets ──▶ GpuState (context + pipeline)
//!          │                                 ▲
//!          └─▶ winit event loop ──▶ FrameScheduler::tick ──┘
//! ```
//!
//! Surface images are loaded before any GPU object exists, so a missing or
//! undecodable texture aborts startup without touching the device.

mod assets;
mod bindings;
mod compile;
mod error;
mod gpu;
mod types;
mod window;

pub use assets::{
    decode_image, is_remote_location, load_image, load_surface_images, AssetError, AssetManifest,
    AssetSource, DecodedImage, ShaderSources, SurfaceImages,
};
pub use bindings::{
    binding_mismatches, reflect_bindings, BindingKind, BindingMismatch, BindingSlot,
    DeclaredBinding, ReflectError, SlotSource, PLANET_BINDINGS, PLANET_BIND_GROUP,
};
pub use compile::{DiagnosticSeverity, ShaderDiagnostic, SourceSpan};
pub use error::{RenderError, Result};
pub use gpu::physical_dimensions;
pub use scheduler::{FrameScheduler, LoopState, StopHandle};
pub use types::{GpuPowerPreference, RendererConfig, ShaderOrigin};

/// Everything fetched before the GPU stage.
#[derive(Debug, Clone)]
pub struct LoadedAssets {
    pub shaders: ShaderSources,
    pub images: SurfaceImages,
}

/// Fetches both surface images and the shader programs named by `config`.
///
/// The image future is polled first so both image workers are running while
/// the shader programs are read on the calling thread. The first failure wins.
pub fn load_assets(config: &RendererConfig) -> Result<LoadedAssets> {
    let images = load_surface_images(&config.assets, &config.manifest);
    let shaders = async {
        match config.shaders {
            ShaderOrigin::Bundled => Ok(ShaderSources::bundled()),
            ShaderOrigin::AssetSource => {
                ShaderSources::load(&config.assets, &config.manifest).await
            }
        }
    };
    let (images, shaders) = pollster::block_on(async { futures::try_join!(images, shaders) })?;
    Ok(LoadedAssets { shaders, images })
}

/// Entry point used by the binary.
pub struct Renderer {
    config: RendererConfig,
    scheduler: FrameScheduler,
}

impl Renderer {
    /// Builds a renderer for the supplied configuration.
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            scheduler: FrameScheduler::new(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// A handle that stops the frame loop from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.scheduler.stop_handle()
    }

    /// Loads assets, opens the window and renders until stopped.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            assets = %self.config.assets.describe(),
            shaders = ?self.config.shaders,
            "loading assets"
        );
        let assets = load_assets(&self.config)?;
        window::run_window(&self.config, self.scheduler, &assets.shaders, &assets.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(root: &std::path::Path, name: &str) {
        let path = root.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();
    }

    #[test]
    fn load_assets_uses_bundled_shaders_by_default() {
        let root = TempDir::new().unwrap();
        let config = RendererConfig {
            assets: AssetSource::directory(root.path()),
            ..RendererConfig::default()
        };
        write_png(root.path(), &config.manifest.day_texture);
        write_png(root.path(), &config.manifest.night_texture);

        let assets = load_assets(&config).unwrap();
        assert_eq!(assets.shaders, ShaderSources::bundled());
        assert_eq!(assets.images.day.width, 2);
    }

    #[test]
    fn missing_day_texture_is_an_asset_error() {
        let root = TempDir::new().unwrap();
        let config = RendererConfig {
            assets: AssetSource::directory(root.path()),
            ..RendererConfig::default()
        };
        write_png(root.path(), &config.manifest.night_texture);

        let err = load_assets(&config).unwrap_err();
        assert!(matches!(err, RenderError::AssetLoad(AssetError::Io { .. })));
    }

    #[test]
    fn stop_before_run_is_observable() {
        let renderer = Renderer::new(RendererConfig::default());
        let handle = renderer.stop_handle();
        handle.stop();
        assert!(renderer.stop_handle().is_stopped());
    }
}
