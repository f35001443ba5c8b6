use crate::assets::{AssetManifest, AssetSource};

/// Adapter power preference requested at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    /// Prefer the discrete GPU when one is present.
    #[default]
    High,
    Low,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
        }
    }
}

impl std::fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuPowerPreference::High => f.write_str("high"),
            GpuPowerPreference::Low => f.write_str("low"),
        }
    }
}

/// Where the two WGSL programs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderOrigin {
    /// Programs compiled into the crate.
    #[default]
    Bundled,
    /// Fetch `vertex_shader` and `fragment_shader` from the asset source.
    AssetSource,
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the CLI and config file: it names the asset source,
/// the logical window size, and the adapter preference.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial inner window size in logical pixels.
    pub window_size: (u32, u32),
    pub title: String,
    pub power: GpuPowerPreference,
    /// Root the textures (and optionally shaders) are fetched from.
    pub assets: AssetSource,
    pub manifest: AssetManifest,
    pub shaders: ShaderOrigin,
}

impl Default for RendererConfig {
    /// An 800x600 window reading assets from `./assets`.
    fn default() -> Self {
        Self {
            window_size: (800, 600),
            title: "earthshade".into(),
            power: GpuPowerPreference::default(),
            assets: AssetSource::directory("assets"),
            manifest: AssetManifest::default(),
            shaders: ShaderOrigin::default(),
        }
    }
}
