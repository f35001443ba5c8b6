//! Config file loading and merging with CLI flags.
//!
//! File values fill in whatever the command line leaves unset; flags always
//! win. A relative `[assets] root` is resolved against the config file's
//! directory.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use renderer::{
    is_remote_location, AssetManifest, AssetSource, GpuPowerPreference, RendererConfig,
    ShaderOrigin,
};
use serde::Deserialize;

use crate::cli::{parse_power, RunArgs};

const DEFAULT_ASSET_ROOT: &str = "assets";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub window: WindowSection,
    pub gpu: GpuSection,
    pub assets: AssetsSection,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub title: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuSection {
    pub power: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsSection {
    pub root: Option<String>,
    pub day: Option<String>,
    pub night: Option<String>,
    pub vertex_shader: Option<String>,
    pub fragment_shader: Option<String>,
    /// Use the compiled-in programs instead of fetching them from `root`.
    pub bundled_shaders: Option<bool>,
}

impl FileConfig {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config = Self::parse(&contents)
            .with_context(|| format!("invalid config {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.assets.root = config
                .assets
                .root
                .map(|root| resolve_relative_root(base, &root));
        }
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }
}

fn resolve_relative_root(base: &Path, root: &str) -> String {
    if is_remote_location(root) || Path::new(root).is_absolute() {
        return root.to_string();
    }
    base.join(root).to_string_lossy().into_owned()
}

/// Reads the config file named by `args` (if any) and merges it with the flags.
pub fn load_renderer_config(args: &RunArgs) -> Result<RendererConfig> {
    let file = match &args.source.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    merge(file, args)
}

pub fn merge(file: FileConfig, args: &RunArgs) -> Result<RendererConfig> {
    let defaults = RendererConfig::default();

    let width = args
        .width
        .or(file.window.width)
        .unwrap_or(defaults.window_size.0);
    let height = args
        .height
        .or(file.window.height)
        .unwrap_or(defaults.window_size.1);
    if width == 0 || height == 0 {
        bail!("window size must be greater than zero (got {width}x{height})");
    }

    let power = match (args.power, file.gpu.power.as_deref()) {
        (Some(power), _) => power,
        (None, Some(value)) => parse_power(value).map_err(anyhow::Error::msg)?,
        (None, None) => GpuPowerPreference::default(),
    };

    let root = args
        .source
        .assets
        .clone()
        .or(file.assets.root)
        .unwrap_or_else(|| DEFAULT_ASSET_ROOT.to_string());
    let assets = AssetSource::parse(&root).context("invalid asset root")?;

    let base = AssetManifest::default();
    let manifest = AssetManifest {
        day_texture: file.assets.day.unwrap_or(base.day_texture),
        night_texture: file.assets.night.unwrap_or(base.night_texture),
        vertex_shader: file.assets.vertex_shader.unwrap_or(base.vertex_shader),
        fragment_shader: file.assets.fragment_shader.unwrap_or(base.fragment_shader),
    };

    let bundled = args.source.bundled_shaders || file.assets.bundled_shaders.unwrap_or(false);
    let shaders = if bundled {
        ShaderOrigin::Bundled
    } else {
        ShaderOrigin::AssetSource
    };

    Ok(RendererConfig {
        window_size: (width, height),
        title: file.window.title.unwrap_or(defaults.title),
        power,
        assets,
        manifest,
        shaders,
    })
}
