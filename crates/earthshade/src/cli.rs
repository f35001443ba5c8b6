use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::GpuPowerPreference;

#[derive(Parser, Debug)]
#[command(
    name = "earthshade",
    author,
    version,
    about = "Planet day/night renderer",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the window and render (the default).
    Run(RunArgs),
    /// Load the assets and verify shader bindings without touching the GPU.
    Check(CheckArgs),
}

/// Where assets and settings come from.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Asset root: a directory or an `http(s)://` base URL.
    #[arg(long, value_name = "DIR|URL", env = "EARTHSHADE_ASSETS")]
    pub assets: Option<String>,

    /// TOML config file with `[window]`, `[gpu]` and `[assets]` sections.
    #[arg(long, value_name = "FILE", env = "EARTHSHADE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use the WGSL programs compiled into the binary instead of fetching them.
    #[arg(long)]
    pub bundled_shaders: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Initial window width in logical pixels.
    #[arg(long, value_name = "PIXELS")]
    pub width: Option<u32>,

    /// Initial window height in logical pixels.
    #[arg(long, value_name = "PIXELS")]
    pub height: Option<u32>,

    /// Adapter power preference: `high` (default) or `low`.
    #[arg(long, value_name = "PREFERENCE", value_parser = parse_power)]
    pub power: Option<GpuPowerPreference>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "high" | "high-performance" | "discrete" => Ok(GpuPowerPreference::High),
        "low" | "low-power" | "integrated" => Ok(GpuPowerPreference::Low),
        other => Err(format!(
            "unknown power preference '{other}'; expected high or low"
        )),
    }
}
