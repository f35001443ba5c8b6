use anyhow::{Context, Result};
use renderer::Renderer;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::config::load_renderer_config;

pub fn run(args: RunArgs) -> Result<()> {
    let config = load_renderer_config(&args)?;
    tracing::info!(
        width = config.window_size.0,
        height = config.window_size.1,
        power = %config.power,
        "starting earthshade"
    );

    Renderer::new(config)
        .run()
        .context("renderer exited with an error")
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
