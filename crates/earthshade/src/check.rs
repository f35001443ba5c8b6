use anyhow::{bail, Context, Result};
use renderer::{
    binding_mismatches, load_assets, reflect_bindings, BindingMismatch, RendererConfig,
    PLANET_BINDINGS, PLANET_BIND_GROUP,
};

use crate::cli::{CheckArgs, RunArgs};
use crate::config::load_renderer_config;

/// Loads every asset and validates the fragment program's bindings, printing
/// a short report. Fails when anything the renderer needs is missing or wrong.
pub fn check(args: CheckArgs) -> Result<()> {
    let config = load_renderer_config(&RunArgs {
        source: args.source,
        ..RunArgs::default()
    })?;
    run_check(&config)
}

fn run_check(config: &RendererConfig) -> Result<()> {
    println!("Asset source: {}", config.assets.describe());
    println!("Shaders:      {:?}", config.shaders);

    let assets = load_assets(config).context("failed to load assets")?;
    for image in [&assets.images.day, &assets.images.night] {
        println!("  texture  {:<32} {}x{}", image.name, image.width, image.height);
    }

    reflect_bindings(&assets.shaders.vertex).context("vertex shader does not parse")?;
    let declared =
        reflect_bindings(&assets.shaders.fragment).context("fragment shader does not parse")?;
    let mismatches = binding_mismatches(&declared);

    println!("Bindings (group {PLANET_BIND_GROUP}):");
    for slot in &PLANET_BINDINGS {
        let failed = mismatches
            .iter()
            .any(|mismatch| mismatch_binding(mismatch) == Some(slot.binding));
        let status = if failed { "MISMATCH" } else { "ok" };
        println!(
            "  {:>2}  {:<14} {:<15} {status}",
            slot.binding,
            slot.label,
            slot.kind.to_string()
        );
    }

    if !mismatches.is_empty() {
        for mismatch in &mismatches {
            eprintln!("error: {mismatch}");
        }
        bail!("fragment shader has {} binding mismatch(es)", mismatches.len());
    }

    println!("All assets loaded and bindings match.");
    Ok(())
}

fn mismatch_binding(mismatch: &BindingMismatch) -> Option<u32> {
    match mismatch {
        BindingMismatch::Missing { binding, .. } | BindingMismatch::WrongKind { binding, .. } => {
            Some(*binding)
        }
        BindingMismatch::Unexpected { .. } => None,
    }
}
