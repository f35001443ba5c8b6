//! GPU side of the planet renderer.
//!
//! - `context` acquires the adapter, device and presentation surface and
//!   reconfigures the surface when the window resizes.
//! - `pipeline` compiles both programs and builds the one render pipeline,
//!   uniform buffer and bind group the process ever uses.
//! - `textures` uploads the decoded day/night images with their samplers.
//! - `uniforms` mirrors the 16-byte uniform block.
//! - `state` implements the scheduler's `FrameSink`, recording one full-screen
//!   pass per tick.

mod context;
mod pipeline;
mod state;
mod textures;
mod uniforms;

pub use context::physical_dimensions;
pub(crate) use state::GpuState;
