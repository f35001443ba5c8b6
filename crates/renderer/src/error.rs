use crate::assets::AssetError;

/// Failures surfaced by the renderer.
///
/// Every variant except [`RenderError::RuntimeDeviceLoss`] is raised during
/// startup, before the first frame is drawn.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no usable GPU backend: {0}")]
    BackendUnavailable(String),
    #[error("drawable surface unavailable: {0}")]
    SurfaceUnavailable(String),
    #[error(transparent)]
    AssetLoad(#[from] AssetError),
    #[error("failed to build render pipeline: {0}")]
    PipelineBuild(String),
    #[error("GPU device lost: {0}")]
    RuntimeDeviceLoss(String),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
