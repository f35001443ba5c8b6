use crate::assets::DecodedImage;
use crate::error::{RenderError, Result};

const BYTES_PER_PIXEL: u32 = 4;

/// One uploaded surface image with its view and sampler.
pub(crate) struct SurfaceTexture {
    /// Owns the storage behind `view`.
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: (u32, u32),
}

/// Rejects images the device cannot hold in a single 2D texture.
pub(crate) fn check_texture_size(name: &str, width: u32, height: u32, max: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::PipelineBuild(format!(
            "surface image '{name}' is empty ({width}x{height})"
        )));
    }
    if width > max || height > max {
        return Err(RenderError::PipelineBuild(format!(
            "surface image '{name}' is {width}x{height}, larger than the device limit of {max}"
        )));
    }
    Ok(())
}

/// Creates an `Rgba8Unorm` texture sized to the image and writes the pixels once.
pub(crate) async fn upload_image(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &DecodedImage,
) -> Result<SurfaceTexture> {
    check_texture_size(
        &image.name,
        image.width,
        image.height,
        device.limits().max_texture_dimension_2d,
    )?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let size = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("surface texture {}", image.name)),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(image.width * BYTES_PER_PIXEL),
            rows_per_image: Some(image.height),
        },
        size,
    );
    if let Some(err) = device.pop_error_scope().await {
        return Err(RenderError::PipelineBuild(format!(
            "failed to upload surface image '{}': {err}",
            image.name
        )));
    }
    tracing::debug!(
        texture = %image.name,
        width = image.width,
        height = image.height,
        "uploaded surface texture"
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = create_sampler(device, &image.name);

    Ok(SurfaceTexture {
        _texture: texture,
        view,
        sampler,
        size: (image.width, image.height),
    })
}

fn create_sampler(device: &wgpu::Device, name: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("sampler {name}")),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
