use crate::assets::{ShaderSources, SurfaceImages};
use crate::bindings::{
    binding_mismatches, reflect_bindings, BindingKind, BindingSlot, SlotSource, PLANET_BINDINGS,
    PLANET_BIND_GROUP,
};
use crate::compile::compile_shader;
use crate::error::{RenderError, Result};

use super::context::GpuContext;
use super::textures::{upload_image, SurfaceTexture};
use super::uniforms::create_uniform_buffer;

/// Every GPU object the frame loop needs, created once at startup.
pub(crate) struct PlanetPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    /// Textures and samplers referenced by `bind_group`, held for its lifetime.
    _day: SurfaceTexture,
    _night: SurfaceTexture,
}

impl PlanetPipeline {
    /// Compiles both programs, creates the pipeline with an inferred layout,
    /// uploads the surface images and wires everything into bind group 0.
    pub(crate) async fn build(
        context: &GpuContext,
        shaders: &ShaderSources,
        images: &SurfaceImages,
    ) -> Result<Self> {
        let device = &context.device;

        let fragment_module = compile_shader(device, "scattering.frag", &shaders.fragment).await;
        let vertex_module = compile_shader(device, "quad.vert", &shaders.vertex).await;
        check_fragment_bindings(&shaders.fragment)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("planet pipeline"),
            layout: None,
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = device.pop_error_scope().await {
            return Err(RenderError::PipelineBuild(err.to_string()));
        }

        let uniform_buffer = create_uniform_buffer(device);
        let day = upload_image(device, &context.queue, &images.day).await?;
        let night = upload_image(device, &context.queue, &images.night).await?;

        let layout = pipeline.get_bind_group_layout(PLANET_BIND_GROUP);
        let resources = SlotResources {
            uniform_buffer: &uniform_buffer,
            day: &day,
            night: &night,
        };
        let entries = build_entries(&resources)?;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("planet bind group"),
            layout: &layout,
            entries: &entries,
        });
        if let Some(err) = device.pop_error_scope().await {
            return Err(RenderError::PipelineBuild(format!(
                "bind group does not match pipeline layout: {err}"
            )));
        }

        tracing::info!(
            format = ?context.format,
            day = ?day.size,
            night = ?night.size,
            "planet pipeline ready"
        );

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
            _day: day,
            _night: night,
        })
    }
}

fn check_fragment_bindings(source: &str) -> Result<()> {
    let declared =
        reflect_bindings(source).map_err(|err| RenderError::PipelineBuild(err.to_string()))?;
    let mismatches = binding_mismatches(&declared);
    if mismatches.is_empty() {
        return Ok(());
    }
    let details: Vec<String> = mismatches.iter().map(ToString::to_string).collect();
    Err(RenderError::PipelineBuild(format!(
        "fragment shader bindings do not match: {}",
        details.join("; ")
    )))
}

/// The concrete resource a slot resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotResource {
    UniformBuffer,
    Sampler(SlotSource),
    TextureView(SlotSource),
}

/// Pairs a slot's source with its kind; any pairing the loaded resources
/// cannot satisfy is rejected.
fn resolve_slot(slot: &BindingSlot) -> Result<SlotResource> {
    match (slot.source, slot.kind) {
        (SlotSource::Uniforms, BindingKind::UniformBuffer) => Ok(SlotResource::UniformBuffer),
        (source @ (SlotSource::Day | SlotSource::Night), BindingKind::Sampler) => {
            Ok(SlotResource::Sampler(source))
        }
        (source @ (SlotSource::Day | SlotSource::Night), BindingKind::Texture) => {
            Ok(SlotResource::TextureView(source))
        }
        (source, kind) => Err(RenderError::PipelineBuild(format!(
            "binding {} ({}) cannot be filled from {source:?}",
            slot.binding, kind
        ))),
    }
}

struct SlotResources<'a> {
    uniform_buffer: &'a wgpu::Buffer,
    day: &'a SurfaceTexture,
    night: &'a SurfaceTexture,
}

impl<'a> SlotResources<'a> {
    fn texture(&self, source: SlotSource) -> Option<&'a SurfaceTexture> {
        match source {
            SlotSource::Day => Some(self.day),
            SlotSource::Night => Some(self.night),
            SlotSource::Uniforms => None,
        }
    }

    fn resource(&self, slot: &BindingSlot) -> Result<wgpu::BindingResource<'a>> {
        let unfilled = || {
            RenderError::PipelineBuild(format!("binding {} has no resource", slot.binding))
        };
        let resource = match resolve_slot(slot)? {
            SlotResource::UniformBuffer => self.uniform_buffer.as_entire_binding(),
            SlotResource::Sampler(source) => {
                let texture = self.texture(source).ok_or_else(unfilled)?;
                wgpu::BindingResource::Sampler(&texture.sampler)
            }
            SlotResource::TextureView(source) => {
                let texture = self.texture(source).ok_or_else(unfilled)?;
                wgpu::BindingResource::TextureView(&texture.view)
            }
        };
        Ok(resource)
    }
}

fn build_entries<'a>(resources: &SlotResources<'a>) -> Result<Vec<wgpu::BindGroupEntry<'a>>> {
    PLANET_BINDINGS
        .iter()
        .map(|slot| {
            Ok(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource: resources.resource(slot)?,
            })
        })
        .collect()
}
