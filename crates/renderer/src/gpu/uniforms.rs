use bytemuck::{Pod, Zeroable};
use scheduler::FrameUniforms;

/// Byte size of the uniform block bound at slot 0.
pub(crate) const UNIFORM_BUFFER_SIZE: u64 = std::mem::size_of::<PlanetUniforms>() as u64;

/// GPU layout of the per-frame uniform block:
/// `vec2 resolution, f32 time, f32 reserved`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct PlanetUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub reserved: f32,
}

impl From<&FrameUniforms> for PlanetUniforms {
    fn from(frame: &FrameUniforms) -> Self {
        Self {
            resolution: [frame.width, frame.height],
            time: frame.time,
            reserved: frame.reserved,
        }
    }
}

pub(crate) fn create_uniform_buffer(device: &wgpu::Device) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("planet uniforms"),
        size: UNIFORM_BUFFER_SIZE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Overwrites the whole block at offset 0.
pub(crate) fn write_uniforms(
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    uniforms: &PlanetUniforms,
) {
    queue.write_buffer(buffer, 0, bytemuck::bytes_of(uniforms));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_sixteen_bytes() {
        assert_eq!(UNIFORM_BUFFER_SIZE, 16);
    }

    #[test]
    fn bytes_follow_payload_order() {
        let frame = FrameUniforms::for_frame(1600, 1200, 1000);
        let uniforms = PlanetUniforms::from(&frame);
        let floats: [f32; 4] = bytemuck::cast(uniforms);
        assert_eq!(floats, [1600.0, 1200.0, 2.0, 0.0]);
        assert_eq!(floats, frame.to_array());
    }
}
