use wgpu::util::DeviceExt;

use crate::config::LightingConfig;

/// Uniform shared by all lit draws (group 2): one point light, a hemisphere
/// light and linear fog. Every vec3 is paired with a scalar to keep the
/// 16 byte alignment uniforms require.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub point_position: [f32; 3],
    pub point_intensity: f32,
    pub point_colour: [f32; 3],
    pub hemi_intensity: f32,
    pub hemi_direction: [f32; 3],
    pub fog_start: f32,
    pub hemi_sky: [f32; 3],
    pub fog_end: f32,
    pub hemi_ground: [f32; 3],
    /// 1.0 when fog is on. WGSL uniforms have no bool.
    pub fog_enabled: f32,
    pub fog_colour: [f32; 3],
    _padding: f32,
}

impl From<&LightingConfig> for LightUniform {
    fn from(lighting: &LightingConfig) -> Self {
        Self {
            point_position: lighting.point_position.into(),
            point_intensity: lighting.point_intensity,
            point_colour: lighting.point_colour,
            hemi_intensity: lighting.hemisphere_intensity,
            hemi_direction: lighting.hemisphere_direction.into(),
            fog_start: lighting.fog_start,
            hemi_sky: lighting.hemisphere_sky,
            fog_end: lighting.fog_end,
            hemi_ground: lighting.hemisphere_ground,
            fog_enabled: if lighting.fog_enabled { 1.0 } else { 0.0 },
            fog_colour: lighting.fog_colour,
            _padding: 0.0,
        }
    }
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Uploads `self.uniform`. Call after changing it.
    pub fn write(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_six_aligned_rows() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 96);
    }

    #[test]
    fn fog_flag_is_encoded_as_float() {
        let mut lighting = LightingConfig::default();
        assert_eq!(LightUniform::from(&lighting).fog_enabled, 1.0);
        lighting.fog_enabled = false;
        let uniform = LightUniform::from(&lighting);
        assert_eq!(uniform.fog_enabled, 0.0);
        assert_eq!(uniform.fog_end, 750.0);
        assert_eq!(uniform.point_position, [0.0, 1.65, 5.5]);
    }
}
