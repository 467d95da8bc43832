use cgmath::{EuclideanSpace, InnerSpace};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    config::{AmbientLightConfig, DirectionalLightConfig},
    data_structures::texture,
};

/// Everything the shaders need to know about the lights, plus the shadow map
/// the directional light renders into.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub shadow_map: texture::Texture,
    /// Uniform, shadow map and comparison sampler for the main pass.
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    /// Uniform only, as the shadow map can't be sampled while it is written.
    pub shadow_bind_group: wgpu::BindGroup,
    pub shadow_bind_group_layout: wgpu::BindGroupLayout,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Direction the light travels in, from its position towards its target.
    pub direction: [f32; 3],
    pub intensity: f32,
    pub colour: [f32; 3],
    pub ambient_intensity: f32,
    pub ambient_colour: [f32; 3],
    /// 1.0 when the shadow map should be sampled.
    pub shadows: f32,
}

impl LightUniform {
    pub fn new(ambient: &AmbientLightConfig, directional: &DirectionalLightConfig) -> Self {
        let direction = (directional.target - directional.position).normalize();
        Self {
            view_proj: light_view_proj(directional).into(),
            direction: direction.into(),
            intensity: directional.intensity,
            colour: directional.colour,
            ambient_intensity: ambient.intensity,
            ambient_colour: ambient.colour,
            shadows: if directional.cast_shadow { 1.0 } else { 0.0 },
        }
    }
}

/// Orthographic camera looking from the light's position at its target.
pub fn light_view_proj(light: &DirectionalLightConfig) -> cgmath::Matrix4<f32> {
    let view = cgmath::Matrix4::look_at_rh(light.position, light.target, cgmath::Vector3::unit_y());
    let e = light.shadow_extent;
    let proj = cgmath::ortho(-e, e, -e, e, light.shadow_near, light.shadow_far);
    OPENGL_TO_WGPU_MATRIX * proj * view
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn uniform_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_shadow_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[uniform_entry()],
        label: Some("shadow_bind_group_layout"),
    })
}

impl LightResources {
    pub fn new(
        device: &wgpu::Device,
        ambient: &AmbientLightConfig,
        directional: &DirectionalLightConfig,
    ) -> Self {
        let uniform = LightUniform::new(ambient, directional);
        let buffer = mk_buffer(device, uniform);
        let shadow_map = texture::Texture::create_shadow_map(device, directional.shadow_map_size);

        let bind_group_layout = mk_bind_group_layout(device);
        let shadow_bind_group_layout = mk_shadow_bind_group_layout(device);

        let shadow_sampler = shadow_map
            .sampler
            .clone()
            .unwrap_or_else(|| texture::create_comparison_sampler(device));
        let bind_group = mk_bind_group(
            device,
            &bind_group_layout,
            &buffer,
            &shadow_map.view,
            &shadow_sampler,
        );
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("shadow_bind_group"),
        });

        log::info!(
            "Directional light at {:?} casts shadows: {} ({}px map)",
            directional.position.to_vec(),
            directional.cast_shadow,
            directional.shadow_map_size
        );

        Self {
            uniform,
            buffer,
            shadow_map,
            bind_group,
            bind_group_layout,
            shadow_bind_group,
            shadow_bind_group_layout,
        }
    }

    pub fn casts_shadows(&self) -> bool {
        self.uniform.shadows > 0.5
    }
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    shadow_view: &wgpu::TextureView,
    shadow_sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(shadow_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(shadow_sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use cgmath::{Point3, Vector4};

    use super::*;

    fn to_clip(m: cgmath::Matrix4<f32>, p: Point3<f32>) -> Vector4<f32> {
        let v = m * p.to_homogeneous();
        v / v.w
    }

    #[test]
    fn uniform_matches_the_shader_struct() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 112);
    }

    #[test]
    fn light_points_from_its_position_to_the_target() {
        let uniform = LightUniform::new(
            &AmbientLightConfig::default(),
            &DirectionalLightConfig::default(),
        );
        let d = cgmath::Vector3::from(uniform.direction);
        assert!((d.magnitude() - 1.0).abs() < 1e-5);
        assert!(d.x > 0.0 && d.z > 0.0 && d.y < 0.0);
        assert_eq!(uniform.shadows, 1.0);
    }

    #[test]
    fn target_lands_in_the_middle_of_the_shadow_map() {
        let light = DirectionalLightConfig::default();
        let clip = to_clip(light_view_proj(&light), light.target);
        assert!(clip.x.abs() < 1e-5);
        assert!(clip.y.abs() < 1e-5);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn tower_top_is_inside_the_shadow_frustum() {
        let light = DirectionalLightConfig::default();
        let m = light_view_proj(&light);
        for corner in [
            Point3::new(0.5, 3.6, 0.5),
            Point3::new(-0.5, 3.6, -0.5),
            Point3::new(0.5, 0.0, -0.5),
        ] {
            let clip = to_clip(m, corner);
            assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0);
            assert!((0.0..=1.0).contains(&clip.z), "{corner:?} -> {clip:?}");
        }
    }
}
