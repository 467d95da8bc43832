//! Render pipelines and the bind group layouts they are built from.
//!
//! - `basic`: the lit PBR pipeline used for every visible instance
//! - `light`: light uniform, shadow map and their bind groups
//! - `shadow`: depth-only pipeline filling the shadow map

pub mod basic;
pub mod light;
pub mod shadow;

/// All pipelines of a frame, created once with the context.
#[derive(Debug)]
pub struct Pipelines {
    pub pbr: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        material_bind_group_layout: &wgpu::BindGroupLayout,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light: &light::LightResources,
    ) -> Self {
        Self {
            pbr: basic::mk_pbr_pipeline(
                device,
                config,
                material_bind_group_layout,
                camera_bind_group_layout,
                &light.bind_group_layout,
            ),
            shadow: shadow::mk_shadow_pipeline(device, &light.shadow_bind_group_layout),
        }
    }
}
