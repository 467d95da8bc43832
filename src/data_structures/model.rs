//! Meshes, materials and the draw helpers that bind them.
//!
//! A [`Model`] is a list of meshes plus the materials they index into. Both are
//! held in `Arc`s so one geometry and one material can back any number of
//! instances without being copied; nothing mutates them after creation.

use std::{ops::Range, sync::Arc};

use wgpu::util::DeviceExt;

use crate::data_structures::texture::{Texture, create_default_sampler};

/// Types that describe their own vertex buffer layout.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// The five maps of a metallic-roughness material.
///
/// Roughness is read from the green channel, metalness from blue and ambient
/// occlusion from red, so packed ORM textures work as well as separate ones.
#[derive(Debug)]
pub struct MaterialMaps {
    pub colour: Texture,
    pub normal: Texture,
    pub roughness: Texture,
    pub metalness: Texture,
    pub ambient_occlusion: Texture,
}

/// Scalar factors multiplied with the sampled maps.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_colour: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    // Uniforms are padded to 16 bytes
    _padding: [f32; 2],
}

impl MaterialUniform {
    pub fn new(base_colour: [f32; 4], metalness: f32, roughness: f32) -> Self {
        Self {
            base_colour,
            metalness,
            roughness,
            _padding: [0.0; 2],
        }
    }
}

impl Default for MaterialUniform {
    /// White, dielectric and fully rough.
    fn default() -> Self {
        Self::new([1.0; 4], 0.0, 1.0)
    }
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub maps: MaterialMaps,
    pub uniform: MaterialUniform,
    pub sampler: wgpu::Sampler,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        maps: MaterialMaps,
        uniform: MaterialUniform,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let sampler = create_default_sampler(device);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Material Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&maps.colour.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&maps.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&maps.roughness.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&maps.metalness.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&maps.ambient_occlusion.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: buffer.as_entire_binding(),
                },
            ],
            label: Some(name),
        });

        Self {
            name: name.to_string(),
            maps,
            uniform,
            sampler,
            buffer,
            bind_group,
        }
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    /// Index into the owning model's materials.
    pub material: usize,
}

#[derive(Clone, Debug)]
pub struct Model {
    pub meshes: Vec<Arc<Mesh>>,
    pub materials: Vec<Arc<Material>>,
}

impl Model {
    /// A model made of one mesh drawn with one material.
    pub fn single(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self {
            meshes: vec![mesh],
            materials: vec![material],
        }
    }
}

pub trait DrawModel {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );

    fn draw_model_instanced(
        &mut self,
        model: &Model,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &Mesh,
        material: &Material,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model_instanced(
        &mut self,
        model: &Model,
        instances: Range<u32>,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        for mesh in &model.meshes {
            match model.materials.get(mesh.material) {
                Some(material) => self.draw_mesh_instanced(
                    mesh,
                    material,
                    instances.clone(),
                    camera_bind_group,
                    light_bind_group,
                ),
                None => log::warn!(
                    "Mesh {} references missing material {}",
                    mesh.name,
                    mesh.material
                ),
            }
        }
    }
}

/// Depth-only drawing from the light's point of view.
pub trait DrawShadow {
    fn draw_model_shadow(
        &mut self,
        model: &Model,
        instances: Range<u32>,
        shadow_bind_group: &wgpu::BindGroup,
    );
}

impl DrawShadow for wgpu::RenderPass<'_> {
    fn draw_model_shadow(
        &mut self,
        model: &Model,
        instances: Range<u32>,
        shadow_bind_group: &wgpu::BindGroup,
    ) {
        self.set_bind_group(0, shadow_bind_group, &[]);
        for mesh in &model.meshes {
            self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            self.draw_indexed(0..mesh.num_elements, 0, instances.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_covers_the_whole_vertex() {
        let desc = ModelVertex::desc();
        assert_eq!(desc.array_stride, 56);
        assert_eq!(desc.attributes.len(), 5);
        let last = desc.attributes[4];
        assert_eq!(last.offset + 12, desc.array_stride);
    }

    #[test]
    fn material_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
    }
}
