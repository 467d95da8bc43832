/**
 * This module contains all logic for loading textures from external files and
 * building the materials and meshes the scene is made of.
 */
pub mod mesh;
pub mod texture;

use std::sync::Arc;

use crate::{
    config::SceneConfig,
    data_structures::{
        model::{Material, MaterialMaps, MaterialUniform},
        texture::Texture,
    },
};

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Load the five wood maps concurrently and build the tower's material.
///
/// Maps that fail to load are replaced by neutral stand-ins (see
/// [`texture::load_texture_or`]), so this never fails.
pub async fn load_wood_material(
    config: &SceneConfig,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Arc<Material> {
    let root = config.asset_root.as_str();
    let paths = &config.textures;
    let (colour, normal, roughness, metalness, ambient_occlusion) = futures::join!(
        texture::load_texture_or(root, &paths.colour, false, WHITE, device, queue),
        texture::load_texture_or(root, &paths.normal, true, Texture::FLAT_NORMAL, device, queue),
        texture::load_texture_or(root, &paths.roughness, true, WHITE, device, queue),
        texture::load_texture_or(root, &paths.metalness, true, WHITE, device, queue),
        texture::load_texture_or(root, &paths.ambient_occlusion, true, WHITE, device, queue),
    );

    let maps = MaterialMaps {
        colour,
        normal,
        roughness,
        metalness,
        ambient_occlusion,
    };
    Arc::new(Material::new(
        device,
        "wood",
        maps,
        MaterialUniform::default(),
        layout,
    ))
}

/// Untextured material of the floor: neutral maps and the configured factors.
pub fn floor_material(
    config: &SceneConfig,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> Arc<Material> {
    let solid = |rgba, label, is_linear| Texture::solid(device, queue, rgba, label, is_linear);
    let maps = MaterialMaps {
        colour: solid(WHITE, "floor colour", false),
        normal: Texture::create_default_normal_map(device, queue),
        roughness: solid(WHITE, "floor roughness", true),
        metalness: solid(WHITE, "floor metalness", true),
        ambient_occlusion: solid(WHITE, "floor ao", true),
    };
    let floor = &config.floor;
    let uniform = MaterialUniform::new(floor.linear_colour(), floor.metalness, floor.roughness);
    Arc::new(Material::new(device, "floor", maps, uniform, layout))
}
