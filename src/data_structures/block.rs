use std::sync::Arc;

use crate::{
    data_structures::{
        instance::{Instance, InstanceBatch},
        model::{self, Material},
    },
    layout::TowerLayout,
    render::{Instanced, Render},
    resources::mesh::MeshData,
};

/**
 * A `Tower` is the stack of blocks: one box mesh and one material shared by
 * every block, drawn with a single instanced call per pass.
 *
 * Placements are generated once from the layout and never change.
 */
#[derive(Debug)]
pub struct Tower {
    pub model: model::Model,
    pub instances: InstanceBatch,
}

impl Tower {
    pub fn new(device: &wgpu::Device, layout: TowerLayout, material: Arc<Material>) -> Self {
        let block = layout.block;
        let mesh = MeshData::cuboid(block.x, block.y, block.z).upload(device, "block", 0);
        let model = model::Model::single(Arc::new(mesh), material);

        let instances = layout.placements().iter().map(Instance::from).collect::<Vec<_>>();
        let instances = InstanceBatch::new(device, "Tower", instances);

        log::info!(
            "Built a tower of {} layers ({} blocks, {:.2} high)",
            layout.layers,
            instances.len(),
            layout.height()
        );

        Self { model, instances }
    }
}

impl<'a> From<&'a Tower> for Instanced<'a> {
    fn from(tower: &'a Tower) -> Self {
        tower.instances.instanced(&tower.model)
    }
}

impl<'a> From<&'a Tower> for Render<'a> {
    fn from(tower: &'a Tower) -> Self {
        if tower.instances.is_empty() {
            Render::None
        } else {
            Render::Default(tower.into())
        }
    }
}
