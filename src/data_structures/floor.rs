use std::sync::Arc;

use crate::{
    data_structures::{
        instance::{Instance, InstanceBatch},
        model::{self, Material},
    },
    layout::FloorLayout,
    render::{Instanced, Render},
    resources::mesh::MeshData,
};

/// The plane under the tower. It receives shadows but casts none.
#[derive(Debug)]
pub struct Floor {
    pub model: model::Model,
    pub instances: InstanceBatch,
}

impl Floor {
    pub fn new(device: &wgpu::Device, layout: FloorLayout, material: Arc<Material>) -> Self {
        let mesh = MeshData::double_sided_plane(layout.size, layout.size).upload(device, "floor", 0);
        let model = model::Model::single(Arc::new(mesh), material);

        let instance = Instance {
            position: layout.position(),
            rotation: layout.rotation(),
            cast_shadow: false,
            receive_shadow: true,
            ..Default::default()
        };
        let instances = InstanceBatch::new(device, "Floor", vec![instance]);

        Self { model, instances }
    }
}

impl<'a> From<&'a Floor> for Instanced<'a> {
    fn from(floor: &'a Floor) -> Self {
        floor.instances.instanced(&floor.model)
    }
}

impl<'a> From<&'a Floor> for Render<'a> {
    fn from(floor: &'a Floor) -> Self {
        Render::Default(floor.into())
    }
}
