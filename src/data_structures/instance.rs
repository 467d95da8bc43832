//! Instance transformation data for GPU rendering.
//!
//! Per-instance data like position, rotation, scale and shadow flags is
//! stored in GPU buffers and passed to shaders so one draw call renders every
//! copy of a shared mesh.

use cgmath::{One, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{data_structures::model, layout::BlockPlacement, render::Instanced};

/// Per-instance transformation: position, rotation (as quaternion), and scale,
/// plus how the instance takes part in shadowing.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
    /// Drawn into the shadow map.
    pub cast_shadow: bool,
    /// Darkened where the shadow map says it is occluded.
    pub receive_shadow: bool,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        let handedness = world_matrix.determinant().signum();
        InstanceRaw {
            model: world_matrix.into(),
            normal: cgmath::Matrix3::from(self.rotation).into(),
            handedness,
            receive_shadow: if self.receive_shadow { 1.0 } else { 0.0 },
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl From<&BlockPlacement> for Instance {
    fn from(placement: &BlockPlacement) -> Self {
        Instance {
            position: placement.position,
            rotation: placement.rotation(),
            cast_shadow: placement.cast_shadow,
            receive_shadow: placement.receive_shadow,
            ..Default::default()
        }
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    handedness: f32,
    receive_shadow: f32,
}

impl InstanceRaw {
    pub fn receives_shadow(&self) -> bool {
        self.receive_shadow > 0.5
    }

    pub fn translation(&self) -> [f32; 3] {
        let [x, y, z, _] = self.model[3];
        [x, y, z]
    }
}

/**
 * As we store vertex data directly in the GPU memory we need to tell what the bytes refer to:
 *
 * offset: zero as we want to use the full space.
 * stride: length of an instance
 *
 * Stride layout here: position + rotation + scale as 4x4 matrix (hence the four 4d vectors),
 * followed by the normal matrix, the handedness and the shadow flag.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Shaders only advance to the next instance once they start a new instance
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // Normal matrix as three vec3s
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 26]>() as wgpu::BufferAddress,
                    shader_location: 13,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

/// Raw data of the instances that are drawn into the shadow map.
pub fn shadow_casters(instances: &[Instance]) -> Vec<InstanceRaw> {
    instances
        .iter()
        .filter(|instance| instance.cast_shadow)
        .map(Instance::to_raw)
        .collect()
}

/// Instances of one model uploaded to the GPU.
///
/// Instances are fixed after creation; nothing writes to the buffers again.
#[derive(Debug)]
pub struct InstanceBatch {
    pub instances: Vec<Instance>,
    pub buffer: wgpu::Buffer,
    /// Only the shadow casting instances, `None` if there are none.
    pub casters: Option<wgpu::Buffer>,
    pub caster_count: usize,
}

impl InstanceBatch {
    pub fn new(device: &wgpu::Device, label: &str, instances: Vec<Instance>) -> Self {
        let raw: Vec<InstanceRaw> = instances.iter().map(Instance::to_raw).collect();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Instance Buffer")),
            contents: bytemuck::cast_slice(&raw),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let casters = shadow_casters(&instances);
        let caster_count = casters.len();
        let casters = if caster_count == 0 {
            None
        } else if caster_count == instances.len() {
            Some(buffer.clone())
        } else {
            Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Shadow Caster Buffer")),
                contents: bytemuck::cast_slice(&casters),
                usage: wgpu::BufferUsages::VERTEX,
            }))
        };

        Self {
            instances,
            buffer,
            casters,
            caster_count,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instanced<'a>(&'a self, model: &'a model::Model) -> Instanced<'a> {
        Instanced {
            instance: &self.buffer,
            model,
            amount: self.len(),
            casters: self.casters.as_ref(),
            caster_amount: self.caster_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Rotation3, Vector3};

    use super::*;
    use crate::layout::{BlockDimensions, TowerLayout};
    use crate::data_structures::model::Vertex;

    #[test]
    fn identity_instance_has_identity_matrix() {
        let raw = Instance::new().to_raw();
        let identity: [[f32; 4]; 4] = cgmath::Matrix4::<f32>::identity().into();
        assert_eq!(raw.model, identity);
        assert_eq!(raw.handedness, 1.0);
        assert!(!raw.receives_shadow());
    }

    #[test]
    fn raw_translation_is_the_last_column() {
        let mut instance = Instance::from(Vector3::new(1.0, 2.0, 3.0));
        instance.rotation = cgmath::Quaternion::from_angle_y(Deg(90.0));
        assert_eq!(instance.to_raw().translation(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn mirrored_scale_flips_handedness() {
        let mut instance = Instance::new();
        instance.scale = Vector3::new(-1.0, 1.0, 1.0);
        assert_eq!(instance.to_raw().handedness, -1.0);
    }

    #[test]
    fn placements_keep_their_shadow_flags() {
        let layout = TowerLayout::new(2, BlockDimensions::JENGA);
        for placement in layout.placements() {
            let instance = Instance::from(&placement);
            assert_eq!(instance.position, placement.position);
            assert!(instance.cast_shadow);
            assert!(instance.to_raw().receives_shadow());
        }
    }

    #[test]
    fn only_casters_reach_the_shadow_pass() {
        let caster = Instance {
            cast_shadow: true,
            ..Instance::from(Vector3::new(1.0, 0.0, 0.0))
        };
        let receiver = Instance {
            receive_shadow: true,
            ..Instance::from(Vector3::new(2.0, 0.0, 0.0))
        };
        let casters = shadow_casters(&[receiver, caster.clone()]);
        assert_eq!(casters, vec![caster.to_raw()]);
    }

    #[test]
    fn instance_layout_matches_struct_size() {
        let desc = InstanceRaw::desc();
        assert_eq!(desc.array_stride, 108);
        assert_eq!(desc.attributes.len(), 9);
    }
}
