use wgpu::util::DeviceExt;

use crate::data_structures::model;

/// Vertices and indices of a mesh before they are uploaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<model::ModelVertex>,
    pub indices: Vec<u32>,
}

/// One side of a box or plane: its outward normal, the direction in which `u`
/// grows and the direction in which the face goes "up" (`v` shrinks, as wgpu
/// texture coordinates start at the top).
///
/// `u_axis × up_axis` must equal `normal` so the quad winds counter-clockwise.
struct Face {
    normal: cgmath::Vector3<f32>,
    u_axis: cgmath::Vector3<f32>,
    up_axis: cgmath::Vector3<f32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a quad centred at `centre` spanning `half_u`/`half_up` along the face axes.
    fn push_face(&mut self, face: &Face, centre: cgmath::Vector3<f32>, half_u: f32, half_up: f32) {
        let base = self.vertices.len() as u32;
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        self.vertices.extend(corners.iter().map(|&(su, sv): &(f32, f32)| {
            let position = centre + face.u_axis * (su * half_u) + face.up_axis * (sv * half_up);
            model::ModelVertex {
                position: position.into(),
                tex_coords: [(su + 1.0) / 2.0, (1.0 - sv) / 2.0],
                normal: face.normal.into(),
                // Filled in by `compute_tangents`
                tangent: [0.0; 3],
                bitangent: [0.0; 3],
            }
        }));
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Add the back side of every face pushed so far: same positions and UVs,
    /// inverted normals and reversed winding.
    fn add_back_faces(&mut self) {
        let offset = self.vertices.len() as u32;
        let back = self.vertices.iter().map(|v| model::ModelVertex {
            normal: (-cgmath::Vector3::from(v.normal)).into(),
            ..*v
        });
        let back: Vec<_> = back.collect();
        let back_indices: Vec<u32> = self
            .indices
            .chunks(3)
            .flat_map(|c| [c[0] + offset, c[2] + offset, c[1] + offset])
            .collect();
        self.vertices.extend(back);
        self.indices.extend(back_indices);
    }

    /// An axis aligned box centred at the origin with `width` along x,
    /// `height` along y and `depth` along z. Every face maps the full texture.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        use cgmath::Vector3;
        let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
        let x = Vector3::unit_x();
        let y = Vector3::unit_y();
        let z = Vector3::unit_z();

        let mut mesh = Self::new();
        let faces = [
            (Face { normal: x, u_axis: -z, up_axis: y }, hx, hz, hy),
            (Face { normal: -x, u_axis: z, up_axis: y }, hx, hz, hy),
            (Face { normal: y, u_axis: x, up_axis: -z }, hy, hx, hz),
            (Face { normal: -y, u_axis: x, up_axis: z }, hy, hx, hz),
            (Face { normal: z, u_axis: x, up_axis: y }, hz, hx, hy),
            (Face { normal: -z, u_axis: -x, up_axis: y }, hz, hx, hy),
        ];
        for (face, half_n, half_u, half_up) in &faces {
            mesh.push_face(face, face.normal * *half_n, *half_u, *half_up);
        }
        compute_tangents(&mut mesh.vertices, &mesh.indices);
        mesh
    }

    /// A `width` × `height` quad in the xy plane facing +z.
    pub fn plane(width: f32, height: f32) -> Self {
        use cgmath::Vector3;
        let mut mesh = Self::new();
        let face = Face {
            normal: Vector3::unit_z(),
            u_axis: Vector3::unit_x(),
            up_axis: Vector3::unit_y(),
        };
        mesh.push_face(&face, Vector3::new(0.0, 0.0, 0.0), width / 2.0, height / 2.0);
        compute_tangents(&mut mesh.vertices, &mesh.indices);
        mesh
    }

    /// Like [`plane`](Self::plane) but shaded from both sides.
    pub fn double_sided_plane(width: f32, height: f32) -> Self {
        let mut mesh = Self::plane(width, height);
        mesh.add_back_faces();
        compute_tangents(&mut mesh.vertices, &mesh.indices);
        mesh
    }

    pub fn upload(&self, device: &wgpu::Device, name: &str, material: usize) -> model::Mesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        model::Mesh {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: self.indices.len() as u32,
            material,
        }
    }
}

/**
 * Procedural geometry doesn't come with tangents and bitangents so they have to be
 * calculated from positions and texture coordinates for normal maps to work correctly.
 */
pub fn compute_tangents(vertices: &mut [model::ModelVertex], indices: &[u32]) {
    for v in vertices.iter_mut() {
        v.tangent = [0.0; 3];
        v.bitangent = [0.0; 3];
    }
    let mut triangles_included = vec![0; vertices.len()];

    // Calculate tangents and bitangets. We're going to
    // use the triangles, so we need to loop through the
    // indices in chunks of 3
    for c in indices.chunks_exact(3) {
        let v0 = vertices[c[0] as usize];
        let v1 = vertices[c[1] as usize];
        let v2 = vertices[c[2] as usize];

        let pos0: cgmath::Vector3<_> = v0.position.into();
        let pos1: cgmath::Vector3<_> = v1.position.into();
        let pos2: cgmath::Vector3<_> = v2.position.into();

        let uv0: cgmath::Vector2<_> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<_> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<_> = v2.tex_coords.into();

        // Calculate the edges of the triangle
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;

        // This will give us a direction to calculate the
        // tangent and bitangent
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving the following system of equations will
        // give us the tangent and bitangent.
        //     delta_pos1 = delta_uv1.x * T + delta_u.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < f32::EPSILON {
            // Degenerate UVs give no usable direction
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // We flip the bitangent to enable right-handed normal
        // maps with wgpu texture coordinate system
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        // We'll use the same tangent/bitangent for each vertex in the triangle
        for &i in c {
            let v = &mut vertices[i as usize];
            v.tangent = (tangent + cgmath::Vector3::from(v.tangent)).into();
            v.bitangent = (bitangent + cgmath::Vector3::from(v.bitangent)).into();
            // Used to average the tangents/bitangents
            triangles_included[i as usize] += 1;
        }
    }

    // Average the tangents/bitangents
    use cgmath::InnerSpace;
    for (v, n) in vertices.iter_mut().zip(triangles_included) {
        if n == 0 {
            continue;
        }
        let tangent = cgmath::Vector3::from(v.tangent) / n as f32;
        let bitangent = cgmath::Vector3::from(v.bitangent) / n as f32;
        v.tangent = tangent.normalize().into();
        v.bitangent = bitangent.normalize().into();
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector3};

    use super::*;

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn cuboid_has_four_vertices_and_two_triangles_per_face() {
        let mesh = MeshData::cuboid(1.0, 2.0, 3.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
    }

    #[test]
    fn cuboid_spans_its_dimensions() {
        let mesh = MeshData::cuboid(1.0 / 3.0, 0.2, 1.0);
        let max = mesh.vertices.iter().fold([f32::MIN; 3], |acc, v| {
            [
                acc[0].max(v.position[0]),
                acc[1].max(v.position[1]),
                acc[2].max(v.position[2]),
            ]
        });
        assert!((max[0] - 1.0 / 6.0).abs() < 1e-6);
        assert!((max[1] - 0.1).abs() < 1e-6);
        assert!((max[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn triangles_wind_counter_clockwise_from_outside() {
        let mesh = MeshData::cuboid(1.0, 1.0, 1.0);
        for c in mesh.indices.chunks(3) {
            let p: Vec<Vector3<f32>> = c
                .iter()
                .map(|&i| mesh.vertices[i as usize].position.into())
                .collect();
            let face_normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize();
            let normal: Vector3<f32> = mesh.vertices[c[0] as usize].normal.into();
            assert!(close(face_normal, normal));
        }
    }

    #[test]
    fn tangent_frame_is_orthonormal_and_right_handed() {
        let mesh = MeshData::cuboid(1.0, 1.0, 1.0);
        for v in &mesh.vertices {
            let t: Vector3<f32> = v.tangent.into();
            let b: Vector3<f32> = v.bitangent.into();
            let n: Vector3<f32> = v.normal.into();
            assert!((t.magnitude() - 1.0).abs() < 1e-5);
            assert!(t.dot(n).abs() < 1e-5);
            assert!(close(t.cross(b), n));
        }
    }

    #[test]
    fn plane_faces_positive_z() {
        let mesh = MeshData::plane(10.0, 10.0);
        assert_eq!(mesh.vertices.len(), 4);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert!(mesh.vertices.iter().all(|v| v.position[2] == 0.0));
        assert!(
            mesh.vertices
                .iter()
                .all(|v| v.position[0].abs() == 5.0 && v.position[1].abs() == 5.0)
        );
    }

    #[test]
    fn double_sided_plane_adds_a_mirrored_back() {
        let mesh = MeshData::double_sided_plane(10.0, 10.0);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 12);
        let back = &mesh.vertices[4..];
        assert!(back.iter().all(|v| v.normal == [0.0, 0.0, -1.0]));
        for c in mesh.indices[6..].chunks(3) {
            let p: Vec<Vector3<f32>> = c
                .iter()
                .map(|&i| mesh.vertices[i as usize].position.into())
                .collect();
            let face_normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize();
            assert!(close(face_normal, -Vector3::unit_z()));
        }
    }
}
