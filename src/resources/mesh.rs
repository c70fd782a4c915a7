use std::f32::consts::TAU;

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::{data_structures::model, physics::Triangle};

/**
 * CPU-side geometry. Both the GPU meshes and the collision triangles of a prop are
 * derived from the same `MeshData`, so what you see is what you collide with.
 *
 * Triangles are counter-clockwise when seen from outside.
 */
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Axis aligned box centred on the origin.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let x = Vector3::unit_x() * (width / 2.0);
        let y = Vector3::unit_y() * (height / 2.0);
        let z = Vector3::unit_z() * (depth / 2.0);
        let mut data = Self::default();
        // (face centre, u, v) with u x v pointing outwards
        for (centre, u, v) in [(x, y, z), (-x, z, y), (y, z, x), (-y, x, z), (z, x, y), (-z, y, x)] {
            data.push_quad([
                centre - u - v,
                centre + u - v,
                centre + u + v,
                centre - u + v,
            ]);
        }
        data
    }

    /// Flat ground plane on y = 0 facing up.
    pub fn ground(width: f32, depth: f32) -> Self {
        let u = Vector3::unit_z() * (depth / 2.0);
        let v = Vector3::unit_x() * (width / 2.0);
        let mut data = Self::default();
        data.push_quad([-u - v, u - v, u + v, -u + v]);
        data
    }

    /// Y-aligned cylinder centred on the origin with flat-shaded sides and caps.
    /// A tessellation of 3 yields a triangular prism.
    pub fn cylinder(height: f32, diameter: f32, tessellation: u32) -> Self {
        let tessellation = tessellation.max(3);
        let radius = diameter / 2.0;
        let half = height / 2.0;
        let ring = |i: u32, y: f32| {
            let angle = TAU * i as f32 / tessellation as f32;
            Vector3::new(radius * angle.cos(), y, radius * angle.sin())
        };
        let mut data = Self::default();
        for i in 0..tessellation {
            data.push_quad([ring(i, -half), ring(i, half), ring(i + 1, half), ring(i + 1, -half)]);
        }
        let top = Vector3::new(0.0, half, 0.0);
        let bottom = Vector3::new(0.0, -half, 0.0);
        for i in 0..tessellation {
            data.push_triangle([top, ring(i + 1, half), ring(i, half)]);
            data.push_triangle([bottom, ring(i, -half), ring(i + 1, -half)]);
        }
        data
    }

    /// Bakes `matrix` into the vertices. Normals use the inverse transpose so
    /// non-uniform scales keep them perpendicular.
    pub fn transformed(mut self, matrix: &Matrix4<f32>) -> Self {
        let normal_matrix = normal_matrix(matrix);
        for p in self.positions.iter_mut() {
            *p = (*matrix * Vector3::from(*p).extend(1.0)).truncate().into();
        }
        for n in self.normals.iter_mut() {
            let normal = normal_matrix * Vector3::from(*n);
            if normal.magnitude2() > 0.0 {
                *n = normal.normalize().into();
            }
        }
        if matrix.determinant() < 0.0 {
            for tri in self.indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }
        self
    }

    /// Appends `other` after transforming it with `matrix`.
    pub fn append(&mut self, other: MeshData, matrix: &Matrix4<f32>) {
        let other = other.transformed(matrix);
        let base = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.normals.extend(other.normals);
        self.tex_coords.extend(other.tex_coords);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Collision triangles in the space given by `matrix`. Indices that point
    /// past the vertex list are skipped.
    pub fn triangles(&self, matrix: &Matrix4<f32>) -> Vec<Triangle> {
        let vertex = |i: u32| self.positions.get(i as usize).map(|&p| Vector3::from(p));
        self.indices
            .chunks_exact(3)
            .filter_map(|c| Some(Triangle::new(vertex(c[0])?, vertex(c[1])?, vertex(c[2])?)))
            .map(|tri| tri.transformed(matrix))
            .collect()
    }

    pub fn vertices(&self) -> Vec<model::ModelVertex> {
        (0..self.positions.len())
            .map(|i| model::ModelVertex {
                position: self.positions[i],
                tex_coords: self.tex_coords.get(i).copied().unwrap_or_default(),
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            })
            .collect()
    }

    pub fn to_mesh(&self, device: &wgpu::Device, name: &str, material: usize) -> model::Mesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(&self.vertices()),
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

    fn push_quad(&mut self, corners: [Vector3<f32>; 4]) {
        let base = self.positions.len() as u32;
        let normal = (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize();
        let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        for (corner, uv) in corners.iter().zip(uvs) {
            self.positions.push((*corner).into());
            self.normals.push(normal.into());
            self.tex_coords.push(uv);
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    fn push_triangle(&mut self, corners: [Vector3<f32>; 3]) {
        let base = self.positions.len() as u32;
        let normal = (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize();
        let uvs = [[0.5, 0.5], [1.0, 0.0], [0.0, 0.0]];
        for (corner, uv) in corners.iter().zip(uvs) {
            self.positions.push((*corner).into());
            self.normals.push(normal.into());
            self.tex_coords.push(uv);
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
}

fn normal_matrix(matrix: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = Matrix3::from_cols(
        matrix.x.truncate(),
        matrix.y.truncate(),
        matrix.z.truncate(),
    );
    upper
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or(upper)
}
