use barywire_base::{Error, Result};
use cgmath::{InnerSpace, Vector3};

use crate::faces::{Face, PolygonMesh};
use crate::mesh::{Mesh, NORMAL, POSITION, UV, VertexAttribute};

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

// Counter-clockwise when seen from outside.
const CUBE_QUADS: [[u32; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [3, 7, 6, 2],
    [0, 4, 7, 3],
    [1, 2, 6, 5],
];

pub struct MeshBuilder;

impl MeshBuilder {
    /// Indexed cube sharing its 8 corners between 12 triangles.
    pub fn indexed_cube(size: f32) -> Result<Mesh> {
        ensure_positive("size", size)?;
        let half = size * 0.5;
        let positions = CUBE_CORNERS
            .iter()
            .flat_map(|corner| corner.map(|c| c * half))
            .collect();
        let mut indices = Vec::with_capacity(36);
        for quad in CUBE_QUADS {
            Face::Quad(quad).push_triangles(&mut indices);
        }
        Ok(Mesh::new()
            .with_attribute(POSITION, VertexAttribute::f32(3, positions)?)
            .with_indices(indices))
    }

    /// Flat-shaded quad cube: every face owns its 4 vertices, normal and uvs.
    pub fn quad_cube(size: f32) -> Result<PolygonMesh> {
        ensure_positive("size", size)?;
        let half = size * 0.5;
        let mut positions = Vec::with_capacity(24 * 3);
        let mut normals = Vec::with_capacity(24 * 3);
        let mut uvs = Vec::with_capacity(24 * 2);
        let mut faces = Vec::with_capacity(6);

        for (face_index, quad) in CUBE_QUADS.iter().enumerate() {
            let corners = quad.map(|i| Vector3::from(CUBE_CORNERS[i as usize]) * half);
            let normal = (corners[1] - corners[0])
                .cross(corners[2] - corners[0])
                .normalize();
            for (corner, uv) in corners.iter().zip([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]) {
                positions.extend_from_slice(&[corner.x, corner.y, corner.z]);
                normals.extend_from_slice(&[normal.x, normal.y, normal.z]);
                uvs.extend_from_slice(&uv);
            }
            let base = face_index as u32 * 4;
            faces.push(Face::Quad([base, base + 1, base + 2, base + 3]));
        }

        let mesh = Mesh::new()
            .with_attribute(POSITION, VertexAttribute::f32(3, positions)?)
            .with_attribute(NORMAL, VertexAttribute::f32(3, normals)?)
            .with_attribute(UV, VertexAttribute::f32(2, uvs)?);
        PolygonMesh::new(mesh, faces)
    }

    /// `columns` x `rows` quads on the XY plane with shared vertices.
    pub fn grid(columns: u32, rows: u32, size: f32) -> Result<PolygonMesh> {
        if columns == 0 || rows == 0 {
            return Err(Error::InvalidParameter(
                "grid needs at least one column and one row".to_string(),
            ));
        }
        ensure_positive("size", size)?;

        let stride = columns + 1;
        let mut positions = Vec::new();
        let mut uvs = Vec::new();
        for y in 0..=rows {
            for x in 0..=columns {
                let u = x as f32 / columns as f32;
                let v = y as f32 / rows as f32;
                positions.extend_from_slice(&[(u - 0.5) * size, (v - 0.5) * size, 0.0]);
                uvs.extend_from_slice(&[u, v]);
            }
        }

        let mut faces = Vec::with_capacity((columns * rows) as usize);
        for y in 0..rows {
            for x in 0..columns {
                let v0 = y * stride + x;
                faces.push(Face::Quad([v0, v0 + 1, v0 + stride + 1, v0 + stride]));
            }
        }

        let mesh = Mesh::new()
            .with_attribute(POSITION, VertexAttribute::f32(3, positions)?)
            .with_attribute(UV, VertexAttribute::f32(2, uvs)?);
        PolygonMesh::new(mesh, faces)
    }
}

fn ensure_positive(name: &str, value: f32) -> Result<()> {
    if value.is_nan() || value <= 0.0 {
        return Err(Error::InvalidParameter(format!("{name} must be > 0")));
    }
    Ok(())
}
