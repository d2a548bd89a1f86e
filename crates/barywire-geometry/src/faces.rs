use std::collections::HashSet;

use barywire_base::{Result, invalid_geometry};

use crate::mesh::{Mesh, POSITION, UnindexedMesh, common_vertex_count};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Triangle([u32; 3]),
    Quad([u32; 4]),
}

impl Face {
    pub fn from_vertices(vertices: &[u32]) -> Result<Self> {
        match *vertices {
            [a, b, c] => Ok(Face::Triangle([a, b, c])),
            [a, b, c, d] => Ok(Face::Quad([a, b, c, d])),
            _ => Err(invalid_geometry(format!(
                "face with {} vertices is neither a triangle nor a quad",
                vertices.len()
            ))),
        }
    }

    pub fn vertices(&self) -> &[u32] {
        match self {
            Face::Triangle(v) => v.as_slice(),
            Face::Quad(v) => v.as_slice(),
        }
    }

    /// Quads split along the fixed `v0-v2` diagonal.
    pub fn push_triangles(&self, out: &mut Vec<u32>) {
        match *self {
            Face::Triangle([a, b, c]) => out.extend_from_slice(&[a, b, c]),
            Face::Quad([a, b, c, d]) => out.extend_from_slice(&[a, b, c, a, c, d]),
        }
    }

    pub fn boundary(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        let vertices = self.vertices();
        let n = vertices.len();
        (0..n).map(move |i| EdgeKey::new(vertices[i], vertices[(i + 1) % n]))
    }
}

/// Undirected edge stored as `(min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub a: u32,
    pub b: u32,
}

impl EdgeKey {
    pub fn new(v0: u32, v1: u32) -> Self {
        if v0 <= v1 {
            Self { a: v0, b: v1 }
        } else {
            Self { a: v1, b: v0 }
        }
    }
}

pub fn triangulate(faces: &[Face]) -> Vec<u32> {
    let mut indices = Vec::with_capacity(faces.len() * 6);
    for face in faces {
        face.push_triangles(&mut indices);
    }
    indices
}

/// Unique face-boundary edges in first-seen order. Quad diagonals are never
/// emitted.
pub fn extract_edges(faces: &[Face]) -> Vec<EdgeKey> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for face in faces {
        for edge in face.boundary() {
            if seen.insert(edge) {
                edges.push(edge);
            }
        }
    }
    edges
}

/// A mesh that keeps its original polygon faces next to the vertex data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonMesh {
    pub mesh: Mesh,
    pub faces: Vec<Face>,
}

impl PolygonMesh {
    pub fn new(mesh: Mesh, faces: Vec<Face>) -> Result<Self> {
        if mesh.is_indexed() {
            return Err(invalid_geometry(
                "polygon mesh vertex data must not carry an index array",
            ));
        }
        let vertex_count = common_vertex_count(mesh.attribute_map())?;
        for face in &faces {
            if let Some(&index) = face.vertices().iter().find(|&&v| v as usize >= vertex_count) {
                return Err(invalid_geometry(format!(
                    "face vertex {index} is out of bounds for {vertex_count} vertices"
                )));
            }
        }
        Ok(Self { mesh, faces })
    }

    /// Wraps a triangle soup, one triangle face per consecutive vertex triple.
    pub fn from_unindexed(mesh: UnindexedMesh) -> Result<Self> {
        let triangles = mesh.triangle_count() as u32;
        let faces = (0..triangles)
            .map(|t| Face::Triangle([3 * t, 3 * t + 1, 3 * t + 2]))
            .collect();
        Self::new(mesh.into_mesh(), faces)
    }

    pub fn quad_count(&self) -> usize {
        self.faces
            .iter()
            .filter(|face| matches!(face, Face::Quad(_)))
            .count()
    }

    pub fn triangle_face_count(&self) -> usize {
        self.faces.len() - self.quad_count()
    }

    /// Indexed triangle mesh for rendering.
    pub fn to_triangle_mesh(&self) -> Mesh {
        self.mesh.clone().with_indices(triangulate(&self.faces))
    }

    pub fn edges(&self) -> Vec<EdgeKey> {
        extract_edges(&self.faces)
    }

    /// Segment endpoints (`x0 y0 z0 x1 y1 z1` per edge) for line rendering.
    pub fn edge_line_positions(&self) -> Result<Vec<f32>> {
        let position = self
            .mesh
            .attribute(POSITION)
            .ok_or_else(|| invalid_geometry("mesh has no position attribute"))?;
        let item_size = position.item_size();
        let values = match position.as_f32() {
            Some(values) if item_size >= 3 => values,
            _ => return Err(invalid_geometry("position attribute must be 3-wide f32")),
        };

        let edges = self.edges();
        let mut out = Vec::with_capacity(edges.len() * 6);
        for edge in edges {
            for vertex in [edge.a, edge.b] {
                let start = vertex as usize * item_size;
                out.extend_from_slice(&values[start..start + 3]);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::VertexAttribute;

    #[test]
    fn quad_splits_along_fixed_diagonal() {
        assert_eq!(triangulate(&[Face::Quad([0, 1, 2, 3])]), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn quad_edges_skip_diagonal() {
        let edges = extract_edges(&[Face::Quad([0, 1, 2, 3])]);
        assert_eq!(
            edges,
            vec![
                EdgeKey::new(0, 1),
                EdgeKey::new(1, 2),
                EdgeKey::new(2, 3),
                EdgeKey::new(3, 0),
            ]
        );
        assert!(!edges.contains(&EdgeKey::new(0, 2)));
    }

    #[test]
    fn shared_edges_are_emitted_once() {
        let faces = [Face::Triangle([0, 1, 2]), Face::Triangle([2, 1, 3])];
        let edges = extract_edges(&faces);
        assert_eq!(edges.len(), 5);
    }

    #[test]
    fn edge_key_is_unordered() {
        assert_eq!(EdgeKey::new(7, 2), EdgeKey::new(2, 7));
        assert_eq!(EdgeKey::new(7, 2).a, 2);
    }

    #[test]
    fn rejects_pentagon() {
        assert!(Face::from_vertices(&[0, 1, 2, 3, 4]).is_err());
    }

    #[test]
    fn edge_lines_follow_positions() -> Result<()> {
        let mesh = Mesh::new().with_attribute(
            POSITION,
            VertexAttribute::f32(3, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])?,
        );
        let poly = PolygonMesh::new(mesh, vec![Face::Triangle([0, 1, 2])])?;
        let lines = poly.edge_line_positions()?;
        assert_eq!(lines.len(), 18);
        assert_eq!(&lines[..6], &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn triangle_soup_gets_one_face_per_triple() -> Result<()> {
        let mesh = Mesh::new()
            .with_attribute(POSITION, VertexAttribute::f32(3, vec![0.0; 27])?)
            .with_indices(vec![0, 1, 2, 3, 4, 5]);
        let soup = crate::deindex(&mesh)?;
        let poly = PolygonMesh::from_unindexed(soup)?;
        assert_eq!(poly.faces, vec![Face::Triangle([0, 1, 2]), Face::Triangle([3, 4, 5])]);
        Ok(())
    }

    #[test]
    fn rejects_face_outside_vertex_range() -> Result<()> {
        let mesh = Mesh::new().with_attribute(POSITION, VertexAttribute::f32(3, vec![0.0; 9])?);
        assert!(PolygonMesh::new(mesh, vec![Face::Triangle([0, 1, 3])]).is_err());
        Ok(())
    }
}
