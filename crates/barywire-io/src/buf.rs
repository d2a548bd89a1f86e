//! Reader and writer for the JSON "buf" mesh format.
//!
//! A buf document keeps the authored quad/triangle faces next to flat vertex
//! attribute arrays. Faces are triangulated for rendering while the original
//! polygons drive wireframe edge extraction.

use std::collections::BTreeMap;
use std::path::Path;

use barywire_base::{Error, Result, invalid_geometry};
use barywire_geometry::{
    AttributeData, EdgeKey, Face, Mesh, PolygonMesh, UnindexedMesh, VertexAttribute,
    prepare_wireframe_geometry,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const BUF_FORMAT: &str = "buf";
pub const BUF_VERSION: &str = "1.0";
const GENERATOR: &str = "barywire";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BufDocument {
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub metadata: BufMetadata,
    pub attributes: BTreeMap<String, BufAttribute>,
    pub faces: Vec<BufFace>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BufMetadata {
    pub vertex_count: usize,
    #[serde(default)]
    pub quad_count: usize,
    #[serde(default)]
    pub triangle_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shading: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BufAttribute {
    pub array: Vec<f32>,
    #[serde(rename = "itemSize")]
    pub item_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceKind {
    Triangle,
    Quad,
}

impl FaceKind {
    pub fn arity(&self) -> usize {
        match self {
            FaceKind::Triangle => 3,
            FaceKind::Quad => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BufFace {
    #[serde(rename = "type")]
    pub kind: FaceKind,
    pub vertices: Vec<u32>,
}

#[derive(Deserialize)]
struct FormatProbe {
    #[serde(default)]
    format: Option<String>,
}

/// A decoded buf file: vertex data plus the authored faces.
#[derive(Clone, Debug, PartialEq)]
pub struct BufMesh {
    pub metadata: BufMetadata,
    pub polygons: PolygonMesh,
}

impl BufMesh {
    pub fn triangle_mesh(&self) -> Mesh {
        self.polygons.to_triangle_mesh()
    }

    pub fn edges(&self) -> Vec<EdgeKey> {
        self.polygons.edges()
    }

    pub fn prepare(&self, remove_edge: bool) -> Result<UnindexedMesh> {
        prepare_wireframe_geometry(&self.triangle_mesh(), remove_edge)
    }
}

impl BufDocument {
    pub fn from_polygon_mesh(polygons: &PolygonMesh, object_name: Option<&str>) -> Self {
        let vertex_count = polygons.mesh.vertex_count();
        let attributes = polygons
            .mesh
            .attributes()
            .map(|(name, attr)| {
                let array = match attr.data() {
                    AttributeData::F32(values) => values.clone(),
                    AttributeData::U32(values) => values.iter().map(|&v| v as f32).collect(),
                    AttributeData::I32(values) => values.iter().map(|&v| v as f32).collect(),
                };
                let buf = BufAttribute {
                    array,
                    item_size: attr.item_size(),
                    count: Some(attr.vertex_count()),
                };
                (name.to_string(), buf)
            })
            .collect();
        let faces = polygons
            .faces
            .iter()
            .map(|face| BufFace {
                kind: match face {
                    Face::Triangle(_) => FaceKind::Triangle,
                    Face::Quad(_) => FaceKind::Quad,
                },
                vertices: face.vertices().to_vec(),
            })
            .collect();

        Self {
            format: BUF_FORMAT.to_string(),
            version: Some(BUF_VERSION.to_string()),
            metadata: BufMetadata {
                vertex_count,
                quad_count: polygons.quad_count(),
                triangle_count: polygons.triangle_face_count(),
                face_count: Some(polygons.faces.len()),
                generator: Some(GENERATOR.to_string()),
                object_name: object_name.map(str::to_string),
                shading: None,
            },
            attributes,
            faces,
        }
    }

    pub fn into_mesh(self) -> Result<BufMesh> {
        if self.format != BUF_FORMAT {
            return Err(Error::UnsupportedFormat {
                expected: BUF_FORMAT.to_string(),
                found: self.format,
            });
        }

        let vertex_count = self.metadata.vertex_count;
        let mut mesh = Mesh::new();
        for (name, attr) in self.attributes {
            let expected = attr.item_size.checked_mul(vertex_count).ok_or_else(|| {
                invalid_geometry(format!(
                    "attribute `{name}` size overflows: {vertex_count} x {}",
                    attr.item_size
                ))
            })?;
            if attr.item_size == 0 || attr.array.len() != expected {
                return Err(invalid_geometry(format!(
                    "attribute `{name}` has {} values, expected {vertex_count} x {}",
                    attr.array.len(),
                    attr.item_size
                )));
            }
            if let Some(count) = attr.count {
                if count != vertex_count {
                    return Err(invalid_geometry(format!(
                        "attribute `{name}` declares {count} vertices, metadata says {vertex_count}"
                    )));
                }
            }
            mesh.insert_attribute(name, VertexAttribute::f32(attr.item_size, attr.array)?);
        }

        let mut faces = Vec::with_capacity(self.faces.len());
        for (position, face) in self.faces.iter().enumerate() {
            if face.vertices.len() != face.kind.arity() {
                return Err(invalid_geometry(format!(
                    "face {position} is a {:?} with {} vertices",
                    face.kind,
                    face.vertices.len()
                )));
            }
            faces.push(Face::from_vertices(&face.vertices)?);
        }

        let polygons = PolygonMesh::new(mesh, faces)?;
        if polygons.quad_count() != self.metadata.quad_count
            || polygons.triangle_face_count() != self.metadata.triangle_count
        {
            warn!(
                quads = polygons.quad_count(),
                triangles = polygons.triangle_face_count(),
                "buf metadata face counts disagree with face list"
            );
        }

        Ok(BufMesh {
            metadata: self.metadata,
            polygons,
        })
    }
}

/// Decodes a buf document. The `format` tag is checked before anything else.
pub fn parse_buf(text: &str) -> Result<BufMesh> {
    let probe: FormatProbe = serde_json::from_str(text)?;
    match probe.format.as_deref() {
        Some(BUF_FORMAT) => {}
        other => {
            return Err(Error::UnsupportedFormat {
                expected: BUF_FORMAT.to_string(),
                found: other.unwrap_or("<missing>").to_string(),
            });
        }
    }
    let document: BufDocument = serde_json::from_str(text)?;
    document.into_mesh()
}

pub fn write_buf(polygons: &PolygonMesh, object_name: Option<&str>) -> Result<String> {
    let document = BufDocument::from_polygon_mesh(polygons, object_name);
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn load_buf(path: impl AsRef<Path>) -> Result<BufMesh> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| Error::ResourceLoad {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    let mesh = parse_buf(&text)?;
    info!(
        path = %path.display(),
        vertices = mesh.metadata.vertex_count,
        faces = mesh.polygons.faces.len(),
        "buf mesh loaded"
    );
    Ok(mesh)
}

pub fn save_buf(
    polygons: &PolygonMesh,
    path: impl AsRef<Path>,
    object_name: Option<&str>,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, write_buf(polygons, object_name)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_QUAD: &str = r#"{
        "format": "buf",
        "version": "1.0",
        "metadata": { "vertex_count": 4, "quad_count": 1, "triangle_count": 0 },
        "attributes": {
            "position": { "array": [0,0,0, 1,0,0, 1,1,0, 0,1,0], "itemSize": 3, "count": 4 }
        },
        "faces": [ { "type": "quad", "vertices": [0, 1, 2, 3] } ]
    }"#;

    #[test]
    fn huge_vertex_count_is_invalid_geometry() {
        let text = r#"{
            "format": "buf",
            "metadata": { "vertex_count": 9223372036854775807 },
            "attributes": { "position": { "array": [0, 0, 0], "itemSize": 3 } },
            "faces": []
        }"#;
        assert!(matches!(parse_buf(text), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn quad_triangulates_with_fixed_diagonal() -> Result<()> {
        let mesh = parse_buf(ONE_QUAD)?;
        assert_eq!(mesh.triangle_mesh().indices(), Some(&[0, 1, 2, 0, 2, 3][..]));
        Ok(())
    }

    #[test]
    fn quad_yields_four_boundary_edges() -> Result<()> {
        let edges = parse_buf(ONE_QUAD)?.edges();
        assert_eq!(
            edges,
            vec![
                EdgeKey::new(0, 1),
                EdgeKey::new(1, 2),
                EdgeKey::new(2, 3),
                EdgeKey::new(3, 0),
            ]
        );
        Ok(())
    }

    #[test]
    fn wrong_format_is_rejected_first() {
        // Faces are invalid too; the format check must win.
        let text = r#"{ "format": "obj", "metadata": { "vertex_count": 1 },
                        "attributes": {}, "faces": [ { "type": "quad", "vertices": [9] } ] }"#;
        assert!(matches!(
            parse_buf(text),
            Err(Error::UnsupportedFormat { found, .. }) if found == "obj"
        ));
    }

    #[test]
    fn missing_format_is_unsupported() {
        assert!(matches!(
            parse_buf(r#"{ "faces": [] }"#),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn face_arity_must_match_type() {
        let text = ONE_QUAD.replace(r#""type": "quad""#, r#""type": "triangle""#);
        assert!(matches!(parse_buf(&text), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn short_attribute_array_is_rejected() {
        let text = ONE_QUAD.replace("0,1,0], \"itemSize\"", "0,1], \"itemSize\"");
        assert!(matches!(parse_buf(&text), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn face_index_out_of_range_is_rejected() {
        let text = ONE_QUAD.replace("[0, 1, 2, 3]", "[0, 1, 2, 4]");
        assert!(matches!(parse_buf(&text), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(parse_buf("{ not json"), Err(Error::Json(_))));
    }
}
