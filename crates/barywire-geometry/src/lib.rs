pub mod barycentric;
pub mod builders;
pub mod deindex;
pub mod faces;
pub mod mesh;

pub use barycentric::{BARYCENTRIC, PARITY, tag};
pub use barywire_base::{Error, Result};
pub use deindex::deindex;
pub use faces::{EdgeKey, Face, PolygonMesh};
pub use mesh::{AttributeData, ElementType, Mesh, UnindexedMesh, VertexAttribute};

pub use cgmath::{Point3, Vector3};

/// Deindexes `mesh` and tags the result with barycentric and parity attributes.
pub fn prepare_wireframe_geometry(mesh: &Mesh, remove_edge: bool) -> Result<UnindexedMesh> {
    let unindexed = deindex(mesh)?;
    tag(&unindexed, remove_edge)
}
