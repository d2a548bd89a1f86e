use barywire_base::{Result, invalid_geometry};
use tracing::debug;

use crate::mesh::{AttributeMap, Mesh, UnindexedMesh, check_indices};

/// Expands an indexed mesh so that every triangle owns its three vertices.
///
/// Triangles are emitted in index order; for a triangle `(a, b, c)` each
/// attribute receives the values at `a`, `b` and `c`. A mesh without an
/// index array is copied unchanged.
pub fn deindex(mesh: &Mesh) -> Result<UnindexedMesh> {
    let Some(indices) = mesh.indices() else {
        return Ok(UnindexedMesh::from_attributes(mesh.attribute_map().clone()));
    };

    if indices.len() % 3 != 0 {
        return Err(invalid_geometry(format!(
            "index count {} is not a multiple of 3",
            indices.len()
        )));
    }
    check_indices(mesh.attribute_map(), indices)?;

    let attributes: AttributeMap = mesh
        .attributes()
        .map(|(name, attr)| (name.to_string(), attr.gather(indices)))
        .collect();

    debug!(
        triangles = indices.len() / 3,
        attributes = attributes.len(),
        "deindexed mesh"
    );
    Ok(UnindexedMesh::from_attributes(attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{AttributeData, POSITION, UV, VertexAttribute};

    fn quad() -> Result<Mesh> {
        Ok(Mesh::new()
            .with_attribute(
                POSITION,
                VertexAttribute::f32(
                    3,
                    vec![
                        0.0, 0.0, 0.0, //
                        1.0, 0.0, 0.0, //
                        1.0, 1.0, 0.0, //
                        0.0, 1.0, 0.0,
                    ],
                )?,
            )
            .with_attribute(UV, VertexAttribute::f32(2, vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])?)
            .with_attribute("id", VertexAttribute::u32(1, vec![10, 11, 12, 13])?)
            .with_indices(vec![0, 1, 2, 0, 2, 3]))
    }

    #[test]
    fn copies_values_in_index_order() -> Result<()> {
        let out = deindex(&quad()?)?;
        assert_eq!(out.vertex_count(), 6);
        let ids = out.attribute("id").map(|attr| attr.data().clone());
        assert_eq!(ids, Some(AttributeData::U32(vec![10, 11, 12, 10, 12, 13])));
        let uv = out.attribute(UV).and_then(|attr| attr.as_f32()).unwrap_or_default();
        assert_eq!(&uv[6..8], &[0.0, 0.0]);
        assert_eq!(&uv[10..12], &[0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn keeps_element_types() -> Result<()> {
        let out = deindex(&quad()?)?;
        assert!(out.attributes().all(|(_, attr)| attr.vertex_count() == 6));
        assert_eq!(
            out.attribute("id").map(|attr| attr.data().element_type()),
            Some(crate::mesh::ElementType::U32)
        );
        Ok(())
    }

    #[test]
    fn unindexed_input_is_copied() -> Result<()> {
        let mesh = Mesh::new().with_attribute(POSITION, VertexAttribute::f32(3, vec![0.5; 9])?);
        let out = deindex(&mesh)?;
        assert_eq!(Mesh::from(out), mesh);
        Ok(())
    }

    #[test]
    fn rejects_partial_triangle() -> Result<()> {
        let mut mesh = quad()?;
        mesh.set_indices(Some(vec![0, 1, 2, 3]));
        assert!(deindex(&mesh).is_err());
        Ok(())
    }

    #[test]
    fn rejects_out_of_bounds_for_any_attribute() -> Result<()> {
        let mut mesh = quad()?;
        mesh.insert_attribute("short", VertexAttribute::f32(1, vec![0.0, 1.0, 2.0])?);
        let err = deindex(&mesh).expect_err("index 3 exceeds `short`");
        assert!(err.to_string().contains("short"));
        Ok(())
    }

    #[test]
    fn does_not_touch_source() -> Result<()> {
        let mesh = quad()?;
        let before = mesh.clone();
        let _ = deindex(&mesh)?;
        assert_eq!(mesh, before);
        Ok(())
    }
}
