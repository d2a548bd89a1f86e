use barywire_base::{Result, invalid_geometry};
use tracing::debug;

use crate::mesh::{UnindexedMesh, VertexAttribute, common_vertex_count};

pub const BARYCENTRIC: &str = "barycentric";
pub const PARITY: &str = "parity";

/// Barycentric coordinates for the three vertices of triangle `index`.
///
/// Even and odd triangles swap the first two corners; the third corner keeps
/// `(1, 0, q)` where `q` marks the edge the fragment shader may drop.
pub fn triangle_barycentric(index: usize, remove_edge: bool) -> [f32; 9] {
    let q = if remove_edge { 1.0 } else { 0.0 };
    if index % 2 == 0 {
        [0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, q]
    } else {
        [0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, q]
    }
}

/// 1.0 for even triangles, 0.0 for odd ones.
pub fn triangle_parity(index: usize) -> f32 {
    if index % 2 == 0 { 1.0 } else { 0.0 }
}

/// Returns a copy of `mesh` with `barycentric` (3-wide) and `parity`
/// (1-wide) attributes appended.
pub fn tag(mesh: &UnindexedMesh, remove_edge: bool) -> Result<UnindexedMesh> {
    let vertex_count = common_vertex_count(mesh.attribute_map())?;
    if vertex_count % 3 != 0 {
        return Err(invalid_geometry(format!(
            "vertex count {vertex_count} is not a multiple of 3"
        )));
    }

    let triangles = vertex_count / 3;
    let mut barycentric = Vec::with_capacity(vertex_count * 3);
    let mut parity = Vec::with_capacity(vertex_count);
    for index in 0..triangles {
        barycentric.extend_from_slice(&triangle_barycentric(index, remove_edge));
        parity.extend_from_slice(&[triangle_parity(index); 3]);
    }

    let mut tagged = mesh.clone();
    tagged.insert_attribute(BARYCENTRIC, VertexAttribute::f32(3, barycentric)?);
    tagged.insert_attribute(PARITY, VertexAttribute::f32(1, parity)?);
    debug!(triangles, remove_edge, "tagged wireframe attributes");
    Ok(tagged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deindex::deindex;
    use crate::mesh::{Mesh, POSITION};

    fn strip(triangles: usize) -> Result<UnindexedMesh> {
        let mesh = Mesh::new().with_attribute(
            POSITION,
            VertexAttribute::f32(3, vec![0.0; triangles * 9])?,
        );
        deindex(&mesh)
    }

    fn values<'a>(mesh: &'a UnindexedMesh, name: &str) -> &'a [f32] {
        mesh.attribute(name)
            .and_then(|attr| attr.as_f32())
            .unwrap_or_default()
    }

    #[test]
    fn parity_alternates_per_triangle() -> Result<()> {
        let tagged = tag(&strip(4)?, false)?;
        assert_eq!(
            values(&tagged, PARITY),
            &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]
        );
        Ok(())
    }

    #[test]
    fn odd_triangle_swaps_first_two_corners() -> Result<()> {
        let tagged = tag(&strip(2)?, false)?;
        assert_eq!(
            &values(&tagged, BARYCENTRIC)[9..18],
            &[0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]
        );
        Ok(())
    }

    #[test]
    fn remove_edge_only_changes_last_component() -> Result<()> {
        let source = strip(3)?;
        let kept = tag(&source, false)?;
        let removed = tag(&source, true)?;
        let kept = values(&kept, BARYCENTRIC);
        let removed = values(&removed, BARYCENTRIC);
        for (i, (a, b)) in kept.iter().zip(removed).enumerate() {
            if i % 9 == 8 {
                assert_eq!((*a, *b), (0.0, 1.0));
            } else {
                assert_eq!(a, b);
            }
        }
        Ok(())
    }

    #[test]
    fn retagging_replaces_existing_attributes() -> Result<()> {
        let once = tag(&strip(2)?, false)?;
        let twice = tag(&once, true)?;
        assert_eq!(twice.attributes().count(), once.attributes().count());
        assert_eq!(values(&twice, BARYCENTRIC).len(), 18);
        assert_eq!(values(&twice, PARITY).len(), 6);
        for triangle in values(&twice, BARYCENTRIC).chunks(9) {
            assert_eq!(triangle[8], 1.0);
        }
        Ok(())
    }

    #[test]
    fn rejects_unaligned_vertex_count() -> Result<()> {
        let mesh = Mesh::new().with_attribute(POSITION, VertexAttribute::f32(3, vec![0.0; 12])?);
        let unindexed = deindex(&mesh)?;
        assert!(tag(&unindexed, false).is_err());
        Ok(())
    }

    #[test]
    fn input_is_left_untouched() -> Result<()> {
        let source = strip(1)?;
        let _ = tag(&source, true)?;
        assert!(source.attribute(BARYCENTRIC).is_none());
        Ok(())
    }
}
