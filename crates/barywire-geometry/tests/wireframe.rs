use barywire_geometry::builders::MeshBuilder;
use barywire_geometry::{
    BARYCENTRIC, Mesh, PARITY, Result, deindex, prepare_wireframe_geometry, tag,
};

fn floats<'a>(mesh: &'a barywire_geometry::UnindexedMesh, name: &str) -> &'a [f32] {
    mesh.attribute(name)
        .and_then(|attr| attr.as_f32())
        .unwrap_or_default()
}

#[test]
fn cube_scenario() -> Result<()> {
    let cube = MeshBuilder::indexed_cube(1.0)?;
    assert_eq!(cube.vertex_count(), 8);

    let unindexed = deindex(&cube)?;
    assert_eq!(unindexed.vertex_count(), 36);
    assert_eq!(unindexed.triangle_count(), 12);

    for remove_edge in [false, true] {
        let tagged = tag(&unindexed, remove_edge)?;
        let barycentric = floats(&tagged, BARYCENTRIC);
        let parity = floats(&tagged, PARITY);
        assert_eq!(barycentric.len(), 36 * 3);
        assert_eq!(parity.len(), 36);
        let q = if remove_edge { 1.0 } else { 0.0 };
        assert_eq!(&barycentric[..9], &[0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, q]);
    }
    Ok(())
}

#[test]
fn deindex_is_idempotent() -> Result<()> {
    let once = deindex(&MeshBuilder::indexed_cube(3.0)?)?;
    let twice = deindex(&Mesh::from(once.clone()))?;
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn vertex_count_matches_index_count() -> Result<()> {
    let grid = MeshBuilder::grid(3, 2, 1.0)?.to_triangle_mesh();
    let index_count = grid.indices().map(<[u32]>::len).unwrap_or(0);
    let out = deindex(&grid)?;
    assert_eq!(out.vertex_count(), index_count);
    assert!(Mesh::from(out).indices().is_none());
    Ok(())
}

#[test]
fn parity_follows_triangle_index() -> Result<()> {
    let prepared = prepare_wireframe_geometry(&MeshBuilder::indexed_cube(1.0)?, false)?;
    for (triangle, values) in floats(&prepared, PARITY).chunks_exact(3).enumerate() {
        let expected = if triangle % 2 == 0 { 1.0 } else { 0.0 };
        assert_eq!(values, &[expected; 3]);
    }
    Ok(())
}

#[test]
fn prepared_grid_keeps_source_attributes() -> Result<()> {
    let grid = MeshBuilder::grid(1, 1, 2.0)?;
    let prepared = prepare_wireframe_geometry(&grid.to_triangle_mesh(), true)?;
    let names: Vec<&str> = prepared.attributes().map(|(name, _)| name).collect();
    assert_eq!(names, vec![BARYCENTRIC, PARITY, "position", "uv"]);
    Ok(())
}
