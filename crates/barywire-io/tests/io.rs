use barywire_geometry::builders::MeshBuilder;
use barywire_geometry::{BARYCENTRIC, PARITY};
use barywire_io::{load_buf, parse_buf, save_buf, write_buf};
use barywire_base::Result;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let stamp = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis(),
        Err(_) => 0,
    };
    path.push(format!("barywire_{stamp}_{file_name}"));
    path
}

#[test]
fn written_cube_reads_back_with_same_faces() -> Result<()> {
    let cube = MeshBuilder::quad_cube(2.0)?;
    let text = write_buf(&cube, Some("Cube"))?;
    let read = parse_buf(&text)?;

    assert_eq!(read.polygons.faces, cube.faces);
    assert_eq!(read.metadata.quad_count, 6);
    assert_eq!(read.metadata.triangle_count, 0);
    assert_eq!(read.metadata.object_name.as_deref(), Some("Cube"));
    assert_eq!(read.edges().len(), 24);
    Ok(())
}

#[test]
fn saved_file_loads_and_prepares() -> Result<()> {
    let grid = MeshBuilder::grid(2, 2, 1.0)?;
    let path = temp_path("grid.buf");
    save_buf(&grid, &path, None)?;

    let mesh = load_buf(&path)?;
    let prepared = mesh.prepare(true)?;
    // 4 quads -> 8 triangles -> 24 vertices.
    assert_eq!(prepared.vertex_count(), 24);
    assert!(prepared.attribute(BARYCENTRIC).is_some());
    assert!(prepared.attribute(PARITY).is_some());

    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn edge_lines_cover_every_edge() -> Result<()> {
    let grid = MeshBuilder::grid(1, 1, 1.0)?;
    let lines = grid.edge_line_positions()?;
    assert_eq!(lines.len(), 4 * 6);
    Ok(())
}
