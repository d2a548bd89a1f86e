use anyhow::Result;
use barywire_geometry::builders::MeshBuilder;
use barywire_io::save_buf;

fn main() -> Result<()> {
    let cube = MeshBuilder::quad_cube(2.0)?;
    save_buf(&cube, "out/cube.buf", Some("Cube"))?;
    Ok(())
}
