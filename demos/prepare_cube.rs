use anyhow::Result;
use barywire_geometry::builders::MeshBuilder;
use barywire_geometry::{BARYCENTRIC, PARITY, prepare_wireframe_geometry};

fn main() -> Result<()> {
    let cube = MeshBuilder::indexed_cube(1.0)?;
    let prepared = prepare_wireframe_geometry(&cube, true)?;
    println!("{} vertices", prepared.vertex_count());
    if let (Some(bary), Some(parity)) = (
        prepared.attribute(BARYCENTRIC).and_then(|a| a.as_f32()),
        prepared.attribute(PARITY).and_then(|a| a.as_f32()),
    ) {
        println!("first triangle barycentric: {:?}", &bary[..9]);
        println!("first triangle parity:      {:?}", &parity[..3]);
    }
    Ok(())
}
