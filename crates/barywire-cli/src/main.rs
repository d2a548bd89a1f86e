use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use barywire_geometry::PolygonMesh;
use barywire_geometry::builders::MeshBuilder;
use barywire_io::{load_buf, save_buf};
use barywire_material::{
    FeatureFlag, FeatureFlags, NagaBackend, ShaderDefines, ShaderSource, WireframeMaterialCache,
    WireframeUniforms,
};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "barywire")]
#[command(about = "Barycentric wireframe geometry and shader-variant tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prints counts, attributes and bounds of a buf file.
    Inspect(InspectArgs),
    /// Deindexes and tags a buf mesh for wireframe rendering.
    Prepare(PrepareArgs),
    Generate {
        #[command(subcommand)]
        command: GenerateCommand,
    },
    /// Compiles shader variants and reports their keys and defines.
    Variants(VariantsArgs),
}

#[derive(Subcommand)]
enum GenerateCommand {
    Cube(CubeArgs),
    Grid(GridArgs),
}

#[derive(Args)]
struct InspectArgs {
    #[arg(long = "in")]
    input: PathBuf,
}

#[derive(Args)]
struct PrepareArgs {
    #[arg(long = "in")]
    input: PathBuf,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    remove_edge: bool,
}

#[derive(Args)]
struct CubeArgs {
    #[arg(long, default_value_t = 1.0)]
    size: f32,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args)]
struct GridArgs {
    #[arg(long, default_value_t = 4)]
    columns: u32,
    #[arg(long, default_value_t = 4)]
    rows: u32,
    #[arg(long, default_value_t = 1.0)]
    size: f32,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args)]
struct VariantsArgs {
    /// Comma-separated flag names, e.g. `dashEnabled,noiseA`.
    #[arg(long)]
    flags: Option<String>,
    /// Writes the preprocessed WGSL of every variant into this directory.
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect(args) => inspect(args),
        Command::Prepare(args) => prepare(args),
        Command::Generate {
            command: GenerateCommand::Cube(args),
        } => generate_cube(args),
        Command::Generate {
            command: GenerateCommand::Grid(args),
        } => generate_grid(args),
        Command::Variants(args) => variants(args),
    }
}

fn inspect(args: InspectArgs) -> Result<()> {
    let mesh = load_buf(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let polygons = &mesh.polygons;

    println!("file:       {}", args.input.display());
    if let Some(name) = &mesh.metadata.object_name {
        println!("object:     {name}");
    }
    println!("vertices:   {}", polygons.mesh.vertex_count());
    println!(
        "faces:      {} ({} quads, {} triangles)",
        polygons.faces.len(),
        polygons.quad_count(),
        polygons.triangle_face_count()
    );
    println!("triangles:  {}", mesh.triangle_mesh().triangle_count());
    println!("edges:      {}", mesh.edges().len());
    for (name, attr) in polygons.mesh.attributes() {
        println!("attribute:  {name} (itemSize {})", attr.item_size());
    }
    if let Some((min, max)) = polygons.mesh.bounds() {
        println!(
            "bounds:     [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }
    Ok(())
}

fn prepare(args: PrepareArgs) -> Result<()> {
    let mesh = load_buf(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let prepared = mesh
        .prepare(args.remove_edge)
        .context("failed to prepare wireframe geometry")?;
    let vertices = prepared.vertex_count();
    let soup = PolygonMesh::from_unindexed(prepared)?;
    save_buf(&soup, &args.out, mesh.metadata.object_name.as_deref())
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(
        path = %args.out.display(),
        vertices,
        remove_edge = args.remove_edge,
        "prepared mesh written"
    );
    Ok(())
}

fn generate_cube(args: CubeArgs) -> Result<()> {
    let cube = MeshBuilder::quad_cube(args.size).context("failed to build cube")?;
    let name = args.name.unwrap_or_else(|| "Cube".to_string());
    write_generated(&cube, &args.out, &name)
}

fn generate_grid(args: GridArgs) -> Result<()> {
    let grid = MeshBuilder::grid(args.columns, args.rows, args.size)
        .context("failed to build grid")?;
    let name = args.name.unwrap_or_else(|| "Grid".to_string());
    write_generated(&grid, &args.out, &name)
}

fn write_generated(polygons: &PolygonMesh, out: &Path, name: &str) -> Result<()> {
    save_buf(polygons, out, Some(name))
        .with_context(|| format!("failed to write {}", out.display()))?;
    info!(path = %out.display(), faces = polygons.faces.len(), "buf export complete");
    Ok(())
}

fn variants(args: VariantsArgs) -> Result<()> {
    let combos = match &args.flags {
        Some(text) => vec![parse_flags(text)?],
        None => default_combos(),
    };

    let mut cache = WireframeMaterialCache::new(NagaBackend::new());
    let params = WireframeUniforms::default();
    let mut failures = 0;
    for flags in combos {
        let defines = ShaderDefines::from_flags(&flags);
        match cache.get_or_create(flags, &params) {
            Ok(id) => println!("ok    {id}  {}", describe(&defines)),
            Err(err) => {
                failures += 1;
                warn!(error = %err, "variant failed");
                println!("error {}  {err}", describe(&defines));
            }
        }
        if let Some(dir) = &args.dump {
            dump_sources(dir, &flags, &defines)?;
        }
    }

    println!("{} variants compiled, {failures} failed", cache.len());
    if failures > 0 {
        bail!("{failures} shader variant(s) failed to compile");
    }
    Ok(())
}

/// No flags, each flag alone, then everything on.
fn default_combos() -> Vec<FeatureFlags> {
    let mut combos = vec![FeatureFlags::none()];
    combos.extend(FeatureFlag::ALL.map(|flag| FeatureFlags::none().with(flag, true)));
    combos.push(FeatureFlags::all());
    combos
}

fn parse_flags(text: &str) -> Result<FeatureFlags> {
    let mut flags = FeatureFlags::none();
    for name in text.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let Some(flag) = FeatureFlag::from_name(name) else {
            let known: Vec<&str> = FeatureFlag::ALL.iter().map(|flag| flag.name()).collect();
            bail!("unknown flag `{name}` (known: {})", known.join(", "));
        };
        flags.set(flag, true);
    }
    Ok(flags)
}

fn describe(defines: &ShaderDefines) -> String {
    if defines.is_empty() {
        "(no defines)".to_string()
    } else {
        defines.iter().collect::<Vec<_>>().join(" ")
    }
}

fn dump_sources(dir: &Path, flags: &FeatureFlags, defines: &ShaderDefines) -> Result<()> {
    let source = ShaderSource::for_defines(defines).map_err(anyhow::Error::msg)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let stem = variant_file_stem(flags);
    std::fs::write(dir.join(format!("{stem}.vert.wgsl")), &source.vertex)?;
    std::fs::write(dir.join(format!("{stem}.frag.wgsl")), &source.fragment)?;
    Ok(())
}

fn variant_file_stem(flags: &FeatureFlags) -> String {
    let names: Vec<&str> = flags.enabled().map(FeatureFlag::name).collect();
    if names.is_empty() {
        "base".to_string()
    } else {
        names.join("+")
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flag_lists() -> Result<()> {
        let flags = parse_flags("dashEnabled, noiseA,")?;
        assert!(flags.dash_enabled && flags.noise_a);
        assert!(!flags.squeeze);
        assert!(parse_flags("dashEnabled,wobble").is_err());
        Ok(())
    }

    #[test]
    fn default_combos_cover_each_flag() {
        let combos = default_combos();
        assert_eq!(combos.len(), FeatureFlag::ALL.len() + 2);
        assert_eq!(combos.first(), Some(&FeatureFlags::none()));
        assert_eq!(combos.last(), Some(&FeatureFlags::all()));
    }

    #[test]
    fn file_stems_name_enabled_flags() {
        let flags = FeatureFlags::none()
            .with(FeatureFlag::NoiseA, true)
            .with(FeatureFlag::DashEnabled, true);
        assert_eq!(variant_file_stem(&flags), "dashEnabled+noiseA");
        assert_eq!(variant_file_stem(&FeatureFlags::none()), "base");
    }
}
