use anyhow::{Context, Result};
use barywire_material::{NagaBackend, ResizeObserver, ShaderBackend};
use barywire_view::{FrameClock, ViewConfig, WireframeSession};
use tracing::info;

use crate::cli::HeadlessArgs;

pub fn run_headless(args: HeadlessArgs) -> Result<()> {
    let mut config = ViewConfig::load(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?;
    if let Some(frames) = args.frames {
        config.frames = frames;
    }

    if args.gpu {
        run_gpu(&config)
    } else {
        run_scene(NagaBackend::new(), &config)
    }
}

#[cfg(feature = "gpu")]
fn run_gpu(config: &ViewConfig) -> Result<()> {
    let backend = barywire_view::gpu::WgpuBackend::new().context("failed to open gpu device")?;
    run_scene(backend, config)
}

#[cfg(not(feature = "gpu"))]
fn run_gpu(_config: &ViewConfig) -> Result<()> {
    anyhow::bail!("GPU support disabled. Rebuild with --features gpu.");
}

fn run_scene<B: ShaderBackend>(backend: B, config: &ViewConfig) -> Result<()> {
    let mut session = WireframeSession::new(backend, config, FrameClock::fixed(config.frame_step));
    if let Some(mesh) = &config.mesh {
        session.load(mesh)?;
    }

    for frame in 0..config.frames {
        for event in config.timeline.iter().filter(|event| event.frame == frame) {
            if let Some(features) = &event.features {
                session.set_features(features)?;
            }
            if let Some(uniforms) = &event.uniforms {
                session.set_uniforms(uniforms)?;
            }
            if let Some(viewport) = event.resize {
                session.on_resize(viewport.width, viewport.height, config.pixel_ratio);
            }
        }
        session.frame().with_context(|| format!("frame {frame} failed"))?;
    }

    if session.is_loading() {
        info!("mesh still loading after the last frame; waiting");
        session.finish_loading()?;
    }

    let stats = session.stats();
    info!(
        frames = stats.frames,
        draws = stats.draws,
        recompilations = stats.recompilations,
        variants = session.cache().len(),
        "headless run finished"
    );
    println!(
        "frames: {}  draws: {}  recompilations: {}  edges: {}",
        stats.frames,
        stats.draws,
        stats.recompilations,
        session.edge_count()
    );
    session.shutdown();
    Ok(())
}
