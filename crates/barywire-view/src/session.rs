use std::path::PathBuf;
use std::time::Instant;

use barywire_base::{Result, Viewport};
use barywire_geometry::{EdgeKey, UnindexedMesh};
use barywire_io::{BufMesh, MeshLoader, PendingMesh};
use barywire_material::{
    FeatureFlags, FeatureFlagsPatch, ResizeObserver, ShaderBackend, UniformValues, VariantId,
    WireframeMaterialCache, WireframeUniforms,
};
use tracing::{debug, info};

use crate::config::{OrbitCamera, ViewConfig};

/// Source of elapsed time for the animated uniforms.
#[derive(Clone, Copy, Debug)]
pub enum FrameClock {
    Realtime { start: Instant },
    Fixed { step: f32, elapsed: f32 },
}

impl FrameClock {
    pub fn realtime() -> Self {
        FrameClock::Realtime {
            start: Instant::now(),
        }
    }

    pub fn fixed(step: f32) -> Self {
        FrameClock::Fixed { step, elapsed: 0.0 }
    }

    /// Advances one frame and returns seconds since the clock started.
    pub fn tick(&mut self) -> f32 {
        match self {
            FrameClock::Realtime { start } => start.elapsed().as_secs_f32(),
            FrameClock::Fixed { step, elapsed } => {
                *elapsed += *step;
                *elapsed
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub elapsed: f32,
    pub variant: VariantId,
    pub recompiled: bool,
    /// `false` while the mesh is still loading.
    pub drawn: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub draws: u64,
    pub recompilations: u64,
}

/// One wireframe scene: prepared geometry, the material cache and the
/// per-frame state that drives it.
pub struct WireframeSession<B: ShaderBackend> {
    cache: WireframeMaterialCache<B>,
    flags: FeatureFlags,
    base_uniforms: WireframeUniforms,
    active: Option<VariantId>,
    geometry: Option<UnindexedMesh>,
    edges: Vec<EdgeKey>,
    pending: Option<PendingMesh>,
    remove_edge: bool,
    viewport: Viewport,
    pixel_ratio: f32,
    camera: OrbitCamera,
    clock: FrameClock,
    stats: SessionStats,
}

impl<B: ShaderBackend> WireframeSession<B> {
    pub fn new(backend: B, config: &ViewConfig, clock: FrameClock) -> Self {
        let mut base_uniforms = WireframeUniforms::default();
        base_uniforms.apply(&config.uniforms);
        base_uniforms.resolution = config.viewport.physical_size(config.pixel_ratio);
        Self {
            cache: WireframeMaterialCache::new(backend),
            flags: config.features,
            base_uniforms,
            active: None,
            geometry: None,
            edges: Vec::new(),
            pending: None,
            remove_edge: config.remove_edge,
            viewport: config.viewport,
            pixel_ratio: config.pixel_ratio,
            camera: config.camera,
            clock,
            stats: SessionStats::default(),
        }
    }

    pub fn cache(&self) -> &WireframeMaterialCache<B> {
        &self.cache
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn geometry(&self) -> Option<&UnindexedMesh> {
        self.geometry.as_ref()
    }

    /// Original face-boundary edges of the loaded mesh.
    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a background load; the mesh shows up on a later frame.
    pub fn load(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.pending = Some(MeshLoader::spawn(path)?);
        Ok(())
    }

    pub fn set_mesh(&mut self, mesh: &BufMesh) -> Result<()> {
        let prepared = mesh.prepare(self.remove_edge)?;
        self.edges = mesh.edges();
        info!(
            vertices = prepared.vertex_count(),
            edges = self.edges.len(),
            "wireframe geometry ready"
        );
        self.geometry = Some(prepared);
        Ok(())
    }

    /// Toggles features the way a settings panel does.
    pub fn set_features(&mut self, patch: &FeatureFlagsPatch) -> Result<bool> {
        let changed = !patch.apply_to(&mut self.flags).is_empty();
        if let (true, Some(id)) = (changed, self.active) {
            self.cache.update_features(id, patch)?;
        }
        Ok(changed)
    }

    pub fn set_uniforms(&mut self, values: &UniformValues) -> Result<usize> {
        let applied = self.base_uniforms.apply(values);
        if let Some(id) = self.active {
            self.cache.update_uniforms(id, values)?;
        }
        Ok(applied)
    }

    /// Runs one frame: picks up a finished load, advances time and camera,
    /// and prepares the active variant for drawing.
    pub fn frame(&mut self) -> Result<FrameReport> {
        self.poll_loader()?;

        let elapsed = self.clock.tick();
        self.cache.update_time(elapsed);
        self.cache.update_camera_position(self.camera.position(elapsed));

        let id = match self.active {
            Some(id) => id,
            None => {
                let mut seed = self.base_uniforms.clone();
                seed.time = elapsed;
                seed.camera_position = self.camera.position(elapsed).into();
                let id = self.cache.get_or_create(self.flags, &seed)?;
                self.active = Some(id);
                id
            }
        };

        let before = self.cache.compilations();
        self.cache.prepare(id)?;
        let recompiled = self.cache.compilations() > before;

        let drawn = self.geometry.is_some();
        self.stats.frames += 1;
        if drawn {
            self.stats.draws += 1;
        }
        if recompiled {
            self.stats.recompilations += 1;
        }
        debug!(frame = self.stats.frames, elapsed, drawn, recompiled, "frame");
        Ok(FrameReport {
            frame: self.stats.frames,
            elapsed,
            variant: id,
            recompiled,
            drawn,
        })
    }

    /// Blocks until a pending load completes.
    pub fn finish_loading(&mut self) -> Result<()> {
        match self.pending.take() {
            Some(pending) => self.set_mesh(&pending.wait()?),
            None => Ok(()),
        }
    }

    /// Releases every compiled program.
    pub fn shutdown(&mut self) -> usize {
        self.active = None;
        self.pending = None;
        self.cache.clear()
    }

    fn poll_loader(&mut self) -> Result<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        let Some(result) = pending.poll() else {
            return Ok(());
        };
        self.pending = None;
        self.set_mesh(&result?)
    }
}

impl<B: ShaderBackend> ResizeObserver for WireframeSession<B> {
    fn on_resize(&mut self, width: u32, height: u32, pixel_ratio: f32) {
        self.viewport = Viewport { width, height };
        self.pixel_ratio = pixel_ratio;
        self.base_uniforms.resolution = self.viewport.physical_size(pixel_ratio);
        self.cache.on_resize(width, height, pixel_ratio);
    }
}
