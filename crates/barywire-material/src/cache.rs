//! Shader-variant cache for the wireframe material.
//!
//! Each distinct feature-flag combination maps to one compiled variant.
//! Callers hold [`VariantId`] handles; feature changes mark a variant stale
//! and [`WireframeMaterialCache::prepare`] recompiles it before the next draw.
//! Uniform-only changes never trigger a recompilation.

use std::collections::HashMap;
use std::fmt;

use barywire_base::{Error, Result};
use tracing::{debug, info, warn};

use crate::backend::{ProgramDescriptor, ShaderBackend};
use crate::defines::ShaderDefines;
use crate::flags::{FeatureFlags, FeatureFlagsPatch, VariantKey};
use crate::shader::{RenderState, ShaderSource};
use crate::uniforms::{UniformValues, WireframeUniforms};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantId(u64);

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantState {
    Uncompiled,
    Compiled,
    /// Flags changed since the last compile.
    Stale,
    Disposed,
}

pub struct MaterialVariant<P> {
    id: VariantId,
    key: VariantKey,
    flags: FeatureFlags,
    defines: ShaderDefines,
    compiled_defines: ShaderDefines,
    uniforms: WireframeUniforms,
    render_state: RenderState,
    state: VariantState,
    program: Option<P>,
    uniforms_dirty: bool,
    compile_count: u32,
}

impl<P> MaterialVariant<P> {
    pub fn id(&self) -> VariantId {
        self.id
    }

    pub fn key(&self) -> &VariantKey {
        &self.key
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn defines(&self) -> &ShaderDefines {
        &self.defines
    }

    pub fn uniforms(&self) -> &WireframeUniforms {
        &self.uniforms
    }

    pub fn render_state(&self) -> RenderState {
        self.render_state
    }

    pub fn state(&self) -> VariantState {
        self.state
    }

    pub fn program(&self) -> Option<&P> {
        self.program.as_ref()
    }

    pub fn compile_count(&self) -> u32 {
        self.compile_count
    }

    pub fn needs_compile(&self) -> bool {
        matches!(self.state, VariantState::Uncompiled | VariantState::Stale)
    }

    fn mark_uniforms_dirty(&mut self) {
        self.uniforms_dirty = true;
    }
}

impl<P> fmt::Debug for MaterialVariant<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialVariant")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("state", &self.state)
            .field("compile_count", &self.compile_count)
            .finish()
    }
}

pub struct WireframeMaterialCache<B: ShaderBackend> {
    backend: B,
    variants: HashMap<VariantId, MaterialVariant<B::Program>>,
    by_key: HashMap<VariantKey, VariantId>,
    next_id: u64,
    compilations: u64,
}

impl<B: ShaderBackend> WireframeMaterialCache<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            variants: HashMap::new(),
            by_key: HashMap::new(),
            next_id: 1,
            compilations: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Successful program builds since the cache was created.
    pub fn compilations(&self) -> u64 {
        self.compilations
    }

    pub fn lookup(&self, flags: &FeatureFlags) -> Option<VariantId> {
        self.by_key.get(&flags.cache_key()).copied()
    }

    pub fn variant(&self, id: VariantId) -> Option<&MaterialVariant<B::Program>> {
        self.variants.get(&id)
    }

    /// Variants ordered by id.
    pub fn variants(&self) -> Vec<&MaterialVariant<B::Program>> {
        let mut variants: Vec<_> = self.variants.values().collect();
        variants.sort_by_key(|variant| variant.id);
        variants
    }

    /// Returns the variant for `flags`, compiling it on first use. `params`
    /// only seed a new variant; an existing one keeps its own uniforms.
    pub fn get_or_create(
        &mut self,
        flags: FeatureFlags,
        params: &WireframeUniforms,
    ) -> Result<VariantId> {
        let key = flags.cache_key();
        if let Some(&id) = self.by_key.get(&key) {
            debug!(variant = %id, "material cache hit");
            return Ok(id);
        }

        let defines = ShaderDefines::from_flags(&flags);
        let mut variant = MaterialVariant {
            id: VariantId(self.next_id),
            key: key.clone(),
            flags,
            defines: defines.clone(),
            compiled_defines: ShaderDefines::default(),
            uniforms: params.clone(),
            render_state: RenderState::from_flags(&flags),
            state: VariantState::Uncompiled,
            program: None,
            uniforms_dirty: false,
            compile_count: 0,
        };
        let program = build_program(&mut self.backend, &variant)?;
        self.compilations += 1;
        variant.program = Some(program);
        variant.compiled_defines = defines;
        variant.state = VariantState::Compiled;
        variant.compile_count = 1;

        let id = variant.id;
        self.next_id += 1;
        self.variants.insert(id, variant);
        self.by_key.insert(key, id);
        info!(variant = %id, defines = self.variants[&id].defines.len(), "material variant compiled");
        Ok(id)
    }

    /// Applies the differing flags of `patch`. Returns `true` when any flag
    /// changed; the variant is then stale until the next [`Self::prepare`].
    pub fn update_features(&mut self, id: VariantId, patch: &FeatureFlagsPatch) -> Result<bool> {
        let variant = self
            .variants
            .get_mut(&id)
            .ok_or_else(|| unknown_variant(id))?;
        let changed = patch.apply_to(&mut variant.flags);
        if changed.is_empty() {
            return Ok(false);
        }

        variant.defines = ShaderDefines::from_flags(&variant.flags);
        variant.render_state = RenderState::from_flags(&variant.flags);
        let diff = variant.defines.diff(&variant.compiled_defines);
        variant.state = if diff.is_empty() {
            VariantState::Compiled
        } else {
            VariantState::Stale
        };

        let old_key = std::mem::replace(&mut variant.key, variant.flags.cache_key());
        let new_key = variant.key.clone();
        if self.by_key.get(&old_key) == Some(&id) {
            self.by_key.remove(&old_key);
            self.reclaim_key(old_key);
        }
        self.by_key.entry(new_key).or_insert(id);

        debug!(
            variant = %id,
            added = ?diff.added,
            removed = ?diff.removed,
            "material features changed"
        );
        Ok(true)
    }

    /// Points a freed key at the oldest variant that carries it but lost
    /// the key to another variant earlier.
    fn reclaim_key(&mut self, key: VariantKey) {
        let heir = self
            .variants
            .values()
            .filter(|variant| variant.key == key)
            .map(|variant| variant.id)
            .min();
        if let Some(heir) = heir {
            debug!(variant = %heir, key = %key, "material key reassigned");
            self.by_key.insert(key, heir);
        }
    }

    /// Applies keyed uniform values and returns how many were accepted.
    /// Never changes the variant state.
    pub fn update_uniforms(&mut self, id: VariantId, values: &UniformValues) -> Result<usize> {
        let variant = self
            .variants
            .get_mut(&id)
            .ok_or_else(|| unknown_variant(id))?;
        let applied = variant.uniforms.apply(values);
        if applied > 0 {
            variant.mark_uniforms_dirty();
        }
        Ok(applied)
    }

    /// Makes the variant ready to draw: recompiles a stale program and
    /// uploads pending uniforms. A failed rebuild keeps the previous program
    /// and leaves the variant stale.
    pub fn prepare(&mut self, id: VariantId) -> Result<&MaterialVariant<B::Program>> {
        let variant = self
            .variants
            .get_mut(&id)
            .ok_or_else(|| unknown_variant(id))?;

        if variant.needs_compile() {
            let program = build_program(&mut self.backend, variant).inspect_err(|err| {
                warn!(variant = %id, error = %err, "material recompile failed");
            })?;
            if let Some(previous) = variant.program.replace(program) {
                self.backend.dispose(previous);
            }
            self.compilations += 1;
            variant.compiled_defines = variant.defines.clone();
            variant.state = VariantState::Compiled;
            variant.compile_count += 1;
            variant.uniforms_dirty = true;
            debug!(variant = %id, compiles = variant.compile_count, "material variant recompiled");
        }

        if variant.uniforms_dirty {
            if let Some(program) = variant.program.as_mut() {
                self.backend.write_uniforms(program, &variant.uniforms);
            }
            variant.uniforms_dirty = false;
        }
        Ok(&*variant)
    }

    pub fn update_time(&mut self, elapsed: f32) {
        for variant in self.variants.values_mut() {
            variant.uniforms.time = elapsed;
            variant.mark_uniforms_dirty();
        }
    }

    pub fn update_camera_position(&mut self, position: impl Into<[f32; 3]>) {
        let position = position.into();
        for variant in self.variants.values_mut() {
            variant.uniforms.camera_position = position;
            variant.mark_uniforms_dirty();
        }
    }

    /// Disposes every program and empties the cache. Outstanding ids become
    /// invalid.
    pub fn clear(&mut self) -> usize {
        let count = self.variants.len();
        for (_, mut variant) in self.variants.drain() {
            if let Some(program) = variant.program.take() {
                self.backend.dispose(program);
            }
            variant.state = VariantState::Disposed;
        }
        self.by_key.clear();
        if count > 0 {
            info!(count, "material cache cleared");
        }
        count
    }
}

/// Receives viewport size changes.
pub trait ResizeObserver {
    fn on_resize(&mut self, width: u32, height: u32, pixel_ratio: f32);
}

impl<B: ShaderBackend> ResizeObserver for WireframeMaterialCache<B> {
    fn on_resize(&mut self, width: u32, height: u32, pixel_ratio: f32) {
        let resolution = [width as f32 * pixel_ratio, height as f32 * pixel_ratio];
        for variant in self.variants.values_mut() {
            variant.uniforms.resolution = resolution;
            variant.mark_uniforms_dirty();
        }
    }
}

impl<B: ShaderBackend> Drop for WireframeMaterialCache<B> {
    fn drop(&mut self) {
        self.clear();
    }
}

fn build_program<B: ShaderBackend>(
    backend: &mut B,
    variant: &MaterialVariant<B::Program>,
) -> Result<B::Program> {
    let failed = |message: String| Error::ShaderCompilation {
        key: variant.key.to_string(),
        message,
    };
    let source = ShaderSource::for_defines(&variant.defines).map_err(failed)?;
    let descriptor = ProgramDescriptor {
        key: &variant.key,
        source: &source,
        defines: &variant.defines,
        uniforms: &variant.uniforms,
        render_state: variant.render_state,
    };
    backend.compile(&descriptor).map_err(failed)
}

fn unknown_variant(id: VariantId) -> Error {
    Error::InvalidParameter(format!("unknown material variant {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FeatureFlag;

    #[derive(Default)]
    struct CountingBackend {
        compiles: usize,
        uploads: usize,
        disposed: usize,
        fail_on: Option<&'static str>,
    }

    impl ShaderBackend for CountingBackend {
        type Program = usize;

        fn compile(&mut self, descriptor: &ProgramDescriptor<'_>) -> std::result::Result<usize, String> {
            if let Some(define) = self.fail_on {
                if descriptor.defines.contains(define) {
                    return Err(format!("{define} rejected"));
                }
            }
            self.compiles += 1;
            Ok(self.compiles)
        }

        fn write_uniforms(&mut self, _program: &mut usize, _uniforms: &WireframeUniforms) {
            self.uploads += 1;
        }

        fn dispose(&mut self, _program: usize) {
            self.disposed += 1;
        }
    }

    fn cache() -> WireframeMaterialCache<CountingBackend> {
        WireframeMaterialCache::new(CountingBackend::default())
    }

    #[test]
    fn stale_variant_recompiles_once_on_prepare() -> Result<()> {
        let mut cache = cache();
        let id = cache.get_or_create(FeatureFlags::none(), &WireframeUniforms::default())?;
        let patch = FeatureFlagsPatch::new().with(FeatureFlag::NoiseA, true);
        assert!(cache.update_features(id, &patch)?);
        assert_eq!(cache.variant(id).map(|v| v.state()), Some(VariantState::Stale));

        cache.prepare(id)?;
        cache.prepare(id)?;
        assert_eq!(cache.backend().compiles, 2);
        assert_eq!(cache.backend().disposed, 1);
        assert_eq!(cache.variant(id).map(|v| v.compile_count()), Some(2));
        Ok(())
    }

    #[test]
    fn reverting_a_change_needs_no_rebuild() -> Result<()> {
        let mut cache = cache();
        let id = cache.get_or_create(FeatureFlags::none(), &WireframeUniforms::default())?;
        cache.update_features(id, &FeatureFlagsPatch::new().with(FeatureFlag::Squeeze, true))?;
        cache.update_features(id, &FeatureFlagsPatch::new().with(FeatureFlag::Squeeze, false))?;
        assert_eq!(cache.variant(id).map(|v| v.state()), Some(VariantState::Compiled));
        cache.prepare(id)?;
        assert_eq!(cache.backend().compiles, 1);
        Ok(())
    }

    #[test]
    fn failed_recompile_keeps_old_program() -> Result<()> {
        let mut cache = cache();
        cache.backend_mut().fail_on = Some("USE_DEPTH_FADE");
        let id = cache.get_or_create(FeatureFlags::none(), &WireframeUniforms::default())?;
        cache.update_features(id, &FeatureFlagsPatch::new().with(FeatureFlag::DepthFade, true))?;

        assert!(matches!(cache.prepare(id), Err(Error::ShaderCompilation { .. })));
        let variant = cache.variant(id).expect("variant kept");
        assert_eq!(variant.state(), VariantState::Stale);
        assert_eq!(variant.program(), Some(&1));
        Ok(())
    }

    #[test]
    fn broadcasts_mark_uniforms_for_upload() -> Result<()> {
        let mut cache = cache();
        let id = cache.get_or_create(FeatureFlags::none(), &WireframeUniforms::default())?;
        cache.prepare(id)?;
        assert_eq!(cache.backend().uploads, 0);

        cache.update_time(1.5);
        cache.update_camera_position([1.0, 2.0, 3.0]);
        cache.on_resize(400, 300, 2.0);
        let variant = cache.prepare(id)?;
        assert_eq!(variant.uniforms().time, 1.5);
        assert_eq!(variant.uniforms().camera_position, [1.0, 2.0, 3.0]);
        assert_eq!(variant.uniforms().resolution, [800.0, 600.0]);
        assert_eq!(cache.backend().uploads, 1);
        Ok(())
    }

    #[test]
    fn unknown_id_is_invalid_parameter() {
        let mut cache = cache();
        let result = cache.update_uniforms(VariantId(42), &UniformValues::new());
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }
}
