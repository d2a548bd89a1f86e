pub mod backend;
pub mod cache;
pub mod defines;
pub mod flags;
pub mod shader;
pub mod uniforms;

pub use backend::{NagaBackend, NagaProgram, ProgramDescriptor, ShaderBackend, validate_stage};
pub use barywire_base::{Color, Error, Result};
pub use cache::{MaterialVariant, ResizeObserver, VariantId, VariantState, WireframeMaterialCache};
pub use defines::{DefineDiff, ShaderDefines, defines_for};
pub use flags::{FeatureFlag, FeatureFlags, FeatureFlagsPatch, VariantKey};
pub use shader::{RenderState, ShaderSource, preprocess};
pub use uniforms::{UNIFORM_BLOCK_SIZE, UniformField, UniformValue, UniformValues, WireframeUniforms};

/// Cache backed by CPU-side naga validation.
pub type NagaMaterialCache = WireframeMaterialCache<NagaBackend>;
