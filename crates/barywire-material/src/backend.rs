use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Module, ShaderStage};

use crate::defines::ShaderDefines;
use crate::flags::VariantKey;
use crate::shader::{FRAGMENT_ENTRY, RenderState, ShaderSource, VERTEX_ENTRY};
use crate::uniforms::WireframeUniforms;

/// Everything a backend needs to build one program.
pub struct ProgramDescriptor<'a> {
    pub key: &'a VariantKey,
    pub source: &'a ShaderSource,
    pub defines: &'a ShaderDefines,
    pub uniforms: &'a WireframeUniforms,
    pub render_state: RenderState,
}

/// Turns preprocessed shader sources into programs. Errors are plain
/// messages; the cache attaches the variant key.
pub trait ShaderBackend {
    type Program;

    fn compile(&mut self, descriptor: &ProgramDescriptor<'_>) -> Result<Self::Program, String>;

    fn write_uniforms(&mut self, program: &mut Self::Program, uniforms: &WireframeUniforms);

    fn dispose(&mut self, program: Self::Program);
}

/// Validated shader modules plus the last uploaded uniform bytes.
#[derive(Debug)]
pub struct NagaProgram {
    pub vertex: Module,
    pub fragment: Module,
    pub render_state: RenderState,
    pub uniform_bytes: Vec<u8>,
}

/// CPU-only backend: parses and validates both stages with naga.
#[derive(Debug, Default)]
pub struct NagaBackend {
    live_programs: usize,
}

impl NagaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_programs(&self) -> usize {
        self.live_programs
    }
}

impl ShaderBackend for NagaBackend {
    type Program = NagaProgram;

    fn compile(&mut self, descriptor: &ProgramDescriptor<'_>) -> Result<NagaProgram, String> {
        let vertex = validate_stage(
            &descriptor.source.vertex,
            "vertex",
            VERTEX_ENTRY,
            ShaderStage::Vertex,
        )?;
        let fragment = validate_stage(
            &descriptor.source.fragment,
            "fragment",
            FRAGMENT_ENTRY,
            ShaderStage::Fragment,
        )?;
        self.live_programs += 1;
        Ok(NagaProgram {
            vertex,
            fragment,
            render_state: descriptor.render_state,
            uniform_bytes: descriptor.uniforms.to_bytes(),
        })
    }

    fn write_uniforms(&mut self, program: &mut NagaProgram, uniforms: &WireframeUniforms) {
        program.uniform_bytes = uniforms.to_bytes();
    }

    fn dispose(&mut self, program: NagaProgram) {
        self.live_programs = self.live_programs.saturating_sub(1);
        drop(program);
    }
}

/// Parses and validates one WGSL stage and checks its entry point.
pub fn validate_stage(
    source: &str,
    stage_name: &str,
    entry: &str,
    stage: ShaderStage,
) -> Result<Module, String> {
    let module = wgsl::parse_str(source)
        .map_err(|err| format!("{stage_name} parse error: {}", err.emit_to_string(source)))?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|err| format!("{stage_name} validation error: {err}"))?;

    let has_entry = module
        .entry_points
        .iter()
        .any(|point| point.name == entry && point.stage == stage);
    if !has_entry {
        return Err(format!("{stage_name} stage has no `{entry}` entry point"));
    }
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_parse_errors_with_stage() {
        let err = validate_stage("fn broken(", "vertex", VERTEX_ENTRY, ShaderStage::Vertex)
            .expect_err("invalid wgsl");
        assert!(err.starts_with("vertex parse error"));
    }

    #[test]
    fn requires_entry_point() {
        let err = validate_stage("fn helper() {}", "fragment", FRAGMENT_ENTRY, ShaderStage::Fragment)
            .expect_err("no entry point");
        assert!(err.contains("fs_main"));
    }
}
