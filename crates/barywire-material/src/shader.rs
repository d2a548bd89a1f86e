use crate::defines::ShaderDefines;
use crate::flags::FeatureFlags;

const PRELUDE: &str = include_str!("shaders/prelude.wgsl");
const VERTEX_BODY: &str = include_str!("shaders/wireframe_vertex.wgsl");
const FRAGMENT_BODY: &str = include_str!("shaders/wireframe_fragment.wgsl");

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Fully preprocessed WGSL for one variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    pub fn for_defines(defines: &ShaderDefines) -> Result<Self, String> {
        Ok(Self {
            vertex: preprocess(&format!("{PRELUDE}\n{VERTEX_BODY}"), defines)
                .map_err(|err| format!("vertex stage: {err}"))?,
            fragment: preprocess(&format!("{PRELUDE}\n{FRAGMENT_BODY}"), defines)
                .map_err(|err| format!("fragment stage: {err}"))?,
        })
    }
}

/// Pipeline state that depends on the feature flags rather than on uniforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderState {
    pub double_sided: bool,
    pub blend: bool,
    pub depth_write: bool,
}

impl RenderState {
    pub fn from_flags(flags: &FeatureFlags) -> Self {
        if flags.see_through {
            Self {
                double_sided: true,
                blend: true,
                depth_write: false,
            }
        } else {
            Self {
                double_sided: flags.inside_alt_color,
                blend: false,
                depth_write: true,
            }
        }
    }
}

struct Branch {
    parent_active: bool,
    taken: bool,
    seen_else: bool,
    line: usize,
}

/// Resolves `#ifdef`, `#ifndef`, `#else` and `#endif` lines against
/// `defines`. Directives nest; any other `#` line is an error.
pub fn preprocess(source: &str, defines: &ShaderDefines) -> Result<String, String> {
    let mut out = String::with_capacity(source.len());
    let mut stack: Vec<Branch> = Vec::new();
    let mut active = true;

    for (index, raw) in source.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim();
        if !trimmed.starts_with('#') {
            if active {
                out.push_str(raw);
                out.push('\n');
            }
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let directive = parts.next().unwrap_or_default();
        let argument = parts.next();
        match directive {
            "#ifdef" | "#ifndef" => {
                let name = argument
                    .ok_or_else(|| format!("line {line_no}: {directive} needs a symbol"))?;
                let defined = defines.contains(name);
                let taken = if directive == "#ifdef" { defined } else { !defined };
                stack.push(Branch {
                    parent_active: active,
                    taken,
                    seen_else: false,
                    line: line_no,
                });
                active = active && taken;
            }
            "#else" => {
                let branch = stack
                    .last_mut()
                    .ok_or_else(|| format!("line {line_no}: #else without #ifdef"))?;
                if branch.seen_else {
                    return Err(format!("line {line_no}: second #else in one block"));
                }
                branch.seen_else = true;
                active = branch.parent_active && !branch.taken;
            }
            "#endif" => {
                let branch = stack
                    .pop()
                    .ok_or_else(|| format!("line {line_no}: #endif without #ifdef"))?;
                active = branch.parent_active;
            }
            other => return Err(format!("line {line_no}: unknown directive `{other}`")),
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("line {}: unterminated conditional block", open.line));
    }
    Ok(out)
}
