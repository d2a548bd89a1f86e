//! wgpu-backed shader backend.
//!
//! Programs are real render pipelines. Shader and pipeline creation run
//! inside a validation error scope so a broken variant is reported as a
//! compile error instead of tearing down the device.

use barywire_base::{Error, Result};
use barywire_material::{
    ProgramDescriptor, RenderState, ShaderBackend, UNIFORM_BLOCK_SIZE, WireframeUniforms,
};
use barywire_material::shader::{FRAGMENT_ENTRY, VERTEX_ENTRY};
use tracing::info;

pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// mat4 view_proj + mat4 model
const SCENE_BLOCK_SIZE: u64 = 128;

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

pub struct WgpuProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group: wgpu::BindGroup,
    pub scene_buffer: wgpu::Buffer,
    pub uniform_buffer: wgpu::Buffer,
    pub render_state: RenderState,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

impl WgpuBackend {
    /// Opens a headless device. `BARYWIRE_POWER_PREF` selects the adapter
    /// (`high`, `default`, anything else means low power).
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power_preference(),
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .map_err(|err| Error::ResourceLoad {
            path: "gpu adapter".to_string(),
            reason: err.to_string(),
        })?;

        let required_limits =
            wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("barywire-view"),
            required_features: wgpu::Features::empty(),
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| Error::ResourceLoad {
            path: "gpu device".to_string(),
            reason: err.to_string(),
        })?;
        info!(adapter = %adapter.get_info().name, "gpu backend ready");

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("barywire wireframe bind group layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                uniform_entry(1, wgpu::ShaderStages::VERTEX_FRAGMENT),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("barywire wireframe pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            device,
            queue,
            bind_group_layout,
            pipeline_layout,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn create_pipeline(&self, descriptor: &ProgramDescriptor<'_>) -> wgpu::RenderPipeline {
        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("barywire wireframe vertex"),
            source: wgpu::ShaderSource::Wgsl(descriptor.source.vertex.as_str().into()),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("barywire wireframe fragment"),
            source: wgpu::ShaderSource::Wgsl(descriptor.source.fragment.as_str().into()),
        });

        let state = descriptor.render_state;
        // position, barycentric, parity
        let slots = [
            vertex_buffer_layout(0, 3),
            vertex_buffer_layout(1, 3),
            vertex_buffer_layout(2, 1),
        ];
        let buffers: Vec<_> = slots.iter().map(AttributeSlot::as_layout).collect();
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(descriptor.key.as_str()),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &buffers,
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: if state.double_sided {
                        None
                    } else {
                        Some(wgpu::Face::Back)
                    },
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: state.depth_write,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: state.blend.then_some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            })
    }
}

impl ShaderBackend for WgpuBackend {
    type Program = WgpuProgram;

    fn compile(&mut self, descriptor: &ProgramDescriptor<'_>) -> std::result::Result<WgpuProgram, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.create_pipeline(descriptor);
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(err.to_string());
        }

        let scene_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("barywire scene"),
            size: SCENE_BLOCK_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("barywire material"),
            size: UNIFORM_BLOCK_SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let scene: Vec<u8> = IDENTITY
            .iter()
            .chain(IDENTITY.iter())
            .flat_map(|v| v.to_le_bytes())
            .collect();
        self.queue.write_buffer(&scene_buffer, 0, &scene);
        self.queue
            .write_buffer(&uniform_buffer, 0, &descriptor.uniforms.to_bytes());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("barywire wireframe bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(WgpuProgram {
            pipeline,
            bind_group,
            scene_buffer,
            uniform_buffer,
            render_state: descriptor.render_state,
        })
    }

    fn write_uniforms(&mut self, program: &mut WgpuProgram, uniforms: &WireframeUniforms) {
        self.queue
            .write_buffer(&program.uniform_buffer, 0, &uniforms.to_bytes());
    }

    fn dispose(&mut self, program: WgpuProgram) {
        program.scene_buffer.destroy();
        program.uniform_buffer.destroy();
    }
}

struct AttributeSlot {
    attribute: [wgpu::VertexAttribute; 1],
    stride: u64,
}

impl AttributeSlot {
    fn as_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attribute,
        }
    }
}

/// One tightly packed f32 attribute per buffer slot.
fn vertex_buffer_layout(location: u32, components: u64) -> AttributeSlot {
    let format = match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        _ => wgpu::VertexFormat::Float32x3,
    };
    AttributeSlot {
        attribute: [wgpu::VertexAttribute {
            format,
            offset: 0,
            shader_location: location,
        }],
        stride: components * 4,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn power_preference() -> wgpu::PowerPreference {
    match std::env::var("BARYWIRE_POWER_PREF") {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "high" | "high_performance" | "high-performance" => {
                wgpu::PowerPreference::HighPerformance
            }
            "default" => wgpu::PowerPreference::default(),
            _ => wgpu::PowerPreference::LowPower,
        },
        Err(_) => wgpu::PowerPreference::LowPower,
    }
}
