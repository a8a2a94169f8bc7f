//! The GPU shader chain and its CPU reference arithmetic.
//!
//! Three composable stages run in a fixed order over each texel:
//! debanding, then edge-aware smoothing, then adaptive sharpening. The order
//! is a design decision — debanding must see the rawest signal before the
//! neighbourhood blend launders its noise, and sharpening must run last so
//! it works on the cleaned signal instead of re-amplifying block edges.
//!
//! The WGSL program in `chain.wgsl` is the production path. The free
//! functions here reproduce its arithmetic texel-for-texel on the CPU; they
//! are the tested contract for the chain's numeric behaviour and double as
//! documentation of the shader. Keep both sides in sync.

use crate::error::CreateError;

/// WGSL source for the full chain (vertex quad + fragment stages).
pub const CHAIN_SHADER: &str = include_str!("chain.wgsl");

/// A linear RGB triple in [0, 1] per channel (inputs outside the range are
/// tolerated; the final chain output is clamped).
pub type Rgb = [f32; 3];

/// Perceptual brightness: fixed Rec.601 weighting.
pub fn luma(color: Rgb) -> f32 {
    0.299 * color[0] + 0.587 * color[1] + 0.114 * color[2]
}

/// Deterministic pseudo-random value in [-1, 1] keyed by pixel position and
/// time. Same position and time always hash to the same value.
pub fn hash_noise(position: [f32; 2], time: f32) -> f32 {
    let seed = [position[0] + time, position[1] + time];
    let raw = (seed[0] * 12.9898 + seed[1] * 78.233).sin() * 43758.5453;
    raw.fract_gl() * 2.0 - 1.0
}

/// GLSL-style `fract`: always in [0, 1), unlike `f32::fract` for negatives.
trait FractGl {
    fn fract_gl(self) -> f32;
}

impl FractGl for f32 {
    fn fract_gl(self) -> f32 {
        self - self.floor()
    }
}

fn mix(a: Rgb, b: Rgb, t: f32) -> Rgb {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

fn clamp01(color: Rgb) -> Rgb {
    [
        color[0].clamp(0.0, 1.0),
        color[1].clamp(0.0, 1.0),
        color[2].clamp(0.0, 1.0),
    ]
}

/// The 3×3 texel neighbourhood around one pixel, row-major with the centre
/// at `texels[1][1]`. Rows follow the frame's top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighborhood {
    pub texels: [[Rgb; 3]; 3],
}

impl Neighborhood {
    /// Every texel set to the same colour.
    pub fn uniform(color: Rgb) -> Self {
        Self {
            texels: [[color; 3]; 3],
        }
    }

    pub fn center(&self) -> Rgb {
        self.texels[1][1]
    }

    /// Average of the four edge-sharing neighbours (N/S/E/W).
    pub fn cross_average(&self) -> Rgb {
        let north = self.texels[0][1];
        let south = self.texels[2][1];
        let west = self.texels[1][0];
        let east = self.texels[1][2];
        [
            (north[0] + south[0] + west[0] + east[0]) * 0.25,
            (north[1] + south[1] + west[1] + east[1]) * 0.25,
            (north[2] + south[2] + west[2] + east[2]) * 0.25,
        ]
    }
}

/// Debanding: adds a deterministic, time-varying dither offset to every
/// channel, bounded by `intensity * 0.02`. Zero intensity short-circuits to
/// an exact no-op — the gate matters, because the noise function is not
/// drift-free even when scaled by zero.
pub fn deband(color: Rgb, position: [f32; 2], time: f32, intensity: f32) -> Rgb {
    if intensity <= 0.0 {
        return color;
    }
    let offset = hash_noise(position, time) * intensity * 0.02;
    [color[0] + offset, color[1] + offset, color[2] + offset]
}

/// Edge-aware smoothing: a 3×3 weighted average where a neighbour's weight
/// falls off exponentially with its luma distance from the current colour
/// (`exp(-10 * |Δluma|) * 0.5`), self-weight fixed at 1.0. The blend toward
/// the average tops out at 50% of the intensity — smoothing softens, it
/// never replaces.
pub fn smooth(color: Rgb, neighborhood: &Neighborhood, intensity: f32) -> Rgb {
    if intensity <= 0.0 {
        return color;
    }
    let reference = luma(color);
    let mut sum = color;
    let mut weight_sum = 1.0f32;
    for (row, texels) in neighborhood.texels.iter().enumerate() {
        for (col, texel) in texels.iter().enumerate() {
            if row == 1 && col == 1 {
                continue;
            }
            let weight = (-10.0 * (reference - luma(*texel)).abs()).exp() * 0.5;
            sum[0] += texel[0] * weight;
            sum[1] += texel[1] * weight;
            sum[2] += texel[2] * weight;
            weight_sum += weight;
        }
    }
    let smoothed = [sum[0] / weight_sum, sum[1] / weight_sum, sum[2] / weight_sum];
    mix(color, smoothed, intensity * 0.5)
}

/// Damping applied to the unsharp delta; never drops below 0.5 regardless
/// of edge strength, so strong edges are softened but not suppressed.
pub fn adaptive_factor(edge_strength: f32) -> f32 {
    1.0 - (edge_strength * 2.0).min(0.5)
}

/// Adaptive unsharp mask against the 4-neighbour average. A uniform
/// neighbourhood has a zero delta and passes through unchanged.
pub fn sharpen(color: Rgb, cross_average: Rgb, intensity: f32) -> Rgb {
    if intensity <= 0.0 {
        return color;
    }
    let delta = [
        color[0] - cross_average[0],
        color[1] - cross_average[1],
        color[2] - cross_average[2],
    ];
    let sharpened = [
        color[0] + delta[0] * intensity,
        color[1] + delta[1] * intensity,
        color[2] + delta[2] * intensity,
    ];
    let edge_strength = (delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2]).sqrt();
    mix(color, sharpened, adaptive_factor(edge_strength))
}

/// Runs the full chain for one texel: deband → smooth → sharpen → clamp.
/// Neighbour samples always come from the raw frame (the GPU path is a
/// single pass), while the running colour carries each stage's output
/// forward.
pub fn enhance(
    neighborhood: &Neighborhood,
    position: [f32; 2],
    time: f32,
    parameters: presets::EnhancementParameters,
) -> Rgb {
    let mut color = neighborhood.center();
    color = deband(color, position, time, parameters.debanding);
    color = smooth(color, neighborhood, parameters.smoothing);
    color = sharpen(color, neighborhood.cross_average(), parameters.sharpening);
    clamp01(color)
}

/// Compiled GPU program for the chain plus the layouts the backend needs to
/// bind frame and uniform data against it.
pub struct ShaderChain {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) uniform_layout: wgpu::BindGroupLayout,
    pub(crate) frame_layout: wgpu::BindGroupLayout,
}

impl ShaderChain {
    /// Compiles the WGSL module and builds the render pipeline targeting
    /// `format`. Validation failures are collected through a device error
    /// scope and surfaced as [`CreateError::ShaderBuild`]; nothing partial
    /// is left bound on failure.
    pub fn compile(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<Self, CreateError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("enhancement chain"),
            source: wgpu::ShaderSource::Wgsl(CHAIN_SHADER.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("chain uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("chain frame layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("chain pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &frame_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("chain pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let error = pollster::block_on(device.pop_error_scope());
        if let Some(error) = error {
            return Err(CreateError::ShaderBuild(
                anyhow::anyhow!("{error}")
                    .context("enhancement chain rejected by device")
                    .to_string(),
            ));
        }

        Ok(Self {
            pipeline,
            uniform_layout,
            frame_layout,
        })
    }
}
