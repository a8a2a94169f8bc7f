//! wgpu plumbing behind the [`RenderBackend`] seam.
//!
//! `GpuContext` acquires instance, adapter, device, and a configured surface
//! for a raw window handle; `WgpuBackend` layers the enhancement chain on
//! top and carries the per-session frame texture and uniform buffer. All
//! recoverable surface hiccups (lost, outdated, timeout) are absorbed here
//! with a reconfigure-and-skip; only genuine device failures escape as
//! [`DrawError`] and cost the session its life.

use anyhow::{anyhow, Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::chain::ShaderChain;
use crate::error::{CreateError, DrawError};
use crate::renderer::RenderBackend;
use crate::uniforms::ChainUniforms;

/// Device, queue, and configured output surface for one session.
pub struct GpuContext {
    // The instance must outlive the surface it produced.
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Acquires a GPU context rendering to `target`.
    ///
    /// Frame pixels arrive in gamma space and are processed as-is, so a
    /// non-sRGB surface format is preferred; the compositor sees the same
    /// values the chain wrote.
    pub fn acquire<T>(target: &T, initial_size: (u32, u32)) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::default();
        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create output surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        let width = initial_size.0.max(1);
        let height = initial_size.1.max(1);
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}"
            );
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("enhancement device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        tracing::info!(
            adapter = %adapter.get_info().name,
            format = ?surface_format,
            width,
            height,
            "acquired GPU context"
        );

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

/// Frame texture plus the bind group tying it to the chain's sampler slot.
struct FrameTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

/// Production [`RenderBackend`]: the enhancement chain running on a real
/// device. The frame texture is reused in place and only reallocated when
/// the source changes size.
pub struct WgpuBackend {
    ctx: GpuContext,
    chain: Option<ShaderChain>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    frame: Option<FrameTexture>,
}

impl WgpuBackend {
    pub fn new<T>(target: &T, size: (u32, u32)) -> Result<Self, CreateError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let ctx = GpuContext::acquire(target, size)
            .map_err(|err| CreateError::Unsupported(format!("{err:#}")))?;
        let chain = ShaderChain::compile(&ctx.device, ctx.format())?;

        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("chain uniforms"),
            size: std::mem::size_of::<ChainUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("chain uniform bind group"),
            layout: &chain.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("frame sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            ctx,
            chain: Some(chain),
            uniform_buffer,
            uniform_bind_group,
            sampler,
            frame: None,
        })
    }

    fn ensure_frame_texture(&mut self, width: u32, height: u32) {
        if matches!(&self.frame, Some(frame) if frame.size == (width, height)) {
            return;
        }
        let Some(chain) = &self.chain else {
            return;
        };
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame bind group"),
            layout: &chain.frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.frame = Some(FrameTexture {
            texture,
            bind_group,
            size: (width, height),
        });
    }

    fn reconfigure(&mut self) {
        self.ctx.surface.configure(&self.ctx.device, &self.ctx.config);
    }
}

impl RenderBackend for WgpuBackend {
    fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if self.ctx.config.width == width && self.ctx.config.height == height {
            return;
        }
        self.ctx.config.width = width;
        self.ctx.config.height = height;
        self.reconfigure();
    }

    fn upload_frame(&mut self, pixels: &[u8], width: u32, height: u32) {
        self.ensure_frame_texture(width, height);
        let Some(frame) = &self.frame else {
            return;
        };
        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &frame.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn draw(&mut self, uniforms: &ChainUniforms) -> Result<(), DrawError> {
        if self.chain.is_none() || self.frame.is_none() {
            return Ok(());
        }
        self.ctx
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let surface_frame = match self.ctx.surface.get_current_texture() {
            Ok(surface_frame) => surface_frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface timeout; retrying next tick");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(DrawError::OutOfMemory),
            Err(other) => return Err(DrawError::Gpu(format!("{other:?}"))),
        };
        let (Some(chain), Some(frame)) = (&self.chain, &self.frame) else {
            return Ok(());
        };

        let view = surface_frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("chain encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("chain pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&chain.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &frame.bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        surface_frame.present();
        Ok(())
    }

    fn release(&mut self) {
        self.frame = None;
        self.chain = None;
    }
}
