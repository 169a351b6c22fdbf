use std::sync::Arc;

use log::{info, warn};
use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, RenderPipeline, Sampler, Surface, SurfaceConfiguration, Texture};
use winit::window::Window;

use super::frame::{FrameBuffer, BYTES_PER_PIXEL};
use super::gpu_context::GpuContext;
use super::hud::Hud;
use super::mode::ModeFlag;
use super::pipeline::ThroughputReport;
use crate::traits::{FrameSurface, RenderError};

/// Quad vertex: clip-space position plus texture coordinate
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct QuadVertex {
    position: [f32; 2],
    tex_coord: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Two triangles as a strip; image row 0 maps to the top of the screen
const QUAD: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, -1.0], tex_coord: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], tex_coord: [1.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0], tex_coord: [0.0, 0.0] },
    QuadVertex { position: [1.0, 1.0], tex_coord: [1.0, 0.0] },
];

/// Everything built in `create` and dropped in `destroy`
struct GpuResources {
    render_pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    sampler: Sampler,
    vertex_buffer: Buffer,
    texture: Texture,
    bind_group: BindGroup,
    texture_size: (u32, u32),
    hud: Option<Hud>,
}

/// Texture format for uploaded camera frames
///
/// Camera bytes are sRGB-encoded. On an sRGB surface the sampler has to decode
/// them, since the surface re-encodes on write; otherwise they pass straight
/// through as plain unorm.
pub fn frame_texture_format(surface_format: wgpu::TextureFormat) -> wgpu::TextureFormat {
    if surface_format.is_srgb() {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    }
}

/// `FrameSurface` backed by a wgpu window surface
pub struct WgpuSurface {
    window: Arc<Window>,
    gpu: GpuContext,
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    texture_format: wgpu::TextureFormat,
    resources: Option<GpuResources>,
    mode: ModeFlag,
    show_hud: bool,
    report: Option<ThroughputReport>,
}

impl WgpuSurface {
    /// Connect to the window and pick a device; no GPU resources yet
    pub async fn new(window: Arc<Window>, mode: ModeFlag, show_hud: bool) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::SurfaceUnavailable(e.to_string()))?;
        let gpu = GpuContext::new_with_surface(&instance, &surface).await?;

        let surface_caps = surface.get_capabilities(gpu.adapter());
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::SurfaceUnavailable("surface reports no formats".into()))?;

        let texture_format = frame_texture_format(surface_format);

        let surface_config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        info!(
            "Surface format {:?}, texture format {:?}",
            surface_format, texture_format
        );

        Ok(Self {
            window,
            gpu,
            surface,
            surface_config,
            texture_format,
            resources: None,
            mode,
            show_hud,
            report: None,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Latest capture report, shown by the overlay
    pub fn set_report(&mut self, report: ThroughputReport) {
        self.report = Some(report);
    }

    /// Forward a window event to the overlay; true if it consumed it
    pub fn handle_window_event(&mut self, event: &winit::event::WindowEvent) -> bool {
        match self.resources.as_mut().and_then(|r| r.hud.as_mut()) {
            Some(hud) => hud.handle_event(&self.window, event),
            None => false,
        }
    }

    fn build_resources(&self) -> Result<GpuResources, RenderError> {
        let device = self.gpu.device();

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Frame Display Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../display.wgsl").into()),
        });
        let (render_pipeline, bind_group_layout) =
            Self::create_render_pipeline(device, &shader, self.surface_config.format);
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompilation(e.to_string()));
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Frame Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // Black 1x1 placeholder until the first frame arrives
        let texture = self.create_frame_texture(1, 1)?;
        self.gpu.queue().write_texture(
            texture.as_image_copy(),
            &[0, 0, 0, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let bind_group = Self::create_bind_group(device, &bind_group_layout, &texture, &sampler);

        let hud = self.show_hud.then(|| {
            Hud::new(&self.window, device, self.surface_config.format, self.mode.clone())
        });

        Ok(GpuResources {
            render_pipeline,
            bind_group_layout,
            sampler,
            vertex_buffer,
            texture,
            bind_group,
            texture_size: (1, 1),
            hud,
        })
    }

    fn create_frame_texture(&self, width: u32, height: u32) -> Result<Texture, RenderError> {
        let max = self.gpu.device().limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(RenderError::TextureAllocation(format!(
                "{}x{} exceeds the {} texel limit",
                width, height, max
            )));
        }

        Ok(self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.texture_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        }))
    }

    fn create_render_pipeline(
        device: &Device,
        shader: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
    ) -> (RenderPipeline, BindGroupLayout) {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Texture Bind Group Layout"),
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
            label: Some("Frame Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Frame Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[QuadVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }

    fn create_bind_group(
        device: &Device,
        layout: &BindGroupLayout,
        texture: &Texture,
        sampler: &Sampler,
    ) -> BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}

impl FrameSurface for WgpuSurface {
    fn create(&mut self) -> Result<(), RenderError> {
        self.surface.configure(self.gpu.device(), &self.surface_config);
        self.resources = Some(self.build_resources()?);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(self.gpu.device(), &self.surface_config);
    }

    fn upload(&mut self, frame: &FrameBuffer) -> Result<(), RenderError> {
        if !frame.is_tightly_packed() {
            return Err(RenderError::StrideMismatch {
                width: frame.width(),
                row_stride: frame.row_stride(),
            });
        }
        let (width, height) = frame.dimensions();

        let needs_realloc = match &self.resources {
            Some(res) => res.texture_size != (width, height),
            None => return Err(RenderError::SurfaceUnavailable("surface not created".into())),
        };
        if needs_realloc {
            let texture = self.create_frame_texture(width, height)?;
            if let Some(res) = self.resources.as_mut() {
                res.bind_group = Self::create_bind_group(
                    self.gpu.device(),
                    &res.bind_group_layout,
                    &texture,
                    &res.sampler,
                );
                res.texture = texture;
                res.texture_size = (width, height);
            }
        }

        let Some(res) = &self.resources else {
            return Ok(());
        };
        self.gpu.queue().write_texture(
            res.texture.as_image_copy(),
            frame.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * BYTES_PER_PIXEL as u32),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn draw(&mut self) -> Result<(), RenderError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost, reconfiguring");
                self.surface.configure(self.gpu.device(), &self.surface_config);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let Some(res) = self.resources.as_mut() else {
            return Err(RenderError::SurfaceUnavailable("surface not created".into()));
        };

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Render Pass"),
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

            render_pass.set_pipeline(&res.render_pipeline);
            render_pass.set_bind_group(0, &res.bind_group, &[]);
            render_pass.set_vertex_buffer(0, res.vertex_buffer.slice(..));
            render_pass.draw(0..QUAD.len() as u32, 0..1);
        }

        if let Some(hud) = res.hud.as_mut() {
            hud.set_report(self.report);
            hud.paint(
                &self.window,
                self.gpu.device(),
                self.gpu.queue(),
                &mut encoder,
                &view,
                [self.surface_config.width, self.surface_config.height],
            );
        }

        self.gpu.queue().submit(Some(encoder.finish()));
        self.window.pre_present_notify();
        surface_texture.present();
        Ok(())
    }

    fn destroy(&mut self) {
        self.resources = None;
    }
}
