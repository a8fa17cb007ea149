use wgpu::*;
use tracing::warn;

use crate::controller::{FrameView, Renderer};
use crate::error::AppError;
use crate::model::{scene, DebugPanel, DemoScene};
use crate::ui;
use crate::utils::{MeshBuffer, Vertex};
use crate::view::GpuContext;

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub sun_dir: [f32; 3],
    pub sun_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub transform: [[f32; 4]; 4],
}

// Shared graphics setup used by native and web
pub struct CameraResources {
    pub camera_buffer: wgpu::Buffer,
    pub lighting_buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub camera_bind_group: wgpu::BindGroup,
}

/// Per-object transforms: identity for the static scene, a moving one for the panel
pub struct ModelResources {
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub scene_bind_group: wgpu::BindGroup,
    pub panel_buffer: wgpu::Buffer,
    pub panel_bind_group: wgpu::BindGroup,
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
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

pub fn create_camera_resources(device: &wgpu::Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX),
            uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
        ],
    });

    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, camera_bind_group }
}

pub fn create_model_resources(device: &wgpu::Device) -> ModelResources {
    use wgpu::util::DeviceExt;

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("model_bind_group_layout"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
    });

    let identity = TransformUniform { transform: glam::Mat4::IDENTITY.to_cols_array_2d() };
    let scene_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("scene_transform"),
        contents: bytemuck::bytes_of(&identity),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let panel_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("panel_transform"),
        contents: bytemuck::bytes_of(&identity),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("scene_model_bg"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry { binding: 0, resource: scene_buffer.as_entire_binding() }],
    });
    let panel_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("panel_model_bg"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry { binding: 0, resource: panel_buffer.as_entire_binding() }],
    });

    ModelResources { bind_group_layout, scene_bind_group, panel_buffer, panel_bind_group }
}

pub fn create_scene_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_bgl: &wgpu::BindGroupLayout,
    model_bgl: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader_src = include_str!("shaders/scene.wgsl");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: wgpu::ShaderSource::Wgsl(shader_src.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pipeline_layout"),
        bind_group_layouts: &[camera_bgl, model_bgl],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState { format, blend: Some(wgpu::BlendState::REPLACE), write_mask: wgpu::ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // The debug panel is a single quad seen from either side
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

///////////////////////////////////////////////////////////////////////////////

/// Tessellated overlay, reused until the readout or the surface size changes
struct UiCache {
    generation: u64,
    size: [u32; 2],
    primitives: Vec<egui::ClippedPrimitive>,
}

/// wgpu-backed renderer for the demo world plus the egui overlay
pub struct WgpuRenderer {
    gpu: GpuContext,
    depth_view: TextureView,
    pipeline: RenderPipeline,
    camera: CameraResources,
    models: ModelResources,
    scene_mesh: MeshBuffer,
    panel_mesh: MeshBuffer,

    // UI
    egui_ctx: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    ui_input: egui::RawInput,
    pixels_per_point: f32,
    ui_cache: Option<UiCache>,
    platform_output: Option<egui::PlatformOutput>,
}

impl WgpuRenderer {
    pub fn new(gpu: GpuContext, demo: &DemoScene, panel: &DebugPanel) -> Self {
        let device = gpu.device.as_ref();
        let (_, depth_view) = create_depth_texture(device, gpu.config.width, gpu.config.height);
        let camera = create_camera_resources(device);
        let models = create_model_resources(device);
        let pipeline = create_scene_pipeline(device, gpu.format, &camera.bind_group_layout, &models.bind_group_layout);

        let lighting = LightingUniform {
            sun_dir: demo.sun_dir.to_array(),
            sun_intensity: 1.0,
            ambient: scene::AMBIENT,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        };
        gpu.queue.write_buffer(&camera.lighting_buffer, 0, bytemuck::bytes_of(&lighting));

        let scene_mesh = demo.build_mesh().upload(device);
        let panel_mesh = panel.mesh().upload(device);

        let egui_ctx = egui::Context::default();
        let egui_renderer = egui_wgpu::Renderer::new(device, gpu.format, egui_wgpu::RendererOptions::default());

        Self {
            gpu,
            depth_view,
            pipeline,
            camera,
            models,
            scene_mesh,
            panel_mesh,
            egui_ctx,
            egui_renderer,
            ui_input: egui::RawInput::default(),
            pixels_per_point: 1.0,
            ui_cache: None,
            platform_output: None,
        }
    }

    pub fn egui_ctx(&self) -> &egui::Context {
        &self.egui_ctx
    }

    /// Input for the next overlay pass
    pub fn set_ui_input(&mut self, raw_input: egui::RawInput, pixels_per_point: f32) {
        self.ui_input = raw_input;
        self.pixels_per_point = pixels_per_point;
    }

    pub fn take_platform_output(&mut self) -> Option<egui::PlatformOutput> {
        self.platform_output.take()
    }

    fn reconfigure(&mut self) {
        self.gpu.surface.configure(&self.gpu.device, &self.gpu.config);
    }

    fn write_uniforms(&self, frame: &FrameView<'_>) {
        let cam = CameraUniform { view_proj: frame.camera.view_proj().to_cols_array_2d() };
        self.gpu.queue.write_buffer(&self.camera.camera_buffer, 0, bytemuck::bytes_of(&cam));

        let panel = TransformUniform { transform: frame.panel.transform().to_cols_array_2d() };
        self.gpu.queue.write_buffer(&self.models.panel_buffer, 0, bytemuck::bytes_of(&panel));
    }

    /// Re-run egui only when something it shows could have changed
    fn prepare_ui(&mut self, frame: &FrameView<'_>) -> egui::TexturesDelta {
        let size = [self.gpu.config.width, self.gpu.config.height];
        let generation = frame.debug_text.generation();
        let stale = match &self.ui_cache {
            Some(cache) => cache.generation != generation || cache.size != size,
            None => true,
        };
        if !stale && self.ui_input.events.is_empty() {
            return egui::TexturesDelta::default();
        }

        let mut raw_input = std::mem::take(&mut self.ui_input);
        if raw_input.screen_rect.is_none() {
            raw_input.screen_rect = Some(egui::Rect::from_min_size(
                egui::Pos2::new(0.0, 0.0),
                egui::vec2(
                    size[0] as f32 / self.pixels_per_point,
                    size[1] as f32 / self.pixels_per_point,
                ),
            ));
        }
        self.egui_ctx.set_pixels_per_point(self.pixels_per_point);

        let full_output = ui::build_ui(&self.egui_ctx, raw_input, frame);
        let primitives = self.egui_ctx.tessellate(full_output.shapes, self.pixels_per_point);
        self.platform_output = Some(full_output.platform_output);
        self.ui_cache = Some(UiCache { generation, size, primitives });
        full_output.textures_delta
    }
}

impl Renderer for WgpuRenderer {
    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), AppError> {
        self.write_uniforms(frame);

        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                warn!("surface lost, reconfiguring and skipping frame");
                self.reconfigure();
                return Ok(());
            }
            Err(SurfaceError::OutOfMemory) => return Err(AppError::SurfaceOutOfMemory),
            Err(e) => {
                warn!("skipping frame: {e:?}");
                return Ok(());
            }
        };

        let textures_delta = self.prepare_ui(frame);

        let device = self.gpu.device.as_ref();
        let queue = self.gpu.queue.as_ref();
        let view = surface_texture.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color {
                            r: 0.5,
                            g: 0.8,
                            b: 1.0,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &self.camera.camera_bind_group, &[]);

            for (mesh, model_bg) in [
                (&self.scene_mesh, &self.models.scene_bind_group),
                (&self.panel_mesh, &self.models.panel_bind_group),
            ] {
                if mesh.index_count == 0 {
                    continue;
                }
                rp.set_bind_group(1, model_bg, &[]);
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.config.width, self.gpu.config.height],
            pixels_per_point: self.pixels_per_point,
        };

        // Upload egui textures
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }

        let mut commands = Vec::new();
        if let Some(cache) = &self.ui_cache {
            commands = self
                .egui_renderer
                .update_buffers(device, queue, &mut encoder, &cache.primitives, &screen_descriptor);

            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), &cache.primitives, &screen_descriptor);
        }

        // Free egui textures
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        queue.submit(commands.into_iter().chain(std::iter::once(encoder.finish())));
        surface_texture.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.config.width = width;
        self.gpu.config.height = height;
        self.reconfigure();
        let (_, depth_view) = create_depth_texture(&self.gpu.device, width, height);
        self.depth_view = depth_view;
    }
}
