//! wgpu viewport renderer: draws the preview's scene tree under the orbit
//! group, plus grid/axes helpers and the egui overlay standing in for the
//! hosting form.

use std::sync::Arc;

use glam::{Mat3, Mat4, Vec3};
use winit::window::Window;

use crate::camera::OrbitCamera;
use crate::normalize::Dimensions;
use crate::surface::FrameView;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const GRID_EXTENT: f32 = 10.0;
const GRID_DIVISIONS: i32 = 10;
const AXIS_LENGTH: f32 = 5.0;

/// Vertex for both the triangle and line pipelines.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    color: [f32; 3],
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
}

/// Preview state mirrored into the overlay.
#[derive(Debug, Clone, Default)]
pub struct OverlayStatus {
    pub file_name: Option<String>,
    pub loading: bool,
    pub dimensions: Option<Dimensions>,
    pub error: Option<String>,
}

/// What the user did in the overlay this frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayResponse {
    pub remove_clicked: bool,
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    depth_view: wgpu::TextureView,
    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    egui_renderer: egui_wgpu::Renderer,
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| "Failed to find appropriate adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await?;

        let surface_config = Self::create_surface_config(&surface, &adapter, size);
        surface.configure(&device, &surface_config);

        let depth_view = Self::create_depth_view(&device, size);

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Buffer"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("globals_bind_group_layout"),
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
            label: Some("globals_bind_group"),
        });

        let (mesh_pipeline, line_pipeline) =
            Self::create_pipelines(&device, &bind_group_layout, surface_config.format);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_config.format,
            egui_wgpu::RendererOptions::default(),
        );

        log::info!("viewport renderer initialized ({}x{})", size.width, size.height);

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            size,
            depth_view,
            mesh_pipeline,
            line_pipeline,
            globals_buffer,
            globals_bind_group,
            egui_renderer,
            egui_state,
            egui_ctx,
        })
    }

    fn create_surface_config(
        surface: &wgpu::Surface,
        adapter: &wgpu::Adapter,
        size: winit::dpi::PhysicalSize<u32>,
    ) -> wgpu::SurfaceConfiguration {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    fn create_depth_view(
        device: &wgpu::Device,
        size: winit::dpi::PhysicalSize<u32>,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_pipelines(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> (wgpu::RenderPipeline, wgpu::RenderPipeline) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Preview Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("preview.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Preview Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        };

        let depth_stencil = Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let make_pipeline = |label: &str,
                             topology: wgpu::PrimitiveTopology,
                             fragment_entry: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: std::slice::from_ref(&vertex_layout),
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Files arrive with arbitrary winding
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: depth_stencil.clone(),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let mesh_pipeline =
            make_pipeline("Mesh Pipeline", wgpu::PrimitiveTopology::TriangleList, "fs_main");
        let line_pipeline =
            make_pipeline("Line Pipeline", wgpu::PrimitiveTopology::LineList, "fs_line");

        (mesh_pipeline, line_pipeline)
    }

    pub fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.size = size;
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = Self::create_depth_view(&self.device, size);
    }

    /// Re-apply the current surface configuration after a Lost/Outdated
    /// surface error.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn handle_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.egui_state.on_window_event(window, event).consumed
    }

    pub fn render(
        &mut self,
        frame: &FrameView,
        camera: &OrbitCamera,
        window: &Window,
        status: &OverlayStatus,
    ) -> std::result::Result<OverlayResponse, wgpu::SurfaceError> {
        let aspect = self.size.width.max(1) as f32 / self.size.height.max(1) as f32;
        let globals = Globals {
            view_proj: camera.view_projection(aspect).to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[globals]));

        let (triangles, lines) = collect_geometry(frame);
        let triangle_buffer = self.vertex_buffer("Triangle Vertices", &triangles);
        let line_buffer = self.vertex_buffer("Line Vertices", &lines);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Preview Encoder"),
            });

        // Scene pass
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(frame.background)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            if !triangles.is_empty() {
                render_pass.set_pipeline(&self.mesh_pipeline);
                render_pass.set_vertex_buffer(0, triangle_buffer.slice(..));
                render_pass.draw(0..triangles.len() as u32, 0..1);
            }
            if !lines.is_empty() {
                render_pass.set_pipeline(&self.line_pipeline);
                render_pass.set_vertex_buffer(0, line_buffer.slice(..));
                render_pass.draw(0..lines.len() as u32, 0..1);
            }
        }

        let response = self.render_overlay(&mut encoder, &view, window, status);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(response)
    }

    fn vertex_buffer(&self, label: &str, vertices: &[Vertex]) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;
        // create_buffer_init rejects empty contents; keep a one-vertex stub
        let contents: &[Vertex] = if vertices.is_empty() {
            &[Vertex {
                position: [0.0; 3],
                normal: [0.0; 3],
                color: [0.0; 3],
            }]
        } else {
            vertices
        };
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(contents),
                usage: wgpu::BufferUsages::VERTEX,
            })
    }

    fn render_overlay(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        window: &Window,
        status: &OverlayStatus,
    ) -> OverlayResponse {
        let mut response = OverlayResponse::default();

        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::Window::new("Model")
                .title_bar(false)
                .resizable(false)
                .fixed_pos(egui::pos2(10.0, 10.0))
                .show(ctx, |ui| {
                    match &status.file_name {
                        Some(name) => {
                            ui.horizontal(|ui| {
                                ui.label(egui::RichText::new(name).strong());
                                if ui.button("✕ Remove").clicked() {
                                    response.remove_clicked = true;
                                }
                            });
                        }
                        None => {
                            ui.label("No model selected");
                        }
                    }
                    if status.loading {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Loading…");
                        });
                    }
                    if let Some(d) = status.dimensions {
                        ui.label(format!(
                            "{:.0} × {:.0} × {:.0} mm",
                            d.width, d.height, d.depth
                        ));
                    }
                    if let Some(error) = &status.error {
                        ui.label(
                            egui::RichText::new(error).color(egui::Color32::from_rgb(200, 60, 60)),
                        );
                    }
                });
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.size.width, self.size.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &tris,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // SAFETY: The render pass lifetime is actually tied to the encoder,
            // but egui-wgpu requires 'static. This is safe because we drop the
            // render pass before using the encoder again.
            let render_pass_static = unsafe {
                std::mem::transmute::<&mut wgpu::RenderPass<'_>, &mut wgpu::RenderPass<'static>>(
                    &mut render_pass,
                )
            };

            self.egui_renderer
                .render(render_pass_static, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        response
    }
}

/// Approximate sRGB -> linear for the clear color.
fn clear_color(srgb: [f32; 3]) -> wgpu::Color {
    let to_linear = |c: f32| (c as f64).powf(2.2);
    wgpu::Color {
        r: to_linear(srgb[0]),
        g: to_linear(srgb[1]),
        b: to_linear(srgb[2]),
        a: 1.0,
    }
}

/// Flatten the frame's scene (under the orbit transform) plus grid/axes
/// helpers into triangle and line vertex lists.
fn collect_geometry(frame: &FrameView) -> (Vec<Vertex>, Vec<Vertex>) {
    let mut triangles = Vec::new();
    let mut lines = Vec::new();

    if let Some(scene) = frame.scene {
        let orbit = Mat4::from_rotation_y(frame.orbit_angle)
            * Mat4::from_scale(Vec3::splat(frame.orbit_scale));

        scene.visit(&mut |node, world| {
            let Some(mesh) = &node.mesh else {
                return;
            };
            let model = orbit * *world;
            let normal_matrix = Mat3::from_mat4(model).inverse().transpose();
            let color = mesh.material.base_color;

            let vertex = |index: u32| {
                let i = index as usize;
                let position = model.transform_point3(mesh.positions[i]);
                let normal = mesh
                    .normals
                    .get(i)
                    .map(|n| (normal_matrix * *n).normalize_or_zero())
                    .unwrap_or(Vec3::Y);
                Vertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    color,
                }
            };

            for tri in mesh.indices.chunks_exact(3) {
                let corners = [vertex(tri[0]), vertex(tri[1]), vertex(tri[2])];
                if mesh.material.wireframe {
                    for (a, b) in [(0, 1), (1, 2), (2, 0)] {
                        lines.push(corners[a]);
                        lines.push(corners[b]);
                    }
                } else {
                    triangles.extend_from_slice(&corners);
                }
            }
        });
    }

    if frame.show_grid {
        grid_lines(&mut lines);
    }
    if frame.show_axes {
        axes_lines(&mut lines);
    }

    (triangles, lines)
}

fn line(out: &mut Vec<Vertex>, from: Vec3, to: Vec3, color: [f32; 3]) {
    for position in [from, to] {
        out.push(Vertex {
            position: position.to_array(),
            normal: [0.0, 1.0, 0.0],
            color,
        });
    }
}

fn grid_lines(out: &mut Vec<Vertex>) {
    let half = GRID_EXTENT / 2.0;
    let step = GRID_EXTENT / GRID_DIVISIONS as f32;
    let color = [0.6, 0.6, 0.6];
    for i in 0..=GRID_DIVISIONS {
        let offset = -half + i as f32 * step;
        line(out, Vec3::new(offset, 0.0, -half), Vec3::new(offset, 0.0, half), color);
        line(out, Vec3::new(-half, 0.0, offset), Vec3::new(half, 0.0, offset), color);
    }
}

fn axes_lines(out: &mut Vec<Vertex>) {
    line(out, Vec3::ZERO, Vec3::X * AXIS_LENGTH, [0.9, 0.2, 0.2]);
    line(out, Vec3::ZERO, Vec3::Y * AXIS_LENGTH, [0.2, 0.8, 0.2]);
    line(out, Vec3::ZERO, Vec3::Z * AXIS_LENGTH, [0.2, 0.4, 0.9]);
}
