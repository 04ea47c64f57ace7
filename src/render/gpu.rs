//! wgpu backend: draws the scene into the window surface, then the control
//! panel on top of it.

use super::tessellate::{self, MeshData, Vertex};
use super::{Environment, FrameDraws, LightItem, RenderBackend, RenderError};
use crate::app::egui_host::EguiFrameOutput;
use crate::render::camera::OrbitCamera;
use crate::scene::lights::LightKind;
use crate::scene::materials::{rgb_from_hex, Material, Shading, TextureImage};
use crate::scene::shapes::Geometry;
use crate::scene::SceneGraph;
use glam::{Mat3, Mat4, Vec3};
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const GRID_COLOR: u32 = 0x888888;
const LIGHT_MARKER_SIZE: f32 = 0.2;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

/// Mirrors `Draw` in scene.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    specular: [f32; 4],
    light_position: [f32; 4],
    light_color: [f32; 4],
    eye: [f32; 4],
    sky: [f32; 4],
    ground: [f32; 4],
    uv_repeat: [f32; 4],
    params: [u32; 4],
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;

/// Per-frame inputs shared by every draw.
struct FrameLighting {
    view_proj: Mat4,
    eye: Vec3,
    light: Option<LightItem>,
    environment: Environment,
}

impl FrameLighting {
    fn uniform(&self, model: Mat4, material: &Material, textured: bool) -> DrawUniform {
        let light = self.light;
        let repeat = material
            .map
            .as_ref()
            .map(|map| map.repeat)
            .unwrap_or([1.0, 1.0]);
        let [sky, ground] = [self.environment.sky, self.environment.ground];
        DrawUniform {
            view_proj: self.view_proj.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix(model).to_cols_array_2d(),
            color: extend(material.color, material.opacity),
            specular: extend(material.specular.unwrap_or([0.0; 3]), material.shininess),
            light_position: light
                .map(|light| light.position.extend(light.range).to_array())
                .unwrap_or([0.0; 4]),
            light_color: light
                .map(|light| extend(light.color, light.intensity))
                .unwrap_or([0.0; 4]),
            eye: self.eye.extend(if light.is_some() { 1.0 } else { 0.0 }).to_array(),
            sky: extend(sky, 1.0),
            ground: extend(ground, 1.0),
            uv_repeat: [repeat[0], repeat[1], if textured { 1.0 } else { 0.0 }, 0.0],
            params: [
                shading_code(material.shading),
                material.flat_shading as u32,
                material.env_mapped as u32,
                light.map(|light| light_code(light.kind)).unwrap_or(0),
            ],
        }
    }
}

fn extend(rgb: [f32; 3], w: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], w]
}

fn normal_matrix(model: Mat4) -> Mat4 {
    let linear = Mat3::from_mat4(model);
    if linear.determinant().abs() < f32::EPSILON {
        return Mat4::from_mat3(linear);
    }
    Mat4::from_mat3(linear.inverse().transpose())
}

fn shading_code(shading: Shading) -> u32 {
    match shading {
        Shading::Unlit => 0,
        Shading::Normal => 1,
        Shading::Phong => 2,
        Shading::Lambert => 3,
        Shading::Standard => 4,
        Shading::Line => 5,
    }
}

fn light_code(kind: LightKind) -> u32 {
    match kind {
        LightKind::Point => 0,
        LightKind::Spot => 1,
        LightKind::Directional => 2,
        LightKind::Ambient => 3,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MeshKey {
    Geometry { address: usize, wireframe: bool },
    Grid { size_bits: u32, divisions: u32 },
    LightMarker,
}

struct GpuMesh {
    /// Holds the geometry so its address stays unique while cached.
    _source: Option<Arc<Geometry>>,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
    lines: bool,
    last_used: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TextureKey {
    content_hash: String,
    repeat: bool,
}

struct GpuTexture {
    /// `None` when the upload was refused; not retried while cached.
    bind_group: Option<wgpu::BindGroup>,
    last_used: u64,
}

struct Prepared {
    mesh: MeshKey,
    texture: Option<TextureKey>,
    uniform: DrawUniform,
}

pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: [u32; 2],
    depth: wgpu::TextureView,
    triangle_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_capacity: usize,
    uniform_stride: u64,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    white: wgpu::BindGroup,
    meshes: HashMap<MeshKey, GpuMesh>,
    textures: HashMap<TextureKey, GpuTexture>,
    environment: Environment,
    egui_renderer: egui_wgpu::Renderer,
    pending_ui: Option<EguiFrameOutput>,
    ui_textures: egui::TexturesDelta,
    frame: u64,
}

impl GpuRenderer {
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        pollster::block_on(Self::init(window))
    }

    async fn init(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("shapelab device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // egui wants a linear framebuffer; colours are written as they are.
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "GPU renderer on {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            config.width,
            config.height,
            format
        );

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material map layout"),
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

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let triangle_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::LineList,
        );

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = UNIFORM_SIZE.div_ceil(alignment) * alignment;
        let uniform_capacity = 8;
        let (uniform_buffer, uniform_bind_group) =
            create_uniforms(&device, &uniform_layout, uniform_stride, uniform_capacity);

        let repeat_sampler = create_sampler(&device, wgpu::AddressMode::Repeat);
        let clamp_sampler = create_sampler(&device, wgpu::AddressMode::ClampToEdge);
        let white_view = create_texture(&device, &queue, 1, 1, &[255; 4]);
        let white = texture_bind_group(&device, &texture_layout, &white_view, &repeat_sampler);

        let depth = create_depth(&device, config.width, config.height);
        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size: [size.width, size.height],
            depth,
            triangle_pipeline,
            line_pipeline,
            uniform_layout,
            texture_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_capacity,
            uniform_stride,
            repeat_sampler,
            clamp_sampler,
            white,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            environment: Environment::default(),
            egui_renderer,
            pending_ui: None,
            ui_textures: egui::TexturesDelta::default(),
            frame: 0,
        })
    }

    /// Makes sure every draw's mesh and texture are on the GPU and builds its
    /// uniform block.
    fn prepare(&mut self, draws: &FrameDraws) -> Vec<Prepared> {
        let lighting = FrameLighting {
            view_proj: draws.projection * draws.view,
            eye: draws.eye,
            light: draws.lights.first().copied(),
            environment: self.environment,
        };
        let mut prepared = Vec::new();

        for item in &draws.meshes {
            let geometry = &item.geometry;
            let wireframe = item.material.wireframe && !geometry.is_line();
            let key = MeshKey::Geometry {
                address: Arc::as_ptr(geometry) as usize,
                wireframe,
            };
            let Some(mesh) = self.ensure_mesh(key, Some(geometry.clone()), || {
                let mesh = tessellate::tessellate(geometry);
                if wireframe {
                    tessellate::wireframe(&mesh)
                } else {
                    mesh
                }
            }) else {
                continue;
            };
            let texture = item.material.map.as_ref().and_then(|map| {
                let image = map.image.as_ref()?;
                self.ensure_texture(image, map.wrap_repeat)
            });
            let uniform = lighting.uniform(item.model, &item.material, texture.is_some());
            prepared.push(Prepared {
                mesh,
                texture,
                uniform,
            });
        }

        let grid_material = Material::line(rgb_from_hex(GRID_COLOR));
        for grid in &draws.grids {
            let key = MeshKey::Grid {
                size_bits: grid.size.to_bits(),
                divisions: grid.divisions,
            };
            let Some(mesh) = self.ensure_mesh(key, None, || {
                tessellate::grid_lines(grid.size, grid.divisions)
            }) else {
                continue;
            };
            prepared.push(Prepared {
                mesh,
                texture: None,
                uniform: lighting.uniform(grid.model, &grid_material, false),
            });
        }

        for light in &draws.lights {
            let Some(color) = light.helper_color else {
                continue;
            };
            let Some(mesh) = self.ensure_mesh(MeshKey::LightMarker, None, || {
                tessellate::light_marker(LIGHT_MARKER_SIZE)
            }) else {
                continue;
            };
            let model = Mat4::from_translation(light.position);
            prepared.push(Prepared {
                mesh,
                texture: None,
                uniform: lighting.uniform(model, &Material::line(color), false),
            });
        }
        prepared
    }

    fn ensure_mesh(
        &mut self,
        key: MeshKey,
        source: Option<Arc<Geometry>>,
        build: impl FnOnce() -> MeshData,
    ) -> Option<MeshKey> {
        let frame = self.frame;
        if let Some(mesh) = self.meshes.get_mut(&key) {
            mesh.last_used = frame;
            return Some(key);
        }
        let data = build();
        if data.indices.is_empty() {
            return None;
        }
        let vertices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh vertices"),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let indices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh indices"),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        log::debug!(
            "Uploaded {:?}: {} vertices, {} indices",
            key,
            data.vertices.len(),
            data.indices.len()
        );
        self.meshes.insert(
            key,
            GpuMesh {
                _source: source,
                vertices,
                indices,
                index_count: data.indices.len() as u32,
                lines: data.lines,
                last_used: frame,
            },
        );
        Some(key)
    }

    fn ensure_texture(&mut self, image: &TextureImage, repeat: bool) -> Option<TextureKey> {
        let key = TextureKey {
            content_hash: image.content_hash.clone(),
            repeat,
        };
        let frame = self.frame;
        if let Some(texture) = self.textures.get_mut(&key) {
            texture.last_used = frame;
            return texture.bind_group.is_some().then_some(key);
        }
        let bind_group = self.upload_texture(image, repeat);
        let uploaded = bind_group.is_some();
        self.textures.insert(
            key.clone(),
            GpuTexture {
                bind_group,
                last_used: frame,
            },
        );
        uploaded.then_some(key)
    }

    fn upload_texture(&self, image: &TextureImage, repeat: bool) -> Option<wgpu::BindGroup> {
        let max = self.device.limits().max_texture_dimension_2d;
        let expected = image.width as usize * image.height as usize * 4;
        if image.width == 0 || image.height == 0 || image.pixels.len() != expected {
            log::warn!(
                "Texture {} has {} bytes for {}x{}",
                image.content_hash,
                image.pixels.len(),
                image.width,
                image.height
            );
            return None;
        }
        if image.width > max || image.height > max {
            log::warn!(
                "Texture {}x{} exceeds the {} pixel limit",
                image.width,
                image.height,
                max
            );
            return None;
        }
        let view = create_texture(
            &self.device,
            &self.queue,
            image.width,
            image.height,
            &image.pixels,
        );
        let sampler = if repeat {
            &self.repeat_sampler
        } else {
            &self.clamp_sampler
        };
        Some(texture_bind_group(
            &self.device,
            &self.texture_layout,
            &view,
            sampler,
        ))
    }

    fn ensure_uniform_capacity(&mut self, count: usize) {
        if count <= self.uniform_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        let (buffer, bind_group) = create_uniforms(
            &self.device,
            &self.uniform_layout,
            self.uniform_stride,
            capacity,
        );
        self.uniform_buffer = buffer;
        self.uniform_bind_group = bind_group;
        self.uniform_capacity = capacity;
    }

    fn draw_scene(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        prepared: &[Prepared],
    ) {
        self.ensure_uniform_capacity(prepared.len());
        let stride = self.uniform_stride as usize;
        let mut blocks = vec![0u8; stride * prepared.len()];
        for (i, draw) in prepared.iter().enumerate() {
            let block = bytemuck::bytes_of(&draw.uniform);
            blocks[i * stride..i * stride + block.len()].copy_from_slice(block);
        }
        if !blocks.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &blocks);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        for (i, draw) in prepared.iter().enumerate() {
            let Some(mesh) = self.meshes.get(&draw.mesh) else {
                continue;
            };
            let texture = draw
                .texture
                .as_ref()
                .and_then(|key| self.textures.get(key))
                .and_then(|texture| texture.bind_group.as_ref())
                .unwrap_or(&self.white);
            let pipeline = if mesh.lines {
                &self.line_pipeline
            } else {
                &self.triangle_pipeline
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[(i * stride) as u32]);
            pass.set_bind_group(1, texture, &[]);
            pass.set_vertex_buffer(0, mesh.vertices.slice(..));
            pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    /// Records the panel over the scene. Returns egui's own command buffers,
    /// which go to the queue ahead of the frame encoder.
    fn draw_ui(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(ui) = self.pending_ui.take() else {
            return Vec::new();
        };
        let textures = std::mem::take(&mut self.ui_textures);
        for (id, delta) in &textures.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        // The window may have grown since the panel was laid out; never
        // scissor past the surface.
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                ui.screen_size_px[0].min(self.config.width),
                ui.screen_size_px[1].min(self.config.height),
            ],
            pixels_per_point: ui.pixels_per_point,
        };
        let commands = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &ui.clipped_primitives,
            &screen,
        );
        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut pass = pass.forget_lifetime();
            self.egui_renderer
                .render(&mut pass, &ui.clipped_primitives, &screen);
        }
        for id in &textures.free {
            self.egui_renderer.free_texture(id);
        }
        commands
    }

    /// Drops GPU copies of anything the last frame did not draw.
    fn prune(&mut self) {
        let frame = self.frame;
        self.meshes.retain(|_, mesh| mesh.last_used == frame);
        self.textures.retain(|_, texture| texture.last_used == frame);
    }
}

impl RenderBackend for GpuRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = [width, height];
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = create_depth(&self.device, width, height);
        log::debug!("Surface resized to {}x{}", width, height);
    }

    fn render(&mut self, scene: &SceneGraph, camera: &OrbitCamera) -> Result<(), RenderError> {
        if self.size[0] == 0 || self.size[1] == 0 {
            return Err(RenderError::EmptySurface);
        }
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Err(RenderError::SurfaceLost);
            }
            Err(err) => return Err(err.into()),
        };
        self.frame += 1;
        let draws = FrameDraws::collect(scene, camera);
        let prepared = self.prepare(&draws);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.draw_scene(&mut encoder, &view, &prepared);
        let ui_commands = self.draw_ui(&mut encoder, &view);
        self.queue
            .submit(ui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        self.prune();
        Ok(())
    }

    fn refresh_environment_capture(
        &mut self,
        scene: &SceneGraph,
        origin: Vec3,
    ) -> Result<(), RenderError> {
        self.environment = Environment::capture(scene, origin);
        Ok(())
    }

    fn submit_ui(&mut self, mut ui: EguiFrameOutput) {
        // A skipped frame must not lose texture updates.
        self.ui_textures
            .append(std::mem::take(&mut ui.textures_delta));
        self.pending_ui = Some(ui);
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
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
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

fn create_uniforms(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("draw uniforms"),
        size: stride * capacity as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("draw uniforms"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(UNIFORM_SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_sampler(device: &wgpu::Device, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::TextureView {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("material map"),
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
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        pixels,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("material map"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_depth(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
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
