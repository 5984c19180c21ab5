// First-person walk through a level that loops back on itself.
// Hallway ends hold invisible zone triggers that snap the player back to the hub.
//
// Frame: input -> locomotion -> zone triggers -> instanced box pass -> egui overlay

mod engine;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec2, Vec3};
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, MouseButton, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window},
};

use engine::camera::{LookCapture, Viewpoint};
use engine::geometry::build_level;
use engine::input::InputState;
use engine::layout::{Layout, Lighting};
use engine::locomotion::LocomotionController;
use engine::mesh::{unit_box, GpuVertex};
use engine::overlay::{DebugStats, LabelDraw, Overlay};
use engine::systems::{self, BoxInstance, FrameInput};
use engine::triggers::ZoneTriggers;

/// Environment variable naming a layout file when no argument is given.
const LAYOUT_ENV: &str = "BACKROOM_LAYOUT";

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// INSTANCE DATA (per-primitive)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    center: [f32; 3],
    _padding0: f32,  // Align to 16 bytes
    size: [f32; 3],
    _padding1: f32,
    color: [f32; 4],
}

impl InstanceData {
    fn from_box(b: &BoxInstance) -> Self {
        Self {
            center: b.position.to_array(),
            _padding0: 0.0,
            size: b.size.to_array(),
            _padding1: 0.0,
            color: b.color.to_linear(),
        }
    }

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const VEC4: wgpu::BufferAddress = std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress;
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,  // One per instance, not per vertex
            attributes: &[
                // Center (location 2)
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Size (location 3)
                wgpu::VertexAttribute {
                    offset: VEC4,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Color (location 4)
                wgpu::VertexAttribute {
                    offset: VEC4 * 2,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

// ============================================================================
// UNIFORM DATA (camera + lighting)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    sun: [f32; 4],
    ambient: [f32; 4],
}

impl Uniforms {
    fn new(view_proj: Mat4, lighting: &Lighting) -> Self {
        let sun = Vec3::from_array(lighting.sun_position).normalize_or(Vec3::Y);
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            sun: sun.extend(lighting.sun_intensity).to_array(),
            ambient: [lighting.ambient, 0.0, 0.0, 0.0],
        }
    }
}

// ============================================================================
// CURSOR GRAB
// ============================================================================

/// Grabbed, hidden cursor for mouse look. Released when dropped, so every
/// path that ends look-capture (pause, focus loss, exit) gives it back.
struct CursorGrab {
    window: Arc<Window>,
}

impl CursorGrab {
    fn acquire(window: Arc<Window>) -> Result<Self, winit::error::ExternalError> {
        window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))?;
        window.set_cursor_visible(false);
        Ok(Self { window })
    }
}

impl Drop for CursorGrab {
    fn drop(&mut self) {
        if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("failed to release cursor: {e}");
        }
        self.window.set_cursor_visible(true);
    }
}

// ============================================================================
// FRAME TIMING
// ============================================================================

/// Per-second frame time summary for the stats panel.
struct FrameTimer {
    frames: u32,
    sum_ms: f32,
    min_ms: f32,
    max_ms: f32,
    window_start: std::time::Instant,
    // Last completed second
    fps: u32,
    avg_ms: f32,
    last_min_ms: f32,
    last_max_ms: f32,
}

impl FrameTimer {
    fn new() -> Self {
        Self {
            frames: 0,
            sum_ms: 0.0,
            min_ms: f32::MAX,
            max_ms: 0.0,
            window_start: std::time::Instant::now(),
            fps: 0,
            avg_ms: 0.0,
            last_min_ms: 0.0,
            last_max_ms: 0.0,
        }
    }

    fn record(&mut self, dt: f32) {
        let ms = dt * 1000.0;
        self.frames += 1;
        self.sum_ms += ms;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);

        if self.window_start.elapsed().as_secs_f32() >= 1.0 {
            self.fps = self.frames;
            self.avg_ms = self.sum_ms / self.frames as f32;
            self.last_min_ms = self.min_ms;
            self.last_max_ms = self.max_ms;
            log::debug!("FPS: {} | frame {:.2} ms", self.fps, self.avg_ms);
            *self = Self::new_keeping(self);
        }
    }

    // Fresh accumulators, last second's summary kept.
    fn new_keeping(prev: &Self) -> Self {
        Self {
            fps: prev.fps,
            avg_ms: prev.avg_ms,
            last_min_ms: prev.last_min_ms,
            last_max_ms: prev.last_max_ms,
            ..Self::new()
        }
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    opaque_pipeline: wgpu::RenderPipeline,
    translucent_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    instance_buffer: wgpu::Buffer,
    instance_count: u32,
    opaque_count: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    overlay: Overlay,

    // Level
    layout_path: Option<PathBuf>,
    lighting: Lighting,
    world: World,

    // Player
    viewpoint: Viewpoint,
    look: LookCapture,
    controller: LocomotionController,
    zones: ZoneTriggers,
    input: InputState,
    paused: bool,
    cursor: Option<CursorGrab>,

    // Stats
    last_update: std::time::Instant,
    timer: FrameTimer,
    trigger_count: u32,
    last_trigger: Option<String>,
}

impl State {
    async fn new(window: Arc<Window>, layout_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .context("requesting GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_scene.wgsl").into()),
        });

        use wgpu::util::DeviceExt;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new(Mat4::IDENTITY, &Lighting::default())]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let opaque_pipeline =
            create_scene_pipeline(&device, &render_pipeline_layout, &shader, config.format, false);
        let translucent_pipeline =
            create_scene_pipeline(&device, &render_pipeline_layout, &shader, config.format, true);

        let mesh = unit_box();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: mesh.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: mesh.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });

        // Replaced by load_level() once the geometry is known.
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        let overlay = Overlay::new(&window, &device, config.format);

        let layout = Layout::load_or_builtin(layout_path.as_deref());
        let look = LookCapture::new(layout.camera.look_sensitivity);

        let mut state = Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            opaque_pipeline,
            translucent_pipeline,
            vertex_buffer,
            index_buffer,
            num_indices: mesh.index_count() as u32,
            instance_buffer,
            instance_count: 0,
            opaque_count: 0,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            overlay,
            layout_path,
            lighting: layout.lighting,
            world: World::new(),
            viewpoint: Viewpoint::new(&layout.camera),
            look,
            controller: LocomotionController::new(layout.player),
            zones: ZoneTriggers::from_layout(&layout),
            input: InputState::new(),
            // Starts on the intro hint; a click enters the level.
            paused: true,
            cursor: None,
            last_update: std::time::Instant::now(),
            timer: FrameTimer::new(),
            trigger_count: 0,
            last_trigger: None,
        };
        state.load_level(&layout);
        Ok(state)
    }

    /// (Re)build everything derived from the layout and put the player on spawn.
    fn load_level(&mut self, layout: &Layout) {
        use wgpu::util::DeviceExt;

        let removed = systems::unload_level(&mut self.world);
        let spawned = systems::spawn_level(&mut self.world, &build_level(layout));
        log::info!("level loaded: {spawned} static entities ({removed} unloaded)");

        let (boxes, opaque) = systems::gather_box_instances(&mut self.world);
        let instances: Vec<InstanceData> = boxes.iter().map(InstanceData::from_box).collect();
        if !instances.is_empty() {
            self.instance_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Buffer"),
                contents: bytemuck::cast_slice(&instances),
                usage: wgpu::BufferUsages::VERTEX,
            });
        }
        self.instance_count = instances.len() as u32;
        self.opaque_count = opaque as u32;

        self.lighting = layout.lighting;
        self.viewpoint = Viewpoint::new(&layout.camera);
        self.look.sensitivity = layout.camera.look_sensitivity;
        self.controller.settings = layout.player;
        self.zones = ZoneTriggers::from_layout(layout);
        self.viewpoint.snap_to(&self.zones.spawn().to_reset(None));
    }

    fn reload_layout(&mut self) {
        let layout = Layout::load_or_builtin(self.layout_path.as_deref());
        self.load_level(&layout);
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    // ── pause / look-capture ────────────────────────────────────────────

    fn engage_look(&mut self) {
        match CursorGrab::acquire(self.window.clone()) {
            Ok(grab) => self.cursor = Some(grab),
            // Raw mouse motion still arrives without a grab.
            Err(e) => log::warn!("cursor grab unavailable: {e}"),
        }
        self.look.engage();
        // Drop motion that piled up while the cursor was free.
        self.input.take_look_delta();
    }

    fn release_look(&mut self) {
        self.cursor = None;
        self.look.release();
    }

    fn pause(&mut self) {
        self.paused = true;
        self.release_look();
        log::info!("paused");
    }

    fn resume(&mut self) {
        self.paused = false;
        self.engage_look();
        log::info!("resumed");
    }

    /// Window lost focus: key releases can no longer be seen.
    fn focus_lost(&mut self) {
        self.release_look();
        self.controller.deactivate();
    }

    fn handle_key(&mut self, event: &WindowEvent) {
        if let Some(transition) = self.input.process_window_event(event) {
            if transition.pressed {
                self.controller.key_down(transition.key, self.paused);
            } else {
                self.controller.key_up(transition.key);
            }
        }
    }

    // ── frame ───────────────────────────────────────────────────────────

    fn update(&mut self) {
        let now = std::time::Instant::now();
        let dt = (now - self.last_update).as_secs_f32();
        self.last_update = now;
        self.timer.record(dt);

        let look_delta = self.input.take_look_delta();
        if !self.paused {
            self.look.apply_mouse_delta(&mut self.viewpoint, look_delta);
        }

        let frame = FrameInput { dt, paused: self.paused };
        if let Some(reset) = systems::run_frame(
            &mut self.viewpoint,
            &mut self.controller,
            &self.look,
            &self.zones,
            frame,
        ) {
            self.trigger_count += 1;
            self.last_trigger = reset
                .region
                .and_then(|i| self.zones.regions().get(i))
                .map(|r| r.name().unwrap_or("unnamed").to_string());
        }
    }

    fn label_draws(&mut self) -> Vec<LabelDraw> {
        let screen = Vec2::new(self.size.width as f32, self.size.height as f32);
        let points_per_pixel = 1.0 / self.window.scale_factor() as f32;
        systems::gather_labels(&mut self.world)
            .into_iter()
            .filter_map(|(text, position, font_size, color)| {
                let (pixel, px_per_unit) = self.viewpoint.project_to_screen(position, screen)?;
                let [r, g, b, a] = color.to_rgba8();
                Some(LabelDraw {
                    pos: egui::pos2(pixel.x * points_per_pixel, pixel.y * points_per_pixel),
                    size_px: font_size * px_per_unit * points_per_pixel,
                    color: egui::Color32::from_rgba_unmultiplied(r, g, b, a),
                    text,
                })
            })
            .collect()
    }

    fn debug_stats(&self) -> DebugStats {
        let p = self.viewpoint.position;
        let input = self.controller.input();
        let rotation = self.viewpoint.rotation();
        DebugStats {
            fps: self.timer.fps,
            frame_time_avg_ms: self.timer.avg_ms,
            frame_time_min_ms: self.timer.last_min_ms,
            frame_time_max_ms: self.timer.last_max_ms,
            primitive_count: self.instance_count as usize,
            resolution: (self.size.width, self.size.height),
            position: (p.x, p.y, p.z),
            yaw_pitch: (rotation.y.to_degrees(), rotation.x.to_degrees()),
            sprinting: input.sprint,
            crouching: input.crouch,
            look_engaged: self.look.is_engaged(),
            trigger_count: self.trigger_count,
            last_trigger: self.last_trigger.clone(),
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let aspect = self.size.width as f32 / self.size.height.max(1) as f32;
        let uniforms = Uniforms::new(self.viewpoint.view_projection(aspect), &self.lighting);
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.02,
                            b: 0.02,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
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

            if self.instance_count > 0 {
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

                // Opaque boxes write depth; translucent panes blend over them.
                render_pass.set_pipeline(&self.opaque_pipeline);
                render_pass.draw_indexed(0..self.num_indices, 0, 0..self.opaque_count);
                render_pass.set_pipeline(&self.translucent_pipeline);
                render_pass.draw_indexed(0..self.num_indices, 0, self.opaque_count..self.instance_count);
            }
        }

        let labels = self.label_draws();
        let stats = self.overlay.stats_visible.then(|| self.debug_stats());
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        self.overlay.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            &labels,
            self.paused,
            stats.as_ref(),
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
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

fn create_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    translucent: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(if translucent { "Translucent Pipeline" } else { "Opaque Pipeline" }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[GpuVertex::desc(), InstanceData::desc()],  // Vertex + Instance buffers
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(if translucent {
                    wgpu::BlendState::ALPHA_BLENDING
                } else {
                    wgpu::BlendState::REPLACE
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: !translucent,
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

// ============================================================================
// MAIN
// ============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let layout_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(LAYOUT_ENV).ok())
        .map(PathBuf::from);

    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title("The Backroom")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), layout_path))?;

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let _ = state.overlay.handle_window_event(&window, event);
                match event {
                    WindowEvent::CloseRequested => control_flow.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(code),
                                repeat: false,
                                ..
                            },
                        ..
                    } if matches!(code, KeyCode::Escape | KeyCode::F3 | KeyCode::F5) => match code {
                        KeyCode::Escape if state.paused => control_flow.exit(),
                        KeyCode::Escape => state.pause(),
                        KeyCode::F3 => state.overlay.toggle_stats(),
                        _ => state.reload_layout(),
                    },
                    WindowEvent::KeyboardInput { .. } => state.handle_key(event),
                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        button: MouseButton::Left,
                        ..
                    } => {
                        if state.paused {
                            state.resume();
                        } else if !state.look.is_engaged() {
                            state.engage_look();
                        }
                    }
                    WindowEvent::Focused(false) => state.focus_lost(),
                    WindowEvent::Resized(physical_size) => state.resize(*physical_size),
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                            Err(e) => log::error!("{:?}", e),
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::DeviceEvent { ref event, .. } => {
                state.input.process_device_event(event);
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
