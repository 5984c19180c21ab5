use egui::epaint::Shadow;

pub struct DebugStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub frame_time_min_ms: f32,
    pub frame_time_max_ms: f32,
    pub primitive_count: usize,
    pub resolution: (u32, u32),
    pub position: (f32, f32, f32),
    /// Degrees.
    pub yaw_pitch: (f32, f32),
    pub sprinting: bool,
    pub crouching: bool,
    pub look_engaged: bool,
    /// Loop resets since startup.
    pub trigger_count: u32,
    pub last_trigger: Option<String>,
}

/// One world label, already projected to egui screen points.
pub struct LabelDraw {
    pub pos: egui::Pos2,
    /// Glyph height in screen points.
    pub size_px: f32,
    pub color: egui::Color32,
    pub text: String,
}

/// Labels below this size are skipped; egui text gets unreadable anyway.
const MIN_LABEL_PX: f32 = 4.0;

pub struct Overlay {
    pub stats_visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Overlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        // Style: dark, semi-transparent, small monospace white font
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::monospace(13.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // drawn after the scene pass, no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            stats_visible: false,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_stats(&mut self) {
        self.stats_visible = !self.stats_visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Render one egui frame: world labels, the pause hint when paused,
    /// and the F3 stats panel when `stats` is given.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        labels: &[LabelDraw],
        paused: bool,
        stats: Option<&DebugStats>,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            // ── world labels (background, behind any panel) ─────────────────
            if !labels.is_empty() {
                let painter = ctx.layer_painter(egui::LayerId::new(
                    egui::Order::Background,
                    egui::Id::new("world_labels"),
                ));
                for label in labels.iter().filter(|l| l.size_px >= MIN_LABEL_PX) {
                    painter.text(
                        label.pos,
                        egui::Align2::CENTER_CENTER,
                        &label.text,
                        egui::FontId::proportional(label.size_px),
                        label.color,
                    );
                }
            }

            // ── pause hint ──────────────────────────────────────────────────
            if paused {
                egui::Area::new(egui::Id::new("pause_hint"))
                    .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 200))
                            .inner_margin(egui::Margin::same(16.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                ui.label("PAUSED");
                                ui.label("Click to walk  |  WASD move  Shift sprint  Ctrl crouch");
                                ui.label("Esc again to leave");
                            });
                    });
            }

            // ── F3: stats panel ─────────────────────────────────────────────
            if let Some(stats) = stats {
                egui::Area::new(egui::Id::new("debug_overlay"))
                    .fixed_pos(egui::pos2(10.0, 10.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                ui.label(format!("FPS: {}", stats.fps));
                                ui.label(format!(
                                    "Frame: {:.2} ms (min: {:.1} | max: {:.1})",
                                    stats.frame_time_avg_ms,
                                    stats.frame_time_min_ms,
                                    stats.frame_time_max_ms
                                ));
                                ui.label(format!("Primitives: {}", stats.primitive_count));
                                ui.label(format!(
                                    "Resolution: {} x {}",
                                    stats.resolution.0, stats.resolution.1
                                ));
                                ui.label(format!(
                                    "Eye: ({:.2}, {:.2}, {:.2})  yaw {:.0}°  pitch {:.0}°",
                                    stats.position.0, stats.position.1, stats.position.2,
                                    stats.yaw_pitch.0, stats.yaw_pitch.1,
                                ));
                                ui.label(format!(
                                    "Look: {}  Sprint: {}  Crouch: {}",
                                    if stats.look_engaged { "captured" } else { "free" },
                                    stats.sprinting,
                                    stats.crouching,
                                ));
                                ui.label(format!(
                                    "Loops: {}  last: {}",
                                    stats.trigger_count,
                                    stats.last_trigger.as_deref().unwrap_or("-"),
                                ));
                            });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
