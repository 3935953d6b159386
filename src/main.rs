use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::Window,
};

use haunted_house::{
    assets::{AssetInbox, AsyncLoader},
    config::SceneConfig,
    controller::input::{InputEvent, MouseButton as InputButton},
    controller::{
        CameraUniform, FpsCounter, FrameClock, FrameTime, InputState, LightingUniform, ShadowUniform,
        Simulation,
    },
    logging, ui,
    view::{gpu_init, GpuContext, RenderState},
};

/// Browser-style `KeyboardEvent.key` and `keyCode` for a winit key.
fn web_key(key: &Key) -> Option<(String, u32)> {
    match key {
        Key::Named(NamedKey::Space) => Some((" ".to_string(), 32)),
        Key::Named(NamedKey::ArrowLeft) => Some(("ArrowLeft".to_string(), 37)),
        Key::Named(NamedKey::ArrowUp) => Some(("ArrowUp".to_string(), 38)),
        Key::Named(NamedKey::ArrowRight) => Some(("ArrowRight".to_string(), 39)),
        Key::Named(NamedKey::ArrowDown) => Some(("ArrowDown".to_string(), 40)),
        Key::Character(s) => {
            let code = s.chars().next().map_or(0, |c| c.to_ascii_uppercase() as u32);
            Some((s.to_string(), code))
        }
        _ => None,
    }
}

struct App {
    window: Arc<Window>,
    gpu: GpuContext,
    render_state: RenderState,
    sim: Simulation,
    input_state: InputState,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    // Frame timing
    start: Instant,
    clock: FrameClock,
    fps: FpsCounter,
}

impl App {
    async fn new(window: Arc<Window>) -> Result<Self, Box<dyn std::error::Error>> {
        let size = window.inner_size();
        let config = SceneConfig::default();

        let instance = gpu_init::create_instance();
        let surface = instance.create_surface(window.clone())?;
        let gpu = GpuContext::from_surface(&instance, surface, size.width, size.height).await?;

        let mut render_state =
            RenderState::new(&gpu.device, &gpu.queue, &gpu.config, config.clear_color, &config.shadows);
        render_state.pixel_ratio = window.scale_factor() as f32;

        let inbox = AssetInbox::new();
        let loader = AsyncLoader::new(inbox.clone());
        let sim = Simulation::new(config, gpu.config.width, gpu.config.height, Box::new(loader), inbox);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            window,
            gpu,
            render_state,
            sim,
            input_state: InputState::new(),
            egui_state,
            egui_ctx,
            start: Instant::now(),
            clock: FrameClock::new(0.0),
            fps: FpsCounter::default(),
        })
    }

    /// Returns true when the event was used.
    fn input(&mut self, event: &WindowEvent) -> bool {
        // First let egui process the event
        if self.egui_state.on_window_event(self.window.as_ref(), event).consumed {
            return true;
        }

        match event {
            WindowEvent::KeyboardInput { event: KeyEvent { state, logical_key, .. }, .. } => {
                let Some((key, key_code)) = web_key(logical_key) else { return false };
                if *state == ElementState::Pressed {
                    if let Err(err) = self.sim.key_down(&key, key_code) {
                        tracing::warn!(%key, %err, "key ignored");
                    }
                }
                true
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                let (x, y) = self.input_state.last_pointer.unwrap_or((0.0, 0.0));
                let is_down = *state == ElementState::Pressed;
                self.input_state.process_event(&InputEvent::PointerButton { button: InputButton::Left, is_down, x, y });
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input_state.process_event(&InputEvent::PointerMove { x: position.x as f32, y: position.y as f32 });
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports scroll-up as positive, the browser the opposite
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -*y,
                    MouseScrollDelta::PixelDelta(p) => -p.y as f32,
                };
                self.input_state.process_event(&InputEvent::Wheel { delta_y });
                true
            }
            WindowEvent::Focused(false) => {
                self.input_state.process_event(&InputEvent::FocusLost);
                true
            }
            _ => false,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.render_state.pixel_ratio = self.window.scale_factor() as f32;
            self.render_state.resize(&self.gpu.device, &self.gpu.surface, new_size.width, new_size.height);
            self.sim.resize(new_size.width, new_size.height);
        }
    }

    fn update(&mut self) {
        let (elapsed, dt) = self.clock.tick(self.start.elapsed().as_secs_f64() * 1000.0);
        let fps = self.fps.tick(dt);

        let (drag, wheel) = self.input_state.consume_orbit();
        self.sim.apply_orbit_input(drag, wheel, self.render_state.height as f32);
        let wall_clock_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64() * 1000.0);
        let report = self.sim.tick(FrameTime { elapsed, dt, wall_clock_ms });
        if report.attached_models > 0 {
            tracing::debug!(?report, "models attached");
        }

        self.render_state.write_frame_uniforms(
            &self.gpu.queue,
            &CameraUniform::from_camera(&self.sim.camera),
            &LightingUniform::new(&self.sim.lights, &self.sim.config.fog),
            &ShadowUniform::new(&self.sim.lights, &self.sim.config.shadows),
        );

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let stats = ui::PanelStats { fps, ducks: self.sim.ducks.len() };
        let mut full_output = ui::build_ui(&self.egui_ctx, raw_input, &mut self.sim, stats);
        self.egui_state
            .handle_platform_output(&self.window, std::mem::take(&mut full_output.platform_output));

        let dpr = full_output.pixels_per_point;
        let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr);
        self.render_state.egui_primitives = Some(primitives);
        self.render_state.egui_full_output = Some(full_output);
        self.render_state.egui_dpr = dpr;
    }

    fn render(&mut self) {
        self.render_state.draw_frame(&self.gpu.device, &self.gpu.queue, &self.gpu.surface, &self.sim);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let event_loop = EventLoop::new()?;
    let (width, height) = SceneConfig::default().canvas_size;
    let window_attributes = Window::default_attributes()
        .with_title("Haunted House")
        .with_inner_size(winit::dpi::LogicalSize::new(width, height));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window.clone()))?;

    #[allow(deprecated)]
    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { ref event, window_id } if window_id == app.window.id() => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(physical_size) => {
                app.resize(*physical_size);
            }
            WindowEvent::RedrawRequested => {
                app.update();
                app.render();
            }
            event => {
                app.input(event);
            }
        },
        Event::AboutToWait => {
            app.window.request_redraw();
        }
        _ => {}
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_browser_names() {
        assert_eq!(web_key(&Key::Named(NamedKey::Space)), Some((" ".to_string(), 32)));
        assert_eq!(web_key(&Key::Named(NamedKey::ArrowDown)), Some(("ArrowDown".to_string(), 40)));
        assert_eq!(web_key(&Key::Character("w".into())), Some(("w".to_string(), 87)));
        assert_eq!(web_key(&Key::Named(NamedKey::Escape)), None);
    }
}
