use crate::config::{FogConfig, ShadowConfig};
use crate::model::{Camera, LightSet};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    /// After `eye` so shaders that only read the first two fields still line up.
    pub view: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            eye: camera.eye.extend(1.0).to_array(),
            view: camera.view().to_cols_array_2d(),
        }
    }
}

/// Every light and the fog, packed as vec4s. Colours stay sRGB-encoded.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub ambient: [f32; 4],
    pub moon_dir: [f32; 4],
    pub moon_color: [f32; 4],
    pub sun_dir: [f32; 4],
    pub sun_color: [f32; 4],
    pub door_pos: [f32; 4],
    pub door_color: [f32; 4],
    pub ghost_pos: [f32; 4],
    pub ghost_color: [f32; 4],
    pub falloff: [f32; 4],
    pub fog_color: [f32; 4],
    pub fog_range: [f32; 4],
}

fn rgb_w(rgb: [f32; 3], w: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], w]
}

impl LightingUniform {
    pub fn new(lights: &LightSet, fog: &FogConfig) -> Self {
        Self {
            ambient: rgb_w(lights.ambient.color, lights.ambient.intensity),
            moon_dir: lights.moon.direction().extend(lights.moon.intensity).to_array(),
            moon_color: rgb_w(lights.moon.color, 1.0),
            sun_dir: lights.sun.direction().extend(lights.sun.intensity).to_array(),
            sun_color: rgb_w(lights.sun.color, 1.0),
            door_pos: lights.door.position.extend(lights.door.distance).to_array(),
            door_color: rgb_w(lights.door.color, lights.door.intensity),
            ghost_pos: lights.ghost.position.extend(lights.ghost.distance).to_array(),
            ghost_color: rgb_w(lights.ghost.color, lights.ghost.intensity),
            falloff: [lights.door.decay, lights.ghost.decay, 0.0, 0.0],
            fog_color: rgb_w(fog.color, 1.0),
            fog_range: [fog.near, fog.far, 0.0, 0.0],
        }
    }
}

/// Light matrices for the sun and moon shadow maps, in layer order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    pub sun: [[f32; 4]; 4],
    pub moon: [[f32; 4]; 4],
    /// x = texel size, y = depth bias, z = 1 when enabled
    pub params: [f32; 4],
}

impl ShadowUniform {
    pub const SUN_LAYER: u32 = 0;
    pub const MOON_LAYER: u32 = 1;

    pub fn new(lights: &LightSet, config: &ShadowConfig) -> Self {
        Self {
            sun: lights.sun.shadow_view_proj(config).to_cols_array_2d(),
            moon: lights.moon.shadow_view_proj(config).to_cols_array_2d(),
            params: [
                1.0 / config.map_size.max(1) as f32,
                config.bias,
                if config.enabled { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }

    pub fn layer(&self, layer: u32) -> &[[f32; 4]; 4] {
        match layer {
            Self::SUN_LAYER => &self.sun,
            _ => &self.moon,
        }
    }
}

/// Elapsed and delta seconds from a millisecond clock.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start_ms: f64,
    last_ms: f64,
}

impl FrameClock {
    pub fn new(now_ms: f64) -> Self {
        Self { start_ms: now_ms, last_ms: now_ms }
    }

    /// `(elapsed, dt)`; a clock that runs backwards yields a zero delta.
    pub fn tick(&mut self, now_ms: f64) -> (f32, f32) {
        let dt = ((now_ms - self.last_ms) / 1000.0).max(0.0) as f32;
        self.last_ms = now_ms;
        (((now_ms - self.start_ms) / 1000.0) as f32, dt)
    }
}

/// Frames counted over roughly one second windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct FpsCounter {
    pub fps: f32,
    frames: u32,
    timer: f32,
}

impl FpsCounter {
    pub fn tick(&mut self, dt: f32) -> f32 {
        self.frames += 1;
        self.timer += dt;
        if self.timer >= 1.0 {
            self.fps = self.frames as f32 / self.timer;
            self.frames = 0;
            self.timer = 0.0;
        }
        self.fps
    }
}

/// Backing-store size for a CSS-pixel viewport; the device pixel ratio is
/// capped at `max_ratio`.
pub fn viewport_size(css_width: f64, css_height: f64, device_ratio: f64, max_ratio: f64) -> (u32, u32, f32) {
    let ratio = device_ratio.min(max_ratio).max(1.0);
    (
        ((css_width * ratio).round() as u32).max(1),
        ((css_height * ratio).round() as u32).max(1),
        ratio as f32,
    )
}

#[cfg(target_arch = "wasm32")]
pub use web::FrameLoopContext;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use web_sys::{HtmlCanvasElement, Window};
    use wgpu::{Device, Queue, Surface};

    use super::{viewport_size, CameraUniform, FpsCounter, FrameClock, LightingUniform, ShadowUniform};
    use crate::controller::simulation::FrameTime;
    use crate::controller::{InputState, Simulation};
    use crate::ui::{self, PanelStats};
    use crate::view::RenderState;

    /// Per-frame driver for the browser build
    pub struct FrameLoopContext {
        pub sim: Rc<RefCell<Simulation>>,
        pub canvas: HtmlCanvasElement,
        pub input_state: Rc<RefCell<InputState>>,
        pub egui_ctx: egui::Context,
        pub egui_events: Rc<RefCell<Vec<egui::Event>>>,
        pub clock: FrameClock,
        pub fps: FpsCounter,
        pub max_pixel_ratio: f64,
    }

    impl FrameLoopContext {
        /// Advance the simulation and prepare everything `draw_frame` needs.
        pub fn update(
            &mut self,
            device: &Device,
            queue: &Queue,
            window: &Window,
            surface: &Surface,
            render_state: &mut RenderState,
        ) {
            let now = window.performance().map(|p| p.now()).unwrap_or(0.0);
            let (elapsed, dt) = self.clock.tick(now);
            let fps = self.fps.tick(dt);

            self.handle_resize(window, device, surface, render_state);

            let (drag, wheel) = self.input_state.borrow_mut().consume_orbit();
            let mut sim = self.sim.borrow_mut();
            sim.apply_orbit_input(drag, wheel, render_state.height as f32 / render_state.pixel_ratio);
            let report = sim.tick(FrameTime { elapsed, dt, wall_clock_ms: js_sys::Date::now() });
            if report.attached_models > 0 {
                tracing::debug!(?report, "models attached");
            }

            render_state.write_frame_uniforms(
                queue,
                &CameraUniform::from_camera(&sim.camera),
                &LightingUniform::new(&sim.lights, &sim.config.fog),
                &ShadowUniform::new(&sim.lights, &sim.config.shadows),
            );

            // Build egui input from queued events
            let dpr = render_state.pixel_ratio;
            let mut raw_input = egui::RawInput::default();
            raw_input.time = Some(now / 1000.0);
            raw_input.screen_rect = Some(egui::Rect::from_min_size(
                egui::Pos2::new(0.0, 0.0),
                egui::vec2(render_state.width as f32 / dpr, render_state.height as f32 / dpr),
            ));
            raw_input.events.extend(self.egui_events.borrow_mut().drain(..));
            self.egui_ctx.set_pixels_per_point(dpr);

            let stats = PanelStats { fps, ducks: sim.ducks.len() };
            let mut full_output = ui::build_ui(&self.egui_ctx, raw_input, &mut sim, stats);

            let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr);
            render_state.egui_primitives = Some(primitives);
            render_state.egui_full_output = Some(full_output);
            render_state.egui_dpr = dpr;
        }

        fn handle_resize(
            &self,
            window: &Window,
            device: &Device,
            surface: &Surface,
            render_state: &mut RenderState,
        ) {
            let (Ok(w), Ok(h)) = (window.inner_width(), window.inner_height()) else { return };
            let (css_w, css_h) = (w.as_f64().unwrap_or(800.0), h.as_f64().unwrap_or(600.0));
            let (nw, nh, ratio) = viewport_size(
                css_w,
                css_h,
                window.device_pixel_ratio(),
                self.max_pixel_ratio,
            );
            if nw != render_state.width || nh != render_state.height {
                tracing::debug!(width = nw, height = nh, ratio, "resize");
                self.canvas.set_width(nw);
                self.canvas.set_height(nh);
                let style = format!("width: {css_w}px; height: {css_h}px; display: block");
                if let Err(err) = self.canvas.set_attribute("style", &style) {
                    tracing::warn!(?err, "canvas style not applied");
                }
                self.sim.borrow_mut().resize(nw, nh);
                render_state.pixel_ratio = ratio;
                render_state.resize(device, surface, nw, nh);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use approx::assert_relative_eq;

    #[test]
    fn uniforms_are_vec4_aligned() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
        assert_eq!(std::mem::size_of::<LightingUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<ShadowUniform>(), 144);
    }

    #[test]
    fn shadow_uniform_tracks_the_lights() {
        let mut cfg = SceneConfig::default();
        let mut lights = LightSet::default();
        lights.advance(3.0);
        let u = ShadowUniform::new(&lights, &cfg.shadows);
        assert_eq!(u.params, [1.0 / 512.0, 0.0005, 1.0, 0.0]);
        assert_eq!(*u.layer(ShadowUniform::SUN_LAYER), lights.sun.shadow_view_proj(&cfg.shadows).to_cols_array_2d());
        assert_eq!(*u.layer(ShadowUniform::MOON_LAYER), lights.moon.shadow_view_proj(&cfg.shadows).to_cols_array_2d());

        cfg.shadows.enabled = false;
        assert_eq!(ShadowUniform::new(&lights, &cfg.shadows).params[2], 0.0);
    }

    #[test]
    fn lighting_packs_intensities_and_falloff() {
        let cfg = SceneConfig::default();
        let mut lights = LightSet::default();
        lights.advance(0.0);
        let u = LightingUniform::new(&lights, &cfg.fog);
        assert_eq!(u.ambient[3], 0.5);
        assert_eq!(u.sun_dir[3], 2.5);
        // moon sits at (14, 0, -2) at t = 0
        let dir = glam::Vec3::new(14.0, 0.0, -2.0).normalize();
        assert_relative_eq!(u.moon_dir[0], dir.x, epsilon = 1e-6);
        assert_relative_eq!(u.moon_dir[2], dir.z, epsilon = 1e-6);
        assert_eq!(u.door_pos, [0.0, 2.5, 3.0, 8.0]);
        assert_eq!(u.falloff[0], 0.5);
        assert_eq!(u.fog_range[..2], [1.0, 15.0]);
    }

    #[test]
    fn clock_reports_elapsed_and_delta() {
        let mut clock = FrameClock::new(1000.0);
        let (elapsed, dt) = clock.tick(1016.0);
        assert_relative_eq!(elapsed, 0.016);
        assert_relative_eq!(dt, 0.016);
        let (elapsed, dt) = clock.tick(1050.0);
        assert_relative_eq!(elapsed, 0.05);
        assert_relative_eq!(dt, 0.034, epsilon = 1e-6);
        assert_eq!(clock.tick(1040.0).1, 0.0);
    }

    #[test]
    fn fps_updates_once_per_second() {
        let mut fps = FpsCounter::default();
        for _ in 0..63 {
            assert_eq!(fps.tick(1.0 / 64.0), 0.0);
        }
        assert_eq!(fps.tick(1.0 / 64.0), 64.0);
    }

    #[test]
    fn pixel_ratio_is_capped() {
        assert_eq!(viewport_size(800.0, 600.0, 3.0, 2.0), (1600, 1200, 2.0));
        assert_eq!(viewport_size(800.0, 600.0, 1.5, 2.0), (1200, 900, 1.5));
    }
}
