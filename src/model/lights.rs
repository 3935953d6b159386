//! Scene lights and the closed-form day/night motion that drives them.

use glam::{Mat4, Vec2, Vec3};

use crate::config::{hex_rgb, ShadowConfig};

/// Radius of the sun/moon orbit in the XY plane.
pub const ORBIT_RADIUS: f32 = 14.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Directional light shining from `position` towards the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vec3,
}

impl DirectionalLight {
    pub fn direction(&self) -> Vec3 {
        self.position.normalize_or_zero()
    }

    /// World to light clip space for the shadow map: an orthographic box
    /// of `2 * extent` looking from `position` at the origin.
    pub fn shadow_view_proj(&self, config: &ShadowConfig) -> Mat4 {
        let eye = if self.position.length_squared() > 0.0 { self.position } else { Vec3::Y };
        // overhead light has no usable Y up
        let up = if eye.normalize().cross(Vec3::Y).length_squared() < 1e-6 { Vec3::Z } else { Vec3::Y };
        let e = config.extent;
        Mat4::orthographic_rh(-e, e, -e, e, config.near, config.far) * Mat4::look_at_rh(eye, Vec3::ZERO, up)
    }
}

/// Point light with three.js-style `distance`/`decay` falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub distance: f32,
    pub decay: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightSet {
    pub ambient: AmbientLight,
    pub moon: DirectionalLight,
    pub sun: DirectionalLight,
    /// Door light position is in house space; the house sits at the origin.
    pub door: PointLight,
    pub ghost: PointLight,
}

impl Default for LightSet {
    fn default() -> Self {
        Self {
            ambient: AmbientLight { color: hex_rgb(0xb9d5ff), intensity: 0.5 },
            moon: DirectionalLight {
                color: hex_rgb(0xb9d5ff),
                intensity: 0.5,
                position: Vec3::new(4.0, 5.0, -2.0),
            },
            sun: DirectionalLight {
                color: hex_rgb(0xfacc61),
                intensity: 2.5,
                position: Vec3::new(0.0, 1.0, 0.0),
            },
            door: PointLight {
                color: hex_rgb(0xff7d46),
                intensity: 2.0,
                distance: 8.0,
                decay: 0.5,
                position: Vec3::new(0.0, 2.5, 5.0 / 2.0 + 0.5),
            },
            ghost: PointLight {
                color: hex_rgb(0x95f0d7),
                intensity: 2.0,
                distance: 3.0,
                decay: 1.0,
                position: Vec3::ZERO,
            },
        }
    }
}

impl LightSet {
    /// Move the sun, moon and ghost for `elapsed` seconds; z of the
    /// directional lights is left where it was.
    pub fn advance(&mut self, elapsed: f32) {
        let moon = moon_position(elapsed);
        let sun = sun_position(elapsed);
        self.moon.position.x = moon.x;
        self.moon.position.y = moon.y;
        self.sun.position.x = sun.x;
        self.sun.position.y = sun.y;
        self.ghost.position = ghost_position(elapsed);
    }
}

pub fn moon_position(elapsed: f32) -> Vec2 {
    Vec2::new((elapsed / 4.0).cos(), (elapsed / 4.0).sin()) * ORBIT_RADIUS
}

/// Always antipodal to the moon.
pub fn sun_position(elapsed: f32) -> Vec2 {
    -moon_position(elapsed)
}

pub fn moon_spin(elapsed: f32) -> f32 {
    elapsed * 0.2
}

pub fn ghost_position(elapsed: f32) -> Vec3 {
    let angle = elapsed * 0.5;
    Vec3::new(
        angle.cos() * (7.0 + (elapsed * 0.5).sin()),
        angle.sin() * 3.0,
        angle.sin() * 4.0,
    )
}

/// Star field drift from wall-clock milliseconds, not simulation time.
pub fn star_offset(wall_clock_ms: f64) -> Vec3 {
    let timer = 0.0001 * wall_clock_ms;
    Vec3::new((5.0 * timer.cos()) as f32, 0.0, (5.0 * (timer * 1.1).sin()) as f32)
}
