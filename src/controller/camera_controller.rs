use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;

use crate::controller::input::{CameraAction, CharacterStep};
use crate::controller::tween::{Tween, TweenTarget};
use crate::model::scene::NodeId;
use crate::model::Camera;

/// The fox container node and its heading, which tweens drive as a scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterRig {
    pub node: NodeId,
    pub yaw: f32,
}

/// Turns key actions into tweens on the camera and the character
pub struct CameraController {
    pub step: f32,
    pub move_duration: f32,
    pub turn_duration: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            step: 1.0,
            move_duration: 1.0,
            turn_duration: 0.4,
        }
    }

    /// Targets are taken from the camera position at key time.
    pub fn camera_tweens(&self, action: CameraAction, eye: Vec3) -> Vec<Tween> {
        let d = self.move_duration;
        match action {
            CameraAction::Forward => vec![Tween::to(TweenTarget::CameraZ, eye.z - self.step, d)],
            CameraAction::Backward => vec![Tween::to(TweenTarget::CameraZ, eye.z + self.step, d)],
            CameraAction::Left => vec![Tween::to(TweenTarget::CameraX, eye.x - self.step, d)],
            CameraAction::Right => vec![Tween::to(TweenTarget::CameraX, eye.x + self.step, d)],
            // up, drop below eye level, settle back; stages only ordered by delay
            CameraAction::Hop => vec![
                Tween::to(TweenTarget::CameraY, eye.y + 2.0, 1.0),
                Tween::to(TweenTarget::CameraY, 0.6, 0.6).delay(1.0),
                Tween::to(TweenTarget::CameraY, 1.0, 0.5).delay(1.4),
            ],
        }
    }

    /// One step on the ground plane plus a turn to face the absolute heading
    /// for that direction.
    pub fn character_tweens(&self, step: CharacterStep, position: Vec3) -> Vec<Tween> {
        let (target, to, yaw) = match step {
            CharacterStep::Down => (TweenTarget::FoxZ, position.z - self.step, PI),
            CharacterStep::Left => (TweenTarget::FoxX, position.x - self.step, -FRAC_PI_2),
            CharacterStep::Right => (TweenTarget::FoxX, position.x + self.step, FRAC_PI_2),
            CharacterStep::Up => (TweenTarget::FoxZ, position.z + self.step, 0.0),
        };
        vec![
            Tween::to(target, to, self.move_duration),
            Tween::to(TweenTarget::FoxYaw, yaw, self.turn_duration),
        ]
    }
}

/// Polar angles are limited away from the poles so `look_at` stays defined.
const POLE_EPS: f32 = 1e-6;

/// Orbiting camera around `target` with inertia: pointer input adds to a
/// pending rotation which decays by `damping_factor` each update.
pub struct OrbitControls {
    pub target: Vec3,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3, damping_factor: f32) -> Self {
        Self {
            target,
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Pixel drag over a viewport `height` pixels tall; a full-height drag
    /// is one turn.
    pub fn drag(&mut self, dx: f32, dy: f32, height: f32) {
        let h = height.max(1.0);
        self.rotate_left(TAU * dx / h * self.rotate_speed);
        self.rotate_up(TAU * dy / h * self.rotate_speed);
    }

    /// Positive notches move away from the target.
    pub fn wheel(&mut self, notches: i32) {
        let s = self.zoom_scale();
        if notches < 0 {
            for _ in 0..notches.unsigned_abs() {
                self.scale *= s;
            }
        } else {
            for _ in 0..notches {
                self.scale /= s;
            }
        }
    }

    pub fn has_pending_motion(&self) -> bool {
        self.delta_theta.abs() > 1e-6 || self.delta_phi.abs() > 1e-6 || self.scale != 1.0
    }

    /// Re-derive the offset from the camera's current eye, so outside moves
    /// (tweens) are kept, then apply one damped slice of the pending rotation.
    pub fn update(&mut self, camera: &mut Camera) {
        let offset = camera.eye - self.target;
        let mut radius = offset.length();
        let (mut theta, mut phi) = if radius > 0.0 {
            (offset.x.atan2(offset.z), (offset.y / radius).clamp(-1.0, 1.0).acos())
        } else {
            (0.0, 0.0)
        };

        theta += self.delta_theta * self.damping_factor;
        phi += self.delta_phi * self.damping_factor;
        phi = phi.clamp(POLE_EPS, PI - POLE_EPS);
        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        camera.eye = self.target
            + Vec3::new(radius * sin_phi * theta.sin(), radius * phi.cos(), radius * sin_phi * theta.cos());
        camera.set_look_at(self.target);

        self.delta_theta *= 1.0 - self.damping_factor;
        self.delta_phi *= 1.0 - self.damping_factor;
        self.scale = 1.0;
    }
}
