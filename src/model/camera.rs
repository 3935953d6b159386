use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Perspective camera looking at `target`.
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32, cfg: &CameraConfig) -> Self {
        Self {
            eye: cfg.start,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: cfg.fov_y_deg.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            z_near: cfg.z_near,
            z_far: cfg.z_far,
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) { self.aspect = width as f32 / height.max(1) as f32; }

    pub fn set_look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;

    #[test]
    fn resize_changes_aspect_but_not_fov() {
        let cfg = SceneConfig::default();
        let mut cam = Camera::new(800, 600, &cfg.camera);
        let fov = cam.fov_y;
        cam.set_aspect(1920, 1080);
        assert!((cam.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        assert_eq!(cam.fov_y, fov);
        assert!((cam.fov_y - 75f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let cfg = SceneConfig::default();
        let cam = Camera::new(800, 600, &cfg.camera);
        let clip = cam.view_proj() * cam.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
    }
}
