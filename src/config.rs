use glam::Vec3;

/// Asset locations, relative to the served root (web) or `assets/` (native).
#[derive(Debug, Clone)]
pub struct AssetPaths {
    pub floor_color: String,
    pub wood_color: String,
    pub door_color: String,
    pub door_alpha: String,
    pub star: String,
    pub text_matcap: String,
    pub font: String,
    pub fox_model: String,
    pub duck_model: String,
    pub hit_sound: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            floor_color: "/textures/floor/basecolor.jpg".to_string(),
            wood_color: "/textures/wood/basecolor.jpg".to_string(),
            door_color: "/textures/door/color.jpg".to_string(),
            door_alpha: "/textures/door/alpha.jpg".to_string(),
            star: "/textures/star.png".to_string(),
            text_matcap: "/textures/matcap/5.png".to_string(),
            font: "/fonts/gentilis/gentilis_regular.typeface.json".to_string(),
            fox_model: "/models/Fox/glTF/Fox.gltf".to_string(),
            duck_model: "/models/Duck/glTF/Duck.gltf".to_string(),
            hit_sound: "/sounds/duck-squeak.wav".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraConfig {
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub start: Vec3,
    pub damping_factor: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct FogConfig {
    pub color: [f32; 3],
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    pub timestep: f32,
    pub max_substeps: u32,
    pub friction: f32,
    pub restitution: f32,
}

/// Duck spawn bounds used by the debug panel action.
#[derive(Debug, Clone, Copy)]
pub struct SpawnConfig {
    pub max_scale: f32,
    pub area: f32,
    pub height: f32,
    pub squeak_threshold: f32,
}

/// The extruded title. The bevel has no segments, so it only widens the
/// outline by `bevel_size`.
#[derive(Debug, Clone)]
pub struct TextConfig {
    pub content: String,
    pub size: f32,
    pub depth: f32,
    pub curve_segments: u32,
    pub bevel_size: f32,
    pub position: Vec3,
    /// Rotation about +Y, radians.
    pub yaw: f32,
}

/// Sun and moon shadow maps. Both lights look at the origin through the same
/// orthographic box.
#[derive(Debug, Clone, Copy)]
pub struct ShadowConfig {
    pub enabled: bool,
    pub map_size: u32,
    /// Half-width of the light's view box.
    pub extent: f32,
    pub near: f32,
    pub far: f32,
    /// Subtracted from the receiver depth before comparing.
    pub bias: f32,
}

/// Everything the scene needs that is not derived at runtime.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub canvas_size: (u32, u32),
    pub max_pixel_ratio: f64,
    pub clear_color: [f32; 3],
    pub fox_scale: f32,
    pub bush_count: usize,
    pub star_count: usize,
    pub assets: AssetPaths,
    pub camera: CameraConfig,
    pub fog: FogConfig,
    pub physics: PhysicsConfig,
    pub spawn: SpawnConfig,
    pub text: TextConfig,
    pub shadows: ShadowConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            canvas_size: (800, 600),
            max_pixel_ratio: 2.0,
            clear_color: hex_rgb(0x262837),
            fox_scale: 0.015,
            bush_count: 100,
            star_count: 100,
            assets: AssetPaths::default(),
            camera: CameraConfig {
                fov_y_deg: 75.0,
                z_near: 0.1,
                z_far: 100.0,
                start: Vec3::new(1.0, 1.0, 10.0),
                damping_factor: 0.05,
            },
            fog: FogConfig {
                color: hex_rgb(0x262837),
                near: 1.0,
                far: 15.0,
            },
            physics: PhysicsConfig {
                gravity: Vec3::new(0.0, -9.82, 0.0),
                timestep: 1.0 / 60.0,
                max_substeps: 3,
                friction: 0.1,
                restitution: 0.7,
            },
            spawn: SpawnConfig {
                max_scale: 0.5,
                area: 18.0,
                height: 5.0,
                squeak_threshold: 1.5,
            },
            text: TextConfig {
                content: "ECE".to_string(),
                size: 2.0,
                depth: 0.5,
                curve_segments: 5,
                bevel_size: 0.02,
                position: Vec3::new(-9.0, 0.0, 0.0),
                yaw: 1.0,
            },
            shadows: ShadowConfig {
                enabled: true,
                map_size: 512,
                extent: 5.0,
                near: 0.5,
                far: 500.0,
                bias: 0.0005,
            },
        }
    }
}

/// `0xRRGGBB` to sRGB-encoded `[r, g, b]` in 0..1; shaders linearize.
pub fn hex_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_decode_per_channel() {
        assert_eq!(hex_rgb(0xff0000), [1.0, 0.0, 0.0]);
        assert_eq!(hex_rgb(0x0000ff), [0.0, 0.0, 1.0]);
        let fog = hex_rgb(0x262837);
        assert!((fog[0] - 38.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn defaults_match_the_scene() {
        let cfg = SceneConfig::default();
        assert_eq!(cfg.physics.max_substeps, 3);
        assert_eq!(cfg.camera.start, Vec3::new(1.0, 1.0, 10.0));
        assert_eq!(cfg.spawn.area, 18.0);
    }
}
