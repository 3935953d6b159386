//! The single owned context the frame loop and the event listeners share:
//! scene graph, physics world, ducks, fox, lights, stars, camera and tweens.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::assets::{AssetInbox, AssetLoader, Loaded, ModelTemplate};
use crate::audio::{self, HitSound};
use crate::config::SceneConfig;
use crate::controller::camera_controller::{CameraController, CharacterRig, OrbitControls};
use crate::controller::input::InputProcessor;
use crate::controller::physics::PhysicsWorld;
use crate::controller::tween::{Tweenable, TweenTarget, Tweens};
use crate::error::InputError;
use crate::model::animation::AnimationMixer;
use crate::model::ducks::{DuckEntry, DuckSpawn, Ducks};
use crate::model::lights::{moon_spin, star_offset, LightSet};
use crate::model::material::MaterialId;
use crate::model::scene::{NodeId, SceneGraph, Transform};
use crate::model::yard::{self, Yard};
use crate::model::{Camera, Resources, StarField};

/// Clip indices in the fox model.
const IDLE_CLIP: usize = 0;
const WALK_CLIP: usize = 1;

/// Where ducks start before being moved to their requested position.
const DUCK_SPAWN_POINT: Vec3 = Vec3::new(0.0, 5.0, 0.0);

/// Time inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the loop started.
    pub elapsed: f32,
    /// Seconds since the previous tick.
    pub dt: f32,
    /// Wall-clock milliseconds since the Unix epoch.
    pub wall_clock_ms: f64,
}

/// What one tick did, for the debug readout.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub physics_steps: u32,
    pub attached_models: usize,
    pub active_tweens: usize,
}

/// Camera and fox as seen by the tween engine.
struct TweenSubject<'a> {
    camera: &'a mut Camera,
    scene: &'a mut SceneGraph,
    fox: &'a mut CharacterRig,
}

impl Tweenable for TweenSubject<'_> {
    fn get(&self, target: TweenTarget) -> Option<f32> {
        let fox = self.scene.transform(self.fox.node).translation;
        Some(match target {
            TweenTarget::CameraX => self.camera.eye.x,
            TweenTarget::CameraY => self.camera.eye.y,
            TweenTarget::CameraZ => self.camera.eye.z,
            TweenTarget::FoxX => fox.x,
            TweenTarget::FoxZ => fox.z,
            TweenTarget::FoxYaw => self.fox.yaw,
        })
    }

    fn set(&mut self, target: TweenTarget, value: f32) {
        match target {
            TweenTarget::CameraX => self.camera.eye.x = value,
            TweenTarget::CameraY => self.camera.eye.y = value,
            TweenTarget::CameraZ => self.camera.eye.z = value,
            TweenTarget::FoxX => self.scene.transform_mut(self.fox.node).translation.x = value,
            TweenTarget::FoxZ => self.scene.transform_mut(self.fox.node).translation.z = value,
            TweenTarget::FoxYaw => {
                self.fox.yaw = value;
                self.scene.transform_mut(self.fox.node).rotation = Quat::from_rotation_y(value);
            }
        }
    }
}

pub struct Simulation {
    pub config: SceneConfig,
    pub scene: SceneGraph,
    pub resources: Resources,
    pub lights: LightSet,
    pub stars: StarField,
    pub star_material: MaterialId,
    pub yard: Yard,
    pub physics: PhysicsWorld,
    pub ducks: Ducks,
    pub camera: Camera,
    pub orbit: OrbitControls,
    pub tweens: Tweens,
    pub fox: CharacterRig,
    /// `None` until the fox model has loaded.
    pub mixer: Option<AnimationMixer>,
    /// `None` until the typeface has loaded.
    pub text: Option<NodeId>,
    controller: CameraController,
    input: InputProcessor,
    hit_sound: Rc<HitSound>,
    loader: Box<dyn AssetLoader>,
    inbox: AssetInbox,
    models: HashMap<String, ModelTemplate>,
    requested_models: HashSet<String>,
    /// Duck nodes still waiting for the duck model.
    unattached_ducks: Vec<NodeId>,
    rng: StdRng,
}

impl Simulation {
    /// Build the scene and start the initial loads. Results are picked up
    /// from `inbox` by later ticks.
    pub fn new(
        config: SceneConfig,
        width: u32,
        height: u32,
        loader: Box<dyn AssetLoader>,
        inbox: AssetInbox,
    ) -> Self {
        Self::with_rng(config, width, height, loader, inbox, StdRng::from_entropy())
    }

    pub fn with_rng(
        config: SceneConfig,
        width: u32,
        height: u32,
        loader: Box<dyn AssetLoader>,
        inbox: AssetInbox,
        mut rng: StdRng,
    ) -> Self {
        let mut scene = SceneGraph::new();
        let mut resources = Resources::new();
        let yard = yard::build(&mut scene, &mut resources, loader.as_ref(), &config, &mut rng);
        let star_material = resources.add_material(yard::star_material(yard.star_texture));
        let stars = StarField::generate(config.star_count, &mut rng);

        let fox_node = scene.add_group(
            SceneGraph::ROOT,
            "fox",
            Transform::default().with_scale(config.fox_scale),
        );

        let mut camera = Camera::new(width, height, &config.camera);
        camera.set_look_at(Vec3::ZERO);
        let orbit = OrbitControls::new(Vec3::ZERO, config.camera.damping_factor);
        let physics = PhysicsWorld::new(config.physics);
        let hit_sound = Rc::new(HitSound::new(&config.assets.hit_sound));

        let mut sim = Self {
            scene,
            resources,
            lights: LightSet::default(),
            stars,
            star_material,
            yard,
            physics,
            ducks: Ducks::new(),
            camera,
            orbit,
            tweens: Tweens::new(),
            fox: CharacterRig { node: fox_node, yaw: 0.0 },
            mixer: None,
            text: None,
            controller: CameraController::new(),
            input: InputProcessor::default(),
            hit_sound,
            loader,
            inbox,
            models: HashMap::new(),
            requested_models: HashSet::new(),
            unattached_ducks: Vec::new(),
            rng,
            config,
        };
        let fox_path = sim.config.assets.fox_model.clone();
        sim.request_model(&fox_path);
        sim.place_celestials(0.0);
        sim
    }

    pub fn input_processor(&self) -> &InputProcessor {
        &self.input
    }

    pub fn hit_sound(&self) -> &Rc<HitSound> {
        &self.hit_sound
    }

    fn request_model(&mut self, path: &str) {
        if self.models.contains_key(path) || !self.requested_models.insert(path.to_string()) {
            return;
        }
        self.loader.load_model(path);
    }

    /// One display refresh worth of simulation. Rendering is left to the caller.
    pub fn tick(&mut self, time: FrameTime) -> TickReport {
        let attached_models = self.drain_assets();

        let mut subject = TweenSubject {
            camera: &mut self.camera,
            scene: &mut self.scene,
            fox: &mut self.fox,
        };
        self.tweens.update(time.dt, &mut subject);

        if let Some(mixer) = self.mixer.as_mut() {
            mixer.update(time.dt, &mut self.scene);
        }

        let physics_steps = self.physics.step(time.dt);
        let physics = &self.physics;
        self.ducks.sync(&mut self.scene, |body| physics.body_pose(body));

        self.stars.offset = star_offset(time.wall_clock_ms);
        self.place_celestials(time.elapsed);

        self.orbit.update(&mut self.camera);

        TickReport {
            physics_steps,
            attached_models,
            active_tweens: self.tweens.len(),
        }
    }

    fn place_celestials(&mut self, elapsed: f32) {
        self.lights.advance(elapsed);
        let moon = self.scene.transform_mut(self.yard.moon);
        moon.translation.x = self.lights.moon.position.x;
        moon.translation.y = self.lights.moon.position.y;
        moon.rotation = Quat::from_rotation_y(moon_spin(elapsed));
        let sun = self.scene.transform_mut(self.yard.sun);
        sun.translation.x = self.lights.sun.position.x;
        sun.translation.y = self.lights.sun.position.y;
    }

    /// Apply finished loads. Failures are logged and dropped; the asset
    /// simply never appears. Returns how many model instances were attached.
    pub fn drain_assets(&mut self) -> usize {
        let mut attached = 0;
        for loaded in self.inbox.drain() {
            match loaded {
                Loaded::Texture { id, path, result } => match result {
                    Ok(image) => {
                        tracing::debug!(%path, width = image.width, height = image.height, "texture loaded");
                        self.resources.fill_texture(id, image);
                    }
                    Err(err) => tracing::warn!(%err, "texture load failed"),
                },
                Loaded::Model { path, result } => {
                    self.requested_models.remove(&path);
                    match result {
                        Ok(asset) => {
                            let template = asset.register(&mut self.resources);
                            self.models.insert(path.clone(), template);
                            attached += self.attach_model(&path);
                        }
                        Err(err) => tracing::warn!(%err, "model load failed"),
                    }
                }
                Loaded::Font { path, result } => match result {
                    Ok(font) if self.text.is_none() => {
                        tracing::debug!(%path, glyphs = font.glyphs.len(), "typeface loaded");
                        let node =
                            yard::add_text(&mut self.scene, &mut self.resources, &self.yard, &font, &self.config.text);
                        self.text = Some(node);
                    }
                    Ok(_) => tracing::debug!(%path, "text already placed"),
                    Err(err) => tracing::warn!(%err, "typeface load failed"),
                },
            }
        }
        attached
    }

    fn attach_model(&mut self, path: &str) -> usize {
        let Some(template) = self.models.get(path) else { return 0 };

        if path == self.config.assets.fox_model {
            let instance = template.instantiate(&mut self.scene, self.fox.node);
            let mut mixer = AnimationMixer::new(template.clips().to_vec(), instance.bindings);
            if !mixer.clips().is_empty() {
                let idle = mixer.clip_action(IDLE_CLIP);
                mixer.play(idle);
            }
            tracing::info!(clips = mixer.clips().len(), "fox loaded");
            self.mixer = Some(mixer);
            1
        } else if path == self.config.assets.duck_model {
            let waiting = std::mem::take(&mut self.unattached_ducks);
            for &node in &waiting {
                template.instantiate(&mut self.scene, node);
            }
            tracing::debug!(ducks = waiting.len(), "duck model attached");
            waiting.len()
        } else {
            0
        }
    }

    /// Add a duck: visual node now, model when it arrives, and a box body
    /// that squeaks on hard impacts.
    pub fn spawn_duck(&mut self, spawn: DuckSpawn) -> DuckEntry {
        let node = self.scene.add_group(
            SceneGraph::ROOT,
            "duck",
            Transform::from_translation(spawn.position).with_scale(spawn.scale),
        );

        let duck_path = self.config.assets.duck_model.clone();
        match self.models.get(&duck_path) {
            Some(template) => {
                template.instantiate(&mut self.scene, node);
            }
            None => {
                self.unattached_ducks.push(node);
                self.request_model(&duck_path);
            }
        }

        let body = self.physics.add_box(Vec3::splat(spawn.scale / 2.0), 1.0, DUCK_SPAWN_POINT, spawn.position);
        self.physics.add_collide_listener(
            body,
            audio::squeak_on_impact(self.hit_sound.clone(), self.config.spawn.squeak_threshold),
        );

        let entry = DuckEntry { node, body, scale: spawn.scale };
        self.ducks.push(entry);
        tracing::info!(scale = spawn.scale, x = spawn.position.x, z = spawn.position.z, total = self.ducks.len(), "duck spawned");
        entry
    }

    /// The debug panel action: random size and drop point.
    pub fn spawn_random_duck(&mut self) -> DuckEntry {
        let spawn = DuckSpawn::random(&mut self.rng, &self.config.spawn);
        self.spawn_duck(spawn)
    }

    /// Both key listeners in registration order. Camera and character tweens
    /// are issued first; the walk clip is then started for every key, which
    /// fails while the fox is still loading.
    pub fn key_down(&mut self, key: &str, key_code: u32) -> Result<(), InputError> {
        if let Some(action) = self.input.camera_action(key, key_code) {
            for tween in self.controller.camera_tweens(action, self.camera.eye) {
                self.tweens.push(tween);
            }
        }

        if let Some(step) = self.input.character_step(key) {
            let position = self.scene.transform(self.fox.node).translation;
            for tween in self.controller.character_tweens(step, position) {
                self.tweens.push(tween);
            }
        }

        self.start_walk()
    }

    pub fn start_walk(&mut self) -> Result<(), InputError> {
        let mixer = self.mixer.as_mut().ok_or(InputError::CharacterNotLoaded)?;
        if mixer.clips().len() <= WALK_CLIP {
            return Err(InputError::ClipMissing(WALK_CLIP));
        }
        let walk = mixer.clip_action(WALK_CLIP);
        mixer.play(walk);
        Ok(())
    }

    /// Pointer drag (pixels) and wheel notches gathered since the last frame.
    pub fn apply_orbit_input(&mut self, drag: (f32, f32), wheel: i32, viewport_height: f32) {
        if drag != (0.0, 0.0) {
            self.orbit.drag(drag.0, drag.1, viewport_height);
        }
        if wheel != 0 {
            self.orbit.wheel(wheel);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::triangle_asset;
    use crate::assets::ModelAsset;
    use crate::model::yard::tests::RecordingLoader;
    use crate::model::scene::Visual;
    use approx::assert_relative_eq;

    /// Forwards requests to a shared recorder so tests can inspect them.
    struct SharedLoader(Rc<RecordingLoader>);

    impl AssetLoader for SharedLoader {
        fn load_texture(&self, path: &str, id: crate::model::material::TextureId) {
            self.0.load_texture(path, id);
        }
        fn load_model(&self, path: &str) {
            self.0.load_model(path);
        }
        fn load_font(&self, path: &str) {
            self.0.load_font(path);
        }
    }

    fn sim() -> (Simulation, Rc<RecordingLoader>, AssetInbox) {
        let loader = Rc::new(RecordingLoader::default());
        let inbox = AssetInbox::new();
        let sim = Simulation::with_rng(
            SceneConfig::default(),
            800,
            600,
            Box::new(SharedLoader(loader.clone())),
            inbox.clone(),
            StdRng::seed_from_u64(5),
        );
        (sim, loader, inbox)
    }

    fn frame(elapsed: f32, dt: f32) -> FrameTime {
        FrameTime { elapsed, dt, wall_clock_ms: 1_700_000_000_000.0 }
    }

    /// The test model with a second clip so the walk can start.
    fn fox_asset(path: &str) -> ModelAsset {
        let mut asset = triangle_asset(path);
        let mut walk = asset.clips[0].clone();
        walk.name = "Walk".to_string();
        asset.clips.push(walk);
        asset
    }

    #[test]
    fn fox_is_requested_at_startup() {
        let (_, loader, _) = sim();
        assert_eq!(*loader.models.borrow(), vec!["/models/Fox/glTF/Fox.gltf".to_string()]);
    }

    #[test]
    fn walking_before_the_fox_loads_is_reported() {
        let (mut sim, _, inbox) = sim();
        assert_eq!(sim.key_down("ArrowUp", 38), Err(InputError::CharacterNotLoaded));
        // the move itself was still issued
        assert_eq!(sim.tweens.len(), 2);

        let path = sim.config.assets.fox_model.clone();
        inbox.push(Loaded::Model { path: path.clone(), result: Ok(fox_asset(&path)) });
        sim.tick(frame(0.016, 0.016));
        assert!(sim.mixer.is_some());
        assert_eq!(sim.key_down("ArrowUp", 38), Ok(()));
        assert!(sim.mixer.as_ref().unwrap().is_playing(WALK_CLIP));
        // any key starts the walk, not just the arrows
        assert_eq!(sim.key_down("x", 88), Ok(()));
    }

    #[test]
    fn fox_without_walk_clip_is_an_error() {
        let (mut sim, _, inbox) = sim();
        let path = sim.config.assets.fox_model.clone();
        inbox.push(Loaded::Model { path: path.clone(), result: Ok(triangle_asset(&path)) });
        sim.tick(frame(0.016, 0.016));
        assert!(sim.mixer.as_ref().unwrap().is_playing(IDLE_CLIP));
        assert_eq!(sim.start_walk(), Err(InputError::ClipMissing(WALK_CLIP)));
    }

    #[test]
    fn spawning_n_ducks_gives_n_entries() {
        let (mut sim, loader, _) = sim();
        for _ in 0..5 {
            let entry = sim.spawn_random_duck();
            assert!(entry.scale > 0.0 && entry.scale <= 0.5);
            let t = sim.scene.transform(entry.node);
            assert!((-9.0..=9.0).contains(&t.translation.x));
            assert!((-9.0..=9.0).contains(&t.translation.z));
            assert_eq!(t.scale, Vec3::splat(entry.scale));
        }
        assert_eq!(sim.ducks.len(), 5);
        // ground plus five boxes
        assert_eq!(sim.physics.body_count(), 6);
        // the duck model is only fetched once while it is in flight
        let duck_requests = loader.models.borrow().iter().filter(|p| p.contains("Duck")).count();
        assert_eq!(duck_requests, 1);
    }

    #[test]
    fn duck_nodes_copy_body_pose_every_tick() {
        let (mut sim, _, _) = sim();
        sim.spawn_duck(DuckSpawn { scale: 0.4, position: Vec3::new(2.0, 5.0, -3.0) });
        sim.spawn_duck(DuckSpawn { scale: 0.2, position: Vec3::new(-4.0, 5.0, 1.0) });

        for i in 1..=90 {
            sim.tick(frame(i as f32 / 60.0, 1.0 / 60.0));
            for entry in sim.ducks.iter() {
                let (pos, rot) = sim.physics.body_pose(entry.body).unwrap();
                let t = sim.scene.transform(entry.node);
                assert_eq!(t.translation, pos);
                assert_eq!(t.rotation, rot);
                assert_eq!(t.scale, Vec3::splat(entry.scale));
            }
        }
        let first = sim.ducks.iter().next().unwrap();
        assert!(sim.scene.transform(first.node).translation.y < 5.0);
    }

    #[test]
    fn falling_ducks_squeak_through_one_sound() {
        let (mut sim, _, _) = sim();
        sim.spawn_duck(DuckSpawn { scale: 0.4, position: Vec3::new(2.0, 5.0, -3.0) });
        sim.spawn_duck(DuckSpawn { scale: 0.4, position: Vec3::new(-4.0, 5.0, 1.0) });
        assert_eq!(sim.hit_sound().plays(), 0);

        for i in 1..=120 {
            sim.tick(frame(i as f32 / 60.0, 1.0 / 60.0));
        }
        // both bodies hit the ground at ~9.9 m/s and restart the same element
        assert!(sim.hit_sound().plays() >= 2);
        assert!((0.0..=1.0).contains(&sim.hit_sound().volume()));
    }

    #[test]
    fn late_duck_model_attaches_to_waiting_ducks() {
        let (mut sim, _, inbox) = sim();
        let a = sim.spawn_duck(DuckSpawn { scale: 0.3, position: Vec3::new(1.0, 5.0, 1.0) });
        let b = sim.spawn_duck(DuckSpawn { scale: 0.3, position: Vec3::new(-1.0, 5.0, 1.0) });
        assert!(sim.scene.node(a.node).children.is_empty());

        let path = sim.config.assets.duck_model.clone();
        inbox.push(Loaded::Model { path: path.clone(), result: Ok(triangle_asset(&path)) });
        let report = sim.tick(frame(0.016, 0.016));
        assert_eq!(report.attached_models, 2);
        assert_eq!(sim.scene.node(a.node).children.len(), 1);
        assert_eq!(sim.scene.node(b.node).children.len(), 1);

        // later ducks get the cached model straight away
        let c = sim.spawn_duck(DuckSpawn { scale: 0.3, position: Vec3::ZERO + Vec3::Y * 5.0 });
        let model_root = sim.scene.node(c.node).children[0];
        let tri = sim.scene.node(model_root).children[0];
        let tri = sim.scene.node(tri).children[0];
        assert!(matches!(sim.scene.node(tri).visual, Visual::Mesh { .. }));
    }

    #[test]
    fn failed_loads_are_dropped() {
        let (mut sim, loader, inbox) = sim();
        let path = sim.config.assets.fox_model.clone();
        inbox.push(Loaded::Model {
            path: path.clone(),
            result: Err(crate::error::AssetError::Fetch { path, reason: "404".into() }),
        });
        let report = sim.tick(frame(0.016, 0.016));
        assert_eq!(report.attached_models, 0);
        assert!(sim.mixer.is_none());
        assert_eq!(loader.models.borrow().len(), 1);
    }

    #[test]
    fn text_appears_once_the_typeface_arrives() {
        let (mut sim, loader, inbox) = sim();
        assert_eq!(loader.fonts.borrow().len(), 1);
        assert!(sim.text.is_none());
        let nodes = sim.scene.len();

        sim.config.text.content = "DO".to_string();
        let path = sim.config.assets.font.clone();
        let font = || crate::model::typeface::tests::test_font();
        inbox.push(Loaded::Font { path: path.clone(), result: Ok(font()) });
        inbox.push(Loaded::Font { path, result: Ok(font()) });
        sim.tick(frame(0.016, 0.016));

        let text = sim.text.expect("text node");
        assert_eq!(sim.scene.len(), nodes + 1);
        let t = sim.scene.transform(text);
        assert_eq!(t.translation, Vec3::new(-9.0, 0.0, 0.0));
        match sim.scene.node(text).visual {
            Visual::Mesh { mesh, material } => {
                assert_eq!(material, sim.yard.text_material);
                assert!(!sim.resources.mesh(mesh).indices.is_empty());
            }
            ref other => panic!("text visual {other:?}"),
        }
    }

    #[test]
    fn hop_lands_back_at_eye_height() {
        let (mut sim, _, _) = sim();
        sim.key_down(" ", 32).ok();
        assert_eq!(sim.tweens.len(), 3);

        let mut peak = f32::MIN;
        let mut low = f32::MAX;
        for i in 1..=160 {
            sim.tick(frame(i as f32 / 64.0, 1.0 / 64.0));
            peak = peak.max(sim.camera.eye.y);
            if i as f32 / 64.0 > 1.2 {
                low = low.min(sim.camera.eye.y);
            }
        }
        assert!(peak > 2.5, "peak = {peak}");
        assert!(low < 1.0, "low = {low}");
        assert_relative_eq!(sim.camera.eye.y, 1.0, epsilon = 1e-3);
        assert!(sim.tweens.is_empty());
    }

    #[test]
    fn camera_keys_move_one_unit() {
        let (mut sim, _, _) = sim();
        let start = sim.camera.eye;
        sim.key_down("w", 87).ok();
        sim.key_down("d", 68).ok();
        for i in 1..=80 {
            sim.tick(frame(i as f32 / 64.0, 1.0 / 64.0));
        }
        assert_relative_eq!(sim.camera.eye.z, start.z - 1.0, epsilon = 1e-3);
        assert_relative_eq!(sim.camera.eye.x, start.x + 1.0, epsilon = 1e-3);
    }

    #[test]
    fn fox_steps_and_turns() {
        let (mut sim, _, _) = sim();
        sim.key_down("ArrowRight", 39).ok();
        for i in 1..=80 {
            sim.tick(frame(i as f32 / 64.0, 1.0 / 64.0));
        }
        let t = sim.scene.transform(sim.fox.node);
        assert_relative_eq!(t.translation.x, 1.0, epsilon = 1e-4);
        assert_relative_eq!(sim.fox.yaw, std::f32::consts::FRAC_PI_2, epsilon = 1e-4);
        assert!(t.rotation.abs_diff_eq(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), 1e-4));
        assert_eq!(t.scale, Vec3::splat(0.015));
    }

    #[test]
    fn celestials_follow_elapsed_time() {
        let (mut sim, _, _) = sim();
        sim.tick(frame(8.0, 0.016));
        let moon = sim.scene.transform(sim.yard.moon).translation;
        let sun = sim.scene.transform(sim.yard.sun).translation;
        assert_relative_eq!(moon.x, 14.0 * 2.0f32.cos(), epsilon = 1e-4);
        assert_relative_eq!(moon.y, 14.0 * 2.0f32.sin(), epsilon = 1e-4);
        assert_relative_eq!(sun.x, -moon.x);
        assert_relative_eq!(sun.y, -moon.y);
        assert_eq!(sim.lights.moon.position.x, moon.x);
        assert_eq!(sim.stars.offset, star_offset(1_700_000_000_000.0));
    }

    #[test]
    fn resize_keeps_fov() {
        let (mut sim, _, _) = sim();
        let fov = sim.camera.fov_y;
        sim.resize(1000, 500);
        assert_relative_eq!(sim.camera.aspect, 2.0);
        assert_eq!(sim.camera.fov_y, fov);
    }
}
