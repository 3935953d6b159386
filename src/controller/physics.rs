//! Rigid-body world for the ducks: a static ground plane, box bodies and
//! per-body collision listeners.

use std::collections::HashMap;
use std::sync::Mutex;

use glam::{Quat, Vec3};
use rapier3d::prelude as rapier;
use rapier3d::prelude::{ColliderBuilder, RigidBodyBuilder, RigidBodyHandle};

use crate::config::PhysicsConfig;

pub type BodyHandle = RigidBodyHandle;

/// First contact between a listened body and anything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    pub body: BodyHandle,
    pub other: Option<BodyHandle>,
    /// Closing speed along the contact normal, measured before the step
    /// that produced the contact.
    pub speed: f32,
}

pub type CollideListener = Box<dyn FnMut(&Impact)>;

/// Collision starts pushed by rapier during a step.
#[derive(Default)]
struct StartedCollisions {
    started: Mutex<Vec<(rapier::ColliderHandle, rapier::ColliderHandle)>>,
}

impl rapier::EventHandler for StartedCollisions {
    fn handle_collision_event(
        &self,
        _bodies: &rapier::RigidBodySet,
        _colliders: &rapier::ColliderSet,
        event: rapier::CollisionEvent,
        _contact_pair: Option<&rapier::ContactPair>,
    ) {
        if let rapier::CollisionEvent::Started(h1, h2, _) = event {
            if let Ok(mut started) = self.started.lock() {
                started.push((h1, h2));
            }
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &rapier::RigidBodySet,
        _colliders: &rapier::ColliderSet,
        _contact_pair: &rapier::ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

pub struct PhysicsWorld {
    config: PhysicsConfig,
    pipeline: rapier::PhysicsPipeline,
    gravity: rapier::Vector<f32>,
    integration_params: rapier::IntegrationParameters,
    islands: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    impulse_joints: rapier::ImpulseJointSet,
    multibody_joints: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
    bodies: rapier::RigidBodySet,
    colliders: rapier::ColliderSet,
    ground: BodyHandle,
    listeners: HashMap<BodyHandle, Vec<CollideListener>>,
    accumulated_time: f32,
}

impl PhysicsWorld {
    /// World with gravity from `config` and a static ground half-space at y = 0.
    pub fn new(config: PhysicsConfig) -> Self {
        let gravity = rapier::Vector::new(config.gravity.x, config.gravity.y, config.gravity.z);
        let mut integration_params = rapier::IntegrationParameters::default();
        integration_params.dt = config.timestep;

        let mut bodies = rapier::RigidBodySet::new();
        let mut colliders = rapier::ColliderSet::new();

        let ground = bodies.insert(RigidBodyBuilder::fixed());
        let plane = ColliderBuilder::halfspace(rapier::Vector::y_axis())
            .friction(config.friction)
            .restitution(config.restitution)
            .build();
        colliders.insert_with_parent(plane, ground, &mut bodies);

        Self {
            config,
            pipeline: rapier::PhysicsPipeline::new(),
            gravity,
            integration_params,
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            bodies,
            colliders,
            ground,
            listeners: HashMap::new(),
            accumulated_time: 0.0,
        }
    }

    pub fn ground(&self) -> BodyHandle {
        self.ground
    }

    /// Dynamic box with the shared contact material. Bodies are created at
    /// `spawn` and then moved to `position`.
    pub fn add_box(&mut self, half_extents: Vec3, mass: f32, spawn: Vec3, position: Vec3) -> BodyHandle {
        let handle = self
            .bodies
            .insert(RigidBodyBuilder::dynamic().translation(rapier::Vector::new(spawn.x, spawn.y, spawn.z)));
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass)
            .friction(self.config.friction)
            .restitution(self.config.restitution)
            .active_events(rapier::ActiveEvents::COLLISION_EVENTS)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(rapier::Vector::new(position.x, position.y, position.z), true);
        }
        handle
    }

    pub fn add_collide_listener(&mut self, body: BodyHandle, listener: CollideListener) {
        self.listeners.entry(body).or_default().push(listener);
    }

    /// Advance by `dt` of real time in fixed sub-steps, at most
    /// `max_substeps` per call. Leftover time below one sub-step carries over.
    /// Returns the number of sub-steps taken.
    pub fn step(&mut self, dt: f32) -> u32 {
        self.accumulated_time += dt.max(0.0);

        let mut steps = 0;
        while self.accumulated_time >= self.config.timestep && steps < self.config.max_substeps {
            self.step_internal();
            self.accumulated_time -= self.config.timestep;
            steps += 1;
        }
        if steps == self.config.max_substeps {
            self.accumulated_time %= self.config.timestep;
        }
        steps
    }

    fn step_internal(&mut self) {
        let velocities: HashMap<BodyHandle, Vec3> = self
            .bodies
            .iter()
            .map(|(h, b)| {
                let v = b.linvel();
                (h, Vec3::new(v.x, v.y, v.z))
            })
            .collect();

        let events = StartedCollisions::default();
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &events,
        );

        let started = events.started.into_inner().unwrap_or_default();
        for (c1, c2) in started {
            let (Some(b1), Some(b2)) = (self.collider_body(c1), self.collider_body(c2)) else {
                continue;
            };
            let v1 = velocities.get(&b1).copied().unwrap_or(Vec3::ZERO);
            let v2 = velocities.get(&b2).copied().unwrap_or(Vec3::ZERO);
            let speed = self.impact_speed(c1, c2, v1 - v2);

            self.dispatch(Impact { body: b1, other: Some(b2), speed });
            self.dispatch(Impact { body: b2, other: Some(b1), speed });
        }
    }

    fn collider_body(&self, collider: rapier::ColliderHandle) -> Option<BodyHandle> {
        self.colliders.get(collider).and_then(|c| c.parent())
    }

    /// Relative velocity projected on the manifold normal; falls back to the
    /// full relative speed when the narrow phase kept no manifold.
    fn impact_speed(&self, c1: rapier::ColliderHandle, c2: rapier::ColliderHandle, relative: Vec3) -> f32 {
        let normal = self
            .narrow_phase
            .contact_pair(c1, c2)
            .and_then(|pair| pair.manifolds.iter().find(|m| !m.points.is_empty()))
            .map(|m| Vec3::new(m.data.normal.x, m.data.normal.y, m.data.normal.z));

        match normal {
            Some(n) if n.length_squared() > 0.0 => relative.dot(n).abs(),
            _ => relative.length(),
        }
    }

    fn dispatch(&mut self, impact: Impact) {
        if let Some(listeners) = self.listeners.get_mut(&impact.body) {
            for listener in listeners.iter_mut() {
                listener(&impact);
            }
        }
    }

    pub fn body_pose(&self, handle: BodyHandle) -> Option<(Vec3, Quat)> {
        let body = self.bodies.get(handle)?;
        let t = body.translation();
        let q = body.rotation();
        Some((Vec3::new(t.x, t.y, t.z), Quat::from_xyzw(q.i, q.j, q.k, q.w)))
    }

    /// Includes the ground.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(SceneConfig::default().physics)
    }

    #[test]
    fn boxes_are_moved_from_the_spawn_point() {
        let mut world = world();
        let target = Vec3::new(3.0, 5.0, -2.0);
        let duck = world.add_box(Vec3::splat(0.2), 1.0, Vec3::new(0.0, 5.0, 0.0), target);
        let (pos, rot) = world.body_pose(duck).unwrap();
        assert_eq!(pos, target);
        assert_eq!(rot, Quat::IDENTITY);
        assert_eq!(world.body_count(), 2);
    }

    #[test]
    fn step_is_capped_at_max_substeps() {
        let mut world = world();
        assert_eq!(world.step(1.0 / 60.0), 1);
        // 0.11 s is six and a half sub-steps; only three run and the backlog
        // is dropped down to the 0.01 s remainder
        assert_eq!(world.step(0.11), 3);
        assert_eq!(world.step(0.001), 0);
    }

    #[test]
    fn dropped_box_settles_on_the_ground() {
        let mut world = world();
        let half = 0.25;
        let duck = world.add_box(Vec3::splat(half), 1.0, Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 5.0, 1.0));
        for _ in 0..600 {
            world.step(1.0 / 60.0);
        }
        let (pos, _) = world.body_pose(duck).unwrap();
        assert!(pos.y > 0.0 && pos.y < 1.0, "y = {}", pos.y);
    }

    #[test]
    fn hard_landing_reports_impact_speed() {
        let mut world = world();
        let duck = world.add_box(Vec3::splat(0.25), 1.0, Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 5.0, 0.0));
        let impacts: Rc<RefCell<Vec<Impact>>> = Rc::default();
        let sink = impacts.clone();
        world.add_collide_listener(duck, Box::new(move |impact| sink.borrow_mut().push(*impact)));

        for _ in 0..120 {
            world.step(1.0 / 60.0);
        }

        let impacts = impacts.borrow();
        let first = impacts.first().expect("duck should hit the ground");
        assert_eq!(first.body, duck);
        assert_eq!(first.other, Some(world.ground()));
        assert!(first.speed > 1.5, "speed = {}", first.speed);
    }

    #[test]
    fn listeners_are_per_body() {
        let mut world = world();
        let a = world.add_box(Vec3::splat(0.25), 1.0, Vec3::new(0.0, 5.0, 0.0), Vec3::new(-5.0, 2.0, 0.0));
        let b = world.add_box(Vec3::splat(0.25), 1.0, Vec3::new(0.0, 5.0, 0.0), Vec3::new(5.0, 4.0, 0.0));
        let hits: Rc<RefCell<Vec<BodyHandle>>> = Rc::default();
        for body in [a, b] {
            let hits = hits.clone();
            world.add_collide_listener(body, Box::new(move |impact| hits.borrow_mut().push(impact.body)));
        }

        for _ in 0..180 {
            world.step(1.0 / 60.0);
        }

        let hits = hits.borrow();
        assert!(hits.contains(&a));
        assert!(hits.contains(&b));
        // the lower box lands first
        assert_eq!(hits[0], a);
    }
}
