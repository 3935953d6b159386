use glam::{Quat, Vec3};
use rand::Rng;
use rapier3d::prelude::RigidBodyHandle;

use crate::config::SpawnConfig;
use crate::model::scene::{NodeId, SceneGraph};

/// A duck's visual node paired with the body that drives it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuckEntry {
    pub node: NodeId,
    pub body: RigidBodyHandle,
    pub scale: f32,
}

/// Where and how big the next duck is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuckSpawn {
    pub scale: f32,
    pub position: Vec3,
}

impl DuckSpawn {
    /// Scale in `(0, max_scale]`, x and z in `[-area/2, area/2)`, fixed drop height.
    pub fn random<R: Rng>(rng: &mut R, cfg: &SpawnConfig) -> Self {
        let scale = cfg.max_scale * (1.0 - rng.gen::<f32>());
        let x = (rng.gen::<f32>() - 0.5) * cfg.area;
        let z = (rng.gen::<f32>() - 0.5) * cfg.area;
        Self { scale, position: Vec3::new(x, cfg.height, z) }
    }
}

/// Every duck spawned this session; entries are never removed.
#[derive(Debug, Default)]
pub struct Ducks {
    entries: Vec<DuckEntry>,
}

impl Ducks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DuckEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DuckEntry> {
        self.entries.iter()
    }

    /// Copy each body's translation and rotation onto its node; scale is untouched.
    pub fn sync<F>(&self, scene: &mut SceneGraph, pose: F)
    where
        F: Fn(RigidBodyHandle) -> Option<(Vec3, Quat)>,
    {
        for entry in &self.entries {
            if let Some((translation, rotation)) = pose(entry.body) {
                let t = scene.transform_mut(entry.node);
                t.translation = translation;
                t.rotation = rotation;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::model::scene::Transform;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn random_spawns_stay_in_bounds() {
        let cfg = SceneConfig::default().spawn;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let s = DuckSpawn::random(&mut rng, &cfg);
            assert!(s.scale > 0.0 && s.scale <= 0.5, "scale = {}", s.scale);
            assert!((-9.0..9.0).contains(&s.position.x));
            assert!((-9.0..9.0).contains(&s.position.z));
            assert_eq!(s.position.y, 5.0);
        }
    }

    #[test]
    fn sync_copies_pose_but_not_scale() {
        let mut scene = SceneGraph::new();
        let node = scene.add_group(SceneGraph::ROOT, "duck", Transform::default().with_scale(0.3));
        let mut ducks = Ducks::new();
        let body = RigidBodyHandle::from_raw_parts(1, 0);
        ducks.push(DuckEntry { node, body, scale: 0.3 });

        let pos = Vec3::new(1.0, 0.15, -2.0);
        let rot = Quat::from_rotation_x(0.5);
        ducks.sync(&mut scene, |h| (h == body).then_some((pos, rot)));

        let t = scene.transform(node);
        assert_eq!(t.translation, pos);
        assert_eq!(t.rotation, rot);
        assert_eq!(t.scale, Vec3::splat(0.3));
    }
}
