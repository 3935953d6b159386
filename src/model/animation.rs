//! Keyframe clips and a small mixer that loops them onto scene nodes.

use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::model::scene::{NodeId, SceneGraph};

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

/// One animated property of one node; `target` indexes the model's nodes.
#[derive(Clone, Debug)]
pub struct Channel {
    pub target: usize,
    pub times: Vec<f32>,
    pub keyframes: Keyframes,
    pub interpolation: Interpolation,
}

#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    pub fn new(name: &str, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0, f32::max);
        Self { name: name.to_string(), duration, channels }
    }
}

/// Position of `t` between two keys: (lower index, upper index, blend factor).
fn locate(times: &[f32], t: f32) -> (usize, usize, f32) {
    match times {
        [] => (0, 0, 0.0),
        [_] => (0, 0, 0.0),
        _ if t <= times[0] => (0, 0, 0.0),
        _ if t >= times[times.len() - 1] => (times.len() - 1, times.len() - 1, 0.0),
        _ => {
            let upper = times.partition_point(|&k| k <= t);
            let lower = upper - 1;
            let span = times[upper] - times[lower];
            let f = if span > 0.0 { (t - times[lower]) / span } else { 0.0 };
            (lower, upper, f)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Sample {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

impl Channel {
    fn sample(&self, t: f32) -> Option<Sample> {
        let (a, b, mut f) = locate(&self.times, t);
        if self.interpolation == Interpolation::Step {
            f = 0.0;
        }
        match &self.keyframes {
            Keyframes::Translation(v) => Some(Sample::Translation(v.get(a)?.lerp(*v.get(b)?, f))),
            Keyframes::Scale(v) => Some(Sample::Scale(v.get(a)?.lerp(*v.get(b)?, f))),
            Keyframes::Rotation(v) => Some(Sample::Rotation(v.get(a)?.slerp(*v.get(b)?, f).normalize())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionId(pub usize);

#[derive(Clone, Debug)]
pub struct AnimationAction {
    pub clip: usize,
    pub time: f32,
    pub weight: f32,
    pub playing: bool,
    pub loops: u32,
}

#[derive(Default)]
struct Accumulator {
    translation: Option<(Vec3, f32)>,
    rotation: Option<(Quat, f32)>,
    scale: Option<(Vec3, f32)>,
}

/// Plays looping clips for one model; concurrently playing actions are
/// blended by weight.
pub struct AnimationMixer {
    clips: Vec<AnimationClip>,
    /// Model node index -> scene node.
    bindings: Vec<NodeId>,
    actions: Vec<AnimationAction>,
}

impl AnimationMixer {
    pub fn new(clips: Vec<AnimationClip>, bindings: Vec<NodeId>) -> Self {
        Self { clips, bindings, actions: Vec::new() }
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    /// The action for `clip`, created on first use.
    pub fn clip_action(&mut self, clip: usize) -> ActionId {
        if let Some(idx) = self.actions.iter().position(|a| a.clip == clip) {
            return ActionId(idx);
        }
        self.actions.push(AnimationAction {
            clip,
            time: 0.0,
            weight: 1.0,
            playing: false,
            loops: 0,
        });
        ActionId(self.actions.len() - 1)
    }

    /// Starting an already playing action keeps its time.
    pub fn play(&mut self, action: ActionId) {
        if let Some(a) = self.actions.get_mut(action.0) {
            a.playing = true;
        }
    }

    pub fn is_playing(&self, clip: usize) -> bool {
        self.actions.iter().any(|a| a.clip == clip && a.playing)
    }

    /// Advance every playing action by `dt` and write the blended pose.
    pub fn update(&mut self, dt: f32, scene: &mut SceneGraph) {
        let mut pose: HashMap<usize, Accumulator> = HashMap::new();

        for action in self.actions.iter_mut().filter(|a| a.playing) {
            let Some(clip) = self.clips.get(action.clip) else { continue };
            action.time += dt;
            if clip.duration > 0.0 && action.time >= clip.duration {
                action.loops += (action.time / clip.duration) as u32;
                action.time %= clip.duration;
                tracing::debug!(clip = %clip.name, loops = action.loops, "animation loop");
            }

            let w = action.weight;
            if w <= 0.0 {
                continue;
            }
            for channel in &clip.channels {
                let Some(sample) = channel.sample(action.time) else { continue };
                let acc = pose.entry(channel.target).or_default();
                match sample {
                    Sample::Translation(v) => {
                        acc.translation = Some(match acc.translation {
                            None => (v, w),
                            Some((cur, cw)) => (cur.lerp(v, w / (cw + w)), cw + w),
                        });
                    }
                    Sample::Scale(v) => {
                        acc.scale = Some(match acc.scale {
                            None => (v, w),
                            Some((cur, cw)) => (cur.lerp(v, w / (cw + w)), cw + w),
                        });
                    }
                    Sample::Rotation(q) => {
                        acc.rotation = Some(match acc.rotation {
                            None => (q, w),
                            Some((cur, cw)) => (cur.slerp(q, w / (cw + w)).normalize(), cw + w),
                        });
                    }
                }
            }
        }

        for (target, acc) in pose {
            let Some(&node) = self.bindings.get(target) else { continue };
            let transform = scene.transform_mut(node);
            if let Some((t, _)) = acc.translation {
                transform.translation = t;
            }
            if let Some((r, _)) = acc.rotation {
                transform.rotation = r;
            }
            if let Some((s, _)) = acc.scale {
                transform.scale = s;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::scene::Transform;
    use approx::assert_relative_eq;

    fn slide_clip(name: &str, to: Vec3) -> AnimationClip {
        AnimationClip::new(
            name,
            vec![Channel {
                target: 0,
                times: vec![0.0, 1.0, 2.0],
                keyframes: Keyframes::Translation(vec![Vec3::ZERO, to, Vec3::ZERO]),
                interpolation: Interpolation::Linear,
            }],
        )
    }

    fn rig() -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let node = scene.add_group(SceneGraph::ROOT, "bone", Transform::default());
        (scene, node)
    }

    #[test]
    fn idle_mixer_leaves_pose_alone() {
        let (mut scene, node) = rig();
        scene.transform_mut(node).translation = Vec3::new(3.0, 0.0, 0.0);
        let mut mixer = AnimationMixer::new(vec![slide_clip("Survey", Vec3::X)], vec![node]);
        mixer.update(0.5, &mut scene);
        assert_eq!(scene.transform(node).translation, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn linear_sampling_between_keys() {
        let (mut scene, node) = rig();
        let mut mixer = AnimationMixer::new(vec![slide_clip("Survey", Vec3::new(2.0, 0.0, 0.0))], vec![node]);
        let idle = mixer.clip_action(0);
        mixer.play(idle);
        mixer.update(0.5, &mut scene);
        assert_relative_eq!(scene.transform(node).translation.x, 1.0);
    }

    #[test]
    fn actions_loop_past_the_clip_end() {
        let (mut scene, node) = rig();
        let mut mixer = AnimationMixer::new(vec![slide_clip("Survey", Vec3::new(2.0, 0.0, 0.0))], vec![node]);
        let idle = mixer.clip_action(0);
        mixer.play(idle);
        mixer.update(2.5, &mut scene);
        assert_eq!(mixer.actions()[0].loops, 1);
        assert_relative_eq!(mixer.actions()[0].time, 0.5);
        assert_relative_eq!(scene.transform(node).translation.x, 1.0);
    }

    #[test]
    fn clip_action_is_reused() {
        let (_, node) = rig();
        let mut mixer = AnimationMixer::new(vec![slide_clip("Survey", Vec3::X), slide_clip("Walk", Vec3::Y)], vec![node]);
        let a = mixer.clip_action(1);
        let b = mixer.clip_action(1);
        assert_eq!(a, b);
        assert_eq!(mixer.actions().len(), 1);
    }

    #[test]
    fn two_playing_actions_blend_evenly() {
        let (mut scene, node) = rig();
        let mut mixer = AnimationMixer::new(
            vec![slide_clip("Survey", Vec3::new(2.0, 0.0, 0.0)), slide_clip("Walk", Vec3::new(0.0, 2.0, 0.0))],
            vec![node],
        );
        let idle = mixer.clip_action(0);
        let walk = mixer.clip_action(1);
        mixer.play(idle);
        mixer.play(walk);
        mixer.update(1.0, &mut scene);
        let t = scene.transform(node).translation;
        assert_relative_eq!(t.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(t.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn step_interpolation_holds_previous_key() {
        let times = [0.0, 1.0];
        assert_eq!(locate(&times, 0.25), (0, 1, 0.25));
        let channel = Channel {
            target: 0,
            times: times.to_vec(),
            keyframes: Keyframes::Scale(vec![Vec3::ONE, Vec3::splat(3.0)]),
            interpolation: Interpolation::Step,
        };
        assert_eq!(channel.sample(0.9), Some(Sample::Scale(Vec3::ONE)));
        assert_eq!(channel.sample(5.0), Some(Sample::Scale(Vec3::splat(3.0))));
    }
}
