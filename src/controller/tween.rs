//! Fire-and-forget property tweens with delay and easing.
//!
//! A tween captures its start value when its delay runs out, not when it is
//! created. Tweens on the same property are not cancelled; they all keep
//! writing and the most recently created one lands last each frame.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TweenTarget {
    CameraX,
    CameraY,
    CameraZ,
    FoxX,
    FoxZ,
    FoxYaw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Ease {
    Linear,
    /// Quadratic ease-out.
    #[default]
    Power1Out,
}

impl Ease {
    pub fn apply(self, progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            Ease::Linear => p,
            Ease::Power1Out => 1.0 - (1.0 - p) * (1.0 - p),
        }
    }
}

/// Something whose scalar properties can be tweened.
pub trait Tweenable {
    fn get(&self, target: TweenTarget) -> Option<f32>;
    fn set(&mut self, target: TweenTarget, value: f32);
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tween {
    pub target: TweenTarget,
    pub to: f32,
    pub duration: f32,
    pub delay: f32,
    pub ease: Ease,
    from: Option<f32>,
    elapsed: f32,
}

impl Tween {
    pub fn to(target: TweenTarget, to: f32, duration: f32) -> Self {
        Self {
            target,
            to,
            duration,
            delay: 0.0,
            ease: Ease::default(),
            from: None,
            elapsed: 0.0,
        }
    }

    pub fn delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn started(&self) -> bool {
        self.from.is_some()
    }

    /// Returns true once the tween has written its final value.
    fn advance<T: Tweenable + ?Sized>(&mut self, dt: f32, subject: &mut T) -> bool {
        self.elapsed += dt;
        if self.elapsed < self.delay {
            return false;
        }
        let from = match self.from {
            Some(from) => from,
            None => match subject.get(self.target) {
                Some(v) => *self.from.insert(v),
                None => return false,
            },
        };

        let progress = if self.duration > 0.0 {
            (self.elapsed - self.delay) / self.duration
        } else {
            1.0
        };
        let value = from + (self.to - from) * self.ease.apply(progress);
        subject.set(self.target, value);
        progress >= 1.0
    }
}

#[derive(Default)]
pub struct Tweens {
    active: Vec<Tween>,
}

impl Tweens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tween: Tween) {
        self.active.push(tween);
    }

    /// Advance every tween in creation order and drop the finished ones.
    pub fn update<T: Tweenable + ?Sized>(&mut self, dt: f32, subject: &mut T) {
        self.active.retain_mut(|tween| !tween.advance(dt, subject));
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tween> {
        self.active.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Props(HashMap<TweenTarget, f32>);

    impl Tweenable for Props {
        fn get(&self, target: TweenTarget) -> Option<f32> {
            Some(self.0.get(&target).copied().unwrap_or(0.0))
        }
        fn set(&mut self, target: TweenTarget, value: f32) {
            self.0.insert(target, value);
        }
    }

    // 1/64 s frames keep elapsed time exact in f32
    fn run(tweens: &mut Tweens, props: &mut Props, seconds: f32) {
        let steps = (seconds * 64.0).round() as usize;
        for _ in 0..steps {
            tweens.update(1.0 / 64.0, props);
        }
    }

    #[test]
    fn power1_out_starts_fast() {
        assert_eq!(Ease::Power1Out.apply(0.0), 0.0);
        assert_eq!(Ease::Power1Out.apply(1.0), 1.0);
        assert_relative_eq!(Ease::Power1Out.apply(0.5), 0.75);
        assert!(Ease::Power1Out.apply(0.25) > Ease::Linear.apply(0.25));
    }

    #[test]
    fn tween_reaches_target_and_is_dropped() {
        let mut props = Props::default();
        props.set(TweenTarget::CameraZ, 10.0);
        let mut tweens = Tweens::new();
        tweens.push(Tween::to(TweenTarget::CameraZ, 9.0, 1.0));

        run(&mut tweens, &mut props, 0.5);
        let mid = props.get(TweenTarget::CameraZ).unwrap();
        assert!(mid < 10.0 && mid > 9.0);

        run(&mut tweens, &mut props, 0.6);
        assert_relative_eq!(props.get(TweenTarget::CameraZ).unwrap(), 9.0);
        assert!(tweens.is_empty());
    }

    #[test]
    fn delayed_tween_captures_start_value_late() {
        let mut props = Props::default();
        let mut tweens = Tweens::new();
        tweens.push(Tween::to(TweenTarget::CameraY, 3.0, 1.0));
        tweens.push(Tween::to(TweenTarget::CameraY, 0.6, 0.6).delay(1.0));

        run(&mut tweens, &mut props, 0.5);
        assert!(!tweens.iter().nth(1).unwrap().started());

        run(&mut tweens, &mut props, 0.52);
        // the delayed stage picked up where the first one finished
        let y = props.get(TweenTarget::CameraY).unwrap();
        assert!(y > 2.5 && y < 3.0, "y = {y}");
    }

    #[test]
    fn later_tweens_win_while_overlapping() {
        let mut props = Props::default();
        let mut tweens = Tweens::new();
        tweens.push(Tween::to(TweenTarget::FoxYaw, 10.0, 2.0).ease(Ease::Linear));
        tweens.push(Tween::to(TweenTarget::FoxYaw, -1.0, 0.5).ease(Ease::Linear));

        run(&mut tweens, &mut props, 0.5);
        assert_relative_eq!(props.get(TweenTarget::FoxYaw).unwrap(), -1.0, epsilon = 1e-4);
        assert_eq!(tweens.len(), 1);

        // once the short one is gone the long one writes again
        run(&mut tweens, &mut props, 0.1);
        assert!(props.get(TweenTarget::FoxYaw).unwrap() > 2.0);
    }

    #[test]
    fn zero_duration_snaps() {
        let mut props = Props::default();
        let mut tweens = Tweens::new();
        tweens.push(Tween::to(TweenTarget::FoxX, 4.0, 0.0));
        tweens.update(0.016, &mut props);
        assert_eq!(props.get(TweenTarget::FoxX), Some(4.0));
        assert!(tweens.is_empty());
    }
}
