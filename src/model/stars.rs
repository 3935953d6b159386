use glam::Vec3;
use rand::Rng;

/// `floor(r * (max - min)) + min` for a uniform `r` in `[0, 1)`. With
/// integer bounds this is an integer in `[min, max)`; with fractional bounds
/// only the floor of the span is random, so `(0.5, 1.5)` is always 0.5.
pub fn random_floor<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    (rng.gen::<f32>() * (max - min)).floor() + min
}

/// Push a value away from zero so stars stay outside the yard.
fn outside_yard(value: f32) -> f32 {
    if value > 0.0 {
        value + 8.0
    } else {
        value - 8.0
    }
}

/// Point sprites scattered above the scene; `offset` drifts every frame.
#[derive(Debug, Clone)]
pub struct StarField {
    pub points: Vec<Vec3>,
    pub offset: Vec3,
    pub size: f32,
}

impl StarField {
    pub fn generate<R: Rng>(count: usize, rng: &mut R) -> Self {
        let points = (0..count)
            .map(|_| {
                let x = outside_yard(random_floor(rng, -10.0, 10.0));
                let y = random_floor(rng, 5.0, 10.0);
                let z = outside_yard(random_floor(rng, -10.0, 10.0));
                Vec3::new(x, y, z)
            })
            .collect();
        Self { points, offset: Vec3::ZERO, size: 0.8 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn stars_avoid_the_yard() {
        let mut rng = StdRng::seed_from_u64(42);
        let stars = StarField::generate(100, &mut rng);
        assert_eq!(stars.points.len(), 100);
        for p in &stars.points {
            assert!(p.x.abs() >= 8.0 && p.x >= -18.0 && p.x <= 17.0, "x = {}", p.x);
            assert!(p.z.abs() >= 8.0 && p.z >= -18.0 && p.z <= 17.0, "z = {}", p.z);
            assert!((5.0..10.0).contains(&p.y));
            assert_eq!(p.y.fract(), 0.0);
        }
    }

    #[test]
    fn random_floor_is_half_open() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let v = random_floor(&mut rng, 5.0, 10.0);
            assert!((5.0..10.0).contains(&v));
            assert_eq!(v.fract(), 0.0);
        }
    }

    #[test]
    fn fractional_bounds_collapse_to_min() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!((0..200).all(|_| random_floor(&mut rng, 0.5, 1.5) == 0.5));
    }
}
