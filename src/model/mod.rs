// MODEL: Scene state and data
pub mod animation;
pub mod camera;
pub mod ducks;
pub mod earcut;
pub mod geometry;
pub mod lights;
pub mod material;
pub mod scene;
pub mod stars;
pub mod typeface;
pub mod yard;

pub use animation::{AnimationClip, AnimationMixer};
pub use camera::Camera;
pub use ducks::{DuckEntry, DuckSpawn, Ducks};
pub use lights::LightSet;
pub use material::{Material, Resources};
pub use scene::{NodeId, SceneGraph, Transform, Visual};
pub use stars::StarField;
pub use typeface::Typeface;
pub use yard::Yard;
