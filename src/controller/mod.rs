// CONTROLLER: Input, simulation, and update loop
pub mod input;
pub mod physics;
pub mod tween;
pub mod camera_controller;
pub mod simulation;
pub mod frame_loop;

pub use input::{InputState, InputProcessor};
pub use physics::PhysicsWorld;
pub use tween::{Tween, Tweens};
pub use camera_controller::{CameraController, CharacterRig, OrbitControls};
pub use simulation::{FrameTime, Simulation, TickReport};
pub use frame_loop::{CameraUniform, FpsCounter, FrameClock, LightingUniform, ShadowUniform};
#[cfg(target_arch = "wasm32")]
pub use frame_loop::FrameLoopContext;
