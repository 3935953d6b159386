// VIEW: Rendering and graphics
pub mod draw_list;
pub mod gpu_init;
pub mod render;
pub mod shadow_map;

pub use draw_list::{DrawItem, DrawList};
pub use gpu_init::GpuContext;
pub use render::RenderState;
