/// Renderer module - frame orchestration and synchronization

pub mod frame_sync;
pub mod framebuffer_size;
pub mod renderer;

pub use frame_sync::*;
pub use framebuffer_size::*;
pub use renderer::*;
