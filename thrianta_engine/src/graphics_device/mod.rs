/// Graphics device module - backend trait and the API-agnostic policy types

pub mod graphics_device;
pub mod config;
pub mod swapchain;
pub mod command_buffer;
pub mod buffer;
pub mod memory;
pub mod device_selector;

pub use graphics_device::*;
pub use config::*;
pub use swapchain::*;
pub use command_buffer::*;
pub use buffer::*;
pub use memory::*;
pub use device_selector::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
