/*!
# Thrianta Engine - Vulkan Backend

Vulkan implementation of the Thrianta [`GraphicsDevice`] trait, built on
`ash` for the bindings and `gpu-allocator` for image memory.

[`VulkanGraphicsDevice`] is created against a window, then handed to the
core [`Renderer`] which drives frames through the trait.

```no_run
use thrianta_engine::thrianta::Renderer;
use thrianta_engine::thrianta::render::RendererConfig;
use thrianta_engine_renderer_vulkan::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window) -> thrianta_engine::thrianta::Result<()> {
let config = RendererConfig::default();
let size = window.inner_size();
let device = VulkanGraphicsDevice::new(window, &config, size.width, size.height)?;
let _renderer = Renderer::new(Box::new(device), &config)?;
# Ok(())
# }
```

[`GraphicsDevice`]: thrianta_engine::thrianta::GraphicsDevice
[`Renderer`]: thrianta_engine::thrianta::Renderer
*/

mod vulkan;
mod vulkan_context;
mod vulkan_device;
mod vulkan_swapchain;
mod vulkan_render_pass;
mod vulkan_frame_buffer;
mod vulkan_command_buffer;
mod vulkan_buffer;
mod vulkan_shader;
mod debug;

pub use vulkan::VulkanGraphicsDevice;
pub use vulkan_context::GpuContext;
pub use vulkan_buffer::{MappedMemory, VulkanBuffer};
pub use vulkan_shader::{ShaderModule, ShaderStage, SHADER_DIRECTORY};

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};
