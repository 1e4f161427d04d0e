/*!
# Thrianta Engine

Core traits and types for the Thrianta real-time 3D engine.

This crate provides the API-agnostic half of the renderer: the frame
orchestrator and the fence/semaphore bookkeeping that keeps the CPU, the GPU
queue and the presentation engine ordered. Backends (Vulkan today) implement
the [`GraphicsDevice`](crate::graphics_device::GraphicsDevice) trait and are
handed to a [`Renderer`](crate::renderer::Renderer) that owns them.

## Architecture

- **GraphicsDevice**: backend trait (swapchain, command buffers, fences, semaphores, buffers)
- **Renderer**: frame orchestrator (begin/end frame, resize, swapchain recreation)
- **FrameSync**: per-frame-in-flight fences and semaphores + image-in-flight table
- **EventBus**: synchronous event dispatch (resize, input, quit)
- **InputState**: keyboard and mouse state that fires input events on change
- **Engine**: global logger registry
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod clock;
pub mod event;
pub mod input;
pub mod graphics_device;
pub mod renderer;

// Main thrianta namespace module
pub mod thrianta {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine (logger registry)
    pub use crate::engine::Engine;

    // Backend trait and frame orchestrator
    pub use crate::graphics_device::GraphicsDevice;
    pub use crate::renderer::Renderer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::graphics_device::*;
        pub use crate::renderer::*;
    }

    // Event sub-module
    pub mod event {
        pub use crate::event::*;
    }

    // Input sub-module
    pub mod input {
        pub use crate::input::*;
    }

    pub use crate::clock::Clock;
}

// Re-export math library at crate root
pub use glam;
