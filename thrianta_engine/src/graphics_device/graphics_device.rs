/// GraphicsDevice trait - the backend half of the renderer
///
/// A backend owns the GPU objects (swapchain, render pass, framebuffers,
/// per-image command buffers, fences, semaphores). The frame orchestrator
/// (`Renderer`) drives it through this trait and owns all ordering decisions:
/// which fence to wait on, when to reset it, when to recreate the swapchain.

use std::sync::Arc;

use slotmap::new_key_type;

use crate::error::Result;
use crate::graphics_device::{
    AcquireOutcome, Buffer, BufferDesc, ClearValues, CommandBufferState, PresentOutcome, Rect2D,
    SwapchainInfo, Viewport,
};

new_key_type! {
    /// Handle to a fence owned by the backend
    pub struct FenceKey;
    /// Handle to a binary semaphore owned by the backend
    pub struct SemaphoreKey;
}

/// Result of a bounded fence wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    Signaled,
    /// The timeout elapsed before the fence signaled
    Timeout,
}

/// Backend interface driven by the frame orchestrator
///
/// Command buffers are addressed by swapchain image index: there is exactly
/// one per image, and they are freed and reallocated by `recreate_swapchain`.
pub trait GraphicsDevice {
    /// Extent, image count and frames-in-flight of the current swapchain
    fn swapchain_info(&self) -> SwapchainInfo;

    // ===== FENCES / SEMAPHORES =====

    fn create_fence(&mut self, signaled: bool) -> Result<FenceKey>;

    fn destroy_fence(&mut self, fence: FenceKey);

    /// Block until the fence signals or `timeout_ns` elapses
    ///
    /// Device loss and out-of-memory are returned as errors.
    fn wait_for_fence(&mut self, fence: FenceKey, timeout_ns: u64) -> Result<FenceStatus>;

    fn reset_fence(&mut self, fence: FenceKey) -> Result<()>;

    fn create_semaphore(&mut self) -> Result<SemaphoreKey>;

    fn destroy_semaphore(&mut self, semaphore: SemaphoreKey);

    // ===== SWAPCHAIN =====

    /// Acquire the next presentable image, signaling `signal` when it is ready
    fn acquire_next_image(&mut self, timeout_ns: u64, signal: SemaphoreKey) -> Result<AcquireOutcome>;

    /// Queue `image_index` for presentation once `wait` is signaled
    fn present(&mut self, wait: SemaphoreKey, image_index: u32) -> Result<PresentOutcome>;

    /// Destroy and rebuild the swapchain, depth attachment, framebuffers and
    /// command buffers for the given framebuffer size
    ///
    /// Callers must have waited for the device to be idle.
    fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<SwapchainInfo>;

    // ===== COMMAND RECORDING =====

    /// Reset and begin the command buffer of `image_index`
    fn begin_commands(&mut self, image_index: u32) -> Result<()>;

    fn set_viewport(&mut self, image_index: u32, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, image_index: u32, scissor: Rect2D) -> Result<()>;

    /// Begin the main render pass on the framebuffer of `image_index`
    fn begin_render_pass(&mut self, image_index: u32, area: Rect2D, clear: &ClearValues) -> Result<()>;

    fn end_render_pass(&mut self, image_index: u32) -> Result<()>;

    fn end_commands(&mut self, image_index: u32) -> Result<()>;

    fn command_buffer_state(&self, image_index: u32) -> CommandBufferState;

    /// Submit the command buffer of `image_index` to the graphics queue
    ///
    /// Waits on `wait` at the color-attachment-output stage, signals `signal`
    /// and `fence` on completion.
    fn submit(
        &mut self,
        image_index: u32,
        wait: SemaphoreKey,
        signal: SemaphoreKey,
        fence: FenceKey,
    ) -> Result<()>;

    // ===== DEVICE =====

    fn wait_idle(&self) -> Result<()>;

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;
}
