/// Frame orchestrator
///
/// Drives a [`GraphicsDevice`] through the frame lifecycle:
///
/// ```text
/// Idle --begin_frame--> Recording --end_frame--> Presenting --> Idle
/// ```
///
/// `begin_frame` waits on the current slot fence, acquires an image and
/// starts the main render pass. `end_frame` submits and presents, then
/// advances the frame slot. Swapchain recreation (resize, out-of-date or
/// suboptimal swapchain) happens here, between frames, never inside the
/// backend.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireOutcome, Buffer, BufferDesc, ClearValues, FenceStatus, GraphicsDevice, Rect2D,
    RendererConfig, SwapchainInfo, Viewport,
};
use crate::renderer::{FrameSync, FramebufferSize};
use crate::{engine_debug, engine_error, engine_info, engine_trace};

const SOURCE: &str = "thrianta::Renderer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Recording,
    Presenting,
}

/// Why `begin_frame` did not produce a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A previous recreation did not complete
    RecreationInProgress,
    /// The framebuffer size changed and the swapchain was rebuilt
    Resized,
    /// The framebuffer has a zero dimension
    Minimized,
    /// Acquisition reported an out-of-date swapchain
    SwapchainOutOfDate,
    /// The slot fence did not signal within the configured timeout
    FenceTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Recording has begun; `end_frame` must follow
    Ready,
    Skipped(SkipReason),
}

impl FrameStatus {
    pub fn is_ready(self) -> bool {
        self == FrameStatus::Ready
    }
}

/// Per-frame input from the application
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderPacket {
    /// Seconds since the previous frame
    pub delta_time: f32,
}

pub struct Renderer {
    device: Box<dyn GraphicsDevice>,
    sync: FrameSync,
    swapchain: SwapchainInfo,
    framebuffer_size: FramebufferSize,
    /// Size generation the current swapchain was built for
    applied_generation: u64,
    state: FrameState,
    current_frame: usize,
    image_index: u32,
    recreating_swapchain: bool,
    clear_values: ClearValues,
    fence_timeout_ns: u64,
    frame_number: u64,
}

impl Renderer {
    /// Take ownership of a backend whose swapchain is already created
    pub fn new(mut device: Box<dyn GraphicsDevice>, config: &RendererConfig) -> Result<Self> {
        let swapchain = device.swapchain_info();
        let sync = FrameSync::new(
            device.as_mut(),
            swapchain.max_frames_in_flight as usize,
            swapchain.image_count as usize,
        )?;
        let framebuffer_size = FramebufferSize::new(swapchain.width, swapchain.height);

        engine_info!(
            SOURCE,
            "Renderer ready: {}x{}, {} images, {} frames in flight",
            swapchain.width, swapchain.height, swapchain.image_count, swapchain.max_frames_in_flight
        );

        Ok(Self {
            device,
            sync,
            swapchain,
            applied_generation: framebuffer_size.generation(),
            framebuffer_size,
            state: FrameState::Idle,
            current_frame: 0,
            image_index: 0,
            recreating_swapchain: false,
            clear_values: config.clear_values(),
            fence_timeout_ns: config.fence_timeout_ns,
            frame_number: 0,
        })
    }

    // ===== ACCESSORS =====

    pub fn frame_state(&self) -> FrameState {
        self.state
    }

    /// Frame-in-flight slot used by the next (or current) frame
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Swapchain image acquired by the current frame
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn swapchain_info(&self) -> SwapchainInfo {
        self.swapchain
    }

    pub fn is_recreating_swapchain(&self) -> bool {
        self.recreating_swapchain
    }

    /// Shared size handle, for event listeners
    pub fn framebuffer_size(&self) -> FramebufferSize {
        self.framebuffer_size.clone()
    }

    pub fn frame_sync(&self) -> &FrameSync {
        &self.sync
    }

    /// Backend access for recording draw commands between begin and end
    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    pub fn set_clear_values(&mut self, clear_values: ClearValues) {
        self.clear_values = clear_values;
    }

    pub fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        self.device.create_buffer(desc)
    }

    // ===== FRAME LIFECYCLE =====

    /// Record a new framebuffer size; takes effect at the next `begin_frame`
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if self.framebuffer_size.set(width, height) {
            engine_debug!(SOURCE, "Framebuffer resized to {}x{}", width, height);
        }
    }

    /// Prepare the next frame for recording
    pub fn begin_frame(&mut self, delta_time: f32) -> Result<FrameStatus> {
        if self.state != FrameState::Idle {
            return Err(Error::InvalidState(format!(
                "begin_frame called in state {:?}",
                self.state
            )));
        }

        if self.recreating_swapchain {
            self.device.wait_idle()?;
            engine_info!(SOURCE, "Swapchain recreation in progress, skipping frame");
            return Ok(FrameStatus::Skipped(SkipReason::RecreationInProgress));
        }

        if self.framebuffer_size.generation() != self.applied_generation {
            self.device.wait_idle()?;
            let status = if self.recreate_swapchain()? {
                SkipReason::Resized
            } else {
                SkipReason::Minimized
            };
            return Ok(FrameStatus::Skipped(status));
        }

        let slot = self.current_frame;
        if self.sync.wait_for_slot(self.device.as_mut(), slot, self.fence_timeout_ns)? == FenceStatus::Timeout {
            return Ok(FrameStatus::Skipped(SkipReason::FenceTimeout));
        }

        let image_available = self.sync.image_available(slot)?;
        let image_index = match self.device.acquire_next_image(self.fence_timeout_ns, image_available)? {
            AcquireOutcome::Acquired { image_index, .. } => image_index,
            AcquireOutcome::OutOfDate => {
                engine_debug!(SOURCE, "Swapchain out of date on acquire");
                self.recreate_swapchain()?;
                return Ok(FrameStatus::Skipped(SkipReason::SwapchainOutOfDate));
            }
        };

        // The command buffer of this image may still belong to another slot's
        // submission; it must be complete before the buffer is reset.
        if self.sync.image_owner(image_index).is_some_and(|owner| owner != slot)
            && self.sync.wait_for_image(self.device.as_mut(), image_index, self.fence_timeout_ns)?
                == FenceStatus::Timeout
        {
            return Err(image_fence_timeout(image_index));
        }

        let (width, height) = (self.swapchain.width, self.swapchain.height);
        let area = Rect2D::from_extent(width, height);
        self.device.begin_commands(image_index)?;
        self.device.set_viewport(image_index, Viewport::flipped(width, height))?;
        self.device.set_scissor(image_index, area)?;
        self.device.begin_render_pass(image_index, area, &self.clear_values)?;

        self.image_index = image_index;
        self.state = FrameState::Recording;
        engine_trace!(
            SOURCE,
            "Frame {} began on slot {} image {} (dt {:.4}s)",
            self.frame_number, slot, image_index, delta_time
        );
        Ok(FrameStatus::Ready)
    }

    /// Submit the recorded frame and present it
    pub fn end_frame(&mut self, _delta_time: f32) -> Result<()> {
        if self.state != FrameState::Recording {
            return Err(Error::InvalidState(format!(
                "end_frame called in state {:?}",
                self.state
            )));
        }

        let slot = self.current_frame;
        let image_index = self.image_index;

        self.device.end_render_pass(image_index)?;
        self.device.end_commands(image_index)?;

        if self.sync.wait_for_image(self.device.as_mut(), image_index, self.fence_timeout_ns)?
            == FenceStatus::Timeout
        {
            return Err(image_fence_timeout(image_index));
        }
        self.sync.assign_image(self.device.as_mut(), image_index, slot)?;

        let image_available = self.sync.image_available(slot)?;
        let queue_complete = self.sync.queue_complete(slot)?;
        let fence = self.sync.fence(slot)?;
        self.device
            .submit(image_index, image_available, queue_complete, fence)
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to submit frame {}: {}", self.frame_number, e);
                e
            })?;

        self.state = FrameState::Presenting;
        let outcome = self.device.present(queue_complete, image_index).map_err(|e| {
            engine_error!(SOURCE, "Failed to present swapchain image {}: {}", image_index, e);
            e
        })?;

        self.current_frame = (self.current_frame + 1) % self.sync.slot_count();
        self.state = FrameState::Idle;
        self.frame_number += 1;

        if outcome.needs_recreation() {
            engine_debug!(SOURCE, "Present reported {:?}", outcome);
            self.recreate_swapchain()?;
        }
        Ok(())
    }

    /// Begin and, when the frame is ready, end a frame
    ///
    /// Returns whether a frame was presented.
    pub fn draw_frame(&mut self, packet: &RenderPacket) -> Result<bool> {
        if !self.begin_frame(packet.delta_time)?.is_ready() {
            return Ok(false);
        }
        self.end_frame(packet.delta_time).map_err(|e| {
            engine_error!(SOURCE, "end_frame failed, application shutting down: {}", e);
            e
        })?;
        Ok(true)
    }

    /// Destroy and rebuild the swapchain for the current framebuffer size
    ///
    /// Returns `Ok(false)` without touching anything when the framebuffer
    /// has a zero dimension or a recreation is already running. Only valid
    /// between frames.
    pub fn recreate_swapchain(&mut self) -> Result<bool> {
        if self.state != FrameState::Idle {
            return Err(Error::InvalidState(format!(
                "recreate_swapchain called in state {:?}",
                self.state
            )));
        }

        if self.recreating_swapchain {
            engine_debug!(SOURCE, "recreate_swapchain called while already recreating");
            return Ok(false);
        }

        let generation = self.framebuffer_size.generation();
        let (width, height) = self.framebuffer_size.get();
        if width == 0 || height == 0 {
            engine_debug!(SOURCE, "Framebuffer is {}x{}, not recreating", width, height);
            return Ok(false);
        }

        self.recreating_swapchain = true;

        self.device.wait_idle()?;
        self.sync.mark_all_signaled();
        self.sync.reset_images(self.swapchain.image_count as usize);

        let info = self.device.recreate_swapchain(width, height)?;

        if info.max_frames_in_flight != self.swapchain.max_frames_in_flight {
            self.sync.destroy(self.device.as_mut());
            self.sync = FrameSync::new(
                self.device.as_mut(),
                info.max_frames_in_flight as usize,
                info.image_count as usize,
            )?;
            self.current_frame = 0;
        } else {
            self.sync.reset_images(info.image_count as usize);
        }

        self.swapchain = info;
        self.applied_generation = generation;
        self.recreating_swapchain = false;

        engine_info!(
            SOURCE,
            "Swapchain recreated: {}x{}, {} images",
            info.width, info.height, info.image_count
        );
        Ok(true)
    }

    /// Wait for the GPU and release the sync objects
    ///
    /// Also runs on drop; calling it twice is harmless.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.sync.slot_count() == 0 {
            return Ok(());
        }
        self.device.wait_idle()?;
        self.sync.destroy(self.device.as_mut());
        engine_info!(SOURCE, "Renderer shut down after {} frames", self.frame_number);
        Ok(())
    }
}

fn image_fence_timeout(image_index: u32) -> Error {
    crate::engine_err!(
        SOURCE,
        "Timed out waiting for swapchain image {} to leave the queue",
        image_index
    )
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            engine_error!(SOURCE, "Renderer shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
