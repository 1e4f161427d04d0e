/// CommandBuffer - a primary Vulkan command buffer with a tracked lifecycle
///
/// The handle is only ever touched through these methods so the recorded
/// `CommandBufferState` always matches what the driver sees.

use std::sync::MutexGuard;

use ash::vk;

use thrianta_engine::thrianta::render::CommandBufferState;
use thrianta_engine::thrianta::{Error, Result};
use thrianta_engine::engine_err;

use crate::vulkan_context::GpuContext;

const SOURCE: &str = "thrianta::vulkan";

/// Usage hints passed to `vkBeginCommandBuffer`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeginFlags {
    pub single_use: bool,
    pub render_pass_continue: bool,
    pub simultaneous_use: bool,
}

impl BeginFlags {
    pub fn to_vk(self) -> vk::CommandBufferUsageFlags {
        let mut flags = vk::CommandBufferUsageFlags::empty();
        if self.single_use {
            flags |= vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT;
        }
        if self.render_pass_continue {
            flags |= vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE;
        }
        if self.simultaneous_use {
            flags |= vk::CommandBufferUsageFlags::SIMULTANEOUS_USE;
        }
        flags
    }
}

#[derive(Debug)]
pub struct CommandBuffer {
    handle: vk::CommandBuffer,
    state: CommandBufferState,
}

impl CommandBuffer {
    /// Allocate `count` primary command buffers from `pool`
    pub fn allocate(device: &ash::Device, pool: vk::CommandPool, count: u32) -> Result<Vec<CommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let handles = unsafe { device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| engine_err!(SOURCE, "Failed to allocate {} command buffers: {:?}", count, e))?;

        Ok(handles
            .into_iter()
            .map(|handle| CommandBuffer { handle, state: CommandBufferState::Ready })
            .collect())
    }

    /// Return every buffer to `pool`
    pub fn free_all(device: &ash::Device, pool: vk::CommandPool, buffers: &mut Vec<CommandBuffer>) {
        if buffers.is_empty() {
            return;
        }
        let handles: Vec<vk::CommandBuffer> = buffers.drain(..).map(|cb| cb.handle).collect();
        unsafe {
            device.free_command_buffers(pool, &handles);
        }
    }

    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    pub fn state(&self) -> CommandBufferState {
        self.state
    }

    /// Move to `next`, failing on an illegal transition
    pub fn set_state(&mut self, next: CommandBufferState) -> Result<()> {
        self.state = self.state.transition(next)?;
        Ok(())
    }

    pub fn begin(&mut self, device: &ash::Device, flags: BeginFlags) -> Result<()> {
        let next = self.state.transition(CommandBufferState::Recording)?;
        let begin_info = vk::CommandBufferBeginInfo::default().flags(flags.to_vk());
        unsafe { device.begin_command_buffer(self.handle, &begin_info) }
            .map_err(|e| engine_err!(SOURCE, "Failed to begin command buffer: {:?}", e))?;
        self.state = next;
        Ok(())
    }

    pub fn end(&mut self, device: &ash::Device) -> Result<()> {
        let next = self.state.transition(CommandBufferState::RecordingEnded)?;
        unsafe { device.end_command_buffer(self.handle) }
            .map_err(|e| engine_err!(SOURCE, "Failed to end command buffer: {:?}", e))?;
        self.state = next;
        Ok(())
    }

    pub fn reset(&mut self, device: &ash::Device) -> Result<()> {
        let next = self.state.transition(CommandBufferState::Ready)?;
        unsafe { device.reset_command_buffer(self.handle, vk::CommandBufferResetFlags::empty()) }
            .map_err(|e| engine_err!(SOURCE, "Failed to reset command buffer: {:?}", e))?;
        self.state = next;
        Ok(())
    }

    /// Ensure the buffer is in a recordable state; fails if it is still
    /// recording
    pub fn ensure_ready(&mut self, device: &ash::Device) -> Result<()> {
        match self.state {
            CommandBufferState::Ready => Ok(()),
            CommandBufferState::RecordingEnded | CommandBufferState::Submitted => self.reset(device),
            state => Err(Error::InvalidState(format!("Command buffer cannot be reset while {:?}", state))),
        }
    }
}

/// A one-shot command buffer from the upload pool
///
/// Holds the pool lock from allocation until the buffer is freed, so the
/// pool and the graphics queue are never used by two uploads at once.
pub struct SingleUseCommands<'a> {
    ctx: &'a GpuContext,
    pool: MutexGuard<'a, vk::CommandPool>,
    command_buffers: Vec<CommandBuffer>,
}

impl SingleUseCommands<'_> {
    pub fn handle(&self) -> vk::CommandBuffer {
        self.command_buffers
            .first()
            .map_or(vk::CommandBuffer::null(), CommandBuffer::handle)
    }

    /// End the buffer, submit it on the graphics queue and wait for the
    /// queue to drain; the buffer is freed when `self` drops
    pub fn submit(mut self) -> Result<()> {
        let ctx = self.ctx;
        let command_buffer = self
            .command_buffers
            .first_mut()
            .ok_or_else(|| engine_err!(SOURCE, "One-shot command buffer already freed"))?;
        command_buffer.end(&ctx.device)?;

        let command_buffers = [command_buffer.handle()];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        unsafe {
            ctx.device
                .queue_submit(ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!(SOURCE, "Failed to submit one-shot commands: {:?}", e))?;
            ctx.device
                .queue_wait_idle(ctx.graphics_queue)
                .map_err(|e| engine_err!(SOURCE, "Failed to wait for one-shot commands: {:?}", e))?;
        }
        command_buffer.set_state(CommandBufferState::Submitted)
    }
}

impl Drop for SingleUseCommands<'_> {
    fn drop(&mut self) {
        CommandBuffer::free_all(&self.ctx.device, *self.pool, &mut self.command_buffers);
    }
}

/// Lock the upload pool, allocate a one-shot command buffer and begin it
pub fn begin_single_use(ctx: &GpuContext) -> Result<SingleUseCommands<'_>> {
    let pool = ctx.lock_upload_pool()?;
    let command_buffers = CommandBuffer::allocate(&ctx.device, *pool, 1)?;
    let mut commands = SingleUseCommands { ctx, pool, command_buffers };

    let command_buffer = commands
        .command_buffers
        .first_mut()
        .ok_or_else(|| engine_err!(SOURCE, "Driver returned no command buffer"))?;
    command_buffer.begin(&ctx.device, BeginFlags { single_use: true, ..Default::default() })?;
    Ok(commands)
}

#[cfg(test)]
#[path = "vulkan_command_buffer_tests.rs"]
mod tests;
