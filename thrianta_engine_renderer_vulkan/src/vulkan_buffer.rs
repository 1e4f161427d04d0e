/// VulkanBuffer - Vulkan implementation of the Buffer trait
///
/// Memory is allocated directly with `vkAllocateMemory` from the first
/// memory type that matches the buffer's requirements and the requested
/// properties. Host-visible buffers are written by mapping; device-local
/// buffers go through a temporary staging buffer and a one-shot copy.

use ash::vk;
use std::sync::{Arc, Mutex, MutexGuard};

use thrianta_engine::thrianta::render::{Buffer, BufferDesc, BufferUsage, MemoryPropertyFlags};
use thrianta_engine::thrianta::{Error, Result};
use thrianta_engine::{engine_err, engine_error, engine_trace};

use crate::vulkan_command_buffer::begin_single_use;
use crate::vulkan_context::GpuContext;

const SOURCE: &str = "thrianta::vulkan";

pub struct VulkanBuffer {
    ctx: Arc<GpuContext>,
    pub(crate) handle: vk::Buffer,
    memory: vk::DeviceMemory,
    memory_index: u32,
    size: u64,
    usage: BufferUsage,
    memory_flags: MemoryPropertyFlags,
    /// Serializes mapping; a memory object may only be mapped once at a time
    map_lock: Mutex<()>,
}

/// Mapped range of a buffer, unmapped on drop
pub struct MappedMemory<'a> {
    buffer: &'a VulkanBuffer,
    ptr: *mut u8,
    len: usize,
    _guard: MutexGuard<'a, ()>,
}

impl MappedMemory<'_> {
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl Drop for MappedMemory<'_> {
    fn drop(&mut self) {
        self.buffer.unlock_memory();
    }
}

fn create_handle(device: &ash::Device, size: u64, usage: BufferUsage) -> Result<(vk::Buffer, vk::MemoryRequirements)> {
    let create_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(vk::BufferUsageFlags::from_raw(usage.bits()))
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    unsafe {
        let handle = device.create_buffer(&create_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create buffer of size {} bytes: {:?}", size, e))?;
        let requirements = device.get_buffer_memory_requirements(handle);
        Ok((handle, requirements))
    }
}

fn allocate_memory(device: &ash::Device, size: u64, memory_index: u32) -> Result<vk::DeviceMemory> {
    let allocate_info = vk::MemoryAllocateInfo::default()
        .allocation_size(size)
        .memory_type_index(memory_index);

    unsafe { device.allocate_memory(&allocate_info, None) }.map_err(|e| {
        let size_mb = size as f64 / (1024.0 * 1024.0);
        engine_error!(SOURCE, "Buffer memory allocation failed ({:.2} MB): {:?}", size_mb, e);
        match e {
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => Error::OutOfMemory,
            _ => Error::BackendError(format!("Failed to allocate buffer memory: {:?}", e)),
        }
    })
}

fn check_range(offset: u64, len: u64, size: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::InvalidResource(format!(
            "Range {}..{} exceeds buffer size {}",
            offset,
            offset.saturating_add(len),
            size
        ))),
    }
}

impl VulkanBuffer {
    pub fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            return Err(Error::InvalidResource("Buffer size must be nonzero".to_string()));
        }

        let (handle, requirements) = create_handle(&ctx.device, desc.size, desc.usage)?;

        let memory_index = match ctx.memory_type_index(requirements.memory_type_bits, desc.memory) {
            Ok(index) => index,
            Err(e) => {
                unsafe { ctx.device.destroy_buffer(handle, None) };
                return Err(e);
            }
        };

        let memory = match allocate_memory(&ctx.device, requirements.size, memory_index) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { ctx.device.destroy_buffer(handle, None) };
                return Err(e);
            }
        };

        let buffer = Self {
            ctx,
            handle,
            memory,
            memory_index,
            size: desc.size,
            usage: desc.usage,
            memory_flags: desc.memory,
            map_lock: Mutex::new(()),
        };

        if desc.bind_on_create {
            buffer.bind(0)?;
        }

        engine_trace!(SOURCE, "Created buffer: {} bytes, {:?}, memory type {}", desc.size, desc.usage, memory_index);
        Ok(buffer)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn memory_flags(&self) -> MemoryPropertyFlags {
        self.memory_flags
    }

    pub fn bind(&self, offset: u64) -> Result<()> {
        unsafe { self.ctx.device.bind_buffer_memory(self.handle, self.memory, offset) }
            .map_err(|e| engine_err!(SOURCE, "Failed to bind buffer memory at offset {}: {:?}", offset, e))
    }

    /// Map `size` bytes at `offset`
    pub fn lock_memory(&self, offset: u64, size: u64) -> Result<MappedMemory<'_>> {
        if size == 0 {
            return Err(Error::InvalidResource("Cannot map an empty range".to_string()));
        }
        check_range(offset, size, self.size)?;
        let guard = self
            .map_lock
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Buffer map lock poisoned"))?;

        let ptr = unsafe {
            self.ctx
                .device
                .map_memory(self.memory, offset, size, vk::MemoryMapFlags::empty())
                .map_err(|e| engine_err!(SOURCE, "Failed to map buffer memory: {:?}", e))?
        };

        Ok(MappedMemory {
            buffer: self,
            ptr: ptr as *mut u8,
            len: size as usize,
            _guard: guard,
        })
    }

    fn unlock_memory(&self) {
        unsafe {
            self.ctx.device.unmap_memory(self.memory);
        }
    }

    /// Map, copy `data` to `offset`, unmap
    pub fn load_data(&self, offset: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut mapped = self.lock_memory(offset, data.len() as u64)?;
        mapped.as_mut_slice().copy_from_slice(data);
        Ok(())
    }

    /// Copy `size` bytes to `dest` with a one-shot command on the graphics
    /// queue, blocking until it completes
    pub fn copy_to(&self, src_offset: u64, dest: &VulkanBuffer, dest_offset: u64, size: u64) -> Result<()> {
        check_range(src_offset, size, self.size)?;
        check_range(dest_offset, size, dest.size)?;
        copy_buffer(&self.ctx, self.handle, src_offset, dest.handle, dest_offset, size)
    }

    /// Write through a temporary host-visible staging buffer
    pub fn upload_via_staging(&self, offset: u64, data: &[u8]) -> Result<()> {
        let staging = VulkanBuffer::new(Arc::clone(&self.ctx), &BufferDesc::staging(data.len() as u64))?;
        staging.load_data(0, data)?;
        staging.copy_to(0, self, offset, data.len() as u64)
    }

    /// Memory type the buffer's memory was allocated from
    pub fn memory_type_index(&self) -> u32 {
        self.memory_index
    }

    /// Memory types the driver allows for the current buffer handle
    pub fn memory_type_bits(&self) -> u32 {
        unsafe { self.ctx.device.get_buffer_memory_requirements(self.handle) }.memory_type_bits
    }

    /// Replace the buffer with a larger one, keeping the old contents
    pub fn resize(&mut self, new_size: u64) -> Result<()> {
        if new_size < self.size {
            return Err(Error::InvalidResource(format!(
                "Cannot shrink buffer from {} to {} bytes",
                self.size, new_size
            )));
        }

        let device = &self.ctx.device;
        let (handle, requirements) = create_handle(device, new_size, self.usage)?;
        let memory_index = match self.ctx.memory_type_index(requirements.memory_type_bits, self.memory_flags) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_buffer(handle, None) };
                return Err(e);
            }
        };
        let memory = match allocate_memory(device, requirements.size, memory_index) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(handle, None) };
                return Err(e);
            }
        };

        let copied = unsafe { device.bind_buffer_memory(handle, memory, 0) }
            .map_err(|e| engine_err!(SOURCE, "Failed to bind resized buffer memory: {:?}", e))
            .and_then(|_| copy_buffer(&self.ctx, self.handle, 0, handle, 0, self.size))
            .and_then(|_| {
                unsafe { device.device_wait_idle() }
                    .map_err(|e| engine_err!(SOURCE, "Failed to wait idle during buffer resize: {:?}", e))
            });

        if let Err(e) = copied {
            unsafe {
                device.free_memory(memory, None);
                device.destroy_buffer(handle, None);
            }
            return Err(e);
        }

        unsafe {
            device.free_memory(self.memory, None);
            device.destroy_buffer(self.handle, None);
        }
        engine_trace!(SOURCE, "Resized buffer {} -> {} bytes", self.size, new_size);
        self.handle = handle;
        self.memory = memory;
        self.memory_index = memory_index;
        self.size = new_size;
        Ok(())
    }
}

fn copy_buffer(
    ctx: &GpuContext,
    source: vk::Buffer,
    src_offset: u64,
    dest: vk::Buffer,
    dest_offset: u64,
    size: u64,
) -> Result<()> {
    let commands = begin_single_use(ctx)?;
    unsafe { ctx.device.queue_wait_idle(ctx.graphics_queue) }
        .map_err(|e| engine_err!(SOURCE, "Failed to wait for graphics queue before copy: {:?}", e))?;

    let region = vk::BufferCopy {
        src_offset,
        dst_offset: dest_offset,
        size,
    };
    unsafe {
        ctx.device.cmd_copy_buffer(commands.handle(), source, dest, &[region]);
    }
    commands.submit()
}

impl Buffer for VulkanBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_range(offset, data.len() as u64, self.size)?;
        if data.is_empty() {
            return Ok(());
        }
        if self.memory_flags.contains(MemoryPropertyFlags::HOST_VISIBLE) {
            self.load_data(offset, data)
        } else {
            self.upload_via_staging(offset, data)
        }
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_buffer(self.handle, None);
            self.ctx.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_buffer_tests.rs"]
mod tests;
