/// Buffer trait and buffer descriptor

use bitflags::bitflags;
use bytemuck::Pod;

use crate::error::Result;
use crate::graphics_device::MemoryPropertyFlags;

bitflags! {
    /// Buffer usage flags (same bit values as `VkBufferUsageFlagBits`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 0x0000_0001;
        const TRANSFER_DST = 0x0000_0002;
        const UNIFORM = 0x0000_0010;
        const STORAGE = 0x0000_0020;
        const INDEX = 0x0000_0040;
        const VERTEX = 0x0000_0080;
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    pub usage: BufferUsage,
    /// Required memory properties
    pub memory: MemoryPropertyFlags,
    /// Bind the memory at offset 0 right after allocation
    pub bind_on_create: bool,
}

impl BufferDesc {
    /// Device-local vertex buffer filled through the staging path
    pub fn vertex(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::VERTEX | BufferUsage::TRANSFER_DST | BufferUsage::TRANSFER_SRC,
            memory: MemoryPropertyFlags::DEVICE_LOCAL,
            bind_on_create: true,
        }
    }

    /// Device-local index buffer filled through the staging path
    pub fn index(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::INDEX | BufferUsage::TRANSFER_DST | BufferUsage::TRANSFER_SRC,
            memory: MemoryPropertyFlags::DEVICE_LOCAL,
            bind_on_create: true,
        }
    }

    /// Host-visible staging buffer
    pub fn staging(size: u64) -> Self {
        Self {
            size,
            usage: BufferUsage::TRANSFER_SRC,
            memory: MemoryPropertyFlags::HOST_VISIBLE_COHERENT,
            bind_on_create: true,
        }
    }
}

/// GPU buffer
pub trait Buffer: Send + Sync {
    fn size(&self) -> u64;

    /// Write `data` at `offset`
    ///
    /// Host-visible buffers are mapped directly, device-local buffers are
    /// filled through a staging buffer.
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;
}

/// Write a slice of plain-old-data values into a buffer
pub fn upload_slice<T: Pod>(buffer: &dyn Buffer, offset: u64, data: &[T]) -> Result<()> {
    buffer.update(offset, bytemuck::cast_slice(data))
}
