/// GpuContext - device-level state shared by every Vulkan resource
///
/// Buffers, the depth attachment and one-shot upload commands all need the
/// device, the allocator, the graphics queue and the memory type table.
/// They hold an `Arc<GpuContext>` instead of copying those handles around.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};

use thrianta_engine::engine_err;
use thrianta_engine::thrianta::render::{find_memory_index, MemoryPropertyFlags};
use thrianta_engine::thrianta::Result;

pub struct GpuContext {
    pub device: ash::Device,

    /// Dropped by `VulkanGraphicsDevice` before the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,

    /// TRANSIENT | RESET_COMMAND_BUFFER pool for one-shot uploads. The lock
    /// also guards every submission to `graphics_queue`.
    pub upload_command_pool: Mutex<vk::CommandPool>,

    memory_types: Vec<MemoryPropertyFlags>,

    #[allow(dead_code)]
    instance: ash::Instance,

    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        instance: ash::Instance,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(allocator),
            graphics_queue,
            graphics_queue_family,
            upload_command_pool: Mutex::new(upload_command_pool),
            memory_types: memory_type_flags(memory_properties),
            instance,
            debug_utils_loader,
            debug_messenger,
        }
    }

    /// Exclusive access to the upload pool and the graphics queue
    pub fn lock_upload_pool(&self) -> Result<MutexGuard<'_, vk::CommandPool>> {
        self.upload_command_pool
            .lock()
            .map_err(|_| engine_err!("thrianta::vulkan", "Upload command pool lock poisoned"))
    }

    /// Index of the first memory type allowed by `type_filter` that has
    /// every `required` property
    pub fn memory_type_index(&self, type_filter: u32, required: MemoryPropertyFlags) -> Result<u32> {
        find_memory_index(type_filter, &self.memory_types, required).ok_or_else(|| {
            engine_err!(
                "thrianta::vulkan",
                "No memory type matches filter {:#x} with properties {:?}",
                type_filter, required
            )
        })
    }
}

/// Property flags of each memory type, in index order
pub(crate) fn memory_type_flags(properties: &vk::PhysicalDeviceMemoryProperties) -> Vec<MemoryPropertyFlags> {
    let count = (properties.memory_type_count as usize).min(vk::MAX_MEMORY_TYPES);
    properties.memory_types[..count]
        .iter()
        .map(|memory_type| MemoryPropertyFlags::from_bits_truncate(memory_type.property_flags.as_raw()))
        .collect()
}

// Device and instance destruction is handled by VulkanGraphicsDevice::drop()
impl Drop for GpuContext {
    fn drop(&mut self) {}
}
