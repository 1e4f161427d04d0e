/// Physical device queries and logical device creation
///
/// Each physical device is described as an `AdapterInfo` for the selection
/// policy in the core crate; the winner gets a logical device with one queue
/// per distinct family.

use ash::vk;
use std::ffi::{CStr, CString};

use thrianta_engine::thrianta::render::{
    AdapterInfo, AdapterType, DeviceRequirements, MemoryHeapInfo, QueueCapabilities,
    QueueFamilyInfo, SelectedAdapter,
};
use thrianta_engine::thrianta::{Error, Result};
use thrianta_engine::{engine_debug, engine_err, engine_error, engine_info};

const SOURCE: &str = "thrianta::vulkan";

/// Depth formats in order of preference
pub(crate) const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Surface capabilities, formats and present modes of one adapter
#[derive(Debug, Clone, Default)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    pub fn query(
        surface_loader: &ash::khr::surface::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        unsafe {
            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| engine_err!(SOURCE, "Failed to get surface capabilities: {:?}", e))?;
            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| engine_err!(SOURCE, "Failed to get surface formats: {:?}", e))?;
            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| engine_err!(SOURCE, "Failed to get surface present modes: {:?}", e))?;

            Ok(Self { capabilities, formats, present_modes })
        }
    }
}

pub(crate) fn adapter_type(device_type: vk::PhysicalDeviceType) -> AdapterType {
    match device_type {
        vk::PhysicalDeviceType::INTEGRATED_GPU => AdapterType::IntegratedGpu,
        vk::PhysicalDeviceType::DISCRETE_GPU => AdapterType::DiscreteGpu,
        vk::PhysicalDeviceType::VIRTUAL_GPU => AdapterType::VirtualGpu,
        vk::PhysicalDeviceType::CPU => AdapterType::Cpu,
        _ => AdapterType::Other,
    }
}

pub(crate) fn queue_capabilities(flags: vk::QueueFlags, present: bool) -> QueueCapabilities {
    let mut capabilities = QueueCapabilities::empty();
    if flags.contains(vk::QueueFlags::GRAPHICS) {
        capabilities |= QueueCapabilities::GRAPHICS;
    }
    if flags.contains(vk::QueueFlags::COMPUTE) {
        capabilities |= QueueCapabilities::COMPUTE;
    }
    if flags.contains(vk::QueueFlags::TRANSFER) {
        capabilities |= QueueCapabilities::TRANSFER;
    }
    if present {
        capabilities |= QueueCapabilities::PRESENT;
    }
    capabilities
}

pub(crate) fn version_triple(version: u32) -> (u32, u32, u32) {
    (
        vk::api_version_major(version),
        vk::api_version_minor(version),
        vk::api_version_patch(version),
    )
}

pub(crate) fn memory_heaps(properties: &vk::PhysicalDeviceMemoryProperties) -> Vec<MemoryHeapInfo> {
    let count = (properties.memory_heap_count as usize).min(vk::MAX_MEMORY_HEAPS);
    properties.memory_heaps[..count]
        .iter()
        .map(|heap| MemoryHeapInfo {
            size: heap.size,
            device_local: heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL),
        })
        .collect()
}

fn c_str_to_string(name: std::result::Result<&CStr, std::ffi::FromBytesUntilNulError>) -> String {
    name.map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<invalid name>".to_string())
}

/// Describe one physical device against the target surface
pub fn query_adapter(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Result<AdapterInfo> {
    unsafe {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);
        let memory = instance.get_physical_device_memory_properties(physical_device);

        let queue_families = instance
            .get_physical_device_queue_family_properties(physical_device)
            .iter()
            .enumerate()
            .map(|(index, family)| {
                let present = surface_loader
                    .get_physical_device_surface_support(physical_device, index as u32, surface)
                    .map_err(|e| engine_err!(SOURCE, "Failed to query present support: {:?}", e))?;
                Ok(QueueFamilyInfo {
                    capabilities: queue_capabilities(family.queue_flags, present),
                    queue_count: family.queue_count,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let extensions = instance
            .enumerate_device_extension_properties(physical_device)
            .map_err(|e| engine_err!(SOURCE, "Failed to enumerate device extensions: {:?}", e))?
            .iter()
            .map(|ext| c_str_to_string(ext.extension_name_as_c_str()))
            .collect();

        let support = SwapchainSupport::query(surface_loader, physical_device, surface)?;

        Ok(AdapterInfo {
            name: c_str_to_string(properties.device_name_as_c_str()),
            adapter_type: adapter_type(properties.device_type),
            driver_version: version_triple(properties.driver_version),
            api_version: version_triple(properties.api_version),
            queue_families,
            extensions,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
            surface_format_count: support.formats.len(),
            present_mode_count: support.present_modes.len(),
            memory_heaps: memory_heaps(&memory),
        })
    }
}

/// First candidate usable as a depth-stencil attachment with linear or
/// optimal tiling
pub fn choose_depth_format<F>(format_properties: F) -> Option<vk::Format>
where
    F: Fn(vk::Format) -> vk::FormatProperties,
{
    let flags = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
    DEPTH_FORMAT_CANDIDATES.into_iter().find(|&format| {
        let properties = format_properties(format);
        properties.linear_tiling_features.contains(flags)
            || properties.optimal_tiling_features.contains(flags)
    })
}

pub fn detect_depth_format(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Result<vk::Format> {
    choose_depth_format(|format| unsafe {
        instance.get_physical_device_format_properties(physical_device, format)
    })
    .ok_or_else(|| {
        engine_error!(SOURCE, "Failed to find a supported depth format");
        Error::InitializationFailed("No supported depth format".to_string())
    })
}

/// Logical device and the queues fetched at index 0 of each family
pub struct LogicalDevice {
    pub device: ash::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub transfer_queue: vk::Queue,
}

pub fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    selected: &SelectedAdapter,
    requirements: &DeviceRequirements,
) -> Result<LogicalDevice> {
    let queue_priorities = [1.0];
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = selected
        .unique_families()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities)
        })
        .collect();

    let extension_names = requirements
        .device_extensions
        .iter()
        .map(|name| {
            CString::new(name.as_str()).map_err(|_| {
                Error::InvalidResource(format!("Device extension name '{}' contains a NUL byte", name))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let extension_ptrs: Vec<*const std::os::raw::c_char> =
        extension_names.iter().map(|name| name.as_ptr()).collect();

    let device_features = vk::PhysicalDeviceFeatures::default()
        .sampler_anisotropy(requirements.sampler_anisotropy);

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_ptrs)
        .enabled_features(&device_features);

    unsafe {
        let device = instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })?;

        let graphics_queue = device.get_device_queue(selected.graphics_family, 0);
        let present_queue = device.get_device_queue(selected.present_family, 0);
        let transfer_queue = device.get_device_queue(selected.transfer_family, 0);

        engine_info!(
            SOURCE,
            "Logical device created with {} queue famil{}",
            queue_create_infos.len(),
            if queue_create_infos.len() == 1 { "y" } else { "ies" }
        );
        engine_debug!(SOURCE, "Queues obtained");

        Ok(LogicalDevice { device, graphics_queue, present_queue, transfer_queue })
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
