/// Physical device selection policy
///
/// The backend describes each adapter as an [`AdapterInfo`]; this module
/// decides which one the renderer runs on and which queue families it uses.
/// Candidates are examined in enumeration order and the first one that meets
/// every requirement wins.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::{engine_debug, engine_error, engine_info};

bitflags! {
    /// Capabilities of a queue family
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct QueueCapabilities: u32 {
        const GRAPHICS = 0x1;
        const PRESENT = 0x2;
        const COMPUTE = 0x4;
        const TRANSFER = 0x8;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterType {
    Other,
    IntegratedGpu,
    DiscreteGpu,
    VirtualGpu,
    Cpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    /// Capability flags, with `PRESENT` set when the family can present to
    /// the target surface
    pub capabilities: QueueCapabilities,
    pub queue_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryHeapInfo {
    pub size: u64,
    pub device_local: bool,
}

/// Everything the selection policy needs to know about one adapter
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub adapter_type: AdapterType,
    pub driver_version: (u32, u32, u32),
    pub api_version: (u32, u32, u32),
    pub queue_families: Vec<QueueFamilyInfo>,
    /// Supported device extension names
    pub extensions: Vec<String>,
    pub sampler_anisotropy: bool,
    /// Number of surface formats available for the target surface
    pub surface_format_count: usize,
    /// Number of present modes available for the target surface
    pub present_mode_count: usize,
    pub memory_heaps: Vec<MemoryHeapInfo>,
}

/// What the renderer needs from an adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequirements {
    pub queues: QueueCapabilities,
    /// Device extensions that must all be present
    pub device_extensions: Vec<String>,
    pub sampler_anisotropy: bool,
    pub discrete_gpu: bool,
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            queues: QueueCapabilities::GRAPHICS
                | QueueCapabilities::PRESENT
                | QueueCapabilities::TRANSFER,
            device_extensions: vec!["VK_KHR_swapchain".to_string()],
            sampler_anisotropy: true,
            discrete_gpu: false,
        }
    }
}

/// Queue family indices resolved for one adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
    pub compute: Option<u32>,
    pub transfer: Option<u32>,
}

impl QueueFamilyIndices {
    /// Resolve queue families for an adapter
    ///
    /// - graphics: first graphics-capable family
    /// - present: the graphics family when it can present, else the first
    ///   presenting family
    /// - compute: first compute-capable family
    /// - transfer: the transfer-capable family with the fewest other
    ///   capabilities (graphics, compute); ties go to the later family
    pub fn resolve(families: &[QueueFamilyInfo]) -> Self {
        let mut indices = QueueFamilyIndices::default();
        let mut min_transfer_score = u32::MAX;

        for (index, family) in families.iter().enumerate() {
            let index = index as u32;
            let caps = family.capabilities;
            let mut score = 0;

            if caps.contains(QueueCapabilities::GRAPHICS) {
                indices.graphics.get_or_insert(index);
                score += 1;
            }
            if caps.contains(QueueCapabilities::COMPUTE) {
                indices.compute.get_or_insert(index);
                score += 1;
            }
            if caps.contains(QueueCapabilities::TRANSFER) && score <= min_transfer_score {
                min_transfer_score = score;
                indices.transfer = Some(index);
            }
            if caps.contains(QueueCapabilities::PRESENT) {
                indices.present.get_or_insert(index);
            }
        }

        if let Some(graphics) = indices.graphics {
            if families[graphics as usize].capabilities.contains(QueueCapabilities::PRESENT) {
                indices.present = Some(graphics);
            }
        }

        indices
    }

    /// Distinct families among graphics, present and transfer, in that order
    pub fn unique_families(&self) -> Vec<u32> {
        let mut unique = Vec::with_capacity(3);
        for family in [self.graphics, self.present, self.transfer].into_iter().flatten() {
            if !unique.contains(&family) {
                unique.push(family);
            }
        }
        unique
    }

    fn satisfies(&self, required: QueueCapabilities) -> bool {
        (!required.contains(QueueCapabilities::GRAPHICS) || self.graphics.is_some())
            && (!required.contains(QueueCapabilities::PRESENT) || self.present.is_some())
            && (!required.contains(QueueCapabilities::COMPUTE) || self.compute.is_some())
            && (!required.contains(QueueCapabilities::TRANSFER) || self.transfer.is_some())
    }
}

/// The adapter chosen by [`select_adapter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedAdapter {
    /// Index into the adapter list
    pub index: usize,
    pub graphics_family: u32,
    pub present_family: u32,
    /// Falls back to the graphics family when no transfer family was required
    pub transfer_family: u32,
    pub compute_family: Option<u32>,
}

impl SelectedAdapter {
    pub fn queue_families(&self) -> QueueFamilyIndices {
        QueueFamilyIndices {
            graphics: Some(self.graphics_family),
            present: Some(self.present_family),
            compute: self.compute_family,
            transfer: Some(self.transfer_family),
        }
    }

    /// Distinct families to create queues on
    pub fn unique_families(&self) -> Vec<u32> {
        self.queue_families().unique_families()
    }
}

const SOURCE: &str = "thrianta::DeviceSelector";

fn flag(indices: Option<u32>) -> char {
    if indices.is_some() { '1' } else { '0' }
}

/// Check one adapter against the requirements
///
/// Returns the resolved queue families when the adapter is suitable. The
/// renderer always needs a graphics and a present family, whatever the
/// requirements say.
pub fn adapter_meets_requirements(
    adapter: &AdapterInfo,
    requirements: &DeviceRequirements,
) -> Option<SelectedAdapter> {
    if requirements.discrete_gpu && adapter.adapter_type != AdapterType::DiscreteGpu {
        engine_debug!(SOURCE, "Skipping '{}': not a discrete GPU", adapter.name);
        return None;
    }

    let indices = QueueFamilyIndices::resolve(&adapter.queue_families);

    engine_debug!(SOURCE, "Graphics | Present | Compute | Transfer | Name");
    engine_debug!(
        SOURCE,
        "       {} |       {} |       {} |        {} | {}",
        flag(indices.graphics),
        flag(indices.present),
        flag(indices.compute),
        flag(indices.transfer),
        adapter.name
    );

    if !indices.satisfies(requirements.queues) {
        engine_debug!(SOURCE, "Skipping '{}': missing a required queue family", adapter.name);
        return None;
    }

    let (Some(graphics_family), Some(present_family)) = (indices.graphics, indices.present) else {
        engine_debug!(SOURCE, "Skipping '{}': no graphics or present family", adapter.name);
        return None;
    };

    if adapter.surface_format_count == 0 || adapter.present_mode_count == 0 {
        engine_debug!(SOURCE, "Skipping '{}': surface support incomplete", adapter.name);
        return None;
    }

    if let Some(missing) = requirements
        .device_extensions
        .iter()
        .find(|required| !adapter.extensions.iter().any(|ext| ext == *required))
    {
        engine_debug!(SOURCE, "Skipping '{}': extension '{}' not available", adapter.name, missing);
        return None;
    }

    if requirements.sampler_anisotropy && !adapter.sampler_anisotropy {
        engine_debug!(SOURCE, "Skipping '{}': sampler anisotropy unsupported", adapter.name);
        return None;
    }

    Some(SelectedAdapter {
        index: 0,
        graphics_family,
        present_family,
        transfer_family: indices.transfer.unwrap_or(graphics_family),
        compute_family: indices.compute,
    })
}

/// Pick the first adapter that meets every requirement
pub fn select_adapter(
    adapters: &[AdapterInfo],
    requirements: &DeviceRequirements,
) -> Result<SelectedAdapter> {
    if adapters.is_empty() {
        engine_error!(SOURCE, "No devices which support the graphics API were found");
        return Err(Error::NoSuitableDevice);
    }

    for (index, adapter) in adapters.iter().enumerate() {
        if let Some(selected) = adapter_meets_requirements(adapter, requirements) {
            log_selected(adapter, &selected);
            return Ok(SelectedAdapter { index, ..selected });
        }
    }

    engine_error!(SOURCE, "No physical devices were found which meet the requirements");
    Err(Error::NoSuitableDevice)
}

fn log_selected(adapter: &AdapterInfo, selected: &SelectedAdapter) {
    engine_info!(SOURCE, "Selected device: '{}'", adapter.name);
    engine_info!(SOURCE, "GPU type is {:?}", adapter.adapter_type);
    let (major, minor, patch) = adapter.driver_version;
    engine_info!(SOURCE, "GPU driver version: {}.{}.{}", major, minor, patch);
    let (major, minor, patch) = adapter.api_version;
    engine_info!(SOURCE, "API version: {}.{}.{}", major, minor, patch);

    for heap in &adapter.memory_heaps {
        let gib = heap.size as f64 / (1024.0 * 1024.0 * 1024.0);
        if heap.device_local {
            engine_info!(SOURCE, "Local GPU memory: {:.2} GiB", gib);
        } else {
            engine_info!(SOURCE, "Shared system memory: {:.2} GiB", gib);
        }
    }

    engine_debug!(
        SOURCE,
        "Queue families: graphics {}, present {}, transfer {}, compute {:?}",
        selected.graphics_family,
        selected.present_family,
        selected.transfer_family,
        selected.compute_family
    );
}

#[cfg(test)]
#[path = "device_selector_tests.rs"]
mod tests;
