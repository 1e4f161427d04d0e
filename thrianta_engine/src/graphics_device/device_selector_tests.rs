use crate::error::Error;
use crate::graphics_device::{
    adapter_meets_requirements, select_adapter, AdapterInfo, AdapterType, DeviceRequirements,
    MemoryHeapInfo, QueueCapabilities as Q, QueueFamilyIndices, QueueFamilyInfo,
};

fn family(capabilities: Q) -> QueueFamilyInfo {
    QueueFamilyInfo { capabilities, queue_count: 1 }
}

fn adapter(name: &str, adapter_type: AdapterType, families: Vec<QueueFamilyInfo>) -> AdapterInfo {
    AdapterInfo {
        name: name.to_string(),
        adapter_type,
        driver_version: (535, 104, 5),
        api_version: (1, 3, 0),
        queue_families: families,
        extensions: vec!["VK_KHR_swapchain".to_string()],
        sampler_anisotropy: true,
        surface_format_count: 2,
        present_mode_count: 3,
        memory_heaps: vec![
            MemoryHeapInfo { size: 8 << 30, device_local: true },
            MemoryHeapInfo { size: 16 << 30, device_local: false },
        ],
    }
}

/// Family layout of a common discrete GPU: universal, compute+transfer,
/// dedicated transfer
fn discrete_families() -> Vec<QueueFamilyInfo> {
    vec![
        family(Q::GRAPHICS | Q::COMPUTE | Q::TRANSFER | Q::PRESENT),
        family(Q::COMPUTE | Q::TRANSFER | Q::PRESENT),
        family(Q::TRANSFER),
    ]
}

// ============================================================================
// QUEUE FAMILY RESOLUTION
// ============================================================================

#[test]
fn test_resolve_prefers_dedicated_transfer() {
    let indices = QueueFamilyIndices::resolve(&discrete_families());
    assert_eq!(indices.graphics, Some(0));
    assert_eq!(indices.present, Some(0));
    assert_eq!(indices.compute, Some(0));
    assert_eq!(indices.transfer, Some(2));
}

#[test]
fn test_resolve_transfer_ties_go_to_later_family() {
    let families = vec![
        family(Q::GRAPHICS | Q::TRANSFER),
        family(Q::COMPUTE | Q::TRANSFER),
        family(Q::COMPUTE | Q::TRANSFER),
    ];
    let indices = QueueFamilyIndices::resolve(&families);
    assert_eq!(indices.transfer, Some(2));
}

#[test]
fn test_resolve_present_prefers_graphics_family() {
    let families = vec![
        family(Q::TRANSFER | Q::PRESENT),
        family(Q::GRAPHICS | Q::PRESENT),
    ];
    let indices = QueueFamilyIndices::resolve(&families);
    assert_eq!(indices.graphics, Some(1));
    assert_eq!(indices.present, Some(1));
}

#[test]
fn test_resolve_present_falls_back_to_first_presenting_family() {
    let families = vec![
        family(Q::GRAPHICS | Q::TRANSFER),
        family(Q::PRESENT),
        family(Q::PRESENT | Q::TRANSFER),
    ];
    let indices = QueueFamilyIndices::resolve(&families);
    assert_eq!(indices.graphics, Some(0));
    assert_eq!(indices.present, Some(1));
}

#[test]
fn test_unique_families_deduplicates() {
    let indices = QueueFamilyIndices {
        graphics: Some(0),
        present: Some(0),
        compute: Some(1),
        transfer: Some(2),
    };
    assert_eq!(indices.unique_families(), vec![0, 2]);

    let shared = QueueFamilyIndices {
        graphics: Some(0),
        present: Some(0),
        compute: None,
        transfer: Some(0),
    };
    assert_eq!(shared.unique_families(), vec![0]);
}

// ============================================================================
// REQUIREMENTS
// ============================================================================

#[test]
fn test_first_full_match_wins() {
    let adapters = vec![
        adapter("Integrated", AdapterType::IntegratedGpu, discrete_families()),
        adapter("Discrete", AdapterType::DiscreteGpu, discrete_families()),
    ];
    let selected = select_adapter(&adapters, &DeviceRequirements::default()).unwrap();
    assert_eq!(selected.index, 0);
    assert_eq!(selected.transfer_family, 2);
}

#[test]
fn test_discrete_requirement_skips_integrated() {
    let adapters = vec![
        adapter("Integrated", AdapterType::IntegratedGpu, discrete_families()),
        adapter("Discrete", AdapterType::DiscreteGpu, discrete_families()),
    ];
    let requirements = DeviceRequirements { discrete_gpu: true, ..Default::default() };
    assert_eq!(select_adapter(&adapters, &requirements).unwrap().index, 1);
}

#[test]
fn test_missing_extension_skips_adapter() {
    let mut bare = adapter("NoSwapchain", AdapterType::DiscreteGpu, discrete_families());
    bare.extensions.clear();
    assert!(adapter_meets_requirements(&bare, &DeviceRequirements::default()).is_none());
}

#[test]
fn test_missing_anisotropy_only_matters_when_required() {
    let mut gpu = adapter("NoAniso", AdapterType::DiscreteGpu, discrete_families());
    gpu.sampler_anisotropy = false;
    assert!(adapter_meets_requirements(&gpu, &DeviceRequirements::default()).is_none());

    let relaxed = DeviceRequirements { sampler_anisotropy: false, ..Default::default() };
    assert!(adapter_meets_requirements(&gpu, &relaxed).is_some());
}

#[test]
fn test_empty_surface_support_skips_adapter() {
    let mut gpu = adapter("Headless", AdapterType::DiscreteGpu, discrete_families());
    gpu.present_mode_count = 0;
    assert!(adapter_meets_requirements(&gpu, &DeviceRequirements::default()).is_none());
}

#[test]
fn test_no_present_family_skips_adapter() {
    let families = vec![family(Q::GRAPHICS | Q::COMPUTE | Q::TRANSFER)];
    let gpu = adapter("Offscreen", AdapterType::DiscreteGpu, families);
    assert!(adapter_meets_requirements(&gpu, &DeviceRequirements::default()).is_none());
}

#[test]
fn test_compute_requirement() {
    let families = vec![family(Q::GRAPHICS | Q::TRANSFER | Q::PRESENT)];
    let gpu = adapter("NoCompute", AdapterType::DiscreteGpu, families);
    let requirements = DeviceRequirements {
        queues: Q::GRAPHICS | Q::PRESENT | Q::TRANSFER | Q::COMPUTE,
        ..Default::default()
    };
    assert!(adapter_meets_requirements(&gpu, &requirements).is_none());
    assert!(adapter_meets_requirements(&gpu, &DeviceRequirements::default()).is_some());
}

#[test]
fn test_transfer_falls_back_to_graphics_when_not_required() {
    let families = vec![family(Q::GRAPHICS | Q::PRESENT)];
    let gpu = adapter("Minimal", AdapterType::IntegratedGpu, families);
    let requirements = DeviceRequirements {
        queues: Q::GRAPHICS | Q::PRESENT,
        ..Default::default()
    };
    let selected = adapter_meets_requirements(&gpu, &requirements).unwrap();
    assert_eq!(selected.transfer_family, 0);
    assert_eq!(selected.unique_families(), vec![0]);
}

#[test]
fn test_no_adapters_is_fatal() {
    assert!(matches!(
        select_adapter(&[], &DeviceRequirements::default()),
        Err(Error::NoSuitableDevice)
    ));
}

#[test]
fn test_no_suitable_adapter_is_fatal() {
    let mut gpu = adapter("Broken", AdapterType::Cpu, discrete_families());
    gpu.surface_format_count = 0;
    assert!(matches!(
        select_adapter(&[gpu], &DeviceRequirements::default()),
        Err(Error::NoSuitableDevice)
    ));
}
