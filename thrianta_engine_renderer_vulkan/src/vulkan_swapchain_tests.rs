use super::*;

fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR { format, color_space }
}

fn capabilities(
    current: (u32, u32),
    min: (u32, u32),
    max: (u32, u32),
    min_images: u32,
    max_images: u32,
) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        current_extent: vk::Extent2D { width: current.0, height: current.1 },
        min_image_extent: vk::Extent2D { width: min.0, height: min.1 },
        max_image_extent: vk::Extent2D { width: max.0, height: max.1 },
        min_image_count: min_images,
        max_image_count: max_images,
        ..Default::default()
    }
}

// ============================================================================
// SURFACE FORMAT
// ============================================================================

#[test]
fn test_surface_format_prefers_bgra_unorm_srgb_nonlinear() {
    let formats = [
        surface_format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    let chosen = choose_surface_format(&formats).unwrap();
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
}

#[test]
fn test_surface_format_needs_matching_color_space() {
    let formats = [
        surface_format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        surface_format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
    ];
    let chosen = choose_surface_format(&formats).unwrap();
    assert_eq!(chosen.format, vk::Format::R16G16B16A16_SFLOAT);
}

#[test]
fn test_surface_format_empty_list() {
    assert!(choose_surface_format(&[]).is_none());
}

// ============================================================================
// PRESENT MODE
// ============================================================================

#[test]
fn test_present_mode_prefers_mailbox() {
    let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX];
    assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
}

#[test]
fn test_present_mode_falls_back_to_fifo() {
    let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED];
    assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
}

// ============================================================================
// EXTENT
// ============================================================================

#[test]
fn test_extent_uses_current_extent_when_defined() {
    let caps = capabilities((1024, 768), (1, 1), (4096, 4096), 2, 8);
    let extent = choose_extent(&caps, 800, 600);
    assert_eq!((extent.width, extent.height), (1024, 768));
}

#[test]
fn test_extent_uses_framebuffer_size_when_undefined() {
    let caps = capabilities((u32::MAX, u32::MAX), (1, 1), (4096, 4096), 2, 8);
    let extent = choose_extent(&caps, 800, 600);
    assert_eq!((extent.width, extent.height), (800, 600));
}

#[test]
fn test_extent_is_clamped() {
    let caps = capabilities((u32::MAX, u32::MAX), (100, 100), (1920, 1080), 2, 8);

    let extent = choose_extent(&caps, 5000, 10);
    assert_eq!((extent.width, extent.height), (1920, 100));

    let extent = choose_extent(&caps, 0, 0);
    assert_eq!((extent.width, extent.height), (100, 100));
}

// ============================================================================
// IMAGE COUNT
// ============================================================================

#[test]
fn test_image_count_is_min_plus_one() {
    let caps = capabilities((800, 600), (1, 1), (4096, 4096), 2, 8);
    assert_eq!(choose_image_count(&caps), 3);
}

#[test]
fn test_image_count_capped_by_max() {
    let caps = capabilities((800, 600), (1, 1), (4096, 4096), 3, 3);
    assert_eq!(choose_image_count(&caps), 3);
}

#[test]
fn test_image_count_unbounded_max() {
    let caps = capabilities((800, 600), (1, 1), (4096, 4096), 4, 0);
    assert_eq!(choose_image_count(&caps), 5);
}

#[test]
fn test_frames_in_flight_follow_image_count() {
    let caps = capabilities((800, 600), (1, 1), (4096, 4096), 2, 0);
    let info = SwapchainInfo::new(800, 600, choose_image_count(&caps));
    assert_eq!(info.image_count, 3);
    assert_eq!(info.max_frames_in_flight, 2);
}
