/// Swapchain - presentable images, their views and the depth attachment
///
/// The swapchain is rebuilt wholesale (`destroy` then `create`) when the
/// window is resized or presentation reports it out of date. Callers wait
/// for the device to go idle before either.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use thrianta_engine::thrianta::render::{AcquireOutcome, PresentOutcome, SwapchainInfo};
use thrianta_engine::thrianta::{Error, Result};
use thrianta_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::vulkan_context::GpuContext;
use crate::vulkan_device::SwapchainSupport;

const SOURCE: &str = "thrianta::vulkan";

/// Prefer B8G8R8A8_UNORM with the sRGB non-linear color space, else the
/// first reported format
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| f.format == vk::Format::B8G8R8A8_UNORM && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when available, FIFO otherwise (always supported)
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's current extent when defined, else the framebuffer size;
/// clamped to the allowed range either way
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    let extent = if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D { width, height }
    };

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: extent.width.max(min.width).min(max.width),
        height: extent.height.max(min.height).min(max.height),
    }
}

/// One more than the minimum, capped by a nonzero maximum
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Surface-side inputs a swapchain is built from
pub struct SurfaceTarget {
    pub surface_loader: ash::khr::surface::Instance,
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub graphics_family: u32,
    pub present_family: u32,
    pub present_queue: vk::Queue,
    pub depth_format: vk::Format,
}

/// Depth image allocated through gpu-allocator, plus its view
pub struct DepthAttachment {
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
}

impl DepthAttachment {
    fn new(ctx: &GpuContext, format: vk::Format, extent: vk::Extent2D) -> Result<Self> {
        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width: extent.width, height: extent.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create depth image: {:?}", e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = ctx
                .allocator
                .lock()
                .map_err(|_| engine_err!(SOURCE, "Allocator lock poisoned"))
                .and_then(|mut allocator| {
                    allocator
                        .allocate(&AllocationCreateDesc {
                            name: "depth_attachment",
                            requirements,
                            location: MemoryLocation::GpuOnly,
                            linear: false,
                            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                        })
                        .map_err(|e| {
                            let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                            engine_error!(SOURCE, "Out of GPU memory for depth attachment ({:.2} MB): {:?}", size_mb, e);
                            Error::OutOfMemory
                        })
                });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            let bound = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset());
            let mut depth = Self { image, view: vk::ImageView::null(), allocation: Some(allocation) };
            if let Err(e) = bound {
                depth.destroy(ctx);
                return Err(engine_err!(SOURCE, "Failed to bind depth image memory: {:?}", e));
            }

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::DEPTH,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            match ctx.device.create_image_view(&view_info, None) {
                Ok(view) => depth.view = view,
                Err(e) => {
                    depth.destroy(ctx);
                    return Err(engine_err!(SOURCE, "Failed to create depth image view: {:?}", e));
                }
            }

            Ok(depth)
        }
    }

    fn destroy(&mut self, ctx: &GpuContext) {
        unsafe {
            if self.view != vk::ImageView::null() {
                ctx.device.destroy_image_view(self.view, None);
                self.view = vk::ImageView::null();
            }
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            if self.image != vk::Image::null() {
                ctx.device.destroy_image(self.image, None);
                self.image = vk::Image::null();
            }
        }
    }
}

pub struct Swapchain {
    loader: ash::khr::swapchain::Device,
    present_queue: vk::Queue,
    handle: vk::SwapchainKHR,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    depth: Option<DepthAttachment>,
    max_frames_in_flight: u32,
}

impl Swapchain {
    pub fn create(
        ctx: &GpuContext,
        loader: ash::khr::swapchain::Device,
        target: &SurfaceTarget,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        // Support is re-queried right before sizing; the surface may have
        // changed since the adapter was selected
        let support = SwapchainSupport::query(&target.surface_loader, target.physical_device, target.surface)?;

        let surface_format = choose_surface_format(&support.formats).ok_or_else(|| {
            engine_error!(SOURCE, "Surface reports no formats");
            Error::InitializationFailed("Surface reports no formats".to_string())
        })?;
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, width, height);
        let image_count = choose_image_count(&support.capabilities);

        let family_indices = [target.graphics_family, target.present_family];
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(target.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        create_info = if target.graphics_family != target.present_family {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let handle = unsafe { loader.create_swapchain(&create_info, None) }.map_err(|e| {
            engine_error!(SOURCE, "Failed to create swapchain: {:?}", e);
            Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
        })?;

        let mut swapchain = Self {
            loader,
            present_queue: target.present_queue,
            handle,
            surface_format,
            extent,
            images: Vec::new(),
            views: Vec::new(),
            depth: None,
            max_frames_in_flight: 0,
        };

        if let Err(e) = swapchain.create_images(ctx, target.depth_format) {
            swapchain.destroy(ctx);
            return Err(e);
        }

        swapchain.max_frames_in_flight = SwapchainInfo::new(extent.width, extent.height, swapchain.images.len() as u32)
            .max_frames_in_flight;

        engine_info!(
            SOURCE,
            "Swapchain created: {}x{}, {} images, {:?}, {:?}",
            extent.width, extent.height, swapchain.images.len(), surface_format.format, present_mode
        );
        Ok(swapchain)
    }

    fn create_images(&mut self, ctx: &GpuContext, depth_format: vk::Format) -> Result<()> {
        unsafe {
            self.images = self.loader.get_swapchain_images(self.handle)
                .map_err(|e| engine_err!(SOURCE, "Failed to get swapchain images: {:?}", e))?;

            for &image in &self.images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(self.surface_format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                let view = ctx.device.create_image_view(&view_info, None)
                    .map_err(|e| engine_err!(SOURCE, "Failed to create swapchain image view: {:?}", e))?;
                self.views.push(view);
            }
        }

        self.depth = Some(DepthAttachment::new(ctx, depth_format, self.extent)?);
        Ok(())
    }

    /// Wait for the device to go idle, then destroy the depth attachment,
    /// the image views (the images belong to the swapchain) and the
    /// swapchain. Safe to call twice.
    pub fn destroy(&mut self, ctx: &GpuContext) {
        if self.handle == vk::SwapchainKHR::null() && self.views.is_empty() && self.depth.is_none() {
            return;
        }
        if let Err(e) = unsafe { ctx.device.device_wait_idle() } {
            engine_warn!(SOURCE, "Device wait idle failed before swapchain destruction: {:?}", e);
        }
        if let Some(mut depth) = self.depth.take() {
            depth.destroy(ctx);
        }
        unsafe {
            for view in self.views.drain(..) {
                ctx.device.destroy_image_view(view, None);
            }
            self.images.clear();
            if self.handle != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(self.handle, None);
                self.handle = vk::SwapchainKHR::null();
                engine_debug!(SOURCE, "Swapchain destroyed");
            }
        }
    }

    pub fn info(&self) -> SwapchainInfo {
        SwapchainInfo::new(self.extent.width, self.extent.height, self.images.len() as u32)
    }

    pub fn format(&self) -> vk::Format {
        self.surface_format.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn max_frames_in_flight(&self) -> u32 {
        self.max_frames_in_flight
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Color view of image `index` followed by the depth view
    pub fn attachments(&self, index: usize) -> Option<[vk::ImageView; 2]> {
        let view = *self.views.get(index)?;
        let depth = self.depth.as_ref()?.view;
        Some([view, depth])
    }

    pub fn acquire_next_image(&self, timeout_ns: u64, signal: vk::Semaphore) -> Result<AcquireOutcome> {
        let result = unsafe { self.loader.acquire_next_image(self.handle, timeout_ns, signal, vk::Fence::null()) };
        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!(SOURCE, "Swapchain out of date during acquire");
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                engine_error!(SOURCE, "Device lost while acquiring a swapchain image");
                Err(Error::DeviceLost("acquire_next_image".to_string()))
            }
            Err(e) => Err(engine_err!(SOURCE, "Failed to acquire swapchain image: {:?}", e)),
        }
    }

    pub fn present(&self, wait: vk::Semaphore, image_index: u32) -> Result<PresentOutcome> {
        let swapchains = [self.handle];
        let image_indices = [image_index];
        let wait_semaphores = [wait];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.loader.queue_present(self.present_queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(vk::Result::ERROR_DEVICE_LOST) => {
                engine_error!(SOURCE, "Device lost while presenting");
                Err(Error::DeviceLost("queue_present".to_string()))
            }
            Err(e) => Err(engine_err!(SOURCE, "Failed to present swapchain image: {:?}", e)),
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
