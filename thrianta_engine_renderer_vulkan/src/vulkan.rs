/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns the instance, the surface, the logical device and everything the
/// frame orchestrator drives through the trait: swapchain, render pass,
/// framebuffers, one command buffer per swapchain image, fences and
/// semaphores. Buffers handed out by `create_buffer` share the device through
/// `Arc<GpuContext>` and must be dropped before the device.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use slotmap::SlotMap;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::path::Path;
use std::sync::{Arc, Mutex};

use thrianta_engine::thrianta::render::{
    select_adapter, AcquireOutcome, AdapterInfo, Buffer, BufferDesc, ClearValues,
    CommandBufferState, FenceKey, FenceStatus, PresentOutcome, Rect2D, RendererConfig,
    SelectedAdapter, SemaphoreKey, SwapchainInfo, Viewport,
};
use thrianta_engine::thrianta::{Error, GraphicsDevice, Result};
use thrianta_engine::{engine_debug, engine_error, engine_info, engine_warn};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_buffer::{BeginFlags, CommandBuffer};
use crate::vulkan_context::GpuContext;
use crate::vulkan_device::{create_logical_device, detect_depth_format, query_adapter};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_render_pass::{to_vk_rect, RenderPass};
use crate::vulkan_shader::{ShaderModule, ShaderStage, SHADER_DIRECTORY};
use crate::vulkan_swapchain::{SurfaceTarget, Swapchain};

const SOURCE: &str = "thrianta::vulkan";

/// Log a failed Vulkan call and classify it
pub(crate) fn vk_error(call: &str, result: vk::Result) -> Error {
    engine_error!(SOURCE, "{} failed: {:?}", call, result);
    match result {
        vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost(format!("{}: {:?}", call, result)),
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            Error::OutOfMemory
        }
        other => Error::BackendError(format!("{} failed: {:?}", call, other)),
    }
}

pub(crate) fn to_vk_viewport(viewport: Viewport) -> vk::Viewport {
    vk::Viewport {
        x: viewport.x,
        y: viewport.y,
        width: viewport.width,
        height: viewport.height,
        min_depth: viewport.min_depth,
        max_depth: viewport.max_depth,
    }
}

fn init_failed(what: &str, detail: impl std::fmt::Debug) -> Error {
    engine_error!(SOURCE, "{}: {:?}", what, detail);
    Error::InitializationFailed(format!("{}: {:?}", what, detail))
}

fn command_buffer_at(buffers: &mut [CommandBuffer], image_index: u32) -> Result<&mut CommandBuffer> {
    buffers.get_mut(image_index as usize).ok_or_else(|| {
        Error::InvalidResource(format!("No command buffer for swapchain image {}", image_index))
    })
}

fn require_recording(state: CommandBufferState) -> Result<()> {
    match state {
        CommandBufferState::Recording | CommandBufferState::InRenderPass => Ok(()),
        other => Err(Error::InvalidState(format!(
            "Command buffer must be recording, found {:?}",
            other
        ))),
    }
}

fn require_in_render_pass(state: CommandBufferState) -> Result<()> {
    if state == CommandBufferState::InRenderPass {
        Ok(())
    } else {
        Err(Error::InvalidState(format!(
            "No render pass to end, command buffer is {:?}",
            state
        )))
    }
}

/// Handles created by `VulkanGraphicsDevice::new`, released in reverse order
/// when startup fails before the device struct owns them
#[derive(Default)]
struct PartialInit {
    armed: bool,
    instance: Option<ash::Instance>,
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: Option<(ash::khr::surface::Instance, vk::SurfaceKHR)>,
    device: Option<ash::Device>,
    allocator: Option<Arc<Mutex<Allocator>>>,
    gpu_context: Option<Arc<GpuContext>>,
    command_pools: Vec<vk::CommandPool>,
}

impl PartialInit {
    fn new() -> Self {
        let mut init = Self::default();
        init.armed = true;
        init
    }

    /// Ownership has moved to the device; release nothing
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialInit {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        engine_debug!(SOURCE, "Releasing partially initialized Vulkan state");
        unsafe {
            if let Some(device) = &self.device {
                device.device_wait_idle().ok();
                for pool in self.command_pools.drain(..) {
                    device.destroy_command_pool(pool, None);
                }
            }
            if let Some(mut ctx) = self.gpu_context.take() {
                if let Some(ctx) = Arc::get_mut(&mut ctx) {
                    ManuallyDrop::drop(&mut ctx.allocator);
                }
            }
            self.allocator = None;
            if let Some(device) = self.device.take() {
                device.destroy_device(None);
            }
            if let Some((loader, surface)) = self.surface.take() {
                loader.destroy_surface(surface, None);
            }
            if let Some((debug_utils, messenger)) = self.debug.take() {
                crate::debug::cleanup_debug_config();
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            if let Some(instance) = self.instance.take() {
                instance.destroy_instance(None);
            }
        }
    }
}

pub struct VulkanGraphicsDevice {
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    adapter: AdapterInfo,
    selected: SelectedAdapter,

    /// Surface and the queue families that present to it
    target: SurfaceTarget,
    transfer_queue: vk::Queue,

    /// GPU memory allocator reference (also stored in GpuContext)
    allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: Swapchain,
    color_format: vk::Format,
    render_pass: Option<RenderPass>,
    framebuffers: Vec<Framebuffer>,

    /// Graphics pool for the per-image command buffers
    command_pool: vk::CommandPool,
    command_buffers: Vec<CommandBuffer>,

    fences: SlotMap<FenceKey, vk::Fence>,
    semaphores: SlotMap<SemaphoreKey, vk::Semaphore>,

    /// Shared GPU context for buffers and one-shot uploads
    gpu_context: Arc<GpuContext>,
}

impl VulkanGraphicsDevice {
    /// Bring up Vulkan for `window` with a `width` x `height` framebuffer
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &RendererConfig,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let mut partial = PartialInit::new();
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_failed("Failed to load Vulkan library", e))?;

            let app_name = CString::new(config.app_name.as_str()).map_err(|_| {
                Error::InvalidResource(format!("Application name '{}' contains a NUL byte", config.app_name))
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Thrianta")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window
                .display_handle()
                .map_err(|e| init_failed("Failed to get display handle", e))?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_failed("Failed to get required extensions", e))?
                .to_vec();

            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if config.enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed("Failed to create Vulkan instance", e))?;
            partial.instance = Some(instance.clone());
            engine_debug!(SOURCE, "Vulkan instance created (validation: {})", config.enable_validation);

            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);

                crate::debug::init_debug_config(crate::debug::Config {
                    severity: config.debug_severity,
                    enable_stats: true,
                });

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(crate::debug::severity_flags(config.debug_severity))
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                let messenger = debug_utils
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| init_failed("Failed to create debug messenger", e))?;
                partial.debug = Some((debug_utils.clone(), messenger));

                (Some(debug_utils), Some(messenger))
            } else {
                (None, None)
            };

            let window_handle = window
                .window_handle()
                .map_err(|e| init_failed("Failed to get window handle", e))?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_failed("Failed to create surface", e))?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            partial.surface = Some((surface_loader.clone(), surface));

            // Adapter selection
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| init_failed("Failed to enumerate physical devices", e))?;
            let adapters = physical_devices
                .iter()
                .map(|&pd| query_adapter(&instance, &surface_loader, surface, pd))
                .collect::<Result<Vec<_>>>()?;
            let selected = select_adapter(&adapters, &config.device_requirements)?;
            let physical_device = physical_devices[selected.index];
            let adapter = adapters[selected.index].clone();

            let depth_format = detect_depth_format(&instance, physical_device)?;
            let logical = create_logical_device(&instance, physical_device, &selected, &config.device_requirements)?;
            let device = logical.device;
            partial.device = Some(device.clone());

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_failed("Failed to create GPU allocator", e))?;

            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(selected.graphics_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(|e| init_failed("Failed to create graphics command pool", e))?;
            partial.command_pools.push(command_pool);

            let upload_pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(selected.graphics_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_command_pool = device
                .create_command_pool(&upload_pool_info, None)
                .map_err(|e| init_failed("Failed to create upload command pool", e))?;
            partial.command_pools.push(upload_command_pool);

            let memory_properties = instance.get_physical_device_memory_properties(physical_device);
            let allocator_arc = Arc::new(Mutex::new(allocator));
            partial.allocator = Some(Arc::clone(&allocator_arc));
            let gpu_context = Arc::new(GpuContext::new(
                device.clone(),
                Arc::clone(&allocator_arc),
                logical.graphics_queue,
                selected.graphics_family,
                upload_command_pool,
                &memory_properties,
                instance.clone(),
                debug_utils_loader,
                debug_messenger,
            ));
            partial.gpu_context = Some(Arc::clone(&gpu_context));

            let target = SurfaceTarget {
                surface_loader,
                surface,
                physical_device,
                graphics_family: selected.graphics_family,
                present_family: selected.present_family,
                present_queue: logical.present_queue,
                depth_format,
            };

            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
            let mut swapchain = Swapchain::create(&gpu_context, swapchain_loader.clone(), &target, width, height)?;
            let color_format = swapchain.format();
            let render_pass = match RenderPass::new(&device, color_format, depth_format) {
                Ok(render_pass) => render_pass,
                Err(e) => {
                    swapchain.destroy(&gpu_context);
                    return Err(e);
                }
            };

            let mut graphics_device = Self {
                _entry: entry,
                instance,
                physical_device,
                adapter,
                selected,
                target,
                transfer_queue: logical.transfer_queue,
                allocator: ManuallyDrop::new(allocator_arc),
                swapchain_loader,
                swapchain,
                color_format,
                render_pass: Some(render_pass),
                framebuffers: Vec::new(),
                command_pool,
                command_buffers: Vec::new(),
                fences: SlotMap::with_key(),
                semaphores: SlotMap::with_key(),
                gpu_context,
            };
            partial.disarm();

            // From here on Drop releases everything on failure
            graphics_device.create_frame_resources()?;

            engine_info!(SOURCE, "Vulkan device ready on '{}'", graphics_device.adapter.name);
            Ok(graphics_device)
        }
    }

    /// One framebuffer and one command buffer per swapchain image
    fn create_frame_resources(&mut self) -> Result<()> {
        let render_pass = self
            .render_pass
            .as_ref()
            .ok_or_else(|| Error::InvalidState("Render pass has been destroyed".to_string()))?
            .render_pass;
        let extent = self.swapchain.extent();

        for index in 0..self.swapchain.image_count() {
            let attachments = self.swapchain.attachments(index).ok_or_else(|| {
                Error::InvalidResource(format!("Swapchain image {} has no attachments", index))
            })?;
            self.framebuffers.push(Framebuffer::new(
                &self.gpu_context.device,
                render_pass,
                &attachments,
                extent.width,
                extent.height,
            )?);
        }

        self.command_buffers = CommandBuffer::allocate(
            &self.gpu_context.device,
            self.command_pool,
            self.swapchain.image_count() as u32,
        )?;

        engine_debug!(
            SOURCE,
            "Created {} framebuffers and command buffers ({}x{})",
            self.framebuffers.len(), extent.width, extent.height
        );
        Ok(())
    }

    fn destroy_frame_resources(&mut self) {
        CommandBuffer::free_all(&self.gpu_context.device, self.command_pool, &mut self.command_buffers);
        self.framebuffers.clear();
    }

    fn fence(&self, key: FenceKey) -> Result<vk::Fence> {
        self.fences
            .get(key)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("Unknown fence {:?}", key)))
    }

    fn semaphore(&self, key: SemaphoreKey) -> Result<vk::Semaphore> {
        self.semaphores
            .get(key)
            .copied()
            .ok_or_else(|| Error::InvalidResource(format!("Unknown semaphore {:?}", key)))
    }

    /// Load `assets/shaders/<name>.<stage>.spv`
    pub fn load_shader(&self, name: &str, stage: ShaderStage) -> Result<ShaderModule> {
        ShaderModule::load(&self.gpu_context.device, Path::new(SHADER_DIRECTORY), name, stage)
    }

    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.adapter
    }

    pub fn selected_adapter(&self) -> &SelectedAdapter {
        &self.selected
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn transfer_queue(&self) -> vk::Queue {
        self.transfer_queue
    }

    pub fn depth_format(&self) -> vk::Format {
        self.target.depth_format
    }

    pub fn gpu_context(&self) -> &Arc<GpuContext> {
        &self.gpu_context
    }

    /// Typed constructor for callers that need the Vulkan buffer API
    /// (`resize`, `lock_memory`, `copy_to`)
    pub fn create_vulkan_buffer(&self, desc: &BufferDesc) -> Result<VulkanBuffer> {
        VulkanBuffer::new(Arc::clone(&self.gpu_context), desc)
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn swapchain_info(&self) -> SwapchainInfo {
        self.swapchain.info()
    }

    fn create_fence(&mut self, signaled: bool) -> Result<FenceKey> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { self.gpu_context.device.create_fence(&create_info, None) }
            .map_err(|e| vk_error("vkCreateFence", e))?;
        Ok(self.fences.insert(fence))
    }

    fn destroy_fence(&mut self, fence: FenceKey) {
        if let Some(fence) = self.fences.remove(fence) {
            unsafe { self.gpu_context.device.destroy_fence(fence, None) };
        }
    }

    fn wait_for_fence(&mut self, fence: FenceKey, timeout_ns: u64) -> Result<FenceStatus> {
        let handle = self.fence(fence)?;
        match unsafe { self.gpu_context.device.wait_for_fences(&[handle], true, timeout_ns) } {
            Ok(()) => Ok(FenceStatus::Signaled),
            Err(vk::Result::TIMEOUT) => Ok(FenceStatus::Timeout),
            Err(e) => Err(vk_error("vkWaitForFences", e)),
        }
    }

    fn reset_fence(&mut self, fence: FenceKey) -> Result<()> {
        let handle = self.fence(fence)?;
        unsafe { self.gpu_context.device.reset_fences(&[handle]) }
            .map_err(|e| vk_error("vkResetFences", e))
    }

    fn create_semaphore(&mut self) -> Result<SemaphoreKey> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { self.gpu_context.device.create_semaphore(&create_info, None) }
            .map_err(|e| vk_error("vkCreateSemaphore", e))?;
        Ok(self.semaphores.insert(semaphore))
    }

    fn destroy_semaphore(&mut self, semaphore: SemaphoreKey) {
        if let Some(semaphore) = self.semaphores.remove(semaphore) {
            unsafe { self.gpu_context.device.destroy_semaphore(semaphore, None) };
        }
    }

    fn acquire_next_image(&mut self, timeout_ns: u64, signal: SemaphoreKey) -> Result<AcquireOutcome> {
        let signal = self.semaphore(signal)?;
        self.swapchain.acquire_next_image(timeout_ns, signal)
    }

    fn present(&mut self, wait: SemaphoreKey, image_index: u32) -> Result<PresentOutcome> {
        let wait = self.semaphore(wait)?;
        // The present queue may be the graphics queue
        let _queue = self.gpu_context.lock_upload_pool()?;
        self.swapchain.present(wait, image_index)
    }

    fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<SwapchainInfo> {
        self.wait_idle()?;
        self.destroy_frame_resources();
        self.swapchain.destroy(&self.gpu_context);
        self.swapchain = Swapchain::create(
            &self.gpu_context,
            self.swapchain_loader.clone(),
            &self.target,
            width,
            height,
        )?;

        if self.swapchain.format() != self.color_format {
            engine_warn!(
                SOURCE,
                "Surface format changed {:?} -> {:?}, rebuilding render pass",
                self.color_format, self.swapchain.format()
            );
            self.render_pass = None;
            self.color_format = self.swapchain.format();
            self.render_pass = Some(RenderPass::new(
                &self.gpu_context.device,
                self.color_format,
                self.target.depth_format,
            )?);
        }

        self.create_frame_resources()?;
        Ok(self.swapchain.info())
    }

    fn begin_commands(&mut self, image_index: u32) -> Result<()> {
        let device = &self.gpu_context.device;
        let command_buffer = command_buffer_at(&mut self.command_buffers, image_index)?;
        command_buffer.ensure_ready(device)?;
        command_buffer.begin(device, BeginFlags::default())
    }

    fn set_viewport(&mut self, image_index: u32, viewport: Viewport) -> Result<()> {
        let command_buffer = command_buffer_at(&mut self.command_buffers, image_index)?;
        require_recording(command_buffer.state())?;
        unsafe {
            self.gpu_context
                .device
                .cmd_set_viewport(command_buffer.handle(), 0, &[to_vk_viewport(viewport)]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, image_index: u32, scissor: Rect2D) -> Result<()> {
        let command_buffer = command_buffer_at(&mut self.command_buffers, image_index)?;
        require_recording(command_buffer.state())?;
        unsafe {
            self.gpu_context
                .device
                .cmd_set_scissor(command_buffer.handle(), 0, &[to_vk_rect(scissor)]);
        }
        Ok(())
    }

    fn begin_render_pass(&mut self, image_index: u32, area: Rect2D, clear: &ClearValues) -> Result<()> {
        let render_pass = self
            .render_pass
            .as_ref()
            .ok_or_else(|| Error::InvalidState("Render pass has been destroyed".to_string()))?;
        let framebuffer = self.framebuffers.get(image_index as usize).ok_or_else(|| {
            Error::InvalidResource(format!("No framebuffer for swapchain image {}", image_index))
        })?;
        let command_buffer = command_buffer_at(&mut self.command_buffers, image_index)?;

        command_buffer.set_state(CommandBufferState::InRenderPass)?;
        render_pass.begin(command_buffer.handle(), framebuffer.framebuffer, area, clear);
        Ok(())
    }

    fn end_render_pass(&mut self, image_index: u32) -> Result<()> {
        let render_pass = self
            .render_pass
            .as_ref()
            .ok_or_else(|| Error::InvalidState("Render pass has been destroyed".to_string()))?;
        let command_buffer = command_buffer_at(&mut self.command_buffers, image_index)?;

        require_in_render_pass(command_buffer.state())?;
        command_buffer.set_state(CommandBufferState::Recording)?;
        render_pass.end(command_buffer.handle());
        Ok(())
    }

    fn end_commands(&mut self, image_index: u32) -> Result<()> {
        let device = &self.gpu_context.device;
        command_buffer_at(&mut self.command_buffers, image_index)?.end(device)
    }

    fn command_buffer_state(&self, image_index: u32) -> CommandBufferState {
        self.command_buffers
            .get(image_index as usize)
            .map_or(CommandBufferState::NotAllocated, CommandBuffer::state)
    }

    fn submit(
        &mut self,
        image_index: u32,
        wait: SemaphoreKey,
        signal: SemaphoreKey,
        fence: FenceKey,
    ) -> Result<()> {
        let wait_semaphores = [self.semaphore(wait)?];
        let signal_semaphores = [self.semaphore(signal)?];
        let fence = self.fence(fence)?;
        let command_buffer = command_buffer_at(&mut self.command_buffers, image_index)?;
        command_buffer.state().transition(CommandBufferState::Submitted)?;

        let command_buffers = [command_buffer.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        {
            let _queue = self.gpu_context.lock_upload_pool()?;
            unsafe {
                self.gpu_context
                    .device
                    .queue_submit(self.gpu_context.graphics_queue, &[submit_info], fence)
            }
            .map_err(|e| vk_error("vkQueueSubmit", e))?;
        }

        command_buffer.set_state(CommandBufferState::Submitted)
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.gpu_context.device.device_wait_idle() }
            .map_err(|e| vk_error("vkDeviceWaitIdle", e))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(self.create_vulkan_buffer(&desc)?))
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.gpu_context.device.device_wait_idle().ok();

            // 1. Objects owned by this device
            self.destroy_frame_resources();
            self.gpu_context.device.destroy_command_pool(self.command_pool, None);
            self.render_pass = None;
            self.swapchain.destroy(&self.gpu_context);
            for (_, fence) in self.fences.drain() {
                self.gpu_context.device.destroy_fence(fence, None);
            }
            for (_, semaphore) in self.semaphores.drain() {
                self.gpu_context.device.destroy_semaphore(semaphore, None);
            }

            // 2. Upload command pool from GpuContext
            if let Ok(mut pool) = self.gpu_context.upload_command_pool.lock() {
                if *pool != vk::CommandPool::null() {
                    self.gpu_context.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 3. Allocator pages must go before the device
            ManuallyDrop::drop(&mut self.allocator);
            if let Some(ctx) = Arc::get_mut(&mut self.gpu_context) {
                ManuallyDrop::drop(&mut ctx.allocator);
            } else {
                engine_warn!(SOURCE, "Buffers outlived the graphics device; GPU memory is leaked");
            }

            // 4. Surface, then messenger, then device and instance
            self.target.surface_loader.destroy_surface(self.target.surface, None);

            crate::debug::cleanup_debug_config();
            if let (Some(debug_utils), Some(messenger)) = (
                &self.gpu_context.debug_utils_loader,
                &self.gpu_context.debug_messenger,
            ) {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            self.gpu_context.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
        engine_debug!(SOURCE, "Vulkan device destroyed");
    }
}

#[cfg(test)]
#[path = "vulkan_tests.rs"]
mod tests;
