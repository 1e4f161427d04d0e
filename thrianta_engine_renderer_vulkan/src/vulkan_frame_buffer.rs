/// Framebuffer - one per swapchain image, grouping its color view with the
/// shared depth view

use ash::vk;

use thrianta_engine::thrianta::Result;
use thrianta_engine::engine_err;

pub struct Framebuffer {
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
    device: ash::Device,
}

impl Framebuffer {
    pub fn new(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(width)
            .height(height)
            .layers(1);

        let framebuffer = unsafe { device.create_framebuffer(&create_info, None) }
            .map_err(|e| engine_err!("thrianta::vulkan", "Failed to create framebuffer {}x{}: {:?}", width, height, e))?;

        Ok(Self { framebuffer, width, height, device: device.clone() })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
