use super::*;
use thrianta_engine::glam::Vec4;

#[test]
fn test_color_attachment_is_presentable() {
    let color = color_attachment(vk::Format::B8G8R8A8_UNORM);
    assert_eq!(color.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(color.load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(color.store_op, vk::AttachmentStoreOp::STORE);
    assert_eq!(color.initial_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(color.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
}

#[test]
fn test_depth_attachment_is_discarded() {
    let depth = depth_attachment(vk::Format::D32_SFLOAT);
    assert_eq!(depth.load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(depth.store_op, vk::AttachmentStoreOp::DONT_CARE);
    assert_eq!(depth.final_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
}

#[test]
fn test_external_dependency_gates_color_output() {
    let dependency = external_dependency();
    assert_eq!(dependency.src_subpass, vk::SUBPASS_EXTERNAL);
    assert_eq!(dependency.dst_subpass, 0);
    assert_eq!(dependency.src_stage_mask, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
    assert_eq!(dependency.dst_stage_mask, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
    assert!(dependency.src_access_mask.is_empty());
    assert_eq!(
        dependency.dst_access_mask,
        vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
    );
}

#[test]
fn test_clear_values_layout() {
    let clear = ClearValues {
        color: Vec4::new(0.1, 0.2, 0.3, 1.0),
        depth: 1.0,
        stencil: 7,
    };
    let values = clear_values(&clear);
    unsafe {
        assert_eq!(values[0].color.float32, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(values[1].depth_stencil.depth, 1.0);
        assert_eq!(values[1].depth_stencil.stencil, 7);
    }
}

#[test]
fn test_rect_conversion() {
    let rect = to_vk_rect(Rect2D { x: 4, y: -2, width: 640, height: 480 });
    assert_eq!(rect.offset.x, 4);
    assert_eq!(rect.offset.y, -2);
    assert_eq!(rect.extent.width, 640);
    assert_eq!(rect.extent.height, 480);
}
