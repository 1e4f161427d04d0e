use super::*;

#[test]
fn test_vk_error_classifies_device_loss() {
    let err = vk_error("vkQueueSubmit", vk::Result::ERROR_DEVICE_LOST);
    assert!(matches!(err, Error::DeviceLost(_)));
}

#[test]
fn test_vk_error_classifies_out_of_memory() {
    assert!(matches!(
        vk_error("vkAllocateMemory", vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
        Error::OutOfMemory
    ));
    assert!(matches!(
        vk_error("vkCreateFence", vk::Result::ERROR_OUT_OF_HOST_MEMORY),
        Error::OutOfMemory
    ));
}

#[test]
fn test_vk_error_keeps_call_site() {
    let err = vk_error("vkResetFences", vk::Result::ERROR_UNKNOWN);
    match err {
        Error::BackendError(message) => assert!(message.contains("vkResetFences")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_flipped_viewport_conversion() {
    let viewport = to_vk_viewport(Viewport::flipped(800, 600));
    assert_eq!(viewport.y, 600.0);
    assert_eq!(viewport.height, -600.0);
    assert_eq!(viewport.width, 800.0);
    assert_eq!(viewport.max_depth, 1.0);
}

#[test]
fn test_require_recording() {
    assert!(require_recording(CommandBufferState::Recording).is_ok());
    assert!(require_recording(CommandBufferState::InRenderPass).is_ok());
    assert!(matches!(
        require_recording(CommandBufferState::Ready),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn test_end_render_pass_requires_open_pass() {
    assert!(require_in_render_pass(CommandBufferState::InRenderPass).is_ok());
    for state in [
        CommandBufferState::Ready,
        CommandBufferState::Recording,
        CommandBufferState::NotAllocated,
    ] {
        assert!(matches!(require_in_render_pass(state), Err(Error::InvalidState(_))));
    }
}

#[test]
fn test_command_buffer_lookup_out_of_range() {
    let mut buffers: Vec<CommandBuffer> = Vec::new();
    assert!(matches!(command_buffer_at(&mut buffers, 0), Err(Error::InvalidResource(_))));
}
