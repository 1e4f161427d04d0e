use super::*;
use ash::vk::Handle;

fn detached(state: CommandBufferState) -> CommandBuffer {
    CommandBuffer { handle: vk::CommandBuffer::null(), state }
}

#[test]
fn test_begin_flags_default_is_empty() {
    assert!(BeginFlags::default().to_vk().is_empty());
}

#[test]
fn test_begin_flags_mapping() {
    let flags = BeginFlags {
        single_use: true,
        render_pass_continue: false,
        simultaneous_use: true,
    };
    assert_eq!(
        flags.to_vk(),
        vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT | vk::CommandBufferUsageFlags::SIMULTANEOUS_USE
    );
}

#[test]
fn test_set_state_follows_lifecycle() {
    let mut cb = detached(CommandBufferState::Ready);
    cb.set_state(CommandBufferState::Recording).unwrap();
    cb.set_state(CommandBufferState::InRenderPass).unwrap();
    cb.set_state(CommandBufferState::Recording).unwrap();
    cb.set_state(CommandBufferState::RecordingEnded).unwrap();
    cb.set_state(CommandBufferState::Submitted).unwrap();
    assert_eq!(cb.state(), CommandBufferState::Submitted);
    assert!(cb.handle().is_null());
}

#[test]
fn test_set_state_rejects_skipping_end() {
    let mut cb = detached(CommandBufferState::InRenderPass);
    let err = cb.set_state(CommandBufferState::Submitted).unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(cb.state(), CommandBufferState::InRenderPass);
}
