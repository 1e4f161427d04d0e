use crate::error::Error;
use crate::graphics_device::CommandBufferState::{self, *};

#[test]
fn test_default_state_is_not_allocated() {
    assert_eq!(CommandBufferState::default(), NotAllocated);
}

#[test]
fn test_full_frame_cycle() {
    let mut state = NotAllocated;
    for next in [Ready, Recording, InRenderPass, Recording, RecordingEnded, Submitted, Ready, Recording] {
        state = state.transition(next).unwrap();
    }
    assert_eq!(state, Recording);
}

#[test]
fn test_cannot_begin_without_reset_after_submit() {
    assert!(matches!(Submitted.transition(Recording), Err(Error::InvalidState(_))));
}

#[test]
fn test_cannot_end_inside_render_pass() {
    assert!(!InRenderPass.can_transition_to(RecordingEnded));
    assert!(!InRenderPass.can_transition_to(Submitted));
}

#[test]
fn test_cannot_submit_while_recording() {
    assert!(!Recording.can_transition_to(Submitted));
    assert!(!Ready.can_transition_to(Submitted));
}

#[test]
fn test_free_allowed_from_any_state() {
    for state in [Ready, Recording, InRenderPass, RecordingEnded, Submitted] {
        assert!(state.can_transition_to(NotAllocated));
    }
}

#[test]
fn test_reset_not_allowed_mid_recording() {
    assert!(!Recording.can_transition_to(Ready));
    assert!(!InRenderPass.can_transition_to(Ready));
}
