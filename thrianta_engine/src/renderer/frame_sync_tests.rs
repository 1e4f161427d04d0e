use crate::error::Error;
use crate::graphics_device::mock_graphics_device::{MockCall, MockGraphicsDevice};
use crate::graphics_device::{FenceStatus, GraphicsDevice};
use crate::renderer::FrameSync;

fn submit(device: &mut MockGraphicsDevice, sync: &FrameSync, image_index: u32, slot: usize) {
    device.begin_commands(image_index).unwrap();
    device.end_commands(image_index).unwrap();
    device
        .submit(
            image_index,
            sync.image_available(slot).unwrap(),
            sync.queue_complete(slot).unwrap(),
            sync.fence(slot).unwrap(),
        )
        .unwrap();
}

#[test]
fn test_new_creates_signaled_fences_and_two_semaphores_per_slot() {
    let (mut device, state) = MockGraphicsDevice::new(800, 600, 3);
    let sync = FrameSync::new(&mut device, 2, 3).unwrap();

    let state = state.lock().unwrap();
    assert_eq!(sync.slot_count(), 2);
    assert_eq!(sync.image_count(), 3);
    assert_eq!(state.count(|c| *c == MockCall::CreateFence { signaled: true }), 2);
    assert_eq!(state.live_semaphores(), 4);
    assert!(sync.is_fence_signaled(0) && sync.is_fence_signaled(1));
    assert_eq!(sync.image_owner(0), None);
}

#[test]
fn test_wait_on_signaled_fence_skips_device() {
    let (mut device, state) = MockGraphicsDevice::new(800, 600, 3);
    let mut sync = FrameSync::new(&mut device, 2, 3).unwrap();
    state.lock().unwrap().clear_calls();

    assert_eq!(sync.wait_for_slot(&mut device, 0, u64::MAX).unwrap(), FenceStatus::Signaled);
    assert!(state.lock().unwrap().calls.is_empty());
}

#[test]
fn test_wait_after_submit_blocks_once() {
    let (mut device, state) = MockGraphicsDevice::new(800, 600, 3);
    let mut sync = FrameSync::new(&mut device, 2, 3).unwrap();

    sync.assign_image(&mut device, 1, 0).unwrap();
    submit(&mut device, &sync, 1, 0);
    assert!(!sync.is_fence_signaled(0));
    assert_eq!(sync.image_owner(1), Some(0));

    let fence = sync.fence(0).unwrap();
    assert_eq!(sync.wait_for_image(&mut device, 1, u64::MAX).unwrap(), FenceStatus::Signaled);
    assert_eq!(sync.wait_for_slot(&mut device, 0, u64::MAX).unwrap(), FenceStatus::Signaled);

    let state = state.lock().unwrap();
    assert_eq!(state.count(|c| *c == MockCall::WaitFence { fence, blocked: true }), 1);
    assert_eq!(state.count(|c| matches!(c, MockCall::WaitFence { .. })), 1);
    assert!(state.violations.is_empty(), "{:?}", state.violations);
}

#[test]
fn test_assign_requires_waited_fence() {
    let (mut device, state) = MockGraphicsDevice::new(800, 600, 3);
    let mut sync = FrameSync::new(&mut device, 2, 3).unwrap();

    sync.assign_image(&mut device, 0, 0).unwrap();
    submit(&mut device, &sync, 0, 0);

    let result = sync.assign_image(&mut device, 2, 0);
    assert!(matches!(result, Err(Error::InvalidState(_))));
    assert_eq!(sync.image_owner(2), None);
    assert!(state.lock().unwrap().violations.is_empty());
}

#[test]
fn test_assign_out_of_range_image_fails() {
    let (mut device, _state) = MockGraphicsDevice::new(800, 600, 3);
    let mut sync = FrameSync::new(&mut device, 2, 3).unwrap();
    assert!(matches!(sync.assign_image(&mut device, 3, 0), Err(Error::InvalidState(_))));
    assert!(matches!(sync.fence(2), Err(Error::InvalidState(_))));
}

#[test]
fn test_timeout_leaves_fence_unsignaled() {
    let (mut device, state) = MockGraphicsDevice::new(800, 600, 3);
    let mut sync = FrameSync::new(&mut device, 2, 3).unwrap();
    sync.assign_image(&mut device, 0, 1).unwrap();
    submit(&mut device, &sync, 0, 1);

    state.lock().unwrap().timeout_next_wait = true;
    assert_eq!(sync.wait_for_slot(&mut device, 1, 1_000).unwrap(), FenceStatus::Timeout);
    assert!(!sync.is_fence_signaled(1));

    assert_eq!(sync.wait_for_slot(&mut device, 1, 1_000).unwrap(), FenceStatus::Signaled);
    assert!(sync.is_fence_signaled(1));
}

#[test]
fn test_device_lost_during_wait_is_propagated() {
    let (mut device, state) = MockGraphicsDevice::new(800, 600, 3);
    let mut sync = FrameSync::new(&mut device, 2, 3).unwrap();
    sync.assign_image(&mut device, 0, 0).unwrap();
    submit(&mut device, &sync, 0, 0);

    state.lock().unwrap().fail_next_wait = Some(Error::DeviceLost("vkWaitForFences".to_string()));
    assert!(matches!(sync.wait_for_slot(&mut device, 0, u64::MAX), Err(Error::DeviceLost(_))));
}

#[test]
fn test_reset_images_resizes_and_clears_table() {
    let (mut device, _state) = MockGraphicsDevice::new(800, 600, 3);
    let mut sync = FrameSync::new(&mut device, 2, 3).unwrap();
    sync.assign_image(&mut device, 2, 1).unwrap();

    sync.reset_images(4);
    assert_eq!(sync.image_count(), 4);
    assert!((0..4).all(|i| sync.image_owner(i).is_none()));
}

#[test]
fn test_destroy_releases_everything() {
    let (mut device, state) = MockGraphicsDevice::new(800, 600, 3);
    let mut sync = FrameSync::new(&mut device, 2, 3).unwrap();
    sync.destroy(&mut device);

    let state = state.lock().unwrap();
    assert_eq!(sync.slot_count(), 0);
    assert_eq!(state.live_fences(), 0);
    assert_eq!(state.live_semaphores(), 0);
    assert!(state.violations.is_empty());
}
