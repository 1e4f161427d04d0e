/// Per-frame-in-flight synchronization objects
///
/// Each slot owns an image-available semaphore, a queue-complete semaphore
/// and an in-flight fence (created signaled). The image-in-flight table maps
/// a swapchain image index to the slot whose fence last covered that image.
///
/// Fence state is cached on the CPU side: waiting on a fence already known
/// to be signaled does not reach the device, and resetting an unsignaled
/// fence is a no-op.

use crate::error::{Error, Result};
use crate::graphics_device::{FenceKey, FenceStatus, GraphicsDevice, SemaphoreKey};

const SOURCE: &str = "thrianta::FrameSync";

#[derive(Debug, Clone, Copy)]
struct FrameFence {
    key: FenceKey,
    signaled: bool,
}

#[derive(Debug, Clone, Copy)]
struct FrameSlot {
    image_available: SemaphoreKey,
    queue_complete: SemaphoreKey,
    in_flight: FrameFence,
}

#[derive(Debug)]
pub struct FrameSync {
    slots: Vec<FrameSlot>,
    images_in_flight: Vec<Option<usize>>,
}

impl FrameSync {
    pub fn new(device: &mut dyn GraphicsDevice, max_frames_in_flight: usize, image_count: usize) -> Result<Self> {
        let mut sync = Self {
            slots: Vec::with_capacity(max_frames_in_flight),
            images_in_flight: vec![None; image_count],
        };

        for _ in 0..max_frames_in_flight {
            match Self::create_slot(device) {
                Ok(slot) => sync.slots.push(slot),
                Err(e) => {
                    sync.destroy(device);
                    return Err(e);
                }
            }
        }

        crate::engine_debug!(
            SOURCE,
            "Created sync objects for {} frames in flight, {} images",
            max_frames_in_flight, image_count
        );
        Ok(sync)
    }

    fn create_slot(device: &mut dyn GraphicsDevice) -> Result<FrameSlot> {
        let image_available = device.create_semaphore()?;
        let queue_complete = match device.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                device.destroy_semaphore(image_available);
                return Err(e);
            }
        };
        // Signaled so the first wait on each slot returns immediately
        let fence = match device.create_fence(true) {
            Ok(fence) => fence,
            Err(e) => {
                device.destroy_semaphore(queue_complete);
                device.destroy_semaphore(image_available);
                return Err(e);
            }
        };

        Ok(FrameSlot {
            image_available,
            queue_complete,
            in_flight: FrameFence { key: fence, signaled: true },
        })
    }

    /// Destroy every sync object. The device must be idle.
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        for slot in self.slots.drain(..) {
            device.destroy_semaphore(slot.image_available);
            device.destroy_semaphore(slot.queue_complete);
            device.destroy_fence(slot.in_flight.key);
        }
        self.images_in_flight.iter_mut().for_each(|entry| *entry = None);
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn image_count(&self) -> usize {
        self.images_in_flight.len()
    }

    fn slot(&self, slot: usize) -> Result<&FrameSlot> {
        self.slots.get(slot).ok_or_else(|| {
            Error::InvalidState(format!("frame slot {} out of range ({} slots)", slot, self.slots.len()))
        })
    }

    pub fn image_available(&self, slot: usize) -> Result<SemaphoreKey> {
        Ok(self.slot(slot)?.image_available)
    }

    pub fn queue_complete(&self, slot: usize) -> Result<SemaphoreKey> {
        Ok(self.slot(slot)?.queue_complete)
    }

    pub fn fence(&self, slot: usize) -> Result<FenceKey> {
        Ok(self.slot(slot)?.in_flight.key)
    }

    pub fn is_fence_signaled(&self, slot: usize) -> bool {
        self.slots.get(slot).map_or(false, |s| s.in_flight.signaled)
    }

    /// Slot whose fence last covered `image_index`
    pub fn image_owner(&self, image_index: u32) -> Option<usize> {
        self.images_in_flight.get(image_index as usize).copied().flatten()
    }

    /// Wait on a slot's in-flight fence
    ///
    /// Device loss and out-of-memory are propagated; a timeout is logged
    /// and reported so the caller can skip the frame.
    pub fn wait_for_slot(
        &mut self,
        device: &mut dyn GraphicsDevice,
        slot: usize,
        timeout_ns: u64,
    ) -> Result<FenceStatus> {
        let fence = self.slot(slot)?.in_flight;
        if fence.signaled {
            return Ok(FenceStatus::Signaled);
        }

        match device.wait_for_fence(fence.key, timeout_ns)? {
            FenceStatus::Signaled => {
                self.slots[slot].in_flight.signaled = true;
                Ok(FenceStatus::Signaled)
            }
            FenceStatus::Timeout => {
                crate::engine_warn!(SOURCE, "Timed out waiting on the fence of frame slot {}", slot);
                Ok(FenceStatus::Timeout)
            }
        }
    }

    /// Wait on the fence recorded for `image_index`, if any
    pub fn wait_for_image(
        &mut self,
        device: &mut dyn GraphicsDevice,
        image_index: u32,
        timeout_ns: u64,
    ) -> Result<FenceStatus> {
        match self.image_owner(image_index) {
            Some(owner) => self.wait_for_slot(device, owner, timeout_ns),
            None => Ok(FenceStatus::Signaled),
        }
    }

    /// Record `slot` as the user of `image_index` and reset the slot fence
    /// ahead of submission
    ///
    /// The slot fence must already have been waited on.
    pub fn assign_image(&mut self, device: &mut dyn GraphicsDevice, image_index: u32, slot: usize) -> Result<()> {
        let fence = self.slot(slot)?.in_flight;
        if !fence.signaled {
            return Err(Error::InvalidState(format!(
                "fence of frame slot {} reset before it was waited on",
                slot
            )));
        }

        let entry = self.images_in_flight.get_mut(image_index as usize).ok_or_else(|| {
            Error::InvalidState(format!("swapchain image {} out of range", image_index))
        })?;
        *entry = Some(slot);

        device.reset_fence(fence.key)?;
        self.slots[slot].in_flight.signaled = false;
        Ok(())
    }

    /// Forget every image assignment and size the table for `image_count`
    /// images. Done on swapchain recreation, after the device went idle.
    pub fn reset_images(&mut self, image_count: usize) {
        self.images_in_flight.clear();
        self.images_in_flight.resize(image_count, None);
    }

    /// Bring the cached fence state in line after a device-wide idle wait,
    /// which leaves every submitted fence signaled
    pub fn mark_all_signaled(&mut self) {
        for slot in &mut self.slots {
            slot.in_flight.signaled = true;
        }
    }
}

#[cfg(test)]
#[path = "frame_sync_tests.rs"]
mod tests;
