/// Shared framebuffer size with a change generation
///
/// The window side (an event listener) writes the size, the frame
/// orchestrator reads it at the top of each frame. The generation only
/// advances when the size actually changes, so repeated resize events with
/// the same size cause no recreation.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::event::{EventBus, EventContext, ListenerId, SystemEventCode};

#[derive(Debug, Default)]
struct SizeState {
    width: AtomicU32,
    height: AtomicU32,
    generation: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct FramebufferSize {
    state: Arc<SizeState>,
}

impl FramebufferSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Arc::new(SizeState {
                width: AtomicU32::new(width),
                height: AtomicU32::new(height),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Record a new size. Returns `true` if it differs from the last one.
    pub fn set(&self, width: u32, height: u32) -> bool {
        let old_width = self.state.width.swap(width, Ordering::AcqRel);
        let old_height = self.state.height.swap(height, Ordering::AcqRel);
        if old_width == width && old_height == height {
            return false;
        }
        self.state.generation.fetch_add(1, Ordering::AcqRel);
        true
    }

    pub fn get(&self) -> (u32, u32) {
        (
            self.state.width.load(Ordering::Acquire),
            self.state.height.load(Ordering::Acquire),
        )
    }

    pub fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::Acquire)
    }

    pub fn is_zero_area(&self) -> bool {
        let (width, height) = self.get();
        width == 0 || height == 0
    }

    /// Track `Resized` events on `bus`
    ///
    /// The listener never marks the event handled, so other listeners still
    /// see it.
    pub fn listen(&self, bus: &mut EventBus, listener: ListenerId) -> bool {
        let size = self.clone();
        bus.register(SystemEventCode::Resized, listener, move |_, context| {
            if let EventContext::Resized { width, height } = *context {
                size.set(width, height);
            }
            false
        })
    }
}

#[cfg(test)]
#[path = "framebuffer_size_tests.rs"]
mod tests;
