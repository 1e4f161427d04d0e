//! Synchronous event bus
//!
//! Listeners register a callback per event code. `fire` walks the listeners
//! of a code in registration order and stops at the first one that reports
//! the event as handled.

use rustc_hash::FxHashMap;

/// Codes below this value are reserved for the engine
pub const MAX_SYSTEM_EVENT_CODE: u16 = 0xFF;

/// Engine-reserved event codes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemEventCode {
    /// Shut the application down on the next frame
    ApplicationQuit = 0x01,
    KeyPressed = 0x02,
    KeyReleased = 0x03,
    ButtonPressed = 0x04,
    ButtonReleased = 0x05,
    MouseMoved = 0x06,
    MouseWheel = 0x07,
    /// Framebuffer resized, carries the new size
    Resized = 0x08,
}

impl From<SystemEventCode> for u16 {
    fn from(code: SystemEventCode) -> Self {
        code as u16
    }
}

/// Payload delivered with an event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventContext {
    None,
    Key(u32),
    Button(u16),
    MouseMoved { x: f32, y: f32 },
    MouseWheel { delta: f32 },
    Resized { width: u32, height: u32 },
    /// Application-defined payload for codes above `MAX_SYSTEM_EVENT_CODE`
    Custom([u8; 16]),
}

/// Identity of a listener, chosen by the caller
pub type ListenerId = u64;

/// Event callback. Returns `true` when the event is handled and must not
/// propagate further.
pub type EventCallback = Box<dyn FnMut(u16, &EventContext) -> bool>;

struct RegisteredListener {
    listener: ListenerId,
    callback: EventCallback,
}

/// Event dispatch table keyed by event code
#[derive(Default)]
pub struct EventBus {
    registered: FxHashMap<u16, Vec<RegisteredListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `code` on behalf of `listener`
    ///
    /// Returns `false` if this listener is already registered for the code.
    pub fn register<F>(&mut self, code: impl Into<u16>, listener: ListenerId, callback: F) -> bool
    where
        F: FnMut(u16, &EventContext) -> bool + 'static,
    {
        let code = code.into();
        let listeners = self.registered.entry(code).or_default();

        if listeners.iter().any(|l| l.listener == listener) {
            crate::engine_warn!(
                "thrianta::Event",
                "Listener {} already registered for event code {}",
                listener, code
            );
            return false;
        }

        listeners.push(RegisteredListener {
            listener,
            callback: Box::new(callback),
        });
        true
    }

    /// Remove `listener` from `code`, keeping the order of the others
    ///
    /// Returns `false` if no such registration exists.
    pub fn unregister(&mut self, code: impl Into<u16>, listener: ListenerId) -> bool {
        let code = code.into();
        let Some(listeners) = self.registered.get_mut(&code) else {
            return false;
        };

        match listeners.iter().position(|l| l.listener == listener) {
            Some(index) => {
                listeners.remove(index);
                if listeners.is_empty() {
                    self.registered.remove(&code);
                }
                true
            }
            None => false,
        }
    }

    /// Dispatch an event. Returns `true` if some listener handled it.
    pub fn fire(&mut self, code: impl Into<u16>, context: EventContext) -> bool {
        let code = code.into();
        let Some(listeners) = self.registered.get_mut(&code) else {
            return false;
        };

        for registered in listeners.iter_mut() {
            if (registered.callback)(code, &context) {
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self, code: impl Into<u16>) -> usize {
        self.registered.get(&code.into()).map_or(0, Vec::len)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
