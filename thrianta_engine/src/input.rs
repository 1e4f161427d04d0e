//! Keyboard and mouse state
//!
//! The platform layer feeds raw input through the `process_*` methods. Each
//! change of state is recorded and fired on the `EventBus` right away;
//! `update` snapshots the current state as the previous one once per frame so
//! callers can detect edges with `is_*` / `was_*`.

use crate::event::{EventBus, EventContext, SystemEventCode};

/// Number of distinct key codes
pub const KEY_COUNT: usize = 256;

/// Engine key codes (virtual-key layout)
pub mod keys {
    pub const BACKSPACE: u8 = 0x08;
    pub const TAB: u8 = 0x09;
    pub const ENTER: u8 = 0x0D;
    pub const SHIFT: u8 = 0x10;
    pub const CONTROL: u8 = 0x11;
    pub const ESCAPE: u8 = 0x1B;
    pub const SPACE: u8 = 0x20;
    pub const LEFT: u8 = 0x25;
    pub const UP: u8 = 0x26;
    pub const RIGHT: u8 = 0x27;
    pub const DOWN: u8 = 0x28;
    /// `0` through `9` follow in order
    pub const DIGIT_0: u8 = 0x30;
    /// `A` through `Z` follow in order
    pub const A: u8 = 0x41;
    /// `F1` through `F12` follow in order
    pub const F1: u8 = 0x70;
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left = 0,
    Right = 1,
    Middle = 2,
}

impl MouseButton {
    pub const COUNT: usize = 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyboardState {
    keys: [bool; KEY_COUNT],
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self { keys: [false; KEY_COUNT] }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MouseState {
    x: i32,
    y: i32,
    buttons: [bool; MouseButton::COUNT],
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    keyboard_current: KeyboardState,
    keyboard_previous: KeyboardState,
    mouse_current: MouseState,
    mouse_previous: MouseState,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current state into the previous state. Call once per frame.
    pub fn update(&mut self) {
        self.keyboard_previous = self.keyboard_current;
        self.mouse_previous = self.mouse_current;
    }

    /// Record a key transition; fires `KeyPressed`/`KeyReleased` only when
    /// the state changes. Returns whether it changed.
    pub fn process_key(&mut self, events: &mut EventBus, key: u8, pressed: bool) -> bool {
        let slot = &mut self.keyboard_current.keys[key as usize];
        if *slot == pressed {
            return false;
        }
        *slot = pressed;

        let code = if pressed {
            SystemEventCode::KeyPressed
        } else {
            SystemEventCode::KeyReleased
        };
        events.fire(code, EventContext::Key(u32::from(key)));
        true
    }

    /// Record a mouse button transition; fires `ButtonPressed`/`ButtonReleased`
    /// only when the state changes
    pub fn process_button(&mut self, events: &mut EventBus, button: MouseButton, pressed: bool) -> bool {
        let slot = &mut self.mouse_current.buttons[button as usize];
        if *slot == pressed {
            return false;
        }
        *slot = pressed;

        let code = if pressed {
            SystemEventCode::ButtonPressed
        } else {
            SystemEventCode::ButtonReleased
        };
        events.fire(code, EventContext::Button(button as u16));
        true
    }

    /// Record the cursor position; fires `MouseMoved` when it differs
    pub fn process_mouse_move(&mut self, events: &mut EventBus, x: i32, y: i32) -> bool {
        if self.mouse_current.x == x && self.mouse_current.y == y {
            return false;
        }
        self.mouse_current.x = x;
        self.mouse_current.y = y;
        events.fire(SystemEventCode::MouseMoved, EventContext::MouseMoved { x: x as f32, y: y as f32 });
        true
    }

    /// Fire `MouseWheel`; the wheel keeps no state
    pub fn process_mouse_wheel(&mut self, events: &mut EventBus, delta: f32) {
        events.fire(SystemEventCode::MouseWheel, EventContext::MouseWheel { delta });
    }

    pub fn is_key_down(&self, key: u8) -> bool {
        self.keyboard_current.keys[key as usize]
    }

    pub fn is_key_up(&self, key: u8) -> bool {
        !self.is_key_down(key)
    }

    pub fn was_key_down(&self, key: u8) -> bool {
        self.keyboard_previous.keys[key as usize]
    }

    pub fn was_key_up(&self, key: u8) -> bool {
        !self.was_key_down(key)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.mouse_current.buttons[button as usize]
    }

    pub fn is_button_up(&self, button: MouseButton) -> bool {
        !self.is_button_down(button)
    }

    pub fn was_button_down(&self, button: MouseButton) -> bool {
        self.mouse_previous.buttons[button as usize]
    }

    pub fn was_button_up(&self, button: MouseButton) -> bool {
        !self.was_button_down(button)
    }

    pub fn mouse_position(&self) -> (i32, i32) {
        (self.mouse_current.x, self.mouse_current.y)
    }

    pub fn previous_mouse_position(&self) -> (i32, i32) {
        (self.mouse_previous.x, self.mouse_previous.y)
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
