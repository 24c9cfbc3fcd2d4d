//! Window contract consumed by the frame loop
//!
//! The backend polls native events in [`WindowSurface::update_input`], turns
//! them into [`InputEvent`]s, runs any registered callbacks and hands the
//! events back to the caller.

use thiserror::Error;

use crate::input::{InputEvent, InputState, KeyAction, KeyCode, Modifiers, MouseButton};

/// Window creation errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// Windowing library failed to start
    #[error("Windowing system initialization failed: {0}")]
    InitFailed(String),
    /// Window or context could not be created
    #[error("Window creation failed: {0}")]
    CreationFailed(String),
}

/// Key callback signature
pub type KeyCallback = Box<dyn FnMut(KeyCode, KeyAction, Modifiers)>;
/// Cursor callback signature
pub type MouseMoveCallback = Box<dyn FnMut(f64, f64)>;
/// Mouse button callback signature
pub type MouseButtonCallback = Box<dyn FnMut(MouseButton, KeyAction)>;

/// Registered input callbacks
#[derive(Default)]
pub struct WindowCallbacks {
    key: Vec<KeyCallback>,
    mouse_move: Vec<MouseMoveCallback>,
    mouse_button: Vec<MouseButtonCallback>,
}

impl WindowCallbacks {
    /// Run every callback interested in `event`
    pub fn dispatch(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Key { key, action, mods } => self.key.iter_mut().for_each(|cb| cb(key, action, mods)),
            InputEvent::CursorMoved { x, y } => self.mouse_move.iter_mut().for_each(|cb| cb(x, y)),
            InputEvent::MouseButton { button, action } => {
                self.mouse_button.iter_mut().for_each(|cb| cb(button, action));
            }
        }
    }
}

/// A presentable window with polled input
pub trait WindowSurface: InputState {
    /// Whether the user asked to close
    fn should_close(&self) -> bool;

    /// Poll native events, run callbacks and return the events
    fn update_input(&mut self) -> Vec<InputEvent>;

    /// Present the default framebuffer
    fn swap_buffers(&mut self);

    /// Default framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Callback storage
    fn callbacks_mut(&mut self) -> &mut WindowCallbacks;

    /// Add a key callback
    fn register_key_callback(&mut self, callback: KeyCallback) {
        self.callbacks_mut().key.push(callback);
    }

    /// Add a cursor-move callback
    fn register_mouse_move_callback(&mut self, callback: MouseMoveCallback) {
        self.callbacks_mut().mouse_move.push(callback);
    }

    /// Add a mouse button callback
    fn register_mouse_button_callback(&mut self, callback: MouseButtonCallback) {
        self.callbacks_mut().mouse_button.push(callback);
    }
}
