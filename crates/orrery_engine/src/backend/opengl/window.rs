//! GLFW window with an OpenGL core context

use glfw::{Action, Context, Key, WindowEvent};

use crate::core::config::WindowConfig;
use crate::input::{InputEvent, InputState, KeyAction, KeyCode, Modifiers, MouseButton};
use crate::render::window::{WindowCallbacks, WindowError, WindowSurface};

/// GLFW window wrapper with proper resource management
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, WindowEvent)>,
    callbacks: WindowCallbacks,
}

impl GlfwWindow {
    /// Open a window and make its core context current
    pub fn new(config: &WindowConfig) -> Result<Self, WindowError> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|e| WindowError::InitFailed(format!("{e:?}")))?;

        glfw.window_hint(glfw::WindowHint::ContextVersion(config.gl_version.0, config.gl_version.1));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::Resizable(false));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or_else(|| WindowError::CreationFailed(format!("{}x{}", config.width, config.height)))?;

        window.make_current();
        window.set_key_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_mouse_button_polling(true);
        window.set_close_polling(true);
        glfw.set_swap_interval(if config.vsync {
            glfw::SwapInterval::Sync(1)
        } else {
            glfw::SwapInterval::None
        });

        log::info!("Window '{}' {}x{} created", config.title, config.width, config.height);
        Ok(Self {
            glfw,
            window,
            events,
            callbacks: WindowCallbacks::default(),
        })
    }

    /// Load GL function pointers from the current context
    pub fn load_gl(&mut self) -> glow::Context {
        unsafe { glow::Context::from_loader_function(|name| self.window.get_proc_address(name) as *const _) }
    }

    fn translate(&mut self, event: WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::Key(Key::Escape, _, Action::Press, _) => {
                self.window.set_should_close(true);
                None
            }
            WindowEvent::Key(key, _, action, mods) => Some(InputEvent::Key {
                key: key_code(key)?,
                action: key_action(action),
                mods: Modifiers {
                    shift: mods.contains(glfw::Modifiers::Shift),
                    control: mods.contains(glfw::Modifiers::Control),
                    alt: mods.contains(glfw::Modifiers::Alt),
                },
            }),
            WindowEvent::MouseButton(button, action, _) => Some(InputEvent::MouseButton {
                button: mouse_button(button)?,
                action: key_action(action),
            }),
            WindowEvent::CursorPos(x, y) => Some(InputEvent::CursorMoved { x, y }),
            _ => None,
        }
    }
}

fn key_action(action: Action) -> KeyAction {
    match action {
        Action::Press => KeyAction::Press,
        Action::Release => KeyAction::Release,
        Action::Repeat => KeyAction::Repeat,
    }
}

fn mouse_button(button: glfw::MouseButton) -> Option<MouseButton> {
    match button {
        glfw::MouseButtonLeft => Some(MouseButton::Left),
        glfw::MouseButtonRight => Some(MouseButton::Right),
        glfw::MouseButtonMiddle => Some(MouseButton::Middle),
        _ => None,
    }
}

fn glfw_button(button: MouseButton) -> glfw::MouseButton {
    match button {
        MouseButton::Left => glfw::MouseButtonLeft,
        MouseButton::Right => glfw::MouseButtonRight,
        MouseButton::Middle => glfw::MouseButtonMiddle,
    }
}

/// Paired native and engine key codes
const KEY_MAP: [(Key, KeyCode); 46] = [
    (Key::A, KeyCode::A),
    (Key::B, KeyCode::B),
    (Key::C, KeyCode::C),
    (Key::D, KeyCode::D),
    (Key::E, KeyCode::E),
    (Key::F, KeyCode::F),
    (Key::G, KeyCode::G),
    (Key::H, KeyCode::H),
    (Key::I, KeyCode::I),
    (Key::J, KeyCode::J),
    (Key::K, KeyCode::K),
    (Key::L, KeyCode::L),
    (Key::M, KeyCode::M),
    (Key::N, KeyCode::N),
    (Key::O, KeyCode::O),
    (Key::P, KeyCode::P),
    (Key::Q, KeyCode::Q),
    (Key::R, KeyCode::R),
    (Key::S, KeyCode::S),
    (Key::T, KeyCode::T),
    (Key::U, KeyCode::U),
    (Key::V, KeyCode::V),
    (Key::W, KeyCode::W),
    (Key::X, KeyCode::X),
    (Key::Y, KeyCode::Y),
    (Key::Z, KeyCode::Z),
    (Key::Num1, KeyCode::Num1),
    (Key::Num2, KeyCode::Num2),
    (Key::Num3, KeyCode::Num3),
    (Key::Num4, KeyCode::Num4),
    (Key::Num5, KeyCode::Num5),
    (Key::Num6, KeyCode::Num6),
    (Key::Num7, KeyCode::Num7),
    (Key::Num8, KeyCode::Num8),
    (Key::Num9, KeyCode::Num9),
    (Key::Num0, KeyCode::Num0),
    (Key::Space, KeyCode::Space),
    (Key::Enter, KeyCode::Enter),
    (Key::Escape, KeyCode::Escape),
    (Key::Tab, KeyCode::Tab),
    (Key::Insert, KeyCode::Insert),
    (Key::Delete, KeyCode::Delete),
    (Key::Up, KeyCode::Up),
    (Key::Down, KeyCode::Down),
    (Key::Left, KeyCode::Left),
    (Key::Right, KeyCode::Right),
];

fn key_code(key: Key) -> Option<KeyCode> {
    KEY_MAP.iter().find(|(native, _)| *native == key).map(|&(_, code)| code)
}

fn glfw_key(code: KeyCode) -> Option<Key> {
    KEY_MAP.iter().find(|(_, c)| *c == code).map(|&(native, _)| native)
}

impl InputState for GlfwWindow {
    fn is_key_pressed(&self, key: KeyCode) -> bool {
        glfw_key(key).is_some_and(|k| self.window.get_key(k) == Action::Press)
    }

    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.window.get_mouse_button(glfw_button(button)) == Action::Press
    }

    fn cursor_pos(&self) -> (f64, f64) {
        self.window.get_cursor_pos()
    }
}

impl WindowSurface for GlfwWindow {
    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn update_input(&mut self) -> Vec<InputEvent> {
        self.glfw.poll_events();
        let native: Vec<WindowEvent> = glfw::flush_messages(&self.events).map(|(_, event)| event).collect();
        let events: Vec<InputEvent> = native.into_iter().filter_map(|event| self.translate(event)).collect();
        for event in &events {
            self.callbacks.dispatch(event);
        }
        events
    }

    fn swap_buffers(&mut self) {
        self.window.swap_buffers();
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    fn callbacks_mut(&mut self) -> &mut WindowCallbacks {
        &mut self.callbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_engine_key_has_a_native_key() {
        let unmapped: Vec<_> = KeyCode::DIGITS
            .iter()
            .chain([KeyCode::W, KeyCode::R, KeyCode::F, KeyCode::Insert].iter())
            .filter(|&&k| glfw_key(k).is_none())
            .collect();
        assert!(unmapped.is_empty(), "{unmapped:?}");
    }

    #[test]
    fn unknown_native_keys_are_dropped() {
        assert_eq!(key_code(Key::F12), None);
        assert_eq!(key_code(Key::Num0), Some(KeyCode::Num0));
    }
}
