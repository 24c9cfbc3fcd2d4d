//! Input vocabulary shared by the window backend, the cameras and the
//! keyboard control panel.
//!
//! The backend translates its native key and button codes into these enums;
//! nothing above the backend ever sees a glfw type.

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A key
    A,
    /// B key
    B,
    /// C key
    C,
    /// D key
    D,
    /// E key
    E,
    /// F key
    F,
    /// G key
    G,
    /// H key
    H,
    /// I key
    I,
    /// J key
    J,
    /// K key
    K,
    /// L key
    L,
    /// M key
    M,
    /// N key
    N,
    /// O key
    O,
    /// P key
    P,
    /// Q key
    Q,
    /// R key
    R,
    /// S key
    S,
    /// T key
    T,
    /// U key
    U,
    /// V key
    V,
    /// W key
    W,
    /// X key
    X,
    /// Y key
    Y,
    /// Z key
    Z,
    /// Digit row 1
    Num1,
    /// Digit row 2
    Num2,
    /// Digit row 3
    Num3,
    /// Digit row 4
    Num4,
    /// Digit row 5
    Num5,
    /// Digit row 6
    Num6,
    /// Digit row 7
    Num7,
    /// Digit row 8
    Num8,
    /// Digit row 9
    Num9,
    /// Digit row 0
    Num0,
    /// Space key
    Space,
    /// Enter key
    Enter,
    /// Escape key
    Escape,
    /// Tab key
    Tab,
    /// Insert key
    Insert,
    /// Delete key
    Delete,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
}

impl KeyCode {
    /// Digit keys in 1..=9, 0 order, used for indexed selections
    pub const DIGITS: [Self; 10] = [
        Self::Num1,
        Self::Num2,
        Self::Num3,
        Self::Num4,
        Self::Num5,
        Self::Num6,
        Self::Num7,
        Self::Num8,
        Self::Num9,
        Self::Num0,
    ];

    /// Zero-based position of a digit key in [`Self::DIGITS`]
    pub fn digit_index(self) -> Option<usize> {
        Self::DIGITS.iter().position(|&k| k == self)
    }
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}

/// Press/release edge reported by key and button callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Went down this frame
    Press,
    /// Went up this frame
    Release,
    /// Held long enough for key repeat
    Repeat,
}

/// Modifier bits accompanying a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Either shift key held
    pub shift: bool,
    /// Either control key held
    pub control: bool,
    /// Either alt key held
    pub alt: bool,
}

/// Discrete input event queued by the window between polls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Keyboard transition
    Key {
        /// Which key
        key: KeyCode,
        /// Press, release or repeat
        action: KeyAction,
        /// Held modifiers
        mods: Modifiers,
    },
    /// Mouse button transition
    MouseButton {
        /// Which button
        button: MouseButton,
        /// Press or release
        action: KeyAction,
    },
    /// Cursor moved to a new window position
    CursorMoved {
        /// Horizontal position in pixels
        x: f64,
        /// Vertical position in pixels
        y: f64,
    },
}

/// Polled input state
///
/// Cameras read held keys and the cursor through this trait every frame.
pub trait InputState {
    /// Whether a key is currently held
    fn is_key_pressed(&self, key: KeyCode) -> bool;

    /// Whether a mouse button is currently held
    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool;

    /// Cursor position in window pixels
    fn cursor_pos(&self) -> (f64, f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_index_follows_keyboard_row() {
        assert_eq!(KeyCode::Num1.digit_index(), Some(0));
        assert_eq!(KeyCode::Num0.digit_index(), Some(9));
        assert_eq!(KeyCode::A.digit_index(), None);
    }
}
