//! OpenGL backend
//!
//! One `glow::Context` is shared through an `Rc` by the device and every
//! shader program. All objects are created and destroyed on the thread that
//! owns the glfw context.

mod device;
mod shader;
mod window;

pub use device::GlDevice;
pub use shader::GlShader;
pub use window::GlfwWindow;

use std::num::NonZeroU32;

use crate::render::device::{RawHandle, INVALID_HANDLE};

/// Backend name from a core handle; [`INVALID_HANDLE`] and 0 map to `None`
fn native<T>(handle: RawHandle, wrap: impl FnOnce(NonZeroU32) -> T) -> Option<T> {
    if handle == INVALID_HANDLE {
        return None;
    }
    NonZeroU32::new(handle).map(wrap)
}
