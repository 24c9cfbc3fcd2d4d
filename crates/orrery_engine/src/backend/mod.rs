//! # Backend Module
//!
//! Concrete implementations of the render core's contracts.
//!
//! ## Organization
//!
//! - **OpenGL**: [`GraphicsDevice`](crate::render::GraphicsDevice) over `glow`,
//!   shader programs built from GLSL files, and a `glfw` window implementing
//!   [`WindowSurface`](crate::render::WindowSurface)
//!
//! Nothing outside this module names a `glow` or `glfw` type.

// Every GL entry point is an FFI call.
#[cfg(feature = "opengl")]
#[allow(unsafe_code)]
pub mod opengl;
