//! # Orrery Engine
//!
//! An interactive OpenGL renderer: Blinn-Phong and PBR/IBL shading, shadow
//! mapping, skybox/HDR environments, an optional deferred path with SSAO, and
//! a Sun/Earth/Moon animation.
//!
//! ## Features
//!
//! - **Frame orchestration**: shadow, main, environment, overlay and
//!   post-process passes in a fixed order every frame
//! - **Lazy render targets**: each framebuffer is built once, on first use
//! - **Environment bake**: HDR cubemap, irradiance, prefilter and BRDF LUT
//! - **Celestial chain**: each body orbits the previous one
//! - **Keyboard controls**: every toggle reachable between frames
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use orrery_engine::prelude::*;
//! use orrery_engine::backend::opengl::{GlDevice, GlShader, GlfwWindow};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OrreryConfig::default();
//!     let mut window = GlfwWindow::new(&config.window)?;
//!     let gl = Rc::new(window.load_gl());
//!     let device: Rc<dyn GraphicsDevice> = Rc::new(GlDevice::new(Rc::clone(&gl)));
//!     let shaders = ShaderLibrary::load_all(&config.resources.resolve(&config.resources.shader_dir), |id, vs, fs| {
//!         Ok(Box::new(GlShader::from_files(Rc::clone(&gl), id, vs, fs)?) as Box<dyn ShaderProgram>)
//!     });
//!
//!     let mut scene = SceneState::load(&device, &config);
//!     let mut settings = RenderSettings::default();
//!     let mut controls = ControlPanel::new();
//!     let mut frames = FrameOrchestrator::new(device, shaders, &config)?;
//!     frames.run(&mut scene, &mut settings, &mut window, |events, scene, settings| {
//!         controls.apply(events, scene, settings);
//!     });
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

pub mod core;

pub mod assets;
pub mod backend;
pub mod config;
pub mod controls;
pub mod foundation;
pub mod input;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        controls::ControlPanel,
        core::config::{Config, OrreryConfig},
        foundation::math::{Mat4, Vec3},
        input::{InputEvent, KeyCode, MouseButton},
        render::{
            FrameOrchestrator, FrameReport, GraphicsDevice, RenderError, RenderResult, RenderSettings,
            ShaderLibrary, ShaderProgram, ShadingPath, WindowSurface,
        },
        scene::{CelestialChain, SceneState},
    };
}
