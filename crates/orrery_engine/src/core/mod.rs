//! # Core Engine Module
//!
//! Shared configuration types used by the render core, the OpenGL backend and
//! the demo binary.

pub mod config;

pub use config::{Config, ConfigError, IblSizes, OrreryConfig, RenderConfig, ResourceConfig, WindowConfig};
