//! Foundation module - Core utilities and types
//!
//! - Math types and matrix builders
//! - Logging setup

pub mod logging;
pub mod math;
