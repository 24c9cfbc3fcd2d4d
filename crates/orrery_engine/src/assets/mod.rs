//! Asset loading
//!
//! CPU-side decoding of the files the demo reads: OBJ meshes and LDR/HDR
//! images. Nothing here touches the GPU; uploads happen in `render`.

pub mod image_loader;
pub mod obj_loader;

pub use image_loader::{HdrImageData, ImageData};
pub use obj_loader::{ObjError, ObjLoader};

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Image channel count the texture path cannot upload
    #[error("Unsupported channel count {channels} in {path}")]
    UnsupportedChannels {
        /// Offending file
        path: String,
        /// Channel count found in the file
        channels: u8,
    },
}
