//! # Rendering System
//!
//! Multi-pass forward/deferred renderer over an abstract [`GraphicsDevice`].
//!
//! ## Architecture
//!
//! - **Device**: the narrow set of GPU calls the passes issue. The OpenGL
//!   implementation lives in `crate::backend`; tests use a recording double.
//! - **Handles**: move-only owners that release their GPU name on drop
//! - **Registry**: lazily built framebuffers (shadow, G-buffer, SSAO, blur,
//!   post-process, IBL capture), each built at most once
//! - **Selector**: maps [`RenderSettings`] to a [`ShadingPath`]
//! - **IBL**: the environment, irradiance, prefilter and BRDF bake
//! - **Orchestrator**: sequences the passes of one frame
//!
//! Uniform data crosses to the GPU as `#[repr(C)]` std140 blocks in
//! [`uniforms`]; every block has a compile-time size check.

pub mod device;
pub mod geometry;
pub mod handles;
pub mod ibl;
pub mod mesh;
pub mod orchestrator;
pub mod registry;
pub mod selector;
pub mod settings;
pub mod shader;
pub mod texture;
pub mod uniforms;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use device::{GraphicsDevice, RawHandle, ResourceClass, INVALID_HANDLE};
pub use handles::{OwnedBuffer, OwnedFramebuffer, OwnedRenderbuffer, OwnedTexture, OwnedVertexArray};
pub use ibl::{IblBaker, IblMaps};
pub use mesh::{GpuMesh, MeshData, Vertex};
pub use orchestrator::{FrameOrchestrator, FrameReport};
pub use registry::{RenderTarget, RenderTargetRegistry, ResourceKind};
pub use selector::{select_shading_path, ShadingPath};
pub use settings::{EnvironmentMode, MaterialModel, RenderSettings};
pub use shader::{ShaderId, ShaderLibrary, ShaderProgram, UniformValue};
pub use texture::{CubeMap, Texture2D};
pub use window::{WindowCallbacks, WindowError, WindowSurface};

use thiserror::Error;

/// Rendering system errors
///
/// Backend failures are reported as strings so callers never see `glow` or
/// `glfw` types.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    ///
    /// Occurs when the context cannot be created or the configuration is
    /// rejected before the first frame.
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Resource creation or management failed
    ///
    /// Covers textures, buffers and vertex arrays the driver refused to
    /// create, and images that cannot be uploaded.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A shader program failed to compile or link, or is not loaded
    #[error("Shader build failed: {0}")]
    ShaderBuildFailed(String),

    /// A framebuffer did not pass the completeness check
    ///
    /// Carries the resource kind; the registry never retries that kind.
    #[error("Framebuffer incomplete: {0}")]
    IncompleteFramebuffer(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
