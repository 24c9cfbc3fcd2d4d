//! # Unified Configuration
//!
//! Every tunable the demo reads at startup lives here: window geometry, the
//! fixed render-target sizes, IBL bake resolutions and resource paths. Values
//! load from TOML or RON through [`Config`] and are validated once before the
//! render core sees them.
//!
//! Render targets are sized from this config exactly once (see
//! `render::registry`); changing the window size at runtime does not resize
//! them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::config::{Config, ConfigError};

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Requested OpenGL major/minor version
    pub gl_version: (u32, u32),
    /// Whether to sync buffer swaps to the display refresh
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Final Project".to_string(),
            width: 1024,
            height: 1024,
            gl_version: (4, 1),
            vsync: true,
        }
    }
}

/// Resolutions used by the environment bake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IblSizes {
    /// Edge length of each environment cubemap face
    pub environment: u32,
    /// Edge length of each irradiance cubemap face
    pub irradiance: u32,
    /// Edge length of mip 0 of the prefiltered specular cubemap
    pub prefilter: u32,
    /// Number of prefiltered mip levels
    pub prefilter_mips: u32,
    /// Edge length of the BRDF lookup texture
    pub brdf_lut: u32,
}

impl Default for IblSizes {
    fn default() -> Self {
        Self {
            environment: 1024,
            irradiance: 32,
            prefilter: 128,
            prefilter_mips: 5,
            brdf_lut: 512,
        }
    }
}

/// Fixed sizes of the offscreen targets and projection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// G-buffer and SSAO target size
    pub screen_size: (u32, u32),
    /// Shadow map edge length
    pub shadow_map_size: u32,
    /// Vertical field of view of the main projection, in degrees
    pub fov_degrees: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Clear color for the scene target
    pub clear_color: [f32; 4],
    /// Minimap viewport as (x, y, width, height)
    pub minimap_viewport: (i32, i32, i32, i32),
    /// Number of SSAO hemisphere samples
    pub ssao_kernel_size: usize,
    /// Environment bake resolutions
    pub ibl: IblSizes,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            screen_size: (1920, 1080),
            shadow_map_size: 1024,
            fov_degrees: 80.0,
            near: 0.1,
            far: 30.0,
            clear_color: [0.2, 0.2, 0.2, 1.0],
            minimap_viewport: (800, 800, 200, 200),
            ssao_kernel_size: 64,
            ibl: IblSizes::default(),
        }
    }
}

/// Paths to everything loaded from disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Root that every other path is resolved against
    pub root: PathBuf,
    /// Directory holding `<name>_vert.glsl` / `<name>_frag.glsl` pairs
    pub shader_dir: PathBuf,
    /// Main scene mesh
    pub mesh: PathBuf,
    /// Sphere used for the celestial bodies
    pub body_mesh: PathBuf,
    /// Diffuse texture for textured meshes
    pub diffuse_texture: PathBuf,
    /// Equirectangular HDR environment
    pub hdr_environment: PathBuf,
    /// Six skybox faces in +X, -X, +Y, -Y, +Z, -Z order
    pub skybox_faces: Vec<PathBuf>,
    /// File name looked up inside each celestial body's texture directory
    pub body_texture_file: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        let skybox = ["right", "left", "top", "bottom", "front", "back"]
            .iter()
            .map(|face| PathBuf::from(format!("resources/skybox/{face}.jpg")))
            .collect();
        Self {
            root: PathBuf::from("."),
            shader_dir: PathBuf::from("shaders"),
            mesh: PathBuf::from("resources/dragon.obj"),
            body_mesh: PathBuf::from("resources/sphere.obj"),
            diffuse_texture: PathBuf::from("resources/checkerboard.png"),
            hdr_environment: PathBuf::from("resources/environment.hdr"),
            skybox_faces: skybox,
            body_texture_file: "albedo.png".to_string(),
        }
    }
}

impl ResourceConfig {
    /// Resolve a configured path against the resource root
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

/// Top-level configuration for the orrery demo
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrreryConfig {
    /// Window parameters
    pub window: WindowConfig,
    /// Render target sizes and projection
    pub render: RenderConfig,
    /// Resource locations
    pub resources: ResourceConfig,
}

impl Config for OrreryConfig {}

impl OrreryConfig {
    /// Set window size
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    /// Set the resource root directory
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resources.root = root.into();
        self
    }

    /// Set the shadow map edge length
    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.render.shadow_map_size = size;
        self
    }

    /// Set environment bake resolutions
    pub fn with_ibl_sizes(mut self, sizes: IblSizes) -> Self {
        self.render.ibl = sizes;
        self
    }

    /// Aspect ratio of the main window
    pub fn aspect_ratio(&self) -> f32 {
        self.window.width as f32 / self.window.height.max(1) as f32
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.window.width == 0 || self.window.height == 0 {
            return invalid("window dimensions must be non-zero");
        }
        if self.render.screen_size.0 == 0 || self.render.screen_size.1 == 0 {
            return invalid("screen size must be non-zero");
        }
        if self.render.shadow_map_size == 0 {
            return invalid("shadow map size must be non-zero");
        }
        if !(self.render.near > 0.0 && self.render.far > self.render.near) {
            return invalid("clip planes must satisfy 0 < near < far");
        }
        let ibl = &self.render.ibl;
        if ibl.prefilter_mips == 0 {
            return invalid("prefiltered map needs at least one mip level");
        }
        if ibl.prefilter >> (ibl.prefilter_mips - 1) == 0 {
            return invalid("prefiltered base size too small for its mip count");
        }
        if self.resources.skybox_faces.len() != 6 {
            return invalid("skybox needs exactly six faces");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = OrreryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.render.shadow_map_size, 1024);
        assert_eq!(config.render.ibl.prefilter_mips, 5);
        assert_eq!(config.window.width, 1024);
    }

    #[test]
    fn rejects_mip_chain_longer_than_base_size() {
        let config = OrreryConfig::default().with_ibl_sizes(IblSizes {
            prefilter: 8,
            prefilter_mips: 5,
            ..IblSizes::default()
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn toml_file_round_trip() {
        let path = std::env::temp_dir().join(format!("orrery-config-{}.toml", std::process::id()));
        let config = OrreryConfig::default()
            .with_window_size(800, 600)
            .with_resource_root("/tmp/assets");

        config.save_to_file(&path).expect("save");
        let loaded = OrreryConfig::load_from_file(&path).expect("load");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = OrreryConfig::default().save_to_file("config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }
}
