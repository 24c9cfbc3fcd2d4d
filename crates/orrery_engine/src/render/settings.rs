//! Per-frame render toggles
//!
//! One [`RenderSettings`] value is owned by the application and passed by
//! reference into every frame. The control panel mutates it between frames.

use serde::{Deserialize, Serialize};

/// Surface shading model for forward multi-light rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaterialModel {
    /// Blinn-Phong `Material` block
    #[default]
    Normal,
    /// Metal/roughness `PBR_Material` block with IBL
    Pbr,
}

impl MaterialModel {
    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Pbr => "PBR Material",
        }
    }
}

/// Which environment the background draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnvironmentMode {
    /// No environment pass
    #[default]
    Off,
    /// Six-image skybox
    Skybox,
    /// Baked HDR environment cubemap
    Hdr,
}

/// Feature toggles read by the orchestrator and the shading-path selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Render and sample the shadow map
    pub shadow_enabled: bool,
    /// Percentage-closer filtering on shadow lookups
    pub pcf_enabled: bool,
    /// Light every mesh with the whole light list
    pub multi_light: bool,
    /// Blinn-Phong or PBR
    pub material_model: MaterialModel,
    /// G-buffer, SSAO and a lighting pass instead of forward shading
    pub deferred: bool,
    /// Background environment
    pub environment: EnvironmentMode,
    /// Render offscreen and composite through the post-process shader
    pub post_process: bool,
    /// Untextured meshes use the material colors
    pub use_material: bool,
    /// Advance the celestial chain each frame
    pub animate_bodies: bool,
    /// Draw the celestial bodies
    pub show_bodies: bool,
    /// Draw the top-down minimap
    pub show_minimap: bool,
    /// Draw light position markers
    pub show_light_markers: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadow_enabled: false,
            pcf_enabled: false,
            multi_light: false,
            material_model: MaterialModel::Normal,
            deferred: false,
            environment: EnvironmentMode::Off,
            post_process: false,
            use_material: true,
            animate_bodies: false,
            show_bodies: false,
            show_minimap: true,
            show_light_markers: true,
        }
    }
}

impl RenderSettings {
    /// Every optional feature off, including overlays
    pub fn minimal() -> Self {
        Self {
            show_minimap: false,
            show_light_markers: false,
            ..Self::default()
        }
    }

    /// Whether the PBR model is selected
    pub fn pbr(&self) -> bool {
        self.material_model == MaterialModel::Pbr
    }
}
