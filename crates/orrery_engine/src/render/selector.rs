//! Shading-path selection
//!
//! A pure mapping from the three toggles that matter (deferred, multi-light,
//! material model) to the draw sequence used for the main pass. Deferred
//! wins over everything; PBR only applies to forward multi-light rendering.

use super::settings::RenderSettings;
use super::shader::ShaderId;

/// Main-pass draw sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingPath {
    /// `draw_lit(shader, Light, multi = false)`
    ForwardSingleLight {
        /// Program bound per mesh
        shader: ShaderId,
    },
    /// `draw_lit(shader, lights, multi = true)`
    ForwardMultiLight {
        /// Program bound per mesh
        shader: ShaderId,
    },
    /// `draw_pbr(shader, PBR_Material, lights)`
    Pbr {
        /// Program bound per mesh
        shader: ShaderId,
    },
    /// G-buffer fill, screen-space lighting, then light markers
    Deferred {
        /// Writes position, normal and albedo
        geometry: ShaderId,
        /// Reads the G-buffer
        lighting: ShaderId,
        /// Draws lights after the depth blit
        markers: ShaderId,
    },
}

impl ShadingPath {
    /// Programs this path binds, in the order it binds them
    pub fn shaders(&self) -> Vec<ShaderId> {
        match *self {
            Self::ForwardSingleLight { shader } | Self::ForwardMultiLight { shader } | Self::Pbr { shader } => {
                vec![shader]
            }
            Self::Deferred {
                geometry,
                lighting,
                markers,
            } => vec![geometry, ShaderId::Ssao, ShaderId::SsaoBlur, lighting, markers],
        }
    }

    /// Program for the point-light markers drawn after the main pass
    pub fn marker_shader(&self) -> ShaderId {
        match *self {
            Self::Deferred { markers, .. } => markers,
            _ => ShaderId::LightMarker,
        }
    }

    /// Whether the path renders through the G-buffer
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}

/// Choose the main-pass path for `settings`
pub fn select_shading_path(settings: &RenderSettings) -> ShadingPath {
    match (settings.deferred, settings.multi_light, settings.pbr()) {
        (true, _, _) => ShadingPath::Deferred {
            geometry: ShaderId::GeometryPass,
            lighting: ShaderId::LightingPass,
            markers: ShaderId::LightMarker,
        },
        (false, false, _) => ShadingPath::ForwardSingleLight {
            shader: ShaderId::Default,
        },
        (false, true, false) => ShadingPath::ForwardMultiLight {
            shader: ShaderId::MultiLight,
        },
        (false, true, true) => ShadingPath::Pbr { shader: ShaderId::Pbr },
    }
}
