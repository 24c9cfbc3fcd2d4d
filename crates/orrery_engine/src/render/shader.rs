//! Shader program contract, the program catalogue and the fixed name/unit
//! vocabulary shared with the GLSL sources.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::foundation::math::{Mat3, Mat4};

use super::device::RawHandle;
use super::RenderResult;

/// Opaque uniform location returned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Value written to a plain (non-block) uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `int` or sampler unit
    Int(i32),
    /// `bool`, written as an int
    Bool(bool),
    /// `float`
    Float(f32),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `mat3`, column-major
    Mat3(Mat3),
    /// `mat4`, column-major
    Mat4(Mat4),
}

/// A linked program as seen by the render core
pub trait ShaderProgram {
    /// Make this the current program
    fn bind(&self);

    /// Location of a uniform, `None` when it is absent or optimized out
    fn uniform_location(&self, name: &str) -> Option<UniformLocation>;

    /// Write a uniform at a known location
    fn set_uniform_at(&self, location: UniformLocation, value: UniformValue);

    /// Point the named uniform block at `binding` and bind `buffer` there
    fn bind_uniform_block(&self, block: &str, binding: u32, buffer: RawHandle);

    /// Write a uniform by name; missing names are skipped
    fn set_uniform(&self, name: &str, value: UniformValue) {
        if let Some(location) = self.uniform_location(name) {
            self.set_uniform_at(location, value);
        } else {
            log::trace!("Uniform '{name}' not active, skipping");
        }
    }
}

/// Uniform and block names used by the GLSL sources
pub mod names {
    /// Model-view-projection matrix
    pub const MVP_MATRIX: &str = "mvpMatrix";
    /// Inverse-transpose model matrix
    pub const NORMAL_MODEL_MATRIX: &str = "normalModelMatrix";
    /// Model matrix
    pub const MODEL_MATRIX: &str = "modelMatrix";
    /// Camera position
    pub const VIEW_POS: &str = "viewPos";
    /// Light-space MVP for shadow lookup
    pub const LIGHT_MVP: &str = "lightMVP";
    /// Shadow map sampler
    pub const TEX_SHADOW: &str = "texShadow";
    /// Diffuse sampler
    pub const COLOR_MAP: &str = "colorMap";
    /// Normal map sampler
    pub const NORMAL_MAP: &str = "normalMap";
    /// Whether the mesh carries UVs
    pub const HAS_TEX_COORDS: &str = "hasTexCoords";
    /// Use material colors when untextured
    pub const USE_MATERIAL: &str = "useMaterial";
    /// Light marker clip position
    pub const POS: &str = "pos";
    /// Flat color
    pub const COLOR: &str = "color";
    /// Post-process input sampler
    pub const SCENE: &str = "scene";
    /// View matrix
    pub const VIEW: &str = "view";
    /// Projection matrix
    pub const PROJECTION: &str = "projection";
    /// Environment cubemap sampler
    pub const ENVIRONMENT_MAP: &str = "environmentMap";
    /// Equirectangular HDR sampler
    pub const EQUIRECTANGULAR_MAP: &str = "equirectangularMap";
    /// Prefilter roughness
    pub const ROUGHNESS: &str = "roughness";
    /// Irradiance cubemap sampler
    pub const IRRADIANCE_MAP: &str = "irradianceMap";
    /// Prefiltered cubemap sampler
    pub const PREFILTER_MAP: &str = "prefilterMap";
    /// BRDF lookup sampler
    pub const BRDF_LUT: &str = "brdfLUT";
    /// G-buffer position sampler
    pub const G_POSITION: &str = "gPosition";
    /// G-buffer normal sampler
    pub const G_NORMAL: &str = "gNormal";
    /// G-buffer albedo sampler
    pub const G_ALBEDO: &str = "gAlbedo";
    /// Occlusion sampler
    pub const SSAO: &str = "ssao";
    /// Rotation noise sampler
    pub const TEX_NOISE: &str = "texNoise";
    /// Hemisphere kernel array prefix
    pub const SAMPLES: &str = "samples";
    /// Live light count for the array block
    pub const LIGHT_COUNT: &str = "lightCount";

    /// Blinn-Phong material block
    pub const MATERIAL_BLOCK: &str = "Material";
    /// Single light block
    pub const LIGHT_BLOCK: &str = "Light";
    /// Light array block
    pub const LIGHTS_BLOCK: &str = "lights";
    /// PBR material block
    pub const PBR_MATERIAL_BLOCK: &str = "PBR_Material";
    /// Shadow toggles block
    pub const SHADOW_SETTINGS_BLOCK: &str = "shadowSettings";

    /// `samples[i]`
    pub fn sample(index: usize) -> String {
        format!("{SAMPLES}[{index}]")
    }
}

/// Fixed texture units
pub mod units {
    /// Diffuse / color input
    pub const DIFFUSE: u32 = 0;
    /// Shadow map
    pub const SHADOW: u32 = 1;
    /// Normal map
    pub const NORMAL: u32 = 3;
    /// BRDF lookup table
    pub const BRDF_LUT: u32 = 10;
    /// Irradiance cubemap
    pub const IRRADIANCE: u32 = 11;
    /// Prefiltered cubemap
    pub const PREFILTER: u32 = 12;
    /// G-buffer position
    pub const G_POSITION: u32 = 13;
    /// G-buffer normal
    pub const G_NORMAL: u32 = 14;
    /// G-buffer albedo
    pub const G_ALBEDO: u32 = 15;
    /// Blurred occlusion
    pub const SSAO: u32 = 16;
    /// Rotation noise
    pub const NOISE: u32 = 17;
    /// Environment cubemap
    pub const ENVIRONMENT: u32 = 20;
}

/// Uniform-block binding points
pub mod bindings {
    /// `Material` / `PBR_Material`
    pub const MATERIAL: u32 = 0;
    /// `Light` / `lights`
    pub const LIGHTS: u32 = 1;
    /// `shadowSettings`
    pub const SHADOW_SETTINGS: u32 = 2;
}

/// Every program the renderer builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderId {
    /// Forward Blinn-Phong, one light
    Default,
    /// Forward Blinn-Phong over the light array
    MultiLight,
    /// Forward metal/roughness with IBL
    Pbr,
    /// Depth-only light view
    Shadow,
    /// Light position markers
    LightMarker,
    /// Minimap border
    Border,
    /// Minimap camera dot
    Point,
    /// Full-screen post-process
    PostProcess,
    /// Six-image skybox
    Skybox,
    /// HDR environment background
    Background,
    /// Equirectangular to cubemap bake
    EquirectToCube,
    /// Diffuse irradiance bake
    Irradiance,
    /// Specular prefilter bake
    Prefilter,
    /// BRDF integration bake
    BrdfLut,
    /// Deferred geometry pass
    GeometryPass,
    /// Deferred lighting pass
    LightingPass,
    /// Ambient occlusion
    Ssao,
    /// Occlusion blur
    SsaoBlur,
}

impl ShaderId {
    /// Every program, in build order
    pub const ALL: [Self; 18] = [
        Self::Default,
        Self::MultiLight,
        Self::Pbr,
        Self::Shadow,
        Self::LightMarker,
        Self::Border,
        Self::Point,
        Self::PostProcess,
        Self::Skybox,
        Self::Background,
        Self::EquirectToCube,
        Self::Irradiance,
        Self::Prefilter,
        Self::BrdfLut,
        Self::GeometryPass,
        Self::LightingPass,
        Self::Ssao,
        Self::SsaoBlur,
    ];

    /// File stem shared by the vertex and fragment sources
    pub fn stem(self) -> &'static str {
        match self {
            Self::Default => "shader",
            Self::MultiLight => "multi_light",
            Self::Pbr => "pbr",
            Self::Shadow => "shadow",
            Self::LightMarker => "light",
            // the camera dot reuses the border sources
            Self::Border | Self::Point => "border",
            Self::PostProcess => "postProcess",
            Self::Skybox => "skybox",
            Self::Background => "background",
            Self::EquirectToCube => "equirect_to_cube",
            Self::Irradiance => "irradiance",
            Self::Prefilter => "prefilter",
            Self::BrdfLut => "brdf",
            Self::GeometryPass => "g_buffer",
            Self::LightingPass => "deferred_lighting",
            Self::Ssao => "ssao",
            Self::SsaoBlur => "ssao_blur",
        }
    }

    /// `(vertex, fragment)` source paths under `dir`.
    ///
    /// Screen-space programs share the full-screen quad vertex stage.
    pub fn source_paths(self, dir: &Path) -> (PathBuf, PathBuf) {
        let vertex_stem = match self {
            Self::Ssao | Self::SsaoBlur | Self::LightingPass | Self::BrdfLut => "screen_quad",
            Self::Irradiance | Self::Prefilter => "cubemap",
            other => other.stem(),
        };
        (
            dir.join(format!("{vertex_stem}_vert.glsl")),
            dir.join(format!("{}_frag.glsl", self.stem())),
        )
    }
}

/// Built programs keyed by [`ShaderId`]
///
/// A program that fails to build is logged and left out; every feature that
/// needs it then no-ops.
#[derive(Default)]
pub struct ShaderLibrary {
    programs: HashMap<ShaderId, Box<dyn ShaderProgram>>,
}

impl ShaderLibrary {
    /// Empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every program in [`ShaderId::ALL`] from `dir` with `build`
    pub fn load_all<F>(dir: &Path, mut build: F) -> Self
    where
        F: FnMut(ShaderId, &Path, &Path) -> RenderResult<Box<dyn ShaderProgram>>,
    {
        let mut library = Self::new();
        for id in ShaderId::ALL {
            let (vertex, fragment) = id.source_paths(dir);
            match build(id, &vertex, &fragment) {
                Ok(program) => library.insert(id, program),
                Err(e) => log::error!("Shader {:?} unavailable: {e}", id),
            }
        }
        log::info!("Built {}/{} shader programs", library.len(), ShaderId::ALL.len());
        library
    }

    /// Register a program
    pub fn insert(&mut self, id: ShaderId, program: Box<dyn ShaderProgram>) {
        self.programs.insert(id, program);
    }

    /// Look up a program
    pub fn get(&self, id: ShaderId) -> Option<&dyn ShaderProgram> {
        self.programs.get(&id).map(Box::as_ref)
    }

    /// Number of built programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether nothing built
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
