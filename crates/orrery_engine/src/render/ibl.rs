//! # Environment / IBL Precompute
//!
//! One-time bake that turns an equirectangular HDR image into the four maps
//! image-based lighting samples:
//!
//! 1. environment cubemap, one pass per face
//! 2. diffuse irradiance cubemap, one pass per face
//! 3. prefiltered specular cubemap, one pass per face per mip, roughness
//!    rising linearly from 0 at mip 0 to 1 at the last mip
//! 4. BRDF integration LUT, a single full-screen pass
//!
//! Every pass renders into the registry's capture framebuffer. Its depth
//! renderbuffer storage and the viewport are resized to the pass's target
//! size before drawing.

use std::rc::Rc;

use crate::core::config::IblSizes;
use crate::foundation::math::{utils::deg_to_rad, Mat4, Mat4Ext, Vec3};

use super::device::{
    AttachmentPoint, Capability, ClearMask, CubeFace, Filter, GraphicsDevice, TextureDesc, TextureFormat,
    TextureTarget, Wrap,
};
use super::geometry::StaticGeometry;
use super::handles::OwnedTexture;
use super::registry::{ResourceKind, TargetView};
use super::shader::{names, units, ShaderId, ShaderLibrary, ShaderProgram, UniformValue};
use super::texture::{CubeMap, Texture2D};
use super::{RenderError, RenderResult};

/// Results of the bake
#[derive(Debug)]
pub struct IblMaps {
    /// HDR environment as a cubemap
    pub environment: CubeMap,
    /// Cosine-convolved irradiance
    pub irradiance: CubeMap,
    /// Roughness-prefiltered radiance, one roughness per mip
    pub prefilter: CubeMap,
    /// Split-sum BRDF lookup
    pub brdf_lut: Texture2D,
}

/// Bake stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeStage {
    /// Equirectangular to cubemap
    Environment,
    /// Diffuse convolution
    Irradiance,
    /// Specular prefilter
    Prefilter,
    /// BRDF integration
    BrdfLut,
}

impl BakeStage {
    fn shader(self) -> ShaderId {
        match self {
            Self::Environment => ShaderId::EquirectToCube,
            Self::Irradiance => ShaderId::Irradiance,
            Self::Prefilter => ShaderId::Prefilter,
            Self::BrdfLut => ShaderId::BrdfLut,
        }
    }
}

/// One draw of the bake
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BakePass {
    /// Stage the pass belongs to
    pub stage: BakeStage,
    /// Target face; `None` for the 2D LUT
    pub face: Option<CubeFace>,
    /// Target mip level
    pub mip: u32,
    /// Square viewport edge
    pub size: u32,
    /// Roughness uniform, prefilter passes only
    pub roughness: f32,
}

/// Roughness baked into mip `mip` of a `mips`-level prefiltered map
pub fn prefilter_roughness(mip: u32, mips: u32) -> f32 {
    mip as f32 / mips.saturating_sub(1).max(1) as f32
}

/// Plans and runs the bake
#[derive(Debug, Clone, Copy)]
pub struct IblBaker {
    sizes: IblSizes,
}

impl IblBaker {
    /// Baker for the configured resolutions
    pub fn new(sizes: IblSizes) -> Self {
        Self { sizes }
    }

    /// 90 degree square projection covering one cube face
    pub fn capture_projection() -> Mat4 {
        Mat4::perspective_gl(deg_to_rad(90.0), 1.0, 0.1, 10.0)
    }

    /// Views from the origin through each face, in [`CubeFace::ALL`] order
    pub fn capture_views() -> [Mat4; 6] {
        let eye = Vec3::zeros();
        let look = |target: Vec3, up: Vec3| Mat4::look_at_gl(eye, target, up);
        [
            look(Vec3::x(), -Vec3::y()),
            look(-Vec3::x(), -Vec3::y()),
            look(Vec3::y(), Vec3::z()),
            look(-Vec3::y(), -Vec3::z()),
            look(Vec3::z(), -Vec3::y()),
            look(-Vec3::z(), -Vec3::y()),
        ]
    }

    /// Every pass in execution order
    pub fn plan(&self) -> Vec<BakePass> {
        let face_passes = |stage, size| {
            CubeFace::ALL.into_iter().map(move |face| BakePass {
                stage,
                face: Some(face),
                mip: 0,
                size,
                roughness: 0.0,
            })
        };

        let mips = self.sizes.prefilter_mips;
        let base = self.sizes.prefilter;
        let prefilter = (0..mips).flat_map(move |mip| {
            let size = (base >> mip).max(1);
            let roughness = prefilter_roughness(mip, mips);
            CubeFace::ALL.into_iter().map(move |face| BakePass {
                stage: BakeStage::Prefilter,
                face: Some(face),
                mip,
                size,
                roughness,
            })
        });

        face_passes(BakeStage::Environment, self.sizes.environment)
            .chain(face_passes(BakeStage::Irradiance, self.sizes.irradiance))
            .chain(prefilter)
            .chain(std::iter::once(BakePass {
                stage: BakeStage::BrdfLut,
                face: None,
                mip: 0,
                size: self.sizes.brdf_lut,
                roughness: 0.0,
            }))
            .collect()
    }

    /// Run the bake into fresh textures.
    ///
    /// Fails if a bake shader is missing or the capture framebuffer is
    /// incomplete once a color target is attached.
    pub fn bake(
        &self,
        device: &Rc<dyn GraphicsDevice>,
        shaders: &ShaderLibrary,
        geometry: &StaticGeometry,
        capture: &TargetView,
        hdr: &Texture2D,
    ) -> RenderResult<IblMaps> {
        let shader = |id: ShaderId| {
            shaders
                .get(id)
                .ok_or_else(|| RenderError::ShaderBuildFailed(format!("{id:?} unavailable for the environment bake")))
        };
        let programs = [
            shader(ShaderId::EquirectToCube)?,
            shader(ShaderId::Irradiance)?,
            shader(ShaderId::Prefilter)?,
            shader(ShaderId::BrdfLut)?,
        ];

        // prefiltering samples the environment's mips
        let environment = CubeMap::render_target(device, self.sizes.environment, full_mip_count(self.sizes.environment))?;
        let irradiance = CubeMap::render_target(device, self.sizes.irradiance, 1)?;
        let prefilter = CubeMap::render_target(device, self.sizes.prefilter, self.sizes.prefilter_mips)?;
        let lut_desc = TextureDesc::texture_2d(TextureFormat::Rg16F, self.sizes.brdf_lut, self.sizes.brdf_lut)
            .with_filter(Filter::Linear, Filter::Linear)
            .with_wrap(Wrap::ClampToEdge);
        let brdf_lut = OwnedTexture::new(Rc::clone(device), device.create_texture(&lut_desc)?);

        let projection = Self::capture_projection();
        let views = Self::capture_views();
        let fb = capture.framebuffer;

        device.set_capability(Capability::SeamlessCubeMap, true);
        device.bind_framebuffer(Some(fb));

        let mut checked = false;
        let mut current_stage = None;
        for pass in self.plan() {
            let program: &dyn ShaderProgram = programs[pass.stage as usize];
            if current_stage != Some(pass.stage) {
                program.bind();
                match pass.stage {
                    BakeStage::Environment => {
                        device.bind_texture(units::DIFFUSE, TextureTarget::Texture2D, Some(hdr.raw()));
                        program.set_uniform(names::EQUIRECTANGULAR_MAP, UniformValue::Int(units::DIFFUSE as i32));
                    }
                    BakeStage::Irradiance | BakeStage::Prefilter => {
                        device.bind_texture(units::ENVIRONMENT, TextureTarget::CubeMap, Some(environment.raw()));
                        program.set_uniform(names::ENVIRONMENT_MAP, UniformValue::Int(units::ENVIRONMENT as i32));
                    }
                    BakeStage::BrdfLut => {}
                }
                program.set_uniform(names::PROJECTION, UniformValue::Mat4(projection));
                current_stage = Some(pass.stage);
                log::debug!("IBL bake stage {:?} with {:?}", pass.stage, pass.stage.shader());
            }

            let target = match pass.stage {
                BakeStage::Environment => environment.raw(),
                BakeStage::Irradiance => irradiance.raw(),
                BakeStage::Prefilter => prefilter.raw(),
                BakeStage::BrdfLut => brdf_lut.raw(),
            };
            device.attach_texture(fb, AttachmentPoint::Color(0), target, pass.face, pass.mip);
            if !checked {
                if !device.framebuffer_complete(fb) {
                    device.bind_framebuffer(None);
                    return Err(RenderError::IncompleteFramebuffer(ResourceKind::IblCapture.to_string()));
                }
                checked = true;
            }

            device.renderbuffer_storage(capture.depth, TextureFormat::Depth24, pass.size, pass.size);
            device.viewport(0, 0, pass.size as i32, pass.size as i32);
            device.clear(ClearMask::COLOR | ClearMask::DEPTH);

            match pass.face {
                Some(face) => {
                    if pass.stage == BakeStage::Prefilter {
                        program.set_uniform(names::ROUGHNESS, UniformValue::Float(pass.roughness));
                    }
                    program.set_uniform(names::VIEW, UniformValue::Mat4(views[face.index() as usize]));
                    geometry.cube.draw();
                }
                None => geometry.quad.draw(),
            }
        }

        device.bind_framebuffer(None);
        device.generate_mipmaps(environment.raw(), TextureTarget::CubeMap);
        log::info!(
            "Baked environment maps: env {}, irradiance {}, prefilter {}x{} mips, LUT {}",
            self.sizes.environment,
            self.sizes.irradiance,
            self.sizes.prefilter,
            self.sizes.prefilter_mips,
            self.sizes.brdf_lut
        );

        Ok(IblMaps {
            environment,
            irradiance,
            prefilter,
            brdf_lut: Texture2D::from_owned(brdf_lut, self.sizes.brdf_lut, self.sizes.brdf_lut),
        })
    }
}

/// Levels in a complete mip chain for `size`
fn full_mip_count(size: u32) -> u32 {
    u32::BITS - size.max(1).leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::registry::{RenderTargetRegistry, TargetSizes};
    use crate::render::testing::{Call, MockShader, RecordingDevice};
    use crate::core::config::OrreryConfig;
    use approx::assert_relative_eq;

    fn bake_shaders(device: &Rc<RecordingDevice>) -> ShaderLibrary {
        let mut library = ShaderLibrary::new();
        for id in [ShaderId::EquirectToCube, ShaderId::Irradiance, ShaderId::Prefilter, ShaderId::BrdfLut] {
            library.insert(id, Box::new(MockShader::new(id, Rc::clone(device))));
        }
        library
    }

    #[test]
    fn prefilter_roughness_spans_zero_to_one() {
        let roughness: Vec<f32> = (0..5).map(|m| prefilter_roughness(m, 5)).collect();
        assert_eq!(roughness, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(prefilter_roughness(0, 1), 0.0);
    }

    #[test]
    fn plan_has_forty_three_passes() {
        let plan = IblBaker::new(IblSizes::default()).plan();
        assert_eq!(plan.len(), 6 + 6 + 30 + 1);

        let prefilter: Vec<_> = plan.iter().filter(|p| p.stage == BakeStage::Prefilter).collect();
        assert_eq!(prefilter.first().map(|p| p.size), Some(128));
        assert_eq!(prefilter.last().map(|p| (p.size, p.mip)), Some((8, 4)));
        assert_eq!(plan.last().map(|p| (p.stage, p.size)), Some((BakeStage::BrdfLut, 512)));
    }

    #[test]
    fn capture_views_look_down_each_axis() {
        let views = IblBaker::capture_views();
        // +X face: world +X lands on the view's -Z axis
        let forward = views[0].transform_vector(&Vec3::x());
        assert_relative_eq!(forward, -Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn bake_resizes_storage_before_every_pass() {
        let recording = RecordingDevice::shared();
        let device: Rc<dyn GraphicsDevice> = recording.clone();
        let config = OrreryConfig::default();
        let mut registry = RenderTargetRegistry::new(Rc::clone(&device), TargetSizes::from_config(&config));
        let capture = registry.get_or_create(ResourceKind::IblCapture).expect("capture").view();
        let geometry = StaticGeometry::new(&device).expect("geometry");
        let hdr = Texture2D::from_owned(OwnedTexture::new(Rc::clone(&device), 99), 2048, 1024);
        let shaders = bake_shaders(&recording);
        recording.clear_log();

        let maps = IblBaker::new(config.render.ibl)
            .bake(&device, &shaders, &geometry, &capture, &hdr)
            .expect("bake");

        assert_eq!(recording.count(|c| matches!(c, Call::RenderbufferStorage(..))), 43);
        assert_eq!(recording.count(|c| matches!(c, Call::DrawArrays(_, _, 36))), 42);
        assert!(recording.has(|c| *c == Call::Viewport(0, 0, 8, 8)));
        assert!(recording.has(|c| *c == Call::SetUniform(
            ShaderId::Prefilter,
            names::ROUGHNESS.into(),
            UniformValue::Float(0.75)
        )));
        assert!(recording.has(|c| matches!(
            c,
            Call::AttachTexture { texture, level: 4, .. } if *texture == maps.prefilter.raw()
        )));
        assert_eq!(maps.brdf_lut.size(), (512, 512));
    }

    #[test]
    fn environment_gets_a_full_mip_chain_after_capture() {
        let recording = RecordingDevice::shared();
        let device: Rc<dyn GraphicsDevice> = recording.clone();
        let config = OrreryConfig::default();
        let mut registry = RenderTargetRegistry::new(Rc::clone(&device), TargetSizes::from_config(&config));
        let capture = registry.get_or_create(ResourceKind::IblCapture).expect("capture").view();
        let geometry = StaticGeometry::new(&device).expect("geometry");
        let hdr = Texture2D::from_owned(OwnedTexture::new(Rc::clone(&device), 99), 2048, 1024);
        let shaders = bake_shaders(&recording);
        recording.clear_log();

        let maps = IblBaker::new(config.render.ibl)
            .bake(&device, &shaders, &geometry, &capture, &hdr)
            .expect("bake");

        let env = maps.environment.raw();
        let desc = recording.calls().into_iter().find_map(|c| match c {
            Call::CreateTexture(handle, desc) if handle == env => Some(desc),
            _ => None,
        });
        assert_eq!(desc.map(|d| (d.mip_levels, d.min_filter)), Some((11, Filter::LinearMipmapLinear)));

        let last_draw = recording.last_position(|c| matches!(c, Call::DrawArrays(..))).expect("draws");
        let mips = recording.last_position(|c| *c == Call::GenerateMipmaps(env)).expect("mipmaps");
        assert!(mips > last_draw);
        assert_eq!(full_mip_count(1), 1);
    }

    #[test]
    fn incomplete_capture_target_aborts_bake() {
        let recording = RecordingDevice::shared();
        let device: Rc<dyn GraphicsDevice> = recording.clone();
        let config = OrreryConfig::default();
        let mut registry = RenderTargetRegistry::new(Rc::clone(&device), TargetSizes::from_config(&config));
        let capture = registry.get_or_create(ResourceKind::IblCapture).expect("capture").view();
        let geometry = StaticGeometry::new(&device).expect("geometry");
        let hdr = Texture2D::from_owned(OwnedTexture::new(Rc::clone(&device), 99), 2048, 1024);
        recording.set_framebuffers_incomplete(true);

        let result = IblBaker::new(config.render.ibl).bake(&device, &bake_shaders(&recording), &geometry, &capture, &hdr);
        assert!(matches!(result, Err(RenderError::IncompleteFramebuffer(_))));
        assert!(!recording.has(|c| matches!(c, Call::DrawArrays(..))));
    }

    #[test]
    fn missing_bake_shader_is_reported() {
        let recording = RecordingDevice::shared();
        let device: Rc<dyn GraphicsDevice> = recording.clone();
        let geometry = StaticGeometry::new(&device).expect("geometry");
        let hdr = Texture2D::from_owned(OwnedTexture::new(Rc::clone(&device), 99), 2, 1);
        let capture = TargetView {
            framebuffer: 1,
            colors: [crate::render::device::INVALID_HANDLE; 3],
            depth: 2,
            width: 1024,
            height: 1024,
        };
        let result = IblBaker::new(IblSizes::default()).bake(&device, &ShaderLibrary::new(), &geometry, &capture, &hdr);
        assert!(matches!(result, Err(RenderError::ShaderBuildFailed(_))));
    }
}
