//! Scene state
//!
//! Everything the frame loop reads or animates: cameras, lights, materials,
//! uploaded meshes, the celestial chain and the textures sampled by the
//! optional passes. The orchestrator borrows a [`SceneState`] mutably for one
//! frame at a time; the control panel edits it between frames.
//!
//! ## Loading
//!
//! [`SceneState::load`] reads every asset named in the configuration. Missing
//! files never abort startup: meshes fall back to built-in shapes and
//! textures are left unset, which disables the features that sample them.

pub mod camera;
pub mod celestial;
pub mod lighting;
pub mod material;
pub mod minimap;

pub use camera::{BezierPath, Camera};
pub use celestial::{CelestialBody, CelestialChain};
pub use lighting::{Light, LightSet};
pub use material::{Material, MaterialPreset, PbrMaterial};
pub use minimap::Minimap;

use std::rc::Rc;

use crate::assets::ObjLoader;
use crate::core::config::OrreryConfig;
use crate::foundation::math::{utils::deg_to_rad, Mat4, Mat4Ext, Vec3};
use crate::render::device::GraphicsDevice;
use crate::render::ibl::IblMaps;
use crate::render::mesh::{GpuMesh, MeshData};
use crate::render::texture::{CubeMap, Texture2D};

/// Textures sampled by optional passes; `None` disables the pass
#[derive(Debug, Default)]
pub struct SceneTextures {
    /// Color map for meshes with texture coordinates
    pub diffuse: Option<Texture2D>,
    /// Six-face skybox
    pub skybox: Option<CubeMap>,
    /// Equirectangular HDR source of the environment bake
    pub hdr: Option<Texture2D>,
}

/// Per-frame scene data
pub struct SceneState {
    /// Every camera; exactly one is selected
    pub cameras: Vec<Camera>,
    selected_camera: usize,
    /// Editable light list
    pub lights: LightSet,
    /// Blinn-Phong material applied to the scene meshes
    pub material: Material,
    /// Last applied preset, if any
    pub preset: Option<MaterialPreset>,
    /// Metal/roughness material for the PBR path
    pub pbr_material: PbrMaterial,
    /// Scene meshes drawn by every path
    pub meshes: Vec<GpuMesh>,
    /// Sphere drawn once per celestial body
    pub body_mesh: Option<GpuMesh>,
    /// Sun, Earth and Moon
    pub bodies: CelestialChain,
    /// One optional texture per body, in chain order
    pub body_textures: Vec<Option<Texture2D>>,
    /// Textures for the optional passes
    pub textures: SceneTextures,
    /// Baked environment maps, once available
    pub ibl: Option<IblMaps>,
    /// Set to bake the environment maps again before the next frame
    pub regenerate_environment: bool,
    /// Overview inset
    pub minimap: Minimap,
    /// Main camera projection
    pub projection: Mat4,
    /// Model matrix of the scene meshes
    pub model: Mat4,
}

impl SceneState {
    /// Scene with default cameras, lights and materials but no GPU data
    pub fn new(config: &OrreryConfig) -> Self {
        let render = &config.render;
        let (x, y, w, h) = render.minimap_viewport;
        let mut cameras = Camera::defaults();
        for (index, camera) in cameras.iter_mut().enumerate() {
            camera.set_user_interaction(index == 0);
        }

        Self {
            cameras,
            selected_camera: 0,
            lights: LightSet::default(),
            material: Material::default(),
            preset: None,
            pbr_material: PbrMaterial::default(),
            meshes: Vec::new(),
            body_mesh: None,
            bodies: CelestialChain::default(),
            body_textures: Vec::new(),
            textures: SceneTextures::default(),
            ibl: None,
            regenerate_environment: false,
            minimap: Minimap::new([x, y, w, h], (config.window.width, config.window.height)),
            projection: Mat4::perspective_gl(
                deg_to_rad(render.fov_degrees),
                config.aspect_ratio(),
                render.near,
                render.far,
            ),
            model: Mat4::identity(),
        }
    }

    /// Scene with every configured asset loaded and uploaded
    pub fn load(device: &Rc<dyn GraphicsDevice>, config: &OrreryConfig) -> Self {
        let resources = &config.resources;
        let mut scene = Self::new(config);

        let mesh_path = resources.resolve(&resources.mesh);
        let mesh = ObjLoader::load_obj(&mesh_path).unwrap_or_else(|e| {
            log::warn!("Asset load failure for {}: {e}; using a cube", mesh_path.display());
            MeshData::cube()
        });
        match GpuMesh::upload(Rc::clone(device), &mesh, &scene.material.to_block()) {
            Ok(mesh) => scene.meshes.push(mesh),
            Err(e) => log::error!("Scene mesh upload failed: {e}"),
        }

        let body_path = resources.resolve(&resources.body_mesh);
        let sphere = ObjLoader::load_obj(&body_path).unwrap_or_else(|e| {
            log::warn!("Asset load failure for {}: {e}; using a generated sphere", body_path.display());
            MeshData::uv_sphere(32, 32)
        });
        scene.body_mesh = GpuMesh::upload(Rc::clone(device), &sphere, &scene.material.to_block())
            .map_err(|e| log::error!("Body mesh upload failed: {e}"))
            .ok();

        scene.body_textures = scene
            .bodies
            .bodies()
            .iter()
            .map(|body| Texture2D::load(device, &resources.resolve(body.texture_file(&resources.body_texture_file))))
            .collect();

        scene.textures.diffuse = Texture2D::load(device, &resources.resolve(&resources.diffuse_texture));
        scene.textures.hdr = Texture2D::load_hdr(device, &resources.resolve(&resources.hdr_environment));
        let faces: Vec<_> = resources.skybox_faces.iter().map(|face| resources.resolve(face)).collect();
        scene.textures.skybox = CubeMap::from_faces(device, &faces)
            .map_err(|e| log::warn!("Skybox disabled: {e}"))
            .ok();

        log::info!(
            "Scene loaded: {} meshes, {} lights, {} cameras",
            scene.meshes.len(),
            scene.lights.len(),
            scene.cameras.len()
        );
        scene
    }

    /// Switch the active camera; out-of-range indices are ignored
    pub fn select_camera(&mut self, index: usize) -> bool {
        if index >= self.cameras.len() {
            return false;
        }
        self.cameras[self.selected_camera].set_user_interaction(false);
        self.selected_camera = index;
        self.cameras[index].set_user_interaction(true);
        log::debug!("Selected camera {index}");
        true
    }

    /// Index of the active camera
    pub fn selected_camera_index(&self) -> usize {
        self.selected_camera
    }

    /// Active camera
    pub fn selected_camera(&self) -> &Camera {
        &self.cameras[self.selected_camera]
    }

    /// Active camera, mutably
    pub fn selected_camera_mut(&mut self) -> &mut Camera {
        &mut self.cameras[self.selected_camera]
    }

    /// Replace the Blinn-Phong material with a preset
    pub fn apply_preset(&mut self, preset: MaterialPreset) {
        self.material = preset.material();
        self.preset = Some(preset);
    }

    /// View matrix of the active camera
    pub fn view_matrix(&self) -> Mat4 {
        self.selected_camera().view_matrix()
    }

    /// Projection * view * model of the scene meshes
    pub fn mvp(&self) -> Mat4 {
        self.projection * self.view_matrix() * self.model
    }

    /// Light-space projection * view * model for the shadow pass.
    ///
    /// The selected light looks at the origin with the main projection.
    /// `None` when the light sits on the origin and has no view direction.
    pub fn light_mvp(&self) -> Option<Mat4> {
        let light = self.lights.selected().position;
        if light.norm() <= f32::EPSILON {
            return None;
        }
        let up = if light.xz().norm() <= f32::EPSILON { Vec3::z() } else { Vec3::y() };
        Some(self.projection * Mat4::look_at_gl(light, Vec3::zeros(), up) * self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_camera_starts_interactive() {
        let scene = SceneState::new(&OrreryConfig::default());
        assert_eq!(scene.selected_camera_index(), 0);
        assert_eq!(scene.cameras.len(), 2);
        assert_eq!(scene.selected_camera().position(), Vec3::new(1.2, 1.1, 0.9));
    }

    #[test]
    fn selecting_camera_moves_interaction() {
        let mut scene = SceneState::new(&OrreryConfig::default());
        assert!(scene.select_camera(1));
        assert!(!scene.select_camera(5));
        assert_eq!(scene.selected_camera_index(), 1);
        assert_eq!(scene.selected_camera().position(), Vec3::new(3.8, 1.0, 0.06));
    }

    #[test]
    fn preset_replaces_material() {
        let mut scene = SceneState::new(&OrreryConfig::default());
        scene.apply_preset(MaterialPreset::Chrome);
        assert_eq!(scene.material, MaterialPreset::Chrome.material());
        assert_eq!(scene.preset, Some(MaterialPreset::Chrome));
    }

    #[test]
    fn light_mvp_handles_light_above_origin() {
        let mut scene = SceneState::new(&OrreryConfig::default());
        scene.lights.selected_mut().position = Vec3::new(0.0, 5.0, 0.0);
        assert!(scene.light_mvp().is_some_and(|m| m.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn light_at_origin_has_no_light_mvp() {
        let mut scene = SceneState::new(&OrreryConfig::default());
        scene.lights.selected_mut().position = Vec3::zeros();
        assert_eq!(scene.light_mvp(), None);
    }

    #[test]
    fn missing_assets_fall_back_to_builtin_shapes() {
        use crate::render::testing::RecordingDevice;

        let device: Rc<dyn GraphicsDevice> = RecordingDevice::shared();
        let config = OrreryConfig::default().with_resource_root("/nonexistent/orrery");
        let scene = SceneState::load(&device, &config);

        assert_eq!(scene.meshes.len(), 1);
        assert!(scene.body_mesh.is_some());
        assert_eq!(scene.body_textures.len(), 3);
        assert!(scene.body_textures.iter().all(Option::is_none));
        assert!(scene.textures.skybox.is_none());
        assert!(scene.textures.hdr.is_none());
    }
}
