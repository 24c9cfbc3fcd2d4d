//! # Frame Orchestrator
//!
//! Sequences the passes of one frame. Each frame:
//!
//! 1. Poll input and move the selected camera
//! 2. Advance the celestial chain and compute the frame's matrices
//! 3. Shadow pass into the shadow map (when enabled)
//! 4. Bind and clear the scene target (offscreen when post-processing)
//! 5. Main pass along the selected [`ShadingPath`]: G-buffer, SSAO, lighting
//!    and depth blit when deferred, per-mesh forward draws otherwise
//! 6. Celestial bodies
//! 7. Environment background with `LEQUAL` depth, then `LESS` again
//! 8. Light markers and the minimap overlay
//! 9. Post-process composite into the default framebuffer
//! 10. Present
//!
//! Failures inside a frame are logged and absorbed. A failing mesh is skipped
//! and the loop moves on; a missing target or program turns its feature off
//! for the frame.

use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::core::config::{IblSizes, OrreryConfig};
use crate::foundation::math::{Mat3, Mat4, Mat4Ext, Vec3, Vec4};
use crate::input::InputEvent;
use crate::scene::{Light, Material, SceneState};

use super::device::{
    Capability, ClearMask, DepthFunc, GraphicsDevice, PolygonMode, Primitive, RawHandle, TextureTarget,
};
use super::geometry::{draw_transient, StaticGeometry};
use super::handles::OwnedTexture;
use super::ibl::{IblBaker, IblMaps};
use super::mesh::GpuMesh;
use super::registry::{RenderTargetRegistry, ResourceKind, TargetSizes, TargetView};
use super::selector::{select_shading_path, ShadingPath};
use super::settings::{EnvironmentMode, RenderSettings};
use super::shader::{bindings, names, units, ShaderId, ShaderLibrary, ShaderProgram, UniformValue};
use super::texture::{ssao_kernel, ssao_noise_texture, Texture2D};
use super::uniforms::{ShadowSettingBlock, UniformArena};
use super::window::WindowSurface;
use super::{RenderError, RenderResult};

const MARKER_SELECTED_SIZE: f32 = 40.0;
const MARKER_SIZE: f32 = 10.0;
const CAMERA_DOT_SIZE: f32 = 6.0;
const CAMERA_DOT_COLOR: [f32; 3] = [1.0, 0.0, 0.0];
const BORDER_COLOR: [f32; 3] = [1.0, 1.0, 0.0];

/// What happened during one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Frame index, starting at 0
    pub frame: u64,
    /// Path the main pass took
    pub path: ShadingPath,
    /// Events polled at the start of the frame
    pub events: Vec<InputEvent>,
    /// Scene meshes drawn by the main pass
    pub mesh_draws: usize,
    /// Failures that were logged and skipped
    pub failures: usize,
    /// Whether the shadow map was rendered
    pub shadow_rendered: bool,
    /// Whether the frame went through the post-process target
    pub post_processed: bool,
}

#[derive(Debug, Clone, Copy)]
struct FrameMatrices {
    view: Mat4,
    projection: Mat4,
    mvp: Mat4,
    model: Mat4,
    normal: Mat3,
    light_mvp: Option<Mat4>,
    view_pos: Vec3,
}

/// Per-frame uniform buffers shared by every mesh
#[derive(Debug, Clone, Copy)]
struct FrameBlocks {
    light: RawHandle,
    lights: RawHandle,
    light_count: usize,
    shadow_settings: RawHandle,
    pbr_material: RawHandle,
}

/// Owns the passes' GPU state and renders frames
pub struct FrameOrchestrator {
    device: Rc<dyn GraphicsDevice>,
    registry: RenderTargetRegistry,
    arena: UniformArena,
    shaders: ShaderLibrary,
    geometry: StaticGeometry,
    ssao_kernel: Vec<Vec3>,
    ssao_noise: Option<OwnedTexture>,
    clear_color: [f32; 4],
    window_size: (u32, u32),
    ibl_sizes: IblSizes,
    ibl_attempted: bool,
    frame: u64,
}

impl FrameOrchestrator {
    /// Build the orchestrator; render targets are created on first use
    pub fn new(device: Rc<dyn GraphicsDevice>, shaders: ShaderLibrary, config: &OrreryConfig) -> RenderResult<Self> {
        config
            .validate()
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;

        let geometry = StaticGeometry::new(&device)?;
        let mut rng = StdRng::from_entropy();
        let kernel = ssao_kernel(&mut rng, config.render.ssao_kernel_size);
        let noise = ssao_noise_texture(&device, &mut rng)
            .map_err(|e| log::error!("SSAO noise texture unavailable: {e}"))
            .ok();

        log::info!(
            "Frame orchestrator ready: {} programs, window {}x{}",
            shaders.len(),
            config.window.width,
            config.window.height
        );

        Ok(Self {
            registry: RenderTargetRegistry::new(Rc::clone(&device), TargetSizes::from_config(config)),
            arena: UniformArena::new(Rc::clone(&device)),
            device,
            shaders,
            geometry,
            ssao_kernel: kernel,
            ssao_noise: noise,
            clear_color: config.render.clear_color,
            window_size: (config.window.width, config.window.height),
            ibl_sizes: config.render.ibl,
            ibl_attempted: false,
            frame: 0,
        })
    }

    /// Render target registry
    pub fn registry(&self) -> &RenderTargetRegistry {
        &self.registry
    }

    /// Per-frame uniform buffers
    pub fn arena(&self) -> &UniformArena {
        &self.arena
    }

    /// Built programs
    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Drop the baked maps and bake again from the scene's current HDR image.
    ///
    /// Clears the one-shot latch and any capture-target failure first, so an
    /// environment that was missing or broken earlier gets another attempt.
    pub fn regenerate_environment(&mut self, scene: &mut SceneState) -> bool {
        log::info!("Regenerating environment maps");
        scene.ibl = None;
        self.ibl_attempted = false;
        self.registry.clear_failure(ResourceKind::IblCapture);
        self.prepare_environment(scene)
    }

    /// Bake the environment maps from the scene's HDR image, once.
    ///
    /// Returns whether baked maps are available afterwards.
    pub fn prepare_environment(&mut self, scene: &mut SceneState) -> bool {
        if scene.ibl.is_some() {
            return true;
        }
        if self.ibl_attempted {
            return false;
        }
        self.ibl_attempted = true;

        let Some(hdr) = scene.textures.hdr.as_ref() else {
            log::warn!("No HDR environment loaded, environment bake skipped");
            return false;
        };
        let capture = match self.registry.get_or_create(ResourceKind::IblCapture) {
            Ok(target) => target.view(),
            Err(_) => return false,
        };

        match IblBaker::new(self.ibl_sizes).bake(&self.device, &self.shaders, &self.geometry, &capture, hdr) {
            Ok(maps) => {
                scene.ibl = Some(maps);
                true
            }
            Err(e) => {
                log::error!("Environment bake failed: {e}");
                if matches!(e, RenderError::IncompleteFramebuffer(_)) {
                    self.registry.mark_failed(ResourceKind::IblCapture);
                }
                false
            }
        }
    }

    /// Render frames until the window asks to close.
    ///
    /// `between_frames` sees each frame's polled events and may edit the scene
    /// and settings before the next frame.
    pub fn run<F>(
        &mut self,
        scene: &mut SceneState,
        settings: &mut RenderSettings,
        window: &mut dyn WindowSurface,
        mut between_frames: F,
    ) -> u64
    where
        F: FnMut(&[InputEvent], &mut SceneState, &mut RenderSettings),
    {
        log::info!("Entering frame loop");
        while !window.should_close() {
            let report = self.render_frame(scene, settings, window);
            between_frames(&report.events, scene, settings);
        }
        log::info!("Frame loop finished after {} frames", self.frame);
        self.frame
    }

    /// Render and present one frame
    pub fn render_frame(
        &mut self,
        scene: &mut SceneState,
        settings: &RenderSettings,
        window: &mut dyn WindowSurface,
    ) -> FrameReport {
        // 1. input
        let events = window.update_input();
        scene.selected_camera_mut().update_input(&*window);

        // 2. animation and matrices
        self.arena.begin_frame();
        scene.bodies.tick(settings.animate_bodies);
        if std::mem::take(&mut scene.regenerate_environment) {
            self.regenerate_environment(scene);
        } else if settings.environment == EnvironmentMode::Hdr || settings.pbr() {
            self.prepare_environment(scene);
        }
        let matrices = FrameMatrices {
            view: scene.view_matrix(),
            projection: scene.projection,
            mvp: scene.mvp(),
            model: scene.model,
            normal: scene.model.normal_matrix(),
            light_mvp: scene.light_mvp(),
            view_pos: scene.selected_camera().position(),
        };

        let mut report = FrameReport {
            frame: self.frame,
            path: select_shading_path(settings),
            events,
            mesh_draws: 0,
            failures: 0,
            shadow_rendered: false,
            post_processed: false,
        };

        // 3. shadows
        let shadow = if settings.shadow_enabled {
            self.shadow_pass(scene, &matrices, &mut report)
        } else {
            None
        };

        // 4. scene target
        let scene_target = if settings.post_process {
            match self.registry.get_or_create(ResourceKind::PostProcess) {
                Ok(target) => Some(target.view()),
                Err(_) => {
                    report.failures += 1;
                    None
                }
            }
        } else {
            None
        };
        report.post_processed = scene_target.is_some();
        let scene_fb = scene_target.map(|target| target.framebuffer);
        self.begin_scene_target(scene_fb);

        // 5. main pass, 6. bodies
        match self.upload_frame_blocks(scene, settings) {
            Ok(blocks) => {
                if report.path.is_deferred() {
                    if let Err(e) = self.deferred_pass(scene, &matrices, &blocks, scene_fb, &mut report) {
                        log::error!("Deferred path unavailable this frame, rendering forward: {e}");
                        report.failures += 1;
                        report.path = select_shading_path(&RenderSettings {
                            deferred: false,
                            ..settings.clone()
                        });
                        self.begin_scene_target(scene_fb);
                    }
                }
                if !report.path.is_deferred() {
                    self.forward_pass(scene, settings, &matrices, &blocks, shadow.as_ref(), &mut report);
                }
                if settings.show_bodies {
                    self.draw_bodies(scene, &matrices, &blocks, &mut report);
                }
            }
            Err(e) => {
                log::error!("Frame uniforms unavailable, main pass skipped: {e}");
                report.failures += 1;
            }
        }

        // 7. environment
        if settings.environment != EnvironmentMode::Off {
            self.environment_pass(scene, settings.environment, &matrices);
        }

        // 8. overlays
        if settings.show_light_markers {
            self.draw_light_markers(scene, report.path.marker_shader(), &matrices);
        }
        if settings.show_minimap {
            self.draw_minimap(scene, &mut report);
        }

        // 9. composite
        if let Some(target) = scene_target {
            self.post_process(&target);
        }

        // 10. present
        window.swap_buffers();
        log::trace!(
            "Frame {} via {:?}: {} draws, {} failures",
            report.frame,
            report.path,
            report.mesh_draws,
            report.failures
        );
        self.frame += 1;
        report
    }

    fn shader(&self, id: ShaderId) -> Option<&dyn ShaderProgram> {
        let shader = self.shaders.get(id);
        if shader.is_none() {
            log::trace!("{id:?} program missing, pass skipped");
        }
        shader
    }

    fn restore_window_viewport(&self) {
        let (width, height) = self.window_size;
        self.device.viewport(0, 0, width as i32, height as i32);
    }

    fn begin_scene_target(&self, framebuffer: Option<RawHandle>) {
        self.device.bind_framebuffer(framebuffer);
        self.restore_window_viewport();
        self.device.clear_color(self.clear_color);
        self.device.clear(ClearMask::COLOR | ClearMask::DEPTH);
        self.device.set_capability(Capability::CullFace, false);
        self.device.set_capability(Capability::DepthTest, true);
    }

    fn upload_frame_blocks(&mut self, scene: &SceneState, settings: &RenderSettings) -> RenderResult<FrameBlocks> {
        let (lights, light_count) = scene.lights.array_block();
        Ok(FrameBlocks {
            light: self.arena.upload(&scene.lights.selected().to_block())?,
            lights: self.arena.upload(&lights)?,
            light_count,
            shadow_settings: self
                .arena
                .upload(&ShadowSettingBlock::new(settings.shadow_enabled, settings.pcf_enabled))?,
            pbr_material: self.arena.upload(&scene.pbr_material.to_block())?,
        })
    }

    fn shadow_pass(
        &mut self,
        scene: &SceneState,
        matrices: &FrameMatrices,
        report: &mut FrameReport,
    ) -> Option<(TargetView, Mat4)> {
        let Some(light_mvp) = matrices.light_mvp else {
            log::trace!("Selected light sits on the origin, shadow pass skipped");
            return None;
        };
        let target = match self.registry.get_or_create(ResourceKind::Shadow) {
            Ok(target) => target.view(),
            Err(_) => {
                report.failures += 1;
                return None;
            }
        };
        let shader = self.shader(ShaderId::Shadow)?;

        // cleared once here; the per-mesh draws only bind and draw
        self.device.bind_framebuffer(Some(target.framebuffer));
        self.device.viewport(0, 0, target.width as i32, target.height as i32);
        self.device.clear(ClearMask::DEPTH);
        for mesh in &scene.meshes {
            mesh.draw_shadow_map(shader, &light_mvp, target.framebuffer, target.width, target.height);
        }
        self.device.bind_framebuffer(None);
        report.shadow_rendered = true;
        Some((target, light_mvp))
    }

    fn set_mesh_textures(
        &self,
        shader: &dyn ShaderProgram,
        diffuse: Option<&Texture2D>,
        mesh: &GpuMesh,
        use_material: bool,
    ) {
        match diffuse.filter(|_| mesh.has_texture_coords()) {
            Some(texture) => {
                self.device.bind_texture(units::DIFFUSE, TextureTarget::Texture2D, Some(texture.raw()));
                shader.set_uniform(names::COLOR_MAP, UniformValue::Int(units::DIFFUSE as i32));
                shader.set_uniform(names::HAS_TEX_COORDS, UniformValue::Bool(true));
                shader.set_uniform(names::USE_MATERIAL, UniformValue::Bool(false));
            }
            None => {
                shader.set_uniform(names::HAS_TEX_COORDS, UniformValue::Bool(false));
                shader.set_uniform(names::USE_MATERIAL, UniformValue::Bool(use_material));
            }
        }
    }

    fn bind_ibl_maps(&self, shader: &dyn ShaderProgram, ibl: Option<&IblMaps>) {
        let Some(ibl) = ibl else { return };
        let maps = [
            (units::IRRADIANCE, TextureTarget::CubeMap, ibl.irradiance.raw(), names::IRRADIANCE_MAP),
            (units::PREFILTER, TextureTarget::CubeMap, ibl.prefilter.raw(), names::PREFILTER_MAP),
            (units::BRDF_LUT, TextureTarget::Texture2D, ibl.brdf_lut.raw(), names::BRDF_LUT),
        ];
        for (unit, target, texture, name) in maps {
            self.device.bind_texture(unit, target, Some(texture));
            shader.set_uniform(name, UniformValue::Int(unit as i32));
        }
    }

    fn forward_pass(
        &mut self,
        scene: &mut SceneState,
        settings: &RenderSettings,
        matrices: &FrameMatrices,
        blocks: &FrameBlocks,
        shadow: Option<&(TargetView, Mat4)>,
        report: &mut FrameReport,
    ) {
        let shader_id = match report.path {
            ShadingPath::ForwardSingleLight { shader }
            | ShadingPath::ForwardMultiLight { shader }
            | ShadingPath::Pbr { shader } => shader,
            ShadingPath::Deferred { .. } => return,
        };
        let Some(shader) = self.shaders.get(shader_id) else {
            log::warn!("{shader_id:?} program missing, forward pass skipped");
            report.failures += 1;
            return;
        };

        let material = scene.material.to_block();
        for (index, mesh) in scene.meshes.iter_mut().enumerate() {
            // a fresh block per mesh so edits made between frames are picked up
            let material_buffer = match self.arena.upload(&material) {
                Ok(buffer) => buffer,
                Err(e) => {
                    log::error!("Mesh {index} skipped, material upload failed: {e}");
                    report.failures += 1;
                    continue;
                }
            };
            mesh.set_material_buffer(material_buffer);

            shader.bind();
            shader.set_uniform(names::MVP_MATRIX, UniformValue::Mat4(matrices.mvp));
            shader.set_uniform(names::NORMAL_MODEL_MATRIX, UniformValue::Mat3(matrices.normal));
            if !matches!(report.path, ShadingPath::ForwardSingleLight { .. }) {
                shader.set_uniform(names::MODEL_MATRIX, UniformValue::Mat4(matrices.model));
                shader.set_uniform(names::VIEW_POS, UniformValue::Vec3(matrices.view_pos.into()));
                shader.set_uniform(names::LIGHT_COUNT, UniformValue::Int(blocks.light_count as i32));
            }
            if let Some((shadow, light_mvp)) = shadow {
                self.device.bind_texture(units::SHADOW, TextureTarget::Texture2D, Some(shadow.depth));
                shader.set_uniform(names::TEX_SHADOW, UniformValue::Int(units::SHADOW as i32));
                shader.set_uniform(names::LIGHT_MVP, UniformValue::Mat4(*light_mvp));
                shader.bind_uniform_block(names::SHADOW_SETTINGS_BLOCK, bindings::SHADOW_SETTINGS, blocks.shadow_settings);
            }
            self.set_mesh_textures(shader, scene.textures.diffuse.as_ref(), mesh, settings.use_material);

            match report.path {
                ShadingPath::ForwardSingleLight { .. } => mesh.draw_lit(shader, blocks.light, false),
                ShadingPath::ForwardMultiLight { .. } => mesh.draw_lit(shader, blocks.lights, true),
                ShadingPath::Pbr { .. } => {
                    self.bind_ibl_maps(shader, scene.ibl.as_ref());
                    mesh.draw_pbr(shader, blocks.pbr_material, blocks.lights);
                }
                ShadingPath::Deferred { .. } => continue,
            }
            report.mesh_draws += 1;
        }
    }

    fn deferred_pass(
        &mut self,
        scene: &mut SceneState,
        matrices: &FrameMatrices,
        blocks: &FrameBlocks,
        scene_fb: Option<RawHandle>,
        report: &mut FrameReport,
    ) -> RenderResult<()> {
        let ShadingPath::Deferred { geometry, lighting, .. } = report.path else {
            return Ok(());
        };
        let gbuffer = self.registry.get_or_create(ResourceKind::GBuffer)?.view();
        let ssao = self.registry.get_or_create(ResourceKind::Ssao)?.view();
        let blur = self.registry.get_or_create(ResourceKind::SsaoBlur)?.view();

        let program = |id: ShaderId| {
            self.shaders
                .get(id)
                .ok_or_else(|| RenderError::ShaderBuildFailed(format!("{id:?} unavailable for deferred shading")))
        };
        let geometry_shader = program(geometry)?;
        let ssao_shader = program(ShaderId::Ssao)?;
        let blur_shader = program(ShaderId::SsaoBlur)?;
        let lighting_shader = program(lighting)?;

        let (screen_w, screen_h) = (gbuffer.width as i32, gbuffer.height as i32);
        let device = &self.device;

        // geometry
        device.bind_framebuffer(Some(gbuffer.framebuffer));
        device.viewport(0, 0, screen_w, screen_h);
        device.clear(ClearMask::COLOR | ClearMask::DEPTH);
        geometry_shader.bind();
        geometry_shader.set_uniform(names::MVP_MATRIX, UniformValue::Mat4(matrices.mvp));
        geometry_shader.set_uniform(names::MODEL_MATRIX, UniformValue::Mat4(matrices.model));
        geometry_shader.set_uniform(names::VIEW, UniformValue::Mat4(matrices.view));
        geometry_shader.set_uniform(names::NORMAL_MODEL_MATRIX, UniformValue::Mat3(matrices.normal));
        let material = scene.material.to_block();
        for (index, mesh) in scene.meshes.iter_mut().enumerate() {
            match self.arena.upload(&material) {
                Ok(buffer) => mesh.set_material_buffer(buffer),
                Err(e) => {
                    log::error!("Mesh {index} skipped in geometry pass: {e}");
                    report.failures += 1;
                    continue;
                }
            }
            mesh.draw(geometry_shader);
            report.mesh_draws += 1;
        }

        // occlusion
        device.bind_framebuffer(Some(ssao.framebuffer));
        device.clear(ClearMask::COLOR);
        ssao_shader.bind();
        let gbuffer_inputs = [
            (units::G_POSITION, gbuffer.colors[0], names::G_POSITION),
            (units::G_NORMAL, gbuffer.colors[1], names::G_NORMAL),
        ];
        for (unit, texture, name) in gbuffer_inputs {
            device.bind_texture(unit, TextureTarget::Texture2D, Some(texture));
            ssao_shader.set_uniform(name, UniformValue::Int(unit as i32));
        }
        if let Some(noise) = &self.ssao_noise {
            device.bind_texture(units::NOISE, TextureTarget::Texture2D, Some(noise.raw()));
            ssao_shader.set_uniform(names::TEX_NOISE, UniformValue::Int(units::NOISE as i32));
        }
        ssao_shader.set_uniform(names::PROJECTION, UniformValue::Mat4(matrices.projection));
        for (index, sample) in self.ssao_kernel.iter().enumerate() {
            ssao_shader.set_uniform(&names::sample(index), UniformValue::Vec3((*sample).into()));
        }
        self.geometry.quad.draw();

        // blur
        device.bind_framebuffer(Some(blur.framebuffer));
        device.clear(ClearMask::COLOR);
        blur_shader.bind();
        device.bind_texture(units::SSAO, TextureTarget::Texture2D, Some(ssao.colors[0]));
        blur_shader.set_uniform(names::SSAO, UniformValue::Int(units::SSAO as i32));
        self.geometry.quad.draw();

        // lighting into the scene target
        device.bind_framebuffer(scene_fb);
        self.restore_window_viewport();
        lighting_shader.bind();
        let lighting_inputs = [
            (units::G_POSITION, gbuffer.colors[0], names::G_POSITION),
            (units::G_NORMAL, gbuffer.colors[1], names::G_NORMAL),
            (units::G_ALBEDO, gbuffer.colors[2], names::G_ALBEDO),
            (units::SSAO, blur.colors[0], names::SSAO),
        ];
        for (unit, texture, name) in lighting_inputs {
            device.bind_texture(unit, TextureTarget::Texture2D, Some(texture));
            lighting_shader.set_uniform(name, UniformValue::Int(unit as i32));
        }
        lighting_shader.set_uniform(names::VIEW_POS, UniformValue::Vec3(matrices.view_pos.into()));
        lighting_shader.set_uniform(names::LIGHT_COUNT, UniformValue::Int(blocks.light_count as i32));
        lighting_shader.bind_uniform_block(names::LIGHTS_BLOCK, bindings::LIGHTS, blocks.lights);
        self.geometry.quad.draw();

        // forward overlays depth-test against the scene geometry; the G-buffer
        // is screen-sized while the scene target matches the window
        device.blit_depth(gbuffer.framebuffer, (gbuffer.width, gbuffer.height), scene_fb, self.window_size);
        device.bind_framebuffer(scene_fb);
        Ok(())
    }

    fn draw_bodies(
        &mut self,
        scene: &mut SceneState,
        matrices: &FrameMatrices,
        blocks: &FrameBlocks,
        report: &mut FrameReport,
    ) {
        let Some(shader) = self.shaders.get(ShaderId::Default) else { return };
        let Some(body_mesh) = scene.body_mesh.as_mut() else { return };

        for (index, body) in scene.bodies.bodies().iter().enumerate() {
            let material = Material::default().with_kd(body.kd).to_block();
            match self.arena.upload(&material) {
                Ok(buffer) => body_mesh.set_material_buffer(buffer),
                Err(e) => {
                    log::error!("Body '{}' skipped: {e}", body.name);
                    report.failures += 1;
                    continue;
                }
            }

            let model = body.transform();
            shader.bind();
            shader.set_uniform(
                names::MVP_MATRIX,
                UniformValue::Mat4(matrices.projection * matrices.view * model),
            );
            shader.set_uniform(names::NORMAL_MODEL_MATRIX, UniformValue::Mat3(model.normal_matrix()));
            let texture = scene.body_textures.get(index).and_then(Option::as_ref);
            self.set_mesh_textures(shader, texture, body_mesh, true);
            body_mesh.draw_lit(shader, blocks.light, false);
        }
    }

    fn environment_pass(&self, scene: &SceneState, mode: EnvironmentMode, matrices: &FrameMatrices) {
        let (shader_id, texture) = match mode {
            EnvironmentMode::Off => return,
            EnvironmentMode::Skybox => (ShaderId::Skybox, scene.textures.skybox.as_ref().map(|sky| sky.raw())),
            EnvironmentMode::Hdr => (ShaderId::Background, scene.ibl.as_ref().map(|ibl| ibl.environment.raw())),
        };
        let Some(texture) = texture else {
            log::trace!("{mode:?} environment has no texture, skipped");
            return;
        };
        let Some(shader) = self.shader(shader_id) else { return };

        // the sky sits at depth 1.0
        self.device.depth_func(DepthFunc::LessEqual);
        shader.bind();
        shader.set_uniform(names::VIEW, UniformValue::Mat4(matrices.view.rotation_only()));
        shader.set_uniform(names::PROJECTION, UniformValue::Mat4(matrices.projection));
        self.device.bind_texture(units::ENVIRONMENT, TextureTarget::CubeMap, Some(texture));
        shader.set_uniform(names::ENVIRONMENT_MAP, UniformValue::Int(units::ENVIRONMENT as i32));
        self.geometry.cube.draw();
        self.device.depth_func(DepthFunc::Less);
    }

    fn draw_light_markers(&self, scene: &SceneState, marker_shader: ShaderId, matrices: &FrameMatrices) {
        let Some(shader) = self.shader(marker_shader) else { return };
        let vao = self.geometry.cube.vao();
        let draw_marker = |light: &Light, size: f32| {
            let position = light.position;
            let clip = matrices.mvp * Vec4::new(position.x, position.y, position.z, 1.0);
            self.device.point_size(size);
            shader.set_uniform(names::POS, UniformValue::Vec4(clip.into()));
            shader.set_uniform(names::COLOR, UniformValue::Vec3(light.color.into()));
            self.device.draw_arrays(vao, Primitive::Points, 0, 1);
        };

        shader.bind();
        draw_marker(scene.lights.selected(), MARKER_SELECTED_SIZE);
        for light in scene.lights.iter() {
            draw_marker(light, MARKER_SIZE);
        }
    }

    fn draw_minimap(&mut self, scene: &mut SceneState, report: &mut FrameReport) {
        let minimap = scene.minimap;
        let [x, y, width, height] = minimap.viewport;
        self.device.viewport(x, y, width, height);

        if let Some(shader) = self.shaders.get(ShaderId::Default) {
            match self.arena.upload(&scene.material.to_block()) {
                Ok(buffer) => {
                    shader.bind();
                    let mvp = minimap.projection() * minimap.view() * scene.model;
                    shader.set_uniform(names::MVP_MATRIX, UniformValue::Mat4(mvp));
                    for mesh in scene.meshes.iter_mut() {
                        mesh.set_material_buffer(buffer);
                        mesh.draw(shader);
                    }
                }
                Err(e) => {
                    log::error!("Minimap scene skipped: {e}");
                    report.failures += 1;
                }
            }
        }

        // the dot is placed in the inset's own NDC, before the viewport is restored
        if let Some(point) = self.shaders.get(ShaderId::Point) {
            let ndc = minimap.project(scene.selected_camera().position());
            self.device.set_capability(Capability::DepthTest, false);
            point.bind();
            point.set_uniform(names::COLOR, UniformValue::Vec3(CAMERA_DOT_COLOR));
            self.device.point_size(CAMERA_DOT_SIZE);
            if let Err(e) = draw_transient(&self.device, &[ndc.x, ndc.y, 0.0], Primitive::Points) {
                log::error!("Minimap camera dot skipped: {e}");
                report.failures += 1;
            }
            self.device.set_capability(Capability::DepthTest, true);
        }

        self.restore_window_viewport();

        if let Some(border) = self.shaders.get(ShaderId::Border) {
            let outline: Vec<f32> = minimap
                .border_ndc()
                .iter()
                .flat_map(|&[x, y]| [x, y, 0.0])
                .collect();
            self.device.set_capability(Capability::DepthTest, false);
            self.device.polygon_mode(PolygonMode::Line);
            border.bind();
            border.set_uniform(names::COLOR, UniformValue::Vec3(BORDER_COLOR));
            if let Err(e) = draw_transient(&self.device, &outline, Primitive::LineLoop) {
                log::error!("Minimap border skipped: {e}");
                report.failures += 1;
            }
            self.device.polygon_mode(PolygonMode::Fill);
            self.device.set_capability(Capability::DepthTest, true);
        }
    }

    fn post_process(&self, target: &TargetView) {
        self.device.bind_framebuffer(None);
        let Some(shader) = self.shader(ShaderId::PostProcess) else {
            log::warn!("Post-process program missing, offscreen frame not composited");
            return;
        };
        shader.bind();
        self.device.bind_texture(units::DIFFUSE, TextureTarget::Texture2D, Some(target.colors[0]));
        shader.set_uniform(names::SCENE, UniformValue::Int(units::DIFFUSE as i32));
        self.device.set_capability(Capability::DepthTest, false);
        self.restore_window_viewport();
        self.geometry.screen_quad.draw();
        self.device.set_capability(Capability::DepthTest, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::ResourceClass;
    use crate::render::mesh::MeshData;
    use crate::render::testing::{Call, MockShader, MockWindow, RecordingDevice};
    use crate::render::texture::CubeMap;

    struct Fixture {
        recording: Rc<RecordingDevice>,
        orchestrator: FrameOrchestrator,
        scene: SceneState,
        window: MockWindow,
    }

    fn fixture(frames: u32) -> Fixture {
        let recording = RecordingDevice::shared();
        let device: Rc<dyn GraphicsDevice> = recording.clone();
        let mut shaders = ShaderLibrary::new();
        for id in ShaderId::ALL {
            shaders.insert(id, Box::new(MockShader::new(id, Rc::clone(&recording))));
        }
        let config = OrreryConfig::default();
        let orchestrator = FrameOrchestrator::new(Rc::clone(&device), shaders, &config).expect("orchestrator");
        let mut scene = SceneState::new(&config);
        let mesh = GpuMesh::upload(Rc::clone(&device), &MeshData::cube(), &scene.material.to_block()).expect("mesh");
        scene.meshes.push(mesh);
        let window = MockWindow::new(Rc::clone(&recording), frames);
        recording.clear_log();
        Fixture {
            recording,
            orchestrator,
            scene,
            window,
        }
    }

    impl Fixture {
        fn frame(&mut self, settings: &RenderSettings) -> FrameReport {
            self.orchestrator.render_frame(&mut self.scene, settings, &mut self.window)
        }

        fn programs_used(&self) -> Vec<ShaderId> {
            self.recording
                .calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::UseProgram(id) => Some(id),
                    _ => None,
                })
                .collect()
        }

        fn first_use(&self, id: ShaderId) -> Option<usize> {
            self.recording.position(|c| *c == Call::UseProgram(id))
        }
    }

    #[test]
    fn shadow_draw_precedes_main_pass() {
        let mut f = fixture(1);
        let settings = RenderSettings {
            shadow_enabled: true,
            ..RenderSettings::minimal()
        };
        let report = f.frame(&settings);

        let shadow = f.first_use(ShaderId::Shadow).expect("shadow program bound");
        let main = f.first_use(ShaderId::Default).expect("main program bound");
        assert!(shadow < main);
        let calls = f.recording.calls();
        assert!(calls[shadow..main].iter().any(|c| matches!(c, Call::DrawElements(..))));
        assert!(calls[main..].iter().any(|c| matches!(c, Call::BindTexture(units::SHADOW, _, Some(_)))));
        assert!(report.shadow_rendered);
    }

    #[test]
    fn all_toggles_off_draws_default_shader_with_light_block() {
        let mut f = fixture(1);
        let report = f.frame(&RenderSettings::minimal());

        assert!(f.programs_used().iter().all(|&id| id == ShaderId::Default));
        assert_eq!(report.mesh_draws, 1);
        assert!(f.recording.has(|c| matches!(
            c,
            Call::BindBlock(ShaderId::Default, block, bindings::LIGHTS, _) if block == names::LIGHT_BLOCK
        )));
        assert!(!f.recording.has(|c| matches!(c, Call::BindBlock(_, block, ..) if block == names::LIGHTS_BLOCK)));
        assert_eq!(f.window.presents, 1);
    }

    #[test]
    fn deferred_frame_runs_gbuffer_ssao_lighting_then_blit() {
        let mut f = fixture(1);
        let settings = RenderSettings {
            deferred: true,
            ..RenderSettings::minimal()
        };
        let report = f.frame(&settings);
        assert!(report.path.is_deferred());

        let order: Vec<_> = [ShaderId::GeometryPass, ShaderId::Ssao, ShaderId::SsaoBlur, ShaderId::LightingPass]
            .into_iter()
            .map(|id| f.first_use(id).expect("program bound"))
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));

        let blit = f.recording.position(|c| matches!(c, Call::BlitDepth(..))).expect("depth blit");
        assert!(blit > order[3]);
        assert!(f.first_use(ShaderId::Default).is_none());
        assert!(f.recording.has(|c| matches!(c, Call::SetUniform(ShaderId::Ssao, name, _) if name == "samples[63]")));
    }

    #[test]
    fn broken_gbuffer_falls_back_to_forward() {
        let mut f = fixture(2);
        f.recording.set_framebuffers_incomplete(true);
        let settings = RenderSettings {
            deferred: true,
            ..RenderSettings::minimal()
        };

        let report = f.frame(&settings);
        assert_eq!(report.path, ShadingPath::ForwardSingleLight { shader: ShaderId::Default });
        assert!(report.failures > 0);
        assert_eq!(report.mesh_draws, 1);

        // the failed target is not rebuilt next frame
        f.recording.clear_log();
        f.frame(&settings);
        assert!(!f.recording.has(|c| matches!(c, Call::CreateFramebuffer(_))));
    }

    #[test]
    fn multi_light_pbr_binds_material_and_light_array() {
        let mut f = fixture(1);
        let settings = RenderSettings {
            multi_light: true,
            material_model: crate::render::settings::MaterialModel::Pbr,
            ..RenderSettings::minimal()
        };
        let report = f.frame(&settings);

        assert_eq!(report.path, ShadingPath::Pbr { shader: ShaderId::Pbr });
        assert!(f.recording.has(|c| matches!(
            c,
            Call::BindBlock(ShaderId::Pbr, block, ..) if block == names::PBR_MATERIAL_BLOCK
        )));
        assert!(f.recording.has(|c| *c == Call::SetUniform(ShaderId::Pbr, names::LIGHT_COUNT.into(), UniformValue::Int(2))));
    }

    #[test]
    fn environment_relaxes_then_restores_depth_func() {
        let mut f = fixture(1);
        let device: Rc<dyn GraphicsDevice> = f.recording.clone();
        f.scene.textures.skybox = Some(CubeMap::render_target(&device, 4, 1).expect("cubemap"));
        f.recording.clear_log();
        let settings = RenderSettings {
            environment: EnvironmentMode::Skybox,
            ..RenderSettings::minimal()
        };
        f.frame(&settings);

        let relaxed = f.recording.position(|c| *c == Call::DepthFunc(DepthFunc::LessEqual)).expect("lequal");
        let sky = f.recording.position(|c| matches!(c, Call::DrawArrays(_, Primitive::Triangles, 36))).expect("sky");
        let restored = f.recording.position(|c| *c == Call::DepthFunc(DepthFunc::Less)).expect("less");
        assert!(relaxed < sky && sky < restored);

        let view = f.recording.calls().into_iter().find_map(|c| match c {
            Call::SetUniform(ShaderId::Skybox, name, UniformValue::Mat4(m)) if name == names::VIEW => Some(m),
            _ => None,
        });
        assert_eq!(view.map(|m| m.translation_part()), Some(Vec3::zeros()));
    }

    #[test]
    fn post_process_composites_into_default_framebuffer() {
        let mut f = fixture(1);
        let settings = RenderSettings {
            post_process: true,
            ..RenderSettings::minimal()
        };
        let report = f.frame(&settings);
        assert!(report.post_processed);

        let target = f.orchestrator.registry().get(ResourceKind::PostProcess).expect("target").view();
        let offscreen = f
            .recording
            .position(|c| *c == Call::BindFramebuffer(Some(target.framebuffer)))
            .expect("offscreen bind");
        let composite = f.first_use(ShaderId::PostProcess).expect("composite");
        assert!(offscreen < composite);
        assert!(f.recording.calls()[..composite]
            .iter()
            .rev()
            .find(|c| matches!(c, Call::BindFramebuffer(_)))
            .is_some_and(|c| *c == Call::BindFramebuffer(None)));
        assert!(f.recording.has(|c| matches!(c, Call::DrawArrays(_, Primitive::Triangles, 6))));
    }

    #[test]
    fn minimap_draws_dot_and_border_then_restores_viewport() {
        let mut f = fixture(1);
        f.frame(&RenderSettings::default());

        let inset = f.recording.position(|c| *c == Call::Viewport(800, 800, 200, 200)).expect("inset");
        let dot = f.recording.position(|c| *c == Call::PointSize(CAMERA_DOT_SIZE)).expect("dot");
        let restore = f.recording.last_position(|c| *c == Call::Viewport(0, 0, 1024, 1024)).expect("restore");
        let line = f.recording.position(|c| *c == Call::PolygonMode(PolygonMode::Line)).expect("line mode");
        assert!(inset < dot && dot < restore && restore < line);
        assert!(f.recording.has(|c| matches!(c, Call::DrawArrays(_, Primitive::LineLoop, 4))));
        assert_eq!(f.recording.last_position(|c| matches!(c, Call::PolygonMode(_))), f.recording.position(|c| *c == Call::PolygonMode(PolygonMode::Fill)));
    }

    #[test]
    fn selected_light_marker_is_larger() {
        let mut f = fixture(1);
        let settings = RenderSettings {
            show_light_markers: true,
            ..RenderSettings::minimal()
        };
        f.frame(&settings);
        assert_eq!(f.recording.count(|c| *c == Call::PointSize(MARKER_SELECTED_SIZE)), 1);
        assert_eq!(f.recording.count(|c| *c == Call::PointSize(MARKER_SIZE)), 2);
    }

    #[test]
    fn uniform_buffers_are_recreated_every_frame() {
        let mut f = fixture(2);
        f.frame(&RenderSettings::minimal());
        let first = f.orchestrator.arena().total_created();
        let live = f.orchestrator.arena().live_count();
        f.frame(&RenderSettings::minimal());

        assert_eq!(f.orchestrator.arena().total_created(), first * 2);
        assert_eq!(f.orchestrator.arena().live_count(), live);
        assert!(f.recording.count(|c| matches!(c, Call::Release(ResourceClass::Buffer, _))) >= live);
    }

    #[test]
    fn failed_uploads_are_absorbed_and_frame_presents() {
        let mut f = fixture(1);
        f.recording.set_uniform_buffers_failing(true);
        let report = f.frame(&RenderSettings::minimal());
        assert!(report.failures > 0);
        assert_eq!(report.mesh_draws, 0);
        assert_eq!(f.window.presents, 1);
    }

    #[test]
    fn run_stops_when_window_closes() {
        let mut f = fixture(3);
        let mut settings = RenderSettings::minimal();
        let mut seen = 0;
        let frames = f
            .orchestrator
            .run(&mut f.scene, &mut settings, &mut f.window, |_, _, _| seen += 1);
        assert_eq!((frames, seen, f.window.presents), (3, 3, 3));
    }

    #[test]
    fn bodies_only_advance_while_animating() {
        let mut f = fixture(2);
        f.frame(&RenderSettings::minimal());
        assert_eq!(f.scene.bodies.frame(), 0);
        let animated = RenderSettings {
            animate_bodies: true,
            show_bodies: true,
            ..RenderSettings::minimal()
        };
        f.frame(&animated);
        assert_eq!(f.scene.bodies.frame(), 1);
    }

    #[test]
    fn hdr_environment_is_baked_once() {
        let mut f = fixture(2);
        let device: Rc<dyn GraphicsDevice> = f.recording.clone();
        f.scene.textures.hdr = Some(Texture2D::from_owned(OwnedTexture::new(device, 500), 64, 32));
        let settings = RenderSettings {
            environment: EnvironmentMode::Hdr,
            ..RenderSettings::minimal()
        };

        f.frame(&settings);
        assert!(f.scene.ibl.is_some());
        assert!(f.first_use(ShaderId::Background).is_some());

        f.recording.clear_log();
        f.frame(&settings);
        assert!(f.first_use(ShaderId::EquirectToCube).is_none());
    }

    #[test]
    fn depth_blit_scales_gbuffer_onto_window_sized_target() {
        let mut f = fixture(2);
        let settings = RenderSettings {
            deferred: true,
            ..RenderSettings::minimal()
        };
        f.frame(&settings);
        let gbuffer = f.orchestrator.registry().get(ResourceKind::GBuffer).expect("gbuffer").view();
        assert_eq!((gbuffer.width, gbuffer.height), (1920, 1080));
        assert!(f.recording.has(|c| *c == Call::BlitDepth(gbuffer.framebuffer, (1920, 1080), None, (1024, 1024))));

        f.recording.clear_log();
        let offscreen = RenderSettings {
            post_process: true,
            ..settings
        };
        f.frame(&offscreen);
        let target = f.orchestrator.registry().get(ResourceKind::PostProcess).expect("target").view();
        assert!(f.recording.has(|c| *c
            == Call::BlitDepth(gbuffer.framebuffer, (1920, 1080), Some(target.framebuffer), (target.width, target.height))));
    }

    #[test]
    fn deferred_markers_draw_after_depth_blit() {
        let mut f = fixture(1);
        let settings = RenderSettings {
            deferred: true,
            show_light_markers: true,
            ..RenderSettings::minimal()
        };
        let report = f.frame(&settings);

        let blit = f.recording.position(|c| matches!(c, Call::BlitDepth(..))).expect("depth blit");
        let markers = f.first_use(report.path.marker_shader()).expect("markers");
        assert!(blit < markers);
        assert_eq!(f.recording.count(|c| *c == Call::PointSize(MARKER_SELECTED_SIZE)), 1);
    }

    #[test]
    fn environment_bakes_again_on_request() {
        let mut f = fixture(3);
        let settings = RenderSettings {
            environment: EnvironmentMode::Hdr,
            ..RenderSettings::minimal()
        };

        // nothing to bake from yet, and the attempt is not repeated on its own
        f.frame(&settings);
        let device: Rc<dyn GraphicsDevice> = f.recording.clone();
        f.scene.textures.hdr = Some(Texture2D::from_owned(OwnedTexture::new(device, 500), 64, 32));
        f.frame(&settings);
        assert!(f.scene.ibl.is_none());

        f.scene.regenerate_environment = true;
        f.frame(&settings);
        assert!(f.scene.ibl.is_some());
        assert!(!f.scene.regenerate_environment);
    }

    #[test]
    fn regenerating_retries_a_failed_capture_target() {
        let mut f = fixture(1);
        let device: Rc<dyn GraphicsDevice> = f.recording.clone();
        f.scene.textures.hdr = Some(Texture2D::from_owned(OwnedTexture::new(device, 500), 64, 32));

        f.recording.set_framebuffers_incomplete(true);
        assert!(!f.orchestrator.prepare_environment(&mut f.scene));
        assert!(f.orchestrator.registry().is_failed(ResourceKind::IblCapture));

        f.recording.set_framebuffers_incomplete(false);
        assert!(f.orchestrator.regenerate_environment(&mut f.scene));
        assert!(!f.orchestrator.registry().is_failed(ResourceKind::IblCapture));
        assert!(f.scene.ibl.is_some());
    }

    #[test]
    fn light_on_origin_skips_shadow_pass() {
        let mut f = fixture(1);
        f.scene.lights.selected_mut().position = Vec3::zeros();
        let settings = RenderSettings {
            shadow_enabled: true,
            ..RenderSettings::minimal()
        };
        let report = f.frame(&settings);

        assert!(!report.shadow_rendered);
        assert!(f.first_use(ShaderId::Shadow).is_none());
        assert!(!f.recording.has(|c| matches!(c, Call::SetUniform(_, name, _) if name == names::LIGHT_MVP)));
        assert_eq!(report.mesh_draws, 1);
    }
}
