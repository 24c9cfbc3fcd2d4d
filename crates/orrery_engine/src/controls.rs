//! Keyboard control panel
//!
//! Applies key presses to the render settings and the scene between frames.
//! WASD/RF and the left mouse button are left to the selected camera.
//!
//! | Key | Effect |
//! |---|---|
//! | H / P | shadows / PCF |
//! | M / B | multi-light / PBR material model |
//! | G | deferred shading |
//! | E | environment: off, skybox, HDR |
//! | O | post-processing |
//! | Space / V | animate bodies / show bodies |
//! | N / L | minimap / light markers |
//! | U | material colors on untextured meshes |
//! | 1-9, 0 | select camera; with Shift, select light |
//! | Up / Down | previous / next light |
//! | Insert / Delete | add light / remove selected light |
//! | T / Y | spotlight / texture flag of the selected light |
//! | K | next material preset |
//! | I | bake the environment maps again |
//! | Z / X / C | Bezier path / constant speed / lock view |

use crate::input::{InputEvent, KeyAction, KeyCode, Modifiers};
use crate::render::settings::{EnvironmentMode, MaterialModel, RenderSettings};
use crate::scene::{MaterialPreset, SceneState};

/// Applies key events to settings and scene
#[derive(Debug, Default)]
pub struct ControlPanel {
    handled: u64,
}

impl ControlPanel {
    /// Panel with no handled events
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events that changed something
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Apply every press in `events`
    pub fn apply(&mut self, events: &[InputEvent], scene: &mut SceneState, settings: &mut RenderSettings) {
        for event in events {
            if let InputEvent::Key {
                key,
                action: KeyAction::Press,
                mods,
            } = *event
            {
                if self.apply_key(key, mods, scene, settings) {
                    self.handled += 1;
                }
            }
        }
    }

    fn apply_key(
        &mut self,
        key: KeyCode,
        mods: Modifiers,
        scene: &mut SceneState,
        settings: &mut RenderSettings,
    ) -> bool {
        if let Some(index) = key.digit_index() {
            return if mods.shift {
                scene.lights.select(index)
            } else {
                scene.select_camera(index)
            };
        }

        match key {
            KeyCode::H => toggle("shadows", &mut settings.shadow_enabled),
            KeyCode::P => toggle("PCF", &mut settings.pcf_enabled),
            KeyCode::M => toggle("multi-light", &mut settings.multi_light),
            KeyCode::B => {
                settings.material_model = match settings.material_model {
                    MaterialModel::Normal => MaterialModel::Pbr,
                    MaterialModel::Pbr => MaterialModel::Normal,
                };
                log::info!("Material model: {}", settings.material_model.label());
            }
            KeyCode::G => toggle("deferred shading", &mut settings.deferred),
            KeyCode::E => {
                settings.environment = match settings.environment {
                    EnvironmentMode::Off => EnvironmentMode::Skybox,
                    EnvironmentMode::Skybox => EnvironmentMode::Hdr,
                    EnvironmentMode::Hdr => EnvironmentMode::Off,
                };
                log::info!("Environment: {:?}", settings.environment);
            }
            KeyCode::O => toggle("post-processing", &mut settings.post_process),
            KeyCode::Space => toggle("body animation", &mut settings.animate_bodies),
            KeyCode::V => toggle("bodies", &mut settings.show_bodies),
            KeyCode::N => toggle("minimap", &mut settings.show_minimap),
            KeyCode::L => toggle("light markers", &mut settings.show_light_markers),
            KeyCode::U => toggle("use material", &mut settings.use_material),
            KeyCode::Up => {
                let index = scene.lights.selected_index();
                return index > 0 && scene.lights.select(index - 1);
            }
            KeyCode::Down => {
                let index = scene.lights.selected_index();
                return scene.lights.select(index + 1);
            }
            KeyCode::Insert => return scene.lights.add_light(),
            KeyCode::Delete => return scene.lights.remove_selected(),
            KeyCode::T => toggle("spotlight", &mut scene.lights.selected_mut().is_spotlight),
            KeyCode::Y => toggle("light texture", &mut scene.lights.selected_mut().has_texture),
            KeyCode::K => {
                let preset = scene.preset.map_or(MaterialPreset::Brass, MaterialPreset::next);
                scene.apply_preset(preset);
                log::info!("Material preset: {}", preset.name());
            }
            KeyCode::I => {
                scene.regenerate_environment = true;
                log::info!("Environment bake requested");
            }
            KeyCode::Z => toggle("Bezier path", &mut scene.selected_camera_mut().use_bezier),
            KeyCode::X => toggle("constant speed", &mut scene.selected_camera_mut().constant_speed),
            KeyCode::C => toggle("lock view", &mut scene.selected_camera_mut().lock_view),
            _ => return false,
        }
        true
    }
}

fn toggle(label: &str, flag: &mut bool) {
    *flag = !*flag;
    log::info!("{label}: {}", if *flag { "on" } else { "off" });
}
