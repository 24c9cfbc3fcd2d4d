//! Scene lights and the editable light list

use crate::foundation::math::Vec3;
use crate::render::uniforms::{LightArrayBlock, LightBlock, MAX_LIGHT};

/// Point or spot light source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// World-space position
    pub position: Vec3,
    /// Light color; components above 1 brighten
    pub color: Vec3,
    /// Spot direction
    pub direction: Vec3,
    /// Restrict lighting to a cone around `direction`
    pub is_spotlight: bool,
    /// Project a texture
    pub has_texture: bool,
}

impl Light {
    /// Non-spot, untextured light facing the origin along -Z
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color,
            direction: -Vec3::new(0.0, 0.0, 3.0),
            is_spotlight: false,
            has_texture: false,
        }
    }

    /// std140 snapshot
    pub fn to_block(&self) -> LightBlock {
        LightBlock {
            position: self.position.into(),
            _padding0: 0.0,
            color: self.color.into(),
            _padding1: 0.0,
            direction: self.direction.into(),
            _padding2: 0.0,
            is_spotlight: self.is_spotlight.into(),
            has_texture: self.has_texture.into(),
            _padding3: [0; 2],
        }
    }
}

/// Position used for lights added at runtime
pub const NEW_LIGHT_POSITION: [f32; 3] = [0.4, 1.2, 0.0];

/// Ordered light list with one selected entry.
///
/// Never empty: the last light cannot be removed, and the selection always
/// indexes a live light.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSet {
    lights: Vec<Light>,
    selected: usize,
}

impl Default for LightSet {
    fn default() -> Self {
        Self {
            lights: vec![
                Light::new(Vec3::new(0.0, 0.0, 3.0), Vec3::repeat(1.0)),
                Light::new(Vec3::new(0.0, 0.0, 2.0), Vec3::repeat(2.0)),
            ],
            selected: 0,
        }
    }
}

impl LightSet {
    /// Append a light at [`NEW_LIGHT_POSITION`]; refused at [`MAX_LIGHT`]
    pub fn add_light(&mut self) -> bool {
        if self.lights.len() >= MAX_LIGHT {
            log::warn!("Light limit of {MAX_LIGHT} reached");
            return false;
        }
        self.lights.push(Light::new(Vec3::from(NEW_LIGHT_POSITION), Vec3::repeat(1.0)));
        log::debug!("Added light {}", self.lights.len() - 1);
        true
    }

    /// Remove the selected light, clamping the selection
    pub fn remove_selected(&mut self) -> bool {
        if self.lights.len() <= 1 {
            log::warn!("Cannot remove the last light");
            return false;
        }
        self.lights.remove(self.selected);
        self.selected = self.selected.min(self.lights.len() - 1);
        true
    }

    /// Select by index; out-of-range indices are ignored
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.lights.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    /// Selected index
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Selected light
    pub fn selected(&self) -> &Light {
        &self.lights[self.selected]
    }

    /// Selected light, mutably
    pub fn selected_mut(&mut self) -> &mut Light {
        &mut self.lights[self.selected]
    }

    /// All lights
    pub fn iter(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter()
    }

    /// Number of lights
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Array block with the live count
    pub fn array_block(&self) -> (LightArrayBlock, usize) {
        LightArrayBlock::pack(self.lights.iter().map(Light::to_block))
    }
}
