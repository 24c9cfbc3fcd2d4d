//! Surface materials: Blinn-Phong with named presets, and metal/roughness.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::render::uniforms::{MaterialBlock, PbrMaterialBlock};

/// Blinn-Phong material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Diffuse color
    pub kd: Vec3,
    /// Specular color
    pub ks: Vec3,
    /// Specular exponent
    pub shininess: f32,
    /// Opacity
    pub transparency: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kd: Vec3::new(0.1, 1.0, 0.1),
            ks: Vec3::new(0.5, 0.5, 1.0),
            shininess: 1.0,
            transparency: 1.0,
        }
    }
}

impl Material {
    /// Material with the given colors and exponent, fully opaque
    pub fn new(kd: Vec3, ks: Vec3, shininess: f32) -> Self {
        Self {
            kd,
            ks,
            shininess,
            transparency: 1.0,
        }
    }

    /// Same material with another diffuse color
    pub fn with_kd(self, kd: Vec3) -> Self {
        Self { kd, ..self }
    }

    /// std140 snapshot
    pub fn to_block(&self) -> MaterialBlock {
        MaterialBlock {
            kd: self.kd.into(),
            _padding0: 0.0,
            ks: self.ks.into(),
            shininess: self.shininess,
            transparency: self.transparency,
            _padding1: [0.0; 3],
        }
    }
}

/// Classic measured metal materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialPreset {
    /// Brass
    Brass,
    /// Bronze
    Bronze,
    /// Polished bronze
    PolishedBronze,
    /// Chrome
    Chrome,
    /// Copper
    Copper,
    /// Polished copper
    PolishedCopper,
    /// Gold
    Gold,
    /// Polished gold
    PolishedGold,
}

impl MaterialPreset {
    /// Every preset in menu order
    pub const ALL: [Self; 8] = [
        Self::Brass,
        Self::Bronze,
        Self::PolishedBronze,
        Self::Chrome,
        Self::Copper,
        Self::PolishedCopper,
        Self::Gold,
        Self::PolishedGold,
    ];

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Brass => "Brass",
            Self::Bronze => "Bronze",
            Self::PolishedBronze => "Polished Bronze",
            Self::Chrome => "Chrome",
            Self::Copper => "Copper",
            Self::PolishedCopper => "Polished Copper",
            Self::Gold => "Gold",
            Self::PolishedGold => "Polished Gold",
        }
    }

    /// Preset parameters
    pub fn material(self) -> Material {
        let (kd, ks, shininess) = match self {
            Self::Brass => ([0.780_392, 0.568_627, 0.113_725], [0.992_157, 0.941_176, 0.807_843], 27.8974),
            Self::Bronze => ([0.714, 0.4284, 0.181_44], [0.393_548, 0.271_906, 0.166_721], 25.6),
            Self::PolishedBronze => ([0.4, 0.2368, 0.1036], [0.774_597, 0.458_561, 0.200_621], 76.8),
            Self::Chrome => ([0.4, 0.4, 0.4], [0.774_597, 0.774_597, 0.774_597], 76.8),
            Self::Copper => ([0.7038, 0.270_48, 0.0828], [0.256_777, 0.137_622, 0.086_014], 12.8),
            Self::PolishedCopper => ([0.5508, 0.2118, 0.066], [0.580_594, 0.223_257, 0.069_570_1], 51.2),
            Self::Gold => ([0.751_64, 0.606_48, 0.226_48], [0.628_281, 0.555_802, 0.366_065], 51.2),
            Self::PolishedGold => ([0.346_15, 0.3143, 0.0903], [0.797_357, 0.723_991, 0.208_006], 83.2),
        };
        Material::new(Vec3::from(kd), Vec3::from(ks), shininess)
    }

    /// Next preset, wrapping
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|&p| p == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Metal/roughness material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PbrMaterial {
    /// Base color
    pub albedo: Vec3,
    /// Metalness in [0, 1]
    pub metallic: f32,
    /// Roughness in [0, 1]
    pub roughness: f32,
    /// Ambient occlusion
    pub ao: f32,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            albedo: Vec3::new(0.5, 0.0, 0.0),
            metallic: 0.5,
            roughness: 0.5,
            ao: 1.0,
        }
    }
}

impl PbrMaterial {
    /// std140 snapshot
    pub fn to_block(&self) -> PbrMaterialBlock {
        PbrMaterialBlock {
            albedo: self.albedo.into(),
            metallic: self.metallic,
            roughness: self.roughness,
            ao: self.ao,
            _padding: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_material_is_green() {
        let block = Material::default().to_block();
        assert_eq!(block.kd, [0.1, 1.0, 0.1]);
        assert_eq!(block.ks, [0.5, 0.5, 1.0]);
    }

    #[test]
    fn presets_cycle_through_all() {
        let mut preset = MaterialPreset::Brass;
        for _ in 0..MaterialPreset::ALL.len() {
            preset = preset.next();
        }
        assert_eq!(preset, MaterialPreset::Brass);
    }

    #[test]
    fn polished_gold_is_shiniest() {
        let max = MaterialPreset::ALL
            .iter()
            .max_by(|a, b| a.material().shininess.total_cmp(&b.material().shininess))
            .copied();
        assert_eq!(max, Some(MaterialPreset::PolishedGold));
        assert_relative_eq!(MaterialPreset::Chrome.material().kd.x, 0.4);
    }
}
