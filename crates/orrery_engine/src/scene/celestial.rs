//! # Celestial Bodies
//!
//! Sun, Earth and Moon animated as a parent chain. Each body's transform is a
//! pure function of the frame counter and its parent's transform, so the
//! whole chain is a fold over the body list:
//!
//! ```text
//! sun   = f(frame, identity, sun)
//! earth = f(frame, sun,      earth)
//! moon  = f(frame, earth,    moon)
//! ```
//!
//! Only the parent's translation is inherited; scale and spin stay local to
//! each body.

use std::path::PathBuf;

use crate::foundation::math::{utils::deg_to_rad, Mat4, Mat4Ext, Vec3};

/// Axis the spinning bodies rotate about
pub const SPIN_AXIS: [f32; 3] = [0.15, -1.0, -0.15];

/// Animated sphere with orbit parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CelestialBody {
    /// Display name
    pub name: String,
    /// Uniform scale of the unit sphere
    pub radius: f32,
    /// Horizontal orbit radius around the parent
    pub orbit_radius: f32,
    /// Vertical orbit amplitude
    pub orbit_height: f32,
    /// Degrees per frame
    pub speed: f32,
    /// Stay at the parent's position
    pub stationary: bool,
    /// Spin about [`SPIN_AXIS`] while orbiting
    pub self_rotating: bool,
    /// Diffuse tint used when the body has no texture
    pub kd: Vec3,
    /// Directory holding the body's texture
    pub texture_dir: PathBuf,
    transform: Mat4,
}

impl CelestialBody {
    /// Body with an identity transform
    pub fn new(name: impl Into<String>, radius: f32, orbit_radius: f32, orbit_height: f32, speed: f32) -> Self {
        Self {
            name: name.into(),
            radius,
            orbit_radius,
            orbit_height,
            speed,
            stationary: false,
            self_rotating: false,
            kd: Vec3::repeat(1.0),
            texture_dir: PathBuf::new(),
            transform: Mat4::identity(),
        }
    }

    /// Mark as fixed at the parent origin
    pub fn stationary(mut self) -> Self {
        self.stationary = true;
        self
    }

    /// Enable self spin
    pub fn self_rotating(mut self) -> Self {
        self.self_rotating = true;
        self
    }

    /// Set the untextured tint
    pub fn with_kd(mut self, kd: Vec3) -> Self {
        self.kd = kd;
        self
    }

    /// Set the texture directory
    pub fn with_texture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.texture_dir = dir.into();
        self
    }

    /// The Sun: large and fixed at the origin
    pub fn sun() -> Self {
        Self::new("sun", 3.0, 12.5, 0.0, 0.0)
            .stationary()
            .with_kd(Vec3::new(0.998, 0.898, 0.439))
            .with_texture_dir("resources/celestial_bodies/sun")
    }

    /// The Earth: orbits the Sun and spins
    pub fn earth() -> Self {
        Self::new("earth", 1.0, 1.9, -0.2, 0.1)
            .self_rotating()
            .with_texture_dir("resources/celestial_bodies/earth")
    }

    /// The Moon: bobs above and below the Earth
    pub fn moon() -> Self {
        Self::new("moon", 0.3, 0.0, 0.7, 1.0)
            .with_texture_dir("resources/celestial_bodies/moon")
    }

    /// Model matrix from the last update
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// `file_name` inside the texture directory
    pub fn texture_file(&self, file_name: &str) -> PathBuf {
        self.texture_dir.join(file_name)
    }

    /// Transform of this body at `frame` given its parent's transform.
    ///
    /// Pure: never reads or writes `self.transform`.
    pub fn compute_transform(&self, frame: u64, parent: &Mat4) -> Mat4 {
        self.update_body_position(frame, parent, self.orbit_radius)
    }

    /// Transform at `frame` orbiting `origin` at `orbit_radius`
    pub fn update_body_position(&self, frame: u64, origin: &Mat4, orbit_radius: f32) -> Mat4 {
        let angle = deg_to_rad(self.speed * frame as f32);
        let scale = Mat4::new_scaling(self.radius);

        let model = if self.stationary {
            scale
        } else {
            let offset = Vec3::new(
                orbit_radius * angle.cos(),
                self.orbit_height * angle.cos(),
                orbit_radius * angle.sin(),
            );
            Mat4::new_translation(&(origin.translation_part() + offset)) * scale
        };

        if self.self_rotating {
            model * Mat4::rotation_about(Vec3::from(SPIN_AXIS), 4.0 * angle)
        } else {
            model
        }
    }
}

/// Parent-ordered body list with a frame counter
#[derive(Debug, Clone, PartialEq)]
pub struct CelestialChain {
    bodies: Vec<CelestialBody>,
    frame: u64,
    evaluations: u64,
}

impl Default for CelestialChain {
    fn default() -> Self {
        Self::new(vec![CelestialBody::sun(), CelestialBody::earth(), CelestialBody::moon()])
    }
}

impl CelestialChain {
    /// Chain over `bodies`, each the parent of the next, evaluated at frame 0
    pub fn new(bodies: Vec<CelestialBody>) -> Self {
        let mut chain = Self {
            bodies,
            frame: 0,
            evaluations: 0,
        };
        chain.evaluate();
        chain
    }

    /// Transforms of the whole chain at `frame`
    pub fn transforms_at(&self, frame: u64) -> Vec<Mat4> {
        self.bodies
            .iter()
            .scan(Mat4::identity(), |parent, body| {
                let transform = body.compute_transform(frame, parent);
                *parent = transform;
                Some(transform)
            })
            .collect()
    }

    fn evaluate(&mut self) {
        let transforms = self.transforms_at(self.frame);
        for (body, transform) in self.bodies.iter_mut().zip(transforms) {
            body.transform = transform;
        }
        self.evaluations += 1;
    }

    /// Advance one frame if `animate`; a paused chain is not re-evaluated
    pub fn tick(&mut self, animate: bool) {
        if !animate {
            return;
        }
        self.frame += 1;
        self.evaluate();
    }

    /// Current frame counter
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// How many times the chain has been evaluated
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Bodies in parent order
    pub fn bodies(&self) -> &[CelestialBody] {
        &self.bodies
    }

    /// Number of bodies
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// True when the chain holds no bodies
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn frame_zero_layout() {
        let chain = CelestialChain::default();
        let [sun, earth, moon] = [0, 1, 2].map(|i| chain.bodies()[i].transform());

        assert_relative_eq!(sun, Mat4::new_scaling(3.0));
        assert_relative_eq!(earth.translation_part(), Vec3::new(1.9, -0.2, 0.0), epsilon = 1e-6);
        assert_relative_eq!(moon.translation_part(), Vec3::new(1.9, 0.5, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn scale_is_not_inherited() {
        let chain = CelestialChain::default();
        let moon = chain.bodies()[2].transform();
        let scaled_x = (moon * crate::foundation::math::Vec4::new(1.0, 0.0, 0.0, 0.0)).xyz();
        assert_relative_eq!(scaled_x.norm(), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn evaluation_is_pure() {
        let body = CelestialBody::earth();
        let parent = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(body.compute_transform(42, &parent), body.compute_transform(42, &parent));

        let chain = CelestialChain::default();
        assert_eq!(chain.transforms_at(90), chain.transforms_at(90));
    }

    #[test]
    fn paused_chain_is_not_reevaluated() {
        let mut chain = CelestialChain::default();
        assert_eq!(chain.evaluations(), 1);
        chain.tick(false);
        assert_eq!((chain.frame(), chain.evaluations()), (0, 1));
        chain.tick(true);
        assert_eq!((chain.frame(), chain.evaluations()), (1, 2));
    }

    #[test]
    fn earth_orbits_quarter_turn() {
        // 0.1 degrees per frame: 900 frames is a quarter orbit
        let transforms = CelestialChain::default().transforms_at(900);
        assert_relative_eq!(transforms[1].translation_part(), Vec3::new(0.0, 0.0, 1.9), epsilon = 1e-5);
    }
}
