//! Top-down overview inset
//!
//! The minimap draws the scene from straight above into a small viewport,
//! marks the active camera with a dot, and outlines the inset.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3, Vec4};

/// Placement and projection of the overview inset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimap {
    /// Inset rectangle `[x, y, width, height]` in window pixels
    pub viewport: [i32; 4],
    /// Full window size in pixels
    pub window: (u32, u32),
    /// Half extent of the orthographic view volume
    pub extent: f32,
    /// Height of the overhead eye
    pub eye_height: f32,
}

impl Default for Minimap {
    fn default() -> Self {
        Self::new([800, 800, 200, 200], (1024, 1024))
    }
}

impl Minimap {
    /// Inset at `viewport` inside a `window`-sized framebuffer
    pub fn new(viewport: [i32; 4], window: (u32, u32)) -> Self {
        Self {
            viewport,
            window,
            extent: 2.0,
            eye_height: 20.0,
        }
    }

    /// Orthographic projection
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_gl(-self.extent, self.extent, -self.extent, self.extent, 0.1, 30.0)
    }

    /// Overhead view, with -Z pointing up the inset
    pub fn view(&self) -> Mat4 {
        let eye = Vec3::new(0.0, self.eye_height, 0.0);
        Mat4::look_at_gl(eye, eye - Vec3::y(), -Vec3::z())
    }

    /// Inset-space NDC of a world position, after the perspective divide
    pub fn project(&self, world: Vec3) -> Vec3 {
        let clip = self.projection() * self.view() * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w.abs() <= f32::EPSILON {
            return clip.xyz();
        }
        clip.xyz() / clip.w
    }

    /// Inset outline as a line loop in full-window NDC
    pub fn border_ndc(&self) -> [[f32; 2]; 4] {
        let to_ndc = |pixels: i32, size: u32| pixels as f32 / size.max(1) as f32 * 2.0 - 1.0;
        let [x, y, w, h] = self.viewport;
        let (left, right) = (to_ndc(x, self.window.0), to_ndc(x + w, self.window.0));
        let (bottom, top) = (to_ndc(y, self.window.1), to_ndc(y + h, self.window.1));
        [[left, bottom], [right, bottom], [right, top], [left, top]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn origin_projects_to_inset_center() {
        let ndc = Minimap::default().project(Vec3::zeros());
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn negative_z_is_up_on_the_map() {
        let ndc = Minimap::default().project(Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(ndc.y, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn border_covers_top_right_inset() {
        let border = Minimap::default().border_ndc();
        assert_relative_eq!(border[0][0], 800.0 / 1024.0 * 2.0 - 1.0);
        assert_relative_eq!(border[2][1], 1000.0 / 1024.0 * 2.0 - 1.0);
    }
}
