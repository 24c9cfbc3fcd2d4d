//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the OpenGL-convention matrix builders the
//! render core needs (clip-space depth in [-1, 1], right-handed view space).

pub use nalgebra::{Matrix3, Matrix4, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

/// Extension trait for Mat4 with the builders used by cameras, light views and
/// the cubemap capture.
pub trait Mat4Ext {
    /// Perspective projection, `fov_y` in radians.
    fn perspective_gl(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Orthographic projection.
    fn orthographic_gl(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix.
    fn look_at_gl(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Rotation about an arbitrary (not necessarily normalized) axis.
    fn rotation_about(axis: Vec3, angle: f32) -> Mat4;

    /// Copy of this matrix with the translation removed, keeping the upper 3x3.
    ///
    /// Used for the environment pass so the sky appears infinitely far away.
    fn rotation_only(&self) -> Mat4;

    /// Translation column of an affine transform.
    fn translation_part(&self) -> Vec3;

    /// Inverse-transpose of the upper 3x3, falling back to identity for
    /// singular matrices.
    fn normal_matrix(&self) -> Mat3;
}

impl Mat4Ext for Mat4 {
    fn perspective_gl(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn orthographic_gl(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_orthographic(left, right, bottom, top, near, far)
    }

    fn look_at_gl(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn rotation_about(axis: Vec3, angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Unit::new_normalize(axis), angle)
    }

    fn rotation_only(&self) -> Mat4 {
        let upper: Mat3 = self.fixed_view::<3, 3>(0, 0).into_owned();
        upper.to_homogeneous()
    }

    fn translation_part(&self) -> Vec3 {
        Vec3::new(self[(0, 3)], self[(1, 3)], self[(2, 3)])
    }

    fn normal_matrix(&self) -> Mat3 {
        let upper: Mat3 = self.fixed_view::<3, 3>(0, 0).into_owned();
        upper
            .try_inverse()
            .map_or_else(Mat3::identity, |inverse| inverse.transpose())
    }
}
