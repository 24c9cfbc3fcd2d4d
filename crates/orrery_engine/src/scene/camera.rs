//! # Cameras
//!
//! Free-fly cameras driven by WASD/RF and left-drag mouse look, with an
//! optional cubic Bezier path that can run at constant speed.
//!
//! Only the selected camera has user interaction enabled. The others keep
//! tracking the cursor so switching cameras does not produce a jump from a
//! stale cursor delta.

use crate::foundation::math::{Mat4, Mat4Ext, Unit, Vec3};
use crate::input::{InputState, KeyCode, MouseButton};

const MOVE_SPEED: f32 = 0.05;
const LOOK_SPEED: f32 = 0.0035;

/// Cubic Bezier camera path
#[derive(Debug, Clone, PartialEq)]
pub struct BezierPath {
    /// Control points P0..P3
    pub points: [Vec3; 4],
    /// Parameter advance per frame
    pub time_step: f32,
    /// Multiplier on `time_step` in constant-speed mode
    pub speed: f32,
    /// Arc-length table resolution
    pub sample_count: usize,
    time: f32,
    arc_lengths: Vec<f32>,
    table_key: Option<([Vec3; 4], usize)>,
}

impl Default for BezierPath {
    fn default() -> Self {
        Self {
            points: [
                Vec3::new(0.0, 4.0, 0.0),
                Vec3::new(0.0, 6.0, -8.0),
                Vec3::new(5.0, 7.0, -15.0),
                Vec3::new(0.0, 4.0, 0.0),
            ],
            time_step: 0.001,
            speed: 1.0,
            sample_count: 1000,
            time: 0.0,
            arc_lengths: Vec::new(),
            table_key: None,
        }
    }
}

impl BezierPath {
    /// Point at parameter `t`
    pub fn point(&self, t: f32) -> Vec3 {
        let [p0, p1, p2, p3] = self.points;
        let u = 1.0 - t;
        p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
    }

    /// Current path parameter
    pub fn time(&self) -> f32 {
        self.time
    }

    fn rebuild_table_if_stale(&mut self) {
        let key = (self.points, self.sample_count);
        if self.table_key == Some(key) {
            return;
        }

        let n = self.sample_count.max(2);
        let mut table = Vec::with_capacity(n);
        table.push(0.0);
        let mut previous = self.points[0];
        let mut total = 0.0;
        for i in 1..n {
            let current = self.point(i as f32 / (n - 1) as f32);
            total += (current - previous).norm();
            table.push(total);
            previous = current;
        }
        if total > 0.0 {
            table.iter_mut().for_each(|length| *length /= total);
        }

        log::debug!("Rebuilt arc-length table with {n} samples, length {total:.3}");
        self.arc_lengths = table;
        self.table_key = Some(key);
    }

    /// Parameter whose normalized arc length first reaches `distance`
    pub fn parameter_for_arc_length(&self, distance: f32) -> f32 {
        if self.arc_lengths.len() < 2 {
            return distance;
        }
        let index = self.arc_lengths.partition_point(|&length| length < distance);
        index.min(self.arc_lengths.len() - 1) as f32 / (self.arc_lengths.len() - 1) as f32
    }

    /// Step along the path and return the new position
    pub fn advance(&mut self, constant_speed: bool) -> Vec3 {
        let position = if constant_speed {
            self.rebuild_table_if_stale();
            self.time += self.speed * self.time_step;
            self.point(self.parameter_for_arc_length(self.time))
        } else {
            self.time += self.time_step;
            self.point(self.time)
        };
        if self.time > 1.0 {
            self.time = 0.0;
        }
        position
    }
}

/// Perspective camera position and orientation
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    user_interaction: bool,
    prev_cursor: (f64, f64),
    /// Follow [`Self::bezier`] instead of user input
    pub use_bezier: bool,
    /// Reparameterize the path by arc length
    pub constant_speed: bool,
    /// Always look at the world origin
    pub lock_view: bool,
    /// Path followed while `use_bezier` is set
    pub bezier: BezierPath,
}

impl Camera {
    /// Camera at `position` looking along `forward`
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: forward.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::z()),
            up: Vec3::y(),
            user_interaction: true,
            prev_cursor: (0.0, 0.0),
            use_bezier: false,
            constant_speed: false,
            lock_view: false,
            bezier: BezierPath::default(),
        }
    }

    /// The two startup cameras
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(Vec3::new(1.2, 1.1, 0.9), -Vec3::new(1.2, 1.1, 0.9)),
            Self::new(Vec3::new(3.8, 1.0, 0.06), -Vec3::new(1.8, 1.0, 0.5)),
        ]
    }

    /// Enable or disable keyboard/mouse control
    pub fn set_user_interaction(&mut self, enabled: bool) {
        self.user_interaction = enabled;
    }

    /// World-space position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// View matrix, honoring `lock_view`
    pub fn view_matrix(&self) -> Mat4 {
        if self.lock_view {
            let toward_origin = (-self.position).try_normalize(f32::EPSILON).unwrap_or(self.forward);
            Mat4::look_at_gl(self.position, self.position + toward_origin, Vec3::y())
        } else {
            Mat4::look_at_gl(self.position, self.position + self.forward, self.up)
        }
    }

    fn horizontal_axis(&self) -> Vec3 {
        Vec3::y().cross(&self.forward)
    }

    fn rotate_about(&mut self, axis: Vec3, angle: f32) {
        let horizontal = self.horizontal_axis();
        if let Some(axis) = Unit::try_new(axis, f32::EPSILON) {
            let rotation = nalgebra::UnitQuaternion::from_axis_angle(&axis, angle);
            self.forward = (rotation * self.forward).normalize();
        }
        if let Some(up) = self.forward.cross(&horizontal).try_normalize(f32::EPSILON) {
            self.up = up;
        }
    }

    /// Pitch about the horizontal axis
    pub fn rotate_x(&mut self, angle: f32) {
        self.rotate_about(self.horizontal_axis(), angle);
    }

    /// Yaw about world Y
    pub fn rotate_y(&mut self, angle: f32) {
        self.rotate_about(Vec3::y(), angle);
    }

    /// Apply one frame of path motion or user input
    pub fn update_input<I: InputState + ?Sized>(&mut self, input: &I) {
        if self.use_bezier {
            self.position = self.bezier.advance(self.constant_speed);
            return;
        }

        if !self.user_interaction {
            self.prev_cursor = input.cursor_pos();
            return;
        }

        let right = self.forward.cross(&self.up).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x);
        let moves = [
            (KeyCode::A, -right),
            (KeyCode::D, right),
            (KeyCode::W, self.forward),
            (KeyCode::S, -self.forward),
            (KeyCode::R, self.up),
            (KeyCode::F, -self.up),
        ];
        for (key, direction) in moves {
            if input.is_key_pressed(key) {
                self.position += MOVE_SPEED * direction;
            }
        }

        let cursor = input.cursor_pos();
        let delta = (
            (LOOK_SPEED as f64 * (cursor.0 - self.prev_cursor.0)) as f32,
            (LOOK_SPEED as f64 * (cursor.1 - self.prev_cursor.1)) as f32,
        );
        self.prev_cursor = cursor;

        if input.is_mouse_button_pressed(MouseButton::Left) {
            if delta.0 != 0.0 {
                self.rotate_y(delta.0);
            }
            if delta.1 != 0.0 {
                self.rotate_x(delta.1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::{MockWindow, RecordingDevice};
    use approx::assert_relative_eq;

    fn window() -> MockWindow {
        MockWindow::new(RecordingDevice::shared(), 10)
    }

    #[test]
    fn w_moves_along_forward() {
        let mut camera = Camera::new(Vec3::zeros(), -Vec3::z());
        let mut input = window();
        input.keys.insert(KeyCode::W);
        camera.update_input(&input);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, -0.05), epsilon = 1e-6);
    }

    #[test]
    fn disabled_camera_only_tracks_cursor() {
        let mut camera = Camera::new(Vec3::zeros(), -Vec3::z());
        camera.set_user_interaction(false);
        let mut input = window();
        input.keys.insert(KeyCode::W);
        input.cursor = (100.0, 0.0);
        camera.update_input(&input);
        assert_eq!(camera.position(), Vec3::zeros());

        // re-enabled with the same cursor: no rotation jump
        camera.set_user_interaction(true);
        input.keys.clear();
        input.buttons.insert(MouseButton::Left);
        camera.update_input(&input);
        assert_relative_eq!(camera.forward(), -Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn drag_yaws_around_world_y() {
        let mut camera = Camera::new(Vec3::zeros(), -Vec3::z());
        let mut input = window();
        input.buttons.insert(MouseButton::Left);
        input.cursor = (100.0, 0.0);
        camera.update_input(&input);

        assert_relative_eq!(camera.forward().y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(camera.forward().norm(), 1.0, epsilon = 1e-6);
        assert!(camera.forward().x.abs() > 0.1);
    }

    #[test]
    fn bezier_endpoints_and_wrap() {
        let mut path = BezierPath::default();
        assert_relative_eq!(path.point(0.0), path.points[0]);
        assert_relative_eq!(path.point(1.0), path.points[3]);

        path.time_step = 0.6;
        path.advance(false);
        path.advance(false);
        assert_eq!(path.time(), 0.0);
    }

    #[test]
    fn arc_length_table_is_normalized_and_monotonic() {
        let mut path = BezierPath::default();
        path.advance(true);
        assert_eq!(path.arc_lengths.len(), 1000);
        assert_relative_eq!(*path.arc_lengths.last().unwrap_or(&0.0), 1.0, epsilon = 1e-5);
        assert!(path.arc_lengths.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(path.parameter_for_arc_length(0.0), 0.0);
        assert_eq!(path.parameter_for_arc_length(1.0), 1.0);
    }

    #[test]
    fn table_rebuilds_when_points_move() {
        let mut path = BezierPath::default();
        path.advance(true);
        let before = path.arc_lengths.clone();
        path.points[2] = Vec3::new(-5.0, 0.0, 3.0);
        path.advance(true);
        assert_ne!(before, path.arc_lengths);
    }

    #[test]
    fn lock_view_looks_at_origin() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::x());
        camera.lock_view = true;
        let origin_in_view = camera.view_matrix().transform_point(&crate::foundation::math::Point3::origin());
        assert_relative_eq!(origin_in_view.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(origin_in_view.z, -5.0, epsilon = 1e-5);
    }
}
