use glam::{Mat4, Vec3};

pub const FOV_Y_DEGREES: f32 = 75.0;
pub const MIN_DISTANCE: f32 = 1.0;
pub const MAX_DISTANCE: f32 = 10.0;
const ORBIT_PER_PIXEL: f32 = 0.005;
const ZOOM_PER_LINE: f32 = 0.95;
// Keeps the view matrix defined at the poles.
const POLAR_EPSILON: f32 = 1e-4;

/// Perspective camera orbiting a target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    distance: f32,
    azimuth: f32,
    polar: f32,
    /// Cleared while the gizmo is being dragged.
    pub enabled: bool,
}

impl OrbitCamera {
    /// Camera at `eye` looking at the origin.
    pub fn new(eye: Vec3, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            target: Vec3::ZERO,
            fov_y: FOV_Y_DEGREES.to_radians(),
            aspect: sanitize_aspect(aspect),
            near,
            far,
            distance: 1.0,
            azimuth: 0.0,
            polar: std::f32::consts::FRAC_PI_2,
            enabled: true,
        };
        camera.look_from(eye);
        camera
    }

    pub fn look_from(&mut self, eye: Vec3) {
        let offset = eye - self.target;
        let distance = offset.length();
        if !distance.is_finite() || distance < 1e-6 {
            return;
        }
        self.distance = distance.clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.azimuth = offset.x.atan2(offset.z);
        self.polar = (offset.y / distance).clamp(-1.0, 1.0).acos();
        self.clamp_polar();
    }

    #[cfg(test)]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    #[cfg(test)]
    pub fn polar(&self) -> f32 {
        self.polar
    }

    pub fn eye(&self) -> Vec3 {
        let sin_polar = self.polar.sin();
        self.target
            + Vec3::new(
                sin_polar * self.azimuth.sin(),
                self.polar.cos(),
                sin_polar * self.azimuth.cos(),
            ) * self.distance
    }

    /// Forward, right and up unit vectors.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(forward).normalize_or(Vec3::Y);
        (forward, right, up)
    }

    /// Rotates around the target by a pointer delta in pixels. Ignored while
    /// the camera is disabled.
    pub fn orbit(&mut self, dx: f32, dy: f32) -> bool {
        if !self.enabled || (dx == 0.0 && dy == 0.0) {
            return false;
        }
        self.azimuth = (self.azimuth - dx * ORBIT_PER_PIXEL).rem_euclid(std::f32::consts::TAU);
        self.polar -= dy * ORBIT_PER_PIXEL;
        self.clamp_polar();
        true
    }

    /// Positive `lines` moves closer.
    pub fn zoom(&mut self, lines: f32) -> bool {
        if !self.enabled || lines == 0.0 || !lines.is_finite() {
            return false;
        }
        let distance =
            (self.distance * ZOOM_PER_LINE.powf(lines)).clamp(MIN_DISTANCE, MAX_DISTANCE);
        let changed = distance != self.distance;
        self.distance = distance;
        changed
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = sanitize_aspect(width as f32 / height as f32);
        }
    }

    pub fn set_clip(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    pub fn view_matrix(&self) -> Mat4 {
        let (_, _, up) = self.basis();
        Mat4::look_at_rh(self.eye(), self.target, up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let near = self.near.max(1e-4);
        let far = self.far.max(near + 1e-3);
        Mat4::perspective_rh(self.fov_y, self.aspect, near, far)
    }

    fn clamp_polar(&mut self) {
        self.polar = self
            .polar
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(Vec3::new(0.0, 0.0, 2.0), 16.0 / 9.0, 0.1, 1000.0)
    }

    #[test]
    fn starts_at_requested_eye() {
        let camera = camera();
        assert!(camera.eye().abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));
        assert!((camera.distance() - 2.0).abs() < 1e-6);
        let (forward, right, up) = camera.basis();
        assert!(forward.abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert!(right.abs_diff_eq(Vec3::X, 1e-5));
        assert!(up.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = camera();
        for _ in 0..200 {
            camera.zoom(1.0);
        }
        assert_eq!(camera.distance(), MIN_DISTANCE);
        for _ in 0..200 {
            camera.zoom(-1.0);
        }
        assert_eq!(camera.distance(), MAX_DISTANCE);
    }

    #[test]
    fn polar_angle_stays_within_half_turn() {
        let mut camera = camera();
        camera.orbit(0.0, 100_000.0);
        assert!(camera.polar() > 0.0);
        camera.orbit(0.0, -100_000.0);
        assert!(camera.polar() < std::f32::consts::PI);
        assert!(camera.eye().is_finite());
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn disabled_camera_ignores_input() {
        let mut camera = camera();
        camera.enabled = false;
        let before = camera;
        assert!(!camera.orbit(10.0, 10.0));
        assert!(!camera.zoom(3.0));
        assert_eq!(camera, before);
    }

    #[test]
    fn resize_updates_aspect_and_ignores_zero_height() {
        let mut camera = camera();
        camera.set_aspect(800, 400);
        assert_eq!(camera.aspect, 2.0);
        camera.set_aspect(800, 0);
        assert_eq!(camera.aspect, 2.0);
        assert!(camera.projection_matrix().is_finite());
    }
}
