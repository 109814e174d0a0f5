use glam::{Mat4, Vec3};

pub const ORBIT_SENSITIVITY: f32 = 0.008;
pub const ZOOM_STEP: f32 = 0.5;
pub const MIN_DISTANCE: f32 = 1.0;
pub const MAX_DISTANCE: f32 = 20.0;
pub const FOV_Y: f32 = 50.0 * std::f32::consts::PI / 180.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 100.0;

/// Orbit camera around the normalized model at the origin.
///
/// Starts on the +Z axis at distance 5 looking at the origin. Dragging
/// orbits, scrolling zooms within [MIN_DISTANCE, MAX_DISTANCE].
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 5.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        ) * self.distance
    }

    /// Apply a pointer drag delta in physical pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * ORBIT_SENSITIVITY;
        self.pitch = (self.pitch + dy * ORBIT_SENSITIVITY).clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
    }

    /// Apply scroll-wheel zoom in wheel lines.
    pub fn zoom(&mut self, lines: f32) {
        self.distance = (self.distance - lines * ZOOM_STEP).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(FOV_Y, aspect, Z_NEAR, Z_FAR) * self.view_matrix()
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_position_on_z_axis() {
        let camera = OrbitCamera::new();
        let position = camera.position();
        assert!((position - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn test_zoom_clamps_to_range() {
        let mut camera = OrbitCamera::new();
        camera.zoom(100.0);
        assert_eq!(camera.distance, MIN_DISTANCE);
        camera.zoom(-100.0);
        assert_eq!(camera.distance, MAX_DISTANCE);
    }

    #[test]
    fn test_pitch_clamped_short_of_poles() {
        let mut camera = OrbitCamera::new();
        camera.orbit(0.0, 10_000.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
        // Distance is unaffected by orbiting
        assert!((camera.position().length() - camera.distance).abs() < 1e-4);
    }

    #[test]
    fn test_view_matrix_looks_at_origin() {
        let mut camera = OrbitCamera::new();
        camera.orbit(120.0, -40.0);
        let view = camera.view_matrix();
        let origin_in_view = view.transform_point3(Vec3::ZERO);
        // The origin sits straight ahead at -distance on the view z axis
        assert!(origin_in_view.x.abs() < 1e-4);
        assert!(origin_in_view.y.abs() < 1e-4);
        assert!((origin_in_view.z + camera.distance).abs() < 1e-4);
    }
}
