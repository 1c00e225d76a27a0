//! Orbit camera, projection and the camera uniform block.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::config::RenderParams;

const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 20.0;
const PITCH_LIMIT: f32 = 1.5;

/// Orbit camera looking at the simulation box.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
}

impl Camera {
    /// Front view of the box, slightly above the equator.
    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.15,
            distance: 3.5,
            target: Vec3::ZERO,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Rotate around the target by the given angles.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Move toward (positive) or away from (negative) the target.
    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance * (1.0 - amount * 0.1)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// Perspective projection matching the current surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub width: u32,
    pub height: u32,
}

impl Projection {
    pub fn new(params: &RenderParams, width: u32, height: u32) -> Self {
        Self {
            fov_y: params.fov_y_degrees.to_radians(),
            near: params.near,
            far: params.far,
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect(), self.near, self.far)
    }
}

/// GPU layout of the `Camera` WGSL block.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    /// `(width, height, 1/width, 1/height)` in pixels.
    pub viewport: [f32; 4],
    pub particle_radius: f32,
    pub near: f32,
    pub far: f32,
    pub _pad: f32,
}

impl CameraUniforms {
    pub fn new(camera: &Camera, projection: &Projection, particle_radius: f32) -> Self {
        let view = camera.view_matrix();
        let (w, h) = (projection.width as f32, projection.height as f32);
        Self {
            view: view.to_cols_array_2d(),
            proj: projection.matrix().to_cols_array_2d(),
            inv_view: view.inverse().to_cols_array_2d(),
            viewport: [w, h, 1.0 / w, 1.0 / h],
            particle_radius,
            near: projection.near,
            far: projection.far,
            _pad: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_uniform_size() {
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 224);
    }

    #[test]
    fn test_origin_is_in_front_of_camera() {
        let camera = Camera::new();
        let view_origin = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(view_origin.z < 0.0);
        assert!((view_origin.z + camera.distance).abs() < 1e-4);
    }

    #[test]
    fn test_orbit_clamps_pitch_and_zoom_clamps_distance() {
        let mut camera = Camera::new();
        camera.orbit(0.3, 10.0);
        assert_eq!(camera.pitch, PITCH_LIMIT);
        for _ in 0..200 {
            camera.zoom(5.0);
        }
        assert_eq!(camera.distance, MIN_DISTANCE);
    }

    #[test]
    fn test_projection_ignores_zero_size() {
        let mut projection = Projection::new(&RenderParams::default(), 0, 0);
        assert_eq!(projection.aspect(), 1.0);
        projection.resize(200, 100);
        assert_eq!(projection.aspect(), 2.0);
    }
}
