use glam::Vec3;

use crate::render::{RenderError, RenderResult};

/// Thin-lens camera.
///
/// `rotation` holds Euler angles in radians (pitch about X, yaw about Y, roll
/// about Z); the kernel builds the view basis from them. With no rotation the
/// camera looks down +Z with +Y up.
///
/// `sensor_width` and `focal_length` share world units: together they fix the
/// horizontal field of view, and `focal_length` is also the distance of the
/// plane in focus. `aperture == 0` gives a pinhole camera.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Vec3,
    pub sensor_width: f32,
    pub focal_length: f32,
    pub aperture: f32,
    /// Linear radiance scale applied before tone mapping.
    pub exposure: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            sensor_width: 1.0,
            focal_length: 1.0,
            aperture: 0.0,
            exposure: 1.0,
        }
    }
}

impl Camera {
    /// Creates a validated camera.
    pub fn new(
        position: Vec3,
        rotation: Vec3,
        sensor_width: f32,
        focal_length: f32,
        aperture: f32,
        exposure: f32,
    ) -> RenderResult<Self> {
        let camera = Self {
            position,
            rotation,
            sensor_width,
            focal_length,
            aperture,
            exposure,
        };
        camera.validate()?;
        Ok(camera)
    }

    /// Checks the value ranges the kernel relies on.
    pub fn validate(&self) -> RenderResult<()> {
        if !(self.position.is_finite() && self.rotation.is_finite()) {
            return Err(RenderError::invalid_argument("camera position and rotation must be finite"));
        }
        // Written as negated comparisons so NaN fails too.
        if !(self.sensor_width > 0.0) {
            return Err(RenderError::invalid_argument(format!(
                "sensor width must be > 0, got {}",
                self.sensor_width
            )));
        }
        if !(self.focal_length > 0.0) {
            return Err(RenderError::invalid_argument(format!(
                "focal length must be > 0, got {}",
                self.focal_length
            )));
        }
        if !(self.aperture >= 0.0) {
            return Err(RenderError::invalid_argument(format!(
                "aperture must be >= 0, got {}",
                self.aperture
            )));
        }
        if !(self.exposure > 0.0) {
            return Err(RenderError::invalid_argument(format!(
                "exposure must be > 0, got {}",
                self.exposure
            )));
        }
        Ok(())
    }

    /// Horizontal field of view in radians.
    #[inline]
    pub fn horizontal_fov(&self) -> f32 {
        2.0 * (self.sensor_width / (2.0 * self.focal_length)).atan()
    }

    /// Distance from the lens to the plane in perfect focus.
    #[inline]
    pub fn focal_plane_distance(&self) -> f32 {
        self.focal_length
    }

    #[inline]
    pub fn has_depth_of_field(&self) -> bool {
        self.aperture > 0.0
    }
}
