//! Viewer cameras.
//!
//! [`Camera`] keeps two parallel transforms. The raw transform is what the
//! camera is *now*: it drives spatial audio (listener position, velocity,
//! basis). The smoothed transform trails it through an exponential moving
//! average and is the only one used to build the view matrix, so input
//! jitter never reaches the screen.
//!
//! [`OrbitalCamera`] parametrizes the raw transform with spherical
//! coordinates around a focus point.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::smoothing::exp_mov_avg;

/// Margin kept between the altitude and the poles.
pub const ALTITUDE_EPSILON: f32 = 1e-6;

/// Closest the orbit may get to its focus.
pub const MIN_DISTANCE: f32 = 1.0;

/// A free camera with raw and smoothed transforms.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    orientation: Quat,
    previous_position: Vec3,
    smoothed_position: Vec3,
    smoothed_orientation: Quat,
    generations: f32,
    /// Set once the first transform has been recorded.
    primed: bool,
}

impl Camera {
    /// Create a camera that smooths over `generations` frames.
    pub fn new(generations: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            previous_position: Vec3::ZERO,
            smoothed_position: Vec3::ZERO,
            smoothed_orientation: Quat::IDENTITY,
            generations,
            primed: false,
        }
    }

    /// Raw position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Raw orientation (camera space to world space).
    #[inline]
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// Smoothed position used for rendering.
    #[inline]
    pub fn smoothed_position(&self) -> Vec3 {
        self.smoothed_position
    }

    /// Smoothed orientation used for rendering.
    #[inline]
    pub fn smoothed_orientation(&self) -> Quat {
        self.smoothed_orientation
    }

    /// Move the raw position, remembering where the camera was.
    pub fn move_to(&mut self, position: Vec3) {
        self.previous_position = if self.primed { self.position } else { position };
        self.position = position;
    }

    /// One-frame finite difference of the raw position, unsmoothed.
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.position - self.previous_position
    }

    /// Orient the raw transform towards `target` (right-handed, Y up).
    ///
    /// Leaves the orientation untouched when `target` coincides with the
    /// position or lies straight above or below it.
    pub fn look_at(&mut self, target: Vec3) {
        let z = (self.position - target).normalize_or_zero();
        let x = Vec3::Y.cross(z).normalize_or_zero();
        if z == Vec3::ZERO || x == Vec3::ZERO {
            return;
        }
        let y = z.cross(x);
        // Rows x/y/z form the world-to-camera rotation; its inverse has them as columns.
        self.orientation = Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize();
    }

    /// Direction the camera looks along.
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Camera-space +X in world space.
    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    /// Camera-space +Y in world space.
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// Advance the smoothed transform towards the raw one and return the
    /// view matrix to render with.
    ///
    /// The first call snaps the smoothed transform to the raw one.
    pub fn invoke(&mut self) -> Mat4 {
        if self.primed {
            exp_mov_avg(&mut self.smoothed_position, self.position, self.generations);
            exp_mov_avg(&mut self.smoothed_orientation, self.orientation, self.generations);
        } else {
            self.smoothed_position = self.position;
            self.smoothed_orientation = self.orientation;
            self.primed = true;
        }
        self.view_matrix()
    }

    /// Inverse of the smoothed camera transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.smoothed_orientation, self.smoothed_position)
            .inverse()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(8.0)
    }
}

/// Camera orbiting a focus point on a sphere.
///
/// Altitude is the polar angle from +Y and is kept away from the poles;
/// azimuth is unbounded.
#[derive(Debug, Clone)]
pub struct OrbitalCamera {
    camera: Camera,
    distance: f32,
    altitude: f32,
    azimuth: f32,
    focus: Vec3,
    /// Zero means "no upper bound".
    max_distance: f32,
}

impl OrbitalCamera {
    /// Orbit 200 units out on the horizon, on the -Z side of the focus.
    pub fn new() -> Self {
        Self {
            camera: Camera::new(8.0),
            distance: 200.0,
            altitude: FRAC_PI_2,
            azimuth: -FRAC_PI_2,
            focus: Vec3::ZERO,
            max_distance: 0.0,
        }
    }

    /// Set the number of frames the rendered transform averages over.
    pub fn with_smoothing(mut self, generations: f32) -> Self {
        self.camera.generations = generations;
        self
    }

    /// Set the initial orbit.
    pub fn with_orbit(mut self, distance: f32, altitude: f32, azimuth: f32) -> Self {
        self.set_distance(distance);
        self.set_altitude(altitude);
        self.set_azimuth(azimuth);
        self
    }

    /// Set the upper distance bound.
    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.set_max_distance(max_distance);
        self
    }

    #[inline]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    #[inline]
    pub fn altitude(&self) -> f32 {
        self.altitude
    }

    #[inline]
    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    #[inline]
    pub fn focus(&self) -> Vec3 {
        self.focus
    }

    #[inline]
    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// The underlying camera (raw and smoothed transforms).
    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Raw position after the last [`invoke`](Self::invoke).
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.camera.position()
    }

    /// Raw one-frame velocity.
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.camera.velocity()
    }

    /// Set the distance bound; zero or negative disables it.
    pub fn set_max_distance(&mut self, max_distance: f32) {
        self.max_distance = if max_distance > 0.0 { max_distance } else { 0.0 };
        self.set_distance(self.distance);
    }

    /// Clamp to `[1, max_distance]`, or `[1, ∞)` without a bound.
    /// NaN leaves the distance unchanged.
    pub fn set_distance(&mut self, distance: f32) {
        if distance.is_nan() {
            return;
        }
        let mut distance = distance.max(MIN_DISTANCE);
        if self.max_distance > 0.0 {
            distance = distance.min(self.max_distance);
        }
        self.distance = distance;
    }

    /// Clamp into `(0, π)` with [`ALTITUDE_EPSILON`] margin.
    /// NaN leaves the altitude unchanged.
    pub fn set_altitude(&mut self, altitude: f32) {
        if altitude.is_nan() {
            return;
        }
        self.altitude = altitude.clamp(ALTITUDE_EPSILON, PI - ALTITUDE_EPSILON);
    }

    /// Set the azimuth. Non-finite values are ignored.
    pub fn set_azimuth(&mut self, azimuth: f32) {
        if azimuth.is_finite() {
            self.azimuth = azimuth;
        }
    }

    pub fn set_focus(&mut self, focus: Vec3) {
        self.focus = focus;
    }

    /// Rotate the orbit by the given angle deltas.
    pub fn rotate(&mut self, d_azimuth: f32, d_altitude: f32) {
        self.set_azimuth(self.azimuth + d_azimuth);
        self.set_altitude(self.altitude + d_altitude);
    }

    /// Spherical to Cartesian for the current orbit.
    pub fn orbit_position(&self) -> Vec3 {
        let (sin_alt, cos_alt) = self.altitude.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        self.focus + self.distance * Vec3::new(sin_alt * cos_az, cos_alt, sin_alt * sin_az)
    }

    /// Place the camera on the orbit, aim it at the focus and advance the
    /// smoothing step. Returns the view matrix to render with.
    pub fn invoke(&mut self) -> Mat4 {
        self.camera.move_to(self.orbit_position());
        self.camera.look_at(self.focus);
        self.camera.invoke()
    }
}

impl Default for OrbitalCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.abs_diff_eq(b, 1e-3)
    }

    #[test]
    fn test_default_orbit_sits_on_z_axis() {
        let mut camera = OrbitalCamera::new();
        camera.invoke();
        let p = camera.position();
        assert!(p.x.abs() < 1e-3);
        assert!(p.y.abs() < 1e-3);
        assert!((p.z.abs() - 200.0).abs() < 1e-3);
        // sin(-π/2) places the default camera on -Z
        assert!(approx(p, Vec3::new(0.0, 0.0, -200.0)));
    }

    #[test]
    fn test_invoke_matches_spherical_formula() {
        let mut camera = OrbitalCamera::new();
        let focus = Vec3::new(3.0, -2.0, 7.0);
        camera.set_focus(focus);
        for &(d, alt, az) in &[(10.0, 0.3, 0.0), (55.0, 1.2, 2.5), (400.0, 2.9, -7.0)] {
            camera.set_distance(d);
            camera.set_altitude(alt);
            camera.set_azimuth(az);
            camera.invoke();
            let expected = focus
                + d * Vec3::new(
                    f32::sin(alt) * f32::cos(az),
                    f32::cos(alt),
                    f32::sin(alt) * f32::sin(az),
                );
            assert!(approx(camera.position(), expected));
        }
    }

    #[test]
    fn test_altitude_clamps_into_open_interval() {
        let mut camera = OrbitalCamera::new();
        for value in [f32::INFINITY, f32::NEG_INFINITY, -1.0, 0.0, PI, 10.0, f32::MAX] {
            camera.set_altitude(value);
            let alt = camera.altitude();
            assert!(alt > 0.0 && alt < PI, "{} -> {}", value, alt);
            assert!(alt >= ALTITUDE_EPSILON && alt <= PI - ALTITUDE_EPSILON);
        }
    }

    #[test]
    fn test_altitude_nan_keeps_range() {
        let mut camera = OrbitalCamera::new();
        camera.set_altitude(1.0);
        camera.set_altitude(f32::NAN);
        assert_eq!(camera.altitude(), 1.0);
    }

    #[test]
    fn test_altitude_idempotent_in_range() {
        let mut camera = OrbitalCamera::new();
        camera.set_altitude(0.75);
        camera.set_altitude(camera.altitude());
        camera.set_altitude(camera.altitude());
        assert_eq!(camera.altitude(), 0.75);
    }

    #[test]
    fn test_distance_clamps() {
        let mut camera = OrbitalCamera::new();
        camera.set_distance(0.1);
        assert_eq!(camera.distance(), 1.0);

        // No upper bound while max distance is unset
        camera.set_distance(5_000.0);
        assert_eq!(camera.distance(), 5_000.0);

        camera.set_max_distance(1000.0);
        assert_eq!(camera.distance(), 1000.0);
        camera.set_distance(250.0);
        assert_eq!(camera.distance(), 250.0);
        camera.set_distance(f32::INFINITY);
        assert_eq!(camera.distance(), 1000.0);
    }

    #[test]
    fn test_look_at_matches_glam() {
        let mut camera = Camera::new(1.0);
        camera.move_to(Vec3::new(10.0, 5.0, -3.0));
        camera.look_at(Vec3::ZERO);
        let view = camera.invoke();
        let expected = Mat4::look_at_rh(Vec3::new(10.0, 5.0, -3.0), Vec3::ZERO, Vec3::Y);
        assert!(view.abs_diff_eq(expected, 1e-3));
    }

    #[test]
    fn test_basis_vectors() {
        let mut camera = OrbitalCamera::new();
        camera.invoke();
        let cam = camera.camera();
        // Camera on -Z looking at the origin looks along +Z
        assert!(approx(cam.forward(), Vec3::Z));
        assert!(approx(cam.up(), Vec3::Y));
        assert!(approx(cam.right(), Vec3::NEG_X));
        assert!(cam.forward().dot(cam.right()).abs() < 1e-5);
    }

    #[test]
    fn test_velocity_is_raw_difference() {
        let mut camera = OrbitalCamera::new();
        camera.invoke();
        assert_eq!(camera.velocity(), Vec3::ZERO);

        let before = camera.position();
        camera.set_distance(150.0);
        camera.invoke();
        let after = camera.position();
        assert!(approx(camera.velocity(), after - before));
    }

    #[test]
    fn test_smoothed_position_trails_raw() {
        let mut camera = OrbitalCamera::new().with_smoothing(8.0);
        camera.invoke();
        camera.set_distance(100.0);
        camera.invoke();

        let raw = camera.position();
        let smoothed = camera.camera().smoothed_position();
        assert!(!approx(raw, smoothed));
        // One step closes alpha = 2/9 of the gap
        let start = Vec3::new(0.0, 0.0, -200.0);
        let expected = start + (raw - start) * (2.0 / 9.0);
        assert!(approx(smoothed, expected));

        for _ in 0..500 {
            camera.invoke();
        }
        assert!(approx(camera.camera().smoothed_position(), raw));
    }
}
