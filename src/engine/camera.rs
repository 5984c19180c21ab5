// First-person camera
//
// Camera model:
//   - Eye position in world space, orientation as pitch/yaw/roll (radians)
//   - Euler order YXZ: yaw around world Y, then pitch around local X
//   - yaw=0, pitch=0 looks along -Z
//   - Mouse look only while look-capture is engaged

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use serde::Deserialize;

use super::triggers::ResetPose;

/// Keeps pitch just short of straight up/down so the flattened
/// forward vector used for walking never degenerates.
pub const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.001;

/// Projection and mouse-look tuning, read from the layout's `camera` section.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Radians of rotation per pixel of mouse motion.
    pub look_sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            look_sensitivity: 0.002,
        }
    }
}

impl CameraSettings {
    /// Replace nonsensical values with defaults. Returns the names of the
    /// fields that were reset so the loader can report them.
    pub fn sanitized(self) -> (Self, Vec<&'static str>) {
        let defaults = Self::default();
        let mut out = self;
        let mut reset = Vec::new();
        if !(self.fov_degrees > 1.0 && self.fov_degrees < 179.0) {
            out.fov_degrees = defaults.fov_degrees;
            reset.push("fov_degrees");
        }
        if !(self.near > 0.0 && self.far > self.near && self.far.is_finite()) {
            out.near = defaults.near;
            out.far = defaults.far;
            reset.push("near/far");
        }
        if !(self.look_sensitivity.is_finite() && self.look_sensitivity > 0.0) {
            out.look_sensitivity = defaults.look_sensitivity;
            reset.push("look_sensitivity");
        }
        (out, reset)
    }
}

/// The player's eye in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,

    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Viewpoint {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            position: Vec3::ZERO,
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            fov: settings.fov_degrees.to_radians(),
            near: settings.near,
            far: settings.far,
        }
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    /// Unit vector the eye is looking along.
    pub fn look_direction(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    /// Rotation as (pitch, yaw, roll).
    pub fn rotation(&self) -> Vec3 {
        Vec3::new(self.pitch, self.yaw, self.roll)
    }

    /// Instantaneous snap of position and orientation. The only place
    /// height is allowed to jump instead of being interpolated.
    pub fn snap_to(&mut self, pose: &ResetPose) {
        self.position = pose.position;
        self.pitch = pose.rotation.x;
        self.yaw = pose.rotation.y;
        self.roll = pose.rotation.z;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.position).inverse()
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Project a world point to screen pixels (origin top-left).
    /// Returns the pixel position and the pixel size of one world unit at
    /// that depth, or `None` when the point is behind the eye or off screen.
    pub fn project_to_screen(&self, world: Vec3, screen: Vec2) -> Option<(Vec2, f32)> {
        if screen.x <= 0.0 || screen.y <= 0.0 {
            return None;
        }
        let clip = self.view_projection(screen.x / screen.y) * world.extend(1.0);
        if clip.w <= self.near {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if ndc.x.abs() > 1.2 || ndc.y.abs() > 1.2 {
            return None;
        }
        let pixel = Vec2::new(
            (ndc.x * 0.5 + 0.5) * screen.x,
            (0.5 - ndc.y * 0.5) * screen.y,
        );
        // Focal length in pixels over view-space depth.
        let focal = screen.y * 0.5 / (self.fov * 0.5).tan();
        Some((pixel, focal / clip.w))
    }
}

/// Pointer-look capture. The host grabs the cursor and calls `engage()`;
/// the locomotion controller only reads `is_engaged()`.
#[derive(Debug, Clone, Copy)]
pub struct LookCapture {
    engaged: bool,
    pub sensitivity: f32,
}

impl LookCapture {
    pub fn new(sensitivity: f32) -> Self {
        Self { engaged: false, sensitivity }
    }

    pub fn engage(&mut self) { self.engaged = true; }
    pub fn release(&mut self) { self.engaged = false; }
    pub fn is_engaged(&self) -> bool { self.engaged }

    /// Turn mouse motion (pixels) into yaw/pitch. Ignored when not engaged.
    pub fn apply_mouse_delta(&self, view: &mut Viewpoint, delta: Vec2) {
        if !self.engaged {
            return;
        }
        view.yaw -= delta.x * self.sensitivity;
        view.pitch = (view.pitch - delta.y * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn default_orientation_looks_down_negative_z() {
        let view = Viewpoint::new(&CameraSettings::default());
        assert!((view.look_direction() - Vec3::NEG_Z).length() < EPS);
    }

    #[test]
    fn quarter_yaw_looks_down_negative_x() {
        let mut view = Viewpoint::new(&CameraSettings::default());
        view.yaw = std::f32::consts::FRAC_PI_2;
        assert!((view.look_direction() - Vec3::NEG_X).length() < EPS);
    }

    #[test]
    fn mouse_look_is_ignored_until_engaged() {
        let mut view = Viewpoint::new(&CameraSettings::default());
        let mut look = LookCapture::new(0.01);
        look.apply_mouse_delta(&mut view, Vec2::new(100.0, 50.0));
        assert_eq!(view.yaw, 0.0);
        assert_eq!(view.pitch, 0.0);

        look.engage();
        look.apply_mouse_delta(&mut view, Vec2::new(100.0, 50.0));
        assert!((view.yaw + 1.0).abs() < EPS);
        assert!((view.pitch + 0.5).abs() < EPS);
    }

    #[test]
    fn pitch_is_clamped_short_of_vertical() {
        let mut view = Viewpoint::new(&CameraSettings::default());
        let mut look = LookCapture::new(0.01);
        look.engage();
        look.apply_mouse_delta(&mut view, Vec2::new(0.0, -10_000.0));
        assert!(view.pitch < std::f32::consts::FRAC_PI_2);
        assert!(view.pitch > 1.5);
    }

    #[test]
    fn point_ahead_projects_to_screen_center() {
        let mut view = Viewpoint::new(&CameraSettings::default());
        view.position = Vec3::new(0.0, 1.6, 0.0);
        let screen = Vec2::new(800.0, 600.0);
        let (pixel, _) = view
            .project_to_screen(Vec3::new(0.0, 1.6, -5.0), screen)
            .expect("point in front of the eye");
        assert!((pixel - screen * 0.5).length() < 0.5);

        assert!(view.project_to_screen(Vec3::new(0.0, 1.6, 5.0), screen).is_none());
    }

    #[test]
    fn snap_sets_rotation_as_pitch_yaw_roll() {
        let mut view = Viewpoint::new(&CameraSettings::default());
        view.snap_to(&ResetPose {
            position: Vec3::new(1.0, 1.6, 2.0),
            rotation: Vec3::new(0.2, -1.0, 0.0),
            region: Some(0),
        });
        assert_eq!(view.rotation(), Vec3::new(0.2, -1.0, 0.0));
        assert_eq!(view.position, Vec3::new(1.0, 1.6, 2.0));
    }

    #[test]
    fn sanitize_resets_bad_fields() {
        let bad = CameraSettings { fov_degrees: -4.0, near: 0.1, far: 50.0, look_sensitivity: f32::NAN };
        let (fixed, reset) = bad.sanitized();
        assert_eq!(fixed.fov_degrees, 75.0);
        assert_eq!(fixed.far, 50.0);
        assert_eq!(fixed.look_sensitivity, 0.002);
        assert_eq!(reset, vec!["fov_degrees", "look_sensitivity"]);
    }
}
