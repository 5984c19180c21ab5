// First-person locomotion
//
// Per frame:
//   1. speed from sprint, target eye height from crouch
//   2. eye height eased toward the target by a fixed fraction per frame
//   3. WASD -> local direction, normalized so diagonals are not faster
//   4. forward/right taken from the look direction flattened onto XZ,
//      so looking up or down never changes walking speed
//   5. position += (forward * -dir.y + right * dir.x) * speed * dt
//
// No collision: walls do not stop the player, zone triggers bound the space.

use glam::Vec3;
use serde::Deserialize;

use super::camera::Viewpoint;
use super::input::{MoveInput, MoveKey};

/// Speed and height tuning, read from the layout's `player` section.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocomotionSettings {
    /// World units per second.
    pub normal_speed: f32,
    pub sprint_speed: f32,
    /// Eye height above the floor.
    pub normal_height: f32,
    pub crouch_height: f32,
    /// Fraction of the remaining height gap closed each frame.
    /// Applied per frame, not per second, so crouching eases faster at
    /// higher frame rates.
    pub height_smoothing: f32,
}

impl Default for LocomotionSettings {
    fn default() -> Self {
        Self {
            normal_speed: 3.0,
            sprint_speed: 5.0,
            normal_height: 1.6,
            crouch_height: 1.2,
            height_smoothing: 0.1,
        }
    }
}

impl LocomotionSettings {
    /// Replace nonsensical values with defaults. Smoothing must stay in
    /// (0, 1] or the eye height would overshoot or diverge.
    pub fn sanitized(self) -> (Self, Vec<&'static str>) {
        let defaults = Self::default();
        let mut out = self;
        let mut reset = Vec::new();
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;

        if !non_negative(self.normal_speed) {
            out.normal_speed = defaults.normal_speed;
            reset.push("normal_speed");
        }
        if !non_negative(self.sprint_speed) {
            out.sprint_speed = defaults.sprint_speed;
            reset.push("sprint_speed");
        }
        if !non_negative(self.normal_height) {
            out.normal_height = defaults.normal_height;
            reset.push("normal_height");
        }
        if !non_negative(self.crouch_height) {
            out.crouch_height = defaults.crouch_height;
            reset.push("crouch_height");
        }
        if !(self.height_smoothing > 0.0 && self.height_smoothing <= 1.0) {
            out.height_smoothing = defaults.height_smoothing;
            reset.push("height_smoothing");
        }
        (out, reset)
    }
}

/// Owns the held-key state and moves the viewpoint once per frame.
pub struct LocomotionController {
    pub settings: LocomotionSettings,
    input: MoveInput,
}

impl LocomotionController {
    pub fn new(settings: LocomotionSettings) -> Self {
        Self {
            settings,
            input: MoveInput::default(),
        }
    }

    pub fn input(&self) -> &MoveInput {
        &self.input
    }

    /// Key presses are dropped while paused.
    pub fn key_down(&mut self, key: MoveKey, paused: bool) {
        if paused {
            return;
        }
        self.input.set(key, true);
    }

    /// Releases always land, paused or not, so a key let go during a
    /// menu does not stay held afterwards.
    pub fn key_up(&mut self, key: MoveKey) {
        self.input.set(key, false);
    }

    /// The controller stops receiving key events: forget every held key.
    /// Pausing is not deactivation and leaves held keys alone.
    pub fn deactivate(&mut self) {
        self.input.clear();
    }

    /// Advance the viewpoint by `dt` seconds. Returns whether anything ran;
    /// when paused or without look-capture the viewpoint is not touched.
    pub fn tick(&mut self, view: &mut Viewpoint, dt: f32, look_engaged: bool, paused: bool) -> bool {
        if paused || !look_engaged {
            return false;
        }
        let s = &self.settings;
        let speed = if self.input.sprint { s.sprint_speed } else { s.normal_speed };
        let target_height = if self.input.crouch { s.crouch_height } else { s.normal_height };

        view.position.y += (target_height - view.position.y) * s.height_smoothing;

        let dir = self.input.direction();
        if dir == glam::Vec2::ZERO {
            return true;
        }

        let look = view.look_direction();
        let forward = Vec3::new(look.x, 0.0, look.z).normalize_or_zero();
        let right = forward.cross(Vec3::Y);

        let velocity = forward * -dir.y + right * dir.x;
        view.position += velocity * speed * dt;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::camera::CameraSettings;

    const EPS: f32 = 1e-4;

    fn view_at(position: Vec3) -> Viewpoint {
        let mut view = Viewpoint::new(&CameraSettings::default());
        view.position = position;
        view
    }

    fn horizontal(v: Vec3) -> f32 {
        Vec3::new(v.x, 0.0, v.z).length()
    }

    #[test]
    fn walking_forward_one_second_covers_three_units() {
        let mut view = view_at(Vec3::new(0.0, 1.6, 2.0));
        let mut ctl = LocomotionController::new(LocomotionSettings::default());
        ctl.key_down(MoveKey::Forward, false);

        for _ in 0..60 {
            ctl.tick(&mut view, 1.0 / 60.0, true, false);
        }
        assert!((view.position - Vec3::new(0.0, 1.6, -1.0)).length() < EPS, "{:?}", view.position);
    }

    #[test]
    fn movement_magnitude_is_independent_of_key_count() {
        use MoveKey::*;
        let combos: &[&[MoveKey]] = &[
            &[Forward],
            &[Backward],
            &[Left],
            &[Right],
            &[Forward, Left],
            &[Forward, Right],
            &[Backward, Left],
            &[Backward, Right],
            &[Forward, Backward, Right],
            &[Left, Right, Backward],
        ];
        for sprint in [false, true] {
            for combo in combos {
                let mut view = view_at(Vec3::new(0.0, 1.6, 0.0));
                view.yaw = 0.7;
                view.pitch = -0.4;
                let mut ctl = LocomotionController::new(LocomotionSettings::default());
                for key in combo.iter() {
                    ctl.key_down(*key, false);
                }
                if sprint {
                    ctl.key_down(Sprint, false);
                }
                let before = view.position;
                ctl.tick(&mut view, 0.25, true, false);

                let speed = if sprint { 5.0 } else { 3.0 };
                let moved = horizontal(view.position - before);
                assert!((moved - speed * 0.25).abs() < EPS, "{combo:?} sprint={sprint}: {moved}");
            }
        }
    }

    #[test]
    fn pitch_does_not_slow_walking() {
        let mut view = view_at(Vec3::new(0.0, 1.6, 0.0));
        view.pitch = 1.4;
        let mut ctl = LocomotionController::new(LocomotionSettings::default());
        ctl.key_down(MoveKey::Forward, false);
        ctl.tick(&mut view, 1.0, true, false);
        assert!((view.position.z + 3.0).abs() < EPS);
    }

    #[test]
    fn strafing_right_follows_yaw() {
        let mut view = view_at(Vec3::new(0.0, 1.6, 0.0));
        view.yaw = std::f32::consts::FRAC_PI_2; // looking down -X, right is -Z
        let mut ctl = LocomotionController::new(LocomotionSettings::default());
        ctl.key_down(MoveKey::Right, false);
        ctl.tick(&mut view, 1.0, true, false);
        assert!((view.position - Vec3::new(0.0, 1.6, -3.0)).length() < EPS);
    }

    #[test]
    fn no_keys_means_no_horizontal_movement() {
        let mut view = view_at(Vec3::new(4.0, 1.6, -2.0));
        let mut ctl = LocomotionController::new(LocomotionSettings::default());
        assert!(ctl.tick(&mut view, 1.0, true, false));
        assert_eq!(view.position, Vec3::new(4.0, 1.6, -2.0));
    }

    #[test]
    fn paused_tick_mutates_nothing_even_with_keys_held() {
        let mut view = view_at(Vec3::new(0.0, 1.0, 0.0));
        let mut ctl = LocomotionController::new(LocomotionSettings::default());
        ctl.key_down(MoveKey::Forward, false);
        ctl.key_down(MoveKey::Crouch, false);
        let before = view;

        assert!(!ctl.tick(&mut view, 0.5, true, true));
        assert_eq!(view, before);
    }

    #[test]
    fn no_look_capture_means_no_movement() {
        let mut view = view_at(Vec3::new(0.0, 1.0, 0.0));
        let mut ctl = LocomotionController::new(LocomotionSettings::default());
        ctl.key_down(MoveKey::Left, false);
        let before = view;
        assert!(!ctl.tick(&mut view, 0.5, false, false));
        assert_eq!(view, before);
    }

    #[test]
    fn pausing_keeps_held_keys_and_releases_still_apply() {
        let mut ctl = LocomotionController::new(LocomotionSettings::default());
        ctl.key_down(MoveKey::Forward, false);
        ctl.key_down(MoveKey::Sprint, false);

        // Presses while paused are ignored, held flags survive.
        ctl.key_down(MoveKey::Left, true);
        assert!(ctl.input().forward && ctl.input().sprint);
        assert!(!ctl.input().left);

        // A release during pause clears the flag.
        ctl.key_up(MoveKey::Sprint);
        assert!(ctl.input().forward);
        assert!(!ctl.input().sprint);
    }

    #[test]
    fn deactivate_clears_held_keys() {
        let mut ctl = LocomotionController::new(LocomotionSettings::default());
        ctl.key_down(MoveKey::Forward, false);
        ctl.key_down(MoveKey::Crouch, false);
        ctl.deactivate();
        assert_eq!(*ctl.input(), MoveInput::default());
    }

    #[test]
    fn height_converges_monotonically_without_overshoot() {
        for (start, crouch) in [(1.6, true), (1.2, false), (0.0, false), (5.0, true)] {
            let mut view = view_at(Vec3::new(0.0, start, 0.0));
            let mut ctl = LocomotionController::new(LocomotionSettings::default());
            if crouch {
                ctl.key_down(MoveKey::Crouch, false);
            }
            let target = if crouch { 1.2 } else { 1.6 };
            let mut gap = (view.position.y - target).abs();
            let side = (view.position.y - target).signum();
            for _ in 0..100 {
                ctl.tick(&mut view, 1.0 / 60.0, true, false);
                let next_gap = (view.position.y - target).abs();
                assert!(next_gap < gap || next_gap == 0.0, "gap grew: {gap} -> {next_gap}");
                if next_gap > 0.0 {
                    assert_eq!((view.position.y - target).signum(), side, "overshot the target");
                }
                gap = next_gap;
            }
            assert!(gap < 1e-3);
        }
    }

    #[test]
    fn height_step_is_a_fixed_fraction_per_frame() {
        let mut view = view_at(Vec3::new(0.0, 1.6, 0.0));
        let mut ctl = LocomotionController::new(LocomotionSettings::default());
        ctl.key_down(MoveKey::Crouch, false);
        // Same step whatever dt is.
        ctl.tick(&mut view, 10.0, true, false);
        assert!((view.position.y - 1.56).abs() < 1e-5);
    }

    #[test]
    fn sanitize_rejects_overshooting_smoothing() {
        let settings = LocomotionSettings { height_smoothing: 1.5, sprint_speed: -1.0, ..Default::default() };
        let (fixed, reset) = settings.sanitized();
        assert_eq!(fixed.height_smoothing, 0.1);
        assert_eq!(fixed.sprint_speed, 5.0);
        assert_eq!(reset, vec!["sprint_speed", "height_smoothing"]);
    }
}
