// Zone triggers: "walked too far" regions that snap the viewpoint back to spawn.
//
// Each region constrains x and/or z with optional inclusive bounds.
// Regions are checked in authored order every frame; the first match wins.

use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;

use super::camera::PITCH_LIMIT;
use super::layout::{present, Layout};

/// Errors raised while validating trigger regions at load time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriggerError {
    /// Neither axis is bounded, so the region would match every position.
    #[error("trigger region {name:?} has no x or z constraint and would match everywhere")]
    Unconstrained { name: Option<String> },

    #[error("trigger region {name:?}: {axis} range has min {min} greater than max {max}")]
    InvertedRange { name: Option<String>, axis: char, min: f32, max: f32 },

    #[error("trigger region {name:?}: {axis} bound is not a finite number")]
    NonFiniteBound { name: Option<String>, axis: char },
}

/// One-axis constraint. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AxisRange {
    #[serde(deserialize_with = "present")]
    pub min: Option<f32>,
    #[serde(deserialize_with = "present")]
    pub max: Option<f32>,
}

impl AxisRange {
    #[cfg(test)]
    pub fn below(max: f32) -> Self { Self { min: None, max: Some(max) } }
    #[cfg(test)]
    pub fn above(min: f32) -> Self { Self { min: Some(min), max: None } }
    #[cfg(test)]
    pub fn between(min: f32, max: f32) -> Self { Self { min: Some(min), max: Some(max) } }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Inclusive: fails only when `v` is strictly below min or strictly above max.
    pub fn contains(&self, v: f32) -> bool {
        self.min.is_none_or(|min| v >= min) && self.max.is_none_or(|max| v <= max)
    }

    fn validate(&self, axis: char, name: &Option<String>) -> Result<(), TriggerError> {
        let finite = |b: Option<f32>| b.is_none_or(f32::is_finite);
        if !finite(self.min) || !finite(self.max) {
            return Err(TriggerError::NonFiniteBound { name: name.clone(), axis });
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(TriggerError::InvertedRange { name: name.clone(), axis, min, max });
            }
        }
        Ok(())
    }
}

/// A validated trigger region. Construct through `TriggerRegion::new`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRegion {
    name: Option<String>,
    x: Option<AxisRange>,
    z: Option<AxisRange>,
}

impl TriggerRegion {
    /// An axis given with neither bound is treated as absent. A region with
    /// no constraint left on either axis is rejected.
    pub fn new(
        name: Option<String>,
        x: Option<AxisRange>,
        z: Option<AxisRange>,
    ) -> Result<Self, TriggerError> {
        let x = x.filter(|r| !r.is_open());
        let z = z.filter(|r| !r.is_open());
        if x.is_none() && z.is_none() {
            return Err(TriggerError::Unconstrained { name });
        }
        if let Some(r) = &x { r.validate('x', &name)?; }
        if let Some(r) = &z { r.validate('z', &name)?; }
        Ok(Self { name, x, z })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True iff every present constraint holds. Height (y) is never tested.
    pub fn contains(&self, position: Vec3) -> bool {
        self.x.is_none_or(|r| r.contains(position.x))
            && self.z.is_none_or(|r| r.contains(position.z))
    }
}

/// Canonical hub pose: position plus (pitch, yaw, roll) in radians.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnPose {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

impl Default for SpawnPose {
    fn default() -> Self {
        Self {
            position: [0.0, 1.6, 2.0],
            rotation: [0.0, 0.0, 0.0],
        }
    }
}

impl SpawnPose {
    /// Non-finite components fall back to the default pose; pitch is
    /// clamped like mouse look so walking still has a forward direction.
    pub fn sanitized(self) -> (Self, Vec<&'static str>) {
        let defaults = Self::default();
        let mut out = self;
        let mut reset = Vec::new();
        if !self.position.iter().all(|c| c.is_finite()) {
            out.position = defaults.position;
            reset.push("position");
        }
        if !self.rotation.iter().all(|c| c.is_finite()) {
            out.rotation = defaults.rotation;
            reset.push("rotation");
        } else if out.rotation[0].abs() > PITCH_LIMIT {
            out.rotation[0] = out.rotation[0].clamp(-PITCH_LIMIT, PITCH_LIMIT);
            reset.push("pitch");
        }
        (out, reset)
    }

    pub fn to_reset(&self, region: Option<usize>) -> ResetPose {
        ResetPose {
            position: Vec3::from_array(self.position),
            rotation: Vec3::from_array(self.rotation),
            region,
        }
    }
}

/// Where to snap the viewpoint, and which region caused it
/// (`None` for the initial placement at spawn).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResetPose {
    pub position: Vec3,
    /// (pitch, yaw, roll)
    pub rotation: Vec3,
    pub region: Option<usize>,
}

/// Ordered trigger regions plus the pose they reset to.
pub struct ZoneTriggers {
    regions: Vec<TriggerRegion>,
    spawn: SpawnPose,
}

impl ZoneTriggers {
    pub fn new(spawn: SpawnPose, regions: Vec<TriggerRegion>) -> Self {
        Self { regions, spawn }
    }

    /// Validate the layout's trigger list, keeping authored order.
    /// Rejected regions are dropped with a warning.
    pub fn from_layout(layout: &Layout) -> Self {
        let mut regions = Vec::with_capacity(layout.triggers.len());
        for (index, def) in layout.triggers.iter().enumerate() {
            match TriggerRegion::new(def.name.clone(), def.x, def.z) {
                Ok(region) => regions.push(region),
                Err(e) => log::warn!("dropping trigger #{index}: {e}"),
            }
        }
        log::info!("{} trigger region(s) active", regions.len());
        Self::new(layout.spawn, regions)
    }

    pub fn regions(&self) -> &[TriggerRegion] {
        &self.regions
    }

    pub fn spawn(&self) -> &SpawnPose {
        &self.spawn
    }

    /// Index of the first region containing `position`.
    pub fn first_match(&self, position: Vec3) -> Option<usize> {
        self.regions.iter().position(|r| r.contains(position))
    }

    /// Evaluate one frame. `Some` means the caller must snap to the pose.
    pub fn tick(&self, position: Vec3) -> Option<ResetPose> {
        let index = self.first_match(position)?;
        log::debug!(
            "trigger #{index} ({}) fired at ({:.2}, {:.2}, {:.2})",
            self.regions[index].name().unwrap_or("unnamed"),
            position.x,
            position.y,
            position.z,
        );
        Some(self.spawn.to_reset(Some(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pursuance() -> TriggerRegion {
        TriggerRegion::new(
            Some("pursuance".into()),
            Some(AxisRange::below(-20.0)),
            Some(AxisRange::between(12.0, 30.0)),
        )
        .unwrap()
    }

    #[test]
    fn position_inside_region_resets_to_spawn() {
        let zones = ZoneTriggers::new(SpawnPose::default(), vec![pursuance()]);
        let reset = zones.tick(Vec3::new(-21.0, 0.0, 20.0)).expect("inside region");
        assert_eq!(reset.position, Vec3::new(0.0, 1.6, 2.0));
        assert_eq!(reset.rotation, Vec3::ZERO);
        assert_eq!(reset.region, Some(0));
    }

    #[test]
    fn z_out_of_bounds_does_not_match() {
        let zones = ZoneTriggers::new(SpawnPose::default(), vec![pursuance()]);
        assert!(zones.tick(Vec3::new(-21.0, 0.0, 40.0)).is_none());
    }

    #[test]
    fn positions_outside_every_region_are_untouched() {
        let zones = ZoneTriggers::new(SpawnPose::default(), vec![pursuance()]);
        for p in [
            Vec3::new(0.0, 1.6, 2.0),
            Vec3::new(-19.9, 1.6, 20.0),
            Vec3::new(-25.0, 1.6, 11.9),
            Vec3::new(-25.0, 1.6, 30.1),
        ] {
            assert!(zones.tick(p).is_none(), "{p:?} should not trigger");
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let region = pursuance();
        assert!(region.contains(Vec3::new(-20.0, 0.0, 12.0)));
        assert!(region.contains(Vec3::new(-20.0, 0.0, 30.0)));
    }

    #[test]
    fn single_axis_region_ignores_the_other_axis() {
        let region = TriggerRegion::new(None, Some(AxisRange::above(20.0)), None).unwrap();
        assert!(region.contains(Vec3::new(25.0, 0.0, -1_000.0)));
        assert!(region.contains(Vec3::new(25.0, 0.0, 1_000.0)));
        assert!(!region.contains(Vec3::new(19.0, 0.0, 0.0)));

        let region = TriggerRegion::new(None, None, Some(AxisRange::above(30.0))).unwrap();
        assert!(region.contains(Vec3::new(-500.0, 0.0, 31.0)));
    }

    #[test]
    fn first_match_wins_in_authored_order() {
        let wide = TriggerRegion::new(Some("wide".into()), Some(AxisRange::above(0.0)), None).unwrap();
        let narrow = TriggerRegion::new(
            Some("narrow".into()),
            Some(AxisRange::between(5.0, 6.0)),
            Some(AxisRange::between(5.0, 6.0)),
        )
        .unwrap();
        let p = Vec3::new(5.5, 0.0, 5.5);

        let zones = ZoneTriggers::new(SpawnPose::default(), vec![wide.clone(), narrow.clone()]);
        assert_eq!(zones.tick(p).and_then(|r| r.region), Some(0));

        let zones = ZoneTriggers::new(SpawnPose::default(), vec![narrow, wide]);
        assert_eq!(zones.tick(p).and_then(|r| r.region), Some(0));
        assert_eq!(zones.first_match(Vec3::new(1.0, 0.0, 0.0)), Some(1));
    }

    #[test]
    fn unconstrained_region_is_rejected() {
        assert_eq!(
            TriggerRegion::new(Some("all".into()), None, None),
            Err(TriggerError::Unconstrained { name: Some("all".into()) })
        );
        // An axis with no bounds counts as absent.
        assert!(matches!(
            TriggerRegion::new(None, Some(AxisRange::default()), Some(AxisRange::default())),
            Err(TriggerError::Unconstrained { .. })
        ));
    }

    #[test]
    fn inverted_and_non_finite_ranges_are_rejected() {
        assert!(matches!(
            TriggerRegion::new(None, Some(AxisRange::between(5.0, -5.0)), None),
            Err(TriggerError::InvertedRange { axis: 'x', .. })
        ));
        assert!(matches!(
            TriggerRegion::new(None, None, Some(AxisRange::above(f32::NAN))),
            Err(TriggerError::NonFiniteBound { axis: 'z', .. })
        ));
    }

    #[test]
    fn custom_spawn_pose_is_used() {
        let spawn = SpawnPose { position: [3.0, 1.6, -4.0], rotation: [0.1, 1.2, 0.0] };
        let zones = ZoneTriggers::new(spawn, vec![pursuance()]);
        let reset = zones.tick(Vec3::new(-30.0, 1.2, 15.0)).unwrap();
        assert_eq!(reset.position, Vec3::new(3.0, 1.6, -4.0));
        assert_eq!(reset.rotation, Vec3::new(0.1, 1.2, 0.0));
    }

    #[test]
    fn spawn_with_vertical_pitch_still_walks_forward() {
        use crate::engine::camera::{CameraSettings, Viewpoint};

        let spawn = SpawnPose { position: [0.0, 1.6, 2.0], rotation: [-std::f32::consts::FRAC_PI_2, 0.0, 0.0] };
        let (fixed, reset) = spawn.sanitized();
        assert_eq!(reset, vec!["pitch"]);

        let mut view = Viewpoint::new(&CameraSettings::default());
        view.snap_to(&fixed.to_reset(None));
        let look = view.look_direction();
        assert!(Vec3::new(look.x, 0.0, look.z).length() > 0.0);
    }

    #[test]
    fn non_finite_spawn_falls_back_to_default() {
        let spawn = SpawnPose { position: [f32::NAN, 1.6, 2.0], rotation: [0.0, f32::INFINITY, 0.0] };
        let (fixed, reset) = spawn.sanitized();
        assert_eq!(fixed, SpawnPose::default());
        assert_eq!(reset, vec!["position", "rotation"]);
    }

}
