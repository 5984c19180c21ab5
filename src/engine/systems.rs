// ECS systems and the per-frame schedule
//
// Level geometry lives in the World as static entities.
// The viewpoint is driven outside the World: every frame runs
// locomotion first, then zone triggers, so a trigger catches the
// position reached in that same frame.

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::camera::{LookCapture, Viewpoint};
use super::components::*;
use super::geometry::LevelGeometry;
use super::locomotion::LocomotionController;
use super::triggers::{ResetPose, ZoneTriggers};

/// Spawn every primitive and label as a `LevelStatic` entity.
/// Returns the number of entities created.
pub fn spawn_level(world: &mut World, level: &LevelGeometry) -> usize {
    for p in &level.primitives {
        world.spawn((
            LevelStatic,
            Transform::from_position(p.position),
            BoxExtent { size: p.size },
            p.color,
            p.shadows,
        ));
    }
    for l in &level.labels {
        world.spawn((
            LevelStatic,
            Transform::from_position(l.position),
            l.color,
            WorldLabel { text: l.text.clone(), font_size: l.font_size },
        ));
    }
    level.primitives.len() + level.labels.len()
}

/// Despawn everything belonging to the current level.
pub fn unload_level(world: &mut World) -> usize {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<LevelStatic>>()
        .iter(world)
        .collect();
    for entity in &entities {
        world.despawn(*entity);
    }
    entities.len()
}

/// Plain box data handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxInstance {
    pub position: Vec3,
    pub size: Vec3,
    pub color: Color,
}

/// Collect all boxes, opaque first. Returns the instances and how many
/// of them are opaque; the translucent tail is drawn in a second pass.
pub fn gather_box_instances(world: &mut World) -> (Vec<BoxInstance>, usize) {
    let mut query = world.query_filtered::<(&Transform, &BoxExtent, &Color), With<LevelStatic>>();
    let (mut opaque, translucent): (Vec<_>, Vec<_>) = query
        .iter(world)
        .map(|(transform, extent, color)| BoxInstance {
            position: transform.position,
            size: extent.size,
            color: *color,
        })
        .partition(|b| !b.color.is_translucent());
    let opaque_count = opaque.len();
    opaque.extend(translucent);
    (opaque, opaque_count)
}

/// Labels as (text, position, font size, color).
pub fn gather_labels(world: &mut World) -> Vec<(String, Vec3, f32, Color)> {
    let mut query = world.query::<(&Transform, &WorldLabel, &Color)>();
    query
        .iter(world)
        .map(|(transform, label, color)| (label.text.clone(), transform.position, label.font_size, *color))
        .collect()
}

/// What the host supplies each frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    /// Seconds since the previous frame.
    pub dt: f32,
    pub paused: bool,
}

/// One frame of the core: locomotion, then triggers. Nothing runs while
/// paused. Returns the reset that fired, if any, already applied.
pub fn run_frame(
    view: &mut Viewpoint,
    controller: &mut LocomotionController,
    look: &LookCapture,
    zones: &ZoneTriggers,
    frame: FrameInput,
) -> Option<ResetPose> {
    if frame.paused {
        return None;
    }
    controller.tick(view, frame.dt, look.is_engaged(), frame.paused);

    let reset = zones.tick(view.position)?;
    view.snap_to(&reset);
    Some(reset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::camera::CameraSettings;
    use crate::engine::geometry::build_level;
    use crate::engine::input::MoveKey;
    use crate::engine::layout::Layout;
    use crate::engine::locomotion::LocomotionSettings;
    use crate::engine::triggers::{AxisRange, SpawnPose, TriggerRegion};

    fn builtin_world() -> World {
        let mut world = World::new();
        spawn_level(&mut world, &build_level(&Layout::builtin()));
        world
    }

    #[test]
    fn spawned_level_yields_opaque_boxes_first() {
        let mut world = builtin_world();
        let (boxes, opaque) = gather_box_instances(&mut world);
        assert_eq!(boxes.len(), 30);
        // door frame + two windows
        assert_eq!(boxes.len() - opaque, 3);
        assert!(boxes[..opaque].iter().all(|b| !b.color.is_translucent()));
        assert!(boxes[opaque..].iter().all(|b| b.color.is_translucent()));
        assert_eq!(gather_labels(&mut world).len(), 4);
    }

    #[test]
    fn unload_removes_only_level_entities() {
        let mut world = builtin_world();
        let keep = world.spawn(Transform::default()).id();
        assert_eq!(unload_level(&mut world), 34);
        assert!(gather_box_instances(&mut world).0.is_empty());
        assert!(world.entities().contains(keep));
    }

    struct Rig {
        view: Viewpoint,
        controller: LocomotionController,
        look: LookCapture,
        zones: ZoneTriggers,
    }

    fn rig(regions: Vec<TriggerRegion>) -> Rig {
        let spawn = SpawnPose::default();
        let mut view = Viewpoint::new(&CameraSettings::default());
        view.snap_to(&spawn.to_reset(None));
        let mut look = LookCapture::new(0.002);
        look.engage();
        Rig {
            view,
            controller: LocomotionController::new(LocomotionSettings::default()),
            look,
            zones: ZoneTriggers::new(spawn, regions),
        }
    }

    impl Rig {
        fn run(&mut self, frames: usize, dt: f32, paused: bool) -> Vec<ResetPose> {
            (0..frames)
                .filter_map(|_| {
                    run_frame(
                        &mut self.view,
                        &mut self.controller,
                        &self.look,
                        &self.zones,
                        FrameInput { dt, paused },
                    )
                })
                .collect()
        }
    }

    #[test]
    fn walking_forward_without_triggers_ends_one_unit_past_origin() {
        let mut rig = rig(Vec::new());
        rig.controller.key_down(MoveKey::Forward, false);
        assert!(rig.run(60, 1.0 / 60.0, false).is_empty());
        assert!((rig.view.position - Vec3::new(0.0, 1.6, -1.0)).length() < 1e-4);
    }

    #[test]
    fn trigger_on_the_path_returns_to_spawn() {
        let wall = TriggerRegion::new(Some("behind".into()), None, Some(AxisRange::below(0.0))).unwrap();
        let mut rig = rig(vec![wall]);
        rig.controller.key_down(MoveKey::Forward, false);
        let resets = rig.run(60, 1.0 / 60.0, false);
        assert!(!resets.is_empty());
        // Each reset lands exactly on spawn.
        assert!(resets.iter().all(|r| r.position == Vec3::new(0.0, 1.6, 2.0)));
    }

    #[test]
    fn trigger_catches_position_in_the_same_frame() {
        let zone = TriggerRegion::new(None, None, Some(AxisRange::below(1.0))).unwrap();
        let mut rig = rig(vec![zone]);
        rig.view.yaw = 0.5;
        rig.controller.key_down(MoveKey::Forward, false);
        // One big step from z=2 lands well past z=1.
        let resets = rig.run(1, 1.0, false);
        assert_eq!(resets.len(), 1);
        assert_eq!(rig.view.position, Vec3::new(0.0, 1.6, 2.0));
        assert_eq!(rig.view.yaw, 0.0);
    }

    #[test]
    fn paused_frame_changes_nothing() {
        let zone = TriggerRegion::new(None, Some(AxisRange::above(-100.0)), None).unwrap();
        let mut rig = rig(vec![zone]);
        rig.view.position = Vec3::new(3.0, 1.0, 3.0);
        rig.view.yaw = 1.0;
        rig.controller.key_down(MoveKey::Forward, false);
        let before = rig.view;
        assert!(rig.run(10, 0.1, true).is_empty());
        assert_eq!(rig.view, before);
    }
}
