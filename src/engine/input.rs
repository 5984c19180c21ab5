// Input state tracking for keyboard and mouse
// Movement keys are matched by physical key code so WASD works on any layout.

use glam::Vec2;
use winit::event::{DeviceEvent, ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// The six keys the locomotion controller cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKey {
    Forward,
    Backward,
    Left,
    Right,
    Sprint,
    Crouch,
}

impl MoveKey {
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::KeyW => Some(Self::Forward),
            KeyCode::KeyS => Some(Self::Backward),
            KeyCode::KeyA => Some(Self::Left),
            KeyCode::KeyD => Some(Self::Right),
            KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(Self::Sprint),
            KeyCode::ControlLeft | KeyCode::ControlRight => Some(Self::Crouch),
            _ => None,
        }
    }
}

/// Held movement flags. Written by key events, read once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
    pub crouch: bool,
}

impl MoveInput {
    pub fn set(&mut self, key: MoveKey, held: bool) {
        let flag = match key {
            MoveKey::Forward => &mut self.forward,
            MoveKey::Backward => &mut self.backward,
            MoveKey::Left => &mut self.left,
            MoveKey::Right => &mut self.right,
            MoveKey::Sprint => &mut self.sprint,
            MoveKey::Crouch => &mut self.crouch,
        };
        *flag = held;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Local input direction: x is lateral (right positive), y is depth
    /// (backward positive, so forward is -1). Unit length unless no
    /// direction is held or opposing keys cancel out, in which case zero.
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.forward  { dir.y -= 1.0; }
        if self.backward { dir.y += 1.0; }
        if self.left     { dir.x -= 1.0; }
        if self.right    { dir.x += 1.0; }
        dir.normalize_or_zero()
    }
}

/// A movement key going down or up, extracted from a window event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTransition {
    pub key: MoveKey,
    pub pressed: bool,
}

/// Per-frame mouse accumulator.
/// Keyboard state lives in the locomotion controller; this only tracks
/// what the host needs between events and the frame tick.
pub struct InputState {
    // Raw device motion summed since the last take_look_delta()
    look_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            look_delta: Vec2::ZERO,
        }
    }

    /// Feed a winit WindowEvent. Returns the movement key transition it
    /// carried, if any; the caller routes it to the controller.
    pub fn process_window_event(&self, event: &WindowEvent) -> Option<KeyTransition> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return None;
                };
                let key = MoveKey::from_key_code(code)?;
                Some(KeyTransition {
                    key,
                    pressed: event.state == ElementState::Pressed,
                })
            }
            _ => None,
        }
    }

    /// Raw mouse motion arrives as device events, independent of cursor position,
    /// which is what a grabbed cursor needs.
    pub fn process_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.look_delta += Vec2::new(delta.0 as f32, delta.1 as f32);
        }
    }

    /// Return and reset the motion accumulated since the previous frame.
    pub fn take_look_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.look_delta)
    }
}
