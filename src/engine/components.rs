// ECS components for static level geometry
// Spawned once per level load, never mutated, despawned on unload.

use bevy_ecs::prelude::*;
use glam::Vec3;

/// World-space center of an entity
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position }
    }
}

/// Full extents of an axis-aligned box. A ground plane has zero height.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct BoxExtent {
    pub size: Vec3,
}

/// sRGB color with opacity, each channel in [0, 1]
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..self }
    }

    pub fn is_translucent(&self) -> bool {
        self.a < 1.0
    }

    /// Linear-space RGBA for the GPU (the surface is sRGB).
    pub fn to_linear(&self) -> [f32; 4] {
        let lin = |c: f32| c.powf(2.2);
        [lin(self.r), lin(self.g), lin(self.b), self.a]
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Shadow capability of a primitive. Carried for renderers with shadow maps.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowFlags {
    pub cast: bool,
    pub receive: bool,
}

/// Text floating in the level, drawn by the overlay
#[derive(Component, Debug, Clone, PartialEq)]
pub struct WorldLabel {
    pub text: String,
    /// Glyph height in world units.
    pub font_size: f32,
}

/// Marks everything that belongs to the loaded level.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LevelStatic;
