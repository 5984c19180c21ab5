// Engine module - level data, player core and the pieces the renderer reads

pub mod camera;
pub mod components;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod locomotion;
pub mod mesh;
pub mod overlay;
pub mod systems;
pub mod triggers;
