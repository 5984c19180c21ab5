// Layout source: the RON document describing spawn, floor, rooms,
// department hallways and loop triggers.
//
// Loading is forgiving. Only a document that is not valid RON fails.
// Inside a valid document every top-level section and every list entry
// is decoded on its own: a malformed section falls back to its default,
// a malformed entry is dropped, and both are reported with `warn!`.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use super::camera::CameraSettings;
use super::locomotion::LocomotionSettings;
use super::triggers::{AxisRange, SpawnPose};

/// The level that ships with the binary.
pub const DEFAULT_LAYOUT_RON: &str = include_str!("../../assets/default_layout.ron");

/// Error type for layout loading
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("cannot read layout file: {0}")]
    Io(#[from] std::io::Error),

    #[error("layout is not valid RON: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid color {0:?}")]
    InvalidColor(String),
}

// ============================================================================
// DOCUMENT MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Floor {
    /// Width (x) and depth (z) of the ground plane, centered on the origin.
    pub size: [f32; 2],
    pub color: String,
}

impl Default for Floor {
    fn default() -> Self {
        Self {
            size: [100.0, 100.0],
            color: "#404040".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Lighting {
    pub ambient: f32,
    /// The sun is directional; only the direction from the origin matters.
    pub sun_position: [f32; 3],
    pub sun_intensity: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: 0.4,
            sun_position: [10.0, 10.0, 5.0],
            sun_intensity: 0.8,
        }
    }
}

/// An axis-aligned box, relative to its room or hallway origin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoxDef {
    pub position: [f32; 3],
    pub size: [f32; 3],
    /// Falls back to the owner's wall color.
    #[serde(deserialize_with = "present")]
    pub color: Option<String>,
    pub opacity: f32,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Default for BoxDef {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            size: [1.0; 3],
            color: None,
            opacity: 1.0,
            cast_shadow: true,
            receive_shadow: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LabelDef {
    pub text: String,
    pub position: [f32; 3],
    pub font_size: f32,
    pub color: String,
}

impl Default for LabelDef {
    fn default() -> Self {
        Self {
            text: String::new(),
            position: [0.0; 3],
            font_size: 0.5,
            color: "white".to_string(),
        }
    }
}

/// A hand-placed group of boxes and labels (elevator, corridor, hub).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Room {
    pub name: String,
    pub origin: [f32; 3],
    pub boxes: Vec<BoxDef>,
    pub labels: Vec<LabelDef>,
}

/// A looping hallway branching off the hub.
///
/// The hallway runs from `center` along +z for `size[2]` units, `size[0]`
/// wide and `size[1]` tall. Side walls and the end wall are generated.
/// The back wall (the entrance side) is one solid wall unless `back_wall`
/// lists explicit sections, e.g. two pieces around a doorway.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub label_color: String,
    pub center: [f32; 3],
    /// [width, height, length]
    pub size: [f32; 3],
    /// Label anchor relative to `center`.
    pub label_position: [f32; 3],
    pub label_font_size: f32,
    #[serde(deserialize_with = "present")]
    pub wall_color: Option<String>,
    #[serde(deserialize_with = "present")]
    pub back_wall: Option<Vec<BoxDef>>,
}

impl Default for Department {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            label_color: "#f5b68b".to_string(),
            center: [0.0; 3],
            size: [4.0, 4.0, 20.0],
            label_position: [0.0, 2.5, 2.0],
            label_font_size: 0.5,
            wall_color: None,
            back_wall: None,
        }
    }
}

/// Unvalidated trigger region as written in the document.
/// `ZoneTriggers::from_layout` turns these into checked regions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TriggerDef {
    #[serde(deserialize_with = "present")]
    pub name: Option<String>,
    #[serde(deserialize_with = "present")]
    pub x: Option<AxisRange>,
    #[serde(deserialize_with = "present")]
    pub z: Option<AxisRange>,
}

/// A fully resolved layout. Every field has a documented default.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub spawn: SpawnPose,
    pub floor: Floor,
    pub wall_color: String,
    pub wall_thickness: f32,
    pub lighting: Lighting,
    pub player: LocomotionSettings,
    pub camera: CameraSettings,
    pub rooms: Vec<Room>,
    pub departments: Vec<Department>,
    pub triggers: Vec<TriggerDef>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            spawn: SpawnPose::default(),
            floor: Floor::default(),
            wall_color: "#505050".to_string(),
            wall_thickness: 0.2,
            lighting: Lighting::default(),
            player: LocomotionSettings::default(),
            camera: CameraSettings::default(),
            rooms: Vec::new(),
            departments: Vec::new(),
            triggers: Vec::new(),
        }
    }
}

// ============================================================================
// LENIENT DECODING
// ============================================================================

/// An optional value as authors write it: `Some(v)`, `None`, or just `v`.
#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeWrapped<T> {
    Wrapped(Option<T>),
    Bare(T),
}

/// For `Option` fields that may be written with or without `Some(..)`.
/// A missing field takes the `#[serde(default)]` of `None`.
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match MaybeWrapped::deserialize(deserializer)? {
        MaybeWrapped::Wrapped(value) => value,
        MaybeWrapped::Bare(value) => Some(value),
    })
}

/// A value that never fails to deserialize: the subtree is captured as a
/// generic RON value first, then decoded into `T`. Failure is remembered
/// instead of aborting the whole document.
#[derive(Debug)]
struct Lenient<T> {
    value: Option<T>,
    error: Option<String>,
}

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Self { value: None, error: None }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = ron::Value::deserialize(deserializer)?;
        Ok(match raw.into_rust::<T>() {
            Ok(value) => Self { value: Some(value), error: None },
            Err(e) => Self { value: None, error: Some(e.to_string()) },
        })
    }
}

impl<T> Lenient<T> {
    fn resolve(self, section: &str, default: impl FnOnce() -> T) -> T {
        if let Some(e) = &self.error {
            log::warn!("layout section `{section}` is malformed ({e}); using defaults");
        }
        self.value.unwrap_or_else(default)
    }
}

/// Lists keep their well-formed entries and drop the rest.
fn resolve_list<T>(section: &str, list: Lenient<Vec<Lenient<T>>>) -> Vec<T> {
    list.resolve(section, Vec::new)
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            if let Some(e) = &entry.error {
                log::warn!("dropping malformed `{section}` entry #{i}: {e}");
            }
            entry.value
        })
        .collect()
}

/// Sizes must be finite and non-negative; a negative extent turns a box
/// inside out.
fn valid_extent(size: &[f32]) -> bool {
    size.iter().all(|c| c.is_finite() && *c >= 0.0)
}

fn sanitize_boxes(boxes: &mut [BoxDef], owner: &str) {
    for (i, b) in boxes.iter_mut().enumerate() {
        if !valid_extent(&b.size) {
            log::warn!("`{owner}` box #{i} size {:?} is not a valid extent; using defaults", b.size);
            b.size = BoxDef::default().size;
        }
        if !b.position.iter().all(|c| c.is_finite()) {
            log::warn!("`{owner}` box #{i} position is not finite; using the origin");
            b.position = [0.0; 3];
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawLayout {
    spawn: Lenient<SpawnPose>,
    floor: Lenient<Floor>,
    wall_color: Lenient<String>,
    wall_thickness: Lenient<f32>,
    lighting: Lenient<Lighting>,
    player: Lenient<LocomotionSettings>,
    camera: Lenient<CameraSettings>,
    rooms: Lenient<Vec<Lenient<Room>>>,
    departments: Lenient<Vec<Lenient<Department>>>,
    triggers: Lenient<Vec<Lenient<TriggerDef>>>,
}

impl RawLayout {
    fn resolve(self) -> Layout {
        let defaults = Layout::default();

        let (player, reset) = self.player.resolve("player", LocomotionSettings::default).sanitized();
        if !reset.is_empty() {
            log::warn!("layout `player` values out of range, reset to defaults: {}", reset.join(", "));
        }
        let (camera, reset) = self.camera.resolve("camera", CameraSettings::default).sanitized();
        if !reset.is_empty() {
            log::warn!("layout `camera` values out of range, reset to defaults: {}", reset.join(", "));
        }

        let mut wall_thickness = self.wall_thickness.resolve("wall_thickness", || defaults.wall_thickness);
        if !(wall_thickness.is_finite() && wall_thickness > 0.0) {
            log::warn!("layout `wall_thickness` {wall_thickness} is not positive; using {}", defaults.wall_thickness);
            wall_thickness = defaults.wall_thickness;
        }

        let (spawn, reset) = self.spawn.resolve("spawn", SpawnPose::default).sanitized();
        if !reset.is_empty() {
            log::warn!("layout `spawn` values out of range, corrected: {}", reset.join(", "));
        }

        let mut floor = self.floor.resolve("floor", Floor::default);
        if !valid_extent(&floor.size) {
            log::warn!("layout `floor.size` {:?} is not a valid extent; using defaults", floor.size);
            floor.size = Floor::default().size;
        }

        let mut rooms = resolve_list("rooms", self.rooms);
        for room in &mut rooms {
            sanitize_boxes(&mut room.boxes, &room.name);
        }

        let mut departments = resolve_list("departments", self.departments);
        for dept in &mut departments {
            if !valid_extent(&dept.size) {
                log::warn!("department `{}` size {:?} is not a valid extent; using defaults", dept.id, dept.size);
                dept.size = Department::default().size;
            }
            if let Some(sections) = &mut dept.back_wall {
                sanitize_boxes(sections, &dept.id);
            }
        }

        Layout {
            spawn,
            floor,
            wall_color: self.wall_color.resolve("wall_color", || defaults.wall_color.clone()),
            wall_thickness,
            lighting: self.lighting.resolve("lighting", Lighting::default),
            player,
            camera,
            rooms,
            departments,
            triggers: resolve_list("triggers", self.triggers),
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl Layout {
    /// Parse a layout document. Fails only when the text is not valid RON.
    pub fn from_ron_str(text: &str) -> Result<Self, LayoutError> {
        let raw: RawLayout = ron::from_str(text)?;
        Ok(raw.resolve())
    }

    /// Read and parse a layout file.
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let text = fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// The compiled-in level.
    pub fn builtin() -> Self {
        Self::from_ron_str(DEFAULT_LAYOUT_RON).unwrap_or_else(|e| {
            log::error!("built-in layout failed to parse: {e}");
            Self::default()
        })
    }

    /// Load `path` if given, falling back to the built-in level on any error.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("using built-in layout");
            return Self::builtin();
        };
        match Self::load(path) {
            Ok(layout) => {
                log::info!("loaded layout from {}", path.display());
                layout
            }
            Err(e) => {
                log::warn!("{}: {e}; using built-in layout", path.display());
                Self::builtin()
            }
        }
    }
}
