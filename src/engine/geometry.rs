// Level geometry builder.
//
// Turns a `Layout` into static boxes, a ground plane and labels in world
// space. Pure: the same layout always yields the same geometry, so it can
// be rebuilt whenever the layout changes.

use glam::Vec3;

use super::components::{Color, ShadowFlags};
use super::layout::{BoxDef, Department, LabelDef, Layout, LayoutError};

/// One solid, purely visual primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    /// Where it came from, e.g. "hub" or "surveillance/back".
    pub source: String,
    pub position: Vec3,
    /// Full extents. The ground plane has zero height.
    pub size: Vec3,
    pub color: Color,
    pub shadows: ShadowFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: Vec3,
    pub font_size: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelGeometry {
    pub primitives: Vec<Primitive>,
    pub labels: Vec<Label>,
}

/// Parse `#rgb`, `#rrggbb` or a handful of CSS color names.
pub fn parse_color(text: &str) -> Result<Color, LayoutError> {
    let invalid = || LayoutError::InvalidColor(text.to_string());
    let s = text.trim();

    if let Some(hex) = s.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()
            .ok_or_else(invalid)?;
        let (r, g, b) = match digits.as_slice() {
            [r, g, b] => (r * 17, g * 17, b * 17),
            [r1, r0, g1, g0, b1, b0] => (r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0),
            _ => return Err(invalid()),
        };
        return Ok(Color::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0));
    }

    match s.to_ascii_lowercase().as_str() {
        "white" => Ok(Color::WHITE),
        "black" => Ok(Color::rgb(0.0, 0.0, 0.0)),
        "gray" | "grey" => Ok(Color::rgb(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0)),
        "red" => Ok(Color::rgb(1.0, 0.0, 0.0)),
        "green" => Ok(Color::rgb(0.0, 128.0 / 255.0, 0.0)),
        "blue" => Ok(Color::rgb(0.0, 0.0, 1.0)),
        "yellow" => Ok(Color::rgb(1.0, 1.0, 0.0)),
        _ => Err(invalid()),
    }
}

/// Bad colors degrade to `fallback` with a warning.
fn color_or(text: &str, fallback: Color, context: &str) -> Color {
    parse_color(text).unwrap_or_else(|e| {
        log::warn!("{context}: {e}; using fallback");
        fallback
    })
}

/// Build the complete static geometry for a layout.
pub fn build_level(layout: &Layout) -> LevelGeometry {
    let mut level = LevelGeometry::default();
    let default_wall = Color::rgb(0x50 as f32 / 255.0, 0x50 as f32 / 255.0, 0x50 as f32 / 255.0);
    let wall = color_or(&layout.wall_color, default_wall, "wall_color");

    level.primitives.push(Primitive {
        source: "floor".to_string(),
        position: Vec3::ZERO,
        size: Vec3::new(layout.floor.size[0], 0.0, layout.floor.size[1]),
        color: color_or(&layout.floor.color, wall, "floor"),
        shadows: ShadowFlags { cast: false, receive: true },
    });

    for room in &layout.rooms {
        let origin = Vec3::from_array(room.origin);
        for b in &room.boxes {
            level.primitives.push(box_primitive(b, origin, wall, &room.name));
        }
        for l in &room.labels {
            level.labels.push(label(l, origin, &room.name));
        }
    }

    for dept in &layout.departments {
        build_department(&mut level, dept, wall, layout.wall_thickness);
    }

    level
}

fn box_primitive(def: &BoxDef, origin: Vec3, wall: Color, source: &str) -> Primitive {
    let color = def
        .color
        .as_deref()
        .map_or(wall, |c| color_or(c, wall, source))
        .with_alpha(def.opacity);
    Primitive {
        source: source.to_string(),
        position: origin + Vec3::from_array(def.position),
        size: Vec3::from_array(def.size),
        color,
        shadows: ShadowFlags { cast: def.cast_shadow, receive: def.receive_shadow },
    }
}

fn label(def: &LabelDef, origin: Vec3, source: &str) -> Label {
    Label {
        text: def.text.clone(),
        position: origin + Vec3::from_array(def.position),
        font_size: def.font_size,
        color: color_or(&def.color, Color::WHITE, source),
    }
}

/// Side walls, end wall and entrance wall of one hallway. The hallway
/// starts at `center` and runs `length` units along +z.
fn build_department(level: &mut LevelGeometry, dept: &Department, default_wall: Color, thickness: f32) {
    let center = Vec3::from_array(dept.center);
    let [width, height, length] = dept.size;
    let wall = dept
        .wall_color
        .as_deref()
        .map_or(default_wall, |c| color_or(c, default_wall, &dept.id));

    let solid = |source: String, position: Vec3, size: Vec3| Primitive {
        source,
        position: center + position,
        size,
        color: wall,
        shadows: ShadowFlags { cast: true, receive: false },
    };

    let half_w = width * 0.5;
    let half_h = height * 0.5;
    let id = &dept.id;
    level.primitives.extend([
        solid(format!("{id}/left"), Vec3::new(-half_w, half_h, length * 0.5), Vec3::new(thickness, height, length)),
        solid(format!("{id}/right"), Vec3::new(half_w, half_h, length * 0.5), Vec3::new(thickness, height, length)),
        solid(format!("{id}/end"), Vec3::new(0.0, half_h, length), Vec3::new(width, height, thickness)),
    ]);

    match &dept.back_wall {
        None => level.primitives.push(solid(
            format!("{id}/back"),
            Vec3::new(0.0, half_h, 0.0),
            Vec3::new(width, height, thickness),
        )),
        Some(sections) => {
            let source = format!("{id}/back");
            for section in sections {
                level.primitives.push(box_primitive(section, center, wall, &source));
            }
        }
    }

    level.labels.push(Label {
        text: dept.name.clone(),
        position: center + Vec3::from_array(dept.label_position),
        font_size: dept.label_font_size,
        color: color_or(&dept.label_color, Color::WHITE, id),
    });
}
