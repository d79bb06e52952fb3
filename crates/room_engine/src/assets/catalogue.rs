//! Level keyword catalogue
//!
//! Maps a level keyword to the model it renders with and the rigid body it gets.
//! Masses are in kilograms, extents in world units.

use crate::ecs::components::ShapeKind;

/// Friction used when a keyword does not set one
pub const DEFAULT_FRICTION: f32 = 0.5;

/// Collider description, resolved against the asset root by the loader
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderSpec {
    /// Box with half extents
    Cuboid([f32; 3]),
    /// Sphere radius
    Ball(f32),
    /// Y-aligned cylinder
    Cylinder {
        /// Half of the height along +Y
        half_height: f32,
        /// Radius
        radius: f32,
    },
    /// Convex hull of a model's vertices, relative to the asset root
    ConvexHull(&'static str),
    /// Static triangle mesh of a model, relative to the asset root
    TriangleMesh(&'static str),
}

impl ColliderSpec {
    /// Shape family recorded on the entity
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Cuboid(_) => ShapeKind::Box,
            Self::Ball(_) => ShapeKind::Sphere,
            Self::Cylinder { .. } => ShapeKind::Cylinder,
            Self::ConvexHull(_) => ShapeKind::ConvexHull,
            Self::TriangleMesh(_) => ShapeKind::TriangleMesh,
        }
    }
}

/// Everything needed to spawn one keyword
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Archetype {
    /// Level keyword, also the entity type unless `display` is set
    pub keyword: &'static str,
    /// Render model relative to the asset root
    pub model: &'static str,
    /// Collision shape
    pub collider: ColliderSpec,
    /// Zero means a fixed body
    pub mass: f32,
    /// Coulomb friction coefficient
    pub friction: f32,
    /// Whether the record's yaw rotates the body
    pub applies_yaw: bool,
    /// Each instance gets its own `crt<N>` type and a display marker
    pub display: bool,
}

impl Archetype {
    /// Whether the body simulates
    pub fn is_dynamic(&self) -> bool {
        self.mass > 0.0
    }
}

const fn prop(keyword: &'static str, model: &'static str, collider: ColliderSpec, mass: f32, friction: f32, applies_yaw: bool) -> Archetype {
    Archetype { keyword, model, collider, mass, friction, applies_yaw, display: false }
}

static ARCHETYPES: [Archetype; 10] = [
    prop("book", "models/book.obj", ColliderSpec::Cuboid([0.715, 0.1575, 0.55]), 0.5, 20.0, true),
    prop("desk", "models/desk.obj", ColliderSpec::Cuboid([2.0, 2.47, 4.71]), 0.0, 20.0, false),
    prop(
        "shelf",
        "models/shelf.obj",
        ColliderSpec::TriangleMesh("models/lowPoly/shelf.obj"),
        0.0,
        DEFAULT_FRICTION,
        false,
    ),
    prop("keyboard", "models/keyboard.obj", ColliderSpec::Cuboid([0.525, 0.0565, 1.72]), 0.3, 20.0, true),
    prop(
        "plant",
        "models/plant.obj",
        ColliderSpec::Cylinder { half_height: 0.85, radius: 0.505 },
        1.5,
        20.0,
        false,
    ),
    prop("bookShelf", "models/bookShelf.obj", ColliderSpec::Cuboid([0.755, 0.0605, 3.015]), 0.0, 20.0, true),
    prop("moonLamp", "models/moonLamp.obj", ColliderSpec::Ball(0.505), 0.2, 100.0, true),
    prop(
        "mug",
        "models/mug.obj",
        ColliderSpec::Cylinder { half_height: 0.4, radius: 0.4 },
        0.2,
        20.0,
        false,
    ),
    prop("chair", "models/chair.obj", ColliderSpec::ConvexHull("models/chair.obj"), 30.0, 20.0, true),
    Archetype {
        keyword: "monitor",
        model: "models/crt.obj",
        collider: ColliderSpec::Cuboid([1.11, 1.11, 1.11]),
        mass: 8.0,
        friction: 20.0,
        applies_yaw: true,
        display: true,
    },
];

/// Model drawn as the stencil-writing room shell
pub const ROOM_MODEL: &str = "models/room.obj";

/// What a level keyword turns into
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Instanced, physical entity
    Prop(&'static Archetype),
    /// Room shell, rendered into the stencil only
    Room,
    /// Unrecognised keyword, skipped
    Unknown,
}

/// Resolve a keyword
pub fn lookup(keyword: &str) -> Placement {
    if keyword == "room" {
        return Placement::Room;
    }
    ARCHETYPES
        .iter()
        .find(|archetype| archetype.keyword == keyword)
        .map_or(Placement::Unknown, Placement::Prop)
}

/// Every known prop archetype
pub fn archetypes() -> &'static [Archetype] {
    &ARCHETYPES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_is_light_dynamic_box() {
        let Placement::Prop(book) = lookup("book") else {
            panic!("book not catalogued");
        };
        assert!(book.is_dynamic());
        assert_eq!(book.mass, 0.5);
        assert_eq!(book.collider.kind(), ShapeKind::Box);
        assert_eq!(book.model, "models/book.obj");
    }

    #[test]
    fn test_static_and_special_keywords() {
        let Placement::Prop(shelf) = lookup("shelf") else {
            panic!("shelf not catalogued");
        };
        assert!(!shelf.is_dynamic());
        assert_eq!(shelf.collider, ColliderSpec::TriangleMesh("models/lowPoly/shelf.obj"));

        assert_eq!(lookup("room"), Placement::Room);
        assert_eq!(lookup("wall"), Placement::Unknown);
        assert_eq!(lookup("lamp"), Placement::Unknown);
    }

    #[test]
    fn test_only_monitor_is_a_display() {
        let displays: Vec<_> = archetypes().iter().filter(|a| a.display).map(|a| a.keyword).collect();
        assert_eq!(displays, vec!["monitor"]);
    }
}
