//! Core types shared across the build engine.
//!
//! Defines world-space vectors, the fixed shape enumeration, placed
//! primitives, and the actor identity type. Identity verification itself is
//! an external collaborator; the engine only carries the opaque id around.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point or extent in world space. Y is up; the ground plane is y = 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Horizontal (XZ-plane) distance to another point. The support and
    /// site-radius rules are both defined in the horizontal plane only.
    pub fn xz_distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// The fixed set of primitive shapes clients can place.
///
/// `Plate` and `Decal` are exempt from physics: they skip both the overlap
/// and the support checks (used for signage and ground decals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Box,
    Sphere,
    Cylinder,
    Cone,
    Capsule,
    Torus,
    Wedge,
    Pyramid,
    Arch,
    Column,
    Beam,
    Dome,
    Plate,
    Decal,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 14] = [
        ShapeKind::Box,
        ShapeKind::Sphere,
        ShapeKind::Cylinder,
        ShapeKind::Cone,
        ShapeKind::Capsule,
        ShapeKind::Torus,
        ShapeKind::Wedge,
        ShapeKind::Pyramid,
        ShapeKind::Arch,
        ShapeKind::Column,
        ShapeKind::Beam,
        ShapeKind::Dome,
        ShapeKind::Plate,
        ShapeKind::Decal,
    ];

    /// Exempt shapes bypass overlap and support validation entirely.
    pub fn is_exempt(&self) -> bool {
        matches!(self, ShapeKind::Plate | ShapeKind::Decal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Cone => "cone",
            ShapeKind::Capsule => "capsule",
            ShapeKind::Torus => "torus",
            ShapeKind::Wedge => "wedge",
            ShapeKind::Pyramid => "pyramid",
            ShapeKind::Arch => "arch",
            ShapeKind::Column => "column",
            ShapeKind::Beam => "beam",
            ShapeKind::Dome => "dome",
            ShapeKind::Plate => "plate",
            ShapeKind::Decal => "decal",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated actor identity, supplied by the external auth collaborator.
///
/// The engine treats it as opaque; it is the key for plan ownership and the
/// per-actor lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Sequence id assigned by the primitive store on append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimitiveId(pub u64);

impl fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prim-{}", self.0)
    }
}

/// One placed shape instance. Created by successful placement, never
/// mutated; deletion is an owner action outside this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub shape: ShapeKind,
    pub position: Vec3,
    /// Euler rotation in radians. Stored for rendering; collision uses the
    /// axis-aligned box from `scale` only.
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Hex color, `#rrggbb`.
    pub color: String,
    pub owner_id: ActorId,
    pub created_at: DateTime<Utc>,
}

impl Primitive {
    /// Y of the top face of this primitive's bounding box.
    pub fn top_y(&self) -> f32 {
        self.position.y + self.scale.y / 2.0
    }

    /// Y of the bottom face of this primitive's bounding box.
    pub fn bottom_y(&self) -> f32 {
        self.position.y - self.scale.y / 2.0
    }
}
