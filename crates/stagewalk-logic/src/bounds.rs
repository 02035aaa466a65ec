//! Axis-aligned ground-plane rectangles for rooms and navigator clamps.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Axis-aligned bounding rectangle on the x/z plane (center + half-extents).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomBounds {
    pub cx: f32,
    pub cz: f32,
    pub half_w: f32,
    pub half_d: f32,
}

impl RoomBounds {
    /// Bounds centered on `(x, z)` with full `width` (x) and `depth` (z).
    pub fn new(x: f32, z: f32, width: f32, depth: f32) -> Self {
        Self {
            cx: x,
            cz: z,
            half_w: width / 2.0,
            half_d: depth / 2.0,
        }
    }

    pub fn from_corners(min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> Self {
        Self::new(
            (min_x + max_x) / 2.0,
            (min_z + max_z) / 2.0,
            max_x - min_x,
            max_z - min_z,
        )
    }

    pub fn min_x(&self) -> f32 {
        self.cx - self.half_w
    }
    pub fn max_x(&self) -> f32 {
        self.cx + self.half_w
    }
    pub fn min_z(&self) -> f32 {
        self.cz - self.half_d
    }
    pub fn max_z(&self) -> f32 {
        self.cz + self.half_d
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.cx, self.cz)
    }

    /// Check if a point (with radius padding) is inside the rectangle.
    pub fn contains(&self, x: f32, z: f32, radius: f32) -> bool {
        x >= self.min_x() + radius
            && x <= self.max_x() - radius
            && z >= self.min_z() + radius
            && z <= self.max_z() - radius
    }

    /// Clamp a point to stay inside the rectangle (with radius padding).
    ///
    /// When the padding exceeds a half-extent the axis collapses onto the
    /// center line instead of producing an inverted range.
    pub fn clamp(&self, x: f32, z: f32, radius: f32) -> (f32, f32) {
        let rx = radius.min(self.half_w);
        let rz = radius.min(self.half_d);
        (
            x.clamp(self.min_x() + rx, self.max_x() - rx),
            z.clamp(self.min_z() + rz, self.max_z() - rz),
        )
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &RoomBounds) -> RoomBounds {
        RoomBounds::from_corners(
            self.min_x().min(other.min_x()),
            self.min_z().min(other.min_z()),
            self.max_x().max(other.max_x()),
            self.max_z().max(other.max_z()),
        )
    }
}
