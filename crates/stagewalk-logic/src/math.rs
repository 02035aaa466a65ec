//! Small vector types for world positions and ground-plane steering.
//!
//! World space is y-up. Characters steer on the x/z ground plane (`Vec2`);
//! full world points such as waypoints and room origins use `Vec3`.

use serde::{Deserialize, Serialize};

/// 3D world-space point or offset (y is up).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Projection onto the ground plane.
    pub fn ground(&self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

/// Ground-plane vector: `x` and `z` world axes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, z: 0.0 };

    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Unit vector for a yaw angle, matching [`Vec2::yaw`].
    pub fn from_yaw(yaw: f32) -> Self {
        Self {
            x: yaw.sin(),
            z: yaw.cos(),
        }
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.z * self.z
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(&self, other: &Self) -> f32 {
        (*self - *other).length()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                z: self.z / len,
            }
        } else {
            Self::ZERO
        }
    }

    /// Scale down to `max` if longer; shorter vectors are returned unchanged.
    pub fn clamp_length(&self, max: f32) -> Self {
        let len_sq = self.length_squared();
        if len_sq > max * max && len_sq > 0.0 {
            *self * (max / len_sq.sqrt())
        } else {
            *self
        }
    }

    /// Yaw around +y, zero facing +z.
    pub fn yaw(&self) -> f32 {
        self.x.atan2(self.z)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.z == 0.0
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            z: self.z + other.z,
        }
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.z += other.z;
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            z: self.z - other.z,
        }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            z: self.z * scalar,
        }
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            z: -self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_length_only_shrinks() {
        let v = Vec2::new(3.0, 4.0);
        let c = v.clamp_length(2.5);
        assert!((c.length() - 2.5).abs() < 0.001);
        assert_eq!(v.clamp_length(10.0), v);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn yaw_round_trips_direction() {
        let dir = Vec2::new(1.0, 1.0).normalize();
        let back = Vec2::from_yaw(dir.yaw());
        assert!((back.x - dir.x).abs() < 0.001);
        assert!((back.z - dir.z).abs() < 0.001);
    }
}
