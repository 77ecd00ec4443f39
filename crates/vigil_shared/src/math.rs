//! Mathematical types shared between engine and host.
//!
//! World coordinates are in blocks. Angles are in degrees, using the host's
//! convention: yaw 0 faces +Z and grows clockwise seen from above, pitch is
//! positive looking down.

use serde::{Deserialize, Serialize};

/// 3D Vector - position, velocity, direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component (up)
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Distance squared (avoids sqrt)
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).length_squared()
    }

    /// Distance on the XZ plane, ignoring height.
    #[must_use]
    pub fn horizontal_distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Copy of this vector with Y set to zero.
    #[must_use]
    pub const fn flattened(self) -> Self {
        Self::new(self.x, 0.0, self.z)
    }

    /// Unit-length copy, or `None` when the vector is too short to carry a
    /// direction.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > f64::EPSILON {
            Some(self * (1.0 / len))
        } else {
            None
        }
    }

    /// True when every component is a finite number.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Look direction of an actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Look {
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
}

impl Look {
    /// Creates a new look direction.
    #[must_use]
    pub const fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    /// Horizontal unit vector the actor is facing.
    #[must_use]
    pub fn horizontal_direction(self) -> Vec3 {
        let yaw = f64::from(self.yaw).to_radians();
        Vec3::new(-yaw.sin(), 0.0, yaw.cos())
    }

    /// Unit vector the actor is looking along, pitch included.
    #[must_use]
    pub fn direction(self) -> Vec3 {
        let yaw = f64::from(self.yaw).to_radians();
        let pitch = f64::from(self.pitch).to_radians();
        Vec3::new(-yaw.sin() * pitch.cos(), -pitch.sin(), yaw.cos() * pitch.cos())
    }

    /// Absolute yaw difference folded into `[0, 180]`.
    #[must_use]
    pub fn yaw_delta(self, other: Self) -> f32 {
        let delta = (self.yaw - other.yaw).abs() % 360.0;
        if delta > 180.0 {
            360.0 - delta
        } else {
            delta
        }
    }

    /// True when both angles are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite()
    }
}

/// Angle in degrees between two unit vectors, clamped against rounding.
#[must_use]
pub fn angle_between_degrees(a: Vec3, b: Vec3) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
}
