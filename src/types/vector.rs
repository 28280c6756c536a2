//! Point and vector types carried by coordinate tags

use std::fmt;
use std::ops::{Add, Sub};

/// 2D point, codes x/y without z
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Vector2 { x, y }
    }

    pub const ZERO: Vector2 = Vector2::new(0.0, 0.0);

    /// Lift to 3D with z = 0
    pub fn to_3d(self) -> Vector3 {
        Vector3::new(self.x, self.y, 0.0)
    }

    pub fn is_close(&self, other: &Vector2, abs_tol: f64) -> bool {
        (self.x - other.x).abs() <= abs_tol && (self.y - other.y).abs() <= abs_tol
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }
}

impl From<(f64, f64)> for Vector2 {
    fn from((x, y): (f64, f64)) -> Self {
        Vector2::new(x, y)
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 3D point or direction
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3 { x, y, z }
    }

    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);

    /// Default extrusion direction
    pub const UNIT_Z: Vector3 = Vector3::new(0.0, 0.0, 1.0);

    /// Drop the z axis
    pub fn to_2d(self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn is_close(&self, other: &Vector3, abs_tol: f64) -> bool {
        (self.x - other.x).abs() <= abs_tol
            && (self.y - other.y).abs() <= abs_tol
            && (self.z - other.z).abs() <= abs_tol
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, other: Vector3) -> Vector3 {
        Vector3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl From<(f64, f64, f64)> for Vector3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Vector3::new(x, y, z)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let p = Vector2::new(1.5, -2.0).to_3d();
        assert_eq!(p, Vector3::new(1.5, -2.0, 0.0));
        assert_eq!(p.to_2d(), Vector2::new(1.5, -2.0));
    }

    #[test]
    fn test_is_close() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = a + Vector3::new(1e-10, 0.0, -1e-10);
        assert!(a.is_close(&b, 1e-9));
        assert!(!a.is_close(&(a - Vector3::UNIT_Z), 1e-9));
    }
}
