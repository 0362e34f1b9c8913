//! Arena math.
//!
//! Headings are compass style: 0 points along +y and angles grow clockwise,
//! so a unit step along heading `h` is `(sin h, cos h)`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Absolute bearing from `self` to `other`.
    pub fn bearing_to(self, other: Point) -> f64 {
        (other.x - self.x).atan2(other.y - self.y)
    }

    pub fn project(self, heading: f64, distance: f64) -> Point {
        Point {
            x: self.x + heading.sin() * distance,
            y: self.y + heading.cos() * distance,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    pub width: f64,
    pub height: f64,
}

impl ArenaBounds {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Strictly inside the rectangle shrunk by `margin` on every side.
    pub fn contains(&self, p: Point, margin: f64) -> bool {
        p.x > margin && p.x < self.width - margin && p.y > margin && p.y < self.height - margin
    }

    pub fn clamp(&self, p: Point, margin: f64) -> Point {
        Point {
            x: p.x.max(margin).min(self.width - margin),
            y: p.y.max(margin).min(self.height - margin),
        }
    }

    /// How far `p` lies outside the shrunk rectangle, summed over both axes.
    pub fn overshoot(&self, p: Point, margin: f64) -> f64 {
        let ox = (margin - p.x).max(0.0) + (p.x - (self.width - margin)).max(0.0);
        let oy = (margin - p.y).max(0.0) + (p.y - (self.height - margin)).max(0.0);
        ox + oy
    }

    pub fn nearest_wall_distance(&self, p: Point) -> f64 {
        let dx = p.x.min(self.width - p.x);
        let dy = p.y.min(self.height - p.y);
        dx.min(dy)
    }
}

/// Normalizes an angle to `[-PI, PI)`.
pub fn normal_relative_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped.is_finite() {
        wrapped
    } else {
        0.0
    }
}
