use std::ops::{Add, AddAssign, Div, Mul, Sub};

use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// A point in the plane, in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn dist(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

/// Orientation plus planar position. The angle is free-running (not wrapped
/// to any particular range) except where a component explicitly normalizes
/// it for a bearing calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose {
    pub angle: f64,
    pub position: Point,
}

impl Pose {
    pub fn new(angle: f64, position: Point) -> Self {
        Self { angle, position }
    }

    /// A pose drawn uniformly at random over `[0, width) x [0, height)`
    /// with a uniform random orientation in `[0, 2*PI)`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, width: f64, height: f64) -> Self {
        let angle_distr = Uniform::new(0., 2. * std::f64::consts::PI);
        let x_distr = Uniform::new(0., width);
        let y_distr = Uniform::new(0., height);
        Pose {
            angle: angle_distr.sample(rng),
            position: Point::new(x_distr.sample(rng), y_distr.sample(rng)),
        }
    }

    /// The point `dist` meters ahead of this pose along its own heading.
    pub fn project(&self, dist: f64) -> Point {
        Point::new(
            self.position.x + dist * self.angle.cos(),
            self.position.y + dist * self.angle.sin(),
        )
    }

    /// The point `range` meters away along `self.angle + bearing_rel`,
    /// i.e. the implied endpoint of a range reading taken at a relative
    /// bearing from this pose.
    pub fn project_at(&self, bearing_rel: f64, range: f64) -> Point {
        let absolute = self.angle + bearing_rel;
        Point::new(
            self.position.x + range * absolute.cos(),
            self.position.y + range * absolute.sin(),
        )
    }
}

impl Add for Pose {
    type Output = Pose;
    fn add(self, rhs: Pose) -> Pose {
        Pose::new(self.angle + rhs.angle, self.position + rhs.position)
    }
}

impl AddAssign for Pose {
    fn add_assign(&mut self, rhs: Pose) {
        *self = *self + rhs;
    }
}

impl Sub for Pose {
    type Output = Pose;
    fn sub(self, rhs: Pose) -> Pose {
        Pose::new(self.angle - rhs.angle, self.position - rhs.position)
    }
}

impl Div<f64> for Pose {
    type Output = Pose;
    fn div(self, rhs: f64) -> Pose {
        Pose::new(self.angle / rhs, self.position / rhs)
    }
}

/// A relative rotation followed by a translation, as commanded by a driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Control {
    pub dtheta: f64,
    pub dist: f64,
}

impl Control {
    pub fn new(dtheta: f64, dist: f64) -> Self {
        Self { dtheta, dist }
    }
}

/// Normalize an angle into `(-PI, PI]`.
pub fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    angle %= TAU;
    if angle > PI {
        angle -= TAU;
    } else if angle <= -PI {
        angle += TAU;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_dist_is_symmetric() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);
        assert_relative_eq!(a.dist(b), b.dist(a));
        assert_relative_eq!(a.dist(b), 5.0);
    }

    #[test]
    fn pose_project_follows_heading() {
        let pose = Pose::new(0.0, Point::new(0.0, 0.0));
        let ahead = pose.project(2.0);
        assert_relative_eq!(ahead.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(ahead.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn normalize_angle_stays_in_range() {
        assert_relative_eq!(normalize_angle(3.0 * std::f64::consts::PI), std::f64::consts::PI, epsilon = 1e-9);
        assert_relative_eq!(normalize_angle(-3.0 * std::f64::consts::PI), std::f64::consts::PI, epsilon = 1e-9);
    }
}
