//! Noisy rotate-then-translate motion, with step-wise wall collision.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::geometry::Segment;
use crate::map::Map;
use crate::utility::{Control, Pose};

/// Distance of a single sub-step when integrating a translation, in
/// meters. Bounds the collision miss distance below the robot radius for
/// any wall the robot could tunnel through between sub-steps.
const SUB_STEP: f64 = 0.1;

/// Rotate-then-translate motion with Gaussian noise and wall collision.
#[derive(Debug, Clone, Copy)]
pub struct MotionModel {
    /// Relative angular noise std-dev, in radians.
    pub sigma_angle: f64,
    /// Relative distance noise std-dev, as a fraction of the commanded distance.
    pub sigma_dist: f64,
    /// Robot radius used for collision testing, in meters.
    pub size: f64,
}

impl MotionModel {
    pub fn new(sigma_angle: f64, sigma_dist: f64, size: f64) -> Self {
        Self {
            sigma_angle,
            sigma_dist,
            size,
        }
    }

    /// Advances `pose` by control `u`. If `exact` is false, the rotation
    /// and distance are both perturbed by Gaussian noise before
    /// integration. Returns whether the walk collided with a wall and the
    /// (possibly truncated) resulting pose.
    pub fn advance<R: Rng + ?Sized>(
        &self,
        map: &Map,
        pose: Pose,
        u: Control,
        exact: bool,
        rng: &mut R,
    ) -> (bool, Pose) {
        let (angle, dist) = if exact {
            (pose.angle + u.dtheta, u.dist)
        } else {
            let angle_noise = Normal::new(0.0, self.sigma_angle).unwrap();
            let angle = pose.angle + u.dtheta + angle_noise.sample(rng);
            let dist = if u.dist == 0.0 {
                0.0
            } else {
                let dist_noise = Normal::new(u.dist, (u.dist * self.sigma_dist).abs()).unwrap();
                dist_noise.sample(rng)
            };
            (angle, dist)
        };

        if dist <= 0.0 {
            return (false, Pose::new(angle, pose.position));
        }

        let steps = (dist / SUB_STEP).ceil() as u32;
        let x_step = dist / steps as f64 * angle.cos();
        let y_step = dist / steps as f64 * angle.sin();

        let mut taken = 0u32;
        let mut collided = false;
        for step in 1..=steps {
            let position = crate::utility::Point::new(
                pose.position.x + step as f64 * x_step,
                pose.position.y + step as f64 * y_step,
            );

            let hit = map
                .walls()
                .iter()
                .any(|&w| dist_point_wall(position, w, self.size));

            if hit {
                collided = true;
                break;
            }
            taken = step;
        }

        let final_position = crate::utility::Point::new(
            pose.position.x + taken as f64 * x_step,
            pose.position.y + taken as f64 * y_step,
        );

        (collided, Pose::new(angle, final_position))
    }
}

fn dist_point_wall(p: crate::utility::Point, wall: Segment, size: f64) -> bool {
    crate::geometry::dist_point_segment(p, wall) < size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Map;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn default_model() -> MotionModel {
        MotionModel::new(0.05, 0.05, 0.2)
    }

    #[test]
    fn exact_motion_with_room_to_spare_moves_verbatim() {
        let map = Map::new(20.0, 20.0, 0.1).unwrap();
        let model = default_model();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pose = Pose::new(0.0, crate::utility::Point::new(10.0, 10.0));
        let u = Control::new(0.0, 3.0);
        let (collided, result) = model.advance(&map, pose, u, true, &mut rng);
        assert!(!collided);
        assert_relative_eq!(result.position.x, 13.0, epsilon = 1e-9);
        assert_relative_eq!(result.position.y, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn exact_motion_into_a_wall_stops_short() {
        let map = Map::new(5.0, 5.0, 0.1).unwrap();
        let model = default_model();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        // Heading straight at the right-hand boundary wall (x = 5.0).
        let pose = Pose::new(0.0, crate::utility::Point::new(4.0, 2.5));
        let u = Control::new(0.0, 3.0);
        let (collided, result) = model.advance(&map, pose, u, true, &mut rng);
        assert!(collided);
        assert!(map.closest_wall(result.position) >= model.size - 0.1 - 1e-9);
    }

    #[test]
    fn zero_distance_control_is_a_no_op_translation() {
        let map = Map::new(20.0, 20.0, 0.1).unwrap();
        let model = default_model();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pose = Pose::new(0.3, crate::utility::Point::new(5.0, 5.0));
        let u = Control::new(0.1, 0.0);
        let (collided, result) = model.advance(&map, pose, u, true, &mut rng);
        assert!(!collided);
        assert_relative_eq!(result.position.x, 5.0);
        assert_relative_eq!(result.position.y, 5.0);
    }
}
