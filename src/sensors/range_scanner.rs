//! Ray-cast range scanner: a fan of bearing/range readings against walls,
//! scored against the map with the likelihood-field trick (Thrun §6.4) so
//! scoring a reading never needs to re-cast a ray.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use statrs::distribution::{Continuous, Normal as StatrsNormal};

use super::{RangeMeasurement, SensorModel};
use crate::geometry::{intersect_lines, Segment};
use crate::map::Map;
use crate::utility::{normalize_angle, Point, Pose};

/// Additive floor on the per-measurement likelihood density, so a
/// single improbable reading can't fully collapse a particle's weight.
const LIKELIHOOD_FLOOR: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct RangeScanner {
    pub half_measures: usize,
    pub max_range: f64,
    pub min_range: f64,
    pub hit_sigma: f64,
    pub angle_sigma: f64,
    pub dist_sigma: f64,
}

impl RangeScanner {
    pub fn new(angle_sigma: f64, dist_sigma: f64) -> Self {
        Self {
            half_measures: 25,
            max_range: 10.0,
            min_range: 0.5,
            hit_sigma: 0.2,
            angle_sigma,
            dist_sigma,
        }
    }

    /// Casts a single ray from `origin` along `angle` and returns the
    /// nearest forward and backward wall intersections (signed distances
    /// along the ray direction), if any.
    fn cast_ray(&self, map: &Map, origin: Point, angle: f64) -> (Option<f64>, Option<f64>) {
        let dir = Point::new(angle.cos(), angle.sin());
        let ray = Segment::new(origin, origin + dir);

        let mut forward: Option<f64> = None;
        let mut backward: Option<f64> = None;

        for &wall in map.walls() {
            let (t1, t2) = intersect_lines(ray, wall);
            if !(0.0..=1.0).contains(&t2) {
                continue;
            }
            if t1 > 0.0 {
                forward = Some(forward.map_or(t1, |best| best.min(t1)));
            } else if t1 < 0.0 {
                backward = Some(backward.map_or(t1, |best| best.max(t1)));
            }
        }

        (forward, backward)
    }
}

impl SensorModel for RangeScanner {
    type Measurement = Vec<RangeMeasurement>;

    fn measure<R: Rng + ?Sized>(&self, map: &Map, pose: Pose, rng: &mut R) -> Self::Measurement {
        let mut measurements = Vec::with_capacity(2 * self.half_measures);

        for i in 0..self.half_measures {
            let bearing_i = std::f64::consts::PI * i as f64 / self.half_measures as f64;
            let angle_noise = Normal::new(0.0, self.angle_sigma).unwrap();
            let angle_real = pose.angle + bearing_i + angle_noise.sample(rng);

            let (forward, backward) = self.cast_ray(map, pose.position, angle_real);

            if let Some(t1) = forward {
                let noisy = t1 + Normal::new(0.0, self.dist_sigma * t1.abs()).unwrap().sample(rng);
                if noisy > self.min_range && noisy < self.max_range {
                    measurements.push(RangeMeasurement {
                        bearing: normalize_angle(bearing_i),
                        range: noisy,
                    });
                }
            }

            if let Some(t1) = backward {
                let noisy = t1 + Normal::new(0.0, self.dist_sigma * t1.abs()).unwrap().sample(rng);
                let range = noisy.abs();
                if range > self.min_range && range < self.max_range {
                    measurements.push(RangeMeasurement {
                        bearing: normalize_angle(bearing_i - std::f64::consts::PI),
                        range,
                    });
                }
            }
        }

        measurements
    }

    fn likelihood(&self, map: &Map, measurement: &Self::Measurement, pose: Pose) -> f64 {
        let hit_distr = StatrsNormal::new(0.0, self.hit_sigma).unwrap();
        measurement
            .iter()
            .map(|m| {
                let endpoint = pose.project_at(m.bearing, m.range);
                let d = map.closest_wall(endpoint);
                hit_distr.pdf(d) + LIKELIHOOD_FLOOR
            })
            .product()
    }

    fn ema_update(&self, weights: &[f64], measurement: &Self::Measurement) -> f64 {
        let term_count = (weights.len() * measurement.len().max(1)) as f64;
        if term_count == 0.0 {
            return 0.0;
        }
        let log_product: f64 = weights.iter().map(|w| w.max(f64::MIN_POSITIVE).ln()).sum();
        (log_product / term_count).exp()
    }

    fn divider(&self) -> f64 {
        1.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Map;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn measure_emits_two_per_bearing_in_empty_square_room() {
        let map = Map::new(10.0, 10.0, 0.1).unwrap();
        let scanner = RangeScanner::new(0.05, 0.05);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let pose = Pose::new(0.0, Point::new(5.0, 5.0));
        let measurements = scanner.measure(&map, pose, &mut rng);
        assert_eq!(measurements.len(), 2 * scanner.half_measures);

        // From dead center of a 10x10 square, no wall is ever closer than
        // 5m (perpendicular) or farther than 5*sqrt(2)m (a corner).
        let max_possible = 5.0 * std::f64::consts::SQRT_2 + 1.0;
        for m in &measurements {
            assert!(m.range > scanner.min_range);
            assert!(m.range < scanner.max_range);
            assert!(m.range <= max_possible, "range {} exceeds room diagonal", m.range);
        }

        // The bearing-0 reading points straight down the +x axis at the
        // right-hand wall, 5m away.
        let straight_ahead = measurements
            .iter()
            .find(|m| m.bearing.abs() < 1e-9)
            .expect("a bearing-0 measurement should be present");
        assert_relative_eq!(straight_ahead.range, 5.0, epsilon = 0.5);
    }

    #[test]
    fn likelihood_is_positive_even_far_from_truth() {
        let map = Map::new(10.0, 10.0, 0.1).unwrap();
        let scanner = RangeScanner::new(0.05, 0.05);
        let measurement = vec![RangeMeasurement {
            bearing: 0.0,
            range: 1.0,
        }];
        let pose = Pose::new(0.0, Point::new(5.0, 5.0));
        let l = scanner.likelihood(&map, &measurement, pose);
        assert!(l > 0.0);
        assert!(l.is_finite());
    }

    #[test]
    fn ema_update_matches_manual_geometric_mean() {
        let scanner = RangeScanner::new(0.05, 0.05);
        let weights = [0.5, 0.25];
        let measurement = vec![
            RangeMeasurement {
                bearing: 0.0,
                range: 1.0,
            },
            RangeMeasurement {
                bearing: 0.1,
                range: 1.0,
            },
        ];
        // 2 particles * 2 measurements = 4 terms.
        let expected = (0.5f64 * 0.25).powf(1.0 / 4.0);
        assert_relative_eq!(scanner.ema_update(&weights, &measurement), expected, epsilon = 1e-9);
    }
}
