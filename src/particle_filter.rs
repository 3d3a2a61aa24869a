//! Augmented Monte-Carlo localization: the particle cloud, its prediction
//! and weighting against a sensor, and adaptive resampling with random
//! injection to recover from a "kidnapped robot" teleport.

use std::sync::Arc;

use log::{debug, trace, warn};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rand::SeedableRng;

use crate::config::FilterConfig;
use crate::error::{LocalizationError, Result};
use crate::geometry::Segment;
use crate::map::Map;
use crate::motion::MotionModel;
use crate::sensors::SensorModel;
use crate::utility::{Control, Point, Pose};

/// A particle is just a hypothesis pose; the filter tracks them densely in
/// a `Vec<Pose>`, no separate wrapper type.
pub type Particle = Pose;

/// Maximum number of candidate controls `autonomous_step` tries before
/// giving up on finding one that avoids an immediate collision.
const AUTONOMOUS_MAX_RETRIES: u32 = 32;
/// Fixed autonomous-step translation distance, in meters.
const AUTONOMOUS_STEP_DIST: f64 = 1.0;
/// Std-dev of the autonomous-step heading distribution, in radians.
const AUTONOMOUS_ANGLE_SIGMA: f64 = std::f64::consts::FRAC_PI_3;

pub struct ParticleFilter<S: SensorModel> {
    map: Arc<Map>,
    sensor: S,
    motion: MotionModel,
    config: FilterConfig,

    particles: Vec<Particle>,
    pose: Pose,
    last_measurement: Option<S::Measurement>,

    w_slow: f64,
    w_fast: f64,
    w_dist: f64,

    rng: ChaCha8Rng,
}

impl<S: SensorModel> ParticleFilter<S> {
    /// Builds a filter with `n` particles drawn uniformly over the map
    /// rectangle. `seed` makes the whole run (particle init, motion noise,
    /// resampling) reproducible bit-for-bit given the same control
    /// sequence.
    pub fn new(map: Arc<Map>, n: usize, seed: u64, sensor: S, config: FilterConfig) -> Result<Self> {
        if n == 0 {
            return Err(LocalizationError::InvalidParticleCount { n });
        }
        if map.walls().len() < 4 {
            return Err(LocalizationError::EmptyWalls {
                count: map.walls().len(),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let particles = (0..n)
            .map(|_| Pose::random(&mut rng, map.width, map.height))
            .collect();

        let motion = MotionModel::new(config.sigma_angle, config.sigma_dist, config.size);

        debug!(
            "constructed particle filter with {} particles, seed {}",
            n, seed
        );

        Ok(Self {
            map,
            sensor,
            motion,
            config,
            particles,
            pose: Pose::default(),
            last_measurement: None,
            w_slow: 1.0,
            w_fast: 1.0,
            w_dist: 10.0,
            rng,
        })
    }

    /// Sets the true pose of the simulated robot. The particle cloud is
    /// left untouched — calling this twice with the same arguments is a
    /// no-op on the second call. Rejects a position outside the map
    /// rectangle.
    pub fn put(&mut self, angle: f64, position: (f64, f64)) -> Result<()> {
        let (x, y) = position;
        if x < 0.0 || x > self.map.width || y < 0.0 || y > self.map.height {
            return Err(LocalizationError::PoseOutsideMap {
                x,
                y,
                width: self.map.width,
                height: self.map.height,
            });
        }
        self.pose = Pose::new(angle, Point::from(position));
        Ok(())
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn last_measurement(&self) -> Option<&S::Measurement> {
        self.last_measurement.as_ref()
    }

    pub fn map(&self) -> &Arc<Map> {
        &self.map
    }

    /// Advances the true pose and the particle cloud by one control,
    /// reweighting and resampling against a fresh sensor reading. Returns
    /// whether the cloud is judged converged.
    pub fn step(&mut self, u: Control, exact: bool) -> bool {
        let (_, new_true_pose) = self.motion.advance(&self.map, self.pose, u, exact, &mut self.rng);
        self.pose = new_true_pose;

        let measurement = self.sensor.measure(&self.map, self.pose, &mut self.rng);

        let mut candidates = Vec::with_capacity(self.particles.len());
        let mut weights = Vec::with_capacity(self.particles.len());
        for &particle in &self.particles {
            let (_, moved) = self.motion.advance(&self.map, particle, u, false, &mut self.rng);
            let weight = self.sensor.likelihood(&self.map, &measurement, moved);
            candidates.push(moved);
            weights.push(weight);
        }

        let mut cumulative = Vec::with_capacity(weights.len() + 1);
        cumulative.push(0.0);
        for &w in &weights {
            cumulative.push(cumulative.last().unwrap() + w);
        }
        let total_weight = *cumulative.last().unwrap();

        let w_avg = self.sensor.ema_update(&weights, &measurement);
        self.w_slow += self.config.alpha_slow * (w_avg - self.w_slow);
        self.w_fast += self.config.alpha_fast * (w_avg - self.w_fast);

        let injection_fraction = if self.w_slow <= 0.0 {
            0.0
        } else {
            let ratio = (self.w_fast / (self.w_slow * self.sensor.divider())).min(1.0);
            (1.0 - ratio).max(0.0)
        };

        let n = candidates.len();
        let mut new_particles = Vec::with_capacity(n);
        let mut is_random = Vec::with_capacity(n);
        for _ in 0..n {
            let inject = total_weight == 0.0 || self.rng.gen::<f64>() < injection_fraction;
            if inject {
                new_particles.push(self.sensor.sample_random_pose(&self.map, &mut self.rng));
                is_random.push(true);
            } else {
                let draw = self.rng.gen::<f64>() * total_weight;
                let k = partition_point(&cumulative, draw);
                new_particles.push(candidates[k]);
                is_random.push(false);
            }
        }

        self.particles = new_particles;
        self.last_measurement = Some(measurement);

        let err = self.survivor_error(n, &is_random);
        self.w_dist += self.config.alpha_dist * (err - self.w_dist);

        trace!(
            "step: injection_fraction={:.3}, w_dist={:.3}",
            injection_fraction, self.w_dist
        );

        self.w_dist < self.config.convergence_threshold
    }

    /// Mean distance to the true pose over the best (closest) `n/5`
    /// non-random survivors, `n` being the filter's total particle count —
    /// falling back to however many survivors exist when fewer than `n/5`
    /// of them survived the injection coin flip. Holds `w_dist` steady
    /// (returns it unchanged) if there are no survivors to measure against
    /// this step.
    fn survivor_error(&self, n: usize, is_random: &[bool]) -> f64 {
        let mut distances: Vec<f64> = self
            .particles
            .iter()
            .zip(is_random)
            .filter(|(_, &random)| !random)
            .map(|(p, _)| p.position.dist(self.pose.position))
            .collect();

        if distances.is_empty() {
            return self.w_dist;
        }

        distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let take = (n / 5).max(1).min(distances.len());
        distances[..take].iter().sum::<f64>() / take as f64
    }

    /// Equivalent to `step`, but the control is chosen by the filter
    /// itself: a heading perturbation `N(0, PI/3)` and a fixed 1m
    /// translation, retried up to `AUTONOMOUS_MAX_RETRIES` times until the
    /// straight-line path doesn't cross a wall. If every retry still
    /// crosses a wall, the last drawn control is issued anyway — the
    /// motion model's own collision handling still applies, so this never
    /// blocks.
    pub fn autonomous_step(&mut self) -> bool {
        let angle_distr = Normal::new(0.0, AUTONOMOUS_ANGLE_SIGMA).unwrap();

        let mut chosen = Control::new(angle_distr.sample(&mut self.rng), AUTONOMOUS_STEP_DIST);
        let mut found_clear_path = false;
        for _ in 0..AUTONOMOUS_MAX_RETRIES {
            let heading = self.pose.angle + chosen.dtheta;
            let end = Point::new(
                self.pose.position.x + chosen.dist * heading.cos(),
                self.pose.position.y + chosen.dist * heading.sin(),
            );
            let path = Segment::new(self.pose.position, end);
            if !self.map.intersects_any_wall(path) {
                found_clear_path = true;
                break;
            }
            chosen = Control::new(angle_distr.sample(&mut self.rng), AUTONOMOUS_STEP_DIST);
        }

        if !found_clear_path {
            warn!("autonomous_step exhausted {} retries without a clear path", AUTONOMOUS_MAX_RETRIES);
        }

        self.step(chosen, false)
    }
}

/// Index of the smallest `k` such that `cumulative[k] >= draw`, searching
/// `cumulative[1..]` (the sentinel `cumulative[0] == 0` is never a valid
/// answer since every weight is non-negative and `draw >= 0`).
fn partition_point(cumulative: &[f64], draw: f64) -> usize {
    let mut lo = 0usize;
    let mut hi = cumulative.len() - 1;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if cumulative[mid + 1] >= draw {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::ColorSensor;

    fn small_map() -> Arc<Map> {
        Arc::new(Map::new(10.0, 10.0, 0.1).unwrap())
    }

    #[test]
    fn construction_rejects_zero_particles() {
        let map = small_map();
        let result = ParticleFilter::new(map, 0, 1, ColorSensor::new(), FilterConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn put_is_idempotent() {
        let map = small_map();
        let mut filter = ParticleFilter::new(map, 10, 1, ColorSensor::new(), FilterConfig::default()).unwrap();
        filter.put(1.0, (2.0, 3.0)).unwrap();
        let once = filter.pose();
        filter.put(1.0, (2.0, 3.0)).unwrap();
        let twice = filter.pose();
        assert_eq!(once, twice);
    }

    #[test]
    fn put_rejects_a_position_outside_the_map() {
        let map = small_map();
        let mut filter = ParticleFilter::new(map, 10, 1, ColorSensor::new(), FilterConfig::default()).unwrap();
        assert!(filter.put(0.0, (-1.0, 5.0)).is_err());
        assert!(filter.put(0.0, (5.0, 100.0)).is_err());
    }

    #[test]
    fn step_preserves_particle_count() {
        let map = small_map();
        let mut filter = ParticleFilter::new(map, 50, 1, ColorSensor::new(), FilterConfig::default()).unwrap();
        filter.put(0.0, (5.0, 5.0)).unwrap();
        for _ in 0..10 {
            filter.step(Control::new(0.1, 0.2), false);
            assert_eq!(filter.particles().len(), 50);
        }
    }

    #[test]
    fn seeded_filters_are_bitwise_deterministic() {
        let map = small_map();
        let mut a = ParticleFilter::new(map.clone(), 40, 42, ColorSensor::new(), FilterConfig::default()).unwrap();
        let mut b = ParticleFilter::new(map, 40, 42, ColorSensor::new(), FilterConfig::default()).unwrap();
        a.put(0.0, (5.0, 5.0)).unwrap();
        b.put(0.0, (5.0, 5.0)).unwrap();

        for i in 0..20 {
            let u = Control::new(0.05 * i as f64, 0.3);
            let ca = a.step(u, false);
            let cb = b.step(u, false);
            assert_eq!(ca, cb);
            assert_eq!(a.particles(), b.particles());
            assert_eq!(a.pose(), b.pose());
        }
    }

    #[test]
    fn autonomous_step_never_panics_near_a_wall() {
        let map = small_map();
        let mut filter = ParticleFilter::new(map, 20, 7, ColorSensor::new(), FilterConfig::default()).unwrap();
        filter.put(0.0, (0.5, 0.5)).unwrap();
        for _ in 0..5 {
            filter.autonomous_step();
        }
    }
}
