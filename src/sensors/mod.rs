//! The sensor-model contract shared by `RangeScanner` and `ColorSensor`.
//!
//! The filter holds a `SensorModel` behind this trait and never branches
//! on which concrete sensor it has; see `particle_filter`.

pub mod color_sensor;
pub mod range_scanner;

pub use color_sensor::ColorSensor;
pub use range_scanner::RangeScanner;

use rand::Rng;

use crate::map::Map;
use crate::utility::Pose;

/// A relative bearing (radians, in `(-PI, PI]`) and range (meters, > 0)
/// reading from a single ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMeasurement {
    pub bearing: f64,
    pub range: f64,
}

/// The floor color, in `[0, 255]`, under a pose.
pub type ColorMeasurement = u8;

/// Shared contract for a sensor model usable by `ParticleFilter<S>`.
///
/// `Measurement` is the sensor-specific reading type (`Vec<RangeMeasurement>`
/// for the range scanner, `ColorMeasurement` for the color sensor).
pub trait SensorModel {
    type Measurement: Clone;

    /// Takes a (possibly noisy) reading at `pose`.
    fn measure<R: Rng + ?Sized>(&self, map: &Map, pose: Pose, rng: &mut R) -> Self::Measurement;

    /// The (unnormalized) likelihood of observing `measurement` from `pose`.
    /// Always non-negative; never zero (both sensors carry an additive
    /// floor so weights never fully collapse).
    fn likelihood(&self, map: &Map, measurement: &Self::Measurement, pose: Pose) -> f64;

    /// Reduces a step's per-particle weights to the single scalar that
    /// drives the `w_slow`/`w_fast` EMAs. `measurement` is the reading the
    /// weights were computed against, so sensors whose per-particle weight
    /// is itself a product over several individual readings (the range
    /// scanner) can take the geometric mean over every individual factor
    /// rather than just over particles.
    fn ema_update(&self, weights: &[f64], measurement: &Self::Measurement) -> f64;

    /// Sensor-specific constant used when computing the random-injection
    /// fraction: `max(0, 1 - w_fast / (w_slow * divider))`.
    fn divider(&self) -> f64;

    /// A fresh uniformly-random pose over the map, used for random particle
    /// injection. Both sensors use the same default: uniform position over
    /// the map rectangle, uniform orientation in `[0, 2*PI)`.
    fn sample_random_pose<R: Rng + ?Sized>(&self, map: &Map, rng: &mut R) -> Pose {
        Pose::random(rng, map.width, map.height)
    }
}
