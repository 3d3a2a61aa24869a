//! Floor-color sensor: reports the color of the cell under the pose.

use rand::Rng;

use super::{ColorMeasurement, SensorModel};
use crate::map::Map;
use crate::utility::Pose;

/// Non-zero weight floor assigned to a color mismatch, so a single bad
/// reading can't fully collapse a particle's weight.
const MISMATCH_WEIGHT: f64 = 0.05;

#[derive(Debug, Clone, Copy, Default)]
pub struct ColorSensor;

impl ColorSensor {
    pub fn new() -> Self {
        Self
    }
}

impl SensorModel for ColorSensor {
    type Measurement = ColorMeasurement;

    fn measure<R: Rng + ?Sized>(&self, map: &Map, pose: Pose, _rng: &mut R) -> ColorMeasurement {
        map.color_at(pose.position)
    }

    fn likelihood(&self, map: &Map, measurement: &ColorMeasurement, pose: Pose) -> f64 {
        if map.color_at(pose.position) == *measurement {
            1.0
        } else {
            MISMATCH_WEIGHT
        }
    }

    fn ema_update(&self, weights: &[f64], _measurement: &ColorMeasurement) -> f64 {
        if weights.is_empty() {
            0.0
        } else {
            weights.iter().sum::<f64>() / weights.len() as f64
        }
    }

    fn divider(&self) -> f64 {
        1.0
    }
}
