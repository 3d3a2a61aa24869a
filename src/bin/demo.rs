//! Runs the particle filter against a randomly generated map for a fixed
//! number of autonomous steps, logging convergence progress. Not part of
//! the core: this is a thin driver for local experimentation, no image
//! rendering or CSV emission.
//!
//! Usage: `demo [width] [height] [particles] [seed] [steps] [range|color]`

use std::sync::Arc;

use mcl_localization::{ColorSensor, FilterConfig, Map, ParticleFilter, RangeScanner};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn arg(index: usize, default: &str) -> String {
    std::env::args().nth(index + 1).unwrap_or_else(|| default.to_string())
}

fn main() {
    env_logger::init();

    let width: f64 = arg(0, "20.0").parse().expect("width must be a number");
    let height: f64 = arg(1, "20.0").parse().expect("height must be a number");
    let particle_count: usize = arg(2, "200").parse().expect("particle count must be an integer");
    let seed: u64 = arg(3, "42").parse().expect("seed must be an integer");
    let steps: u32 = arg(4, "50").parse().expect("step count must be an integer");
    let sensor_kind = arg(5, "range");

    let mut map = Map::new(width, height, 0.1).expect("invalid map dimensions");
    let mut gen_rng = ChaCha8Rng::seed_from_u64(seed);
    mcl_localization::mapgen::fill_floor(&mut map, 100, 8, &mut gen_rng);
    mcl_localization::mapgen::place_walls(&mut map, 6, (width + height) / 2.0, &mut gen_rng);
    let map = Arc::new(map);

    let mut placement_rng = ChaCha8Rng::seed_from_u64(seed ^ 0xdead_beef);
    let start = loop {
        let x = placement_rng.gen_range(0.0..map.width);
        let y = placement_rng.gen_range(0.0..map.height);
        if map.closest_wall(mcl_localization::Point::new(x, y)) > 0.5 {
            break (x, y);
        }
    };
    let start_angle = placement_rng.gen_range(0.0..std::f64::consts::TAU);

    log::info!(
        "starting demo: {}x{}m map, {} particles, seed {}, sensor={}",
        width, height, particle_count, seed, sensor_kind
    );

    match sensor_kind.as_str() {
        "color" => run(map, particle_count, seed, steps, start_angle, start, ColorSensor::new()),
        _ => run(
            map,
            particle_count,
            seed,
            steps,
            start_angle,
            start,
            RangeScanner::new(0.05, 0.05),
        ),
    }
}

fn run<S: mcl_localization::SensorModel>(
    map: Arc<Map>,
    particle_count: usize,
    seed: u64,
    steps: u32,
    start_angle: f64,
    start: (f64, f64),
    sensor: S,
) {
    let mut filter = ParticleFilter::new(map, particle_count, seed, sensor, FilterConfig::default())
        .expect("valid filter parameters");
    filter.put(start_angle, start).expect("start pose is inside the map by construction");

    for step in 1..=steps {
        let converged = filter.autonomous_step();
        log::info!("step {}: true pose = {:?}, converged = {}", step, filter.pose(), converged);
        if converged {
            log::info!("converged after {} steps", step);
            break;
        }
    }
}
