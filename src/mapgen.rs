//! Non-core map-building helpers: seeded flood-fill floor colouring and
//! random interior wall placement.
//!
//! These are driver-level conveniences for building maps to exercise the
//! estimator against (used by this crate's own tests and demo binary).
//! The particle filter never calls into this module; `Map` by itself is a
//! complete, valid input to the core regardless of how its floor and walls
//! were produced.

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::geometry::Segment;
use crate::map::Map;
use crate::utility::Point;

const MIN_COLOUR: f64 = 120.0;
const MAX_COLOUR: f64 = 200.0;

/// Paints the floor with `num_colours` distinct shades grown from
/// `num_areas` randomly placed seed pixels via flood fill.
pub fn fill_floor<R: Rng + ?Sized>(map: &mut Map, num_areas: usize, num_colours: usize, rng: &mut R) {
    assert!(num_colours >= 1, "need at least one colour to fill with");
    let mult = if num_colours > 1 {
        (MAX_COLOUR - MIN_COLOUR) / (num_colours - 1) as f64
    } else {
        0.0
    };

    let colour_for = |c: usize| (c as f64 * mult + MIN_COLOUR) as u8;

    let wpix = map.wpix();
    let hpix = map.hpix();

    let mut todo: Vec<(usize, usize, u8)> = (0..num_areas)
        .map(|_| {
            let x = rng.gen_range(0..wpix);
            let y = rng.gen_range(0..hpix);
            let colour = colour_for(rng.gen_range(0..num_colours));
            (x, y, colour)
        })
        .collect();

    while !todo.is_empty() {
        let idx = rng.gen_range(0..todo.len());
        let (x, y, colour) = todo.swap_remove(idx);

        if map.is_empty_pixel(x, y) {
            map.set_pixel(x, y, colour);
        } else {
            continue;
        }

        for (dx, dy) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx >= 0 && nx < wpix as i64 && ny >= 0 && ny < hpix as i64 {
                let (nx, ny) = (nx as usize, ny as usize);
                if map.is_empty_pixel(nx, ny) {
                    todo.push((nx, ny, colour));
                }
            }
        }
    }
}

/// Adds `num` interior wall segments to the map, each kept at least 1 m
/// from any existing wall at both endpoints and extended in 0.1 m
/// increments until it would close to within 1.1 m of another wall, or a
/// length-proportional random stop fires (average length `avg_length`).
pub fn place_walls<R: Rng + ?Sized>(map: &mut Map, num: usize, avg_length: f64, rng: &mut R) {
    let angle_distr = Uniform::new(0.0, 2.0 * std::f64::consts::PI);

    for _ in 0..num {
        let (origin, angle) = loop {
            let x = rng.gen_range(0.0..map.width);
            let y = rng.gen_range(0.0..map.height);
            let angle = angle_distr.sample(rng);
            let end = Point::new(x + angle.cos(), y + angle.sin());
            let start = Point::new(x, y);
            if map.closest_wall(start) >= 1.0 && map.closest_wall(end) >= 1.0 {
                break (start, angle);
            }
        };

        let mut step = 9u32;
        let end = loop {
            step += 1;
            let dist = 0.1 * step as f64;
            let candidate = Point::new(origin.x + dist * angle.cos(), origin.y + dist * angle.sin());
            let stop = map.closest_wall(candidate) < 1.1
                || rng.gen::<f64>() < 0.1 / avg_length;
            if stop {
                break candidate;
            }
        };

        map.add_wall(Segment::new(origin, end));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn fill_floor_colours_every_pixel() {
        let mut map = Map::new(5.0, 5.0, 0.5).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        fill_floor(&mut map, 4, 3, &mut rng);
        for y in 0..map.hpix() {
            for x in 0..map.wpix() {
                assert!(!map.is_empty_pixel(x, y));
                let c = map.get_pixel(x, y);
                assert!((120..=200).contains(&c));
            }
        }
    }

    #[test]
    fn place_walls_keeps_boundary_and_adds_interior() {
        let mut map = Map::new(20.0, 20.0, 0.1).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        place_walls(&mut map, 3, 5.0, &mut rng);
        assert_eq!(map.walls().len(), 7);
    }
}
