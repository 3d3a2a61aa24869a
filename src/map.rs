//! The rasterized floor plus wall segments the estimator localizes against.

use crate::error::{LocalizationError, Result};
use crate::geometry::{dist_point_segment, dist_segment_segment, Segment};
use crate::utility::Point;

/// A planar map: a rasterized floor of color values and an ordered list of
/// wall segments. The first four walls are always the rectangle boundary.
/// Walls never mutate once the map has been handed to a filter.
#[derive(Debug, Clone)]
pub struct Map {
    pub width: f64,
    pub height: f64,
    pub resolution: f64,
    wpix: usize,
    hpix: usize,
    floor: Vec<u8>,
    walls: Vec<Segment>,
}

impl Map {
    /// Builds an empty map (floor entirely `255`, uncolored) with just the
    /// four boundary walls.
    pub fn new(width: f64, height: f64, resolution: f64) -> Result<Self> {
        if width <= 0.0 || height <= 0.0 {
            return Err(LocalizationError::InvalidMapDimensions { width, height });
        }
        if resolution <= 0.0 {
            return Err(LocalizationError::InvalidResolution { resolution });
        }

        let wpix = (width / resolution).ceil() as usize + 1;
        let hpix = (height / resolution).ceil() as usize + 1;
        let floor = vec![255u8; wpix * hpix];

        let walls = vec![
            Segment::new(Point::new(0.0, 0.0), Point::new(width, 0.0)),
            Segment::new(Point::new(width, 0.0), Point::new(width, height)),
            Segment::new(Point::new(width, height), Point::new(0.0, height)),
            Segment::new(Point::new(0.0, height), Point::new(0.0, 0.0)),
        ];

        Ok(Self {
            width,
            height,
            resolution,
            wpix,
            hpix,
            floor,
            walls,
        })
    }

    pub fn wpix(&self) -> usize {
        self.wpix
    }

    pub fn hpix(&self) -> usize {
        self.hpix
    }

    fn coor_to_pixel(&self, p: Point) -> (usize, usize) {
        let x = (p.x / self.resolution).round() as i64;
        let y = self.hpix as i64 - (p.y / self.resolution).round() as i64 - 1;
        (
            x.clamp(0, self.wpix as i64 - 1) as usize,
            y.clamp(0, self.hpix as i64 - 1) as usize,
        )
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> u8 {
        self.floor[self.wpix * y + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, value: u8) {
        self.floor[self.wpix * y + x] = value;
    }

    pub fn is_empty_pixel(&self, x: usize, y: usize) -> bool {
        self.get_pixel(x, y) == 255
    }

    /// The floor color at a continuous map coordinate.
    pub fn color_at(&self, p: Point) -> u8 {
        let (x, y) = self.coor_to_pixel(p);
        self.get_pixel(x, y)
    }

    /// Distance from `p` to the nearest wall.
    pub fn closest_wall(&self, p: Point) -> f64 {
        self.walls
            .iter()
            .map(|&w| dist_point_segment(p, w))
            .fold(f64::INFINITY, f64::min)
    }

    /// True iff `segment` touches or crosses any wall.
    pub fn intersects_any_wall(&self, segment: Segment) -> bool {
        self.walls
            .iter()
            .any(|&w| dist_segment_segment(segment, w) == 0.0)
    }

    /// Read-only iteration over the walls, boundary first.
    pub fn walls(&self) -> &[Segment] {
        &self.walls
    }

    /// Appends an interior wall. Used by `mapgen` and by tests building
    /// fixtures directly; the boundary walls are always present from
    /// construction and are never removed.
    pub fn add_wall(&mut self, wall: Segment) {
        self.walls.push(wall);
    }

    pub(crate) fn floor_mut(&mut self) -> &mut [u8] {
        &mut self.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn construction_rejects_nonpositive_dimensions() {
        assert!(Map::new(0.0, 10.0, 0.1).is_err());
        assert!(Map::new(10.0, -1.0, 0.1).is_err());
        assert!(Map::new(10.0, 10.0, 0.0).is_err());
    }

    #[test]
    fn new_map_has_four_boundary_walls() {
        let map = Map::new(10.0, 10.0, 0.1).unwrap();
        assert_eq!(map.walls().len(), 4);
    }

    #[test]
    fn color_at_reads_back_set_pixel() {
        let mut map = Map::new(10.0, 10.0, 0.1).unwrap();
        map.set_pixel(5, 5, 150);
        let p = map.get_pixel(5, 5);
        assert_eq!(p, 150);
    }

    #[test]
    fn closest_wall_matches_boundary_distance() {
        let map = Map::new(10.0, 10.0, 0.1).unwrap();
        let center = Point::new(5.0, 5.0);
        assert_relative_eq!(map.closest_wall(center), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn intersects_any_wall_detects_boundary_crossing() {
        let map = Map::new(10.0, 10.0, 0.1).unwrap();
        let crossing = Segment::new(Point::new(-1.0, 5.0), Point::new(1.0, 5.0));
        assert!(map.intersects_any_wall(crossing));
        let interior = Segment::new(Point::new(4.0, 4.0), Point::new(6.0, 6.0));
        assert!(!map.intersects_any_wall(interior));
    }
}
