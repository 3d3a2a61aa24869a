use failure::Fail;

/// Programmer-error conditions caught at construction time.
///
/// Degenerate numerics (parallel walls, all-zero weights, zero-length
/// motion) are handled locally by the components that encounter them and
/// never reach this type; see the module-level docs on `particle_filter`.
#[derive(Debug, Fail)]
pub enum LocalizationError {
    #[fail(display = "map dimensions must be positive, got width={}, height={}", width, height)]
    InvalidMapDimensions { width: f64, height: f64 },

    #[fail(display = "map resolution must be positive, got {}", resolution)]
    InvalidResolution { resolution: f64 },

    #[fail(display = "particle filter needs at least one particle, got {}", n)]
    InvalidParticleCount { n: usize },

    #[fail(display = "pose ({}, {}) lies outside the map rectangle ({} x {})", x, y, width, height)]
    PoseOutsideMap { x: f64, y: f64, width: f64, height: f64 },

    #[fail(display = "map must carry at least the four boundary walls, got {}", count)]
    EmptyWalls { count: usize },
}

pub type Result<T> = std::result::Result<T, LocalizationError>;
