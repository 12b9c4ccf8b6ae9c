//! Piecewise-linear path interpolator.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector3;

use super::{cumulative_times, flattened_segment, segment_at, Interpolation, PathInterpolator};
use crate::route::RoutePath;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Interpolates a route as straight constant-speed segments between its points.
pub struct LinearInterpolator {
    agent_id: u32,
    start_time_s: f64,
    speed_mm_s: f64,
    path: RoutePath,

    /// Cumulative traversal time at each route point
    cumulative_s: Vec<f64>,
    total_time_s: f64,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl LinearInterpolator {
    /// Create an interpolator for an agent travelling `path` at `speed_mm_s` (which must be
    /// positive), starting at wall-clock time `start_time_s`.
    pub fn new(agent_id: u32, start_time_s: f64, speed_mm_s: f64, path: RoutePath) -> Self {
        let (cumulative_s, _) = cumulative_times(&path, speed_mm_s);
        let total_time_s = cumulative_s.last().copied().unwrap_or(0.0);

        Self {
            agent_id,
            start_time_s,
            speed_mm_s,
            path,
            cumulative_s,
            total_time_s,
        }
    }
}

impl PathInterpolator for LinearInterpolator {
    fn agent_id(&self) -> u32 {
        self.agent_id
    }

    fn start_time_s(&self) -> f64 {
        self.start_time_s
    }

    fn total_time_s(&self) -> f64 {
        self.total_time_s
    }

    fn interpolate(&self, time_since_start_s: f64) -> Option<Interpolation> {
        if self.path.points.len() < 2
            || time_since_start_s < 0.0
            || time_since_start_s >= self.total_time_s
        {
            return None;
        }

        let (seg, u) = segment_at(&self.cumulative_s, time_since_start_s)?;
        let (a, b) = flattened_segment(&self.path, seg);

        // The active segment has positive duration, so its flattened length is positive too
        let chord = b - a;
        let direction_mm_s = chord / chord.norm() * self.speed_mm_s;

        Some(Interpolation {
            position: a + chord * u,
            direction_mm_s,
            remaining_mm: (self.total_time_s - time_since_start_s) * self.speed_mm_s,
        })
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Two 1000 mm segments along +X at 500 mm height, the second crossing terrain.
    fn sample_path() -> RoutePath {
        let mut path = RoutePath::default();
        path.append(Vector3::new(0.0, 500.0, 0.0), false);
        path.append(Vector3::new(1000.0, 500.0, 0.0), false);
        path.append(Vector3::new(2000.0, 500.0, 0.0), true);
        path
    }

    #[test]
    fn test_endpoints_and_bounds() {
        let interp = LinearInterpolator::new(1, 0.0, 500.0, sample_path());

        // Two flattened 1000 mm segments at 500 mm/s
        assert!((interp.total_time_s() - 4.0).abs() < 1e-9);

        // Sampling at zero gives the first route point exactly
        let at_start = interp.interpolate(0.0).unwrap();
        assert!((at_start.position - Vector3::new(0.0, 500.0, 0.0)).norm() < 1e-9);
        assert!((at_start.remaining_mm - 2000.0).abs() < 1e-9);

        // Out-of-range samples give nothing
        assert!(interp.interpolate(-0.1).is_none());
        assert!(interp.interpolate(4.0).is_none());
        assert!(interp.interpolate(100.0).is_none());

        // A single-point path can never be sampled
        let mut stub = RoutePath::default();
        stub.append(Vector3::zeros(), false);
        let interp = LinearInterpolator::new(1, 0.0, 500.0, stub);
        assert!(interp.interpolate(0.0).is_none());
    }

    #[test]
    fn test_terrain_segment_is_flattened() {
        let interp = LinearInterpolator::new(1, 0.0, 500.0, sample_path());

        // Mid-way through the first (non-terrain) segment the height is kept
        let sample = interp.interpolate(1.0).unwrap();
        assert!((sample.position - Vector3::new(500.0, 500.0, 0.0)).norm() < 1e-9);

        // Mid-way through the terrain segment the height is exactly zero
        let sample = interp.interpolate(3.0).unwrap();
        assert_eq!(sample.position.y, 0.0);
        assert!((sample.position.x - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_direction_is_speed_scaled() {
        let speed = 500.0;
        let interp = LinearInterpolator::new(1, 0.0, speed, sample_path());

        let sample = interp.interpolate(1.0).unwrap();
        assert!((sample.direction_mm_s.norm() - speed).abs() < 1e-9);
        assert!((sample.direction_mm_s - Vector3::new(speed, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_zero_length_segments_are_skipped() {
        // A duplicated route point must not break sampling around it
        let mut path = RoutePath::default();
        path.append(Vector3::new(0.0, 0.0, 0.0), false);
        path.append(Vector3::new(1000.0, 0.0, 0.0), true);
        path.append(Vector3::new(1000.0, 0.0, 0.0), true);
        path.append(Vector3::new(2000.0, 0.0, 0.0), true);
        let interp = LinearInterpolator::new(1, 0.0, 1000.0, path);

        assert!((interp.total_time_s() - 2.0).abs() < 1e-9);
        let sample = interp.interpolate(1.5).unwrap();
        assert!((sample.position.x - 1500.0).abs() < 1e-9);
    }
}
