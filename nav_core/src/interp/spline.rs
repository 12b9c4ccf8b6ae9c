//! Catmull-Rom spline path interpolator.
//!
//! Smooths the route by running a centripetal-free (uniform) Catmull-Rom spline through its
//! points. The control sequence is the route's points with the first point doubled at the front
//! and the last doubled at the back, so the spline starts and ends exactly on the route
//! endpoints. Timing is shared with the linear interpolator: each spline span is traversed in
//! the time the straight segment beneath it would take.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector3;

use super::{cumulative_times, flattened_segment, segment_at, Interpolation, PathInterpolator};
use crate::route::RoutePath;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Lookahead used when estimating the travel direction by finite difference, in seconds.
const DIRECTION_LOOKAHEAD_S: f64 = 0.1;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Interpolates a route as a Catmull-Rom spline through its points.
pub struct SplineInterpolator {
    agent_id: u32,
    start_time_s: f64,
    speed_mm_s: f64,
    path: RoutePath,

    /// Route points with the first and last doubled; span `i` uses `control[i..i + 4]`
    control: Vec<Vector3<f64>>,

    /// Cumulative traversal time at each route point
    cumulative_s: Vec<f64>,
    total_time_s: f64,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl SplineInterpolator {
    /// Create an interpolator for an agent travelling `path` at `speed_mm_s` (which must be
    /// positive), starting at wall-clock time `start_time_s`.
    pub fn new(agent_id: u32, start_time_s: f64, speed_mm_s: f64, path: RoutePath) -> Self {
        let (cumulative_s, _) = cumulative_times(&path, speed_mm_s);
        let total_time_s = cumulative_s.last().copied().unwrap_or(0.0);

        let mut control = Vec::with_capacity(path.points.len() + 2);
        if let Some(first) = path.points.first() {
            control.push(*first);
        }
        control.extend(path.points.iter().copied());
        if let Some(last) = path.points.last() {
            control.push(*last);
        }

        Self {
            agent_id,
            start_time_s,
            speed_mm_s,
            path,
            control,
            cumulative_s,
            total_time_s,
        }
    }

    /// Evaluate the spline at time `t`, clamped to the end of the path, returning the raw
    /// (unflattened) position and the active span.
    fn eval(&self, t: f64) -> Option<(Vector3<f64>, usize)> {
        let (span, u) = if t >= self.total_time_s {
            // Clamp to the very end of the last traversable span
            let span = (0..self.cumulative_s.len().saturating_sub(1))
                .rev()
                .find(|&i| self.cumulative_s[i + 1] > self.cumulative_s[i])?;
            (span, 1.0)
        } else {
            segment_at(&self.cumulative_s, t)?
        };

        let position = catmull_rom(
            self.control[span],
            self.control[span + 1],
            self.control[span + 2],
            self.control[span + 3],
            u,
        );

        Some((position, span))
    }

    /// Flatten a sampled position to ground level if either original segment adjacent to the
    /// span crosses terrain.
    fn flatten(&self, mut position: Vector3<f64>, span: usize) -> Vector3<f64> {
        let flags = &self.path.segment_terrain;
        if flags[span] || (span > 0 && flags[span - 1]) {
            position.y = 0.0;
        }
        position
    }
}

impl PathInterpolator for SplineInterpolator {
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

        let (raw, span) = self.eval(time_since_start_s)?;
        let position = self.flatten(raw, span);

        // Direction by finite difference a short time ahead, clamped to the path end
        let ahead_t = (time_since_start_s + DIRECTION_LOOKAHEAD_S).min(self.total_time_s);
        let (raw_ahead, span_ahead) = self.eval(ahead_t)?;
        let ahead = self.flatten(raw_ahead, span_ahead);

        let diff = ahead - position;
        let direction_mm_s = if diff.norm() > std::f64::EPSILON {
            diff / diff.norm() * self.speed_mm_s
        } else {
            // Degenerate lookahead at the very end of the path: fall back to the chord of the
            // active segment
            let (a, b) = flattened_segment(&self.path, span);
            let chord = b - a;
            chord / chord.norm() * self.speed_mm_s
        };

        Some(Interpolation {
            position,
            direction_mm_s,
            remaining_mm: (self.total_time_s - time_since_start_s) * self.speed_mm_s,
        })
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Uniform Catmull-Rom basis over four control points, `u` in `[0, 1]` spanning `p1` to `p2`.
fn catmull_rom(
    p0: Vector3<f64>,
    p1: Vector3<f64>,
    p2: Vector3<f64>,
    p3: Vector3<f64>,
    u: f64,
) -> Vector3<f64> {
    let u2 = u * u;
    let u3 = u2 * u;

    (p1 * 2.0
        + (p2 - p0) * u
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * u2
        + (p1 * 3.0 - p0 - p2 * 3.0 + p3) * u3)
        * 0.5
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
