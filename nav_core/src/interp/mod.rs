//! # Path Interpolators
//!
//! Turn a finished [`RoutePath`](crate::route::RoutePath) into a time-parameterised position and
//! velocity, for agents travelling the route at constant speed.
//!
//! Both interpolators share the same timing model: each segment's traversal time is its
//! terrain-flattened length divided by the agent speed, so a route has the same total travel
//! time whichever interpolator samples it. Terrain segments are flattened to ground level
//! (Y = 0) both for timing and for the sampled positions.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector3;

use crate::route::RoutePath;

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod linear;
pub mod spline;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// A single sample of an interpolated path.
#[derive(Debug, Clone, Copy)]
pub struct Interpolation {
    /// Position at the sampled time, in millimetres
    pub position: Vector3<f64>,

    /// Velocity at the sampled time: the unit direction of travel scaled by the agent speed, in
    /// millimetres per second
    pub direction_mm_s: Vector3<f64>,

    /// Distance left to travel along the route, in millimetres
    pub remaining_mm: f64,
}

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// A time-parameterised view of a route travelled at constant speed.
pub trait PathInterpolator {
    /// Identifier of the agent travelling this path.
    fn agent_id(&self) -> u32;

    /// Wall-clock time at which travel started, in seconds.
    fn start_time_s(&self) -> f64;

    /// Total travel time of the whole route, in seconds.
    fn total_time_s(&self) -> f64;

    /// Sample the path `time_since_start_s` seconds into travel.
    ///
    /// Returns `None` once the sampled time reaches the total travel time, for negative times,
    /// and for paths with fewer than two points.
    fn interpolate(&self, time_since_start_s: f64) -> Option<Interpolation>;
}

// -----------------------------------------------------------------------------------------------
// CRATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Endpoints of segment `i` of the route, with terrain segments flattened to ground level.
pub(crate) fn flattened_segment(path: &RoutePath, i: usize) -> (Vector3<f64>, Vector3<f64>) {
    let mut a = path.points[i];
    let mut b = path.points[i + 1];
    if path.segment_terrain[i] {
        a.y = 0.0;
        b.y = 0.0;
    }
    (a, b)
}

/// Cumulative traversal time at each route point, plus the flattened total route length.
///
/// The returned vector has one entry per route point; the last entry is the total travel time.
/// `speed_mm_s` must be positive.
pub(crate) fn cumulative_times(path: &RoutePath, speed_mm_s: f64) -> (Vec<f64>, f64) {
    let num_segments = path.points.len().saturating_sub(1);

    let mut cumulative = Vec::with_capacity(num_segments + 1);
    cumulative.push(0.0);

    let mut time = 0.0;
    let mut length = 0.0;
    for i in 0..num_segments {
        let (a, b) = flattened_segment(path, i);
        let len = (b - a).norm();
        length += len;
        time += len / speed_mm_s;
        cumulative.push(time);
    }

    (cumulative, length)
}

/// The segment containing time `t`, with the fractional position within it.
///
/// Zero-duration segments can never contain a sample and are skipped. `None` if `t` falls
/// outside `[0, total)`.
pub(crate) fn segment_at(cumulative: &[f64], t: f64) -> Option<(usize, f64)> {
    for i in 0..cumulative.len().saturating_sub(1) {
        if t >= cumulative[i] && t < cumulative[i + 1] {
            let u = (t - cumulative[i]) / (cumulative[i + 1] - cumulative[i]);
            return Some((i, u));
        }
    }
    None
}
