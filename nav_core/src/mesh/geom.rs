//! Geometric primitives shared by the graph search and the corridor synthesiser.
//!
//! All routines work in the horizontal XZ plane in millimetre units; Y is carried through
//! untouched by linear interpolation where a 3D point is produced.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector3;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Segments are treated as parallel when the square of their XZ determinant is at or below this
/// value (millimetre units).
pub const NEAR_PARALLEL_DET_SQ: f64 = 1.0;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Result of a segment-segment intersection test.
#[derive(Debug, Clone, Copy)]
pub struct SegmentIntersection {
    /// The intersection point, with Y interpolated along the first segment
    pub point: Vector3<f64>,

    /// Fractional position of the intersection along the first segment, in `[0, 1]`
    pub fraction_a: f64,

    /// Fractional position of the intersection along the second segment, in `[0, 1]`
    pub fraction_b: f64,
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Intersect two segments, each given as (origin, displacement), in the XZ plane.
///
/// Returns `None` if the segments are near-parallel (determinant squared at or below
/// [`NEAR_PARALLEL_DET_SQ`]) or if either fractional position falls outside `[0, 1]`.
pub fn segment_intersection(
    origin_a: Vector3<f64>,
    disp_a: Vector3<f64>,
    origin_b: Vector3<f64>,
    disp_b: Vector3<f64>,
) -> Option<SegmentIntersection> {
    let det = disp_a.x * disp_b.z - disp_a.z * disp_b.x;

    if det * det <= NEAR_PARALLEL_DET_SQ {
        return None;
    }

    let dx = origin_b.x - origin_a.x;
    let dz = origin_b.z - origin_a.z;

    let fraction_a = (dx * disp_b.z - dz * disp_b.x) / det;
    let fraction_b = (dx * disp_a.z - dz * disp_a.x) / det;

    if !(0.0..=1.0).contains(&fraction_a) || !(0.0..=1.0).contains(&fraction_b) {
        return None;
    }

    Some(SegmentIntersection {
        point: origin_a + disp_a * fraction_a,
        fraction_a,
        fraction_b,
    })
}

/// Even-odd rule point-in-polygon test in the XZ plane.
pub fn point_in_polygon_xz(point: &Vector3<f64>, corners: &[Vector3<f64>]) -> bool {
    if corners.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = corners.len() - 1;

    for i in 0..corners.len() {
        let ci = corners[i];
        let cj = corners[j];

        if (ci.z > point.z) != (cj.z > point.z)
            && point.x < (cj.x - ci.x) * (point.z - ci.z) / (cj.z - ci.z) + ci.x
        {
            inside = !inside;
        }

        j = i;
    }

    inside
}

/// Best point on an edge between two approach points, inset by the agent half-width.
///
/// Computes the fraction at which the line through the two approach points crosses the edge. If
/// that fraction lands within `half_width` of either edge endpoint (in edge-length-normalised
/// units) it is clamped to the offset point near that endpoint, otherwise the edge is linearly
/// interpolated at the computed fraction.
///
/// This routine is load-bearing for corridor width correctness: the returned point is never
/// closer than `half_width` to either edge endpoint (edges shorter than a full agent width
/// collapse to their midpoint).
pub fn edge_offset_point(
    edge_start: Vector3<f64>,
    edge_end: Vector3<f64>,
    approach_a: Vector3<f64>,
    approach_b: Vector3<f64>,
    half_width: f64,
) -> Vector3<f64> {
    let edge = edge_end - edge_start;
    let edge_len = edge.norm();

    if edge_len <= std::f64::EPSILON {
        return edge_start;
    }

    // Fraction at which the (unclamped) approach line crosses the edge. A near-parallel approach
    // line gives no usable crossing, fall back to the edge midpoint.
    let approach = approach_b - approach_a;
    let det = edge.x * approach.z - edge.z * approach.x;

    let fraction = if det * det <= NEAR_PARALLEL_DET_SQ {
        0.5
    } else {
        let dx = approach_a.x - edge_start.x;
        let dz = approach_a.z - edge_start.z;
        (dx * approach.z - dz * approach.x) / det
    };

    let hw_fraction = (half_width / edge_len).min(0.5);
    let fraction = fraction.max(hw_fraction).min(1.0 - hw_fraction);

    edge_start + edge * fraction
}

/// Perpendicular of a vector in the XZ plane (90 degree rotation, Y zeroed).
pub fn perp_xz(v: Vector3<f64>) -> Vector3<f64> {
    Vector3::new(-v.z, 0.0, v.x)
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
