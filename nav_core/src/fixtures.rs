//! Shared test fixtures.
//!
//! The main fixture is the "house": a CV interior square surrounded by a ring of four
//! overlapping terrain rectangles, all inside a square bounding polygon. The ring rectangles are
//! inflated past the bounding polygon so that every bounding corner sits strictly inside some
//! terrain polygon.
//!
//! ```text
//!        +---------3---------+
//!        |  +-------------+  |
//!        4  |    +---+    |  2      0 CV interior
//!        |  |    | 0 |    |  |      1..4 terrain ring (south, east, north, west)
//!        |  |    +-p-+    |  |      p portals (south and east CV edges)
//!        |  +-------------+  |
//!        +---------1---------+
//! ```

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use nalgebra::Vector3;

use crate::mesh::{ArcKind, NavArc, NavModel, Polygon, PolygonKind};

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Build a house model centred on `center` with bounding half-width `half_size` (millimetres).
///
/// Polygon indices: 0 CV interior (half `half_size / 2`), 1 south ring, 2 east ring, 3 north
/// ring, 4 west ring, 100 bounding. Ring polygons are connected to their neighbours both ways,
/// and CV-terrain portals sit on the south and east CV edges.
pub fn house(name: &str, center: Vector3<f64>, half_size: f64) -> NavModel {
    let (polygons, mut arcs, bounding) = house_parts(center, half_size);

    let h = half_size;
    let c = center;

    // Portals on the south and east edges of the CV square, doubly stored
    let portal_edges = [
        (
            1,
            Vector3::new(c.x - h / 2.0, 0.0, c.z - h / 2.0),
            Vector3::new(c.x + h / 2.0, 0.0, c.z - h / 2.0),
        ),
        (
            2,
            Vector3::new(c.x + h / 2.0, 0.0, c.z - h / 2.0),
            Vector3::new(c.x + h / 2.0, 0.0, c.z + h / 2.0),
        ),
    ];
    for (terrain, start, end) in portal_edges.iter() {
        arcs.push(NavArc {
            from: 0,
            to: *terrain,
            start: *start,
            end: *end,
            kind: ArcKind::CvToTerrain,
        });
        arcs.push(NavArc {
            from: *terrain,
            to: 0,
            start: *start,
            end: *end,
            kind: ArcKind::CvToTerrain,
        });
    }

    NavModel::new(name, "house", polygons, arcs, bounding)
}

/// A house with no portals at all: its CV interior cannot be left.
pub fn sealed_house(name: &str, center: Vector3<f64>, half_size: f64) -> NavModel {
    let (polygons, arcs, bounding) = house_parts(center, half_size);
    NavModel::new(name, "house", polygons, arcs, bounding)
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Polygons, ring arcs and bounding polygon shared by the house fixtures.
fn house_parts(
    center: Vector3<f64>,
    half_size: f64,
) -> (Vec<Polygon>, Vec<NavArc>, Polygon) {
    let h = half_size;
    // Ring margin past the bounding polygon, so bounding corners are strictly inside the ring
    let m = h / 4.0;
    let c = center;

    let rect = |index: i32, kind: PolygonKind, x0: f64, z0: f64, x1: f64, z1: f64| {
        Polygon::new(
            index,
            kind,
            vec![
                Vector3::new(x0, 0.0, z0),
                Vector3::new(x1, 0.0, z0),
                Vector3::new(x1, 0.0, z1),
                Vector3::new(x0, 0.0, z1),
            ],
        )
    };

    let polygons = vec![
        // CV interior
        rect(
            0,
            PolygonKind::Cv,
            c.x - h / 2.0,
            c.z - h / 2.0,
            c.x + h / 2.0,
            c.z + h / 2.0,
        ),
        // South ring
        rect(
            1,
            PolygonKind::Terrain,
            c.x - h - m,
            c.z - h - m,
            c.x + h + m,
            c.z - h / 2.0,
        ),
        // East ring
        rect(
            2,
            PolygonKind::Terrain,
            c.x + h / 2.0,
            c.z - h - m,
            c.x + h + m,
            c.z + h + m,
        ),
        // North ring
        rect(
            3,
            PolygonKind::Terrain,
            c.x - h - m,
            c.z + h / 2.0,
            c.x + h + m,
            c.z + h + m,
        ),
        // West ring
        rect(
            4,
            PolygonKind::Terrain,
            c.x - h - m,
            c.z - h - m,
            c.x - h / 2.0,
            c.z + h + m,
        ),
    ];

    // Ring arcs, one edge in each neighbour-pair overlap region, doubly stored
    let ring_edges = [
        (
            1,
            2,
            Vector3::new(c.x + h * 0.75, 0.0, c.z - h - m),
            Vector3::new(c.x + h * 0.75, 0.0, c.z - h / 2.0),
        ),
        (
            2,
            3,
            Vector3::new(c.x + h / 2.0, 0.0, c.z + h * 0.75),
            Vector3::new(c.x + h + m, 0.0, c.z + h * 0.75),
        ),
        (
            3,
            4,
            Vector3::new(c.x - h * 0.75, 0.0, c.z + h / 2.0),
            Vector3::new(c.x - h * 0.75, 0.0, c.z + h + m),
        ),
        (
            4,
            1,
            Vector3::new(c.x - h - m, 0.0, c.z - h * 0.75),
            Vector3::new(c.x - h / 2.0, 0.0, c.z - h * 0.75),
        ),
    ];
    let mut arcs = Vec::new();
    for (from, to, start, end) in ring_edges.iter() {
        arcs.push(NavArc {
            from: *from,
            to: *to,
            start: *start,
            end: *end,
            kind: ArcKind::TerrainToTerrain,
        });
        arcs.push(NavArc {
            from: *to,
            to: *from,
            start: *start,
            end: *end,
            kind: ArcKind::TerrainToTerrain,
        });
    }

    let bounding = rect(
        100,
        PolygonKind::Bounding,
        c.x - h,
        c.z - h,
        c.x + h,
        c.z + h,
    );

    (polygons, arcs, bounding)
}
