//! Plans a route across a small demo world and samples it with both interpolators.
//!
//! The world is two "house" models (a CV interior ringed by terrain polygons) far apart, with a
//! third model blocking the straight line between their portals. Set `NAV_SW_ROOT` to load
//! `params/agents.toml`; without it built-in defaults are used.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::sync::Arc;

use color_eyre::{eyre::WrapErr, Result};
use log::{info, warn, LevelFilter};
use nalgebra::{Vector2, Vector3};

use nav_core::interp::{linear::LinearInterpolator, spline::SplineInterpolator, PathInterpolator};
use nav_core::mesh::{ArcKind, NavArc, NavModel, Polygon, PolygonKind};
use nav_core::route::{params::RoutePlannerParams, spatial::QuadRegionIndex, RoutePlanner};
use nav_core::search::LogObserver;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Agent speed used for the interpolation demo, in millimetres per second.
const AGENT_SPEED_MM_S: f64 = 1500.0;

/// Fallback parameters when `params/agents.toml` cannot be loaded.
const DEFAULT_PARAMS: &str = r#"
default_half_width_mm = 150.0
portal_clearance_mm = 200.0

[half_widths_mm]
scout = 120.0
hauler = 300.0
"#;

// -----------------------------------------------------------------------------------------------
// MAIN
// -----------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    util::logger::logger_init(LevelFilter::Debug, Some("route_demo.log"))
        .wrap_err("Failed to initialise logging")?;

    let params: RoutePlannerParams = match util::params::load("agents.toml") {
        Ok(p) => p,
        Err(e) => {
            warn!("Could not load agents.toml ({}), using built-in defaults", e);
            util::params::from_str(DEFAULT_PARAMS)
                .wrap_err("Failed to parse the built-in parameters")?
        }
    };

    // Build the demo world
    let mut index = QuadRegionIndex::new(Vector2::new(10_000.0, 0.0), 100_000.0);
    index
        .insert(Arc::new(house("alpha", Vector3::zeros(), 1000.0)))
        .wrap_err("Failed to index model alpha")?;
    index
        .insert(Arc::new(house(
            "bravo",
            Vector3::new(20_000.0, 0.0, 0.0),
            1000.0,
        )))
        .wrap_err("Failed to index model bravo")?;
    index
        .insert(Arc::new(house(
            "rock",
            Vector3::new(10_000.0, 0.0, -500.0),
            500.0,
        )))
        .wrap_err("Failed to index model rock")?;

    // Plan from inside alpha to inside bravo
    let from = Vector3::new(0.0, 0.0, 0.0);
    let to = Vector3::new(20_000.0, 0.0, 0.0);

    let planner = RoutePlanner::new(params);
    let path = planner
        .plan(&index, "scout", from, to, &mut LogObserver)
        .wrap_err("Route planning failed")?;

    info!(
        "Planned a {} point route, {:.1} m long",
        path.num_points(),
        path.length_mm() / 1000.0
    );
    info!("Route:\n{}", serde_json::to_string_pretty(&path)?);

    // Sample the route with both interpolators
    let linear = LinearInterpolator::new(1, 0.0, AGENT_SPEED_MM_S, path.clone());
    let spline = SplineInterpolator::new(1, 0.0, AGENT_SPEED_MM_S, path);

    info!("Total travel time: {:.2} s", linear.total_time_s());
    for i in 0..8 {
        let t = linear.total_time_s() * i as f64 / 8.0;
        if let (Some(l), Some(s)) = (linear.interpolate(t), spline.interpolate(t)) {
            info!(
                "t = {:7.2} s  linear ({:8.1}, {:8.1})  spline ({:8.1}, {:8.1})  {:8.1} mm left",
                t, l.position.x, l.position.z, s.position.x, s.position.z, l.remaining_mm
            );
        }
    }

    Ok(())
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Build a demo house model: a CV interior square (half `half_size / 2`) surrounded by a ring of
/// four overlapping terrain rectangles, with portals on the south and east CV edges, all inside
/// a square bounding polygon of half-width `half_size`.
fn house(name: &str, centre: Vector3<f64>, half_size: f64) -> NavModel {
    let h = half_size;
    let m = h / 4.0;
    let c = centre;

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
        rect(0, PolygonKind::Cv, c.x - h / 2.0, c.z - h / 2.0, c.x + h / 2.0, c.z + h / 2.0),
        rect(1, PolygonKind::Terrain, c.x - h - m, c.z - h - m, c.x + h + m, c.z - h / 2.0),
        rect(2, PolygonKind::Terrain, c.x + h / 2.0, c.z - h - m, c.x + h + m, c.z + h + m),
        rect(3, PolygonKind::Terrain, c.x - h - m, c.z + h / 2.0, c.x + h + m, c.z + h + m),
        rect(4, PolygonKind::Terrain, c.x - h - m, c.z - h - m, c.x - h / 2.0, c.z + h + m),
    ];

    // Ring arcs between neighbouring terrain rectangles, and portals on the south and east CV
    // edges, all stored doubly
    let edges = [
        (
            1,
            2,
            ArcKind::TerrainToTerrain,
            Vector3::new(c.x + h * 0.75, 0.0, c.z - h - m),
            Vector3::new(c.x + h * 0.75, 0.0, c.z - h / 2.0),
        ),
        (
            2,
            3,
            ArcKind::TerrainToTerrain,
            Vector3::new(c.x + h / 2.0, 0.0, c.z + h * 0.75),
            Vector3::new(c.x + h + m, 0.0, c.z + h * 0.75),
        ),
        (
            3,
            4,
            ArcKind::TerrainToTerrain,
            Vector3::new(c.x - h * 0.75, 0.0, c.z + h / 2.0),
            Vector3::new(c.x - h * 0.75, 0.0, c.z + h + m),
        ),
        (
            4,
            1,
            ArcKind::TerrainToTerrain,
            Vector3::new(c.x - h - m, 0.0, c.z - h * 0.75),
            Vector3::new(c.x - h / 2.0, 0.0, c.z - h * 0.75),
        ),
        (
            0,
            1,
            ArcKind::CvToTerrain,
            Vector3::new(c.x - h / 2.0, 0.0, c.z - h / 2.0),
            Vector3::new(c.x + h / 2.0, 0.0, c.z - h / 2.0),
        ),
        (
            0,
            2,
            ArcKind::CvToTerrain,
            Vector3::new(c.x + h / 2.0, 0.0, c.z - h / 2.0),
            Vector3::new(c.x + h / 2.0, 0.0, c.z + h / 2.0),
        ),
    ];

    let mut arcs = Vec::new();
    for (from, to, kind, start, end) in edges.iter() {
        arcs.push(NavArc {
            from: *from,
            to: *to,
            start: *start,
            end: *end,
            kind: *kind,
        });
        arcs.push(NavArc {
            from: *to,
            to: *from,
            start: *start,
            end: *end,
            kind: *kind,
        });
    }

    let bounding = rect(100, PolygonKind::Bounding, c.x - h, c.z - h, c.x + h, c.z + h);

    NavModel::new(name, "house", polygons, arcs, bounding)
}
