//! # Route Planner
//!
//! Plans a complete route between two world positions by stitching together up to five phases:
//!
//! 1. If both endpoints resolve to the same model, a single in-model leg is the whole route.
//! 2. Egress: if the start is inside a model's CV region, a leg out through the portal nearest
//!    the destination, ending at an exit point just outside the portal.
//! 3. Terrain crossing: straight walking between models, detouring around the bounding corners
//!    of any model blocking the way, with an in-model terrain leg around each. Bounded at
//!    [`MAX_OBSTACLE_DETOURS`] detours.
//! 4. Entry: if the destination is inside a model's CV region, the terrain crossing aims for an
//!    entry point just outside the portal nearest the start, and a final leg goes in through it.
//! 5. The legs are assembled into one [`RoutePath`] with per-segment terrain flags.
//!
//! The planner holds no world state; the world arrives per call as a [`spatial::RegionIndex`].

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::sync::Arc;

use log::error;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::mesh::{geom::perp_xz, NavArc, NavModel, PolygonKind};
use crate::search::corridor::{self, CorridorError};
use crate::search::{polygon_route, SearchObserver};

use self::params::RoutePlannerParams;
use self::spatial::RegionIndex;

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod params;
pub mod spatial;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Upper bound on the number of obstacle detours in a single terrain crossing. Exceeding it
/// fails the plan rather than walking an unbounded chain of models.
pub const MAX_OBSTACLE_DETOURS: usize = 100;

/// Boundary crossings at or below this fraction of the query segment are the segment leaving the
/// model it starts on, not an obstacle ahead.
const HIT_FRACTION_EPSILON: f64 = 1e-6;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// A finished route: an ordered point list plus a terrain flag for each segment between
/// consecutive points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutePath {
    /// The route points, in order of travel
    pub points: Vec<Vector3<f64>>,

    /// Whether each segment crosses terrain; `segment_terrain[i]` covers `points[i]` to
    /// `points[i + 1]`
    pub segment_terrain: Vec<bool>,
}

/// The route planner. Holds only its parameters; all world state arrives per call.
pub struct RoutePlanner {
    params: RoutePlannerParams,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The start position is inside a model which cannot be left towards the destination.
    #[error("No path out of the start model {0}")]
    NoPathOutOfStartModel(String),

    /// The terrain crossing between the endpoints could not be completed.
    #[error("No path through the terrain between the endpoints")]
    NoPathThroughTerrain,

    /// The destination is inside a model which cannot be entered.
    #[error("No path into the destination model {0}")]
    NoPathIntoEndModel(String),
}

/// Failure of a single in-model leg, folded into a [`RouteError`] by the phase that ran it.
#[derive(Debug, thiserror::Error)]
enum LegError {
    #[error("search exhausted without reaching the target polygon")]
    SearchExhausted,

    #[error(transparent)]
    Corridor(#[from] CorridorError),
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl RoutePath {
    /// Append a point; `terrain` tags the segment arriving at it and is ignored for the first
    /// point of the path.
    pub fn append(&mut self, point: Vector3<f64>, terrain: bool) {
        if !self.points.is_empty() {
            self.segment_terrain.push(terrain);
        }
        self.points.push(point);
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total length of the route, in millimetres.
    pub fn length_mm(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }
}

impl RoutePlanner {
    pub fn new(params: RoutePlannerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RoutePlannerParams {
        &self.params
    }

    /// Plan a route for an agent of the given type between two world positions.
    ///
    /// The returned path always starts at `from` and ends at `to`. Failure of any phase fails
    /// the whole plan; no partial path is returned.
    pub fn plan(
        &self,
        index: &dyn RegionIndex,
        agent_type: &str,
        from: Vector3<f64>,
        to: Vector3<f64>,
        observer: &mut dyn SearchObserver,
    ) -> Result<RoutePath, RouteError> {
        let half_width = self.params.half_width_mm(agent_type);
        let clearance = self.params.portal_clearance_mm;

        let start_model = index.model_at_point(from);
        let goal_model = index.model_at_point(to);

        let start_poly = start_model
            .as_ref()
            .and_then(|m| m.polygon_at(&from))
            .map(|p| (p.index, p.kind));
        let goal_poly = goal_model
            .as_ref()
            .and_then(|m| m.polygon_at(&to))
            .map(|p| (p.index, p.kind));

        let mut path = RoutePath::default();
        path.append(from, false);

        // Phase 1: both endpoints inside the same model, the route is a single in-model leg
        if let (Some(sm), Some(gm)) = (start_model.as_ref(), goal_model.as_ref()) {
            if Arc::ptr_eq(sm, gm) {
                if let (Some((sp, _)), Some((gp, _))) = (start_poly, goal_poly) {
                    self.run_leg(sm, from, sp, to, gp, half_width, observer, &mut path)
                        .map_err(|e| {
                            error!("No route inside model {}: {}", sm.name(), e);
                            RouteError::NoPathOutOfStartModel(sm.name().to_owned())
                        })?;
                    return Ok(path);
                }
            }
        }

        let mut cur = from;

        // Phase 2: egress from the start model's CV region through the portal nearest the
        // destination
        if let Some(sm) = start_model.as_ref() {
            if let Some((sp, PolygonKind::Cv)) = start_poly {
                let portal = nearest_portal(sm, to).ok_or_else(|| {
                    error!("Model {} has no portal to leave through", sm.name());
                    RouteError::NoPathOutOfStartModel(sm.name().to_owned())
                })?;
                let exit = portal_outside_point(sm, &portal, to, half_width, clearance);
                let terrain_poly = portal_terrain_polygon(sm, &portal);

                self.run_leg(sm, from, sp, exit, terrain_poly, half_width, observer, &mut path)
                    .map_err(|e| {
                        error!("No route out of model {}: {}", sm.name(), e);
                        RouteError::NoPathOutOfStartModel(sm.name().to_owned())
                    })?;
                cur = exit;
            }
        }

        // Phase 4 is resolved up front: if the destination is inside a CV region the terrain
        // crossing aims for an entry point outside the portal nearest the start
        let mut entry: Option<(Arc<NavModel>, i32, i32)> = None;
        let mut terrain_target = to;
        if let Some(gm) = goal_model.as_ref() {
            if let Some((gp, PolygonKind::Cv)) = goal_poly {
                let portal = nearest_portal(gm, from).ok_or_else(|| {
                    error!("Model {} has no portal to enter through", gm.name());
                    RouteError::NoPathIntoEndModel(gm.name().to_owned())
                })?;
                terrain_target = portal_outside_point(gm, &portal, from, half_width, clearance);
                entry = Some((gm.clone(), portal_terrain_polygon(gm, &portal), gp));
            }
        }

        // Phase 3: straight terrain walking, detouring around any model in the way
        let mut detours = 0usize;
        loop {
            let obstacle = match nearest_obstacle(index, cur, terrain_target) {
                Some(o) => o,
                None => {
                    path.append(terrain_target, true);
                    break;
                }
            };

            if detours == MAX_OBSTACLE_DETOURS {
                error!(
                    "Terrain crossing abandoned after {} obstacle detours (last obstacle {})",
                    detours,
                    obstacle.name()
                );
                return Err(RouteError::NoPathThroughTerrain);
            }
            detours += 1;

            let is_goal_model = goal_model
                .as_ref()
                .map(|gm| Arc::ptr_eq(gm, &obstacle))
                .unwrap_or(false);
            let corners = &obstacle.bounding().corners;

            // Near-side corner. When rounding the destination's own model the remaining distance
            // is weighed in, so the walk rounds towards the entry point rather than the nearest
            // face.
            let corner_in = if is_goal_model {
                closest_corner(corners, |c| {
                    (c - cur).norm() + (c - terrain_target).norm()
                })
            } else {
                closest_corner(corners, |c| (c - cur).norm())
            };
            let corner_out = closest_corner(corners, |c| (c - terrain_target).norm());

            let (poly_in, poly_out) = match (
                obstacle.terrain_at_corner(corner_in),
                obstacle.terrain_at_corner(corner_out),
            ) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    error!(
                        "Model {} has no terrain at its bounding corners, cannot be rounded",
                        obstacle.name()
                    );
                    return Err(RouteError::NoPathThroughTerrain);
                }
            };

            let corner_in_point = corners[corner_in];
            let corner_out_point = corners[corner_out];

            path.append(corner_in_point, true);
            self.run_leg(
                &obstacle,
                corner_in_point,
                poly_in,
                corner_out_point,
                poly_out,
                half_width,
                observer,
                &mut path,
            )
            .map_err(|e| {
                error!("No route around model {}: {}", obstacle.name(), e);
                RouteError::NoPathThroughTerrain
            })?;

            cur = corner_out_point;
        }

        // Phase 4: entry leg from the entry point into the destination CV region
        if let Some((gm, terrain_poly, gp)) = entry {
            self.run_leg(
                &gm,
                terrain_target,
                terrain_poly,
                to,
                gp,
                half_width,
                observer,
                &mut path,
            )
            .map_err(|e| {
                error!("No route into model {}: {}", gm.name(), e);
                RouteError::NoPathIntoEndModel(gm.name().to_owned())
            })?;
        }

        Ok(path)
    }

    /// Run a single in-model leg: search the polygon graph, synthesise the corridor, and append
    /// its points plus the leg's end point to the path.
    #[allow(clippy::too_many_arguments)]
    fn run_leg(
        &self,
        model: &NavModel,
        from_point: Vector3<f64>,
        from_polygon: i32,
        to_point: Vector3<f64>,
        to_polygon: i32,
        half_width: f64,
        observer: &mut dyn SearchObserver,
        path: &mut RoutePath,
    ) -> Result<(), LegError> {
        let trace = polygon_route(
            model,
            from_point,
            from_polygon,
            to_point,
            to_polygon,
            observer,
        )
        .ok_or(LegError::SearchExhausted)?;

        let points = corridor::synthesise(model, &trace, to_point, half_width)?;
        for (point, terrain) in points {
            path.append(point, terrain);
        }
        path.append(to_point, model.is_terrain(to_polygon));

        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// The portal of `model` whose edge midpoint is closest to `toward`.
fn nearest_portal(model: &NavModel, toward: Vector3<f64>) -> Option<NavArc> {
    let mut best: Option<(f64, NavArc)> = None;
    for portal in model.portals() {
        let d = (portal.midpoint() - toward).norm();
        let better = match best {
            Some((bd, _)) => d < bd,
            None => true,
        };
        if better {
            best = Some((d, *portal));
        }
    }
    best.map(|(_, p)| p)
}

/// The terrain-side polygon of a portal arc.
fn portal_terrain_polygon(model: &NavModel, portal: &NavArc) -> i32 {
    if model.is_terrain(portal.from) {
        portal.from
    } else {
        portal.to
    }
}

/// A point just outside a portal, on its terrain side.
///
/// The point sits on the portal edge slid towards whichever endpoint is nearer `toward` (keeping
/// the agent half-width clear of it), then stepped off the edge by `clearance` away from the CV
/// polygon.
fn portal_outside_point(
    model: &NavModel,
    portal: &NavArc,
    toward: Vector3<f64>,
    half_width: f64,
    clearance: f64,
) -> Vector3<f64> {
    let edge = portal.end - portal.start;
    let edge_len = edge.norm();
    if edge_len <= std::f64::EPSILON {
        return portal.midpoint();
    }

    let hw_fraction = (half_width / edge_len).min(0.5);
    let fraction = if (portal.start - toward).norm() <= (portal.end - toward).norm() {
        hw_fraction
    } else {
        1.0 - hw_fraction
    };
    let on_edge = portal.start + edge * fraction;

    let cv_polygon = if model.is_terrain(portal.from) {
        portal.to
    } else {
        portal.from
    };
    let inside = model
        .polygon(cv_polygon)
        .map(|p| p.centroid())
        .unwrap_or_else(|| model.center());

    let mut outward = perp_xz(edge) / edge_len;
    if outward.dot(&(on_edge - inside)) < 0.0 {
        outward = -outward;
    }

    on_edge + outward * clearance
}

/// The first model blocking the straight segment from `from` to `to`, by crossing fraction.
///
/// Models containing `from` are being left, not approached, and are skipped; so are crossings at
/// fraction zero (standing on a model's bounding corner).
fn nearest_obstacle(
    index: &dyn RegionIndex,
    from: Vector3<f64>,
    to: Vector3<f64>,
) -> Option<Arc<NavModel>> {
    let mut best: Option<(f64, Arc<NavModel>)> = None;

    for model in index.models_on_segment(from, to) {
        if model.bounding().contains(&from) {
            continue;
        }
        if let Some(f) = spatial::bounding_hit_fraction(&model, from, to) {
            if f <= HIT_FRACTION_EPSILON {
                continue;
            }
            let better = match best {
                Some((bf, _)) => f < bf,
                None => true,
            };
            if better {
                best = Some((f, model));
            }
        }
    }

    best.map(|(_, m)| m)
}

/// Index of the corner minimising the given metric; ties keep the first corner in stored order.
fn closest_corner<F: Fn(&Vector3<f64>) -> f64>(corners: &[Vector3<f64>], metric: F) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in corners.iter().enumerate() {
        let d = metric(c);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
