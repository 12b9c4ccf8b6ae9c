//! # Navmesh Model
//!
//! This module defines the navigable mesh data model: convex [`Polygon`]s
//! tagged with a [`PolygonKind`], directed [`NavArc`]s (portals) over the
//! shared edges between them, and the [`NavModel`] object which owns a full
//! polygon/arc set together with its derived lookup indices.
//!
//! All distances are in millimetres, with the XZ plane horizontal and Y up.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::collections::HashMap;

use conquer_once::OnceCell;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use self::geom::{point_in_polygon_xz, segment_intersection};

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod geom;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Tolerance on the distance between a point and a polygon's supporting plane for the point to
/// count as "on" the polygon, in millimetres.
pub const PLANE_TOLERANCE_MM: f64 = 100.0;

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// The kind of a navmesh polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolygonKind {
    /// A walkable convex-volume region
    Cv,

    /// A terrain region
    Terrain,

    /// The model's outer bounding polygon
    Bounding,
}

/// The kind of an arc, derived from the kinds of the two polygons it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcKind {
    CvToCv,
    TerrainToTerrain,
    CvToTerrain,
}

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// A planar convex region of the mesh.
///
/// Corners are stored as an ordered, winding-consistent point list. The supporting plane is
/// computed once at construction and cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    /// Stable index of this polygon, unique within its owning model
    pub index: i32,

    /// The kind of region this polygon represents
    pub kind: PolygonKind,

    /// Ordered corner points, in millimetres
    pub corners: Vec<Vector3<f64>>,

    /// Unit normal of the cached supporting plane
    normal: Vector3<f64>,

    /// Plane offset, such that `normal.dot(p) - d == 0` for points on the plane
    d: f64,
}

/// A directed portal between two polygons, carrying their shared boundary segment.
///
/// Arcs are stored doubly, one in each direction, and are immutable once the owning model is
/// built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavArc {
    /// Index of the polygon the arc leaves
    pub from: i32,

    /// Index of the polygon the arc enters
    pub to: i32,

    /// Start of the shared boundary segment
    pub start: Vector3<f64>,

    /// End of the shared boundary segment
    pub end: Vector3<f64>,

    /// The kind of crossing this arc represents
    pub kind: ArcKind,
}

/// The nearest boundary crossing found by [`NavModel::closest_intersection`].
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    /// The crossing point
    pub point: Vector3<f64>,

    /// Fractional position of the crossing along the query segment, in `[0, 1]`
    pub fraction: f64,

    /// Index of the polygon whose boundary was crossed
    pub polygon: i32,
}

/// A named, typed mesh instance: polygons, arcs, portal subset, bounding polygon and derived
/// lookup indices.
///
/// The model is immutable after construction; the lookups are built lazily on first use and
/// cached, so concurrent reads are safe once construction has completed.
pub struct NavModel {
    name: String,
    model_type: String,
    polygons: Vec<Polygon>,
    arcs: Vec<NavArc>,
    portals: Vec<NavArc>,
    bounding: Polygon,

    /// Polygon index -> position in `polygons`
    poly_lookup: OnceCell<HashMap<i32, usize>>,

    /// Polygon index -> arcs leaving that polygon
    arc_lookup: OnceCell<HashMap<i32, Vec<NavArc>>>,

    /// Terrain polygon index at each bounding corner, if any
    corner_terrain: OnceCell<Vec<Option<i32>>>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Polygon {
    /// Build a polygon from its corners, caching the supporting plane.
    ///
    /// The plane normal is computed with Newell's method so that slightly non-coplanar corner
    /// sets still produce a usable plane.
    pub fn new(index: i32, kind: PolygonKind, corners: Vec<Vector3<f64>>) -> Self {
        let mut normal = Vector3::zeros();
        for i in 0..corners.len() {
            let a = corners[i];
            let b = corners[(i + 1) % corners.len()];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        let normal = if normal.norm() > std::f64::EPSILON {
            normal.normalize()
        } else {
            // Degenerate corner set, fall back to a horizontal plane
            Vector3::y()
        };
        let d = match corners.first() {
            Some(c) => normal.dot(c),
            None => 0.0,
        };

        Self {
            index,
            kind,
            corners,
            normal,
            d,
        }
    }

    /// Get the centroid (corner average) of the polygon.
    pub fn centroid(&self) -> Vector3<f64> {
        let mut sum = Vector3::zeros();
        for c in self.corners.iter() {
            sum += *c;
        }
        sum / (self.corners.len().max(1) as f64)
    }

    /// Signed distance from the given point to the polygon's supporting plane.
    pub fn plane_distance(&self, point: &Vector3<f64>) -> f64 {
        self.normal.dot(point) - self.d
    }

    /// Returns true if the point is inside the polygon in XZ and on or near its supporting
    /// plane (within [`PLANE_TOLERANCE_MM`]).
    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        self.plane_distance(point).abs() <= PLANE_TOLERANCE_MM
            && point_in_polygon_xz(point, &self.corners)
    }
}

impl NavArc {
    /// Get the midpoint of the arc's shared boundary segment.
    pub fn midpoint(&self) -> Vector3<f64> {
        (self.start + self.end) * 0.5
    }
}

impl NavModel {
    /// Build a new model from its polygon and arc sets.
    ///
    /// The portal subset (boundary-crossing arcs) is derived from the arc kinds. Lookup indices
    /// are built lazily on first use.
    pub fn new(
        name: impl Into<String>,
        model_type: impl Into<String>,
        polygons: Vec<Polygon>,
        arcs: Vec<NavArc>,
        bounding: Polygon,
    ) -> Self {
        let portals = arcs
            .iter()
            .filter(|a| a.kind == ArcKind::CvToTerrain)
            .cloned()
            .collect();

        Self {
            name: name.into(),
            model_type: model_type.into(),
            polygons,
            arcs,
            portals,
            bounding,
            poly_lookup: OnceCell::uninit(),
            arc_lookup: OnceCell::uninit(),
            corner_terrain: OnceCell::uninit(),
        }
    }

    /// Get the model's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the model's type name, used for spatial-index and agent-geometry lookups.
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Get the polygon with the given index, or `None` if the index is unknown.
    ///
    /// Missing indices are a normal lookup miss, never a panic; callers log them as errors where
    /// they indicate a malformed mesh.
    pub fn polygon(&self, index: i32) -> Option<&Polygon> {
        self.poly_lookup()
            .get(&index)
            .map(|&pos| &self.polygons[pos])
    }

    /// Get all arcs leaving the polygon with the given index.
    pub fn arcs_of(&self, index: i32) -> &[NavArc] {
        self.arc_lookup()
            .get(&index)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Returns true if the polygon with the given index is a terrain polygon.
    pub fn is_terrain(&self, index: i32) -> bool {
        match self.polygon(index) {
            Some(p) => p.kind == PolygonKind::Terrain,
            None => false,
        }
    }

    /// The boundary-crossing (CV to terrain) portal arcs of the model.
    pub fn portals(&self) -> &[NavArc] {
        &self.portals
    }

    /// The model's outer bounding polygon.
    pub fn bounding(&self) -> &Polygon {
        &self.bounding
    }

    /// Centre of the model, derived from opposite corners of the bounding polygon.
    pub fn center(&self) -> Vector3<f64> {
        let corners = &self.bounding.corners;
        if corners.is_empty() {
            return Vector3::zeros();
        }
        (corners[0] + corners[corners.len() / 2]) * 0.5
    }

    /// Radius of the model, derived from opposite corners of the bounding polygon.
    pub fn radius(&self) -> f64 {
        let corners = &self.bounding.corners;
        if corners.is_empty() {
            return 0.0;
        }
        (corners[0] - corners[corners.len() / 2]).norm() * 0.5
    }

    /// Find the nearest crossing of any CV polygon's boundary along the given segment.
    ///
    /// Nearness is by the intersection's distance-fraction along the segment; ties are broken by
    /// the first crossing found in stored polygon/edge order, which is reproducible.
    pub fn closest_intersection(
        &self,
        from: Vector3<f64>,
        to: Vector3<f64>,
    ) -> Option<Intersection> {
        let disp = to - from;
        let mut closest: Option<Intersection> = None;

        for poly in self.polygons.iter().filter(|p| p.kind == PolygonKind::Cv) {
            for i in 0..poly.corners.len() {
                let a = poly.corners[i];
                let b = poly.corners[(i + 1) % poly.corners.len()];

                if let Some(hit) = segment_intersection(from, disp, a, b - a) {
                    let better = match closest {
                        Some(ref c) => hit.fraction_a < c.fraction,
                        None => true,
                    };
                    if better {
                        closest = Some(Intersection {
                            point: hit.point,
                            fraction: hit.fraction_a,
                            polygon: poly.index,
                        });
                    }
                }
            }
        }

        closest
    }

    /// Find the first polygon (CV or terrain) containing the given point, in stored order.
    pub fn polygon_at(&self, point: &Vector3<f64>) -> Option<&Polygon> {
        self.polygons
            .iter()
            .find(|p| p.kind != PolygonKind::Bounding && p.contains(point))
    }

    /// Get the terrain polygon index at the given bounding-polygon corner, if one exists.
    pub fn terrain_at_corner(&self, corner: usize) -> Option<i32> {
        self.corner_terrain().get(corner).copied().flatten()
    }

    /// Legality check for a position: a point inside the model's bounding polygon which resolves
    /// to no polygon kind is illegal.
    ///
    /// Points outside the bounding polygon are not this model's concern and count as legal.
    pub fn position_legal(&self, point: &Vector3<f64>) -> bool {
        if !self.bounding.contains(point) {
            return true;
        }
        self.polygon_at(point).is_some()
    }

    // -- Lazily built lookups ----------------------------------------------------------------

    fn poly_lookup(&self) -> &HashMap<i32, usize> {
        self.poly_lookup.init_once(|| {
            self.polygons
                .iter()
                .enumerate()
                .map(|(pos, p)| (p.index, pos))
                .collect()
        });
        match self.poly_lookup.get() {
            Some(m) => m,
            None => unreachable!("polygon lookup failed to initialise"),
        }
    }

    fn arc_lookup(&self) -> &HashMap<i32, Vec<NavArc>> {
        self.arc_lookup.init_once(|| {
            let mut map: HashMap<i32, Vec<NavArc>> = HashMap::new();
            for arc in self.arcs.iter() {
                map.entry(arc.from).or_insert_with(Vec::new).push(*arc);
            }
            map
        });
        match self.arc_lookup.get() {
            Some(m) => m,
            None => unreachable!("arc lookup failed to initialise"),
        }
    }

    fn corner_terrain(&self) -> &Vec<Option<i32>> {
        self.corner_terrain.init_once(|| {
            self.bounding
                .corners
                .iter()
                .map(|corner| {
                    self.polygons
                        .iter()
                        .find(|p| p.kind == PolygonKind::Terrain && p.contains(corner))
                        .map(|p| p.index)
                })
                .collect()
        });
        match self.corner_terrain.get() {
            Some(v) => v,
            None => unreachable!("corner terrain lookup failed to initialise"),
        }
    }
}

impl std::fmt::Debug for NavModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavModel")
            .field("name", &self.name)
            .field("model_type", &self.model_type)
            .field("num_polygons", &self.polygons.len())
            .field("num_arcs", &self.arcs.len())
            .field("num_portals", &self.portals.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_polygon_contains() {
        let poly = Polygon::new(
            0,
            PolygonKind::Cv,
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1000.0, 0.0, 0.0),
                Vector3::new(1000.0, 0.0, 1000.0),
                Vector3::new(0.0, 0.0, 1000.0),
            ],
        );

        assert!(poly.contains(&Vector3::new(500.0, 0.0, 500.0)));
        assert!(poly.contains(&Vector3::new(500.0, 50.0, 500.0)));

        // Outside in XZ
        assert!(!poly.contains(&Vector3::new(1500.0, 0.0, 500.0)));

        // Too far off the supporting plane
        assert!(!poly.contains(&Vector3::new(500.0, 250.0, 500.0)));
    }

    #[test]
    fn test_model_lookups() {
        let model = fixtures::house("house", Vector3::zeros(), 1000.0);

        // CV polygon is index 0, terrain ring follows
        assert_eq!(model.polygon(0).unwrap().kind, PolygonKind::Cv);
        assert!(model.is_terrain(1));
        assert!(model.polygon(99).is_none());
        assert!(!model.is_terrain(99));

        // Every polygon with arcs can be enumerated, and terrain ring polygons connect both ways
        assert!(!model.arcs_of(1).is_empty());
        assert!(model.arcs_of(99).is_empty());

        // Every bounding corner sits in some terrain polygon
        for corner in 0..model.bounding().corners.len() {
            assert!(model.terrain_at_corner(corner).is_some());
        }
    }

    #[test]
    fn test_closest_intersection_picks_nearest() {
        let model = fixtures::house("house", Vector3::zeros(), 1000.0);

        // A segment crossing the whole model hits the near CV boundary first
        let hit = model
            .closest_intersection(
                Vector3::new(-2000.0, 0.0, 0.0),
                Vector3::new(2000.0, 0.0, 0.0),
            )
            .unwrap();
        assert!(hit.fraction > 0.0 && hit.fraction < 0.5);
        assert!(hit.point.x < 0.0);

        // A segment missing the model entirely finds nothing
        assert!(model
            .closest_intersection(
                Vector3::new(-2000.0, 0.0, 3000.0),
                Vector3::new(2000.0, 0.0, 3000.0),
            )
            .is_none());
    }

    #[test]
    fn test_position_legal() {
        let model = fixtures::house("house", Vector3::zeros(), 1000.0);

        // Inside the CV region
        assert!(model.position_legal(&Vector3::new(0.0, 0.0, 0.0)));
        // Outside the bounding polygon entirely
        assert!(model.position_legal(&Vector3::new(9000.0, 0.0, 0.0)));
    }
}
