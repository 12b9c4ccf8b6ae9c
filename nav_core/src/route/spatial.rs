//! # Spatial Region Index
//!
//! The route planner locates models along its way through an abstract [`RegionIndex`]; the
//! engine itself never builds one. [`QuadRegionIndex`] is the provided implementation, backed by
//! the quadtree in `util`, storing each model by its bounding-polygon centre.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::sync::Arc;

use nalgebra::{Vector2, Vector3};
use util::quadtree::{Quad, QuadTree, QuadTreeError};

use crate::mesh::{geom::segment_intersection, NavModel};

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// Read-only spatial queries the route planner needs from the world.
pub trait RegionIndex {
    /// All models whose bounding polygon overlaps the given segment.
    fn models_on_segment(&self, from: Vector3<f64>, to: Vector3<f64>) -> Vec<Arc<NavModel>>;

    /// The model whose bounding polygon contains the given point, if any.
    fn model_at_point(&self, point: Vector3<f64>) -> Option<Arc<NavModel>>;
}

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Quadtree-backed [`RegionIndex`] implementation.
pub struct QuadRegionIndex {
    tree: QuadTree<usize>,
    models: Vec<Arc<NavModel>>,
    max_radius_mm: f64,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl QuadRegionIndex {
    /// Create a new empty index covering the world quad with the given centre and half-width (in
    /// the XZ plane, millimetres).
    pub fn new(centre: Vector2<f64>, half_width_mm: f64) -> Self {
        Self {
            tree: QuadTree::new(Quad::new(centre, half_width_mm)),
            models: Vec::new(),
            max_radius_mm: 0.0,
        }
    }

    /// Insert a model, keyed by its bounding-polygon centre.
    pub fn insert(&mut self, model: Arc<NavModel>) -> Result<(), QuadTreeError> {
        let centre = model.center();
        self.tree
            .insert(Vector2::new(centre.x, centre.z), self.models.len())?;
        self.max_radius_mm = self.max_radius_mm.max(model.radius());
        self.models.push(model);
        Ok(())
    }

    /// Candidate model ids near the given XZ window, in insertion order.
    fn candidates(&self, centre: Vector2<f64>, half_width_mm: f64) -> Vec<usize> {
        let mut ids = self
            .tree
            .query_in_quad(&Quad::new(centre, half_width_mm + self.max_radius_mm));
        // Quadtree traversal order depends on subdivision; insertion order is reproducible
        ids.sort_unstable();
        ids
    }
}

impl RegionIndex for QuadRegionIndex {
    fn models_on_segment(&self, from: Vector3<f64>, to: Vector3<f64>) -> Vec<Arc<NavModel>> {
        let centre = Vector2::new((from.x + to.x) * 0.5, (from.z + to.z) * 0.5);
        let half_width = ((to.x - from.x).abs().max((to.z - from.z).abs())) * 0.5;

        self.candidates(centre, half_width)
            .into_iter()
            .map(|id| &self.models[id])
            .filter(|model| {
                bounding_hit_fraction(model, from, to).is_some()
                    || model.bounding().contains(&from)
                    || model.bounding().contains(&to)
            })
            .cloned()
            .collect()
    }

    fn model_at_point(&self, point: Vector3<f64>) -> Option<Arc<NavModel>> {
        self.candidates(Vector2::new(point.x, point.z), 0.0)
            .into_iter()
            .map(|id| &self.models[id])
            .find(|model| model.bounding().contains(&point))
            .cloned()
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Smallest fraction along the segment at which it crosses the model's bounding polygon, if it
/// does.
pub fn bounding_hit_fraction(model: &NavModel, from: Vector3<f64>, to: Vector3<f64>) -> Option<f64> {
    let disp = to - from;
    let corners = &model.bounding().corners;

    let mut closest: Option<f64> = None;
    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        if let Some(hit) = segment_intersection(from, disp, a, b - a) {
            let better = match closest {
                Some(f) => hit.fraction_a < f,
                None => true,
            };
            if better {
                closest = Some(hit.fraction_a);
            }
        }
    }

    closest
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_index_queries() {
        let mut index = QuadRegionIndex::new(Vector2::new(0.0, 0.0), 50_000.0);
        let near = Arc::new(fixtures::house("near", Vector3::new(5000.0, 0.0, 0.0), 1000.0));
        let far = Arc::new(fixtures::house(
            "far",
            Vector3::new(5000.0, 0.0, 20_000.0),
            1000.0,
        ));
        index.insert(near).unwrap();
        index.insert(far).unwrap();

        // A segment along z = 0 hits only the near model
        let hit = index.models_on_segment(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10_000.0, 0.0, 0.0),
        );
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].name(), "near");

        // Point containment resolves to the right model
        let at = index.model_at_point(Vector3::new(5000.0, 0.0, 20_000.0)).unwrap();
        assert_eq!(at.name(), "far");
        assert!(index
            .model_at_point(Vector3::new(0.0, 0.0, 10_000.0))
            .is_none());
    }

    #[test]
    fn test_bounding_hit_fraction() {
        let model = fixtures::house("house", Vector3::new(0.0, 0.0, 0.0), 1000.0);

        let f = bounding_hit_fraction(
            &model,
            Vector3::new(-2000.0, 0.0, 0.0),
            Vector3::new(2000.0, 0.0, 0.0),
        )
        .unwrap();
        assert!((f - 0.25).abs() < 1e-9);

        assert!(bounding_hit_fraction(
            &model,
            Vector3::new(-2000.0, 0.0, 5000.0),
            Vector3::new(2000.0, 0.0, 5000.0),
        )
        .is_none());
    }
}
