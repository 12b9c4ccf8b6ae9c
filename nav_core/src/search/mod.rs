//! # Polygon Graph Search
//!
//! Finds a minimum cost chain of portal crossings between two polygons of a [`NavModel`], using
//! a priority search over the model's arc graph.
//!
//! The search is a value-returning pure function: each invocation allocates its own open/closed
//! maps and priority heap, so concurrent searches share nothing but the read-only model. Nodes
//! live in an arena ([`SearchTrace::nodes`]) and link to their predecessors by integer handle,
//! which also makes the finished trace trivially serialisable for debugging.
//!
//! Note on ordering: priority is by accumulated cost alone, with the polygon index as a
//! deterministic tie-break. The start node's heuristic is computed and contributes to its
//! priority, but the heuristic is not re-applied per iteration, so the search behaves as
//! uniform-cost. This matches the movement system consuming the results and must not be
//! "improved" without revalidating against it.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::mesh::{NavArc, NavModel};

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod corridor;

// -----------------------------------------------------------------------------------------------
// TYPES
// -----------------------------------------------------------------------------------------------

/// Handle of a node within a [`SearchTrace`] arena.
pub type NodeIndex = usize;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// A single search state.
///
/// The start node has a concrete point and no arc; intermediate nodes carry the arc just crossed
/// and the polygon it lands in; the goal node additionally has the goal's exact location copied
/// into it on termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchNode {
    /// Index of the polygon this state is in
    pub polygon: i32,

    /// The arc crossed to enter this state, `None` for the start node
    pub arc: Option<NavArc>,

    /// Concrete location for the start and goal states
    pub point: Option<Vector3<f64>>,

    /// Accumulated cost from the start, in integer millimetres
    pub cost_mm: i64,

    /// Estimated remaining cost, computed for the start node only
    pub heuristic_mm: i64,

    /// Handle of the predecessor state, `None` for the start node
    pub predecessor: Option<NodeIndex>,
}

/// The result of a successful search: the node arena plus the start and goal handles.
///
/// Walking `predecessor` links from `goal` always terminates at `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTrace {
    pub nodes: Vec<SearchNode>,
    pub start: NodeIndex,
    pub goal: NodeIndex,
}

/// Observer invoked at well-defined checkpoints of the search, so that tracing lives outside the
/// algorithm itself.
pub trait SearchObserver {
    fn node_popped(&mut self, _polygon: i32, _cost_mm: i64) {}
    fn successor_considered(&mut self, _from: i32, _to: i32, _cost_mm: i64) {}
    fn goal_reached(&mut self, _polygon: i32, _cost_mm: i64) {}
}

/// An observer which does nothing.
pub struct NullObserver;

/// An observer which logs each checkpoint at trace level.
pub struct LogObserver;

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl SearchObserver for NullObserver {}

impl SearchObserver for LogObserver {
    fn node_popped(&mut self, polygon: i32, cost_mm: i64) {
        log::trace!("search: popped polygon {} at cost {} mm", polygon, cost_mm);
    }

    fn successor_considered(&mut self, from: i32, to: i32, cost_mm: i64) {
        log::trace!(
            "search: considering arc {} -> {} at cost {} mm",
            from,
            to,
            cost_mm
        );
    }

    fn goal_reached(&mut self, polygon: i32, cost_mm: i64) {
        log::trace!("search: goal polygon {} reached at cost {} mm", polygon, cost_mm);
    }
}

impl SearchNode {
    /// The point successor costs are measured from: the crossed arc's midpoint, or the concrete
    /// location for the start node.
    fn reference_point(&self) -> Option<Vector3<f64>> {
        match self.arc {
            Some(ref arc) => Some(arc.midpoint()),
            None => self.point,
        }
    }
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Search for a minimum cost polygon route through `model`.
///
/// Returns `None` if the open set is exhausted before the goal polygon is reached. Termination
/// is by polygon index equality, not geometric proximity; on success the goal's exact location
/// is copied into the final node.
pub fn polygon_route(
    model: &NavModel,
    start_point: Vector3<f64>,
    start_polygon: i32,
    goal_point: Vector3<f64>,
    goal_polygon: i32,
    observer: &mut dyn SearchObserver,
) -> Option<SearchTrace> {
    // Degenerate fast path: both endpoints in the same polygon, the goal node is both ends of
    // the trace and no search is performed.
    if start_polygon == goal_polygon {
        let node = SearchNode {
            polygon: goal_polygon,
            arc: None,
            point: Some(goal_point),
            cost_mm: 0,
            heuristic_mm: 0,
            predecessor: None,
        };
        return Some(SearchTrace {
            nodes: vec![node],
            start: 0,
            goal: 0,
        });
    }

    let mut nodes: Vec<SearchNode> = Vec::new();

    // One open/closed slot per polygon index: multiple arcs into the same polygon collapse onto
    // the single best-known node for it.
    let mut open: HashMap<i32, NodeIndex> = HashMap::new();
    let mut closed: HashMap<i32, NodeIndex> = HashMap::new();

    // Min-heap ordered by (priority, polygon index); the polygon index tie-break keeps pop order
    // deterministic. Entries are lazily invalidated: an entry is stale unless it still matches
    // the open slot for its polygon.
    let mut heap: BinaryHeap<Reverse<(i64, i32, NodeIndex)>> = BinaryHeap::new();

    let heuristic_mm = (goal_point - start_point).norm() as i64;
    nodes.push(SearchNode {
        polygon: start_polygon,
        arc: None,
        point: Some(start_point),
        cost_mm: 0,
        heuristic_mm,
        predecessor: None,
    });
    open.insert(start_polygon, 0);
    // Only the start node's priority carries the heuristic term
    heap.push(Reverse((heuristic_mm, start_polygon, 0)));

    while let Some(Reverse((_, polygon, index))) = heap.pop() {
        // Skip entries superseded by a cheaper re-expansion
        if open.get(&polygon) != Some(&index) {
            continue;
        }
        open.remove(&polygon);

        observer.node_popped(polygon, nodes[index].cost_mm);

        if polygon == goal_polygon {
            // Success: copy the goal's exact location into the popped node
            nodes[index].point = Some(goal_point);
            observer.goal_reached(polygon, nodes[index].cost_mm);
            return Some(SearchTrace {
                nodes,
                start: 0,
                goal: index,
            });
        }

        closed.insert(polygon, index);

        let from_point = match nodes[index].reference_point() {
            Some(p) => p,
            None => continue,
        };
        let predecessor_polygon = nodes[index]
            .predecessor
            .map(|pred| nodes[pred].polygon);

        for arc in model.arcs_of(polygon) {
            // Don't step straight back into the polygon we just came from
            if Some(arc.to) == predecessor_polygon {
                continue;
            }

            let cost_mm = nodes[index].cost_mm + (arc.midpoint() - from_point).norm() as i64;
            observer.successor_considered(polygon, arc.to, cost_mm);

            if let Some(&open_index) = open.get(&arc.to) {
                // Replace an open node only on strictly lower cost
                if cost_mm < nodes[open_index].cost_mm {
                    nodes[open_index] = SearchNode {
                        polygon: arc.to,
                        arc: Some(*arc),
                        point: None,
                        cost_mm,
                        heuristic_mm: 0,
                        predecessor: Some(index),
                    };
                    heap.push(Reverse((cost_mm, arc.to, open_index)));
                }
            } else if let Some(&closed_index) = closed.get(&arc.to) {
                // Reopen a closed node only on strictly lower cost
                if cost_mm < nodes[closed_index].cost_mm {
                    nodes[closed_index] = SearchNode {
                        polygon: arc.to,
                        arc: Some(*arc),
                        point: None,
                        cost_mm,
                        heuristic_mm: 0,
                        predecessor: Some(index),
                    };
                    closed.remove(&arc.to);
                    open.insert(arc.to, closed_index);
                    heap.push(Reverse((cost_mm, arc.to, closed_index)));
                }
            } else {
                let new_index = nodes.len();
                nodes.push(SearchNode {
                    polygon: arc.to,
                    arc: Some(*arc),
                    point: None,
                    cost_mm,
                    heuristic_mm: 0,
                    predecessor: Some(index),
                });
                open.insert(arc.to, new_index);
                heap.push(Reverse((cost_mm, arc.to, new_index)));
            }
        }
    }

    // Open set exhausted without reaching the goal polygon
    None
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures;
    use crate::mesh::{ArcKind, NavArc, NavModel, Polygon, PolygonKind};

    /// Build a model which is a strip of CV squares 0..n connected in a line along +X, each
    /// 1000 mm wide, with a detour branch if `with_branch` is set:
    ///
    /// ```text
    ///   0 - 1 - 2 - 3
    ///    \         /
    ///     4 ------*     (branch, longer edges)
    /// ```
    fn strip_model(with_branch: bool) -> NavModel {
        let mut polygons = Vec::new();
        let mut arcs = Vec::new();

        let square = |i: i32, ox: f64, oz: f64| {
            Polygon::new(
                i,
                PolygonKind::Cv,
                vec![
                    nalgebra::Vector3::new(ox, 0.0, oz),
                    nalgebra::Vector3::new(ox + 1000.0, 0.0, oz),
                    nalgebra::Vector3::new(ox + 1000.0, 0.0, oz + 1000.0),
                    nalgebra::Vector3::new(ox, 0.0, oz + 1000.0),
                ],
            )
        };

        for i in 0..4 {
            polygons.push(square(i, 1000.0 * i as f64, 0.0));
        }

        let vertical_edge = |x: f64| {
            (
                nalgebra::Vector3::new(x, 0.0, 0.0),
                nalgebra::Vector3::new(x, 0.0, 1000.0),
            )
        };

        for i in 0..3i32 {
            let (s, e) = vertical_edge(1000.0 * (i + 1) as f64);
            arcs.push(NavArc {
                from: i,
                to: i + 1,
                start: s,
                end: e,
                kind: ArcKind::CvToCv,
            });
            arcs.push(NavArc {
                from: i + 1,
                to: i,
                start: s,
                end: e,
                kind: ArcKind::CvToCv,
            });
        }

        if with_branch {
            // A branch polygon south of the strip, reachable from 0 and reaching 3, whose hop
            // midpoints make the branch strictly longer than the strip
            polygons.push(square(4, 1500.0, -3000.0));
            let branch_edges = [
                (
                    0,
                    4,
                    nalgebra::Vector3::new(500.0, 0.0, 0.0),
                    nalgebra::Vector3::new(1500.0, 0.0, -3000.0),
                ),
                (
                    4,
                    3,
                    nalgebra::Vector3::new(2500.0, 0.0, -3000.0),
                    nalgebra::Vector3::new(3500.0, 0.0, 0.0),
                ),
            ];
            for (from, to, s, e) in branch_edges.iter() {
                arcs.push(NavArc {
                    from: *from,
                    to: *to,
                    start: *s,
                    end: *e,
                    kind: ArcKind::CvToCv,
                });
                arcs.push(NavArc {
                    from: *to,
                    to: *from,
                    start: *s,
                    end: *e,
                    kind: ArcKind::CvToCv,
                });
            }
        }

        let bounding = Polygon::new(
            100,
            PolygonKind::Bounding,
            vec![
                nalgebra::Vector3::new(0.0, 0.0, -4000.0),
                nalgebra::Vector3::new(4000.0, 0.0, -4000.0),
                nalgebra::Vector3::new(4000.0, 0.0, 1000.0),
                nalgebra::Vector3::new(0.0, 0.0, 1000.0),
            ],
        );

        NavModel::new("strip", "test", polygons, arcs, bounding)
    }

    #[test]
    fn test_degenerate_same_polygon() {
        let model = strip_model(false);
        let trace = polygon_route(
            &model,
            nalgebra::Vector3::new(100.0, 0.0, 100.0),
            2,
            nalgebra::Vector3::new(900.0, 0.0, 900.0),
            2,
            &mut NullObserver,
        )
        .unwrap();

        assert_eq!(trace.start, trace.goal);
        assert_eq!(trace.nodes.len(), 1);
        assert!(trace.nodes[trace.goal].arc.is_none());
        assert_eq!(trace.nodes[trace.goal].cost_mm, 0);
    }

    #[test]
    fn test_route_along_strip() {
        let model = strip_model(false);
        let start = nalgebra::Vector3::new(500.0, 0.0, 500.0);
        let goal = nalgebra::Vector3::new(3500.0, 0.0, 500.0);

        let trace = polygon_route(&model, start, 0, goal, 3, &mut NullObserver).unwrap();

        // Chain is 3 <- 2 <- 1 <- 0
        let mut chain = Vec::new();
        let mut idx = Some(trace.goal);
        while let Some(i) = idx {
            chain.push(trace.nodes[i].polygon);
            idx = trace.nodes[i].predecessor;
        }
        assert_eq!(chain, vec![3, 2, 1, 0]);

        // Monotonic cost: the goal's accumulated cost equals the sum of the edge costs along the
        // predecessor chain
        let mut sum = 0i64;
        let mut idx = trace.goal;
        while let Some(pred) = trace.nodes[idx].predecessor {
            let to_point = trace.nodes[idx].arc.unwrap().midpoint();
            let from_point = match trace.nodes[pred].arc {
                Some(a) => a.midpoint(),
                None => trace.nodes[pred].point.unwrap(),
            };
            sum += (to_point - from_point).norm() as i64;
            idx = pred;
        }
        assert_eq!(sum, trace.nodes[trace.goal].cost_mm);
    }

    #[test]
    fn test_shorter_route_wins() {
        let model = strip_model(true);
        let start = nalgebra::Vector3::new(500.0, 0.0, 500.0);
        let goal = nalgebra::Vector3::new(3500.0, 0.0, 500.0);

        let trace = polygon_route(&model, start, 0, goal, 3, &mut NullObserver).unwrap();

        // The direct strip must win over the long southern branch
        let mut chain = Vec::new();
        let mut idx = Some(trace.goal);
        while let Some(i) = idx {
            chain.push(trace.nodes[i].polygon);
            idx = trace.nodes[i].predecessor;
        }
        assert_eq!(chain, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let model = strip_model(false);
        // Polygon 7 does not exist, so no arc chain can ever reach it
        assert!(polygon_route(
            &model,
            nalgebra::Vector3::new(500.0, 0.0, 500.0),
            0,
            nalgebra::Vector3::new(9500.0, 0.0, 500.0),
            7,
            &mut NullObserver,
        )
        .is_none());
    }

    #[test]
    fn test_search_inside_house_fixture() {
        let model = fixtures::house("house", nalgebra::Vector3::zeros(), 1000.0);

        // From the CV interior out to a terrain ring polygon on the far side
        let trace = polygon_route(
            &model,
            nalgebra::Vector3::new(0.0, 0.0, 0.0),
            0,
            nalgebra::Vector3::new(0.0, 0.0, 900.0),
            3,
            &mut NullObserver,
        )
        .unwrap();
        assert_eq!(trace.nodes[trace.goal].polygon, 3);
    }
}
