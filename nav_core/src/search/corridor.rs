//! # Corridor Synthesiser
//!
//! Converts a finished [`SearchTrace`] into the sequence of walkable points a finite-width agent
//! can follow through the portals the search crossed.
//!
//! The predecessor chain is walked goal to start; every arc crossed contributes one point on its
//! shared edge, inset from the edge endpoints by the agent half-width and aimed between the
//! previously emitted point and the next node's reference point. The output is reversed to
//! start-to-goal order before being handed back.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::error;
use nalgebra::Vector3;

use super::SearchTrace;
use crate::mesh::{geom::edge_offset_point, NavModel};

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CorridorError {
    /// An intermediate node carried no arc: only the start node may lack one, so this indicates
    /// a malformed mesh or trace.
    #[error("Search node for polygon {0} has no arc, the mesh or trace is malformed")]
    MissingArc(i32),
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Synthesise the corridor points for a search trace.
///
/// `destination` is the true destination point of the leg (the reference for the goal-side
/// segment). Returns the offset points in start-to-goal order, each tagged with whether the
/// polygon it lands in is terrain. The leg's endpoints themselves are not included.
///
/// Fails without emitting anything if an intermediate node lacks an arc; the caller treats this
/// the same as a failed search.
pub fn synthesise(
    model: &NavModel,
    trace: &SearchTrace,
    destination: Vector3<f64>,
    half_width_mm: f64,
) -> Result<Vec<(Vector3<f64>, bool)>, CorridorError> {
    let mut points: Vec<(Vector3<f64>, bool)> = Vec::new();

    let mut previous = destination;
    let mut index = trace.goal;

    loop {
        let node = &trace.nodes[index];

        let predecessor = match node.predecessor {
            Some(pred) => pred,
            // The chain root: the start node (or the degenerate goal-is-start node)
            None => break,
        };

        let arc = match node.arc {
            Some(arc) => arc,
            None => {
                error!(
                    "Corridor synthesis failed: intermediate node for polygon {} has no arc",
                    node.polygon
                );
                return Err(CorridorError::MissingArc(node.polygon));
            }
        };

        // Reference point on the start side: the next arc's midpoint, or the true start location
        // once the chain root is reached
        let next_reference = {
            let pred_node = &trace.nodes[predecessor];
            match pred_node.arc {
                Some(pred_arc) => pred_arc.midpoint(),
                None => match pred_node.point {
                    Some(p) => p,
                    None => {
                        error!(
                            "Corridor synthesis failed: start node for polygon {} has no location",
                            pred_node.polygon
                        );
                        return Err(CorridorError::MissingArc(pred_node.polygon));
                    }
                },
            }
        };

        let point = edge_offset_point(arc.start, arc.end, previous, next_reference, half_width_mm);
        points.push((point, model.is_terrain(node.polygon)));

        previous = point;
        index = predecessor;
    }

    // Walked goal to start, hand back start to goal
    points.reverse();
    Ok(points)
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
