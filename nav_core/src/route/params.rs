//! Parameters for the route planner.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::collections::HashMap;

use serde::Deserialize;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RoutePlannerParams {
    /// Agent half-width per agent type name, in millimetres.
    pub half_widths_mm: HashMap<String, f64>,

    /// Half-width used for agent types with no entry in `half_widths_mm`.
    pub default_half_width_mm: f64,

    /// Perpendicular clearance applied on the terrain side of a portal when computing exit and
    /// entry points, in millimetres.
    pub portal_clearance_mm: f64,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl RoutePlannerParams {
    /// Get the half-width for the given agent type.
    pub fn half_width_mm(&self, agent_type: &str) -> f64 {
        self.half_widths_mm
            .get(agent_type)
            .copied()
            .unwrap_or(self.default_half_width_mm)
    }
}
