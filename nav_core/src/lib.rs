//! # Navigation Core
//!
//! Runtime navigation engine for agents moving over a navmesh world: a mesh data model
//! ([`mesh`]), a polygon graph search with corridor synthesis ([`search`]), a multi-phase route
//! planner ([`route`]) and time-parameterised path interpolators ([`interp`]).
//!
//! All distances are in millimetres, the XZ plane is horizontal and Y points up.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod interp;
pub mod mesh;
pub mod route;
pub mod search;

#[cfg(test)]
pub(crate) mod fixtures;
