//! Digger: a deterministic tile-grid platformer simulation.
//!
//! `domain` holds the per-entity rules (terrain, holes, pathfinding, the
//! avatar and agent state machines). `sim` owns a session and runs the
//! ordered tick. The terminal front end in `main.rs` only drives `sim::game`.

pub mod config;
pub mod domain;
pub mod sim;
