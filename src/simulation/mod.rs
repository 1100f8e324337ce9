//! Core traffic simulation
//!
//! The cellular-automaton engine, the road-network topology, the traffic-light
//! controllers, and streaming statistics. Everything here is deterministic for
//! a given configuration and seed and runs single-threaded.

mod engine;
mod grid;
mod light;
mod stats;
mod types;
mod vehicle;

pub use engine::Simulation;
pub use grid::{Intersection, Link, Network};
pub use light::{update_traffic_lights, TrafficLight};
pub use stats::{HeatmapCell, Stats, Summary, TripRecord, TRAVEL_TIME_CAPACITY};
pub use types::{
    ControllerKind, Direction, IntersectionId, LinkId, Phase, PlannedMove, VehicleId,
    QUEUE_WINDOW_CELLS,
};
pub use vehicle::{Vehicle, VehiclePool};
