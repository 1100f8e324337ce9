//! Grid Traffic Simulation Library
//!
//! Simulates vehicle flow through a rectangular grid of signalized
//! intersections with a discretized cellular-automaton model, and evaluates
//! competing traffic-light control strategies.

pub mod config;
pub mod export;
pub mod simulation;
