//! Traffic-light state and the three control strategies
//!
//! Each intersection owns one light with exactly two phases, NS-green and
//! EW-green. Controllers are pure over the network: they read queue and
//! occupancy state but mutate only their own light, once per tick.

use crate::config::Config;
use crate::simulation::grid::Network;
use crate::simulation::types::{ControllerKind, Direction, IntersectionId, Phase, QUEUE_WINDOW_CELLS};

/// Per-intersection signal state plus the thresholds its controller reads
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub kind: ControllerKind,
    pub phase: Phase,
    /// Time spent in the current phase, reset on every switch
    pub phase_elapsed: f64,

    // fixed
    pub cycle_time: f64,
    pub green_ns: f64,

    // actuated / max-pressure bounds
    pub min_green: f64,
    pub max_green: f64,

    // actuated
    pub queue_threshold: i64,
}

impl TrafficLight {
    pub fn new(cfg: &Config) -> Self {
        let (min_green, max_green) = match cfg.controller {
            ControllerKind::MaxPressure => (cfg.mp_min_green, cfg.mp_max_green),
            _ => (cfg.act_min_green, cfg.act_max_green),
        };
        Self {
            kind: cfg.controller,
            phase: Phase::NorthSouth,
            phase_elapsed: 0.0,
            cycle_time: cfg.cycle_time,
            green_ns: cfg.green_ns,
            min_green,
            max_green,
            queue_threshold: cfg.act_queue_threshold,
        }
    }

    /// Fixed-time control: phase is a pure function of wall-clock time modulo
    /// the cycle, NS-green for the first `green_ns` seconds
    fn update_fixed(&mut self, now: f64) {
        let into_cycle = now % self.cycle_time;
        self.phase = if into_cycle < self.green_ns {
            Phase::NorthSouth
        } else {
            Phase::EastWest
        };
    }

    /// Gap-actuated control: hold for min_green, force a switch at max_green,
    /// in between yield when the opposing approach's queue exceeds the current
    /// one's by more than the threshold
    fn update_actuated(&mut self, q_ns: i64, q_ew: i64, dt: f64) {
        self.phase_elapsed += dt;
        if self.phase_elapsed < self.min_green {
            return;
        }

        let force = self.phase_elapsed >= self.max_green;
        let wants_ns = q_ns - q_ew > self.queue_threshold;
        let wants_ew = q_ew - q_ns > self.queue_threshold;

        let demanded = match self.phase {
            Phase::NorthSouth => wants_ew,
            Phase::EastWest => wants_ns,
        };
        if force || demanded {
            self.phase = self.phase.opposite();
            self.phase_elapsed = 0.0;
        }
    }

    /// Max-pressure control: hold for min_green, then follow whichever phase
    /// has the higher pressure, ties in favor of NS; max_green forces a
    /// re-decision either way
    fn update_max_pressure(&mut self, p_ns: i64, p_ew: i64, dt: f64) {
        self.phase_elapsed += dt;
        if self.phase_elapsed < self.min_green {
            return;
        }

        let best = if p_ns >= p_ew {
            Phase::NorthSouth
        } else {
            Phase::EastWest
        };
        let force = self.phase_elapsed >= self.max_green;

        if force || best != self.phase {
            self.phase = best;
            self.phase_elapsed = 0.0;
        }
    }
}

/// Run the configured controller on every intersection.
///
/// Queue and pressure metrics are read before the light mutates, so the
/// decision for each intersection sees the pre-update occupancy snapshot.
pub fn update_traffic_lights(net: &mut Network, now: f64, dt: f64) {
    for idx in 0..net.intersection_count() {
        let id = IntersectionId(idx);
        match net.intersection(id).light.kind {
            ControllerKind::Fixed => {
                net.intersection_mut(id).light.update_fixed(now);
            }
            ControllerKind::Actuated => {
                let q_ns = (net.queue_in_dir(id, Direction::North, QUEUE_WINDOW_CELLS)
                    + net.queue_in_dir(id, Direction::South, QUEUE_WINDOW_CELLS))
                    as i64;
                let q_ew = (net.queue_in_dir(id, Direction::East, QUEUE_WINDOW_CELLS)
                    + net.queue_in_dir(id, Direction::West, QUEUE_WINDOW_CELLS))
                    as i64;
                net.intersection_mut(id).light.update_actuated(q_ns, q_ew, dt);
            }
            ControllerKind::MaxPressure => {
                let p_ns = net.pressure_for_phase(id, Phase::NorthSouth, QUEUE_WINDOW_CELLS);
                let p_ew = net.pressure_for_phase(id, Phase::EastWest, QUEUE_WINDOW_CELLS);
                net.intersection_mut(id).light.update_max_pressure(p_ns, p_ew, dt);
            }
        }
    }
}
