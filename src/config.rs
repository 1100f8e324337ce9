//! Run configuration: the settings record and its key=value file loader
//!
//! The file format is one `key=value` per line, `#` comments and blank lines
//! skipped. Unrecognized keys are ignored for forward compatibility; values
//! that fail to parse for a recognized key are errors. A missing or unreadable
//! file is fatal before the simulation starts.

use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::simulation::ControllerKind;

/// Fully parsed settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    // simulation
    pub time_step: f64,
    pub duration: f64,
    pub warmup: f64,
    pub random_seed: u64,

    // network
    pub grid_size: usize,
    pub cell_length_m: f64,
    pub link_length_cells: usize,
    /// Carried metadata; movement logic is single-lane
    pub lanes_per_direction: usize,

    // vehicles
    pub vmax_cells_per_step: usize,
    pub slowdown_probability: f64,
    pub vehicle_length_cells: usize,
    /// Hard ceiling on concurrently live vehicles; spawns beyond it are
    /// dropped as unmet demand
    pub vehicle_pool_capacity: usize,

    // demand
    /// Per-second arrival probability rate per entry link
    pub arrival_rate: f64,
    /// Probability a crossing vehicle ignores its destination preference
    pub routing_randomness: f64,

    // traffic lights
    pub controller: ControllerKind,
    pub cycle_time: f64,
    pub green_ns: f64,
    pub act_min_green: f64,
    pub act_max_green: f64,
    pub act_queue_threshold: i64,
    pub mp_min_green: f64,
    pub mp_max_green: f64,

    // output
    pub export_interval: f64,
    pub save_queue_snapshots: bool,
    pub save_vehicle_trajectories: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_step: 0.5,
            duration: 7200.0,
            warmup: 1200.0,
            random_seed: 42,

            grid_size: 6,
            cell_length_m: 7.5,
            link_length_cells: 20,
            lanes_per_direction: 1,

            vmax_cells_per_step: 1,
            slowdown_probability: 0.2,
            vehicle_length_cells: 1,
            vehicle_pool_capacity: 200_000,

            arrival_rate: 0.25,
            routing_randomness: 0.1,

            controller: ControllerKind::Fixed,
            cycle_time: 60.0,
            green_ns: 30.0,
            act_min_green: 10.0,
            act_max_green: 40.0,
            act_queue_threshold: 5,
            mp_min_green: 5.0,
            mp_max_green: 45.0,

            export_interval: 1.0,
            save_queue_snapshots: true,
            save_vehicle_trajectories: false,
        }
    }
}

impl Config {
    /// Load a config file on top of the defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut cfg = Self::default();
        cfg.apply_kv_text(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    /// Apply key=value lines on top of the current settings
    pub fn apply_kv_text(&mut self, text: &str) -> Result<()> {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            self.apply_kv(key.trim(), value.trim())
                .with_context(|| format!("bad value for key '{}'", key.trim()))?;
        }
        Ok(())
    }

    fn apply_kv(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "simulation.time_step" => self.time_step = value.parse()?,
            "simulation.duration" => self.duration = value.parse()?,
            "simulation.warmup" => self.warmup = value.parse()?,
            "simulation.random_seed" => self.random_seed = value.parse()?,

            "network.grid_size" => self.grid_size = value.parse()?,
            "network.cell_length" => self.cell_length_m = value.parse()?,
            "network.link_length_cells" => self.link_length_cells = value.parse()?,
            "network.lanes_per_direction" => self.lanes_per_direction = value.parse()?,

            "vehicles.vmax_cells_per_step" => self.vmax_cells_per_step = value.parse()?,
            "vehicles.slowdown_probability" => self.slowdown_probability = value.parse()?,
            "vehicles.vehicle_length_cells" => self.vehicle_length_cells = value.parse()?,
            "vehicles.pool_capacity" => self.vehicle_pool_capacity = value.parse()?,

            "demand.arrival_rate" => self.arrival_rate = value.parse()?,
            "demand.routing_randomness" => self.routing_randomness = value.parse()?,

            "traffic_lights.controller" => {
                // unknown controller names fall back to fixed
                self.controller = ControllerKind::from_str(value).unwrap_or_default();
            }
            "traffic_lights.fixed.cycle_time" => self.cycle_time = value.parse()?,
            "traffic_lights.fixed.green_ns" => self.green_ns = value.parse()?,
            "traffic_lights.actuated.min_green" => self.act_min_green = value.parse()?,
            "traffic_lights.actuated.max_green" => self.act_max_green = value.parse()?,
            "traffic_lights.actuated.queue_threshold" => {
                self.act_queue_threshold = value.parse()?
            }
            "traffic_lights.max_pressure.min_green" => self.mp_min_green = value.parse()?,
            "traffic_lights.max_pressure.max_green" => self.mp_max_green = value.parse()?,

            "output.export_interval" => self.export_interval = value.parse()?,
            "output.save_queue_snapshots" => {
                self.save_queue_snapshots = parse_flag(value)?;
            }
            "output.save_vehicle_trajectories" => {
                self.save_vehicle_trajectories = parse_flag(value)?;
            }

            other => {
                // forward compatible: unknown keys are not an error
                debug!("ignoring unrecognized config key '{}'", other);
            }
        }
        Ok(())
    }
}

/// Boolean toggles are written as 0/1 in the file format
fn parse_flag(value: &str) -> Result<bool> {
    let n: i64 = value.parse()?;
    Ok(n != 0)
}
