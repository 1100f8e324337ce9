//! The cellular-automaton stepper and run loop
//!
//! Each tick runs four strictly ordered stages: spawn, light update, plan,
//! apply. Planning reads a consistent pre-tick snapshot of occupancy and
//! phases and writes only per-vehicle scratch; apply is the only stage that
//! mutates cell occupancy and the pool. All random draws happen in a fixed
//! order (entry links in build order, then vehicles in slot order), so a run
//! is bit-exactly reproducible for a given seed.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::simulation::grid::{Intersection, Network};
use crate::simulation::light::update_traffic_lights;
use crate::simulation::stats::{Stats, Summary};
use crate::simulation::types::{Direction, LinkId, PlannedMove, VehicleId};
use crate::simulation::vehicle::VehiclePool;

/// One complete simulation run: network, vehicle pool, RNG, and statistics,
/// advanced tick by tick
pub struct Simulation {
    cfg: Config,
    net: Network,
    pool: VehiclePool,
    rng: StdRng,
    stats: Stats,
    time: f64,
}

impl Simulation {
    pub fn new(cfg: &Config) -> Self {
        let net = Network::build(cfg);
        let stats = Stats::new(net.intersection_count(), cfg.save_vehicle_trajectories);
        Self {
            net,
            pool: VehiclePool::new(cfg.vehicle_pool_capacity),
            rng: StdRng::seed_from_u64(cfg.random_seed),
            stats,
            time: 0.0,
            cfg: cfg.clone(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.net
    }

    pub fn vehicles(&self) -> &VehiclePool {
        &self.pool
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advance the simulation by one tick
    pub fn tick(&mut self) {
        self.spawn_vehicles();
        update_traffic_lights(&mut self.net, self.time, self.cfg.time_step);
        self.plan_moves();
        self.apply_moves();
        if self.time >= self.cfg.warmup {
            self.stats.collect_queues(&self.net);
        }
        self.time += self.cfg.time_step;
    }

    /// Run until the configured duration and finalize the metrics
    pub fn run(&mut self) -> Summary {
        info!(
            "starting run: grid {n}x{n}, controller {ctrl}, duration {dur}s, seed {seed}",
            n = self.cfg.grid_size,
            ctrl = self.cfg.controller,
            dur = self.cfg.duration,
            seed = self.cfg.random_seed,
        );

        while self.time < self.cfg.duration {
            self.tick();
        }

        let measured = (self.cfg.duration - self.cfg.warmup).max(0.0);
        let summary = self.stats.finalize(measured);
        info!(
            "run complete: spawned {}, exited {}, blocked {}, live {}",
            summary.spawned,
            summary.exited,
            summary.blocked_entries,
            self.pool.live_count()
        );
        summary
    }

    /// Stage 1: inject demand at the boundary entry links.
    ///
    /// One uniform draw per entry link per tick, unconditionally, so the draw
    /// sequence does not depend on occupancy. A vehicle entering on a link
    /// wants to leave the grid on the same compass side it is travelling
    /// toward (through traffic); see the routing note in DESIGN.md.
    fn spawn_vehicles(&mut self) {
        let p = self.cfg.arrival_rate * self.cfg.time_step;
        for idx in 0..self.net.entry_links().len() {
            let link_id = self.net.entry_links()[idx];
            if self.rng.random::<f64>() >= p {
                continue;
            }
            if self.net.link(link_id).cells[0].is_some() {
                self.stats.blocked_entries += 1;
                continue;
            }
            let travel_dir = self.net.link(link_id).dir;
            // Pool exhausted: the spawn is dropped as unmet demand, no counter
            if let Some(vid) =
                self.pool
                    .allocate(self.time, travel_dir, self.cfg.vmax_cells_per_step)
            {
                let v = self.pool.get_mut(vid);
                v.link = link_id;
                v.cell = 0;
                self.net.link_mut(link_id).cells[0] = Some(vid);
                self.stats.spawned += 1;
            }
        }
    }

    /// Stage 3: plan every live vehicle's next action against the pre-tick
    /// occupancy and phase snapshot. Vehicles are processed in slot order;
    /// nothing but per-vehicle scratch is written.
    fn plan_moves(&mut self) {
        let cfg = &self.cfg;
        let net = &self.net;
        let rng = &mut self.rng;

        for v in self.pool.slots_mut() {
            if v.finished {
                continue;
            }

            let link = net.link(v.link);
            let mut sp = (v.speed + 1).min(v.vmax);
            let gap = link.gap_ahead(v.cell);
            let dist_end = link.stopline() - v.cell;
            let mut allowed = gap.min(dist_end);

            v.planned = PlannedMove::Stay;

            if sp > dist_end {
                if let Some(inter_id) = link.to {
                    let inter = net.intersection(inter_id);
                    if !inter.light.phase.permits(link.dir) {
                        // red: hold at the stop line
                        allowed = dist_end;
                    } else if net.is_boundary_exit(v.link, v.destination_exit) {
                        v.planned = PlannedMove::Exit;
                        v.speed = 0;
                        continue;
                    } else {
                        match choose_out_link(v.destination_exit, inter, cfg.routing_randomness, rng)
                        {
                            Some(out) if net.link(out).cells[0].is_none() => {
                                v.planned = PlannedMove::Cross(out);
                            }
                            // downstream blocked: don't cross this tick
                            _ => allowed = dist_end,
                        }
                    }
                }
            }

            if !matches!(v.planned, PlannedMove::Cross(_)) {
                sp = sp.min(allowed);
            }

            // random slowdown; crossing vehicles draw too but cross regardless
            if sp > 0 && rng.random::<f64>() < cfg.slowdown_probability {
                sp -= 1;
            }
            v.speed = sp;

            if !matches!(v.planned, PlannedMove::Cross(_)) {
                let target = v.cell + v.speed;
                v.planned = if target == v.cell {
                    PlannedMove::Stay
                } else {
                    PlannedMove::Advance(target)
                };
            }
        }
    }

    /// Stage 4: apply the planned actions.
    ///
    /// Within-link advances resolve first, scanning each link from the stop
    /// line backward so no vehicle overwrites a cell another has not yet
    /// vacated; a target that turned out occupied cancels the advance. The
    /// cross/exit pass then re-validates each target link's first cell before
    /// moving across, since an earlier cross may have filled it this tick.
    fn apply_moves(&mut self) {
        let net = &mut self.net;
        let pool = &mut self.pool;
        let stats = &mut self.stats;
        let now = self.time;
        let warmup = self.cfg.warmup;
        let dt = self.cfg.time_step;

        for lid in 0..net.link_count() {
            let link = net.link_mut(LinkId(lid));
            for c in (0..link.cells.len()).rev() {
                let Some(vid) = link.cells[c] else { continue };
                let v = pool.get_mut(vid);
                if let PlannedMove::Advance(target) = v.planned {
                    if target < link.cells.len() && link.cells[target].is_none() {
                        link.cells[c] = None;
                        link.cells[target] = Some(vid);
                        v.cell = target;
                    }
                }
            }
        }

        for idx in 0..pool.capacity() {
            let vid = VehicleId(idx);
            let v = pool.get(vid);
            if v.finished {
                continue;
            }
            match v.planned {
                PlannedMove::Cross(out) => {
                    if net.link(out).cells[0].is_none() {
                        let (in_link, cell) = (v.link, v.cell);
                        net.link_mut(in_link).cells[cell] = None;
                        net.link_mut(out).cells[0] = Some(vid);
                        let v = pool.get_mut(vid);
                        v.link = out;
                        v.cell = 0;
                    }
                }
                PlannedMove::Exit => {
                    let (in_link, cell, entry) = (v.link, v.cell, v.entry_time);
                    net.link_mut(in_link).cells[cell] = None;
                    pool.get_mut(vid).finished = true;
                    if now >= warmup {
                        stats.on_exit(vid, entry, now);
                    }
                }
                PlannedMove::Stay | PlannedMove::Advance(_) => {
                    if v.speed == 0 {
                        pool.get_mut(vid).stopped_time += dt;
                    }
                }
            }
        }
    }
}

/// Pick the downstream link for a crossing vehicle.
///
/// With probability `randomness` the destination preference is ignored and up
/// to four random compass directions are tried, first existing link winning.
/// Otherwise the link matching the desired exit direction is preferred, with
/// any existing outbound link as the fallback.
fn choose_out_link(
    want: Direction,
    inter: &Intersection,
    randomness: f64,
    rng: &mut StdRng,
) -> Option<LinkId> {
    if rng.random::<f64>() < randomness {
        for _ in 0..4 {
            let d = (rng.random::<f64>() * 4.0) as usize;
            if let Some(out) = inter.outbound[d] {
                return Some(out);
            }
        }
    }

    if let Some(out) = inter.outbound_link(want) {
        return Some(out);
    }
    Direction::ALL.iter().find_map(|&d| inter.outbound_link(d))
}
