//! Vehicle records and the fixed-capacity vehicle pool
//!
//! The pool is a slot arena: a slot is free iff its `finished` flag is set,
//! and slot indices double as vehicle ids. Links hold only those ids back in
//! their cells, never the records themselves. The capacity is a deliberate
//! memory ceiling — when every slot is live, spawns are dropped as unmet
//! demand rather than growing the pool.

use crate::simulation::types::{Direction, LinkId, PlannedMove, VehicleId};

/// A single vehicle. The `planned` field is per-tick scratch written during
/// the plan stage and consumed during apply.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Current speed in cells per step
    pub speed: usize,
    /// Personal speed cap in cells per step
    pub vmax: usize,

    pub link: LinkId,
    pub cell: usize,

    /// Compass side the vehicle wants to leave the grid on
    pub destination_exit: Direction,
    pub entry_time: f64,
    /// Accumulated seconds spent at speed zero
    pub stopped_time: f64,
    /// Set when the vehicle has exited; doubles as the slot-free flag
    pub finished: bool,

    pub planned: PlannedMove,
}

/// Fixed-capacity arena of vehicle slots
pub struct VehiclePool {
    slots: Vec<Vehicle>,
}

impl VehiclePool {
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|i| Vehicle {
                id: VehicleId(i),
                speed: 0,
                vmax: 0,
                link: LinkId(0),
                cell: 0,
                destination_exit: Direction::North,
                entry_time: 0.0,
                stopped_time: 0.0,
                finished: true,
                planned: PlannedMove::Stay,
            })
            .collect();
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claim the first free slot, lowest index first, and initialize it for a
    /// fresh spawn. Returns `None` when every slot is live.
    pub fn allocate(
        &mut self,
        entry_time: f64,
        destination_exit: Direction,
        vmax: usize,
    ) -> Option<VehicleId> {
        let slot = self.slots.iter_mut().find(|v| v.finished)?;
        slot.finished = false;
        slot.speed = 0;
        slot.vmax = vmax;
        slot.destination_exit = destination_exit;
        slot.entry_time = entry_time;
        slot.stopped_time = 0.0;
        slot.planned = PlannedMove::Stay;
        Some(slot.id)
    }

    pub fn get(&self, id: VehicleId) -> &Vehicle {
        &self.slots[id.0]
    }

    pub fn get_mut(&mut self, id: VehicleId) -> &mut Vehicle {
        &mut self.slots[id.0]
    }

    /// All slots in index order, live and free alike
    pub fn slots(&self) -> &[Vehicle] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [Vehicle] {
        &mut self.slots
    }

    /// Vehicles currently on the network
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|v| !v.finished).count()
    }

    /// Live vehicles in ascending slot order, the canonical processing order
    pub fn live(&self) -> impl Iterator<Item = &Vehicle> {
        self.slots.iter().filter(|v| !v.finished)
    }
}
