//! Core types shared across the simulation
//!
//! Ids are plain indices into arena-style containers: links and intersections
//! live in flat vectors owned by the network, vehicles in a slot pool. Cells
//! reference vehicles by id only, never by ownership.

use std::fmt;
use std::str::FromStr;

/// Index of an intersection in the network's intersection arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntersectionId(pub usize);

/// Index of a link in the network's link arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// Slot index of a vehicle in the vehicle pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleId(pub usize);

/// Direction of travel on a link, also used to index the per-intersection
/// inbound/outbound link tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Table index for inbound/outbound link arrays
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    pub fn from_index(idx: usize) -> Direction {
        Self::ALL[idx % 4]
    }
}

/// Traffic-light phase: which pair of approaches has right of way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NorthSouth,
    EastWest,
}

impl Phase {
    /// Whether a vehicle travelling in `dir` may enter the intersection
    pub fn permits(self, dir: Direction) -> bool {
        match self {
            Phase::NorthSouth => matches!(dir, Direction::North | Direction::South),
            Phase::EastWest => matches!(dir, Direction::East | Direction::West),
        }
    }

    pub fn opposite(self) -> Phase {
        match self {
            Phase::NorthSouth => Phase::EastWest,
            Phase::EastWest => Phase::NorthSouth,
        }
    }
}

/// Which control strategy drives the traffic lights for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerKind {
    #[default]
    Fixed,
    Actuated,
    MaxPressure,
}

impl FromStr for ControllerKind {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to fixed-time control
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "actuated" => ControllerKind::Actuated,
            "max_pressure" => ControllerKind::MaxPressure,
            _ => ControllerKind::Fixed,
        })
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerKind::Fixed => "fixed",
            ControllerKind::Actuated => "actuated",
            ControllerKind::MaxPressure => "max_pressure",
        };
        f.write_str(name)
    }
}

/// Action a vehicle has planned for the current tick
///
/// Written during the plan stage, consumed during apply. Planning never touches
/// cell occupancy; apply re-validates targets before moving anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlannedMove {
    /// Hold position this tick
    #[default]
    Stay,
    /// Advance within the current link to the given cell index
    Advance(usize),
    /// Cross the downstream intersection into cell 0 of the given link
    Cross(LinkId),
    /// Leave the network at a boundary
    Exit,
}

/// Number of cells nearest the stop line counted as "the queue" by the
/// actuated and max-pressure controllers and by queue sampling
pub const QUEUE_WINDOW_CELLS: usize = 5;
