//! Road network topology for the grid
//!
//! Builds the directed graph of links and intersections for an N×N signalized
//! grid. Links and intersections live in flat arenas owned by the network and
//! reference each other by index, so there is no ownership cycle anywhere in
//! the graph. Cell occupancy is the only state that mutates after build.

use crate::config::Config;
use crate::simulation::light::TrafficLight;
use crate::simulation::types::{Direction, IntersectionId, LinkId, Phase, VehicleId};

/// A directed chain of single-vehicle cells between two intersections
///
/// `from == None` marks a boundary entry (vehicles are injected at cell 0).
/// `to == None` would mark a materialized boundary exit; the grid never builds
/// those — exit is detected structurally instead (see
/// [`Network::is_boundary_exit`]). The last cell is the stop line.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub from: Option<IntersectionId>,
    pub to: Option<IntersectionId>,
    pub dir: Direction,
    /// One slot per cell; `Some(id)` is the occupying vehicle
    pub cells: Vec<Option<VehicleId>>,
}

impl Link {
    fn new(id: LinkId, from: Option<IntersectionId>, to: Option<IntersectionId>, dir: Direction, n_cells: usize) -> Self {
        Self {
            id,
            from,
            to,
            dir,
            cells: vec![None; n_cells],
        }
    }

    /// Index of the stop-line cell
    pub fn stopline(&self) -> usize {
        self.cells.len() - 1
    }

    /// Number of empty cells strictly ahead of `cell` before the next occupied
    /// cell or the end of the link
    pub fn gap_ahead(&self, cell: usize) -> usize {
        let mut gap = 0;
        for c in &self.cells[cell + 1..] {
            if c.is_some() {
                break;
            }
            gap += 1;
        }
        gap
    }

    /// Occupied cells among the last `k` (those nearest the stop line)
    pub fn occupied_in_last(&self, k: usize) -> usize {
        let start = self.cells.len().saturating_sub(k);
        self.cells[start..].iter().filter(|c| c.is_some()).count()
    }

    /// Occupied cells among the first `k` (those nearest the upstream end)
    pub fn occupied_in_first(&self, k: usize) -> usize {
        let end = k.min(self.cells.len());
        self.cells[..end].iter().filter(|c| c.is_some()).count()
    }
}

/// A signalized junction with up to four inbound and four outbound links
///
/// The inbound/outbound tables are indexed by the travel direction of the
/// link, so a southbound link into this intersection sits in
/// `inbound[Direction::South]`.
#[derive(Debug, Clone)]
pub struct Intersection {
    pub id: IntersectionId,
    /// Grid row, reporting metadata only
    pub row: usize,
    /// Grid column, reporting metadata only
    pub col: usize,
    pub light: TrafficLight,
    pub inbound: [Option<LinkId>; 4],
    pub outbound: [Option<LinkId>; 4],
}

impl Intersection {
    pub fn inbound_link(&self, dir: Direction) -> Option<LinkId> {
        self.inbound[dir.index()]
    }

    pub fn outbound_link(&self, dir: Direction) -> Option<LinkId> {
        self.outbound[dir.index()]
    }
}

/// The whole road network: intersection arena, link arena, and the stable
/// ordered list of boundary entry links used for deterministic spawning
pub struct Network {
    grid_size: usize,
    intersections: Vec<Intersection>,
    links: Vec<Link>,
    entry_links: Vec<LinkId>,
}

impl Network {
    /// Build the N×N grid described by the config.
    ///
    /// Every adjacent pair of intersections gets two directed links, one per
    /// direction, and every border intersection gets one boundary entry link
    /// per exposed side. Link ids are contiguous; total count is
    /// 4·N·(N−1) internal + 4·N entries.
    pub fn build(cfg: &Config) -> Self {
        let n = cfg.grid_size;
        let cells = cfg.link_length_cells;

        let mut intersections: Vec<Intersection> = (0..n * n)
            .map(|idx| Intersection {
                id: IntersectionId(idx),
                row: idx / n,
                col: idx % n,
                light: TrafficLight::new(cfg),
                inbound: [None; 4],
                outbound: [None; 4],
            })
            .collect();

        let internal = 4 * n * n.saturating_sub(1);
        let entries = 4 * n;
        let mut links: Vec<Link> = Vec::with_capacity(internal + entries);
        let mut entry_links: Vec<LinkId> = Vec::with_capacity(entries);

        let add_internal = |links: &mut Vec<Link>,
                            intersections: &mut Vec<Intersection>,
                            a: usize,
                            b: usize,
                            dir: Direction| {
            let id = LinkId(links.len());
            links.push(Link::new(
                id,
                Some(IntersectionId(a)),
                Some(IntersectionId(b)),
                dir,
                cells,
            ));
            intersections[a].outbound[dir.index()] = Some(id);
            intersections[b].inbound[dir.index()] = Some(id);
        };

        // Vertical adjacencies: southbound then northbound per pair
        for i in 0..n.saturating_sub(1) {
            for j in 0..n {
                let a = i * n + j;
                let b = (i + 1) * n + j;
                add_internal(&mut links, &mut intersections, a, b, Direction::South);
                add_internal(&mut links, &mut intersections, b, a, Direction::North);
            }
        }

        // Horizontal adjacencies: eastbound then westbound per pair
        for i in 0..n {
            for j in 0..n.saturating_sub(1) {
                let a = i * n + j;
                let b = i * n + (j + 1);
                add_internal(&mut links, &mut intersections, a, b, Direction::East);
                add_internal(&mut links, &mut intersections, b, a, Direction::West);
            }
        }

        let add_entry = |links: &mut Vec<Link>,
                         intersections: &mut Vec<Intersection>,
                         entry_links: &mut Vec<LinkId>,
                         to: usize,
                         dir: Direction| {
            let id = LinkId(links.len());
            links.push(Link::new(id, None, Some(IntersectionId(to)), dir, cells));
            intersections[to].inbound[dir.index()] = Some(id);
            entry_links.push(id);
        };

        // Boundary entries, one per border intersection per exposed side, in a
        // fixed order so spawn iteration is reproducible: north side
        // (southbound), south side (northbound), west side (eastbound), east
        // side (westbound)
        for j in 0..n {
            add_entry(&mut links, &mut intersections, &mut entry_links, j, Direction::South);
        }
        for j in 0..n {
            add_entry(&mut links, &mut intersections, &mut entry_links, (n - 1) * n + j, Direction::North);
        }
        for i in 0..n {
            add_entry(&mut links, &mut intersections, &mut entry_links, i * n, Direction::East);
        }
        for i in 0..n {
            add_entry(&mut links, &mut intersections, &mut entry_links, i * n + (n - 1), Direction::West);
        }

        Self {
            grid_size: n,
            intersections,
            links,
            entry_links,
        }
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn intersection_count(&self) -> usize {
        self.intersections.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn intersection(&self, id: IntersectionId) -> &Intersection {
        &self.intersections[id.0]
    }

    pub fn intersection_mut(&mut self, id: IntersectionId) -> &mut Intersection {
        &mut self.intersections[id.0]
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn link_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id.0]
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Boundary entry links in their stable spawn-iteration order
    pub fn entry_links(&self) -> &[LinkId] {
        &self.entry_links
    }

    /// Whether a vehicle at the end of `link` wanting to leave in
    /// `desired_exit` is at a network boundary.
    ///
    /// True when the link has no destination intersection, or when the
    /// destination has no outgoing link in the desired direction.
    pub fn is_boundary_exit(&self, link: LinkId, desired_exit: Direction) -> bool {
        match self.link(link).to {
            None => true,
            Some(inter) => self.intersection(inter).outbound_link(desired_exit).is_none(),
        }
    }

    /// Queued vehicles approaching `inter` from `dir`: occupied cells among
    /// the `k` cells nearest the stop line of the inbound link
    pub fn queue_in_dir(&self, inter: IntersectionId, dir: Direction, k: usize) -> usize {
        match self.intersection(inter).inbound_link(dir) {
            Some(link) => self.link(link).occupied_in_last(k),
            None => 0,
        }
    }

    /// Pressure for a candidate phase at `inter`: upstream queues on the
    /// phase's green approaches minus downstream occupancy on the matching
    /// outgoing links (straight movement), both over `k` cells
    pub fn pressure_for_phase(&self, inter: IntersectionId, phase: Phase, k: usize) -> i64 {
        let mut upstream = 0_i64;
        let mut downstream = 0_i64;

        for dir in Direction::ALL {
            if !phase.permits(dir) {
                continue;
            }
            upstream += self.queue_in_dir(inter, dir, k) as i64;
            if let Some(out) = self.intersection(inter).outbound_link(dir) {
                downstream += self.link(out).occupied_in_first(k) as i64;
            }
        }

        upstream - downstream
    }

    /// Queue sample for one intersection: occupied cells in the last
    /// `k` cells of every inbound link, summed over the four approaches
    pub fn total_queue_at(&self, inter: IntersectionId, k: usize) -> usize {
        Direction::ALL
            .iter()
            .map(|&dir| self.queue_in_dir(inter, dir, k))
            .sum()
    }
}
