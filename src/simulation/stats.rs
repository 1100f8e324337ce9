//! Streaming statistics aggregation
//!
//! Exit events and per-tick queue samples stream in during the run; memory
//! stays bounded throughout. The travel-time list has a hard capacity and
//! drops entries beyond it (bounded loss, not a ring buffer), while the scalar
//! counters and queue sums keep exact totals regardless.

use crate::simulation::grid::Network;
use crate::simulation::types::{IntersectionId, VehicleId, QUEUE_WINDOW_CELLS};

/// Default cap on retained travel-time samples
pub const TRAVEL_TIME_CAPACITY: usize = 100_000;

/// One completed trip, kept only when trajectory output is requested
#[derive(Debug, Clone, Copy)]
pub struct TripRecord {
    pub vehicle: VehicleId,
    pub entry_time: f64,
    pub exit_time: f64,
}

/// Streaming accumulator for one run
pub struct Stats {
    pub spawned: u64,
    pub exited: u64,
    pub blocked_entries: u64,

    travel_times: Vec<f64>,
    sample_capacity: usize,

    trips: Option<Vec<TripRecord>>,

    queue_sum: Vec<f64>,
    queue_max: Vec<f64>,
    queue_samples: u64,
}

/// Final scalar metrics computed from the accumulated samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean_travel_time_s: f64,
    pub p95_travel_time_s: f64,
    pub throughput_veh_per_s: f64,
    pub avg_queue_veh: f64,
    pub max_queue_veh: f64,
    pub spawned: u64,
    pub exited: u64,
    pub blocked_entries: u64,
}

/// Per-intersection heatmap row
#[derive(Debug, Clone, Copy)]
pub struct HeatmapCell {
    pub intersection_id: usize,
    pub row: usize,
    pub col: usize,
    pub avg_queue: f64,
    pub max_queue: f64,
}

impl Stats {
    pub fn new(n_intersections: usize, record_trips: bool) -> Self {
        Self::with_sample_capacity(n_intersections, record_trips, TRAVEL_TIME_CAPACITY)
    }

    pub fn with_sample_capacity(
        n_intersections: usize,
        record_trips: bool,
        sample_capacity: usize,
    ) -> Self {
        Self {
            spawned: 0,
            exited: 0,
            blocked_entries: 0,
            travel_times: Vec::new(),
            sample_capacity,
            trips: record_trips.then(Vec::new),
            queue_sum: vec![0.0; n_intersections],
            queue_max: vec![0.0; n_intersections],
            queue_samples: 0,
        }
    }

    /// Record a post-warm-up exit.
    ///
    /// The exited counter always increments so throughput stays exact; the
    /// travel-time sample (and trip record) is dropped once the buffer is at
    /// capacity.
    pub fn on_exit(&mut self, vehicle: VehicleId, entry_time: f64, exit_time: f64) {
        self.exited += 1;
        if self.travel_times.len() >= self.sample_capacity {
            return;
        }
        self.travel_times.push(exit_time - entry_time);
        if let Some(trips) = &mut self.trips {
            trips.push(TripRecord {
                vehicle,
                entry_time,
                exit_time,
            });
        }
    }

    /// Fold one queue snapshot per intersection into the running sums and
    /// maxima, using the same last-5-cells definition as the actuated
    /// controller, summed over the four approaches
    pub fn collect_queues(&mut self, net: &Network) {
        for idx in 0..net.intersection_count() {
            let q = net.total_queue_at(IntersectionId(idx), QUEUE_WINDOW_CELLS) as f64;
            self.queue_sum[idx] += q;
            if q > self.queue_max[idx] {
                self.queue_max[idx] = q;
            }
        }
        self.queue_samples += 1;
    }

    pub fn retained_samples(&self) -> usize {
        self.travel_times.len()
    }

    pub fn trips(&self) -> Option<&[TripRecord]> {
        self.trips.as_deref()
    }

    /// Compute the final metrics. `measured_time_s` is the post-warm-up
    /// window; a non-positive window yields zero throughput.
    pub fn finalize(&mut self, measured_time_s: f64) -> Summary {
        let (mean, p95) = if self.travel_times.is_empty() {
            (0.0, 0.0)
        } else {
            let sum: f64 = self.travel_times.iter().sum();
            let mean = sum / self.travel_times.len() as f64;
            (mean, percentile_95(&mut self.travel_times))
        };

        let throughput = if measured_time_s > 0.0 {
            self.exited as f64 / measured_time_s
        } else {
            0.0
        };

        let mut avg_queue = 0.0;
        let mut max_queue = 0.0;
        if self.queue_samples > 0 {
            for idx in 0..self.queue_sum.len() {
                avg_queue += self.queue_sum[idx] / self.queue_samples as f64;
                if self.queue_max[idx] > max_queue {
                    max_queue = self.queue_max[idx];
                }
            }
            avg_queue /= self.queue_sum.len() as f64;
        }

        Summary {
            mean_travel_time_s: mean,
            p95_travel_time_s: p95,
            throughput_veh_per_s: throughput,
            avg_queue_veh: avg_queue,
            max_queue_veh: max_queue,
            spawned: self.spawned,
            exited: self.exited,
            blocked_entries: self.blocked_entries,
        }
    }

    /// Per-intersection averages and maxima for the heatmap export
    pub fn heatmap(&self, net: &Network) -> Vec<HeatmapCell> {
        net.intersections()
            .iter()
            .map(|inter| {
                let idx = inter.id.0;
                let avg = if self.queue_samples > 0 {
                    self.queue_sum[idx] / self.queue_samples as f64
                } else {
                    0.0
                };
                HeatmapCell {
                    intersection_id: idx,
                    row: inter.row,
                    col: inter.col,
                    avg_queue: avg,
                    max_queue: self.queue_max[idx],
                }
            })
            .collect()
    }
}

/// p95 by ascending sort; index = floor(0.95 × (n−1))
fn percentile_95(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = (0.95 * (samples.len() - 1) as f64) as usize;
    samples[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p95_index_formula() {
        // 20 samples 1..20 -> index floor(0.95 * 19) = 18 -> value 19
        let mut samples: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        assert_eq!(percentile_95(&mut samples), 19.0);
    }

    #[test]
    fn p95_single_sample() {
        let mut samples = vec![7.5];
        assert_eq!(percentile_95(&mut samples), 7.5);
    }

    #[test]
    fn sample_buffer_is_bounded_but_counters_stay_exact() {
        let mut stats = Stats::with_sample_capacity(1, false, 2);
        stats.on_exit(VehicleId(0), 0.0, 10.0);
        stats.on_exit(VehicleId(1), 0.0, 20.0);
        stats.on_exit(VehicleId(2), 0.0, 30.0);

        assert_eq!(stats.retained_samples(), 2);
        let summary = stats.finalize(10.0);
        assert_eq!(summary.exited, 3);
        assert_eq!(summary.throughput_veh_per_s, 0.3);
        // mean over retained samples only
        assert_eq!(summary.mean_travel_time_s, 15.0);
    }

    #[test]
    fn empty_window_yields_zero_throughput() {
        let mut stats = Stats::new(1, false);
        stats.on_exit(VehicleId(0), 0.0, 5.0);
        let summary = stats.finalize(0.0);
        assert_eq!(summary.throughput_veh_per_s, 0.0);
    }
}
