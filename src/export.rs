//! CSV export of run results
//!
//! The simulation core produces the numbers; this layer only turns them into
//! delimited text. Output files land in the chosen directory, which is created
//! if absent. Any write failure is fatal and surfaces as a run failure.

use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::simulation::{HeatmapCell, Simulation, Summary};

/// Write all requested result files for a finished run
pub fn write_results(cfg: &Config, sim: &Simulation, summary: &Summary, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

    let metrics_path = out_dir.join("metrics.csv");
    let file = fs::File::create(&metrics_path)
        .with_context(|| format!("failed to create {}", metrics_path.display()))?;
    write_metrics(summary, file)?;
    info!("wrote {}", metrics_path.display());

    if cfg.save_queue_snapshots {
        let heatmap_path = out_dir.join("queue_heatmap.csv");
        let file = fs::File::create(&heatmap_path)
            .with_context(|| format!("failed to create {}", heatmap_path.display()))?;
        write_heatmap(&sim.stats().heatmap(sim.network()), file)?;
        info!("wrote {}", heatmap_path.display());
    }

    if cfg.save_vehicle_trajectories {
        if let Some(trips) = sim.stats().trips() {
            let trips_path = out_dir.join("trips.csv");
            let file = fs::File::create(&trips_path)
                .with_context(|| format!("failed to create {}", trips_path.display()))?;
            let mut w = csv::Writer::from_writer(file);
            w.write_record(["vehicle_slot", "entry_time_s", "exit_time_s", "travel_time_s"])?;
            for trip in trips {
                w.write_record([
                    trip.vehicle.0.to_string(),
                    format!("{:.6}", trip.entry_time),
                    format!("{:.6}", trip.exit_time),
                    format!("{:.6}", trip.exit_time - trip.entry_time),
                ])?;
            }
            w.flush()?;
            info!("wrote {}", trips_path.display());
        }
    }

    Ok(())
}

/// Single-row metrics summary
pub fn write_metrics<W: Write>(summary: &Summary, writer: W) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record([
        "mean_travel_time_s",
        "p95_travel_time_s",
        "throughput_veh_per_s",
        "avg_queue_veh",
        "max_queue_veh",
        "spawned",
        "exited",
        "blocked_entries",
    ])?;
    w.write_record([
        format!("{:.6}", summary.mean_travel_time_s),
        format!("{:.6}", summary.p95_travel_time_s),
        format!("{:.6}", summary.throughput_veh_per_s),
        format!("{:.6}", summary.avg_queue_veh),
        format!("{:.6}", summary.max_queue_veh),
        summary.spawned.to_string(),
        summary.exited.to_string(),
        summary.blocked_entries.to_string(),
    ])?;
    w.flush()?;
    Ok(())
}

/// Per-intersection queue heatmap, one row per intersection
pub fn write_heatmap<W: Write>(cells: &[HeatmapCell], writer: W) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(["intersection_id", "i", "j", "avg_queue", "max_queue"])?;
    for cell in cells {
        w.write_record([
            cell.intersection_id.to_string(),
            cell.row.to_string(),
            cell.col.to_string(),
            format!("{:.6}", cell.avg_queue),
            format!("{:.6}", cell.max_queue),
        ])?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_csv_shape() {
        let summary = Summary {
            mean_travel_time_s: 12.5,
            p95_travel_time_s: 30.0,
            throughput_veh_per_s: 0.25,
            avg_queue_veh: 1.5,
            max_queue_veh: 8.0,
            spawned: 100,
            exited: 90,
            blocked_entries: 3,
        };

        let mut buf = Vec::new();
        write_metrics(&summary, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "mean_travel_time_s,p95_travel_time_s,throughput_veh_per_s,avg_queue_veh,max_queue_veh,spawned,exited,blocked_entries"
        );
        assert_eq!(
            lines.next().unwrap(),
            "12.500000,30.000000,0.250000,1.500000,8.000000,100,90,3"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn heatmap_csv_shape() {
        let cells = vec![
            HeatmapCell {
                intersection_id: 0,
                row: 0,
                col: 0,
                avg_queue: 0.5,
                max_queue: 3.0,
            },
            HeatmapCell {
                intersection_id: 1,
                row: 0,
                col: 1,
                avg_queue: 0.0,
                max_queue: 0.0,
            },
        ];

        let mut buf = Vec::new();
        write_heatmap(&cells, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "intersection_id,i,j,avg_queue,max_queue");
        assert_eq!(lines[1], "0,0,0,0.500000,3.000000");
        assert_eq!(lines[2], "1,0,1,0.000000,0.000000");
        assert_eq!(lines.len(), 3);
    }
}
