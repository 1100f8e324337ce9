use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use trafficgrid::config::Config;
use trafficgrid::export;
use trafficgrid::simulation::Simulation;

#[derive(Parser)]
#[command(name = "trafficgrid")]
#[command(about = "Cellular-automaton traffic simulation on a signalized grid")]
struct Cli {
    /// Path to the key=value configuration file
    #[arg(long)]
    config: PathBuf,

    /// Directory where result files are written
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = Config::load(&cli.config)?;

    let mut sim = Simulation::new(&cfg);
    let summary = sim.run();

    export::write_results(&cfg, &sim, &summary, &cli.out)?;

    println!(
        "mean travel time: {:.2}s, p95: {:.2}s, throughput: {:.4} veh/s",
        summary.mean_travel_time_s, summary.p95_travel_time_s, summary.throughput_veh_per_s
    );
    println!(
        "spawned: {}, exited: {}, blocked entries: {}",
        summary.spawned, summary.exited, summary.blocked_entries
    );

    Ok(())
}
