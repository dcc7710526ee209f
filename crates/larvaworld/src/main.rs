use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use larvaworld::{SimConfig, Simulation};
use larvaworld_body::BodyBackend;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RON configuration file (default: larvaworld.ron if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long)]
    ticks: Option<u64>,

    /// Number of larvae
    #[arg(long)]
    agents: Option<usize>,

    /// Segments per body
    #[arg(long)]
    segments: Option<usize>,

    /// Segment backend: kinematic or rigid
    #[arg(long)]
    backend: Option<String>,

    /// Random seed for spawning
    #[arg(long)]
    seed: Option<u64>,

    /// Print the parameter registry as RON and exit
    #[arg(long)]
    dump_params: bool,
}

fn parse_backend(name: &str) -> anyhow::Result<BodyBackend> {
    match name.to_lowercase().as_str() {
        "kinematic" => Ok(BodyBackend::Kinematic),
        "rigid" => Ok(BodyBackend::Rigid),
        other => anyhow::bail!("Unknown backend '{}': expected kinematic or rigid", other),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.dump_params {
        let registry = larvaworld_params::build_par_dict().context("Failed to build registry")?;
        println!("{}", registry.describe().context("Failed to describe registry")?);
        return Ok(());
    }

    let mut config = SimConfig::load(args.config.as_deref())?;
    if let Some(ticks) = args.ticks {
        config.simulation.ticks = ticks;
    }
    if let Some(agents) = args.agents {
        config.agents.count = agents;
    }
    if let Some(segments) = args.segments {
        config.body.segment_count = segments;
        config.body.seg_ratio = None;
    }
    if let Some(backend) = &args.backend {
        config.physics.backend = parse_backend(backend)?;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    log::info!("Starting larvaworld");
    let ticks = config.simulation.ticks;
    let mut sim = Simulation::new(config).context("Failed to set up simulation")?;
    sim.run(ticks).context("Simulation failed")?;

    for (id, values) in sim.finalize() {
        let line = values
            .iter()
            .map(|(k, v)| format!("{}={:.6}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        log::info!("{}: {}", id, line);
    }
    Ok(())
}
