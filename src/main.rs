use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use signal_sim::simulation::{CsvSink, PolicyMode, SimConfig, SimWorld, TrafficGenerator};

#[derive(Parser)]
#[command(name = "signal_sim")]
#[command(about = "Headless traffic-signal coordination simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "300")]
    ticks: u32,

    /// Time delta per tick, in simulation time units
    #[arg(long, default_value = "1.0")]
    delta: f64,

    /// Signal policy (overrides the config file)
    #[arg(long, value_enum)]
    mode: Option<PolicyMode>,

    /// Seed for reproducible traffic
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append one telemetry row per control cycle to this CSV file
    #[arg(long)]
    telemetry_csv: Option<PathBuf>,

    /// Break equal-demand ties with the network bias
    #[arg(long)]
    bias_tie_break: bool,

    /// Control-cycle period (overrides the config file)
    #[arg(long)]
    update_frequency: Option<f64>,

    /// Coordination-tick period (overrides the config file)
    #[arg(long)]
    coordination_interval: Option<f64>,
}

impl Cli {
    fn load_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.policy_mode = mode;
        }
        if let Some(update_frequency) = self.update_frequency {
            config.update_frequency = update_frequency;
        }
        if let Some(coordination_interval) = self.coordination_interval {
            config.coordination_interval = coordination_interval;
        }
        if self.bias_tie_break {
            config.bias_tie_break = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    run_headless(&cli, config)
}

/// Run the simulation in headless mode (no rendering)
fn run_headless(cli: &Cli, config: SimConfig) -> Result<()> {
    if !cli.delta.is_finite() || cli.delta <= 0.0 {
        bail!("--delta must be a finite, positive number (got {})", cli.delta);
    }

    info!(
        "Running signal simulation: ticks={}, delta={}, policy={:?}",
        cli.ticks, cli.delta, config.policy_mode
    );

    let mut world = SimWorld::create_test_world(config)?;
    if let Some(path) = &cli.telemetry_csv {
        let sink = CsvSink::open(path)
            .with_context(|| format!("Cannot write telemetry to {}", path.display()))?;
        world.set_telemetry_csv(sink);
    }

    let mut traffic = match cli.seed {
        Some(seed) => TrafficGenerator::new_with_seed(seed),
        None => TrafficGenerator::new(),
    };

    println!("Initial state:");
    world.print_summary();
    println!();

    let mut signal_changes = 0;
    for _ in 0..cli.ticks {
        traffic.step(&mut world, cli.delta);
        world.tick(cli.delta);
        signal_changes += world.drain_state_changes().len();
    }

    println!("=== Final State ===");
    world.print_summary();

    info!("=== SIMULATION COMPLETE ===");
    info!("Simulated time: {:.1}", world.time);
    info!("Control cycles: {}", world.control_cycles());
    info!("Coordination ticks: {}", world.coordination_ticks());
    info!("Signal changes: {}", signal_changes);
    info!("Vehicles spawned: {}", traffic.spawned);
    info!("Vehicles departed: {}", traffic.departed);
    Ok(())
}
