//! simnet command line.
//!
//! - `simnet start` parses a topology description, picks a backend, and
//!   brings the simulation up in the given simulation directory
//! - `simnet stop` tears a simulation back down from the snapshot that
//!   `start` left in that directory
//!
//! Log level comes from `RUST_LOG` (default `info`).

mod topo_file;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use simnet_build::SimConfig;
use simnet_topo::Topology;

/// Declarative network topology simulator.
#[derive(Parser, Debug)]
#[command(name = "simnet", about = "Build disposable VM network testbeds")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Build the topology and start its VMs.
    Start {
        /// Topology description file.
        #[arg(long)]
        topo: PathBuf,

        /// Simulation working directory (snapshot, per-node images).
        #[arg(long)]
        sim_dir: PathBuf,

        /// Image depot root.
        #[arg(long)]
        image_depot: PathBuf,

        /// Optional TOML config (hypervisor path, port range, sizing).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Stop the simulation recorded in a simulation directory.
    Stop {
        /// Simulation working directory holding the snapshot.
        #[arg(long)]
        sim_dir: PathBuf,

        /// Image depot root.
        #[arg(long)]
        image_depot: PathBuf,

        /// Optional TOML config (must match the one used at start).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Cmd::Start {
            topo,
            sim_dir,
            image_depot,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let text = fs::read_to_string(&topo)
                .with_context(|| format!("reading topology file {}", topo.display()))?;
            let topology = topo_file::parse(&text)?;
            tracing::info!(
                nodes = topology.node_count(),
                links = topology.links().count(),
                "topology parsed"
            );

            let mut builder = simnet_build::select(topology, &sim_dir, &image_depot, &config)?;
            builder.run()?;
            tracing::info!(sim_dir = %sim_dir.display(), "simulation started");
        }
        Cmd::Stop {
            sim_dir,
            image_depot,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let mut builder =
                simnet_build::select(Topology::new(), &sim_dir, &image_depot, &config)?;
            builder.stop()?;
            tracing::info!(sim_dir = %sim_dir.display(), "simulation stopped");
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimConfig> {
    match path {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config file {}", path.display())),
        None => Ok(SimConfig::default()),
    }
}
