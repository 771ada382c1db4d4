//! daisy: offline tools for daisy-chain mixer racks
//!
//! Racks are JSON patch files (see `patches/`). This binary can render a rack
//! to a WAV file, benchmark it, run the master's spawn action on it, or list
//! the available module models.
//!
//! Usage:
//!   daisy render patches/two_voices.json --seconds 4 --out mix.wav
//!   daisy bench patches/aux_split.json --frames 480000
//!   daisy spawn patches/two_voices.json --master 4 --strips 2 --vu
//!   daisy models --json

mod bench;
mod render;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use daisy_core::chain::SpawnRequest;
use daisy_core::{ModuleRegistry, Rack, RackPatch};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Frames run before spawning so the master has seen its chain
const SPAWN_SETTLE_FRAMES: u64 = 512;

/// Offline renderer and benchmark harness for daisy-chain mixer racks
#[derive(Parser)]
#[command(name = "daisy")]
#[command(about = "Render, benchmark and edit daisy-chain mixer racks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a rack to a stereo 32-bit float WAV file
    Render {
        /// Path to the rack patch JSON file
        patch: PathBuf,

        /// Length of the render
        #[arg(short, long, default_value_t = 2.0)]
        seconds: f32,

        /// Output WAV file
        #[arg(short, long, default_value = "out.wav")]
        out: PathBuf,

        /// Patch id of the module to record (default: the first master)
        #[arg(short, long)]
        module: Option<usize>,
    },

    /// Measure per-frame cost of a rack
    Bench {
        /// Path to the rack patch JSON file
        patch: PathBuf,

        /// Number of frames to measure
        #[arg(short, long, default_value_t = bench::DEFAULT_FRAMES)]
        frames: u64,

        /// Warmup frames before measurement
        #[arg(short, long, default_value_t = 48000)]
        warmup: u64,
    },

    /// Run the master's "spawn channel strips" action and save the result
    Spawn {
        /// Path to the rack patch JSON file
        patch: PathBuf,

        /// Patch id of the master module
        #[arg(short, long)]
        master: usize,

        /// Number of channel strips to insert
        #[arg(short, long, default_value_t = 4)]
        strips: usize,

        /// Follow each strip with a VU meter
        #[arg(long)]
        vu: bool,

        /// Also insert both aux send groups before the master
        #[arg(long)]
        aux_sends: bool,

        /// Where to write the new patch (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List the available module models
    Models {
        /// Print full schemas as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let registry = Arc::new(ModuleRegistry::builtin());

    match cli.command {
        Commands::Render {
            patch,
            seconds,
            out,
            module,
        } => {
            let patch = load_patch(&patch)?;
            let target = match module {
                Some(id) => rack_id(&patch, id)?,
                None => first_master(&patch)?,
            };
            let rack = Rack::from_patch(registry, &patch)?;
            render::render(rack, target, seconds, &out)?;
        }
        Commands::Bench {
            patch,
            frames,
            warmup,
        } => {
            let loaded = load_patch(&patch)?;
            let rack = Rack::from_patch(registry, &loaded)?;
            bench::run_benchmark(rack, &patch, frames, warmup);
        }
        Commands::Spawn {
            patch,
            master,
            strips,
            vu,
            aux_sends,
            out,
        } => {
            let patch = load_patch(&patch)?;
            let master = rack_id(&patch, master)?;
            let mut rack = Rack::from_patch(registry, &patch)?;
            for _ in 0..SPAWN_SETTLE_FRAMES {
                rack.process_frame();
            }
            let request = SpawnRequest {
                strips,
                with_vu: vu,
                aux_sends,
            };
            let placed = rack.spawn(master, &request)?;
            let json = serde_json::to_string_pretty(&rack.to_patch())?;
            match out {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    eprintln!(
                        "{} {} modules, saved to {}",
                        "spawned".green(),
                        placed.len(),
                        path.display()
                    );
                }
                None => println!("{}", json),
            }
        }
        Commands::Models { json } => list_models(&registry, json)?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    #[cfg(feature = "profile")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());

    registry.init();
}

fn load_patch(path: &Path) -> Result<RackPatch> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

/// Rack ids are assigned in patch order.
fn rack_id(patch: &RackPatch, patch_id: usize) -> Result<usize> {
    match patch.modules.iter().position(|m| m.id == patch_id) {
        Some(index) => Ok(index),
        None => bail!("patch has no module with id {}", patch_id),
    }
}

fn first_master(patch: &RackPatch) -> Result<usize> {
    match patch.modules.iter().position(|m| m.model == "master") {
        Some(index) => Ok(index),
        None => bail!("patch has no master; pick a module with --module"),
    }
}

fn list_models(registry: &ModuleRegistry, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&registry.schemas())?);
        return Ok(());
    }

    println!(
        "  {:16} {:>4} {:16} {}",
        "Model".bold(),
        "HP".bold(),
        "Chain".bold(),
        "Ports".bold()
    );
    println!("  {:-<16} {:-<4} {:-<16} {:-<30}", "", "", "", "");
    for schema in registry.schemas() {
        let chain = schema
            .participant
            .map(|kind| format!("{:?}", kind))
            .unwrap_or_else(|| "-".to_string());
        let inputs: Vec<_> = schema.inputs.iter().map(|p| p.name.as_str()).collect();
        let outputs: Vec<_> = schema.outputs.iter().map(|p| p.name.as_str()).collect();
        println!(
            "  {:16} {:>4} {:16} {} {} {}",
            schema.name.cyan(),
            schema.width_hp,
            chain,
            inputs.join(" "),
            "→".dimmed(),
            outputs.join(" ")
        );
    }
    Ok(())
}
