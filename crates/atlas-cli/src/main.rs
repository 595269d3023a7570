use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use atlas_core::{Config, ShutdownSignal};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Diablo II: Resurrected map and unit reader")]
struct Args {
    #[arg(short, long, default_value = "atlas.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the game and report every published snapshot
    Watch {
        /// Print one JSON response per line instead of a status line
        #[arg(long)]
        json: bool,
        /// Include the collision grid in every JSON response
        #[arg(long)]
        force_map: bool,
    },
    /// Run a single read cycle and print the snapshot as JSON
    Snapshot {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Dump raw bytes from the game process
    Hexdump {
        /// Address (hex, with or without 0x)
        #[arg(value_parser = commands::hex_utils::parse_hex_address)]
        address: u64,
        #[arg(short, long, default_value_t = 256)]
        size: usize,
        /// Interpret the address as an offset from the module base
        #[arg(long)]
        relative: bool,
        /// Hide the ASCII column
        #[arg(long)]
        no_ascii: bool,
    },
    /// Write the built-in layout set as JSON
    Layouts {
        #[arg(default_value = "layouts.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("atlas=info".parse()?))
        .init();

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(c) => {
            info!("Loaded config from {:?}", args.config);
            c
        }
        Err(e) if e.is_not_found() => Config::default(),
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        }
    };

    match args.command {
        Command::Watch { json, force_map } => {
            let shutdown = Arc::new(ShutdownSignal::new());
            let shutdown_ctrlc = Arc::clone(&shutdown);
            ctrlc::set_handler(move || {
                info!("Received shutdown signal, stopping...");
                shutdown_ctrlc.trigger();
            })?;
            commands::watch::run(&config, shutdown, json, force_map)
        }
        Command::Snapshot { output } => commands::snapshot::run(&config, output.as_deref()),
        Command::Hexdump {
            address,
            size,
            relative,
            no_ascii,
        } => commands::hexdump::run(&config, address, size, relative, !no_ascii),
        Command::Layouts { output } => commands::layouts::run(&output),
    }
}
