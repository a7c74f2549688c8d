//! Roadview viewer CLI.
//!
//! Connects to a running CARLA server (or to the built-in mock sensors with
//! `--mock`), streams camera/GNSS/IMU telemetry, and shows the camera feed
//! with a HUD overlay. Build with `--features display` for the preview
//! window and `--features carla` for the real simulator.

mod app;
mod screen;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Live camera preview with a telemetry HUD for a CARLA simulator.
#[derive(Parser, Debug)]
#[command(name = "roadview")]
#[command(about = "CARLA client viewer with a telemetry HUD", long_about = None)]
struct Args {
    /// Simulator host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Simulator RPC port
    #[arg(short, long, default_value = "2000")]
    port: u16,

    /// Connection timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Fixed simulation step rate in frames per second
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Background traffic vehicles to try-spawn (0 = ego only)
    #[arg(short, long, default_value = "10")]
    traffic: usize,

    /// Ego vehicle blueprint
    #[arg(long, default_value = "vehicle.tesla.model3")]
    vehicle: String,

    /// Seed for spawn selection and mock sensors (0 = from time)
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Run against built-in mock sensors instead of a simulator
    #[arg(long)]
    mock: bool,

    /// Append per-frame telemetry as JSON lines to this file
    #[arg(long)]
    record: Option<String>,

    /// Stop after this many frames (0 = run until quit)
    #[arg(long, default_value = "0")]
    max_frames: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn resolved_seed(&self) -> u64 {
        if self.seed != 0 {
            return self.seed;
        }
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set tracing subscriber");

    info!("starting client");

    let result = if args.mock {
        app::run_mock(&args)
    } else {
        run_simulator(&args)
    };

    match result {
        Ok(()) => {
            info!("execution finished");
            Ok(())
        }
        Err(e) => {
            // Teardown already ran through the session guards.
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "carla")]
fn run_simulator(args: &Args) -> Result<()> {
    app::run_carla(args)
}

#[cfg(not(feature = "carla"))]
fn run_simulator(_args: &Args) -> Result<()> {
    anyhow::bail!(
        "built without the 'carla' feature; rebuild with --features carla \
         or run with --mock"
    )
}
