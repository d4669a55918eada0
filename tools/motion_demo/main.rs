//! End-to-end demo against the scripted simulator.
//!
//! Wires the composition root together the way a deployment would: load
//! the endpoint from configuration exactly once, build a controller, then
//! drive a delay line move, a position read and a shutter close. The
//! remote side is always the in-process simulator; pass `--config` to
//! exercise the configuration path with a real file.

use clap::Parser;
use nott_control::sim::SimServer;
use nott_control::{ControlConfig, NottController, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "motion_demo", about = "Drive a simulated NOTT delay line and shutter")]
struct Args {
    /// TOML file providing opcua_address; simulator endpoint when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Motor to move.
    #[arg(long, default_value = "DL_Servo_1")]
    motor: String,

    /// Relative offset for the move.
    #[arg(long, default_value_t = 0.5)]
    offset: f64,

    /// Speed for the move.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Shutter to close at the end.
    #[arg(long, default_value = "1")]
    shutter: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let endpoint = match &args.config {
        Some(path) => ControlConfig::load(path)?.endpoint(),
        None => SimServer::endpoint(),
    };

    let sim = SimServer::new();
    sim.script_statuses([
        ("MOVING", "OPERATIONAL"),
        ("MOVING", "OPERATIONAL"),
        ("STANDING", "OPERATIONAL"),
    ]);
    sim.set_position(0.0125);

    info!(endpoint = %endpoint, "driving the in-process simulator");
    let controller = NottController::new(Arc::new(sim.connector()), endpoint);

    let line = controller.delay_line(&args.motor)?;
    line.move_relative(args.offset, args.speed).await?;
    println!("move_relative({}, {}): done", args.offset, args.speed);
    println!("position: {:.3}", line.position().await?);

    controller.shutter(&args.shutter)?.close().await?;
    println!("shutter {} close: done", args.shutter);

    info!(
        polls = sim.poll_count(),
        sessions = sim.connect_count(),
        released = sim.disconnect_count(),
        "demo finished"
    );
    Ok(())
}
