//! Tidal simulator binary
//!
//! Usage: `tidal-sim [scenario.json]`

use std::env;

use tidal_sim::{Simulation, SimulationConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tidal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match env::args().nth(1) {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };

    println!("Tidal relay simulation");
    println!("======================");
    println!(
        "  Nodes: {}  Steps: {}  Scheme: {:?}  Copies: {}",
        config.nodes, config.steps, config.router.scheme, config.router.initial_copies
    );

    let mut sim = Simulation::new(config)?;
    let stats = sim.run()?;

    println!();
    println!("Results:");
    println!("  Created:    {}", stats.created);
    println!("  Delivered:  {}", stats.delivered);
    println!("  Transfers:  {} started, {} completed, {} aborted", stats.started, stats.relayed, stats.aborted);
    println!("  Expired:    {}", stats.expired);
    println!("  Dropped:    {}", stats.dropped);
    println!("  Delivery ratio: {:.3}", stats.delivery_ratio());
    match stats.overhead_ratio() {
        Some(overhead) => println!("  Overhead ratio: {:.3}", overhead),
        None => println!("  Overhead ratio: n/a"),
    }
    match stats.gate_opened_at {
        Some(step) => println!("  Relaying enabled at step {}", step),
        None => println!("  Relaying never enabled"),
    }

    Ok(())
}
