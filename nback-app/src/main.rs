mod sim;

use clap::Parser;
use sim::{SimOptions, Simulation};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = SimOptions::parse();
    let sim = Simulation::new(options)?;
    sim.run()?;

    Ok(())
}
