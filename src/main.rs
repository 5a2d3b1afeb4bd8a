// for the quick data allocation on memory
#[global_allocator]
static ALLOC: rpmalloc::RpMalloc = rpmalloc::RpMalloc;

mod app;
mod arbitrage;
mod config;
mod error;
mod exchange;
mod models;
mod source;
mod utils;

use std::time::Duration;

use config::Config;
use anyhow::{ bail, Context, Result };

use utils::logging;

const API_TIMEOUT: Duration = Duration::from_secs(5);

// Define command line arguments enum
#[derive(Debug)]
enum Command {
    Run,
    Topology,
}

impl Command {
    fn parse(arg: Option<&str>) -> Result<Self> {
        match arg {
            None | Some("run") => Ok(Command::Run),
            Some("topology") => Ok(Command::Topology),
            Some(other) => bail!("Unknown command '{}'. Usage: triangular-arbitrage [run|topology]", other),
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let command = Command::parse(std::env::args().nth(1).as_deref())?;

    // Load configuration with helpful error messages
    let config = Config::from_env().context(
        "Failed to load configuration from environment. Check the TRI_* variables in your .env file."
    )?;

    // Initialize logging system; the guards flush on drop
    let _log_guards = logging
        ::init_logging(config.log_level, config.debug, &config.log_config)
        .context("Failed to initialize logging system")?;

    match command {
        Command::Run => app::normal_mode::run_normal_mode(config)?,
        Command::Topology => app::topology_mode::run_topology_mode(config)?,
    }

    Ok(())
}
