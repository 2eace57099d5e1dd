// argus_sim/src/main.rs

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use argus_sim::cli::Cli;
use argus_sim::prelude::*;

fn main() -> anyhow::Result<()> {
    // 1. Parse command-line arguments.
    let args = Cli::parse();

    // 2. Logging: RUST_LOG wins over the --verbose default.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    // 3. Load the scenario, with the seed override applied.
    let mut scenario = ScenarioConfig::load(&args.scenario)
        .with_context(|| format!("loading scenario {}", args.scenario.display()))?;
    if let Some(seed) = args.seed {
        scenario.simulation.seed = Some(seed);
    }

    if args.print_scenario {
        println!("{}", scenario.to_toml_string()?);
        return Ok(());
    }

    // 4. Run it.
    let report = Simulation::new(scenario)?.run()?;

    if args.toml_report {
        println!("{}", report.to_toml_string()?);
    } else {
        println!("{report}");
    }
    Ok(())
}
