//! Optogen command-line interface.
//!
//! Run stimulation scenarios from TOML configuration files:
//! ```sh
//! optogen-cli run scenario.toml
//! optogen-cli validate scenario.toml
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "optogen-cli")]
#[command(about = "Optogen: light/photoreceptor coupling simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario from a TOML configuration file.
    Run {
        /// Path to the scenario configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a scenario file without running it.
    Validate {
        /// Path to the scenario configuration file.
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            let scenario = config::load_config(&config)?;
            println!("Scenario: {}", config.display());

            let (mut sim, _lights) = runner::build_simulation(&scenario)?;
            let result = runner::run_scenario(&mut sim, &scenario)?;
            println!(
                "Ran {} steps over {} coupling(s).",
                result.times.len(),
                result.labels.len()
            );

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&scenario.output.directory));
            if scenario.output.save_currents {
                let csv_path = out_dir.join("currents.csv");
                runner::write_currents_csv(&result, &csv_path)?;
                println!("Wrote {}", csv_path.display());
            }
            if scenario.output.save_json {
                let json_path = out_dir.join("couplings.json");
                runner::write_coupling_json(&sim, &json_path)?;
                println!("Wrote {}", json_path.display());
            }
            Ok(())
        }
        Commands::Validate { config } => {
            let scenario = config::load_config(&config)?;
            // Building the simulation exercises registration end to end.
            let (sim, lights) = runner::build_simulation(&scenario)?;
            println!(
                "Scenario is valid: {} ({} light(s), {} connection(s))",
                config.display(),
                lights.len(),
                sim.registry().connections().len()
            );
            Ok(())
        }
    }
}
