use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Argus: closed-loop exercise of the pose-measurement update.
///
/// This struct defines the command-line arguments of the simulator binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/00_circle.toml")]
    pub scenario: PathBuf,

    /// Override the scenario's random seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the resolved scenario as TOML and exit without running it.
    #[arg(long, default_value_t = false)]
    pub print_scenario: bool,

    /// Print the end-of-run report as TOML instead of plain text.
    #[arg(long, default_value_t = false)]
    pub toml_report: bool,

    /// Raise the log level (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The default tracing filter implied by `--verbose`.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_tutorial_scenario() {
        let cli = Cli::parse_from(["argus_sim"]);
        assert_eq!(cli.scenario, PathBuf::from("assets/scenarios/00_circle.toml"));
        assert_eq!(cli.log_level(), "info");
        assert!(cli.seed.is_none());
    }

    #[test]
    fn verbosity_counts_flags() {
        let cli = Cli::parse_from(["argus_sim", "-vv", "--seed", "7"]);
        assert_eq!(cli.log_level(), "trace");
        assert_eq!(cli.seed, Some(7));
    }
}
