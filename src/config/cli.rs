use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "ad-cacher")]
#[command(about = "Keeps a rolling inventory of pre-loaded full-screen ads")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "ad-cacher.toml")]
    pub config: String,

    /// How long to keep the cacher running
    #[arg(long, default_value = "60")]
    pub run_seconds: u64,

    /// Placements to display from, in rotation
    #[arg(long = "display")]
    pub display: Vec<String>,

    /// Seconds between display requests
    #[arg(long, default_value = "5")]
    pub display_every_seconds: u64,

    /// Log as JSON lines instead of compact text
    #[arg(long)]
    pub json_logs: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_seconds)
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_secs(self.display_every_seconds)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("config", &self.config)?;
        validate_positive_number("run_seconds", self.run_seconds, 1)?;
        validate_positive_number("display_every_seconds", self.display_every_seconds, 1)?;
        for placement_id in &self.display {
            validate_non_empty_string("display", placement_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let config = CliConfig::parse_from([
            "ad-cacher",
            "--config",
            "cacher.toml",
            "--display",
            "unit1",
            "--display",
            "open",
            "--run-seconds",
            "10",
        ]);

        assert_eq!(config.config, "cacher.toml");
        assert_eq!(config.display, vec!["unit1", "open"]);
        assert_eq!(config.run_duration(), Duration::from_secs(10));
        assert_eq!(config.display_interval(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_run_seconds_is_invalid() {
        let config = CliConfig::parse_from(["ad-cacher", "--run-seconds", "0"]);
        assert!(config.validate().is_err());
    }
}
