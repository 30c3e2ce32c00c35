use crate::config::settings::Settings;
use crate::domain::model::Tier;
use crate::utils::error::{DrawError, Result as DrawResult};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "lucky-draw")]
#[command(about = "Draw winning numbers across prize tiers")]
pub struct CliConfig {
    /// Settings file (defaults to ./lucky-draw.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted configuration and ledger
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show tiers, winners and the current tier
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start a draw, roll for a moment and stop on a winner
    Draw {
        /// Roll duration in milliseconds
        #[arg(long)]
        roll_ms: Option<u64>,

        /// Fixed RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Draw for this tier (1-based) instead of the first open one
        #[arg(long)]
        tier: Option<usize>,
    },

    /// Edit title, number range or tiers
    Configure {
        #[arg(long)]
        title: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        min: Option<i64>,

        #[arg(long, allow_negative_numbers = true)]
        max: Option<i64>,

        /// Replaces the tier list; repeat as NAME:CAPACITY
        #[arg(long = "tier", value_parser = parse_tier)]
        tiers: Vec<Tier>,

        /// Discard recorded winners without asking if the edit requires it
        #[arg(long)]
        yes: bool,
    },

    /// Set the headline (at most 10 characters)
    Title { text: String },

    /// Discard all winners and start over
    Reset {
        #[arg(long)]
        yes: bool,
    },

    /// Restore the default configuration and discard all winners
    Defaults {
        #[arg(long)]
        yes: bool,
    },

    /// Write the winners to results_<date>.csv
    Export {
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },
}

impl CliConfig {
    /// Command line wins over the settings file.
    pub fn data_dir<'a>(&'a self, settings: &'a Settings) -> &'a str {
        self.data_dir.as_deref().unwrap_or_else(|| settings.data_dir())
    }
}

/// Converts a 1-based tier number from the command line to an index.
pub fn tier_index(tier: usize) -> DrawResult<usize> {
    tier.checked_sub(1).ok_or_else(|| DrawError::OperationInvalid {
        reason: "tiers are numbered from 1".to_string(),
    })
}

/// Parses `NAME:CAPACITY`; the name may itself contain colons.
pub fn parse_tier(value: &str) -> Result<Tier, String> {
    let (name, capacity) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:CAPACITY, got '{}'", value))?;
    let capacity: u32 = capacity
        .trim()
        .parse()
        .map_err(|e| format!("invalid capacity '{}': {}", capacity, e))?;
    Ok(Tier::new(name.trim(), capacity))
}
