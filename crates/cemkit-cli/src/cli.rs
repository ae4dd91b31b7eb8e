use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Electricity market and capacity expansion models", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Plain,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch the two-bus South Africa / Mozambique market
    Market {
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Capacity expansion: generators, then storage, then a CO2 cap
    Cem(CemArgs),
    /// Print the processed technology cost table
    Costs {
        /// Projection year of the published table
        #[arg(long, default_value_t = 2030)]
        year: u16,
        /// Cost table URL or path (overrides --year)
        #[arg(long, value_hint = ValueHint::AnyPath)]
        costs: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
        /// Technologies to show (default: all)
        technologies: Vec<String>,
    },
    /// Annuity factor for annualising an investment
    Annuity {
        /// Discount rate, e.g. 0.07
        #[arg(long)]
        rate: f64,
        /// Economic lifetime in years
        #[arg(long)]
        lifetime: f64,
    },
}

#[derive(clap::Args, Debug)]
pub struct CemArgs {
    /// Scenario TOML file; command-line flags override its values
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Projection year of the cost table
    #[arg(long)]
    pub year: Option<u16>,
    /// Cost table URL or path
    #[arg(long, value_hint = ValueHint::AnyPath)]
    pub costs: Option<String>,
    /// Time-series URL or path
    #[arg(long, value_hint = ValueHint::AnyPath)]
    pub timeseries: Option<String>,
    /// Snapshot resolution in hours
    #[arg(long)]
    pub resolution: Option<u32>,
    /// CO2 cap for the last stage in tonnes
    #[arg(long)]
    pub co2_limit: Option<f64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,
}
