//! # cemkit-io: Input data for capacity-expansion studies
//!
//! - [`source`]: fetch tables from a URL or read them from disk
//! - [`costs`]: technology cost table with annualised capital and marginal costs
//! - [`timeseries`]: load and availability profiles, resampling
//! - [`scenario`]: TOML scenario file and network assembly
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cemkit_io::{CostTable, ScenarioConfig, TimeSeries};
//!
//! fn main() -> anyhow::Result<()> {
//!     let scenario = ScenarioConfig::default();
//!     let costs = CostTable::load(&scenario.costs_source())?;
//!     let ts = scenario.prepare_timeseries(&TimeSeries::load(&scenario.timeseries)?)?;
//!     let network = scenario.build_network(&costs, &ts)?;
//!     println!("{}", network.stats());
//!     Ok(())
//! }
//! ```

pub mod costs;
pub mod scenario;
pub mod source;
pub mod timeseries;

pub use costs::{CostLookupError, CostTable, TechnologyCosts};
pub use scenario::{GeneratorOption, ScenarioConfig, StorageOption};
pub use source::DataSource;
pub use timeseries::TimeSeries;
