//! # cemkit-algo: Optimisation and statistics for cemkit networks
//!
//! ## Optimisation
//!
//! [`optimize`] builds one linear program covering every snapshot of a
//! [`cemkit_core::Network`]:
//!
//! | Component | Decision variables | Notes |
//! |-----------|-------------------|-------|
//! | Generator | dispatch, capacity if extendable | availability from `p_min_pu`/`p_max_pu` |
//! | Storage unit | dispatch, store, state of charge, power if extendable | energy = `max_hours` × power |
//! | Line | flow, rating if extendable | DC power flow for lines with reactance |
//! | Global constraint | none | CO2 budget over generator fuel use |
//!
//! The objective is annualised capital cost of extendable assets plus
//! weighted operating cost. Results are written back into the network.
//!
//! ## Statistics
//!
//! [`statistics`] summarises a solved network: capex/opex by carrier, total
//! system cost, CO2 emissions, capacities and energy supplied.
//!
//! ## Example
//!
//! ```ignore
//! use cemkit_algo::{optimize, statistics, OptimizeConfig};
//!
//! let outcome = optimize(&mut network, &OptimizeConfig::default())?;
//! println!("{}", outcome.summary());
//! println!("system cost {:.2} bn", statistics::total_system_cost(&network) / 1e9);
//! ```

pub mod lopf;
pub mod statistics;

pub use lopf::{optimize, OptimizeConfig, OptimizeOutcome};
pub use statistics::{CarrierStat, ComponentKind, CostBreakdown};
