//! Capacity-expansion scenario: configuration file and network assembly.
//!
//! A scenario names the cost and time-series inputs, the candidate
//! technologies and the storage options. Every field is optional; the
//! defaults describe a single-bus system with wind, solar and open-cycle gas
//! turbines, plus battery and underground hydrogen storage.
//!
//! ```toml
//! year = 2030
//! resolution_hours = 4
//! co2_limit = 0.0
//!
//! [[generators]]
//! name = "onwind"
//! profile = "onwind"
//! color = "dodgerblue"
//!
//! [[storage]]
//! name = "battery storage"
//! max_hours = 6
//! power_cost = ["battery inverter"]
//! energy_cost = ["battery storage"]
//! efficiency_store = "battery inverter"
//! efficiency_dispatch = "battery inverter"
//! ```

use crate::costs::{costs_url, CostTable, CO2_INTENSITY, EFFICIENCY};
use crate::source::DataSource;
use crate::timeseries::{TimeSeries, DEFAULT_TIMESERIES_URL};
use anyhow::{bail, Context, Result};
use cemkit_core::{
    Bus, Carrier, CemError, CemResult, Generator, GlobalConstraint, Load, Network, Sense,
    StorageUnit,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Name of the emissions cap added by [`ScenarioConfig::add_co2_limit`]
pub const CO2_LIMIT_NAME: &str = "CO2Limit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Projection year of the cost table
    #[serde(default = "default_year")]
    pub year: u16,
    /// Cost table; defaults to the published table for `year`
    #[serde(default)]
    pub costs: Option<DataSource>,
    #[serde(default = "default_timeseries")]
    pub timeseries: DataSource,
    /// Keep one snapshot every this many hours
    #[serde(default = "default_resolution")]
    pub resolution_hours: u32,
    #[serde(default = "default_load_column")]
    pub load_column: String,
    /// Multiplier turning the load column into MW
    #[serde(default = "default_load_scale")]
    pub load_scale: f64,
    #[serde(default = "default_bus")]
    pub bus: String,
    /// Emissions cap in tonnes CO2 for the final stage
    #[serde(default)]
    pub co2_limit: f64,
    #[serde(default = "default_generators")]
    pub generators: Vec<GeneratorOption>,
    #[serde(default = "default_storage")]
    pub storage: Vec<StorageOption>,
}

/// Extendable generator whose costs come from the technology of the same name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOption {
    pub name: String,
    /// Time-series column with the per-unit availability
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Extendable storage assembled from several cost-table technologies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageOption {
    pub name: String,
    pub max_hours: f64,
    /// Technologies priced per MW of power
    #[serde(default)]
    pub power_cost: Vec<String>,
    /// Technologies priced per MWh of energy capacity
    #[serde(default)]
    pub energy_cost: Vec<String>,
    pub efficiency_store: Option<String>,
    pub efficiency_dispatch: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_year() -> u16 {
    2030
}

fn default_timeseries() -> DataSource {
    DataSource::url(DEFAULT_TIMESERIES_URL)
}

fn default_resolution() -> u32 {
    4
}

fn default_load_column() -> String {
    "load".to_string()
}

fn default_load_scale() -> f64 {
    // GW to MW
    1e3
}

fn default_bus() -> String {
    "electricity".to_string()
}

fn generator_option(name: &str, profile: Option<&str>, color: &str) -> GeneratorOption {
    GeneratorOption {
        name: name.to_string(),
        profile: profile.map(str::to_string),
        color: Some(color.to_string()),
    }
}

fn default_generators() -> Vec<GeneratorOption> {
    vec![
        generator_option("OCGT", None, "indianred"),
        generator_option("onwind", Some("onwind"), "dodgerblue"),
        generator_option("offwind", Some("offwind"), "aquamarine"),
        generator_option("solar", Some("solar"), "gold"),
    ]
}

fn default_storage() -> Vec<StorageOption> {
    vec![
        StorageOption {
            name: "battery storage".to_string(),
            max_hours: 6.0,
            power_cost: vec!["battery inverter".to_string()],
            energy_cost: vec!["battery storage".to_string()],
            efficiency_store: Some("battery inverter".to_string()),
            efficiency_dispatch: Some("battery inverter".to_string()),
            color: Some("yellowgreen".to_string()),
        },
        StorageOption {
            name: "hydrogen storage underground".to_string(),
            max_hours: 168.0,
            power_cost: vec!["electrolysis".to_string(), "fuel cell".to_string()],
            energy_cost: vec!["hydrogen storage underground".to_string()],
            efficiency_store: Some("electrolysis".to_string()),
            efficiency_dispatch: Some("fuel cell".to_string()),
            color: Some("magenta".to_string()),
        },
    ]
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            year: default_year(),
            costs: None,
            timeseries: default_timeseries(),
            resolution_hours: default_resolution(),
            load_column: default_load_column(),
            load_scale: default_load_scale(),
            bus: default_bus(),
            co2_limit: 0.0,
            generators: default_generators(),
            storage: default_storage(),
        }
    }
}

impl StorageOption {
    /// Power cost plus `max_hours` times the energy cost (currency/MW/year).
    pub fn capital_cost(&self, costs: &CostTable) -> Result<f64> {
        let mut total = 0.0;
        for tech in &self.power_cost {
            total += costs.technology(tech)?.capital_cost();
        }
        for tech in &self.energy_cost {
            total += self.max_hours * costs.technology(tech)?.capital_cost();
        }
        Ok(total)
    }

    fn efficiency(costs: &CostTable, tech: &Option<String>) -> Result<f64> {
        match tech {
            Some(tech) => Ok(costs.get(tech, EFFICIENCY)?),
            None => Ok(1.0),
        }
    }
}

impl ScenarioConfig {
    pub fn from_toml_str(text: &str) -> CemResult<Self> {
        let config: ScenarioConfig =
            toml::from_str(text).map_err(|e| CemError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        info!("Loaded scenario from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> CemResult<()> {
        if self.resolution_hours == 0 {
            return Err(CemError::Config(
                "resolution_hours must be at least 1".to_string(),
            ));
        }
        if self.generators.is_empty() {
            return Err(CemError::Config(
                "scenario needs at least one generator".to_string(),
            ));
        }
        for s in &self.storage {
            if s.max_hours <= 0.0 {
                return Err(CemError::Config(format!(
                    "storage '{}' needs positive max_hours",
                    s.name
                )));
            }
        }
        Ok(())
    }

    pub fn costs_source(&self) -> DataSource {
        self.costs
            .clone()
            .unwrap_or_else(|| DataSource::url(costs_url(self.year)))
    }

    /// Scale the load column and downsample to the configured resolution.
    pub fn prepare_timeseries(&self, raw: &TimeSeries) -> Result<TimeSeries> {
        let mut ts = raw.resample_first(self.resolution_hours)?;
        ts.scale(&self.load_column, self.load_scale)?;
        Ok(ts)
    }

    /// Single-bus network with the load and all extendable generators.
    ///
    /// `ts` must already be prepared with [`Self::prepare_timeseries`].
    pub fn build_network(&self, costs: &CostTable, ts: &TimeSeries) -> Result<Network> {
        if ts.is_empty() {
            bail!("time series is empty");
        }
        let mut network = Network::new();
        let bus = network.add_bus(Bus::new(&self.bus))?;
        network.set_snapshots(ts.index().to_vec())?;
        network.set_snapshot_weightings(f64::from(self.resolution_hours));

        let carriers = self
            .generators
            .iter()
            .map(|g| (&g.name, &g.color))
            .chain(self.storage.iter().map(|s| (&s.name, &s.color)));
        for (name, color) in carriers {
            let co2 = costs.get(name, CO2_INTENSITY)?;
            let mut carrier = Carrier::new(name).with_co2_emissions(co2);
            if let Some(color) = color {
                carrier = carrier.with_color(color);
            }
            network.add_carrier(carrier)?;
        }

        let load = ts.complete_column(&self.load_column)?.to_vec();
        network.add_load(Load::new("demand", bus, load))?;

        for option in &self.generators {
            let tech = costs.technology(&option.name)?;
            let mut gen = Generator::new(&option.name, bus)
                .with_carrier(&option.name)
                .extendable()
                .with_capital_cost(tech.capital_cost())
                .with_marginal_cost(tech.marginal_cost())
                .with_efficiency(tech.efficiency());
            if let Some(column) = &option.profile {
                gen = gen.with_p_max_pu(ts.complete_column(column)?.to_vec());
            }
            network.add_generator(gen)?;
            debug!(
                "Added generator {} (capital {:.0}, marginal {:.2})",
                option.name,
                tech.capital_cost(),
                tech.marginal_cost()
            );
        }

        info!("Built network: {}", network.stats());
        Ok(network)
    }

    /// Add every configured storage option as an extendable cyclic unit.
    pub fn add_storage(&self, network: &mut Network, costs: &CostTable) -> Result<()> {
        let bus = network.bus_id(&self.bus)?;
        for option in &self.storage {
            let capital_cost = option.capital_cost(costs)?;
            let store = StorageOption::efficiency(costs, &option.efficiency_store)?;
            let dispatch = StorageOption::efficiency(costs, &option.efficiency_dispatch)?;
            network.add_storage_unit(
                StorageUnit::new(&option.name, bus)
                    .with_carrier(&option.name)
                    .extendable()
                    .with_max_hours(option.max_hours)
                    .with_capital_cost(capital_cost)
                    .with_efficiencies(store, dispatch)
                    .cyclic(),
            )?;
            debug!(
                "Added storage {} ({} h, capital {:.0})",
                option.name, option.max_hours, capital_cost
            );
        }
        Ok(())
    }

    /// Cap total CO2 emissions at [`Self::co2_limit`].
    pub fn add_co2_limit(&self, network: &mut Network) -> Result<()> {
        network.add_global_constraint(GlobalConstraint::co2_limit(
            CO2_LIMIT_NAME,
            Sense::LessEqual,
            self.co2_limit,
        ))?;
        Ok(())
    }
}
