//! Technology cost table.
//!
//! Reads the long-format technology-data CSV
//! (`technology,parameter,value,unit,source,further description`) and turns it
//! into one parameter map per technology with derived `marginal_cost` and
//! `capital_cost` columns.
//!
//! Processing order:
//!
//! 1. values with a `/kW` unit are scaled ×1e3 and relabelled `/MW`
//! 2. rows are pivoted per technology, later rows overwrite earlier ones
//! 3. missing parameters take [`DEFAULT_PARAMETERS`]
//! 4. aliased technologies copy fuel and CO2 intensity from their source
//! 5. `marginal_cost = VOM + fuel / efficiency` and
//!    `capital_cost = (annuity(discount rate, lifetime) + FOM / 100) × investment`

use crate::source::DataSource;
use anyhow::{Context, Result};
use cemkit_core::finance::annualised_capital_cost;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_COSTS_URL: &str =
    "https://raw.githubusercontent.com/PyPSA/technology-data/master/outputs/costs_{year}.csv";

pub const FOM: &str = "FOM";
pub const VOM: &str = "VOM";
pub const EFFICIENCY: &str = "efficiency";
pub const FUEL: &str = "fuel";
pub const INVESTMENT: &str = "investment";
pub const LIFETIME: &str = "lifetime";
pub const CO2_INTENSITY: &str = "CO2 intensity";
pub const DISCOUNT_RATE: &str = "discount rate";
pub const MARGINAL_COST: &str = "marginal_cost";
pub const CAPITAL_COST: &str = "capital_cost";

/// Fill values for parameters a technology does not list
pub const DEFAULT_PARAMETERS: [(&str, f64); 8] = [
    (FOM, 0.0),
    (VOM, 0.0),
    (EFFICIENCY, 1.0),
    (FUEL, 0.0),
    (INVESTMENT, 0.0),
    (LIFETIME, 25.0),
    (CO2_INTENSITY, 0.0),
    (DISCOUNT_RATE, 0.07),
];

/// Gas turbines burn the fuel priced under `gas`
pub const DEFAULT_FUEL_ALIASES: [(&str, &str); 2] = [("OCGT", "gas"), ("CCGT", "gas")];

/// Cost table URL for a projection year.
pub fn costs_url(year: u16) -> String {
    DEFAULT_COSTS_URL.replace("{year}", &year.to_string())
}

#[derive(Debug, Error, PartialEq)]
pub enum CostLookupError {
    #[error("unknown technology '{0}' in cost table")]
    UnknownTechnology(String),
    #[error("technology '{technology}' has no parameter '{parameter}'")]
    UnknownParameter {
        technology: String,
        parameter: String,
    },
}

#[derive(Debug, Deserialize)]
struct CostRecord {
    technology: String,
    parameter: String,
    value: Option<f64>,
    #[serde(default)]
    unit: Option<String>,
}

/// Processed parameters of one technology
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TechnologyCosts {
    pub parameters: BTreeMap<String, f64>,
    /// Unit text per parameter after `/kW` → `/MW` relabelling
    pub units: BTreeMap<String, String>,
}

impl TechnologyCosts {
    pub fn get(&self, parameter: &str) -> Option<f64> {
        self.parameters.get(parameter).copied()
    }

    pub fn marginal_cost(&self) -> f64 {
        self.get(MARGINAL_COST).unwrap_or(0.0)
    }

    pub fn capital_cost(&self) -> f64 {
        self.get(CAPITAL_COST).unwrap_or(0.0)
    }

    pub fn efficiency(&self) -> f64 {
        self.get(EFFICIENCY).unwrap_or(1.0)
    }

    pub fn co2_intensity(&self) -> f64 {
        self.get(CO2_INTENSITY).unwrap_or(0.0)
    }
}

/// Cost table keyed by technology name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CostTable {
    technologies: BTreeMap<String, TechnologyCosts>,
}

impl CostTable {
    /// Parse and fully process a cost CSV using the default aliases.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_csv_str_with_aliases(text, &DEFAULT_FUEL_ALIASES)
    }

    pub fn from_csv_str_with_aliases(text: &str, aliases: &[(&str, &str)]) -> Result<Self> {
        let mut table = Self::parse_raw(text)?;
        table.fill_defaults();
        table.apply_fuel_aliases(aliases);
        table.derive_costs()?;
        Ok(table)
    }

    /// Load and process a cost table from a URL or file.
    pub fn load(source: &DataSource) -> Result<Self> {
        let text = source.read_to_string()?;
        let table =
            Self::from_csv_str(&text).with_context(|| format!("parsing cost table {}", source))?;
        info!(
            "Loaded costs for {} technologies from {}",
            table.len(),
            source
        );
        Ok(table)
    }

    /// Steps 1 and 2: unit conversion and pivot.
    fn parse_raw(text: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(text.as_bytes());

        let mut table = CostTable::default();
        let mut rows = 0usize;
        for (line, result) in rdr.deserialize().enumerate() {
            let record: CostRecord =
                result.with_context(|| format!("parsing cost record {}", line + 1))?;
            rows += 1;
            let Some(mut value) = record.value else {
                continue;
            };
            let mut unit = record.unit.unwrap_or_default();
            if unit.contains("/kW") {
                value *= 1e3;
                unit = unit.replace("/kW", "/MW");
            }
            let tech = table.technologies.entry(record.technology).or_default();
            tech.units.insert(record.parameter.clone(), unit);
            tech.parameters.insert(record.parameter, value);
        }
        debug!("Read {} cost rows", rows);
        Ok(table)
    }

    /// Step 3
    fn fill_defaults(&mut self) {
        for tech in self.technologies.values_mut() {
            for (parameter, value) in DEFAULT_PARAMETERS {
                tech.parameters.entry(parameter.to_string()).or_insert(value);
            }
        }
    }

    /// Step 4. Aliases whose source is missing are skipped.
    fn apply_fuel_aliases(&mut self, aliases: &[(&str, &str)]) {
        for &(target, source) in aliases {
            let Some(source_costs) = self.technologies.get(source) else {
                debug!("Fuel alias source '{}' not in table", source);
                continue;
            };
            let fuel = source_costs.get(FUEL);
            let co2 = source_costs.get(CO2_INTENSITY);
            if let Some(tech) = self.technologies.get_mut(target) {
                if let Some(fuel) = fuel {
                    tech.parameters.insert(FUEL.to_string(), fuel);
                }
                if let Some(co2) = co2 {
                    tech.parameters.insert(CO2_INTENSITY.to_string(), co2);
                }
            }
        }
    }

    /// Step 5
    fn derive_costs(&mut self) -> Result<()> {
        for (name, tech) in self.technologies.iter_mut() {
            let param = |p: &str| tech.get(p).unwrap_or(0.0);
            let marginal = param(VOM) + param(FUEL) / param(EFFICIENCY);
            let capital = annualised_capital_cost(
                param(INVESTMENT),
                param(FOM),
                param(DISCOUNT_RATE),
                param(LIFETIME),
            )
            .with_context(|| format!("annualising costs of '{}'", name))?;
            tech.parameters.insert(MARGINAL_COST.to_string(), marginal);
            tech.parameters.insert(CAPITAL_COST.to_string(), capital);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.technologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }

    pub fn technologies(&self) -> impl Iterator<Item = (&str, &TechnologyCosts)> {
        self.technologies.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn technology(&self, name: &str) -> Result<&TechnologyCosts, CostLookupError> {
        self.technologies
            .get(name)
            .ok_or_else(|| CostLookupError::UnknownTechnology(name.to_string()))
    }

    pub fn get(&self, technology: &str, parameter: &str) -> Result<f64, CostLookupError> {
        self.technology(technology)?
            .get(parameter)
            .ok_or_else(|| CostLookupError::UnknownParameter {
                technology: technology.to_string(),
                parameter: parameter.to_string(),
            })
    }

    /// Keep only the named technologies, erroring on unknown names.
    pub fn select(&self, names: &[String]) -> Result<CostTable, CostLookupError> {
        let mut technologies = BTreeMap::new();
        for name in names {
            technologies.insert(name.clone(), self.technology(name)?.clone());
        }
        Ok(CostTable { technologies })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
technology,parameter,value,unit,source,further description
gas,fuel,20.0,EUR/MWh_th,DEA,
gas,CO2 intensity,0.198,tCO2/MWh_th,IPCC,
OCGT,investment,450.0,EUR/kWel,DEA,
OCGT,FOM,1.8,%/year,DEA,
OCGT,VOM,4.5,EUR/MWh,DEA,
OCGT,efficiency,0.41,per unit,DEA,
OCGT,lifetime,25.0,years,DEA,
solar,investment,500.0,EUR/kW,DEA,
solar,investment,400.0,EUR/kW,DEA,updated
solar,lifetime,40.0,years,DEA,
battery storage,investment,150.0,EUR/kWh,DEA,
";

    #[test]
    fn test_kw_values_scaled_to_mw() {
        let table = CostTable::from_csv_str(SAMPLE).unwrap();
        let solar = table.technology("solar").unwrap();
        assert_eq!(solar.get(INVESTMENT), Some(400_000.0));
        assert_eq!(solar.units[INVESTMENT], "EUR/MW");
        assert_eq!(table.get("battery storage", INVESTMENT).unwrap(), 150_000.0);
        assert_eq!(
            table.technology("battery storage").unwrap().units[INVESTMENT],
            "EUR/MWh"
        );
    }

    #[test]
    fn test_defaults_filled() {
        let table = CostTable::from_csv_str(SAMPLE).unwrap();
        let solar = table.technology("solar").unwrap();
        assert_eq!(solar.get(FOM), Some(0.0));
        assert_eq!(solar.get(EFFICIENCY), Some(1.0));
        assert_eq!(solar.get(DISCOUNT_RATE), Some(0.07));
        assert_eq!(solar.get(LIFETIME), Some(40.0));
        assert_eq!(table.get("gas", LIFETIME).unwrap(), 25.0);
    }

    #[test]
    fn test_gas_turbine_copies_fuel_and_co2() {
        let table = CostTable::from_csv_str(SAMPLE).unwrap();
        let ocgt = table.technology("OCGT").unwrap();
        assert_eq!(ocgt.get(FUEL), Some(20.0));
        assert_eq!(ocgt.co2_intensity(), 0.198);
        let expected = 4.5 + 20.0 / 0.41;
        assert!((ocgt.marginal_cost() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_capital_cost_annualised() {
        let table = CostTable::from_csv_str(SAMPLE).unwrap();
        let ocgt = table.technology("OCGT").unwrap();
        let r: f64 = 0.07;
        let annuity = r / (1.0 - (1.0 + r).powf(-25.0));
        let expected = (annuity + 1.8 / 100.0) * 450_000.0;
        assert!((ocgt.capital_cost() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_lookup_names_key() {
        let table = CostTable::from_csv_str(SAMPLE).unwrap();
        let err = table.get("nuclear", FOM).unwrap_err();
        assert_eq!(err.to_string(), "unknown technology 'nuclear' in cost table");
        let err = table.get("solar", "heat rate").unwrap_err();
        assert!(err.to_string().contains("heat rate"));
    }

    #[test]
    fn test_select_subset() {
        let table = CostTable::from_csv_str(SAMPLE).unwrap();
        let subset = table
            .select(&["solar".to_string(), "gas".to_string()])
            .unwrap();
        assert_eq!(subset.len(), 2);
        assert!(table.select(&["wind".to_string()]).is_err());
    }

    #[test]
    fn test_costs_url_for_year() {
        assert!(costs_url(2030).ends_with("outputs/costs_2030.csv"));
    }

    #[test]
    fn test_malformed_value_is_error() {
        let bad = "technology,parameter,value,unit\nsolar,investment,cheap,EUR/kW\n";
        assert!(CostTable::from_csv_str(bad).is_err());
    }
}
