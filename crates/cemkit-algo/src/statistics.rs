//! Post-solve statistics grouped by component kind and carrier.
//!
//! All functions read the result fields written by [`crate::optimize`]; on an
//! unsolved network they report zeros.
//!
//! | Function | Unit |
//! |----------|------|
//! | [`capex`] | currency/year |
//! | [`opex`] | currency/year |
//! | [`system_cost`] | currency/year |
//! | [`total_emissions`] | Mt CO2 |
//! | [`installed_capacity`] | MW |
//! | [`energy_supply`] | MWh |

use cemkit_core::{Network, SnapshotWeighting};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Carrier label used for lines, which carry no carrier of their own
pub const LINE_CARRIER: &str = "AC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Generator,
    StorageUnit,
    Line,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Generator => "Generator",
            ComponentKind::StorageUnit => "StorageUnit",
            ComponentKind::Line => "Line",
        };
        f.write_str(name)
    }
}

/// One aggregated value for a (component kind, carrier) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierStat {
    pub component: ComponentKind,
    pub carrier: String,
    pub value: f64,
}

/// Annual cost of one carrier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub carrier: String,
    pub capex: f64,
    pub opex: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.capex + self.opex
    }
}

#[derive(Default)]
struct Accumulator(BTreeMap<(ComponentKind, String), f64>);

impl Accumulator {
    fn add(&mut self, kind: ComponentKind, carrier: &str, value: f64) {
        *self.0.entry((kind, carrier.to_string())).or_insert(0.0) += value;
    }

    fn finish(self) -> Vec<CarrierStat> {
        self.0
            .into_iter()
            .map(|((component, carrier), value)| CarrierStat {
                component,
                carrier,
                value,
            })
            .collect()
    }
}

fn weighted(series: &[f64], weights: &[SnapshotWeighting], w: fn(&SnapshotWeighting) -> f64) -> f64 {
    series.iter().zip(weights).map(|(x, sw)| w(sw) * x).sum()
}

/// Annualised capital cost of every asset at its optimal capacity.
pub fn capex(network: &Network) -> Vec<CarrierStat> {
    let mut acc = Accumulator::default();
    for gen in network.generators() {
        acc.add(
            ComponentKind::Generator,
            &gen.carrier,
            gen.capital_cost * gen.p_nom_opt.value(),
        );
    }
    for su in network.storage_units() {
        acc.add(
            ComponentKind::StorageUnit,
            &su.carrier,
            su.capital_cost * su.p_nom_opt.value(),
        );
    }
    for line in network.lines() {
        acc.add(
            ComponentKind::Line,
            LINE_CARRIER,
            line.capital_cost * line.s_nom_opt.value(),
        );
    }
    acc.finish()
}

/// Weighted marginal cost of dispatch.
pub fn opex(network: &Network) -> Vec<CarrierStat> {
    let weights = network.snapshots().weightings();
    let mut acc = Accumulator::default();
    for gen in network.generators() {
        let energy = weighted(&gen.p, weights, |w| w.objective.value());
        acc.add(ComponentKind::Generator, &gen.carrier, gen.marginal_cost * energy);
    }
    for su in network.storage_units() {
        let energy = weighted(&su.p_dispatch, weights, |w| w.objective.value());
        acc.add(ComponentKind::StorageUnit, &su.carrier, su.marginal_cost * energy);
    }
    acc.finish()
}

/// Capex plus opex per carrier, sorted by carrier name.
///
/// Carriers with both a generator and a storage unit are merged.
pub fn system_cost(network: &Network) -> Vec<CostBreakdown> {
    let mut by_carrier: BTreeMap<String, CostBreakdown> = BTreeMap::new();
    for stat in capex(network) {
        breakdown_entry(&mut by_carrier, stat.carrier).capex += stat.value;
    }
    for stat in opex(network) {
        breakdown_entry(&mut by_carrier, stat.carrier).opex += stat.value;
    }
    by_carrier.into_values().collect()
}

fn breakdown_entry(
    map: &mut BTreeMap<String, CostBreakdown>,
    carrier: String,
) -> &mut CostBreakdown {
    map.entry(carrier.clone()).or_insert_with(|| CostBreakdown {
        carrier,
        capex: 0.0,
        opex: 0.0,
    })
}

/// Sum of [`system_cost`] over all carriers (currency/year).
pub fn total_system_cost(network: &Network) -> f64 {
    system_cost(network).iter().map(CostBreakdown::total).sum()
}

/// Total CO2 emissions of generator fuel use in Mt.
///
/// `Σ_t w_gen[t] · Σ_g p[g,t] / η_g · co2(carrier_g) / 1e6`
pub fn total_emissions(network: &Network) -> f64 {
    let weights = network.snapshots().weightings();
    let tonnes: f64 = network
        .generators()
        .map(|gen| {
            let intensity = network.co2_intensity(&gen.carrier);
            if intensity == 0.0 {
                return 0.0;
            }
            let fuel = weighted(&gen.p, weights, |w| w.generators.value()) / gen.efficiency;
            fuel * intensity
        })
        .sum();
    tonnes / 1e6
}

/// Optimal power capacity (MW) of generators, storage units and lines.
pub fn installed_capacity(network: &Network) -> Vec<CarrierStat> {
    let mut acc = Accumulator::default();
    for gen in network.generators() {
        acc.add(ComponentKind::Generator, &gen.carrier, gen.p_nom_opt.value());
    }
    for su in network.storage_units() {
        acc.add(ComponentKind::StorageUnit, &su.carrier, su.p_nom_opt.value());
    }
    for line in network.lines() {
        acc.add(ComponentKind::Line, LINE_CARRIER, line.s_nom_opt.value());
    }
    acc.finish()
}

/// Energy delivered to buses (MWh). Storage reports dispatch net of charging.
pub fn energy_supply(network: &Network) -> Vec<CarrierStat> {
    let weights = network.snapshots().weightings();
    let mut acc = Accumulator::default();
    for gen in network.generators() {
        let energy = weighted(&gen.p, weights, |w| w.generators.value());
        acc.add(ComponentKind::Generator, &gen.carrier, energy);
    }
    for su in network.storage_units() {
        let out = weighted(&su.p_dispatch, weights, |w| w.stores.value());
        let input = weighted(&su.p_store, weights, |w| w.stores.value());
        acc.add(ComponentKind::StorageUnit, &su.carrier, out - input);
    }
    acc.finish()
}
