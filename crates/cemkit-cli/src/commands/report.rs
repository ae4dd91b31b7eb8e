//! Shared result printing for solved networks.

use anyhow::{Context, Result};
use cemkit_algo::statistics::{self, ComponentKind};
use cemkit_algo::OptimizeOutcome;
use cemkit_cli::cli::OutputFormat;
use cemkit_core::Network;
use serde::Serialize;
use std::io::{self, Write};
use tabwriter::TabWriter;

#[derive(Debug, Serialize)]
pub struct Report {
    pub stage: String,
    /// Billion currency units per year
    pub objective_bn: f64,
    pub num_snapshots: usize,
    pub solve_time_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buses: Vec<BusOutput>,
    pub generators: Vec<GeneratorOutput>,
    pub carriers: Vec<CarrierOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub storage_units: Vec<StorageOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LineOutput>,
    pub total_emissions_mt: f64,
    pub system_cost: Vec<CostOutput>,
    pub total_system_cost_bn: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub global_constraints: Vec<ConstraintOutput>,
}

#[derive(Debug, Serialize)]
pub struct BusOutput {
    pub name: String,
    pub mean_price: f64,
}

#[derive(Debug, Serialize)]
pub struct GeneratorOutput {
    pub name: String,
    pub carrier: String,
    pub p_nom_opt: f64,
}

/// Capacity and supplied energy of one component kind and carrier
#[derive(Debug, Serialize)]
pub struct CarrierOutput {
    pub component: ComponentKind,
    pub carrier: String,
    /// MW
    pub capacity: f64,
    /// Weighted MWh; lines supply none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StorageOutput {
    pub name: String,
    pub carrier: String,
    pub p_nom_opt: f64,
    pub energy_capacity: f64,
}

#[derive(Debug, Serialize)]
pub struct LineOutput {
    pub name: String,
    pub s_nom_opt: f64,
    pub mean_flow: f64,
}

#[derive(Debug, Serialize)]
pub struct CostOutput {
    pub carrier: String,
    pub capex_bn: f64,
    pub opex_bn: f64,
    pub total_bn: f64,
    /// Percentage of the total system cost
    pub share: f64,
}

#[derive(Debug, Serialize)]
pub struct ConstraintOutput {
    pub name: String,
    pub sense: String,
    pub constant: f64,
    pub mu: Option<f64>,
}

fn billions(value: f64) -> f64 {
    (value / 1e9 * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Report {
    pub fn new(stage: impl Into<String>, network: &Network, outcome: &OptimizeOutcome) -> Self {
        let buses = if network.stats().num_buses > 1 {
            network
                .buses()
                .map(|b| BusOutput {
                    name: b.name.clone(),
                    mean_price: mean(&b.marginal_price),
                })
                .collect()
        } else {
            Vec::new()
        };

        let generators = network
            .generators()
            .map(|g| GeneratorOutput {
                name: g.name.clone(),
                carrier: g.carrier.clone(),
                p_nom_opt: g.p_nom_opt.value(),
            })
            .collect();

        let supply = statistics::energy_supply(network);
        let carriers = statistics::installed_capacity(network)
            .into_iter()
            .map(|cap| {
                let energy = supply
                    .iter()
                    .find(|e| e.component == cap.component && e.carrier == cap.carrier)
                    .map(|e| e.value);
                CarrierOutput {
                    component: cap.component,
                    carrier: cap.carrier,
                    capacity: cap.value,
                    energy,
                }
            })
            .collect();

        let storage_units = network
            .storage_units()
            .map(|s| StorageOutput {
                name: s.name.clone(),
                carrier: s.carrier.clone(),
                p_nom_opt: s.p_nom_opt.value(),
                energy_capacity: s.energy_capacity_opt().value(),
            })
            .collect();

        let lines = network
            .lines()
            .map(|l| LineOutput {
                name: l.name.clone(),
                s_nom_opt: l.s_nom_opt.value(),
                mean_flow: mean(&l.p0),
            })
            .collect();

        let costs = statistics::system_cost(network);
        let total: f64 = costs.iter().map(|c| c.total()).sum();
        let system_cost = costs
            .iter()
            .filter(|c| c.total() != 0.0)
            .map(|c| CostOutput {
                carrier: c.carrier.clone(),
                capex_bn: billions(c.capex),
                opex_bn: billions(c.opex),
                total_bn: billions(c.total()),
                share: if total > 0.0 {
                    100.0 * c.total() / total
                } else {
                    0.0
                },
            })
            .collect();

        let global_constraints = network
            .global_constraints
            .iter()
            .map(|c| ConstraintOutput {
                name: c.name.clone(),
                sense: c.sense.to_string(),
                constant: c.constant,
                mu: c.mu,
            })
            .collect();

        Report {
            stage: stage.into(),
            objective_bn: outcome.objective / 1e9,
            num_snapshots: outcome.num_snapshots,
            solve_time_ms: outcome.solve_time.as_millis() as u64,
            buses,
            generators,
            carriers,
            storage_units,
            lines,
            total_emissions_mt: statistics::total_emissions(network),
            system_cost,
            total_system_cost_bn: billions(total),
            global_constraints,
        }
    }

    pub fn write_plain<W: Write>(&self, out: W) -> io::Result<()> {
        let mut w = TabWriter::new(out);
        writeln!(w, "--- {} ---", self.stage)?;
        writeln!(w, "Objective\t{:.4} bn/year", self.objective_bn)?;
        writeln!(
            w,
            "Snapshots\t{} (solved in {} ms)",
            self.num_snapshots, self.solve_time_ms
        )?;

        writeln!(w)?;
        writeln!(w, "GENERATOR\tCARRIER\tP_NOM_OPT [MW]")?;
        for g in &self.generators {
            writeln!(w, "{}\t{}\t{:.1}", g.name, g.carrier, g.p_nom_opt)?;
        }

        writeln!(w)?;
        writeln!(w, "COMPONENT\tCARRIER\tCAPACITY [MW]\tENERGY [MWh]")?;
        for c in &self.carriers {
            match c.energy {
                Some(energy) => writeln!(
                    w,
                    "{}\t{}\t{:.1}\t{:.1}",
                    c.component, c.carrier, c.capacity, energy
                )?,
                None => writeln!(w, "{}\t{}\t{:.1}\t-", c.component, c.carrier, c.capacity)?,
            }
        }

        if !self.storage_units.is_empty() {
            writeln!(w)?;
            writeln!(w, "STORAGE UNIT\tCARRIER\tP_NOM_OPT [MW]\tENERGY [MWh]")?;
            for s in &self.storage_units {
                writeln!(
                    w,
                    "{}\t{}\t{:.1}\t{:.1}",
                    s.name, s.carrier, s.p_nom_opt, s.energy_capacity
                )?;
            }
        }

        if !self.buses.is_empty() {
            writeln!(w)?;
            writeln!(w, "BUS\tMEAN PRICE [/MWh]")?;
            for b in &self.buses {
                writeln!(w, "{}\t{:.2}", b.name, b.mean_price)?;
            }
        }

        if !self.lines.is_empty() {
            writeln!(w)?;
            writeln!(w, "LINE\tS_NOM_OPT [MW]\tMEAN FLOW [MW]")?;
            for l in &self.lines {
                writeln!(w, "{}\t{:.1}\t{:.1}", l.name, l.s_nom_opt, l.mean_flow)?;
            }
        }

        writeln!(w)?;
        writeln!(w, "Total emissions\t{:.4} Mt", self.total_emissions_mt)?;
        for c in &self.global_constraints {
            match c.mu {
                Some(mu) => writeln!(
                    w,
                    "{}\t{} {} (mu = {:.2})",
                    c.name, c.sense, c.constant, mu
                )?,
                None => writeln!(w, "{}\t{} {}", c.name, c.sense, c.constant)?,
            }
        }

        writeln!(w)?;
        writeln!(w, "CARRIER\tCAPEX [bn]\tOPEX [bn]\tTOTAL [bn]\tSHARE")?;
        for c in &self.system_cost {
            writeln!(
                w,
                "{}\t{:.2}\t{:.2}\t{:.2}\t{:.1}%",
                c.carrier, c.capex_bn, c.opex_bn, c.total_bn, c.share
            )?;
        }
        writeln!(w, "total\t\t\t{:.2}\t", self.total_system_cost_bn)?;
        writeln!(w, "{}", "-".repeat(40))?;
        w.flush()
    }
}

/// Print reports in the requested format. JSON output is a single array.
pub fn emit(reports: &[Report], format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    match format {
        OutputFormat::Plain => {
            for report in reports {
                report
                    .write_plain(stdout.lock())
                    .context("writing report")?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(reports).context("serializing report")?;
            println!("{}", json);
        }
    }
    Ok(())
}
