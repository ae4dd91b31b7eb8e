//! Two-bus electricity market: South Africa and Mozambique joined by one line.
//!
//! Buses, carriers, fuel costs, efficiencies, plant sizes and loads are the
//! lecture exercise's data. The exercise stops after adding carriers, so the
//! generator and load components built from that data, their one-snapshot
//! dispatch and the 500 MW, 1 ohm SA - MZ interconnector are assumptions made
//! here; the line rating is chosen so that it congests.

use super::report::{emit, Report};
use anyhow::{Context, Result};
use cemkit_algo::{optimize, OptimizeConfig};
use cemkit_cli::cli::OutputFormat;
use cemkit_core::{Bus, Carrier, Generator, Line, Load, Network};
use tracing::debug;

/// Fuel cost (currency/MWh thermal)
const FUEL_COST: [(&str, f64); 3] = [("coal", 8.0), ("gas", 100.0), ("oil", 48.0)];

/// Thermal plant efficiency
const EFFICIENCY: [(&str, f64); 3] = [("coal", 0.33), ("gas", 0.58), ("oil", 0.35)];

/// (carrier, t CO2/MWh, nice name, color)
const CARRIERS: [(&str, f64, &str, &str); 5] = [
    ("coal", 0.34, "Coal", "grey"),
    ("gas", 0.2, "Gas", "indianred"),
    ("oil", 0.26, "Oil", "black"),
    ("hydro", 0.0, "Hydro", "aquamarine"),
    ("wind", 0.0, "Onshore Wind", "dodgerblue"),
];

/// (bus, x, y, installed plants in MW, load in MW)
type Country = (&'static str, f64, f64, &'static [(&'static str, f64)], f64);

const COUNTRIES: [Country; 2] = [
    (
        "SA",
        25.0,
        -30.5,
        &[("coal", 35_000.0), ("wind", 3_000.0), ("gas", 8_000.0), ("oil", 2_000.0)],
        42_000.0,
    ),
    ("MZ", 35.5, -18.5, &[("hydro", 1_200.0)], 650.0),
];

fn lookup(table: &[(&str, f64)], carrier: &str) -> Option<f64> {
    table.iter().find(|(c, _)| *c == carrier).map(|(_, v)| *v)
}

/// Fuel cost over efficiency; renewables have no marginal cost.
fn marginal_cost(carrier: &str) -> f64 {
    match (lookup(&FUEL_COST, carrier), lookup(&EFFICIENCY, carrier)) {
        (Some(fuel), Some(eff)) => fuel / eff,
        _ => 0.0,
    }
}

pub fn build_network() -> Result<Network> {
    let mut network = Network::new();

    for (name, co2, nice_name, color) in CARRIERS {
        network.add_carrier(
            Carrier::new(name)
                .with_co2_emissions(co2)
                .with_nice_name(nice_name)
                .with_color(color),
        )?;
    }
    network.add_carrier(Carrier::new("electricity"))?;
    network.add_carrier(Carrier::new("AC"))?;

    for (bus_name, x, y, plants, load) in COUNTRIES {
        let bus = network.add_bus(
            Bus::new(bus_name)
                .with_coordinates(x, y)
                .with_v_nom(400.0)
                .with_carrier("AC"),
        )?;
        for &(carrier, p_nom) in plants {
            let mut gen = Generator::new(format!("{} {}", bus_name, carrier), bus)
                .with_carrier(carrier)
                .with_p_nom(p_nom)
                .with_marginal_cost(marginal_cost(carrier));
            if let Some(eff) = lookup(&EFFICIENCY, carrier) {
                gen = gen.with_efficiency(eff);
            }
            network.add_generator(gen)?;
        }
        network.add_load(Load::new(format!("{} electricity demand", bus_name), bus, load))?;
    }

    let sa = network.bus_id("SA")?;
    let mz = network.bus_id("MZ")?;
    network.add_line(
        Line::new("SA - MZ", sa, mz)
            .with_impedance(1.0, 1.0)
            .with_s_nom(500.0),
    )?;

    debug!("Market network: {}", network.stats());
    Ok(network)
}

pub fn handle(format: OutputFormat) -> Result<()> {
    let mut network = build_network().context("building market network")?;
    let outcome = optimize(&mut network, &OptimizeConfig::default())
        .context("optimising market dispatch")?;
    let report = Report::new("Market dispatch", &network, &outcome);
    emit(&[report], format)
}
