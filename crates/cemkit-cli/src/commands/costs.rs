use anyhow::{Context, Result};
use cemkit_cli::cli::OutputFormat;
use cemkit_io::costs::{
    costs_url, CO2_INTENSITY, DISCOUNT_RATE, EFFICIENCY, FOM, FUEL, INVESTMENT, LIFETIME, VOM,
};
use cemkit_io::{CostTable, DataSource};
use serde::Serialize;
use std::io::{self, Write};
use tabwriter::TabWriter;

#[derive(Debug, Serialize)]
struct CostRow {
    technology: String,
    investment: f64,
    fom: f64,
    vom: f64,
    fuel: f64,
    efficiency: f64,
    lifetime: f64,
    discount_rate: f64,
    co2_intensity: f64,
    marginal_cost: f64,
    capital_cost: f64,
}

pub fn handle(
    year: u16,
    source: Option<&str>,
    format: OutputFormat,
    technologies: &[String],
) -> Result<()> {
    let source = match source {
        Some(s) => s.parse()?,
        None => DataSource::url(costs_url(year)),
    };
    let table = CostTable::load(&source).context("loading cost table")?;
    let table = if technologies.is_empty() {
        table
    } else {
        table.select(technologies)?
    };

    let rows: Vec<CostRow> = table
        .technologies()
        .map(|(name, tech)| {
            let p = |key: &str| tech.get(key).unwrap_or(0.0);
            CostRow {
                technology: name.to_string(),
                investment: p(INVESTMENT),
                fom: p(FOM),
                vom: p(VOM),
                fuel: p(FUEL),
                efficiency: p(EFFICIENCY),
                lifetime: p(LIFETIME),
                discount_rate: p(DISCOUNT_RATE),
                co2_intensity: p(CO2_INTENSITY),
                marginal_cost: tech.marginal_cost(),
                capital_cost: tech.capital_cost(),
            }
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&rows).context("serializing cost table")?;
            println!("{}", json);
        }
        OutputFormat::Plain => write_table(&rows, io::stdout().lock())?,
    }
    Ok(())
}

fn write_table<W: Write>(rows: &[CostRow], out: W) -> Result<()> {
    let mut w = TabWriter::new(out);
    writeln!(
        w,
        "TECHNOLOGY\tINVESTMENT\tFOM [%]\tVOM\tFUEL\tEFF\tLIFE\tRATE\tCO2\tMARGINAL\tCAPITAL"
    )?;
    for r in rows {
        writeln!(
            w,
            "{}\t{:.1}\t{:.2}\t{:.2}\t{:.2}\t{:.3}\t{:.0}\t{:.3}\t{:.3}\t{:.2}\t{:.1}",
            r.technology,
            r.investment,
            r.fom,
            r.vom,
            r.fuel,
            r.efficiency,
            r.lifetime,
            r.discount_rate,
            r.co2_intensity,
            r.marginal_cost,
            r.capital_cost
        )?;
    }
    w.flush()?;
    Ok(())
}
