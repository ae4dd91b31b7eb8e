//! Capacity expansion in three stages on the same network:
//! generators only, then with storage, then under a CO2 cap.

use super::report::{emit, Report};
use anyhow::{Context, Result};
use cemkit_algo::{optimize, OptimizeConfig};
use cemkit_cli::cli::{CemArgs, OutputFormat};
use cemkit_core::Network;
use cemkit_io::{CostTable, ScenarioConfig, TimeSeries};
use tracing::info;

/// Scenario file (or defaults) with command-line overrides applied.
fn resolve_scenario(args: &CemArgs) -> Result<ScenarioConfig> {
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(year) = args.year {
        config.year = year;
    }
    if let Some(costs) = &args.costs {
        config.costs = Some(costs.parse()?);
    }
    if let Some(ts) = &args.timeseries {
        config.timeseries = ts.parse()?;
    }
    if let Some(resolution) = args.resolution {
        config.resolution_hours = resolution;
    }
    if let Some(limit) = args.co2_limit {
        config.co2_limit = limit;
    }
    config.validate()?;
    Ok(config)
}

pub fn handle(args: &CemArgs) -> Result<()> {
    let scenario = resolve_scenario(args)?;
    let costs = CostTable::load(&scenario.costs_source()).context("loading cost table")?;
    let raw = TimeSeries::load(&scenario.timeseries).context("loading time series")?;
    let ts = scenario.prepare_timeseries(&raw)?;

    let mut network = scenario.build_network(&costs, &ts)?;
    let config = OptimizeConfig::default();
    let mut reports = Vec::new();

    let mut run_stage = |stage: &str, network: &mut Network| -> Result<()> {
        info!("Stage: {}", stage);
        let outcome =
            optimize(network, &config).with_context(|| format!("optimising stage '{}'", stage))?;
        let report = Report::new(stage, network, &outcome);
        if args.format == OutputFormat::Plain {
            emit(std::slice::from_ref(&report), OutputFormat::Plain)?;
        }
        reports.push(report);
        Ok(())
    };

    run_stage("Generators", &mut network)?;

    scenario.add_storage(&mut network, &costs)?;
    run_stage("Generators and storage", &mut network)?;

    scenario.add_co2_limit(&mut network)?;
    run_stage(
        &format!("CO2 limit {} t", scenario.co2_limit),
        &mut network,
    )?;

    if args.format == OutputFormat::Json {
        emit(&reports, OutputFormat::Json)?;
    }
    Ok(())
}
