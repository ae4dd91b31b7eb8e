//! Solver configuration and run summary

use serde::Serialize;
use std::time::Duration;

/// Optimisation options
#[derive(Debug, Clone)]
pub struct OptimizeConfig {
    /// Extract nodal prices and shadow prices from the dual solution
    pub compute_prices: bool,
    /// Snapshots whose objective weighting is below this get no price
    /// (the dual cannot be normalised to currency/MWh)
    pub min_price_weight: f64,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            compute_prices: true,
            min_price_weight: 1e-9,
        }
    }
}

/// Summary of one optimisation run. Detailed results are written into the
/// network itself.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeOutcome {
    /// Objective value (annualised capex of extendable assets + opex)
    pub objective: f64,
    pub num_variables: usize,
    pub num_constraints: usize,
    pub num_snapshots: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub solve_time: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl OptimizeOutcome {
    pub fn summary(&self) -> String {
        format!(
            "objective {:.4e} ({} variables, {} constraints, {} snapshots) in {:.2?}",
            self.objective,
            self.num_variables,
            self.num_constraints,
            self.num_snapshots,
            self.solve_time
        )
    }
}
