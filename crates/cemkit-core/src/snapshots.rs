//! Snapshots (the modelled time steps) and per-snapshot profiles.
//!
//! Every snapshot carries three weightings in hours:
//! - `objective`: scales operating cost in the objective
//! - `generators`: scales generator energy (emission accounting)
//! - `stores`: scales storage energy balance
//!
//! A network without explicit snapshots has a single default snapshot of
//! weight 1, so static models (one dispatch hour) need no time axis at all.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::units::Hours;
use crate::{CemError, CemResult};

/// Weightings for one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotWeighting {
    pub objective: Hours,
    pub generators: Hours,
    pub stores: Hours,
}

impl SnapshotWeighting {
    pub fn uniform(hours: f64) -> Self {
        Self {
            objective: Hours(hours),
            generators: Hours(hours),
            stores: Hours(hours),
        }
    }
}

impl Default for SnapshotWeighting {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

/// Ordered time axis of a network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshots {
    index: Vec<NaiveDateTime>,
    weightings: Vec<SnapshotWeighting>,
}

impl Default for Snapshots {
    fn default() -> Self {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            index: vec![epoch],
            weightings: vec![SnapshotWeighting::default()],
        }
    }
}

impl Snapshots {
    /// Build a time axis with unit weightings. The index must be non-empty
    /// and strictly increasing.
    pub fn new(index: Vec<NaiveDateTime>) -> CemResult<Self> {
        if index.is_empty() {
            return Err(CemError::Validation("snapshot index is empty".into()));
        }
        if let Some(w) = index.windows(2).find(|w| w[1] <= w[0]) {
            return Err(CemError::Validation(format!(
                "snapshots must be strictly increasing ({} follows {})",
                w[1], w[0]
            )));
        }
        let weightings = vec![SnapshotWeighting::default(); index.len()];
        Ok(Self { index, weightings })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn weightings(&self) -> &[SnapshotWeighting] {
        &self.weightings
    }

    pub fn weighting(&self, t: usize) -> SnapshotWeighting {
        self.weightings[t]
    }

    /// Set all three weightings of every snapshot to `hours`.
    pub fn set_uniform_weighting(&mut self, hours: f64) {
        for w in &mut self.weightings {
            *w = SnapshotWeighting::uniform(hours);
        }
    }

    /// Replace the weightings column-wise; length must match the snapshots.
    pub fn set_weightings(&mut self, weightings: Vec<SnapshotWeighting>) -> CemResult<()> {
        if weightings.len() != self.index.len() {
            return Err(CemError::Validation(format!(
                "{} weightings given for {} snapshots",
                weightings.len(),
                self.index.len()
            )));
        }
        self.weightings = weightings;
        Ok(())
    }

    /// Sum of objective weightings (modelled hours).
    pub fn total_hours(&self) -> Hours {
        self.weightings.iter().map(|w| w.objective).sum()
    }
}

/// A value that is either constant or given per snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    Static(f64),
    Series(Vec<f64>),
}

impl Default for Profile {
    fn default() -> Self {
        Profile::Static(0.0)
    }
}

impl From<f64> for Profile {
    fn from(v: f64) -> Self {
        Profile::Static(v)
    }
}

impl From<Vec<f64>> for Profile {
    fn from(v: Vec<f64>) -> Self {
        Profile::Series(v)
    }
}

impl Profile {
    /// Value at snapshot `t`. Series shorter than `t` are a caller bug and
    /// are rejected by [`Profile::check_len`] before optimisation.
    pub fn at(&self, t: usize) -> f64 {
        match self {
            Profile::Static(v) => *v,
            Profile::Series(values) => values[t],
        }
    }

    pub fn check_len(&self, snapshots: usize) -> Result<(), String> {
        match self {
            Profile::Series(values) if values.len() != snapshots => Err(format!(
                "profile has {} values for {} snapshots",
                values.len(),
                snapshots
            )),
            _ => Ok(()),
        }
    }

    pub fn max(&self) -> f64 {
        match self {
            Profile::Static(v) => *v,
            Profile::Series(values) => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}
