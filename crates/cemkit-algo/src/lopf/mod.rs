//! Linear optimal power flow with capacity expansion
//!
//! Dispatches every component over all snapshots and, for assets flagged as
//! extendable, chooses their capacity in the same linear program.
//!
//! ## Formulation
//!
//! ```text
//! minimize    Σ_a c_a · P_a  +  Σ_t w_t · Σ_g mc_g · p_{g,t}
//!             └───────────┘     └────────────────────────┘
//!             annualised capex   operating cost
//!
//! subject to:
//!   p_min_pu_{g,t}·P_g ≤ p_{g,t} ≤ p_max_pu_{g,t}·P_g            Generator availability
//!   0 ≤ d_{s,t}, c_{s,t} ≤ P_s,   0 ≤ e_{s,t} ≤ h_s·P_s          Storage power and energy
//!   e_{s,t} = (1-λ)^w·e_{s,t-1} + w·(η⁺·c_{s,t} - d_{s,t}/η⁻)     State of charge
//!   |f_{l,t}| ≤ s_max_pu·S_l                                     Thermal limit
//!   f_{l,t} = (θ_{i,t} - θ_{j,t}) / x_l                          DC power flow (x_l > 0)
//!   Σ p + Σ (d - c) - load = Σ f_out - Σ f_in                    Nodal balance   [λ_{b,t}]
//!   Σ_t w_t Σ_g p_{g,t} / η_g · co2_g  (≤|≥|=)  limit            Global constraint [μ]
//! ```
//!
//! `P`, `S` are constants for non-extendable assets and decision variables
//! otherwise. The state of charge wraps from the last snapshot to the first
//! when the storage is cyclic. One bus per connected sub-network holds the
//! reference angle.
//!
//! ## Prices
//!
//! Nodal marginal prices are the duals of the balance rows divided by the
//! objective weighting of the snapshot, in currency/MWh. The emissions shadow
//! price `μ` is the change in objective per tonne of relaxed limit, so a
//! binding upper cap has `μ ≤ 0`.
//!
//! ## References
//!
//! - Brown, Hörsch, Schlachtberger (2018): "PyPSA: Python for Power System Analysis"
//! - Hörsch et al. (2018): "Linear optimal power flow using cycle flows"

mod outcome;
mod solver;

pub use outcome::{OptimizeConfig, OptimizeOutcome};
pub use solver::optimize;
