pub mod annuity;
pub mod cem;
pub mod costs;
pub mod market;
pub mod report;
