//! Annualisation of investment costs.
//!
//! Capital costs in the model are per MW and per year, so an overnight
//! investment is spread over the asset lifetime with the annuity factor
//! (also known as the capital recovery factor):
//!
//! ```text
//! a(r, n) = r / (1 - (1 + r)^-n)
//! ```
//!
//! For a zero discount rate the limit `1 / n` is used.

use crate::{CemError, CemResult};

/// Discount rates below this are treated as zero.
const ZERO_RATE_EPS: f64 = 1e-10;

/// Annuity factor for discount rate `r` and lifetime `n` years.
///
/// # Example
///
/// ```
/// use cemkit_core::finance::annuity;
///
/// let a = annuity(0.07, 25.0).unwrap();
/// assert!((a - 0.08581).abs() < 1e-5);
/// assert_eq!(annuity(0.0, 20.0).unwrap(), 0.05);
/// ```
pub fn annuity(r: f64, n: f64) -> CemResult<f64> {
    if !(n > 0.0) || !n.is_finite() {
        return Err(CemError::Validation(format!(
            "lifetime must be positive, got {}",
            n
        )));
    }
    if !r.is_finite() || r <= -1.0 {
        return Err(CemError::Validation(format!(
            "discount rate must be greater than -1, got {}",
            r
        )));
    }
    if r.abs() < ZERO_RATE_EPS {
        return Ok(1.0 / n);
    }
    Ok(r / (1.0 - (1.0 + r).powf(-n)))
}

/// Annualised capital cost per unit of capacity:
/// `(annuity(r, n) + fom_percent / 100) * investment`.
///
/// `fom_percent` is the fixed operation and maintenance cost in percent of
/// the investment per year.
pub fn annualised_capital_cost(
    investment: f64,
    fom_percent: f64,
    discount_rate: f64,
    lifetime: f64,
) -> CemResult<f64> {
    Ok((annuity(discount_rate, lifetime)? + fom_percent / 100.0) * investment)
}
