use anyhow::{Context, Result};
use cemkit_core::finance::annuity;

pub fn handle(rate: f64, lifetime: f64) -> Result<()> {
    let factor = annuity(rate, lifetime).context("computing annuity factor")?;
    println!("{:.6}", factor);
    Ok(())
}
