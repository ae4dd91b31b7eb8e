//! Physical quantities used by the network model.
//!
//! Capacities are MW, storage energy is MWh, durations and snapshot weights
//! are hours, nominal voltages kV and line impedances ohm.
//!
//! ```
//! use cemkit_core::units::{Hours, MegawattHours, Megawatts};
//!
//! let p_nom = Megawatts(100.0);
//! let energy: MegawattHours = p_nom * Hours(6.0);
//! assert_eq!(energy.value(), 600.0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Sub};

macro_rules! quantity {
    ($(#[$doc:meta])* $name:ident, $symbol:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                $name(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                $name(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, factor: f64) -> Self {
                $name(self.0 * factor)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold($name(0.0), |acc, x| acc + x)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match f.precision() {
                    Some(p) => write!(f, "{:.*} {}", p, self.0, $symbol),
                    None => write!(f, "{} {}", self.0, $symbol),
                }
            }
        }
    };
}

quantity!(
    /// Power or installed capacity
    Megawatts,
    "MW"
);
quantity!(
    /// Stored energy
    MegawattHours,
    "MWh"
);
quantity!(
    /// Storage duration or snapshot weighting
    Hours,
    "h"
);
quantity!(Kilovolts, "kV");
quantity!(Ohms, "ohm");

impl Mul<Hours> for Megawatts {
    type Output = MegawattHours;
    fn mul(self, duration: Hours) -> MegawattHours {
        MegawattHours(self.0 * duration.0)
    }
}

impl Div<Hours> for MegawattHours {
    type Output = Megawatts;
    fn div(self, duration: Hours) -> Megawatts {
        Megawatts(self.0 / duration.0)
    }
}

impl Ohms {
    /// Reactance on a 1 MVA base, x / v_nom². A zero voltage leaves the
    /// value untouched.
    pub fn to_per_unit(self, v_nom: Kilovolts) -> f64 {
        let base = v_nom.0 * v_nom.0;
        if base < 1e-24 {
            self.0
        } else {
            self.0 / base
        }
    }
}
