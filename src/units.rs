//! This module defines the unit types used when reporting system costs.
//!
//! Model results are expressed in GWh for energy and million euros for money, so a cost per unit
//! of energy comes out in M€/GWh. Prices are conventionally reported in €/MWh instead.

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, derive_more::Add, derive_more::Sub)]
        pub struct $name(pub f64);

        impl $name {
            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                $name(iter.map(|x| x.0).sum())
            }
        }
    };
}

// Base quantities
unit_struct!(Money);
unit_struct!(Energy);

// Derived quantities
unit_struct!(MoneyPerEnergy);

impl std::ops::Div<Energy> for Money {
    type Output = MoneyPerEnergy;
    fn div(self, rhs: Energy) -> MoneyPerEnergy {
        MoneyPerEnergy(self.0 / rhs.0)
    }
}

impl MoneyPerEnergy {
    /// The price in €/MWh
    pub fn euro_per_mwh(self) -> f64 {
        // M€/GWh -> €/MWh
        self.0 * 1000.0
    }
}

impl Energy {
    /// The energy in TWh
    pub fn twh(self) -> f64 {
        self.0 / 1000.0
    }
}
