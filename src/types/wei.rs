//! Wei, the base currency unit.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use primitive_types::U256;

/// Number of wei in one gwei.
const GWEI: u64 = 1_000_000_000;

/// A wei amount.
///
/// Thin wrapper over `U256` so that currency amounts don't mix with other
/// 256-bit quantities. Arithmetic used on consensus paths goes through the
/// checked/saturating methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(U256);

impl Wei {
    /// Zero wei.
    pub fn zero() -> Self {
        Wei(U256::zero())
    }

    /// Wraps a raw U256 amount.
    pub fn new(amount: U256) -> Self {
        Wei(amount)
    }

    /// Creates an amount from a u64 wei count.
    pub fn from_u64(amount: u64) -> Self {
        Wei(U256::from(amount))
    }

    /// Creates an amount from a gwei count.
    pub fn from_gwei(gwei: u64) -> Self {
        Wei(U256::from(gwei) * U256::from(GWEI))
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns the raw U256 amount.
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Wei) -> Option<Wei> {
        self.0.checked_add(rhs.0).map(Wei)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Wei) -> Option<Wei> {
        self.0.checked_sub(rhs.0).map(Wei)
    }

    /// Checked multiplication by a gas amount.
    pub fn checked_mul_gas(self, gas: u64) -> Option<Wei> {
        self.0.checked_mul(U256::from(gas)).map(Wei)
    }

    /// Saturating addition.
    pub fn saturating_add(self, rhs: Wei) -> Wei {
        Wei(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    pub fn saturating_sub(self, rhs: Wei) -> Wei {
        Wei(self.0.saturating_sub(rhs.0))
    }

    /// Multiplies by a gas amount, panicking on overflow.
    pub fn mul_gas(self, gas: u64) -> Wei {
        Wei(self.0 * U256::from(gas))
    }
}

impl From<u64> for Wei {
    fn from(amount: u64) -> Self {
        Wei::from_u64(amount)
    }
}

impl From<U256> for Wei {
    fn from(amount: U256) -> Self {
        Wei(amount)
    }
}

impl Add for Wei {
    type Output = Wei;

    fn add(self, rhs: Wei) -> Wei {
        Wei(self.0 + rhs.0)
    }
}

impl AddAssign for Wei {
    fn add_assign(&mut self, rhs: Wei) {
        self.0 += rhs.0;
    }
}

impl Sub for Wei {
    type Output = Wei;

    fn sub(self, rhs: Wei) -> Wei {
        Wei(self.0 - rhs.0)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}
