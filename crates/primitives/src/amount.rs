// primitives/src/amount.rs

use crate::{PrimitivesError, PrimitivesResult};
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum bit width of an amount
pub const AMOUNT_BITS: u64 = 256;

/// Token amount with uint256 semantics
///
/// Backed by `BigUint`, but every checked operation fails once the result
/// no longer fits in 256 bits. Serialized as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Amount(BigUint);

impl Amount {
    /// Wrap a `BigUint`, rejecting values wider than 256 bits
    pub fn new(value: BigUint) -> PrimitivesResult<Self> {
        if value.bits() > AMOUNT_BITS {
            return Err(PrimitivesError::AmountOverflow(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn one() -> Self {
        Self(BigUint::one())
    }

    /// `2^256 - 1`
    pub fn max_value() -> Self {
        Self((BigUint::one() << AMOUNT_BITS) - BigUint::one())
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    pub fn from_u128(value: u128) -> Self {
        Self(BigUint::from(value))
    }

    /// `whole * 10^decimals` base units (1 token = 10^18 wei for 18 decimals)
    ///
    /// Saturates at [`Amount::max_value`] when the product exceeds 256 bits.
    pub fn from_units(whole: u64, decimals: u32) -> Self {
        Self::bounded(BigUint::from(whole) * BigUint::from(10u64).pow(decimals))
            .unwrap_or_else(Self::max_value)
    }

    /// `10^exp`, saturating like [`Amount::from_units`]
    pub fn pow10(exp: u32) -> Self {
        Self::from_units(1, exp)
    }

    pub fn inner(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        Self::bounded(&self.0 + &other.0)
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 < other.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }

    pub fn checked_mul(&self, other: &Amount) -> Option<Amount> {
        Self::bounded(&self.0 * &other.0)
    }

    /// Floor division; `None` on a zero divisor
    pub fn checked_div(&self, other: &Amount) -> Option<Amount> {
        if other.is_zero() {
            None
        } else {
            Some(Amount(&self.0 / &other.0))
        }
    }

    /// Render as a fixed-point decimal with `scale` fractional digits
    ///
    /// Returns `None` when the value does not fit a `Decimal` mantissa.
    pub fn to_decimal(&self, scale: u32) -> Option<Decimal> {
        let raw = self.0.to_i128()?;
        Decimal::try_from_i128_with_scale(raw, scale)
            .ok()
            .map(|d| d.normalize())
    }

    fn bounded(value: BigUint) -> Option<Amount> {
        if value.bits() > AMOUNT_BITS {
            None
        } else {
            Some(Amount(value))
        }
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = PrimitivesError;

    /// Parses a base-10 integer; `_` separators are allowed ("1_000_000")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.trim().chars().filter(|c| *c != '_').collect();
        if digits.is_empty() {
            return Err(PrimitivesError::InvalidAmount("empty string".into()));
        }
        let value = BigUint::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| PrimitivesError::InvalidAmount(s.to_string()))?;
        Self::new(value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.0.to_string()
    }
}

impl TryFrom<String> for Amount {
    type Error = PrimitivesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
