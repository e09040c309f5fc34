//! Fixed-point asset amounts
//!
//! Base amounts are `BigInt` because intermediate AMM products
//! (`x * X * Y` on 18-decimal EVM amounts) overflow `u128`.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::asset::Asset;
use crate::errors::QueryError;

/// Precision every THORChain pool balance is expressed in
pub const BASE_DECIMALS: u8 = 8;

/// `10^exp` as a BigInt
pub fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

/// Convert `num / den` into a `Decimal`, keeping as many fractional digits as
/// fit. A zero denominator yields zero.
pub fn ratio_to_decimal(num: &BigInt, den: &BigInt) -> Decimal {
    if den.is_zero() {
        return Decimal::ZERO;
    }
    for scale in (0..=18u32).rev() {
        let scaled = num * pow10(scale) / den;
        if let Some(mantissa) = scaled.to_i128() {
            if let Ok(value) = Decimal::try_from_i128_with_scale(mantissa, scale) {
                return value.normalize();
            }
        }
    }
    if num.is_negative() != den.is_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// Split a decimal into an exact `(numerator, denominator)` fraction
pub fn decimal_to_fraction(value: Decimal) -> (BigInt, BigInt) {
    (BigInt::from(value.mantissa()), pow10(value.scale()))
}

/// An integer amount of `asset` with `decimals` digits of precision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoAmount {
    #[serde(with = "serde_bigint")]
    amount: BigInt,
    decimals: u8,
    asset: Asset,
}

impl CryptoAmount {
    pub fn new(amount: impl Into<BigInt>, decimals: u8, asset: Asset) -> Self {
        Self {
            amount: amount.into(),
            decimals,
            asset,
        }
    }

    pub fn zero(asset: Asset, decimals: u8) -> Self {
        Self::new(BigInt::zero(), decimals, asset)
    }

    /// Build from a human-readable amount such as `1.5`.
    ///
    /// Digits beyond `decimals` are truncated.
    pub fn from_units(units: Decimal, decimals: u8, asset: Asset) -> Self {
        let (num, den) = decimal_to_fraction(units);
        let amount = num * pow10(decimals as u32) / den;
        Self::new(amount, decimals, asset)
    }

    /// Parse a base-unit integer string; blank strings read as zero
    pub fn from_base_str(
        value: &str,
        decimals: u8,
        asset: Asset,
    ) -> Result<Self, QueryError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(Self::zero(asset, decimals));
        }
        let amount = trimmed
            .parse::<BigInt>()
            .map_err(|_| QueryError::InvalidParams {
                reason: format!("not an integer amount: {}", value),
            })?;
        Ok(Self::new(amount, decimals, asset))
    }

    pub fn base_amount(&self) -> &BigInt {
        &self.amount
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_negative()
    }

    /// Re-express the amount with `decimals` digits. Reducing precision
    /// truncates toward zero.
    pub fn rescale(&self, decimals: u8) -> Self {
        let amount = match decimals.cmp(&self.decimals) {
            Ordering::Equal => self.amount.clone(),
            Ordering::Greater => &self.amount * pow10((decimals - self.decimals) as u32),
            Ordering::Less => &self.amount / pow10((self.decimals - decimals) as u32),
        };
        Self::new(amount, decimals, self.asset.clone())
    }

    /// Base amount at the network's 8-decimal precision
    pub fn base8(&self) -> BigInt {
        self.rescale(BASE_DECIMALS).amount
    }

    /// Same amount relabelled as another asset (e.g. a synth as its layer-1)
    pub fn with_asset(&self, asset: Asset) -> Self {
        Self::new(self.amount.clone(), self.decimals, asset)
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self, QueryError> {
        let (a, b) = self.aligned(other)?;
        Ok(Self::new(a.amount + b.amount, a.decimals, a.asset))
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self, QueryError> {
        let (a, b) = self.aligned(other)?;
        Ok(Self::new(a.amount - b.amount, a.decimals, a.asset))
    }

    pub fn checked_cmp(&self, other: &Self) -> Result<Ordering, QueryError> {
        let (a, b) = self.aligned(other)?;
        Ok(a.amount.cmp(&b.amount))
    }

    /// Multiply by an integer factor
    pub fn times(&self, factor: u64) -> Self {
        Self::new(&self.amount * factor, self.decimals, self.asset.clone())
    }

    /// Multiply by `num / den`, flooring the result
    pub fn mul_ratio(&self, num: &BigInt, den: &BigInt) -> Self {
        let amount = if den.is_zero() {
            BigInt::zero()
        } else {
            &self.amount * num / den
        };
        Self::new(amount, self.decimals, self.asset.clone())
    }

    /// Multiply by a decimal factor such as a percentage
    pub fn mul_decimal(&self, factor: Decimal) -> Self {
        let (num, den) = decimal_to_fraction(factor);
        self.mul_ratio(&num, &den)
    }

    /// Amount in whole units
    pub fn to_units(&self) -> Decimal {
        ratio_to_decimal(&self.amount, &pow10(self.decimals as u32))
    }

    /// Both operands at the larger precision, after checking assets match
    fn aligned(&self, other: &Self) -> Result<(Self, Self), QueryError> {
        if self.asset != other.asset {
            return Err(QueryError::AssetMismatch {
                left: self.asset.to_string(),
                right: other.asset.to_string(),
            });
        }
        let decimals = self.decimals.max(other.decimals);
        Ok((self.rescale(decimals), other.rescale(decimals)))
    }
}

impl fmt::Display for CryptoAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount.is_negative() { "-" } else { "" };
        let digits = self.amount.abs().to_string();
        let decimals = self.decimals as usize;
        if decimals == 0 {
            return write!(f, "{}{} {}", sign, digits, self.asset);
        }
        let padded = format!("{:0>width$}", digits, width = decimals + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
        write!(f, "{}{}.{} {}", sign, int_part, frac_part, self.asset)
    }
}

/// Serialize BigInt as a decimal string so JSON consumers don't lose precision
pub mod serde_bigint {
    use num_bigint::BigInt;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
