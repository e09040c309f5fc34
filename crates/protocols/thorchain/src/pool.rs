//! Liquidity pool snapshots
//!
//! A `LiquidityPool` is built from one Midgard pool record joined with the
//! node's view of the same pool. It is never mutated; the cache replaces the
//! whole set on refresh.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thorchain_client::{PoolDetail, ThornodePool};
use thorchain_core::{
    ratio_to_decimal, serde_bigint, Asset, CryptoAmount, QueryError, BASE_DECIMALS,
};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolStatus {
    Available,
    Staged,
    Other(String),
}

impl PoolStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "available",
            Self::Staged => "staged",
            Self::Other(s) => s,
        }
    }
}

impl FromStr for PoolStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "available" => Self::Available,
            "staged" => Self::Staged,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for PoolStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PoolStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(Self::Other(s)))
    }
}

/// Immutable snapshot of one pool. Balances are in 1e8 base units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub asset: Asset,
    pub status: PoolStatus,
    /// Native decimals of the pool asset on its own chain
    pub decimals: u8,
    pub asset_balance: CryptoAmount,
    pub rune_balance: CryptoAmount,
    #[serde(with = "serde_bigint")]
    pub lp_units: BigInt,
    #[serde(with = "serde_bigint")]
    pub pool_units: BigInt,
    #[serde(with = "serde_bigint")]
    pub synth_supply: BigInt,
    #[serde(with = "serde_bigint")]
    pub savers_depth: BigInt,
    #[serde(with = "serde_bigint")]
    pub savers_units: BigInt,
    pub annual_percentage_rate: Decimal,
    pub pool_apy: Decimal,
    pub savers_apr: Decimal,
}

/// Parse a numeric string, treating blank or malformed input as zero
pub(crate) fn parse_int(value: &str) -> BigInt {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return BigInt::zero();
    }
    trimmed.parse().unwrap_or_else(|e| {
        warn!(value = trimmed, "Malformed integer from upstream, reading as zero: {}", e);
        BigInt::zero()
    })
}

pub(crate) fn parse_decimal(value: &str) -> Decimal {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or_default()
}

impl LiquidityPool {
    /// Build from a Midgard pool record and, when available, the node's record
    /// for the same pool.
    ///
    /// Decimals come from the node override when positive, then Midgard's
    /// native decimal, then 8.
    pub fn from_snapshots(
        detail: &PoolDetail,
        node: Option<&ThornodePool>,
    ) -> Result<Self, QueryError> {
        let asset: Asset = detail.asset.parse()?;

        let node_decimals = node.and_then(|n| n.decimals).filter(|d| *d > 0);
        let midgard_decimals = detail
            .native_decimal
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|d| *d > 0);
        let decimals = node_decimals
            .or(midgard_decimals)
            .and_then(|d| u8::try_from(d).ok())
            .unwrap_or(BASE_DECIMALS);

        let mut lp_units = parse_int(&detail.liquidity_units);
        if lp_units.is_zero() {
            if let Some(n) = node {
                lp_units = parse_int(&n.lp_units);
            }
        }
        let pick = |node_value: Option<&String>, midgard_value: &str| -> BigInt {
            node_value
                .map(|v| parse_int(v))
                .filter(|v| !v.is_zero())
                .unwrap_or_else(|| parse_int(midgard_value))
        };

        Ok(Self {
            status: detail.status.parse().unwrap_or(PoolStatus::Other(String::new())),
            decimals,
            asset_balance: CryptoAmount::new(
                parse_int(&detail.asset_depth),
                BASE_DECIMALS,
                asset.clone(),
            ),
            rune_balance: CryptoAmount::new(
                parse_int(&detail.rune_depth),
                BASE_DECIMALS,
                Asset::rune(),
            ),
            lp_units,
            pool_units: pick(node.map(|n| &n.pool_units), &detail.units),
            synth_supply: pick(node.map(|n| &n.synth_supply), &detail.synth_supply),
            savers_depth: pick(node.map(|n| &n.savers_depth), &detail.savers_depth),
            savers_units: pick(node.map(|n| &n.savers_units), &detail.savers_units),
            annual_percentage_rate: parse_decimal(&detail.annual_percentage_rate),
            pool_apy: parse_decimal(&detail.pool_apy),
            savers_apr: parse_decimal(&detail.savers_apr),
            asset,
        })
    }

    pub fn is_available(&self) -> bool {
        self.status == PoolStatus::Available
    }

    /// Asset depth in 1e8 base units
    pub fn asset_depth(&self) -> &BigInt {
        self.asset_balance.base_amount()
    }

    /// Rune depth in 1e8 base units
    pub fn rune_depth(&self) -> &BigInt {
        self.rune_balance.base_amount()
    }

    /// Rune per unit of asset
    pub fn rune_to_asset_ratio(&self) -> Decimal {
        ratio_to_decimal(self.rune_depth(), self.asset_depth())
    }

    /// Asset per unit of rune
    pub fn asset_to_rune_ratio(&self) -> Decimal {
        ratio_to_decimal(self.asset_depth(), self.rune_depth())
    }

    pub fn has_savers(&self) -> bool {
        self.savers_depth.is_positive()
    }

    /// Share of the asset depth already minted as synths, in percent
    pub fn saver_fill_percent(&self) -> Decimal {
        ratio_to_decimal(&(&self.synth_supply * 100u32), self.asset_depth())
    }
}
