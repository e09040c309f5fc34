//! Transaction memo parsing
//!
//! Memos are colon-separated: an action followed by positional fields. The
//! action alone doesn't determine the transaction type; `ADD` and `WITHDRAW`
//! target either a liquidity pool (`BTC.BTC`) or a saver vault (`BTC/BTC`),
//! told apart by the delimiter in the pool field after alias expansion.

use std::fmt;

use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thorchain_core::{decimal_to_fraction, Asset, QueryError};

/// Transaction kind derived from a memo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Swap,
    AddLp,
    WithdrawLp,
    AddSaver,
    WithdrawSaver,
    Refund,
    Other,
    Unknown,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::AddLp => "add_lp",
            Self::WithdrawLp => "withdraw_lp",
            Self::AddSaver => "add_saver",
            Self::WithdrawSaver => "withdraw_saver",
            Self::Refund => "refund",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A memo split into its action and positional fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memo {
    /// Upper-cased action
    pub action: String,
    pub fields: Vec<String>,
}

impl Memo {
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields
            .get(index)
            .map(|f| f.as_str())
            .filter(|f| !f.is_empty())
    }

    /// Pool field with short aliases expanded
    pub fn pool_field(&self) -> Option<String> {
        self.field(0).map(expand_alias)
    }
}

pub fn parse_memo(memo: &str) -> Memo {
    let mut parts = memo.trim().split(':');
    let action = parts.next().unwrap_or_default().trim().to_ascii_uppercase();
    let fields = parts.map(|p| p.trim().to_string()).collect();
    Memo { action, fields }
}

/// Expand a short asset alias (`b` → `BTC.BTC`); anything else is returned
/// unchanged
pub fn expand_alias(field: &str) -> String {
    let expanded = match field.to_ascii_lowercase().as_str() {
        "r" | "rune" => "THOR.RUNE",
        "b" => "BTC.BTC",
        "e" => "ETH.ETH",
        "g" => "GAIA.ATOM",
        "d" => "DOGE.DOGE",
        "l" => "LTC.LTC",
        "c" => "BCH.BCH",
        "a" => "AVAX.AVAX",
        "s" => "BSC.BNB",
        _ => return field.to_string(),
    };
    expanded.to_string()
}

fn is_swap(action: &str) -> bool {
    matches!(action, "SWAP" | "S" | "=")
}

fn is_add(action: &str) -> bool {
    matches!(action, "ADD" | "A" | "+")
}

fn is_withdraw(action: &str) -> bool {
    matches!(action, "WITHDRAW" | "WD" | "-")
}

/// Classify a parsed memo; first matching rule wins
pub fn classify(memo: &Memo) -> TxType {
    let action = memo.action.as_str();
    let pool = memo.pool_field().unwrap_or_default();
    if is_swap(action) {
        TxType::Swap
    } else if is_add(action) && pool.contains('/') {
        TxType::AddSaver
    } else if is_add(action) && pool.contains('.') {
        TxType::AddLp
    } else if is_withdraw(action) && pool.contains('/') {
        TxType::WithdrawSaver
    } else if is_withdraw(action) && pool.contains('.') {
        TxType::WithdrawLp
    } else if action == "REFUND" {
        TxType::Refund
    } else if action == "OUT" {
        TxType::Other
    } else {
        TxType::Unknown
    }
}

fn invalid(memo: &Memo, reason: &str) -> QueryError {
    QueryError::InvalidParams {
        reason: format!("{} memo: {}", memo.action, reason),
    }
}

fn parse_asset_field(memo: &Memo) -> Result<Asset, QueryError> {
    let field = memo.pool_field().ok_or_else(|| invalid(memo, "missing asset"))?;
    field.parse()
}

/// Parse a base-unit amount; accepts scientific shorthand such as `1e8`
fn parse_amount(value: &str) -> Option<BigInt> {
    if let Ok(amount) = value.parse::<BigInt>() {
        return Some(amount);
    }
    let decimal = Decimal::from_scientific(value).ok()?;
    let (num, den) = decimal_to_fraction(decimal);
    Some(num / den)
}

// ─── Typed memos ─────────────────────────────────────────────────────────────

/// `SWAP:ASSET:DEST:LIMIT/INTERVAL/QUANTITY:AFFILIATE:FEE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapMemo {
    pub asset: Asset,
    pub destination: Option<String>,
    /// Minimum output in 1e8 base units
    pub limit: Option<BigInt>,
    pub streaming_interval: Option<u64>,
    pub streaming_quantity: Option<u64>,
    pub affiliate: Option<String>,
    pub affiliate_bps: Option<u32>,
}

impl SwapMemo {
    pub fn parse(memo: &Memo) -> Result<Self, QueryError> {
        let asset = parse_asset_field(memo)?;
        let mut limit_parts = memo.field(2).unwrap_or_default().split('/');
        let limit = limit_parts.next().filter(|s| !s.is_empty()).and_then(parse_amount);
        let streaming_interval = limit_parts.next().and_then(|s| s.parse().ok());
        let streaming_quantity = limit_parts.next().and_then(|s| s.parse().ok());
        Ok(Self {
            asset,
            destination: memo.field(1).map(str::to_string),
            limit,
            streaming_interval,
            streaming_quantity,
            affiliate: memo.field(3).map(str::to_string),
            affiliate_bps: memo.field(4).and_then(|s| s.parse().ok()),
        })
    }
}

/// `ADD:POOL:PAIRED_ADDRESS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLpMemo {
    pub pool: Asset,
    pub paired_address: Option<String>,
}

impl AddLpMemo {
    pub fn parse(memo: &Memo) -> Result<Self, QueryError> {
        Ok(Self {
            pool: parse_asset_field(memo)?,
            paired_address: memo.field(1).map(str::to_string),
        })
    }
}

/// `WITHDRAW:POOL:BASIS_POINTS:ASSET`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawMemo {
    pub pool: Asset,
    pub basis_points: u32,
    /// Single-sided withdrawal target
    pub asset: Option<Asset>,
}

impl WithdrawMemo {
    pub fn parse(memo: &Memo) -> Result<Self, QueryError> {
        let basis_points = match memo.field(1) {
            Some(bps) => bps
                .parse()
                .map_err(|_| invalid(memo, "basis points not a number"))?,
            None => crate::constants::MAX_BPS,
        };
        let asset = match memo.field(2) {
            Some(a) => Some(expand_alias(a).parse()?),
            None => None,
        };
        Ok(Self {
            pool: parse_asset_field(memo)?,
            basis_points,
            asset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(memo: &str) -> TxType {
        classify(&parse_memo(memo))
    }

    #[test]
    fn test_classification_priority() {
        assert_eq!(kind("=:ETH.ETH:0xdest"), TxType::Swap);
        assert_eq!(kind("SWAP:BTC/BTC:thor1dest"), TxType::Swap);
        assert_eq!(kind("+:BTC/BTC"), TxType::AddSaver);
        assert_eq!(kind("+:BTC.BTC:thor1paired"), TxType::AddLp);
        assert_eq!(kind("-:BTC/BTC:10000"), TxType::WithdrawSaver);
        assert_eq!(kind("WITHDRAW:BTC.BTC:5000"), TxType::WithdrawLp);
        assert_eq!(kind("REFUND:ABCDEF"), TxType::Refund);
        assert_eq!(kind("OUT:ABCDEF"), TxType::Other);
        assert_eq!(kind("NOOP"), TxType::Unknown);
        assert_eq!(kind(""), TxType::Unknown);
    }

    #[test]
    fn test_saver_add_regardless_of_field_count() {
        assert_eq!(kind("ADD:ETH/ETH"), TxType::AddSaver);
        assert_eq!(kind("a:ETH/ETH::extra:fields"), TxType::AddSaver);
    }

    #[test]
    fn test_aliases_expanded_before_classification() {
        assert_eq!(kind("+:b:thor1paired"), TxType::AddLp);
        assert_eq!(kind("wd:e:10000"), TxType::WithdrawLp);
        assert_eq!(expand_alias("R"), "THOR.RUNE");
        assert_eq!(expand_alias("BTC.BTC"), "BTC.BTC");
    }

    #[test]
    fn test_add_without_pool_is_unknown() {
        assert_eq!(kind("+"), TxType::Unknown);
        assert_eq!(kind("+:bond"), TxType::Unknown);
    }

    #[test]
    fn test_swap_memo_fields() {
        let memo = parse_memo("=:e:0xdest:1e6/1/0:thor1aff:15");
        let swap = SwapMemo::parse(&memo).unwrap();
        assert_eq!(swap.asset.to_string(), "ETH.ETH");
        assert_eq!(swap.destination.as_deref(), Some("0xdest"));
        assert_eq!(swap.limit, Some(BigInt::from(1_000_000)));
        assert_eq!(swap.streaming_interval, Some(1));
        assert_eq!(swap.streaming_quantity, Some(0));
        assert_eq!(swap.affiliate.as_deref(), Some("thor1aff"));
        assert_eq!(swap.affiliate_bps, Some(15));
    }

    #[test]
    fn test_swap_memo_without_limit() {
        let swap = SwapMemo::parse(&parse_memo("SWAP:BTC.BTC:bc1qdest")).unwrap();
        assert_eq!(swap.limit, None);
        assert_eq!(swap.streaming_interval, None);
    }

    #[test]
    fn test_withdraw_memo() {
        let memo = WithdrawMemo::parse(&parse_memo("-:BTC.BTC:2500:r")).unwrap();
        assert_eq!(memo.basis_points, 2500);
        assert_eq!(memo.asset, Some(Asset::rune()));

        let full = WithdrawMemo::parse(&parse_memo("-:BTC/BTC")).unwrap();
        assert_eq!(full.basis_points, 10_000);
        assert!(full.pool.is_synth());

        assert!(WithdrawMemo::parse(&parse_memo("-:BTC.BTC:lots")).is_err());
    }

    #[test]
    fn test_add_lp_memo() {
        let memo = AddLpMemo::parse(&parse_memo("+:BTC.BTC:bc1qpaired")).unwrap();
        assert_eq!(memo.pool.to_string(), "BTC.BTC");
        assert_eq!(memo.paired_address.as_deref(), Some("bc1qpaired"));
    }
}
