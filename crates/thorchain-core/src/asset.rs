//! Asset identifiers
//!
//! THORChain writes assets as `CHAIN.SYMBOL` for layer-1 assets and tokens,
//! `CHAIN/SYMBOL` for synths and `CHAIN~SYMBOL` for trade assets. Token
//! symbols carry the contract after a dash (`ETH.USDC-0XA0B8...`); the part
//! before the dash is the ticker.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::QueryError;
use crate::types::Chain;

/// Variant tag of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Native,
    Token,
    Synth,
    Trade,
}

impl AssetKind {
    pub fn delimiter(&self) -> char {
        match self {
            Self::Native | Self::Token => '.',
            Self::Synth => '/',
            Self::Trade => '~',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    pub chain: Chain,
    pub symbol: String,
    pub ticker: String,
    pub kind: AssetKind,
}

impl Asset {
    /// Build an asset; the ticker is derived from the symbol.
    ///
    /// A `Native` kind with a contract suffix is promoted to `Token`.
    pub fn new(chain: Chain, symbol: impl Into<String>, kind: AssetKind) -> Self {
        let symbol = symbol.into().to_ascii_uppercase();
        let ticker = symbol.split('-').next().unwrap_or_default().to_string();
        let kind = if kind == AssetKind::Native && symbol.contains('-') {
            AssetKind::Token
        } else {
            kind
        };
        Self {
            chain,
            symbol,
            ticker,
            kind,
        }
    }

    /// THOR.RUNE, the network's native asset and pricing numeraire
    pub fn rune() -> Self {
        Self::new(Chain::Thor, "RUNE", AssetKind::Native)
    }

    /// Layer-1 gas asset of a chain
    pub fn gas_asset(chain: &Chain) -> Result<Self, QueryError> {
        let symbol = chain.gas_symbol()?;
        Ok(Self::new(chain.clone(), symbol, AssetKind::Native))
    }

    pub fn is_rune(&self) -> bool {
        self.chain == Chain::Thor && self.symbol == "RUNE" && self.kind == AssetKind::Native
    }

    pub fn is_synth(&self) -> bool {
        self.kind == AssetKind::Synth
    }

    /// True when this asset pays gas on its own chain
    pub fn is_gas_asset(&self) -> bool {
        self.kind == AssetKind::Native
            && self
                .chain
                .gas_symbol()
                .map(|s| s == self.symbol)
                .unwrap_or(false)
    }

    /// Key of the pool this asset trades in. Synths share the layer-1 pool.
    pub fn pool_key(&self) -> String {
        format!("{}.{}", self.chain, self.ticker)
    }

    /// The layer-1 (or token) form of this asset
    pub fn to_layer1(&self) -> Self {
        Self::new(self.chain.clone(), self.symbol.clone(), AssetKind::Native)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.chain, self.kind.delimiter(), self.symbol)
    }
}

impl FromStr for Asset {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QueryError::InvalidAsset {
            input: s.to_string(),
        };
        let (idx, delim) = s
            .char_indices()
            .find(|(_, c)| matches!(c, '.' | '/' | '~'))
            .ok_or_else(invalid)?;
        let kind = match delim {
            '/' => AssetKind::Synth,
            '~' => AssetKind::Trade,
            _ => AssetKind::Native,
        };
        let symbol = &s[idx + 1..];
        if symbol.is_empty() || symbol.contains(['.', '/', '~']) {
            return Err(invalid());
        }
        let chain: Chain = s[..idx].parse().map_err(|_| invalid())?;
        Ok(Self::new(chain, symbol, kind))
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
