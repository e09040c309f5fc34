//! Core type definitions for thorquote

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::QueryError;

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Stagenet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Stagenet => "stagenet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "stagenet" => Ok(Self::Stagenet),
            other => Err(format!("unknown network: {}", other)),
        }
    }
}

/// Average THORChain block time in seconds
pub const THOR_BLOCK_TIME_SECS: u64 = 6;

/// Chains connected to THORChain.
///
/// Chains not known to this build still parse (pool lists grow faster than
/// releases) and land in `Other`; the static fee/dust/attribute tables reject
/// them with `UnknownChain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Chain {
    Btc,
    Bch,
    Ltc,
    Doge,
    Eth,
    Avax,
    Bsc,
    Base,
    Gaia,
    Bnb,
    Thor,
    Other(String),
}

impl Chain {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Btc => "BTC",
            Self::Bch => "BCH",
            Self::Ltc => "LTC",
            Self::Doge => "DOGE",
            Self::Eth => "ETH",
            Self::Avax => "AVAX",
            Self::Bsc => "BSC",
            Self::Base => "BASE",
            Self::Gaia => "GAIA",
            Self::Bnb => "BNB",
            Self::Thor => "THOR",
            Self::Other(code) => code,
        }
    }

    /// EVM chains quote gas in gwei and settle with 18 decimals
    pub fn is_evm(&self) -> bool {
        matches!(self, Self::Eth | Self::Avax | Self::Base)
    }

    /// UTXO chains price gas as rate times transaction size
    pub fn is_utxo(&self) -> bool {
        matches!(self, Self::Btc | Self::Bch | Self::Ltc | Self::Doge)
    }

    /// Symbol of the chain's gas asset
    pub fn gas_symbol(&self) -> Result<&'static str, QueryError> {
        Ok(match self {
            Self::Btc => "BTC",
            Self::Bch => "BCH",
            Self::Ltc => "LTC",
            Self::Doge => "DOGE",
            Self::Eth | Self::Base => "ETH",
            Self::Avax => "AVAX",
            Self::Bsc | Self::Bnb => "BNB",
            Self::Gaia => "ATOM",
            Self::Thor => "RUNE",
            Self::Other(code) => {
                return Err(QueryError::UnknownChain {
                    chain: code.clone(),
                })
            }
        })
    }

    /// Block reward and average block time for confirmation counting
    pub fn attributes(&self) -> Result<ChainAttributes, QueryError> {
        let (reward, scale, secs) = match self {
            Self::Btc | Self::Bch => (625, 2, 600),
            Self::Ltc => (125, 1, 150),
            Self::Doge => (10_000, 0, 60),
            Self::Eth => (2, 0, 13),
            Self::Avax => (2, 0, 3),
            Self::Bsc => (0, 0, 3),
            Self::Base => (0, 0, 2),
            Self::Gaia | Self::Bnb => (0, 0, 6),
            Self::Thor => (0, 0, THOR_BLOCK_TIME_SECS),
            Self::Other(code) => {
                return Err(QueryError::UnknownChain {
                    chain: code.clone(),
                })
            }
        };
        Ok(ChainAttributes {
            block_reward: Decimal::new(reward, scale),
            avg_block_time_secs: secs,
        })
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Chain {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Ok(match code.as_str() {
            "" => return Err(QueryError::InvalidAsset { input: s.to_string() }),
            "BTC" => Self::Btc,
            "BCH" => Self::Bch,
            "LTC" => Self::Ltc,
            "DOGE" => Self::Doge,
            "ETH" => Self::Eth,
            "AVAX" => Self::Avax,
            "BSC" => Self::Bsc,
            "BASE" => Self::Base,
            "GAIA" => Self::Gaia,
            "BNB" => Self::Bnb,
            "THOR" => Self::Thor,
            _ => Self::Other(code),
        })
    }
}

impl Serialize for Chain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Chain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Static per-chain settlement parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainAttributes {
    /// Block reward in whole gas-asset units; zero means instant finality
    pub block_reward: Decimal,
    pub avg_block_time_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_chain_parse_roundtrip() {
        let chain: Chain = "btc".parse().unwrap();
        assert_eq!(chain, Chain::Btc);
        assert_eq!(chain.to_string(), "BTC");
    }

    #[test]
    fn test_unknown_chain_parses_but_has_no_attributes() {
        let chain: Chain = "XRP".parse().unwrap();
        assert_eq!(chain, Chain::Other("XRP".to_string()));
        assert!(matches!(
            chain.attributes(),
            Err(QueryError::UnknownChain { .. })
        ));
        assert!(chain.gas_symbol().is_err());
    }

    #[test]
    fn test_chain_attributes() {
        let btc = Chain::Btc.attributes().unwrap();
        assert_eq!(btc.block_reward, dec!(6.25));
        assert_eq!(btc.avg_block_time_secs, 600);

        let ltc = Chain::Ltc.attributes().unwrap();
        assert_eq!(ltc.block_reward, dec!(12.5));

        let thor = Chain::Thor.attributes().unwrap();
        assert!(thor.block_reward.is_zero());
        assert_eq!(thor.avg_block_time_secs, THOR_BLOCK_TIME_SECS);
    }

    #[test]
    fn test_gas_symbols() {
        assert_eq!(Chain::Gaia.gas_symbol().unwrap(), "ATOM");
        assert_eq!(Chain::Bsc.gas_symbol().unwrap(), "BNB");
        assert_eq!(Chain::Base.gas_symbol().unwrap(), "ETH");
    }

    #[test]
    fn test_network_serde() {
        let json = serde_json::to_string(&Network::Stagenet).unwrap();
        assert_eq!(json, "\"stagenet\"");
        assert_eq!("MAINNET".parse::<Network>().unwrap(), Network::Mainnet);
    }
}
