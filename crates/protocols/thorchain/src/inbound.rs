//! Inbound chain details
//!
//! Per-chain vault address, gas parameters and halt flags, derived from the
//! inbound address list and the merged network values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thorchain_client::InboundAddress;
use thorchain_core::Chain;
use tracing::warn;

use crate::constants::network_keys;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundDetail {
    pub chain: Chain,
    pub address: String,
    pub router: Option<String>,
    /// Gas rate in `gas_rate_units` (sats/byte, gwei, ...)
    pub gas_rate: u64,
    pub gas_rate_units: String,
    pub outbound_tx_size: u64,
    pub outbound_fee: u64,
    pub dust_threshold: u64,
    pub halted_chain: bool,
    pub halted_trading: bool,
    pub halted_lp: bool,
}

fn parse_u64(value: &str) -> u64 {
    value.trim().parse().unwrap_or_default()
}

/// A mimir value above zero is a set flag
fn flag(values: &HashMap<String, i64>, key: &str) -> bool {
    values.get(key).map(|v| *v > 0).unwrap_or(false)
}

impl InboundDetail {
    pub fn from_inbound(address: &InboundAddress, values: &HashMap<String, i64>) -> Option<Self> {
        let chain: Chain = match address.chain.parse() {
            Ok(chain) => chain,
            Err(e) => {
                warn!("Skipping inbound address with bad chain: {}", e);
                return None;
            }
        };
        let code = chain.as_str().to_string();

        let halted_chain = address.halted
            || flag(values, network_keys::HALT_CHAIN_GLOBAL)
            || flag(values, &network_keys::halt_chain(&code));
        let halted_trading = address.global_trading_paused
            || address.chain_trading_paused
            || flag(values, network_keys::HALT_TRADING)
            || flag(values, &network_keys::halt_trading(&code));
        let halted_lp = address.chain_lp_actions_paused
            || flag(values, network_keys::PAUSE_LP)
            || flag(values, &network_keys::pause_lp(&code));

        Some(Self {
            chain,
            address: address.address.clone(),
            router: address.router.clone().filter(|r| !r.is_empty()),
            gas_rate: parse_u64(&address.gas_rate),
            gas_rate_units: address.gas_rate_units.clone(),
            outbound_tx_size: parse_u64(&address.outbound_tx_size),
            outbound_fee: parse_u64(&address.outbound_fee),
            dust_threshold: parse_u64(&address.dust_threshold),
            halted_chain,
            halted_trading,
            halted_lp,
        })
    }

    /// THORChain itself has no inbound vault; native deposits go through the
    /// chain's own message handler
    pub fn thorchain(values: &HashMap<String, i64>) -> Self {
        Self {
            chain: Chain::Thor,
            address: String::new(),
            router: None,
            gas_rate: 0,
            gas_rate_units: String::new(),
            outbound_tx_size: 0,
            outbound_fee: 0,
            dust_threshold: 0,
            halted_chain: false,
            halted_trading: flag(values, network_keys::HALT_TRADING),
            halted_lp: flag(values, network_keys::PAUSE_LP),
        }
    }
}

/// Build the per-chain map, including a synthetic THOR entry
pub fn build_inbound_details(
    addresses: &[InboundAddress],
    values: &HashMap<String, i64>,
) -> HashMap<Chain, InboundDetail> {
    let mut details: HashMap<Chain, InboundDetail> = addresses
        .iter()
        .filter_map(|a| InboundDetail::from_inbound(a, values))
        .map(|d| (d.chain.clone(), d))
        .collect();
    details.insert(Chain::Thor, InboundDetail::thorchain(values));
    details
}

#[cfg(test)]
mod tests {
    use super::*;

    fn btc_address() -> InboundAddress {
        InboundAddress {
            chain: "BTC".to_string(),
            address: "bc1qvault".to_string(),
            gas_rate: "20".to_string(),
            gas_rate_units: "satsperbyte".to_string(),
            outbound_tx_size: "1000".to_string(),
            outbound_fee: "30000".to_string(),
            dust_threshold: "10000".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parses_gas_parameters() {
        let detail = InboundDetail::from_inbound(&btc_address(), &HashMap::new()).unwrap();
        assert_eq!(detail.chain, Chain::Btc);
        assert_eq!(detail.gas_rate, 20);
        assert_eq!(detail.outbound_tx_size, 1000);
        assert_eq!(detail.outbound_fee, 30_000);
        assert!(!detail.halted_chain && !detail.halted_trading && !detail.halted_lp);
    }

    #[test]
    fn test_mimir_halts() {
        let values = HashMap::from([
            ("HALTBTCCHAIN".to_string(), 1),
            ("PAUSELPBTC".to_string(), 0),
            ("HALTTRADING".to_string(), 12_000_000),
        ]);
        let detail = InboundDetail::from_inbound(&btc_address(), &values).unwrap();
        assert!(detail.halted_chain);
        assert!(detail.halted_trading);
        assert!(!detail.halted_lp);
    }

    #[test]
    fn test_address_flags() {
        let address = InboundAddress {
            chain_lp_actions_paused: true,
            ..btc_address()
        };
        let detail = InboundDetail::from_inbound(&address, &HashMap::new()).unwrap();
        assert!(detail.halted_lp);
    }

    #[test]
    fn test_thor_entry_synthesised() {
        let details = build_inbound_details(&[btc_address()], &HashMap::new());
        assert_eq!(details.len(), 2);
        assert!(details.contains_key(&Chain::Thor));
        assert_eq!(details[&Chain::Btc].address, "bc1qvault");
    }
}
