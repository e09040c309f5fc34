//! Per-chain network fees, outbound fees and dust thresholds

use serde::{Deserialize, Serialize};
use thorchain_core::{Asset, Chain, CryptoAmount, QueryError, BASE_DECIMALS};

use crate::constants::fees::{
    EVM_DECIMALS, EVM_NATIVE_GAS_LIMIT, EVM_TOKEN_GAS_LIMIT, GWEI, NATIVE_RUNE_FEE,
};
use crate::inbound::InboundDetail;

fn native_rune_fee() -> CryptoAmount {
    CryptoAmount::new(NATIVE_RUNE_FEE, BASE_DECIMALS, Asset::rune())
}

fn unknown(chain: &Chain) -> QueryError {
    QueryError::UnknownChain {
        chain: chain.to_string(),
    }
}

/// Fee to get `asset` into the network from its own chain, in that chain's
/// gas asset
pub fn calc_network_fee(asset: &Asset, inbound: &InboundDetail) -> Result<CryptoAmount, QueryError> {
    if asset.is_synth() || asset.chain == Chain::Thor {
        return Ok(native_rune_fee());
    }
    let chain = &asset.chain;
    let gas_asset = Asset::gas_asset(chain)?;
    let gas_rate = inbound.gas_rate as u128;

    if chain.is_utxo() {
        let fee = gas_rate * inbound.outbound_tx_size as u128;
        return Ok(CryptoAmount::new(fee, BASE_DECIMALS, gas_asset));
    }
    if chain.is_evm() {
        let limit = if asset.is_gas_asset() {
            EVM_NATIVE_GAS_LIMIT
        } else {
            EVM_TOKEN_GAS_LIMIT
        };
        let fee = gas_rate * GWEI as u128 * limit as u128;
        return Ok(CryptoAmount::new(fee, EVM_DECIMALS, gas_asset));
    }
    match chain {
        Chain::Gaia | Chain::Bnb | Chain::Bsc => {
            Ok(CryptoAmount::new(gas_rate, BASE_DECIMALS, gas_asset))
        }
        other => Err(unknown(other)),
    }
}

/// Fee the network charges to send `asset` back out
pub fn calc_outbound_fee(asset: &Asset, inbound: &InboundDetail) -> Result<CryptoAmount, QueryError> {
    if asset.is_synth() || asset.chain == Chain::Thor {
        return Ok(native_rune_fee());
    }
    let chain = &asset.chain;
    let gas_asset = Asset::gas_asset(chain)?;
    let outbound = inbound.outbound_fee as u128;
    if chain.is_evm() {
        return Ok(CryptoAmount::new(outbound * GWEI as u128, EVM_DECIMALS, gas_asset));
    }
    Ok(CryptoAmount::new(outbound, BASE_DECIMALS, gas_asset))
}

/// Smallest amounts the network will process for a withdrawal request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DustValues {
    pub asset: CryptoAmount,
    pub rune: CryptoAmount,
}

pub fn get_dust_values(asset: &Asset) -> Result<DustValues, QueryError> {
    let chain = &asset.chain;
    let (amount, decimals): (u64, u8) = match chain {
        Chain::Btc | Chain::Bch | Chain::Ltc => (10_000, BASE_DECIMALS),
        Chain::Doge => (1_000_000, BASE_DECIMALS),
        Chain::Eth | Chain::Avax | Chain::Bsc | Chain::Base => (0, EVM_DECIMALS),
        Chain::Thor | Chain::Gaia => (0, BASE_DECIMALS),
        Chain::Bnb => (100, BASE_DECIMALS),
        Chain::Other(_) => return Err(unknown(chain)),
    };
    let dust_asset = if *chain == Chain::Thor {
        Asset::rune()
    } else {
        Asset::gas_asset(chain)?
    };
    Ok(DustValues {
        asset: CryptoAmount::new(amount, decimals, dust_asset),
        rune: CryptoAmount::zero(Asset::rune(), BASE_DECIMALS),
    })
}
