//! Midgard: pool and network metadata
//!
//! Midgard serves numbers as strings; models keep them as strings and the
//! query layer parses them into base amounts.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thorchain_core::EndpointConfig;

use crate::failover::Failover;
use crate::http::HttpEndpoint;
use crate::{PoolMetadataSource, Result};

// ─── Models ──────────────────────────────────────────────────────────────────

/// Pool snapshot from `/v2/pools`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolDetail {
    pub asset: String,
    pub asset_depth: String,
    pub rune_depth: String,
    pub units: String,
    pub liquidity_units: String,
    pub synth_units: String,
    pub synth_supply: String,
    pub status: String,
    pub annual_percentage_rate: String,
    #[serde(rename = "poolAPY")]
    pub pool_apy: String,
    pub asset_price: String,
    #[serde(rename = "assetPriceUSD")]
    pub asset_price_usd: String,
    pub native_decimal: String,
    pub savers_depth: String,
    pub savers_units: String,
    pub savers_apr: String,
    pub volume24h: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeightTimestamp {
    pub height: u64,
    pub timestamp: u64,
}

/// `/v2/health`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Health {
    pub in_sync: bool,
    pub last_thor_node: HeightTimestamp,
    pub last_fetched: HeightTimestamp,
    pub last_committed: HeightTimestamp,
}

/// Vault address and gas parameters for one chain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundAddress {
    pub chain: String,
    pub pub_key: String,
    pub address: String,
    pub router: Option<String>,
    pub halted: bool,
    pub global_trading_paused: bool,
    pub chain_trading_paused: bool,
    pub chain_lp_actions_paused: bool,
    pub gas_rate: String,
    pub gas_rate_units: String,
    pub outbound_tx_size: String,
    pub outbound_fee: String,
    pub dust_threshold: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Constants {
    int_64_values: HashMap<String, i64>,
}

/// One pool membership from `/v2/member/{address}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberPool {
    pub pool: String,
    pub rune_address: String,
    pub asset_address: String,
    pub liquidity_units: String,
    pub rune_added: String,
    pub asset_added: String,
    pub rune_withdrawn: String,
    pub asset_withdrawn: String,
    pub rune_pending: String,
    pub asset_pending: String,
    pub date_first_added: String,
    pub date_last_added: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberDetails {
    pub pools: Vec<MemberPool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaverPool {
    pub pool: String,
    pub asset_address: String,
    pub saver_units: String,
    pub asset_added: String,
    pub asset_withdrawn: String,
    pub date_first_added: String,
    pub date_last_added: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaverDetails {
    pub pools: Vec<SaverPool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThornameEntry {
    pub chain: String,
    pub address: String,
}

/// `/v2/thorname/lookup/{name}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThornameLookup {
    pub owner: String,
    pub expire: String,
    pub entries: Vec<ThornameEntry>,
}

/// Merge network constants with mimir overrides. Keys are upper-cased and
/// mimir wins.
pub fn merge_network_values(
    constants: HashMap<String, i64>,
    mimir: HashMap<String, i64>,
) -> HashMap<String, i64> {
    let mut values: HashMap<String, i64> = constants
        .into_iter()
        .map(|(k, v)| (k.to_ascii_uppercase(), v))
        .collect();
    for (key, value) in mimir {
        values.insert(key.to_ascii_uppercase(), value);
    }
    values
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// HTTP Midgard client over an ordered endpoint list
#[derive(Debug, Clone)]
pub struct MidgardClient {
    endpoints: Failover<HttpEndpoint>,
}

impl MidgardClient {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            endpoints: HttpEndpoint::failover("Midgard", config)?,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.endpoints
            .first_success(|ep| ep.get_json(path, &[]))
            .await
    }

    async fn get_optional<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        self.endpoints
            .first_success(|ep| ep.get_optional(path, &[]))
            .await
    }
}

#[async_trait]
impl PoolMetadataSource for MidgardClient {
    async fn get_pools(&self) -> Result<Vec<PoolDetail>> {
        self.get("/v2/pools").await
    }

    async fn get_latest_block_height(&self) -> Result<u64> {
        let health: Health = self.get("/v2/health").await?;
        Ok(health.last_thor_node.height)
    }

    async fn get_inbound_addresses(&self) -> Result<Vec<InboundAddress>> {
        self.get("/v2/thorchain/inbound_addresses").await
    }

    async fn get_network_values(&self) -> Result<HashMap<String, i64>> {
        let constants: Constants = self.get("/v2/thorchain/constants").await?;
        let mimir: HashMap<String, i64> = self.get("/v2/thorchain/mimir").await?;
        Ok(merge_network_values(constants.int_64_values, mimir))
    }

    async fn get_member(&self, address: &str) -> Result<MemberDetails> {
        let path = format!("/v2/member/{}", address);
        Ok(self.get_optional(&path).await?.unwrap_or_default())
    }

    async fn get_savers(&self, address: &str) -> Result<SaverDetails> {
        let path = format!("/v2/saver/{}", address);
        Ok(self.get_optional(&path).await?.unwrap_or_default())
    }

    async fn get_thorname_detail(&self, name: &str) -> Result<Option<ThornameLookup>> {
        let path = format!("/v2/thorname/lookup/{}", name);
        self.get_optional(&path).await
    }
}
