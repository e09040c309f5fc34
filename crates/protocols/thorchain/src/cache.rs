//! Pool and network cache
//!
//! Four slots, each with its own TTL, refreshed lazily on read. A slot whose
//! refresh fails keeps serving its last good value; only a slot that has
//! never loaded surfaces the error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use num_bigint::BigInt;
use rust_decimal::Decimal;
use thorchain_client::{InboundAddress, NodeQuoteSource, PoolMetadataSource, ThornodePool};
use thorchain_core::{
    pow10, ratio_to_decimal, Asset, CacheConfig, Chain, CryptoAmount, Error, QueryError, Result,
    BASE_DECIMALS,
};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::calculator::{double_swap, single_swap, SwapOutput};
use crate::inbound::{build_inbound_details, InboundDetail};
use crate::pool::LiquidityPool;

// ─── Slot ────────────────────────────────────────────────────────────────────

struct CacheEntry<T> {
    value: Arc<T>,
    last_refreshed: Instant,
}

/// One TTL-bounded value with a single-flight refresh guard
pub struct CacheSlot<T> {
    name: &'static str,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry<T>>>,
    refresh_guard: Mutex<()>,
}

impl<T: Send + Sync> CacheSlot<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entry: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    async fn fresh_value(&self) -> Option<Arc<T>> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|e| e.last_refreshed.elapsed() <= self.ttl)
            .map(|e| e.value.clone())
    }

    /// Return the cached value, refreshing first when it is older than the TTL.
    ///
    /// Concurrent stale readers wait on one refresh and re-check before
    /// starting another.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.fresh_value().await {
            return Ok(value);
        }

        let _guard = self.refresh_guard.lock().await;
        if let Some(value) = self.fresh_value().await {
            return Ok(value);
        }

        match refresh().await {
            Ok(value) => {
                let value = Arc::new(value);
                *self.entry.write().await = Some(CacheEntry {
                    value: value.clone(),
                    last_refreshed: Instant::now(),
                });
                debug!(slot = self.name, "Cache slot refreshed");
                Ok(value)
            }
            Err(e) => {
                let stale = self.entry.read().await.as_ref().map(|e| e.value.clone());
                match stale {
                    Some(value) => {
                        warn!(slot = self.name, "Refresh failed: {}, serving stale value", e);
                        Ok(value)
                    }
                    None => Err(QueryError::CacheUnavailable {
                        slot: self.name,
                        reason: e.to_string(),
                    }
                    .into()),
                }
            }
        }
    }

    /// Drop the cached value so the next read refreshes
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// Shared read-through cache over the Midgard and Thornode collaborators
pub struct ThorchainCache {
    midgard: Arc<dyn PoolMetadataSource>,
    thornode: Arc<dyn NodeQuoteSource>,
    pools: CacheSlot<HashMap<String, LiquidityPool>>,
    inbound_addresses: CacheSlot<Vec<InboundAddress>>,
    inbound_details: CacheSlot<HashMap<Chain, InboundDetail>>,
    network_values: CacheSlot<HashMap<String, i64>>,
}

impl ThorchainCache {
    pub fn new(
        midgard: Arc<dyn PoolMetadataSource>,
        thornode: Arc<dyn NodeQuoteSource>,
        config: &CacheConfig,
    ) -> Self {
        let ttl = Duration::from_millis;
        Self {
            midgard,
            thornode,
            pools: CacheSlot::new("pools", ttl(config.pool_ttl_ms)),
            inbound_addresses: CacheSlot::new(
                "inbound_addresses",
                ttl(config.inbound_addresses_ttl_ms),
            ),
            inbound_details: CacheSlot::new("inbound_details", ttl(config.inbound_details_ttl_ms)),
            network_values: CacheSlot::new("network_values", ttl(config.network_values_ttl_ms)),
        }
    }

    pub fn midgard(&self) -> &Arc<dyn PoolMetadataSource> {
        &self.midgard
    }

    pub fn thornode(&self) -> &Arc<dyn NodeQuoteSource> {
        &self.thornode
    }

    /// All pools keyed by pool key (`CHAIN.TICKER`)
    pub async fn get_pools(&self) -> Result<Arc<HashMap<String, LiquidityPool>>> {
        self.pools.get_or_refresh(|| self.refresh_pools()).await
    }

    async fn refresh_pools(&self) -> Result<HashMap<String, LiquidityPool>> {
        let (details, node_pools) =
            tokio::try_join!(self.midgard.get_pools(), self.thornode.get_pools())?;
        let node_by_asset: HashMap<&str, &ThornodePool> =
            node_pools.iter().map(|p| (p.asset.as_str(), p)).collect();

        let mut pools = HashMap::with_capacity(details.len());
        for detail in &details {
            let node = node_by_asset.get(detail.asset.as_str()).copied();
            match LiquidityPool::from_snapshots(detail, node) {
                Ok(pool) => {
                    pools.insert(pool.asset.pool_key(), pool);
                }
                Err(e) => warn!("Skipping pool {}: {}", detail.asset, e),
            }
        }
        debug!(pools = pools.len(), "Loaded pools");
        Ok(pools)
    }

    /// Pool an asset trades in. Synths resolve to their layer-1 pool.
    pub async fn get_pool_for_asset(&self, asset: &Asset) -> Result<LiquidityPool> {
        if asset.is_rune() {
            return Err(QueryError::NoPoolForNativeAsset {
                asset: asset.to_string(),
            }
            .into());
        }
        let pools = self.get_pools().await?;
        pools.get(&asset.pool_key()).cloned().ok_or_else(|| {
            QueryError::PoolNotFound {
                asset: asset.to_string(),
            }
            .into()
        })
    }

    pub async fn get_inbound_addresses(&self) -> Result<Arc<Vec<InboundAddress>>> {
        self.inbound_addresses
            .get_or_refresh(|| async { Ok::<_, Error>(self.midgard.get_inbound_addresses().await?) })
            .await
    }

    /// Per-chain gas parameters and halt flags, including a THOR entry
    pub async fn get_inbound_details(&self) -> Result<Arc<HashMap<Chain, InboundDetail>>> {
        self.inbound_details
            .get_or_refresh(|| async {
                // Gas rates move every block; bypass the long-lived address slot
                let addresses = self.midgard.get_inbound_addresses().await?;
                let values = self.get_network_values().await?;
                Ok::<_, Error>(build_inbound_details(&addresses, &values))
            })
            .await
    }

    pub async fn get_inbound_detail(&self, chain: &Chain) -> Result<InboundDetail> {
        let details = self.get_inbound_details().await?;
        details.get(chain).cloned().ok_or_else(|| {
            QueryError::UnknownChain {
                chain: chain.to_string(),
            }
            .into()
        })
    }

    /// Network constants merged with mimir, keys upper-cased
    pub async fn get_network_values(&self) -> Result<Arc<HashMap<String, i64>>> {
        self.network_values
            .get_or_refresh(|| async { Ok::<_, Error>(self.midgard.get_network_values().await?) })
            .await
    }

    pub async fn get_network_value(&self, key: &str) -> Result<i64> {
        let values = self.get_network_values().await?;
        values.get(key).copied().ok_or_else(|| {
            QueryError::MissingNetworkValue {
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Native precision of an asset: 8 for rune and synths, else the pool's
    pub async fn decimals_for(&self, asset: &Asset) -> Result<u8> {
        if asset.is_rune() || asset.is_synth() {
            return Ok(BASE_DECIMALS);
        }
        Ok(self.get_pool_for_asset(asset).await?.decimals)
    }

    /// Exact `(numerator, denominator)` price of one unit of `from` in `to`
    async fn rate_fraction(&self, from: &Asset, to: &Asset) -> Result<(BigInt, BigInt)> {
        let one = || (BigInt::from(1), BigInt::from(1));
        match (from.is_rune(), to.is_rune()) {
            (true, true) => Ok(one()),
            (true, false) => {
                let pool = self.get_pool_for_asset(to).await?;
                Ok((pool.asset_depth().clone(), pool.rune_depth().clone()))
            }
            (false, true) => {
                let pool = self.get_pool_for_asset(from).await?;
                Ok((pool.rune_depth().clone(), pool.asset_depth().clone()))
            }
            (false, false) if from.pool_key() == to.pool_key() => Ok(one()),
            (false, false) => {
                let from_pool = self.get_pool_for_asset(from).await?;
                let to_pool = self.get_pool_for_asset(to).await?;
                Ok((
                    from_pool.rune_depth() * to_pool.asset_depth(),
                    from_pool.asset_depth() * to_pool.rune_depth(),
                ))
            }
        }
    }

    /// Units of `to` one unit of `from` is worth at pool prices
    pub async fn get_exchange_rate(&self, from: &Asset, to: &Asset) -> Result<Decimal> {
        let (num, den) = self.rate_fraction(from, to).await?;
        Ok(ratio_to_decimal(&num, &den))
    }

    /// Value `input` in `to`, at `to`'s native precision
    pub async fn convert(&self, input: &CryptoAmount, to: &Asset) -> Result<CryptoAmount> {
        let (num, den) = self.rate_fraction(input.asset(), to).await?;
        let out_decimals = self.decimals_for(to).await?;
        let converted = input.mul_ratio(
            &(num * pow10(out_decimals as u32)),
            &(den * pow10(input.decimals() as u32)),
        );
        Ok(CryptoAmount::new(
            converted.base_amount().clone(),
            out_decimals,
            to.clone(),
        ))
    }

    /// Output of swapping `input` into `dest` at current depths
    pub async fn expected_swap_output(&self, input: &CryptoAmount, dest: &Asset) -> Result<SwapOutput> {
        let from = input.asset();
        let result = if from.is_rune() {
            let pool = self.get_pool_for_asset(dest).await?;
            single_swap(input, &pool, false)
        } else if dest.is_rune() {
            let pool = self.get_pool_for_asset(from).await?;
            single_swap(input, &pool, true)
        } else {
            let from_pool = self.get_pool_for_asset(from).await?;
            let to_pool = self.get_pool_for_asset(dest).await?;
            double_swap(input, &from_pool, &to_pool)
        };

        let decimals = self.decimals_for(dest).await?;
        let relabel = |amount: &CryptoAmount| {
            if amount.asset().is_rune() {
                amount.clone()
            } else {
                amount.with_asset(dest.clone()).rescale(decimals)
            }
        };
        Ok(SwapOutput {
            output: relabel(&result.output),
            swap_fee: relabel(&result.swap_fee),
            slip: result.slip,
        })
    }
}
