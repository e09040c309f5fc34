//! In-memory Midgard and Thornode stand-ins for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thorchain_client::{
    InboundAddress, LastBlock, LiquidityProvider, LoanCloseRequest, LoanOpenRequest,
    MemberDetails, NodeQuoteSource, PoolDetail, PoolMetadataSource, QuoteLoanCloseResponse,
    QuoteLoanOpenResponse, QuoteSaverDepositResponse, QuoteSaverWithdrawResponse,
    QuoteSwapResponse, Result, Saver, SaverDetails, SwapQuoteRequest, ThornameLookup,
    ThornameResponse, ThornodePool, TxDetailsResponse, TxOutItem,
};
use thorchain_core::{CacheConfig, ClientError};

use crate::cache::ThorchainCache;

fn offline(service: &'static str) -> ClientError {
    ClientError::Unreachable {
        url: format!("fake://{}", service),
        message: "offline".to_string(),
    }
}

#[derive(Default)]
pub struct FakeMidgard {
    pub pools: Vec<PoolDetail>,
    pub inbound: Vec<InboundAddress>,
    pub network_values: HashMap<String, i64>,
    pub block_height: u64,
    pub members: HashMap<String, MemberDetails>,
    pub savers: HashMap<String, SaverDetails>,
    pub thornames: HashMap<String, ThornameLookup>,
    pub offline: AtomicBool,
    pub pool_calls: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeMidgard {
    fn hit(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline("midgard"));
        }
        Ok(())
    }
}

#[async_trait]
impl PoolMetadataSource for FakeMidgard {
    async fn get_pools(&self) -> Result<Vec<PoolDetail>> {
        self.pool_calls.fetch_add(1, Ordering::SeqCst);
        self.hit()?;
        Ok(self.pools.clone())
    }

    async fn get_latest_block_height(&self) -> Result<u64> {
        self.hit()?;
        Ok(self.block_height)
    }

    async fn get_inbound_addresses(&self) -> Result<Vec<InboundAddress>> {
        self.hit()?;
        Ok(self.inbound.clone())
    }

    async fn get_network_values(&self) -> Result<HashMap<String, i64>> {
        self.hit()?;
        Ok(self.network_values.clone())
    }

    async fn get_member(&self, address: &str) -> Result<MemberDetails> {
        self.hit()?;
        Ok(self.members.get(address).cloned().unwrap_or_default())
    }

    async fn get_savers(&self, address: &str) -> Result<SaverDetails> {
        self.hit()?;
        Ok(self.savers.get(address).cloned().unwrap_or_default())
    }

    async fn get_thorname_detail(&self, name: &str) -> Result<Option<ThornameLookup>> {
        self.hit()?;
        Ok(self.thornames.get(name).cloned())
    }
}

#[derive(Default)]
pub struct FakeThornode {
    pub pools: Vec<ThornodePool>,
    pub swap_quote: QuoteSwapResponse,
    pub saver_deposit_quote: QuoteSaverDepositResponse,
    pub saver_withdraw_quote: QuoteSaverWithdrawResponse,
    pub loan_open_quote: QuoteLoanOpenResponse,
    pub loan_close_quote: QuoteLoanCloseResponse,
    pub thornames: HashMap<String, ThornameResponse>,
    pub last_blocks: Vec<LastBlock>,
    pub queue: Vec<TxOutItem>,
    /// Keyed by `(pool, address)`
    pub liquidity_providers: HashMap<(String, String), LiquidityProvider>,
    pub savers: HashMap<(String, String), Saver>,
    pub txs: HashMap<String, TxDetailsResponse>,
    pub constants: HashMap<String, i64>,
    pub offline: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeThornode {
    fn hit(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline("thornode"));
        }
        Ok(())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeQuoteSource for FakeThornode {
    async fn get_pools(&self) -> Result<Vec<ThornodePool>> {
        self.hit()?;
        Ok(self.pools.clone())
    }

    async fn get_swap_quote(&self, _request: &SwapQuoteRequest) -> Result<QuoteSwapResponse> {
        self.hit()?;
        Ok(self.swap_quote.clone())
    }

    async fn get_savers_deposit_quote(
        &self,
        _asset: &str,
        _amount: u128,
    ) -> Result<QuoteSaverDepositResponse> {
        self.hit()?;
        Ok(self.saver_deposit_quote.clone())
    }

    async fn get_savers_withdraw_quote(
        &self,
        _asset: &str,
        _address: &str,
        _withdraw_bps: u32,
    ) -> Result<QuoteSaverWithdrawResponse> {
        self.hit()?;
        Ok(self.saver_withdraw_quote.clone())
    }

    async fn get_loan_quote_open(&self, _request: &LoanOpenRequest) -> Result<QuoteLoanOpenResponse> {
        self.hit()?;
        Ok(self.loan_open_quote.clone())
    }

    async fn get_loan_quote_close(
        &self,
        _request: &LoanCloseRequest,
    ) -> Result<QuoteLoanCloseResponse> {
        self.hit()?;
        Ok(self.loan_close_quote.clone())
    }

    async fn get_thorname_details(
        &self,
        name: &str,
        _height: Option<u64>,
    ) -> Result<ThornameResponse> {
        self.hit()?;
        Ok(self.thornames.get(name).cloned().unwrap_or_else(|| ThornameResponse {
            error: Some("THORName doesn't exist".to_string()),
            ..Default::default()
        }))
    }

    async fn get_last_block(&self, _height: Option<u64>) -> Result<Vec<LastBlock>> {
        self.hit()?;
        Ok(self.last_blocks.clone())
    }

    async fn get_scheduled_outbound_queue(&self) -> Result<Vec<TxOutItem>> {
        self.hit()?;
        Ok(self.queue.clone())
    }

    async fn get_liquidity_provider(
        &self,
        pool: &str,
        address: &str,
    ) -> Result<Option<LiquidityProvider>> {
        self.hit()?;
        Ok(self
            .liquidity_providers
            .get(&(pool.to_string(), address.to_string()))
            .cloned())
    }

    async fn get_saver(&self, pool: &str, address: &str) -> Result<Option<Saver>> {
        self.hit()?;
        Ok(self.savers.get(&(pool.to_string(), address.to_string())).cloned())
    }

    async fn get_tx_detail(&self, hash: &str) -> Result<Option<TxDetailsResponse>> {
        self.hit()?;
        Ok(self.txs.get(hash).cloned())
    }

    async fn get_tc_constants(&self) -> Result<HashMap<String, i64>> {
        self.hit()?;
        Ok(self.constants.clone())
    }
}

// ─── Scenario ────────────────────────────────────────────────────────────────

/// 100 BTC / 2,500,000 RUNE with a savers vault
pub fn btc_pool() -> PoolDetail {
    PoolDetail {
        asset: "BTC.BTC".to_string(),
        asset_depth: "10000000000".to_string(),
        rune_depth: "250000000000000".to_string(),
        liquidity_units: "250000000000000".to_string(),
        units: "250000000000000".to_string(),
        synth_supply: "1000000000".to_string(),
        savers_depth: "2000000000".to_string(),
        savers_units: "1900000000".to_string(),
        status: "available".to_string(),
        native_decimal: "8".to_string(),
        ..Default::default()
    }
}

/// 1,000 ETH / 3,000,000 RUNE
pub fn eth_pool() -> PoolDetail {
    PoolDetail {
        asset: "ETH.ETH".to_string(),
        asset_depth: "100000000000".to_string(),
        rune_depth: "300000000000000".to_string(),
        liquidity_units: "300000000000000".to_string(),
        units: "300000000000000".to_string(),
        status: "available".to_string(),
        native_decimal: "18".to_string(),
        ..Default::default()
    }
}

pub fn inbound(chain: &str, gas_rate: &str, tx_size: &str, outbound_fee: &str) -> InboundAddress {
    InboundAddress {
        chain: chain.to_string(),
        address: format!("{}-vault", chain.to_ascii_lowercase()),
        router: None,
        gas_rate: gas_rate.to_string(),
        gas_rate_units: String::new(),
        outbound_tx_size: tx_size.to_string(),
        outbound_fee: outbound_fee.to_string(),
        dust_threshold: "0".to_string(),
        ..Default::default()
    }
}

pub fn network_values() -> HashMap<String, i64> {
    HashMap::from([
        ("MINTXOUTVOLUMETHRESHOLD".to_string(), 100_000_000_000),
        ("TXOUTDELAYRATE".to_string(), 2_500_000_000),
        ("MAXTXOUTOFFSET".to_string(), 720),
        ("FULLIMPLOSSPROTECTIONBLOCKS".to_string(), 1_440_000),
    ])
}

pub fn midgard() -> FakeMidgard {
    FakeMidgard {
        pools: vec![btc_pool(), eth_pool()],
        inbound: vec![
            inbound("BTC", "20", "1000", "30000"),
            inbound("ETH", "30", "0", "240000"),
        ],
        network_values: network_values(),
        block_height: 15_000_000,
        ..Default::default()
    }
}

pub fn thornode() -> FakeThornode {
    FakeThornode {
        pools: vec![ThornodePool {
            asset: "ETH.ETH".to_string(),
            decimals: Some(18),
            ..Default::default()
        }],
        last_blocks: vec![LastBlock {
            chain: "BTC".to_string(),
            last_observed_in: 820_000,
            last_signed_out: 820_000,
            thorchain: 15_000_000,
        }],
        ..Default::default()
    }
}

pub fn cache(midgard: Arc<FakeMidgard>, thornode: Arc<FakeThornode>) -> Arc<ThorchainCache> {
    Arc::new(ThorchainCache::new(midgard, thornode, &CacheConfig::default()))
}
