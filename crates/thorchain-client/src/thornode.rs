//! Thornode: live quotes and ledger state

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thorchain_core::EndpointConfig;

use crate::failover::Failover;
use crate::http::{push_opt, HttpEndpoint, RemoteError};
use crate::{NodeQuoteSource, Result};

// ─── Ledger models ───────────────────────────────────────────────────────────

/// Pool as seen by the node (`/thorchain/pools`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThornodePool {
    pub asset: String,
    pub status: String,
    pub decimals: Option<i64>,
    pub balance_asset: String,
    pub balance_rune: String,
    pub pool_units: String,
    #[serde(rename = "LP_units")]
    pub lp_units: String,
    pub synth_units: String,
    pub synth_supply: String,
    pub savers_depth: String,
    pub savers_units: String,
    pub synth_mint_paused: bool,
    pub pending_inbound_asset: String,
    pub pending_inbound_rune: String,
}

/// Per-chain heights from `/thorchain/lastblock`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LastBlock {
    pub chain: String,
    pub last_observed_in: u64,
    pub last_signed_out: u64,
    pub thorchain: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Coin {
    pub asset: String,
    pub amount: String,
    pub decimals: Option<i64>,
}

/// Outbound waiting in the scheduled queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TxOutItem {
    pub chain: String,
    pub to_address: String,
    pub vault_pub_key: String,
    pub coin: Coin,
    pub memo: String,
    pub max_gas: Vec<Coin>,
    pub gas_rate: Option<i64>,
    pub in_hash: String,
    pub out_hash: String,
    pub height: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityProvider {
    pub asset: String,
    pub rune_address: Option<String>,
    pub asset_address: Option<String>,
    pub last_add_height: u64,
    pub last_withdraw_height: u64,
    pub units: String,
    pub pending_rune: String,
    pub pending_asset: String,
    pub pending_tx_id: Option<String>,
    pub rune_deposit_value: String,
    pub asset_deposit_value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Saver {
    pub asset: String,
    pub asset_address: String,
    pub last_add_height: u64,
    pub last_withdraw_height: u64,
    pub units: String,
    pub asset_deposit_value: String,
    pub asset_redeem_value: String,
    pub growth_pct: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tx {
    pub id: String,
    pub chain: String,
    pub from_address: String,
    pub to_address: String,
    pub coins: Vec<Coin>,
    pub gas: Vec<Coin>,
    pub memo: String,
}

/// Inbound transaction as witnessed by the vault signers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservedTx {
    pub tx: Tx,
    pub status: String,
    pub out_hashes: Vec<String>,
    pub block_height: u64,
    pub finalise_height: u64,
    pub observed_pub_key: String,
}

/// `/thorchain/tx/details/{hash}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TxDetailsResponse {
    pub tx_id: String,
    pub tx: ObservedTx,
    pub txs: Vec<ObservedTx>,
    pub actions: Vec<TxOutItem>,
    pub out_txs: Vec<Tx>,
    pub consensus_height: u64,
    pub finalised_height: u64,
    pub updated_vault: bool,
    pub reverted: bool,
    pub outbound_height: Option<u64>,
}

// ─── Quote models ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteFees {
    pub asset: String,
    pub affiliate: Option<String>,
    pub outbound: Option<String>,
    pub liquidity: Option<String>,
    pub total: Option<String>,
    pub slippage_bps: Option<u32>,
    pub total_bps: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteSwapResponse {
    pub inbound_address: Option<String>,
    pub inbound_confirmation_blocks: Option<u64>,
    pub inbound_confirmation_seconds: Option<u64>,
    pub outbound_delay_blocks: Option<u64>,
    pub outbound_delay_seconds: Option<u64>,
    pub fees: QuoteFees,
    pub router: Option<String>,
    pub expiry: i64,
    pub warning: String,
    pub notes: String,
    pub dust_threshold: Option<String>,
    pub recommended_min_amount_in: Option<String>,
    pub recommended_gas_rate: Option<String>,
    pub gas_rate_units: Option<String>,
    pub memo: Option<String>,
    pub expected_amount_out: String,
    pub max_streaming_quantity: Option<u64>,
    pub streaming_swap_blocks: Option<u64>,
    pub streaming_swap_seconds: Option<u64>,
    pub total_swap_seconds: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteSaverDepositResponse {
    pub inbound_address: String,
    pub inbound_confirmation_blocks: Option<u64>,
    pub inbound_confirmation_seconds: Option<u64>,
    pub fees: QuoteFees,
    pub expiry: i64,
    pub warning: String,
    pub notes: String,
    pub recommended_min_amount_in: Option<String>,
    pub memo: String,
    pub expected_amount_out: Option<String>,
    pub expected_amount_deposit: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteSaverWithdrawResponse {
    pub inbound_address: String,
    pub inbound_confirmation_blocks: Option<u64>,
    pub inbound_confirmation_seconds: Option<u64>,
    pub outbound_delay_blocks: u64,
    pub outbound_delay_seconds: u64,
    pub fees: QuoteFees,
    pub expiry: i64,
    pub warning: String,
    pub notes: String,
    pub dust_threshold: Option<String>,
    pub dust_amount: String,
    pub memo: String,
    pub expected_amount_out: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteLoanOpenResponse {
    pub inbound_address: Option<String>,
    pub inbound_confirmation_blocks: Option<u64>,
    pub inbound_confirmation_seconds: Option<u64>,
    pub outbound_delay_blocks: Option<u64>,
    pub outbound_delay_seconds: Option<u64>,
    pub fees: QuoteFees,
    pub router: Option<String>,
    pub expiry: i64,
    pub warning: String,
    pub notes: String,
    pub dust_threshold: Option<String>,
    pub recommended_min_amount_in: Option<String>,
    pub memo: Option<String>,
    pub expected_amount_out: String,
    pub expected_collateralization_ratio: String,
    pub expected_collateral_deposited: String,
    pub expected_debt_issued: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteLoanCloseResponse {
    pub inbound_address: Option<String>,
    pub inbound_confirmation_blocks: Option<u64>,
    pub inbound_confirmation_seconds: Option<u64>,
    pub outbound_delay_blocks: Option<u64>,
    pub outbound_delay_seconds: Option<u64>,
    pub fees: QuoteFees,
    pub router: Option<String>,
    pub expiry: i64,
    pub warning: String,
    pub notes: String,
    pub dust_threshold: Option<String>,
    pub recommended_min_amount_in: Option<String>,
    pub memo: Option<String>,
    pub expected_amount_out: String,
    pub expected_amount_in: String,
    pub expected_collateral_withdrawn: String,
    pub expected_debt_repaid: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThornameAlias {
    pub chain: String,
    pub address: String,
}

/// `/thorchain/thorname/{name}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThornameResponse {
    pub name: String,
    pub expire_block_height: u64,
    pub owner: String,
    pub preferred_asset: String,
    pub affiliate_collector_rune: Option<String>,
    pub aliases: Vec<ThornameAlias>,
    pub error: Option<String>,
}

macro_rules! remote_error {
    ($($ty:ty),* $(,)?) => {
        $(impl RemoteError for $ty {
            fn set_error(&mut self, message: String) {
                self.error = Some(message);
            }
        })*
    };
}

remote_error!(
    QuoteSwapResponse,
    QuoteSaverDepositResponse,
    QuoteSaverWithdrawResponse,
    QuoteLoanOpenResponse,
    QuoteLoanCloseResponse,
    ThornameResponse,
);

// ─── Request parameters ──────────────────────────────────────────────────────

/// Query for `/thorchain/quote/swap`; `amount` is in 1e8 base units
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwapQuoteRequest {
    pub from_asset: String,
    pub to_asset: String,
    pub amount: u128,
    pub destination: Option<String>,
    pub streaming_interval: Option<u64>,
    pub streaming_quantity: Option<u64>,
    pub tolerance_bps: Option<u32>,
    pub affiliate_bps: Option<u32>,
    pub affiliate: Option<String>,
    pub height: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanOpenRequest {
    pub from_asset: String,
    pub amount: u128,
    pub to_asset: String,
    pub destination: String,
    pub min_out: Option<String>,
    pub affiliate_bps: Option<u32>,
    pub affiliate: Option<String>,
    pub height: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanCloseRequest {
    pub from_asset: String,
    pub repay_bps: u32,
    pub to_asset: String,
    pub loan_owner: String,
    pub min_out: Option<String>,
    pub height: Option<u64>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// HTTP Thornode client over an ordered endpoint list
#[derive(Debug, Clone)]
pub struct ThornodeClient {
    endpoints: Failover<HttpEndpoint>,
}

impl ThornodeClient {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            endpoints: HttpEndpoint::failover("THORNode", config)?,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        self.endpoints
            .first_success(|ep| ep.get_json(path, query))
            .await
    }

    async fn get_optional<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        self.endpoints
            .first_success(|ep| ep.get_optional(path, &[]))
            .await
    }

    async fn quote<T: serde::de::DeserializeOwned + RemoteError>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        self.endpoints
            .first_success(|ep| ep.get_quote(path, query))
            .await
    }
}

fn height_query(height: Option<u64>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    push_opt(&mut query, "height", height);
    query
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct NodeConstants {
    int_64_values: HashMap<String, i64>,
}

#[async_trait]
impl NodeQuoteSource for ThornodeClient {
    async fn get_pools(&self) -> Result<Vec<ThornodePool>> {
        self.get("/thorchain/pools", &[]).await
    }

    async fn get_swap_quote(&self, request: &SwapQuoteRequest) -> Result<QuoteSwapResponse> {
        let mut query = vec![
            ("from_asset", request.from_asset.clone()),
            ("to_asset", request.to_asset.clone()),
            ("amount", request.amount.to_string()),
        ];
        push_opt(&mut query, "destination", request.destination.as_ref());
        push_opt(&mut query, "streaming_interval", request.streaming_interval);
        push_opt(&mut query, "streaming_quantity", request.streaming_quantity);
        push_opt(&mut query, "tolerance_bps", request.tolerance_bps);
        push_opt(&mut query, "affiliate_bps", request.affiliate_bps);
        push_opt(&mut query, "affiliate", request.affiliate.as_ref());
        push_opt(&mut query, "height", request.height);
        self.quote("/thorchain/quote/swap", &query).await
    }

    async fn get_savers_deposit_quote(
        &self,
        asset: &str,
        amount: u128,
    ) -> Result<QuoteSaverDepositResponse> {
        let query = vec![("asset", asset.to_string()), ("amount", amount.to_string())];
        self.quote("/thorchain/quote/saver/deposit", &query).await
    }

    async fn get_savers_withdraw_quote(
        &self,
        asset: &str,
        address: &str,
        withdraw_bps: u32,
    ) -> Result<QuoteSaverWithdrawResponse> {
        let query = vec![
            ("asset", asset.to_string()),
            ("address", address.to_string()),
            ("withdraw_bps", withdraw_bps.to_string()),
        ];
        self.quote("/thorchain/quote/saver/withdraw", &query).await
    }

    async fn get_loan_quote_open(&self, request: &LoanOpenRequest) -> Result<QuoteLoanOpenResponse> {
        let mut query = vec![
            ("from_asset", request.from_asset.clone()),
            ("amount", request.amount.to_string()),
            ("to_asset", request.to_asset.clone()),
            ("destination", request.destination.clone()),
        ];
        push_opt(&mut query, "min_out", request.min_out.as_ref());
        push_opt(&mut query, "affiliate_bps", request.affiliate_bps);
        push_opt(&mut query, "affiliate", request.affiliate.as_ref());
        push_opt(&mut query, "height", request.height);
        self.quote("/thorchain/quote/loan/open", &query).await
    }

    async fn get_loan_quote_close(
        &self,
        request: &LoanCloseRequest,
    ) -> Result<QuoteLoanCloseResponse> {
        let mut query = vec![
            ("from_asset", request.from_asset.clone()),
            ("repay_bps", request.repay_bps.to_string()),
            ("to_asset", request.to_asset.clone()),
            ("loan_owner", request.loan_owner.clone()),
        ];
        push_opt(&mut query, "min_out", request.min_out.as_ref());
        push_opt(&mut query, "height", request.height);
        self.quote("/thorchain/quote/loan/close", &query).await
    }

    async fn get_thorname_details(
        &self,
        name: &str,
        height: Option<u64>,
    ) -> Result<ThornameResponse> {
        let path = format!("/thorchain/thorname/{}", name);
        self.quote(&path, &height_query(height)).await
    }

    async fn get_last_block(&self, height: Option<u64>) -> Result<Vec<LastBlock>> {
        self.get("/thorchain/lastblock", &height_query(height)).await
    }

    async fn get_scheduled_outbound_queue(&self) -> Result<Vec<TxOutItem>> {
        self.get("/thorchain/queue/scheduled", &[]).await
    }

    async fn get_liquidity_provider(
        &self,
        pool: &str,
        address: &str,
    ) -> Result<Option<LiquidityProvider>> {
        let path = format!("/thorchain/pool/{}/liquidity_provider/{}", pool, address);
        self.get_optional(&path).await
    }

    async fn get_saver(&self, pool: &str, address: &str) -> Result<Option<Saver>> {
        let path = format!("/thorchain/pool/{}/saver/{}", pool, address);
        self.get_optional(&path).await
    }

    async fn get_tx_detail(&self, hash: &str) -> Result<Option<TxDetailsResponse>> {
        let path = format!("/thorchain/tx/details/{}", hash);
        self.get_optional(&path).await
    }

    async fn get_tc_constants(&self) -> Result<HashMap<String, i64>> {
        let constants: NodeConstants = self.get("/thorchain/constants", &[]).await?;
        Ok(constants
            .int_64_values
            .into_iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), v))
            .collect())
    }
}
