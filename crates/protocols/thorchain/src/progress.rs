//! Transaction progress tracking
//!
//! `TransactionTracker::check_tx_progress` looks an inbound hash up on the
//! node, classifies it once from its memo and runs a single enrichment step
//! for that type. Only the initial lookup can fail; enrichment problems leave
//! the detail record empty and are logged at debug.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use thorchain_client::{Tx, TxDetailsResponse};
use thorchain_core::{
    Asset, Chain, CryptoAmount, Error, QueryError, Result, BASE_DECIMALS, THOR_BLOCK_TIME_SECS,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::calculator::PoolShare;
use crate::constants::timing::{MIN_TX_HASH_LEN, SETTLED_HASH_CAPACITY};
use crate::estimates::SaverPosition;
use crate::memo::{classify, parse_memo, AddLpMemo, Memo, SwapMemo, TxType, WithdrawMemo};
use crate::pool::parse_int;
use crate::query::ThorchainQuery;

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundStatus {
    /// Seen by at least one signer
    Observed,
    /// Seen by a supermajority and processed
    ObservedConsensus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Complete,
    Incomplete,
}

/// Inbound leg as observed on its source chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundTx {
    pub status: InboundStatus,
    pub chain: Chain,
    pub from_address: String,
    pub memo: String,
    /// First coin of the transaction, in 1e8 base units
    pub amount: CryptoAmount,
    pub block: u64,
    pub date: DateTime<Utc>,
    pub expected_confirmation_block: u64,
    pub expected_confirmation_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapInfo {
    pub status: ProgressStatus,
    pub to_asset: Asset,
    pub destination: Option<String>,
    pub minimum_amount_out: CryptoAmount,
    /// At current pool depths
    pub expected_amount_out: CryptoAmount,
    pub actual_amount_out: Option<CryptoAmount>,
    pub streaming_quantity: Option<u64>,
    pub expected_out_block: u64,
    pub expected_out_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddLpInfo {
    pub status: ProgressStatus,
    pub pool: Asset,
    pub deposit: CryptoAmount,
    pub paired_address: Option<String>,
    pub is_symmetric: bool,
    pub expected_confirmation_date: DateTime<Utc>,
    pub pool_share: Option<PoolShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawInfo {
    pub status: ProgressStatus,
    pub pool: Asset,
    pub basis_points: u32,
    pub target_asset: Option<Asset>,
    pub withdrawn: Vec<CryptoAmount>,
    pub expected_out_block: u64,
    pub expected_out_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddSaverInfo {
    pub status: ProgressStatus,
    pub asset: Asset,
    pub deposit: CryptoAmount,
    pub expected_confirmation_date: DateTime<Utc>,
    pub position: Option<SaverPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawSaverInfo {
    pub status: ProgressStatus,
    pub asset: Asset,
    pub basis_points: u32,
    pub withdrawn: Option<CryptoAmount>,
    pub expected_out_block: u64,
    pub expected_out_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundInfo {
    pub status: ProgressStatus,
    pub to_address: String,
    pub refunded: Vec<CryptoAmount>,
    pub expected_out_block: u64,
    pub expected_out_date: DateTime<Utc>,
}

/// Type-specific progress, at most one per transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressDetail {
    Swap(SwapInfo),
    AddLp(AddLpInfo),
    WithdrawLp(WithdrawInfo),
    AddSaver(AddSaverInfo),
    WithdrawSaver(WithdrawSaverInfo),
    Refund(RefundInfo),
}

impl ProgressDetail {
    pub fn status(&self) -> ProgressStatus {
        match self {
            Self::Swap(info) => info.status,
            Self::AddLp(info) => info.status,
            Self::WithdrawLp(info) => info.status,
            Self::AddSaver(info) => info.status,
            Self::WithdrawSaver(info) => info.status,
            Self::Refund(info) => info.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxProgress {
    pub tx_type: TxType,
    pub inbound_observed: Option<InboundTx>,
    pub detail: Option<ProgressDetail>,
}

impl TxProgress {
    pub fn unknown() -> Self {
        Self {
            tx_type: TxType::Unknown,
            inbound_observed: None,
            detail: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.detail
            .as_ref()
            .is_some_and(|d| d.status() == ProgressStatus::Complete)
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Last block each chain was observed at, plus the THORChain height
#[derive(Debug, Clone)]
struct ChainHeights {
    thorchain: u64,
    observed: HashMap<String, u64>,
}

impl ChainHeights {
    fn observed_height(&self, chain: &Chain) -> u64 {
        if *chain == Chain::Thor {
            return self.thorchain;
        }
        self.observed
            .get(chain.as_str())
            .copied()
            .unwrap_or_default()
    }
}

/// Wall-clock estimate of `target` given the chain is at `current`
fn block_date(current: u64, target: u64, block_secs: u64, now: DateTime<Utc>) -> DateTime<Utc> {
    let delta = target as i64 - current as i64;
    now + ChronoDuration::seconds(delta.saturating_mul(block_secs as i64))
}

/// Coins of the outbound transactions; unparseable coins are skipped
fn out_coins(out_txs: &[Tx]) -> Vec<CryptoAmount> {
    out_txs
        .iter()
        .flat_map(|tx| tx.coins.iter())
        .filter_map(|coin| match coin.asset.parse::<Asset>() {
            Ok(asset) => Some(CryptoAmount::new(parse_int(&coin.amount), BASE_DECIMALS, asset)),
            Err(e) => {
                debug!("Skipping outbound coin {}: {}", coin.asset, e);
                None
            }
        })
        .collect()
}

/// Sum of the outbound coins paid in `asset`
fn out_amount(out_txs: &[Tx], asset: &Asset) -> Option<CryptoAmount> {
    out_coins(out_txs)
        .into_iter()
        .filter(|coin| coin.asset() == asset)
        .reduce(|total, coin| {
            CryptoAmount::new(
                total.base_amount() + coin.base_amount(),
                BASE_DECIMALS,
                asset.clone(),
            )
        })
}

fn status_of(out_txs: &[Tx]) -> ProgressStatus {
    if out_txs.is_empty() {
        ProgressStatus::Incomplete
    } else {
        ProgressStatus::Complete
    }
}

fn inbound_tx(
    response: &TxDetailsResponse,
    heights: &ChainHeights,
    now: DateTime<Utc>,
) -> Result<InboundTx> {
    let observed = &response.tx;
    let chain: Chain = observed.tx.chain.parse()?;
    let coin = observed.tx.coins.first().ok_or_else(|| QueryError::InvalidParams {
        reason: format!("transaction {} carries no coins", observed.tx.id),
    })?;
    let asset: Asset = coin.asset.parse()?;
    let block_secs = chain.attributes()?.avg_block_time_secs;

    let current = heights.observed_height(&chain);
    let block = if observed.block_height > 0 {
        observed.block_height
    } else {
        current
    };
    let confirmation_block = observed.finalise_height.max(block);

    Ok(InboundTx {
        status: if observed.status == "done" {
            InboundStatus::ObservedConsensus
        } else {
            InboundStatus::Observed
        },
        chain,
        from_address: observed.tx.from_address.clone(),
        memo: observed.tx.memo.clone(),
        amount: CryptoAmount::new(parse_int(&coin.amount), BASE_DECIMALS, asset),
        block,
        date: block_date(current, block, block_secs, now),
        expected_confirmation_block: confirmation_block,
        expected_confirmation_date: block_date(current, confirmation_block, block_secs, now),
    })
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

/// Most recently settled hashes; the oldest is forgotten once `capacity` is
/// reached
struct SettledHashes {
    order: VecDeque<String>,
    hashes: HashSet<String>,
    capacity: usize,
}

impl SettledHashes {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            hashes: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    fn insert(&mut self, hash: &str) {
        if !self.hashes.insert(hash.to_string()) {
            return;
        }
        self.order.push_back(hash.to_string());
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.hashes.remove(&oldest);
            }
        }
    }
}

pub struct TransactionTracker {
    query: Arc<ThorchainQuery>,
    settled: Mutex<SettledHashes>,
}

impl TransactionTracker {
    pub fn new(query: Arc<ThorchainQuery>) -> Self {
        Self {
            query,
            settled: Mutex::new(SettledHashes::new(SETTLED_HASH_CAPACITY)),
        }
    }

    /// True once a previous check saw the transaction complete
    pub async fn is_settled(&self, hash: &str) -> bool {
        self.settled.lock().await.contains(hash.trim())
    }

    /// Progress of the transaction with inbound hash `hash`. Meant to be polled.
    pub async fn check_tx_progress(&self, hash: &str) -> Result<TxProgress> {
        let hash = hash.trim();
        if hash.len() < MIN_TX_HASH_LEN {
            debug!(hash, "Hash too short, not looking it up");
            return Ok(TxProgress::unknown());
        }

        let thornode = self.query.cache().thornode();
        let response = match thornode.get_tx_detail(hash).await {
            Ok(Some(response)) if !response.tx.tx.id.is_empty() => response,
            Ok(_) => {
                debug!(hash, "Transaction not found");
                return Ok(TxProgress::unknown());
            }
            Err(e) => {
                return Err(QueryError::TxLookup {
                    hash: hash.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
        };

        let memo = parse_memo(&response.tx.tx.memo);
        let tx_type = classify(&memo);
        let now = Utc::now();

        let heights = match self.chain_heights().await {
            Ok(heights) => Some(heights),
            Err(e) => {
                debug!(hash, "Chain heights unavailable: {}", e);
                None
            }
        };
        let inbound = heights.as_ref().and_then(|heights| {
            inbound_tx(&response, heights, now)
                .map_err(|e| debug!(hash, "Inbound record incomplete: {}", e))
                .ok()
        });
        let detail = match (&heights, &inbound) {
            (Some(heights), Some(inbound)) => {
                match self.enrich(tx_type, &memo, &response, inbound, heights, now).await {
                    Ok(detail) => detail,
                    Err(e) => {
                        debug!(hash, tx_type = %tx_type, "Enrichment failed: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let progress = TxProgress {
            tx_type,
            inbound_observed: inbound,
            detail,
        };
        if progress.is_complete() {
            self.settled.lock().await.insert(hash);
        }
        Ok(progress)
    }

    async fn chain_heights(&self) -> Result<ChainHeights> {
        let blocks = self.query.cache().thornode().get_last_block(None).await?;
        let thorchain = match blocks.iter().map(|b| b.thorchain).max() {
            Some(height) if height > 0 => height,
            _ => self.query.cache().midgard().get_latest_block_height().await?,
        };
        Ok(ChainHeights {
            thorchain,
            observed: blocks
                .into_iter()
                .map(|b| (b.chain.to_ascii_uppercase(), b.last_observed_in))
                .collect(),
        })
    }

    async fn enrich(
        &self,
        tx_type: TxType,
        memo: &Memo,
        response: &TxDetailsResponse,
        inbound: &InboundTx,
        heights: &ChainHeights,
        now: DateTime<Utc>,
    ) -> Result<Option<ProgressDetail>> {
        let out_block = response
            .outbound_height
            .unwrap_or_else(|| response.finalised_height.max(heights.thorchain));
        let out_date = block_date(heights.thorchain, out_block, THOR_BLOCK_TIME_SECS, now);

        let detail = match tx_type {
            TxType::Swap => {
                let swap = SwapMemo::parse(memo)?;
                let expected = self
                    .query
                    .cache()
                    .expected_swap_output(&inbound.amount, &swap.asset)
                    .await?
                    .output;
                let actual = out_amount(&response.out_txs, &swap.asset)
                    .map(|amount| amount.rescale(expected.decimals()));
                Some(ProgressDetail::Swap(SwapInfo {
                    status: status_of(&response.out_txs),
                    minimum_amount_out: CryptoAmount::new(
                        swap.limit.unwrap_or_default(),
                        BASE_DECIMALS,
                        swap.asset.clone(),
                    ),
                    to_asset: swap.asset,
                    destination: swap.destination,
                    expected_amount_out: expected,
                    actual_amount_out: actual,
                    streaming_quantity: swap.streaming_quantity,
                    expected_out_block: out_block,
                    expected_out_date: out_date,
                }))
            }
            TxType::AddLp => {
                let add = AddLpMemo::parse(memo)?;
                let position = match self
                    .query
                    .check_liquidity_position(&add.pool, &inbound.from_address)
                    .await
                {
                    Ok(position) => Some(position),
                    Err(Error::Query(QueryError::PositionNotFound { .. })) => None,
                    Err(e) => return Err(e),
                };
                // A pending side means the paired deposit hasn't arrived
                let settled = position.as_ref().is_some_and(|p| {
                    parse_int(&p.position.pending_asset).is_zero()
                        && parse_int(&p.position.pending_rune).is_zero()
                });
                Some(ProgressDetail::AddLp(AddLpInfo {
                    status: if settled {
                        ProgressStatus::Complete
                    } else {
                        ProgressStatus::Incomplete
                    },
                    pool: add.pool,
                    deposit: inbound.amount.clone(),
                    is_symmetric: add.paired_address.is_some(),
                    paired_address: add.paired_address,
                    expected_confirmation_date: inbound.expected_confirmation_date,
                    pool_share: position.map(|p| p.pool_share),
                }))
            }
            TxType::WithdrawLp => {
                let withdraw = WithdrawMemo::parse(memo)?;
                Some(ProgressDetail::WithdrawLp(WithdrawInfo {
                    status: status_of(&response.out_txs),
                    pool: withdraw.pool,
                    basis_points: withdraw.basis_points,
                    target_asset: withdraw.asset,
                    withdrawn: out_coins(&response.out_txs),
                    expected_out_block: out_block,
                    expected_out_date: out_date,
                }))
            }
            TxType::AddSaver => {
                let asset = AddLpMemo::parse(memo)?.pool.to_layer1();
                let position = self
                    .query
                    .get_saver_position(&asset, &inbound.from_address)
                    .await?;
                let found = position.errors.is_empty();
                Some(ProgressDetail::AddSaver(AddSaverInfo {
                    status: if found {
                        ProgressStatus::Complete
                    } else {
                        ProgressStatus::Incomplete
                    },
                    asset,
                    deposit: inbound.amount.clone(),
                    expected_confirmation_date: inbound.expected_confirmation_date,
                    position: found.then_some(position),
                }))
            }
            TxType::WithdrawSaver => {
                let withdraw = WithdrawMemo::parse(memo)?;
                let asset = withdraw.pool.to_layer1();
                Some(ProgressDetail::WithdrawSaver(WithdrawSaverInfo {
                    status: status_of(&response.out_txs),
                    withdrawn: out_amount(&response.out_txs, &asset),
                    asset,
                    basis_points: withdraw.basis_points,
                    expected_out_block: out_block,
                    expected_out_date: out_date,
                }))
            }
            TxType::Refund => Some(ProgressDetail::Refund(RefundInfo {
                status: status_of(&response.out_txs),
                to_address: inbound.from_address.clone(),
                refunded: out_coins(&response.out_txs),
                expected_out_block: out_block,
                expected_out_date: out_date,
            })),
            TxType::Other | TxType::Unknown => None,
        };

        Ok(detail)
    }
}
