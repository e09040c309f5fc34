//! Quoting orchestrator
//!
//! Turns user intents (swap, add/withdraw liquidity, savers, loans,
//! THORNames) into estimates. Input problems the user can fix are reported
//! in the estimate's `errors` list; only lookups that cannot proceed
//! (unknown pool, unknown chain, cold cache) return `Err`.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thorchain_client::{
    LiquidityProvider, LoanCloseRequest, LoanOpenRequest, MemberPool, NodeQuoteSource,
    PoolMetadataSource, QuoteFees, Saver, SaverPool, SwapQuoteRequest, ThornameAlias,
};
use thorchain_core::{
    ratio_to_decimal, Asset, Chain, CryptoAmount, QueryError, Result, BASE_DECIMALS,
    THOR_BLOCK_TIME_SECS,
};
use tracing::{debug, warn};

use crate::cache::ThorchainCache;
use crate::calculator::{
    impermanent_loss, liquidity_units, pool_ownership, pool_share, slip_on_liquidity, PoolShare,
    ProtectionBlocks,
};
use crate::constants::{network_keys, timing, MAX_BPS};
use crate::estimates::{
    EstimateAddLp, EstimateAddSaver, EstimateWithdrawLp, EstimateWithdrawSaver, IlProtection,
    LiquidityPosition, LoanCloseQuote, LoanFees, LoanOpenQuote, LpFees, SaverFees, SaverPosition,
    SwapFees, ThornameDetails, ThornameQuote, TxDetails, TxEstimate,
};
use crate::fees::{calc_network_fee, calc_outbound_fee, get_dust_values};
use crate::pool::{parse_int, LiquidityPool};

// ─── Parameters ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSwapParams {
    pub amount: CryptoAmount,
    pub destination_asset: Asset,
    pub destination_address: Option<String>,
    pub streaming_interval: Option<u64>,
    pub streaming_quantity: Option<u64>,
    pub tolerance_bps: Option<u32>,
    pub affiliate_address: Option<String>,
    pub affiliate_bps: Option<u32>,
    pub height: Option<u64>,
}

impl QuoteSwapParams {
    pub fn new(amount: CryptoAmount, destination_asset: Asset) -> Self {
        Self {
            amount,
            destination_asset,
            destination_address: None,
            streaming_interval: None,
            streaming_quantity: None,
            tolerance_bps: None,
            affiliate_address: None,
            affiliate_bps: None,
            height: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddLiquidityParams {
    pub asset: CryptoAmount,
    pub rune: CryptoAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawLiquidityParams {
    pub asset: Asset,
    /// Percent of the position, in (0, 100]
    pub percentage: Decimal,
    pub asset_address: Option<String>,
    pub rune_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawSaverParams {
    pub asset: Asset,
    pub address: String,
    pub withdraw_bps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanOpenParams {
    /// Collateral
    pub amount: CryptoAmount,
    pub target_asset: Asset,
    pub destination: String,
    pub min_out: Option<String>,
    pub affiliate_bps: Option<u32>,
    pub affiliate: Option<String>,
    pub height: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanCloseParams {
    /// Asset the debt is repaid with
    pub repay_asset: Asset,
    pub repay_bps: u32,
    pub collateral_asset: Asset,
    pub loan_owner: String,
    pub min_out: Option<String>,
    pub height: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThornameParams {
    pub name: String,
    pub chain: Chain,
    pub chain_address: String,
    pub owner: Option<String>,
    pub preferred_asset: Option<Asset>,
    /// Requested expiry; new names default to one year
    pub expiry: Option<DateTime<Utc>>,
    pub is_update: bool,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// A 1e8 base-unit string from a node response as an amount of `asset`
fn base8_amount(value: &str, asset: &Asset) -> CryptoAmount {
    CryptoAmount::new(parse_int(value), BASE_DECIMALS, asset.clone())
}

fn opt_base8(value: Option<&String>, asset: &Asset) -> CryptoAmount {
    base8_amount(value.map(|s| s.as_str()).unwrap_or_default(), asset)
}

/// Amount as the u128 1e8 base units the node expects
fn base8_u128(amount: &CryptoAmount) -> Result<u128> {
    amount.base8().to_u128().ok_or_else(|| {
        QueryError::InvalidParams {
            reason: format!("amount out of range: {}", amount),
        }
        .into()
    })
}

fn unix_time(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

fn percent(value: Decimal) -> Decimal {
    value * Decimal::ONE_HUNDRED
}

fn halted_message(chain: &Chain) -> String {
    format!("{} chain is halted", chain)
}

/// 1-30 characters of `[a-z0-9-_+]`
fn is_valid_thorname(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 30
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

/// `~:name:chain:address[:owner[:preferred_asset]]`
pub fn thorname_memo(
    name: &str,
    chain: &Chain,
    address: &str,
    owner: Option<&str>,
    preferred_asset: Option<&Asset>,
) -> String {
    let mut memo = format!("~:{}:{}:{}", name, chain, address);
    match (owner, preferred_asset) {
        (Some(owner), Some(asset)) => memo.push_str(&format!(":{}:{}", owner, asset)),
        (Some(owner), None) => memo.push_str(&format!(":{}", owner)),
        (None, Some(asset)) => memo.push_str(&format!("::{}", asset)),
        (None, None) => {}
    }
    memo
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct ThorchainQuery {
    cache: Arc<ThorchainCache>,
}

impl ThorchainQuery {
    pub fn new(cache: Arc<ThorchainCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ThorchainCache> {
        &self.cache
    }

    fn thornode(&self) -> &Arc<dyn NodeQuoteSource> {
        self.cache.thornode()
    }

    fn midgard(&self) -> &Arc<dyn PoolMetadataSource> {
        self.cache.midgard()
    }

    // ─── Swaps ───────────────────────────────────────────────────────────

    /// Quote a swap through the node. Same-asset swaps are not rejected
    /// here; the node reports them.
    pub async fn quote_swap(&self, params: &QuoteSwapParams) -> Result<TxDetails> {
        let input = &params.amount;
        let destination = &params.destination_asset;
        let request = SwapQuoteRequest {
            from_asset: input.asset().to_string(),
            to_asset: destination.to_string(),
            amount: base8_u128(input)?,
            destination: params.destination_address.clone(),
            streaming_interval: params.streaming_interval,
            streaming_quantity: params.streaming_quantity,
            tolerance_bps: params.tolerance_bps,
            affiliate_bps: params.affiliate_bps,
            affiliate: params.affiliate_address.clone(),
            height: params.height,
        };

        let quote = match self.thornode().get_swap_quote(&request).await {
            Ok(quote) => quote,
            Err(e) => {
                let errors = vec![format!("Thornode request quote: {}", e)];
                return Ok(TxDetails::rejected(input, destination, errors));
            }
        };
        if let Some(error) = &quote.error {
            let errors = vec![format!("Thornode request quote: {}", error)];
            return Ok(TxDetails::rejected(input, destination, errors));
        }

        let mut errors = Vec::new();
        let memo = quote.memo.clone().filter(|m| !m.is_empty());
        if memo.is_none() {
            errors.push("Error parsing swap quote: Memo is missing".to_string());
        }
        let recommended_min = quote
            .recommended_min_amount_in
            .as_ref()
            .map(|v| base8_amount(v, input.asset()));
        if let Some(min) = &recommended_min {
            if &input.base8() < min.base_amount() {
                errors.push(format!(
                    "Amount in {} is less than recommended minimum {}",
                    input, min
                ));
            }
        }

        let out_decimals = self.cache.decimals_for(destination).await?;
        let net_output = base8_amount(&quote.expected_amount_out, destination).rescale(out_decimals);
        let total_fees = swap_fees(&quote.fees, destination);

        Ok(TxDetails {
            memo: memo.clone().unwrap_or_default(),
            to_address: quote.inbound_address.clone().unwrap_or_default(),
            router: quote.router.clone(),
            expiry: unix_time(quote.expiry),
            tx_estimate: TxEstimate {
                input_amount: input.clone(),
                total_fees,
                slip_basis_points: quote.fees.slippage_bps.unwrap_or(0),
                total_basis_points: quote.fees.total_bps.unwrap_or(0),
                net_output,
                inbound_confirmation_seconds: quote.inbound_confirmation_seconds,
                outbound_delay_seconds: quote.outbound_delay_seconds.unwrap_or(0),
                total_swap_seconds: quote.total_swap_seconds,
                recommended_min_amount_in: recommended_min,
                max_streaming_quantity: quote.max_streaming_quantity,
                streaming_swap_blocks: quote.streaming_swap_blocks,
                streaming_swap_seconds: quote.streaming_swap_seconds,
                warning: quote.warning.clone(),
                can_swap: memo.is_some() && errors.is_empty(),
                errors,
            },
        })
    }

    // ─── Liquidity ───────────────────────────────────────────────────────

    /// Estimate a liquidity deposit. Either side may be zero.
    pub async fn estimate_add_lp(&self, params: &AddLiquidityParams) -> Result<EstimateAddLp> {
        let asset = params.asset.asset();
        let mut errors = Vec::new();
        if asset.is_synth() {
            errors.push("Asset cannot be a synth".to_string());
        }
        if params.rune.asset().is_synth() {
            errors.push("Rune cannot be a synth".to_string());
        } else if !params.rune.asset().is_rune() {
            errors.push("Rune asset must be THOR.RUNE".to_string());
        }
        if !errors.is_empty() {
            return Ok(EstimateAddLp::rejected(asset, errors));
        }

        let pool = self.cache.get_pool_for_asset(asset).await?;
        let inbound = self.cache.get_inbound_detail(&asset.chain).await?;
        if inbound.halted_lp || inbound.halted_chain {
            errors.push(format!("{} LP actions are paused", asset.chain));
        }

        let rune = params.rune.base8();
        let asset_base = params.asset.base8();
        let units = liquidity_units(&rune, &asset_base, &pool);
        let share = pool_share(&units, &pool.lp_units, &pool);

        let asset_fee = if params.asset.is_zero() {
            CryptoAmount::zero(asset.clone(), BASE_DECIMALS)
        } else {
            let fee = calc_network_fee(asset, &inbound)?;
            let fee_in_asset = if fee.asset() == asset {
                fee.clone()
            } else {
                self.cache.convert(&fee, asset).await?
            };
            let threshold = fee_in_asset.times(timing::LP_FEE_SAFETY_MULTIPLE);
            if threshold.checked_cmp(&params.asset)?.is_gt() {
                errors.push("Asset amount is less than fees".to_string());
            }
            fee
        };
        let rune_fee = if params.rune.is_zero() {
            CryptoAmount::zero(Asset::rune(), BASE_DECIMALS)
        } else {
            let thor = self.cache.get_inbound_detail(&Chain::Thor).await?;
            let fee = calc_network_fee(&Asset::rune(), &thor)?;
            let threshold = fee.times(timing::LP_FEE_SAFETY_MULTIPLE);
            if threshold.checked_cmp(&params.rune)?.is_gt() {
                errors.push("Rune amount is less than fees".to_string());
            }
            fee
        };
        let total = self.value_in_rune(&asset_fee).await?.checked_add(&rune_fee)?;

        let wait = self
            .conf_counting(&params.asset)
            .await?
            .max(self.conf_counting(&params.rune).await?);

        Ok(EstimateAddLp {
            asset_pool: pool.asset.pool_key(),
            slip_percent: percent(slip_on_liquidity(&rune, &asset_base, &pool)),
            pool_share: share,
            pool_ownership_percent: percent(pool_ownership(&rune, &asset_base, &pool)),
            lp_units: units.to_string(),
            rune_to_asset_ratio: pool.rune_to_asset_ratio(),
            inbound_fees: LpFees {
                asset: asset_fee,
                rune: rune_fee,
                total,
            },
            estimated_wait_seconds: wait,
            can_add: errors.is_empty(),
            errors,
        })
    }

    /// Current share, protection and growth of a liquidity position
    pub async fn check_liquidity_position(
        &self,
        asset: &Asset,
        address: &str,
    ) -> Result<LiquidityPosition> {
        let pool = self.cache.get_pool_for_asset(asset).await?;
        let pool_name = pool.asset.to_string();
        let position = match self.thornode().get_liquidity_provider(&pool_name, address).await? {
            Some(position) => position,
            None => self.midgard_lp(&pool_name, address).await?.ok_or_else(|| {
                QueryError::PositionNotFound {
                    pool: pool_name.clone(),
                    address: address.to_string(),
                }
            })?,
        };

        let units = parse_int(&position.units);
        let share = pool_share(&units, &pool.lp_units, &pool);
        let deposit = PoolShare {
            asset_share: base8_amount(&position.asset_deposit_value, &pool.asset),
            rune_share: base8_amount(&position.rune_deposit_value, &Asset::rune()),
        };

        let protection = self.il_protection(&position, &deposit, &share).await?;
        let lp_growth_percent = lp_growth(&pool, &deposit, &share);

        Ok(LiquidityPosition {
            position,
            pool_share: share,
            impermanent_loss_protection: protection,
            lp_growth_percent,
        })
    }

    /// Midgard's record of a position the node does not report
    async fn midgard_lp(&self, pool: &str, address: &str) -> Result<Option<LiquidityProvider>> {
        let member = match self.midgard().get_member(address).await {
            Ok(member) => member,
            Err(e) => {
                debug!(address, "Midgard member lookup failed: {}", e);
                return Ok(None);
            }
        };
        let Some(entry) = member.pools.iter().find(|p| p.pool == pool) else {
            return Ok(None);
        };
        let height = self.midgard().get_latest_block_height().await?;
        Ok(Some(member_position(entry, height, Utc::now())))
    }

    async fn il_protection(
        &self,
        position: &LiquidityProvider,
        deposit: &PoolShare,
        current: &PoolShare,
    ) -> Result<IlProtection> {
        let values = self.cache.get_network_values().await?;
        let full_protection = values
            .get(network_keys::FULL_IMP_LOSS_PROTECTION_BLOCKS)
            .copied()
            .unwrap_or(0);
        // Protection switched off network-wide
        if full_protection <= 0 {
            return Ok(IlProtection {
                value: CryptoAmount::zero(Asset::rune(), BASE_DECIMALS),
                progress_percent: Decimal::ZERO,
            });
        }

        let blocks = ProtectionBlocks {
            current: self.midgard().get_latest_block_height().await?,
            last_added: position.last_add_height,
            full_protection: full_protection as u64,
        };
        let il = impermanent_loss(deposit, current, &blocks);
        let value = if il.protection.is_negative() {
            BigInt::zero()
        } else {
            il.protection
        };
        Ok(IlProtection {
            value: CryptoAmount::new(value, BASE_DECIMALS, Asset::rune()),
            progress_percent: percent(il.progress),
        })
    }

    /// Estimate withdrawing `percentage` of a liquidity position
    pub async fn estimate_withdraw_lp(
        &self,
        params: &WithdrawLiquidityParams,
    ) -> Result<EstimateWithdrawLp> {
        let address = params
            .rune_address
            .as_deref()
            .or(params.asset_address.as_deref())
            .ok_or_else(|| QueryError::InvalidParams {
                reason: "withdrawal needs a rune or asset address".to_string(),
            })?;
        if params.percentage <= Decimal::ZERO || params.percentage > Decimal::ONE_HUNDRED {
            return Err(QueryError::InvalidParams {
                reason: format!("withdraw percentage out of range: {}", params.percentage),
            }
            .into());
        }
        let asset = &params.asset;
        let fraction = params.percentage / Decimal::ONE_HUNDRED;

        let position = self.check_liquidity_position(asset, address).await?;
        let pool = self.cache.get_pool_for_asset(asset).await?;
        let asset_share = position.pool_share.asset_share.mul_decimal(fraction);
        let rune_share = position.pool_share.rune_share.mul_decimal(fraction);
        let slip = slip_on_liquidity(rune_share.base_amount(), asset_share.base_amount(), &pool);

        let mut errors = Vec::new();
        let inbound = self.cache.get_inbound_detail(&asset.chain).await?;
        let thor = self.cache.get_inbound_detail(&Chain::Thor).await?;
        if inbound.halted_lp || inbound.halted_chain {
            errors.push(format!("{} LP actions are paused", asset.chain));
        }

        let dust = get_dust_values(asset)?;
        let inbound_fees = self
            .lp_fees(
                calc_network_fee(asset, &inbound)?,
                calc_network_fee(&Asset::rune(), &thor)?,
            )
            .await?;
        let outbound_fees = self
            .lp_fees(
                calc_outbound_fee(asset, &inbound)?,
                calc_outbound_fee(&Asset::rune(), &thor)?,
            )
            .await?;

        let asset_amount = asset_share.rescale(pool.decimals);
        let wait = self.conf_counting(&dust.asset).await? + self.outbound_delay(&asset_amount).await?;

        let protection = position.impermanent_loss_protection;
        Ok(EstimateWithdrawLp {
            asset_pool: pool.asset.pool_key(),
            withdraw_percent: params.percentage,
            asset_amount,
            rune_amount: rune_share,
            slip_percent: percent(slip),
            inbound_fees,
            outbound_fees,
            asset_dust: dust.asset,
            rune_dust: dust.rune,
            estimated_wait_seconds: wait,
            impermanent_loss_protection: IlProtection {
                value: protection.value.mul_decimal(fraction),
                progress_percent: protection.progress_percent,
            },
            lp_growth_percent: position.lp_growth_percent,
            asset_address: params.asset_address.clone(),
            rune_address: params.rune_address.clone(),
            can_withdraw: errors.is_empty(),
            errors,
        })
    }

    async fn lp_fees(&self, asset_fee: CryptoAmount, rune_fee: CryptoAmount) -> Result<LpFees> {
        let total = self.value_in_rune(&asset_fee).await?.checked_add(&rune_fee)?;
        Ok(LpFees {
            asset: asset_fee,
            rune: rune_fee,
            total,
        })
    }

    async fn value_in_rune(&self, amount: &CryptoAmount) -> Result<CryptoAmount> {
        if amount.asset().is_rune() {
            return Ok(amount.clone());
        }
        if amount.is_zero() {
            return Ok(CryptoAmount::zero(Asset::rune(), BASE_DECIMALS));
        }
        self.cache.convert(amount, &Asset::rune()).await
    }

    // ─── Savers ──────────────────────────────────────────────────────────

    pub async fn estimate_add_saver(&self, amount: &CryptoAmount) -> Result<EstimateAddSaver> {
        let asset = amount.asset();
        let expiry = Utc::now() + ChronoDuration::minutes(timing::SAVER_QUOTE_EXPIRY_MINUTES);
        let rejected = |errors: Vec<String>| Ok(EstimateAddSaver::rejected(amount, expiry, errors));

        if asset.is_rune() || asset.is_synth() {
            return rejected(vec![
                "Saver vaults only accept layer-1 assets".to_string(),
            ]);
        }
        let pools = self.cache.get_pools().await?;
        let pool = match pools.get(&asset.pool_key()) {
            Some(pool) if pool.has_savers() => pool.clone(),
            _ => return rejected(vec![format!("{} does not have a saver's pool", asset)]),
        };

        let mut errors = Vec::new();
        if !pool.is_available() {
            errors.push(format!("Pool {} is not available", pool.asset));
        }
        let inbound = self.cache.get_inbound_detail(&asset.chain).await?;
        if inbound.halted_chain {
            errors.push(halted_message(&asset.chain));
        }
        if !errors.is_empty() {
            return rejected(errors);
        }

        let quote = match self
            .thornode()
            .get_savers_deposit_quote(&asset.to_string(), base8_u128(amount)?)
            .await
        {
            Ok(quote) => match &quote.error {
                Some(error) => {
                    return rejected(vec![format!("Thornode request quote failed: {}", error)])
                }
                None => quote,
            },
            Err(e) => return rejected(vec![format!("Thornode request quote failed: {}", e)]),
        };

        let recommended_min = quote
            .recommended_min_amount_in
            .as_ref()
            .map(|v| base8_amount(v, asset));
        if let Some(min) = &recommended_min {
            if &amount.base8() <= min.base_amount() {
                errors.push("Add amount does not cover fees".to_string());
            }
        }

        let estimated_wait_seconds = match quote.inbound_confirmation_seconds {
            Some(secs) => secs,
            None => self.conf_counting(amount).await?,
        };

        Ok(EstimateAddSaver {
            asset_amount: amount.clone(),
            estimated_deposit_value: base8_amount(&quote.expected_amount_deposit, asset)
                .rescale(pool.decimals),
            fee: saver_fees(&quote.fees, asset, pool.decimals),
            expiry,
            to_address: quote.inbound_address.clone(),
            memo: quote.memo.clone(),
            slip_basis_points: quote.fees.slippage_bps.unwrap_or(0),
            estimated_wait_seconds,
            recommended_min_amount_in: recommended_min,
            saver_cap_filled_percent: pool.saver_fill_percent(),
            can_add_saver: errors.is_empty(),
            errors,
        })
    }

    pub async fn estimate_withdraw_saver(
        &self,
        params: &WithdrawSaverParams,
    ) -> Result<EstimateWithdrawSaver> {
        let asset = &params.asset;
        if asset.is_rune() || asset.is_synth() {
            let errors =
                vec!["Native Rune and synth assets cannot be withdrawn from saver vaults".to_string()];
            return Ok(EstimateWithdrawSaver::rejected(asset, errors));
        }
        if params.withdraw_bps == 0 || params.withdraw_bps > MAX_BPS {
            let errors = vec![format!(
                "Withdraw basis points must be between 1 and {}",
                MAX_BPS
            )];
            return Ok(EstimateWithdrawSaver::rejected(asset, errors));
        }

        let quote = match self
            .thornode()
            .get_savers_withdraw_quote(&asset.to_string(), &params.address, params.withdraw_bps)
            .await
        {
            Ok(quote) => match &quote.error {
                Some(error) => {
                    let errors = vec![format!("Thornode request quote failed: {}", error)];
                    return Ok(EstimateWithdrawSaver::rejected(asset, errors));
                }
                None => quote,
            },
            Err(e) => {
                let errors = vec![format!("Thornode request quote failed: {}", e)];
                return Ok(EstimateWithdrawSaver::rejected(asset, errors));
            }
        };

        let decimals = self.cache.decimals_for(asset).await?;
        Ok(EstimateWithdrawSaver {
            expected_asset_amount: base8_amount(&quote.expected_amount_out, asset).rescale(decimals),
            fee: saver_fees(&quote.fees, asset, decimals),
            expiry: unix_time(quote.expiry),
            to_address: quote.inbound_address.clone(),
            memo: quote.memo.clone(),
            outbound_delay_seconds: quote.outbound_delay_seconds,
            inbound_delay_seconds: quote.inbound_confirmation_seconds.unwrap_or(0),
            slip_basis_points: quote.fees.slippage_bps.unwrap_or(0),
            dust_amount: base8_amount(&quote.dust_amount, asset),
            dust_threshold: opt_base8(quote.dust_threshold.as_ref(), asset),
            errors: Vec::new(),
        })
    }

    pub async fn get_saver_position(&self, asset: &Asset, address: &str) -> Result<SaverPosition> {
        if asset.is_rune() || asset.is_synth() {
            let errors = vec!["Saver positions are held in layer-1 assets".to_string()];
            return Ok(SaverPosition::rejected(asset, errors));
        }
        let pool = self.cache.get_pool_for_asset(asset).await?;
        let pool_name = pool.asset.to_string();
        let saver = match self.thornode().get_saver(&pool_name, address).await? {
            Some(saver) => Some(saver),
            None => self.midgard_saver(&pool, address).await?,
        };
        let Some(saver) = saver else {
            let errors = vec![format!("No saver position for {} in {}", address, pool.asset)];
            return Ok(SaverPosition::rejected(asset, errors));
        };

        let deposit = base8_amount(&saver.asset_deposit_value, &pool.asset);
        let redeemable = base8_amount(&saver.asset_redeem_value, &pool.asset);
        let growth = ratio_to_decimal(
            &((redeemable.base_amount() - deposit.base_amount()) * 100),
            deposit.base_amount(),
        );

        let height = self.midgard().get_latest_block_height().await?;
        let age_blocks = height.saturating_sub(saver.last_add_height);
        let age_in_years = ratio_to_decimal(
            &BigInt::from(age_blocks),
            &BigInt::from(timing::BLOCKS_PER_YEAR),
        );

        let mut errors = Vec::new();
        let inbound = self.cache.get_inbound_detail(&asset.chain).await?;
        if inbound.halted_chain {
            errors.push(halted_message(&asset.chain));
        }

        Ok(SaverPosition {
            deposit_value: deposit.rescale(pool.decimals),
            redeemable_value: redeemable.rescale(pool.decimals),
            last_add_height: saver.last_add_height,
            percentage_growth: growth,
            age_in_years,
            age_in_days: age_in_years * Decimal::from(365),
            asset: pool.asset.clone(),
            errors,
        })
    }

    async fn midgard_saver(&self, pool: &LiquidityPool, address: &str) -> Result<Option<Saver>> {
        let savers = match self.midgard().get_savers(address).await {
            Ok(savers) => savers,
            Err(e) => {
                debug!(address, "Midgard saver lookup failed: {}", e);
                return Ok(None);
            }
        };
        let pool_name = pool.asset.to_string();
        let Some(entry) = savers.pools.iter().find(|p| p.pool == pool_name) else {
            return Ok(None);
        };
        let height = self.midgard().get_latest_block_height().await?;
        Ok(Some(saver_position(entry, pool, height, Utc::now())))
    }

    // ─── Loans ───────────────────────────────────────────────────────────

    pub async fn get_loan_quote_open(&self, params: &LoanOpenParams) -> Result<LoanOpenQuote> {
        let collateral = params.amount.asset();
        let target = &params.target_asset;
        let mut errors = Vec::new();
        if collateral.is_rune() || collateral.is_synth() {
            errors.push("Collateral must be a layer-1 asset".to_string());
        } else if self.cache.get_inbound_detail(&collateral.chain).await?.halted_chain {
            errors.push(halted_message(&collateral.chain));
        }
        if !errors.is_empty() {
            return Ok(LoanOpenQuote::rejected(target, errors));
        }

        let request = LoanOpenRequest {
            from_asset: collateral.to_string(),
            amount: base8_u128(&params.amount)?,
            to_asset: target.to_string(),
            destination: params.destination.clone(),
            min_out: params.min_out.clone(),
            affiliate_bps: params.affiliate_bps,
            affiliate: params.affiliate.clone(),
            height: params.height,
        };
        let quote = match self.thornode().get_loan_quote_open(&request).await {
            Ok(quote) => match &quote.error {
                Some(error) => {
                    let errors = vec![format!("Thornode request quote: {}", error)];
                    return Ok(LoanOpenQuote::rejected(target, errors));
                }
                None => quote,
            },
            Err(e) => {
                let errors = vec![format!("Thornode request quote: {}", e)];
                return Ok(LoanOpenQuote::rejected(target, errors));
            }
        };

        let decimals = self.cache.decimals_for(target).await?;
        Ok(LoanOpenQuote {
            inbound_address: quote.inbound_address.clone().unwrap_or_default(),
            inbound_confirmation_seconds: quote.inbound_confirmation_seconds,
            outbound_delay_seconds: quote.outbound_delay_seconds,
            fees: loan_fees(&quote.fees),
            slippage_bps: quote.fees.slippage_bps.unwrap_or(0),
            router: quote.router.clone(),
            expiry: unix_time(quote.expiry),
            warning: quote.warning.clone(),
            notes: quote.notes.clone(),
            dust_threshold: quote.dust_threshold.clone(),
            recommended_min_amount_in: quote.recommended_min_amount_in.clone(),
            memo: quote.memo.clone().unwrap_or_default(),
            expected_amount_out: base8_amount(&quote.expected_amount_out, target).rescale(decimals),
            expected_collateralization_ratio: quote.expected_collateralization_ratio.clone(),
            expected_collateral_deposited: quote.expected_collateral_deposited.clone(),
            expected_debt_issued: quote.expected_debt_issued.clone(),
            errors,
        })
    }

    pub async fn get_loan_quote_close(&self, params: &LoanCloseParams) -> Result<LoanCloseQuote> {
        let collateral = &params.collateral_asset;
        let mut errors = Vec::new();
        if params.repay_bps == 0 || params.repay_bps > MAX_BPS {
            errors.push(format!("Repay basis points must be between 1 and {}", MAX_BPS));
        }
        if self.cache.get_inbound_detail(&collateral.chain).await?.halted_chain {
            errors.push(halted_message(&collateral.chain));
        }
        if !errors.is_empty() {
            return Ok(LoanCloseQuote::rejected(collateral, errors));
        }

        let request = LoanCloseRequest {
            from_asset: params.repay_asset.to_string(),
            repay_bps: params.repay_bps,
            to_asset: collateral.to_string(),
            loan_owner: params.loan_owner.clone(),
            min_out: params.min_out.clone(),
            height: params.height,
        };
        let quote = match self.thornode().get_loan_quote_close(&request).await {
            Ok(quote) => match &quote.error {
                Some(error) => {
                    let errors = vec![format!("Thornode request quote: {}", error)];
                    return Ok(LoanCloseQuote::rejected(collateral, errors));
                }
                None => quote,
            },
            Err(e) => {
                let errors = vec![format!("Thornode request quote: {}", e)];
                return Ok(LoanCloseQuote::rejected(collateral, errors));
            }
        };

        let decimals = self.cache.decimals_for(collateral).await?;
        Ok(LoanCloseQuote {
            inbound_address: quote.inbound_address.clone().unwrap_or_default(),
            inbound_confirmation_seconds: quote.inbound_confirmation_seconds,
            outbound_delay_seconds: quote.outbound_delay_seconds,
            fees: loan_fees(&quote.fees),
            slippage_bps: quote.fees.slippage_bps.unwrap_or(0),
            router: quote.router.clone(),
            expiry: unix_time(quote.expiry),
            warning: quote.warning.clone(),
            notes: quote.notes.clone(),
            dust_threshold: quote.dust_threshold.clone(),
            recommended_min_amount_in: quote.recommended_min_amount_in.clone(),
            memo: quote.memo.clone().unwrap_or_default(),
            expected_amount_out: base8_amount(&quote.expected_amount_out, collateral)
                .rescale(decimals),
            expected_amount_in: quote.expected_amount_in.clone(),
            expected_collateral_withdrawn: quote.expected_collateral_withdrawn.clone(),
            expected_debt_repaid: quote.expected_debt_repaid.clone(),
            errors,
        })
    }

    // ─── THORNames ───────────────────────────────────────────────────────

    pub async fn get_thorname_details(
        &self,
        name: &str,
        height: Option<u64>,
    ) -> Result<ThornameDetails> {
        let response = match self.thornode().get_thorname_details(name, height).await {
            Ok(response) => response,
            Err(e) => {
                if let Some(details) = self.midgard_thorname(name).await {
                    return Ok(details);
                }
                let errors = vec![format!("Thornode request failed: {}", e)];
                return Ok(ThornameDetails::rejected(name, errors));
            }
        };
        if let Some(error) = response.error {
            return Ok(ThornameDetails::rejected(name, vec![error]));
        }
        Ok(ThornameDetails {
            name: response.name,
            owner: response.owner,
            expire_block_height: response.expire_block_height,
            preferred_asset: response.preferred_asset,
            affiliate_collector_rune: response.affiliate_collector_rune,
            aliases: response.aliases,
            errors: Vec::new(),
        })
    }

    async fn midgard_thorname(&self, name: &str) -> Option<ThornameDetails> {
        let lookup = match self.midgard().get_thorname_detail(name).await {
            Ok(lookup) => lookup?,
            Err(e) => {
                debug!(name, "Midgard THORName lookup failed: {}", e);
                return None;
            }
        };
        Some(ThornameDetails {
            name: name.to_string(),
            owner: lookup.owner,
            expire_block_height: lookup.expire.trim().parse().unwrap_or(0),
            preferred_asset: String::new(),
            affiliate_collector_rune: None,
            aliases: lookup
                .entries
                .into_iter()
                .map(|entry| ThornameAlias {
                    chain: entry.chain,
                    address: entry.address,
                })
                .collect(),
            errors: Vec::new(),
        })
    }

    /// Cost and memo of registering a new THORName or updating an owned one
    pub async fn estimate_thorname(&self, params: &ThornameParams) -> Result<ThornameQuote> {
        if !is_valid_thorname(&params.name) {
            return Ok(ThornameQuote::rejected(vec![format!(
                "Invalid THORName: {}",
                params.name
            )]));
        }
        let details = self.get_thorname_details(&params.name, None).await?;
        let registered = details.is_registered();
        if registered && !params.is_update {
            return Ok(ThornameQuote::rejected(vec![
                "Thorname already registered".to_string(),
            ]));
        }
        if !registered && params.is_update {
            return Ok(ThornameQuote::rejected(vec![
                "Thorname is not registered".to_string(),
            ]));
        }

        let constants = match self.thornode().get_tc_constants().await {
            Ok(constants) => constants,
            Err(e) => {
                return Ok(ThornameQuote::rejected(vec![format!(
                    "Thornode request failed: {}",
                    e
                )]))
            }
        };
        let constant = |key: &str| -> Result<i64> {
            constants.get(key).copied().ok_or_else(|| {
                QueryError::MissingNetworkValue {
                    key: key.to_string(),
                }
                .into()
            })
        };
        let register_fee = if params.is_update {
            0
        } else {
            constant(network_keys::TNS_REGISTER_FEE)?
        };
        let fee_per_block = constant(network_keys::TNS_FEE_PER_BLOCK)?;

        let blocks = match params.expiry {
            Some(expiry) => {
                let secs = (expiry - Utc::now()).num_seconds().max(0) as u64;
                secs.div_ceil(THOR_BLOCK_TIME_SECS)
            }
            None if params.is_update => 0,
            None => timing::BLOCKS_PER_YEAR,
        };
        let value = BigInt::from(register_fee) + BigInt::from(fee_per_block) * blocks;

        Ok(ThornameQuote {
            memo: thorname_memo(
                &params.name,
                &params.chain,
                &params.chain_address,
                params.owner.as_deref(),
                params.preferred_asset.as_ref(),
            ),
            value: CryptoAmount::new(value, BASE_DECIMALS, Asset::rune()),
            errors: Vec::new(),
        })
    }

    // ─── Timing ──────────────────────────────────────────────────────────

    /// Seconds the network holds an outbound of `amount` before signing it
    pub async fn outbound_delay(&self, amount: &CryptoAmount) -> Result<u64> {
        let values = self.cache.get_network_values().await?;
        let value_of = |key: &str| -> Result<BigInt> {
            values.get(key).map(|v| BigInt::from(*v)).ok_or_else(|| {
                QueryError::MissingNetworkValue {
                    key: key.to_string(),
                }
                .into()
            })
        };
        let threshold = value_of(network_keys::MIN_TX_OUT_VOLUME_THRESHOLD)?;
        let max_offset = value_of(network_keys::MAX_TX_OUT_OFFSET)?;
        // RUNE released per block, in whole RUNE like the volume below
        let delay_rate = CryptoAmount::new(
            value_of(network_keys::TX_OUT_DELAY_RATE)?,
            BASE_DECIMALS,
            Asset::rune(),
        )
        .to_units();

        let value = self.value_in_rune(amount).await?;
        if value.base8() < threshold || threshold.is_zero() {
            return Ok(THOR_BLOCK_TIME_SECS);
        }

        let queued = self.scheduled_queue_value().await?;
        let volume = ratio_to_decimal(&(value.base8() + queued), &threshold);
        let rate = (delay_rate - volume).max(Decimal::ONE);
        let blocks = (value.to_units() / rate)
            .floor()
            .min(Decimal::from(max_offset.to_i64().unwrap_or(i64::MAX)));
        Ok(blocks.to_u64().unwrap_or(0) * THOR_BLOCK_TIME_SECS)
    }

    /// Rune value of the scheduled outbound queue. Items that cannot be
    /// valued are skipped.
    async fn scheduled_queue_value(&self) -> Result<BigInt> {
        let queue = self.thornode().get_scheduled_outbound_queue().await?;
        let mut total = BigInt::zero();
        for item in &queue {
            let asset: Asset = match item.coin.asset.parse() {
                Ok(asset) => asset,
                Err(e) => {
                    debug!("Skipping queued outbound: {}", e);
                    continue;
                }
            };
            let amount = base8_amount(&item.coin.amount, &asset);
            match self.value_in_rune(&amount).await {
                Ok(rune) => total += rune.base8(),
                Err(e) => debug!("Skipping queued outbound {}: {}", asset, e),
            }
        }
        Ok(total)
    }

    /// Seconds until an inbound of `amount` is final on its own chain.
    ///
    /// Chains with fast finality count one THORChain block; others wait one
    /// block per block reward of value.
    pub async fn conf_counting(&self, amount: &CryptoAmount) -> Result<u64> {
        let asset = amount.asset();
        if asset.is_rune() || asset.is_synth() {
            return Ok(THOR_BLOCK_TIME_SECS);
        }
        let attributes = asset.chain.attributes()?;
        if attributes.block_reward.is_zero() {
            return Ok(THOR_BLOCK_TIME_SECS);
        }

        let gas_asset = Asset::gas_asset(&asset.chain)?;
        let in_gas = if asset.is_gas_asset() {
            amount.clone()
        } else {
            self.cache.convert(amount, &gas_asset).await?
        };
        let blocks = (in_gas.to_units() / attributes.block_reward).ceil();
        let blocks = blocks.to_u64().unwrap_or_else(|| {
            warn!("Confirmation count out of range for {}", amount);
            u64::MAX
        });
        Ok(blocks.saturating_mul(attributes.avg_block_time_secs))
    }
}

fn swap_fees(fees: &QuoteFees, fallback: &Asset) -> SwapFees {
    let asset: Asset = fees.asset.parse().unwrap_or_else(|_| fallback.clone());
    SwapFees {
        affiliate_fee: opt_base8(fees.affiliate.as_ref(), &asset),
        outbound_fee: opt_base8(fees.outbound.as_ref(), &asset),
        liquidity_fee: opt_base8(fees.liquidity.as_ref(), &asset),
        total_fee: opt_base8(fees.total.as_ref(), &asset),
        asset,
    }
}

fn saver_fees(fees: &QuoteFees, asset: &Asset, decimals: u8) -> SaverFees {
    SaverFees {
        affiliate: opt_base8(fees.affiliate.as_ref(), asset).rescale(decimals),
        liquidity: opt_base8(fees.liquidity.as_ref(), asset).rescale(decimals),
        outbound: opt_base8(fees.outbound.as_ref(), asset).rescale(decimals),
        total_bps: fees.total_bps.unwrap_or(0),
    }
}

fn loan_fees(fees: &QuoteFees) -> LoanFees {
    let or_zero = |v: &Option<String>| v.clone().unwrap_or_else(|| "0".to_string());
    LoanFees {
        asset: fees.asset.clone(),
        liquidity: or_zero(&fees.liquidity),
        outbound: or_zero(&fees.outbound),
        total_bps: fees.total_bps.unwrap_or(0),
    }
}

/// Percent change of the position's rune value since deposit, at current prices
/// Height of the block at unix time `date`, counting back from `height`
fn height_at(date: &str, height: u64, now: DateTime<Utc>) -> u64 {
    let secs: i64 = date.trim().parse().unwrap_or(0);
    if secs <= 0 {
        return 0;
    }
    let elapsed = (now.timestamp() - secs).max(0) as u64;
    height.saturating_sub(elapsed / THOR_BLOCK_TIME_SECS)
}

fn net_added(added: &str, withdrawn: &str) -> String {
    let net = parse_int(added) - parse_int(withdrawn);
    if net.is_negative() {
        "0".to_string()
    } else {
        net.to_string()
    }
}

/// A Midgard membership in the node's position shape. Deposit values are
/// net of withdrawals.
fn member_position(member: &MemberPool, height: u64, now: DateTime<Utc>) -> LiquidityProvider {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    LiquidityProvider {
        asset: member.pool.clone(),
        rune_address: non_empty(&member.rune_address),
        asset_address: non_empty(&member.asset_address),
        last_add_height: height_at(&member.date_last_added, height, now),
        units: member.liquidity_units.clone(),
        pending_rune: member.rune_pending.clone(),
        pending_asset: member.asset_pending.clone(),
        rune_deposit_value: net_added(&member.rune_added, &member.rune_withdrawn),
        asset_deposit_value: net_added(&member.asset_added, &member.asset_withdrawn),
        ..Default::default()
    }
}

/// A Midgard saver record in the node's shape, redeemable at the vault's
/// current depth per unit
fn saver_position(
    saver: &SaverPool,
    pool: &LiquidityPool,
    height: u64,
    now: DateTime<Utc>,
) -> Saver {
    let units = parse_int(&saver.saver_units);
    let redeem = if pool.savers_units.is_zero() {
        BigInt::zero()
    } else {
        &units * &pool.savers_depth / &pool.savers_units
    };
    Saver {
        asset: saver.pool.clone(),
        asset_address: saver.asset_address.clone(),
        last_add_height: height_at(&saver.date_last_added, height, now),
        units: saver.saver_units.clone(),
        asset_deposit_value: net_added(&saver.asset_added, &saver.asset_withdrawn),
        asset_redeem_value: redeem.to_string(),
        ..Default::default()
    }
}

fn lp_growth(pool: &LiquidityPool, deposit: &PoolShare, current: &PoolShare) -> Decimal {
    let in_rune = |share: &PoolShare| -> BigInt {
        let asset_value = if pool.asset_depth().is_zero() {
            BigInt::zero()
        } else {
            share.asset_share.base8() * pool.rune_depth() / pool.asset_depth()
        };
        share.rune_share.base8() + asset_value
    };
    let deposited = in_rune(deposit);
    let now = in_rune(current);
    ratio_to_decimal(&((now - &deposited) * 100), &deposited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, FakeMidgard, FakeThornode};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use thorchain_client::{
        Coin, MemberDetails, QuoteLoanOpenResponse, QuoteSaverDepositResponse, QuoteSwapResponse,
        SaverDetails, ThornameEntry, ThornameLookup, ThornameResponse, TxOutItem,
    };

    fn btc() -> Asset {
        "BTC.BTC".parse().unwrap()
    }

    fn eth() -> Asset {
        "ETH.ETH".parse().unwrap()
    }

    fn query_with(midgard: FakeMidgard, thornode: FakeThornode) -> ThorchainQuery {
        ThorchainQuery::new(fixtures::cache(Arc::new(midgard), Arc::new(thornode)))
    }

    fn query() -> ThorchainQuery {
        query_with(fixtures::midgard(), fixtures::thornode())
    }

    fn btc_amount(sats: u64) -> CryptoAmount {
        CryptoAmount::new(sats, 8, btc())
    }

    fn rune_amount(base: u64) -> CryptoAmount {
        CryptoAmount::new(base, 8, Asset::rune())
    }

    fn swap_quote() -> QuoteSwapResponse {
        QuoteSwapResponse {
            inbound_address: Some("bc1qvault".to_string()),
            memo: Some("=:ETH.ETH:0xdest".to_string()),
            expected_amount_out: "3012345678".to_string(),
            recommended_min_amount_in: Some("15000".to_string()),
            outbound_delay_seconds: Some(12),
            expiry: 1_700_000_000,
            fees: QuoteFees {
                asset: "ETH.ETH".to_string(),
                outbound: Some("240000".to_string()),
                liquidity: Some("53000".to_string()),
                total: Some("293000".to_string()),
                slippage_bps: Some(4),
                total_bps: Some(9),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    // ─── Swaps ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_quote_swap() {
        let thornode = FakeThornode {
            swap_quote: swap_quote(),
            ..fixtures::thornode()
        };
        let q = query_with(fixtures::midgard(), thornode);
        let params = QuoteSwapParams::new(btc_amount(100_000_000), eth());
        let details = q.quote_swap(&params).await.unwrap();

        let estimate = &details.tx_estimate;
        assert!(estimate.can_swap, "{:?}", estimate.errors);
        assert_eq!(details.memo, "=:ETH.ETH:0xdest");
        assert_eq!(details.to_address, "bc1qvault");
        assert_eq!(estimate.net_output.decimals(), 18);
        assert_eq!(
            estimate.net_output.base_amount(),
            &BigInt::from(30_123_456_780_000_000_000u128)
        );
        assert_eq!(estimate.slip_basis_points, 4);
        assert_eq!(estimate.total_fees.outbound_fee.base_amount(), &BigInt::from(240_000));
        assert_eq!(estimate.outbound_delay_seconds, 12);
        assert!(details.expiry.is_some());
    }

    #[tokio::test]
    async fn test_quote_swap_remote_error() {
        let thornode = FakeThornode {
            swap_quote: QuoteSwapResponse {
                error: Some("pool does not exist".to_string()),
                ..Default::default()
            },
            ..fixtures::thornode()
        };
        let q = query_with(fixtures::midgard(), thornode);
        let details = q
            .quote_swap(&QuoteSwapParams::new(btc_amount(100_000_000), eth()))
            .await
            .unwrap();
        let estimate = &details.tx_estimate;
        assert!(!estimate.can_swap);
        assert_eq!(estimate.errors, vec!["Thornode request quote: pool does not exist"]);
        assert!(estimate.net_output.is_zero());
    }

    #[tokio::test]
    async fn test_quote_swap_transport_failure() {
        let thornode = fixtures::thornode();
        thornode.offline.store(true, Ordering::SeqCst);
        let q = query_with(fixtures::midgard(), thornode);
        let details = q
            .quote_swap(&QuoteSwapParams::new(btc_amount(100_000_000), eth()))
            .await
            .unwrap();
        assert!(!details.tx_estimate.can_swap);
        assert!(details.tx_estimate.errors[0].starts_with("Thornode request quote: "));
    }

    #[tokio::test]
    async fn test_quote_swap_missing_memo_and_below_minimum() {
        let thornode = FakeThornode {
            swap_quote: QuoteSwapResponse {
                memo: None,
                ..swap_quote()
            },
            ..fixtures::thornode()
        };
        let q = query_with(fixtures::midgard(), thornode);
        let details = q
            .quote_swap(&QuoteSwapParams::new(btc_amount(10_000), eth()))
            .await
            .unwrap();
        let errors = &details.tx_estimate.errors;
        assert!(!details.tx_estimate.can_swap);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Memo"));
        assert!(errors[1].contains("less than recommended minimum"));
    }

    // ─── Liquidity ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_add_lp_non_native_rune_makes_no_remote_call() {
        let midgard = Arc::new(fixtures::midgard());
        let thornode = Arc::new(fixtures::thornode());
        let q = ThorchainQuery::new(fixtures::cache(midgard.clone(), thornode.clone()));

        let params = AddLiquidityParams {
            asset: btc_amount(100_000_000),
            rune: CryptoAmount::new(100u32, 8, eth()),
        };
        let estimate = q.estimate_add_lp(&params).await.unwrap();
        assert!(!estimate.can_add);
        assert_eq!(estimate.errors, vec!["Rune asset must be THOR.RUNE"]);
        assert_eq!(thornode.call_count(), 0);
        assert_eq!(midgard.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_lp_synth_rejected() {
        let params = AddLiquidityParams {
            asset: CryptoAmount::new(1u32, 8, "BTC/BTC".parse().unwrap()),
            rune: rune_amount(0),
        };
        let estimate = query().estimate_add_lp(&params).await.unwrap();
        assert!(!estimate.can_add);
        assert_eq!(estimate.errors, vec!["Asset cannot be a synth"]);
    }

    #[tokio::test]
    async fn test_add_lp_symmetric() {
        let params = AddLiquidityParams {
            asset: btc_amount(100_000_000),
            rune: rune_amount(2_500_000_000_000),
        };
        let estimate = query().estimate_add_lp(&params).await.unwrap();
        assert!(estimate.can_add, "{:?}", estimate.errors);
        assert_eq!(estimate.slip_percent, Decimal::ZERO);
        assert_eq!(estimate.lp_units, "2500000000000");
        assert_eq!(estimate.pool_share.asset_share.base_amount(), &BigInt::from(100_000_000));
        assert_eq!(estimate.inbound_fees.asset.base_amount(), &BigInt::from(20_000));
        assert_eq!(estimate.inbound_fees.rune.base_amount(), &BigInt::from(2_000_000));
        // 20,000 sats at 25,000 RUNE/BTC plus 0.02 RUNE
        assert_eq!(estimate.inbound_fees.total.base_amount(), &BigInt::from(502_000_000));
        assert_eq!(estimate.estimated_wait_seconds, 600);

        // 1% of each depth: the share is 1% of the pool, ownership counts
        // the deposit in the depths
        assert_eq!(
            estimate.pool_share.rune_share.base_amount(),
            &BigInt::from(2_500_000_000_000u64)
        );
        let minted = BigInt::from(250_000_000_000_000u64) / 101;
        assert_eq!(
            estimate.pool_ownership_percent,
            ratio_to_decimal(&minted, &BigInt::from(250_000_000_000_000u64)) * dec!(100)
        );
    }

    #[tokio::test]
    async fn test_add_lp_asset_only() {
        let params = AddLiquidityParams {
            asset: btc_amount(100_000_000),
            rune: rune_amount(0),
        };
        let estimate = query().estimate_add_lp(&params).await.unwrap();
        assert!(estimate.can_add, "{:?}", estimate.errors);
        // P * a / 2A against the depths before the deposit
        assert_eq!(estimate.lp_units, "1250000000000");
        assert_eq!(estimate.pool_share.asset_share.base_amount(), &BigInt::from(50_000_000));
        assert_eq!(
            estimate.pool_share.rune_share.base_amount(),
            &BigInt::from(1_250_000_000_000u64)
        );
        assert_eq!(estimate.slip_percent, dec!(1));
        // P * a / 2A' once the asset has landed: 2.5e22 / 2.02e10 units
        let minted = BigInt::from(1_237_623_762_376u64);
        assert_eq!(
            estimate.pool_ownership_percent,
            ratio_to_decimal(&minted, &BigInt::from(250_000_000_000_000u64)) * dec!(100)
        );
        assert!(estimate.inbound_fees.rune.is_zero());
    }

    #[tokio::test]
    async fn test_add_lp_amount_below_fees() {
        let params = AddLiquidityParams {
            asset: btc_amount(50_000),
            rune: rune_amount(5_000_000),
        };
        let estimate = query().estimate_add_lp(&params).await.unwrap();
        assert!(!estimate.can_add);
        assert_eq!(
            estimate.errors,
            vec!["Asset amount is less than fees", "Rune amount is less than fees"]
        );
    }

    fn lp_position() -> LiquidityProvider {
        LiquidityProvider {
            asset: "BTC.BTC".to_string(),
            rune_address: Some("thor1lp".to_string()),
            last_add_height: 14_280_000,
            units: "2500000000000".to_string(),
            asset_deposit_value: "100000000".to_string(),
            rune_deposit_value: "2500000000000".to_string(),
            ..Default::default()
        }
    }

    fn thornode_with_lp() -> FakeThornode {
        let mut thornode = fixtures::thornode();
        thornode.liquidity_providers.insert(
            ("BTC.BTC".to_string(), "thor1lp".to_string()),
            lp_position(),
        );
        thornode
    }

    #[tokio::test]
    async fn test_check_liquidity_position() {
        let q = query_with(fixtures::midgard(), thornode_with_lp());
        let position = q.check_liquidity_position(&btc(), "thor1lp").await.unwrap();
        assert_eq!(position.pool_share.asset_share.base_amount(), &BigInt::from(100_000_000));
        assert_eq!(position.lp_growth_percent, Decimal::ZERO);
        assert!(position.impermanent_loss_protection.value.is_zero());
        // 720,000 of 1,440,000 blocks served
        assert_eq!(position.impermanent_loss_protection.progress_percent, dec!(50));
    }

    #[tokio::test]
    async fn test_check_liquidity_position_from_midgard() {
        let mut midgard = fixtures::midgard();
        midgard.members.insert(
            "thor1member".to_string(),
            MemberDetails {
                pools: vec![MemberPool {
                    pool: "BTC.BTC".to_string(),
                    rune_address: "thor1member".to_string(),
                    liquidity_units: "2500000000000".to_string(),
                    rune_added: "3000000000000".to_string(),
                    rune_withdrawn: "500000000000".to_string(),
                    asset_added: "100000000".to_string(),
                    asset_withdrawn: "0".to_string(),
                    ..Default::default()
                }],
            },
        );
        let q = query_with(midgard, fixtures::thornode());
        let position = q.check_liquidity_position(&btc(), "thor1member").await.unwrap();
        assert_eq!(position.position.rune_address.as_deref(), Some("thor1member"));
        assert_eq!(position.position.asset_address, None);
        assert_eq!(position.position.rune_deposit_value, "2500000000000");
        assert_eq!(position.pool_share.asset_share.base_amount(), &BigInt::from(100_000_000));
        assert_eq!(position.lp_growth_percent, Decimal::ZERO);
    }

    #[test]
    fn test_height_at_counts_back_in_thor_blocks() {
        let now = unix_time(1_700_000_600).unwrap();
        assert_eq!(height_at("1700000000", 1_000, now), 900);
        assert_eq!(height_at("", 1_000, now), 0);
        assert_eq!(height_at("1800000000", 1_000, now), 1_000);
    }

    #[tokio::test]
    async fn test_check_liquidity_position_not_found() {
        let err = query()
            .check_liquidity_position(&btc(), "thor1nobody")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "position_not_found");
    }

    #[tokio::test]
    async fn test_withdraw_lp_half() {
        let q = query_with(fixtures::midgard(), thornode_with_lp());
        let params = WithdrawLiquidityParams {
            asset: btc(),
            percentage: dec!(50),
            asset_address: None,
            rune_address: Some("thor1lp".to_string()),
        };
        let estimate = q.estimate_withdraw_lp(&params).await.unwrap();
        assert!(estimate.can_withdraw);
        assert_eq!(estimate.asset_amount.base_amount(), &BigInt::from(50_000_000));
        assert_eq!(estimate.rune_amount.base_amount(), &BigInt::from(1_250_000_000_000u64));
        assert_eq!(estimate.asset_dust.base_amount(), &BigInt::from(10_000));
        assert_eq!(estimate.outbound_fees.asset.base_amount(), &BigInt::from(30_000));
        assert_eq!(estimate.outbound_fees.rune.base_amount(), &BigInt::from(2_000_000));
        // one BTC block for the dust, then 12,500 RUNE at 12.5 RUNE a block
        // hits the 720-block cap
        assert_eq!(estimate.estimated_wait_seconds, 600 + 720 * 6);
    }

    #[tokio::test]
    async fn test_withdraw_lp_quarter() {
        let q = query_with(fixtures::midgard(), thornode_with_lp());
        let params = WithdrawLiquidityParams {
            asset: btc(),
            percentage: dec!(25),
            asset_address: None,
            rune_address: Some("thor1lp".to_string()),
        };
        let estimate = q.estimate_withdraw_lp(&params).await.unwrap();
        // the position owns 1% of the pool; a quarter of it is redeemed
        assert_eq!(estimate.asset_amount.base_amount(), &BigInt::from(25_000_000));
        assert_eq!(estimate.rune_amount.base_amount(), &BigInt::from(625_000_000_000u64));
        assert_eq!(estimate.slip_percent, Decimal::ZERO);
        assert_eq!(estimate.withdraw_percent, dec!(25));
    }

    #[tokio::test]
    async fn test_withdraw_lp_needs_address() {
        let params = WithdrawLiquidityParams {
            asset: btc(),
            percentage: dec!(100),
            asset_address: None,
            rune_address: None,
        };
        let err = query().estimate_withdraw_lp(&params).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_params");
    }

    // ─── Savers ──────────────────────────────────────────────────────────

    fn saver_quote() -> QuoteSaverDepositResponse {
        QuoteSaverDepositResponse {
            inbound_address: "bc1qvault".to_string(),
            memo: "+:BTC/BTC".to_string(),
            expected_amount_deposit: "99000000".to_string(),
            recommended_min_amount_in: Some("20000".to_string()),
            inbound_confirmation_seconds: Some(600),
            fees: QuoteFees {
                asset: "BTC/BTC".to_string(),
                liquidity: Some("1000000".to_string()),
                outbound: Some("0".to_string()),
                total_bps: Some(100),
                slippage_bps: Some(100),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_saver() {
        let thornode = FakeThornode {
            saver_deposit_quote: saver_quote(),
            ..fixtures::thornode()
        };
        let q = query_with(fixtures::midgard(), thornode);
        let estimate = q.estimate_add_saver(&btc_amount(100_000_000)).await.unwrap();
        assert!(estimate.can_add_saver, "{:?}", estimate.errors);
        assert_eq!(estimate.memo, "+:BTC/BTC");
        assert_eq!(estimate.estimated_deposit_value.base_amount(), &BigInt::from(99_000_000));
        assert_eq!(estimate.fee.liquidity.base_amount(), &BigInt::from(1_000_000));
        assert_eq!(estimate.saver_cap_filled_percent, dec!(10));
        assert_eq!(estimate.estimated_wait_seconds, 600);
        assert!(estimate.expiry > Utc::now());
    }

    #[tokio::test]
    async fn test_add_saver_without_vault() {
        let estimate = query()
            .estimate_add_saver(&CryptoAmount::new(1_000u32, 18, eth()))
            .await
            .unwrap();
        assert!(!estimate.can_add_saver);
        assert_eq!(estimate.errors, vec!["ETH.ETH does not have a saver's pool"]);
    }

    #[tokio::test]
    async fn test_add_saver_remote_error_and_minimum() {
        let thornode = FakeThornode {
            saver_deposit_quote: QuoteSaverDepositResponse {
                error: Some("amount less than dust threshold".to_string()),
                ..Default::default()
            },
            ..fixtures::thornode()
        };
        let q = query_with(fixtures::midgard(), thornode);
        let estimate = q.estimate_add_saver(&btc_amount(100)).await.unwrap();
        assert!(!estimate.can_add_saver);
        assert_eq!(
            estimate.errors,
            vec!["Thornode request quote failed: amount less than dust threshold"]
        );

        let thornode = FakeThornode {
            saver_deposit_quote: saver_quote(),
            ..fixtures::thornode()
        };
        let q = query_with(fixtures::midgard(), thornode);
        let estimate = q.estimate_add_saver(&btc_amount(10_000)).await.unwrap();
        assert_eq!(estimate.errors, vec!["Add amount does not cover fees"]);
    }

    #[tokio::test]
    async fn test_withdraw_saver_rejects_synth() {
        let params = WithdrawSaverParams {
            asset: "BTC/BTC".parse().unwrap(),
            address: "bc1qsaver".to_string(),
            withdraw_bps: 10_000,
        };
        let estimate = query().estimate_withdraw_saver(&params).await.unwrap();
        assert_eq!(estimate.errors.len(), 1);
        assert!(estimate.expected_asset_amount.is_zero());
    }

    #[tokio::test]
    async fn test_saver_position() {
        let mut thornode = fixtures::thornode();
        thornode.savers.insert(
            ("BTC.BTC".to_string(), "bc1qsaver".to_string()),
            Saver {
                asset: "BTC.BTC".to_string(),
                asset_address: "bc1qsaver".to_string(),
                last_add_height: 15_000_000 - 5_256_000,
                units: "95000000".to_string(),
                asset_deposit_value: "100000000".to_string(),
                asset_redeem_value: "110000000".to_string(),
                ..Default::default()
            },
        );
        let q = query_with(fixtures::midgard(), thornode);
        let position = q.get_saver_position(&btc(), "bc1qsaver").await.unwrap();
        assert!(position.errors.is_empty());
        assert_eq!(position.percentage_growth, dec!(10));
        assert_eq!(position.age_in_years, Decimal::ONE);
        assert_eq!(position.age_in_days, dec!(365));

        let missing = q.get_saver_position(&btc(), "bc1qother").await.unwrap();
        assert_eq!(missing.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_saver_position_from_midgard() {
        let mut midgard = fixtures::midgard();
        midgard.savers.insert(
            "bc1qmidgard".to_string(),
            SaverDetails {
                pools: vec![SaverPool {
                    pool: "BTC.BTC".to_string(),
                    asset_address: "bc1qmidgard".to_string(),
                    saver_units: "950000000".to_string(),
                    asset_added: "1000000000".to_string(),
                    asset_withdrawn: "100000000".to_string(),
                    ..Default::default()
                }],
            },
        );
        let q = query_with(midgard, fixtures::thornode());
        let position = q.get_saver_position(&btc(), "bc1qmidgard").await.unwrap();
        assert!(position.errors.is_empty(), "{:?}", position.errors);
        // half the vault's 1.9e9 units over its 2e9 depth
        assert_eq!(position.redeemable_value.base_amount(), &BigInt::from(1_000_000_000));
        assert_eq!(position.deposit_value.base_amount(), &BigInt::from(900_000_000));
    }

    // ─── Loans ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_loan_open_remote_error() {
        let thornode = FakeThornode {
            loan_open_quote: QuoteLoanOpenResponse {
                error: Some("loans are paused".to_string()),
                ..Default::default()
            },
            ..fixtures::thornode()
        };
        let q = query_with(fixtures::midgard(), thornode);
        let params = LoanOpenParams {
            amount: btc_amount(100_000_000),
            target_asset: eth(),
            destination: "0xdest".to_string(),
            min_out: None,
            affiliate_bps: None,
            affiliate: None,
            height: None,
        };
        let quote = q.get_loan_quote_open(&params).await.unwrap();
        assert_eq!(quote.errors, vec!["Thornode request quote: loans are paused"]);
        assert!(quote.expected_amount_out.is_zero());
    }

    #[tokio::test]
    async fn test_loan_open() {
        let thornode = FakeThornode {
            loan_open_quote: QuoteLoanOpenResponse {
                memo: Some("$+:ETH.ETH:0xdest".to_string()),
                expected_amount_out: "800000000".to_string(),
                expected_debt_issued: "2000000000000".to_string(),
                ..Default::default()
            },
            ..fixtures::thornode()
        };
        let q = query_with(fixtures::midgard(), thornode);
        let params = LoanOpenParams {
            amount: btc_amount(100_000_000),
            target_asset: eth(),
            destination: "0xdest".to_string(),
            min_out: None,
            affiliate_bps: None,
            affiliate: None,
            height: None,
        };
        let quote = q.get_loan_quote_open(&params).await.unwrap();
        assert!(quote.errors.is_empty());
        assert_eq!(quote.expected_amount_out.decimals(), 18);
        assert_eq!(quote.expected_debt_issued, "2000000000000");
    }

    // ─── THORNames ───────────────────────────────────────────────────────

    fn tns_thornode() -> FakeThornode {
        let mut thornode = fixtures::thornode();
        thornode.constants = HashMap::from([
            ("TNSREGISTERFEE".to_string(), 1_000_000_000),
            ("TNSFEEPERBLOCK".to_string(), 20),
        ]);
        thornode.thornames.insert(
            "taken".to_string(),
            ThornameResponse {
                name: "taken".to_string(),
                owner: "thor1owner".to_string(),
                expire_block_height: 20_000_000,
                ..Default::default()
            },
        );
        thornode
    }

    fn tns_params(name: &str, is_update: bool) -> ThornameParams {
        ThornameParams {
            name: name.to_string(),
            chain: Chain::Btc,
            chain_address: "bc1qowner".to_string(),
            owner: None,
            preferred_asset: None,
            expiry: None,
            is_update,
        }
    }

    #[tokio::test]
    async fn test_estimate_new_thorname() {
        let q = query_with(fixtures::midgard(), tns_thornode());
        let quote = q.estimate_thorname(&tns_params("alice", false)).await.unwrap();
        assert!(quote.errors.is_empty());
        assert_eq!(quote.memo, "~:alice:BTC:bc1qowner");
        assert_eq!(
            quote.value.base_amount(),
            &BigInt::from(1_000_000_000u64 + 20 * 5_256_000)
        );
    }

    #[tokio::test]
    async fn test_thorname_registration_state() {
        let q = query_with(fixtures::midgard(), tns_thornode());
        let quote = q.estimate_thorname(&tns_params("taken", false)).await.unwrap();
        assert_eq!(quote.errors, vec!["Thorname already registered"]);

        let quote = q.estimate_thorname(&tns_params("alice", true)).await.unwrap();
        assert_eq!(quote.errors, vec!["Thorname is not registered"]);

        let quote = q.estimate_thorname(&tns_params("taken", true)).await.unwrap();
        assert!(quote.errors.is_empty());
        assert!(quote.value.is_zero());
    }

    #[tokio::test]
    async fn test_thorname_details() {
        let q = query_with(fixtures::midgard(), tns_thornode());
        let details = q.get_thorname_details("taken", None).await.unwrap();
        assert!(details.is_registered());
        assert_eq!(details.owner, "thor1owner");

        let missing = q.get_thorname_details("nobody", None).await.unwrap();
        assert!(!missing.is_registered());
        assert_eq!(missing.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_thorname_details_from_midgard_when_node_is_down() {
        let mut midgard = fixtures::midgard();
        midgard.thornames.insert(
            "bob".to_string(),
            ThornameLookup {
                owner: "thor1bob".to_string(),
                expire: "20000000".to_string(),
                entries: vec![ThornameEntry {
                    chain: "BTC".to_string(),
                    address: "bc1qbob".to_string(),
                }],
            },
        );
        let thornode = tns_thornode();
        thornode.offline.store(true, Ordering::SeqCst);
        let q = query_with(midgard, thornode);

        let details = q.get_thorname_details("bob", None).await.unwrap();
        assert!(details.errors.is_empty());
        assert_eq!(details.owner, "thor1bob");
        assert_eq!(details.expire_block_height, 20_000_000);
        assert_eq!(details.aliases.len(), 1);

        let missing = q.get_thorname_details("nobody", None).await.unwrap();
        assert!(missing.errors[0].starts_with("Thornode request failed"));
    }

    #[test]
    fn test_thorname_memo_forms() {
        let btc = btc();
        assert_eq!(
            thorname_memo("bob", &Chain::Thor, "thor1bob", Some("thor1own"), Some(&btc)),
            "~:bob:THOR:thor1bob:thor1own:BTC.BTC"
        );
        assert_eq!(
            thorname_memo("bob", &Chain::Thor, "thor1bob", None, Some(&btc)),
            "~:bob:THOR:thor1bob::BTC.BTC"
        );
        assert!(is_valid_thorname("my-name_1"));
        assert!(!is_valid_thorname("bad name"));
        assert!(!is_valid_thorname(""));
    }

    // ─── Timing ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_outbound_delay() {
        let q = query();
        // 100 RUNE is under the 1,000 RUNE threshold
        assert_eq!(q.outbound_delay(&rune_amount(10_000_000_000)).await.unwrap(), 6);
        // 0.1 BTC = 2,500 RUNE, volume 2.5x the threshold: 25 - 2.5 RUNE a
        // block, 111 blocks
        assert_eq!(q.outbound_delay(&btc_amount(10_000_000)).await.unwrap(), 666);
        // 1 BTC hits the 720-block cap
        assert_eq!(q.outbound_delay(&btc_amount(100_000_000)).await.unwrap(), 4_320);
    }

    #[tokio::test]
    async fn test_outbound_delay_counts_the_queue() {
        let thornode = FakeThornode {
            queue: vec![TxOutItem {
                chain: "THOR".to_string(),
                coin: Coin {
                    asset: "THOR.RUNE".to_string(),
                    amount: "1000000000000".to_string(),
                    decimals: None,
                },
                ..Default::default()
            }],
            ..fixtures::thornode()
        };
        let q = query_with(fixtures::midgard(), thornode);
        // 2,500 + 10,000 queued RUNE is 12.5x the threshold: 12.5 RUNE a
        // block, 200 blocks
        assert_eq!(q.outbound_delay(&btc_amount(10_000_000)).await.unwrap(), 1_200);
    }

    #[tokio::test]
    async fn test_conf_counting() {
        let q = query();
        assert_eq!(q.conf_counting(&rune_amount(1)).await.unwrap(), 6);
        assert_eq!(q.conf_counting(&btc_amount(100_000_000)).await.unwrap(), 600);
        assert_eq!(q.conf_counting(&btc_amount(700_000_000)).await.unwrap(), 1_200);

        let one_eth = CryptoAmount::new(10u64.pow(18), 18, eth());
        assert_eq!(q.conf_counting(&one_eth).await.unwrap(), 13);

        let atom = CryptoAmount::new(1u32, 8, "GAIA.ATOM".parse().unwrap());
        assert_eq!(q.conf_counting(&atom).await.unwrap(), 6);
    }
}
