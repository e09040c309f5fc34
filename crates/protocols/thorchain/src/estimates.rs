//! Quote and estimate result types
//!
//! Every estimate carries an `errors` list. A non-empty list means the
//! numeric fields are zero-valued and the action should not be attempted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thorchain_client::{LiquidityProvider, ThornameAlias};
use thorchain_core::{Asset, CryptoAmount, BASE_DECIMALS};

use crate::calculator::PoolShare;

fn zero(asset: &Asset) -> CryptoAmount {
    CryptoAmount::zero(asset.clone(), BASE_DECIMALS)
}

fn zero_rune() -> CryptoAmount {
    zero(&Asset::rune())
}

// ─── Swaps ───────────────────────────────────────────────────────────────────

/// Fee breakdown of a swap quote, in the fee asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapFees {
    pub asset: Asset,
    pub affiliate_fee: CryptoAmount,
    pub outbound_fee: CryptoAmount,
    pub liquidity_fee: CryptoAmount,
    pub total_fee: CryptoAmount,
}

impl SwapFees {
    pub fn zero(asset: &Asset) -> Self {
        Self {
            asset: asset.clone(),
            affiliate_fee: zero(asset),
            outbound_fee: zero(asset),
            liquidity_fee: zero(asset),
            total_fee: zero(asset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxEstimate {
    pub input_amount: CryptoAmount,
    pub total_fees: SwapFees,
    pub slip_basis_points: u32,
    pub total_basis_points: u32,
    pub net_output: CryptoAmount,
    pub inbound_confirmation_seconds: Option<u64>,
    pub outbound_delay_seconds: u64,
    pub total_swap_seconds: Option<u64>,
    pub recommended_min_amount_in: Option<CryptoAmount>,
    pub max_streaming_quantity: Option<u64>,
    pub streaming_swap_blocks: Option<u64>,
    pub streaming_swap_seconds: Option<u64>,
    pub warning: String,
    pub can_swap: bool,
    pub errors: Vec<String>,
}

/// Everything needed to send a swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxDetails {
    pub memo: String,
    pub to_address: String,
    pub router: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub tx_estimate: TxEstimate,
}

impl TxDetails {
    pub fn rejected(input: &CryptoAmount, destination: &Asset, errors: Vec<String>) -> Self {
        Self {
            memo: String::new(),
            to_address: String::new(),
            router: None,
            expiry: None,
            tx_estimate: TxEstimate {
                input_amount: input.clone(),
                total_fees: SwapFees::zero(destination),
                slip_basis_points: 0,
                total_basis_points: 0,
                net_output: zero(destination),
                inbound_confirmation_seconds: None,
                outbound_delay_seconds: 0,
                total_swap_seconds: None,
                recommended_min_amount_in: None,
                max_streaming_quantity: None,
                streaming_swap_blocks: None,
                streaming_swap_seconds: None,
                warning: String::new(),
                can_swap: false,
                errors,
            },
        }
    }
}

// ─── Liquidity ───────────────────────────────────────────────────────────────

/// Inbound fees of a two-sided deposit or withdrawal request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpFees {
    pub asset: CryptoAmount,
    pub rune: CryptoAmount,
    /// Both sides valued in rune
    pub total: CryptoAmount,
}

impl LpFees {
    pub fn zero(asset: &Asset) -> Self {
        Self {
            asset: zero(asset),
            rune: zero_rune(),
            total: zero_rune(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateAddLp {
    pub asset_pool: String,
    /// Percent
    pub slip_percent: Decimal,
    pub pool_share: PoolShare,
    /// Percent of the pool owned after the deposit
    pub pool_ownership_percent: Decimal,
    pub lp_units: String,
    pub rune_to_asset_ratio: Decimal,
    pub inbound_fees: LpFees,
    pub estimated_wait_seconds: u64,
    pub errors: Vec<String>,
    pub can_add: bool,
}

impl EstimateAddLp {
    pub fn rejected(asset: &Asset, errors: Vec<String>) -> Self {
        Self {
            asset_pool: asset.pool_key(),
            slip_percent: Decimal::ZERO,
            pool_share: PoolShare {
                asset_share: zero(asset),
                rune_share: zero_rune(),
            },
            pool_ownership_percent: Decimal::ZERO,
            lp_units: "0".to_string(),
            rune_to_asset_ratio: Decimal::ZERO,
            inbound_fees: LpFees::zero(asset),
            estimated_wait_seconds: 0,
            errors,
            can_add: false,
        }
    }
}

/// Impermanent-loss protection accrued by a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IlProtection {
    /// Rune payable on withdrawal, never negative
    pub value: CryptoAmount,
    /// Percent of the full protection period served
    pub progress_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateWithdrawLp {
    pub asset_pool: String,
    pub withdraw_percent: Decimal,
    /// Asset and rune redeemed, at the withdrawn fraction
    pub asset_amount: CryptoAmount,
    pub rune_amount: CryptoAmount,
    pub slip_percent: Decimal,
    pub inbound_fees: LpFees,
    pub outbound_fees: LpFees,
    pub asset_dust: CryptoAmount,
    pub rune_dust: CryptoAmount,
    pub estimated_wait_seconds: u64,
    pub impermanent_loss_protection: IlProtection,
    pub lp_growth_percent: Decimal,
    pub asset_address: Option<String>,
    pub rune_address: Option<String>,
    pub errors: Vec<String>,
    pub can_withdraw: bool,
}

/// Current state of a liquidity position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub position: LiquidityProvider,
    pub pool_share: PoolShare,
    pub impermanent_loss_protection: IlProtection,
    pub lp_growth_percent: Decimal,
}

// ─── Savers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaverFees {
    pub affiliate: CryptoAmount,
    pub liquidity: CryptoAmount,
    pub outbound: CryptoAmount,
    pub total_bps: u32,
}

impl SaverFees {
    pub fn zero(asset: &Asset) -> Self {
        Self {
            affiliate: zero(asset),
            liquidity: zero(asset),
            outbound: zero(asset),
            total_bps: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateAddSaver {
    pub asset_amount: CryptoAmount,
    pub estimated_deposit_value: CryptoAmount,
    pub fee: SaverFees,
    pub expiry: DateTime<Utc>,
    pub to_address: String,
    pub memo: String,
    pub slip_basis_points: u32,
    pub estimated_wait_seconds: u64,
    pub recommended_min_amount_in: Option<CryptoAmount>,
    /// Synth supply as a percent of pool depth
    pub saver_cap_filled_percent: Decimal,
    pub can_add_saver: bool,
    pub errors: Vec<String>,
}

impl EstimateAddSaver {
    pub fn rejected(amount: &CryptoAmount, expiry: DateTime<Utc>, errors: Vec<String>) -> Self {
        let asset = amount.asset();
        Self {
            asset_amount: amount.clone(),
            estimated_deposit_value: zero(asset),
            fee: SaverFees::zero(asset),
            expiry,
            to_address: String::new(),
            memo: String::new(),
            slip_basis_points: 0,
            estimated_wait_seconds: 0,
            recommended_min_amount_in: None,
            saver_cap_filled_percent: Decimal::ZERO,
            can_add_saver: false,
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateWithdrawSaver {
    pub expected_asset_amount: CryptoAmount,
    pub fee: SaverFees,
    pub expiry: Option<DateTime<Utc>>,
    pub to_address: String,
    pub memo: String,
    pub outbound_delay_seconds: u64,
    pub inbound_delay_seconds: u64,
    pub slip_basis_points: u32,
    pub dust_amount: CryptoAmount,
    pub dust_threshold: CryptoAmount,
    pub errors: Vec<String>,
}

impl EstimateWithdrawSaver {
    pub fn rejected(asset: &Asset, errors: Vec<String>) -> Self {
        Self {
            expected_asset_amount: zero(asset),
            fee: SaverFees::zero(asset),
            expiry: None,
            to_address: String::new(),
            memo: String::new(),
            outbound_delay_seconds: 0,
            inbound_delay_seconds: 0,
            slip_basis_points: 0,
            dust_amount: zero(asset),
            dust_threshold: zero(asset),
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaverPosition {
    pub deposit_value: CryptoAmount,
    pub redeemable_value: CryptoAmount,
    pub last_add_height: u64,
    pub percentage_growth: Decimal,
    pub age_in_years: Decimal,
    pub age_in_days: Decimal,
    pub asset: Asset,
    pub errors: Vec<String>,
}

impl SaverPosition {
    pub fn rejected(asset: &Asset, errors: Vec<String>) -> Self {
        Self {
            deposit_value: zero(asset),
            redeemable_value: zero(asset),
            last_add_height: 0,
            percentage_growth: Decimal::ZERO,
            age_in_years: Decimal::ZERO,
            age_in_days: Decimal::ZERO,
            asset: asset.clone(),
            errors,
        }
    }
}

// ─── Loans ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanFees {
    pub asset: String,
    pub liquidity: String,
    pub outbound: String,
    pub total_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanOpenQuote {
    pub inbound_address: String,
    pub inbound_confirmation_seconds: Option<u64>,
    pub outbound_delay_seconds: Option<u64>,
    pub fees: LoanFees,
    pub slippage_bps: u32,
    pub router: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub warning: String,
    pub notes: String,
    pub dust_threshold: Option<String>,
    pub recommended_min_amount_in: Option<String>,
    pub memo: String,
    pub expected_amount_out: CryptoAmount,
    pub expected_collateralization_ratio: String,
    pub expected_collateral_deposited: String,
    pub expected_debt_issued: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanCloseQuote {
    pub inbound_address: String,
    pub inbound_confirmation_seconds: Option<u64>,
    pub outbound_delay_seconds: Option<u64>,
    pub fees: LoanFees,
    pub slippage_bps: u32,
    pub router: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub warning: String,
    pub notes: String,
    pub dust_threshold: Option<String>,
    pub recommended_min_amount_in: Option<String>,
    pub memo: String,
    pub expected_amount_out: CryptoAmount,
    pub expected_amount_in: String,
    pub expected_collateral_withdrawn: String,
    pub expected_debt_repaid: String,
    pub errors: Vec<String>,
}

impl LoanFees {
    pub fn zero(asset: &Asset) -> Self {
        Self {
            asset: asset.to_string(),
            liquidity: "0".to_string(),
            outbound: "0".to_string(),
            total_bps: 0,
        }
    }
}

impl LoanOpenQuote {
    pub fn rejected(target: &Asset, errors: Vec<String>) -> Self {
        Self {
            inbound_address: String::new(),
            inbound_confirmation_seconds: None,
            outbound_delay_seconds: None,
            fees: LoanFees::zero(target),
            slippage_bps: 0,
            router: None,
            expiry: None,
            warning: String::new(),
            notes: String::new(),
            dust_threshold: None,
            recommended_min_amount_in: None,
            memo: String::new(),
            expected_amount_out: zero(target),
            expected_collateralization_ratio: "0".to_string(),
            expected_collateral_deposited: "0".to_string(),
            expected_debt_issued: "0".to_string(),
            errors,
        }
    }
}

impl LoanCloseQuote {
    pub fn rejected(target: &Asset, errors: Vec<String>) -> Self {
        Self {
            inbound_address: String::new(),
            inbound_confirmation_seconds: None,
            outbound_delay_seconds: None,
            fees: LoanFees::zero(target),
            slippage_bps: 0,
            router: None,
            expiry: None,
            warning: String::new(),
            notes: String::new(),
            dust_threshold: None,
            recommended_min_amount_in: None,
            memo: String::new(),
            expected_amount_out: zero(target),
            expected_amount_in: "0".to_string(),
            expected_collateral_withdrawn: "0".to_string(),
            expected_debt_repaid: "0".to_string(),
            errors,
        }
    }
}

// ─── THORNames ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThornameDetails {
    pub name: String,
    pub owner: String,
    pub expire_block_height: u64,
    pub preferred_asset: String,
    pub affiliate_collector_rune: Option<String>,
    pub aliases: Vec<ThornameAlias>,
    pub errors: Vec<String>,
}

impl ThornameDetails {
    pub fn rejected(name: &str, errors: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            owner: String::new(),
            expire_block_height: 0,
            preferred_asset: String::new(),
            affiliate_collector_rune: None,
            aliases: Vec::new(),
            errors,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.errors.is_empty() && !self.owner.is_empty()
    }
}

/// Cost and memo of registering or updating a THORName
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThornameQuote {
    pub memo: String,
    /// Rune to send with the memo
    pub value: CryptoAmount,
    pub errors: Vec<String>,
}

impl ThornameQuote {
    pub fn rejected(errors: Vec<String>) -> Self {
        Self {
            memo: String::new(),
            value: zero_rune(),
            errors,
        }
    }
}
