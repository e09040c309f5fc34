//! CLP math
//!
//! Pure functions over 1e8 base units. Inputs are rescaled to the network's
//! 8-decimal precision before any formula runs; swap results are rescaled to
//! the output asset's native precision afterwards.
//!
//! Notation: `x` is the input amount, `X` the input-side depth and `Y` the
//! output-side depth. For liquidity, `r`/`a` are the rune/asset being added
//! and `R`/`A` the pool's rune/asset depths.

use num_bigint::BigInt;
use num_traits::Zero;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thorchain_core::{ratio_to_decimal, serde_bigint, Asset, CryptoAmount, BASE_DECIMALS};

use crate::pool::LiquidityPool;

/// Output, fee and slip of a swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapOutput {
    pub output: CryptoAmount,
    /// Liquidity fee, in the output asset for single swaps and rune for double swaps
    pub swap_fee: CryptoAmount,
    /// Fraction of the input lost to price impact, in [0, 1)
    pub slip: Decimal,
}

/// Asset and rune portions owned by a number of LP units, in 1e8 base units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolShare {
    pub asset_share: CryptoAmount,
    pub rune_share: CryptoAmount,
}

/// Block heights driving impermanent-loss protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionBlocks {
    pub current: u64,
    pub last_added: u64,
    pub full_protection: u64,
}

/// Impermanent-loss coverage and the protection accrued so far. Both may be
/// negative when the position gained relative to holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpermanentLoss {
    #[serde(with = "serde_bigint")]
    pub coverage: BigInt,
    #[serde(with = "serde_bigint")]
    pub protection: BigInt,
    /// Fraction of full protection earned, in [0, 1]
    pub progress: Decimal,
}

// =========================================================================
// Swaps
// =========================================================================

/// Swap output: `x * X * Y / (x + X)^2`
pub fn swap_output(x: &BigInt, x_depth: &BigInt, y_depth: &BigInt) -> BigInt {
    let sum = x + x_depth;
    let denominator = &sum * &sum;
    if denominator.is_zero() {
        return BigInt::zero();
    }
    x * x_depth * y_depth / denominator
}

/// Liquidity fee paid in the output asset: `x^2 * Y / (x + X)^2`
pub fn swap_fee(x: &BigInt, x_depth: &BigInt, y_depth: &BigInt) -> BigInt {
    let sum = x + x_depth;
    let denominator = &sum * &sum;
    if denominator.is_zero() {
        return BigInt::zero();
    }
    x * x * y_depth / denominator
}

/// Slip: `x / (x + X)`
pub fn swap_slip(x: &BigInt, x_depth: &BigInt) -> Decimal {
    ratio_to_decimal(x, &(x + x_depth))
}

/// (input depth, output depth) for a swap through `pool`
fn swap_depths(pool: &LiquidityPool, to_rune: bool) -> (&BigInt, &BigInt) {
    if to_rune {
        (pool.asset_depth(), pool.rune_depth())
    } else {
        (pool.rune_depth(), pool.asset_depth())
    }
}

/// Single-pool swap output in base units. `to_rune` swaps asset for rune.
pub fn pool_swap_output(x: &BigInt, pool: &LiquidityPool, to_rune: bool) -> BigInt {
    let (input, output) = swap_depths(pool, to_rune);
    swap_output(x, input, output)
}

pub fn pool_swap_fee(x: &BigInt, pool: &LiquidityPool, to_rune: bool) -> BigInt {
    let (input, output) = swap_depths(pool, to_rune);
    swap_fee(x, input, output)
}

pub fn pool_swap_slip(x: &BigInt, pool: &LiquidityPool, to_rune: bool) -> Decimal {
    let (input, _) = swap_depths(pool, to_rune);
    swap_slip(x, input)
}

/// Asset → rune through `pool1`, then rune → asset through `pool2`
pub fn double_swap_output(x: &BigInt, pool1: &LiquidityPool, pool2: &LiquidityPool) -> BigInt {
    let rune = pool_swap_output(x, pool1, true);
    pool_swap_output(&rune, pool2, false)
}

/// Total double-swap fee in rune: the first hop's fee plus the second hop's
/// fee valued at `pool2`'s price
pub fn double_swap_fee(x: &BigInt, pool1: &LiquidityPool, pool2: &LiquidityPool) -> BigInt {
    let fee1 = pool_swap_fee(x, pool1, true);
    let rune = pool_swap_output(x, pool1, true);
    let fee2 = pool_swap_fee(&rune, pool2, false);
    let fee2_in_rune = if pool2.asset_depth().is_zero() {
        BigInt::zero()
    } else {
        fee2 * pool2.rune_depth() / pool2.asset_depth()
    };
    fee1 + fee2_in_rune
}

/// Sum of both hops' slip. Not compounded.
pub fn double_swap_slip(x: &BigInt, pool1: &LiquidityPool, pool2: &LiquidityPool) -> Decimal {
    let slip1 = pool_swap_slip(x, pool1, true);
    let rune = pool_swap_output(x, pool1, true);
    let slip2 = pool_swap_slip(&rune, pool2, false);
    slip1 + slip2
}

/// Swap `input` through one pool.
///
/// The output is denominated in rune (8 decimals) when `to_rune`, otherwise
/// in the pool asset at its native decimals.
pub fn single_swap(input: &CryptoAmount, pool: &LiquidityPool, to_rune: bool) -> SwapOutput {
    let x = input.base8();
    let (asset, decimals) = if to_rune {
        (Asset::rune(), BASE_DECIMALS)
    } else {
        (pool.asset.clone(), pool.decimals)
    };
    let output = CryptoAmount::new(pool_swap_output(&x, pool, to_rune), BASE_DECIMALS, asset.clone());
    let swap_fee = CryptoAmount::new(pool_swap_fee(&x, pool, to_rune), BASE_DECIMALS, asset);
    SwapOutput {
        output: output.rescale(decimals),
        swap_fee: swap_fee.rescale(decimals),
        slip: pool_swap_slip(&x, pool, to_rune),
    }
}

/// Swap `input` from `pool1`'s asset to `pool2`'s asset via rune
pub fn double_swap(input: &CryptoAmount, pool1: &LiquidityPool, pool2: &LiquidityPool) -> SwapOutput {
    let x = input.base8();
    let output = CryptoAmount::new(
        double_swap_output(&x, pool1, pool2),
        BASE_DECIMALS,
        pool2.asset.clone(),
    );
    SwapOutput {
        output: output.rescale(pool2.decimals),
        swap_fee: CryptoAmount::new(double_swap_fee(&x, pool1, pool2), BASE_DECIMALS, Asset::rune()),
        slip: double_swap_slip(&x, pool1, pool2),
    }
}

// =========================================================================
// Liquidity
// =========================================================================

/// LP units issued for adding `rune` and `asset`: `P * (R*a + r*A) / (2*R*A)`.
///
/// An empty pool issues units equal to the rune added.
pub fn liquidity_units(rune: &BigInt, asset: &BigInt, pool: &LiquidityPool) -> BigInt {
    let p = &pool.lp_units;
    let r_depth = pool.rune_depth();
    let a_depth = pool.asset_depth();
    if p.is_zero() || r_depth.is_zero() || a_depth.is_zero() {
        return rune.clone();
    }
    let numerator = p * (r_depth * asset + rune * a_depth);
    let denominator = BigInt::from(2) * r_depth * a_depth;
    numerator / denominator
}

/// Portion of the pool owned by `units` out of `total_units`
pub fn pool_share(units: &BigInt, total_units: &BigInt, pool: &LiquidityPool) -> PoolShare {
    let (asset, rune) = if total_units.is_zero() {
        (BigInt::zero(), BigInt::zero())
    } else {
        (
            pool.asset_depth() * units / total_units,
            pool.rune_depth() * units / total_units,
        )
    };
    PoolShare {
        asset_share: CryptoAmount::new(asset, BASE_DECIMALS, pool.asset.clone()),
        rune_share: CryptoAmount::new(rune, BASE_DECIMALS, Asset::rune()),
    }
}

/// Slip from an asymmetric add: `|t*R - T*r| / (T*r + R*T)`, using the
/// depths before the deposit
pub fn slip_on_liquidity(rune: &BigInt, asset: &BigInt, pool: &LiquidityPool) -> Decimal {
    let r_depth = pool.rune_depth();
    let t_depth = pool.asset_depth();
    let numerator = asset * r_depth - t_depth * rune;
    let denominator = t_depth * rune + r_depth * t_depth;
    ratio_to_decimal(&numerator, &denominator).abs()
}

/// Units minted for the deposit as a fraction of the pool's current units.
/// The deposit is added to both depths before the units are computed.
pub fn pool_ownership(rune: &BigInt, asset: &BigInt, pool: &LiquidityPool) -> Decimal {
    let p = &pool.lp_units;
    let r_depth = pool.rune_depth() + rune;
    let a_depth = pool.asset_depth() + asset;
    if p.is_zero() || r_depth.is_zero() || a_depth.is_zero() {
        return Decimal::ONE;
    }
    let units = p * (&r_depth * asset + rune * &a_depth) / (BigInt::from(2) * &r_depth * &a_depth);
    ratio_to_decimal(&units, p)
}

/// Impermanent-loss coverage for a position deposited as `deposit` and now
/// redeemable as `current`.
///
/// With `P1 = R1/A1`: `coverage = (A0*P1 + R0) - (A1*P1 + R1)`, and the
/// protection paid is `coverage * min(1, elapsed / full_protection)`.
/// Negative results are returned as-is.
pub fn impermanent_loss(
    deposit: &PoolShare,
    current: &PoolShare,
    blocks: &ProtectionBlocks,
) -> ImpermanentLoss {
    let a0 = deposit.asset_share.base8();
    let r0 = deposit.rune_share.base8();
    let a1 = current.asset_share.base8();
    let r1 = current.rune_share.base8();

    // A1*P1 == R1, so the expression reduces to (A0*R1 + R0*A1 - 2*R1*A1) / A1
    let coverage = if a1.is_zero() {
        BigInt::zero()
    } else {
        (&a0 * &r1 + &r0 * &a1 - BigInt::from(2) * &r1 * &a1) / &a1
    };

    let elapsed = blocks.current.saturating_sub(blocks.last_added);
    let (protection, progress) = if blocks.full_protection == 0 || elapsed >= blocks.full_protection
    {
        (coverage.clone(), Decimal::ONE)
    } else {
        (
            &coverage * elapsed / blocks.full_protection,
            ratio_to_decimal(&BigInt::from(elapsed), &BigInt::from(blocks.full_protection)),
        )
    };

    ImpermanentLoss {
        coverage,
        protection,
        progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::tests::pool;
    use rust_decimal_macros::dec;

    fn big(v: u128) -> BigInt {
        BigInt::from(v)
    }

    /// 100 BTC / 2,500,000 RUNE
    fn btc_pool() -> LiquidityPool {
        pool("BTC.BTC", 10_000_000_000, 250_000_000_000_000)
    }

    /// 1,000 ETH / 3,000,000 RUNE, 18 native decimals
    fn eth_pool() -> LiquidityPool {
        let mut p = pool("ETH.ETH", 100_000_000_000, 300_000_000_000_000);
        p.decimals = 18;
        p
    }

    #[test]
    fn test_single_swap_scenario() {
        let input = CryptoAmount::new(100_000_000u64, 8, "BTC.BTC".parse().unwrap());
        let result = single_swap(&input, &btc_pool(), true);

        assert_eq!(result.output.asset(), &Asset::rune());
        assert_eq!(result.output.base_amount(), &big(2_450_740_123_517));
        assert_eq!(result.swap_fee.base_amount(), &big(24_507_401_235));
        assert!((result.slip - dec!(0.00990099)).abs() < dec!(0.00000001));
    }

    #[test]
    fn test_output_plus_fee_never_exceeds_depth() {
        let x_depth = big(10_000_000_000);
        let y_depth = big(250_000_000_000_000);
        for x in [1u128, 1_000, 100_000_000, 10_000_000_000, 1_000_000_000_000_000] {
            let x = big(x);
            let total = swap_output(&x, &x_depth, &y_depth) + swap_fee(&x, &x_depth, &y_depth);
            assert!(total <= y_depth);
            let slip = swap_slip(&x, &x_depth);
            assert!(slip >= Decimal::ZERO && slip < Decimal::ONE);
        }
    }

    #[test]
    fn test_double_swap_is_composition() {
        let btc = btc_pool();
        let eth = eth_pool();
        let x = big(50_000_000);
        let composed = pool_swap_output(&pool_swap_output(&x, &btc, true), &eth, false);
        assert_eq!(double_swap_output(&x, &btc, &eth), composed);
    }

    #[test]
    fn test_double_swap_rescales_to_output_decimals() {
        let input = CryptoAmount::new(50_000_000u64, 8, "BTC.BTC".parse().unwrap());
        let result = double_swap(&input, &btc_pool(), &eth_pool());
        let base8 = double_swap_output(&big(50_000_000), &btc_pool(), &eth_pool());
        assert_eq!(result.output.decimals(), 18);
        assert_eq!(result.output.base_amount(), &(base8 * big(10_000_000_000)));
        assert_eq!(result.swap_fee.asset(), &Asset::rune());
    }

    #[test]
    fn test_double_swap_slip_is_sum() {
        let btc = btc_pool();
        let eth = eth_pool();
        let x = big(100_000_000);
        let rune = pool_swap_output(&x, &btc, true);
        let expected = pool_swap_slip(&x, &btc, true) + pool_swap_slip(&rune, &eth, false);
        assert_eq!(double_swap_slip(&x, &btc, &eth), expected);
    }

    #[test]
    fn test_double_swap_fee_includes_both_hops() {
        let btc = btc_pool();
        let eth = eth_pool();
        let x = big(100_000_000);
        let fee1 = pool_swap_fee(&x, &btc, true);
        assert!(double_swap_fee(&x, &btc, &eth) > fee1);
    }

    #[test]
    fn test_liquidity_units_symmetric_add() {
        // Adding 1% of both sides mints 1% of the units
        let p = btc_pool();
        let units = liquidity_units(&big(2_500_000_000_000), &big(100_000_000), &p);
        assert_eq!(units, &p.lp_units / 100);
    }

    #[test]
    fn test_liquidity_units_empty_pool() {
        let p = pool("BTC.BTC", 0, 0);
        assert_eq!(liquidity_units(&big(500), &big(10), &p), big(500));
    }

    #[test]
    fn test_pool_share_linear_in_units() {
        let p = btc_pool();
        let total = p.lp_units.clone();
        let one = pool_share(&big(1_000_000_000), &total, &p);
        let two = pool_share(&big(2_000_000_000), &total, &p);
        assert_eq!(two.asset_share.base_amount(), &(one.asset_share.base_amount() * 2));
        assert_eq!(two.rune_share.base_amount(), &(one.rune_share.base_amount() * 2));
        // 1e9 of 2.5e14 units is 1/250_000 of each depth
        assert_eq!(one.asset_share.base_amount(), &big(40_000));
        assert_eq!(one.rune_share.base_amount(), &big(1_000_000_000));
    }

    #[test]
    fn test_slip_on_symmetric_add_is_zero() {
        let p = btc_pool();
        let slip = slip_on_liquidity(&big(2_500_000_000_000), &big(100_000_000), &p);
        assert_eq!(slip, Decimal::ZERO);
    }

    #[test]
    fn test_slip_on_asymmetric_add() {
        let p = btc_pool();
        // Asset-only add: t*R / (R*T) = t / T
        let slip = slip_on_liquidity(&BigInt::zero(), &big(100_000_000), &p);
        assert_eq!(slip, dec!(0.01));
    }

    #[test]
    fn test_pool_ownership_counts_the_deposit() {
        let p = btc_pool();
        // Doubling both depths leaves the depositor with half the pool
        let share = pool_ownership(&big(250_000_000_000_000), &big(10_000_000_000), &p);
        assert_eq!(share, dec!(0.5));
    }

    #[test]
    fn test_pool_ownership_of_small_symmetric_add() {
        let p = btc_pool();
        // 1% of both depths mints P/101 units against the grown depths
        let share = pool_ownership(&big(2_500_000_000_000), &big(100_000_000), &p);
        let expected = ratio_to_decimal(&(&p.lp_units / 101), &p.lp_units);
        assert_eq!(share, expected);
        assert!(share > dec!(0.0099) && share < dec!(0.0100));
    }

    #[test]
    fn test_impermanent_loss_coverage() {
        let asset: Asset = "BTC.BTC".parse().unwrap();
        let share = |a: u64, r: u64| PoolShare {
            asset_share: CryptoAmount::new(a, 8, asset.clone()),
            rune_share: CryptoAmount::new(r, 8, Asset::rune()),
        };
        let deposit = share(100, 100);
        let current = share(50, 200);

        let full = impermanent_loss(
            &deposit,
            &current,
            &ProtectionBlocks {
                current: 2_000,
                last_added: 0,
                full_protection: 1_000,
            },
        );
        assert_eq!(full.coverage, big(100));
        assert_eq!(full.protection, big(100));
        assert_eq!(full.progress, Decimal::ONE);

        let half = impermanent_loss(
            &deposit,
            &current,
            &ProtectionBlocks {
                current: 1_500,
                last_added: 1_000,
                full_protection: 1_000,
            },
        );
        assert_eq!(half.protection, big(50));
        assert_eq!(half.progress, dec!(0.5));
    }

    #[test]
    fn test_impermanent_loss_not_clamped() {
        let asset: Asset = "BTC.BTC".parse().unwrap();
        let deposit = PoolShare {
            asset_share: CryptoAmount::new(100u32, 8, asset.clone()),
            rune_share: CryptoAmount::new(100u32, 8, Asset::rune()),
        };
        // Unchanged price and a grown position: holding would have been worse
        let current = PoolShare {
            asset_share: CryptoAmount::new(110u32, 8, asset),
            rune_share: CryptoAmount::new(110u32, 8, Asset::rune()),
        };
        let il = impermanent_loss(
            &deposit,
            &current,
            &ProtectionBlocks {
                current: 10,
                last_added: 0,
                full_protection: 0,
            },
        );
        assert_eq!(il.coverage, BigInt::from(-20));
        assert_eq!(il.protection, BigInt::from(-20));
    }
}
