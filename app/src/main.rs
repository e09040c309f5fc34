//! thorquote: THORChain quotes, estimates and transaction tracking from the
//! command line. Every command prints pretty JSON on stdout; logs go to stderr.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use thorchain_client::{MidgardClient, ThornodeClient};
use thorchain_core::{Asset, Chain, CryptoAmount, Network, ThorchainConfig};
use thorchain_query::{
    AddLiquidityParams, LoanCloseParams, LoanOpenParams, QuoteSwapParams, ThorchainCache,
    ThorchainQuery, ThornameParams, TransactionTracker, WithdrawLiquidityParams,
    WithdrawSaverParams,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "thorquote")]
#[command(about = "THORChain swap, liquidity, saver and loan quotes", long_about = None)]
struct Cli {
    /// TOML config file; overrides --network
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value = "mainnet")]
    network: Network,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List pools keyed by CHAIN.TICKER
    Pools,
    /// Units of --to one unit of --from is worth at pool prices
    Rate {
        #[arg(long)]
        from: Asset,
        #[arg(long)]
        to: Asset,
    },
    /// Quote a swap through Thornode
    QuoteSwap {
        #[arg(long)]
        from: Asset,
        #[arg(long)]
        to: Asset,
        /// Whole units of --from
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        destination: Option<String>,
        #[arg(long)]
        streaming_interval: Option<u64>,
        #[arg(long)]
        streaming_quantity: Option<u64>,
        #[arg(long)]
        tolerance_bps: Option<u32>,
        #[arg(long)]
        affiliate: Option<String>,
        #[arg(long)]
        affiliate_bps: Option<u32>,
        #[arg(long)]
        height: Option<u64>,
    },
    /// Estimate a liquidity deposit
    AddLp {
        #[arg(long)]
        asset: Asset,
        #[arg(long, default_value_t = Decimal::ZERO)]
        asset_amount: Decimal,
        #[arg(long, default_value_t = Decimal::ZERO)]
        rune_amount: Decimal,
    },
    /// Estimate withdrawing part of a liquidity position
    WithdrawLp {
        #[arg(long)]
        asset: Asset,
        /// Percent of the position, 0-100
        #[arg(long, default_value_t = Decimal::ONE_HUNDRED)]
        percentage: Decimal,
        #[arg(long)]
        rune_address: Option<String>,
        #[arg(long)]
        asset_address: Option<String>,
    },
    /// Current state of a liquidity position
    LpPosition {
        #[arg(long)]
        asset: Asset,
        #[arg(long)]
        address: String,
    },
    /// Estimate a saver deposit
    AddSaver {
        #[arg(long)]
        asset: Asset,
        #[arg(long)]
        amount: Decimal,
    },
    /// Estimate a saver withdrawal
    WithdrawSaver {
        #[arg(long)]
        asset: Asset,
        #[arg(long)]
        address: String,
        #[arg(long, default_value_t = 10_000)]
        bps: u32,
    },
    /// Current state of a saver position
    SaverPosition {
        #[arg(long)]
        asset: Asset,
        #[arg(long)]
        address: String,
    },
    /// Quote opening a loan
    LoanOpen {
        #[arg(long)]
        collateral: Asset,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        target: Asset,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        min_out: Option<String>,
        #[arg(long)]
        affiliate: Option<String>,
        #[arg(long)]
        affiliate_bps: Option<u32>,
        #[arg(long)]
        height: Option<u64>,
    },
    /// Quote repaying a loan
    LoanClose {
        #[arg(long)]
        repay_asset: Asset,
        #[arg(long, default_value_t = 10_000)]
        repay_bps: u32,
        #[arg(long)]
        collateral: Asset,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        min_out: Option<String>,
        #[arg(long)]
        height: Option<u64>,
    },
    /// Look up a THORName
    Thorname {
        name: String,
        #[arg(long)]
        height: Option<u64>,
    },
    /// Cost and memo of registering or updating a THORName
    ThornameEstimate {
        name: String,
        #[arg(long)]
        chain: Chain,
        #[arg(long)]
        address: String,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        preferred_asset: Option<Asset>,
        /// RFC 3339 expiry, e.g. 2027-01-01T00:00:00Z
        #[arg(long)]
        expiry: Option<DateTime<Utc>>,
        #[arg(long)]
        update: bool,
    },
    /// Seconds an outbound of this size is held before signing
    OutboundDelay {
        #[arg(long)]
        asset: Asset,
        #[arg(long)]
        amount: Decimal,
    },
    /// Seconds until an inbound of this size is final on its chain
    ConfCounting {
        #[arg(long)]
        asset: Asset,
        #[arg(long)]
        amount: Decimal,
    },
    /// Progress of an inbound transaction
    Track {
        hash: String,
        /// Keep polling until the transaction settles
        #[arg(long)]
        watch: bool,
        #[arg(long, default_value_t = 15)]
        interval_secs: u64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ThorchainConfig> {
    match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(ThorchainConfig::for_network(cli.network)),
    }
}

/// Whole units of `asset` at its native precision
async fn amount_of(cache: &ThorchainCache, asset: &Asset, units: Decimal) -> Result<CryptoAmount> {
    let decimals = cache
        .decimals_for(asset)
        .await
        .with_context(|| format!("looking up decimals for {}", asset))?;
    Ok(CryptoAmount::from_units(units, decimals, asset.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("thorquote=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::info!(network = %config.network, "Starting thorquote");

    let midgard = MidgardClient::new(&config.midgard)?;
    let thornode = ThornodeClient::new(&config.thornode)?;
    let cache = Arc::new(ThorchainCache::new(
        Arc::new(midgard),
        Arc::new(thornode),
        &config.cache,
    ));
    let query = Arc::new(ThorchainQuery::new(cache.clone()));

    match cli.command {
        Commands::Pools => {
            let pools = cache.get_pools().await?;
            let sorted: BTreeMap<_, _> = pools.iter().collect();
            print_json(&sorted)?;
        }
        Commands::Rate { from, to } => {
            let rate = cache.get_exchange_rate(&from, &to).await?;
            print_json(&serde_json::json!({
                "from": from,
                "to": to,
                "rate": rate,
            }))?;
        }
        Commands::QuoteSwap {
            from,
            to,
            amount,
            destination,
            streaming_interval,
            streaming_quantity,
            tolerance_bps,
            affiliate,
            affiliate_bps,
            height,
        } => {
            let mut params = QuoteSwapParams::new(amount_of(&cache, &from, amount).await?, to);
            params.destination_address = destination;
            params.streaming_interval = streaming_interval;
            params.streaming_quantity = streaming_quantity;
            params.tolerance_bps = tolerance_bps;
            params.affiliate_address = affiliate;
            params.affiliate_bps = affiliate_bps;
            params.height = height;
            print_json(&query.quote_swap(&params).await?)?;
        }
        Commands::AddLp {
            asset,
            asset_amount,
            rune_amount,
        } => {
            let params = AddLiquidityParams {
                asset: amount_of(&cache, &asset, asset_amount).await?,
                rune: amount_of(&cache, &Asset::rune(), rune_amount).await?,
            };
            print_json(&query.estimate_add_lp(&params).await?)?;
        }
        Commands::WithdrawLp {
            asset,
            percentage,
            rune_address,
            asset_address,
        } => {
            let params = WithdrawLiquidityParams {
                asset,
                percentage,
                asset_address,
                rune_address,
            };
            print_json(&query.estimate_withdraw_lp(&params).await?)?;
        }
        Commands::LpPosition { asset, address } => {
            print_json(&query.check_liquidity_position(&asset, &address).await?)?;
        }
        Commands::AddSaver { asset, amount } => {
            let amount = amount_of(&cache, &asset, amount).await?;
            print_json(&query.estimate_add_saver(&amount).await?)?;
        }
        Commands::WithdrawSaver {
            asset,
            address,
            bps,
        } => {
            let params = WithdrawSaverParams {
                asset,
                address,
                withdraw_bps: bps,
            };
            print_json(&query.estimate_withdraw_saver(&params).await?)?;
        }
        Commands::SaverPosition { asset, address } => {
            print_json(&query.get_saver_position(&asset, &address).await?)?;
        }
        Commands::LoanOpen {
            collateral,
            amount,
            target,
            destination,
            min_out,
            affiliate,
            affiliate_bps,
            height,
        } => {
            let params = LoanOpenParams {
                amount: amount_of(&cache, &collateral, amount).await?,
                target_asset: target,
                destination,
                min_out,
                affiliate_bps,
                affiliate,
                height,
            };
            print_json(&query.get_loan_quote_open(&params).await?)?;
        }
        Commands::LoanClose {
            repay_asset,
            repay_bps,
            collateral,
            owner,
            min_out,
            height,
        } => {
            let params = LoanCloseParams {
                repay_asset,
                repay_bps,
                collateral_asset: collateral,
                loan_owner: owner,
                min_out,
                height,
            };
            print_json(&query.get_loan_quote_close(&params).await?)?;
        }
        Commands::Thorname { name, height } => {
            print_json(&query.get_thorname_details(&name, height).await?)?;
        }
        Commands::ThornameEstimate {
            name,
            chain,
            address,
            owner,
            preferred_asset,
            expiry,
            update,
        } => {
            let params = ThornameParams {
                name,
                chain,
                chain_address: address,
                owner,
                preferred_asset,
                expiry,
                is_update: update,
            };
            print_json(&query.estimate_thorname(&params).await?)?;
        }
        Commands::OutboundDelay { asset, amount } => {
            let amount = amount_of(&cache, &asset, amount).await?;
            let seconds = query.outbound_delay(&amount).await?;
            print_json(&serde_json::json!({ "amount": amount, "seconds": seconds }))?;
        }
        Commands::ConfCounting { asset, amount } => {
            let amount = amount_of(&cache, &asset, amount).await?;
            let seconds = query.conf_counting(&amount).await?;
            print_json(&serde_json::json!({ "amount": amount, "seconds": seconds }))?;
        }
        Commands::Track {
            hash,
            watch,
            interval_secs,
        } => {
            let tracker = TransactionTracker::new(query.clone());
            loop {
                let progress = tracker.check_tx_progress(&hash).await?;
                print_json(&progress)?;
                if !watch || tracker.is_settled(&hash).await {
                    break;
                }
                tracing::debug!(hash = %hash, "Not settled, polling again in {}s", interval_secs);
                tokio::time::sleep(Duration::from_secs(interval_secs)).await;
            }
        }
    }

    Ok(())
}
