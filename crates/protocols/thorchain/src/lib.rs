//! THORChain pricing engine
//!
//! Pool snapshots behind a TTL cache, constant-product (CLP) math, a quoting
//! orchestrator over Midgard and Thornode, and an inbound-transaction
//! progress tracker.

pub mod cache;
pub mod calculator;
pub mod constants;
pub mod estimates;
pub mod fees;
pub mod inbound;
pub mod memo;
pub mod pool;
pub mod progress;
pub mod query;

#[cfg(test)]
mod fixtures;

// Re-exports
pub use cache::{CacheSlot, ThorchainCache};
pub use calculator::{
    double_swap, impermanent_loss, liquidity_units, pool_ownership, pool_share, single_swap,
    slip_on_liquidity, ImpermanentLoss, PoolShare, ProtectionBlocks, SwapOutput,
};
pub use estimates::{
    EstimateAddLp, EstimateAddSaver, EstimateWithdrawLp, EstimateWithdrawSaver, IlProtection,
    LiquidityPosition, LoanCloseQuote, LoanFees, LoanOpenQuote, LpFees, SaverFees, SaverPosition,
    SwapFees, ThornameDetails, ThornameQuote, TxDetails, TxEstimate,
};
pub use fees::{calc_network_fee, calc_outbound_fee, get_dust_values, DustValues};
pub use inbound::InboundDetail;
pub use memo::{classify, parse_memo, Memo, TxType};
pub use pool::{LiquidityPool, PoolStatus};
pub use progress::{
    InboundStatus, InboundTx, ProgressDetail, ProgressStatus, TransactionTracker, TxProgress,
};
pub use query::{
    AddLiquidityParams, LoanCloseParams, LoanOpenParams, QuoteSwapParams, ThorchainQuery,
    ThornameParams, WithdrawLiquidityParams, WithdrawSaverParams,
};
