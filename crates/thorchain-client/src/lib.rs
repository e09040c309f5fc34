//! thorchain-client: Midgard and Thornode collaborators
//!
//! The query engine never builds HTTP clients itself. It depends on the two
//! traits below; [`MidgardClient`] and [`ThornodeClient`] implement them over
//! reqwest with ordered endpoint failover, and tests substitute in-memory fakes.

pub mod failover;
pub mod http;
pub mod midgard;
pub mod thornode;

use std::collections::HashMap;

use async_trait::async_trait;
use thorchain_core::ClientError;

pub use failover::Failover;
pub use http::{HttpEndpoint, RemoteError};
pub use midgard::{
    InboundAddress, MemberDetails, MemberPool, MidgardClient, PoolDetail, SaverDetails,
    SaverPool, ThornameEntry, ThornameLookup,
};
pub use thornode::{
    Coin, LastBlock, LiquidityProvider, LoanCloseRequest, LoanOpenRequest, ObservedTx,
    QuoteFees, QuoteLoanCloseResponse, QuoteLoanOpenResponse, QuoteSaverDepositResponse,
    QuoteSaverWithdrawResponse, QuoteSwapResponse, Saver, SwapQuoteRequest, ThornameAlias,
    ThornameResponse, ThornodeClient, ThornodePool, Tx, TxDetailsResponse, TxOutItem,
};

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Pool and network metadata reader (Midgard)
#[async_trait]
pub trait PoolMetadataSource: Send + Sync {
    async fn get_pools(&self) -> Result<Vec<PoolDetail>>;

    async fn get_latest_block_height(&self) -> Result<u64>;

    async fn get_inbound_addresses(&self) -> Result<Vec<InboundAddress>>;

    /// Network constants merged with mimir overrides, keys upper-cased
    async fn get_network_values(&self) -> Result<HashMap<String, i64>>;

    async fn get_member(&self, address: &str) -> Result<MemberDetails>;

    async fn get_savers(&self, address: &str) -> Result<SaverDetails>;

    async fn get_thorname_detail(&self, name: &str) -> Result<Option<ThornameLookup>>;
}

/// Quote and ledger-state reader (Thornode)
///
/// Quote methods return the remote service's own error in the response's
/// `error` field; `Err` is reserved for transport failures.
#[async_trait]
pub trait NodeQuoteSource: Send + Sync {
    async fn get_pools(&self) -> Result<Vec<ThornodePool>>;

    async fn get_swap_quote(&self, request: &SwapQuoteRequest) -> Result<QuoteSwapResponse>;

    async fn get_savers_deposit_quote(
        &self,
        asset: &str,
        amount: u128,
    ) -> Result<QuoteSaverDepositResponse>;

    async fn get_savers_withdraw_quote(
        &self,
        asset: &str,
        address: &str,
        withdraw_bps: u32,
    ) -> Result<QuoteSaverWithdrawResponse>;

    async fn get_loan_quote_open(&self, request: &LoanOpenRequest) -> Result<QuoteLoanOpenResponse>;

    async fn get_loan_quote_close(
        &self,
        request: &LoanCloseRequest,
    ) -> Result<QuoteLoanCloseResponse>;

    async fn get_thorname_details(
        &self,
        name: &str,
        height: Option<u64>,
    ) -> Result<ThornameResponse>;

    async fn get_last_block(&self, height: Option<u64>) -> Result<Vec<LastBlock>>;

    async fn get_scheduled_outbound_queue(&self) -> Result<Vec<TxOutItem>>;

    async fn get_liquidity_provider(
        &self,
        pool: &str,
        address: &str,
    ) -> Result<Option<LiquidityProvider>>;

    async fn get_saver(&self, pool: &str, address: &str) -> Result<Option<Saver>>;

    /// `None` when the node has never seen the hash
    async fn get_tx_detail(&self, hash: &str) -> Result<Option<TxDetailsResponse>>;

    async fn get_tc_constants(&self) -> Result<HashMap<String, i64>>;
}
