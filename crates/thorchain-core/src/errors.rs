//! Error types for thorquote
//!
//! Only hard failures live here. Advisory problems with a quote (remote
//! quote errors, halted chains, amounts below minimums) are collected as
//! strings on the estimate itself and never surface as an `Error`.

use thiserror::Error;

/// Core errors that can occur in thorquote
#[derive(Debug, Error)]
pub enum Error {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Transport, decoding and failover errors from the Midgard/Thornode clients
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Endpoint unreachable at {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to parse response from {url}: {message}")]
    ParseError { url: String, message: String },

    #[error("{service} not responding ({attempts} endpoints tried, last error: {last})")]
    AllEndpointsFailed {
        service: &'static str,
        attempts: usize,
        last: String,
    },

    #[error("No endpoints configured for {service}")]
    NoEndpoints { service: &'static str },
}

/// Domain errors raised when the engine cannot answer at all
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Pool not found for {asset}")]
    PoolNotFound { asset: String },

    #[error("{asset} is the native asset and has no pool")]
    NoPoolForNativeAsset { asset: String },

    #[error("Invalid asset string: {input}")]
    InvalidAsset { input: String },

    #[error("Unknown chain: {chain}")]
    UnknownChain { chain: String },

    #[error("Cache slot {slot} unavailable: {reason}")]
    CacheUnavailable { slot: &'static str, reason: String },

    #[error("Cannot combine {left} with {right}")]
    AssetMismatch { left: String, right: String },

    #[error("Transaction lookup failed for {hash}: {reason}")]
    TxLookup { hash: String, reason: String },

    #[error("Liquidity position not found for {address} in {pool}")]
    PositionNotFound { pool: String, address: String },

    #[error("Missing network value {key}")]
    MissingNetworkValue { key: String },

    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },
}

/// Result type alias for thorquote operations
pub type Result<T> = std::result::Result<T, Error>;

impl QueryError {
    /// Get a stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PoolNotFound { .. } => "pool_not_found",
            Self::NoPoolForNativeAsset { .. } => "no_pool_for_native_asset",
            Self::InvalidAsset { .. } => "invalid_asset",
            Self::UnknownChain { .. } => "unknown_chain",
            Self::CacheUnavailable { .. } => "cache_unavailable",
            Self::AssetMismatch { .. } => "asset_mismatch",
            Self::TxLookup { .. } => "tx_lookup_failed",
            Self::PositionNotFound { .. } => "position_not_found",
            Self::MissingNetworkValue { .. } => "missing_network_value",
            Self::InvalidParams { .. } => "invalid_params",
        }
    }
}

impl Error {
    /// Error code for any error, delegating to the domain code where one exists
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Client(_) => "client_error",
            Self::Query(e) => e.error_code(),
            Self::Config(_) => "config_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: Error = QueryError::PoolNotFound {
            asset: "BTC.BTC".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "pool_not_found");

        let err: Error = ClientError::NoEndpoints { service: "midgard" }.into();
        assert_eq!(err.error_code(), "client_error");
    }

    #[test]
    fn test_failover_message() {
        let err = ClientError::AllEndpointsFailed {
            service: "THORNode",
            attempts: 3,
            last: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "THORNode not responding (3 endpoints tried, last error: timeout)"
        );
    }
}
