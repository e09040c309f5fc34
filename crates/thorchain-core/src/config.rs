//! Configuration types for thorquote

use serde::{Deserialize, Serialize};

use crate::Network;

/// Ordered list of base URLs for one upstream service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Tried in order; the first successful response wins
    pub base_urls: Vec<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl EndpointConfig {
    pub fn new(base_urls: &[&str]) -> Self {
        Self {
            base_urls: base_urls.iter().map(|u| u.to_string()).collect(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Midgard endpoints for a network
    pub fn midgard(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::new(&[
                "https://midgard.ninerealms.com",
                "https://midgard.thorchain.info",
                "https://midgard.thorswap.net",
            ]),
            Network::Stagenet => Self::new(&["https://stagenet-midgard.ninerealms.com"]),
        }
    }

    /// Thornode endpoints for a network
    pub fn thornode(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::new(&[
                "https://thornode.ninerealms.com",
                "https://thornode.thorswap.net",
                "https://thornode.thorchain.info",
            ]),
            Network::Stagenet => Self::new(&["https://stagenet-thornode.ninerealms.com"]),
        }
    }
}

/// Expiry for each cache slot, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_pool_ttl_ms")]
    pub pool_ttl_ms: u64,

    #[serde(default = "default_long_ttl_ms")]
    pub inbound_addresses_ttl_ms: u64,

    #[serde(default = "default_pool_ttl_ms")]
    pub inbound_details_ttl_ms: u64,

    #[serde(default = "default_long_ttl_ms")]
    pub network_values_ttl_ms: u64,
}

fn default_pool_ttl_ms() -> u64 {
    6_000
}

fn default_long_ttl_ms() -> u64 {
    10 * 60 * 1000 // 10 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pool_ttl_ms: default_pool_ttl_ms(),
            inbound_addresses_ttl_ms: default_long_ttl_ms(),
            inbound_details_ttl_ms: default_pool_ttl_ms(),
            network_values_ttl_ms: default_long_ttl_ms(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThorchainConfig {
    pub network: Network,

    pub midgard: EndpointConfig,

    pub thornode: EndpointConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl ThorchainConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            midgard: EndpointConfig::midgard(network),
            thornode: EndpointConfig::thornode(network),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for ThorchainConfig {
    fn default() -> Self {
        Self::for_network(Network::Mainnet)
    }
}
