//! THORChain constants
//!
//! Network-value keys, fixed fees and timing parameters used by the quoting
//! and tracking layers.

/// Keys into the merged constants/mimir map (upper-cased)
pub mod network_keys {
    pub const MIN_TX_OUT_VOLUME_THRESHOLD: &str = "MINTXOUTVOLUMETHRESHOLD";
    pub const TX_OUT_DELAY_RATE: &str = "TXOUTDELAYRATE";
    pub const MAX_TX_OUT_OFFSET: &str = "MAXTXOUTOFFSET";
    pub const FULL_IMP_LOSS_PROTECTION_BLOCKS: &str = "FULLIMPLOSSPROTECTIONBLOCKS";
    pub const TNS_REGISTER_FEE: &str = "TNSREGISTERFEE";
    pub const TNS_FEE_PER_BLOCK: &str = "TNSFEEPERBLOCK";

    pub const HALT_CHAIN_GLOBAL: &str = "HALTCHAINGLOBAL";
    pub const HALT_TRADING: &str = "HALTTRADING";
    pub const PAUSE_LP: &str = "PAUSELP";

    /// `HALT{CHAIN}CHAIN`
    pub fn halt_chain(chain: &str) -> String {
        format!("HALT{}CHAIN", chain)
    }

    /// `HALT{CHAIN}TRADING`
    pub fn halt_trading(chain: &str) -> String {
        format!("HALT{}TRADING", chain)
    }

    /// `PAUSELP{CHAIN}`
    pub fn pause_lp(chain: &str) -> String {
        format!("PAUSELP{}", chain)
    }
}

/// Fixed fees, in base units
pub mod fees {
    /// Native RUNE transaction fee (0.02 RUNE)
    pub const NATIVE_RUNE_FEE: u64 = 2_000_000;

    /// Gas limit of a plain EVM transfer
    pub const EVM_NATIVE_GAS_LIMIT: u64 = 21_000;

    /// Gas limit of an ERC-20 transfer through the router
    pub const EVM_TOKEN_GAS_LIMIT: u64 = 70_000;

    /// gwei to wei
    pub const GWEI: u64 = 1_000_000_000;

    /// Precision of EVM gas assets
    pub const EVM_DECIMALS: u8 = 18;
}

/// Timing
pub mod timing {
    /// THORChain blocks per year at six-second blocks
    pub const BLOCKS_PER_YEAR: u64 = 5_256_000;

    /// Lifetime of a saver deposit quote
    pub const SAVER_QUOTE_EXPIRY_MINUTES: i64 = 15;

    /// Shortest hash the tracker will look up
    pub const MIN_TX_HASH_LEN: usize = 32;

    /// Settled hashes a tracker remembers
    pub const SETTLED_HASH_CAPACITY: usize = 1_024;

    /// Fee multiple an LP deposit side must exceed
    pub const LP_FEE_SAFETY_MULTIPLE: u64 = 3;
}

/// Basis-point denominator
pub const MAX_BPS: u32 = 10_000;
