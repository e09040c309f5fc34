//! thorchain-core: Shared types, errors, and configuration
//!
//! This crate provides the foundational types used across the thorquote workspace.

pub mod amount;
pub mod asset;
pub mod config;
pub mod errors;
pub mod types;

pub use amount::*;
pub use asset::*;
pub use config::*;
pub use errors::*;
pub use types::*;
