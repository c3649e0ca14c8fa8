//! # Dispatch Tracker
//!
//! Submits signed asset and liquidity operations to a Substrate node and tracks each one until
//! it is confirmed as succeeded or failed, or until the polling budget runs out. Failed
//! operations carry the decoded pallet error as their reason.

/// Error handling module.
///
/// Defines the crate-wide error type using the `snafu` crate.
pub mod error;

/// Cryptographic signer module.
///
/// The signer capability used to authorize transactions, and loading sr25519 keys from disk.
pub mod signer;

/// Node access: latest block, blocks, events and transaction ingress.
pub mod chain_client;

/// Decoding of dispatch errors into readable reasons.
pub mod error_decoder;

/// Confirmation tracking module.
///
/// Polls the chain until a submitted transaction is located in a block and classifies its
/// outcome from the block's events.
pub mod tx_tracker;

/// Transaction submission module.
///
/// Signs and sends an operation, then drives the confirmation tracker to a terminal outcome.
pub mod tx_submitter;

/// Call descriptors for the supported operations
pub mod operations;

/// Api
pub mod api;

/// Data models
pub mod model;

/// Utils
pub mod utils;

/// Represents the state of the api
pub mod state;

#[cfg(test)]
mod test_utils;
