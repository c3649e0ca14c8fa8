//! dispatch-tracker api

/// Handlers submitting asset and liquidity operations
pub mod operations;

/// Handlers reporting the status of submitted extrinsics
pub mod extrinsics;
