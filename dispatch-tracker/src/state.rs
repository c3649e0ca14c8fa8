//! Shared application state of the HTTP surface.
//!
//! One [`AppState`] is built at startup and shared behind an `Arc` by every handler. It holds
//! no mutable data: each request drives its own submission and tracking.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::signer::TransactionSigner;
use crate::tx_submitter::SubmissionPipeline;
use crate::tx_tracker::ConfirmationTracker;

/// Components used by the request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Signs, sends and tracks operations.
    pub pipeline: SubmissionPipeline,

    /// Tracks already submitted transactions and inspects single blocks.
    pub tracker: ConfirmationTracker,

    /// The attached wallet. `None` when the service runs without a key, in which case every
    /// submission is refused.
    pub signer: Option<Arc<dyn TransactionSigner>>,

    /// Fired on shutdown to abandon in-flight tracking.
    pub shutdown: CancellationToken,
}
