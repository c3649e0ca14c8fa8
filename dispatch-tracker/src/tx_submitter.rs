//! Submit-and-confirm pipeline.
use std::sync::Arc;

use log::{error, info};
use snafu::{ResultExt, Snafu};
use tokio_util::sync::CancellationToken;

use crate::chain_client::{BlockHash, ChainClient, SubmissionId};
use crate::error::Error;
use crate::operations::OperationDescriptor;
use crate::signer::TransactionSigner;
use crate::tx_tracker::{ConfirmationTracker, Outcome, PollTarget};

/// Why a submission did not reach a terminal [`Outcome`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SubmissionError {
    /// No wallet is attached. Nothing was sent.
    #[snafu(display("No signer attached, connect a wallet first"))]
    SignerMissing,

    /// Signing or handing the transaction to the node failed.
    #[snafu(display("{source}"))]
    Send {
        /// The client error.
        source: Error,
    },

    /// The transaction was accepted but tracking it failed.
    #[snafu(display("{source}"))]
    Tracking {
        /// Identifier returned by the node's ingress.
        tx_hash: SubmissionId,
        /// The client error.
        source: Error,
    },
}

impl SubmissionError {
    /// The transaction hash, when the node had accepted the transaction.
    pub fn tx_hash(&self) -> Option<&SubmissionId> {
        match self {
            SubmissionError::Tracking { tx_hash, .. } => Some(tx_hash),
            _ => None,
        }
    }
}

/// A submission that reached a terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Identifier returned by the node's ingress.
    pub tx_hash: SubmissionId,
    /// Terminal classification.
    pub outcome: Outcome,
    /// Block the transaction was found in.
    pub block_hash: Option<BlockHash>,
}

/// Signs, sends and tracks operations.
#[derive(Clone)]
pub struct SubmissionPipeline {
    client: Arc<dyn ChainClient>,
    tracker: ConfirmationTracker,
}

impl SubmissionPipeline {
    /// Creates a pipeline sending through `client` and confirming with `tracker`.
    pub fn new(client: Arc<dyn ChainClient>, tracker: ConfirmationTracker) -> Self {
        Self { client, tracker }
    }

    /// Submits `descriptor` signed by `signer` and waits for its outcome.
    pub async fn submit(
        &self,
        descriptor: OperationDescriptor,
        signer: Option<&dyn TransactionSigner>,
    ) -> Result<Submission, SubmissionError> {
        self.submit_with_cancellation(descriptor, signer, &CancellationToken::new())
            .await
    }

    /// Like [`SubmissionPipeline::submit`], with tracking abandoned when `cancel` fires.
    ///
    /// A missing signer fails before any request reaches the node.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - The call to sign and send.
    /// * `signer` - The attached signer, `None` when no wallet is connected.
    /// * `cancel` - Token that abandons confirmation tracking.
    ///
    /// # Returns
    ///
    /// Returns the transaction hash with its outcome, or a `SubmissionError` that keeps the hash
    /// whenever the node had already accepted the transaction.
    pub async fn submit_with_cancellation(
        &self,
        descriptor: OperationDescriptor,
        signer: Option<&dyn TransactionSigner>,
        cancel: &CancellationToken,
    ) -> Result<Submission, SubmissionError> {
        let Some(signer) = signer else {
            error!("❌ Refusing to submit {descriptor}: no signer attached");
            return Err(SubmissionError::SignerMissing);
        };

        let since = match self.tracker.config().poll_target {
            PollTarget::NextBlock => {
                Some(self.client.latest_block_hash().await.context(SendSnafu)?)
            }
            PollTarget::Latest => None,
        };

        info!("📤 Submitting {descriptor} from {}", signer.address());
        let tx_hash = match self.client.submit(&descriptor, signer).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                error!("❌ Failed to submit {descriptor}: {err}");
                return Err(SubmissionError::Send { source: err });
            }
        };
        info!("✅ {descriptor} accepted by the node: {tx_hash}");

        let tracked = self
            .tracker
            .track_with_cancellation(&tx_hash, since, cancel)
            .await
            .context(TrackingSnafu {
                tx_hash: tx_hash.clone(),
            })?;

        Ok(Submission {
            tx_hash,
            outcome: tracked.outcome,
            block_hash: tracked.block_hash,
        })
    }
}
