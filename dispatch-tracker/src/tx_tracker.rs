//! Confirmation tracking by polling.
//!
//! The node offers no inclusion notification the tracker can rely on, so [`ConfirmationTracker`]
//! asks for the best block every `delay_ms`, looks for the submission among the block's
//! extrinsics and, once found, classifies the outcome from the events emitted at the
//! extrinsic's phase. Attempts for one submission run strictly in sequence; independent
//! submissions share nothing but the client.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::chain_client::{BlockHash, BlockSnapshot, ChainClient, ChainEvent, Phase, SubmissionId};
use crate::error::{Error, Result};
use crate::error_decoder::ErrorDecoder;

/// Which blocks each polling attempt looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PollTarget {
    /// Only the best block at the time of the attempt.
    #[default]
    Latest,
    /// Every block produced since the last attempt, oldest first.
    NextBlock,
}

/// Polling policy.
#[derive(Debug, Clone, PartialEq, Eq, clap::Args)]
pub struct TrackerConfig {
    /// Number of polling attempts before giving up on a submission
    #[arg(
        long = "tracker-attempt-limit",
        env = "TRACKER_ATTEMPT_LIMIT",
        default_value_t = 30
    )]
    pub attempt_limit: u32,

    /// Wait between two polling attempts, in milliseconds
    #[arg(
        long = "tracker-delay-ms",
        env = "TRACKER_DELAY_MS",
        default_value_t = 2000
    )]
    pub delay_ms: u64,

    /// Blocks inspected per attempt: the latest one, or all blocks since the previous attempt
    #[arg(
        long = "tracker-poll-target",
        env = "TRACKER_POLL_TARGET",
        value_enum,
        default_value_t = PollTarget::Latest
    )]
    pub poll_target: PollTarget,

    /// Upper bound of blocks walked back per attempt with `next-block`
    #[arg(
        long = "tracker-max-catch-up",
        env = "TRACKER_MAX_CATCH_UP",
        default_value_t = 16
    )]
    pub max_catch_up: u32,
}

impl TrackerConfig {
    /// Wait between two attempts.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            attempt_limit: 30,
            delay_ms: 2000,
            poll_target: PollTarget::Latest,
            max_catch_up: 16,
        }
    }
}

/// Terminal classification of a tracked submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `ExtrinsicSuccess` was emitted for the submission.
    Success,
    /// `ExtrinsicFailed` was emitted; `reason` is the decoded dispatch error.
    Failure {
        /// Decoded (or raw) dispatch error.
        reason: String,
    },
    /// Included, but neither success nor failure was emitted for it.
    Unknown,
    /// Never seen within the attempt budget. It may still be pending or may have been dropped.
    TimedOut,
}

/// An [`Outcome`] together with the block it was observed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedOutcome {
    /// The classification.
    pub outcome: Outcome,
    /// Block containing the submission; `None` for [`Outcome::TimedOut`].
    pub block_hash: Option<BlockHash>,
}

impl TrackedOutcome {
    /// Budget exhausted without locating the submission.
    fn timed_out() -> Self {
        Self {
            outcome: Outcome::TimedOut,
            block_hash: None,
        }
    }
}

/// Result of looking for a submission in one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockInspection {
    /// The node returned the block without its extrinsics.
    Malformed,
    /// The submission is not in the block.
    Absent,
    /// The submission is in the block and has been classified.
    Included(TrackedOutcome),
}

/// Polls the node until a submission is located or the attempt budget runs out.
#[derive(Clone)]
pub struct ConfirmationTracker {
    client: Arc<dyn ChainClient>,
    decoder: ErrorDecoder,
    config: TrackerConfig,
}

impl ConfirmationTracker {
    /// Creates a tracker reading from `client`.
    pub fn new(client: Arc<dyn ChainClient>, decoder: ErrorDecoder, config: TrackerConfig) -> Self {
        Self {
            client,
            decoder,
            config,
        }
    }

    /// The polling policy.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Tracks `id` until it reaches a terminal outcome.
    pub async fn track(&self, id: &SubmissionId) -> Result<TrackedOutcome> {
        self.track_since(id, None).await
    }

    /// Tracks `id`, treating `since` as already inspected.
    ///
    /// `since` only matters for [`PollTarget::NextBlock`], where it is the best block observed
    /// right before the submission was sent. Connectivity failures abort tracking; malformed
    /// blocks and misses consume an attempt.
    ///
    /// # Arguments
    ///
    /// * `id` - The identifier the node returned when it accepted the transaction.
    /// * `since` - The best block seen before submission, if any.
    ///
    /// # Returns
    ///
    /// Returns the terminal outcome with the including block, `TimedOut` once the attempt limit
    /// is spent, or the connectivity error that ended tracking.
    pub async fn track_since(
        &self,
        id: &SubmissionId,
        since: Option<BlockHash>,
    ) -> Result<TrackedOutcome> {
        let mut last_seen = since;
        let limit = self.config.attempt_limit;

        for attempt in 1..=limit {
            debug!("🔎 Looking for {id}, attempt {attempt}/{limit}");

            let found = match self.config.poll_target {
                PollTarget::Latest => {
                    let latest = self.client.latest_block_hash().await?;
                    match self.inspect_block(id, latest).await? {
                        BlockInspection::Included(tracked) => Some(tracked),
                        BlockInspection::Malformed => {
                            warn!("⚠️ Block {latest:#x} came back without extrinsics, retrying");
                            None
                        }
                        BlockInspection::Absent => None,
                    }
                }
                PollTarget::NextBlock => self.poll_new_blocks(id, &mut last_seen).await?,
            };

            if let Some(tracked) = found {
                info!(
                    "📦 Found {id} in block {:#x}: {:?}",
                    tracked.block_hash.unwrap_or_default(),
                    tracked.outcome
                );
                return Ok(tracked);
            }

            if attempt < limit {
                sleep(self.config.delay()).await;
            }
        }

        warn!("⏳ {id} not found after {limit} attempts");
        Ok(TrackedOutcome::timed_out())
    }

    /// Like [`ConfirmationTracker::track_since`], abandoned with
    /// [`Error::TrackingCancelled`] as soon as `cancel` fires.
    pub async fn track_with_cancellation(
        &self,
        id: &SubmissionId,
        since: Option<BlockHash>,
        cancel: &CancellationToken,
    ) -> Result<TrackedOutcome> {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("🛑 Stopped tracking {id}");
                Err(Error::TrackingCancelled)
            }
            tracked = self.track_since(id, since) => tracked,
        }
    }

    /// Looks for `id` in the block `block_hash` once, without retrying.
    pub async fn inspect_block(
        &self,
        id: &SubmissionId,
        block_hash: BlockHash,
    ) -> Result<BlockInspection> {
        let block = self.client.get_block(block_hash).await?;
        self.inspect_snapshot(id, &block).await
    }

    /// Classifies the extrinsic at `index` of `block_hash` from the block's events.
    pub async fn classify(&self, block_hash: BlockHash, index: usize) -> Result<Outcome> {
        let Ok(phase_index) = u32::try_from(index) else {
            return Ok(Outcome::Unknown);
        };

        let events = self.client.get_events(block_hash).await?;
        let mut failure = None;
        for phased in events
            .iter()
            .filter(|phased| phased.phase == Phase::ApplyExtrinsic(phase_index))
        {
            match &phased.event {
                ChainEvent::ExtrinsicSuccess => return Ok(Outcome::Success),
                ChainEvent::ExtrinsicFailed(descriptor) if failure.is_none() => {
                    failure = Some(descriptor)
                }
                _ => {}
            }
        }

        Ok(match failure {
            Some(descriptor) => Outcome::Failure {
                reason: self.decoder.decode(descriptor),
            },
            None => Outcome::Unknown,
        })
    }

    /// Locates `id` in an already fetched block.
    async fn inspect_snapshot(
        &self,
        id: &SubmissionId,
        block: &BlockSnapshot,
    ) -> Result<BlockInspection> {
        let Some(extrinsics) = &block.extrinsics else {
            return Ok(BlockInspection::Malformed);
        };

        match extrinsics.iter().position(|extrinsic| extrinsic == id) {
            Some(index) => {
                let outcome = self.classify(block.hash, index).await?;
                Ok(BlockInspection::Included(TrackedOutcome {
                    outcome,
                    block_hash: Some(block.hash),
                }))
            }
            None => Ok(BlockInspection::Absent),
        }
    }

    /// One `next-block` attempt: scans the blocks between `last_seen` and the best block.
    async fn poll_new_blocks(
        &self,
        id: &SubmissionId,
        last_seen: &mut Option<BlockHash>,
    ) -> Result<Option<TrackedOutcome>> {
        let latest = self.client.latest_block_hash().await?;
        if *last_seen == Some(latest) {
            debug!("💤 No new block since {latest:#x}");
            return Ok(None);
        }

        // Without a starting point only the best block is new.
        let budget = match last_seen {
            Some(_) => self.config.max_catch_up.max(1),
            None => 1,
        };

        let mut unseen = Vec::new();
        let mut cursor = Some(latest);
        while let Some(hash) = cursor {
            if unseen.len() as u32 >= budget || *last_seen == Some(hash) {
                break;
            }
            let block = self.client.get_block(hash).await?;
            cursor = block.parent_hash;
            unseen.push(block);
        }

        let mut complete = true;
        for block in unseen.iter().rev() {
            match self.inspect_snapshot(id, block).await? {
                BlockInspection::Included(tracked) => return Ok(Some(tracked)),
                BlockInspection::Malformed => {
                    warn!("⚠️ Block {:#x} came back without extrinsics, retrying", block.hash);
                    complete = false;
                }
                BlockInspection::Absent => {}
            }
        }

        if complete {
            *last_seen = Some(latest);
        }
        Ok(None)
    }
}
