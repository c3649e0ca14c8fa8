//! # Node access
//!
//! [`ChainClient`] is the only path from this crate to the node: latest block hash, block by
//! hash, the event log of a block and the transaction ingress. Nothing is cached between
//! calls, every call reflects the node's current state.
//!
//! [`SubxtChainClient`] is the production implementation, backed by one long-lived
//! reconnecting RPC connection that is opened once with [`SubxtChainClient::connect`] and
//! released with [`SubxtChainClient::close`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use snafu::ResultExt;
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::reconnecting_rpc_client::{PingConfig, RpcClient as ReconnectingRpcClient};
use subxt::backend::rpc::RpcClient;
use subxt::config::polkadot::PolkadotExtrinsicParamsBuilder as Params;
use subxt::config::substrate::BlakeTwo256;
use subxt::config::Hasher;
use subxt::ext::scale_value::Composite;
use subxt::utils::{AccountId32, MultiAddress, H256};
use subxt::{OnlineClient, PolkadotConfig};

use crate::error::{
    ChainConnectionSnafu,
    ConnectivitySnafu,
    Error,
    FetchEventsSnafu,
    Result,
    TransactionSnafu,
};
use crate::error_decoder::FailureDescriptor;
use crate::operations::OperationDescriptor;
use crate::signer::TransactionSigner;

pub use subxt::events::Phase;

/// Hash identifying a block.
pub type BlockHash = H256;

/// The identifier the node's ingress returns for an accepted transaction.
///
/// It is the hash of the encoded extrinsic, which is also how the extrinsic is found again
/// once it has been included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionId(Vec<u8>);

impl SubmissionId {
    /// Wraps raw identifier bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<H256> for SubmissionId {
    fn from(hash: H256) -> Self {
        Self(hash.as_bytes().to_vec())
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl FromStr for SubmissionId {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let bytes = hex::decode(value.trim_start_matches("0x")).map_err(|_| Error::InvalidHash {
            value: value.to_string(),
        })?;
        if bytes.is_empty() {
            return Err(Error::InvalidHash {
                value: value.to_string(),
            });
        }
        Ok(Self(bytes))
    }
}

/// A point-in-time view of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSnapshot {
    /// Hash of the block.
    pub hash: BlockHash,
    /// Hash of the parent block, when the block body was available.
    pub parent_hash: Option<BlockHash>,
    /// Identifiers of the included extrinsics, in block order.
    ///
    /// `None` when the node returned the block without its body; callers retry.
    pub extrinsics: Option<Vec<SubmissionId>>,
}

/// The events the tracker tells apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// `System.ExtrinsicSuccess`
    ExtrinsicSuccess,
    /// `System.ExtrinsicFailed`, with its dispatch error.
    ExtrinsicFailed(FailureDescriptor),
    /// Anything else.
    Other {
        /// Pallet that emitted the event.
        pallet: String,
        /// Event variant name.
        variant: String,
    },
}

/// An event together with the execution phase that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasedEvent {
    /// `ApplyExtrinsic(i)` for events caused by the extrinsic at index `i`.
    pub phase: Phase,
    /// The event itself.
    pub event: ChainEvent,
}

/// Request primitives against a single node endpoint.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Hash of the node's current best block.
    async fn latest_block_hash(&self) -> Result<BlockHash>;

    /// The block with the given hash.
    async fn get_block(&self, hash: BlockHash) -> Result<BlockSnapshot>;

    /// All events emitted while executing the given block, in order.
    async fn get_events(&self, hash: BlockHash) -> Result<Vec<PhasedEvent>>;

    /// Signs `descriptor` with `signer` and hands it to the node's ingress.
    ///
    /// Returns as soon as the node accepted the transaction, which says nothing about
    /// inclusion.
    async fn submit(
        &self,
        descriptor: &OperationDescriptor,
        signer: &dyn TransactionSigner,
    ) -> Result<SubmissionId>;
}

/// [`ChainClient`] over a `subxt` connection.
#[derive(Clone)]
pub struct SubxtChainClient {
    /// High level client: metadata, events, transaction building.
    api: OnlineClient<PolkadotConfig>,
    /// Raw RPC calls for block hashes and block bodies.
    rpc: LegacyRpcMethods<PolkadotConfig>,
    /// Node endpoint.
    url: String,
}

impl SubxtChainClient {
    /// Opens the connection to the node at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("🔵 Connecting to node: {url}");

        let reconnecting = ReconnectingRpcClient::builder()
            .request_timeout(Duration::from_secs(60))
            .connection_timeout(Duration::from_secs(10))
            .enable_ws_ping(PingConfig::new())
            .build(url.to_string())
            .await
            .map_err(|err| Error::RpcClientBuild {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        let rpc_client = RpcClient::new(reconnecting);

        let api = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client.clone())
            .await
            .context(ChainConnectionSnafu)?;
        let rpc = LegacyRpcMethods::<PolkadotConfig>::new(rpc_client);

        info!("🟢 Connected to node: {url}");
        Ok(Self {
            api,
            rpc,
            url: url.to_string(),
        })
    }

    /// The underlying `subxt` client.
    pub fn api(&self) -> &OnlineClient<PolkadotConfig> {
        &self.api
    }

    /// Releases the connection.
    ///
    /// Clones share one RPC client and the socket closes when the last of them is dropped.
    /// Every clone handed out, such as the ones held by the tracker and the pipeline, must be
    /// dropped before this is called on the remaining handle.
    pub fn close(self) {
        info!("🔌 Closing connection to {}", self.url);
        let Self { api, rpc, url: _ } = self;
        drop(rpc);
        drop(api);
    }
}

/// Identifier of an extrinsic: the BLAKE2-256 hash of its encoding, length prefix included.
pub fn extrinsic_id(encoded: &[u8]) -> SubmissionId {
    SubmissionId::from(BlakeTwo256::hash(encoded))
}

/// Snapshot of `hash` from its parent hash and encoded extrinsics.
///
/// A missing body yields a snapshot with neither parent nor extrinsics.
fn block_snapshot(hash: BlockHash, body: Option<(BlockHash, Vec<Vec<u8>>)>) -> BlockSnapshot {
    match body {
        Some((parent_hash, extrinsics)) => BlockSnapshot {
            hash,
            parent_hash: Some(parent_hash),
            extrinsics: Some(
                extrinsics
                    .iter()
                    .map(|encoded| extrinsic_id(encoded))
                    .collect(),
            ),
        },
        None => BlockSnapshot {
            hash,
            parent_hash: None,
            extrinsics: None,
        },
    }
}

/// Maps an event to a [`ChainEvent`] by pallet and variant name.
///
/// `fields` is only decoded for `System.ExtrinsicFailed`, whose first field is the dispatch
/// error.
fn chain_event<T>(
    pallet: &str,
    variant: &str,
    fields: impl FnOnce() -> Result<Composite<T>, subxt::Error>,
) -> ChainEvent {
    match (pallet, variant) {
        ("System", "ExtrinsicSuccess") => ChainEvent::ExtrinsicSuccess,
        ("System", "ExtrinsicFailed") => {
            let descriptor = match fields() {
                Ok(fields) => match fields.values().next() {
                    Some(dispatch_error) => FailureDescriptor::from_dispatch_error(dispatch_error),
                    None => FailureDescriptor::Other {
                        raw: "ExtrinsicFailed without a dispatch error".to_string(),
                    },
                },
                Err(err) => FailureDescriptor::Other {
                    raw: err.to_string(),
                },
            };
            ChainEvent::ExtrinsicFailed(descriptor)
        }
        (pallet, variant) => ChainEvent::Other {
            pallet: pallet.to_string(),
            variant: variant.to_string(),
        },
    }
}

#[async_trait]
impl ChainClient for SubxtChainClient {
    async fn latest_block_hash(&self) -> Result<BlockHash> {
        self.rpc
            .chain_get_block_hash(None)
            .await
            .context(ConnectivitySnafu {
                action: "fetching the latest block hash",
            })?
            .ok_or(Error::NoBestBlock)
    }

    async fn get_block(&self, hash: BlockHash) -> Result<BlockSnapshot> {
        let details = self
            .rpc
            .chain_get_block(Some(hash))
            .await
            .context(ConnectivitySnafu {
                action: "fetching a block",
            })?;

        Ok(block_snapshot(
            hash,
            details.map(|details| {
                let extrinsics = details.block.extrinsics.into_iter().map(|bytes| bytes.0);
                (details.block.header.parent_hash, extrinsics.collect())
            }),
        ))
    }

    async fn get_events(&self, hash: BlockHash) -> Result<Vec<PhasedEvent>> {
        let events = self.api.events().at(hash).await.context(FetchEventsSnafu)?;

        let mut phased = Vec::new();
        for event in events.iter() {
            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    warn!("⚠️ Skipping undecodable event in block {hash:#x}: {err}");
                    continue;
                }
            };

            let mapped =
                chain_event(event.pallet_name(), event.variant_name(), || {
                    event.field_values().map_err(subxt::Error::from)
                });

            phased.push(PhasedEvent {
                phase: event.phase(),
                event: mapped,
            });
        }

        Ok(phased)
    }

    async fn submit(
        &self,
        descriptor: &OperationDescriptor,
        signer: &dyn TransactionSigner,
    ) -> Result<SubmissionId> {
        let payload = descriptor.payload();
        let account_id: AccountId32 = signer.account_id();

        let partial = self
            .api
            .tx()
            .create_partial_signed(&payload, &account_id, Params::new().build())
            .await
            .context(TransactionSnafu)?;

        let signature = signer.sign(&partial.signer_payload());
        let address: MultiAddress<AccountId32, ()> = account_id.into();

        let hash = partial
            .sign_with_address_and_signature(&address, &signature)
            .submit()
            .await
            .context(TransactionSnafu)?;

        Ok(SubmissionId::from(hash))
    }
}
