//! In-memory stand-ins for the node and the runtime metadata.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use log::{Level, LevelFilter, Log, Metadata, Record};
use subxt::utils::H256;
use tokio_util::sync::CancellationToken;

use crate::chain_client::{
    BlockHash,
    BlockSnapshot,
    ChainClient,
    ChainEvent,
    Phase,
    PhasedEvent,
    SubmissionId,
};
use crate::error::{Error, Result};
use crate::error_decoder::{
    DecodeError,
    ErrorDecoder,
    ErrorMetadata,
    ErrorRegistry,
    FailureDescriptor,
};
use crate::operations::OperationDescriptor;
use crate::signer::TransactionSigner;
use crate::state::AppState;
use crate::tx_submitter::SubmissionPipeline;
use crate::tx_tracker::{ConfirmationTracker, TrackerConfig};

/// Error registry backed by a map of `(pallet_index, error_index)`.
#[derive(Default)]
pub struct StaticErrorRegistry {
    errors: HashMap<(u8, u8), ErrorMetadata>,
}

impl StaticErrorRegistry {
    /// Registry knowing `Assets.BalanceLow` at pallet 2, error 5.
    pub fn with_balance_low() -> Self {
        Self::default().with_error(2, 5, "Assets", "BalanceLow", &["balance too low"])
    }

    /// Adds one error.
    pub fn with_error(
        mut self,
        pallet_index: u8,
        error_index: u8,
        pallet: &str,
        name: &str,
        docs: &[&str],
    ) -> Self {
        self.errors.insert(
            (pallet_index, error_index),
            ErrorMetadata {
                pallet: pallet.to_string(),
                name: name.to_string(),
                docs: docs.iter().map(|doc| doc.to_string()).collect(),
            },
        );
        self
    }
}

impl ErrorRegistry for StaticErrorRegistry {
    fn lookup(&self, pallet_index: u8, error_index: u8) -> Result<ErrorMetadata, DecodeError> {
        if !self.errors.keys().any(|(pallet, _)| *pallet == pallet_index) {
            return Err(DecodeError::UnknownPallet {
                index: pallet_index,
            });
        }
        self.errors
            .get(&(pallet_index, error_index))
            .cloned()
            .ok_or(DecodeError::UnknownError {
                pallet: format!("#{pallet_index}"),
                index: error_index,
            })
    }
}

/// `Module { index: 2, error: [5, 0, 0, 0] }`, i.e. `Assets.BalanceLow` in the static registry.
pub fn balance_low() -> FailureDescriptor {
    FailureDescriptor::Module {
        pallet_index: 2,
        error: [5, 0, 0, 0],
        raw: "Module(ModuleError { index: 2, error: [5, 0, 0, 0] })".to_string(),
    }
}

/// Event at `ApplyExtrinsic(index)`.
pub fn applied(index: u32, event: ChainEvent) -> PhasedEvent {
    PhasedEvent {
        phase: Phase::ApplyExtrinsic(index),
        event,
    }
}

/// Some unrelated event.
pub fn deposit_event() -> ChainEvent {
    ChainEvent::Other {
        pallet: "Balances".to_string(),
        variant: "Deposit".to_string(),
    }
}

/// Block hash from a single repeated byte.
pub fn block_hash(byte: u8) -> BlockHash {
    H256::repeat_byte(byte)
}

/// Signer that signs nothing; the mock node never verifies signatures.
pub struct NullSigner;

impl TransactionSigner for NullSigner {
    fn account_id(&self) -> subxt::utils::AccountId32 {
        subxt::utils::AccountId32([7u8; 32])
    }

    fn sign(&self, _payload: &[u8]) -> subxt::utils::MultiSignature {
        subxt::utils::MultiSignature::Sr25519([0u8; 64])
    }
}

/// Connectivity failure as the real client reports it.
pub fn unreachable(action: &'static str) -> Error {
    Error::Connectivity {
        action,
        source: subxt::Error::Other("connection refused".into()),
    }
}

/// Scripted node.
///
/// `latest_block_hash` walks through the scripted heads and keeps returning the last one.
/// Blocks without a scripted body come back without an extrinsic list.
#[derive(Default)]
pub struct MockChainClient {
    heads: Mutex<VecDeque<BlockHash>>,
    blocks: HashMap<BlockHash, BlockSnapshot>,
    events: HashMap<BlockHash, Vec<PhasedEvent>>,
    submission: Mutex<Option<Result<SubmissionId>>>,
    unreachable: bool,
    latest_calls: AtomicUsize,
    block_calls: AtomicUsize,
    event_calls: AtomicUsize,
    submit_calls: AtomicUsize,
}

impl MockChainClient {
    /// Node whose best block is `heads[0]`, then `heads[1]`, ...
    pub fn with_heads(heads: impl IntoIterator<Item = BlockHash>) -> Self {
        Self {
            heads: Mutex::new(heads.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Adds a block with the given parent and extrinsics, and its events.
    pub fn with_block(
        mut self,
        hash: BlockHash,
        parent: BlockHash,
        extrinsics: Vec<SubmissionId>,
        events: Vec<PhasedEvent>,
    ) -> Self {
        self.blocks.insert(
            hash,
            BlockSnapshot {
                hash,
                parent_hash: Some(parent),
                extrinsics: Some(extrinsics),
            },
        );
        self.events.insert(hash, events);
        self
    }

    /// What `submit` returns.
    pub fn with_submission(self, result: Result<SubmissionId>) -> Self {
        *self.submission.lock().unwrap() = Some(result);
        self
    }

    /// Every read fails with a connectivity error.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Calls to `latest_block_hash`.
    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    /// Calls to `get_block`.
    pub fn block_calls(&self) -> usize {
        self.block_calls.load(Ordering::SeqCst)
    }

    /// Calls to `get_events`.
    pub fn event_calls(&self) -> usize {
        self.event_calls.load(Ordering::SeqCst)
    }

    /// Calls to `submit`.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.latest_calls() + self.block_calls() + self.event_calls() + self.submit_calls()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn latest_block_hash(&self) -> Result<BlockHash> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(unreachable("fetching the latest block hash"));
        }

        let mut heads = self.heads.lock().unwrap();
        let head = if heads.len() > 1 {
            heads.pop_front()
        } else {
            heads.front().copied()
        };
        head.ok_or(Error::NoBestBlock)
    }

    async fn get_block(&self, hash: BlockHash) -> Result<BlockSnapshot> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(unreachable("fetching a block"));
        }

        Ok(self.blocks.get(&hash).cloned().unwrap_or(BlockSnapshot {
            hash,
            parent_hash: None,
            extrinsics: None,
        }))
    }

    async fn get_events(&self, hash: BlockHash) -> Result<Vec<PhasedEvent>> {
        self.event_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(unreachable("fetching events"));
        }

        Ok(self.events.get(&hash).cloned().unwrap_or_default())
    }

    async fn submit(
        &self,
        _descriptor: &OperationDescriptor,
        _signer: &dyn TransactionSigner,
    ) -> Result<SubmissionId> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        self.submission
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(unreachable("submitting a transaction")))
    }
}

/// Handler state over `client` with the default polling policy and the static registry.
pub fn app_state(
    client: Arc<MockChainClient>,
    signer: Option<Arc<dyn TransactionSigner>>,
) -> Arc<AppState> {
    let decoder = ErrorDecoder::new(Arc::new(StaticErrorRegistry::with_balance_low()));
    let tracker = ConfirmationTracker::new(client.clone(), decoder, TrackerConfig::default());

    Arc::new(AppState {
        pipeline: SubmissionPipeline::new(client, tracker.clone()),
        tracker,
        signer,
        shutdown: CancellationToken::new(),
    })
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<(Level, String)>>> = const { RefCell::new(None) };
}

/// Logger recording into the capture of the thread that logs.
struct CapturingLogger;

static LOGGER: CapturingLogger = CapturingLogger;

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        CAPTURED.with(|captured| {
            if let Some(records) = captured.borrow_mut().as_mut() {
                records.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

/// Log records emitted on the current thread while this value is alive.
///
/// `#[test]` and `#[tokio::test]` bodies run on the test thread, so parallel tests never see
/// each other's records.
pub struct LogCapture;

impl LogCapture {
    /// Messages logged at `level`, in order.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        CAPTURED.with(|captured| {
            captured
                .borrow()
                .iter()
                .flatten()
                .filter(|(logged, _)| *logged == level)
                .map(|(_, message)| message.clone())
                .collect()
        })
    }

    /// Messages logged at `warn`.
    pub fn warnings(&self) -> Vec<String> {
        self.messages_at(Level::Warn)
    }
}

impl Drop for LogCapture {
    fn drop(&mut self) {
        CAPTURED.with(|captured| *captured.borrow_mut() = None);
    }
}

/// Starts capturing the current thread's log records.
pub fn capture_logs() -> LogCapture {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).expect("no other logger is installed in tests");
        log::set_max_level(LevelFilter::Trace);
    });

    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
    LogCapture
}
