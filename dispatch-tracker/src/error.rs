use snafu::Snafu;

/// Represents errors that can occur during node interactions, key management,
/// parameter validation and confirmation tracking.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Error when reading a substrate key from a file.
    ///
    /// This occurs when the specified file cannot be read due to an I/O issue.
    #[snafu(display("Failed to read substrate key from file '{}': {}", path, source))]
    KeyFileRead {
        /// The path of the key file that could not be read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Error when parsing a substrate key from a hexadecimal string.
    #[snafu(display("Failed to parse substrate key as hex: {}", source))]
    KeyParse {
        /// The underlying hex parsing error.
        source: hex::FromHexError,
    },

    /// Error when the parsed key length is invalid.
    ///
    /// sr25519 secret seeds must be exactly 32 bytes long.
    #[snafu(display("Invalid key length: expected 32 bytes, got {}", length))]
    InvalidKeyLength {
        /// The actual length of the provided key.
        length: usize,
    },

    /// Error when failing to create a keypair from a secret key.
    #[snafu(display("Failed to create keypair from secret key"))]
    KeypairCreationError,

    /// The RPC client for the node endpoint could not be built.
    #[snafu(display("Failed to build RPC client for '{}': {}", url, message))]
    RpcClientBuild {
        /// Node endpoint.
        url: String,
        /// Description of the failure reported by the RPC client.
        message: String,
    },

    /// Error when attempting to connect to the chain.
    #[snafu(display("Error connecting to chain: {source}"))]
    ChainConnectionError {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// The node could not be reached while performing a request.
    #[snafu(display("Node unreachable while {action}: {source}"))]
    Connectivity {
        /// What was being requested from the node.
        action: &'static str,
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// The node answered but did not report a best block.
    #[snafu(display("Node did not report a best block hash"))]
    NoBestBlock,

    /// Error when fetching the event log of a block.
    #[snafu(display("Error fetching blockchain events: {}", source))]
    FetchEventsError {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// Error when building, signing or handing a transaction to the node.
    #[snafu(display("Error submitting tx: {source}"))]
    TransactionError {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// An account parameter is not a valid SS58 address.
    #[snafu(display("Invalid account '{}': {}", address, message))]
    InvalidAccount {
        /// The rejected input.
        address: String,
        /// Parser message.
        message: String,
    },

    /// An amount parameter is not a positive integer.
    #[snafu(display("Invalid {}: '{}' must be a positive integer", field, value))]
    InvalidAmount {
        /// Name of the rejected parameter.
        field: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A hash parameter is not valid hex.
    #[snafu(display("Invalid hash '{}'", value))]
    InvalidHash {
        /// The rejected input.
        value: String,
    },

    /// Tracking was abandoned before a terminal outcome was reached.
    #[snafu(display("Confirmation tracking was cancelled"))]
    TrackingCancelled,
}

/// Type alias for results that return a `Result<T, Error>`, simplifying error handling.
pub type Result<T, E = Error> = std::result::Result<T, E>;
