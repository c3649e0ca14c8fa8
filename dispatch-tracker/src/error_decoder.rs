//! Turns the dispatch error carried by `System.ExtrinsicFailed` into a readable reason.
//!
//! Decoding never fails: when the error cannot be resolved against the runtime metadata the
//! raw textual form of the dispatch error is returned instead and a warning is logged, so a
//! failed transaction is always reported as failed.

use std::fmt;
use std::sync::Arc;

use log::warn;
use snafu::Snafu;
use subxt::ext::scale_value::{Value, ValueDef};
use subxt::{OnlineClient, PolkadotConfig};

/// The dispatch error attached to a failed extrinsic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDescriptor {
    /// A pallet-defined error, addressed by pallet index and error variant index.
    Module {
        /// Index of the pallet in the runtime.
        pallet_index: u8,
        /// Error bytes; the first byte is the error variant index.
        error: [u8; 4],
        /// Textual form of the dispatch error as emitted on chain.
        raw: String,
    },
    /// Any other dispatch error (`BadOrigin`, `Token(..)`, `Arithmetic(..)`, ...).
    Other {
        /// Textual form of the dispatch error as emitted on chain.
        raw: String,
    },
}

impl FailureDescriptor {
    /// Builds a descriptor from a decoded `DispatchError` value.
    ///
    /// Accepts both `Module(ModuleError { index, error: [u8; 4] })` and the older
    /// `Module { index, error: u8 }` layout.
    pub fn from_dispatch_error<T>(value: &Value<T>) -> Self {
        let raw = value.to_string();

        match module_error_indices(value) {
            Some((pallet_index, error)) => FailureDescriptor::Module {
                pallet_index,
                error,
                raw,
            },
            None => FailureDescriptor::Other { raw },
        }
    }

    /// Textual form of the dispatch error.
    pub fn raw(&self) -> &str {
        match self {
            FailureDescriptor::Module { raw, .. } | FailureDescriptor::Other { raw } => raw,
        }
    }
}

impl fmt::Display for FailureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

/// Extracts `(pallet_index, error)` from a `DispatchError::Module` value.
fn module_error_indices<T>(value: &Value<T>) -> Option<(u8, [u8; 4])> {
    let ValueDef::Variant(variant) = &value.value else {
        return None;
    };
    if variant.name != "Module" {
        return None;
    }

    // `Module(ModuleError { .. })` wraps the fields once more than the legacy layout.
    let outer: Vec<&Value<T>> = variant.values.values().collect();
    let fields: Vec<&Value<T>> = match outer.as_slice() {
        [inner] => match &inner.value {
            ValueDef::Composite(composite) => composite.values().collect(),
            _ => outer.clone(),
        },
        _ => outer.clone(),
    };

    let [index, error, ..] = fields.as_slice() else {
        return None;
    };
    let pallet_index = u8::try_from(index.as_u128()?).ok()?;

    let mut error_bytes = [0u8; 4];
    match error.as_u128() {
        Some(error_index) => error_bytes[0] = u8::try_from(error_index).ok()?,
        None => {
            let ValueDef::Composite(bytes) = &error.value else {
                return None;
            };
            for (slot, byte) in error_bytes.iter_mut().zip(bytes.values()) {
                *slot = u8::try_from(byte.as_u128()?).ok()?;
            }
        }
    }

    Some((pallet_index, error_bytes))
}

/// Name and documentation of a pallet error, as found in runtime metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMetadata {
    /// Pallet (module) name, e.g. `Assets`.
    pub pallet: String,
    /// Error variant name, e.g. `BalanceLow`.
    pub name: String,
    /// Documentation lines of the error variant.
    pub docs: Vec<String>,
}

/// Reasons a module error could not be resolved. Never surfaced past the decoder.
#[derive(Debug, Snafu)]
pub enum DecodeError {
    /// No pallet with this index in the runtime.
    #[snafu(display("No pallet with index {index} in runtime metadata"))]
    UnknownPallet {
        /// Pallet index.
        index: u8,
    },

    /// The pallet has no error variant with this index.
    #[snafu(display("Pallet {pallet} has no error with index {index}"))]
    UnknownError {
        /// Pallet name.
        pallet: String,
        /// Error variant index.
        index: u8,
    },
}

/// Source of pallet error names and documentation.
pub trait ErrorRegistry: Send + Sync {
    /// Resolves a pallet index and error variant index.
    fn lookup(&self, pallet_index: u8, error_index: u8) -> Result<ErrorMetadata, DecodeError>;
}

impl ErrorRegistry for OnlineClient<PolkadotConfig> {
    fn lookup(&self, pallet_index: u8, error_index: u8) -> Result<ErrorMetadata, DecodeError> {
        // Current metadata on every call so runtime upgrades are picked up.
        let metadata = self.metadata();
        let pallet = metadata
            .pallet_by_index(pallet_index)
            .ok_or(DecodeError::UnknownPallet {
                index: pallet_index,
            })?;
        let variant =
            pallet
                .error_variant_by_index(error_index)
                .ok_or_else(|| DecodeError::UnknownError {
                    pallet: pallet.name().to_string(),
                    index: error_index,
                })?;

        Ok(ErrorMetadata {
            pallet: pallet.name().to_string(),
            name: variant.name.clone(),
            docs: variant.docs.clone(),
        })
    }
}

/// Maps failure descriptors to `<module>.<errorName>: <docs>` strings.
#[derive(Clone)]
pub struct ErrorDecoder {
    registry: Arc<dyn ErrorRegistry>,
}

impl ErrorDecoder {
    /// Creates a decoder resolving module errors against `registry`.
    pub fn new(registry: Arc<dyn ErrorRegistry>) -> Self {
        Self { registry }
    }

    /// Decodes a failure descriptor into a readable reason.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - The dispatch error taken from an `ExtrinsicFailed` event.
    ///
    /// # Returns
    ///
    /// Returns `"<Pallet>.<Error>: <docs>"` for module errors known to the registry. Otherwise
    /// returns the raw textual form, logging a warning when a module error lookup failed.
    pub fn decode(&self, descriptor: &FailureDescriptor) -> String {
        let FailureDescriptor::Module {
            pallet_index,
            error,
            raw,
        } = descriptor
        else {
            return descriptor.raw().to_string();
        };

        match self.registry.lookup(*pallet_index, error[0]) {
            Ok(details) => format!(
                "{}.{}: {}",
                details.pallet,
                details.name,
                details.docs.join(" ")
            ),
            Err(err) => {
                warn!("⚠️ Error decoding failure reason: {err}");
                raw.clone()
            }
        }
    }
}
