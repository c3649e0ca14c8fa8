use hex::FromHex;
use snafu::ResultExt;
use subxt::utils::{AccountId32, MultiSignature};
use subxt::PolkadotConfig;
use subxt_signer::sr25519::Keypair;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::*;

/// A wallet capable of authorizing transactions.
///
/// The pipeline never sees key material, it only asks the signer for the account
/// submitting the transaction and for a signature over the signer payload.
pub trait TransactionSigner: Send + Sync {
    /// The account the transaction is submitted from.
    fn account_id(&self) -> AccountId32;

    /// Signs the encoded signer payload of a transaction.
    fn sign(&self, payload: &[u8]) -> MultiSignature;

    /// SS58 form of [`TransactionSigner::account_id`].
    fn address(&self) -> String {
        self.account_id().to_string()
    }
}

impl TransactionSigner for Keypair {
    fn account_id(&self) -> AccountId32 {
        <Keypair as subxt::tx::Signer<PolkadotConfig>>::account_id(self)
    }

    fn sign(&self, payload: &[u8]) -> MultiSignature {
        <Keypair as subxt::tx::Signer<PolkadotConfig>>::sign(self, payload)
    }
}

/// load a hex encoded sr25519 key from a file
pub async fn load_substrate_key(file_path: &str) -> Result<Keypair> {
    let mut file = File::open(file_path).await.context(KeyFileReadSnafu {
        path: file_path.to_string(),
    })?;

    let mut hex_string = String::new();
    file.read_to_string(&mut hex_string)
        .await
        .context(KeyFileReadSnafu {
            path: file_path.to_string(),
        })?;

    keypair_from_hex(&hex_string)
}

/// Builds a keypair from a hex encoded 32 byte secret.
fn keypair_from_hex(hex_string: &str) -> Result<Keypair> {
    let key_bytes = Vec::from_hex(hex_string.trim()).context(KeyParseSnafu)?;

    let length = key_bytes.len();
    let key_bytes: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| Error::InvalidKeyLength { length })?;

    Keypair::from_secret_key(key_bytes).map_err(|_| Error::KeypairCreationError)
}
