//! HTTP request and response models, and the user-facing status message.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::tx_submitter::{Submission, SubmissionError};
use crate::tx_tracker::Outcome;

/// Request to move tokens of an asset to another account.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferAssetRequest {
    /// Asset id.
    pub asset_id: u32,
    /// SS58 address of the receiving account.
    pub recipient: String,
    /// Amount, as a decimal integer string.
    pub amount: String,
}

/// Request to mint new tokens of an asset.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MintAssetRequest {
    /// Asset id.
    pub asset_id: u32,
    /// SS58 address of the account receiving the minted tokens.
    pub beneficiary: String,
    /// Amount, as a decimal integer string.
    pub amount: String,
}

/// Request to create a new asset class.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    /// Id of the new asset.
    pub asset_id: u32,
    /// SS58 address of the asset admin.
    pub admin: String,
    /// Minimum balance of an account holding the asset, as a decimal integer string.
    pub min_balance: String,
}

/// Request to deposit into, or withdraw from, an asset pair pool.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityRequest {
    /// First asset of the pair.
    pub asset1: u32,
    /// Second asset of the pair.
    pub asset2: u32,
    /// Amount of the first asset, as a decimal integer string.
    pub amount1: String,
    /// Amount of the second asset, as a decimal integer string.
    pub amount2: String,
}

/// Generic API response used for rejected requests.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// Indicates whether the request was successful.
    pub success: bool,
    /// Contains an error message if the request failed.
    pub err_msg: Option<String>,
    /// The transaction hash, when one exists.
    pub tx_hash: Option<String>,
}

/// Terminal state reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Executed successfully.
    Success,
    /// Executed and failed.
    Failed,
    /// Included, outcome not determinable from its events.
    Unknown,
    /// Submitted, but never seen in a block within the polling budget.
    NoConfirmation,
    /// Never submitted, or tracking could not complete.
    Error,
}

/// Structured result of one submission, including its user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Terminal state.
    pub status: SubmissionStatus,
    /// Transaction hash, once the node accepted the transaction.
    pub tx_hash: Option<String>,
    /// Block the transaction was found in.
    pub block_hash: Option<String>,
    /// Failure reason, or error message for [`SubmissionStatus::Error`].
    pub reason: Option<String>,
    /// One-line status message for display.
    pub message: String,
}

impl StatusReport {
    /// Builds the report for `operation` (its display name) from a pipeline result.
    pub fn new(operation: impl Display, result: &Result<Submission, SubmissionError>) -> Self {
        let message = format_status_message(&operation, result);

        match result {
            Ok(submission) => {
                let (status, reason) = match &submission.outcome {
                    Outcome::Success => (SubmissionStatus::Success, None),
                    Outcome::Failure { reason } => (SubmissionStatus::Failed, Some(reason.clone())),
                    Outcome::Unknown => (SubmissionStatus::Unknown, None),
                    Outcome::TimedOut => (SubmissionStatus::NoConfirmation, None),
                };
                StatusReport {
                    status,
                    tx_hash: Some(submission.tx_hash.to_string()),
                    block_hash: submission.block_hash.map(|hash| format!("{hash:#x}")),
                    reason,
                    message,
                }
            }
            Err(err) => StatusReport {
                status: SubmissionStatus::Error,
                tx_hash: err.tx_hash().map(ToString::to_string),
                block_hash: None,
                reason: Some(err.to_string()),
                message,
            },
        }
    }
}

/// Renders the one-line message shown for a pipeline result.
pub fn format_status_message(
    operation: &impl Display,
    result: &Result<Submission, SubmissionError>,
) -> String {
    match result {
        Ok(Submission {
            tx_hash, outcome, ..
        }) => match outcome {
            Outcome::Success => format!("✅ {operation} Successful! TX Hash: {tx_hash}"),
            Outcome::Failure { reason } => {
                format!("❌ {operation} Failed! TX Hash: {tx_hash}, Reason: {reason}")
            }
            Outcome::Unknown => format!("⚠️ {operation} status unknown. TX Hash: {tx_hash}"),
            Outcome::TimedOut => {
                format!("⚠️ {operation} submitted, but no confirmation received.")
            }
        },
        Err(err) => match err.tx_hash() {
            Some(tx_hash) => format!("❌ {operation} Error! TX Hash: {tx_hash}, Reason: {err}"),
            None => format!("❌ {operation} Error! {err}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use subxt::utils::H256;

    use super::*;
    use crate::chain_client::SubmissionId;
    use crate::error::Error;
    use crate::operations::Operation;

    fn submitted(tx_hash: &[u8], outcome: Outcome) -> Result<Submission, SubmissionError> {
        Ok(Submission {
            tx_hash: SubmissionId::new(tx_hash.to_vec()),
            outcome,
            block_hash: Some(H256::repeat_byte(0xb1)),
        })
    }

    #[test]
    fn success_message() {
        let report = StatusReport::new(
            Operation::MintAsset,
            &submitted(&[0x0a, 0xbc], Outcome::Success),
        );

        assert_eq!(report.status, SubmissionStatus::Success);
        assert_eq!(report.message, "✅ Mint Asset Successful! TX Hash: 0x0abc");
        assert_eq!(report.tx_hash.as_deref(), Some("0x0abc"));
        assert_eq!(
            report.block_hash,
            Some(format!("{:#x}", H256::repeat_byte(0xb1)))
        );
    }

    #[test]
    fn failure_message_carries_the_reason() {
        let result = submitted(
            &[0x0d, 0xef],
            Outcome::Failure {
                reason: "Assets.BalanceLow: balance too low".to_string(),
            },
        );

        let report = StatusReport::new(Operation::TransferAsset, &result);

        assert_eq!(report.status, SubmissionStatus::Failed);
        assert_eq!(
            report.message,
            "❌ Transfer Asset Failed! TX Hash: 0x0def, Reason: Assets.BalanceLow: balance too low"
        );
        assert_eq!(
            report.reason.as_deref(),
            Some("Assets.BalanceLow: balance too low")
        );
    }

    #[test]
    fn unknown_and_unconfirmed_are_distinct() {
        let unknown = StatusReport::new(
            Operation::DepositLiquidity,
            &submitted(&[0x01], Outcome::Unknown),
        );
        let timed_out = StatusReport::new(
            Operation::CreateAsset,
            &submitted(&[0x01], Outcome::TimedOut),
        );

        assert_eq!(unknown.status, SubmissionStatus::Unknown);
        assert_eq!(
            unknown.message,
            "⚠️ Deposit Liquidity status unknown. TX Hash: 0x01"
        );
        assert_eq!(timed_out.status, SubmissionStatus::NoConfirmation);
        assert_eq!(
            timed_out.message,
            "⚠️ Create Asset submitted, but no confirmation received."
        );
    }

    #[test]
    fn errors_before_submission_have_no_hash() {
        let report = StatusReport::new(
            Operation::WithdrawLiquidity,
            &Err(SubmissionError::SignerMissing),
        );

        assert_eq!(report.status, SubmissionStatus::Error);
        assert_eq!(report.tx_hash, None);
        assert_eq!(
            report.message,
            "❌ Withdraw Liquidity Error! No signer attached, connect a wallet first"
        );
    }

    #[test]
    fn errors_after_submission_keep_the_hash() {
        let result = Err(SubmissionError::Tracking {
            tx_hash: SubmissionId::new(vec![0xab]),
            source: Error::TrackingCancelled,
        });

        let report = StatusReport::new(Operation::MintAsset, &result);

        assert_eq!(report.tx_hash.as_deref(), Some("0xab"));
        assert_eq!(
            report.message,
            "❌ Mint Asset Error! TX Hash: 0xab, Reason: Confirmation tracking was cancelled"
        );
    }

    #[test]
    fn statuses_serialize_in_snake_case() {
        let json = serde_json::to_value(SubmissionStatus::NoConfirmation).unwrap();
        assert_eq!(json, serde_json::json!("no_confirmation"));
    }
}
