//! api handlers for extrinsics
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;

use crate::chain_client::SubmissionId;
use crate::model::{ApiResponse, StatusReport};
use crate::state::AppState;
use crate::tx_submitter::{Submission, SubmissionError};
use crate::tx_tracker::BlockInspection;
use crate::utils::{
    bad_request,
    extract_param,
    internal_server_error,
    not_found,
    parse_h256_from_hex,
    ApiError,
};

/// Label used in status messages for transactions tracked by hash.
const TRACKED_OPERATION: &str = "Transaction";

/// Parses the `tx_hash` query parameter.
fn tx_hash_param(params: &HashMap<String, String>) -> Result<SubmissionId, ApiError> {
    extract_param(params, "tx_hash")?
        .parse::<SubmissionId>()
        .map_err(|e| bad_request(&format!("Invalid tx_hash format: {e}")))
}

/// Retrieves the execution status of a transaction within a specific block.
///
/// The block's extrinsics are searched for `tx_hash`. When found, the events emitted at its
/// phase decide between success, failure (with the decoded reason) and unknown.
///
/// # Query Parameters
/// - `tx_hash` (String): The transaction hash to check.
/// - `block_hash` (String): The hash of the block where the transaction is expected to be found.
///
/// # Responses
/// - **200 OK**: The transaction execution status is retrieved successfully.
/// - **400 BAD REQUEST**: Missing or incorrectly formatted `tx_hash` or `block_hash`.
/// - **404 NOT FOUND**: The transaction was not found in the given block.
/// - **500 INTERNAL SERVER ERROR**: The block or its events could not be fetched.
///
/// # Example Usage
/// ```sh
/// curl -X GET "http://127.0.0.1:3000/get_extrinsic_status_in_block?tx_hash=0x123...&block_hash=0xabc..."
/// ```
#[utoipa::path(
        get,
        path = "/get_extrinsic_status_in_block",
        tag = "get-extrinsic-status-in-block",
        params(
            ("tx_hash" = String, Query, description = "Transaction hash"),
            ("block_hash" = String, Query, description = "Block hash")
        ),
        responses(
            (status = 200, description = "Transaction status retrieved", body = StatusReport),
            (status = 400, description = "Invalid request parameters", body = ApiResponse),
            (status = 404, description = "Transaction not found in the block", body = ApiResponse),
            (status = 500, description = "Internal server error", body = ApiResponse)
        )
    )]
pub async fn get_extrinsic_status_in_block(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<StatusReport>, ApiError> {
    let tx_hash = tx_hash_param(&params)?;
    let block_hash = parse_h256_from_hex(extract_param(&params, "block_hash")?)
        .map_err(|e| bad_request(&format!("Invalid block_hash format: {e}")))?;

    let inspection = state
        .tracker
        .inspect_block(&tx_hash, block_hash)
        .await
        .map_err(|e| internal_server_error(&format!("Error inspecting block: {e}")))?;

    match inspection {
        BlockInspection::Included(tracked) => Ok(Json(StatusReport::new(
            TRACKED_OPERATION,
            &Ok(Submission {
                tx_hash,
                outcome: tracked.outcome,
                block_hash: tracked.block_hash,
            }),
        ))),
        BlockInspection::Absent => Err(not_found("Transaction not found in the block")),
        BlockInspection::Malformed => Err(internal_server_error(&format!(
            "Block {block_hash:#x} was returned without its extrinsics"
        ))),
    }
}

/// Tracks an already submitted transaction until it reaches a terminal status.
///
/// Polls the chain with the service's tracker policy, exactly as for transactions submitted
/// through this service. Closing the connection abandons tracking.
///
/// # Example Usage
/// ```sh
/// curl -X GET "http://127.0.0.1:3000/track_extrinsic?tx_hash=0x123..."
/// ```
#[utoipa::path(
    get,
    path = "/track_extrinsic",
    tag = "track-extrinsic",
    params(("tx_hash" = String, Query, description = "Transaction hash")),
    responses(
        (status = 200, description = "Terminal status of the transaction", body = StatusReport),
        (status = 400, description = "Invalid request parameters", body = ApiResponse)
    )
)]
pub async fn track_extrinsic(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<StatusReport>, ApiError> {
    let tx_hash = tx_hash_param(&params)?;

    let result = match state
        .tracker
        .track_with_cancellation(&tx_hash, None, &state.shutdown)
        .await
    {
        Ok(tracked) => Ok(Submission {
            tx_hash,
            outcome: tracked.outcome,
            block_hash: tracked.block_hash,
        }),
        Err(source) => Err(SubmissionError::Tracking { tx_hash, source }),
    };

    Ok(Json(StatusReport::new(TRACKED_OPERATION, &result)))
}
