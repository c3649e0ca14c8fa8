//! api handlers for the asset and liquidity operations
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use log::{info, warn};

use crate::model::{
    CreateAssetRequest,
    LiquidityRequest,
    MintAssetRequest,
    StatusReport,
    SubmissionStatus,
    TransferAssetRequest,
};
use crate::operations::{self, Operation, OperationDescriptor};
use crate::state::AppState;
use crate::utils::{bad_request, ApiError};

/// Sends `descriptor` through the pipeline and turns the result into a report.
async fn submit(
    state: &AppState,
    operation: Operation,
    descriptor: OperationDescriptor,
) -> StatusReport {
    let result = state
        .pipeline
        .submit_with_cancellation(descriptor, state.signer.as_deref(), &state.shutdown)
        .await;
    let report = StatusReport::new(operation, &result);

    match report.status {
        SubmissionStatus::Success => info!("{}", report.message),
        _ => warn!("{}", report.message),
    }
    report
}

/// Rejects invalid parameters with `400` before anything is sent.
fn validated(
    operation: Operation,
    descriptor: crate::error::Result<OperationDescriptor>,
) -> Result<OperationDescriptor, ApiError> {
    descriptor.map_err(|err| bad_request(&format!("❌ {operation} Error! {err}")))
}

/// Transfers tokens of an asset to another account and waits for the outcome.
///
/// # Example Usage
/// ```sh
/// curl -X POST "http://127.0.0.1:3000/transfer_asset" -H "Content-Type: application/json" -d '{
///     "assetId": 1,
///     "recipient": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
///     "amount": "1000"
/// }'
/// ```
#[utoipa::path(post, path = "/transfer_asset", tag = "transfer-asset",
    request_body = TransferAssetRequest,
    responses(
        (status = 200, description = "Terminal status of the transfer", body = StatusReport),
        (status = 400, description = "Invalid request", body = crate::model::ApiResponse)
    ))]
pub async fn transfer_asset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransferAssetRequest>,
) -> Result<Json<StatusReport>, ApiError> {
    let operation = Operation::TransferAsset;
    let descriptor = validated(
        operation,
        operations::transfer_asset(request.asset_id, &request.recipient, &request.amount),
    )?;

    Ok(Json(submit(&state, operation, descriptor).await))
}

/// Mints new tokens of an asset to a beneficiary and waits for the outcome.
#[utoipa::path(post, path = "/mint_asset", tag = "mint-asset",
    request_body = MintAssetRequest,
    responses(
        (status = 200, description = "Terminal status of the mint", body = StatusReport),
        (status = 400, description = "Invalid request", body = crate::model::ApiResponse)
    ))]
pub async fn mint_asset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MintAssetRequest>,
) -> Result<Json<StatusReport>, ApiError> {
    let operation = Operation::MintAsset;
    let descriptor = validated(
        operation,
        operations::mint_asset(request.asset_id, &request.beneficiary, &request.amount),
    )?;

    Ok(Json(submit(&state, operation, descriptor).await))
}

/// Creates a new asset class and waits for the outcome.
#[utoipa::path(post, path = "/create_asset", tag = "create-asset",
    request_body = CreateAssetRequest,
    responses(
        (status = 200, description = "Terminal status of the asset creation", body = StatusReport),
        (status = 400, description = "Invalid request", body = crate::model::ApiResponse)
    ))]
pub async fn create_asset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAssetRequest>,
) -> Result<Json<StatusReport>, ApiError> {
    let operation = Operation::CreateAsset;
    let descriptor = validated(
        operation,
        operations::create_asset(request.asset_id, &request.admin, &request.min_balance),
    )?;

    Ok(Json(submit(&state, operation, descriptor).await))
}

/// Deposits liquidity into an asset pair pool and waits for the outcome.
#[utoipa::path(post, path = "/deposit_liquidity", tag = "deposit-liquidity",
    request_body = LiquidityRequest,
    responses(
        (status = 200, description = "Terminal status of the deposit", body = StatusReport),
        (status = 400, description = "Invalid request", body = crate::model::ApiResponse)
    ))]
pub async fn deposit_liquidity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LiquidityRequest>,
) -> Result<Json<StatusReport>, ApiError> {
    let operation = Operation::DepositLiquidity;
    let descriptor = validated(
        operation,
        operations::deposit_liquidity(
            request.asset1,
            request.asset2,
            &request.amount1,
            &request.amount2,
        ),
    )?;

    Ok(Json(submit(&state, operation, descriptor).await))
}

/// Withdraws liquidity from an asset pair pool and waits for the outcome.
#[utoipa::path(post, path = "/withdraw_liquidity", tag = "withdraw-liquidity",
    request_body = LiquidityRequest,
    responses(
        (status = 200, description = "Terminal status of the withdrawal", body = StatusReport),
        (status = 400, description = "Invalid request", body = crate::model::ApiResponse)
    ))]
pub async fn withdraw_liquidity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LiquidityRequest>,
) -> Result<Json<StatusReport>, ApiError> {
    let operation = Operation::WithdrawLiquidity;
    let descriptor = validated(
        operation,
        operations::withdraw_liquidity(
            request.asset1,
            request.asset2,
            &request.amount1,
            &request.amount2,
        ),
    )?;

    Ok(Json(submit(&state, operation, descriptor).await))
}
