use std::collections::HashMap;

use axum::http::StatusCode;
use axum::Json;
use hex::FromHex;
use subxt::utils::H256;

use crate::model::ApiResponse;

/// Error half of every handler's return type.
pub type ApiError = (StatusCode, Json<ApiResponse>);

/// Parses a hexadecimal string into an `H256` hash.
///
/// A leading `0x` is optional. Anything that is not exactly 32 bytes of hex is rejected.
pub fn parse_h256_from_hex(hex_str: &str) -> Result<H256, String> {
    let hex_str = hex_str.trim_start_matches("0x");

    let bytes = <[u8; 32]>::from_hex(hex_str).map_err(|_| "Invalid hex string")?;

    Ok(H256::from(bytes))
}

/// Builds an error response with the given status code.
fn error_response(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ApiResponse {
            success: false,
            err_msg: Some(message.to_string()),
            tx_hash: None,
        }),
    )
}

/// Constructs a `400 Bad Request` API response.
pub fn bad_request(message: &str) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, message)
}

/// Constructs a `500 Internal Server Error` API response.
pub fn internal_server_error(message: &str) -> ApiError {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// Constructs a `404 Not Found` API response.
pub fn not_found(message: &str) -> ApiError {
    error_response(StatusCode::NOT_FOUND, message)
}

/// Extracts a required parameter from the request query map, or answers `400`.
pub fn extract_param<'a>(
    params: &'a HashMap<String, String>,
    key: &str,
) -> Result<&'a str, ApiError> {
    params
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| bad_request(&format!("Missing required query parameter: {key}")))
}
