//! Code execution endpoint.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crucible_core::{EngineError, ErrorType, ExecuteResponse, ExecutionRequest};

use crate::state::AppState;

/// POST /api/execute
///
/// Decodes and validates the submission, drives the engine pipeline, and
/// encodes the response envelope. Compile and runtime errors are successful
/// executions (HTTP 200 with the classification in the body); only
/// meta-failures of the service itself map to error statuses.
pub async fn execute(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<ExecutionRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };

    if request.code.is_empty() {
        return ApiError::bad_request("Missing 'code' field in request").into_response();
    }
    if request.language.is_empty() {
        return ApiError::bad_request("Missing 'language' field in request").into_response();
    }

    let client = addr.ip().to_string();
    match state.engine.execute(&client, &request).await {
        Ok(result) => classified_response(result),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Encode a completed execution, mapping its classification to a status.
fn classified_response(result: ExecuteResponse) -> Response {
    let status = match result.error_type {
        None | Some(ErrorType::CompileError) | Some(ErrorType::RuntimeError) => StatusCode::OK,
        Some(ErrorType::Timeout) => StatusCode::REQUEST_TIMEOUT,
        Some(ErrorType::MemoryLimit) => StatusCode::PAYLOAD_TOO_LARGE,
        // Refusals never reach this path, but the mapping stays total.
        Some(ErrorType::LimitExceeded) => StatusCode::TOO_MANY_REQUESTS,
        Some(ErrorType::UnsupportedLanguage) | Some(ErrorType::BadRequest) => {
            StatusCode::BAD_REQUEST
        }
        Some(ErrorType::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let error_type = result.error_type;
    let mut response = (status, Json(result)).into_response();
    if let Some(error_type) = error_type {
        response.extensions_mut().insert(error_type);
    }
    response
}

/// A refusal or failure, encoded in the same envelope as every response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error_type: ErrorType,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error_type: ErrorType::BadRequest,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => Self {
                status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
                error_type: ErrorType::BadRequest,
                message: "Content-Type must be application/json".to_string(),
            },
            other => Self::bad_request(other.body_text()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status = match &e {
            EngineError::UnsupportedLanguage(_) | EngineError::Rejected(_) => {
                StatusCode::BAD_REQUEST
            }
            EngineError::RateLimited | EngineError::CapacityExhausted => {
                StatusCode::TOO_MANY_REQUESTS
            }
            EngineError::RuntimeUnavailable(_) | EngineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // The sanitized Display goes to the client; the detail stays in the
        // log.
        if let EngineError::Internal(detail) | EngineError::RuntimeUnavailable(detail) = &e {
            error!(detail = %detail, "execution failed");
        }

        Self { status, error_type: e.error_type(), message: e.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ExecuteResponse::refusal(self.error_type, self.message);
        let mut response = (self.status, Json(envelope)).into_response();
        response.extensions_mut().insert(self.error_type);
        response
    }
}
