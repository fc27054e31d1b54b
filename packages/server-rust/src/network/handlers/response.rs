//! JSON response framing: `{"result": ...}` on success and
//! `{"errorMessage": "..."}` on failure.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use calc_core::CalcError;
use serde::{Deserialize, Serialize};

use crate::service::{OperationError, OperationResponse};
use crate::telemetry::TelemetryError;

/// Successful response body.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ResultBody<T> {
    pub result: T,
}

/// Failure response body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_message: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
        }
    }

    /// Pairs the body with a status code as a complete response.
    #[must_use]
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for OperationResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Value(value) => Json(ResultBody { result: value }).into_response(),
            Self::Size(size) => Json(ResultBody { result: size }).into_response(),
            Self::History(entries) => Json(ResultBody { result: entries }).into_response(),
        }
    }
}

/// HTTP status for an operation failure.
#[must_use]
pub fn status_for(err: &OperationError) -> StatusCode {
    match err {
        OperationError::Calc(_) => StatusCode::CONFLICT,
        OperationError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
        OperationError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        OperationError::UnknownService { .. }
        | OperationError::WrongService { .. }
        | OperationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for OperationError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "operation failed");
        }
        ErrorBody::new(self.to_string()).with_status(status)
    }
}

impl IntoResponse for TelemetryError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Filter(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingParameter(_) | Self::UnknownLogger(_) | Self::UnknownLevel(_) => {
                StatusCode::CONFLICT
            }
        };
        ErrorBody::new(self.to_string()).with_status(status)
    }
}

/// A body that could not be decoded is an input error like any other.
#[must_use]
pub fn invalid_body(rejection: &JsonRejection) -> OperationError {
    CalcError::invalid_input(format!(
        "Error: invalid request body: {}",
        rejection.body_text()
    ))
    .into()
}

/// A query string that could not be decoded.
#[must_use]
pub fn invalid_query(rejection: &QueryRejection) -> OperationError {
    CalcError::invalid_input(format!(
        "Error: invalid query string: {}",
        rejection.body_text()
    ))
    .into()
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use calc_core::{HistoryEntry, Origin};

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_wraps_result() {
        let response = OperationResponse::Value(-3).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "result": -3 }));
    }

    #[tokio::test]
    async fn history_entries_use_flavor_field() {
        let response = OperationResponse::History(vec![HistoryEntry {
            origin: Origin::Stack,
            operation: "minus".into(),
            arguments: vec![20, 10],
            result: 10,
        }])
        .into_response();
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "result": [
                    { "flavor": "STACK", "operation": "minus", "arguments": [20, 10], "result": 10 }
                ]
            })
        );
    }

    #[tokio::test]
    async fn calc_errors_are_conflicts() {
        let err = OperationError::from(CalcError::DivisionByZero { operation: "Divide" });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "errorMessage": "Error while performing operation Divide: division by 0"
            })
        );
    }

    #[test]
    fn pipeline_errors_map_to_their_statuses() {
        assert_eq!(
            status_for(&OperationError::Overloaded),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&OperationError::Timeout { timeout_ms: 1 }),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            status_for(&OperationError::UnknownService { name: "x".into() }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn telemetry_errors_are_conflicts() {
        let response = TelemetryError::UnknownLogger("x".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    proptest::proptest! {
        #[test]
        fn underflow_is_always_a_conflict(requested in 1usize..10_000, available in 0usize..10_000) {
            let err = OperationError::from(CalcError::Underflow {
                requested: requested.to_string(),
                available,
            });
            proptest::prop_assert_eq!(status_for(&err), StatusCode::CONFLICT);
            proptest::prop_assert_eq!(
                err.to_string(),
                format!("Error: cannot remove {requested} from the stack. It has only {available} arguments")
            );
        }
    }
}
