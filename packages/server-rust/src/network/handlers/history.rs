//! History endpoints.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Extension;
use serde::Deserialize;

use super::response::invalid_query;
use super::AppState;
use crate::network::middleware::RequestNumber;
use crate::service::{OperationError, OperationResponse};

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// `STACK`, `INDEPENDENT`, or absent for everything.
    pub flavor: Option<String>,
}

/// `GET /calculator/history[?flavor=STACK|INDEPENDENT]`
pub async fn fetch_history(
    State(state): State<AppState>,
    Extension(request): Extension<RequestNumber>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<OperationResponse, OperationError> {
    let Query(params) = params.map_err(|rejection| invalid_query(&rejection))?;
    let op = state.services.factory.fetch_history(params.flavor);
    state.dispatch(request, op).await
}

/// `DELETE /calculator/history`
pub async fn clear_history(
    State(state): State<AppState>,
    Extension(request): Extension<RequestNumber>,
) -> Result<OperationResponse, OperationError> {
    let op = state.services.factory.clear_history();
    state.dispatch(request, op).await
}
