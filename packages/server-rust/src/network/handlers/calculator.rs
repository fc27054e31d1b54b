//! Calculator endpoints: independent calculation and the operand stack.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use super::response::{invalid_body, invalid_query};
use super::AppState;
use crate::network::middleware::RequestNumber;
use crate::service::{OperationError, OperationResponse};

type HandlerResult = Result<OperationResponse, OperationError>;

/// Body of `POST /calculator/independent/calculate`.
#[derive(Debug, Deserialize)]
pub struct CalculateBody {
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Body of `PUT /calculator/stack/arguments`.
#[derive(Debug, Deserialize)]
pub struct PushBody {
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct OperateParams {
    pub operation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PopParams {
    pub count: Option<String>,
}

/// `GET /calculator/health`
pub async fn calculator_health() -> &'static str {
    "OK"
}

/// `POST /calculator/independent/calculate`
pub async fn independent_calculate(
    State(state): State<AppState>,
    Extension(request): Extension<RequestNumber>,
    body: Result<Json<CalculateBody>, JsonRejection>,
) -> HandlerResult {
    let Json(body) = body.map_err(|rejection| invalid_body(&rejection))?;
    let op = state
        .services
        .factory
        .calculate_independent(body.operation, body.arguments);
    state.dispatch(request, op).await
}

/// `GET /calculator/stack/size`
pub async fn stack_size(
    State(state): State<AppState>,
    Extension(request): Extension<RequestNumber>,
) -> HandlerResult {
    let op = state.services.factory.stack_size();
    state.dispatch(request, op).await
}

/// `PUT /calculator/stack/arguments`
pub async fn push_arguments(
    State(state): State<AppState>,
    Extension(request): Extension<RequestNumber>,
    body: Result<Json<PushBody>, JsonRejection>,
) -> HandlerResult {
    let Json(body) = body.map_err(|rejection| invalid_body(&rejection))?;
    let op = state.services.factory.push_operands(body.arguments);
    state.dispatch(request, op).await
}

/// `GET /calculator/stack/operate?operation=<name>`
pub async fn stack_operate(
    State(state): State<AppState>,
    Extension(request): Extension<RequestNumber>,
    params: Result<Query<OperateParams>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = params.map_err(|rejection| invalid_query(&rejection))?;
    let op = state
        .services
        .factory
        .calculate_from_stack(params.operation);
    state.dispatch(request, op).await
}

/// `DELETE /calculator/stack/arguments?count=<n>`
pub async fn pop_arguments(
    State(state): State<AppState>,
    Extension(request): Extension<RequestNumber>,
    params: Result<Query<PopParams>, QueryRejection>,
) -> HandlerResult {
    let Query(params) = params.map_err(|rejection| invalid_query(&rejection))?;
    let op = state.services.factory.pop_operands(params.count);
    state.dispatch(request, op).await
}
