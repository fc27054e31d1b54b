//! Runtime log-level endpoints.

use axum::extract::{Query, State};
use serde::Deserialize;

use super::AppState;
use crate::telemetry::{level_name, parse_level, Logger, TelemetryError};

#[derive(Debug, Default, Deserialize)]
pub struct LogLevelParams {
    #[serde(rename = "logger-name")]
    pub logger_name: Option<String>,
    #[serde(rename = "logger-level")]
    pub logger_level: Option<String>,
}

fn logger_param(params: &LogLevelParams) -> Result<Logger, TelemetryError> {
    params
        .logger_name
        .as_deref()
        .ok_or(TelemetryError::MissingParameter("logger-name"))?
        .parse()
}

/// `GET /logs/level?logger-name=<name>`
pub async fn get_log_level(
    State(state): State<AppState>,
    Query(params): Query<LogLevelParams>,
) -> Result<&'static str, TelemetryError> {
    let logger = logger_param(&params)?;
    Ok(level_name(state.log_levels.level(logger)))
}

/// `PUT /logs/level?logger-name=<name>&logger-level=<level>`
pub async fn set_log_level(
    State(state): State<AppState>,
    Query(params): Query<LogLevelParams>,
) -> Result<&'static str, TelemetryError> {
    let logger = logger_param(&params)?;
    let level = parse_level(
        params
            .logger_level
            .as_deref()
            .ok_or(TelemetryError::MissingParameter("logger-level"))?,
    )?;
    let applied = state.log_levels.set_level(logger, level)?;
    Ok(level_name(applied))
}
