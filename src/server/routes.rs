use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::report::{CreateReport, NewReport, Report};
use crate::server::AppState;
use crate::server::error::ApiError;

/// Reports returned when no `limit` is given
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest accepted `limit`
pub const MAX_LIMIT: u32 = 1000;

pub const LIMIT_ERROR: &str = "limit must be between 1 and 1000";

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Kept as text so integers of any size reach `validate_limit`
    pub limit: Option<String>,
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "SkyWatch Africa API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateReport>, JsonRejection>,
) -> Result<Json<Report>, ApiError> {
    let Json(payload) = payload?;
    let new_report = NewReport::try_from(payload)?;

    let report = state
        .database
        .run(move |store| store.create_report(&new_report))
        .await?;

    tracing::info!(id = report.id, event_type = %report.event_type, "Report created");
    Ok(Json(report))
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let Query(params) = params?;
    let limit = validate_limit(params.limit.as_deref())?;

    let reports = state
        .database
        .run(move |store| store.list_reports(limit))
        .await?;

    tracing::debug!(limit, returned = reports.len(), "Listed reports");
    Ok(Json(reports))
}

pub fn validate_limit(limit: Option<&str>) -> Result<u32, ApiError> {
    let Some(raw) = limit.map(str::trim) else {
        return Ok(DEFAULT_LIMIT);
    };

    match raw.parse::<i64>() {
        Ok(n) if (1..=i64::from(MAX_LIMIT)).contains(&n) => Ok(n as u32),
        Ok(_) => Err(ApiError::BadRequest(LIMIT_ERROR.to_string())),
        // Too large for i64 but still an integer
        Err(_) if is_integer(raw) => Err(ApiError::BadRequest(LIMIT_ERROR.to_string())),
        Err(_) => Err(ApiError::BadRequest(format!(
            "limit must be an integer, got {:?}",
            raw
        ))),
    }
}

fn is_integer(raw: &str) -> bool {
    let digits = raw
        .strip_prefix('-')
        .or_else(|| raw.strip_prefix('+'))
        .unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(None).unwrap(), 100);
        assert_eq!(validate_limit(Some("1")).unwrap(), 1);
        assert_eq!(validate_limit(Some("1000")).unwrap(), 1000);
        assert_eq!(validate_limit(Some(" 42 ")).unwrap(), 42);

        for bad in ["0", "-1", "1001", "9223372036854775807", "99999999999999999999", "-99999999999999999999"] {
            let err = validate_limit(Some(bad)).unwrap_err();
            assert_eq!(err.to_string(), LIMIT_ERROR, "limit {}", bad);
        }
    }

    #[test]
    fn test_limit_must_be_integer() {
        for bad in ["ten", "", "1.5", "-", "1e3"] {
            let err = validate_limit(Some(bad)).unwrap_err();
            assert_ne!(err.to_string(), LIMIT_ERROR, "limit {:?}", bad);
        }
    }
}
