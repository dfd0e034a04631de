use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{BudgetEstimator, TravelBudgetError, VERSION, models::BudgetEstimate};

pub type AppState = Arc<BudgetEstimator>;

/// Raw trip parameters; validated by the estimator
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiBudgetRequest {
    pub destination: String,
    #[serde(alias = "partySize")]
    pub party_size: i64,
    pub days: i64,
    pub season: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: String,
    pub version: String,
}

pub struct ApiErrorResponse(StatusCode, String);

impl From<TravelBudgetError> for ApiErrorResponse {
    fn from(err: TravelBudgetError) -> Self {
        let status = if err.is_invalid_request() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self(status, err.user_message())
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        // oversized bodies keep their 413, every other rejection is a bad request
        let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            StatusCode::PAYLOAD_TOO_LARGE
        } else {
            StatusCode::BAD_REQUEST
        };
        Self(status, rejection.body_text())
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.0, Json(ApiError { error: self.1 })).into_response()
    }
}

pub fn router(estimator: AppState) -> Router {
    Router::new()
        .route("/budget", post(estimate_budget))
        .route("/health", get(health))
        .with_state(estimator)
}

async fn estimate_budget(
    State(estimator): State<AppState>,
    payload: Result<Json<ApiBudgetRequest>, JsonRejection>,
) -> Result<Json<BudgetEstimate>, ApiErrorResponse> {
    let Json(request) = payload?;
    let estimate = estimator
        .estimate_budget(
            &request.destination,
            request.party_size,
            request.days,
            &request.season,
        )
        .await
        .inspect_err(|e| warn!("Rejected budget request: {}", e))?;
    Ok(Json(estimate))
}

async fn health() -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "ok".to_string(),
        version: VERSION.to_string(),
    })
}
