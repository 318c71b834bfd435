//! HTTP boundary: the only place a `PredictError` becomes a status code.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::error::PredictError;
use crate::predictor::ParkingPredictor;
use crate::types::{ErrorBody, HealthResponse, PredictPayload, PredictResponse};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<ParkingPredictor>,
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_client_error() {
            tracing::warn!("rejected request: {}", self);
            ErrorBody {
                error: self.to_string(),
                message: None,
            }
        } else {
            tracing::error!("prediction failed: {}", self);
            ErrorBody {
                error: self.to_string(),
                message: Some("internal server error".to_string()),
            }
        };
        (status, Json(body)).into_response()
    }
}

// ---------- Handlers ----------

/// `POST /predict`
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictPayload>, JsonRejection>,
) -> Result<Json<PredictResponse>, Response> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!("malformed request body: {}", rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: rejection.body_text(),
                message: None,
            }),
        )
            .into_response()
    })?;

    let req = payload.validate().map_err(IntoResponse::into_response)?;
    let result = state
        .predictor
        .predict(&req)
        .map_err(IntoResponse::into_response)?;

    tracing::info!(
        "city={} parking={} spots={} available={} p={:.2}",
        req.city,
        req.parking_name,
        result.available_spots,
        result.is_available,
        result.probability_available
    );
    Ok(Json(PredictResponse::from(result)))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ctx = state.predictor.context();
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        facilities: ctx.registry.len(),
        regression_features: ctx.regressor.schema().len(),
        classification_features: ctx.classifier.schema().len(),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
}
