/// Tests for the HTTP boundary: request validation, status codes and bodies.
///
/// Run with: cargo test --test api_tests -- --nocapture
mod common;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::HarnessBuilder;
use parking_predictor::{
    server::{self, AppState},
    types::{ErrorBody, PredictPayload, PredictResponse, SUCCESS_MESSAGE},
};

fn state(h: common::Harness) -> (AppState, common::Seen) {
    let seen = Arc::clone(&h.reg_seen);
    (
        AppState {
            predictor: Arc::new(h.predictor),
        },
        seen,
    )
}

fn payload(city: Option<&str>, parking_name: Option<&str>) -> PredictPayload {
    PredictPayload {
        city: city.map(str::to_string),
        parking_name: parking_name.map(str::to_string),
        ..Default::default()
    }
}

fn expect_ok(r: Result<Json<PredictResponse>, Response>) -> PredictResponse {
    match r {
        Ok(Json(resp)) => resp,
        Err(resp) => panic!("request should succeed, got {}", resp.status()),
    }
}

fn expect_err(r: Result<Json<PredictResponse>, Response>) -> Response {
    match r {
        Ok(Json(resp)) => panic!("request should fail, got {:?}", resp),
        Err(resp) => resp,
    }
}

async fn error_body(resp: Response) -> (StatusCode, ErrorBody) {
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body: ErrorBody = serde_json::from_slice(&bytes).expect("error body should be JSON");
    (status, body)
}

#[tokio::test]
async fn test_successful_prediction_envelope() {
    println!("\n=== Test: POST /predict success ===");
    let (st, _) = state(
        HarnessBuilder {
            reg_output: Some(53.7),
            ..Default::default()
        }
        .build(),
    );

    let resp = expect_ok(
        server::predict(
            State(st),
            Ok(Json(payload(Some("Tel Aviv"), Some("CentralGarage")))),
        )
        .await,
    );

    assert_eq!(
        resp,
        PredictResponse {
            predicted_available_spots: 50,
            predicted_is_available: 1,
            probability_available: 0.7,
            probability_not_available: 0.3,
            message: SUCCESS_MESSAGE.to_string(),
        }
    );

    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["message"], "Prediction successful");
    assert_eq!(json["predicted_is_available"], 1);
    println!("✓ {}", json);
}

#[tokio::test]
async fn test_missing_fields_fail_fast() {
    println!("\n=== Test: Missing city / parking_name ===");
    let (st, seen) = state(HarnessBuilder::default().build());

    let resp = expect_err(
        server::predict(State(st.clone()), Ok(Json(payload(None, Some("CentralGarage"))))).await,
    );
    let (status, body) = error_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error, "missing required field(s): city");

    let resp = expect_err(server::predict(State(st), Ok(Json(payload(Some(""), None)))).await);
    let (status, body) = error_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error, "missing required field(s): city, parking_name");

    assert!(seen.lock().is_empty(), "no model may run on invalid input");
}

#[tokio::test]
async fn test_unknown_facility_is_bad_request() {
    let (st, seen) = state(HarnessBuilder::default().build());

    let resp = expect_err(
        server::predict(State(st), Ok(Json(payload(Some("Haifa"), Some("Nowhere"))))).await,
    );
    let (status, body) = error_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.error.contains("Nowhere"), "message should name the facility");
    assert!(!body.error.starts_with("missing"), "distinct from the missing-field case");
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn test_model_failure_is_internal_error() {
    println!("\n=== Test: Model failure maps to 500 ===");
    let (st, _) = state(
        HarnessBuilder {
            reg_output: None,
            ..Default::default()
        }
        .build(),
    );

    let resp = expect_err(
        server::predict(
            State(st),
            Ok(Json(payload(Some("Tel Aviv"), Some("CentralGarage")))),
        )
        .await,
    );
    let (status, body) = error_body(resp).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.message.as_deref(), Some("internal server error"));
    assert!(body.error.contains("regression model failed"));
    assert!(body.error.contains("stub regression failure"), "cause preserved");
}

#[test]
fn test_payload_overrides_and_defaults() {
    let parsed: PredictPayload = serde_json::from_str(
        r#"{"city": "Tel Aviv", "parking_name": "CentralGarage", "duration_minutes": 120}"#,
    )
    .unwrap();
    let req = parsed.validate().unwrap();
    assert_eq!(req.overrides.duration_minutes, 120.0);
    assert_eq!(req.overrides.partial_duration_info, 0.0);
    assert_eq!(req.overrides.is_short_duration_no_spot, 0.0);
    assert_eq!(req.overrides.abnormal_parking, 0.0);
}

#[tokio::test]
async fn test_health_reports_loaded_artifacts() {
    let (st, _) = state(HarnessBuilder::default().build());
    let resp = server::health(State(st)).await.into_response();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["facilities"], 3);
    assert_eq!(json["regression_features"], common::REG_FEATURES.len());
    assert_eq!(json["classification_features"], common::CLF_FEATURES.len());
}
