use serde::{Deserialize, Serialize};

use crate::error::PredictError;
use crate::features::RequestOverrides;
use crate::predictor::{PredictionRequest, PredictionResult};

pub const SUCCESS_MESSAGE: &str = "Prediction successful";

// ---------- Request/Response types ----------

#[derive(Deserialize, Debug, Default)]
pub struct PredictPayload {
    pub city: Option<String>,
    pub parking_name: Option<String>,
    pub duration_minutes: Option<f32>,
    pub partial_duration_info: Option<f32>,
    pub is_short_duration_no_spot: Option<f32>,
    pub abnormal_parking: Option<f32>,
}

impl PredictPayload {
    /// Rejects absent or empty `city`/`parking_name` and fills in the
    /// defaults for every optional field.
    pub fn validate(self) -> Result<PredictionRequest, PredictError> {
        let city = self.city.filter(|s| !s.is_empty());
        let parking_name = self.parking_name.filter(|s| !s.is_empty());

        let (city, parking_name) = match (city, parking_name) {
            (Some(c), Some(p)) => (c, p),
            (c, p) => {
                let mut missing = Vec::new();
                if c.is_none() {
                    missing.push("city");
                }
                if p.is_none() {
                    missing.push("parking_name");
                }
                return Err(PredictError::Validation(missing.join(", ")));
            }
        };

        let defaults = RequestOverrides::default();
        Ok(PredictionRequest {
            city,
            parking_name,
            overrides: RequestOverrides {
                duration_minutes: self.duration_minutes.unwrap_or(defaults.duration_minutes),
                partial_duration_info: self
                    .partial_duration_info
                    .unwrap_or(defaults.partial_duration_info),
                is_short_duration_no_spot: self
                    .is_short_duration_no_spot
                    .unwrap_or(defaults.is_short_duration_no_spot),
                abnormal_parking: self.abnormal_parking.unwrap_or(defaults.abnormal_parking),
            },
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictResponse {
    pub predicted_available_spots: u32,
    pub predicted_is_available: u8,
    pub probability_available: f64,
    pub probability_not_available: f64,
    pub message: String,
}

impl From<PredictionResult> for PredictResponse {
    fn from(r: PredictionResult) -> Self {
        Self {
            predicted_available_spots: r.available_spots,
            predicted_is_available: u8::from(r.is_available),
            probability_available: r.probability_available,
            probability_not_available: r.probability_not_available,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub facilities: usize,
    pub regression_features: usize,
    pub classification_features: usize,
}
