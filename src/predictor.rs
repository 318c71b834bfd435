//! The two-stage pipeline: facility lookup, temporal encoding, regression,
//! clipping, classification.

use std::sync::Arc;

use anyhow::anyhow;

use crate::clock::Clock;
use crate::error::{ModelError, PredictError, Stage};
use crate::features::{FeatureAssembler, FeatureVector, RequestOverrides};
use crate::model::{Classifier, Regressor};
use crate::registry::FacilityRegistry;
use crate::temporal::{derive_time_features, CategoricalEncoder};

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub city: String,
    pub parking_name: String,
    pub overrides: RequestOverrides,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub available_spots: u32,
    pub is_available: bool,
    pub probability_available: f64,
    pub probability_not_available: f64,
}

/// Everything loaded once at startup. Immutable afterwards, so concurrent
/// requests read it without locking.
pub struct ModelContext {
    pub registry: FacilityRegistry,
    pub day_encoder: Box<dyn CategoricalEncoder>,
    pub time_encoder: Box<dyn CategoricalEncoder>,
    pub regressor: Box<dyn Regressor>,
    pub classifier: Box<dyn Classifier>,
    pub assembler: FeatureAssembler,
    pub clock: Box<dyn Clock>,
    pub log_features: bool,
}

/// Rounds (ties to even), floors at zero and clips to capacity.
pub fn sanitize_count(raw: f64, total_capacity: u32) -> Result<u32, ModelError> {
    if !raw.is_finite() {
        return Err(ModelError::InvalidOutput(format!(
            "non-finite regression output {}",
            raw
        )));
    }
    Ok(raw.round_ties_even().max(0.0).min(total_capacity as f64) as u32)
}

fn round2(p: f64) -> f64 {
    (p * 100.0).round_ties_even() / 100.0
}

/// Returns `(available, not_available)` rounded to 2 decimals, summing to 1.
pub fn split_probabilities(dist: [f64; 2]) -> Result<(f64, f64), ModelError> {
    let [p0, p1] = dist;
    if !p0.is_finite() || !p1.is_finite() || p0 < 0.0 || p1 < 0.0 {
        return Err(ModelError::InvalidOutput(format!(
            "invalid class distribution [{}, {}]",
            p0, p1
        )));
    }
    let total = p0 + p1;
    if total <= 0.0 {
        return Err(ModelError::InvalidOutput("class distribution sums to 0".into()));
    }
    let available = round2((p1 / total).clamp(0.0, 1.0));
    Ok((available, round2(1.0 - available)))
}

fn ensure_aligned(v: &FeatureVector, expected: usize) -> Result<(), PredictError> {
    if v.as_slice().len() != expected {
        return Err(PredictError::Internal(anyhow!(
            "assembled {} features for a schema of {}",
            v.as_slice().len(),
            expected
        )));
    }
    Ok(())
}

pub struct ParkingPredictor {
    ctx: Arc<ModelContext>,
}

impl ParkingPredictor {
    pub fn new(ctx: Arc<ModelContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ModelContext {
        &self.ctx
    }

    pub fn predict(&self, req: &PredictionRequest) -> Result<PredictionResult, PredictError> {
        let ctx = &*self.ctx;
        let facility = ctx.registry.lookup(&req.city, &req.parking_name)?;

        let time = derive_time_features(
            ctx.clock.now(),
            ctx.day_encoder.as_ref(),
            ctx.time_encoder.as_ref(),
        );

        let reg_vec = ctx.assembler.regression(
            Arc::clone(ctx.regressor.schema()),
            facility,
            time,
            &req.overrides,
        );
        ensure_aligned(&reg_vec, ctx.regressor.schema().len())?;
        if ctx.log_features {
            reg_vec.log_summary("regression");
        }

        let raw = ctx
            .regressor
            .predict(reg_vec.as_slice())
            .map_err(|e| PredictError::prediction(Stage::Regression, e))?;
        let sanitized = sanitize_count(raw, facility.total_capacity)
            .map_err(|e| PredictError::prediction(Stage::Regression, e))?;
        tracing::debug!(
            "regression raw={:.3} sanitized={} capacity={}",
            raw,
            sanitized,
            facility.total_capacity
        );

        let clf_vec = ctx.assembler.classification(
            Arc::clone(ctx.classifier.schema()),
            facility,
            time,
            sanitized,
            &req.overrides,
        );
        ensure_aligned(&clf_vec, ctx.classifier.schema().len())?;
        if ctx.log_features {
            clf_vec.log_summary("classification");
        }

        let classify = || -> Result<(i64, (f64, f64)), ModelError> {
            let (label, dist) = ctx.classifier.predict_with_distribution(clf_vec.as_slice())?;
            Ok((label, split_probabilities(dist)?))
        };
        let (label, (p_available, p_not_available)) =
            classify().map_err(|e| PredictError::prediction(Stage::Classification, e))?;

        Ok(PredictionResult {
            available_spots: sanitized,
            is_available: label != 0,
            probability_available: p_available,
            probability_not_available: p_not_available,
        })
    }

    /// Runs both models once on all-zero inputs so a model/schema mismatch
    /// surfaces before the first request.
    pub fn warmup(&self) -> anyhow::Result<()> {
        let ctx = &*self.ctx;
        let reg = ctx.regressor.schema();
        ctx.regressor
            .predict(&vec![0.0; reg.len()])
            .map_err(|e| anyhow!("regression warmup failed: {}", e))?;
        let clf = ctx.classifier.schema();
        ctx.classifier
            .predict_distribution(&vec![0.0; clf.len()])
            .map_err(|e| anyhow!("classification warmup failed: {}", e))?;
        Ok(())
    }
}
