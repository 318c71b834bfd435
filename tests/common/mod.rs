#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;

use parking_predictor::{
    clock::FixedClock,
    error::ModelError,
    predictor::{ModelContext, ParkingPredictor},
    Classifier, FacilityRecord, FacilityRegistry, FeatureAssembler, FeatureSchema, LabelEncoder,
    Regressor,
};

pub type Seen = Arc<Mutex<Vec<Vec<f32>>>>;

pub const REG_FEATURES: [&str; 8] = [
    "encoded_day_of_week",
    "encoded_time_of_day",
    "combined_parking_cost_status",
    "encoded_abnormal_parking",
    "עיר_Tel Aviv",
    "עיר_Haifa",
    "שם_חניה_CentralGarage",
    "שם_חניה_PortLot",
];

// Deliberately not in regression order.
pub const CLF_FEATURES: [&str; 11] = [
    "duration_minutes",
    "parking_spots_available_current",
    "encoded_day_of_week",
    "encoded_time_of_day",
    "combined_parking_cost_status",
    "encoded_abnormal_parking",
    "עיר_Tel Aviv",
    "שם_חניה_CentralGarage",
    "שם_חניה_PortLot",
    "partial_duration_info",
    "is_short_duration_no_spot",
];

pub fn schema(names: &[&str]) -> Arc<FeatureSchema> {
    Arc::new(FeatureSchema::new(names.iter().map(|s| s.to_string()).collect()))
}

/// Wednesday 2024-05-15 10:00.
pub fn wednesday_morning() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 15)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

pub fn facility(city: &str, name: &str, capacity: u32, cost_status: f32) -> FacilityRecord {
    FacilityRecord {
        city: city.to_string(),
        parking_name: name.to_string(),
        total_capacity: capacity,
        cost_status,
        facility_type: None,
    }
}

pub fn registry() -> FacilityRegistry {
    FacilityRegistry::from_records([
        facility("Tel Aviv", "CentralGarage", 50, 1.0),
        facility("Haifa", "PortLot", 120, 0.0),
        facility("Eilat", "NewLot", 10, 2.0),
    ])
    .unwrap()
}

pub struct StubRegressor {
    pub schema: Arc<FeatureSchema>,
    /// `None` makes every call fail.
    pub output: Option<f64>,
    pub seen: Seen,
}

impl Regressor for StubRegressor {
    fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    fn predict(&self, x: &[f32]) -> Result<f64, ModelError> {
        parking_predictor::model::check_len(x, &self.schema)?;
        self.seen.lock().push(x.to_vec());
        self.output
            .ok_or_else(|| ModelError::InvalidOutput("stub regression failure".into()))
    }
}

pub struct StubClassifier {
    pub schema: Arc<FeatureSchema>,
    pub label: i64,
    pub dist: [f64; 2],
    pub seen: Seen,
}

impl Classifier for StubClassifier {
    fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    fn predict(&self, x: &[f32]) -> Result<i64, ModelError> {
        parking_predictor::model::check_len(x, &self.schema)?;
        Ok(self.label)
    }

    fn predict_distribution(&self, x: &[f32]) -> Result<[f64; 2], ModelError> {
        parking_predictor::model::check_len(x, &self.schema)?;
        Ok(self.dist)
    }

    /// Records each combined call, so a test can count classifier passes.
    fn predict_with_distribution(&self, x: &[f32]) -> Result<(i64, [f64; 2]), ModelError> {
        parking_predictor::model::check_len(x, &self.schema)?;
        self.seen.lock().push(x.to_vec());
        Ok((self.label, self.dist))
    }
}

pub struct Harness {
    pub predictor: ParkingPredictor,
    pub reg_seen: Seen,
    pub clf_seen: Seen,
}

pub struct HarnessBuilder {
    pub reg_output: Option<f64>,
    pub label: i64,
    pub dist: [f64; 2],
    pub day_classes: Vec<String>,
    pub now: NaiveDateTime,
    pub reg_features: &'static [&'static str],
    pub clf_features: &'static [&'static str],
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            reg_output: Some(20.0),
            label: 1,
            dist: [0.3, 0.7],
            day_classes: (0..7).map(|d| d.to_string()).collect(),
            now: wednesday_morning(),
            reg_features: &REG_FEATURES,
            clf_features: &CLF_FEATURES,
        }
    }
}

impl HarnessBuilder {
    pub fn build(self) -> Harness {
        let reg_seen = Seen::default();
        let clf_seen = Seen::default();
        let ctx = ModelContext {
            registry: registry(),
            day_encoder: Box::new(LabelEncoder::new(self.day_classes)),
            // sorted, as the training-time encoder stores them
            time_encoder: Box::new(LabelEncoder::new(["afternoon", "evening", "morning"])),
            regressor: Box::new(StubRegressor {
                schema: schema(self.reg_features),
                output: self.reg_output,
                seen: Arc::clone(&reg_seen),
            }),
            classifier: Box::new(StubClassifier {
                schema: schema(self.clf_features),
                label: self.label,
                dist: self.dist,
                seen: Arc::clone(&clf_seen),
            }),
            assembler: FeatureAssembler::default(),
            clock: Box::new(FixedClock(self.now)),
            log_features: true,
        };
        Harness {
            predictor: ParkingPredictor::new(Arc::new(ctx)),
            reg_seen,
            clf_seen,
        }
    }
}

pub fn value(names: &[&str], row: &[f32], name: &str) -> f32 {
    let i = names
        .iter()
        .position(|n| *n == name)
        .unwrap_or_else(|| panic!("{} not in schema", name));
    row[i]
}
