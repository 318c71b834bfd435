//! Schema-aligned feature vectors for the two model stages.

use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::FacilityRecord;
use crate::temporal::TimeFeatures;

pub const ENCODED_DAY_OF_WEEK: &str = "encoded_day_of_week";
pub const ENCODED_TIME_OF_DAY: &str = "encoded_time_of_day";
pub const COST_STATUS: &str = "combined_parking_cost_status";
pub const ABNORMAL_PARKING: &str = "encoded_abnormal_parking";
pub const SPOTS_AVAILABLE_CURRENT: &str = "parking_spots_available_current";
pub const DURATION_MINUTES: &str = "duration_minutes";
pub const PARTIAL_DURATION_INFO: &str = "partial_duration_info";
pub const SHORT_DURATION_NO_SPOT: &str = "is_short_duration_no_spot";

pub const DEFAULT_CITY_PREFIX: &str = "עיר_";
pub const DEFAULT_FACILITY_PREFIX: &str = "שם_חניה_";

/// Ordered input names a trained model expects, with a name index built once.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, index }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// One value per schema name, stored in schema order.
#[derive(Debug, Clone)]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f32>,
}

impl FeatureVector {
    /// Every schema name starts at 0; the schema is authoritative.
    pub fn zeros(schema: Arc<FeatureSchema>) -> Self {
        let values = vec![0.0; schema.len()];
        Self { schema, values }
    }

    /// Sets `name` if the schema has it. Returns whether it was set.
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        match self.schema.position(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.schema.position(name).map(|i| self.values[i])
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Values in schema order, as handed to a model.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Logs the vector length, its non-zero count and mean, and the first
    /// few named values.
    pub fn log_summary(&self, stage: &str) {
        let v = &self.values;
        let nz = v.iter().filter(|x| **x != 0.0).count();
        let mean = if v.is_empty() { 0.0 } else { v.iter().sum::<f32>() / (v.len() as f32) };
        let sample: Vec<String> = self
            .iter()
            .take(6)
            .map(|(name, x)| format!("{}={:.3}", name, x))
            .collect();
        tracing::info!(
            "{} in_dim={} nonzero={} mean={:.3} sample=[{}]",
            stage,
            v.len(),
            nz,
            mean,
            sample.join(", ")
        );
    }
}

/// Per-request values a caller may supply; each has a fixed default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestOverrides {
    pub duration_minutes: f32,
    pub partial_duration_info: f32,
    pub is_short_duration_no_spot: f32,
    pub abnormal_parking: f32,
}

impl Default for RequestOverrides {
    fn default() -> Self {
        Self {
            duration_minutes: 30.0,
            partial_duration_info: 0.0,
            is_short_duration_no_spot: 0.0,
            abnormal_parking: 0.0,
        }
    }
}

/// Builds the regression and classification inputs.
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    city_prefix: String,
    facility_prefix: String,
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_CITY_PREFIX, DEFAULT_FACILITY_PREFIX)
    }
}

impl FeatureAssembler {
    pub fn new(city_prefix: impl Into<String>, facility_prefix: impl Into<String>) -> Self {
        Self {
            city_prefix: city_prefix.into(),
            facility_prefix: facility_prefix.into(),
        }
    }

    pub fn city_column(&self, city: &str) -> String {
        format!("{}{}", self.city_prefix, city)
    }

    pub fn facility_column(&self, parking_name: &str) -> String {
        format!("{}{}", self.facility_prefix, parking_name)
    }

    /// Writes the values shared by both stages: temporal codes, cost status,
    /// the abnormal-parking indicator and the city/facility one-hot columns.
    ///
    /// One-hot columns missing from the schema (never seen in training) are
    /// skipped.
    fn overlay_common(
        &self,
        v: &mut FeatureVector,
        facility: &FacilityRecord,
        time: TimeFeatures,
        overrides: &RequestOverrides,
    ) {
        v.set(ENCODED_DAY_OF_WEEK, time.encoded_day as f32);
        v.set(ENCODED_TIME_OF_DAY, time.encoded_time as f32);
        v.set(COST_STATUS, facility.cost_status);
        v.set(ABNORMAL_PARKING, overrides.abnormal_parking);

        for column in [
            self.city_column(&facility.city),
            self.facility_column(&facility.parking_name),
        ] {
            if !v.set(&column, 1.0) {
                tracing::debug!("no one-hot column '{}' in schema", column);
            }
        }
    }

    pub fn regression(
        &self,
        schema: Arc<FeatureSchema>,
        facility: &FacilityRecord,
        time: TimeFeatures,
        overrides: &RequestOverrides,
    ) -> FeatureVector {
        let mut v = FeatureVector::zeros(schema);
        self.overlay_common(&mut v, facility, time, overrides);
        v
    }

    /// Classification input: the same values computed for regression, laid
    /// onto the classifier's own schema, plus the sanitized spot count and
    /// the duration fields.
    pub fn classification(
        &self,
        schema: Arc<FeatureSchema>,
        facility: &FacilityRecord,
        time: TimeFeatures,
        sanitized_count: u32,
        overrides: &RequestOverrides,
    ) -> FeatureVector {
        let mut v = FeatureVector::zeros(schema);
        self.overlay_common(&mut v, facility, time, overrides);
        v.set(SPOTS_AVAILABLE_CURRENT, sanitized_count as f32);
        v.set(DURATION_MINUTES, overrides.duration_minutes);
        v.set(PARTIAL_DURATION_INFO, overrides.partial_duration_info);
        v.set(SHORT_DURATION_NO_SPOT, overrides.is_short_duration_no_spot);
        v
    }
}
