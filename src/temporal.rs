//! Day-of-week and time-of-day features.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Deserialize;
use thiserror::Error;

/// Code substituted when an encoder rejects a value.
pub const FALLBACK_CODE: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// [6,12) morning, [12,18) afternoon, everything else evening.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("value '{0}' was not seen during training")]
    Unseen(String),
}

/// Maps a training-time category to its integer code.
pub trait CategoricalEncoder: Send + Sync {
    fn encode(&self, value: &str) -> Result<i64, EncodeError>;
}

#[derive(Deserialize)]
struct EncoderJson {
    classes: Vec<serde_json::Value>,
}

/// Encoder whose code for a value is the value's index in `classes`.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = S>) -> Self {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read encoder at {}", path.display()))?;
        Self::from_json(&txt).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_json(txt: &str) -> Result<Self> {
        let parsed: EncoderJson = serde_json::from_str(txt)?;
        // numeric classes (weekday indices) compare by their textual form
        let classes = parsed.classes.into_iter().map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        Ok(Self::new(classes))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl CategoricalEncoder for LabelEncoder {
    fn encode(&self, value: &str) -> Result<i64, EncodeError> {
        self.classes
            .iter()
            .position(|c| c == value)
            .map(|i| i as i64)
            .ok_or_else(|| EncodeError::Unseen(value.to_string()))
    }
}

/// Encodes `value`, substituting [`FALLBACK_CODE`] when the encoder rejects
/// it. An unseen temporal category never aborts a request; the substitution
/// is only visible in the logs.
pub fn encode_or_fallback(encoder: &dyn CategoricalEncoder, name: &str, value: &str) -> i64 {
    match encoder.encode(value) {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!("{} encoder: {}; using fallback code {}", name, e, FALLBACK_CODE);
            FALLBACK_CODE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFeatures {
    pub encoded_day: i64,
    pub encoded_time: i64,
}

/// Encodes an already-derived weekday (0 = Monday) and time bucket.
pub fn encode_time_features(
    weekday: u32,
    time_of_day: TimeOfDay,
    day_encoder: &dyn CategoricalEncoder,
    time_encoder: &dyn CategoricalEncoder,
) -> TimeFeatures {
    TimeFeatures {
        encoded_day: encode_or_fallback(day_encoder, "day_of_week", &weekday.to_string()),
        encoded_time: encode_or_fallback(time_encoder, "time_of_day", time_of_day.label()),
    }
}

pub fn derive_time_features(
    now: NaiveDateTime,
    day_encoder: &dyn CategoricalEncoder,
    time_encoder: &dyn CategoricalEncoder,
) -> TimeFeatures {
    let weekday = now.weekday().num_days_from_monday();
    let time_of_day = TimeOfDay::from_hour(now.hour());
    tracing::debug!("weekday={} time_of_day={}", weekday, time_of_day.label());
    encode_time_features(weekday, time_of_day, day_encoder, time_encoder)
}
