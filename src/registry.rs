//! Static facility attributes, loaded once from the facility CSV.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::error::PredictError;

/// Columns renamed across data-preparation revisions, mapped to their
/// canonical names.
const DEPRECATED_COLUMNS: [(&str, &str); 2] = [
    ("total_parking_spots", "total_spots"),
    ("combined_parking_cost_status", "cost_status"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FacilityRecord {
    pub city: String,
    pub parking_name: String,
    pub total_capacity: u32,
    pub cost_status: f32,
    /// Carried for completeness; no model consumes it.
    pub facility_type: Option<String>,
}

#[derive(Deserialize, Debug)]
struct FacilityRow {
    city: String,
    parking_name: String,
    #[serde(alias = "total_parking_spots")]
    total_spots: f64,
    #[serde(alias = "combined_parking_cost_status")]
    cost_status: f32,
    #[serde(default)]
    parking_type: Option<String>,
}

impl TryFrom<FacilityRow> for FacilityRecord {
    type Error = anyhow::Error;

    fn try_from(row: FacilityRow) -> Result<Self> {
        let spots = row.total_spots;
        if !spots.is_finite() || spots < 0.0 || spots.fract() != 0.0 || spots > u32::MAX as f64 {
            bail!(
                "invalid total_spots {} for '{}' in '{}'",
                spots,
                row.parking_name,
                row.city
            );
        }
        if !row.cost_status.is_finite() {
            bail!(
                "invalid cost_status for '{}' in '{}'",
                row.parking_name,
                row.city
            );
        }
        Ok(Self {
            city: row.city,
            parking_name: row.parking_name,
            total_capacity: spots as u32,
            cost_status: row.cost_status,
            facility_type: row.parking_type.filter(|t| !t.is_empty()),
        })
    }
}

/// Read-only (city, parking_name) -> attributes table.
#[derive(Debug, Default)]
pub struct FacilityRegistry {
    records: HashMap<(String, String), FacilityRecord>,
}

impl FacilityRegistry {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open static data at {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers = rdr.headers().context("failed to read CSV header")?.clone();
        for (old, canonical) in DEPRECATED_COLUMNS {
            if headers.iter().any(|h| h == old) {
                tracing::warn!("static data uses deprecated column '{}', expected '{}'", old, canonical);
            }
        }

        let mut records = Vec::new();
        for (i, row) in rdr.deserialize::<FacilityRow>().enumerate() {
            // header is line 1
            let row = row.with_context(|| format!("malformed row at line {}", i + 2))?;
            records.push(FacilityRecord::try_from(row)?);
        }
        Self::from_records(records)
    }

    /// Builds the table, rejecting duplicate (city, parking_name) pairs.
    pub fn from_records(records: impl IntoIterator<Item = FacilityRecord>) -> Result<Self> {
        let mut map = HashMap::new();
        for rec in records {
            match map.entry((rec.city.clone(), rec.parking_name.clone())) {
                Entry::Occupied(_) => bail!(
                    "duplicate rows for facility '{}' in '{}'",
                    rec.parking_name,
                    rec.city
                ),
                Entry::Vacant(slot) => {
                    slot.insert(rec);
                }
            }
        }
        Ok(Self { records: map })
    }

    /// Exact, case-sensitive match on both fields.
    pub fn lookup(&self, city: &str, parking_name: &str) -> Result<&FacilityRecord, PredictError> {
        self.records
            .get(&(city.to_string(), parking_name.to_string()))
            .ok_or_else(|| PredictError::FacilityNotFound {
                city: city.to_string(),
                parking_name: parking_name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
