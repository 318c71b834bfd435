//! Parking availability prediction.
//!
//! A facility lookup, a temporal encoding step and two chained models: a
//! regressor estimating the number of free spots, and a classifier deciding
//! whether at least one spot is likely free given that estimate.

pub mod clock;
pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod predictor;
pub mod registry;
pub mod server;
pub mod temporal;
pub mod types;

pub use error::{ModelError, PredictError, Stage};
pub use features::{FeatureAssembler, FeatureSchema, FeatureVector, RequestOverrides};
pub use model::{Classifier, Regressor};
pub use predictor::{ModelContext, ParkingPredictor, PredictionResult};
pub use registry::{FacilityRecord, FacilityRegistry};
pub use temporal::{CategoricalEncoder, LabelEncoder, TimeFeatures, TimeOfDay};
