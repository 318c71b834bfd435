use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ModelError;
use crate::features::FeatureSchema;

/// Estimates a continuous quantity from a schema-ordered vector.
pub trait Regressor: Send + Sync {
    fn schema(&self) -> &Arc<FeatureSchema>;
    fn predict(&self, x: &[f32]) -> Result<f64, ModelError>;
}

/// Binary classifier over {0 = not available, 1 = available}.
pub trait Classifier: Send + Sync {
    fn schema(&self) -> &Arc<FeatureSchema>;
    fn predict(&self, x: &[f32]) -> Result<i64, ModelError>;
    /// `[p(class 0), p(class 1)]`.
    fn predict_distribution(&self, x: &[f32]) -> Result<[f64; 2], ModelError>;

    /// Label and distribution for one input. Backends whose single forward
    /// pass yields both should override this.
    fn predict_with_distribution(&self, x: &[f32]) -> Result<(i64, [f64; 2]), ModelError> {
        Ok((self.predict(x)?, self.predict_distribution(x)?))
    }
}

pub fn check_len(x: &[f32], schema: &FeatureSchema) -> Result<(), ModelError> {
    if x.len() != schema.len() {
        return Err(ModelError::ShapeMismatch {
            expected: schema.len(),
            got: x.len(),
        });
    }
    Ok(())
}

#[derive(Deserialize)]
struct MetaJson {
    feat_list: Vec<String>,
    in_dim: Option<usize>,
}

/// Reads a model's `meta.json` and returns its feature schema.
pub fn load_schema(meta_path: impl AsRef<Path>) -> Result<FeatureSchema> {
    let meta_path = meta_path.as_ref();
    let meta_txt = fs::read_to_string(meta_path)
        .with_context(|| format!("failed to read meta at {}", meta_path.display()))?;
    schema_from_json(&meta_txt).with_context(|| format!("failed to parse {}", meta_path.display()))
}

pub fn schema_from_json(txt: &str) -> Result<FeatureSchema> {
    let meta: MetaJson = serde_json::from_str(txt)?;
    let feat_list = meta.feat_list;
    if let Some(in_dim) = meta.in_dim {
        if in_dim != feat_list.len() {
            tracing::warn!(
                "meta.in_dim ({}) != feat_list.len() ({}); using feat_list.len()",
                in_dim,
                feat_list.len()
            );
        }
    }
    Ok(FeatureSchema::new(feat_list))
}

#[cfg(feature = "torch")]
pub use torch::{TorchClassifier, TorchRegressor};

#[cfg(feature = "torch")]
mod torch {
    use std::path::Path;
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use tch::{kind::Kind, CModule, Device, IValue, Tensor};

    use super::{check_len, load_schema, Classifier, Regressor};
    use crate::error::ModelError;
    use crate::features::FeatureSchema;

    fn load_module(model_path: &Path, device: Device) -> Result<CModule> {
        CModule::load_on_device(model_path, device)
            .with_context(|| format!("failed to load TorchScript {}", model_path.display()))
    }

    fn input(x: &[f32], device: Device) -> Tensor {
        Tensor::from_slice(x)
            .reshape([1, x.len() as i64])
            .to_device(device)
    }

    /// TorchScript regressor; forward returns a tensor whose first element is
    /// the estimate.
    pub struct TorchRegressor {
        model: CModule,
        device: Device,
        schema: Arc<FeatureSchema>,
    }

    impl TorchRegressor {
        pub fn new(model_path: &Path, meta_path: &Path) -> Result<Self> {
            let device = Device::Cpu;
            let schema = Arc::new(load_schema(meta_path)?);
            let model = load_module(model_path, device)?;
            Ok(Self { model, device, schema })
        }
    }

    impl Regressor for TorchRegressor {
        fn schema(&self) -> &Arc<FeatureSchema> {
            &self.schema
        }

        fn predict(&self, x: &[f32]) -> Result<f64, ModelError> {
            check_len(x, &self.schema)?;
            let t = self
                .model
                .forward_ts(&[input(x, self.device)])?
                .to_kind(Kind::Double)
                .f_reshape([-1])?;
            if t.numel() == 0 {
                return Err(ModelError::InvalidOutput("empty regression output".into()));
            }
            Ok(t.f_double_value(&[0])?)
        }
    }

    /// TorchScript classifier; forward returns `(labels, probabilities)` with
    /// probabilities shaped `[1, 2]`.
    pub struct TorchClassifier {
        model: CModule,
        device: Device,
        schema: Arc<FeatureSchema>,
    }

    impl TorchClassifier {
        pub fn new(model_path: &Path, meta_path: &Path) -> Result<Self> {
            let device = Device::Cpu;
            let schema = Arc::new(load_schema(meta_path)?);
            let model = load_module(model_path, device)?;
            Ok(Self { model, device, schema })
        }

        fn forward(&self, x: &[f32]) -> Result<(Tensor, Tensor), ModelError> {
            check_len(x, &self.schema)?;
            let out = self
                .model
                .forward_is(&[IValue::Tensor(input(x, self.device))])?;
            match out {
                IValue::Tuple(mut parts) if parts.len() == 2 => {
                    let probs = parts.pop();
                    let labels = parts.pop();
                    match (labels, probs) {
                        (Some(IValue::Tensor(l)), Some(IValue::Tensor(p))) => Ok((l, p)),
                        _ => Err(ModelError::InvalidOutput(
                            "classifier tuple must hold two tensors".into(),
                        )),
                    }
                }
                other => Err(ModelError::InvalidOutput(format!(
                    "expected (labels, probabilities), got {:?}",
                    other
                ))),
            }
        }
    }

    fn label(labels: Tensor) -> Result<i64, ModelError> {
        let labels = labels.to_kind(Kind::Int64).f_reshape([-1])?;
        if labels.numel() == 0 {
            return Err(ModelError::InvalidOutput("empty label output".into()));
        }
        Ok(labels.f_int64_value(&[0])?)
    }

    fn distribution(probs: Tensor) -> Result<[f64; 2], ModelError> {
        let probs = probs.to_kind(Kind::Double).f_reshape([-1])?;
        if probs.numel() != 2 {
            return Err(ModelError::InvalidOutput(format!(
                "unexpected probability shape: {:?}",
                probs.size()
            )));
        }
        Ok([probs.f_double_value(&[0])?, probs.f_double_value(&[1])?])
    }

    impl Classifier for TorchClassifier {
        fn schema(&self) -> &Arc<FeatureSchema> {
            &self.schema
        }

        fn predict(&self, x: &[f32]) -> Result<i64, ModelError> {
            let (labels, _) = self.forward(x)?;
            label(labels)
        }

        fn predict_distribution(&self, x: &[f32]) -> Result<[f64; 2], ModelError> {
            let (_, probs) = self.forward(x)?;
            distribution(probs)
        }

        fn predict_with_distribution(&self, x: &[f32]) -> Result<(i64, [f64; 2]), ModelError> {
            let (labels, probs) = self.forward(x)?;
            Ok((label(labels)?, distribution(probs)?))
        }
    }
}
