use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use parking_predictor::{
    clock::SystemClock,
    config::ServiceConfig,
    predictor::{ModelContext, ParkingPredictor},
    server::{self, AppState},
    FacilityRegistry, FeatureAssembler, LabelEncoder,
};

#[cfg(feature = "torch")]
fn load_models(
    cfg: &ServiceConfig,
) -> Result<(
    Box<dyn parking_predictor::Regressor>,
    Box<dyn parking_predictor::Classifier>,
)> {
    use parking_predictor::model::{TorchClassifier, TorchRegressor};

    let reg = TorchRegressor::new(
        &cfg.artifact(&cfg.regression_model),
        &cfg.artifact(&cfg.regression_meta),
    )?;
    let clf = TorchClassifier::new(
        &cfg.artifact(&cfg.classification_model),
        &cfg.artifact(&cfg.classification_meta),
    )?;
    Ok((Box::new(reg), Box::new(clf)))
}

#[cfg(not(feature = "torch"))]
fn load_models(
    _cfg: &ServiceConfig,
) -> Result<(
    Box<dyn parking_predictor::Regressor>,
    Box<dyn parking_predictor::Classifier>,
)> {
    anyhow::bail!("built without the `torch` feature; no model backend available")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServiceConfig::load()?;
    tracing::info!("artifacts dir: {}", cfg.artifacts_dir.display());

    let registry = FacilityRegistry::load(cfg.artifact(&cfg.static_data))?;
    tracing::info!("loaded {} facilities", registry.len());

    let day_encoder = LabelEncoder::load(cfg.artifact(&cfg.day_encoder))?;
    let time_encoder = LabelEncoder::load(cfg.artifact(&cfg.time_encoder))?;

    let (regressor, classifier) = load_models(&cfg)?;
    tracing::info!(
        "loaded regression model; feat_list[{}]: {:?}",
        regressor.schema().len(),
        regressor.schema().names()
    );
    tracing::info!(
        "loaded classification model; feat_list[{}]: {:?}",
        classifier.schema().len(),
        classifier.schema().names()
    );

    let ctx = ModelContext {
        registry,
        day_encoder: Box::new(day_encoder),
        time_encoder: Box::new(time_encoder),
        regressor,
        classifier,
        assembler: FeatureAssembler::new(cfg.city_prefix.clone(), cfg.facility_prefix.clone()),
        clock: Box::new(SystemClock),
        log_features: cfg.log_features,
    };
    let predictor = ParkingPredictor::new(Arc::new(ctx));

    // Warmup to catch schema/model mismatches before serving
    predictor.warmup()?;
    tracing::info!("warmup forward ok");

    let app = server::router(AppState {
        predictor: Arc::new(predictor),
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
