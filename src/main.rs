use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use car_price_dashboard::{
    config::AppConfig, server, types::Selection, DashboardContext, DatasetStore, FeatureTuple,
    Predictor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = AppConfig::from_env()?;

    let store = DatasetStore::load(&cfg.data_path)
        .with_context(|| format!("failed to load dataset {}", cfg.data_path))?;
    tracing::info!("loaded {} listings from {}", store.len(), cfg.data_path);

    let predictor = load_predictor(&cfg)?;

    // Warmup on the first listing so a broken model fails at startup, not on the first click
    if let Some(model) = store.models_for_brand(None).first() {
        let sel = Selection {
            model: Some(model.clone()),
            ..Selection::default()
        };
        let tuple = FeatureTuple::assemble(model, store.engine_capacity(model)?, &sel);
        let raw = predictor
            .predict(&tuple)
            .with_context(|| format!("warmup prediction failed for {}", model))?;
        tracing::info!("warmup predict ok ({} -> {:.4})", model, raw);
    }

    let ctx = DashboardContext::new(store, predictor);
    let app = server::router(ctx);

    tracing::info!("listening on {}", cfg.bind);
    let listener = tokio::net::TcpListener::bind(cfg.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(not(feature = "torch"))]
fn load_predictor(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Predictor>> {
    let p = car_price_dashboard::PipelinePredictor::load(&cfg.model_path)?;
    tracing::info!("loaded predictor {} from {}", p.name(), cfg.model_path);
    Ok(Arc::new(p))
}

#[cfg(feature = "torch")]
fn load_predictor(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Predictor>> {
    let p = car_price_dashboard::torch::TorchPredictor::new(&cfg.model_path, &cfg.meta_path)?;
    tracing::info!("loaded predictor {}", p.name());
    Ok(Arc::new(p))
}
