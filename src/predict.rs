use crate::context::DashboardContext;
use crate::error::PredictError;
use crate::types::{FeatureTuple, PredictionOutcome, Selection};

pub const NO_MODEL_WARNING: &str = "Please select a car model.";

/// Converts the model's log-price back to currency units.
pub fn price_from_log(raw: f64) -> Result<u64, PredictError> {
    let price = raw.exp().round();
    if !price.is_finite() || price < 0.0 || price > u64::MAX as f64 {
        return Err(PredictError::NonFinite);
    }
    Ok(price as u64)
}

pub fn format_price(price: u64) -> String {
    format!("Predicted Resale Price: ₹{}", price)
}

/// Handles one "Predict" click.
///
/// Without a model selection the predictor is never touched and a warning
/// comes back. Lookup or model failures are reported for this request only.
pub fn request_prediction(ctx: &DashboardContext, sel: &Selection) -> PredictionOutcome {
    let Some(model) = sel.model.as_deref() else {
        tracing::warn!("prediction requested without a car model");
        return PredictionOutcome::Warning {
            message: NO_MODEL_WARNING.to_string(),
        };
    };

    match predict_price(ctx, model, sel) {
        Ok(price) => {
            tracing::info!(model, price, "prediction ok");
            PredictionOutcome::Success {
                price,
                message: format_price(price),
            }
        }
        Err(e) => {
            tracing::error!(model, error = %e, "prediction failed");
            PredictionOutcome::Error {
                message: format!("Prediction failed: {e:#}"),
            }
        }
    }
}

fn predict_price(ctx: &DashboardContext, model: &str, sel: &Selection) -> anyhow::Result<u64> {
    let engine_capacity = ctx.store.engine_capacity(model)?;
    let tuple = FeatureTuple::assemble(model, engine_capacity, sel);
    tracing::debug!(?tuple, "invoking predictor");

    let raw = ctx.predictor.predict(&tuple)?;
    Ok(price_from_log(raw)?)
}
