//! Used-car resale price dashboard: listing filters, price prediction and
//! analysis charts served over HTTP.

pub mod charts;
pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod model;
pub mod predict;
pub mod server;
pub mod sidebar;
#[cfg(feature = "torch")]
pub mod torch;
pub mod types;

pub use context::DashboardContext;
pub use dataset::DatasetStore;
pub use model::{PipelinePredictor, Predictor};
pub use types::{FeatureTuple, PredictionOutcome, Selection};
