use askama::Template;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{any::Any, sync::Arc};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::charts::{render_charts, ChartPanel};
use crate::context::DashboardContext;
use crate::predict::request_prediction;
use crate::sidebar::SidebarOptions;
use crate::types::{PredictionOutcome, Selection};

pub type AppState = Arc<DashboardContext>;

pub fn router(ctx: DashboardContext) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/options", get(options))
        .route("/api/predict", post(predict))
        .route("/api/charts", get(charts))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(Arc::new(ctx))
}

// ---------- Page ----------

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardPage {
    options: SidebarOptions,
}

async fn index(State(ctx): State<AppState>) -> Response {
    let page = DashboardPage {
        options: SidebarOptions::build(&ctx.store, None),
    };
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render dashboard page");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ---------- JSON API ----------

async fn health(State(ctx): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "rows": ctx.store.len(),
        "predictor": ctx.predictor.name(),
    }))
}

#[derive(Debug, Deserialize)]
struct OptionsQuery {
    brand: Option<String>,
}

async fn options(
    State(ctx): State<AppState>,
    Query(q): Query<OptionsQuery>,
) -> Json<SidebarOptions> {
    let brand = q.brand.as_deref().filter(|b| !b.is_empty());
    Json(SidebarOptions::build(&ctx.store, brand))
}

async fn predict(
    State(ctx): State<AppState>,
    body: Result<Json<Selection>, JsonRejection>,
) -> Response {
    let sel = match body {
        Ok(Json(sel)) => sel,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };
    if let Err(e) = sel.validate() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
    }

    let outcome = request_prediction(&ctx, &sel);
    let status = match outcome {
        PredictionOutcome::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    (status, Json(outcome)).into_response()
}

#[derive(Debug, Deserialize)]
struct ChartsQuery {
    model: Option<String>,
}

async fn charts(State(ctx): State<AppState>, Query(q): Query<ChartsQuery>) -> Json<ChartPanel> {
    let model = q.model.as_deref().filter(|m| !m.is_empty());
    Json(render_charts(&ctx.store, model))
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(PredictionOutcome::Error { message })).into_response()
}

/// A panicking handler still answers in the JSON shape the page reads.
fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "request handler panicked");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Request failed: {}", detail),
    )
}
