/// Health check endpoint
use axum::{routing::get, Json, Router};
use serde_json::json;

use crate::context::AppContext;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
