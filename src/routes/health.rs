use axum::{http::StatusCode, response::Json};
use serde_json::json;

pub async fn root_info() -> Json<serde_json::Value> {
    Json(json!({
        "message": "White Paper Summary API",
        "docs": "/docs",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
