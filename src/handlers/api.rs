//! Public service endpoints.

use axum::Json;
use serde_json::{Value, json};

use crate::utils::now_rfc3339;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "voxnote-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": now_rfc3339(),
    }))
}
