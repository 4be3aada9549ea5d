//! Router construction

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value as JsonValue};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::service_data_routes::{get_service_data, ServiceDataState};
use crate::database::ServiceDetailsSource;

/// Build the application router around a row source.
pub fn build_router(source: Arc<dyn ServiceDetailsSource>) -> Router {
    let state = ServiceDataState::new(source);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/service_data", get(get_service_data))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

async fn health_check() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}
