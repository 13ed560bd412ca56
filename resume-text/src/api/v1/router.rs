use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json));

    // The extract handler enforces the configured upload limit while streaming.
    let resumes = Router::new()
        .route("/resumes:extract", post(handlers::resumes::extract_resume))
        .layer(DefaultBodyLimit::disable());

    Router::new().merge(public_routes).merge(resumes)
}
