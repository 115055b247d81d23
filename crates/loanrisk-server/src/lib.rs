//! Loan default prediction service: library interface.
//!
//! Exposes the router and state so integration tests and other binaries can
//! construct the service programmatically.

pub mod api;
pub mod config;
pub mod openapi;
pub mod shutdown;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub use state::{AppState, ModelState};

/// Build the axum [`Router`] with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health))
        .route("/ping", get(api::ping))
        .route("/ready", get(api::ready))
        .route("/predict", post(api::predict))
        .route("/predict-batch", post(api::predict_batch))
        .route("/model-info", get(api::model_info))
        .route("/openapi.json", get(api::openapi_json))
        .with_state(state)
}
