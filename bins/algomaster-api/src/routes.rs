// Route table for the AlgoMaster API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::export_metrics))
        .route("/run", post(handlers::run_code))
        .route("/hint", post(handlers::hint))
        .route("/feedback", post(handlers::feedback))
        .route("/problems/generate", post(handlers::generate_problems))
}
