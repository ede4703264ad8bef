use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub mod errors;
pub mod handler;
pub mod models;

pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route("/current", get(handler::current))
        .route("/submit", post(handler::submit))
        .route("/history", get(handler::history))
        .route("/history/all", get(handler::history_all))
        .route("/month/{month}", get(handler::by_month))
        .route("/totals", get(handler::totals))
}
