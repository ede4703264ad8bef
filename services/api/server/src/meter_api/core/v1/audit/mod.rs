use axum::Router;
use axum::routing::get;

use crate::AppState;

pub mod errors;
pub mod handler;
pub mod models;

pub fn get_routes() -> Router<AppState> {
    Router::new().route("/audit", get(handler::handler))
}
