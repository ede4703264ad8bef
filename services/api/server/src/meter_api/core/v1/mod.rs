use axum::Router;

pub(crate) mod audit;
pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod meter_readings;
pub(crate) mod users;

pub fn get_routes(state: crate::AppState) -> Router {
    Router::new()
        .merge(auth::get_routes())
        .merge(users::get_routes())
        .merge(audit::get_routes())
        .nest("/meter-readings", meter_readings::get_routes())
        .with_state(state)
}
