use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use crate::AppState;
use crate::domain::audit::RequestTrace;

/// Writes one audit row per API request before the handler runs.
///
/// The write is best effort: a failure is logged and the request proceeds.
pub async fn record(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (route, message) = {
        let uri = request.uri();
        let path = uri.path();
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map_or(path, MatchedPath::as_str);

        let message = RequestTrace {
            time: Utc::now(),
            route,
            method: request.method().as_str(),
            path,
            query: uri.query(),
        }
        .message();

        (route.to_string(), message)
    };

    // Nothing borrowed from the request may be held across this await.
    if let Err(e) = state.audit.append(message).await {
        tracing::warn!(error = %e, route = %route, "Failed to write audit entry");
    }

    next.run(request).await
}
