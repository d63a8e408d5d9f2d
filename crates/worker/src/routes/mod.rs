pub mod batches;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the route tree.
///
/// ```text
/// GET  /health
/// POST /batches/abnormal          (when enabled)
/// POST /batches/average           (when enabled)
/// POST /batches/average-report    (when enabled)
/// ```
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/batches", batches::router(state))
}
