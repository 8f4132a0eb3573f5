pub mod error;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Multipart framing around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/api/donors",
            get(routes::list_donors).post(routes::create_donor),
        )
        .route("/api/donors/upload", post(routes::upload_donors))
        .route(
            "/api/donors/{id}",
            get(routes::get_donor)
                .put(routes::replace_donor)
                .patch(routes::update_donor)
                .delete(routes::delete_donor),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
