use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

pub mod health;
pub mod papers;

pub fn create_router(state: AppState) -> Router<()> {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let body_limit = state.config.max_upload_bytes;

    let papers_routes = Router::new()
        .route("/", get(papers::list_papers))
        .route("/filters", get(papers::filter_options))
        .route("/stats", get(papers::paper_stats))
        .route("/upload", post(papers::upload_paper))
        .route("/scan", post(papers::scan_papers))
        .route(
            "/:id",
            get(papers::get_paper).delete(papers::delete_paper),
        );

    Router::new()
        .route("/", get(health::root_info))
        .route("/health", get(health::health_check))
        .nest("/api/papers", papers_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
}
