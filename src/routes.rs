// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{answer_keys, completion},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Answer-key and completion routes live under `/api/admin`.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let answer_key_routes = Router::new()
        .route(
            "/",
            get(answer_keys::list_answer_keys).post(answer_keys::create_answer_key),
        )
        .route("/template", get(answer_keys::download_template))
        .route("/import/preview", post(answer_keys::preview_import))
        .route(
            "/{id}",
            get(answer_keys::get_answer_key)
                .put(answer_keys::update_answer_key)
                .delete(answer_keys::delete_answer_key),
        )
        .route("/{id}/import", post(answer_keys::import_rows))
        .route("/{id}/completion", get(completion::get_completion))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    // Double middleware protection: Auth first, then Admin check
    let admin_routes = Router::new()
        .nest("/answer-keys", answer_key_routes)
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/admin", admin_routes)
        // Global Middleware (trace outermost, then CORS)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
