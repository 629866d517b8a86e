//! HTTP surface around the delivery engine: message scheduling for
//! authenticated users and an admin API for operating the processor.

pub mod admin;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod state;
pub mod validation;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use chrono::Utc;

use timecapsule_types::api::HealthResponse;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

use crate::middleware::{require_admin, require_auth};

pub fn router(state: AppState) -> Router {
    let message_routes = Router::new()
        .route("/", post(messages::create_message))
        .route("/count", get(messages::message_count))
        .route("/timeline", get(messages::timeline))
        .route("/{message_id}", delete(messages::cancel_message))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route("/activity", get(admin::activity))
        .route("/process-messages", post(admin::process_messages))
        .route("/failed-messages", get(admin::failed_messages))
        .route("/retry-message/{message_id}", post(admin::retry_message))
        .route("/test-email", post(admin::test_email))
        .layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health))
        .nest("/api/messages", message_routes)
        .nest("/admin", admin_routes)
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
