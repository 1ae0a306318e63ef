pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::filtering::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Filtering API
        .route(
            "/api/v1/tickets/:id/applications",
            get(handlers::handle_list_applications),
        )
        .route(
            "/api/v1/tickets/:id/filtering",
            get(handlers::handle_get_status).post(handlers::handle_trigger_filtering),
        )
        .route(
            "/api/v1/tickets/:id/top-candidates",
            get(handlers::handle_get_top_candidates),
        )
        .route("/api/v1/tickets/:id/report", get(handlers::handle_get_report))
        .route("/api/v1/tickets/:id/refresh", post(handlers::handle_refresh))
        .route(
            "/api/v1/tickets/:id/send-top-candidates",
            post(handlers::handle_send_top_candidates),
        )
        .route(
            "/api/v1/tickets/:id/watch",
            delete(handlers::handle_stop_watching),
        )
        .with_state(state)
}
