//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every screen of the marketplace is a JSON endpoint under `/api`. The
//! browser front-end renders what these return; gated endpoints answer with a
//! `303` redirect body when the session may not see the screen.

pub mod admin;
pub mod auth;
pub mod booking;
pub mod catalog;
pub mod contact;
pub mod dashboard;
pub mod owner;
pub mod screens;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Upper bound for a single property image.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/navigation", get(screens::navigation))
        .route("/api/screens/{screen}", get(screens::check))
        // auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/admin-login", post(auth::admin_login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/recovery", post(auth::recovery))
        .route("/api/auth/update-password", post(auth::update_password))
        .route("/api/auth/me", get(auth::me))
        // catalog
        .route("/api/rooms", get(catalog::rooms))
        .route("/api/services/tiles", get(catalog::tiles))
        // booking wizard
        .route("/api/booking", get(booking::current).patch(booking::update))
        .route("/api/booking/start", post(booking::start))
        .route("/api/booking/next", post(booking::next))
        .route("/api/booking/back", post(booking::back))
        .route("/api/booking/submit", post(booking::submit))
        // guest dashboard
        .route("/api/dashboard/bookings", get(dashboard::bookings))
        .route("/api/dashboard/bookings/{id}", axum::routing::delete(dashboard::cancel))
        // owner
        .route("/api/owner/dashboard", get(owner::dashboard))
        .route("/api/owner/properties", post(owner::add_property))
        .route("/api/owner/properties/{id}", get(owner::property))
        .route("/api/owner/properties/{id}/rooms", post(owner::add_room))
        .route(
            "/api/owner/properties/{id}/rooms/{room_id}",
            patch(owner::update_room).delete(owner::delete_room),
        )
        .route(
            "/api/owner/properties/{id}/rooms/{room_id}/amenities/{amenity}",
            post(owner::toggle_amenity),
        )
        .route(
            "/api/owner/properties/{id}/images",
            post(owner::upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route("/api/owner/service-definitions", get(owner::service_definitions))
        .route("/api/owner/services", post(owner::submit_service))
        // admin
        .route("/api/admin/pending", get(admin::pending))
        .route("/api/admin/{table}/{id}/status", post(admin::decide))
        .route(
            "/api/admin/service-definitions",
            get(admin::definitions).post(admin::create_definition),
        )
        .route("/api/admin/users", get(admin::search_users))
        .route("/api/admin/users/{id}/role", post(admin::change_role))
        // contact
        .route("/api/contact", post(contact::submit))
        .route("/healthz", get(healthz))
}

/// The full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_routes()
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth::close_rejected_sessions))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
