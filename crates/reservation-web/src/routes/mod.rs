//! Route handlers for the reservation site.

pub mod admin;
pub mod health;
pub mod login;
pub mod notifications;
pub mod reservations;
pub mod webhook;


use axum::routing::{get, post};
use axum::Router;
use database::Reservation;
use notifier::NotificationData;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::expose_internal_detail;
use crate::state::AppState;

/// Build the router with all API routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Reservations
        .route("/api/create-reservation", post(reservations::create_reservation))
        .route("/api/cancel-reservation", post(reservations::cancel_reservation))
        .route("/api/get-reservations", get(reservations::get_reservations))
        // LINE Login
        .route("/api/line-login", get(login::line_login))
        .route("/api/line-login-callback", get(login::line_login_callback))
        // LINE messaging
        .route("/api/line-webhook", post(webhook::line_webhook))
        .route("/api/send-line-notification", post(notifications::send_line_notification))
        .route("/api/test-line-notification", post(notifications::send_line_notification))
        // Admin
        .route("/api/verify-admin", post(admin::verify_admin))
        .route("/api/debug-env", get(admin::debug_env))
}

/// Full application: API routes, static site and middleware.
pub fn app(state: AppState) -> Router {
    let mut app = router().fallback_service(ServeDir::new(&state.config.static_dir));

    // Must stay inside the CORS layer.
    if !state.config.is_production() {
        app = app.layer(axum::middleware::map_response(expose_internal_detail));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Notification payload for a stored reservation.
pub(crate) fn notification_data(reservation: &Reservation) -> NotificationData {
    NotificationData {
        id: reservation.id.clone(),
        name: reservation.name.clone(),
        affiliation: reservation.affiliation.clone(),
        favorite: reservation.favorite.clone(),
        email: reservation.email.clone(),
    }
}
