pub mod bookings;
pub mod calendar;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/validation", get(bookings::get_validation))
        .route("/api/bookings/:id/customer", put(bookings::update_customer))
        .route("/api/bookings/:id/service", put(bookings::update_service))
        .route("/api/bookings/:id/pricing", put(bookings::update_pricing))
        .route("/api/bookings/:id/notes", put(bookings::update_notes))
        .route("/api/bookings/:id/metadata", put(bookings::update_metadata))
        .route("/api/bookings/:id/submit", post(bookings::submit_booking))
        .route("/api/bookings/:id/payment", post(bookings::process_payment))
        .route(
            "/api/bookings/:id/payment/settle",
            post(bookings::settle_payment),
        )
        .route("/api/bookings/:id/refund", post(bookings::refund_payment))
        .route(
            "/api/bookings/:id/appointment",
            post(bookings::schedule_appointment),
        )
        .route(
            "/api/bookings/:id/appointment/reschedule",
            post(bookings::reschedule_appointment),
        )
        .route(
            "/api/bookings/:id/appointment/cancel",
            post(bookings::cancel_appointment),
        )
        .route(
            "/api/bookings/:id/appointment/confirm",
            post(bookings::confirm_appointment),
        )
        .route(
            "/api/bookings/:id/appointment/reminders",
            post(bookings::record_reminder),
        )
        .route("/api/bookings/:id/start", post(bookings::start_service))
        .route("/api/bookings/:id/complete", post(bookings::complete_booking))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/bookings/:id/no-show", post(bookings::mark_no_show))
        .route("/api/conflicts", get(bookings::find_conflicts))
        .route("/calendar/:booking_id", get(calendar::download_ics))
        .with_state(state)
}
