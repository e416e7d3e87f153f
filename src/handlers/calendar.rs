use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    // Strip .ics suffix if present
    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let shared = state
        .bookings
        .get(booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    let ics = {
        let controller = shared.lock().await;
        generate_ics(controller.booking(), &state.config.business_name)
    }
    .ok_or_else(|| AppError::NotFound(format!("appointment for booking {booking_id}")))?;

    let filename = format!("booking-{booking_id}.ics");
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
