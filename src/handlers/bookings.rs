use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::{
    Booking, BookingStatus, CustomerInfo, PricingInfo, RescheduleInitiator, ServiceDetails,
    ServiceType,
};
use crate::services::lifecycle::{AppointmentProposal, BookingController};
use crate::services::payment::PaymentRequest;
use crate::services::registry::SharedController;
use crate::state::AppState;

fn find(state: &AppState, id: &str) -> Result<SharedController, AppError> {
    state
        .bookings
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

fn booking_body(booking: &Booking) -> Json<Value> {
    Json(json!({ "success": true, "booking": booking }))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<BookingStatus>,
    pub service_type: Option<ServiceType>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let mut bookings = Vec::new();
    let mut busy = Vec::new();
    // Bookings mid-operation are reported by id rather than waited on.
    for (id, shared) in state.bookings.entries() {
        let Ok(controller) = shared.try_lock() else {
            busy.push(id);
            continue;
        };
        let booking = controller.booking();
        if query.status.is_some_and(|s| s != booking.status) {
            continue;
        }
        if query.service_type.is_some_and(|t| t != booking.service_type()) {
            continue;
        }
        bookings.push(booking.clone());
    }
    bookings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    busy.sort();
    if !busy.is_empty() {
        tracing::debug!(busy = busy.len(), "skipped bookings locked by an operation");
    }

    Json(json!({ "success": true, "bookings": bookings, "busy": busy }))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub service_type: ServiceType,
    #[serde(default)]
    pub service: Option<ServiceDetails>,
    #[serde(default)]
    pub customer: CustomerInfo,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let service = match req.service {
        Some(details) if details.service_type() != req.service_type => {
            return Err(AppError::BadRequest(format!(
                "service details are for {}, not {}",
                details.service_type().as_str(),
                req.service_type.as_str()
            )));
        }
        Some(details) => details,
        None => ServiceDetails::empty(req.service_type),
    };

    let controller = BookingController::create(Arc::clone(&state.engine), service, req.customer)?;
    let body = booking_body(controller.booking());
    state.bookings.insert(controller);

    Ok((StatusCode::CREATED, body))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let controller = shared.lock().await;
    Ok(booking_body(controller.booking()))
}

// GET /api/bookings/:id/validation
pub async fn get_validation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let controller = shared.lock().await;
    Ok(Json(json!({ "success": true, "validation": controller.validate() })))
}

// PUT /api/bookings/:id/customer
pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(customer): Json<CustomerInfo>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.update_customer_info(customer)?;
    Ok(booking_body(controller.booking()))
}

// PUT /api/bookings/:id/service
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(service): Json<ServiceDetails>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.update_service_details(service)?;
    Ok(booking_body(controller.booking()))
}

// PUT /api/bookings/:id/pricing
pub async fn update_pricing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(pricing): Json<PricingInfo>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.update_pricing(pricing)?;
    Ok(booking_body(controller.booking()))
}

// PUT /api/bookings/:id/notes
#[derive(Deserialize)]
pub struct NotesRequest {
    pub notes: String,
}

pub async fn update_notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<NotesRequest>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.update_notes(req.notes)?;
    Ok(booking_body(controller.booking()))
}

// PUT /api/bookings/:id/metadata
#[derive(Deserialize)]
pub struct MetadataRequest {
    pub key: String,
    /// Null removes the key.
    #[serde(default)]
    pub value: Option<String>,
}

pub async fn update_metadata(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MetadataRequest>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.set_metadata(&req.key, req.value)?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/submit
pub async fn submit_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.submit()?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/payment
pub async fn process_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    let payment = controller.process_payment(req).await?;
    Ok(Json(json!({
        "success": true,
        "payment": payment,
        "booking": controller.booking(),
    })))
}

// POST /api/bookings/:id/payment/settle
#[derive(Deserialize)]
pub struct SettleRequest {
    pub succeeded: bool,
    #[serde(default)]
    pub reason: String,
}

pub async fn settle_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.settle_payment(req.succeeded, &req.reason).await?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/refund
#[derive(Deserialize)]
pub struct RefundRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

pub async fn refund_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    let refund = controller
        .refund_payment(req.amount, &req.reason, req.timeout_secs.map(Duration::from_secs))
        .await?;
    Ok(Json(json!({
        "success": true,
        "refund": refund,
        "booking": controller.booking(),
    })))
}

// POST /api/bookings/:id/appointment
pub async fn schedule_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(proposal): Json<AppointmentProposal>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.schedule_appointment(proposal).await?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/appointment/reschedule
#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub new_date: NaiveDateTime,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub initiator: Option<RescheduleInitiator>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller
        .reschedule_appointment(
            req.new_date,
            &req.reason,
            req.initiator.unwrap_or(RescheduleInitiator::Customer),
            req.timeout_secs.map(Duration::from_secs),
        )
        .await?;
    Ok(booking_body(controller.booking()))
}

#[derive(Deserialize)]
pub struct ReasonRequest {
    #[serde(default)]
    pub reason: String,
}

// POST /api/bookings/:id/appointment/cancel
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.cancel_appointment(&req.reason).await?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/appointment/confirm
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.confirm_appointment().await?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/appointment/reminders
#[derive(Deserialize)]
pub struct ReminderRequest {
    pub channel: String,
}

pub async fn record_reminder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReminderRequest>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.record_reminder(&req.channel).await?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/start
pub async fn start_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.start_service()?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.complete_booking().await?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.cancel_booking(&req.reason).await?;
    Ok(booking_body(controller.booking()))
}

// POST /api/bookings/:id/no-show
pub async fn mark_no_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let shared = find(&state, &id)?;
    let mut controller = shared.lock().await;
    controller.mark_no_show()?;
    Ok(booking_body(controller.booking()))
}

// GET /api/conflicts
#[derive(Deserialize)]
pub struct ConflictQuery {
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub exclude: Option<String>,
}

pub async fn find_conflicts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConflictQuery>,
) -> Result<Json<Value>, AppError> {
    let conflicts = state
        .engine
        .conflicts
        .find_conflicts(query.start, query.duration_minutes, query.exclude.as_deref())
        .await?;
    Ok(Json(json!({ "success": true, "conflicts": conflicts })))
}
