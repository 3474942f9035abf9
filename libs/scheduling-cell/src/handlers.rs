// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AppointmentSearchQuery, AppointmentStatus, BookSlotRequest, SchedulingError,
};
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::ServiceNotFound => {
                AppError::NotFound("Service not found".to_string())
            }
            SchedulingError::SlotTaken => {
                AppError::Conflict("Slot is no longer available".to_string())
            }
            SchedulingError::AppointmentNotFound => {
                AppError::NotFound("Appointment not found".to_string())
            }
            SchedulingError::Database(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct TenantParam {
    pub tenant_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub tenant_id: Uuid,
    pub client_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// HANDLERS
// ==============================================================================

/// Bookable slots for (tenant, branch, service, date). Read-only; an empty
/// slot list is a normal response, not an error.
#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(&state);

    let slots = availability
        .compute_slots(
            params.tenant_id,
            params.branch_id,
            params.service_id,
            params.date,
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "date": params.date,
        "slots": slots
    })))
}

/// Book a slot; the engine re-validates availability before writing.
#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let appointment = booking.book(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<TenantParam>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let appointment = booking
        .get_appointment(params.tenant_id, appointment_id, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<TenantParam>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let appointment = booking
        .cancel(params.tenant_id, appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let query = AppointmentSearchQuery {
        tenant_id: params.tenant_id,
        client_id: params.client_id,
        employee_id: params.employee_id,
        date: params.date,
        status: params.status,
        limit: params.limit,
        offset: params.offset,
    };

    let appointments = booking.search(query, auth.token()).await?;

    Ok(Json(json!({ "appointments": appointments })))
}

#[axum::debug_handler]
pub async fn list_sessions(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(params): Query<TenantParam>,
) -> Result<Json<Value>, AppError> {
    let booking = BookingService::new(&state);

    let sessions = booking
        .sessions(params.tenant_id, appointment_id, auth.token())
        .await?;

    Ok(Json(json!({ "sessions": sessions })))
}
