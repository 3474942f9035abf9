// libs/scheduling-cell/src/services/booking.rs
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::models::AppointmentNotice;
use notification_cell::services::dispatch::NotificationDispatcher;
use shared_config::AppConfig;
use shared_database::postgrest::{PostgrestClient, PostgrestError};

use crate::models::{
    Appointment, AppointmentSearchQuery, AppointmentSession, AppointmentStatus, BookSlotRequest,
    EmployeeSelector, EnrichedAppointment, SchedulingError, Service, SessionSeed, SessionStatus,
};
use crate::services::availability::AvailabilityService;

pub struct BookingService {
    postgrest: Arc<PostgrestClient>,
    availability: AvailabilityService,
    notifier: NotificationDispatcher,
    rng: Mutex<StdRng>,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic "any available employee" resolution for scenario tests.
    pub fn with_rng_seed(config: &AppConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &AppConfig, rng: StdRng) -> Self {
        let postgrest = Arc::new(PostgrestClient::new(config));
        Self {
            availability: AvailabilityService::with_client(Arc::clone(&postgrest)),
            notifier: NotificationDispatcher::new(config),
            postgrest,
            rng: Mutex::new(rng),
        }
    }

    /// Book a slot. Availability is recomputed from the store immediately
    /// before the write; a caller-supplied snapshot is never trusted. The
    /// write itself is a single transactional RPC guarded by the store's
    /// no-overlap exclusion constraint, so two racing calls for the same
    /// employee and slot cannot both succeed.
    pub async fn book(
        &self,
        request: BookSlotRequest,
        auth_token: &str,
    ) -> Result<EnrichedAppointment, SchedulingError> {
        info!(
            "Booking slot at minute {} on {} for client {} (tenant {})",
            request.start_minute, request.date, request.client_id, request.tenant_id
        );

        let service = self
            .availability
            .fetch_service(request.tenant_id, request.service_id, auth_token)
            .await?;
        let slots = self
            .availability
            .slots_for_service(&service, request.branch_id, request.date, auth_token)
            .await?;

        let Some(slot) = slots
            .iter()
            .find(|s| s.start_minute == request.start_minute)
        else {
            warn!(
                "Requested slot at minute {} on {} is not bookable",
                request.start_minute, request.date
            );
            return Err(SchedulingError::SlotTaken);
        };

        let employee_id = match request.employee {
            EmployeeSelector::Any => self.pick_any(&slot.employee_ids),
            EmployeeSelector::Id(id) => {
                if !slot.employee_ids.contains(&id) {
                    warn!("Employee {} is not free for the requested slot", id);
                    return Err(SchedulingError::SlotTaken);
                }
                id
            }
        };

        let appointment = self
            .insert_appointment(&service, &request, employee_id, auth_token)
            .await?;

        let enriched = self
            .get_appointment(request.tenant_id, appointment.id, auth_token)
            .await?;

        // Fire-and-forget: notification latency or failure never affects the
        // booking outcome.
        self.notifier
            .spawn_appointment_created(Self::notice_for(&enriched));

        info!(
            "Appointment {} booked with employee {} at minute {}",
            enriched.appointment.id, employee_id, request.start_minute
        );
        Ok(enriched)
    }

    /// Cancel an appointment. Cancelling twice is idempotent; cancelled rows
    /// are never written again.
    pub async fn cancel(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Cancelling appointment {} (tenant {})", appointment_id, tenant_id);

        let current = self
            .get_appointment(tenant_id, appointment_id, auth_token)
            .await?
            .appointment;
        if current.status == AppointmentStatus::Cancelled {
            debug!("Appointment {} is already cancelled", appointment_id);
            return Ok(current);
        }

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&tenant_id=eq.{}",
            appointment_id, tenant_id
        );
        let body = json!({
            "status": AppointmentStatus::Cancelled.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .postgrest
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let Some(row) = result.into_iter().next() else {
            return Err(SchedulingError::Database(
                "cancel returned no appointment row".to_string(),
            ));
        };

        let cancelled: Appointment = serde_json::from_value(row)
            .map_err(|e| SchedulingError::Database(format!("failed to parse appointment: {}", e)))?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    /// Single enriched read: the appointment with employee, client and
    /// service display fields embedded.
    pub async fn get_appointment(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<EnrichedAppointment, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&tenant_id=eq.{}&select=*,employees(full_name),clients(full_name,email,phone),services(name)",
            appointment_id, tenant_id
        );

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let Some(row) = result.into_iter().next() else {
            return Err(SchedulingError::AppointmentNotFound);
        };

        serde_json::from_value(row)
            .map_err(|e| SchedulingError::Database(format!("failed to parse appointment: {}", e)))
    }

    /// Search appointments within one tenant.
    pub async fn search(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        debug!("Searching appointments for tenant {}", query.tenant_id);

        let mut query_parts = vec![format!("tenant_id=eq.{}", query.tenant_id)];
        if let Some(client_id) = query.client_id {
            query_parts.push(format!("client_id=eq.{}", client_id));
        }
        if let Some(employee_id) = query.employee_id {
            query_parts.push(format!("employee_id=eq.{}", employee_id));
        }
        if let Some(date) = query.date {
            query_parts.push(format!("date=eq.{}", date));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let mut path = format!(
            "/rest/v1/appointments?{}&order=starts_at.desc",
            query_parts.join("&")
        );
        if let Some(limit) = query.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value::<Appointment>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SchedulingError::Database(format!("failed to parse appointments: {}", e)))
    }

    /// Sessions of one appointment, in order.
    pub async fn sessions(
        &self,
        tenant_id: Uuid,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AppointmentSession>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointment_sessions?tenant_id=eq.{}&appointment_id=eq.{}&order=session_number.asc",
            tenant_id, appointment_id
        );

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value::<AppointmentSession>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SchedulingError::Database(format!("failed to parse sessions: {}", e)))
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    fn pick_any(&self, employee_ids: &[Uuid]) -> Uuid {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        employee_ids[rng.gen_range(0..employee_ids.len())]
    }

    /// Session rows created with the appointment: session 1 is actionable
    /// now, the rest are placeholders for later scheduling.
    pub(crate) fn session_seeds(total_sessions: i32) -> Vec<SessionSeed> {
        (1..=total_sessions.max(1))
            .map(|n| SessionSeed {
                session_number: n,
                status: if n == 1 {
                    SessionStatus::Pending
                } else {
                    SessionStatus::ScheduledLater
                },
            })
            .collect()
    }

    fn absolute_start(date: NaiveDate, start_minute: i32) -> DateTime<Utc> {
        let time = NaiveTime::from_num_seconds_from_midnight_opt(start_minute as u32 * 60, 0)
            .unwrap_or(NaiveTime::MIN);
        date.and_time(time).and_utc()
    }

    /// Transactional insert of the appointment and its full session
    /// complement. The store function runs both inserts in one transaction
    /// and enforces the per-(tenant, employee) no-overlap exclusion
    /// constraint; its 409 is the only race signal and maps to `SlotTaken`.
    async fn insert_appointment(
        &self,
        service: &Service,
        request: &BookSlotRequest,
        employee_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let starts_at = Self::absolute_start(request.date, request.start_minute);
        let payload = json!({
            "p_tenant_id": request.tenant_id,
            "p_branch_id": request.branch_id,
            "p_service_id": service.id,
            "p_employee_id": employee_id,
            "p_client_id": request.client_id,
            "p_date": request.date,
            "p_start_minute": request.start_minute,
            "p_starts_at": starts_at.to_rfc3339(),
            "p_duration_minutes": service.duration_minutes,
            "p_total_sessions": service.total_sessions,
            "p_sessions": Self::session_seeds(service.total_sessions),
        });

        let result: Vec<Value> = self
            .postgrest
            .request(
                Method::POST,
                "/rest/v1/rpc/book_appointment",
                Some(auth_token),
                Some(payload),
            )
            .await
            .map_err(|e| match e {
                PostgrestError::Conflict(_) => {
                    warn!(
                        "Exclusion constraint rejected booking for employee {} at minute {}",
                        employee_id, request.start_minute
                    );
                    SchedulingError::SlotTaken
                }
                other => SchedulingError::Database(other.to_string()),
            })?;

        let Some(row) = result.into_iter().next() else {
            return Err(SchedulingError::Database(
                "booking returned no appointment row".to_string(),
            ));
        };

        serde_json::from_value(row).map_err(|e| {
            SchedulingError::Database(format!("failed to parse created appointment: {}", e))
        })
    }

    fn notice_for(enriched: &EnrichedAppointment) -> AppointmentNotice {
        AppointmentNotice {
            appointment_id: enriched.appointment.id,
            tenant_id: enriched.appointment.tenant_id,
            client_name: enriched.client.full_name.clone(),
            client_email: enriched.client.email.clone(),
            client_phone: enriched.client.phone.clone(),
            employee_name: enriched.employee.full_name.clone(),
            service_name: enriched.service.name.clone(),
            starts_at: enriched.appointment.starts_at,
            duration_minutes: enriched.appointment.duration_minutes,
        }
    }
}
