// libs/scheduling-cell/src/services/occupancy.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::postgrest::PostgrestClient;

use crate::models::{Appointment, SchedulingError, TimeRange};

/// Read-only view of already-booked time. Reduces pending/confirmed
/// appointments on a date to per-employee busy intervals, using each row's
/// stored duration snapshot rather than a live join to the service.
pub struct OccupancyIndex {
    postgrest: Arc<PostgrestClient>,
}

impl OccupancyIndex {
    pub fn new(postgrest: Arc<PostgrestClient>) -> Self {
        Self { postgrest }
    }

    /// Busy intervals per employee for one tenant and date. Cancelled rows
    /// are excluded by the query; rows from other tenants are never visible.
    /// This is a defensive read: stored rows are not assumed disjoint.
    pub async fn busy_intervals(
        &self,
        tenant_id: Uuid,
        employee_ids: &[Uuid],
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<HashMap<Uuid, Vec<TimeRange>>, SchedulingError> {
        if employee_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let id_list = employee_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/appointments?tenant_id=eq.{}&date=eq.{}&employee_id=in.({})&status=in.(pending,confirmed)&order=start_minute.asc",
            tenant_id, date, id_list
        );

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let appointments = result
            .into_iter()
            .map(serde_json::from_value::<Appointment>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SchedulingError::Database(format!("failed to parse appointment: {}", e)))?;

        debug!(
            "Loaded {} booked appointments for {} employees on {}",
            appointments.len(),
            employee_ids.len(),
            date
        );

        let mut busy: HashMap<Uuid, Vec<TimeRange>> = HashMap::new();
        for appointment in appointments {
            busy.entry(appointment.employee_id)
                .or_default()
                .push(appointment.interval());
        }
        for intervals in busy.values_mut() {
            intervals.sort_by_key(|range| range.start_minute);
        }

        Ok(busy)
    }
}
