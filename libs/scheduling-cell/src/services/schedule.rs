// libs/scheduling-cell/src/services/schedule.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::postgrest::PostgrestClient;

use crate::models::{Employee, ExceptionKind, ScheduleException, SchedulingError, TimeRange};

/// Resolves an employee's effective working intervals for a date: the weekly
/// pattern, overridden by a day-specific exception when one exists.
pub struct ScheduleResolver {
    postgrest: Arc<PostgrestClient>,
}

impl ScheduleResolver {
    pub fn new(postgrest: Arc<PostgrestClient>) -> Self {
        Self { postgrest }
    }

    /// Effective working intervals for the date. Absent data resolves to
    /// "not working"; there are no error conditions.
    pub fn effective_intervals(
        employee: &Employee,
        date: NaiveDate,
        exception: Option<&ScheduleException>,
    ) -> Vec<TimeRange> {
        match exception {
            Some(ex) if ex.kind == ExceptionKind::Unavailable => Vec::new(),
            Some(ex) => ex.hours.clone(),
            None => employee
                .weekly_schedule
                .ranges_for(date.weekday())
                .to_vec(),
        }
    }

    /// Fetch the exceptions for a set of employees on one date, keyed by
    /// employee id. At most one exception exists per (employee, date).
    pub async fn exceptions_for_date(
        &self,
        tenant_id: Uuid,
        employee_ids: &[Uuid],
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<HashMap<Uuid, ScheduleException>, SchedulingError> {
        if employee_ids.is_empty() {
            return Ok(HashMap::new());
        }

        debug!(
            "Fetching schedule exceptions for {} employees on {}",
            employee_ids.len(),
            date
        );

        let id_list = employee_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/schedule_exceptions?tenant_id=eq.{}&date=eq.{}&employee_id=in.({})",
            tenant_id, date, id_list
        );

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let exceptions = result
            .into_iter()
            .map(serde_json::from_value::<ScheduleException>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                SchedulingError::Database(format!("failed to parse schedule exception: {}", e))
            })?;

        Ok(exceptions.into_iter().map(|ex| (ex.employee_id, ex)).collect())
    }
}
