// libs/scheduling-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    Employee, SchedulingError, Service, SlotAvailability, TimeRange, CLOSE_MINUTE, OPEN_MINUTE,
};
use crate::services::occupancy::OccupancyIndex;
use crate::services::schedule::ScheduleResolver;

/// Per-employee inputs to the slot scan: effective working intervals and
/// already-booked time for one date.
pub(crate) struct SlotCandidate {
    pub employee_id: Uuid,
    pub working: Vec<TimeRange>,
    pub busy: Vec<TimeRange>,
}

pub struct AvailabilityService {
    postgrest: Arc<PostgrestClient>,
    resolver: ScheduleResolver,
    occupancy: OccupancyIndex,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(PostgrestClient::new(config)))
    }

    pub(crate) fn with_client(postgrest: Arc<PostgrestClient>) -> Self {
        Self {
            resolver: ScheduleResolver::new(Arc::clone(&postgrest)),
            occupancy: OccupancyIndex::new(Arc::clone(&postgrest)),
            postgrest,
        }
    }

    /// Slot grid density. Services of an hour or more are offered on the
    /// hour; shorter services are offered more densely than their own
    /// duration to avoid awkward gaps.
    pub(crate) fn slot_step(duration_minutes: i32) -> i32 {
        if duration_minutes >= 60 {
            60
        } else if duration_minutes >= 45 {
            45
        } else if duration_minutes >= 30 {
            30
        } else {
            15
        }
    }

    /// Bookable slots for (tenant, branch, service, date), ascending by
    /// start time, each carrying every employee free to take it. An empty
    /// list is a valid outcome; only lookup failures are errors.
    pub async fn compute_slots(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<SlotAvailability>, SchedulingError> {
        let service = self.fetch_service(tenant_id, service_id, auth_token).await?;
        self.slots_for_service(&service, branch_id, date, auth_token)
            .await
    }

    /// Slot computation with the service row already in hand; the booking
    /// path uses this to avoid re-reading the service it needs anyway.
    pub(crate) async fn slots_for_service(
        &self,
        service: &Service,
        branch_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<SlotAvailability>, SchedulingError> {
        let employees = self
            .candidate_employees(service.tenant_id, branch_id, service.id, auth_token)
            .await?;
        if employees.is_empty() {
            debug!(
                "No active employees offer service {} at branch {}",
                service.id, branch_id
            );
            return Ok(Vec::new());
        }

        let employee_ids: Vec<Uuid> = employees.iter().map(|e| e.id).collect();

        let (exceptions, busy) = tokio::try_join!(
            self.resolver
                .exceptions_for_date(service.tenant_id, &employee_ids, date, auth_token),
            self.occupancy
                .busy_intervals(service.tenant_id, &employee_ids, date, auth_token),
        )?;

        let mut busy = busy;
        let candidates: Vec<SlotCandidate> = employees
            .iter()
            .map(|employee| SlotCandidate {
                employee_id: employee.id,
                working: ScheduleResolver::effective_intervals(
                    employee,
                    date,
                    exceptions.get(&employee.id),
                ),
                busy: busy.remove(&employee.id).unwrap_or_default(),
            })
            .collect();

        let slots = Self::scan_slots(service.duration_minutes, &candidates);
        debug!(
            "Computed {} bookable slots for service {} on {}",
            slots.len(),
            service.id,
            date
        );
        Ok(slots)
    }

    pub(crate) async fn fetch_service(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<Service, SchedulingError> {
        let path = format!(
            "/rest/v1/services?id=eq.{}&tenant_id=eq.{}",
            service_id, tenant_id
        );
        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let Some(row) = result.into_iter().next() else {
            return Err(SchedulingError::ServiceNotFound);
        };

        serde_json::from_value(row)
            .map_err(|e| SchedulingError::Database(format!("failed to parse service: {}", e)))
    }

    /// Active employees of the branch whose capability set includes the
    /// service.
    async fn candidate_employees(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Employee>, SchedulingError> {
        let capability = urlencoding::encode(&format!("{{{}}}", service_id)).into_owned();
        let path = format!(
            "/rest/v1/employees?tenant_id=eq.{}&branch_id=eq.{}&is_active=eq.true&service_ids=cs.{}",
            tenant_id, branch_id, capability
        );

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let employees = result
            .into_iter()
            .map(serde_json::from_value::<Employee>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SchedulingError::Database(format!("failed to parse employee: {}", e)))?;

        // The query already filters; re-check in case the store view drifts
        Ok(employees
            .into_iter()
            .filter(|e| e.is_active && e.offers(service_id))
            .collect())
    }

    /// Pure slot scan over the operating window. An employee is free for a
    /// slot iff the slot fits inside one working interval and overlaps no
    /// busy interval; only slots with at least one free employee are kept.
    pub(crate) fn scan_slots(
        duration_minutes: i32,
        candidates: &[SlotCandidate],
    ) -> Vec<SlotAvailability> {
        let step = Self::slot_step(duration_minutes);
        let mut slots = Vec::new();

        let mut start = OPEN_MINUTE;
        while start + duration_minutes <= CLOSE_MINUTE {
            let slot = TimeRange::new(start, start + duration_minutes);

            let free: Vec<Uuid> = candidates
                .iter()
                .filter(|c| Self::is_free(&c.working, &c.busy, &slot))
                .map(|c| c.employee_id)
                .collect();

            if !free.is_empty() {
                slots.push(SlotAvailability {
                    start_minute: start,
                    employee_ids: free,
                });
            }

            start += step;
        }

        slots
    }

    fn is_free(working: &[TimeRange], busy: &[TimeRange], slot: &TimeRange) -> bool {
        working.iter().any(|range| range.contains(slot))
            && !busy.iter().any(|range| range.overlaps(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(working: Vec<TimeRange>, busy: Vec<TimeRange>) -> SlotCandidate {
        SlotCandidate {
            employee_id: Uuid::new_v4(),
            working,
            busy,
        }
    }

    #[test]
    fn step_ladder_by_duration_bucket() {
        assert_eq!(AvailabilityService::slot_step(90), 60);
        assert_eq!(AvailabilityService::slot_step(60), 60);
        assert_eq!(AvailabilityService::slot_step(45), 45);
        assert_eq!(AvailabilityService::slot_step(40), 30);
        assert_eq!(AvailabilityService::slot_step(30), 30);
        assert_eq!(AvailabilityService::slot_step(20), 15);
        assert_eq!(AvailabilityService::slot_step(15), 15);
    }

    #[test]
    fn busy_interval_excludes_only_overlapping_slots() {
        // Mon 09:00-17:00, 30-minute service, existing booking 10:00-10:30.
        let candidates = vec![candidate(
            vec![TimeRange::new(540, 1020)],
            vec![TimeRange::new(600, 630)],
        )];

        let slots = AvailabilityService::scan_slots(30, &candidates);
        let starts: Vec<i32> = slots.iter().map(|s| s.start_minute).collect();

        assert!(starts.contains(&540)); // 09:00
        assert!(starts.contains(&570)); // 09:30
        assert!(!starts.contains(&600)); // 10:00 conflicts
        assert!(starts.contains(&630)); // 10:30
        assert!(starts.contains(&660)); // 11:00
    }

    #[test]
    fn slots_never_run_past_closing_time() {
        let candidates = vec![candidate(vec![TimeRange::new(OPEN_MINUTE, CLOSE_MINUTE)], vec![])];

        for duration in [15, 30, 45, 60, 90, 120] {
            let slots = AvailabilityService::scan_slots(duration, &candidates);
            assert!(!slots.is_empty());
            for slot in &slots {
                assert!(slot.start_minute + duration <= CLOSE_MINUTE);
            }
        }
    }

    #[test]
    fn slot_must_fit_inside_a_single_working_interval() {
        // Split shift with a lunch gap; a slot spanning the gap is not free.
        let candidates = vec![candidate(
            vec![TimeRange::new(540, 780), TimeRange::new(840, 1080)],
            vec![],
        )];

        let slots = AvailabilityService::scan_slots(60, &candidates);
        let starts: Vec<i32> = slots.iter().map(|s| s.start_minute).collect();

        assert!(starts.contains(&540)); // 09:00 fits the morning block
        assert!(starts.contains(&720)); // 12:00-13:00 ends exactly at the gap
        assert!(!starts.contains(&780)); // 13:00 falls in the gap
        assert!(starts.contains(&840)); // 14:00 fits the afternoon block
    }

    #[test]
    fn slot_lists_every_free_employee() {
        let first = candidate(vec![TimeRange::new(540, 720)], vec![]);
        let second = candidate(vec![TimeRange::new(540, 720)], vec![TimeRange::new(540, 570)]);
        let first_id = first.employee_id;
        let second_id = second.employee_id;

        let slots = AvailabilityService::scan_slots(30, &[first, second]);

        let at_open = slots.iter().find(|s| s.start_minute == 540).unwrap();
        assert_eq!(at_open.employee_ids, vec![first_id]);

        let later = slots.iter().find(|s| s.start_minute == 570).unwrap();
        assert_eq!(later.employee_ids, vec![first_id, second_id]);
    }

    #[test]
    fn no_candidates_means_no_slots() {
        assert!(AvailabilityService::scan_slots(30, &[]).is_empty());
    }
}
