// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Bookable day window: slots are enumerated between 06:00 and 23:00.
pub const OPEN_MINUTE: i32 = 6 * 60;
pub const CLOSE_MINUTE: i32 = 23 * 60;

// ==============================================================================
// INTERVALS AND WEEKLY SCHEDULES
// ==============================================================================

/// Half-open minutes-from-midnight interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_minute: i32,
    pub end_minute: i32,
}

impl TimeRange {
    pub fn new(start_minute: i32, end_minute: i32) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start_minute <= other.start_minute && other.end_minute <= self.end_minute
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start_minute < other.end_minute && other.start_minute < self.end_minute
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start_minute / 60,
            self.start_minute % 60,
            self.end_minute / 60,
            self.end_minute % 60
        )
    }
}

/// Recurring weekly working pattern, one entry per weekday. A missing or
/// empty entry means the employee does not work that day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default)]
    pub mon: Vec<TimeRange>,
    #[serde(default)]
    pub tue: Vec<TimeRange>,
    #[serde(default)]
    pub wed: Vec<TimeRange>,
    #[serde(default)]
    pub thu: Vec<TimeRange>,
    #[serde(default)]
    pub fri: Vec<TimeRange>,
    #[serde(default)]
    pub sat: Vec<TimeRange>,
    #[serde(default)]
    pub sun: Vec<TimeRange>,
}

impl WeeklySchedule {
    pub fn ranges_for(&self, weekday: Weekday) -> &[TimeRange] {
        match weekday {
            Weekday::Mon => &self.mon,
            Weekday::Tue => &self.tue,
            Weekday::Wed => &self.wed,
            Weekday::Thu => &self.thu,
            Weekday::Fri => &self.fri,
            Weekday::Sat => &self.sat,
            Weekday::Sun => &self.sun,
        }
    }
}

// ==============================================================================
// TENANT-SCOPED RECORDS
// ==============================================================================

fn default_total_sessions() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    #[serde(default = "default_total_sessions")]
    pub total_sessions: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub full_name: String,
    pub is_active: bool,
    #[serde(default)]
    pub service_ids: Vec<Uuid>,
    #[serde(default)]
    pub weekly_schedule: WeeklySchedule,
}

impl Employee {
    pub fn offers(&self, service_id: Uuid) -> bool {
        self.service_ids.contains(&service_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionKind {
    Unavailable,
    SpecialHours,
}

/// Day-specific override of an employee's weekly pattern, keyed by
/// (employee, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleException {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub kind: ExceptionKind,
    #[serde(default)]
    pub hours: Vec<TimeRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A booked visit. `duration_minutes` and `total_sessions` are value
/// snapshots taken from the service at booking time: later edits to the
/// service must not change the occupancy of historical appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub service_id: Uuid,
    pub employee_id: Uuid,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub start_minute: i32,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    #[serde(default = "default_total_sessions")]
    pub total_sessions: i32,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn interval(&self) -> TimeRange {
        TimeRange::new(self.start_minute, self.start_minute + self.duration_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    ScheduledLater,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::ScheduledLater => write!(f, "scheduled_later"),
        }
    }
}

/// One visit of a multi-visit package. Session 1 is actionable immediately;
/// the rest are placeholders scheduled later by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSession {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub appointment_id: Uuid,
    pub session_number: i32,
    pub status: SessionStatus,
}

/// Seed for a session row created alongside the appointment; serialized
/// into the booking RPC payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSeed {
    pub session_number: i32,
    pub status: SessionStatus,
}

// ==============================================================================
// ENRICHED READS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRef {
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRef {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRef {
    pub name: String,
}

/// Appointment plus the display names the caller needs, resolved by a single
/// embedded read (`select=*,employees(full_name),clients(...),services(name)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(rename = "employees")]
    pub employee: EmployeeRef,
    #[serde(rename = "clients")]
    pub client: ClientRef,
    #[serde(rename = "services")]
    pub service: ServiceRef,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// One bookable slot with every employee free to take it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotAvailability {
    pub start_minute: i32,
    pub employee_ids: Vec<Uuid>,
}

/// Either a specific employee or "any available", resolved at booking time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EmployeeSelector {
    #[serde(rename = "any")]
    Any,
    #[serde(untagged)]
    Id(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub service_id: Uuid,
    pub employee: EmployeeSelector,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub start_minute: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub tenant_id: Uuid,
    pub client_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("service not found")]
    ServiceNotFound,

    #[error("slot is no longer available")]
    SlotTaken,

    #[error("appointment not found")]
    AppointmentNotFound,

    #[error("database error: {0}")]
    Database(String),
}

// ==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_overlap_half_open() {
        let a = TimeRange::new(600, 630);
        assert!(a.overlaps(&TimeRange::new(615, 645)));
        assert!(a.overlaps(&TimeRange::new(570, 610)));
        // Touching endpoints do not overlap
        assert!(!a.overlaps(&TimeRange::new(630, 660)));
        assert!(!a.overlaps(&TimeRange::new(570, 600)));
    }

    #[test]
    fn range_containment_is_inclusive_of_bounds() {
        let working = TimeRange::new(540, 1020);
        assert!(working.contains(&TimeRange::new(540, 570)));
        assert!(working.contains(&TimeRange::new(990, 1020)));
        assert!(!working.contains(&TimeRange::new(1000, 1030)));
    }

    #[test]
    fn employee_selector_accepts_any_or_uuid() {
        let any: EmployeeSelector = serde_json::from_str("\"any\"").unwrap();
        assert_eq!(any, EmployeeSelector::Any);

        let id = Uuid::new_v4();
        let specific: EmployeeSelector =
            serde_json::from_str(&format!("\"{}\"", id)).unwrap();
        assert_eq!(specific, EmployeeSelector::Id(id));
    }

    #[test]
    fn weekly_schedule_defaults_to_not_working() {
        let schedule: WeeklySchedule = serde_json::from_str("{}").unwrap();
        assert!(schedule.ranges_for(Weekday::Mon).is_empty());
        assert!(schedule.ranges_for(Weekday::Sun).is_empty());
    }
}
