use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Point the store at a wiremock server.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            supabase_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            notify_email_webhook_url: String::new(),
            whatsapp_api_url: String::new(),
            whatsapp_api_token: String::new(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "client".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "staff")
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, "client")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({ "alg": "HS256", "typ": "JWT" });
        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }
}

/// Canned PostgREST row payloads for wiremock-backed tests.
pub struct MockPostgrestRows;

impl MockPostgrestRows {
    pub fn service_row(
        id: Uuid,
        tenant_id: Uuid,
        name: &str,
        duration_minutes: i32,
        total_sessions: i32,
    ) -> Value {
        json!({
            "id": id,
            "tenant_id": tenant_id,
            "name": name,
            "duration_minutes": duration_minutes,
            "total_sessions": total_sessions
        })
    }

    /// Employee working the same ranges Monday through Friday.
    pub fn employee_row_weekdays(
        id: Uuid,
        tenant_id: Uuid,
        branch_id: Uuid,
        full_name: &str,
        service_ids: &[Uuid],
        ranges: &[(i32, i32)],
    ) -> Value {
        let day: Vec<Value> = ranges
            .iter()
            .map(|(start, end)| json!({ "start_minute": start, "end_minute": end }))
            .collect();
        json!({
            "id": id,
            "tenant_id": tenant_id,
            "branch_id": branch_id,
            "full_name": full_name,
            "is_active": true,
            "service_ids": service_ids,
            "weekly_schedule": {
                "mon": day, "tue": day, "wed": day, "thu": day, "fri": day
            }
        })
    }

    pub fn unavailable_exception_row(
        tenant_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "tenant_id": tenant_id,
            "employee_id": employee_id,
            "date": date,
            "kind": "unavailable",
            "hours": []
        })
    }

    pub fn special_hours_exception_row(
        tenant_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
        ranges: &[(i32, i32)],
    ) -> Value {
        let hours: Vec<Value> = ranges
            .iter()
            .map(|(start, end)| json!({ "start_minute": start, "end_minute": end }))
            .collect();
        json!({
            "id": Uuid::new_v4(),
            "tenant_id": tenant_id,
            "employee_id": employee_id,
            "date": date,
            "kind": "special_hours",
            "hours": hours
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn appointment_row(
        id: Uuid,
        tenant_id: Uuid,
        branch_id: Uuid,
        service_id: Uuid,
        employee_id: Uuid,
        client_id: Uuid,
        date: NaiveDate,
        start_minute: i32,
        duration_minutes: i32,
        total_sessions: i32,
        status: &str,
    ) -> Value {
        let starts_at = date
            .and_hms_opt((start_minute / 60) as u32, (start_minute % 60) as u32, 0)
            .expect("valid start minute")
            .and_utc();
        let now = Utc::now();
        json!({
            "id": id,
            "tenant_id": tenant_id,
            "branch_id": branch_id,
            "service_id": service_id,
            "employee_id": employee_id,
            "client_id": client_id,
            "date": date,
            "start_minute": start_minute,
            "starts_at": starts_at.to_rfc3339(),
            "duration_minutes": duration_minutes,
            "total_sessions": total_sessions,
            "status": status,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        })
    }

    /// Appointment row with the embedded display names the enriched read
    /// selects (`employees(full_name),clients(...),services(name)`).
    pub fn enriched_appointment_row(
        appointment: Value,
        employee_name: &str,
        client_name: &str,
        service_name: &str,
    ) -> Value {
        let mut row = appointment;
        row["employees"] = json!({ "full_name": employee_name });
        row["clients"] = json!({
            "full_name": client_name,
            "email": "client@example.com",
            "phone": "+35799123456"
        });
        row["services"] = json!({ "name": service_name });
        row
    }

    pub fn session_rows(tenant_id: Uuid, appointment_id: Uuid, total: i32) -> Vec<Value> {
        (1..=total)
            .map(|n| {
                json!({
                    "id": Uuid::new_v4(),
                    "tenant_id": tenant_id,
                    "appointment_id": appointment_id,
                    "session_number": n,
                    "status": if n == 1 { "pending" } else { "scheduled_later" }
                })
            })
            .collect()
    }
}
