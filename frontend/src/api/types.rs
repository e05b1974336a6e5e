use leptos::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl User {
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Role carried in the sign-up or invitation metadata, before a profile row exists.
    pub fn provisional_role(&self) -> Option<Role> {
        self.metadata_str("role").map(Role::from)
    }

    pub fn invited_by(&self) -> Option<&str> {
        self.metadata_str("invited_by")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: String,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Token responses only carry `expires_in`; pin it to an absolute time on receipt.
    pub fn anchored_at(mut self, now: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now + secs);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    pub fn new(event: AuthEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }

    pub fn signed_in(session: Session) -> Self {
        Self::new(AuthEvent::SignedIn, Some(session))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthEvent::SignedOut, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Tutor,
    Veterinario,
    Unknown(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Tutor => "tutor",
            Role::Veterinario => "veterinario",
            Role::Unknown(raw) => raw.as_str(),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "tutor" => Role::Tutor,
            "veterinario" | "vet" => Role::Veterinario,
            _ => Role::Unknown(value.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

fn default_setup_complete() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(default = "default_setup_complete", alias = "password_set")]
    pub setup_complete: bool,
}

impl Profile {
    /// Identity the profile belongs to. Older schemas key profiles by the auth user id directly.
    pub fn owner_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.id)
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpData {
    pub full_name: String,
    pub role: Role,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SignUpData {
    pub fn new(full_name: impl Into<String>, role: Role) -> Self {
        Self {
            full_name: full_name.into(),
            role,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignUpOutcome {
    pub user: Option<User>,
    pub session: Option<Session>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorRef {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PetRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tutor: Option<TutorRef>,
}

impl PetRef {
    pub fn pet_name(pet: &Option<PetRef>) -> String {
        pet.as_ref()
            .and_then(|p| p.name.clone())
            .unwrap_or_default()
    }

    pub fn tutor_name(pet: &Option<PetRef>) -> Option<String> {
        pet.as_ref()
            .and_then(|p| p.tutor.as_ref())
            .and_then(|t| t.full_name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationRow {
    pub id: String,
    #[serde(default)]
    pub pet_id: Option<String>,
    pub vaccine_name: String,
    #[serde(default)]
    pub application_date: Option<String>,
    #[serde(default)]
    pub next_dose_date: Option<String>,
    #[serde(default)]
    pub pets: Option<PetRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConsultationStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    Other(String),
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ConsultationStatus::Scheduled => "agendada",
            ConsultationStatus::Completed => "realizada",
            ConsultationStatus::Cancelled => "cancelada",
            ConsultationStatus::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for ConsultationStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "agendada" | "scheduled" => ConsultationStatus::Scheduled,
            "realizada" | "completed" => ConsultationStatus::Completed,
            "cancelada" | "cancelled" | "canceled" => ConsultationStatus::Cancelled,
            _ => ConsultationStatus::Other(value),
        }
    }
}

impl From<ConsultationStatus> for String {
    fn from(status: ConsultationStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRow {
    pub id: String,
    #[serde(default)]
    pub pet_id: Option<String>,
    pub consultation_date: String,
    #[serde(default)]
    pub consultation_type: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub veterinarian: Option<String>,
    #[serde(default)]
    pub status: ConsultationStatus,
    #[serde(default)]
    pub pets: Option<PetRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationRow {
    pub id: String,
    #[serde(default)]
    pub pet_id: Option<String>,
    pub medication_name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    pub start_date: String,
    #[serde(default)]
    pub pets: Option<PetRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRecordRow {
    pub id: String,
    #[serde(default)]
    pub pet_id: Option<String>,
    pub weight: f64,
    pub record_date: String,
    #[serde(default)]
    pub pets: Option<PetRef>,
}

/// Error body returned by the auth and REST endpoints, normalised to one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ApiError {}

impl From<ApiError> for String {
    fn from(error: ApiError) -> Self {
        error.error
    }
}

impl IntoView for ApiError {
    fn into_view(self) -> View {
        self.error.into_view()
    }
}

/// PostgREST code for "the result contains 0 rows" on single-row requests.
pub const NO_ROWS_CODE: &str = "PGRST116";

impl ApiError {
    pub fn new(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", msg)
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::new("UNKNOWN", msg)
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::new("REQUEST_FAILED", msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new("TIMEOUT", msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", msg)
    }

    pub fn is_no_rows(&self) -> bool {
        self.code == NO_ROWS_CODE
    }

    /// Builds an error from whatever JSON the backend sent; auth and REST use different keys.
    pub fn from_body(status: u16, body: &Value) -> Self {
        let text = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .filter(|s| !s.is_empty())
        };
        let error = text("error_description")
            .or_else(|| text("msg"))
            .or_else(|| text("message"))
            .or_else(|| text("error"))
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        let code = text("code")
            .or_else(|| body.get("code").and_then(Value::as_i64).map(|c| c.to_string()))
            .or_else(|| text("error_code"))
            .or_else(|| text("error"))
            .unwrap_or_else(|| status.to_string());
        let details = body.get("details").filter(|d| !d.is_null()).cloned();
        Self {
            error,
            code,
            details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    Rejected(ApiError),
    #[error("{0}")]
    Request(ApiError),
}

impl AuthError {
    pub fn from_status(status: u16, error: ApiError) -> Self {
        match status {
            400 | 401 if error.code == "invalid_grant" || error.code == "invalid_credentials" => {
                AuthError::InvalidCredentials(error.error)
            }
            400..=499 => AuthError::Rejected(error),
            _ => AuthError::Request(error),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(error: ApiError) -> Self {
        AuthError::Request(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_accepts_vet_alias_and_keeps_unknown_values() {
        let tutor: Role = serde_json::from_value(json!("tutor")).unwrap();
        let vet: Role = serde_json::from_value(json!("vet")).unwrap();
        let full: Role = serde_json::from_value(json!("veterinario")).unwrap();
        let other: Role = serde_json::from_value(json!("admin")).unwrap();
        assert_eq!(tutor, Role::Tutor);
        assert_eq!(vet, Role::Veterinario);
        assert_eq!(full, Role::Veterinario);
        assert_eq!(other, Role::Unknown("admin".into()));
        assert_eq!(serde_json::to_value(Role::Veterinario).unwrap(), json!("veterinario"));
    }

    #[test]
    fn profile_defaults_setup_flag_and_reads_password_set_alias() {
        let plain: Profile = serde_json::from_value(json!({
            "id": "p1",
            "full_name": "Ana",
            "role": "tutor"
        }))
        .unwrap();
        assert!(plain.setup_complete);
        assert_eq!(plain.owner_id(), "p1");

        let invited: Profile = serde_json::from_value(json!({
            "id": "p2",
            "user_id": "u2",
            "role": "vet",
            "password_set": false
        }))
        .unwrap();
        assert!(!invited.setup_complete);
        assert_eq!(invited.owner_id(), "u2");
    }

    #[test]
    fn session_anchors_relative_expiry() {
        let session: Session = serde_json::from_value(json!({
            "access_token": "at",
            "expires_in": 3600,
            "refresh_token": "rt",
            "user": { "id": "u1" }
        }))
        .unwrap();
        let anchored = session.anchored_at(1_000);
        assert_eq!(anchored.expires_at, Some(4_600));
        assert!(!anchored.is_expired_at(4_599));
        assert!(anchored.is_expired_at(4_600));
    }

    #[test]
    fn user_metadata_drives_provisional_role() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "email": "vet@example.com",
            "user_metadata": { "role": "veterinario", "invited_by": "u0", "full_name": " " }
        }))
        .unwrap();
        assert_eq!(user.provisional_role(), Some(Role::Veterinario));
        assert_eq!(user.invited_by(), Some("u0"));
        assert_eq!(user.metadata_str("full_name"), None);
    }

    #[test]
    fn consultation_status_maps_portuguese_and_english_labels() {
        let row: ConsultationRow = serde_json::from_value(json!({
            "id": "c1",
            "consultation_date": "2025-01-02",
            "status": "cancelled"
        }))
        .unwrap();
        assert_eq!(row.status, ConsultationStatus::Cancelled);

        let missing: ConsultationRow = serde_json::from_value(json!({
            "id": "c2",
            "consultation_date": "2025-01-02"
        }))
        .unwrap();
        assert_eq!(missing.status, ConsultationStatus::Scheduled);
    }

    #[test]
    fn api_error_reads_auth_and_rest_error_shapes() {
        let auth = ApiError::from_body(
            400,
            &json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
        );
        assert_eq!(auth.error, "Invalid login credentials");
        assert_eq!(auth.code, "invalid_grant");

        let rest = ApiError::from_body(
            406,
            &json!({ "code": "PGRST116", "message": "JSON object requested, multiple (or no) rows returned", "details": null }),
        );
        assert!(rest.is_no_rows());
        assert!(rest.details.is_none());

        let empty = ApiError::from_body(502, &json!({}));
        assert_eq!(empty.code, "502");
    }

    #[test]
    fn auth_error_classifies_bad_credentials() {
        let err = AuthError::from_status(
            400,
            ApiError::new("invalid_grant", "Invalid login credentials"),
        );
        assert_eq!(err, AuthError::InvalidCredentials("Invalid login credentials".into()));
        assert!(matches!(
            AuthError::from_status(422, ApiError::validation("weak password")),
            AuthError::Rejected(_)
        ));
        assert!(matches!(
            AuthError::from_status(500, ApiError::unknown("boom")),
            AuthError::Request(_)
        ));
        assert_eq!(err.to_string(), "Invalid login credentials");
    }
}
