//! Wire types for the workflow engine and the admin backend.
//!
//! Field names follow the services (Spanish, camelCase where they use it).
//! Raw response structs are private to the client; the public types are the
//! normalized outcomes the session layer consumes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========== End-user requests ==========

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LookupRequest {
    pub telefono: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationRequest {
    pub nombre: String,
    pub cuil: String,
    pub plataforma: String,
    pub telefono: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WithdrawRequest {
    pub telefono: String,
    pub monto: f64,
    pub plataforma: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplaintRequest {
    pub telefono: String,
    pub mensaje: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayRequest {
    pub telefono: String,
    pub mensaje: String,
    /// Sent as `null` until a platform has been chosen
    pub plataforma: Option<String>,
}

// ========== End-user outcomes ==========

/// Normalized lookup result.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOutcome {
    pub found: bool,
    pub reply: Option<String>,
    pub options: Vec<String>,
    pub meta: Option<Value>,
}

impl LookupOutcome {
    /// Display name from `meta.nombre`, when the engine sends one.
    pub fn user_name(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.get("nombre"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawLookupResponse {
    pub status: String,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub meta: Option<Value>,
}

/// Result of interpreting the lookup `status` field.
pub(crate) fn lookup_status_found(status: &str) -> Option<bool> {
    match status.trim().to_ascii_lowercase().as_str() {
        "found" | "registered" | "ok" | "existing" => Some(true),
        "not_found" | "new" | "unregistered" | "missing" => Some(false),
        _ => None,
    }
}

/// Normalized registration result.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationOutcome {
    pub reply: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRegistrationResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
}

pub(crate) fn registration_status_failed(status: Option<&str>) -> bool {
    matches!(
        status.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("error") | Some("failed")
    )
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawReplyResponse {
    pub reply: String,
}

/// One entry of a conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    #[serde(default = "default_role")]
    pub rol: String,
    #[serde(alias = "mensaje", alias = "content")]
    pub contenido: String,
    #[serde(rename = "createdAt", alias = "created_at", default)]
    pub created_at: Option<String>,
}

fn default_role() -> String {
    "bot".to_string()
}

/// Normalized relay reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelayReply {
    pub reply: Option<String>,
    pub rol: Option<String>,
    pub options: Vec<String>,
    pub action: Option<String>,
}

impl RelayReply {
    /// The relay asks the user to pick a platform among `options`.
    pub fn selects_platform(&self) -> bool {
        self.action.as_deref() == Some(SELECT_PLATFORM_ACTION)
    }
}

pub const SELECT_PLATFORM_ACTION: &str = "select_platform";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRelayResponse {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub rol: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub action: Option<String>,
}

// ========== Admin ==========

/// Identifier of a pending user or complaint; the backend sends numbers or
/// strings depending on the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl RecordId {
    /// Parses numeric ids as numbers so the backend sees the type it sent.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        trimmed
            .parse::<i64>()
            .map(Self::Number)
            .unwrap_or_else(|_| Self::Text(trimmed.to_string()))
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AdminLoginRequest<'a> {
    pub user: &'a str,
    pub pass: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminProfile {
    pub user: String,
    #[serde(default)]
    pub nombre: Option<String>,
}

/// Successful admin login.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminLogin {
    pub token: String,
    pub admin: AdminProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAdminLoginResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub admin: Option<AdminProfile>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawOkResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub telefono: String,
    #[serde(default)]
    pub nombre: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PhoneRequest<'a> {
    pub telefono: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AdminRespondRequest<'a> {
    pub telefono: &'a str,
    pub mensaje: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UserIdRequest<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a RecordId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingUser {
    pub id: RecordId,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(alias = "telefono")]
    pub phone: String,
    #[serde(default)]
    pub cuil: Option<String>,
    #[serde(default)]
    pub plataformas: Option<String>,
}

/// Complaint triage status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintStatus {
    Pendiente,
    Atendido,
    Rechazado,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Atendido => "atendido",
            Self::Rechazado => "rechazado",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "pendiente" => Some(Self::Pendiente),
            "atendido" => Some(Self::Atendido),
            "rechazado" => Some(Self::Rechazado),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplaintUser {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Complaint {
    pub id: RecordId,
    pub mensaje: String,
    pub estado: ComplaintStatus,
    #[serde(default)]
    pub user: Option<ComplaintUser>,
    #[serde(rename = "createdAt", alias = "created_at", default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ComplaintUpdateRequest<'a> {
    pub id: &'a RecordId,
    pub estado: ComplaintStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_status_mapping() {
        assert_eq!(lookup_status_found("FOUND"), Some(true));
        assert_eq!(lookup_status_found("not_found"), Some(false));
        assert_eq!(lookup_status_found("maybe"), None);
    }

    #[test]
    fn test_registration_status_failed() {
        assert!(registration_status_failed(Some("error")));
        assert!(registration_status_failed(Some(" Failed ")));
        assert!(!registration_status_failed(Some("ok")));
        assert!(!registration_status_failed(None));
    }

    #[test]
    fn test_history_entry_aliases() {
        let entry: HistoryEntry =
            serde_json::from_value(json!({"rol": "user", "mensaje": "hola"})).unwrap();
        assert_eq!(entry.contenido, "hola");
        assert_eq!(entry.created_at, None);

        let entry: HistoryEntry = serde_json::from_value(
            json!({"contenido": "chau", "createdAt": "2024-01-01T00:00:00Z"}),
        )
        .unwrap();
        assert_eq!(entry.rol, "bot");
        assert_eq!(entry.created_at.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_record_id() {
        assert_eq!(RecordId::parse("12"), RecordId::Number(12));
        assert_eq!(RecordId::parse("abc"), RecordId::Text("abc".into()));
        let json = serde_json::to_value(UserIdRequest {
            user_id: &RecordId::Number(7),
        })
        .unwrap();
        assert_eq!(json, json!({"userId": 7}));
    }

    #[test]
    fn test_pending_user_phone_alias() {
        let user: PendingUser =
            serde_json::from_value(json!({"id": "u1", "telefono": "123456789"})).unwrap();
        assert_eq!(user.phone, "123456789");
        assert_eq!(user.id, RecordId::Text("u1".into()));
    }

    #[test]
    fn test_complaint_status() {
        assert_eq!(ComplaintStatus::parse("Atendido"), Some(ComplaintStatus::Atendido));
        assert_eq!(ComplaintStatus::parse("x"), None);
        let json = serde_json::to_value(ComplaintStatus::Rechazado).unwrap();
        assert_eq!(json, json!("rechazado"));
    }

    #[test]
    fn test_lookup_user_name() {
        let outcome = LookupOutcome {
            found: true,
            reply: None,
            options: vec![],
            meta: Some(json!({"nombre": "Juan"})),
        };
        assert_eq!(outcome.user_name(), Some("Juan"));
    }
}
