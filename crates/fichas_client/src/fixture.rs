//! In-memory implementation of both service traits.
//!
//! Seeded with the same demo data the web screens used to simulate, it backs
//! the CLI's offline mode and serves as the test double for the session
//! layer. `fail_next` makes the next call fail, to exercise rollback paths.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use fichas_core::PhoneNumber;
use tokio::sync::Mutex;

use crate::api::models::{
    AdminLogin, AdminProfile, Complaint, ComplaintRequest, ComplaintStatus, ComplaintUser,
    Conversation, HistoryEntry, LookupOutcome, PendingUser, RecordId, RegistrationOutcome,
    RegistrationRequest, RelayReply, RelayRequest, WithdrawRequest, SELECT_PLATFORM_ACTION,
};
use crate::client_trait::{AdminApi, GestorApi};
use crate::error::{ApiError, ApiResult};

pub const SEEDED_PHONE: &str = "+5491123456789";
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "admin123";
const ADMIN_TOKEN: &str = "offline-admin-token";

#[derive(Debug, Clone)]
struct KnownUser {
    nombre: String,
}

#[derive(Debug, Default)]
struct FixtureState {
    users: HashMap<String, KnownUser>,
    histories: HashMap<String, Vec<HistoryEntry>>,
    conversations: Vec<Conversation>,
    pending_users: Vec<PendingUser>,
    complaints: Vec<Complaint>,
    withdrawals: Vec<WithdrawRequest>,
    next_id: i64,
    fail_next: Option<ApiError>,
    calls: Vec<&'static str>,
}

/// Seeded in-memory service double.
#[derive(Debug, Default)]
pub struct InMemoryGestor {
    state: Mutex<FixtureState>,
}

impl InMemoryGestor {
    /// Empty fixture: every phone is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixture with the demo users, conversations, pending users and
    /// complaints.
    pub fn seeded() -> Self {
        let mut state = FixtureState {
            next_id: 3,
            ..FixtureState::default()
        };
        state.users.insert(
            SEEDED_PHONE.to_string(),
            KnownUser {
                nombre: "Juan Pérez".to_string(),
            },
        );
        let now = Utc::now().to_rfc3339();
        state.histories.insert(
            SEEDED_PHONE.to_string(),
            vec![
                HistoryEntry {
                    rol: "user".to_string(),
                    contenido: "Hola, necesito ayuda con mi cuenta".to_string(),
                    created_at: Some(now.clone()),
                },
                HistoryEntry {
                    rol: "bot".to_string(),
                    contenido: "¡Hola! Te puedo ayudar con tu consulta. ¿Qué problema tienes?"
                        .to_string(),
                    created_at: Some(now.clone()),
                },
            ],
        );
        state.conversations = vec![
            Conversation {
                telefono: SEEDED_PHONE.to_string(),
                nombre: Some("Juan Pérez".to_string()),
            },
            Conversation {
                telefono: "987654321".to_string(),
                nombre: Some("María González".to_string()),
            },
        ];
        state.pending_users = vec![
            PendingUser {
                id: RecordId::Number(1),
                nombre: Some("Ana García".to_string()),
                phone: "123456789".to_string(),
                cuil: Some("27-12345678-0".to_string()),
                plataformas: Some("Zeus".to_string()),
            },
            PendingUser {
                id: RecordId::Number(2),
                nombre: Some("Pedro Martínez".to_string()),
                phone: "987654321".to_string(),
                cuil: Some("20-87654321-5".to_string()),
                plataformas: Some("Ganamos".to_string()),
            },
        ];
        state.complaints = vec![Complaint {
            id: RecordId::Number(1),
            mensaje: "Problema con el servicio de atención".to_string(),
            estado: ComplaintStatus::Pendiente,
            user: Some(ComplaintUser {
                nombre: Some("Luis Rodríguez".to_string()),
                telefono: Some("555123456".to_string()),
            }),
            created_at: Some(now),
        }];
        Self {
            state: Mutex::new(state),
        }
    }

    /// Make the next call, whatever it is, fail with `error`.
    pub async fn fail_next(&self, error: ApiError) {
        self.state.lock().await.fail_next = Some(error);
    }

    /// Names of the calls received so far, in order.
    pub async fn calls(&self) -> Vec<&'static str> {
        self.state.lock().await.calls.clone()
    }

    /// Withdrawals accepted so far.
    pub async fn withdrawals(&self) -> Vec<WithdrawRequest> {
        self.state.lock().await.withdrawals.clone()
    }

    /// Record a call and consume a scheduled failure.
    async fn enter(&self, name: &'static str) -> ApiResult<tokio::sync::MutexGuard<'_, FixtureState>> {
        let mut state = self.state.lock().await;
        state.calls.push(name);
        match state.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }

    fn check_token(token: &str) -> ApiResult<()> {
        if token == ADMIN_TOKEN {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: 401,
                body: "invalid token".to_string(),
            })
        }
    }

    fn push_history(state: &mut FixtureState, telefono: &str, rol: &str, contenido: String) {
        state
            .histories
            .entry(telefono.to_string())
            .or_default()
            .push(HistoryEntry {
                rol: rol.to_string(),
                contenido,
                created_at: Some(Utc::now().to_rfc3339()),
            });
    }
}

#[async_trait]
impl GestorApi for InMemoryGestor {
    async fn lookup_user(&self, telefono: &PhoneNumber) -> ApiResult<LookupOutcome> {
        let state = self.enter("lookup_user").await?;
        Ok(match state.users.get(telefono.as_str()) {
            Some(user) => LookupOutcome {
                found: true,
                reply: Some(format!("¡Hola {}! 👋", user.nombre)),
                options: Vec::new(),
                meta: Some(serde_json::json!({ "nombre": user.nombre })),
            },
            None => LookupOutcome {
                found: false,
                reply: Some("No encontramos una cuenta asociada a ese número.".to_string()),
                options: Vec::new(),
                meta: None,
            },
        })
    }

    async fn register_user(&self, request: &RegistrationRequest) -> ApiResult<RegistrationOutcome> {
        let mut state = self.enter("register_user").await?;
        let id = RecordId::Number(state.next_id);
        state.next_id += 1;
        state.users.insert(
            request.telefono.clone(),
            KnownUser {
                nombre: request.nombre.clone(),
            },
        );
        state.pending_users.push(PendingUser {
            id,
            nombre: Some(request.nombre.clone()),
            phone: request.telefono.clone(),
            cuil: Some(request.cuil.clone()),
            plataformas: Some(request.plataforma.clone()),
        });
        Ok(RegistrationOutcome {
            reply: Some(format!(
                "¡Listo {}! Tu cuenta quedó registrada y será aprobada a la brevedad.",
                request.nombre
            )),
        })
    }

    async fn request_withdrawal(&self, request: &WithdrawRequest) -> ApiResult<String> {
        let mut state = self.enter("request_withdrawal").await?;
        state.withdrawals.push(request.clone());
        Ok(format!(
            "Recibimos tu solicitud de retiro de ${} en {}.",
            request.monto, request.plataforma
        ))
    }

    async fn submit_complaint(&self, request: &ComplaintRequest) -> ApiResult<String> {
        let mut state = self.enter("submit_complaint").await?;
        let id = RecordId::Number(state.next_id);
        state.next_id += 1;
        let nombre = state.users.get(&request.telefono).map(|u| u.nombre.clone());
        state.complaints.push(Complaint {
            id: id.clone(),
            mensaje: request.mensaje.clone(),
            estado: ComplaintStatus::Pendiente,
            user: Some(ComplaintUser {
                nombre,
                telefono: Some(request.telefono.clone()),
            }),
            created_at: Some(Utc::now().to_rfc3339()),
        });
        Ok(format!("Registramos tu reclamo #{}. Te contactaremos pronto.", id))
    }

    async fn fetch_history(&self, telefono: &PhoneNumber) -> ApiResult<Vec<HistoryEntry>> {
        let state = self.enter("fetch_history").await?;
        Ok(state
            .histories
            .get(telefono.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn relay_message(&self, request: &RelayRequest) -> ApiResult<RelayReply> {
        let mut state = self.enter("relay_message").await?;
        Self::push_history(&mut state, &request.telefono, "user", request.mensaje.clone());
        if request.plataforma.is_none() && request.mensaje.to_lowercase().contains("plataforma") {
            return Ok(RelayReply {
                reply: Some("¿En qué plataforma jugás?".to_string()),
                rol: Some("bot".to_string()),
                options: vec!["Zeus".to_string(), "Ganamos".to_string()],
                action: Some(SELECT_PLATFORM_ACTION.to_string()),
            });
        }
        let reply = format!("Recibimos tu mensaje: {}", request.mensaje);
        Self::push_history(&mut state, &request.telefono, "bot", reply.clone());
        Ok(RelayReply {
            reply: Some(reply),
            rol: Some("bot".to_string()),
            options: Vec::new(),
            action: None,
        })
    }
}

#[async_trait]
impl AdminApi for InMemoryGestor {
    async fn login(&self, user: &str, pass: &str) -> ApiResult<AdminLogin> {
        let _state = self.enter("login").await?;
        if user == ADMIN_USER && pass == ADMIN_PASS {
            Ok(AdminLogin {
                token: ADMIN_TOKEN.to_string(),
                admin: AdminProfile {
                    user: user.to_string(),
                    nombre: Some("Administrador".to_string()),
                },
            })
        } else {
            Err(ApiError::Rejected(
                "Usuario o contraseña incorrectos".to_string(),
            ))
        }
    }

    async fn list_conversations(&self, token: &str) -> ApiResult<Vec<Conversation>> {
        let state = self.enter("list_conversations").await?;
        Self::check_token(token)?;
        Ok(state.conversations.clone())
    }

    async fn chat_history(&self, _token: &str, telefono: &str) -> ApiResult<Vec<HistoryEntry>> {
        let state = self.enter("chat_history").await?;
        Ok(state.histories.get(telefono).cloned().unwrap_or_default())
    }

    async fn respond(&self, token: &str, telefono: &str, mensaje: &str) -> ApiResult<()> {
        let mut state = self.enter("respond").await?;
        Self::check_token(token)?;
        Self::push_history(&mut state, telefono, "admin", mensaje.to_string());
        Ok(())
    }

    async fn pending_users(&self, token: &str) -> ApiResult<Vec<PendingUser>> {
        let state = self.enter("pending_users").await?;
        Self::check_token(token)?;
        Ok(state.pending_users.clone())
    }

    async fn approve_user(&self, token: &str, user_id: &RecordId) -> ApiResult<()> {
        let mut state = self.enter("approve_user").await?;
        Self::check_token(token)?;
        let before = state.pending_users.len();
        state.pending_users.retain(|u| &u.id != user_id);
        if state.pending_users.len() == before {
            return Err(ApiError::Rejected(format!("Usuario {} no encontrado", user_id)));
        }
        Ok(())
    }

    async fn reject_user(&self, token: &str, user_id: &RecordId) -> ApiResult<()> {
        let mut state = self.enter("reject_user").await?;
        Self::check_token(token)?;
        let Some(pos) = state.pending_users.iter().position(|u| &u.id == user_id) else {
            return Err(ApiError::Rejected(format!("Usuario {} no encontrado", user_id)));
        };
        let rejected = state.pending_users.remove(pos);
        state.users.remove(&rejected.phone);
        Ok(())
    }

    async fn complaints(&self, token: &str) -> ApiResult<Vec<Complaint>> {
        let state = self.enter("complaints").await?;
        Self::check_token(token)?;
        Ok(state.complaints.clone())
    }

    async fn update_complaint(
        &self,
        token: &str,
        id: &RecordId,
        estado: ComplaintStatus,
    ) -> ApiResult<()> {
        let mut state = self.enter("update_complaint").await?;
        Self::check_token(token)?;
        match state.complaints.iter_mut().find(|c| &c.id == id) {
            Some(complaint) => {
                complaint.estado = estado;
                Ok(())
            }
            None => Err(ApiError::Rejected(format!("Reclamo {} no encontrado", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone(s: &str) -> PhoneNumber {
        PhoneNumber::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_seeded_lookup() {
        let api = InMemoryGestor::seeded();
        let found = api.lookup_user(&phone(SEEDED_PHONE)).await.unwrap();
        assert!(found.found);
        assert_eq!(found.user_name(), Some("Juan Pérez"));

        let missing = api.lookup_user(&phone("+5490000000000")).await.unwrap();
        assert!(!missing.found);
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let api = InMemoryGestor::seeded();
        api.fail_next(ApiError::Transport("down".into())).await;
        assert!(api.lookup_user(&phone(SEEDED_PHONE)).await.is_err());
        assert!(api.lookup_user(&phone(SEEDED_PHONE)).await.is_ok());
        assert_eq!(api.calls().await, vec!["lookup_user", "lookup_user"]);
    }

    #[tokio::test]
    async fn test_registration_creates_pending_user() {
        let api = InMemoryGestor::seeded();
        api.register_user(&RegistrationRequest {
            nombre: "Ana".into(),
            cuil: "27123456780".into(),
            plataforma: "Zeus".into(),
            telefono: "+5490000000000".into(),
        })
        .await
        .unwrap();

        assert!(api.lookup_user(&phone("+5490000000000")).await.unwrap().found);
        let login = api.login(ADMIN_USER, ADMIN_PASS).await.unwrap();
        let pending = api.pending_users(&login.token).await.unwrap();
        assert_eq!(pending.len(), 3);
    }

    #[tokio::test]
    async fn test_admin_requires_token() {
        let api = InMemoryGestor::seeded();
        let err = api.pending_users("wrong").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 401, .. }));
        assert!(matches!(
            api.login(ADMIN_USER, "bad").await,
            Err(ApiError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_relay_platform_selection() {
        let api = InMemoryGestor::seeded();
        let reply = api
            .relay_message(&RelayRequest {
                telefono: SEEDED_PHONE.into(),
                mensaje: "quiero elegir plataforma".into(),
                plataforma: None,
            })
            .await
            .unwrap();
        assert!(reply.selects_platform());
        assert_eq!(reply.options, vec!["Zeus", "Ganamos"]);
    }
}
