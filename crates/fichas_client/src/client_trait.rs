use async_trait::async_trait;
use fichas_core::PhoneNumber;

use crate::api::models::{
    AdminLogin, Complaint, ComplaintRequest, ComplaintStatus, Conversation, HistoryEntry,
    LookupOutcome, PendingUser, RecordId, RegistrationOutcome, RegistrationRequest, RelayReply,
    RelayRequest, WithdrawRequest,
};
use crate::error::ApiResult;

/// End-user endpoints of the workflow engine.
#[async_trait]
pub trait GestorApi: Send + Sync {
    async fn lookup_user(&self, telefono: &PhoneNumber) -> ApiResult<LookupOutcome>;

    async fn register_user(&self, request: &RegistrationRequest) -> ApiResult<RegistrationOutcome>;

    /// Returns the engine's reply text.
    async fn request_withdrawal(&self, request: &WithdrawRequest) -> ApiResult<String>;

    /// Returns the engine's reply text.
    async fn submit_complaint(&self, request: &ComplaintRequest) -> ApiResult<String>;

    async fn fetch_history(&self, telefono: &PhoneNumber) -> ApiResult<Vec<HistoryEntry>>;

    async fn relay_message(&self, request: &RelayRequest) -> ApiResult<RelayReply>;
}

/// Admin panel endpoints. Every call but `login` takes the bearer token.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn login(&self, user: &str, pass: &str) -> ApiResult<AdminLogin>;

    async fn list_conversations(&self, token: &str) -> ApiResult<Vec<Conversation>>;

    async fn chat_history(&self, token: &str, telefono: &str) -> ApiResult<Vec<HistoryEntry>>;

    async fn respond(&self, token: &str, telefono: &str, mensaje: &str) -> ApiResult<()>;

    async fn pending_users(&self, token: &str) -> ApiResult<Vec<PendingUser>>;

    async fn approve_user(&self, token: &str, user_id: &RecordId) -> ApiResult<()>;

    async fn reject_user(&self, token: &str, user_id: &RecordId) -> ApiResult<()>;

    async fn complaints(&self, token: &str) -> ApiResult<Vec<Complaint>>;

    async fn update_complaint(
        &self,
        token: &str,
        id: &RecordId,
        estado: ComplaintStatus,
    ) -> ApiResult<()>;
}

/// Everything the admin panel needs: its own endpoints plus the user lookup
/// used by the search screen.
pub trait AdminBackend: AdminApi + GestorApi {}

impl<T: AdminApi + GestorApi + ?Sized> AdminBackend for T {}
