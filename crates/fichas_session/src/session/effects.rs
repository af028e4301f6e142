//! What the reducer asks its driver to do.

use fichas_client::models::{
    ComplaintRequest, HistoryEntry, LookupOutcome, RegistrationOutcome, RegistrationRequest,
    RelayReply, RelayRequest, WithdrawRequest,
};
use fichas_client::{ApiResult, GestorApi};
use fichas_core::PhoneNumber;

/// Identifies one dispatched request. `epoch` changes on every reset, so an
/// answer to a request from a previous conversation never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub id: u64,
    pub epoch: u64,
}

/// One call to the workflow engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Lookup(PhoneNumber),
    Register(RegistrationRequest),
    Withdraw(WithdrawRequest),
    Complaint(ComplaintRequest),
    History(PhoneNumber),
    Relay(RelayRequest),
}

impl ApiCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lookup(_) => "lookup",
            Self::Register(_) => "register",
            Self::Withdraw(_) => "withdraw",
            Self::Complaint(_) => "complaint",
            Self::History(_) => "history",
            Self::Relay(_) => "relay",
        }
    }

    pub async fn execute(&self, api: &dyn GestorApi) -> ApiResult<ApiReply> {
        match self {
            Self::Lookup(phone) => api.lookup_user(phone).await.map(ApiReply::Lookup),
            Self::Register(request) => api.register_user(request).await.map(ApiReply::Registered),
            Self::Withdraw(request) => api.request_withdrawal(request).await.map(ApiReply::Withdrawn),
            Self::Complaint(request) => api.submit_complaint(request).await.map(ApiReply::ComplaintFiled),
            Self::History(phone) => api.fetch_history(phone).await.map(ApiReply::History),
            Self::Relay(request) => api.relay_message(request).await.map(ApiReply::Relayed),
        }
    }
}

/// Successful answer to an [`ApiCall`], same variant order.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply {
    Lookup(LookupOutcome),
    Registered(RegistrationOutcome),
    Withdrawn(String),
    ComplaintFiled(String),
    History(Vec<HistoryEntry>),
    Relayed(RelayReply),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub ticket: Ticket,
    pub call: ApiCall,
}

/// Outcome of a [`Request`], fed back into the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub ticket: Ticket,
    pub result: ApiResult<ApiReply>,
}

impl Response {
    pub fn ok(ticket: Ticket, reply: ApiReply) -> Self {
        Self {
            ticket,
            result: Ok(reply),
        }
    }

    pub fn err(ticket: Ticket, error: fichas_client::ApiError) -> Self {
        Self {
            ticket,
            result: Err(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send the request and feed its outcome back through `apply_response`.
    Dispatch(Request),
    /// (Re)start the inactivity countdown.
    ArmTimer,
    CancelTimer,
}

impl Effect {
    pub fn as_dispatch(&self) -> Option<&Request> {
        match self {
            Self::Dispatch(request) => Some(request),
            _ => None,
        }
    }
}
