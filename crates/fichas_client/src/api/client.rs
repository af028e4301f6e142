use std::time::Duration;

use async_trait::async_trait;
use fichas_core::{Config, PhoneNumber};
use log::{info, warn};
use reqwest::{Client, Method, Proxy, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Serialize;
use serde_json::Value;

use crate::api::models::{
    lookup_status_found, registration_status_failed, AdminLogin, AdminLoginRequest,
    AdminRespondRequest, Complaint, ComplaintRequest, ComplaintStatus, ComplaintUpdateRequest,
    Conversation, HistoryEntry, LookupOutcome, LookupRequest, PendingUser, PhoneRequest,
    RawAdminLoginResponse, RawLookupResponse, RawOkResponse, RawRegistrationResponse,
    RawRelayResponse, RawReplyResponse, RecordId, RegistrationOutcome, RegistrationRequest,
    RelayReply, RelayRequest, UserIdRequest, WithdrawRequest,
};
use crate::client_trait::{AdminApi, GestorApi};
use crate::error::{ApiError, ApiResult};
use crate::utils::http_utils::{decode, execute_request, extract_list, read_json};

const HISTORY_KEYS: &[&str] = &["history", "historial", "entries"];

/// Which service an endpoint lives on.
#[derive(Debug, Clone, Copy)]
enum Service {
    WorkflowEngine,
    Backend,
}

/// Networked client for both services.
///
/// POSTs go through `client` and are sent exactly once; GETs go through
/// `retry_client`, which retries transient failures with exponential backoff.
#[derive(Debug, Clone)]
pub struct GestorClient {
    client: ClientWithMiddleware,
    retry_client: ClientWithMiddleware,
    n8n_base: Option<Url>,
    backend_base: Option<Url>,
}

impl GestorClient {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let client = Self::build_http_client(config)?;
        let retry_client = Self::build_retry_client(client.clone(), config.max_retries);

        Ok(GestorClient {
            client: ClientBuilder::new(client).build(),
            retry_client,
            n8n_base: Self::parse_base(config.n8n_base_url.as_deref(), "N8N_BASE_URL")?,
            backend_base: Self::parse_base(config.backend_base_url.as_deref(), "BACKEND_BASE_URL")?,
        })
    }

    fn build_http_client(config: &Config) -> ApiResult<Client> {
        let mut builder = Client::builder().timeout(config.request_timeout());
        // Proxies come only from Config, which already read the environment.
        if config.http_proxy.is_empty() && config.https_proxy.is_empty() {
            builder = builder.no_proxy();
        }
        if !config.http_proxy.is_empty() {
            let proxy = Proxy::http(&config.http_proxy)
                .map_err(|e| ApiError::Transport(format!("Invalid HTTP proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        if !config.https_proxy.is_empty() {
            let proxy = Proxy::https(&config.https_proxy)
                .map_err(|e| ApiError::Transport(format!("Invalid HTTPS proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {e}")))
    }

    fn build_retry_client(client: Client, max_retries: u32) -> ClientWithMiddleware {
        // Exponential backoff starting at 200ms, capped at 5s
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(200), Duration::from_secs(5))
            .build_with_max_retries(max_retries);

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }

    /// A missing base URL is allowed here; calls to that service then fail
    /// with `NotConfigured`.
    fn parse_base(raw: Option<&str>, name: &'static str) -> ApiResult<Option<Url>> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            warn!("{} is not set", name);
            return Ok(None);
        };
        // Url::join drops the last path segment unless the base ends in '/'.
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        Url::parse(&normalized)
            .map(Some)
            .map_err(|e| ApiError::Transport(format!("Invalid {name} {raw:?}: {e}")))
    }

    fn url(&self, service: Service, path: &str) -> ApiResult<Url> {
        let (base, name) = match service {
            Service::WorkflowEngine => (&self.n8n_base, "N8N_BASE_URL"),
            Service::Backend => (&self.backend_base, "BACKEND_BASE_URL"),
        };
        let base = base.as_ref().ok_or(ApiError::NotConfigured(name))?;
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Transport(format!("Invalid path {path}: {e}")))
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        service: Service,
        path: &str,
        token: Option<&str>,
        body: &T,
    ) -> ApiResult<Value> {
        let url = self.url(service, path)?;
        let response = execute_request(&self.client, Method::POST, url, token, Some(body)).await?;
        read_json(response).await
    }

    async fn get_json(&self, url: Url, token: Option<&str>) -> ApiResult<Value> {
        let response =
            execute_request::<()>(&self.retry_client, Method::GET, url, token, None).await?;
        read_json(response).await
    }

    /// Admin mutations answer `{ok, error}`.
    fn expect_ok(value: Value, what: &str) -> ApiResult<()> {
        let raw: RawOkResponse = decode(value, what)?;
        if raw.ok {
            Ok(())
        } else {
            Err(ApiError::Rejected(
                raw.error.unwrap_or_else(|| format!("{what} was not accepted")),
            ))
        }
    }
}

#[async_trait]
impl GestorApi for GestorClient {
    async fn lookup_user(&self, telefono: &PhoneNumber) -> ApiResult<LookupOutcome> {
        let body = LookupRequest {
            telefono: telefono.to_string(),
        };
        let value = self
            .post_json(Service::WorkflowEngine, "lookup-usuario", None, &body)
            .await?;
        let raw: RawLookupResponse = decode(value, "lookup response")?;
        let found = lookup_status_found(&raw.status).ok_or_else(|| {
            ApiError::UnexpectedResponse(format!("unknown lookup status {:?}", raw.status))
        })?;
        info!("Lookup for {} resolved found={}", telefono, found);
        Ok(LookupOutcome {
            found,
            reply: raw.reply,
            options: raw.options.unwrap_or_default(),
            meta: raw.meta,
        })
    }

    async fn register_user(&self, request: &RegistrationRequest) -> ApiResult<RegistrationOutcome> {
        let value = self
            .post_json(Service::WorkflowEngine, "nuevo-usuario", None, request)
            .await?;
        let raw: RawRegistrationResponse = decode(value, "registration response")?;
        if registration_status_failed(raw.status.as_deref()) {
            return Err(ApiError::Rejected(raw.reply.unwrap_or_default()));
        }
        Ok(RegistrationOutcome { reply: raw.reply })
    }

    async fn request_withdrawal(&self, request: &WithdrawRequest) -> ApiResult<String> {
        let value = self
            .post_json(Service::WorkflowEngine, "withdraw-request", None, request)
            .await?;
        let raw: RawReplyResponse = decode(value, "withdrawal response")?;
        Ok(raw.reply)
    }

    async fn submit_complaint(&self, request: &ComplaintRequest) -> ApiResult<String> {
        let value = self
            .post_json(Service::WorkflowEngine, "complaint", None, request)
            .await?;
        let raw: RawReplyResponse = decode(value, "complaint response")?;
        Ok(raw.reply)
    }

    async fn fetch_history(&self, telefono: &PhoneNumber) -> ApiResult<Vec<HistoryEntry>> {
        let mut url = self.url(Service::WorkflowEngine, "historial")?;
        url.query_pairs_mut().append_pair("telefono", telefono.as_str());
        let value = self.get_json(url, None).await?;
        extract_list(value, HISTORY_KEYS)
    }

    async fn relay_message(&self, request: &RelayRequest) -> ApiResult<RelayReply> {
        let value = self
            .post_json(Service::WorkflowEngine, "chat-user", None, request)
            .await?;
        let raw: RawRelayResponse = decode(value, "relay response")?;
        let options = raw.options.unwrap_or_default();
        if raw.reply.is_none() && options.is_empty() {
            return Err(ApiError::UnexpectedResponse(
                "relay response has neither reply nor options".to_string(),
            ));
        }
        Ok(RelayReply {
            reply: raw.reply,
            rol: raw.rol,
            options,
            action: raw.action,
        })
    }
}

#[async_trait]
impl AdminApi for GestorClient {
    async fn login(&self, user: &str, pass: &str) -> ApiResult<AdminLogin> {
        let value = self
            .post_json(
                Service::Backend,
                "admin/login",
                None,
                &AdminLoginRequest { user, pass },
            )
            .await?;
        let raw: RawAdminLoginResponse = decode(value, "login response")?;
        if !raw.ok {
            return Err(ApiError::Rejected(
                raw.error
                    .unwrap_or_else(|| "Usuario o contraseña incorrectos".to_string()),
            ));
        }
        match (raw.token, raw.admin) {
            (Some(token), Some(admin)) => Ok(AdminLogin { token, admin }),
            _ => Err(ApiError::UnexpectedResponse(
                "login response is missing token or admin".to_string(),
            )),
        }
    }

    async fn list_conversations(&self, token: &str) -> ApiResult<Vec<Conversation>> {
        let url = self.url(Service::Backend, "admin/conversations")?;
        let value = self.get_json(url, Some(token)).await?;
        extract_list(value, &["conversations"])
    }

    async fn chat_history(&self, _token: &str, telefono: &str) -> ApiResult<Vec<HistoryEntry>> {
        // Served by the workflow engine, which does not take the admin token.
        let value = self
            .post_json(
                Service::WorkflowEngine,
                "chat-history",
                None,
                &PhoneRequest { telefono },
            )
            .await?;
        extract_list(value, HISTORY_KEYS)
    }

    async fn respond(&self, token: &str, telefono: &str, mensaje: &str) -> ApiResult<()> {
        let value = self
            .post_json(
                Service::Backend,
                "admin/respond",
                Some(token),
                &AdminRespondRequest { telefono, mensaje },
            )
            .await?;
        Self::expect_ok(value, "admin response")
    }

    async fn pending_users(&self, token: &str) -> ApiResult<Vec<PendingUser>> {
        let url = self.url(Service::Backend, "admin/pending-users")?;
        let value = self.get_json(url, Some(token)).await?;
        extract_list(value, &["users"])
    }

    async fn approve_user(&self, token: &str, user_id: &RecordId) -> ApiResult<()> {
        let value = self
            .post_json(
                Service::Backend,
                "admin/approve-user",
                Some(token),
                &UserIdRequest { user_id },
            )
            .await?;
        Self::expect_ok(value, "user approval")
    }

    async fn reject_user(&self, token: &str, user_id: &RecordId) -> ApiResult<()> {
        let value = self
            .post_json(
                Service::Backend,
                "admin/reject-user",
                Some(token),
                &UserIdRequest { user_id },
            )
            .await?;
        Self::expect_ok(value, "user rejection")
    }

    async fn complaints(&self, token: &str) -> ApiResult<Vec<Complaint>> {
        let url = self.url(Service::Backend, "admin/complaints")?;
        let value = self.get_json(url, Some(token)).await?;
        extract_list(value, &["complaints"])
    }

    async fn update_complaint(
        &self,
        token: &str,
        id: &RecordId,
        estado: ComplaintStatus,
    ) -> ApiResult<()> {
        let value = self
            .post_json(
                Service::Backend,
                "admin/complaints/update",
                Some(token),
                &ComplaintUpdateRequest { id, estado },
            )
            .await?;
        Self::expect_ok(value, "complaint update")
    }
}
