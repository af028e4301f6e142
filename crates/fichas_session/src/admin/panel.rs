//! Admin panel state.
//!
//! Holds the logged-in token and the data of each screen. Selecting a menu
//! loads its data, and every mutation (approve, reject, complaint update)
//! refreshes the affected list from the backend afterwards.

use std::sync::Arc;

use chrono::Utc;
use fichas_client::models::{
    AdminProfile, Complaint, ComplaintStatus, Conversation, HistoryEntry, PendingUser, RecordId,
};
use fichas_client::{AdminApi, AdminBackend, GestorApi};
use fichas_core::PhoneNumber;
use serde::{Deserialize, Serialize};

use super::token_store::{StoredToken, TokenStore};
use crate::error::{Result, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminMenu {
    #[default]
    Conversations,
    PendingUsers,
    Complaints,
    Settings,
}

/// Result of searching a user by phone.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub telefono: String,
    pub found: bool,
    pub nombre: Option<String>,
    pub history: Vec<HistoryEntry>,
}

pub struct AdminPanel {
    api: Arc<dyn AdminBackend>,
    tokens: Arc<dyn TokenStore>,
    login: Option<StoredToken>,
    active_menu: AdminMenu,
    conversations: Vec<Conversation>,
    selected_conversation: Option<String>,
    chat_history: Vec<HistoryEntry>,
    search: Option<SearchResult>,
    pending_users: Vec<PendingUser>,
    complaints: Vec<Complaint>,
}

impl AdminPanel {
    /// Build the panel, restoring a previously stored login.
    pub async fn restore(api: Arc<dyn AdminBackend>, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let login = tokens.load().await?;
        if let Some(stored) = &login {
            tracing::debug!(user = %stored.admin.user, "restored admin token");
        }
        Ok(Self {
            api,
            tokens,
            login,
            active_menu: AdminMenu::default(),
            conversations: Vec::new(),
            selected_conversation: None,
            chat_history: Vec::new(),
            search: None,
            pending_users: Vec::new(),
            complaints: Vec::new(),
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.login.is_some()
    }

    pub fn admin(&self) -> Option<&AdminProfile> {
        self.login.as_ref().map(|l| &l.admin)
    }

    pub fn active_menu(&self) -> AdminMenu {
        self.active_menu
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn selected_conversation(&self) -> Option<&str> {
        self.selected_conversation.as_deref()
    }

    pub fn chat_history(&self) -> &[HistoryEntry] {
        &self.chat_history
    }

    pub fn search_result(&self) -> Option<&SearchResult> {
        self.search.as_ref()
    }

    pub fn pending_users(&self) -> &[PendingUser] {
        &self.pending_users
    }

    pub fn complaints(&self) -> &[Complaint] {
        &self.complaints
    }

    fn token(&self) -> Result<String> {
        self.login
            .as_ref()
            .map(|l| l.token.clone())
            .ok_or(SessionError::NotAuthenticated)
    }

    // ========== Authentication ==========

    pub async fn login(&mut self, user: &str, pass: &str) -> Result<&AdminProfile> {
        if user.trim().is_empty() || pass.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let login = self.api.login(user.trim(), pass).await?;
        let stored = StoredToken {
            token: login.token,
            admin: login.admin,
        };
        self.tokens.save(&stored).await?;
        tracing::info!(user = %stored.admin.user, "admin logged in");
        Ok(&self.login.insert(stored).admin)
    }

    /// Drop the token and every loaded screen.
    pub async fn logout(&mut self) -> Result<()> {
        self.tokens.clear().await?;
        self.login = None;
        self.active_menu = AdminMenu::default();
        self.conversations.clear();
        self.selected_conversation = None;
        self.chat_history.clear();
        self.search = None;
        self.pending_users.clear();
        self.complaints.clear();
        tracing::info!("admin logged out");
        Ok(())
    }

    // ========== Navigation ==========

    /// Switch screens, loading the data the screen shows.
    pub async fn select_menu(&mut self, menu: AdminMenu) -> Result<()> {
        self.token()?;
        self.active_menu = menu;
        match menu {
            AdminMenu::Conversations => self.refresh_conversations().await,
            AdminMenu::PendingUsers => self.refresh_pending_users().await,
            AdminMenu::Complaints => self.refresh_complaints().await,
            AdminMenu::Settings => Ok(()),
        }
    }

    // ========== Conversations ==========

    pub async fn refresh_conversations(&mut self) -> Result<()> {
        let token = self.token()?;
        self.conversations = self.api.list_conversations(&token).await?;
        Ok(())
    }

    pub async fn select_conversation(&mut self, telefono: &str) -> Result<()> {
        let token = self.token()?;
        let history = self.api.chat_history(&token, telefono).await?;
        self.selected_conversation = Some(telefono.to_string());
        self.chat_history = history;
        Ok(())
    }

    /// Send a reply in the selected conversation. The entry is added to the
    /// visible history once the backend accepts it.
    pub async fn respond(&mut self, mensaje: &str) -> Result<()> {
        let mensaje = mensaje.trim();
        if mensaje.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let token = self.token()?;
        let telefono = self
            .selected_conversation
            .clone()
            .ok_or(SessionError::NoConversationSelected)?;
        self.api.respond(&token, &telefono, mensaje).await?;
        self.chat_history.push(HistoryEntry {
            rol: "admin".to_string(),
            contenido: mensaje.to_string(),
            created_at: Some(Utc::now().to_rfc3339()),
        });
        Ok(())
    }

    /// Look a user up by phone and load their chat history.
    pub async fn search_user(&mut self, query: &str) -> Result<&SearchResult> {
        if query.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let token = self.token()?;
        let phone = PhoneNumber::parse(query)?;
        let lookup = self.api.lookup_user(&phone).await?;
        let history = self.api.chat_history(&token, phone.as_str()).await?;
        let result = SearchResult {
            telefono: phone.to_string(),
            found: lookup.found,
            nombre: lookup.user_name().map(str::to_string),
            history,
        };
        Ok(&*self.search.insert(result))
    }

    // ========== Pending users ==========

    pub async fn refresh_pending_users(&mut self) -> Result<()> {
        let token = self.token()?;
        self.pending_users = self.api.pending_users(&token).await?;
        Ok(())
    }

    pub async fn approve_user(&mut self, id: &RecordId) -> Result<()> {
        let token = self.token()?;
        self.api.approve_user(&token, id).await?;
        tracing::info!(%id, "user approved");
        self.refresh_pending_users().await
    }

    pub async fn reject_user(&mut self, id: &RecordId) -> Result<()> {
        let token = self.token()?;
        self.api.reject_user(&token, id).await?;
        tracing::info!(%id, "user rejected");
        self.refresh_pending_users().await
    }

    // ========== Complaints ==========

    pub async fn refresh_complaints(&mut self) -> Result<()> {
        let token = self.token()?;
        self.complaints = self.api.complaints(&token).await?;
        Ok(())
    }

    pub async fn update_complaint(&mut self, id: &RecordId, estado: ComplaintStatus) -> Result<()> {
        let token = self.token()?;
        self.api.update_complaint(&token, id, estado).await?;
        tracing::info!(%id, %estado, "complaint updated");
        self.refresh_complaints().await
    }
}
