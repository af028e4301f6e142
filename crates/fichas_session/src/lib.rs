//! # Chat session
//!
//! Runs the end-user conversation on top of the state machine: the
//! [`ChatSession`] reducer, the append-only [`MessageLog`], the
//! [`InactivityTimer`] and the [`SessionDriver`] that ties them to the
//! network adapter. Also holds the admin panel state.

pub mod admin;
pub mod driver;
pub mod error;
pub mod message_log;
pub mod session;
pub mod timer;

// Re-exports
pub use admin::{AdminMenu, AdminPanel, FileTokenStore, SearchResult, StoredToken, TokenStore};
pub use driver::{DriverEvent, SessionDriver};
pub use error::{Result, SessionError};
pub use message_log::MessageLog;
pub use session::{
    ApiCall, ApiReply, ChatSession, Effect, Field, Preferences, Request, Response, Theme, Ticket,
};
pub use timer::{InactivityTimer, TimerFired};
