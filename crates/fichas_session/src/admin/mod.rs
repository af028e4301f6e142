//! Admin panel: login with a persisted token, conversations, pending users
//! and complaints.

mod panel;
mod token_store;

pub use panel::{AdminMenu, AdminPanel, SearchResult};
pub use token_store::{FileTokenStore, StoredToken, TokenStore};
