//! Admin token storage trait and implementations

use async_trait::async_trait;
use fichas_client::models::AdminProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::Result;

/// What is persisted after a successful admin login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub token: String,
    pub admin: AdminProfile,
}

/// Admin token storage trait
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the stored token, if any. An unreadable token counts as none.
    async fn load(&self) -> Result<Option<StoredToken>>;

    /// Save a token, replacing the previous one
    async fn save(&self, token: &StoredToken) -> Result<()>;

    /// Remove the stored token
    async fn clear(&self) -> Result<()>;
}

/// File-based token storage
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store under the data directory (`~/.gestor-fichas/admin_token.json`).
    pub fn default_location() -> Self {
        Self::new(fichas_core::paths::admin_token_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).await?;
        match serde_json::from_str::<StoredToken>(&contents) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding corrupt admin token");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    async fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, contents).await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).await?;
        }

        Ok(())
    }
}
