use crate::models::{Administrator, Capabilities};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Directory of administrator accounts and their capabilities.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn add_user(&self, username: &str, password: &str, caps: &Capabilities) -> Result<()>;
    async fn update_password(&self, username: &str, new_password: &str) -> Result<()>;
    async fn remove_user(&self, username: &str) -> Result<()>;

    /// Check a credential pair; returns the loaded account on success.
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Administrator>>;

    async fn get_administrator(&self, username: &str) -> Result<Option<Administrator>>;
    async fn list_administrators(&self) -> Result<Vec<Administrator>>;

    async fn set_capabilities(&self, username: &str, caps: &Capabilities) -> Result<()>;
    async fn add_moderator(&self, username: &str, group: &str) -> Result<()>;
    async fn remove_moderator(&self, username: &str, group: &str) -> Result<()>;
}

pub type DynDirectory = Arc<dyn Directory>;

pub mod sqlite;

/// Create an authentication backend from a connection URI.
pub async fn open(uri: &str) -> Result<DynDirectory> {
    if uri.starts_with("sqlite:") {
        sqlite::SqliteDirectory::new(uri)
            .await
            .map(|a| Arc::new(a) as DynDirectory)
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to open SQLite authentication database '{uri}': {e}

For SQLite URIs use sqlite:///path/to/auth.db, or sqlite::memory: for an
in-memory database. SQLite creates the file but not missing directories."
                )
            })
    } else {
        Err(anyhow::anyhow!(
            "Unknown authentication backend: '{uri}' (supported: sqlite://...)"
        ))
    }
}
