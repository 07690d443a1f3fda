//! Device registry
//!
//! Records of subscribed devices keyed by registration token. Persistence
//! sits behind the [`ClientStore`] trait:
//! - `MemoryClientStore`: process-local map, lost on restart
//! - `PgClientStore`: PostgreSQL table via sqlx
//!
//! [`Registry`] wraps a store and is the single serialization point for
//! record mutation. Every create/update/delete for a token runs under that
//! token's lock, so the inbound dispatcher and HTTP handlers never interleave
//! an exists-check with a mutation on the same token.

mod memory;
mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub use memory::MemoryClientStore;
pub use postgres::{init_pool, migrations, PgClientStore, PostgresPool};

/// Number of lock stripes shared by all tokens
const LOCK_STRIPES: usize = 64;

/// A registered device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ClientRecord {
    /// Gateway-issued token identifying one device instance
    pub registration_token: String,
    /// Human-readable label
    #[serde(default)]
    pub string_identifier: Option<String>,
}

impl ClientRecord {
    pub fn new(registration_token: impl Into<String>, string_identifier: Option<String>) -> Self {
        ClientRecord {
            registration_token: registration_token.into(),
            string_identifier,
        }
    }
}

/// Abstract interface for registry persistence
///
/// Implementations need not be idempotent: [`Registry`] checks existence
/// under the token lock before calling `create`, `update` or `delete`.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Get the backend ID
    fn id(&self) -> &str;

    /// Check whether a record exists for the token
    async fn exists(&self, token: &str) -> Result<bool>;

    /// Insert a new record
    async fn create(&self, record: &ClientRecord) -> Result<()>;

    /// Replace the label of an existing record
    async fn update(&self, token: &str, label: Option<&str>) -> Result<()>;

    /// Remove a record
    async fn delete(&self, token: &str) -> Result<()>;

    /// Snapshot of all records
    async fn list(&self) -> Result<Vec<ClientRecord>>;
}

/// Shared handle over a [`ClientStore`] with per-token mutual exclusion
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn ClientStore>,
    locks: Arc<[Mutex<()>]>,
}

impl Registry {
    /// Wrap a store
    pub fn new(store: Arc<dyn ClientStore>) -> Self {
        let locks: Vec<Mutex<()>> = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect();
        Registry {
            store,
            locks: locks.into(),
        }
    }

    /// Registry backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryClientStore::new()))
    }

    /// ID of the underlying store
    pub fn backend(&self) -> &str {
        self.store.id()
    }

    async fn lock(&self, token: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let stripe = (hasher.finish() as usize) % self.locks.len();
        self.locks[stripe].lock().await
    }

    /// Create the record, or update its label if the token is already known.
    ///
    /// Returns the stored record and whether it was newly created.
    pub async fn register(
        &self,
        token: &str,
        label: Option<String>,
    ) -> Result<(ClientRecord, bool)> {
        let _guard = self.lock(token).await;

        let record = ClientRecord::new(token, label);
        if self.store.exists(token).await? {
            self.store
                .update(token, record.string_identifier.as_deref())
                .await?;
            debug!(token, "Updated client label");
            Ok((record, false))
        } else {
            self.store.create(&record).await?;
            debug!(token, "Created client");
            Ok((record, true))
        }
    }

    /// Delete the record for the token.
    ///
    /// Fails with [`Error::NotFound`] when the token is not registered.
    pub async fn unregister(&self, token: &str) -> Result<()> {
        let _guard = self.lock(token).await;

        if !self.store.exists(token).await? {
            return Err(Error::NotFound(token.to_string()));
        }
        self.store.delete(token).await?;
        debug!(token, "Deleted client");
        Ok(())
    }

    /// Whether the token is registered. Store failures read as absent.
    pub async fn exists(&self, token: &str) -> bool {
        match self.store.exists(token).await {
            Ok(found) => found,
            Err(e) => {
                warn!(token, "Registry existence check failed: {}", e);
                false
            }
        }
    }

    /// Snapshot of all records
    pub async fn list(&self) -> Result<Vec<ClientRecord>> {
        self.store.list().await
    }
}
