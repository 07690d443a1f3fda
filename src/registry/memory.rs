//! In-memory client store

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ClientRecord, ClientStore};
use crate::error::{Error, Result};

/// Process-local store, mainly for development and tests
#[derive(Default)]
pub struct MemoryClientStore {
    records: RwLock<HashMap<String, ClientRecord>>,
}

impl MemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    fn id(&self) -> &str {
        "memory"
    }

    async fn exists(&self, token: &str) -> Result<bool> {
        Ok(self.records.read().await.contains_key(token))
    }

    async fn create(&self, record: &ClientRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.registration_token) {
            return Err(Error::Internal(format!(
                "Duplicate registration token: {}",
                record.registration_token
            )));
        }
        records.insert(record.registration_token.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, token: &str, label: Option<&str>) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(token)
            .ok_or_else(|| Error::NotFound(token.to_string()))?;
        record.string_identifier = label.map(str::to_string);
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.records
            .write()
            .await
            .remove(token)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(token.to_string()))
    }

    async fn list(&self) -> Result<Vec<ClientRecord>> {
        let mut clients: Vec<ClientRecord> = self.records.read().await.values().cloned().collect();
        clients.sort_by(|a, b| a.registration_token.cmp(&b.registration_token));
        Ok(clients)
    }
}
