//! In-memory collaborators, used by the CLI, the default server wiring and tests.

use crate::services::{
    LinkStore, MessageReceipt, MessageSender, NewTask, OutgoingMessage, RecordStore,
    ServiceError, SharedLink, TaskRecord, TaskTracker,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryRecordStore {
    collections: RwLock<HashMap<String, Vec<serde_json::Value>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, collection: impl Into<String>, record: serde_json::Value) {
        self.collections
            .write()
            .await
            .entry(collection.into())
            .or_default()
            .push(record);
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn first_field(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<Option<serde_json::Value>, ServiceError> {
        let collections = self.collections.read().await;
        let first = collections.get(collection).and_then(|records| records.first());
        Ok(first.map(|record| record.get(field).cloned().unwrap_or(serde_json::Value::Null)))
    }
}

/// Logs every message and keeps a copy instead of delivering it
#[derive(Default)]
pub struct LoggingMessageSender {
    sent: RwLock<Vec<OutgoingMessage>>,
}

impl LoggingMessageSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl MessageSender for LoggingMessageSender {
    async fn send(&self, message: &OutgoingMessage) -> Result<MessageReceipt, ServiceError> {
        tracing::info!(
            "Message to {} ({}): {} bytes",
            message.recipient,
            message.subject,
            message.body.len()
        );
        self.sent.write().await.push(message.clone());
        Ok(MessageReceipt {
            message_id: Uuid::new_v4().to_string(),
        })
    }
}

#[derive(Default)]
pub struct InMemoryTaskTracker {
    tasks: RwLock<Vec<(TaskRecord, NewTask)>>,
}

impl InMemoryTaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}

#[async_trait]
impl TaskTracker for InMemoryTaskTracker {
    async fn create_task(&self, task: &NewTask) -> Result<TaskRecord, ServiceError> {
        let record = TaskRecord {
            id: Uuid::new_v4().to_string(),
            status: "open".to_string(),
        };
        self.tasks.write().await.push((record.clone(), task.clone()));
        Ok(record)
    }
}

#[derive(Default)]
pub struct InMemoryLinkStore {
    links: RwLock<HashMap<String, SharedLink>>,
}

impl InMemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn save(&self, link: &SharedLink) -> Result<(), ServiceError> {
        let mut links = self.links.write().await;
        if links.contains_key(&link.token) {
            return Err(ServiceError::Rejected(format!(
                "token {} already issued",
                link.token
            )));
        }
        links.insert(link.token.clone(), link.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<SharedLink>, ServiceError> {
        Ok(self.links.read().await.get(token).cloned())
    }
}
