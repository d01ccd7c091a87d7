//! Collaborators the action handlers call into.
//!
//! These are the only places where an action suspends on I/O. The engine
//! owns none of the data behind them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Http(e.to_string())
    }
}

/// Queryable record store (customers, jobs, equipment, ...)
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Value of `field` on the first record of `collection`.
    ///
    /// `Ok(None)` means the collection has no record; a record without the
    /// field yields `Some(Null)`.
    async fn first_field(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<Option<serde_json::Value>, ServiceError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub message_id: String,
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<MessageReceipt, ServiceError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub description: String,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub status: String,
}

#[async_trait]
pub trait TaskTracker: Send + Sync {
    async fn create_task(&self, task: &NewTask) -> Result<TaskRecord, ServiceError>;
}

/// A minted shareable link. The password, if any, is stored hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedLink {
    pub token: String,
    pub link_type: String,
    pub resource_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SharedLink {
    pub fn path(&self) -> String {
        format!("/share/{}", self.token)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn save(&self, link: &SharedLink) -> Result<(), ServiceError>;

    async fn find(&self, token: &str) -> Result<Option<SharedLink>, ServiceError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRequest {
    pub prompt: String,
    pub model: Option<String>,
}

/// Remote AI completion. Treated as opaque.
#[async_trait]
pub trait AiService: Send + Sync {
    async fn complete(&self, request: &AiRequest) -> Result<String, ServiceError>;
}

/// Link issuance settings
#[derive(Debug, Clone)]
pub struct LinkSettings {
    /// Public base URL that link paths are joined onto
    pub base_url: Option<String>,
    pub default_expiry_days: u32,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            default_expiry_days: 14,
        }
    }
}

/// Everything the dispatcher needs to perform side effects
#[derive(Clone)]
pub struct ActionServices {
    pub records: Arc<dyn RecordStore>,
    pub messages: Arc<dyn MessageSender>,
    pub tasks: Arc<dyn TaskTracker>,
    pub links: Arc<dyn LinkStore>,
    pub ai: Arc<dyn AiService>,
    pub link_settings: LinkSettings,
}

impl ActionServices {
    /// In-memory collaborators; messages are only logged and AI is unconfigured.
    pub fn in_memory() -> Self {
        use crate::memory::{
            InMemoryLinkStore, InMemoryRecordStore, InMemoryTaskTracker, LoggingMessageSender,
        };
        use crate::http::UnconfiguredAiService;

        Self {
            records: Arc::new(InMemoryRecordStore::new()),
            messages: Arc::new(LoggingMessageSender::new()),
            tasks: Arc::new(InMemoryTaskTracker::new()),
            links: Arc::new(InMemoryLinkStore::new()),
            ai: Arc::new(UnconfiguredAiService),
            link_settings: LinkSettings::default(),
        }
    }
}
