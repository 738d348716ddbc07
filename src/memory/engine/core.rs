//! Memory engine: validated request/response surface over the store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::memory::core::config::MemoryConfig;
use crate::memory::core::errors::{MemoryError, MemoryResult};
use crate::memory::core::ids::{SessionId, UserId};
use crate::memory::core::item::MemoryItem;
use crate::memory::core::kinds::MemoryType;
use crate::memory::core::metadata::MemoryMetadata;
use crate::memory::maintenance::{BackgroundCleanup, CleanupConfig, CleanupHandle};
use crate::memory::store::{MemoryQuery, MemoryStats, MemoryStore, NewMemory, StoreOutcome};

/// Request to store a memory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreMemoryRequest {
    /// Target session.
    #[serde(default)]
    pub session_id: String,
    /// Storing user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Tier name: `working` or `short_term`.
    #[serde(default, rename = "type")]
    pub memory_type: String,
    /// Content to remember.
    #[serde(default)]
    pub content: String,
    /// Free-text context.
    #[serde(default)]
    pub context: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Metadata; `priority` is interpreted, the rest is passed through.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Request to retrieve memories.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RetrieveMemoryRequest {
    /// Session to search.
    #[serde(default)]
    pub session_id: String,
    /// Requesting user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Optional tier restriction.
    #[serde(default, rename = "type")]
    pub memory_type: Option<String>,
    /// Keywords, any of which must match.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Tags, any of which must match.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Minimum creation time.
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Minimum importance.
    #[serde(default)]
    pub min_importance: Option<f64>,
    /// Maximum results; `0` means the default.
    #[serde(default)]
    pub limit: usize,
}

/// Retrieved memories.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RetrieveMemoryResponse {
    /// Matches sorted by importance.
    pub items: Vec<MemoryItem>,
    /// Up to three contexts joined with `"; "`.
    pub context_summary: String,
    /// Number of returned items.
    pub total: usize,
}

/// Memory engine owning the store and its sweep task.
pub struct MemoryEngine {
    store: Arc<MemoryStore>,
    cleanup: Mutex<Option<CleanupHandle>>,
}

impl MemoryEngine {
    /// Create a new engine. The sweep task is not started.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: MemoryConfig) -> MemoryResult<Self> {
        Ok(Self::with_store(Arc::new(MemoryStore::new(config)?)))
    }

    /// Wrap an existing store.
    #[must_use]
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            cleanup: Mutex::new(None),
        }
    }

    /// Shared handle to the underlying store.
    #[must_use]
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Start the background sweep. Returns `false` if it was already running.
    pub async fn start(&self, parent: &CancellationToken) -> bool {
        let mut cleanup = self.cleanup.lock().await;
        if cleanup.is_some() {
            return false;
        }
        let config = CleanupConfig::from(self.store.config());
        let handle = BackgroundCleanup::new(Arc::clone(&self.store), config)
            .with_parent(parent)
            .spawn();
        *cleanup = Some(handle);
        true
    }

    /// Stop the background sweep and wait for it to exit.
    pub async fn stop(&self) {
        let handle = self.cleanup.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
            info!("Memory engine stopped");
        }
    }

    /// Whether the sweep task is running.
    pub async fn is_running(&self) -> bool {
        self.cleanup
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Store a memory.
    ///
    /// # Errors
    /// Returns a validation error for a missing session, an unsupported tier,
    /// or empty content.
    pub async fn store_memory(&self, request: StoreMemoryRequest) -> MemoryResult<StoreOutcome> {
        let session_id = parse_session(&request.session_id)?;
        let user_id = parse_user(request.user_id.as_deref())?;
        let memory_type: MemoryType = request.memory_type.parse()?;

        let mut memory = NewMemory::new(session_id, memory_type, request.content)
            .with_context(request.context)
            .with_tags(request.tags)
            .with_metadata(MemoryMetadata::from_map(request.metadata));
        memory.user_id = user_id;

        self.store.store(memory).await
    }

    /// Retrieve memories.
    ///
    /// # Errors
    /// Returns a validation error for a missing session or an unsupported tier.
    pub async fn retrieve_memory(
        &self,
        request: RetrieveMemoryRequest,
    ) -> MemoryResult<RetrieveMemoryResponse> {
        let session_id = parse_session(&request.session_id)?;
        let mut query = MemoryQuery::new(session_id)
            .with_keywords(request.keywords)
            .with_tags(request.tags)
            .with_limit(request.limit);
        query.user_id = parse_user(request.user_id.as_deref())?;
        query.memory_type = parse_optional_type(request.memory_type.as_deref())?;
        query.since = request.since;
        query.min_importance = request.min_importance;

        let retrieved = self.store.retrieve(&query).await;
        Ok(RetrieveMemoryResponse {
            total: retrieved.items.len(),
            items: retrieved.items,
            context_summary: retrieved.context_summary,
        })
    }

    /// Usage statistics for a session.
    ///
    /// # Errors
    /// Returns a validation error for a missing session.
    pub async fn memory_stats(&self, session_id: &str, user_id: Option<&str>) -> MemoryResult<MemoryStats> {
        let session_id = parse_session(session_id)?;
        let user_id = parse_user(user_id)?;
        let mut stats = self.store.stats(&session_id).await;
        if stats.user_id.is_none() {
            stats.user_id = user_id.map(|user| user.to_string());
        }
        Ok(stats)
    }

    /// Clear one tier of a session, or both when `memory_type` is `None`.
    ///
    /// # Errors
    /// Returns a validation error for a missing session or an unsupported tier.
    pub async fn clear_memory(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        memory_type: Option<&str>,
    ) -> MemoryResult<usize> {
        let session_id = parse_session(session_id)?;
        let user_id = parse_user(user_id)?;
        let memory_type = parse_optional_type(memory_type)?;
        let removed = self.store.clear(&session_id, memory_type).await;
        info!(
            session_id = %session_id,
            user_id = user_id.as_ref().map_or("-", UserId::as_str),
            removed,
            "Cleared session memory"
        );
        Ok(removed)
    }
}

pub(crate) fn parse_session(raw: &str) -> MemoryResult<SessionId> {
    if raw.trim().is_empty() {
        return Err(MemoryError::MissingSessionId);
    }
    Ok(SessionId::new(raw)?)
}

pub(crate) fn parse_user(raw: Option<&str>) -> MemoryResult<Option<UserId>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(user) => Ok(Some(UserId::new(user)?)),
    }
}

fn parse_optional_type(raw: Option<&str>) -> MemoryResult<Option<MemoryType>> {
    match raw.map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some(kind) => Ok(Some(kind.parse()?)),
    }
}
