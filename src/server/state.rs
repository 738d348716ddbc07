//! Application state shared across all request handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AgentConfig;
use crate::fusion::engine::FusionEngine;
use crate::knowledge::documentation::DocumentationSource;
use crate::knowledge::local_index::LocalIndexSource;
use crate::memory::engine::MemoryEngine;
use crate::memory::store::MemoryStore;
use crate::pipeline::orchestrator::Pipeline;
use crate::retrieval::engine::RetrievalEngine;

/// Shared application state.
pub struct AppState {
    /// Memory operations.
    pub memory: MemoryEngine,
    /// Question pipeline sharing the memory store.
    pub pipeline: Pipeline,
    /// Cancelled on shutdown; request tokens are children of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the memory store, knowledge sources and pipeline from `config`.
    ///
    /// # Errors
    /// Returns an error if a component cannot be created.
    pub fn new(config: &AgentConfig) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let store = Arc::new(MemoryStore::new(config.memory.clone())?);
        let mut pipeline = Pipeline::new(
            Arc::clone(&store),
            FusionEngine::new(config.fusion.clone()),
            config.pipeline.clone(),
        );

        if let Some(path) = &config.pipeline.local_index_path {
            let index = LocalIndexSource::from_json_file(path)?;
            info!(path = %path, documents = index.len(), "Loaded local index");
            pipeline = pipeline.with_source(Arc::new(index));
        }

        let endpoints = &config.pipeline.documentation_endpoints;
        if !endpoints.is_empty() || config.pipeline.fallback_payload.is_some() {
            let engine = RetrievalEngine::http(config.retrieval.clone())?;
            let mut docs = DocumentationSource::new(engine, endpoints.clone());
            if let Some(fallback) = &config.pipeline.fallback_payload {
                docs = docs.with_fallback(fallback.clone());
            }
            info!(endpoints = endpoints.len(), "Documentation source enabled");
            pipeline = pipeline.with_source(Arc::new(docs));
        }

        Ok(Self::from_parts(MemoryEngine::with_store(store), pipeline))
    }

    /// Assemble state from prebuilt parts. The pipeline should share the
    /// engine's store.
    #[must_use]
    pub fn from_parts(memory: MemoryEngine, pipeline: Pipeline) -> Arc<Self> {
        Arc::new(Self {
            memory,
            pipeline,
            shutdown: CancellationToken::new(),
        })
    }
}
