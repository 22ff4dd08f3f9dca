// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search engine facade.
//!
//! The [`ElasticEngine`] ties the pieces together:
//! - Payload compilation and ordered rule execution (search, count, paginate)
//! - Result mapping and eager relation loading
//! - Document indexing through the configured [`Indexer`]
//! - Lazy index creation and once-per-type mapping updates
//!
//! # Flow
//!
//! ```text
//! QueryBuilder ──► PayloadCompiler ──► [payload, payload, ...]
//!                                          │ sequential, stop at total > 0
//!                                          ▼
//!                                     SearchClient
//!                                          │
//!                  ResultMapper ◄──────────┘
//!                       │
//!                       └─► eager loader (one sub-query per relation)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use elastic_sync::{ElasticConfig, ElasticEngine, HttpClient};
//! use elastic_sync::model::ModelSchema;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), elastic_sync::ElasticError> {
//! let config = ElasticConfig::from_env();
//! let client = Arc::new(HttpClient::new(&config)?);
//! let engine = ElasticEngine::new(client, &config)?;
//!
//! let users = Arc::new(ModelSchema::new("users"));
//! let page = engine
//!     .paginate(users.search("ada").where_eq("active", true), None, 1)
//!     .await?;
//! println!("{} of {}", page.items.len(), page.total);
//! # Ok(())
//! # }
//! ```

mod eager;
mod lifecycle;
mod mapper;
mod search_api;
mod types;

pub use mapper::ResultMapper;
pub use types::{total_hits, Hit, MappedResults, Page, SearchResponse};

use std::sync::Arc;

use dashmap::DashSet;

use crate::client::{ElasticError, SearchClient};
use crate::config::ElasticConfig;
use crate::expand::ExpandCache;
use crate::indexer::{self, Indexer};

/// Record types whose mapping was already handled in this process.
#[derive(Debug, Default)]
pub struct MappingMemo {
    handled: DashSet<String>,
}

impl MappingMemo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `table` as handled; `true` only for the first caller.
    pub fn claim(&self, table: &str) -> bool {
        self.handled.insert(table.to_string())
    }

    /// Forget `table` so the next batch attempts its mapping again.
    pub fn release(&self, table: &str) {
        self.handled.remove(table);
    }

    pub fn contains(&self, table: &str) -> bool {
        self.handled.contains(table)
    }

    pub fn len(&self) -> usize {
        self.handled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handled.is_empty()
    }
}

/// Search executor, mapper and index lifecycle over one backend client.
///
/// # Thread Safety
///
/// The engine is `Send + Sync`. Every operation awaits one backend call at
/// a time, so rule order and per-record indexing stay sequential; the
/// process-wide caches are concurrent containers shared through `Arc`.
pub struct ElasticEngine {
    pub(crate) client: Arc<dyn SearchClient>,
    pub(crate) indexer: Arc<dyn Indexer>,
    pub(crate) update_mapping: bool,
    pub(crate) mappings: Arc<MappingMemo>,
    pub(crate) expand: Arc<ExpandCache>,
}

impl ElasticEngine {
    /// Engine with fresh caches and the indexer named in `config`.
    pub fn new(client: Arc<dyn SearchClient>, config: &ElasticConfig) -> Result<Self, ElasticError> {
        Self::with_caches(
            client,
            config,
            Arc::new(MappingMemo::new()),
            Arc::new(ExpandCache::new()),
        )
    }

    /// Engine sharing caches with other engines of the same process.
    pub fn with_caches(
        client: Arc<dyn SearchClient>,
        config: &ElasticConfig,
        mappings: Arc<MappingMemo>,
        expand: Arc<ExpandCache>,
    ) -> Result<Self, ElasticError> {
        let indexer = indexer::from_config(Arc::clone(&client), config)?;
        Ok(Self {
            client,
            indexer,
            update_mapping: config.update_mapping,
            mappings,
            expand,
        })
    }

    /// Swap in a custom indexer strategy.
    pub fn with_indexer(mut self, indexer: Arc<dyn Indexer>) -> Self {
        self.indexer = indexer;
        self
    }

    pub fn client(&self) -> &Arc<dyn SearchClient> {
        &self.client
    }

    pub fn mapping_memo(&self) -> &Arc<MappingMemo> {
        &self.mappings
    }

    pub fn expand_cache(&self) -> &Arc<ExpandCache> {
        &self.expand
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryClient;

    #[test]
    fn test_memo_first_claim_wins() {
        let memo = MappingMemo::new();
        assert!(memo.claim("users"));
        assert!(!memo.claim("users"));
        assert!(memo.contains("users"));
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_memo_release_allows_new_claim() {
        let memo = MappingMemo::new();
        assert!(memo.claim("users"));
        memo.release("users");
        assert!(!memo.contains("users"));
        assert!(memo.claim("users"));
        memo.release("posts");
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_unknown_indexer_rejected() {
        let config = ElasticConfig {
            indexer: "bulk".into(),
            ..Default::default()
        };
        let result = ElasticEngine::new(Arc::new(InMemoryClient::new()), &config);
        assert!(matches!(result, Err(ElasticError::Configuration(_))));
    }

    #[test]
    fn test_shared_caches() {
        let memo = Arc::new(MappingMemo::new());
        let expand = Arc::new(ExpandCache::new());
        let config = ElasticConfig::default();

        let a = ElasticEngine::with_caches(
            Arc::new(InMemoryClient::new()),
            &config,
            Arc::clone(&memo),
            Arc::clone(&expand),
        )
        .unwrap();
        let b = ElasticEngine::with_caches(
            Arc::new(InMemoryClient::new()),
            &config,
            Arc::clone(&memo),
            expand,
        )
        .unwrap();

        assert!(a.mapping_memo().claim("users"));
        assert!(!b.mapping_memo().claim("users"));
    }
}
