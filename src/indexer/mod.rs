// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document Indexers
//!
//! An indexer pushes record projections to the backend and removes them
//! again. Records are handled one at a time in slice order.

pub mod single;

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::{ElasticError, SearchClient};
use crate::config::{ElasticConfig, IndexerKind};
use crate::model::SearchableRecord;

pub use single::SingleIndexer;

/// Outcome of one indexer batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Records written (or deleted)
    pub indexed: usize,
    /// Records with an empty projection, never sent
    pub skipped: usize,
}

impl IndexReport {
    pub fn merge(&mut self, other: IndexReport) {
        self.indexed += other.indexed;
        self.skipped += other.skipped;
    }
}

#[async_trait]
pub trait Indexer: Send + Sync {
    async fn update(&self, records: &[&dyn SearchableRecord]) -> Result<IndexReport, ElasticError>;
    async fn delete(&self, records: &[&dyn SearchableRecord]) -> Result<IndexReport, ElasticError>;
}

/// Build the indexer named in the configuration.
pub fn from_config(
    client: Arc<dyn SearchClient>,
    config: &ElasticConfig,
) -> Result<Arc<dyn Indexer>, ElasticError> {
    match config.indexer_kind()? {
        IndexerKind::Single => Ok(Arc::new(SingleIndexer::new(
            client,
            config.document_refresh.clone(),
        ))),
    }
}
