// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Resync
//!
//! Re-index a record type from its system of record, optionally limited to
//! a comma-separated id list, in chunks of [`RESYNC_CHUNK_SIZE`].
//!
//! # Example
//!
//! ```rust,no_run
//! # use elastic_sync::{ElasticEngine, resync::RecordSource};
//! # async fn example<S: RecordSource>(engine: &ElasticEngine, users: &S) {
//! // Everything
//! let report = engine.resync(users, None).await.unwrap();
//!
//! // Only a few records
//! let report = engine.resync(users, Some("1, 2, 3")).await.unwrap();
//! println!("{} of {} indexed", report.indexed, report.total);
//! # }
//! ```

use async_trait::async_trait;
use tracing::info;

use crate::client::ElasticError;
use crate::engine::ElasticEngine;
use crate::metrics;
use crate::model::{ModelSchema, SearchableRecord};

pub const RESYNC_CHUNK_SIZE: u64 = 100;

/// System of record for one record type.
#[async_trait]
pub trait RecordSource: Send + Sync {
    type Item: SearchableRecord;

    fn schema(&self) -> &ModelSchema;

    /// Number of records, limited to `ids` when given.
    async fn count(&self, ids: Option<&[String]>) -> Result<u64, ElasticError>;

    /// Records in a stable order, limited to `ids` when given.
    async fn chunk(
        &self,
        ids: Option<&[String]>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self::Item>, ElasticError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResyncReport {
    /// Records the source reported up front
    pub total: u64,
    pub chunks: usize,
    pub indexed: usize,
    pub skipped: usize,
}

/// Split a comma-separated id argument; blank input means "all records".
pub fn parse_ids(ids: &str) -> Option<Vec<String>> {
    let ids: Vec<String> = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

impl ElasticEngine {
    /// Re-index every record of `source` (or only `ids`).
    pub async fn resync<S: RecordSource>(
        &self,
        source: &S,
        ids: Option<&str>,
    ) -> Result<ResyncReport, ElasticError> {
        let ids = ids.and_then(parse_ids);
        let ids = ids.as_deref();
        let table = source.schema().table().to_string();

        let mut report = ResyncReport {
            total: source.count(ids).await?,
            ..Default::default()
        };
        info!(table = %table, total = report.total, "Resync started");

        let mut offset = 0;
        loop {
            let chunk = source.chunk(ids, offset, RESYNC_CHUNK_SIZE).await?;
            if chunk.is_empty() {
                break;
            }

            let records: Vec<&dyn SearchableRecord> =
                chunk.iter().map(|r| r as &dyn SearchableRecord).collect();
            let written = self.update(&records).await?;

            report.chunks += 1;
            report.indexed += written.indexed;
            report.skipped += written.skipped;
            metrics::record_resync_chunk(&table, chunk.len());

            offset += chunk.len() as u64;
            if (chunk.len() as u64) < RESYNC_CHUNK_SIZE {
                break;
            }
        }

        info!(
            table = %table,
            chunks = report.chunks,
            indexed = report.indexed,
            skipped = report.skipped,
            "Resync finished"
        );
        Ok(report)
    }
}
