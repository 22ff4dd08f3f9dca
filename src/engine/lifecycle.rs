// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document writes and index lifecycle.
//!
//! ```text
//! update(records)
//!     │
//!     ├─→ update_mapping on? first batch of a type in this process?
//!     │        │   (a failed sync is forgotten and retried by the next batch)
//!     │        └─→ ensure_index ── missing ──→ create (settings) → put mapping
//!     │                         └─ present ──→ put mapping
//!     │
//!     └─→ indexer.update(records)
//! ```

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::ElasticEngine;
use crate::client::ElasticError;
use crate::indexer::IndexReport;
use crate::metrics;
use crate::model::{ModelSchema, Record, SearchableRecord};
use crate::payload::{Envelope, RawPayload};
use crate::query::QueryBuilder;

impl ElasticEngine {
    // ═══════════════════════════════════════════════════════════════════════
    // Documents
    // ═══════════════════════════════════════════════════════════════════════

    /// Index records; records with an empty projection are skipped without
    /// any backend call.
    pub async fn update(&self, records: &[&dyn SearchableRecord]) -> Result<IndexReport, ElasticError> {
        if self.update_mapping {
            for record in records {
                if record.to_searchable().is_empty() {
                    continue;
                }
                let schema = record.schema();
                if self.mappings.claim(schema.table()) {
                    if let Err(e) = self.sync_mapping(schema).await {
                        self.mappings.release(schema.table());
                        return Err(e);
                    }
                }
            }
        }
        self.indexer.update(records).await
    }

    /// Delete records by id; missing documents count as deleted.
    pub async fn delete(&self, records: &[&dyn SearchableRecord]) -> Result<IndexReport, ElasticError> {
        self.indexer.delete(records).await
    }

    /// Fill every matching record with `attributes`, refresh its timestamp
    /// and index it again. Nothing happens when `attributes` is empty.
    pub async fn update_matching(
        &self,
        builder: &QueryBuilder,
        attributes: &Map<String, Value>,
    ) -> Result<IndexReport, ElasticError> {
        if attributes.is_empty() {
            return Ok(IndexReport::default());
        }
        let mut records = self.get(builder).await?.into_records();
        for record in records.iter_mut() {
            record.fill(attributes).touch();
        }
        self.update(&as_searchable(&records)).await
    }

    /// Delete every matching document.
    pub async fn delete_matching(&self, builder: &QueryBuilder) -> Result<IndexReport, ElasticError> {
        let records = self.get(builder).await?.into_records();
        if records.is_empty() {
            return Ok(IndexReport::default());
        }
        self.delete(&as_searchable(&records)).await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Index lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Make sure the schema's index exists, creating and mapping it when the
    /// probe says it does not (or fails). Returns `true` when it was created.
    pub async fn ensure_index(&self, schema: &ModelSchema) -> Result<bool, ElasticError> {
        let probe = RawPayload::new(Envelope::for_index(schema)).to_request();
        let exists = match self.client.indices_exists(probe).await {
            Ok(exists) => {
                metrics::record_lifecycle_operation("exists", true);
                exists
            }
            Err(e) => {
                metrics::record_lifecycle_operation("exists", false);
                warn!(index = %schema.index_name(), error = %e, "Index probe failed, treating as missing");
                false
            }
        };

        if exists {
            return Ok(false);
        }

        self.create_index(schema).await?;
        self.update_index_mapping(schema).await?;
        Ok(true)
    }

    /// Create the index with the schema's settings.
    pub async fn create_index(&self, schema: &ModelSchema) -> Result<(), ElasticError> {
        let mut payload = RawPayload::new(Envelope::for_index(schema));
        payload.set_body_key_if_not_empty("settings", Value::Object(schema.get_settings().clone()));

        let result = self.client.indices_create(payload.to_request()).await;
        metrics::record_lifecycle_operation("create", result.is_ok());
        result?;

        info!(index = %schema.index_name(), "Created search index");
        Ok(())
    }

    /// Push the schema's mapping. An empty mapping is rejected before any call.
    pub async fn update_index_mapping(&self, schema: &ModelSchema) -> Result<(), ElasticError> {
        let mapping = schema.get_mapping();
        if mapping.is_empty() {
            return Err(ElasticError::config(format!(
                "nothing to update: the mapping of the {} model is not specified",
                schema.table()
            )));
        }

        let mut payload = RawPayload::new(Envelope::for_type(schema));
        payload.set_body_key(schema.searchable_as(), Value::Object(mapping.clone()));
        payload.envelope_mut().set_param("include_type_name", true)?;

        let result = self.client.indices_put_mapping(payload.to_request()).await;
        metrics::record_lifecycle_operation("put_mapping", result.is_ok());
        result?;

        info!(index = %schema.index_name(), doc_type = %schema.searchable_as(), "Updated search mapping");
        Ok(())
    }

    async fn sync_mapping(&self, schema: &ModelSchema) -> Result<(), ElasticError> {
        if !self.ensure_index(schema).await? {
            self.update_index_mapping(schema).await?;
        }
        Ok(())
    }
}

fn as_searchable(records: &[Record]) -> Vec<&dyn SearchableRecord> {
    records.iter().map(|r| r as &dyn SearchableRecord).collect()
}
