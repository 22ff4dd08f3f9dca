// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cross-request lookup cache for records referenced by id.
//!
//! [`ElasticEngine::expand`] prefetches a batch of ids with one `where_in`
//! query; [`ElasticEngine::expanded`] answers from the cache and falls back
//! to a single lookup. Misses are cached too, so an unknown id is only
//! fetched once.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::client::ElasticError;
use crate::engine::ElasticEngine;
use crate::metrics;
use crate::model::record::key_string;
use crate::model::{ModelSchema, Record};

/// Records keyed by `(table, id)`; `None` remembers a miss.
#[derive(Debug, Default)]
pub struct ExpandCache {
    entries: DashMap<(String, String), Option<Record>>,
}

impl ExpandCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str, id: &str) -> Option<Option<Record>> {
        self.entries
            .get(&(table.to_string(), id.to_string()))
            .map(|entry| entry.value().clone())
    }

    pub fn insert(&self, table: &str, id: &str, record: Option<Record>) {
        self.entries.insert((table.to_string(), id.to_string()), record);
        metrics::set_expand_cache_entries(self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl ElasticEngine {
    /// Prefetch `ids` of `schema` into the expand cache with one query.
    /// Returns how many records were found.
    pub async fn expand<I, V>(&self, schema: &Arc<ModelSchema>, ids: I) -> Result<usize, ElasticError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let builder = schema
            .query()
            .where_in(schema.get_key_name(), ids.clone())
            .take(ids.len() as u64);
        let records = self.get(&builder).await?.into_records();

        let found = records.len();
        for record in records {
            if let Some(key) = record.key() {
                self.expand.insert(schema.table(), &key, Some(record));
            }
        }

        debug!(table = %schema.table(), requested = ids.len(), found, "Expanded records");
        Ok(found)
    }

    /// Cached record for `id`, fetched (and cached) on a miss.
    pub async fn expanded(
        &self,
        schema: &Arc<ModelSchema>,
        id: impl Into<Value>,
    ) -> Result<Option<Record>, ElasticError> {
        let id = id.into();
        let key = key_string(&id)
            .ok_or_else(|| ElasticError::config(format!("cannot expand {} by a non-scalar id", schema.table())))?;

        if let Some(cached) = self.expand.get(schema.table(), &key) {
            metrics::record_expand_cache(true);
            return Ok(cached);
        }
        metrics::record_expand_cache(false);

        let record = self.find(schema, id).await?;
        self.expand.insert(schema.table(), &key, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_remembers_misses() {
        let cache = ExpandCache::new();
        assert!(cache.get("users", "1").is_none());

        cache.insert("users", "1", None);
        assert_eq!(cache.get("users", "1"), Some(None));

        let schema = Arc::new(ModelSchema::new("users"));
        let record = Record::from_source(schema, json!({"id": 2})).unwrap();
        cache.insert("users", "2", Some(record.clone()));
        assert_eq!(cache.get("users", "2"), Some(Some(record)));
        assert!(cache.get("posts", "2").is_none());
        assert_eq!(cache.len(), 2);
    }
}
