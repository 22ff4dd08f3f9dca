// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search behavior for system-of-record types.
//!
//! A type opts in by naming its [`ModelSchema`] and providing the
//! [`SearchableRecord`] projection; the save and delete hooks of the host
//! application call [`Searchable::sync_to_index`] and
//! [`Searchable::remove_from_index`].
//!
//! ```rust
//! use std::sync::{Arc, OnceLock};
//! use serde_json::{json, Map, Value};
//! use elastic_sync::model::{ModelSchema, Searchable, SearchableRecord};
//!
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! impl SearchableRecord for User {
//!     fn schema(&self) -> &ModelSchema {
//!         Self::search_schema()
//!     }
//!
//!     fn search_key(&self) -> Option<String> {
//!         Some(self.id.to_string())
//!     }
//!
//!     fn to_searchable(&self) -> Map<String, Value> {
//!         let mut map = Map::new();
//!         map.insert("id".into(), json!(self.id));
//!         map.insert("name".into(), json!(self.name));
//!         map
//!     }
//! }
//!
//! impl Searchable for User {
//!     fn search_schema() -> &'static Arc<ModelSchema> {
//!         static SCHEMA: OnceLock<Arc<ModelSchema>> = OnceLock::new();
//!         SCHEMA.get_or_init(|| Arc::new(ModelSchema::new("users")))
//!     }
//! }
//!
//! let builder = User::search("ada").take(5);
//! assert_eq!(builder.free_text_query(), Some("ada"));
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use super::record::SearchableRecord;
use super::schema::ModelSchema;
use crate::client::ElasticError;
use crate::engine::ElasticEngine;
use crate::indexer::IndexReport;
use crate::query::QueryBuilder;

#[async_trait]
pub trait Searchable: SearchableRecord + Sized + 'static {
    /// Schema shared by every value of the type.
    fn search_schema() -> &'static Arc<ModelSchema>;

    /// `"*"` for a filter builder, anything else for free-text search.
    fn search(query: &str) -> QueryBuilder {
        Self::search_schema().search(query)
    }

    /// Save hook: write this record's projection.
    async fn sync_to_index(&self, engine: &ElasticEngine) -> Result<IndexReport, ElasticError> {
        engine.update(&[self as &dyn SearchableRecord]).await
    }

    /// Delete hook: remove this record's document.
    async fn remove_from_index(&self, engine: &ElasticEngine) -> Result<IndexReport, ElasticError> {
        engine.delete(&[self as &dyn SearchableRecord]).await
    }
}
