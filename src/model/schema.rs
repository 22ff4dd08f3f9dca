// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Model Schema
//!
//! Describes one searchable record type: where its documents live, how the
//! index is created and mapped, which relations can be eager loaded and
//! which free-text rules apply by default.
//!
//! ```text
//! ModelSchema::new("users")
//!     index   → users_index
//!     type    → users
//!     key     → id
//!     settings/mapping → PUT users_index, PUT users_index/_mapping/users
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use elastic_sync::model::ModelSchema;
//!
//! let users = Arc::new(
//!     ModelSchema::new("users")
//!         .mapping(json!({"properties": {"name": {"type": "keyword"}}}))
//!         .with_alias("write", "users_write")
//!         .soft_delete(true),
//! );
//!
//! assert_eq!(users.index_name(), "users_index");
//! assert_eq!(users.alias("write"), Some("users_write"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::query::{QueryBuilder, QueryStringRule, RuleVariant};

/// Suffix appended to the table name to form the index name.
pub const INDEX_SUFFIX: &str = "_index";

const DEFAULT_PER_PAGE: u64 = 15;

/// Result ceiling of a to-many eager load sub-query.
pub const DEFAULT_MAX_RELATED: u64 = 10_000;

/// How many related records an owner receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// A single related record (or none)
    One,
    /// A list of related records
    Many,
}

/// Relation registry entry: related type plus the join keys.
#[derive(Debug, Clone)]
pub struct RelationDef {
    /// Related record type (target of the sub-query)
    pub related: Arc<ModelSchema>,
    /// Attribute on the owning records holding the join value
    pub foreign_key: String,
    /// Attribute on the related records matched against `foreign_key`
    pub owner_key: String,
    pub cardinality: Cardinality,
    /// Result size of a to-many sub-query; to-one loads ask for one per key
    pub max_related: u64,
}

impl RelationDef {
    pub fn one(
        related: Arc<ModelSchema>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self {
            related,
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
            cardinality: Cardinality::One,
            max_related: DEFAULT_MAX_RELATED,
        }
    }

    pub fn many(
        related: Arc<ModelSchema>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self {
            related,
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
            cardinality: Cardinality::Many,
            max_related: DEFAULT_MAX_RELATED,
        }
    }

    pub fn max_related(mut self, limit: u64) -> Self {
        self.max_related = limit;
        self
    }

    /// Fresh builder over the related type, ready for constraints.
    pub fn sub_query(&self) -> QueryBuilder {
        self.related.query()
    }
}

/// Secondary type used only to cast hydrated attributes.
///
/// Hits are hydrated into the primary type first, handed to the callback
/// model, and the returned attributes are hydrated into the primary type
/// again. Returning `None` drops the hit.
pub trait CallbackModel: Send + Sync {
    fn cast(&self, attributes: Map<String, Value>) -> Option<Map<String, Value>>;
}

impl<F> CallbackModel for F
where
    F: Fn(Map<String, Value>) -> Option<Map<String, Value>> + Send + Sync,
{
    fn cast(&self, attributes: Map<String, Value>) -> Option<Map<String, Value>> {
        self(attributes)
    }
}

/// Searchable record type definition.
#[derive(Clone)]
pub struct ModelSchema {
    table: String,
    type_name: String,
    key_name: String,
    settings: Map<String, Value>,
    mapping: Map<String, Value>,
    aliases: HashMap<String, String>,
    relations: HashMap<String, RelationDef>,
    search_rules: Vec<RuleVariant>,
    soft_delete: bool,
    timestamps: bool,
    per_page: u64,
    callback_model: Option<Arc<dyn CallbackModel>>,
}

impl ModelSchema {
    /// Create a schema for `table` with the stock settings, mapping and rules.
    pub fn new(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            type_name: table.clone(),
            table,
            key_name: "id".to_string(),
            settings: object(json!({
                "number_of_shards": 5,
                "number_of_replicas": 1,
            })),
            mapping: object(json!({
                "properties": {
                    "id": {"type": "long"},
                },
            })),
            aliases: HashMap::new(),
            relations: HashMap::new(),
            search_rules: vec![RuleVariant::object(QueryStringRule)],
            soft_delete: false,
            timestamps: false,
            per_page: DEFAULT_PER_PAGE,
            callback_model: None,
        }
    }

    /// Override the document type name (defaults to the table name)
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    /// Index settings used when the index is lazily created.
    /// Non-object values are ignored.
    pub fn settings(mut self, settings: Value) -> Self {
        self.settings = object(settings);
        self
    }

    /// Mapping applied after index creation and on auto-update.
    /// Non-object values clear the mapping.
    pub fn mapping(mut self, mapping: Value) -> Self {
        self.mapping = object(mapping);
        self
    }

    /// Register a named alias (`write`, `read`, ...) resolving to an index name
    pub fn with_alias(mut self, name: impl Into<String>, index: impl Into<String>) -> Self {
        self.aliases.insert(name.into(), index.into());
        self
    }

    pub fn relation(mut self, name: impl Into<String>, relation: RelationDef) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    /// Replace the default free-text rules.
    pub fn search_rules(mut self, rules: Vec<RuleVariant>) -> Self {
        self.search_rules = rules;
        self
    }

    pub fn soft_delete(mut self, enabled: bool) -> Self {
        self.soft_delete = enabled;
        self
    }

    /// Refresh `updated_at` when records are modified through the builder
    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn callback_model(mut self, model: Arc<dyn CallbackModel>) -> Self {
        self.callback_model = Some(model);
        self
    }

    // ─── accessors ───

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn index_name(&self) -> String {
        format!("{}{}", self.table, INDEX_SUFFIX)
    }

    /// Document type name sent as `type` on every request.
    pub fn searchable_as(&self) -> &str {
        &self.type_name
    }

    pub fn get_key_name(&self) -> &str {
        &self.key_name
    }

    pub fn get_settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    pub fn get_mapping(&self) -> &Map<String, Value> {
        &self.mapping
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    pub fn get_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.get(name)
    }

    pub fn get_search_rules(&self) -> &[RuleVariant] {
        &self.search_rules
    }

    pub fn uses_soft_delete(&self) -> bool {
        self.soft_delete
    }

    pub fn uses_timestamps(&self) -> bool {
        self.timestamps
    }

    pub fn get_per_page(&self) -> u64 {
        self.per_page
    }

    pub fn get_callback_model(&self) -> Option<&Arc<dyn CallbackModel>> {
        self.callback_model.as_ref()
    }

    // ─── builder entry points ───

    /// Plain filter builder over this type.
    pub fn query(self: &Arc<Self>) -> QueryBuilder {
        QueryBuilder::new(Arc::clone(self))
    }

    /// `"*"` yields a plain filter builder, anything else a free-text builder.
    pub fn search(self: &Arc<Self>, query: &str) -> QueryBuilder {
        if query == "*" {
            self.query()
        } else {
            QueryBuilder::free_text(Arc::clone(self), query)
        }
    }
}

impl fmt::Debug for ModelSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut relations: Vec<&String> = self.relations.keys().collect();
        relations.sort();
        f.debug_struct("ModelSchema")
            .field("table", &self.table)
            .field("type_name", &self.type_name)
            .field("key_name", &self.key_name)
            .field("relations", &relations)
            .field("search_rules", &self.search_rules.len())
            .field("soft_delete", &self.soft_delete)
            .field("timestamps", &self.timestamps)
            .field("per_page", &self.per_page)
            .field("callback_model", &self.callback_model.is_some())
            .finish()
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
