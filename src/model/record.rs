// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hydrated records.
//!
//! A [`Record`] is an attribute map bound to its [`ModelSchema`], plus any
//! relations attached by the eager loader. Typed access goes through serde
//! via [`Record::into_typed`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::schema::ModelSchema;
use crate::client::ElasticError;

const UPDATED_AT: &str = "updated_at";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What the indexer needs from anything it writes to the backend.
pub trait SearchableRecord: Send + Sync {
    fn schema(&self) -> &ModelSchema;

    /// Primary key rendered as the document id; `None` when unset.
    fn search_key(&self) -> Option<String>;

    /// Projection written as the document body. Empty means "nothing to index".
    fn to_searchable(&self) -> Map<String, Value>;
}

/// Eager-loaded relation value.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    One(Option<Box<Record>>),
    Many(Vec<Record>),
}

#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<ModelSchema>,
    attributes: Map<String, Value>,
    relations: BTreeMap<String, Relation>,
}

impl Record {
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Self {
            schema,
            attributes: Map::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Build a record from raw attributes; empty attribute sets hydrate to nothing.
    pub fn hydrate(schema: Arc<ModelSchema>, attributes: Map<String, Value>) -> Option<Self> {
        if attributes.is_empty() {
            return None;
        }
        Some(Self {
            schema,
            attributes,
            relations: BTreeMap::new(),
        })
    }

    /// Same as [`Record::hydrate`] for an arbitrary JSON value (non-objects hydrate to nothing).
    pub fn from_source(schema: Arc<ModelSchema>, source: Value) -> Option<Self> {
        match source {
            Value::Object(attributes) => Self::hydrate(schema, attributes),
            _ => None,
        }
    }

    pub fn schema_arc(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }

    /// Merge attributes over the current ones.
    pub fn fill(&mut self, attributes: &Map<String, Value>) -> &mut Self {
        for (name, value) in attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
        self
    }

    /// Stamp `updated_at` with the current time when the schema uses timestamps.
    pub fn touch(&mut self) -> &mut Self {
        if self.schema.uses_timestamps() {
            let now = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
            self.attributes.insert(UPDATED_AT.to_string(), Value::String(now));
        }
        self
    }

    pub fn key(&self) -> Option<String> {
        self.attributes
            .get(self.schema.get_key_name())
            .and_then(key_string)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> &BTreeMap<String, Relation> {
        &self.relations
    }

    pub fn set_relation(&mut self, name: impl Into<String>, relation: Relation) {
        self.relations.insert(name.into(), relation);
    }

    /// Deserialize the attributes into a caller type.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ElasticError> {
        serde_json::from_value(Value::Object(self.attributes)).map_err(|e| {
            ElasticError::Malformed(format!(
                "cannot deserialize {} record: {}",
                self.schema.table(),
                e
            ))
        })
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.table() == other.schema.table()
            && self.attributes == other.attributes
            && self.relations == other.relations
    }
}

impl SearchableRecord for Record {
    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn search_key(&self) -> Option<String> {
        self.key()
    }

    fn to_searchable(&self) -> Map<String, Value> {
        self.attributes.clone()
    }
}

/// Render a key-like JSON value as a string; `null` and containers have no key form.
pub(crate) fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn users() -> Arc<ModelSchema> {
        Arc::new(ModelSchema::new("users").timestamps(true))
    }

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_source_hydrates_to_nothing() {
        assert!(Record::hydrate(users(), Map::new()).is_none());
        assert!(Record::from_source(users(), Value::Null).is_none());
        assert!(Record::from_source(users(), json!({"id": 1})).is_some());
    }

    #[test]
    fn test_key_rendering() {
        let record = Record::hydrate(users(), attrs(json!({"id": 42}))).unwrap();
        assert_eq!(record.key(), Some("42".to_string()));

        let record = Record::hydrate(users(), attrs(json!({"id": "abc"}))).unwrap();
        assert_eq!(record.key(), Some("abc".to_string()));

        let record = Record::hydrate(users(), attrs(json!({"id": null}))).unwrap();
        assert_eq!(record.key(), None);
    }

    #[test]
    fn test_fill_and_touch() {
        let mut record = Record::hydrate(users(), attrs(json!({"id": 1, "name": "a"}))).unwrap();
        record.fill(&attrs(json!({"name": "b", "age": 3}))).touch();

        assert_eq!(record.get("name"), Some(&json!("b")));
        assert_eq!(record.get("age"), Some(&json!(3)));
        assert!(record.get("updated_at").is_some());
    }

    #[test]
    fn test_touch_without_timestamps_is_noop() {
        let schema = Arc::new(ModelSchema::new("users"));
        let mut record = Record::hydrate(schema, attrs(json!({"id": 1}))).unwrap();
        record.touch();
        assert!(record.get("updated_at").is_none());
    }

    #[test]
    fn test_into_typed() {
        #[derive(Deserialize)]
        struct User {
            id: u64,
            name: String,
        }

        let record = Record::hydrate(users(), attrs(json!({"id": 7, "name": "Ada"}))).unwrap();
        let user: User = record.into_typed().unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.name, "Ada");

        let record = Record::hydrate(users(), attrs(json!({"id": "x"}))).unwrap();
        assert!(matches!(
            record.into_typed::<User>(),
            Err(ElasticError::Malformed(_))
        ));
    }
}
