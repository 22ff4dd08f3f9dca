// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request envelope: the identity of a request (`index`, `type`, `id`) plus
//! free-form top-level parameters and client options.
//!
//! Identity is fixed when the envelope is created. The only sanctioned
//! ways to change the target index afterwards are [`Envelope::use_alias`]
//! and [`Envelope::set_unions`]; generic parameter writes to a protected key
//! fail immediately.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::ElasticError;
use crate::model::{ModelSchema, SearchableRecord};

/// Keys that only the envelope itself may write.
pub const PROTECTED_KEYS: [&str; 3] = ["index", "type", "id"];

/// Target index: one name or a union list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IndexTarget {
    Single(String),
    Many(Vec<String>),
}

impl IndexTarget {
    pub fn names(&self) -> Vec<&str> {
        match self {
            IndexTarget::Single(name) => vec![name.as_str()],
            IndexTarget::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    index: IndexTarget,
    doc_type: Option<String>,
    id: Option<String>,
    params: Map<String, Value>,
    client: Map<String, Value>,
}

impl Envelope {
    /// Index-level request (`index` only).
    pub fn for_index(schema: &ModelSchema) -> Self {
        Self {
            index: IndexTarget::Single(schema.index_name()),
            doc_type: None,
            id: None,
            params: Map::new(),
            client: Map::new(),
        }
    }

    /// Type-level request (`index` + `type`).
    pub fn for_type(schema: &ModelSchema) -> Self {
        let mut envelope = Self::for_index(schema);
        envelope.doc_type = Some(schema.searchable_as().to_string());
        envelope
    }

    /// Document-level request; a record without a primary key is rejected.
    pub fn for_document(record: &dyn SearchableRecord) -> Result<Self, ElasticError> {
        let schema = record.schema();
        let id = record.search_key().ok_or_else(|| {
            ElasticError::config(format!(
                "the key value must be set to construct a payload for the {} record",
                schema.table()
            ))
        })?;
        let mut envelope = Self::for_type(schema);
        envelope.id = Some(id);
        Ok(envelope)
    }

    pub fn index(&self) -> &IndexTarget {
        &self.index
    }

    pub fn doc_type(&self) -> Option<&str> {
        self.doc_type.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn is_protected(key: &str) -> bool {
        PROTECTED_KEYS.contains(&key)
    }

    /// Set a top-level request parameter (`refresh`, `include_type_name`, ...).
    pub fn set_param(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self, ElasticError> {
        if Self::is_protected(key) {
            return Err(ElasticError::config(format!(
                "the '{}' key is protected and cannot be overwritten",
                key
            )));
        }
        self.params.insert(key.to_string(), value.into());
        Ok(self)
    }

    /// Set a client option (`ignore`, `timeout`, ...).
    pub fn set_client(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.client.insert(key.to_string(), value.into());
        self
    }

    /// Point the request at one of the schema's named aliases.
    pub fn use_alias(&mut self, schema: &ModelSchema, alias: &str) -> Result<&mut Self, ElasticError> {
        let index = schema.alias(alias).ok_or_else(|| {
            ElasticError::config(format!(
                "the {} model doesn't have a getter for the {} alias",
                schema.table(),
                alias
            ))
        })?;
        self.index = IndexTarget::Single(index.to_string());
        Ok(self)
    }

    /// Append union indices after the current target; duplicates are kept.
    pub fn set_unions(&mut self, unions: &[String]) -> &mut Self {
        if unions.is_empty() {
            return self;
        }
        let mut names = match &self.index {
            IndexTarget::Single(name) => vec![name.clone()],
            IndexTarget::Many(names) => names.clone(),
        };
        names.extend(unions.iter().cloned());
        self.index = IndexTarget::Many(names);
        self
    }

    /// Top-level request map without a body.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let index = match &self.index {
            IndexTarget::Single(name) => Value::String(name.clone()),
            IndexTarget::Many(names) => {
                Value::Array(names.iter().cloned().map(Value::String).collect())
            }
        };
        map.insert("index".to_string(), index);
        if let Some(doc_type) = &self.doc_type {
            map.insert("type".to_string(), Value::String(doc_type.clone()));
        }
        if let Some(id) = &self.id {
            map.insert("id".to_string(), Value::String(id.clone()));
        }
        for (key, value) in &self.params {
            map.insert(key.clone(), value.clone());
        }
        if !self.client.is_empty() {
            map.insert("client".to_string(), Value::Object(self.client.clone()));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use serde_json::json;
    use std::sync::Arc;

    fn users() -> Arc<ModelSchema> {
        Arc::new(ModelSchema::new("users").with_alias("write", "users_write"))
    }

    #[test]
    fn test_type_envelope() {
        let envelope = Envelope::for_type(&users());
        assert_eq!(
            Value::Object(envelope.to_map()),
            json!({"index": "users_index", "type": "users"})
        );
    }

    #[test]
    fn test_document_envelope_requires_key() {
        let keyless = Record::from_source(users(), json!({"name": "a"})).unwrap();
        let err = Envelope::for_document(&keyless).unwrap_err();
        assert!(matches!(err, ElasticError::Configuration(ref m) if m.contains("users")));

        let record = Record::from_source(users(), json!({"id": 3})).unwrap();
        let envelope = Envelope::for_document(&record).unwrap();
        assert_eq!(envelope.id(), Some("3"));
    }

    #[test]
    fn test_protected_keys_rejected() {
        let mut envelope = Envelope::for_type(&users());
        for key in PROTECTED_KEYS {
            assert!(matches!(
                envelope.set_param(key, "x"),
                Err(ElasticError::Configuration(_))
            ));
        }
        envelope.set_param("refresh", "wait_for").unwrap();
        assert_eq!(envelope.param("refresh"), Some(&json!("wait_for")));
        assert_eq!(envelope.index(), &IndexTarget::Single("users_index".into()));
    }

    #[test]
    fn test_use_alias() {
        let schema = users();
        let mut envelope = Envelope::for_type(&schema);
        envelope.use_alias(&schema, "write").unwrap();
        assert_eq!(envelope.index(), &IndexTarget::Single("users_write".into()));

        let err = envelope.use_alias(&schema, "read").unwrap_err();
        assert!(matches!(err, ElasticError::Configuration(ref m) if m.contains("read")));
    }

    #[test]
    fn test_unions_preserve_order_and_duplicates() {
        let schema = Arc::new(ModelSchema::new("c"));
        let mut envelope = Envelope::for_type(&schema);
        envelope.set_unions(&["a_index".to_string(), "b_index".to_string(), "a_index".to_string()]);
        assert_eq!(
            envelope.to_map()["index"],
            json!(["c_index", "a_index", "b_index", "a_index"])
        );
    }

    #[test]
    fn test_empty_unions_keep_single_target() {
        let mut envelope = Envelope::for_type(&users());
        envelope.set_unions(&[]);
        assert_eq!(envelope.to_map()["index"], json!("users_index"));
    }

    #[test]
    fn test_client_options_serialized() {
        let mut envelope = Envelope::for_type(&users());
        envelope.set_client("ignore", 404);
        assert_eq!(envelope.to_map()["client"], json!({"ignore": 404}));
    }
}
