// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search Rules
//!
//! A rule turns the builder's free text into a `query.bool` fragment. Rules
//! are tried in declaration order; each applicable rule yields one payload
//! and the executor stops at the first payload with hits.
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::{json, Map, Value};
//! use elastic_sync::query::{QueryBuilder, RuleVariant, SearchRule};
//!
//! struct ExactName;
//!
//! impl SearchRule for ExactName {
//!     fn build_query_payload(&self, builder: &QueryBuilder) -> Map<String, Value> {
//!         let text = builder.free_text_query().unwrap_or_default();
//!         json!({"must": {"term": {"name.raw": text}}})
//!             .as_object()
//!             .cloned()
//!             .unwrap_or_default()
//!     }
//! }
//!
//! let rules = vec![
//!     RuleVariant::object(ExactName),
//!     RuleVariant::callable(|b: &QueryBuilder| {
//!         let text = b.free_text_query().unwrap_or_default();
//!         json!({"must": {"match": {"name": text}}})
//!             .as_object()
//!             .cloned()
//!             .unwrap_or_default()
//!     }),
//! ];
//! assert_eq!(rules.len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::builder::QueryBuilder;

/// Object rule with an applicability gate and optional highlighting.
pub trait SearchRule: Send + Sync {
    fn is_applicable(&self, _builder: &QueryBuilder) -> bool {
        true
    }

    /// Fragment placed at `query.bool`. An empty map contributes nothing.
    fn build_query_payload(&self, builder: &QueryBuilder) -> Map<String, Value>;

    /// Fragment placed at `highlight`.
    fn build_highlight_payload(&self, _builder: &QueryBuilder) -> Option<Value> {
        None
    }
}

pub type RuleFn = dyn Fn(&QueryBuilder) -> Map<String, Value> + Send + Sync;

/// Function rule or object rule.
#[derive(Clone)]
pub enum RuleVariant {
    /// Always applicable, never highlights
    Callable(Arc<RuleFn>),
    Object(Arc<dyn SearchRule>),
}

impl RuleVariant {
    pub fn callable<F>(rule: F) -> Self
    where
        F: Fn(&QueryBuilder) -> Map<String, Value> + Send + Sync + 'static,
    {
        RuleVariant::Callable(Arc::new(rule))
    }

    pub fn object<R: SearchRule + 'static>(rule: R) -> Self {
        RuleVariant::Object(Arc::new(rule))
    }
}

impl fmt::Debug for RuleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleVariant::Callable(_) => f.write_str("RuleVariant::Callable"),
            RuleVariant::Object(_) => f.write_str("RuleVariant::Object"),
        }
    }
}

/// Default rule: a `query_string` query over the builder's free text.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryStringRule;

impl SearchRule for QueryStringRule {
    fn is_applicable(&self, builder: &QueryBuilder) -> bool {
        builder.free_text_query().is_some_and(|q| !q.is_empty())
    }

    fn build_query_payload(&self, builder: &QueryBuilder) -> Map<String, Value> {
        let mut fragment = Map::new();
        fragment.insert(
            "must".to_string(),
            json!({
                "query_string": {
                    "query": builder.free_text_query().unwrap_or_default(),
                },
            }),
        );
        fragment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSchema;

    #[test]
    fn test_query_string_rule() {
        let schema = Arc::new(ModelSchema::new("posts"));
        let builder = schema.search("rust async");
        let rule = QueryStringRule;

        assert!(rule.is_applicable(&builder));
        assert_eq!(
            Value::Object(rule.build_query_payload(&builder)),
            json!({"must": {"query_string": {"query": "rust async"}}})
        );
        assert!(rule.build_highlight_payload(&builder).is_none());
    }

    #[test]
    fn test_query_string_rule_not_applicable_without_text() {
        let schema = Arc::new(ModelSchema::new("posts"));
        assert!(!QueryStringRule.is_applicable(&schema.query()));
    }

    #[test]
    fn test_variant_debug() {
        let rule = RuleVariant::callable(|_: &QueryBuilder| Map::new());
        assert_eq!(format!("{:?}", rule), "RuleVariant::Callable");
        assert_eq!(
            format!("{:?}", RuleVariant::object(QueryStringRule)),
            "RuleVariant::Object"
        );
    }
}
