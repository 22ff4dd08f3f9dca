// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Eager relation loading.
//!
//! One sub-query per direct relation and batch, however many records the
//! batch holds:
//!
//! ```text
//! records.foreign_key = [1, 1, 2, 3]
//!        │ distinct, non-null, first-seen order
//!        ▼
//! related.where_in(owner_key, [1, 2, 3])  ──►  dictionary owner_key → record(s)
//!        │
//!        └─► every record gets dictionary[foreign_key] (or [] / None)
//! ```
//!
//! Dotted names (`posts.comments`) are not loaded here; they are handed to
//! the parent relation's sub-query, which loads them on its own results.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::debug;

use super::ElasticEngine;
use crate::client::ElasticError;
use crate::metrics;
use crate::model::record::key_string;
use crate::model::{Cardinality, Record, Relation};
use crate::query::EagerLoad;

type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ElasticError>> + Send + 'a>>;

impl ElasticEngine {
    /// Attach every direct relation in `loads` to `records`.
    ///
    /// Boxed because loading a relation runs a search that may itself load
    /// nested relations.
    pub(crate) fn load_relations<'a>(
        &'a self,
        records: &'a mut [Record],
        loads: &'a [EagerLoad],
    ) -> LoadFuture<'a> {
        Box::pin(async move {
            for load in loads.iter().filter(|load| !load.is_nested()) {
                self.load_relation(records, load, loads).await?;
            }
            Ok(())
        })
    }

    async fn load_relation(
        &self,
        records: &mut [Record],
        load: &EagerLoad,
        all_loads: &[EagerLoad],
    ) -> Result<(), ElasticError> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let schema = first.schema_arc().clone();
        let relation = schema.get_relation(&load.name).cloned().ok_or_else(|| {
            ElasticError::config(format!(
                "the {} model has no '{}' relation",
                schema.table(),
                load.name
            ))
        })?;

        let keys = distinct_keys(records, &relation.foreign_key);

        let related = if keys.is_empty() {
            Vec::new()
        } else {
            let size = match relation.cardinality {
                Cardinality::One => keys.len() as u64,
                Cardinality::Many => relation.max_related,
            };
            let mut query = relation.sub_query().take(size);
            if let Some(constraint) = &load.constraint {
                query = constraint(query);
            }
            for nested in nested_under(&load.name, all_loads) {
                query = match nested.constraint {
                    Some(constraint) => {
                        query.with_constrained(nested.name, move |q| constraint(q))
                    }
                    None => query.with([nested.name]),
                };
            }

            metrics::record_eager_load(&load.name, keys.len());
            let query = query.where_in(relation.owner_key.clone(), keys);
            self.get(&query).await?.into_records()
        };

        debug!(
            table = %schema.table(),
            relation = %load.name,
            related = related.len(),
            "Eager loaded relation"
        );

        match relation.cardinality {
            Cardinality::Many => {
                let mut dictionary: HashMap<String, Vec<Record>> = HashMap::new();
                for record in related {
                    if let Some(key) = record.get(&relation.owner_key).and_then(key_string) {
                        dictionary.entry(key).or_default().push(record);
                    }
                }
                for record in records.iter_mut() {
                    let matched = record
                        .get(&relation.foreign_key)
                        .and_then(key_string)
                        .and_then(|key| dictionary.get(&key).cloned())
                        .unwrap_or_default();
                    record.set_relation(load.name.clone(), Relation::Many(matched));
                }
            }
            Cardinality::One => {
                let mut dictionary: HashMap<String, Record> = HashMap::new();
                for record in related {
                    if let Some(key) = record.get(&relation.owner_key).and_then(key_string) {
                        dictionary.entry(key).or_insert(record);
                    }
                }
                for record in records.iter_mut() {
                    let matched = record
                        .get(&relation.foreign_key)
                        .and_then(key_string)
                        .and_then(|key| dictionary.get(&key).cloned())
                        .map(Box::new);
                    record.set_relation(load.name.clone(), Relation::One(matched));
                }
            }
        }

        Ok(())
    }
}

/// Distinct non-null values of `field`, in first-seen order.
fn distinct_keys(records: &[Record], field: &str) -> Vec<Value> {
    let mut keys: Vec<Value> = Vec::new();
    for record in records {
        match record.get(field) {
            None | Some(Value::Null) => {}
            Some(value) => {
                if !keys.contains(value) {
                    keys.push(value.clone());
                }
            }
        }
    }
    keys
}

/// Loads below `parent`, with the `parent.` prefix removed.
fn nested_under(parent: &str, loads: &[EagerLoad]) -> Vec<EagerLoad> {
    let prefix = format!("{}.", parent);
    loads
        .iter()
        .filter_map(|load| {
            load.name.strip_prefix(&prefix).map(|rest| EagerLoad {
                name: rest.to_string(),
                constraint: load.constraint.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSchema;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_distinct_keys_first_seen_order() {
        let schema = Arc::new(ModelSchema::new("posts"));
        let records: Vec<Record> = [json!({"u": 2}), json!({"u": 1}), json!({"u": null}), json!({"u": 2}), json!({"x": 1})]
            .into_iter()
            .filter_map(|v| Record::from_source(schema.clone(), v))
            .collect();
        assert_eq!(distinct_keys(&records, "u"), vec![json!(2), json!(1)]);
    }

    #[test]
    fn test_nested_under_strips_prefix() {
        let loads = vec![
            EagerLoad { name: "posts".into(), constraint: None },
            EagerLoad { name: "posts.comments".into(), constraint: None },
            EagerLoad { name: "posts.comments.author".into(), constraint: None },
            EagerLoad { name: "postscript".into(), constraint: None },
        ];
        let nested: Vec<String> = nested_under("posts", &loads).into_iter().map(|l| l.name).collect();
        assert_eq!(nested, vec!["comments", "comments.author"]);
    }
}
