// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Result Mapper
//!
//! Turns a raw search response into records, or into aggregation buckets
//! when the builder grouped. Grouping and hit hydration never mix.

use std::sync::Arc;

use serde_json::Value;

use super::types::{MappedResults, SearchResponse};
use crate::model::Record;
use crate::query::QueryBuilder;

pub struct ResultMapper;

impl ResultMapper {
    pub fn map(builder: &QueryBuilder, response: &SearchResponse) -> MappedResults {
        if response.total() == 0 {
            return MappedResults::default();
        }

        if let Some(name) = builder.groups().keys().next() {
            return MappedResults::Buckets(response.buckets(name));
        }

        let schema = builder.schema();
        let tag_origin = !builder.unions().is_empty();

        let records = response
            .hits()
            .into_iter()
            .filter_map(|hit| {
                let mut source = hit.source;
                if tag_origin {
                    if let Some(index) = hit.index {
                        source.insert("_index".to_string(), Value::String(index));
                    }
                }

                let record = Record::hydrate(Arc::clone(schema), source)?;
                match schema.get_callback_model() {
                    Some(model) => {
                        let cast = model.cast(record.into_attributes())?;
                        Record::hydrate(Arc::clone(schema), cast)
                    }
                    None => Some(record),
                }
            })
            .collect();

        MappedResults::Records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSchema;
    use serde_json::{json, Map};

    fn response(body: Value) -> SearchResponse {
        SearchResponse { body, payload: None }
    }

    #[test]
    fn test_zero_total_maps_to_nothing() {
        let schema = Arc::new(ModelSchema::new("users"));
        let mapped = ResultMapper::map(
            &schema.query(),
            &response(json!({"hits": {"total": {"value": 0}, "hits": [{"_source": {"id": 1}}]}})),
        );
        assert!(mapped.is_empty());
    }

    #[test]
    fn test_hits_hydrate_in_order_and_drop_empty() {
        let schema = Arc::new(ModelSchema::new("users"));
        let mapped = ResultMapper::map(
            &schema.query(),
            &response(json!({"hits": {"total": {"value": 3}, "hits": [
                {"_index": "users_index", "_id": "2", "_source": {"id": 2}},
                {"_index": "users_index", "_id": "9", "_source": {}},
                {"_index": "users_index", "_id": "1", "_source": {"id": 1}},
            ]}})),
        );
        let ids: Vec<_> = mapped.records().iter().map(|r| r.key().unwrap()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert!(mapped.records()[0].get("_index").is_none());
    }

    #[test]
    fn test_union_hits_tagged_with_origin() {
        let schema = Arc::new(ModelSchema::new("c"));
        let builder = schema.query().union(["a_index", "b_index"]);
        let mapped = ResultMapper::map(
            &builder,
            &response(json!({"hits": {"total": {"value": 2}, "hits": [
                {"_index": "a_index", "_id": "1", "_source": {"id": 1}},
                {"_index": "c_index", "_id": "2", "_source": {"id": 2}},
            ]}})),
        );
        assert_eq!(mapped.records()[0].get("_index"), Some(&json!("a_index")));
        assert_eq!(mapped.records()[1].get("_index"), Some(&json!("c_index")));
    }

    #[test]
    fn test_grouping_returns_buckets() {
        let schema = Arc::new(ModelSchema::new("users"));
        let builder = schema.query().group_by(json!({"field": "status"}));
        let mapped = ResultMapper::map(
            &builder,
            &response(json!({
                "hits": {"total": {"value": 5}, "hits": [{"_source": {"id": 1}}]},
                "aggregations": {"count": {"buckets": [{"key": "active", "doc_count": 5}]}},
            })),
        );
        assert_eq!(
            mapped,
            MappedResults::Buckets(vec![json!({"key": "active", "doc_count": 5})])
        );
    }

    #[test]
    fn test_callback_model_reprojects() {
        let schema = Arc::new(ModelSchema::new("users").callback_model(Arc::new(
            |mut attrs: Map<String, Value>| {
                if attrs.get("hidden") == Some(&json!(true)) {
                    return None;
                }
                let age: i64 = attrs["age"].as_str().unwrap_or("0").parse().unwrap_or(0);
                attrs.insert("age".into(), json!(age));
                Some(attrs)
            },
        )));
        let mapped = ResultMapper::map(
            &schema.query(),
            &response(json!({"hits": {"total": {"value": 2}, "hits": [
                {"_source": {"id": 1, "age": "42"}},
                {"_source": {"id": 2, "age": "7", "hidden": true}},
            ]}})),
        );
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped.records()[0].get("age"), Some(&json!(42)));
    }
}
