// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde_json::{Map, Value};

use crate::model::record::key_string;
use crate::model::Record;

/// Total hit count of a search response.
///
/// Accepts both `hits.total.value` and a bare numeric `hits.total`;
/// anything else counts as zero.
pub fn total_hits(body: &Value) -> u64 {
    match body.pointer("/hits/total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}

/// Raw backend answer plus the request that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub body: Value,
    /// `None` when a builder callback answered instead of the compiler
    pub payload: Option<Value>,
}

impl SearchResponse {
    pub fn total(&self) -> u64 {
        total_hits(&self.body)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|hits| hits.iter().map(Hit::from_value).collect())
            .unwrap_or_default()
    }

    /// Document ids in response order.
    pub fn ids(&self) -> Vec<String> {
        self.hits().into_iter().filter_map(|hit| hit.id).collect()
    }

    /// Buckets of the named aggregation.
    pub fn buckets(&self, name: &str) -> Vec<Value> {
        self.body
            .get("aggregations")
            .and_then(|aggs| aggs.get(name))
            .and_then(|agg| agg.get("buckets"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

/// One entry of `hits.hits`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: Option<String>,
    pub index: Option<String>,
    pub source: Map<String, Value>,
}

impl Hit {
    pub fn from_value(hit: &Value) -> Self {
        Self {
            id: hit.get("_id").and_then(key_string),
            index: hit.get("_index").and_then(Value::as_str).map(str::to_string),
            source: hit
                .get("_source")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Mapped search results: records, or aggregation buckets when grouping.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedResults {
    Records(Vec<Record>),
    Buckets(Vec<Value>),
}

impl Default for MappedResults {
    fn default() -> Self {
        MappedResults::Records(Vec::new())
    }
}

impl MappedResults {
    pub fn len(&self) -> usize {
        match self {
            MappedResults::Records(records) => records.len(),
            MappedResults::Buckets(buckets) => buckets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> &[Record] {
        match self {
            MappedResults::Records(records) => records,
            MappedResults::Buckets(_) => &[],
        }
    }

    /// Records; aggregation results yield none.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            MappedResults::Records(records) => records,
            MappedResults::Buckets(_) => Vec::new(),
        }
    }

    pub fn buckets(&self) -> &[Value] {
        match self {
            MappedResults::Records(_) => &[],
            MappedResults::Buckets(buckets) => buckets,
        }
    }
}

/// One page of results with the winning query's total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: MappedResults,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
}

impl Page {
    pub fn last_page(&self) -> u64 {
        if self.per_page == 0 {
            return 1;
        }
        self.total.div_ceil(self.per_page).max(1)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_hits_shapes() {
        assert_eq!(total_hits(&json!({"hits": {"total": {"value": 3}}})), 3);
        assert_eq!(total_hits(&json!({"hits": {"total": 7}})), 7);
        assert_eq!(total_hits(&json!({"hits": {}})), 0);
        assert_eq!(total_hits(&json!([])), 0);
    }

    #[test]
    fn test_hits_and_ids() {
        let response = SearchResponse {
            body: json!({"hits": {"total": 2, "hits": [
                {"_index": "a", "_id": "1", "_source": {"id": 1}},
                {"_index": "b", "_id": 2},
            ]}}),
            payload: None,
        };
        let hits = response.hits();
        assert_eq!(hits[0].index.as_deref(), Some("a"));
        assert_eq!(hits[1].source, Map::new());
        assert_eq!(response.ids(), vec!["1", "2"]);
    }

    #[test]
    fn test_last_page() {
        let page = |total, per_page, current_page| Page {
            items: MappedResults::default(),
            total,
            per_page,
            current_page,
        };
        assert_eq!(page(0, 15, 1).last_page(), 1);
        assert_eq!(page(45, 15, 1).last_page(), 3);
        assert_eq!(page(46, 15, 3).last_page(), 4);
        assert!(page(46, 15, 3).has_more_pages());
        assert!(!page(45, 15, 3).has_more_pages());
    }
}
