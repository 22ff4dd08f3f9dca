// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search request payload with a typed body.
//!
//! Setters follow "set if not empty" semantics: empty lists, `None`, a
//! `false` flag or a zero score leave the body untouched, so the request
//! only carries what the builder actually asked for.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::envelope::Envelope;
use crate::client::ElasticError;
use crate::query::Bucket;

/// `query` section rendered as `{"bool": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolQuery {
    #[serde(rename = "bool")]
    pub clauses: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collapse {
    pub field: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<BoolQuery>,
    #[serde(rename = "_source", skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse: Option<Collapse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub aggs: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPayload {
    envelope: Envelope,
    body: SearchBody,
}

impl SearchPayload {
    pub fn new(envelope: Envelope) -> Self {
        Self {
            envelope,
            body: SearchBody::default(),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    pub fn body(&self) -> &SearchBody {
        &self.body
    }

    /// Replace `query.bool` with a rule fragment; empty fragments are ignored.
    pub fn set_bool_query(&mut self, fragment: Map<String, Value>) -> &mut Self {
        if !fragment.is_empty() {
            self.body.query = Some(BoolQuery { clauses: fragment });
        }
        self
    }

    /// `query.bool.must.match_all = {}`
    pub fn set_match_all(&mut self) -> &mut Self {
        let mut fragment = Map::new();
        fragment.insert("must".to_string(), json!({"match_all": {}}));
        self.set_bool_query(fragment)
    }

    /// Concatenate clauses onto `query.bool.filter.bool.<bucket>`.
    pub fn merge_filter(&mut self, bucket: Bucket, clauses: Vec<Value>) -> &mut Self {
        let existing = self
            .body
            .query
            .as_ref()
            .and_then(|q| q.clauses.get("filter"))
            .and_then(|f| f.get("bool"))
            .and_then(|b| b.get(bucket.as_str()))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut merged = existing;
        merged.extend(clauses);
        if merged.is_empty() {
            return self;
        }

        let query = self.body.query.get_or_insert_with(BoolQuery::default);
        let filter = query
            .clauses
            .entry("filter")
            .or_insert_with(|| json!({}));
        if !filter.is_object() {
            *filter = json!({});
        }
        if let Some(filter) = filter.as_object_mut() {
            let inner = filter.entry("bool").or_insert_with(|| json!({}));
            if !inner.is_object() {
                *inner = json!({});
            }
            if let Some(inner) = inner.as_object_mut() {
                inner.insert(bucket.as_str().to_string(), Value::Array(merged));
            }
        }
        self
    }

    pub fn set_highlight(&mut self, highlight: Option<Value>) -> &mut Self {
        if let Some(highlight) = highlight.filter(|h| !is_empty_value(h)) {
            self.body.highlight = Some(highlight);
        }
        self
    }

    pub fn set_source(&mut self, fields: &[String]) -> &mut Self {
        if !fields.is_empty() {
            self.body.source = fields.to_vec();
        }
        self
    }

    pub fn set_collapse(&mut self, field: Option<&str>) -> &mut Self {
        if let Some(field) = field.filter(|f| !f.is_empty()) {
            self.body.collapse = Some(Collapse { field: field.to_string() });
        }
        self
    }

    pub fn set_sort(&mut self, sort: &[Value]) -> &mut Self {
        if !sort.is_empty() {
            self.body.sort = sort.to_vec();
        }
        self
    }

    pub fn set_explain(&mut self, explain: bool) -> &mut Self {
        if explain {
            self.body.explain = Some(true);
        }
        self
    }

    pub fn set_profile(&mut self, profile: bool) -> &mut Self {
        if profile {
            self.body.profile = Some(true);
        }
        self
    }

    /// Zero counts as unset.
    pub fn set_min_score(&mut self, score: Option<f64>) -> &mut Self {
        if let Some(score) = score.filter(|s| *s != 0.0) {
            self.body.min_score = Some(score);
        }
        self
    }

    /// Zero is a valid offset.
    pub fn set_from(&mut self, offset: Option<u64>) -> &mut Self {
        if offset.is_some() {
            self.body.from = offset;
        }
        self
    }

    pub fn set_size(&mut self, limit: Option<u64>) -> &mut Self {
        if limit.is_some() {
            self.body.size = limit;
        }
        self
    }

    pub fn set_aggs(&mut self, aggs: &Map<String, Value>) -> &mut Self {
        if !aggs.is_empty() {
            self.body.aggs = aggs.clone();
        }
        self
    }

    /// Full request envelope with `body`.
    pub fn to_request(&self) -> Result<Value, ElasticError> {
        let body = serde_json::to_value(&self.body)
            .map_err(|e| ElasticError::Malformed(format!("cannot encode search body: {}", e)))?;
        let mut request = self.envelope.to_map();
        request.insert("body".to_string(), body);
        Ok(Value::Object(request))
    }
}

pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSchema;

    fn payload() -> SearchPayload {
        SearchPayload::new(Envelope::for_type(&ModelSchema::new("users")))
    }

    #[test]
    fn test_match_all_request() {
        let mut payload = payload();
        payload.set_match_all();
        assert_eq!(
            payload.to_request().unwrap(),
            json!({
                "index": "users_index",
                "type": "users",
                "body": {"query": {"bool": {"must": {"match_all": {}}}}},
            })
        );
    }

    #[test]
    fn test_empty_setters_leave_body_untouched() {
        let mut payload = payload();
        payload
            .set_source(&[])
            .set_collapse(None)
            .set_sort(&[])
            .set_explain(false)
            .set_profile(false)
            .set_min_score(Some(0.0))
            .set_from(None)
            .set_size(None)
            .set_aggs(&Map::new())
            .set_highlight(Some(json!({})))
            .set_bool_query(Map::new());
        assert_eq!(payload.body(), &SearchBody::default());
        assert_eq!(payload.to_request().unwrap()["body"], json!({}));
    }

    #[test]
    fn test_zero_offset_is_kept() {
        let mut payload = payload();
        payload.set_from(Some(0)).set_size(Some(0));
        let request = payload.to_request().unwrap();
        assert_eq!(request["body"]["from"], 0);
        assert_eq!(request["body"]["size"], 0);
    }

    #[test]
    fn test_merge_filter_concatenates() {
        let mut payload = payload();
        payload.set_match_all();
        payload.merge_filter(Bucket::Must, vec![json!({"term": {"a": 1}})]);
        payload.merge_filter(Bucket::Must, vec![json!({"term": {"b": 2}})]);
        payload.merge_filter(Bucket::MustNot, vec![]);

        let request = payload.to_request().unwrap();
        assert_eq!(
            request["body"]["query"]["bool"]["filter"]["bool"],
            json!({"must": [{"term": {"a": 1}}, {"term": {"b": 2}}]})
        );
        assert_eq!(request["body"]["query"]["bool"]["must"], json!({"match_all": {}}));
    }

    #[test]
    fn test_merge_filter_onto_rule_fragment_filter() {
        let mut payload = payload();
        let fragment = json!({
            "must": {"match": {"name": "x"}},
            "filter": {"bool": {"must": [{"term": {"lang": "en"}}]}},
        });
        payload.set_bool_query(fragment.as_object().cloned().unwrap());
        payload.merge_filter(Bucket::Must, vec![json!({"term": {"a": 1}})]);

        assert_eq!(
            payload.to_request().unwrap()["body"]["query"]["bool"]["filter"]["bool"]["must"],
            json!([{"term": {"lang": "en"}}, {"term": {"a": 1}}])
        );
    }

    #[test]
    fn test_full_body_field_names() {
        let mut payload = payload();
        payload
            .set_source(&["id".to_string()])
            .set_collapse(Some("group_id"))
            .set_sort(&[json!({"id": "asc"})])
            .set_explain(true)
            .set_profile(true)
            .set_min_score(Some(1.5))
            .set_from(Some(10))
            .set_size(Some(5))
            .set_highlight(Some(json!({"fields": {"name": {}}})));

        let body = &payload.to_request().unwrap()["body"];
        assert_eq!(body["_source"], json!(["id"]));
        assert_eq!(body["collapse"]["field"], "group_id");
        assert_eq!(body["sort"], json!([{"id": "asc"}]));
        assert_eq!(body["explain"], true);
        assert_eq!(body["profile"], true);
        assert_eq!(body["min_score"], 1.5);
        assert_eq!(body["from"], 10);
        assert_eq!(body["size"], 5);
        assert_eq!(body["highlight"], json!({"fields": {"name": {}}}));
    }
}
