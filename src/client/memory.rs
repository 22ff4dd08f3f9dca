//! In-memory search backend.
//!
//! Stores documents per index in a `DashMap`, records every request in
//! arrival order and can replay canned `search`/`count` answers queued per
//! index. Without a queued answer, `search` evaluates the filter section of
//! the request (`term`, `terms`, `match`, `range`, `exists` and nested
//! `bool`) against the stored sources and pages the matches with
//! `from`/`size`; other clause kinds match everything.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::traits::{ignores_not_found, ElasticError, SearchClient};

/// One request as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub operation: &'static str,
    pub request: Value,
}

#[derive(Default)]
pub struct InMemoryClient {
    documents: DashMap<String, BTreeMap<String, Value>>,
    indices: DashMap<String, Value>,
    mappings: DashMap<String, Value>,
    search_answers: DashMap<String, VecDeque<Value>>,
    count_answers: DashMap<String, VecDeque<Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
    fail_exists: AtomicBool,
}

impl InMemoryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next search against `index` with `response`.
    pub fn queue_search(&self, index: &str, response: Value) {
        self.search_answers
            .entry(index.to_string())
            .or_default()
            .push_back(response);
    }

    /// Answer the next count against `index` with `{"count": count}`.
    pub fn queue_count(&self, index: &str, count: u64) {
        self.count_answers
            .entry(index.to_string())
            .or_default()
            .push_back(json!({"count": count}));
    }

    /// Make the index existence probe fail with a transport error.
    pub fn fail_exists_probe(&self, fail: bool) {
        self.fail_exists.store(fail, Ordering::SeqCst);
    }

    /// Store a document directly, bypassing request recording.
    pub fn seed(&self, index: &str, id: &str, source: Value) {
        self.documents
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), source);
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.documents.get(index).and_then(|docs| docs.get(id).cloned())
    }

    #[must_use]
    pub fn document_count(&self, index: &str) -> usize {
        self.documents.get(index).map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.indices.contains_key(index)
    }

    /// Body of the last `indices_create` for `index`.
    pub fn index_settings(&self, index: &str) -> Option<Value> {
        self.indices.get(index).map(|v| v.value().clone())
    }

    /// Body of the last `indices_put_mapping` for `index`.
    pub fn mapping(&self, index: &str) -> Option<Value> {
        self.mappings.get(index).map(|v| v.value().clone())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, operation: &str) -> Vec<Value> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.operation == operation)
            .map(|r| r.request.clone())
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn record(&self, operation: &'static str, request: &Value) {
        self.requests.lock().push(RecordedRequest {
            operation,
            request: request.clone(),
        });
    }

    fn next_answer(answers: &DashMap<String, VecDeque<Value>>, request: &Value) -> Option<Value> {
        let first = target_indices(request).into_iter().next()?;
        answers.get_mut(&first).and_then(|mut queue| queue.pop_front())
    }

    fn matching(&self, request: &Value) -> Vec<(String, String, Value)> {
        let filter = request.pointer("/body/query/bool/filter").cloned();
        let mut hits = Vec::new();
        for index in target_indices(request) {
            if let Some(docs) = self.documents.get(&index) {
                for (id, source) in docs.iter() {
                    let keep = filter
                        .as_ref()
                        .map(|f| clause_matches(f, source))
                        .unwrap_or(true);
                    if keep {
                        hits.push((index.clone(), id.clone(), source.clone()));
                    }
                }
            }
        }
        hits
    }
}

#[async_trait]
impl SearchClient for InMemoryClient {
    async fn search(&self, request: Value) -> Result<Value, ElasticError> {
        self.record("search", &request);
        if let Some(answer) = Self::next_answer(&self.search_answers, &request) {
            return Ok(answer);
        }

        let matches = self.matching(&request);
        let total = matches.len();
        let from = request
            .pointer("/body/from")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let size = request
            .pointer("/body/size")
            .and_then(Value::as_u64)
            .map(|s| s as usize)
            .unwrap_or(10);

        let hits: Vec<Value> = matches
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(index, id, source)| {
                json!({"_index": index, "_id": id, "_score": 1.0, "_source": source})
            })
            .collect();

        Ok(json!({
            "took": 0,
            "hits": {"total": {"value": total, "relation": "eq"}, "hits": hits},
        }))
    }

    async fn count(&self, request: Value) -> Result<Value, ElasticError> {
        self.record("count", &request);
        if let Some(answer) = Self::next_answer(&self.count_answers, &request) {
            return Ok(answer);
        }
        Ok(json!({"count": self.matching(&request).len()}))
    }

    async fn index(&self, request: Value) -> Result<Value, ElasticError> {
        self.record("index", &request);
        let (index, id) = document_address(&request)?;
        let source = request.get("body").cloned().unwrap_or_else(|| json!({}));
        let created = self
            .documents
            .entry(index.clone())
            .or_default()
            .insert(id.clone(), source)
            .is_none();
        Ok(json!({
            "_index": index,
            "_id": id,
            "result": if created { "created" } else { "updated" },
        }))
    }

    async fn delete(&self, request: Value) -> Result<Value, ElasticError> {
        self.record("delete", &request);
        let (index, id) = document_address(&request)?;
        let removed = self
            .documents
            .get_mut(&index)
            .and_then(|mut docs| docs.remove(&id))
            .is_some();

        if removed {
            Ok(json!({"_index": index, "_id": id, "result": "deleted"}))
        } else if ignores_not_found(&request) {
            Ok(json!({"_index": index, "_id": id, "result": "not_found"}))
        } else {
            Err(ElasticError::NotFound)
        }
    }

    async fn indices_exists(&self, request: Value) -> Result<bool, ElasticError> {
        self.record("indices_exists", &request);
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(ElasticError::Transport("connection refused".into()));
        }
        Ok(target_indices(&request)
            .iter()
            .all(|index| self.indices.contains_key(index)))
    }

    async fn indices_create(&self, request: Value) -> Result<Value, ElasticError> {
        self.record("indices_create", &request);
        let targets = target_indices(&request);
        if let Some(existing) = targets.iter().find(|index| self.indices.contains_key(*index)) {
            return Err(ElasticError::Backend(format!(
                "400: resource_already_exists_exception: index [{}] already exists",
                existing
            )));
        }
        let body = request.get("body").cloned().unwrap_or_else(|| json!({}));
        for index in targets {
            self.indices.insert(index, body.clone());
        }
        Ok(json!({"acknowledged": true}))
    }

    async fn indices_put_mapping(&self, request: Value) -> Result<Value, ElasticError> {
        self.record("indices_put_mapping", &request);
        let body = request.get("body").cloned().unwrap_or_else(|| json!({}));
        for index in target_indices(&request) {
            self.mappings.insert(index, body.clone());
        }
        Ok(json!({"acknowledged": true}))
    }
}

fn target_indices(request: &Value) -> Vec<String> {
    match request.get("index") {
        Some(Value::String(index)) => vec![index.clone()],
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn document_address(request: &Value) -> Result<(String, String), ElasticError> {
    let index = target_indices(request)
        .into_iter()
        .next()
        .ok_or_else(|| ElasticError::Malformed("request has no index".into()))?;
    let id = request
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| ElasticError::Malformed("request has no id".into()))?;
    Ok((index, id.to_string()))
}

/// Evaluate one query clause against a document source.
fn clause_matches(clause: &Value, source: &Value) -> bool {
    let Some((kind, spec)) = clause.as_object().and_then(|o| o.iter().next()) else {
        return true;
    };
    let field_spec = spec.as_object().and_then(|o| o.iter().next());

    match kind.as_str() {
        "bool" => bool_matches(spec, source),
        "term" => field_spec
            .map(|(field, value)| loose_eq(field_value(source, field), value))
            .unwrap_or(true),
        "terms" => field_spec
            .map(|(field, values)| {
                let actual = field_value(source, field);
                values
                    .as_array()
                    .map(|vs| vs.iter().any(|v| loose_eq(actual, v)))
                    .unwrap_or(false)
            })
            .unwrap_or(true),
        "match" => field_spec
            .map(|(field, value)| match (field_value(source, field), value) {
                (Some(Value::String(actual)), Value::String(wanted)) => {
                    actual.to_lowercase().contains(&wanted.to_lowercase())
                }
                (actual, wanted) => loose_eq(actual, wanted),
            })
            .unwrap_or(true),
        "exists" => spec
            .get("field")
            .and_then(Value::as_str)
            .map(|field| !matches!(field_value(source, field), None | Some(Value::Null)))
            .unwrap_or(true),
        "range" => field_spec
            .map(|(field, bounds)| range_matches(field_value(source, field), bounds))
            .unwrap_or(true),
        _ => true,
    }
}

fn bool_matches(spec: &Value, source: &Value) -> bool {
    let clauses = |key: &str| -> Vec<Value> {
        match spec.get(key) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Object(_)) => spec.get(key).cloned().into_iter().collect(),
            _ => Vec::new(),
        }
    };

    let must = clauses("must");
    let filter = clauses("filter");
    let must_not = clauses("must_not");
    let should = clauses("should");

    must.iter().chain(filter.iter()).all(|c| clause_matches(c, source))
        && !must_not.iter().any(|c| clause_matches(c, source))
        && (should.is_empty() || should.iter().any(|c| clause_matches(c, source)))
}

fn range_matches(actual: Option<&Value>, bounds: &Value) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let compare = |key: &str, ok: fn(std::cmp::Ordering) -> bool| -> bool {
        match bounds.get(key) {
            None => true,
            Some(bound) => order(actual, bound).map(ok).unwrap_or(false),
        }
    };
    compare("gt", |o| o.is_gt())
        && compare("gte", |o| o.is_ge())
        && compare("lt", |o| o.is_lt())
        && compare("lte", |o| o.is_le())
}

fn order(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => Some(x.cmp(y)),
            _ => None,
        },
    }
}

fn field_value<'a>(source: &'a Value, field: &str) -> Option<&'a Value> {
    let path = format!("/{}", field.replace('.', "/"));
    source.pointer(&path).or_else(|| source.get(field))
}

/// `1` matches `"1"`; keys often arrive as strings.
fn loose_eq(actual: Option<&Value>, wanted: &Value) -> bool {
    match actual {
        None => false,
        Some(actual) if actual == wanted => true,
        Some(actual) => scalar_string(actual).is_some() && scalar_string(actual) == scalar_string(wanted),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_index_then_search_all() {
        let client = InMemoryClient::new();
        client
            .index(json!({"index": "users_index", "type": "users", "id": "1", "body": {"id": 1}}))
            .await
            .unwrap();
        client
            .index(json!({"index": "users_index", "type": "users", "id": "2", "body": {"id": 2}}))
            .await
            .unwrap();

        let response = client
            .search(json!({"index": "users_index", "body": {"size": 1}}))
            .await
            .unwrap();
        assert_eq!(response["hits"]["total"]["value"], 2);
        assert_eq!(response["hits"]["hits"].as_array().unwrap().len(), 1);
        assert_eq!(client.requests_for("index").len(), 2);
    }

    #[tokio::test]
    async fn test_filter_evaluation() {
        let client = InMemoryClient::new();
        client.seed("p", "1", json!({"id": 1, "user_id": 1, "lang": "en"}));
        client.seed("p", "2", json!({"id": 2, "user_id": 2, "lang": "fr"}));
        client.seed("p", "3", json!({"id": 3, "user_id": 9, "lang": "en"}));

        let response = client
            .search(json!({
                "index": "p",
                "body": {"query": {"bool": {
                    "must": {"match_all": {}},
                    "filter": {"bool": {
                        "must": [{"terms": {"user_id": [1, "2"]}}],
                        "must_not": [{"term": {"lang": "fr"}}],
                    }},
                }}},
            }))
            .await
            .unwrap();
        let hits = response["hits"]["hits"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["_id"], "1");
    }

    #[test]
    fn test_range_and_should() {
        let source = json!({"age": 30, "team": "core"});
        assert!(clause_matches(&json!({"range": {"age": {"gte": 18, "lt": 31}}}), &source));
        assert!(!clause_matches(&json!({"range": {"age": {"gt": 30}}}), &source));
        assert!(clause_matches(
            &json!({"bool": {"should": [{"term": {"team": "infra"}}, {"term": {"team": "core"}}]}}),
            &source
        ));
        assert!(!clause_matches(&json!({"exists": {"field": "email"}}), &source));
    }

    #[tokio::test]
    async fn test_queued_answers_win_in_order() {
        let client = InMemoryClient::new();
        client.queue_search("a", json!({"hits": {"total": {"value": 0}, "hits": []}}));
        client.queue_search("a", json!({"hits": {"total": {"value": 5}, "hits": []}}));
        client.queue_count("a", 7);

        let first = client.search(json!({"index": "a"})).await.unwrap();
        let second = client.search(json!({"index": "a"})).await.unwrap();
        assert_eq!(first["hits"]["total"]["value"], 0);
        assert_eq!(second["hits"]["total"]["value"], 5);
        assert_eq!(client.count(json!({"index": "a"})).await.unwrap()["count"], 7);
    }

    #[tokio::test]
    async fn test_delete_missing_document() {
        let client = InMemoryClient::new();
        let err = client
            .delete(json!({"index": "u", "type": "u", "id": "9"}))
            .await
            .unwrap_err();
        assert_eq!(err, ElasticError::NotFound);

        let ok = client
            .delete(json!({"index": "u", "type": "u", "id": "9", "client": {"ignore": 404}}))
            .await
            .unwrap();
        assert_eq!(ok["result"], "not_found");
    }

    #[tokio::test]
    async fn test_index_lifecycle() {
        let client = InMemoryClient::new();
        assert!(!client.indices_exists(json!({"index": "u"})).await.unwrap());
        client
            .indices_create(json!({"index": "u", "body": {"settings": {"number_of_shards": 1}}}))
            .await
            .unwrap();
        assert!(client.indices_exists(json!({"index": "u"})).await.unwrap());
        assert_eq!(
            client.index_settings("u").unwrap()["settings"]["number_of_shards"],
            1
        );

        client.fail_exists_probe(true);
        assert!(matches!(
            client.indices_exists(json!({"index": "u"})).await,
            Err(ElasticError::Transport(_))
        ));

        assert!(matches!(
            client.indices_create(json!({"index": "u"})).await,
            Err(ElasticError::Backend(_))
        ));
    }
}
