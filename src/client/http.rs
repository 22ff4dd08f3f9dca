// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! REST client for an Elasticsearch cluster.
//!
//! Request envelopes are routed onto the REST API:
//!
//! ```text
//! search              POST   /{index[,index...]}[/{type}]/_search
//! count               POST   /{index}[/{type}]/_count   (query only)
//! index               PUT    /{index}/{type}/{id}
//! delete              DELETE /{index}/{type}/{id}
//! indices_exists      HEAD   /{index}
//! indices_create      PUT    /{index}
//! indices_put_mapping PUT    /{index}/_mapping/{type}
//! ```
//!
//! Top-level envelope keys other than the identity, `body` and `client`
//! (for example `refresh` or `include_type_name`) become query parameters.
//! Hosts are used round-robin.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::traits::{ignores_not_found, ElasticError, SearchClient};
use crate::config::ElasticConfig;

const ENVELOPE_KEYS: [&str; 5] = ["index", "type", "id", "body", "client"];

pub struct HttpClient {
    client: Client,
    hosts: Vec<String>,
    next_host: AtomicUsize,
}

impl HttpClient {
    pub fn new(config: &ElasticConfig) -> Result<Self, ElasticError> {
        if config.hosts.is_empty() {
            return Err(ElasticError::config("at least one search host must be configured"));
        }
        let hosts = config
            .hosts
            .iter()
            .map(|host| {
                let host = host.trim().trim_end_matches('/');
                if host.starts_with("http://") || host.starts_with("https://") {
                    host.to_string()
                } else {
                    format!("http://{}", host)
                }
            })
            .collect();

        Ok(Self {
            client: Client::new(),
            hosts,
            next_host: AtomicUsize::new(0),
        })
    }

    fn url(&self, path: &str) -> String {
        let slot = self.next_host.fetch_add(1, Ordering::Relaxed) % self.hosts.len();
        format!("{}/{}", self.hosts[slot], path)
    }

    async fn send(
        &self,
        method: Method,
        path: String,
        request: &Value,
        body: Option<&Value>,
    ) -> Result<(StatusCode, String), ElasticError> {
        let url = self.url(&path);
        debug!(%method, %url, "Sending search backend request");

        let mut builder = self.client.request(method, &url).query(&query_params(request));
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ElasticError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ElasticError::Transport(e.to_string()))?;
        Ok((status, text))
    }

    async fn call(
        &self,
        method: Method,
        path: String,
        request: &Value,
        body: Option<&Value>,
    ) -> Result<Value, ElasticError> {
        let (status, text) = self.send(method, path, request, body).await?;

        if status == StatusCode::NOT_FOUND {
            if ignores_not_found(request) {
                return Ok(decode(&text).unwrap_or_else(|_| json!({"found": false})));
            }
            return Err(ElasticError::NotFound);
        }
        if !status.is_success() {
            return Err(ElasticError::Backend(format!("{}: {}", status, text)));
        }
        decode(&text)
    }
}

#[async_trait]
impl SearchClient for HttpClient {
    async fn search(&self, request: Value) -> Result<Value, ElasticError> {
        let path = endpoint_path(&request, "_search")?;
        self.call(Method::POST, path, &request, request.get("body")).await
    }

    async fn count(&self, request: Value) -> Result<Value, ElasticError> {
        let path = endpoint_path(&request, "_count")?;
        let body = request
            .pointer("/body/query")
            .map(|query| json!({"query": query}));
        self.call(Method::POST, path, &request, body.as_ref()).await
    }

    async fn index(&self, request: Value) -> Result<Value, ElasticError> {
        let path = document_path(&request)?;
        self.call(Method::PUT, path, &request, request.get("body")).await
    }

    async fn delete(&self, request: Value) -> Result<Value, ElasticError> {
        let path = document_path(&request)?;
        self.call(Method::DELETE, path, &request, None).await
    }

    async fn indices_exists(&self, request: Value) -> Result<bool, ElasticError> {
        let path = indices(&request)?;
        let (status, text) = self.send(Method::HEAD, path, &request, None).await?;
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(ElasticError::Backend(format!("{}: {}", status, text)))
        }
    }

    async fn indices_create(&self, request: Value) -> Result<Value, ElasticError> {
        let path = indices(&request)?;
        self.call(Method::PUT, path, &request, request.get("body")).await
    }

    async fn indices_put_mapping(&self, request: Value) -> Result<Value, ElasticError> {
        let doc_type = str_field(&request, "type")?;
        let path = format!("{}/_mapping/{}", indices(&request)?, doc_type);
        let body = request
            .pointer(&format!("/body/{}", doc_type))
            .or_else(|| request.get("body"));
        self.call(Method::PUT, path, &request, body).await
    }
}

/// `index` as a comma-joined path segment.
fn indices(request: &Value) -> Result<String, ElasticError> {
    match request.get("index") {
        Some(Value::String(index)) => Ok(index.clone()),
        Some(Value::Array(names)) => {
            let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
            if names.is_empty() {
                return Err(ElasticError::Malformed("empty index list".into()));
            }
            Ok(names.join(","))
        }
        _ => Err(ElasticError::Malformed("request has no index".into())),
    }
}

/// `{index}/{type}/{endpoint}`, or `{index}/{endpoint}` for untyped requests.
fn endpoint_path(request: &Value, endpoint: &str) -> Result<String, ElasticError> {
    let indices = indices(request)?;
    Ok(match request.get("type").and_then(Value::as_str) {
        Some(doc_type) if !doc_type.is_empty() => format!("{}/{}/{}", indices, doc_type, endpoint),
        _ => format!("{}/{}", indices, endpoint),
    })
}

fn document_path(request: &Value) -> Result<String, ElasticError> {
    Ok(format!(
        "{}/{}/{}",
        indices(request)?,
        str_field(request, "type")?,
        str_field(request, "id")?
    ))
}

fn str_field<'a>(request: &'a Value, key: &str) -> Result<&'a str, ElasticError> {
    request
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ElasticError::Malformed(format!("request has no {}", key)))
}

fn query_params(request: &Value) -> Vec<(String, String)> {
    let Some(map) = request.as_object() else {
        return Vec::new();
    };
    map.iter()
        .filter(|(key, _)| !ENVELOPE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn decode(text: &str) -> Result<Value, ElasticError> {
    if text.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(text).map_err(|e| ElasticError::Malformed(e.to_string()))
}
