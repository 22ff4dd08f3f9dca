// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElasticError {
    /// Programming or setup mistake: missing key, empty mapping, unknown alias,
    /// write to a protected payload key, unknown operator or indexer.
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Search backend error: {0}")]
    Backend(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed backend response: {0}")]
    Malformed(String),
    #[error("Document or index not found")]
    NotFound,
}

impl ElasticError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Wire client for the search backend.
///
/// Every method takes the fully assembled request envelope
/// (`{index, type, id?, body?, ...}`) and returns the decoded JSON answer.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, request: Value) -> Result<Value, ElasticError>;
    async fn count(&self, request: Value) -> Result<Value, ElasticError>;
    async fn index(&self, request: Value) -> Result<Value, ElasticError>;

    /// Delete a document. Implementations honour `client.ignore = 404` by
    /// answering `Ok` for a missing document.
    async fn delete(&self, request: Value) -> Result<Value, ElasticError>;

    async fn indices_exists(&self, request: Value) -> Result<bool, ElasticError>;
    async fn indices_create(&self, request: Value) -> Result<Value, ElasticError>;
    async fn indices_put_mapping(&self, request: Value) -> Result<Value, ElasticError>;
}

/// Whether a request asked for 404 answers to be treated as success.
pub(crate) fn ignores_not_found(request: &Value) -> bool {
    match request.pointer("/client/ignore") {
        Some(Value::Number(n)) => n.as_u64() == Some(404),
        Some(Value::Array(codes)) => codes.iter().any(|c| c.as_u64() == Some(404)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ignores_not_found_scalar_and_list() {
        assert!(ignores_not_found(&json!({"client": {"ignore": 404}})));
        assert!(ignores_not_found(&json!({"client": {"ignore": [400, 404]}})));
        assert!(!ignores_not_found(&json!({"client": {"ignore": 400}})));
        assert!(!ignores_not_found(&json!({"index": "users_index"})));
    }

    #[test]
    fn test_error_display() {
        let err = ElasticError::config("mapping is empty");
        assert_eq!(err.to_string(), "Configuration error: mapping is empty");
    }
}
