//! Configuration for the search integration.
//!
//! # Example
//!
//! ```
//! use elastic_sync::config::{ElasticConfig, IndexerKind};
//!
//! // Minimal config (uses defaults)
//! let config = ElasticConfig::default();
//! assert_eq!(config.hosts, vec!["localhost:9200".to_string()]);
//! assert!(config.update_mapping);
//!
//! // Full config
//! let config = ElasticConfig {
//!     hosts: vec!["es1:9200".into(), "es2:9200".into()],
//!     update_mapping: false,
//!     document_refresh: Some("wait_for".into()),
//!     ..Default::default()
//! };
//! assert_eq!(config.indexer_kind().unwrap(), IndexerKind::Single);
//! ```

use std::str::FromStr;

use serde::Deserialize;

use crate::client::ElasticError;

/// Configuration for the search integration.
///
/// All fields have sensible defaults; a local single-node cluster works
/// without any configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ElasticConfig {
    /// Backend hosts (e.g., "localhost:9200"), used round-robin
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    /// Push each record type's mapping the first time it is indexed
    #[serde(default = "default_update_mapping")]
    pub update_mapping: bool,

    /// Indexer strategy name
    #[serde(default = "default_indexer")]
    pub indexer: String,

    /// `refresh` parameter applied to every document write (e.g. "wait_for")
    #[serde(default)]
    pub document_refresh: Option<String>,
}

fn default_hosts() -> Vec<String> { vec!["localhost:9200".to_string()] }
fn default_update_mapping() -> bool { true }
fn default_indexer() -> String { "single".to_string() }

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            update_mapping: default_update_mapping(),
            indexer: default_indexer(),
            document_refresh: None,
        }
    }
}

impl ElasticConfig {
    /// Read `ELASTIC_HOST` (comma separated), `ELASTIC_UPDATE_MAPPING`,
    /// `ELASTIC_INDEXER` and `ELASTIC_DOCUMENT_REFRESH`; unset variables keep
    /// their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(hosts) = lookup("ELASTIC_HOST") {
            let hosts: Vec<String> = hosts
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect();
            if !hosts.is_empty() {
                config.hosts = hosts;
            }
        }
        if let Some(flag) = lookup("ELASTIC_UPDATE_MAPPING") {
            config.update_mapping = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "false" | "0" | "no" | "off" | ""
            );
        }
        if let Some(indexer) = lookup("ELASTIC_INDEXER").filter(|s| !s.is_empty()) {
            config.indexer = indexer;
        }
        config.document_refresh = lookup("ELASTIC_DOCUMENT_REFRESH").filter(|s| !s.is_empty());

        config
    }

    pub fn indexer_kind(&self) -> Result<IndexerKind, ElasticError> {
        self.indexer.parse()
    }
}

/// Known indexer strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerKind {
    /// One backend call per record
    Single,
}

impl FromStr for IndexerKind {
    type Err = ElasticError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(IndexerKind::Single),
            other => Err(ElasticError::config(format!("unknown indexer '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ElasticConfig::default();
        assert_eq!(config.hosts, vec!["localhost:9200"]);
        assert!(config.update_mapping);
        assert_eq!(config.indexer, "single");
        assert!(config.document_refresh.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ElasticConfig =
            serde_json::from_str(r#"{"document_refresh": "true"}"#).unwrap();
        assert_eq!(config.hosts, vec!["localhost:9200"]);
        assert_eq!(config.document_refresh.as_deref(), Some("true"));
    }

    #[test]
    fn test_from_lookup() {
        let config = ElasticConfig::from_lookup(lookup(&[
            ("ELASTIC_HOST", "es1:9200, es2:9200"),
            ("ELASTIC_UPDATE_MAPPING", "false"),
            ("ELASTIC_DOCUMENT_REFRESH", "wait_for"),
        ]));
        assert_eq!(config.hosts, vec!["es1:9200", "es2:9200"]);
        assert!(!config.update_mapping);
        assert_eq!(config.indexer, "single");
        assert_eq!(config.document_refresh.as_deref(), Some("wait_for"));
    }

    #[test]
    fn test_empty_lookup_keeps_defaults() {
        let config = ElasticConfig::from_lookup(lookup(&[]));
        assert_eq!(config.hosts, vec!["localhost:9200"]);
        assert!(config.update_mapping);
    }

    #[test]
    fn test_indexer_kind() {
        assert_eq!("Single".parse::<IndexerKind>().unwrap(), IndexerKind::Single);
        assert!(matches!(
            "bulk".parse::<IndexerKind>(),
            Err(ElasticError::Configuration(_))
        ));
    }
}
