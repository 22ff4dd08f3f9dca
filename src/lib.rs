//! # Elastic Sync
//!
//! Fluent search over an Elasticsearch-style backend, plus the plumbing that
//! keeps the search index in sync with a system of record.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Query Builder                         │
//! │  • where/or_where/... → must / must_not / should buckets    │
//! │  • sort, paging, _source, collapse, aggs, unions            │
//! │  • free text + ordered search rules                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Payload Compiler                        │
//! │  • one payload per applicable rule (or match_all)           │
//! │  • protected identity: index / type / id                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                    (sequential, first hit wins)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ElasticEngine                         │
//! │  • search / count / paginate / explain / profile            │
//! │  • result mapping, union tagging, eager relations           │
//! │  • document index/delete, lazy index + mapping creation     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                  SearchClient (HTTP / in-memory)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use elastic_sync::{ElasticConfig, ElasticEngine, HttpClient};
//! use elastic_sync::model::{ModelSchema, Record};
//! use elastic_sync::query::Operator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), elastic_sync::ElasticError> {
//!     let config = ElasticConfig::from_env();
//!     let engine = ElasticEngine::new(Arc::new(HttpClient::new(&config)?), &config)?;
//!
//!     let users = Arc::new(
//!         ModelSchema::new("users")
//!             .mapping(json!({"properties": {"name": {"type": "text"}}})),
//!     );
//!
//!     // Index a record (creates the index and mapping on first use)
//!     let ada = Record::from_source(users.clone(), json!({"id": 1, "name": "Ada"}))
//!         .expect("non-empty record");
//!     engine.update(&[&ada]).await?;
//!
//!     // Filter
//!     let adults = engine
//!         .get(&users.query().where_cmp("age", Operator::Gte, 18).order_by("name", "asc"))
//!         .await?;
//!     println!("{} adults", adults.len());
//!
//!     // Free text, paginated
//!     let page = engine.paginate(users.search("ada"), Some(20), 1).await?;
//!     println!("{} total", page.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`query`]: Condition AST, [`QueryBuilder`](query::QueryBuilder) and search rules
//! - [`payload`]: Request envelopes and typed search bodies
//! - [`compiler`]: Builder → payload list
//! - [`engine`]: The [`ElasticEngine`] executor, mapper and index lifecycle
//! - [`indexer`]: Document write strategies
//! - [`model`]: Schemas, records and the [`Searchable`](model::Searchable) trait
//! - [`client`]: Backend clients (HTTP, in-memory)
//! - [`expand`]: Cross-request record cache
//! - [`resync`]: Chunked re-indexing from a system of record

pub mod client;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod expand;
pub mod indexer;
pub mod metrics;
pub mod model;
pub mod payload;
pub mod query;
pub mod resync;

pub use client::{ElasticError, HttpClient, InMemoryClient, SearchClient};
pub use compiler::{PayloadCompiler, SearchOptions};
pub use config::{ElasticConfig, IndexerKind};
pub use engine::{ElasticEngine, MappedResults, MappingMemo, Page, SearchResponse};
pub use expand::ExpandCache;
pub use indexer::{IndexReport, Indexer, SingleIndexer};
pub use metrics::LatencyTimer;
pub use model::{ModelSchema, Record, Searchable, SearchableRecord};
pub use query::{Operator, QueryBuilder, RuleVariant, SearchRule};
pub use resync::{RecordSource, ResyncReport};
