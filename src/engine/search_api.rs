//! Search API for ElasticEngine
//!
//! Ordered execution of compiled payloads plus the read helpers built on
//! top of it.
//!
//! # Execution
//!
//! ```text
//! search(builder)
//!       │
//!       ├─→ callback set? → call it, answer verbatim
//!       │
//!       └─→ compile → payload 1 → total > 0? → done
//!                   → payload 2 → total > 0? → done
//!                   → ...       → last answer
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::mapper::ResultMapper;
use super::types::{total_hits, MappedResults, Page, SearchResponse};
use super::ElasticEngine;
use crate::client::ElasticError;
use crate::compiler::{PayloadCompiler, SearchOptions};
use crate::metrics::{self, LatencyTimer};
use crate::model::{ModelSchema, Record};
use crate::payload::{Envelope, RawPayload, SearchPayload};
use crate::query::QueryBuilder;

impl ElasticEngine {
    // ═══════════════════════════════════════════════════════════════════════
    // Raw execution
    // ═══════════════════════════════════════════════════════════════════════

    /// Run the builder's payloads in order and return the first answer with hits.
    pub async fn search(&self, builder: &QueryBuilder) -> Result<SearchResponse, ElasticError> {
        self.perform_search(builder, SearchOptions::default()).await
    }

    /// Same as [`search`](Self::search) with `explain` set on every payload.
    pub async fn explain(&self, builder: &QueryBuilder) -> Result<SearchResponse, ElasticError> {
        self.perform_search(builder, SearchOptions::explain()).await
    }

    /// Same as [`search`](Self::search) with `profile` set on every payload.
    pub async fn profile(&self, builder: &QueryBuilder) -> Result<SearchResponse, ElasticError> {
        self.perform_search(builder, SearchOptions::profile()).await
    }

    pub(crate) async fn perform_search(
        &self,
        builder: &QueryBuilder,
        options: SearchOptions,
    ) -> Result<SearchResponse, ElasticError> {
        let _timer = LatencyTimer::new("search");

        if let Some(callback) = builder.search_callback() {
            metrics::record_search_callback();
            let free_text = builder.free_text_query().map(str::to_string);
            let body = callback(Arc::clone(&self.client), free_text, options).await?;
            return Ok(SearchResponse { body, payload: None });
        }

        let payloads = PayloadCompiler::compile(builder, &options)?;
        metrics::record_payloads_compiled(payloads.len());

        let mut response = SearchResponse::default();
        for (position, payload) in payloads.iter().enumerate() {
            let request = payload.to_request()?;
            let body = match self.client.search(request.clone()).await {
                Ok(body) => body,
                Err(e) => {
                    metrics::record_search("search", "error");
                    return Err(e);
                }
            };

            let total = total_hits(&body);
            debug!(
                table = %builder.schema().table(),
                payload = position,
                total,
                "Search payload executed"
            );
            metrics::record_rule_outcome(total > 0);

            response = SearchResponse {
                body,
                payload: Some(request),
            };
            if total > 0 {
                break;
            }
        }

        metrics::record_search("search", "success");
        metrics::record_search_results(response.total());
        Ok(response)
    }

    /// Count matches, stopping at the first payload with a non-zero count.
    pub async fn count(&self, builder: &QueryBuilder) -> Result<u64, ElasticError> {
        let _timer = LatencyTimer::new("count");
        let payloads = PayloadCompiler::compile(builder, &SearchOptions::count())?;

        let mut count = 0;
        for payload in &payloads {
            let answer = match self.client.count(payload.to_request()?).await {
                Ok(answer) => answer,
                Err(e) => {
                    metrics::record_search("count", "error");
                    return Err(e);
                }
            };
            count = answer
                .get("count")
                .and_then(Value::as_u64)
                .ok_or_else(|| ElasticError::Malformed("count response has no count".into()))?;
            metrics::record_rule_outcome(count > 0);
            if count > 0 {
                break;
            }
        }

        metrics::record_search("count", "success");
        Ok(count)
    }

    /// Search with an arbitrary body against the schema's index and type.
    pub async fn search_raw(
        &self,
        schema: &ModelSchema,
        body: Map<String, Value>,
    ) -> Result<Value, ElasticError> {
        let mut payload = RawPayload::new(Envelope::for_type(schema));
        payload.set_body(body);
        self.client.search(payload.to_request()).await
    }

    /// Compiled payloads without executing them.
    pub fn build_payload(&self, builder: &QueryBuilder) -> Result<Vec<SearchPayload>, ElasticError> {
        PayloadCompiler::compile(builder, &SearchOptions::default())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mapped reads
    // ═══════════════════════════════════════════════════════════════════════

    /// Search, map and eager load.
    pub async fn get(&self, builder: &QueryBuilder) -> Result<MappedResults, ElasticError> {
        let response = self.search(builder).await?;
        self.hydrate(builder, &response).await
    }

    async fn hydrate(
        &self,
        builder: &QueryBuilder,
        response: &SearchResponse,
    ) -> Result<MappedResults, ElasticError> {
        let mut mapped = ResultMapper::map(builder, response);
        if let MappedResults::Records(records) = &mut mapped {
            if !records.is_empty() && !builder.eager_loads().is_empty() {
                self.load_relations(records, builder.eager_loads()).await?;
            }
        }
        Ok(mapped)
    }

    /// `page` is 1-based; `per_page = None` uses the schema's page size.
    /// Paging set on the builder is overwritten. An offset that does not fit
    /// in `u64` is a configuration error.
    pub async fn paginate(
        &self,
        builder: QueryBuilder,
        per_page: Option<u64>,
        page: u64,
    ) -> Result<Page, ElasticError> {
        let per_page = per_page
            .filter(|p| *p > 0)
            .unwrap_or_else(|| builder.schema().get_per_page());
        let page = page.max(1);
        let offset = (page - 1).checked_mul(per_page).ok_or_else(|| {
            ElasticError::config(format!(
                "page {} with {} results per page is out of range",
                page, per_page
            ))
        })?;
        let builder = builder.from(offset).take(per_page);

        let response = self.search(&builder).await?;
        let items = self.hydrate(&builder, &response).await?;

        Ok(Page {
            items,
            total: response.total(),
            per_page,
            current_page: page,
        })
    }

    pub async fn first(&self, builder: &QueryBuilder) -> Result<Option<Record>, ElasticError> {
        let builder = builder.clone().take(1);
        Ok(self.get(&builder).await?.into_records().into_iter().next())
    }

    /// Look a record up by primary key.
    pub async fn find(
        &self,
        schema: &Arc<ModelSchema>,
        id: impl Into<Value>,
    ) -> Result<Option<Record>, ElasticError> {
        let builder = schema.query().where_match(schema.get_key_name(), id);
        self.first(&builder).await
    }

    /// Document ids of the winning response.
    pub async fn keys(&self, builder: &QueryBuilder) -> Result<Vec<String>, ElasticError> {
        Ok(self.search(builder).await?.ids())
    }

    /// Whether the builder maps to at least one result.
    pub async fn exists(&self, builder: &QueryBuilder) -> Result<bool, ElasticError> {
        Ok(!self.get(builder).await?.is_empty())
    }

    /// One attribute of every result; `column` is also added to `_source`.
    pub async fn pluck(&self, builder: &QueryBuilder, column: &str) -> Result<Vec<Value>, ElasticError> {
        let column = strip_qualifier(column);
        let builder = builder.clone().select([column]);
        let records = self.get(&builder).await?.into_records();
        Ok(records
            .iter()
            .map(|record| record.get(column).cloned().unwrap_or(Value::Null))
            .collect())
    }

    /// `(key, column)` pairs of every result in response order.
    pub async fn pluck_keyed(
        &self,
        builder: &QueryBuilder,
        column: &str,
        key: &str,
    ) -> Result<Vec<(String, Value)>, ElasticError> {
        let column = strip_qualifier(column);
        let key = strip_qualifier(key);
        let builder = builder.clone().select([column, key]);
        let records = self.get(&builder).await?.into_records();
        Ok(records
            .iter()
            .filter_map(|record| {
                let key = record.get(key).and_then(crate::model::record::key_string)?;
                Some((key, record.get(column).cloned().unwrap_or(Value::Null)))
            })
            .collect())
    }
}

/// `table.column` and `column as alias` both pluck `column`/`alias`.
fn strip_qualifier(column: &str) -> &str {
    column
        .rsplit(['.', ' '])
        .next()
        .unwrap_or(column)
}
