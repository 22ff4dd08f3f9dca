// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for elastic-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `elastic_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: search, count, index, delete, exists, create, put_mapping
//! - `status`: success, error, skipped

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

// ═══════════════════════════════════════════════════════════════════════════
// SEARCH - executor traffic
// ═══════════════════════════════════════════════════════════════════════════

/// Record one search/count execution (all payloads of one builder)
pub fn record_search(operation: &str, status: &str) {
    counter!(
        "elastic_sync_searches_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record search latency
pub fn record_search_latency(operation: &str, duration: Duration) {
    histogram!(
        "elastic_sync_search_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Number of payloads the compiler produced for one builder
pub fn record_payloads_compiled(count: usize) {
    histogram!("elastic_sync_payloads_compiled").record(count as f64);
}

/// Record whether an executed payload produced results
pub fn record_rule_outcome(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!(
        "elastic_sync_rule_payloads_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the backend total of the winning response
pub fn record_search_results(total: u64) {
    histogram!("elastic_sync_search_results").record(total as f64);
}

/// Record a bypassed search (builder callback)
pub fn record_search_callback() {
    counter!("elastic_sync_search_callbacks_total").increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════
// RELATIONS & EXPAND CACHE
// ═══════════════════════════════════════════════════════════════════════════

/// Record one eager-load sub-query
pub fn record_eager_load(relation: &str, keys: usize) {
    counter!(
        "elastic_sync_eager_loads_total",
        "relation" => relation.to_string()
    )
    .increment(1);
    histogram!("elastic_sync_eager_load_keys").record(keys as f64);
}

/// Record expand cache hit/miss
pub fn record_expand_cache(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!(
        "elastic_sync_expand_cache_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Set expand cache entry count
pub fn set_expand_cache_entries(entries: usize) {
    gauge!("elastic_sync_expand_cache_entries").set(entries as f64);
}

// ═══════════════════════════════════════════════════════════════════════════
// WRITES & INDEX LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════

/// Record a document write (index/delete)
pub fn record_document_write(operation: &str, status: &str) {
    counter!(
        "elastic_sync_document_writes_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record index exists/create/put_mapping calls
pub fn record_lifecycle_operation(operation: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "elastic_sync_index_operations_total",
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record one resync chunk
pub fn record_resync_chunk(table: &str, records: usize) {
    counter!(
        "elastic_sync_resync_records_total",
        "table" => table.to_string()
    )
    .increment(records as u64);
}

/// A timing guard that records search latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_search_latency(self.operation, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests verify the API compiles and doesn't panic.
    // No recorder is installed, so every call is a no-op.

    #[test]
    fn test_search_metrics() {
        record_search("search", "success");
        record_search("count", "error");
        record_search_latency("search", Duration::from_micros(500));
        record_payloads_compiled(3);
        record_rule_outcome(true);
        record_rule_outcome(false);
        record_search_results(42);
        record_search_callback();
    }

    #[test]
    fn test_relation_and_cache_metrics() {
        record_eager_load("posts", 3);
        record_expand_cache(true);
        record_expand_cache(false);
        set_expand_cache_entries(10);
    }

    #[test]
    fn test_write_metrics() {
        record_document_write("index", "success");
        record_document_write("index", "skipped");
        record_document_write("delete", "error");
        record_lifecycle_operation("create", true);
        record_lifecycle_operation("exists", false);
        record_resync_chunk("users", 100);
    }

    #[test]
    fn test_latency_timer() {
        {
            let _timer = LatencyTimer::new("search");
            std::thread::sleep(Duration::from_micros(10));
        }
        // Timer recorded on drop
    }
}
