// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{IndexReport, Indexer};
use crate::client::{ElasticError, SearchClient};
use crate::metrics;
use crate::model::SearchableRecord;
use crate::payload::{Envelope, RawPayload};

/// One backend call per record.
pub struct SingleIndexer {
    client: Arc<dyn SearchClient>,
    document_refresh: Option<String>,
}

impl SingleIndexer {
    pub fn new(client: Arc<dyn SearchClient>, document_refresh: Option<String>) -> Self {
        Self {
            client,
            document_refresh,
        }
    }

    fn document_payload(&self, record: &dyn SearchableRecord) -> Result<RawPayload, ElasticError> {
        let mut payload = RawPayload::new(Envelope::for_document(record)?);
        if let Some(refresh) = &self.document_refresh {
            payload.envelope_mut().set_param("refresh", refresh.as_str())?;
        }
        Ok(payload)
    }
}

#[async_trait]
impl Indexer for SingleIndexer {
    async fn update(&self, records: &[&dyn SearchableRecord]) -> Result<IndexReport, ElasticError> {
        let mut report = IndexReport::default();

        for record in records {
            let projection = record.to_searchable();
            if projection.is_empty() {
                report.skipped += 1;
                metrics::record_document_write("index", "skipped");
                continue;
            }

            let mut payload = self.document_payload(*record)?;
            payload.set_body(projection);

            if let Err(e) = self.client.index(payload.to_request()).await {
                metrics::record_document_write("index", "error");
                return Err(e);
            }
            metrics::record_document_write("index", "success");
            report.indexed += 1;
        }

        debug!(indexed = report.indexed, skipped = report.skipped, "Indexed records");
        Ok(report)
    }

    async fn delete(&self, records: &[&dyn SearchableRecord]) -> Result<IndexReport, ElasticError> {
        let mut report = IndexReport::default();

        for record in records {
            let mut payload = self.document_payload(*record)?;
            payload.envelope_mut().set_client("ignore", 404);

            match self.client.delete(payload.to_request()).await {
                Ok(_) | Err(ElasticError::NotFound) => {
                    metrics::record_document_write("delete", "success");
                    report.indexed += 1;
                }
                Err(e) => {
                    metrics::record_document_write("delete", "error");
                    return Err(e);
                }
            }
        }

        debug!(deleted = report.indexed, "Deleted records");
        Ok(report)
    }
}
