// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Payload Compiler
//!
//! Turns one [`QueryBuilder`] into the ordered list of search payloads the
//! executor tries in turn.
//!
//! ```text
//! filter builder ──► [match_all]
//!
//! free text ──► rule 1 ──► payload 1      (object rules that are not
//!           ──► rule 2 ──► payload 2       applicable are skipped)
//!           ──► ...
//!           └─► nothing? ──► [match_all]
//!
//! every payload += _source, collapse, sort, explain, profile, min_score,
//!                  from, size, filter buckets, aggs, unions, alias
//! ```

use tracing::debug;

use crate::client::ElasticError;
use crate::payload::{Envelope, SearchPayload};
use crate::query::{Bucket, QueryBuilder, RuleVariant};

/// Per-execution flags passed to the compiler (and to search callbacks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub explain: bool,
    pub profile: bool,
    /// Take highlight fragments from applicable object rules
    pub highlight: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            explain: false,
            profile: false,
            highlight: true,
        }
    }
}

impl SearchOptions {
    pub fn explain() -> Self {
        Self { explain: true, ..Default::default() }
    }

    pub fn profile() -> Self {
        Self { profile: true, ..Default::default() }
    }

    /// Counting never needs highlighting.
    pub fn count() -> Self {
        Self { highlight: false, ..Default::default() }
    }
}

pub struct PayloadCompiler;

impl PayloadCompiler {
    pub fn compile(
        builder: &QueryBuilder,
        options: &SearchOptions,
    ) -> Result<Vec<SearchPayload>, ElasticError> {
        let schema = builder.schema();
        let mut payloads = Vec::new();

        if builder.free_text_query().is_some() {
            let rules = if builder.rules().is_empty() {
                schema.get_search_rules()
            } else {
                builder.rules()
            };

            for rule in rules {
                let mut payload = SearchPayload::new(Envelope::for_type(schema));
                match rule {
                    RuleVariant::Callable(build) => {
                        payload.set_bool_query(build(builder));
                    }
                    RuleVariant::Object(rule) => {
                        if !rule.is_applicable(builder) {
                            continue;
                        }
                        payload.set_bool_query(rule.build_query_payload(builder));
                        if options.highlight {
                            payload.set_highlight(rule.build_highlight_payload(builder));
                        }
                    }
                }
                payloads.push(payload);
            }
        }

        if payloads.is_empty() {
            let mut payload = SearchPayload::new(Envelope::for_type(schema));
            payload.set_match_all();
            payloads.push(payload);
        }

        for payload in payloads.iter_mut() {
            Self::layer(payload, builder, options)?;
        }

        debug!(
            table = %schema.table(),
            payloads = payloads.len(),
            free_text = builder.free_text_query().is_some(),
            "Compiled search payloads"
        );

        Ok(payloads)
    }

    fn layer(
        payload: &mut SearchPayload,
        builder: &QueryBuilder,
        options: &SearchOptions,
    ) -> Result<(), ElasticError> {
        payload
            .set_source(builder.selected())
            .set_collapse(builder.collapse_field())
            .set_sort(builder.sort())
            .set_explain(options.explain)
            .set_profile(options.profile)
            .set_min_score(builder.get_min_score())
            .set_from(builder.offset())
            .set_size(builder.limit());

        for bucket in Bucket::ALL {
            payload.merge_filter(bucket, builder.conditions().render(bucket));
        }

        payload.set_aggs(builder.groups());

        if let Some(alias) = builder.alias() {
            payload.envelope_mut().use_alias(builder.schema(), alias)?;
        }
        payload.envelope_mut().set_unions(builder.unions());

        Ok(())
    }
}
