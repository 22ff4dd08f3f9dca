// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Record types and their search schemas.

pub mod record;
pub mod schema;
pub mod searchable;

pub use record::{Record, Relation, SearchableRecord};
pub use schema::{Cardinality, CallbackModel, ModelSchema, RelationDef, DEFAULT_MAX_RELATED, INDEX_SUFFIX};
pub use searchable::Searchable;
