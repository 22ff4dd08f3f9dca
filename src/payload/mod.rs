// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request payloads.
//!
//! Every request is an [`Envelope`] (fixed identity plus parameters) with a
//! body. Search requests carry a typed [`SearchBody`]; document and index
//! lifecycle requests carry a raw JSON map.

pub mod envelope;
pub mod raw;
pub mod search;

pub use envelope::{Envelope, IndexTarget, PROTECTED_KEYS};
pub use raw::RawPayload;
pub use search::{BoolQuery, Collapse, SearchBody, SearchPayload};
