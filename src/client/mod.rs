// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search backend clients.
//!
//! [`SearchClient`] is the seam to the wire: [`HttpClient`] talks to a real
//! cluster over REST, [`InMemoryClient`] keeps everything in process for
//! tests and local development.

pub mod http;
pub mod memory;
pub mod traits;

pub use http::HttpClient;
pub use memory::{InMemoryClient, RecordedRequest};
pub use traits::{ElasticError, SearchClient};
