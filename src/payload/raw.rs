// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Untyped-body payload for document writes and index lifecycle calls.

use serde_json::{Map, Value};

use super::envelope::Envelope;
use super::search::is_empty_value;

#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    envelope: Envelope,
    body: Map<String, Value>,
}

impl RawPayload {
    pub fn new(envelope: Envelope) -> Self {
        Self {
            envelope,
            body: Map::new(),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn set_body(&mut self, body: Map<String, Value>) -> &mut Self {
        self.body = body;
        self
    }

    pub fn set_body_key(&mut self, key: &str, value: Value) -> &mut Self {
        self.body.insert(key.to_string(), value);
        self
    }

    pub fn set_body_key_if_not_empty(&mut self, key: &str, value: Value) -> &mut Self {
        if !is_empty_value(&value) {
            self.body.insert(key.to_string(), value);
        }
        self
    }

    /// Request envelope; `body` is omitted when nothing was set.
    pub fn to_request(&self) -> Value {
        let mut request = self.envelope.to_map();
        if !self.body.is_empty() {
            request.insert("body".to_string(), Value::Object(self.body.clone()));
        }
        Value::Object(request)
    }
}
