// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Condition AST
//!
//! Filter conditions are kept as typed clauses grouped into boolean buckets
//! and only rendered to query DSL at compile time.
//!
//! ```text
//! ConditionSet
//!   must     ─┬─ Leaf(term)
//!             └─ Bool { should: [Leaf(term), Leaf(range)] }   ← or_where_group
//!   must_not ─── Leaf(terms)
//!   should   ─── Leaf(term)                                   ← or_where
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::client::ElasticError;

/// Boolean slot a condition is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Must,
    MustNot,
    Should,
}

impl Bucket {
    /// Compile order of the buckets.
    pub const ALL: [Bucket; 3] = [Bucket::Must, Bucket::MustNot, Bucket::Should];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Must => "must",
            Bucket::MustNot => "must_not",
            Bucket::Should => "should",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator accepted by `where_cmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
    /// `!=` and `<>`
    NotEq,
}

impl Operator {
    /// Bucket the resulting clause lands in.
    pub fn bucket(&self) -> Bucket {
        match self {
            Operator::NotEq => Bucket::MustNot,
            _ => Bucket::Must,
        }
    }
}

impl FromStr for Operator {
    type Err = ElasticError;

    fn from_str(op: &str) -> Result<Self, Self::Err> {
        match op {
            "=" => Ok(Operator::Eq),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Gte),
            "<=" => Ok(Operator::Lte),
            "!=" | "<>" => Ok(Operator::NotEq),
            other => Err(ElasticError::config(format!(
                "unsupported comparison operator '{}' (expected =, >, <, >=, <=, != or <>)",
                other
            ))),
        }
    }
}

/// Range bounds; unset bounds are omitted from the DSL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

impl RangeBounds {
    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            gte: Some(low.into()),
            lte: Some(high.into()),
            ..Default::default()
        }
    }

    fn to_value(&self) -> Value {
        let mut bounds = Map::new();
        let pairs = [("gt", &self.gt), ("gte", &self.gte), ("lt", &self.lt), ("lte", &self.lte)];
        for (name, bound) in pairs {
            if let Some(v) = bound {
                bounds.insert(name.to_string(), v.clone());
            }
        }
        Value::Object(bounds)
    }
}

/// One atomic filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionClause {
    Term { field: String, value: Value },
    Terms { field: String, values: Vec<Value> },
    Range { field: String, bounds: RangeBounds },
    Exists { field: String },
    Match { field: String, value: Value },
    Regexp { field: String, value: String, flags: String },
    GeoDistance { field: String, point: Value, distance: Value },
    GeoBoundingBox { field: String, bounding_box: Value },
    GeoPolygon { field: String, points: Vec<Value> },
    GeoShape { field: String, shape: Value, relation: String },
}

impl ConditionClause {
    pub fn field(&self) -> &str {
        match self {
            ConditionClause::Term { field, .. }
            | ConditionClause::Terms { field, .. }
            | ConditionClause::Range { field, .. }
            | ConditionClause::Exists { field }
            | ConditionClause::Match { field, .. }
            | ConditionClause::Regexp { field, .. }
            | ConditionClause::GeoDistance { field, .. }
            | ConditionClause::GeoBoundingBox { field, .. }
            | ConditionClause::GeoPolygon { field, .. }
            | ConditionClause::GeoShape { field, .. } => field,
        }
    }

    /// Query DSL kind (`term`, `range`, `geo_shape`, ...)
    pub fn kind(&self) -> &'static str {
        match self {
            ConditionClause::Term { .. } => "term",
            ConditionClause::Terms { .. } => "terms",
            ConditionClause::Range { .. } => "range",
            ConditionClause::Exists { .. } => "exists",
            ConditionClause::Match { .. } => "match",
            ConditionClause::Regexp { .. } => "regexp",
            ConditionClause::GeoDistance { .. } => "geo_distance",
            ConditionClause::GeoBoundingBox { .. } => "geo_bounding_box",
            ConditionClause::GeoPolygon { .. } => "geo_polygon",
            ConditionClause::GeoShape { .. } => "geo_shape",
        }
    }

    pub fn to_value(&self) -> Value {
        let params = match self {
            ConditionClause::Term { field, value } | ConditionClause::Match { field, value } => {
                single(field, value.clone())
            }
            ConditionClause::Terms { field, values } => single(field, Value::Array(values.clone())),
            ConditionClause::Range { field, bounds } => single(field, bounds.to_value()),
            ConditionClause::Exists { field } => json!({ "field": field }),
            ConditionClause::Regexp { field, value, flags } => {
                single(field, json!({ "value": value, "flags": flags }))
            }
            ConditionClause::GeoDistance { field, point, distance } => {
                let mut params = Map::new();
                params.insert("distance".to_string(), distance.clone());
                params.insert(field.clone(), point.clone());
                Value::Object(params)
            }
            ConditionClause::GeoBoundingBox { field, bounding_box } => {
                single(field, bounding_box.clone())
            }
            ConditionClause::GeoPolygon { field, points } => {
                single(field, json!({ "points": points }))
            }
            ConditionClause::GeoShape { field, shape, relation } => {
                single(field, json!({ "shape": shape, "relation": relation }))
            }
        };
        single(self.kind(), params)
    }
}

/// Leaf clause or boolean combinator over child nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Leaf(ConditionClause),
    Bool { occur: Bucket, children: Vec<ConditionNode> },
}

impl ConditionNode {
    pub fn to_value(&self) -> Value {
        match self {
            ConditionNode::Leaf(clause) => clause.to_value(),
            ConditionNode::Bool { occur, children } => {
                let rendered: Vec<Value> = children.iter().map(ConditionNode::to_value).collect();
                single("bool", single(occur.as_str(), Value::Array(rendered)))
            }
        }
    }
}

impl From<ConditionClause> for ConditionNode {
    fn from(clause: ConditionClause) -> Self {
        ConditionNode::Leaf(clause)
    }
}

impl Serialize for ConditionNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Accumulated conditions, one list per bucket in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSet {
    pub must: Vec<ConditionNode>,
    pub must_not: Vec<ConditionNode>,
    pub should: Vec<ConditionNode>,
}

impl ConditionSet {
    pub fn push(&mut self, bucket: Bucket, node: impl Into<ConditionNode>) {
        self.bucket_mut(bucket).push(node.into());
    }

    pub fn bucket(&self, bucket: Bucket) -> &[ConditionNode] {
        match bucket {
            Bucket::Must => &self.must,
            Bucket::MustNot => &self.must_not,
            Bucket::Should => &self.should,
        }
    }

    pub fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<ConditionNode> {
        match bucket {
            Bucket::Must => &mut self.must,
            Bucket::MustNot => &mut self.must_not,
            Bucket::Should => &mut self.should,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.should.is_empty()
    }

    /// Rendered clauses of one bucket.
    pub fn render(&self, bucket: Bucket) -> Vec<Value> {
        self.bucket(bucket).iter().map(ConditionNode::to_value).collect()
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}
