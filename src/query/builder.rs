// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Builder
//!
//! Fluent accumulation of filter conditions, sorting, paging, selection,
//! grouping and union state for one search. Every call is a pure state
//! mutation; nothing touches the backend until the builder is handed to
//! [`crate::ElasticEngine`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use elastic_sync::model::ModelSchema;
//! use elastic_sync::query::Operator;
//!
//! let users = Arc::new(ModelSchema::new("users"));
//!
//! let builder = users
//!     .query()
//!     .where_eq("status", "active")
//!     .where_cmp("age", Operator::Gte, 18)
//!     .where_not_in("role", ["banned", "bot"])
//!     .or_where_group(|q| q.where_eq("team", "core").where_eq("team", "infra"))
//!     .order_by("created_at", "desc")
//!     .take(20);
//!
//! assert_eq!(builder.conditions().must.len(), 3);
//! assert_eq!(builder.conditions().must_not.len(), 1);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::condition::{Bucket, ConditionClause, ConditionNode, ConditionSet, Operator, RangeBounds};
use super::rules::RuleVariant;
use crate::client::{ElasticError, SearchClient};
use crate::compiler::SearchOptions;
use crate::model::ModelSchema;

/// Marker attribute for soft-deleted documents.
pub const SOFT_DELETE_FIELD: &str = "__soft_deleted";

pub const DEFAULT_REGEXP_FLAGS: &str = "ALL";
pub const DEFAULT_GEO_RELATION: &str = "INTERSECTS";
pub const DEFAULT_AGG_TYPE: &str = "terms";
pub const DEFAULT_AGG_NAME: &str = "count";

pub type CallbackFuture = Pin<Box<dyn Future<Output = Result<Value, ElasticError>> + Send>>;

/// Raw search escape hatch: receives the client, the free text and the
/// options; its answer is used verbatim as the search response.
pub type SearchCallback =
    dyn Fn(Arc<dyn SearchClient>, Option<String>, SearchOptions) -> CallbackFuture + Send + Sync;

/// Constraint applied to an eager-load sub-query.
pub type Constraint = dyn Fn(QueryBuilder) -> QueryBuilder + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// `"asc"` in any case is ascending, everything else descending.
impl From<&str> for SortDirection {
    fn from(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }
}

/// Relation requested for eager loading.
#[derive(Clone)]
pub struct EagerLoad {
    pub name: String,
    pub constraint: Option<Arc<Constraint>>,
}

impl EagerLoad {
    /// Dotted names are resolved by the parent relation's own query.
    pub fn is_nested(&self) -> bool {
        self.name.contains('.')
    }
}

impl fmt::Debug for EagerLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerLoad")
            .field("name", &self.name)
            .field("constrained", &self.constraint.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct QueryBuilder {
    schema: Arc<ModelSchema>,
    conditions: ConditionSet,
    sort: Vec<Value>,
    select: Vec<String>,
    collapse: Option<String>,
    min_score: Option<f64>,
    offset: Option<u64>,
    limit: Option<u64>,
    group: Map<String, Value>,
    union: Vec<String>,
    eager: Vec<EagerLoad>,
    free_text: Option<String>,
    rules: Vec<RuleVariant>,
    callback: Option<Arc<SearchCallback>>,
    alias: Option<String>,
}

impl QueryBuilder {
    /// Filter builder; soft-delete schemas start with the "not deleted" clause.
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        let soft_delete = schema.uses_soft_delete();
        let mut builder = Self::bare(schema);
        if soft_delete {
            builder
                .conditions
                .push(Bucket::Must, soft_delete_clause(0));
        }
        builder
    }

    /// Free-text builder; compiled through the search rules.
    pub fn free_text(schema: Arc<ModelSchema>, query: impl Into<String>) -> Self {
        let mut builder = Self::new(schema);
        builder.free_text = Some(query.into());
        builder
    }

    fn bare(schema: Arc<ModelSchema>) -> Self {
        Self {
            schema,
            conditions: ConditionSet::default(),
            sort: Vec::new(),
            select: Vec::new(),
            collapse: None,
            min_score: None,
            offset: None,
            limit: None,
            group: Map::new(),
            union: Vec::new(),
            eager: Vec::new(),
            free_text: None,
            rules: Vec::new(),
            callback: None,
            alias: None,
        }
    }

    fn push(mut self, bucket: Bucket, clause: ConditionClause) -> Self {
        self.conditions.push(bucket, clause);
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Conditions
    // ═══════════════════════════════════════════════════════════════════════

    /// `field = value` as a term clause in `must`.
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_cmp(field, Operator::Eq, value)
    }

    pub fn where_cmp(self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        let clause = match op {
            Operator::Eq | Operator::NotEq => ConditionClause::Term { field, value },
            Operator::Gt => range(field, RangeBounds { gt: Some(value), ..Default::default() }),
            Operator::Lt => range(field, RangeBounds { lt: Some(value), ..Default::default() }),
            Operator::Gte => range(field, RangeBounds { gte: Some(value), ..Default::default() }),
            Operator::Lte => range(field, RangeBounds { lte: Some(value), ..Default::default() }),
        };
        self.push(op.bucket(), clause)
    }

    /// String-operator form; unknown operators are rejected.
    pub fn try_where(
        self,
        field: impl Into<String>,
        op: &str,
        value: impl Into<Value>,
    ) -> Result<Self, ElasticError> {
        let op: Operator = op.parse()?;
        Ok(self.where_cmp(field, op, value))
    }

    pub fn where_in<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(Bucket::Must, ConditionClause::Terms { field: field.into(), values })
    }

    pub fn where_not_in<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(Bucket::MustNot, ConditionClause::Terms { field: field.into(), values })
    }

    /// Inclusive range `low <= field <= high`.
    pub fn where_between(
        self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.push(Bucket::Must, range(field.into(), RangeBounds::between(low, high)))
    }

    pub fn where_not_between(
        self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.push(Bucket::MustNot, range(field.into(), RangeBounds::between(low, high)))
    }

    /// Whole-day match using date math rounding (`<date>||/d`).
    pub fn where_date(self, field: impl Into<String>, date: &str) -> Self {
        self.where_between(field, date, format!("{}||/d", date))
    }

    pub fn where_exists(self, field: impl Into<String>) -> Self {
        self.push(Bucket::Must, ConditionClause::Exists { field: field.into() })
    }

    pub fn where_not_exists(self, field: impl Into<String>) -> Self {
        self.push(Bucket::MustNot, ConditionClause::Exists { field: field.into() })
    }

    pub fn where_match(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Bucket::Must, ConditionClause::Match { field: field.into(), value: value.into() })
    }

    pub fn where_not_match(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Bucket::MustNot, ConditionClause::Match { field: field.into(), value: value.into() })
    }

    pub fn where_regexp(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.where_regexp_flags(field, value, DEFAULT_REGEXP_FLAGS)
    }

    pub fn where_regexp_flags(
        self,
        field: impl Into<String>,
        value: impl Into<String>,
        flags: impl Into<String>,
    ) -> Self {
        self.push(
            Bucket::Must,
            ConditionClause::Regexp {
                field: field.into(),
                value: value.into(),
                flags: flags.into(),
            },
        )
    }

    /// `point` is anything the backend accepts as a geo point; `distance` like `"12km"`.
    pub fn where_geo_distance(
        self,
        field: impl Into<String>,
        point: impl Into<Value>,
        distance: impl Into<Value>,
    ) -> Self {
        self.push(
            Bucket::Must,
            ConditionClause::GeoDistance {
                field: field.into(),
                point: point.into(),
                distance: distance.into(),
            },
        )
    }

    pub fn where_geo_bounding_box(self, field: impl Into<String>, bounding_box: Value) -> Self {
        self.push(
            Bucket::Must,
            ConditionClause::GeoBoundingBox { field: field.into(), bounding_box },
        )
    }

    pub fn where_geo_polygon(self, field: impl Into<String>, points: Vec<Value>) -> Self {
        self.push(Bucket::Must, ConditionClause::GeoPolygon { field: field.into(), points })
    }

    pub fn where_geo_shape(self, field: impl Into<String>, shape: Value) -> Self {
        self.where_geo_shape_relation(field, shape, DEFAULT_GEO_RELATION)
    }

    pub fn where_geo_shape_relation(
        self,
        field: impl Into<String>,
        shape: Value,
        relation: impl Into<String>,
    ) -> Self {
        self.push(
            Bucket::Must,
            ConditionClause::GeoShape {
                field: field.into(),
                shape,
                relation: relation.into(),
            },
        )
    }

    /// Plain `should` term.
    pub fn or_where(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Bucket::Should, ConditionClause::Term { field: field.into(), value: value.into() })
    }

    /// Build an independent sub-query over the same type and require at
    /// least one of its `must` conditions.
    pub fn or_where_group<F>(mut self, build: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        let sub = build(Self::bare(Arc::clone(&self.schema)));
        let children = sub.conditions.must;
        self.conditions.push(
            Bucket::Must,
            ConditionNode::Bool { occur: Bucket::Should, children },
        );
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Soft delete
    // ═══════════════════════════════════════════════════════════════════════

    /// Drop the "not deleted" clause; every other condition is kept.
    pub fn with_trashed(mut self) -> Self {
        let not_deleted = ConditionNode::Leaf(soft_delete_clause(0));
        self.conditions.must.retain(|node| *node != not_deleted);
        self
    }

    pub fn only_trashed(self) -> Self {
        self.with_trashed().push(Bucket::Must, soft_delete_clause(1))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Shape of the response
    // ═══════════════════════════════════════════════════════════════════════

    pub fn order_by(mut self, field: impl Into<String>, direction: impl Into<SortDirection>) -> Self {
        let mut entry = Map::new();
        entry.insert(field.into(), Value::String(direction.into().as_str().to_string()));
        self.sort.push(Value::Object(entry));
        self
    }

    /// Append a backend-native sort object as is.
    pub fn order_raw(mut self, sort: Value) -> Self {
        self.sort.push(sort);
        self
    }

    /// `terms` aggregation named `count`.
    pub fn group_by(self, spec: Value) -> Self {
        self.group_by_with(spec, DEFAULT_AGG_TYPE, DEFAULT_AGG_NAME)
    }

    pub fn group_by_with(
        mut self,
        spec: Value,
        agg_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let entry = self
            .group
            .entry(name.into())
            .or_insert_with(|| json!({}));
        if let Value::Object(aggs) = entry {
            aggs.insert(agg_type.into(), spec);
        }
        self
    }

    /// Also search these indices; hits are tagged with their origin index.
    pub fn union<I, S>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.union = indices.into_iter().map(Into::into).collect();
        self
    }

    /// Add fields to `_source`; repeated fields are kept once.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            if !self.select.contains(&field) {
                self.select.push(field);
            }
        }
        self
    }

    pub fn collapse(mut self, field: impl Into<String>) -> Self {
        self.collapse = Some(field.into());
        self
    }

    pub fn min_score(mut self, score: f64) -> Self {
        self.min_score = Some(score);
        self
    }

    pub fn from(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn take(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Relations, rules, escape hatches
    // ═══════════════════════════════════════════════════════════════════════

    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in relations {
            self.eager.push(EagerLoad { name: name.into(), constraint: None });
        }
        self
    }

    pub fn with_constrained<F>(mut self, relation: impl Into<String>, constraint: F) -> Self
    where
        F: Fn(QueryBuilder) -> QueryBuilder + Send + Sync + 'static,
    {
        self.eager.push(EagerLoad {
            name: relation.into(),
            constraint: Some(Arc::new(constraint)),
        });
        self
    }

    /// Rules set on the builder replace the schema's default rules.
    pub fn rule(mut self, rule: RuleVariant) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<dyn SearchClient>, Option<String>, SearchOptions) -> CallbackFuture
            + Send
            + Sync
            + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Target the schema's named alias instead of its index.
    pub fn use_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    pub fn sort(&self) -> &[Value] {
        &self.sort
    }

    pub fn selected(&self) -> &[String] {
        &self.select
    }

    pub fn collapse_field(&self) -> Option<&str> {
        self.collapse.as_deref()
    }

    pub fn get_min_score(&self) -> Option<f64> {
        self.min_score
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn groups(&self) -> &Map<String, Value> {
        &self.group
    }

    pub fn unions(&self) -> &[String] {
        &self.union
    }

    pub fn eager_loads(&self) -> &[EagerLoad] {
        &self.eager
    }

    pub fn free_text_query(&self) -> Option<&str> {
        self.free_text.as_deref()
    }

    pub fn rules(&self) -> &[RuleVariant] {
        &self.rules
    }

    pub fn search_callback(&self) -> Option<&Arc<SearchCallback>> {
        self.callback.as_ref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("table", &self.schema.table())
            .field("conditions", &self.conditions)
            .field("sort", &self.sort)
            .field("select", &self.select)
            .field("collapse", &self.collapse)
            .field("min_score", &self.min_score)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("group", &self.group)
            .field("union", &self.union)
            .field("eager", &self.eager)
            .field("free_text", &self.free_text)
            .field("rules", &self.rules)
            .field("callback", &self.callback.is_some())
            .field("alias", &self.alias)
            .finish()
    }
}

fn range(field: String, bounds: RangeBounds) -> ConditionClause {
    ConditionClause::Range { field, bounds }
}

fn soft_delete_clause(marker: i64) -> ConditionClause {
    ConditionClause::Term {
        field: SOFT_DELETE_FIELD.to_string(),
        value: Value::from(marker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Arc<ModelSchema> {
        Arc::new(ModelSchema::new("users"))
    }

    fn soft_users() -> Arc<ModelSchema> {
        Arc::new(ModelSchema::new("users").soft_delete(true))
    }

    #[test]
    fn test_where_operators_land_in_buckets() {
        let builder = users()
            .query()
            .where_eq("a", 1)
            .where_cmp("b", Operator::Gt, 2)
            .where_cmp("c", Operator::Lt, 3)
            .where_cmp("d", Operator::Gte, 4)
            .where_cmp("e", Operator::Lte, 5)
            .where_cmp("f", Operator::NotEq, 6);

        let must = builder.conditions().render(Bucket::Must);
        assert_eq!(
            must,
            vec![
                json!({"term": {"a": 1}}),
                json!({"range": {"b": {"gt": 2}}}),
                json!({"range": {"c": {"lt": 3}}}),
                json!({"range": {"d": {"gte": 4}}}),
                json!({"range": {"e": {"lte": 5}}}),
            ]
        );
        assert_eq!(
            builder.conditions().render(Bucket::MustNot),
            vec![json!({"term": {"f": 6}})]
        );
    }

    #[test]
    fn test_try_where_rejects_unknown_operator() {
        let result = users().query().try_where("a", "like", "x");
        assert!(matches!(result, Err(ElasticError::Configuration(_))));

        let builder = users().query().try_where("a", "<>", "x").unwrap();
        assert_eq!(builder.conditions().must_not.len(), 1);
    }

    #[test]
    fn test_in_between_date() {
        let builder = users()
            .query()
            .where_in("id", [1, 2])
            .where_not_in("role", ["bot"])
            .where_not_between("age", 0, 17)
            .where_date("created_at", "2024-03-01");

        assert_eq!(
            builder.conditions().render(Bucket::Must),
            vec![
                json!({"terms": {"id": [1, 2]}}),
                json!({"range": {"created_at": {"gte": "2024-03-01", "lte": "2024-03-01||/d"}}}),
            ]
        );
        assert_eq!(
            builder.conditions().render(Bucket::MustNot),
            vec![
                json!({"terms": {"role": ["bot"]}}),
                json!({"range": {"age": {"gte": 0, "lte": 17}}}),
            ]
        );
    }

    #[test]
    fn test_match_exists_regexp_buckets() {
        let builder = users()
            .query()
            .where_match("bio", "rust")
            .where_not_match("bio", "java")
            .where_exists("email")
            .where_not_exists("deleted_at")
            .where_regexp("name", "jo.*");

        let must = builder.conditions().render(Bucket::Must);
        assert_eq!(must.len(), 3);
        assert_eq!(must[2], json!({"regexp": {"name": {"value": "jo.*", "flags": "ALL"}}}));
        assert_eq!(builder.conditions().must_not.len(), 2);
    }

    #[test]
    fn test_geo_shape_default_relation() {
        let builder = users().query().where_geo_shape("zone", json!({"type": "point"}));
        assert_eq!(
            builder.conditions().render(Bucket::Must)[0],
            json!({"geo_shape": {"zone": {"shape": {"type": "point"}, "relation": "INTERSECTS"}}})
        );
    }

    #[test]
    fn test_or_where_scalar_and_group() {
        let builder = users()
            .query()
            .or_where("team", "core")
            .or_where_group(|q| q.where_eq("a", 1).where_cmp("b", Operator::Gt, 2));

        assert_eq!(
            builder.conditions().render(Bucket::Should),
            vec![json!({"term": {"team": "core"}})]
        );
        assert_eq!(
            builder.conditions().render(Bucket::Must),
            vec![json!({"bool": {"should": [
                {"term": {"a": 1}},
                {"range": {"b": {"gt": 2}}},
            ]}})]
        );
    }

    #[test]
    fn test_or_where_group_ignores_soft_delete_seed() {
        let builder = soft_users().query().or_where_group(|q| q.where_eq("a", 1));
        let must = builder.conditions().render(Bucket::Must);
        assert_eq!(must[0], json!({"term": {"__soft_deleted": 0}}));
        assert_eq!(must[1], json!({"bool": {"should": [{"term": {"a": 1}}]}}));
    }

    #[test]
    fn test_soft_delete_seed_and_inverses() {
        let seeded = soft_users().query();
        assert_eq!(
            seeded.conditions().render(Bucket::Must),
            vec![json!({"term": {"__soft_deleted": 0}})]
        );

        let with = soft_users().query().where_eq("a", 1).with_trashed();
        assert_eq!(
            with.conditions().render(Bucket::Must),
            vec![json!({"term": {"a": 1}})]
        );

        let only = soft_users().query().with_trashed().only_trashed();
        let direct = users().query().where_eq(SOFT_DELETE_FIELD, 1);
        assert_eq!(only.conditions(), direct.conditions());
    }

    #[test]
    fn test_with_trashed_keeps_other_soft_delete_terms() {
        let builder = users().query().where_eq(SOFT_DELETE_FIELD, 1).with_trashed();
        assert_eq!(builder.conditions().must.len(), 1);
    }

    #[test]
    fn test_order_select_group_union() {
        let builder = users()
            .query()
            .order_by("name", "ASC")
            .order_by("age", "whatever")
            .order_raw(json!({"_score": {"order": "desc"}}))
            .select(["id", "name"])
            .select(["name", "email"])
            .group_by(json!({"field": "status"}))
            .union(["a_index", "b_index"]);

        assert_eq!(
            builder.sort(),
            &[
                json!({"name": "asc"}),
                json!({"age": "desc"}),
                json!({"_score": {"order": "desc"}}),
            ]
        );
        assert_eq!(builder.selected(), &["id", "name", "email"]);
        assert_eq!(
            Value::Object(builder.groups().clone()),
            json!({"count": {"terms": {"field": "status"}}})
        );
        assert_eq!(builder.unions(), &["a_index", "b_index"]);
    }

    #[test]
    fn test_paging_overwrites() {
        let builder = users().query().from(5).take(10).from(40).take(20);
        assert_eq!(builder.offset(), Some(40));
        assert_eq!(builder.limit(), Some(20));
    }

    #[test]
    fn test_eager_loads() {
        let builder = users()
            .query()
            .with(["posts", "posts.comments"])
            .with_constrained("profile", |q| q.where_eq("public", true));

        let loads = builder.eager_loads();
        assert_eq!(loads.len(), 3);
        assert!(!loads[0].is_nested());
        assert!(loads[1].is_nested());
        assert!(loads[2].constraint.is_some());
    }
}
