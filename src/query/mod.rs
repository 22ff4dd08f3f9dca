// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Construction
//!
//! ```text
//! QueryBuilder ──► ConditionSet { must, must_not, should }
//!      │                  └─ ConditionNode = Leaf(ConditionClause) | Bool { occur, children }
//!      └─► rules: [RuleVariant] ──► query.bool fragments (free-text mode)
//! ```

pub mod builder;
pub mod condition;
pub mod rules;

pub use builder::{
    CallbackFuture, Constraint, EagerLoad, QueryBuilder, SearchCallback, SortDirection,
    DEFAULT_AGG_NAME, DEFAULT_AGG_TYPE, DEFAULT_GEO_RELATION, DEFAULT_REGEXP_FLAGS,
    SOFT_DELETE_FIELD,
};
pub use condition::{Bucket, ConditionClause, ConditionNode, ConditionSet, Operator, RangeBounds};
pub use rules::{QueryStringRule, RuleFn, RuleVariant, SearchRule};
