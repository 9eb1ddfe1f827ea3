//! Expression system
//!
//! This module provides the expression framework the executor evaluates
//! once per row: literals and field reads, the operator family, casts,
//! aggregates, session-dependent values, subqueries, sort comparators and
//! the bottom-up tree rewriter.
//!
//! Every node is immutable once built. Rewrites go through
//! [`Expression::with_children`] and always return a new node.

pub mod aggregate;
pub mod arithmetic;
pub mod auto_value;
pub mod bit_ops;
pub mod boolean;
pub mod collated;
pub mod comparison;
pub mod convert;
pub mod expression;
pub mod interval;
pub mod match_against;
pub mod shape;
pub mod sort;
pub mod subquery;
pub mod transform;
pub mod variable;

pub use aggregate::*;
pub use arithmetic::*;
pub use auto_value::*;
pub use bit_ops::*;
pub use boolean::*;
pub use collated::*;
pub use comparison::*;
pub use convert::*;
pub use expression::*;
pub use interval::*;
pub use match_against::*;
pub use shape::*;
pub use sort::*;
pub use subquery::*;
pub use transform::*;
pub use variable::*;

use crate::common::error::RefractResult;
use crate::execution::ExecutionContext;
use crate::types::{LogicalType, Row, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Expression reference type
pub type ExpressionRef = Arc<dyn Expression>;

/// Expression trait that all expressions must implement
pub trait Expression: fmt::Debug + fmt::Display + Send + Sync {
    /// Get the return type of this expression. Never depends on row content.
    fn return_type(&self) -> LogicalType;

    /// Evaluate this expression against a single row
    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value>;

    /// Whether evaluation may produce NULL
    fn is_nullable(&self) -> bool;

    /// Whether every reference in this subtree is bound
    fn resolved(&self) -> bool {
        self.children().iter().all(|child| child.resolved())
    }

    /// Child expressions, in evaluation order
    fn children(&self) -> Vec<ExpressionRef>;

    /// Copy of this node over new children. A count that differs from
    /// `children().len()` is an arity error.
    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef>;

    /// Check if this expression is deterministic
    fn is_deterministic(&self) -> bool {
        self.children().iter().all(|child| child.is_deterministic())
    }

    /// Aggregate view of this node, if it is one
    fn as_aggregation(&self) -> Option<&dyn Aggregation> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Evaluate `expr` and coerce the result to a SQL truth value; `None` is NULL
pub fn evaluate_condition(
    ctx: &ExecutionContext,
    expr: &dyn Expression,
    row: &Row,
) -> RefractResult<Option<bool>> {
    match expr.evaluate(ctx, row)? {
        Value::Null => Ok(None),
        value => LogicalType::Boolean
            .convert(&value)?
            .try_as_boolean()
            .map(Some),
    }
}
