//! Scalar and multi-row subqueries over a nested plan

use crate::common::error::{RefractError, RefractResult};
use crate::execution::{collect_rows, ExecutionContext, QueryPlanRef};
use crate::expression::shape::check_arity;
use crate::expression::{Expression, ExpressionRef};
use crate::types::{LogicalType, Row, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A nested query used as a value.
///
/// The plan resolves outer columns by index against a scope row of
/// `scope_len` columns. The row handed to `evaluate` may be shorter than
/// that; it is padded with NULLs so the plan's indexes stay valid.
#[derive(Debug, Clone)]
pub struct Subquery {
    plan: QueryPlanRef,
    scope_len: usize,
    return_type: LogicalType,
}

impl Subquery {
    pub fn new(plan: QueryPlanRef, scope_len: usize, return_type: LogicalType) -> Self {
        Self {
            plan,
            scope_len,
            return_type,
        }
    }

    pub fn plan(&self) -> &QueryPlanRef {
        &self.plan
    }

    pub fn scope_len(&self) -> usize {
        self.scope_len
    }

    fn run(&self, ctx: &ExecutionContext, scope: &Row) -> RefractResult<Vec<Row>> {
        ctx.check_cancelled()?;
        let scope = scope.pad_to(self.scope_len);
        tracing::trace!(plan = %self.plan, scope_len = self.scope_len, "running subquery");
        collect_rows(ctx, self.plan.open(ctx, &scope)?)
    }

    /// Run once without an outer row and return every row's first column.
    /// Used by `IN (subquery)`.
    pub fn evaluate_multiple(&self, ctx: &ExecutionContext) -> RefractResult<Vec<Value>> {
        self.run(ctx, &Row::empty())?
            .into_iter()
            .map(|row| row.field(0).cloned())
            .collect()
    }
}

impl fmt::Display for Subquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(subquery: {})", self.plan)
    }
}

impl Expression for Subquery {
    fn return_type(&self) -> LogicalType {
        self.return_type.clone()
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let mut rows = self.run(ctx, row)?;
        match rows.len() {
            0 => Ok(Value::Null),
            1 => rows.swap_remove(0).field(0).cloned(),
            n => {
                tracing::debug!(rows = n, "scalar subquery returned more than one row");
                Err(RefractError::TooManyRows)
            }
        }
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<ExpressionRef> {
        vec![]
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        check_arity(self, &children, 0)?;
        Ok(Arc::new(self.clone()))
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
