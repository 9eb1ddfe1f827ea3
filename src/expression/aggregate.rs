//! Aggregate functions
//!
//! An aggregate keeps no state of its own. The executor asks it for a fresh
//! buffer per group, feeds rows through [`Aggregation::update`], combines
//! partial buffers with [`Aggregation::merge`] and finally calls
//! [`Expression::evaluate`] with the buffer in place of a row. Finalizing
//! never modifies the buffer, so it may be repeated.

use crate::common::constants::{MAX_DECIMAL_PRECISION, MAX_DECIMAL_SCALE};
use crate::common::error::{RefractError, RefractResult};
use crate::execution::ExecutionContext;
use crate::expression::comparison::convert_lenient;
use crate::expression::shape::UnaryExpression;
use crate::expression::{Expression, ExpressionRef, Star};
use crate::types::{LogicalType, Row, Value};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Buffer lifecycle shared by every aggregate
pub trait Aggregation: Expression {
    /// Fresh buffer for one group. Its layout never changes afterwards.
    fn new_buffer(&self) -> RefractResult<Row>;

    /// Accumulate one input row
    fn update(&self, ctx: &ExecutionContext, buffer: &mut Row, row: &Row) -> RefractResult<()>;

    /// Fold a partial buffer produced by the same aggregate into `buffer`
    fn merge(&self, ctx: &ExecutionContext, buffer: &mut Row, partial: &Row) -> RefractResult<()>;
}

/// Shared `Display` and `Expression` plumbing. Each aggregate provides
/// `result_type` and `finalize`.
macro_rules! impl_aggregate_expression {
    ($ty:ident, $name:literal, nullable = $nullable:expr) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($name, "({})"), self.unary.child)
            }
        }

        impl Expression for $ty {
            fn return_type(&self) -> LogicalType {
                self.result_type()
            }

            fn evaluate(&self, ctx: &ExecutionContext, buffer: &Row) -> RefractResult<Value> {
                self.finalize(ctx, buffer)
            }

            fn is_nullable(&self) -> bool {
                $nullable
            }

            fn children(&self) -> Vec<ExpressionRef> {
                self.unary.children()
            }

            fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
                Ok(Arc::new($ty::new(UnaryExpression::child_from(self, children)?)))
            }

            fn as_aggregation(&self) -> Option<&dyn Aggregation> {
                Some(self)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

fn add_decimal(a: Decimal, b: Decimal) -> RefractResult<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| RefractError::OutOfRange("DECIMAL".to_string()))
}

/// COUNT(expr) counts non-NULL values; COUNT(*) counts rows
#[derive(Debug, Clone)]
pub struct Count {
    unary: UnaryExpression,
}

impl Count {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }

    /// COUNT(*)
    pub fn star() -> Self {
        Self::new(Arc::new(Star::new()))
    }

    fn counts_rows(&self) -> bool {
        self.unary.child.as_any().downcast_ref::<Star>().is_some()
    }

    fn result_type(&self) -> LogicalType {
        LogicalType::Integer
    }

    fn finalize(&self, _ctx: &ExecutionContext, buffer: &Row) -> RefractResult<Value> {
        buffer.field(0).cloned()
    }

    fn add(buffer: &mut Row, n: i32) -> RefractResult<()> {
        let current = match buffer.field(0)? {
            Value::Integer(current) => *current,
            other => {
                return Err(RefractError::Internal(format!(
                    "COUNT buffer holds {}",
                    other
                )))
            }
        };
        let next = current
            .checked_add(n)
            .ok_or_else(|| RefractError::OutOfRange("INT".to_string()))?;
        buffer.set(0, Value::Integer(next))
    }
}

impl Aggregation for Count {
    fn new_buffer(&self) -> RefractResult<Row> {
        Ok(Row::new(vec![Value::Integer(0)]))
    }

    fn update(&self, ctx: &ExecutionContext, buffer: &mut Row, row: &Row) -> RefractResult<()> {
        if self.counts_rows() || !self.unary.child.evaluate(ctx, row)?.is_null() {
            Self::add(buffer, 1)?;
        }
        Ok(())
    }

    fn merge(&self, _ctx: &ExecutionContext, buffer: &mut Row, partial: &Row) -> RefractResult<()> {
        match partial.field(0)? {
            Value::Integer(n) => Self::add(buffer, *n),
            other => Err(RefractError::Internal(format!(
                "COUNT partial holds {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COUNT({})", self.unary.child)
    }
}

impl Expression for Count {
    fn return_type(&self) -> LogicalType {
        self.result_type()
    }

    fn evaluate(&self, ctx: &ExecutionContext, buffer: &Row) -> RefractResult<Value> {
        self.finalize(ctx, buffer)
    }

    fn is_nullable(&self) -> bool {
        false
    }

    // COUNT(*) is resolved even though `*` alone is not
    fn resolved(&self) -> bool {
        self.counts_rows() || self.unary.resolved()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        Ok(Arc::new(Count::new(UnaryExpression::child_from(self, children)?)))
    }

    fn as_aggregation(&self) -> Option<&dyn Aggregation> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Keep whichever of the slot and `candidate` compares as `keep` under `ty`
fn keep_extreme(
    ty: &LogicalType,
    buffer: &mut Row,
    candidate: Value,
    keep: Ordering,
) -> RefractResult<()> {
    if candidate.is_null() {
        return Ok(());
    }
    let current = buffer.field(0)?;
    if current.is_null() || ty.compare(&candidate, current)? == keep {
        buffer.set(0, candidate)?;
    }
    Ok(())
}

/// MIN(expr); NULL inputs are ignored
#[derive(Debug, Clone)]
pub struct Min {
    unary: UnaryExpression,
}

impl Min {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }

    fn result_type(&self) -> LogicalType {
        self.unary.child.return_type()
    }

    fn finalize(&self, _ctx: &ExecutionContext, buffer: &Row) -> RefractResult<Value> {
        buffer.field(0).cloned()
    }
}

impl Aggregation for Min {
    fn new_buffer(&self) -> RefractResult<Row> {
        Ok(Row::nulls(1))
    }

    fn update(&self, ctx: &ExecutionContext, buffer: &mut Row, row: &Row) -> RefractResult<()> {
        let value = self.unary.child.evaluate(ctx, row)?;
        keep_extreme(&self.result_type(), buffer, value, Ordering::Less)
    }

    fn merge(&self, _ctx: &ExecutionContext, buffer: &mut Row, partial: &Row) -> RefractResult<()> {
        keep_extreme(&self.result_type(), buffer, partial.field(0)?.clone(), Ordering::Less)
    }
}

impl_aggregate_expression!(Min, "MIN", nullable = true);

/// MAX(expr); NULL inputs are ignored
#[derive(Debug, Clone)]
pub struct Max {
    unary: UnaryExpression,
}

impl Max {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }

    fn result_type(&self) -> LogicalType {
        self.unary.child.return_type()
    }

    fn finalize(&self, _ctx: &ExecutionContext, buffer: &Row) -> RefractResult<Value> {
        buffer.field(0).cloned()
    }
}

impl Aggregation for Max {
    fn new_buffer(&self) -> RefractResult<Row> {
        Ok(Row::nulls(1))
    }

    fn update(&self, ctx: &ExecutionContext, buffer: &mut Row, row: &Row) -> RefractResult<()> {
        let value = self.unary.child.evaluate(ctx, row)?;
        keep_extreme(&self.result_type(), buffer, value, Ordering::Greater)
    }

    fn merge(&self, _ctx: &ExecutionContext, buffer: &mut Row, partial: &Row) -> RefractResult<()> {
        keep_extreme(&self.result_type(), buffer, partial.field(0)?.clone(), Ordering::Greater)
    }
}

impl_aggregate_expression!(Max, "MAX", nullable = true);

/// AVG(expr). The buffer holds a running sum and a row count so partial
/// averages merge without loss. The sum is exact for integer and decimal
/// inputs and a DOUBLE for everything else.
#[derive(Debug, Clone)]
pub struct Avg {
    unary: UnaryExpression,
}

impl Avg {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }

    fn result_type(&self) -> LogicalType {
        LogicalType::Double
    }

    /// Type of the running sum
    fn sum_type(&self) -> LogicalType {
        let child = self.unary.child.return_type();
        if child.is_integral() || child.is_decimal() || child.is_null() {
            LogicalType::decimal_unbounded()
        } else {
            LogicalType::Double
        }
    }

    fn count(buffer: &Row) -> RefractResult<i64> {
        buffer.field(1)?.try_as_i64()
    }

    fn accumulate(buffer: &mut Row, sum: &Value, count: i64) -> RefractResult<()> {
        let count = Self::count(buffer)?
            .checked_add(count)
            .ok_or_else(|| RefractError::OutOfRange("BIGINT".to_string()))?;
        let total = match (buffer.field(0)?, sum) {
            (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
            (current, sum) => Value::Decimal(add_decimal(
                current.try_as_decimal()?,
                sum.try_as_decimal()?,
            )?),
        };
        buffer.set(0, total)?;
        buffer.set(1, Value::BigInt(count))
    }

    fn finalize(&self, _ctx: &ExecutionContext, buffer: &Row) -> RefractResult<Value> {
        let count = Self::count(buffer)?;
        if count == 0 {
            return Ok(Value::Null);
        }
        let avg = match buffer.field(0)? {
            Value::Double(sum) => Some(sum / count as f64),
            sum => sum
                .try_as_decimal()?
                .checked_div(Decimal::from(count))
                .and_then(|d| d.to_f64()),
        };
        avg.map(Value::Double)
            .ok_or_else(|| RefractError::OutOfRange("DOUBLE".to_string()))
    }
}

impl Aggregation for Avg {
    fn new_buffer(&self) -> RefractResult<Row> {
        Ok(Row::new(vec![self.sum_type().zero(), Value::BigInt(0)]))
    }

    fn update(&self, ctx: &ExecutionContext, buffer: &mut Row, row: &Row) -> RefractResult<()> {
        let value = self.unary.child.evaluate(ctx, row)?;
        if value.is_null() {
            return Ok(());
        }
        let value = convert_lenient(ctx, &self.sum_type(), &value)?;
        Self::accumulate(buffer, &value, 1)
    }

    fn merge(&self, _ctx: &ExecutionContext, buffer: &mut Row, partial: &Row) -> RefractResult<()> {
        let count = Self::count(partial)?;
        Self::accumulate(buffer, partial.field(0)?, count)
    }
}

impl_aggregate_expression!(Avg, "AVG", nullable = true);

/// SUM(expr): exact for integer and decimal inputs, DOUBLE otherwise.
/// NULL when every input was NULL.
#[derive(Debug, Clone)]
pub struct Sum {
    unary: UnaryExpression,
}

impl Sum {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }

    fn result_type(&self) -> LogicalType {
        let child = self.unary.child.return_type();
        if child.is_integral() || child.is_decimal() || child.is_null() {
            LogicalType::decimal(MAX_DECIMAL_PRECISION, child.scale().min(MAX_DECIMAL_SCALE))
        } else {
            LogicalType::Double
        }
    }

    fn add(&self, ctx: &ExecutionContext, buffer: &mut Row, value: &Value) -> RefractResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let ty = self.result_type();
        let value = convert_lenient(ctx, &ty, value)?;
        let total = match (buffer.field(0)?.clone(), value) {
            (Value::Null, value) => value,
            (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
            (current, value) => Value::Decimal(add_decimal(
                current.try_as_decimal()?,
                value.try_as_decimal()?,
            )?),
        };
        buffer.set(0, total)
    }

    fn finalize(&self, _ctx: &ExecutionContext, buffer: &Row) -> RefractResult<Value> {
        buffer.field(0).cloned()
    }
}

impl Aggregation for Sum {
    fn new_buffer(&self) -> RefractResult<Row> {
        Ok(Row::nulls(1))
    }

    fn update(&self, ctx: &ExecutionContext, buffer: &mut Row, row: &Row) -> RefractResult<()> {
        let value = self.unary.child.evaluate(ctx, row)?;
        self.add(ctx, buffer, &value)
    }

    fn merge(&self, ctx: &ExecutionContext, buffer: &mut Row, partial: &Row) -> RefractResult<()> {
        self.add(ctx, buffer, partial.field(0)?)
    }
}

impl_aggregate_expression!(Sum, "SUM", nullable = true);

/// FIRST(expr): the first non-NULL value seen; later values never replace it
#[derive(Debug, Clone)]
pub struct First {
    unary: UnaryExpression,
}

impl First {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }

    fn result_type(&self) -> LogicalType {
        self.unary.child.return_type()
    }

    fn finalize(&self, _ctx: &ExecutionContext, buffer: &Row) -> RefractResult<Value> {
        buffer.field(0).cloned()
    }

    fn capture(buffer: &mut Row, value: Value) -> RefractResult<()> {
        if buffer.field(0)?.is_null() {
            buffer.set(0, value)?;
        }
        Ok(())
    }
}

impl Aggregation for First {
    fn new_buffer(&self) -> RefractResult<Row> {
        Ok(Row::nulls(1))
    }

    fn update(&self, ctx: &ExecutionContext, buffer: &mut Row, row: &Row) -> RefractResult<()> {
        if !buffer.field(0)?.is_null() {
            return Ok(());
        }
        let value = self.unary.child.evaluate(ctx, row)?;
        Self::capture(buffer, value)
    }

    fn merge(&self, _ctx: &ExecutionContext, buffer: &mut Row, partial: &Row) -> RefractResult<()> {
        Self::capture(buffer, partial.field(0)?.clone())
    }
}

impl_aggregate_expression!(First, "FIRST", nullable = true);

/// LAST(expr): the most recent non-NULL value
#[derive(Debug, Clone)]
pub struct Last {
    unary: UnaryExpression,
}

impl Last {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }

    fn result_type(&self) -> LogicalType {
        self.unary.child.return_type()
    }

    fn finalize(&self, _ctx: &ExecutionContext, buffer: &Row) -> RefractResult<Value> {
        buffer.field(0).cloned()
    }

    fn overwrite(buffer: &mut Row, value: Value) -> RefractResult<()> {
        if !value.is_null() {
            buffer.set(0, value)?;
        }
        Ok(())
    }
}

impl Aggregation for Last {
    fn new_buffer(&self) -> RefractResult<Row> {
        Ok(Row::nulls(1))
    }

    fn update(&self, ctx: &ExecutionContext, buffer: &mut Row, row: &Row) -> RefractResult<()> {
        let value = self.unary.child.evaluate(ctx, row)?;
        Self::overwrite(buffer, value)
    }

    fn merge(&self, _ctx: &ExecutionContext, buffer: &mut Row, partial: &Row) -> RefractResult<()> {
        Self::overwrite(buffer, partial.field(0)?.clone())
    }
}

impl_aggregate_expression!(Last, "LAST", nullable = true);
