//! Sort keys and the row comparator used to order materialized rows

use crate::common::error::{RefractError, RefractResult};
use crate::execution::ExecutionContext;
use crate::expression::ExpressionRef;
use crate::types::{Row, Value};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullOrdering {
    #[default]
    NullsFirst,
    NullsLast,
}

/// One ORDER BY key
#[derive(Debug, Clone)]
pub struct SortField {
    pub expr: ExpressionRef,
    pub order: SortOrder,
    pub null_ordering: NullOrdering,
}

impl SortField {
    pub fn new(expr: ExpressionRef, order: SortOrder, null_ordering: NullOrdering) -> Self {
        Self {
            expr,
            order,
            null_ordering,
        }
    }

    /// Ascending with NULLs first, MySQL's default
    pub fn ascending(expr: ExpressionRef) -> Self {
        Self::new(expr, SortOrder::Ascending, NullOrdering::NullsFirst)
    }

    /// Descending with NULLs last, MySQL's default
    pub fn descending(expr: ExpressionRef) -> Self {
        Self::new(expr, SortOrder::Descending, NullOrdering::NullsLast)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let nulls = match self.null_ordering {
            NullOrdering::NullsFirst => "NULLS FIRST",
            NullOrdering::NullsLast => "NULLS LAST",
        };
        write!(f, "{} {} {}", self.expr, order, nulls)
    }
}

/// Compares rows key by key. An evaluation error is latched: every later
/// comparison reports `Equal` and [`Sorter::sort`] returns the error once
/// sorting finishes.
#[derive(Debug)]
pub struct Sorter {
    ctx: ExecutionContext,
    fields: Vec<SortField>,
    last_error: Mutex<Option<RefractError>>,
}

impl Sorter {
    pub fn new(ctx: &ExecutionContext, fields: Vec<SortField>) -> Self {
        Self {
            ctx: ctx.clone(),
            fields,
            last_error: Mutex::new(None),
        }
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    fn latch(&self, err: RefractError) {
        let mut last_error = self.last_error.lock();
        if last_error.is_none() {
            tracing::warn!(error = %err, "sort key evaluation failed, aborting sort");
            *last_error = Some(err);
        }
    }

    fn compare_key(&self, field: &SortField, a: &Row, b: &Row) -> RefractResult<Ordering> {
        let left = field.expr.evaluate(&self.ctx, a)?;
        let right = field.expr.evaluate(&self.ctx, b)?;

        let nulls_first = field.null_ordering == NullOrdering::NullsFirst;
        match (left.is_null(), right.is_null()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) if nulls_first => return Ok(Ordering::Less),
            (true, false) => return Ok(Ordering::Greater),
            (false, true) if nulls_first => return Ok(Ordering::Greater),
            (false, true) => return Ok(Ordering::Less),
            (false, false) => {}
        }

        let (left, right): (&Value, &Value) = match field.order {
            SortOrder::Ascending => (&left, &right),
            SortOrder::Descending => (&right, &left),
        };
        field.expr.return_type().compare(left, right)
    }

    /// Order of `a` relative to `b`
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        if self.last_error.lock().is_some() {
            return Ordering::Equal;
        }
        for field in &self.fields {
            match self.compare_key(field, a, b) {
                Ok(Ordering::Equal) => continue,
                Ok(ordering) => return ordering,
                Err(err) => {
                    self.latch(err);
                    return Ordering::Equal;
                }
            }
        }
        Ordering::Equal
    }

    /// Stable sort of `rows`, failing with the first key evaluation error
    pub fn sort(&self, rows: &mut [Row]) -> RefractResult<()> {
        rows.sort_by(|a, b| self.compare(a, b));
        match self.last_error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Error latched by a previous comparison, if any
    pub fn take_error(&self) -> Option<RefractError> {
        self.last_error.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{field, lit, Arithmetic, ExpressionRef, GetField};
    use crate::row;
    use crate::types::LogicalType;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn a() -> ExpressionRef {
        field(0, LogicalType::Integer, "a")
    }

    fn fixture() -> Vec<Row> {
        vec![row![3i32], row![Value::Null], row![1i32], row![2i32]]
    }

    #[test]
    fn test_ascending_nulls_first() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let mut rows = fixture();
        Sorter::new(&ctx, vec![SortField::ascending(a())]).sort(&mut rows)?;
        assert_eq!(rows, vec![row![Value::Null], row![1i32], row![2i32], row![3i32]]);
        Ok(())
    }

    #[test]
    fn test_descending_keeps_nulls_first_when_asked() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let mut rows = fixture();
        let field = SortField::new(a(), SortOrder::Descending, NullOrdering::NullsFirst);
        Sorter::new(&ctx, vec![field]).sort(&mut rows)?;
        assert_eq!(rows, vec![row![Value::Null], row![3i32], row![2i32], row![1i32]]);

        let mut rows = fixture();
        Sorter::new(&ctx, vec![SortField::descending(a())]).sort(&mut rows)?;
        assert_eq!(rows, vec![row![3i32], row![2i32], row![1i32], row![Value::Null]]);
        Ok(())
    }

    #[test]
    fn test_later_keys_break_ties() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let mut rows = vec![row![1i32, "b"], row![0i32, "z"], row![1i32, "a"]];
        let sorter = Sorter::new(
            &ctx,
            vec![
                SortField::ascending(a()),
                SortField::ascending(field(1, LogicalType::text(), "b")),
            ],
        );
        sorter.sort(&mut rows)?;
        assert_eq!(rows, vec![row![0i32, "z"], row![1i32, "a"], row![1i32, "b"]]);
        Ok(())
    }

    #[test]
    fn test_key_error_aborts_sort() {
        let ctx = ExecutionContext::with_default_session();
        let overflow: ExpressionRef = Arc::new(Arithmetic::plus(
            Arc::new(GetField::new(0, LogicalType::BigInt, "a", false)),
            lit(i64::MAX),
        ));
        let mut rows = vec![row![0i64], row![1i64], row![2i64]];
        let sorter = Sorter::new(&ctx, vec![SortField::ascending(overflow)]);
        assert!(matches!(
            sorter.sort(&mut rows),
            Err(RefractError::OutOfRange(_))
        ));
        assert!(sorter.take_error().is_none());
    }
}
