//! Structural helpers shared by concrete expressions
//!
//! Concrete nodes embed one of these by value and forward `children`,
//! `resolved` and `is_nullable` to it.

use crate::common::error::{RefractError, RefractResult};
use crate::execution::ExecutionContext;
use crate::expression::ExpressionRef;
use crate::types::{Row, Value};
use std::fmt;

/// Fail with an arity error unless exactly `expected` children were passed
pub fn check_arity(
    expr: &dyn fmt::Display,
    children: &[ExpressionRef],
    expected: usize,
) -> RefractResult<()> {
    if children.len() != expected {
        return Err(RefractError::invalid_children(expr, children.len(), expected));
    }
    Ok(())
}

/// A node with exactly one child
#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub child: ExpressionRef,
}

impl UnaryExpression {
    pub fn new(child: ExpressionRef) -> Self {
        Self { child }
    }

    pub fn children(&self) -> Vec<ExpressionRef> {
        vec![self.child.clone()]
    }

    pub fn resolved(&self) -> bool {
        self.child.resolved()
    }

    pub fn is_nullable(&self) -> bool {
        self.child.is_nullable()
    }

    /// Take the single child out of a `with_children` argument list
    pub fn child_from(
        expr: &dyn fmt::Display,
        children: Vec<ExpressionRef>,
    ) -> RefractResult<ExpressionRef> {
        check_arity(expr, &children, 1)?;
        children
            .into_iter()
            .next()
            .ok_or_else(|| RefractError::invalid_children(expr, 0, 1))
    }
}

/// A node with a left and a right child
#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub left: ExpressionRef,
    pub right: ExpressionRef,
}

impl BinaryExpression {
    pub fn new(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self { left, right }
    }

    pub fn children(&self) -> Vec<ExpressionRef> {
        vec![self.left.clone(), self.right.clone()]
    }

    pub fn resolved(&self) -> bool {
        self.left.resolved() && self.right.resolved()
    }

    pub fn is_nullable(&self) -> bool {
        self.left.is_nullable() || self.right.is_nullable()
    }

    /// Evaluate left, then right
    pub fn evaluate_both(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<(Value, Value)> {
        let left = self.left.evaluate(ctx, row)?;
        let right = self.right.evaluate(ctx, row)?;
        Ok((left, right))
    }

    /// Split a `with_children` argument list into (left, right)
    pub fn pair_from(
        expr: &dyn fmt::Display,
        children: Vec<ExpressionRef>,
    ) -> RefractResult<(ExpressionRef, ExpressionRef)> {
        check_arity(expr, &children, 2)?;
        let mut iter = children.into_iter();
        match (iter.next(), iter.next()) {
            (Some(left), Some(right)) => Ok((left, right)),
            _ => Err(RefractError::invalid_children(expr, 0, 2)),
        }
    }
}

/// A node with any number of children
#[derive(Debug, Clone, Default)]
pub struct NaryExpression {
    pub children: Vec<ExpressionRef>,
}

impl NaryExpression {
    pub fn new(children: Vec<ExpressionRef>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> Vec<ExpressionRef> {
        self.children.clone()
    }

    pub fn resolved(&self) -> bool {
        self.children.iter().all(|c| c.resolved())
    }

    pub fn is_nullable(&self) -> bool {
        self.children.iter().any(|c| c.is_nullable())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Write `children` separated by `sep`
pub(crate) fn join_display(
    f: &mut fmt::Formatter<'_>,
    children: &[ExpressionRef],
    sep: &str,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{GetField, Literal};
    use crate::types::LogicalType;
    use std::sync::Arc;

    fn lit(v: i32) -> ExpressionRef {
        Arc::new(Literal::new(Value::Integer(v)))
    }

    #[test]
    fn test_binary_shape_propagates_nullability() {
        let nullable: ExpressionRef = Arc::new(GetField::new(0, LogicalType::Integer, "a", true));
        let shape = BinaryExpression::new(lit(1), nullable);
        assert!(shape.is_nullable());
        assert!(shape.resolved());
        assert!(!BinaryExpression::new(lit(1), lit(2)).is_nullable());
    }

    #[test]
    fn test_arity_helpers() -> RefractResult<()> {
        let (l, r) = BinaryExpression::pair_from(&"x", vec![lit(1), lit(2)])?;
        assert_eq!(l.to_string(), "1");
        assert_eq!(r.to_string(), "2");
        assert!(matches!(
            BinaryExpression::pair_from(&"x", vec![lit(1)]),
            Err(RefractError::InvalidChildrenNumber { got: 1, expected: 2, .. })
        ));
        assert!(UnaryExpression::child_from(&"x", vec![]).is_err());
        Ok(())
    }
}
