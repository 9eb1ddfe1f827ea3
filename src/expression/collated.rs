//! `expr COLLATE name`

use crate::common::error::{RefractError, RefractResult};
use crate::execution::ExecutionContext;
use crate::expression::shape::UnaryExpression;
use crate::expression::{Expression, ExpressionRef};
use crate::types::{Collation, LogicalType, Row, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Attaches a collation to a text expression. The child's type is checked
/// when the node is evaluated: it must be text, and its character set must
/// be the collation's.
#[derive(Debug, Clone)]
pub struct CollatedExpression {
    unary: UnaryExpression,
    collation: Collation,
}

impl CollatedExpression {
    /// Collating an already collated expression replaces its collation
    pub fn new(child: ExpressionRef, collation: Collation) -> Self {
        let child = match child.as_any().downcast_ref::<CollatedExpression>() {
            Some(inner) => inner.unary.child.clone(),
            None => child,
        };
        Self {
            unary: UnaryExpression::new(child),
            collation,
        }
    }

    pub fn collation(&self) -> Collation {
        self.collation
    }

    pub fn child(&self) -> &ExpressionRef {
        &self.unary.child
    }

    fn check_child_type(&self) -> RefractResult<()> {
        let ty = self.unary.child.return_type();
        let Some(current) = ty.collation() else {
            return Err(RefractError::CollatedExprWrongType(ty.to_string()));
        };
        if current.character_set() != self.collation.character_set() {
            return Err(RefractError::CollationInvalidForCharset {
                collation: self.collation.name().to_string(),
                charset: current.character_set().name().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for CollatedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} COLLATE {}", self.unary.child, self.collation)
    }
}

impl Expression for CollatedExpression {
    fn return_type(&self) -> LogicalType {
        self.unary.child.return_type().with_collation(self.collation)
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        self.check_child_type()?;
        self.unary.child.evaluate(ctx, row)
    }

    fn is_nullable(&self) -> bool {
        self.unary.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let child = UnaryExpression::child_from(self, children)?;
        Ok(Arc::new(CollatedExpression {
            unary: UnaryExpression::new(child),
            collation: self.collation,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{field, lit};

    #[test]
    fn test_collation_replaces_type_collation() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let expr = CollatedExpression::new(lit("Hello"), Collation::Utf8mb4GeneralCi);
        assert_eq!(
            expr.return_type().collation(),
            Some(Collation::Utf8mb4GeneralCi)
        );
        assert_eq!(expr.evaluate(&ctx, &Row::empty())?, Value::varchar("Hello"));
        assert_eq!(expr.to_string(), "'Hello' COLLATE utf8mb4_general_ci");
        Ok(())
    }

    #[test]
    fn test_nested_collate_unwraps() {
        let inner: ExpressionRef = Arc::new(CollatedExpression::new(
            field(0, LogicalType::text(), "name"),
            Collation::Utf8mb4GeneralCi,
        ));
        let outer = CollatedExpression::new(inner, Collation::Utf8mb4Bin);
        assert_eq!(outer.to_string(), "name COLLATE utf8mb4_bin");
        assert_eq!(outer.children().len(), 1);
    }

    #[test]
    fn test_rejects_non_text_child() {
        let ctx = ExecutionContext::with_default_session();
        let expr = CollatedExpression::new(lit(1i32), Collation::Utf8mb4Bin);
        assert!(matches!(
            expr.evaluate(&ctx, &Row::empty()),
            Err(RefractError::CollatedExprWrongType(_))
        ));
    }

    #[test]
    fn test_rejects_foreign_character_set() {
        let ctx = ExecutionContext::with_default_session();
        let expr = CollatedExpression::new(lit("abc"), Collation::Latin1SwedishCi);
        match expr.evaluate(&ctx, &Row::empty()) {
            Err(RefractError::CollationInvalidForCharset { collation, charset }) => {
                assert_eq!(collation, "latin1_swedish_ci");
                assert_eq!(charset, "utf8mb4");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
