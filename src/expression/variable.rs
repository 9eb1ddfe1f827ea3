//! `@@scope.name` system variables and `@name` user variables

use crate::common::error::RefractResult;
use crate::execution::{ExecutionContext, VariableScope};
use crate::expression::shape::check_arity;
use crate::expression::{Expression, ExpressionRef};
use crate::types::{LogicalType, Row, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Read of a system variable. Unknown names fail at evaluation time.
#[derive(Debug, Clone)]
pub struct SystemVar {
    name: String,
    scope: VariableScope,
    return_type: LogicalType,
}

impl SystemVar {
    pub fn new(name: impl Into<String>, scope: VariableScope, return_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            scope,
            return_type,
        }
    }

    /// Bind against the session's current value, which also fixes the
    /// return type. Unknown names are rejected here instead of per row.
    pub fn resolve(ctx: &ExecutionContext, name: &str, scope: VariableScope) -> RefractResult<Self> {
        let value = ctx.session().system_variable(name, scope)?;
        Ok(Self::new(name, scope, value.logical_type()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> VariableScope {
        self.scope
    }
}

impl fmt::Display for SystemVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@@{}.{}", self.scope, self.name)
    }
}

impl Expression for SystemVar {
    fn return_type(&self) -> LogicalType {
        self.return_type.clone()
    }

    fn evaluate(&self, ctx: &ExecutionContext, _row: &Row) -> RefractResult<Value> {
        ctx.session().system_variable(&self.name, self.scope)
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

/// Read of a user variable; unset variables read as NULL
#[derive(Debug, Clone)]
pub struct UserVar {
    name: String,
    return_type: LogicalType,
}

impl UserVar {
    /// User variable typed as text until bound to a value
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_type(name, LogicalType::text())
    }

    pub fn with_type(name: impl Into<String>, return_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            return_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `SET @name = value`
    pub fn assign(&self, ctx: &ExecutionContext, value: Value) {
        tracing::trace!(variable = %self.name, value = %value, "user variable assigned");
        ctx.session().set_user_variable(&self.name, value);
    }

    /// Evaluate `expr` against `row` and assign the result
    pub fn assign_from(&self, ctx: &ExecutionContext, expr: &dyn Expression, row: &Row) -> RefractResult<Value> {
        let value = expr.evaluate(ctx, row)?;
        self.assign(ctx, value.clone());
        Ok(value)
    }
}

impl fmt::Display for UserVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

impl Expression for UserVar {
    fn return_type(&self) -> LogicalType {
        self.return_type.clone()
    }

    fn evaluate(&self, ctx: &ExecutionContext, _row: &Row) -> RefractResult<Value> {
        Ok(ctx.session().user_variable(&self.name))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::RefractError;
    use crate::expression::{lit, Arithmetic};

    #[test]
    fn test_system_variable_reads() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let var = SystemVar::resolve(&ctx, "autocommit", VariableScope::Session)?;
        assert_eq!(var.return_type(), LogicalType::BigInt);
        assert_eq!(var.evaluate(&ctx, &Row::empty())?, Value::BigInt(1));
        assert_eq!(var.to_string(), "@@SESSION.autocommit");
        Ok(())
    }

    #[test]
    fn test_unknown_system_variable() {
        let ctx = ExecutionContext::with_default_session();
        let var = SystemVar::new("no_such_var", VariableScope::Global, LogicalType::Null);
        assert!(matches!(
            var.evaluate(&ctx, &Row::empty()),
            Err(RefractError::UnknownSystemVariable(_))
        ));
        assert!(SystemVar::resolve(&ctx, "no_such_var", VariableScope::Session).is_err());
    }

    #[test]
    fn test_user_variables() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let var = UserVar::new("total");
        assert_eq!(var.evaluate(&ctx, &Row::empty())?, Value::Null);

        let sum = Arithmetic::plus(lit(40i64), lit(2i64));
        assert_eq!(var.assign_from(&ctx, &sum, &Row::empty())?, Value::BigInt(42));
        assert_eq!(var.evaluate(&ctx, &Row::empty())?, Value::BigInt(42));

        var.assign(&ctx, Value::varchar("x"));
        assert_eq!(UserVar::new("TOTAL").evaluate(&ctx, &Row::empty())?, Value::varchar("x"));
        assert!(!var.is_deterministic());
        Ok(())
    }
}
