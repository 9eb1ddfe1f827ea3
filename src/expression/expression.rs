//! Terminal and structural expressions: literals, field reads, aliases,
//! tuples and the placeholders the binder replaces before evaluation.

use crate::common::error::RefractResult;
use crate::execution::ExecutionContext;
use crate::expression::shape::{check_arity, join_display, NaryExpression, UnaryExpression};
use crate::expression::{Expression, ExpressionRef};
use crate::types::{LogicalType, Row, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Constant value expression
#[derive(Debug, Clone)]
pub struct Literal {
    value: Value,
    return_type: LogicalType,
}

impl Literal {
    /// Literal typed by its value
    pub fn new(value: Value) -> Self {
        let return_type = value.logical_type();
        Self { value, return_type }
    }

    /// Literal with an explicit type, e.g. a typed NULL
    pub fn with_type(value: Value, return_type: LogicalType) -> Self {
        Self { value, return_type }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Expression for Literal {
    fn return_type(&self) -> LogicalType {
        self.return_type.clone()
    }

    fn evaluate(&self, _ctx: &ExecutionContext, _row: &Row) -> RefractResult<Value> {
        Ok(self.value.clone())
    }

    fn is_nullable(&self) -> bool {
        self.value.is_null()
    }

    fn resolved(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<ExpressionRef> {
        vec![]
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        check_arity(self, &children, 0)?;
        Ok(Arc::new(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Positional read of one row field
#[derive(Debug, Clone)]
pub struct GetField {
    index: usize,
    return_type: LogicalType,
    name: String,
    table: Option<String>,
    nullable: bool,
}

impl GetField {
    pub fn new(index: usize, return_type: LogicalType, name: impl Into<String>, nullable: bool) -> Self {
        Self {
            index,
            return_type,
            name: name.into(),
            table: None,
            nullable,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Same field read at a different position
    pub fn with_index(&self, index: usize) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }
}

impl fmt::Display for GetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Expression for GetField {
    fn return_type(&self) -> LogicalType {
        self.return_type.clone()
    }

    fn evaluate(&self, _ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        row.field(self.index).cloned()
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }

    fn resolved(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<ExpressionRef> {
        vec![]
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        check_arity(self, &children, 0)?;
        Ok(Arc::new(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Names the value of its child
#[derive(Debug, Clone)]
pub struct Alias {
    unary: UnaryExpression,
    name: String,
}

impl Alias {
    pub fn new(child: ExpressionRef, name: impl Into<String>) -> Self {
        Self {
            unary: UnaryExpression::new(child),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn child(&self) -> &ExpressionRef {
        &self.unary.child
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as {}", self.unary.child, self.name)
    }
}

impl Expression for Alias {
    fn return_type(&self) -> LogicalType {
        self.unary.child.return_type()
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        self.unary.child.evaluate(ctx, row)
    }

    fn is_nullable(&self) -> bool {
        self.unary.is_nullable()
    }

    fn resolved(&self) -> bool {
        self.unary.resolved()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let child = UnaryExpression::child_from(self, children)?;
        Ok(Arc::new(Alias::new(child, self.name.clone())))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Row-valued expression `(a, b, ...)`. A one-element tuple is its element.
#[derive(Debug, Clone)]
pub struct Tuple {
    nary: NaryExpression,
}

impl Tuple {
    pub fn new(children: Vec<ExpressionRef>) -> Self {
        Self {
            nary: NaryExpression::new(children),
        }
    }

    pub fn len(&self) -> usize {
        self.nary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nary.is_empty()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        join_display(f, &self.nary.children, ", ")?;
        write!(f, ")")
    }
}

impl Expression for Tuple {
    fn return_type(&self) -> LogicalType {
        match self.nary.children.as_slice() {
            [single] => single.return_type(),
            children => LogicalType::Tuple(children.iter().map(|c| c.return_type()).collect()),
        }
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        if let [single] = self.nary.children.as_slice() {
            return single.evaluate(ctx, row);
        }
        self.nary
            .children
            .iter()
            .map(|c| c.evaluate(ctx, row))
            .collect::<RefractResult<Vec<_>>>()
            .map(Value::Tuple)
    }

    fn is_nullable(&self) -> bool {
        match self.nary.children.as_slice() {
            [single] => single.is_nullable(),
            _ => false,
        }
    }

    fn resolved(&self) -> bool {
        self.nary.resolved()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.nary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        check_arity(self, &children, self.nary.len())?;
        Ok(Arc::new(Tuple::new(children)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `*` placeholder. Only meaningful as the argument of COUNT(*).
#[derive(Debug, Clone, Default)]
pub struct Star {
    table: Option<String>,
}

impl Star {
    pub fn new() -> Self {
        Self { table: None }
    }

    pub fn qualified(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
        }
    }
}

impl fmt::Display for Star {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.*", table),
            None => write!(f, "*"),
        }
    }
}

impl Expression for Star {
    fn return_type(&self) -> LogicalType {
        panic!("star is just a placeholder node, but return_type was called")
    }

    fn evaluate(&self, _ctx: &ExecutionContext, _row: &Row) -> RefractResult<Value> {
        panic!("star is just a placeholder node, but evaluate was called")
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn resolved(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<ExpressionRef> {
        vec![]
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        check_arity(self, &children, 0)?;
        Ok(Arc::new(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Column referenced by name that the binder has not yet mapped to an index
#[derive(Debug, Clone)]
pub struct UnresolvedColumn {
    name: String,
    table: Option<String>,
}

impl UnresolvedColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: Some(table.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }
}

impl fmt::Display for UnresolvedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Expression for UnresolvedColumn {
    fn return_type(&self) -> LogicalType {
        panic!("unresolved column is a placeholder node, but return_type was called")
    }

    fn evaluate(&self, _ctx: &ExecutionContext, _row: &Row) -> RefractResult<Value> {
        panic!("unresolved column is a placeholder node, but evaluate was called")
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn resolved(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<ExpressionRef> {
        vec![]
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        check_arity(self, &children, 0)?;
        Ok(Arc::new(self.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shorthand for an `Arc`-wrapped literal
pub fn lit(value: impl Into<Value>) -> ExpressionRef {
    Arc::new(Literal::new(value.into()))
}

/// Shorthand for an `Arc`-wrapped nullable field read
pub fn field(index: usize, return_type: LogicalType, name: &str) -> ExpressionRef {
    Arc::new(GetField::new(index, return_type, name, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::RefractError;
    use crate::row;

    #[test]
    fn test_literal() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let l = Literal::new(Value::varchar("foo"));
        assert_eq!(l.evaluate(&ctx, &Row::empty())?, Value::varchar("foo"));
        assert_eq!(l.return_type(), LogicalType::text());
        assert!(!l.is_nullable());
        assert!(Literal::with_type(Value::Null, LogicalType::Integer).is_nullable());
        assert_eq!(l.to_string(), "'foo'");
        Ok(())
    }

    #[test]
    fn test_get_field_reads_by_position() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let f = GetField::new(1, LogicalType::text(), "name", true).with_table("t");
        assert_eq!(f.evaluate(&ctx, &row![1i32, "x"])?, Value::varchar("x"));
        assert_eq!(f.to_string(), "t.name");
        Ok(())
    }

    #[test]
    fn test_get_field_out_of_bounds() {
        let ctx = ExecutionContext::with_default_session();
        let f = GetField::new(3, LogicalType::Integer, "c", true);
        assert!(matches!(
            f.evaluate(&ctx, &row![1i32]),
            Err(RefractError::FieldIndexOutOfBounds { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_tuple() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let t = Tuple::new(vec![lit(1i32), lit("a")]);
        assert_eq!(
            t.evaluate(&ctx, &Row::empty())?,
            Value::tuple(vec![Value::Integer(1), Value::varchar("a")])
        );
        assert_eq!(
            t.return_type(),
            LogicalType::Tuple(vec![LogicalType::Integer, LogicalType::text()])
        );
        let single = Tuple::new(vec![lit(5i64)]);
        assert_eq!(single.evaluate(&ctx, &Row::empty())?, Value::BigInt(5));
        assert_eq!(single.return_type(), LogicalType::BigInt);
        assert_eq!(t.to_string(), "(1, 'a')");
        Ok(())
    }

    #[test]
    fn test_placeholders_are_unresolved() {
        assert!(!UnresolvedColumn::new("a").resolved());
        assert!(!Star::new().resolved());
        let alias = Alias::new(Arc::new(UnresolvedColumn::new("a")), "b");
        assert!(!alias.resolved());
        assert!(Alias::new(lit(1i32), "one").resolved());
    }

    #[test]
    #[should_panic(expected = "placeholder")]
    fn test_evaluating_unresolved_column_panics() {
        let ctx = ExecutionContext::with_default_session();
        let _ = UnresolvedColumn::new("a").evaluate(&ctx, &Row::empty());
    }

    #[test]
    fn test_with_children_arity() -> RefractResult<()> {
        assert!(matches!(
            Literal::new(Value::Integer(1)).with_children(vec![lit(2i32)]),
            Err(RefractError::InvalidChildrenNumber { got: 1, expected: 0, .. })
        ));
        let t = Tuple::new(vec![lit(1i32), lit(2i32)]);
        assert!(t.with_children(vec![lit(1i32)]).is_err());
        let rebuilt = t.with_children(vec![lit(3i32), lit(4i32)])?;
        assert_eq!(rebuilt.to_string(), "(3, 4)");
        let alias = Alias::new(lit(1i32), "x");
        assert!(alias.with_children(vec![]).is_err());
        Ok(())
    }
}
