//! Boolean logic and NULL predicates: NOT, AND, OR, IS [NOT] TRUE/FALSE,
//! IS NULL, BETWEEN and CASE.

use crate::common::error::RefractResult;
use crate::execution::ExecutionContext;
use crate::expression::shape::{check_arity, BinaryExpression, UnaryExpression};
use crate::expression::{evaluate_condition, Expression, ExpressionRef};
use crate::types::{LogicalType, Row, Value};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

fn truth(value: &Value) -> RefractResult<bool> {
    LogicalType::Boolean.convert(value)?.try_as_boolean()
}

fn tri(value: Option<bool>) -> Value {
    value.map(Value::Boolean).unwrap_or(Value::Null)
}

/// Logical negation. NOT NULL is NULL.
#[derive(Debug, Clone)]
pub struct Not {
    unary: UnaryExpression,
}

impl Not {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }
}

impl fmt::Display for Not {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NOT({})", self.unary.child)
    }
}

impl Expression for Not {
    fn return_type(&self) -> LogicalType {
        LogicalType::Boolean
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        match self.unary.child.evaluate(ctx, row)? {
            Value::Null => Ok(Value::Null),
            v => Ok(Value::Boolean(!truth(&v)?)),
        }
    }

    fn is_nullable(&self) -> bool {
        self.unary.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        Ok(Arc::new(Not::new(UnaryExpression::child_from(self, children)?)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `x IS TRUE` or, when negated, `x IS FALSE`. A NULL child counts as false
/// before the test, so `NULL IS FALSE` holds.
#[derive(Debug, Clone)]
pub struct IsTrue {
    unary: UnaryExpression,
    negate: bool,
}

impl IsTrue {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
            negate: false,
        }
    }

    /// `child IS FALSE`
    pub fn is_false(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
            negate: true,
        }
    }
}

impl fmt::Display for IsTrue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let test = if self.negate { "FALSE" } else { "TRUE" };
        write!(f, "{} IS {}", self.unary.child, test)
    }
}

impl Expression for IsTrue {
    fn return_type(&self) -> LogicalType {
        LogicalType::Boolean
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let value = match self.unary.child.evaluate(ctx, row)? {
            Value::Null => false,
            v => truth(&v)?,
        };
        Ok(Value::Boolean(value != self.negate))
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        Ok(Arc::new(IsTrue {
            unary: UnaryExpression::new(UnaryExpression::child_from(self, children)?),
            negate: self.negate,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `x IS NULL`; never NULL itself
#[derive(Debug, Clone)]
pub struct IsNull {
    unary: UnaryExpression,
}

impl IsNull {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }
}

impl fmt::Display for IsNull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} IS NULL", self.unary.child)
    }
}

impl Expression for IsNull {
    fn return_type(&self) -> LogicalType {
        LogicalType::Boolean
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        Ok(Value::Boolean(self.unary.child.evaluate(ctx, row)?.is_null()))
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        Ok(Arc::new(IsNull::new(UnaryExpression::child_from(self, children)?)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicOp::And => write!(f, "AND"),
            LogicOp::Or => write!(f, "OR"),
        }
    }
}

/// AND / OR under three-valued logic. The right side is skipped once the
/// left side decides the result.
#[derive(Debug, Clone)]
pub struct Logic {
    binary: BinaryExpression,
    op: LogicOp,
}

impl Logic {
    pub fn and(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self {
            binary: BinaryExpression::new(left, right),
            op: LogicOp::And,
        }
    }

    pub fn or(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self {
            binary: BinaryExpression::new(left, right),
            op: LogicOp::Or,
        }
    }

    /// Fold a list of predicates into a left-deep AND chain
    pub fn join_and(predicates: Vec<ExpressionRef>) -> Option<ExpressionRef> {
        predicates
            .into_iter()
            .reduce(|acc, p| Arc::new(Logic::and(acc, p)) as ExpressionRef)
    }

    pub fn op(&self) -> LogicOp {
        self.op
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.binary.left, self.op, self.binary.right)
    }
}

impl Expression for Logic {
    fn return_type(&self) -> LogicalType {
        LogicalType::Boolean
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        // the value that decides the result on its own
        let dominant = self.op == LogicOp::Or;
        let left = evaluate_condition(ctx, self.binary.left.as_ref(), row)?;
        if left == Some(dominant) {
            return Ok(Value::Boolean(dominant));
        }
        let right = evaluate_condition(ctx, self.binary.right.as_ref(), row)?;
        let result = match (left, right) {
            (_, Some(r)) if r == dominant => Some(dominant),
            (Some(_), Some(_)) => Some(!dominant),
            _ => None,
        };
        Ok(tri(result))
    }

    fn is_nullable(&self) -> bool {
        self.binary.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.binary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let (left, right) = BinaryExpression::pair_from(self, children)?;
        Ok(Arc::new(Logic {
            binary: BinaryExpression::new(left, right),
            op: self.op,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `value BETWEEN lower AND upper`, inclusive on both ends
#[derive(Debug, Clone)]
pub struct Between {
    value: ExpressionRef,
    lower: ExpressionRef,
    upper: ExpressionRef,
}

impl Between {
    pub fn new(value: ExpressionRef, lower: ExpressionRef, upper: ExpressionRef) -> Self {
        Self { value, lower, upper }
    }
}

impl fmt::Display for Between {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} BETWEEN {} AND {})", self.value, self.lower, self.upper)
    }
}

impl Expression for Between {
    fn return_type(&self) -> LogicalType {
        LogicalType::Boolean
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let value = self.value.evaluate(ctx, row)?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        let lower = self.lower.evaluate(ctx, row)?;
        if lower.is_null() {
            return Ok(Value::Null);
        }
        let upper = self.upper.evaluate(ctx, row)?;
        if upper.is_null() {
            return Ok(Value::Null);
        }

        let ty = self.value.return_type();
        let value = ty.convert(&value)?;
        let lower = ty.convert(&lower)?;
        let upper = ty.convert(&upper)?;
        let within = ty.compare(&lower, &value)? != Ordering::Greater
            && ty.compare(&value, &upper)? != Ordering::Greater;
        Ok(Value::Boolean(within))
    }

    fn is_nullable(&self) -> bool {
        self.value.is_nullable() || self.lower.is_nullable() || self.upper.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        vec![self.value.clone(), self.lower.clone(), self.upper.clone()]
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        check_arity(self, &children, 3)?;
        let mut it = children.into_iter();
        match (it.next(), it.next(), it.next()) {
            (Some(value), Some(lower), Some(upper)) => {
                Ok(Arc::new(Between::new(value, lower, upper)))
            }
            _ => Err(crate::common::error::RefractError::invalid_children(self, 0, 3)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One `WHEN cond THEN value` arm
#[derive(Debug, Clone)]
pub struct CaseBranch {
    pub cond: ExpressionRef,
    pub value: ExpressionRef,
}

impl CaseBranch {
    pub fn new(cond: ExpressionRef, value: ExpressionRef) -> Self {
        Self { cond, value }
    }
}

/// CASE in both forms. With an operand (`CASE x WHEN 1 THEN ...`) each arm
/// compares equal to the operand; without one each arm is a predicate.
#[derive(Debug, Clone)]
pub struct Case {
    operand: Option<ExpressionRef>,
    branches: Vec<CaseBranch>,
    otherwise: Option<ExpressionRef>,
}

impl Case {
    pub fn new(
        operand: Option<ExpressionRef>,
        branches: Vec<CaseBranch>,
        otherwise: Option<ExpressionRef>,
    ) -> Self {
        Self {
            operand,
            branches,
            otherwise,
        }
    }

    fn arm_matches(
        &self,
        ctx: &ExecutionContext,
        row: &Row,
        operand: Option<&Value>,
        branch: &CaseBranch,
    ) -> RefractResult<bool> {
        match (operand, &self.operand) {
            (Some(value), Some(expr)) => {
                let candidate = branch.cond.evaluate(ctx, row)?;
                if value.is_null() || candidate.is_null() {
                    return Ok(false);
                }
                Ok(expr.return_type().compare(value, &candidate)? == Ordering::Equal)
            }
            _ => Ok(evaluate_condition(ctx, branch.cond.as_ref(), row)? == Some(true)),
        }
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CASE")?;
        if let Some(operand) = &self.operand {
            write!(f, " {}", operand)?;
        }
        for branch in &self.branches {
            write!(f, " WHEN {} THEN {}", branch.cond, branch.value)?;
        }
        if let Some(otherwise) = &self.otherwise {
            write!(f, " ELSE {}", otherwise)?;
        }
        write!(f, " END")
    }
}

impl Expression for Case {
    /// Type of the first arm whose type is known
    fn return_type(&self) -> LogicalType {
        self.branches
            .iter()
            .map(|b| &b.value)
            .chain(self.otherwise.iter())
            .map(|e| e.return_type())
            .find(|t| !t.is_null())
            .unwrap_or(LogicalType::Null)
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let operand = match &self.operand {
            Some(expr) => Some(expr.evaluate(ctx, row)?),
            None => None,
        };
        for branch in &self.branches {
            if self.arm_matches(ctx, row, operand.as_ref(), branch)? {
                return branch.value.evaluate(ctx, row);
            }
        }
        match &self.otherwise {
            Some(otherwise) => otherwise.evaluate(ctx, row),
            None => Ok(Value::Null),
        }
    }

    fn is_nullable(&self) -> bool {
        self.otherwise.as_ref().map_or(true, |e| e.is_nullable())
            || self.branches.iter().any(|b| b.value.is_nullable())
    }

    fn children(&self) -> Vec<ExpressionRef> {
        let mut children = Vec::with_capacity(self.branches.len() * 2 + 2);
        children.extend(self.operand.iter().cloned());
        for branch in &self.branches {
            children.push(branch.cond.clone());
            children.push(branch.value.clone());
        }
        children.extend(self.otherwise.iter().cloned());
        children
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let expected = self.operand.is_some() as usize
            + self.branches.len() * 2
            + self.otherwise.is_some() as usize;
        check_arity(self, &children, expected)?;

        let mut it = children.into_iter();
        let operand = if self.operand.is_some() { it.next() } else { None };
        let mut branches = Vec::with_capacity(self.branches.len());
        for _ in 0..self.branches.len() {
            if let (Some(cond), Some(value)) = (it.next(), it.next()) {
                branches.push(CaseBranch::new(cond, value));
            }
        }
        let otherwise = if self.otherwise.is_some() { it.next() } else { None };
        Ok(Arc::new(Case::new(operand, branches, otherwise)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{field, lit, Literal};
    use crate::row;

    fn null() -> ExpressionRef {
        Arc::new(Literal::with_type(Value::Null, LogicalType::Boolean))
    }

    #[test]
    fn test_not() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let row = Row::empty();
        assert_eq!(Not::new(lit(true)).evaluate(&ctx, &row)?, Value::Boolean(false));
        assert_eq!(Not::new(lit(0i32)).evaluate(&ctx, &row)?, Value::Boolean(true));
        assert_eq!(Not::new(lit("1")).evaluate(&ctx, &row)?, Value::Boolean(false));
        assert_eq!(Not::new(null()).evaluate(&ctx, &row)?, Value::Null);

        let double = Not::new(Arc::new(Not::new(lit(7i64))));
        assert_eq!(double.evaluate(&ctx, &row)?, Value::Boolean(true));
        Ok(())
    }

    #[test]
    fn test_is_true_and_is_false() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let row = Row::empty();
        assert_eq!(IsTrue::new(lit(1i32)).evaluate(&ctx, &row)?, Value::Boolean(true));
        assert_eq!(IsTrue::new(null()).evaluate(&ctx, &row)?, Value::Boolean(false));
        assert_eq!(IsTrue::is_false(lit(0i32)).evaluate(&ctx, &row)?, Value::Boolean(true));
        assert_eq!(IsTrue::is_false(null()).evaluate(&ctx, &row)?, Value::Boolean(true));
        assert!(!IsTrue::new(null()).is_nullable());
        Ok(())
    }

    #[test]
    fn test_is_null_is_never_null() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let expr = IsNull::new(field(0, LogicalType::Integer, "a"));
        assert_eq!(expr.evaluate(&ctx, &row![Value::Null])?, Value::Boolean(true));
        assert_eq!(expr.evaluate(&ctx, &row![3i32])?, Value::Boolean(false));
        assert!(!expr.is_nullable());
        Ok(())
    }

    #[test]
    fn test_three_valued_and_or() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let row = Row::empty();
        let cases = [
            (Logic::and(lit(true), lit(true)), Value::Boolean(true)),
            (Logic::and(lit(false), null()), Value::Boolean(false)),
            (Logic::and(null(), lit(false)), Value::Boolean(false)),
            (Logic::and(null(), lit(true)), Value::Null),
            (Logic::or(lit(true), null()), Value::Boolean(true)),
            (Logic::or(null(), lit(true)), Value::Boolean(true)),
            (Logic::or(null(), lit(false)), Value::Null),
            (Logic::or(lit(false), lit(false)), Value::Boolean(false)),
        ];
        for (expr, expected) in cases {
            assert_eq!(expr.evaluate(&ctx, &row)?, expected, "{}", expr);
        }
        Ok(())
    }

    #[test]
    fn test_between() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let expr = Between::new(field(0, LogicalType::Integer, "a"), lit(1i32), lit(5i32));
        assert_eq!(expr.evaluate(&ctx, &row![1i32])?, Value::Boolean(true));
        assert_eq!(expr.evaluate(&ctx, &row![5i32])?, Value::Boolean(true));
        assert_eq!(expr.evaluate(&ctx, &row![6i32])?, Value::Boolean(false));
        assert_eq!(expr.evaluate(&ctx, &row![Value::Null])?, Value::Null);

        let open = Between::new(lit(3i32), null(), lit(5i32));
        assert_eq!(open.evaluate(&ctx, &Row::empty())?, Value::Null);

        let text = Between::new(lit("b"), lit("a"), lit("c"));
        assert_eq!(text.evaluate(&ctx, &Row::empty())?, Value::Boolean(true));
        Ok(())
    }

    #[test]
    fn test_case_forms() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let a = field(0, LogicalType::Integer, "a");
        let simple = Case::new(
            Some(a.clone()),
            vec![
                CaseBranch::new(lit(1i32), lit("one")),
                CaseBranch::new(lit(2i32), lit("two")),
            ],
            Some(lit("many")),
        );
        assert_eq!(simple.evaluate(&ctx, &row![2i32])?, Value::varchar("two"));
        assert_eq!(simple.evaluate(&ctx, &row![9i32])?, Value::varchar("many"));
        assert_eq!(simple.evaluate(&ctx, &row![Value::Null])?, Value::varchar("many"));

        let searched = Case::new(
            None,
            vec![CaseBranch::new(Arc::new(IsNull::new(a)), lit(0i32))],
            None,
        );
        assert_eq!(searched.evaluate(&ctx, &row![Value::Null])?, Value::Integer(0));
        assert_eq!(searched.evaluate(&ctx, &row![4i32])?, Value::Null);
        assert_eq!(searched.return_type(), LogicalType::Integer);
        assert_eq!(searched.to_string(), "CASE WHEN a IS NULL THEN 0 END");

        let rebuilt = simple.with_children(simple.children())?;
        assert_eq!(rebuilt.to_string(), simple.to_string());
        assert!(simple.with_children(vec![lit(1i32)]).is_err());
        Ok(())
    }
}
