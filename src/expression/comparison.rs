//! Comparison operators
//!
//! `=`, `<>`, `<`, `<=`, `>`, `>=` and `<=>` share one evaluation path:
//! evaluate left then right, bail out with NULL if either side is NULL,
//! coerce both sides to the comparison type and ask that type for an
//! ordering. REGEXP and IN build on the same coercion.

use crate::common::error::{RefractError, RefractResult};
use crate::execution::ExecutionContext;
use crate::expression::shape::BinaryExpression;
use crate::expression::subquery::Subquery;
use crate::expression::transform::inspect;
use crate::expression::{Expression, ExpressionRef, Literal, Tuple};
use crate::types::{LogicalType, Row, Value};
use regex::{Regex, RegexBuilder};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Type both operands are coerced to before comparing. Identical types
/// compare as themselves; otherwise numeric operands widen and text
/// against a number compares as DOUBLE.
pub fn comparison_type(left: &LogicalType, right: &LogicalType) -> LogicalType {
    if left == right || right.is_null() || left.is_tuple() {
        return left.clone();
    }
    if left.is_null() {
        return right.clone();
    }
    if left.is_text() && right.is_text() {
        return left.clone();
    }
    if left.is_time() && right.is_time() {
        return if *left == LogicalType::Date && *right == LogicalType::Date {
            LogicalType::Date
        } else {
            LogicalType::DateTime
        };
    }
    if (left.is_time() || *left == LogicalType::Time) && right.is_text() {
        return left.clone();
    }
    if (right.is_time() || *right == LogicalType::Time) && left.is_text() {
        return right.clone();
    }
    if left.is_blob() || right.is_blob() {
        return LogicalType::Blob;
    }
    if left.is_json() || right.is_json() {
        return LogicalType::JSON;
    }
    if left.is_numeric() && right.is_numeric() {
        if left.is_float() || right.is_float() {
            return LogicalType::Double;
        }
        if left.is_decimal() || right.is_decimal() {
            return LogicalType::decimal_unbounded();
        }
        if left.is_signed() && right.is_signed() {
            return LogicalType::BigInt;
        }
        if left.is_unsigned() && right.is_unsigned() {
            return LogicalType::UBigInt;
        }
        return LogicalType::decimal_unbounded();
    }
    if left.is_numeric() || right.is_numeric() {
        return LogicalType::Double;
    }
    LogicalType::text()
}

/// Convert `value` to `ty`. A string that only partially parses as a
/// number keeps its numeric prefix and records a truncation warning.
pub(crate) fn convert_lenient(
    ctx: &ExecutionContext,
    ty: &LogicalType,
    value: &Value,
) -> RefractResult<Value> {
    match ty.convert(value) {
        Ok(converted) => Ok(converted),
        Err(err) => match ty.convert_truncating(value) {
            Some(converted) => {
                ctx.warn_truncated(ty, value);
                Ok(converted)
            }
            None => Err(err),
        },
    }
}

/// Order two non-NULL values of the given static types
pub(crate) fn compare_coerced(
    ctx: &ExecutionContext,
    left_type: &LogicalType,
    right_type: &LogicalType,
    left: &Value,
    right: &Value,
) -> RefractResult<Ordering> {
    let ty = comparison_type(left_type, right_type);
    let left = convert_lenient(ctx, &ty, left)?;
    let right = convert_lenient(ctx, &ty, right)?;
    ty.compare(&left, &right)
}

/// True when `expr` reads nothing but literals
pub(crate) fn is_row_independent(expr: &ExpressionRef) -> bool {
    let mut independent = true;
    inspect(expr, &mut |node| {
        let leaf = node.children().is_empty();
        if leaf && node.as_any().downcast_ref::<Literal>().is_none() {
            independent = false;
        }
        independent
    });
    independent
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonType {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    /// `<=>`: NULL-safe equality
    NullSafeEqual,
}

impl ComparisonType {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonType::Equal => "=",
            ComparisonType::NotEqual => "<>",
            ComparisonType::LessThan => "<",
            ComparisonType::LessThanOrEqual => "<=",
            ComparisonType::GreaterThan => ">",
            ComparisonType::GreaterThanOrEqual => ">=",
            ComparisonType::NullSafeEqual => "<=>",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonType::Equal | ComparisonType::NullSafeEqual => ordering == Ordering::Equal,
            ComparisonType::NotEqual => ordering != Ordering::Equal,
            ComparisonType::LessThan => ordering == Ordering::Less,
            ComparisonType::LessThanOrEqual => ordering != Ordering::Greater,
            ComparisonType::GreaterThan => ordering == Ordering::Greater,
            ComparisonType::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }
}

/// Binary comparison producing a BOOLEAN
#[derive(Debug, Clone)]
pub struct Comparison {
    binary: BinaryExpression,
    comparison_type: ComparisonType,
}

impl Comparison {
    pub fn new(comparison_type: ComparisonType, left: ExpressionRef, right: ExpressionRef) -> Self {
        Self {
            binary: BinaryExpression::new(left, right),
            comparison_type,
        }
    }

    pub fn equals(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ComparisonType::Equal, left, right)
    }

    pub fn not_equals(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ComparisonType::NotEqual, left, right)
    }

    pub fn less_than(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ComparisonType::LessThan, left, right)
    }

    pub fn less_than_or_equal(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ComparisonType::LessThanOrEqual, left, right)
    }

    pub fn greater_than(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ComparisonType::GreaterThan, left, right)
    }

    pub fn greater_than_or_equal(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ComparisonType::GreaterThanOrEqual, left, right)
    }

    pub fn null_safe_equals(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ComparisonType::NullSafeEqual, left, right)
    }

    pub fn comparison_type(&self) -> ComparisonType {
        self.comparison_type
    }

    pub fn left(&self) -> &ExpressionRef {
        &self.binary.left
    }

    pub fn right(&self) -> &ExpressionRef {
        &self.binary.right
    }

    /// Ordering of left against right, `None` when either side is NULL
    pub fn compare(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Option<Ordering>> {
        let (left, right) = self.binary.evaluate_both(ctx, row)?;
        if left.is_null() || right.is_null() {
            return Ok(None);
        }
        compare_coerced(
            ctx,
            &self.binary.left.return_type(),
            &self.binary.right.return_type(),
            &left,
            &right,
        )
        .map(Some)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {} {})",
            self.binary.left,
            self.comparison_type.symbol(),
            self.binary.right
        )
    }
}

impl Expression for Comparison {
    fn return_type(&self) -> LogicalType {
        LogicalType::Boolean
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        if self.comparison_type == ComparisonType::NullSafeEqual {
            let (left, right) = self.binary.evaluate_both(ctx, row)?;
            let equal = match (left.is_null(), right.is_null()) {
                (true, true) => true,
                (true, false) | (false, true) => false,
                (false, false) => {
                    compare_coerced(
                        ctx,
                        &self.binary.left.return_type(),
                        &self.binary.right.return_type(),
                        &left,
                        &right,
                    )? == Ordering::Equal
                }
            };
            return Ok(Value::Boolean(equal));
        }

        match self.compare(ctx, row)? {
            Some(ordering) => Ok(Value::Boolean(self.comparison_type.accepts(ordering))),
            None => Ok(Value::Null),
        }
    }

    fn is_nullable(&self) -> bool {
        self.comparison_type != ComparisonType::NullSafeEqual && self.binary.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.binary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let (left, right) = BinaryExpression::pair_from(self, children)?;
        Ok(Arc::new(Comparison::new(self.comparison_type, left, right)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
enum CachedPattern {
    Invalid,
    Compiled(Regex),
}

/// `text REGEXP pattern`. A malformed pattern never matches. Operands that
/// are not both strings fall back to plain equality.
#[derive(Debug, Clone)]
pub struct Regexp {
    binary: BinaryExpression,
    constant_pattern: bool,
    cached: OnceLock<CachedPattern>,
}

impl Regexp {
    pub fn new(left: ExpressionRef, right: ExpressionRef) -> Self {
        let constant_pattern = is_row_independent(&right);
        Self {
            binary: BinaryExpression::new(left, right),
            constant_pattern,
            cached: OnceLock::new(),
        }
    }

    /// Whether the pattern is compiled once and reused across rows.
    pub fn has_constant_pattern(&self) -> bool {
        self.constant_pattern
    }

    fn compile(&self, pattern: &str) -> CachedPattern {
        let case_insensitive = self
            .binary
            .left
            .return_type()
            .collation()
            .is_some_and(|c| c.is_case_insensitive());
        match RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
        {
            Ok(regex) => CachedPattern::Compiled(regex),
            Err(e) => {
                tracing::debug!(pattern, error = %e, "invalid REGEXP pattern never matches");
                CachedPattern::Invalid
            }
        }
    }

    fn is_match(&self, ctx: &ExecutionContext, text: &str, pattern: &str) -> bool {
        let check = |p: &CachedPattern| match p {
            CachedPattern::Compiled(regex) => regex.is_match(text),
            CachedPattern::Invalid => false,
        };
        if ctx.config().regex_cache && self.constant_pattern {
            check(self.cached.get_or_init(|| self.compile(pattern)))
        } else {
            check(&self.compile(pattern))
        }
    }
}

impl fmt::Display for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} REGEXP {})", self.binary.left, self.binary.right)
    }
}

impl Expression for Regexp {
    fn return_type(&self) -> LogicalType {
        LogicalType::Boolean
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let (left, right) = self.binary.evaluate_both(ctx, row)?;
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }
        match (&left, &right) {
            (Value::Varchar(text), Value::Varchar(pattern)) => {
                Ok(Value::Boolean(self.is_match(ctx, text, pattern)))
            }
            _ => {
                let ordering = compare_coerced(
                    ctx,
                    &self.binary.left.return_type(),
                    &self.binary.right.return_type(),
                    &left,
                    &right,
                )?;
                Ok(Value::Boolean(ordering == Ordering::Equal))
            }
        }
    }

    fn is_nullable(&self) -> bool {
        self.binary.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.binary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let (left, right) = BinaryExpression::pair_from(self, children)?;
        Ok(Arc::new(Regexp::new(left, right)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `left [NOT] IN (a, b, ...)` or `left [NOT] IN (subquery)`
#[derive(Debug, Clone)]
pub struct InTuple {
    binary: BinaryExpression,
    negated: bool,
}

impl InTuple {
    pub fn new(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self {
            binary: BinaryExpression::new(left, right),
            negated: false,
        }
    }

    pub fn not_in(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self {
            binary: BinaryExpression::new(left, right),
            negated: true,
        }
    }

    /// Candidate values paired with their static types
    fn candidates(
        &self,
        ctx: &ExecutionContext,
        row: &Row,
    ) -> RefractResult<Vec<(Value, LogicalType)>> {
        let right = &self.binary.right;
        if let Some(subquery) = right.as_any().downcast_ref::<Subquery>() {
            let ty = subquery.return_type();
            return Ok(subquery
                .evaluate_multiple(ctx)?
                .into_iter()
                .map(|v| (v, ty.clone()))
                .collect());
        }
        if let Some(tuple) = right.as_any().downcast_ref::<Tuple>() {
            return tuple
                .children()
                .iter()
                .map(|c| Ok((c.evaluate(ctx, row)?, c.return_type())))
                .collect();
        }
        let value = right.evaluate(ctx, row)?;
        Ok(vec![(value, right.return_type())])
    }
}

impl fmt::Display for InTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.negated { "NOT IN" } else { "IN" };
        write!(f, "({} {} {})", self.binary.left, op, self.binary.right)
    }
}

impl Expression for InTuple {
    fn return_type(&self) -> LogicalType {
        LogicalType::Boolean
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let left = self.binary.left.evaluate(ctx, row)?;
        if left.is_null() {
            return Ok(Value::Null);
        }
        let left_type = self.binary.left.return_type();

        let mut saw_null = false;
        for (candidate, candidate_type) in self.candidates(ctx, row)? {
            if candidate_type.num_columns() != left_type.num_columns() {
                return Err(RefractError::Type(format!(
                    "Operand should contain {} column(s)",
                    left_type.num_columns()
                )));
            }
            if candidate.is_null() {
                saw_null = true;
                continue;
            }
            if compare_coerced(ctx, &left_type, &candidate_type, &left, &candidate)?
                == Ordering::Equal
            {
                return Ok(Value::Boolean(!self.negated));
            }
        }

        if saw_null {
            Ok(Value::Null)
        } else {
            Ok(Value::Boolean(self.negated))
        }
    }

    fn is_nullable(&self) -> bool {
        self.binary.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.binary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let (left, right) = BinaryExpression::pair_from(self, children)?;
        Ok(Arc::new(InTuple {
            binary: BinaryExpression::new(left, right),
            negated: self.negated,
        }))
    }

    fn is_deterministic(&self) -> bool {
        self.binary.left.is_deterministic() && self.binary.right.is_deterministic()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{field, lit, CollatedExpression};
    use crate::row;
    use crate::types::Collation;
    use pretty_assertions::assert_eq;

    fn null(ty: LogicalType) -> ExpressionRef {
        Arc::new(Literal::with_type(Value::Null, ty))
    }

    #[test]
    fn test_comparisons_propagate_null() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        for ty in [
            ComparisonType::Equal,
            ComparisonType::NotEqual,
            ComparisonType::LessThan,
            ComparisonType::LessThanOrEqual,
            ComparisonType::GreaterThan,
            ComparisonType::GreaterThanOrEqual,
        ] {
            let left_null = Comparison::new(ty, null(LogicalType::Integer), lit(1i32));
            let right_null = Comparison::new(ty, lit(1i32), null(LogicalType::Integer));
            assert_eq!(left_null.evaluate(&ctx, &Row::empty())?, Value::Null);
            assert_eq!(right_null.evaluate(&ctx, &Row::empty())?, Value::Null);
        }
        Ok(())
    }

    #[test]
    fn test_ordering_operators() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let a = field(0, LogicalType::Integer, "a");
        let row = row![2i32];
        let check = |c: Comparison, expected: bool| -> RefractResult<()> {
            assert_eq!(c.evaluate(&ctx, &row)?, Value::Boolean(expected), "{}", c);
            Ok(())
        };
        check(Comparison::equals(a.clone(), lit(2i32)), true)?;
        check(Comparison::not_equals(a.clone(), lit(2i32)), false)?;
        check(Comparison::less_than(a.clone(), lit(3i32)), true)?;
        check(Comparison::less_than_or_equal(a.clone(), lit(2i32)), true)?;
        check(Comparison::greater_than(a.clone(), lit(2i32)), false)?;
        check(Comparison::greater_than_or_equal(a, lit(1i32)), true)?;
        Ok(())
    }

    #[test]
    fn test_mixed_types_widen() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let eq = Comparison::equals(lit(1i32), lit(1.0f64));
        assert_eq!(eq.evaluate(&ctx, &Row::empty())?, Value::Boolean(true));

        let signed_unsigned = Comparison::less_than(lit(-1i64), lit(u64::MAX));
        assert_eq!(signed_unsigned.evaluate(&ctx, &Row::empty())?, Value::Boolean(true));

        let text_number = Comparison::equals(lit("10"), lit(10i32));
        assert_eq!(text_number.evaluate(&ctx, &Row::empty())?, Value::Boolean(true));

        assert_eq!(
            comparison_type(&LogicalType::Integer, &LogicalType::UBigInt),
            LogicalType::decimal_unbounded()
        );
        assert_eq!(
            comparison_type(&LogicalType::Date, &LogicalType::DateTime),
            LogicalType::DateTime
        );
        Ok(())
    }

    #[test]
    fn test_partial_number_warns() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let eq = Comparison::equals(lit(12i32), lit("12abc"));
        assert_eq!(eq.evaluate(&ctx, &Row::empty())?, Value::Boolean(true));
        let warnings = ctx.session().warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, 1292);
        assert_eq!(warnings[0].message, "Truncated incorrect DOUBLE value: '12abc'");
        Ok(())
    }

    #[test]
    fn test_null_safe_equal() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let both = Comparison::null_safe_equals(null(LogicalType::Integer), null(LogicalType::Integer));
        assert_eq!(both.evaluate(&ctx, &Row::empty())?, Value::Boolean(true));
        let one = Comparison::null_safe_equals(lit(1i32), null(LogicalType::Integer));
        assert_eq!(one.evaluate(&ctx, &Row::empty())?, Value::Boolean(false));
        assert!(!one.is_nullable());
        Ok(())
    }

    #[test]
    fn test_collation_drives_string_equality() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let binary = Comparison::equals(lit("abc"), lit("ABC"));
        assert_eq!(binary.evaluate(&ctx, &Row::empty())?, Value::Boolean(false));

        let ci: ExpressionRef =
            Arc::new(CollatedExpression::new(lit("abc"), Collation::Utf8mb4GeneralCi));
        let insensitive = Comparison::equals(ci, lit("ABC"));
        assert_eq!(insensitive.evaluate(&ctx, &Row::empty())?, Value::Boolean(true));
        Ok(())
    }

    #[test]
    fn test_regexp() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let text = field(0, LogicalType::text(), "t");
        let expr = Regexp::new(text.clone(), lit("^fo+$"));
        assert_eq!(expr.evaluate(&ctx, &row!["foo"])?, Value::Boolean(true));
        assert_eq!(expr.evaluate(&ctx, &row!["bar"])?, Value::Boolean(false));
        assert_eq!(expr.evaluate(&ctx, &row![Value::Null])?, Value::Null);

        let malformed = Regexp::new(text.clone(), lit("(unclosed"));
        assert_eq!(malformed.evaluate(&ctx, &row!["(unclosed"])?, Value::Boolean(false));

        let per_row = Regexp::new(lit("abc"), field(0, LogicalType::text(), "p"));
        assert_eq!(per_row.evaluate(&ctx, &row!["b"])?, Value::Boolean(true));
        assert_eq!(per_row.evaluate(&ctx, &row!["^z"])?, Value::Boolean(false));

        let numeric = Regexp::new(lit(1i32), lit(1i32));
        assert_eq!(numeric.evaluate(&ctx, &Row::empty())?, Value::Boolean(true));
        Ok(())
    }

    #[test]
    fn test_regexp_pattern_dependence_fixed_at_build() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let text = field(0, LogicalType::text(), "t");
        let constant = Regexp::new(text.clone(), lit("^a"));
        assert!(constant.has_constant_pattern());
        for value in ["abc", "bcd", "axe"] {
            constant.evaluate(&ctx, &row![value])?;
        }
        assert!(constant.cached.get().is_some());

        let rebuilt = constant.with_children(vec![lit("abc"), text])?;
        let rebuilt = rebuilt
            .as_any()
            .downcast_ref::<Regexp>()
            .ok_or_else(|| RefractError::Internal("rebuilt REGEXP".to_string()))?;
        assert!(!rebuilt.has_constant_pattern());
        assert_eq!(rebuilt.evaluate(&ctx, &row!["^a"])?, Value::Boolean(true));
        assert_eq!(rebuilt.evaluate(&ctx, &row!["^b"])?, Value::Boolean(false));
        assert!(rebuilt.cached.get().is_none());
        Ok(())
    }

    #[test]
    fn test_in_tuple() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let a = field(0, LogicalType::Integer, "a");
        let list: ExpressionRef = Arc::new(Tuple::new(vec![lit(1i32), lit(2i32)]));
        let with_null: ExpressionRef =
            Arc::new(Tuple::new(vec![lit(1i32), null(LogicalType::Integer)]));

        let expr = InTuple::new(a.clone(), list.clone());
        assert_eq!(expr.evaluate(&ctx, &row![2i32])?, Value::Boolean(true));
        assert_eq!(expr.evaluate(&ctx, &row![3i32])?, Value::Boolean(false));
        assert_eq!(expr.evaluate(&ctx, &row![Value::Null])?, Value::Null);

        let not_in = InTuple::not_in(a.clone(), list);
        assert_eq!(not_in.evaluate(&ctx, &row![3i32])?, Value::Boolean(true));

        let unknown = InTuple::new(a, with_null);
        assert_eq!(unknown.evaluate(&ctx, &row![1i32])?, Value::Boolean(true));
        assert_eq!(unknown.evaluate(&ctx, &row![5i32])?, Value::Null);
        Ok(())
    }

    #[test]
    fn test_in_tuple_column_mismatch() {
        let ctx = ExecutionContext::with_default_session();
        let pair: ExpressionRef = Arc::new(Tuple::new(vec![lit(1i32), lit(2i32)]));
        let list: ExpressionRef = Arc::new(Tuple::new(vec![lit(1i32), lit(2i32)]));
        let expr = InTuple::new(pair, list);
        assert!(matches!(
            expr.evaluate(&ctx, &Row::empty()),
            Err(RefractError::Type(_))
        ));
    }

    #[test]
    fn test_row_dependence() {
        assert!(is_row_independent(&lit("x")));
        assert!(!is_row_independent(&field(0, LogicalType::text(), "p")));
        let nested: ExpressionRef = Arc::new(Tuple::new(vec![lit(1i32), lit(2i32)]));
        assert!(is_row_independent(&nested));
    }
}
