//! Arithmetic operators: `+`, `-`, `*`, `DIV`, `%`, `/` and unary minus
//!
//! Integer operands stay integers (checked, overflow is an error). A float
//! read from a column, a variable or another computation, or any string
//! operand, makes the operation DOUBLE. Everything else, float literals
//! included, is computed exactly in decimal.

use crate::common::constants::{
    DEFAULT_DIV_PRECISION_INCREMENT, ER_DIVISION_BY_ZERO, ER_TRUNCATED_WRONG_VALUE,
    MAX_DECIMAL_PRECISION, MAX_DECIMAL_SCALE,
};
use crate::common::error::{RefractError, RefractResult};
use crate::execution::ExecutionContext;
use crate::expression::comparison::convert_lenient;
use crate::expression::interval::Interval;
use crate::expression::shape::{BinaryExpression, UnaryExpression};
use crate::expression::{Expression, ExpressionRef, Literal};
use crate::types::{LogicalType, Row, Value};
use rust_decimal::{Decimal, RoundingStrategy};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Plus,
    Minus,
    Mult,
    /// Integer division, `DIV`
    IntDiv,
    Mod,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Plus => "+",
            ArithmeticOp::Minus => "-",
            ArithmeticOp::Mult => "*",
            ArithmeticOp::IntDiv => "DIV",
            ArithmeticOp::Mod => "%",
        }
    }
}

/// Operands that force floating point arithmetic
fn is_inexact(ty: &LogicalType) -> bool {
    ty.is_float() || ty.is_text() || ty.is_blob() || ty.is_json()
}

/// Exact value of a float, taken from its shortest textual form
fn float_text_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Float(f) if f.is_finite() => f.to_string(),
        Value::Double(f) if f.is_finite() => f.to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .ok()
        .filter(|d| d.scale() <= MAX_DECIMAL_SCALE as u32)
}

/// Type an operand contributes to the result type. A float literal counts
/// as the DECIMAL its text spells; floats from anywhere else stay floats.
fn operand_type(expr: &ExpressionRef) -> LogicalType {
    let ty = expr.return_type();
    if ty.is_float() {
        let literal = expr
            .as_any()
            .downcast_ref::<Literal>()
            .and_then(|literal| float_text_decimal(literal.value()));
        if let Some(d) = literal {
            return LogicalType::decimal_for(&d);
        }
    }
    ty
}

/// Operand value for the decimal path; float literals keep their text
fn decimal_operand(ctx: &ExecutionContext, value: &Value) -> RefractResult<Decimal> {
    match float_text_decimal(value) {
        Some(d) => Ok(d),
        None => convert_lenient(ctx, &LogicalType::decimal_unbounded(), value)?.try_as_decimal(),
    }
}

/// Error for an INTERVAL operand that no date arithmetic consumes
fn stray_interval(binary: &BinaryExpression, expr: &dyn fmt::Display) -> RefractResult<()> {
    let is_interval = |e: &ExpressionRef| e.as_any().downcast_ref::<Interval>().is_some();
    if is_interval(&binary.left) || is_interval(&binary.right) {
        return Err(RefractError::Type(format!(
            "INTERVAL is only valid added to or subtracted from a date: {}",
            expr
        )));
    }
    Ok(())
}

fn out_of_range(ty: &LogicalType) -> RefractError {
    RefractError::OutOfRange(ty.to_string())
}

/// Result type of `left op right` for plain numeric operands
fn numeric_result_type(op: ArithmeticOp, left: &LogicalType, right: &LogicalType) -> LogicalType {
    let (left, right) = match (left.is_null(), right.is_null()) {
        (true, true) => return LogicalType::BigInt,
        (true, false) => (right, right),
        (false, true) => (left, left),
        (false, false) => (left, right),
    };
    let integral = left.is_integral() && right.is_integral();
    let unsigned = left.is_unsigned() && right.is_unsigned();

    if op == ArithmeticOp::IntDiv {
        return if unsigned {
            LogicalType::UBigInt
        } else {
            LogicalType::BigInt
        };
    }
    if integral || (left.is_time() && right.is_time()) {
        return if unsigned {
            LogicalType::UBigInt
        } else {
            LogicalType::BigInt
        };
    }
    if is_inexact(left) || is_inexact(right) {
        return LogicalType::Double;
    }
    let scale = match op {
        ArithmeticOp::Mult => left.scale().saturating_add(right.scale()),
        _ => left.scale().max(right.scale()),
    };
    LogicalType::decimal(MAX_DECIMAL_PRECISION, scale.min(MAX_DECIMAL_SCALE))
}

/// Binary arithmetic. `+` and `-` also accept an [`Interval`] operand, in
/// which case the other side is a date or datetime.
#[derive(Debug, Clone)]
pub struct Arithmetic {
    binary: BinaryExpression,
    op: ArithmeticOp,
}

impl Arithmetic {
    pub fn new(op: ArithmeticOp, left: ExpressionRef, right: ExpressionRef) -> Self {
        Self {
            binary: BinaryExpression::new(left, right),
            op,
        }
    }

    pub fn plus(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ArithmeticOp::Plus, left, right)
    }

    pub fn minus(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ArithmeticOp::Minus, left, right)
    }

    pub fn mult(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ArithmeticOp::Mult, left, right)
    }

    pub fn int_div(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ArithmeticOp::IntDiv, left, right)
    }

    pub fn modulo(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(ArithmeticOp::Mod, left, right)
    }

    pub fn op(&self) -> ArithmeticOp {
        self.op
    }

    /// The interval operand and the date operand, if this is date arithmetic
    fn interval_operands(&self) -> Option<(&Interval, &ExpressionRef)> {
        let left = self.binary.left.as_any().downcast_ref::<Interval>();
        let right = self.binary.right.as_any().downcast_ref::<Interval>();
        match (self.op, left, right) {
            (ArithmeticOp::Plus | ArithmeticOp::Minus, _, Some(interval)) => {
                Some((interval, &self.binary.left))
            }
            (ArithmeticOp::Plus, Some(interval), None) => Some((interval, &self.binary.right)),
            _ => None,
        }
    }

    fn evaluate_interval(
        &self,
        ctx: &ExecutionContext,
        row: &Row,
        interval: &Interval,
        date: &ExpressionRef,
    ) -> RefractResult<Value> {
        let value = date.evaluate(ctx, row)?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        let at = match LogicalType::DateTime.convert(&value) {
            Ok(Value::DateTime(at)) => at,
            _ => {
                ctx.warn(
                    ER_TRUNCATED_WRONG_VALUE,
                    format!("Incorrect datetime value: '{}'", value.to_sql_string()),
                );
                return Ok(Value::Null);
            }
        };
        let Some(delta) = interval.evaluate_delta(ctx, row)? else {
            return Ok(Value::Null);
        };
        let shifted = delta.apply(at, self.op == ArithmeticOp::Minus);
        Ok(match (shifted, self.return_type()) {
            (Some(dt), LogicalType::Date) => Value::Date(dt.date()),
            (Some(dt), _) => Value::DateTime(dt),
            (None, _) => Value::Null,
        })
    }

    fn compute_signed(&self, l: i64, r: i64) -> Option<Option<i64>> {
        Some(match self.op {
            ArithmeticOp::Plus => Some(l.checked_add(r)?),
            ArithmeticOp::Minus => Some(l.checked_sub(r)?),
            ArithmeticOp::Mult => Some(l.checked_mul(r)?),
            ArithmeticOp::IntDiv if r == 0 => None,
            ArithmeticOp::IntDiv => Some(l.checked_div(r)?),
            ArithmeticOp::Mod if r == 0 => None,
            ArithmeticOp::Mod => Some(l.wrapping_rem(r)),
        })
    }

    fn compute_unsigned(&self, l: u64, r: u64) -> Option<Option<u64>> {
        Some(match self.op {
            ArithmeticOp::Plus => Some(l.checked_add(r)?),
            ArithmeticOp::Minus => Some(l.checked_sub(r)?),
            ArithmeticOp::Mult => Some(l.checked_mul(r)?),
            ArithmeticOp::IntDiv | ArithmeticOp::Mod if r == 0 => None,
            ArithmeticOp::IntDiv => Some(l / r),
            ArithmeticOp::Mod => Some(l % r),
        })
    }

    fn compute_decimal(&self, l: Decimal, r: Decimal) -> Option<Option<Decimal>> {
        Some(match self.op {
            ArithmeticOp::Plus => Some(l.checked_add(r)?),
            ArithmeticOp::Minus => Some(l.checked_sub(r)?),
            ArithmeticOp::Mult => Some(l.checked_mul(r)?),
            ArithmeticOp::IntDiv | ArithmeticOp::Mod if r.is_zero() => None,
            ArithmeticOp::IntDiv => Some(l.checked_div(r)?.trunc()),
            ArithmeticOp::Mod => Some(l.checked_rem(r)?),
        })
    }

    fn compute_double(&self, l: f64, r: f64) -> Option<f64> {
        match self.op {
            ArithmeticOp::Plus => Some(l + r),
            ArithmeticOp::Minus => Some(l - r),
            ArithmeticOp::Mult => Some(l * r),
            ArithmeticOp::IntDiv | ArithmeticOp::Mod if r == 0.0 => None,
            ArithmeticOp::IntDiv => Some((l / r).trunc()),
            ArithmeticOp::Mod => Some(l % r),
        }
    }
}

impl fmt::Display for Arithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {} {})",
            self.binary.left,
            self.op.symbol(),
            self.binary.right
        )
    }
}

impl Expression for Arithmetic {
    fn return_type(&self) -> LogicalType {
        if let Some((interval, date)) = self.interval_operands() {
            return if date.return_type() == LogicalType::Date && interval.unit().is_date_only() {
                LogicalType::Date
            } else {
                LogicalType::DateTime
            };
        }
        numeric_result_type(
            self.op,
            &operand_type(&self.binary.left),
            &operand_type(&self.binary.right),
        )
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        if let Some((interval, date)) = self.interval_operands() {
            return self.evaluate_interval(ctx, row, interval, date);
        }
        stray_interval(&self.binary, self)?;

        let (left, right) = self.binary.evaluate_both(ctx, row)?;
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        let ty = self.return_type();
        match ty {
            LogicalType::BigInt if self.op == ArithmeticOp::IntDiv && !self.operands_integral() => {
                // DIV over non-integers divides exactly, then truncates
                let l = decimal_operand(ctx, &left)?;
                let r = decimal_operand(ctx, &right)?;
                match self.compute_decimal(l, r).ok_or_else(|| out_of_range(&ty))? {
                    Some(q) => LogicalType::BigInt.convert(&Value::Decimal(q)),
                    None => Ok(Value::Null),
                }
            }
            LogicalType::BigInt => {
                let l = convert_lenient(ctx, &ty, &left)?.try_as_i64()?;
                let r = convert_lenient(ctx, &ty, &right)?.try_as_i64()?;
                let result = self.compute_signed(l, r).ok_or_else(|| out_of_range(&ty))?;
                Ok(result.map_or(Value::Null, Value::BigInt))
            }
            LogicalType::UBigInt => {
                let l = convert_lenient(ctx, &ty, &left)?.try_as_u64()?;
                let r = convert_lenient(ctx, &ty, &right)?.try_as_u64()?;
                let result = self.compute_unsigned(l, r).ok_or_else(|| out_of_range(&ty))?;
                Ok(result.map_or(Value::Null, Value::UBigInt))
            }
            LogicalType::Double => {
                let l = convert_lenient(ctx, &ty, &left)?.try_as_f64()?;
                let r = convert_lenient(ctx, &ty, &right)?.try_as_f64()?;
                Ok(self.compute_double(l, r).map_or(Value::Null, Value::Double))
            }
            _ => {
                let l = decimal_operand(ctx, &left)?;
                let r = decimal_operand(ctx, &right)?;
                let result = self.compute_decimal(l, r).ok_or_else(|| out_of_range(&ty))?;
                Ok(result.map_or(Value::Null, Value::Decimal))
            }
        }
    }

    fn is_nullable(&self) -> bool {
        match self.op {
            ArithmeticOp::IntDiv | ArithmeticOp::Mod => true,
            _ => self.binary.is_nullable() || self.interval_operands().is_some(),
        }
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.binary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let (left, right) = BinaryExpression::pair_from(self, children)?;
        Ok(Arc::new(Arithmetic::new(self.op, left, right)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Arithmetic {
    fn operands_integral(&self) -> bool {
        let integral = |t: LogicalType| t.is_integral() || t.is_null();
        integral(self.binary.left.return_type()) && integral(self.binary.right.return_type())
    }
}

/// `/` division. Exact operands produce a decimal carrying
/// `div_precision_increment` more digits of scale than the dividend;
/// float columns or string operands produce a DOUBLE. Division by zero is NULL
/// with a warning.
#[derive(Debug, Clone)]
pub struct Div {
    binary: BinaryExpression,
}

impl Div {
    pub fn new(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self {
            binary: BinaryExpression::new(left, right),
        }
    }

    fn division_by_zero(ctx: &ExecutionContext) -> Value {
        ctx.warn(ER_DIVISION_BY_ZERO, "Division by 0");
        Value::Null
    }
}

impl fmt::Display for Div {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} / {})", self.binary.left, self.binary.right)
    }
}

impl Expression for Div {
    /// The decimal scale reported here assumes the default increment; the
    /// session value applies to the computed result.
    fn return_type(&self) -> LogicalType {
        let left = operand_type(&self.binary.left);
        let right = operand_type(&self.binary.right);
        if is_inexact(&left) || is_inexact(&right) {
            return LogicalType::Double;
        }
        let scale = left
            .scale()
            .saturating_add(DEFAULT_DIV_PRECISION_INCREMENT)
            .min(MAX_DECIMAL_SCALE);
        LogicalType::decimal(MAX_DECIMAL_PRECISION, scale)
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        stray_interval(&self.binary, self)?;
        let (left, right) = self.binary.evaluate_both(ctx, row)?;
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        if self.return_type() == LogicalType::Double {
            let ty = LogicalType::Double;
            let l = convert_lenient(ctx, &ty, &left)?.try_as_f64()?;
            let r = convert_lenient(ctx, &ty, &right)?.try_as_f64()?;
            if r == 0.0 {
                return Ok(Self::division_by_zero(ctx));
            }
            return Ok(Value::Double(l / r));
        }

        let l = decimal_operand(ctx, &left)?;
        let r = decimal_operand(ctx, &right)?;
        if r.is_zero() {
            return Ok(Self::division_by_zero(ctx));
        }
        let scale = (l.scale() + ctx.div_precision_increment() as u32).min(MAX_DECIMAL_SCALE as u32);
        let mut quotient = l
            .checked_div(r)
            .ok_or_else(|| RefractError::OutOfRange("DECIMAL".to_string()))?
            .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
        quotient.rescale(scale);
        Ok(Value::Decimal(quotient))
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.binary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let (left, right) = BinaryExpression::pair_from(self, children)?;
        Ok(Arc::new(Div::new(left, right)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `-x`
#[derive(Debug, Clone)]
pub struct UnaryMinus {
    unary: UnaryExpression,
}

impl UnaryMinus {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }
}

impl fmt::Display for UnaryMinus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.unary.child)
    }
}

impl Expression for UnaryMinus {
    fn return_type(&self) -> LogicalType {
        let child = self.unary.child.return_type();
        if child.is_integral() || child.is_null() {
            LogicalType::BigInt
        } else if child.is_decimal() {
            child
        } else {
            LogicalType::Double
        }
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let value = self.unary.child.evaluate(ctx, row)?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        let ty = self.return_type();
        match convert_lenient(ctx, &ty, &value)? {
            Value::BigInt(n) => n
                .checked_neg()
                .map(Value::BigInt)
                .ok_or_else(|| out_of_range(&ty)),
            Value::Double(f) => Ok(Value::Double(-f)),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            other => Err(RefractError::UnableToCast(format!(
                "cannot negate {}",
                other
            ))),
        }
    }

    fn is_nullable(&self) -> bool {
        self.unary.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        Ok(Arc::new(UnaryMinus::new(UnaryExpression::child_from(
            self, children,
        )?)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::DIV_PRECISION_INCREMENT;
    use crate::execution::VariableScope;
    use crate::expression::{field, lit, IntervalUnit, Literal};
    use crate::row;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn eval(expr: &dyn Expression) -> RefractResult<Value> {
        let ctx = ExecutionContext::with_default_session();
        expr.evaluate(&ctx, &Row::empty())
    }

    #[test]
    fn test_integer_arithmetic() -> RefractResult<()> {
        assert_eq!(eval(&Arithmetic::plus(lit(2i32), lit(3i64)))?, Value::BigInt(5));
        assert_eq!(eval(&Arithmetic::minus(lit(2u32), lit(3i32)))?, Value::BigInt(-1));
        assert_eq!(eval(&Arithmetic::mult(lit(4u8), lit(5u64)))?, Value::UBigInt(20));
        assert_eq!(eval(&Arithmetic::int_div(lit(7i32), lit(2i32)))?, Value::BigInt(3));
        assert_eq!(eval(&Arithmetic::modulo(lit(-7i32), lit(3i32)))?, Value::BigInt(-1));
        Ok(())
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(matches!(
            eval(&Arithmetic::plus(lit(i64::MAX), lit(1i64))),
            Err(RefractError::OutOfRange(_))
        ));
        assert!(matches!(
            eval(&Arithmetic::minus(lit(1u64), lit(2u64))),
            Err(RefractError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_zero_divisor_is_null() -> RefractResult<()> {
        assert_eq!(eval(&Arithmetic::int_div(lit(7i32), lit(0i32)))?, Value::Null);
        assert_eq!(eval(&Arithmetic::modulo(lit(7i32), lit(0i32)))?, Value::Null);
        assert_eq!(eval(&Arithmetic::modulo(lit(7.5f64), lit(0.0f64)))?, Value::Null);
        Ok(())
    }

    #[test]
    fn test_decimal_keeps_larger_scale() -> RefractResult<()> {
        let sum = Arithmetic::plus(lit(dec("1.50")), lit(dec("2.125")));
        assert_eq!(sum.return_type(), LogicalType::decimal(65, 3));
        assert_eq!(eval(&sum)?, Value::Decimal(dec("3.625")));

        let mixed = Arithmetic::plus(lit(dec("0.1")), lit(2i32));
        assert_eq!(eval(&mixed)?, Value::Decimal(dec("2.1")));

        let product = Arithmetic::mult(lit(dec("1.5")), lit(dec("1.25")));
        assert_eq!(product.return_type(), LogicalType::decimal(65, 3));
        assert_eq!(eval(&product)?, Value::Decimal(dec("1.875")));

        let int_div = Arithmetic::int_div(lit(dec("7.9")), lit(2i32));
        assert_eq!(eval(&int_div)?, Value::BigInt(3));
        Ok(())
    }

    #[test]
    fn test_string_operand_is_double_with_warning() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let expr = Arithmetic::plus(lit("3abc"), lit(1i32));
        assert_eq!(expr.return_type(), LogicalType::Double);
        assert_eq!(expr.evaluate(&ctx, &Row::empty())?, Value::Double(4.0));
        let warnings = ctx.session().warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "Truncated incorrect DOUBLE value: '3abc'");

        let junk = Arithmetic::plus(lit("abc"), lit(1i32));
        assert_eq!(junk.evaluate(&ctx, &Row::empty())?, Value::Double(1.0));
        Ok(())
    }

    #[test]
    fn test_null_operand() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let expr = Arithmetic::plus(field(0, LogicalType::Integer, "a"), lit(1i32));
        assert_eq!(expr.evaluate(&ctx, &row![Value::Null])?, Value::Null);
        assert!(expr.is_nullable());
        Ok(())
    }

    #[test]
    fn test_division() -> RefractResult<()> {
        assert_eq!(eval(&Div::new(lit(10i32), lit(4i32)))?, Value::Decimal(dec("2.5000")));
        assert_eq!(eval(&Div::new(lit(1i32), lit(3i32)))?, Value::Decimal(dec("0.3333")));
        assert_eq!(eval(&Div::new(lit(dec("2.00")), lit(3i32)))?, Value::Decimal(dec("0.666667")));
        assert_eq!(eval(&Div::new(lit(1.0f64), lit(4i32)))?, Value::Decimal(dec("0.2500")));
        Ok(())
    }

    #[test]
    fn test_division_by_zero_warns() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let expr = Div::new(lit(1i32), lit(0i32));
        assert_eq!(expr.evaluate(&ctx, &Row::empty())?, Value::Null);
        let warnings = ctx.session().warnings();
        assert_eq!(warnings[0].code, ER_DIVISION_BY_ZERO);
        Ok(())
    }

    #[test]
    fn test_division_honors_session_increment() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        ctx.session()
            .set_system_variable(DIV_PRECISION_INCREMENT, VariableScope::Session, Value::BigInt(2))?;
        let expr = Div::new(lit(1i32), lit(3i32));
        assert_eq!(expr.evaluate(&ctx, &Row::empty())?, Value::Decimal(dec("0.33")));
        Ok(())
    }

    #[test]
    fn test_unary_minus() -> RefractResult<()> {
        assert_eq!(eval(&UnaryMinus::new(lit(5u8)))?, Value::BigInt(-5));
        assert_eq!(eval(&UnaryMinus::new(lit(dec("1.5"))))?, Value::Decimal(dec("-1.5")));
        assert_eq!(eval(&UnaryMinus::new(lit("2")))?, Value::Double(-2.0));
        assert!(eval(&UnaryMinus::new(lit(i64::MIN))).is_err());
        let null = Arc::new(Literal::with_type(Value::Null, LogicalType::Integer));
        assert_eq!(eval(&UnaryMinus::new(null))?, Value::Null);
        Ok(())
    }

    #[test]
    fn test_date_interval_arithmetic() -> RefractResult<()> {
        let date = lit(Value::date(2024, 1, 31)?);
        let plus_month: ExpressionRef =
            Arc::new(Interval::new(lit(1i64), IntervalUnit::Month));
        let expr = Arithmetic::plus(date.clone(), plus_month);
        assert_eq!(expr.return_type(), LogicalType::Date);
        assert_eq!(eval(&expr)?, Value::date(2024, 2, 29)?);

        let hours: ExpressionRef = Arc::new(Interval::new(lit(36i64), IntervalUnit::Hour));
        let expr = Arithmetic::minus(date, hours);
        assert_eq!(expr.return_type(), LogicalType::DateTime);
        assert_eq!(eval(&expr)?.to_sql_string(), "2024-01-29 12:00:00");

        let day: ExpressionRef = Arc::new(Interval::new(lit(1i64), IntervalUnit::Day));
        let text = Arithmetic::plus(day, lit("2023-12-31"));
        assert_eq!(eval(&text)?.to_sql_string(), "2024-01-01 00:00:00");
        Ok(())
    }

    #[test]
    fn test_interval_outside_date_arithmetic_is_a_type_error() {
        let day = || -> ExpressionRef { Arc::new(Interval::new(lit(1i64), IntervalUnit::Day)) };
        let date = lit(Value::date(2024, 1, 31).unwrap());
        let shapes: Vec<Box<dyn Expression>> = vec![
            Box::new(Arithmetic::mult(day(), lit(2i64))),
            Box::new(Arithmetic::minus(day(), date)),
            Box::new(Div::new(lit(1i64), day())),
        ];
        for expr in shapes {
            assert!(matches!(eval(expr.as_ref()), Err(RefractError::Type(_))), "{}", expr);
        }
    }

    #[test]
    fn test_float_literals_are_exact() -> RefractResult<()> {
        let sum = Arithmetic::plus(lit(0.1f64), lit(0.2f64));
        assert_eq!(sum.return_type(), LogicalType::decimal(65, 1));
        assert_eq!(eval(&sum)?, Value::Decimal(dec("0.3")));

        let mixed = Arithmetic::plus(lit(1i64), lit(0.5f64));
        assert_eq!(eval(&mixed)?, Value::Decimal(dec("1.5")));

        let product = Arithmetic::mult(lit(0.25f64), lit(dec("1.5")));
        assert_eq!(product.return_type(), LogicalType::decimal(65, 3));
        assert_eq!(eval(&product)?, Value::Decimal(dec("0.375")));
        Ok(())
    }

    #[test]
    fn test_float_columns_stay_double() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let f = field(0, LogicalType::Double, "f");
        let sum = Arithmetic::plus(f.clone(), lit(0.25f64));
        assert_eq!(sum.return_type(), LogicalType::Double);
        assert_eq!(sum.evaluate(&ctx, &row![0.5f64])?, Value::Double(0.75));

        let ratio = Div::new(f, lit(4i64));
        assert_eq!(ratio.evaluate(&ctx, &row![1.0f64])?, Value::Double(0.25));
        Ok(())
    }
}
