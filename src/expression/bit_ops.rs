//! Bitwise operators: `&`, `|`, `^`, `<<` and `>>`
//!
//! Operands are promoted to a common type first: BIGINT UNSIGNED when both
//! sides are unsigned, BIGINT when both are signed, DOUBLE otherwise. The
//! promoted value is then reinterpreted as a 64-bit pattern: signed values
//! keep their two's-complement bits and doubles are rounded to the nearest
//! integer. The result is always BIGINT UNSIGNED.
//!
//! An operand that fails promotion records a truncation warning and drops
//! out of the operation. What happens next depends on the operator: AND
//! becomes NULL, OR and XOR yield the other side, and shifts treat a
//! missing left side as 0 and a missing shift count as no shift.

use crate::common::error::{RefractError, RefractResult};
use crate::execution::ExecutionContext;
use crate::expression::shape::BinaryExpression;
use crate::expression::{Expression, ExpressionRef};
use crate::types::{LogicalType, Row, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOperator {
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
}

impl BitOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BitOperator::And => "&",
            BitOperator::Or => "|",
            BitOperator::Xor => "^",
            BitOperator::ShiftLeft => "<<",
            BitOperator::ShiftRight => ">>",
        }
    }

    fn apply(&self, left: u64, right: u64) -> u64 {
        let shift = u32::try_from(right).ok();
        match self {
            BitOperator::And => left & right,
            BitOperator::Or => left | right,
            BitOperator::Xor => left ^ right,
            BitOperator::ShiftLeft => shift.and_then(|s| left.checked_shl(s)).unwrap_or(0),
            BitOperator::ShiftRight => shift.and_then(|s| left.checked_shr(s)).unwrap_or(0),
        }
    }

    /// Result when at least one operand dropped out during promotion
    fn fold_missing(&self, left: Option<u64>, right: Option<u64>) -> Option<u64> {
        match (self, left, right) {
            (BitOperator::And, _, _) => None,
            (BitOperator::Or | BitOperator::Xor, Some(v), None)
            | (BitOperator::Or | BitOperator::Xor, None, Some(v)) => Some(v),
            (BitOperator::ShiftLeft | BitOperator::ShiftRight, Some(v), None) => Some(v),
            _ => Some(0),
        }
    }
}

impl fmt::Display for BitOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Binary bitwise operation
#[derive(Debug, Clone)]
pub struct BitOp {
    binary: BinaryExpression,
    op: BitOperator,
}

impl BitOp {
    pub fn new(op: BitOperator, left: ExpressionRef, right: ExpressionRef) -> Self {
        Self {
            binary: BinaryExpression::new(left, right),
            op,
        }
    }

    pub fn bit_and(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(BitOperator::And, left, right)
    }

    pub fn bit_or(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(BitOperator::Or, left, right)
    }

    pub fn bit_xor(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(BitOperator::Xor, left, right)
    }

    pub fn shift_left(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(BitOperator::ShiftLeft, left, right)
    }

    pub fn shift_right(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self::new(BitOperator::ShiftRight, left, right)
    }

    pub fn op(&self) -> BitOperator {
        self.op
    }

    /// Common type both operands are promoted to before the operation
    pub fn operand_type(&self) -> LogicalType {
        let left = self.binary.left.return_type();
        let right = self.binary.right.return_type();
        if left.is_unsigned() && right.is_unsigned() {
            LogicalType::UBigInt
        } else if left.is_signed() && right.is_signed() {
            LogicalType::BigInt
        } else {
            LogicalType::Double
        }
    }

    /// Promote one operand; `None` when it resists conversion
    fn promote(&self, ctx: &ExecutionContext, ty: &LogicalType, value: &Value) -> Option<Value> {
        match ty.convert(value) {
            Ok(converted) => Some(converted),
            Err(err) => {
                tracing::trace!(op = %self.op, error = %err, "bit operand dropped");
                ctx.warn_truncated(ty, value);
                None
            }
        }
    }
}

/// Bit pattern of a promoted operand
fn to_bits(value: &Value) -> RefractResult<u64> {
    match value {
        Value::UBigInt(u) => Ok(*u),
        Value::BigInt(i) => Ok(*i as u64),
        Value::Double(f) => Ok(f.round() as i64 as u64),
        other => Err(RefractError::UnableToCast(format!(
            "{} is not a BIGINT, BIGINT UNSIGNED or DOUBLE",
            other
        ))),
    }
}

impl fmt::Display for BitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.binary.left, self.op, self.binary.right)
    }
}

impl Expression for BitOp {
    fn return_type(&self) -> LogicalType {
        LogicalType::UBigInt
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let (left, right) = self.binary.evaluate_both(ctx, row)?;
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        let ty = self.operand_type();
        let left = self
            .promote(ctx, &ty, &left)
            .map(|v| to_bits(&v))
            .transpose()?;
        let right = self
            .promote(ctx, &ty, &right)
            .map(|v| to_bits(&v))
            .transpose()?;

        let bits = match (left, right) {
            (Some(l), Some(r)) => Some(self.op.apply(l, r)),
            (l, r) => self.op.fold_missing(l, r),
        };
        Ok(bits.map(Value::UBigInt).unwrap_or(Value::Null))
    }

    fn is_nullable(&self) -> bool {
        // only text or float operands can fail promotion
        self.binary.is_nullable()
            || (self.op == BitOperator::And && self.operand_type() == LogicalType::Double)
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.binary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let (left, right) = BinaryExpression::pair_from(self, children)?;
        Ok(Arc::new(BitOp::new(self.op, left, right)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::ER_TRUNCATED_WRONG_VALUE;
    use crate::execution::Session;
    use crate::expression::{field, lit};
    use crate::row;
    use pretty_assertions::assert_eq;

    fn eval(expr: BitOp) -> RefractResult<Value> {
        let ctx = ExecutionContext::with_default_session();
        expr.evaluate(&ctx, &Row::empty())
    }

    #[test]
    fn test_unsigned_identities() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let a = field(0, LogicalType::UBigInt, "a");
        for value in [0u64, 1, 0xdead_beef, u64::MAX] {
            let row = row![value];
            let and = BitOp::bit_and(a.clone(), a.clone());
            assert_eq!(and.evaluate(&ctx, &row)?, Value::UBigInt(value));
            let or = BitOp::bit_or(a.clone(), lit(0u64));
            assert_eq!(or.evaluate(&ctx, &row)?, Value::UBigInt(value));
            let xor = BitOp::bit_xor(a.clone(), a.clone());
            assert_eq!(xor.evaluate(&ctx, &row)?, Value::UBigInt(0));
        }
        Ok(())
    }

    #[test]
    fn test_signed_operands_keep_their_bit_pattern() -> RefractResult<()> {
        assert_eq!(
            eval(BitOp::bit_and(lit(-1i64), lit(255i64)))?,
            Value::UBigInt(255)
        );
        assert_eq!(
            eval(BitOp::bit_or(lit(-2i32), lit(1i32)))?,
            Value::UBigInt(u64::MAX)
        );
        Ok(())
    }

    #[test]
    fn test_mixed_operands_round_through_double() -> RefractResult<()> {
        assert_eq!(eval(BitOp::bit_or(lit(1.6f64), lit(0i64)))?, Value::UBigInt(2));
        assert_eq!(eval(BitOp::bit_xor(lit("3"), lit(1u64)))?, Value::UBigInt(2));
        Ok(())
    }

    #[test]
    fn test_shifts() -> RefractResult<()> {
        assert_eq!(eval(BitOp::shift_left(lit(1i64), lit(3i64)))?, Value::UBigInt(8));
        assert_eq!(eval(BitOp::shift_right(lit(256u64), lit(4u64)))?, Value::UBigInt(16));
        assert_eq!(eval(BitOp::shift_left(lit(1i64), lit(64i64)))?, Value::UBigInt(0));
        Ok(())
    }

    #[test]
    fn test_null_operand_is_null() -> RefractResult<()> {
        let null = Value::Null;
        assert_eq!(eval(BitOp::bit_or(lit(null.clone()), lit(1i64)))?, Value::Null);
        assert_eq!(eval(BitOp::shift_left(lit(1i64), lit(null)))?, Value::Null);
        Ok(())
    }

    #[test]
    fn test_unconvertible_operand_folds_per_operator() -> RefractResult<()> {
        let ctx = ExecutionContext::with_default_session();
        let row = Row::empty();

        let or = BitOp::bit_or(lit("abc"), lit(5i64));
        assert_eq!(or.evaluate(&ctx, &row)?, Value::UBigInt(5));
        let warnings = ctx.session().warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, ER_TRUNCATED_WRONG_VALUE);
        assert_eq!(warnings[0].message, "Truncated incorrect DOUBLE value: 'abc'");

        let xor = BitOp::bit_xor(lit("abc"), lit("xyz"));
        assert_eq!(xor.evaluate(&ctx, &row)?, Value::UBigInt(0));

        let and = BitOp::bit_and(lit("abc"), lit(5i64));
        assert_eq!(and.evaluate(&ctx, &row)?, Value::Null);
        assert!(and.is_nullable());

        let shl = BitOp::shift_left(lit(3i64), lit("abc"));
        assert_eq!(shl.evaluate(&ctx, &row)?, Value::UBigInt(3));
        let shr = BitOp::shift_right(lit("abc"), lit(1i64));
        assert_eq!(shr.evaluate(&ctx, &row)?, Value::UBigInt(0));
        Ok(())
    }

    #[test]
    fn test_display_and_arity() {
        let expr = BitOp::shift_left(field(0, LogicalType::BigInt, "a"), lit(2i64));
        assert_eq!(expr.to_string(), "(a << 2)");
        assert!(matches!(
            expr.with_children(vec![lit(1i64)]),
            Err(RefractError::InvalidChildrenNumber { got: 1, expected: 2, .. })
        ));
    }
}
