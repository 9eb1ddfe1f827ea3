//! CONVERT / CAST and the BINARY operator

use crate::common::constants::{ER_TRUNCATED_WRONG_VALUE, MAX_DECIMAL_PRECISION, MAX_DECIMAL_SCALE};
use crate::common::error::{RefractError, RefractResult};
use crate::execution::ExecutionContext;
use crate::expression::shape::UnaryExpression;
use crate::expression::{Expression, ExpressionRef};
use crate::types::{LogicalType, Row, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Target of a CONVERT(expr, type) or CAST(expr AS type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertTarget {
    /// BINARY[(n)]: raw bytes, truncated to `n` when given
    Binary(Option<usize>),
    /// CHAR[(n)]: text, truncated to `n` characters when given
    Char(Option<usize>),
    Date,
    DateTime,
    Decimal { precision: u8, scale: u8 },
    Double,
    Float,
    Json,
    Signed,
    Time,
    Unsigned,
}

impl ConvertTarget {
    /// Resolve a target by its SQL keyword. `length` and `scale` carry the
    /// optional type arguments.
    pub fn from_name(name: &str, length: Option<usize>, scale: Option<usize>) -> RefractResult<Self> {
        let target = match name.to_lowercase().as_str() {
            "binary" => ConvertTarget::Binary(length),
            "char" | "nchar" => ConvertTarget::Char(length),
            "date" => ConvertTarget::Date,
            "datetime" => ConvertTarget::DateTime,
            "decimal" => {
                let precision = length.unwrap_or(10);
                let scale = scale.unwrap_or(0);
                if precision > MAX_DECIMAL_PRECISION as usize
                    || scale > MAX_DECIMAL_SCALE as usize
                    || scale > precision
                {
                    return Err(RefractError::InvalidArgument(format!(
                        "invalid DECIMAL({},{})",
                        precision, scale
                    )));
                }
                ConvertTarget::Decimal {
                    precision: precision as u8,
                    scale: scale as u8,
                }
            }
            "double" | "real" => ConvertTarget::Double,
            "float" => ConvertTarget::Float,
            "json" => ConvertTarget::Json,
            "signed" => ConvertTarget::Signed,
            "time" => ConvertTarget::Time,
            "unsigned" => ConvertTarget::Unsigned,
            other => {
                return Err(RefractError::InvalidArgument(format!(
                    "unsupported CONVERT target '{}'",
                    other
                )))
            }
        };
        Ok(target)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConvertTarget::Binary(_) => "binary",
            ConvertTarget::Char(_) => "char",
            ConvertTarget::Date => "date",
            ConvertTarget::DateTime => "datetime",
            ConvertTarget::Decimal { .. } => "decimal",
            ConvertTarget::Double => "double",
            ConvertTarget::Float => "float",
            ConvertTarget::Json => "json",
            ConvertTarget::Signed => "signed",
            ConvertTarget::Time => "time",
            ConvertTarget::Unsigned => "unsigned",
        }
    }

    pub fn logical_type(&self) -> LogicalType {
        match self {
            ConvertTarget::Binary(_) => LogicalType::Blob,
            ConvertTarget::Char(_) => LogicalType::text(),
            ConvertTarget::Date => LogicalType::Date,
            ConvertTarget::DateTime => LogicalType::DateTime,
            ConvertTarget::Decimal { precision, scale } => LogicalType::decimal(*precision, *scale),
            ConvertTarget::Double => LogicalType::Double,
            ConvertTarget::Float => LogicalType::Float,
            ConvertTarget::Json => LogicalType::JSON,
            ConvertTarget::Signed => LogicalType::BigInt,
            ConvertTarget::Time => LogicalType::Time,
            ConvertTarget::Unsigned => LogicalType::UBigInt,
        }
    }
}

impl fmt::Display for ConvertTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertTarget::Binary(Some(n)) | ConvertTarget::Char(Some(n)) => {
                write!(f, "{}({})", self.name(), n)
            }
            ConvertTarget::Decimal { precision, scale } if *scale > 0 => {
                write!(f, "decimal({},{})", precision, scale)
            }
            ConvertTarget::Decimal { precision, .. } => write!(f, "decimal({})", precision),
            _ => f.write_str(self.name()),
        }
    }
}

/// Explicit conversion. Each target has its own failure policy: numeric
/// targets warn and fall back to the numeric prefix or zero, DATE, DATETIME
/// and TIME warn and give NULL, JSON fails the statement.
#[derive(Debug, Clone)]
pub struct Convert {
    unary: UnaryExpression,
    target: ConvertTarget,
}

impl Convert {
    pub fn new(child: ExpressionRef, target: ConvertTarget) -> Self {
        Self {
            unary: UnaryExpression::new(child),
            target,
        }
    }

    pub fn target(&self) -> ConvertTarget {
        self.target
    }

    fn warn_incorrect(&self, ctx: &ExecutionContext, value: &Value) {
        ctx.warn(
            ER_TRUNCATED_WRONG_VALUE,
            format!(
                "Incorrect {} value: {}",
                self.target.name(),
                value.to_sql_string()
            ),
        );
    }

    fn convert_numeric(&self, ctx: &ExecutionContext, value: &Value) -> Value {
        let ty = self.target.logical_type();
        if let Ok(converted) = ty.convert(value) {
            return converted;
        }
        // negative integers keep their bit pattern
        if self.target == ConvertTarget::Unsigned {
            if let Ok(Value::BigInt(i)) = LogicalType::BigInt.convert(value) {
                return Value::UBigInt(i as u64);
            }
        }
        self.warn_incorrect(ctx, value);
        ty.convert_truncating(value).unwrap_or_else(|| ty.zero())
    }

    fn convert_temporal(&self, ctx: &ExecutionContext, value: &Value) -> Value {
        // TIME also reads numbers as hhmmss
        let readable = self.target == ConvertTarget::Time
            || matches!(
                value,
                Value::Date(_) | Value::DateTime(_) | Value::Varchar(_) | Value::Blob(_)
            );
        if !readable {
            return Value::Null;
        }
        match self.target.logical_type().convert(value) {
            Ok(converted) => converted,
            Err(err) => {
                tracing::trace!(target_type = %self.target, error = %err, "temporal conversion failed");
                self.warn_incorrect(ctx, value);
                Value::Null
            }
        }
    }
}

fn truncate_chars(text: String, length: Option<usize>) -> String {
    match length {
        Some(n) => text.chars().take(n).collect(),
        None => text,
    }
}

impl fmt::Display for Convert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "convert({}, {})", self.unary.child, self.target)
    }
}

impl Expression for Convert {
    fn return_type(&self) -> LogicalType {
        self.target.logical_type()
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let value = self.unary.child.evaluate(ctx, row)?;
        if value.is_null() {
            return Ok(Value::Null);
        }

        let converted = match self.target {
            ConvertTarget::Binary(length) => match LogicalType::Blob.convert(&value) {
                Ok(Value::Blob(mut bytes)) => {
                    if let Some(n) = length {
                        bytes.truncate(n);
                    }
                    Value::Blob(bytes)
                }
                _ => Value::Null,
            },
            ConvertTarget::Char(length) => match LogicalType::text().convert(&value) {
                Ok(Value::Varchar(text)) => Value::Varchar(truncate_chars(text, length)),
                _ => Value::Null,
            },
            ConvertTarget::Date | ConvertTarget::DateTime | ConvertTarget::Time => {
                self.convert_temporal(ctx, &value)
            }
            ConvertTarget::Json => LogicalType::JSON.convert(&value).map_err(|err| match err {
                RefractError::InvalidJson(_) => err,
                other => RefractError::InvalidJson(other.to_string()),
            })?,
            ConvertTarget::Decimal { .. }
            | ConvertTarget::Double
            | ConvertTarget::Float
            | ConvertTarget::Signed
            | ConvertTarget::Unsigned => self.convert_numeric(ctx, &value),
        };
        Ok(converted)
    }

    fn is_nullable(&self) -> bool {
        match self.target {
            ConvertTarget::Date | ConvertTarget::DateTime | ConvertTarget::Time => true,
            _ => self.unary.is_nullable(),
        }
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let child = UnaryExpression::child_from(self, children)?;
        Ok(Arc::new(Convert::new(child, self.target)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `BINARY expr`: the raw byte representation of the child
#[derive(Debug, Clone)]
pub struct Binary {
    unary: UnaryExpression,
}

impl Binary {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
        }
    }
}

impl fmt::Display for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BINARY({})", self.unary.child)
    }
}

impl Expression for Binary {
    fn return_type(&self) -> LogicalType {
        LogicalType::Blob
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let value = self.unary.child.evaluate(ctx, row)?;
        LogicalType::Blob.convert(&value)
    }

    fn is_nullable(&self) -> bool {
        self.unary.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        Ok(Arc::new(Binary::new(UnaryExpression::child_from(self, children)?)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
