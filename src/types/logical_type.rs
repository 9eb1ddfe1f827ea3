use crate::common::constants::{MAX_DECIMAL_PRECISION, MAX_DECIMAL_SCALE};
use crate::common::error::{RefractError, RefractResult};
use crate::types::value::Value;
use crate::types::Collation;
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Logical types represent the SQL-level types that expressions produce
/// and that rows carry. Every type knows how to compare, convert and
/// produce the zero value for its domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// NULL type
    Null,
    /// Boolean type (TRUE/FALSE)
    Boolean,
    /// 8-bit signed integer
    TinyInt,
    /// 16-bit signed integer
    SmallInt,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInt,
    /// 8-bit unsigned integer
    UTinyInt,
    /// 16-bit unsigned integer
    USmallInt,
    /// 32-bit unsigned integer
    UInteger,
    /// 64-bit unsigned integer
    UBigInt,
    /// 32-bit floating point
    Float,
    /// 64-bit double precision
    Double,
    /// Decimal with precision and scale
    Decimal { precision: u8, scale: u8 },
    /// Variable length string
    Varchar { collation: Collation },
    /// Fixed length character string (conversion truncates to `length`)
    Char { length: usize, collation: Collation },
    /// Binary large object
    Blob,
    /// Fixed length binary string (conversion pads or truncates to `length`)
    Binary { length: usize },
    /// Calendar date
    Date,
    /// Date and time of day
    DateTime,
    /// Signed time of day or elapsed time
    Time,
    /// JSON document
    JSON,
    /// Row-valued tuple
    Tuple(Vec<LogicalType>),
}

impl LogicalType {
    /// Text type with the default collation
    pub fn text() -> Self {
        LogicalType::Varchar {
            collation: Collation::default(),
        }
    }

    pub fn text_with(collation: Collation) -> Self {
        LogicalType::Varchar { collation }
    }

    pub fn decimal(precision: u8, scale: u8) -> Self {
        LogicalType::Decimal { precision, scale }
    }

    /// Decimal type wide enough for any value `rust_decimal` can hold
    pub fn decimal_unbounded() -> Self {
        LogicalType::Decimal {
            precision: MAX_DECIMAL_PRECISION,
            scale: MAX_DECIMAL_SCALE,
        }
    }

    /// Smallest DECIMAL(p, s) type that holds `d`
    pub fn decimal_for(d: &Decimal) -> Self {
        let scale = d.scale().min(MAX_DECIMAL_SCALE as u32) as u8;
        let digits = d.mantissa().unsigned_abs().to_string().len() as u8;
        LogicalType::Decimal {
            precision: digits.max(scale + 1).min(MAX_DECIMAL_PRECISION),
            scale,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, LogicalType::Null)
    }

    /// Signed integer types, BOOLEAN included (it is a TINYINT in MySQL)
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            LogicalType::Boolean
                | LogicalType::TinyInt
                | LogicalType::SmallInt
                | LogicalType::Integer
                | LogicalType::BigInt
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            LogicalType::UTinyInt
                | LogicalType::USmallInt
                | LogicalType::UInteger
                | LogicalType::UBigInt
        )
    }

    pub fn is_integral(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, LogicalType::Float | LogicalType::Double)
    }

    pub fn is_decimal(&self) -> bool {
        matches!(self, LogicalType::Decimal { .. })
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_float() || self.is_decimal()
    }

    pub fn is_text(&self) -> bool {
        matches!(self, LogicalType::Varchar { .. } | LogicalType::Char { .. })
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, LogicalType::Blob | LogicalType::Binary { .. })
    }

    /// DATE or DATETIME; TIME is not a calendar type
    pub fn is_time(&self) -> bool {
        matches!(self, LogicalType::Date | LogicalType::DateTime)
    }

    pub fn is_json(&self) -> bool {
        matches!(self, LogicalType::JSON)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, LogicalType::Tuple(_))
    }

    /// Number of columns a value of this type spans
    pub fn num_columns(&self) -> usize {
        match self {
            LogicalType::Tuple(types) => types.len(),
            _ => 1,
        }
    }

    /// Collation of a text type
    pub fn collation(&self) -> Option<Collation> {
        match self {
            LogicalType::Varchar { collation } | LogicalType::Char { collation, .. } => {
                Some(*collation)
            }
            _ => None,
        }
    }

    /// Same text type carrying a different collation; other types are unchanged
    pub fn with_collation(&self, collation: Collation) -> LogicalType {
        match self {
            LogicalType::Varchar { .. } => LogicalType::Varchar { collation },
            LogicalType::Char { length, .. } => LogicalType::Char {
                length: *length,
                collation,
            },
            other => other.clone(),
        }
    }

    /// Scale of a decimal type, zero otherwise
    pub fn scale(&self) -> u8 {
        match self {
            LogicalType::Decimal { scale, .. } => *scale,
            _ => 0,
        }
    }

    /// The zero value of this type
    pub fn zero(&self) -> Value {
        match self {
            LogicalType::Null => Value::Null,
            LogicalType::Boolean => Value::Boolean(false),
            LogicalType::TinyInt => Value::TinyInt(0),
            LogicalType::SmallInt => Value::SmallInt(0),
            LogicalType::Integer => Value::Integer(0),
            LogicalType::BigInt => Value::BigInt(0),
            LogicalType::UTinyInt => Value::UTinyInt(0),
            LogicalType::USmallInt => Value::USmallInt(0),
            LogicalType::UInteger => Value::UInteger(0),
            LogicalType::UBigInt => Value::UBigInt(0),
            LogicalType::Float => Value::Float(0.0),
            LogicalType::Double => Value::Double(0.0),
            LogicalType::Decimal { .. } => Value::Decimal(Decimal::ZERO),
            LogicalType::Varchar { .. } | LogicalType::Char { .. } => Value::Varchar(String::new()),
            LogicalType::Blob => Value::Blob(Vec::new()),
            LogicalType::Binary { length } => Value::Blob(vec![0; *length]),
            LogicalType::Date => Value::Date(Default::default()),
            LogicalType::DateTime => Value::DateTime(Default::default()),
            LogicalType::Time => Value::Time(chrono::Duration::zero()),
            LogicalType::JSON => Value::JSON(serde_json::Value::Null),
            LogicalType::Tuple(types) => Value::Tuple(types.iter().map(|t| t.zero()).collect()),
        }
    }

    /// Total order over two values of this type. NULL sorts before any
    /// non-NULL value; both sides are converted to this type first.
    pub fn compare(&self, a: &Value, b: &Value) -> RefractResult<Ordering> {
        if let Some(ordering) = compare_nulls(a, b) {
            return Ok(ordering);
        }

        match self {
            LogicalType::Null => Ok(Ordering::Equal),
            LogicalType::Boolean => {
                let a = self.convert(a)?.try_as_boolean()?;
                let b = self.convert(b)?.try_as_boolean()?;
                Ok(a.cmp(&b))
            }
            t if t.is_signed() => {
                let a = LogicalType::BigInt.convert(a)?.try_as_i64()?;
                let b = LogicalType::BigInt.convert(b)?.try_as_i64()?;
                Ok(a.cmp(&b))
            }
            t if t.is_unsigned() => {
                let a = LogicalType::UBigInt.convert(a)?.try_as_u64()?;
                let b = LogicalType::UBigInt.convert(b)?.try_as_u64()?;
                Ok(a.cmp(&b))
            }
            LogicalType::Float | LogicalType::Double => {
                let a = LogicalType::Double.convert(a)?.try_as_f64()?;
                let b = LogicalType::Double.convert(b)?.try_as_f64()?;
                Ok(OrderedFloat(a).cmp(&OrderedFloat(b)))
            }
            LogicalType::Decimal { .. } => {
                let wide = LogicalType::decimal_unbounded();
                let a = wide.convert(a)?.try_as_decimal()?;
                let b = wide.convert(b)?.try_as_decimal()?;
                Ok(a.cmp(&b))
            }
            LogicalType::Varchar { collation } | LogicalType::Char { collation, .. } => {
                let text = LogicalType::text_with(*collation);
                let a = text.convert(a)?;
                let b = text.convert(b)?;
                Ok(collation.compare(a.try_as_str()?, b.try_as_str()?))
            }
            LogicalType::Blob | LogicalType::Binary { .. } => {
                match (LogicalType::Blob.convert(a)?, LogicalType::Blob.convert(b)?) {
                    (Value::Blob(a), Value::Blob(b)) => Ok(a.cmp(&b)),
                    _ => Err(RefractError::UnableToCast("BLOB".to_string())),
                }
            }
            LogicalType::Date => match (self.convert(a)?, self.convert(b)?) {
                (Value::Date(a), Value::Date(b)) => Ok(a.cmp(&b)),
                _ => Err(RefractError::UnableToCast("DATE".to_string())),
            },
            LogicalType::DateTime => match (self.convert(a)?, self.convert(b)?) {
                (Value::DateTime(a), Value::DateTime(b)) => Ok(a.cmp(&b)),
                _ => Err(RefractError::UnableToCast("DATETIME".to_string())),
            },
            LogicalType::Time => match (self.convert(a)?, self.convert(b)?) {
                (Value::Time(a), Value::Time(b)) => Ok(a.cmp(&b)),
                _ => Err(RefractError::UnableToCast("TIME".to_string())),
            },
            LogicalType::JSON => match (self.convert(a)?, self.convert(b)?) {
                (Value::JSON(a), Value::JSON(b)) => Ok(compare_json(&a, &b)),
                (Value::Null, Value::Null) => Ok(Ordering::Equal),
                (Value::Null, _) => Ok(Ordering::Less),
                (_, Value::Null) => Ok(Ordering::Greater),
                _ => Err(RefractError::UnableToCast("JSON".to_string())),
            },
            LogicalType::Tuple(types) => match (a, b) {
                (Value::Tuple(left), Value::Tuple(right))
                    if left.len() == types.len() && right.len() == types.len() =>
                {
                    for ((t, l), r) in types.iter().zip(left).zip(right) {
                        let ordering = t.compare(l, r)?;
                        if ordering != Ordering::Equal {
                            return Ok(ordering);
                        }
                    }
                    Ok(Ordering::Equal)
                }
                _ => Err(RefractError::Type(format!(
                    "Operand should contain {} column(s)",
                    types.len()
                ))),
            },
            // the signed/unsigned guards above cover every integer variant
            _ => Err(RefractError::UnableToCast(self.to_string())),
        }
    }
}

/// NULL ordering shared by every comparator: `Some` when either side is NULL
pub fn compare_nulls(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.is_null(), b.is_null()) {
        (true, true) => Some(Ordering::Equal),
        (true, false) => Some(Ordering::Less),
        (false, true) => Some(Ordering::Greater),
        (false, false) => None,
    }
}

fn json_rank(value: &serde_json::Value) -> u8 {
    match value {
        serde_json::Value::Null => 0,
        serde_json::Value::Number(_) => 1,
        serde_json::Value::String(_) => 2,
        serde_json::Value::Object(_) => 3,
        serde_json::Value::Array(_) => 4,
        serde_json::Value::Bool(_) => 5,
    }
}

/// Order JSON documents: values of different kinds order by kind
fn compare_json(a: &serde_json::Value, b: &serde_json::Value) -> Ordering {
    use serde_json::Value as Json;
    match (a, b) {
        (Json::Number(x), Json::Number(y)) => {
            OrderedFloat(x.as_f64().unwrap_or_default())
                .cmp(&OrderedFloat(y.as_f64().unwrap_or_default()))
        }
        (Json::String(x), Json::String(y)) => x.cmp(y),
        (Json::Bool(x), Json::Bool(y)) => x.cmp(y),
        (Json::Array(x), Json::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ordering = compare_json(l, r);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        (Json::Object(_), Json::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => json_rank(a).cmp(&json_rank(b)),
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogicalType::Null => write!(f, "NULL"),
            LogicalType::Boolean => write!(f, "BOOLEAN"),
            LogicalType::TinyInt => write!(f, "TINYINT"),
            LogicalType::SmallInt => write!(f, "SMALLINT"),
            LogicalType::Integer => write!(f, "INT"),
            LogicalType::BigInt => write!(f, "BIGINT"),
            LogicalType::UTinyInt => write!(f, "TINYINT UNSIGNED"),
            LogicalType::USmallInt => write!(f, "SMALLINT UNSIGNED"),
            LogicalType::UInteger => write!(f, "INT UNSIGNED"),
            LogicalType::UBigInt => write!(f, "BIGINT UNSIGNED"),
            LogicalType::Float => write!(f, "FLOAT"),
            LogicalType::Double => write!(f, "DOUBLE"),
            LogicalType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({},{})", precision, scale)
            }
            LogicalType::Varchar { .. } => write!(f, "VARCHAR"),
            LogicalType::Char { length, .. } => write!(f, "CHAR({})", length),
            LogicalType::Blob => write!(f, "BLOB"),
            LogicalType::Binary { length } => write!(f, "BINARY({})", length),
            LogicalType::Date => write!(f, "DATE"),
            LogicalType::DateTime => write!(f, "DATETIME"),
            LogicalType::Time => write!(f, "TIME"),
            LogicalType::JSON => write!(f, "JSON"),
            LogicalType::Tuple(types) => {
                write!(f, "TUPLE(")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}
