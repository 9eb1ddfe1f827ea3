use crate::common::constants::{DATETIME_LAYOUT, DATE_LAYOUT};
use crate::common::error::{RefractError, RefractResult};
use crate::types::logical_type::LogicalType;
use crate::types::Collation;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;

/// A single runtime value held in a row cell
///
/// The set of variants is closed so that every cast and comparison is
/// checked exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL (type is carried by the producing expression)
    Null,
    /// Boolean value
    Boolean(bool),
    /// 8-bit signed integer
    TinyInt(i8),
    /// 16-bit signed integer
    SmallInt(i16),
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    BigInt(i64),
    /// 8-bit unsigned integer
    UTinyInt(u8),
    /// 16-bit unsigned integer
    USmallInt(u16),
    /// 32-bit unsigned integer
    UInteger(u32),
    /// 64-bit unsigned integer
    UBigInt(u64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit double precision
    Double(f64),
    /// Fixed-point decimal
    Decimal(Decimal),
    /// String value
    Varchar(String),
    /// Binary data
    Blob(Vec<u8>),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time of day, microsecond precision
    DateTime(NaiveDateTime),
    /// Signed time of day or elapsed time, within +/-838:59:59
    Time(Duration),
    /// JSON document
    JSON(serde_json::Value),
    /// Row-valued tuple
    Tuple(Vec<Value>),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn varchar(value: impl Into<String>) -> Self {
        Value::Varchar(value.into())
    }

    pub fn blob(value: impl Into<Vec<u8>>) -> Self {
        Value::Blob(value.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        Value::JSON(value)
    }

    pub fn tuple(values: Vec<Value>) -> Self {
        Value::Tuple(values)
    }

    /// Build a date, failing on an impossible calendar day
    pub fn date(year: i32, month: u32, day: u32) -> RefractResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Value::Date)
            .ok_or_else(|| {
                RefractError::InvalidValue(format!("invalid date {}-{}-{}", year, month, day))
            })
    }

    /// The natural SQL type of this value
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Value::Null => LogicalType::Null,
            Value::Boolean(_) => LogicalType::Boolean,
            Value::TinyInt(_) => LogicalType::TinyInt,
            Value::SmallInt(_) => LogicalType::SmallInt,
            Value::Integer(_) => LogicalType::Integer,
            Value::BigInt(_) => LogicalType::BigInt,
            Value::UTinyInt(_) => LogicalType::UTinyInt,
            Value::USmallInt(_) => LogicalType::USmallInt,
            Value::UInteger(_) => LogicalType::UInteger,
            Value::UBigInt(_) => LogicalType::UBigInt,
            Value::Float(_) => LogicalType::Float,
            Value::Double(_) => LogicalType::Double,
            Value::Decimal(d) => LogicalType::decimal_for(d),
            Value::Varchar(_) => LogicalType::Varchar {
                collation: Collation::default(),
            },
            Value::Blob(_) => LogicalType::Blob,
            Value::Date(_) => LogicalType::Date,
            Value::DateTime(_) => LogicalType::DateTime,
            Value::Time(_) => LogicalType::Time,
            Value::JSON(_) => LogicalType::JSON,
            Value::Tuple(values) => {
                LogicalType::Tuple(values.iter().map(Value::logical_type).collect())
            }
        }
    }

    /// Compare against `other` with this value's own type comparator
    pub fn compare(&self, other: &Value) -> RefractResult<Ordering> {
        self.logical_type().compare(self, other)
    }

    /// Try to extract a boolean value
    pub fn try_as_boolean(&self) -> RefractResult<bool> {
        match self {
            Value::Boolean(value) => Ok(*value),
            Value::Null => Err(RefractError::InvalidValue(
                "Cannot extract boolean from NULL".to_string(),
            )),
            _ => Err(RefractError::InvalidType(format!(
                "Cannot extract boolean from {}",
                self.logical_type()
            ))),
        }
    }

    /// Try to extract a signed 64-bit integer from any signed integer variant
    pub fn try_as_i64(&self) -> RefractResult<i64> {
        match self {
            Value::TinyInt(v) => Ok(*v as i64),
            Value::SmallInt(v) => Ok(*v as i64),
            Value::Integer(v) => Ok(*v as i64),
            Value::BigInt(v) => Ok(*v),
            Value::Null => Err(RefractError::InvalidValue(
                "Cannot extract i64 from NULL".to_string(),
            )),
            _ => Err(RefractError::InvalidType(format!(
                "Cannot extract i64 from {}",
                self.logical_type()
            ))),
        }
    }

    /// Try to extract an unsigned 64-bit integer from any unsigned integer variant
    pub fn try_as_u64(&self) -> RefractResult<u64> {
        match self {
            Value::UTinyInt(v) => Ok(*v as u64),
            Value::USmallInt(v) => Ok(*v as u64),
            Value::UInteger(v) => Ok(*v as u64),
            Value::UBigInt(v) => Ok(*v),
            Value::Null => Err(RefractError::InvalidValue(
                "Cannot extract u64 from NULL".to_string(),
            )),
            _ => Err(RefractError::InvalidType(format!(
                "Cannot extract u64 from {}",
                self.logical_type()
            ))),
        }
    }

    /// Try to extract an f64 value
    pub fn try_as_f64(&self) -> RefractResult<f64> {
        match self {
            Value::Float(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            Value::Null => Err(RefractError::InvalidValue(
                "Cannot extract f64 from NULL".to_string(),
            )),
            _ => Err(RefractError::InvalidType(format!(
                "Cannot extract f64 from {}",
                self.logical_type()
            ))),
        }
    }

    /// Try to extract a decimal value
    pub fn try_as_decimal(&self) -> RefractResult<Decimal> {
        match self {
            Value::Decimal(d) => Ok(*d),
            _ => Err(RefractError::InvalidType(format!(
                "Cannot extract decimal from {}",
                self.logical_type()
            ))),
        }
    }

    /// Try to borrow string contents
    pub fn try_as_str(&self) -> RefractResult<&str> {
        match self {
            Value::Varchar(s) => Ok(s),
            _ => Err(RefractError::InvalidType(format!(
                "Cannot extract string from {}",
                self.logical_type()
            ))),
        }
    }

    /// Text rendering used when a value is converted to a string type
    pub fn to_sql_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Varchar(s) => s.clone(),
            Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
            Value::JSON(j) => j.to_string(),
            Value::Date(d) => d.format(DATE_LAYOUT).to_string(),
            Value::DateTime(dt) => format_datetime(dt),
            Value::Time(t) => format_time(t),
            _ => self.to_string(),
        }
    }

    /// Interpret a JSON scalar as the closest SQL value; objects and arrays stay JSON
    pub fn from_json_scalar(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::BigInt(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UBigInt(u)
                } else {
                    Value::Double(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::Varchar(s.clone()),
            other => Value::JSON(other.clone()),
        }
    }
}

pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format(DATETIME_LAYOUT).to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// `[-]hh:mm:ss[.ffffff]`, hours growing past two digits as needed
pub(crate) fn format_time(t: &Duration) -> String {
    let sign = if *t < Duration::zero() { "-" } else { "" };
    let t = t.abs();
    let seconds = t.num_seconds();
    let micros = t.subsec_nanos() / 1_000;
    let clock = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    );
    if micros == 0 {
        clock
    } else {
        format!("{}.{:06}", clock, micros)
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_from_primitive!(
    bool => Boolean,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Integer,
    i64 => BigInt,
    u8 => UTinyInt,
    u16 => USmallInt,
    u32 => UInteger,
    u64 => UBigInt,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => Varchar,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    Duration => Time,
    serde_json::Value => JSON,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Tuple(values)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(value) => write!(f, "{}", if *value { "TRUE" } else { "FALSE" }),
            Value::TinyInt(value) => write!(f, "{}", value),
            Value::SmallInt(value) => write!(f, "{}", value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::BigInt(value) => write!(f, "{}", value),
            Value::UTinyInt(value) => write!(f, "{}", value),
            Value::USmallInt(value) => write!(f, "{}", value),
            Value::UInteger(value) => write!(f, "{}", value),
            Value::UBigInt(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
            Value::Double(value) => write!(f, "{}", value),
            Value::Decimal(value) => write!(f, "{}", value),
            Value::Varchar(value) => write!(f, "'{}'", value),
            Value::Blob(value) => write!(f, "0x{}", hex::encode_upper(value)),
            Value::Date(value) => write!(f, "{}", value.format(DATE_LAYOUT)),
            Value::DateTime(value) => write!(f, "{}", format_datetime(value)),
            Value::Time(value) => write!(f, "{}", format_time(value)),
            Value::JSON(value) => write!(f, "{}", value),
            Value::Tuple(values) => {
                write!(f, "(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_value_creation() -> RefractResult<()> {
        assert!(Value::from(true).try_as_boolean()?);
        assert_eq!(Value::from(42i32).try_as_i64()?, 42);
        assert_eq!(Value::from(7u16).try_as_u64()?, 7);
        assert!((Value::from(3.5f64).try_as_f64()? - 3.5).abs() < f64::EPSILON);
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert!(Value::date(2023, 2, 30).is_err());
        Ok(())
    }

    #[test]
    fn test_logical_type_of_values() -> RefractResult<()> {
        assert_eq!(Value::from(1u64).logical_type(), LogicalType::UBigInt);
        let d = Decimal::from_str("123.45").map_err(|e| RefractError::InvalidValue(e.to_string()))?;
        assert_eq!(
            Value::Decimal(d).logical_type(),
            LogicalType::Decimal {
                precision: 5,
                scale: 2
            }
        );
        assert_eq!(
            Value::tuple(vec![1i32.into(), "a".into()]).logical_type(),
            LogicalType::Tuple(vec![LogicalType::Integer, LogicalType::text()])
        );
        Ok(())
    }

    #[test]
    fn test_display() -> RefractResult<()> {
        assert_eq!(Value::varchar("foo").to_string(), "'foo'");
        assert_eq!(Value::blob(vec![0xde, 0xad]).to_string(), "0xDEAD");
        assert_eq!(Value::date(2020, 1, 2)?.to_string(), "2020-01-02");
        assert_eq!(
            Value::tuple(vec![1i64.into(), Value::Null]).to_string(),
            "(1, NULL)"
        );
        assert_eq!(Value::from(true).to_sql_string(), "1");
        Ok(())
    }

    #[test]
    fn test_time_display() {
        let long = Duration::hours(838) + Duration::minutes(59) + Duration::seconds(59);
        assert_eq!(Value::Time(long).to_string(), "838:59:59");
        assert_eq!(Value::Time(-Duration::minutes(90)).to_sql_string(), "-01:30:00");
        assert_eq!(
            Value::Time(Duration::seconds(5) + Duration::microseconds(250)).to_string(),
            "00:00:05.000250"
        );
        assert_eq!(Value::Time(Duration::zero()).logical_type(), LogicalType::Time);
    }

    #[test]
    fn test_json_scalars() {
        assert_eq!(
            Value::from_json_scalar(&serde_json::json!(5)),
            Value::BigInt(5)
        );
        assert_eq!(
            Value::from_json_scalar(&serde_json::json!("on")),
            Value::varchar("on")
        );
        assert!(matches!(
            Value::from_json_scalar(&serde_json::json!({"a": 1})),
            Value::JSON(_)
        ));
    }
}
