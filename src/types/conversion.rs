//! Value conversion between logical types
//!
//! `LogicalType::convert` is the strict conversion every expression relies
//! on: it fails when a value has no sensible representation in the target
//! type. `LogicalType::convert_truncating` is the lenient MySQL fallback
//! for numeric targets ("12abc" -> 12, "abc" -> 0) used by operators whose
//! failed conversions only raise a warning.

use crate::common::constants::{MAX_DECIMAL_PRECISION, MAX_TIME_SECONDS};
use crate::common::error::{RefractError, RefractResult};
use crate::types::logical_type::LogicalType;
use crate::types::value::Value;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y%m%d%H%M%S",
];

impl LogicalType {
    /// Convert `value` into this type. NULL converts to NULL for every type.
    pub fn convert(&self, value: &Value) -> RefractResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match self {
            LogicalType::Null => Ok(Value::Null),
            LogicalType::Boolean => to_boolean(value).map(Value::Boolean),
            LogicalType::TinyInt => {
                narrow(to_i64(value)?, self).map(|v: i8| Value::TinyInt(v))
            }
            LogicalType::SmallInt => {
                narrow(to_i64(value)?, self).map(|v: i16| Value::SmallInt(v))
            }
            LogicalType::Integer => narrow(to_i64(value)?, self).map(|v: i32| Value::Integer(v)),
            LogicalType::BigInt => to_i64(value).map(Value::BigInt),
            LogicalType::UTinyInt => {
                narrow(to_u64(value)?, self).map(|v: u8| Value::UTinyInt(v))
            }
            LogicalType::USmallInt => {
                narrow(to_u64(value)?, self).map(|v: u16| Value::USmallInt(v))
            }
            LogicalType::UInteger => {
                narrow(to_u64(value)?, self).map(|v: u32| Value::UInteger(v))
            }
            LogicalType::UBigInt => to_u64(value).map(Value::UBigInt),
            LogicalType::Float => to_f64(value).map(|f| Value::Float(f as f32)),
            LogicalType::Double => to_f64(value).map(Value::Double),
            LogicalType::Decimal { precision, scale } => {
                let d = to_decimal(value)?;
                fit_decimal(d, *precision, *scale).map(Value::Decimal)
            }
            LogicalType::Varchar { .. } => to_text(value).map(Value::Varchar),
            LogicalType::Char { length, .. } => {
                to_text(value).map(|s| Value::Varchar(s.chars().take(*length).collect()))
            }
            LogicalType::Blob => to_bytes(value).map(Value::Blob),
            LogicalType::Binary { length } => to_bytes(value).map(|mut bytes| {
                bytes.resize(*length, 0);
                Value::Blob(bytes)
            }),
            LogicalType::Date => to_date(value).map(Value::Date),
            LogicalType::DateTime => to_datetime(value).map(Value::DateTime),
            LogicalType::Time => to_time(value).map(Value::Time),
            LogicalType::JSON => to_json(value).map(Value::JSON),
            LogicalType::Tuple(types) => match value {
                Value::Tuple(values) if values.len() == types.len() => types
                    .iter()
                    .zip(values)
                    .map(|(t, v)| t.convert(v))
                    .collect::<RefractResult<Vec<_>>>()
                    .map(Value::Tuple),
                _ => Err(RefractError::Type(format!(
                    "Operand should contain {} column(s)",
                    types.len()
                ))),
            },
        }
    }

    /// Lenient numeric conversion: the longest numeric prefix of a string,
    /// or zero when there is none. `None` for non-numeric targets, non-text
    /// inputs, or a prefix that is itself out of range.
    pub fn convert_truncating(&self, value: &Value) -> Option<Value> {
        if !self.is_numeric() {
            return None;
        }
        let text = match value {
            Value::Varchar(s) => s.clone(),
            Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
            _ => return None,
        };
        let prefix = numeric_prefix(&text);
        if prefix.is_empty() {
            return Some(self.zero());
        }
        self.convert(&Value::Varchar(prefix.to_string())).ok()
    }
}

fn conversion_error(value: &Value, target: &str) -> RefractError {
    RefractError::InvalidValue(format!("Incorrect {} value: {}", target, value))
}

fn tuple_error() -> RefractError {
    RefractError::Type("Operand should contain 1 column(s)".to_string())
}

fn narrow<S, T>(value: S, target: &LogicalType) -> RefractResult<T>
where
    T: TryFrom<S>,
{
    T::try_from(value).map_err(|_| RefractError::OutOfRange(target.to_string()))
}

fn round_f64_to_i64(f: f64) -> RefractResult<i64> {
    let rounded = f.round();
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Ok(rounded as i64)
    } else {
        Err(RefractError::OutOfRange("BIGINT".to_string()))
    }
}

fn round_f64_to_u64(f: f64) -> RefractResult<u64> {
    let rounded = f.round();
    if rounded.is_finite() && rounded >= 0.0 && rounded < u64::MAX as f64 {
        Ok(rounded as u64)
    } else {
        Err(RefractError::OutOfRange("BIGINT UNSIGNED".to_string()))
    }
}

fn round_decimal(d: Decimal, scale: u32) -> Decimal {
    d.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Date as the number MySQL uses in numeric context: YYYYMMDD
pub fn date_to_number(d: &NaiveDate) -> i64 {
    d.year() as i64 * 10_000 + d.month() as i64 * 100 + d.day() as i64
}

/// Datetime as YYYYMMDDhhmmss
pub fn datetime_to_number(dt: &NaiveDateTime) -> i64 {
    date_to_number(&dt.date()) * 1_000_000
        + dt.hour() as i64 * 10_000
        + dt.minute() as i64 * 100
        + dt.second() as i64
}

/// Time as [-]hhmmss, fractional seconds dropped
pub fn time_to_number(t: &Duration) -> i64 {
    let seconds = t.num_seconds();
    let magnitude = seconds.abs();
    let number = magnitude / 3600 * 10_000 + (magnitude / 60) % 60 * 100 + magnitude % 60;
    if *t < Duration::zero() {
        -number
    } else {
        number
    }
}

fn time_to_decimal(t: &Duration) -> Decimal {
    let micros = Decimal::new(i64::from(t.abs().subsec_nanos() / 1_000), 6);
    let number = Decimal::from(time_to_number(t));
    if *t < Duration::zero() {
        number - micros
    } else {
        number + micros
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Varchar(s) => Some(s.clone()),
        Value::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
        Value::JSON(serde_json::Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn parse_i64(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(|f| round_f64_to_i64(f).ok()))
}

fn parse_u64(text: &str) -> Option<u64> {
    let text = text.trim();
    text.parse::<u64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(|f| round_f64_to_u64(f).ok()))
}

fn to_i64(value: &Value) -> RefractResult<i64> {
    match value {
        Value::Boolean(b) => Ok(*b as i64),
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => {
            value.try_as_i64()
        }
        Value::UTinyInt(_) | Value::USmallInt(_) | Value::UInteger(_) | Value::UBigInt(_) => {
            i64::try_from(value.try_as_u64()?)
                .map_err(|_| RefractError::OutOfRange("BIGINT".to_string()))
        }
        Value::Float(f) => round_f64_to_i64(*f as f64),
        Value::Double(f) => round_f64_to_i64(*f),
        Value::Decimal(d) => round_decimal(*d, 0)
            .to_i64()
            .ok_or_else(|| RefractError::OutOfRange("BIGINT".to_string())),
        Value::Date(d) => Ok(date_to_number(d)),
        Value::DateTime(dt) => Ok(datetime_to_number(dt)),
        Value::Time(t) => Ok(time_to_number(t)),
        Value::JSON(serde_json::Value::Bool(b)) => Ok(*b as i64),
        Value::JSON(serde_json::Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(i),
            (None, Some(f)) => round_f64_to_i64(f),
            _ => Err(conversion_error(value, "BIGINT")),
        },
        Value::Tuple(_) => Err(tuple_error()),
        _ => text_of(value)
            .and_then(|s| parse_i64(&s))
            .ok_or_else(|| conversion_error(value, "BIGINT")),
    }
}

fn to_u64(value: &Value) -> RefractResult<u64> {
    let out_of_range = || RefractError::OutOfRange("BIGINT UNSIGNED".to_string());
    match value {
        Value::Boolean(b) => Ok(*b as u64),
        Value::UTinyInt(_) | Value::USmallInt(_) | Value::UInteger(_) | Value::UBigInt(_) => {
            value.try_as_u64()
        }
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => {
            u64::try_from(value.try_as_i64()?).map_err(|_| out_of_range())
        }
        Value::Float(f) => round_f64_to_u64(*f as f64),
        Value::Double(f) => round_f64_to_u64(*f),
        Value::Decimal(d) => round_decimal(*d, 0).to_u64().ok_or_else(out_of_range),
        Value::Date(d) => Ok(date_to_number(d) as u64),
        Value::DateTime(dt) => Ok(datetime_to_number(dt) as u64),
        Value::Time(t) => u64::try_from(time_to_number(t)).map_err(|_| out_of_range()),
        Value::JSON(serde_json::Value::Bool(b)) => Ok(*b as u64),
        Value::JSON(serde_json::Value::Number(n)) => match (n.as_u64(), n.as_f64()) {
            (Some(u), _) => Ok(u),
            (None, Some(f)) => round_f64_to_u64(f),
            _ => Err(conversion_error(value, "BIGINT UNSIGNED")),
        },
        Value::Tuple(_) => Err(tuple_error()),
        _ => text_of(value)
            .and_then(|s| parse_u64(&s))
            .ok_or_else(|| conversion_error(value, "BIGINT UNSIGNED")),
    }
}

fn to_f64(value: &Value) -> RefractResult<f64> {
    match value {
        Value::Boolean(b) => Ok(*b as i64 as f64),
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => {
            Ok(value.try_as_i64()? as f64)
        }
        Value::UTinyInt(_) | Value::USmallInt(_) | Value::UInteger(_) | Value::UBigInt(_) => {
            Ok(value.try_as_u64()? as f64)
        }
        Value::Float(f) => Ok(*f as f64),
        Value::Double(f) => Ok(*f),
        Value::Decimal(d) => d
            .to_f64()
            .ok_or_else(|| RefractError::OutOfRange("DOUBLE".to_string())),
        Value::Date(d) => Ok(date_to_number(d) as f64),
        Value::DateTime(dt) => Ok(datetime_to_number(dt) as f64),
        Value::Time(t) => time_to_decimal(t)
            .to_f64()
            .ok_or_else(|| RefractError::OutOfRange("DOUBLE".to_string())),
        Value::JSON(serde_json::Value::Bool(b)) => Ok(*b as i64 as f64),
        Value::JSON(serde_json::Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| conversion_error(value, "DOUBLE")),
        Value::Tuple(_) => Err(tuple_error()),
        _ => text_of(value)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .ok_or_else(|| conversion_error(value, "DOUBLE")),
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

fn to_decimal(value: &Value) -> RefractResult<Decimal> {
    match value {
        Value::Boolean(b) => Ok(Decimal::from(*b as i64)),
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => {
            Ok(Decimal::from(value.try_as_i64()?))
        }
        Value::UTinyInt(_) | Value::USmallInt(_) | Value::UInteger(_) | Value::UBigInt(_) => {
            Ok(Decimal::from(value.try_as_u64()?))
        }
        Value::Float(f) => Decimal::from_f32(*f).ok_or_else(|| conversion_error(value, "DECIMAL")),
        Value::Double(f) => Decimal::from_f64(*f).ok_or_else(|| conversion_error(value, "DECIMAL")),
        Value::Decimal(d) => Ok(*d),
        Value::Date(d) => Ok(Decimal::from(date_to_number(d))),
        Value::DateTime(dt) => Ok(Decimal::from(datetime_to_number(dt))),
        Value::Time(t) => Ok(time_to_decimal(t)),
        Value::JSON(serde_json::Value::Bool(b)) => Ok(Decimal::from(*b as i64)),
        Value::JSON(serde_json::Value::Number(n)) => {
            parse_decimal(&n.to_string()).ok_or_else(|| conversion_error(value, "DECIMAL"))
        }
        Value::Tuple(_) => Err(tuple_error()),
        _ => text_of(value)
            .and_then(|s| parse_decimal(&s))
            .ok_or_else(|| conversion_error(value, "DECIMAL")),
    }
}

/// Round to `scale` and check the integer digits against `precision`.
/// The unbounded decimal type keeps the value's own scale.
fn fit_decimal(d: Decimal, precision: u8, scale: u8) -> RefractResult<Decimal> {
    let mut d = if d.scale() > scale as u32 {
        round_decimal(d, scale as u32)
    } else {
        d
    };
    if precision < MAX_DECIMAL_PRECISION {
        d.rescale(scale as u32);
        let integer_digits = precision.saturating_sub(scale) as u32;
        if integer_digits < 28 {
            let limit = Decimal::from_i128_with_scale(10i128.pow(integer_digits), 0);
            if d.trunc().abs() >= limit {
                return Err(RefractError::OutOfRange(format!(
                    "DECIMAL({},{})",
                    precision, scale
                )));
            }
        }
    }
    Ok(d)
}

fn to_text(value: &Value) -> RefractResult<String> {
    match value {
        Value::Tuple(_) => Err(tuple_error()),
        _ => Ok(value.to_sql_string()),
    }
}

fn to_bytes(value: &Value) -> RefractResult<Vec<u8>> {
    match value {
        Value::Blob(b) => Ok(b.clone()),
        _ => to_text(value).map(String::into_bytes),
    }
}

/// Parse the date formats MySQL accepts in string context
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| parse_datetime_only(text).map(|dt| dt.date()))
}

fn parse_datetime_only(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Parse datetime strings; a bare date means midnight
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    parse_datetime_only(text).or_else(|| {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
            .map(|d| d.and_time(NaiveTime::MIN))
    })
}

fn date_from_number(n: i64) -> Option<NaiveDate> {
    if n <= 0 {
        return None;
    }
    let n = if n > 99_991_231 { n / 1_000_000 } else { n };
    NaiveDate::from_ymd_opt((n / 10_000) as i32, ((n / 100) % 100) as u32, (n % 100) as u32)
}

fn to_date(value: &Value) -> RefractResult<NaiveDate> {
    let parsed = match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => {
            date_from_number(value.try_as_i64()?)
        }
        Value::UTinyInt(_) | Value::USmallInt(_) | Value::UInteger(_) | Value::UBigInt(_) => {
            i64::try_from(value.try_as_u64()?).ok().and_then(date_from_number)
        }
        _ => text_of(value).and_then(|s| parse_date(&s)),
    };
    parsed.ok_or_else(|| conversion_error(value, "DATE"))
}

fn to_datetime(value: &Value) -> RefractResult<NaiveDateTime> {
    let parsed = match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Date(d) => Some(d.and_time(NaiveTime::MIN)),
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => {
            let n = value.try_as_i64()?;
            if n > 99_991_231 {
                date_from_number(n).and_then(|d| {
                    let time = n % 1_000_000;
                    d.and_hms_opt(
                        (time / 10_000) as u32,
                        ((time / 100) % 100) as u32,
                        (time % 100) as u32,
                    )
                })
            } else {
                date_from_number(n).map(|d| d.and_time(NaiveTime::MIN))
            }
        }
        _ => text_of(value).and_then(|s| parse_datetime(&s)),
    };
    parsed.ok_or_else(|| conversion_error(value, "DATETIME"))
}

/// Parse `[-][D ]hh:mm[:ss[.ffffff]]`, `[-]hhmmss[.ffffff]`, or the time
/// of day of a full datetime string
pub fn parse_time(text: &str) -> Option<Duration> {
    let text = text.trim();
    if let Some(dt) = parse_datetime_only(text) {
        return Some(dt.time() - NaiveTime::MIN);
    }
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    let (days, clock) = match body.split_once(' ') {
        Some((d, rest)) => (Some(digits(d)?), rest.trim_start()),
        None => (None, body),
    };
    let (whole, fraction) = clock.split_once('.').unwrap_or((clock, ""));
    let micros = fraction_micros(fraction)?;
    let parts: Vec<&str> = whole.split(':').collect();
    let (hours, minutes, seconds) = match (days, parts.as_slice()) {
        (None, [number]) => {
            let n = digits(number)?;
            (n / 10_000, (n / 100) % 100, n % 100)
        }
        (Some(_), [h]) => (digits(h)?, 0, 0),
        (_, [h, m]) => (digits(h)?, digits(m)?, 0),
        (_, [h, m, s]) => (digits(h)?, digits(m)?, digits(s)?),
        _ => return None,
    };
    let hours = days.unwrap_or(0).checked_mul(24)?.checked_add(hours)?;
    clock_duration(negative, hours, minutes, seconds, micros)
}

fn digits(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Up to six fractional digits as microseconds; further digits are dropped
fn fraction_micros(fraction: &str) -> Option<i64> {
    if fraction.is_empty() {
        return Some(0);
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded: String = fraction.chars().chain(std::iter::repeat('0')).take(6).collect();
    padded.parse().ok()
}

fn clock_duration(
    negative: bool,
    hours: i64,
    minutes: i64,
    seconds: i64,
    micros: i64,
) -> Option<Duration> {
    if minutes >= 60 || seconds >= 60 || hours > MAX_TIME_SECONDS / 3600 {
        return None;
    }
    let total = Duration::seconds(hours * 3600 + minutes * 60 + seconds)
        + Duration::microseconds(micros);
    if total > Duration::seconds(MAX_TIME_SECONDS) {
        return None;
    }
    Some(if negative { -total } else { total })
}

fn time_from_number(n: i64, micros: i64) -> Option<Duration> {
    let magnitude = n.checked_abs()?;
    // YYYYMMDDhhmmss keeps its time of day
    let magnitude = if magnitude >= 10_000_000_000 {
        magnitude % 1_000_000
    } else {
        magnitude
    };
    clock_duration(
        n < 0 || micros < 0,
        magnitude / 10_000,
        (magnitude / 100) % 100,
        magnitude % 100,
        micros.abs(),
    )
}

fn time_from_decimal(d: Decimal) -> Option<Duration> {
    let whole = d.trunc().to_i64()?;
    let micros = round_decimal(d.fract() * Decimal::from(1_000_000), 0).to_i64()?;
    time_from_number(whole, micros)
}

fn to_time(value: &Value) -> RefractResult<Duration> {
    let parsed = match value {
        Value::Time(t) => Some(*t),
        Value::DateTime(dt) => Some(dt.time() - NaiveTime::MIN),
        Value::Date(_) => Some(Duration::zero()),
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => {
            time_from_number(value.try_as_i64()?, 0)
        }
        Value::UTinyInt(_) | Value::USmallInt(_) | Value::UInteger(_) | Value::UBigInt(_) => {
            i64::try_from(value.try_as_u64()?)
                .ok()
                .and_then(|n| time_from_number(n, 0))
        }
        Value::Decimal(d) => time_from_decimal(*d),
        Value::Float(_) | Value::Double(_) => {
            Decimal::from_f64(value.try_as_f64()?).and_then(time_from_decimal)
        }
        _ => text_of(value).and_then(|s| parse_time(&s)),
    };
    parsed.ok_or_else(|| conversion_error(value, "TIME"))
}

fn to_json(value: &Value) -> RefractResult<serde_json::Value> {
    use serde_json::Value as Json;
    match value {
        Value::Null => Ok(Json::Null),
        Value::JSON(j) => Ok(j.clone()),
        Value::Boolean(b) => Ok(Json::Bool(*b)),
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => {
            Ok(Json::from(value.try_as_i64()?))
        }
        Value::UTinyInt(_) | Value::USmallInt(_) | Value::UInteger(_) | Value::UBigInt(_) => {
            Ok(Json::from(value.try_as_u64()?))
        }
        Value::Float(_) | Value::Double(_) => serde_json::Number::from_f64(value.try_as_f64()?)
            .map(Json::Number)
            .ok_or_else(|| RefractError::InvalidJson(value.to_string())),
        Value::Decimal(d) => serde_json::from_str(&d.to_string())
            .map_err(|e| RefractError::InvalidJson(e.to_string())),
        Value::Varchar(s) => {
            serde_json::from_str(s).map_err(|e| RefractError::InvalidJson(e.to_string()))
        }
        Value::Blob(b) => {
            serde_json::from_slice(b).map_err(|e| RefractError::InvalidJson(e.to_string()))
        }
        Value::Date(_) | Value::DateTime(_) | Value::Time(_) => {
            Ok(Json::String(value.to_sql_string()))
        }
        Value::Tuple(values) => values
            .iter()
            .map(to_json)
            .collect::<RefractResult<Vec<_>>>()
            .map(Json::Array),
    }
}

fn to_boolean(value: &Value) -> RefractResult<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Integer(_) | Value::BigInt(_) => {
            Ok(value.try_as_i64()? != 0)
        }
        Value::UTinyInt(_) | Value::USmallInt(_) | Value::UInteger(_) | Value::UBigInt(_) => {
            Ok(value.try_as_u64()? != 0)
        }
        Value::Float(_) | Value::Double(_) => Ok(value.try_as_f64()? != 0.0),
        Value::Decimal(d) => Ok(!d.is_zero()),
        Value::Date(_) | Value::DateTime(_) => Ok(true),
        Value::Time(t) => Ok(!t.is_zero()),
        Value::JSON(serde_json::Value::Null) => Ok(false),
        Value::JSON(serde_json::Value::Bool(b)) => Ok(*b),
        Value::JSON(serde_json::Value::Number(n)) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::JSON(serde_json::Value::String(s)) => Ok(text_to_boolean(s)),
        Value::JSON(_) => Ok(true),
        Value::Varchar(s) => Ok(text_to_boolean(s)),
        Value::Blob(b) => Ok(text_to_boolean(&String::from_utf8_lossy(b))),
        Value::Tuple(_) => Err(tuple_error()),
        Value::Null => Ok(false),
    }
}

fn text_to_boolean(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return true;
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return false;
    }
    numeric_prefix(trimmed)
        .parse::<f64>()
        .is_ok_and(|f| f != 0.0)
}

/// Longest prefix of `text` (after leading blanks) that reads as a number
pub fn numeric_prefix(text: &str) -> &str {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac = end + 1;
        while frac < bytes.len() && bytes[frac].is_ascii_digit() {
            frac += 1;
        }
        if frac > end + 1 || has_digits {
            has_digits = has_digits || frac > end + 1;
            end = frac;
        }
    }
    if !has_digits {
        return "";
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let exp_digits = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > exp_digits {
            end = exp;
        }
    }
    text[..end].trim_end_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Collation;
    use std::cmp::Ordering;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_integer_conversions() -> RefractResult<()> {
        assert_eq!(LogicalType::BigInt.convert(&Value::varchar(" 42 "))?, Value::BigInt(42));
        assert_eq!(LogicalType::BigInt.convert(&Value::Double(2.5))?, Value::BigInt(3));
        assert_eq!(LogicalType::BigInt.convert(&Value::Double(-2.5))?, Value::BigInt(-3));
        assert_eq!(LogicalType::Integer.convert(&Value::varchar("1.6"))?, Value::Integer(2));
        assert!(matches!(
            LogicalType::TinyInt.convert(&Value::Integer(300)),
            Err(RefractError::OutOfRange(_))
        ));
        assert!(matches!(
            LogicalType::UBigInt.convert(&Value::BigInt(-1)),
            Err(RefractError::OutOfRange(_))
        ));
        assert!(LogicalType::BigInt.convert(&Value::varchar("abc")).is_err());
        Ok(())
    }

    #[test]
    fn test_null_converts_to_null() -> RefractResult<()> {
        for t in [LogicalType::BigInt, LogicalType::JSON, LogicalType::Date, LogicalType::text()] {
            assert_eq!(t.convert(&Value::Null)?, Value::Null);
        }
        Ok(())
    }

    #[test]
    fn test_decimal_conversions() -> RefractResult<()> {
        assert_eq!(
            LogicalType::decimal(10, 2).convert(&Value::varchar("1.005"))?,
            Value::Decimal(dec("1.01"))
        );
        assert_eq!(
            LogicalType::decimal(10, 2).convert(&Value::Integer(3))?.to_string(),
            "3.00"
        );
        assert!(matches!(
            LogicalType::decimal(3, 2).convert(&Value::Integer(10)),
            Err(RefractError::OutOfRange(_))
        ));
        assert_eq!(
            LogicalType::decimal_unbounded().convert(&Value::varchar("1.5e2"))?,
            Value::Decimal(dec("150"))
        );
        Ok(())
    }

    #[test]
    fn test_text_and_binary_conversions() -> RefractResult<()> {
        let char3 = LogicalType::Char {
            length: 3,
            collation: Collation::default(),
        };
        assert_eq!(char3.convert(&Value::varchar("abcdef"))?, Value::varchar("abc"));
        assert_eq!(LogicalType::text().convert(&Value::Integer(5))?, Value::varchar("5"));
        assert_eq!(
            LogicalType::Binary { length: 3 }.convert(&Value::varchar("a"))?,
            Value::Blob(vec![b'a', 0, 0])
        );
        assert!(LogicalType::text()
            .convert(&Value::tuple(vec![Value::Integer(1)]))
            .is_err());
        Ok(())
    }

    #[test]
    fn test_date_conversions() -> RefractResult<()> {
        let d = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        assert_eq!(LogicalType::Date.convert(&Value::varchar("2021-03-04"))?, Value::Date(d));
        assert_eq!(
            LogicalType::Date.convert(&Value::varchar("2021-03-04 10:11:12"))?,
            Value::Date(d)
        );
        assert_eq!(LogicalType::Date.convert(&Value::Integer(20210304))?, Value::Date(d));
        assert_eq!(
            LogicalType::DateTime.convert(&Value::Date(d))?,
            Value::DateTime(d.and_time(NaiveTime::MIN))
        );
        assert!(LogicalType::Date.convert(&Value::varchar("not a date")).is_err());
        assert_eq!(LogicalType::BigInt.convert(&Value::Date(d))?, Value::BigInt(20210304));
        Ok(())
    }

    #[test]
    fn test_time_conversions() -> RefractResult<()> {
        let clock = |h: i64, m: i64, s: i64| {
            Value::Time(Duration::hours(h) + Duration::minutes(m) + Duration::seconds(s))
        };
        let time = LogicalType::Time;
        assert_eq!(time.convert(&Value::varchar("12:34:56"))?, clock(12, 34, 56));
        assert_eq!(time.convert(&Value::varchar("12:34"))?, clock(12, 34, 0));
        assert_eq!(
            time.convert(&Value::varchar("-838:59:59"))?,
            Value::Time(-Duration::seconds(MAX_TIME_SECONDS))
        );
        assert_eq!(time.convert(&Value::varchar("1 02:00:00"))?, clock(26, 0, 0));
        assert_eq!(time.convert(&Value::varchar("2021-03-04 10:11:12"))?, clock(10, 11, 12));
        assert_eq!(time.convert(&Value::Integer(123456))?, clock(12, 34, 56));
        assert_eq!(
            time.convert(&Value::Decimal(dec("5.25")))?,
            Value::Time(Duration::seconds(5) + Duration::microseconds(250_000))
        );

        assert!(time.convert(&Value::varchar("839:00:00")).is_err());
        assert!(time.convert(&Value::varchar("12:61:00")).is_err());
        assert!(time.convert(&Value::varchar("noon")).is_err());
        assert!(time.convert(&Value::Integer(9999999)).is_err());

        assert_eq!(LogicalType::BigInt.convert(&clock(1, 2, 3))?, Value::BigInt(10203));
        assert_eq!(
            LogicalType::text().convert(&clock(100, 0, 1))?,
            Value::varchar("100:00:01")
        );
        assert_eq!(time.compare(&clock(1, 0, 0), &Value::varchar("00:59:59"))?, Ordering::Greater);
        Ok(())
    }

    #[test]
    fn test_json_conversions() -> RefractResult<()> {
        assert_eq!(
            LogicalType::JSON.convert(&Value::varchar(r#"{"a": [1, 2]}"#))?,
            Value::json(serde_json::json!({"a": [1, 2]}))
        );
        assert!(matches!(
            LogicalType::JSON.convert(&Value::varchar("{oops")),
            Err(RefractError::InvalidJson(_))
        ));
        assert_eq!(
            LogicalType::JSON.convert(&Value::Integer(3))?,
            Value::json(serde_json::json!(3))
        );
        Ok(())
    }

    #[test]
    fn test_boolean_conversion() -> RefractResult<()> {
        assert_eq!(LogicalType::Boolean.convert(&Value::Integer(2))?, Value::Boolean(true));
        assert_eq!(LogicalType::Boolean.convert(&Value::varchar("0.0"))?, Value::Boolean(false));
        assert_eq!(LogicalType::Boolean.convert(&Value::varchar("abc"))?, Value::Boolean(false));
        assert_eq!(LogicalType::Boolean.convert(&Value::varchar("TRUE"))?, Value::Boolean(true));
        Ok(())
    }

    #[test]
    fn test_truncating_conversion() {
        assert_eq!(
            LogicalType::BigInt.convert_truncating(&Value::varchar("12abc")),
            Some(Value::BigInt(12))
        );
        assert_eq!(
            LogicalType::Double.convert_truncating(&Value::varchar("abc")),
            Some(Value::Double(0.0))
        );
        assert_eq!(LogicalType::Date.convert_truncating(&Value::varchar("abc")), None);
    }

    #[test]
    fn test_numeric_prefix() {
        assert_eq!(numeric_prefix("  -12.5e3xyz"), "-12.5e3");
        assert_eq!(numeric_prefix("7e"), "7");
        assert_eq!(numeric_prefix(".5"), ".5");
        assert_eq!(numeric_prefix("3."), "3");
        assert_eq!(numeric_prefix("x1"), "");
        assert_eq!(numeric_prefix("-"), "");
    }
}
