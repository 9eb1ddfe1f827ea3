//! `INTERVAL n unit` operands of date arithmetic

use crate::common::error::{RefractError, RefractResult};
use crate::execution::ExecutionContext;
use crate::expression::comparison::convert_lenient;
use crate::expression::shape::UnaryExpression;
use crate::expression::{Expression, ExpressionRef};
use crate::internal_err;
use crate::types::{LogicalType, Row, Value};
use chrono::{Duration, Months, NaiveDateTime};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Microsecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
    DayHour,
    DayMinute,
    DaySecond,
    HourMinute,
    HourSecond,
    MinuteSecond,
    YearMonth,
}

/// Fields a compound unit is spelled with, most significant first
#[derive(Clone, Copy)]
enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl IntervalUnit {
    pub fn from_name(name: &str) -> RefractResult<Self> {
        let unit = match name.to_ascii_uppercase().as_str() {
            "MICROSECOND" => IntervalUnit::Microsecond,
            "SECOND" => IntervalUnit::Second,
            "MINUTE" => IntervalUnit::Minute,
            "HOUR" => IntervalUnit::Hour,
            "DAY" => IntervalUnit::Day,
            "WEEK" => IntervalUnit::Week,
            "MONTH" => IntervalUnit::Month,
            "QUARTER" => IntervalUnit::Quarter,
            "YEAR" => IntervalUnit::Year,
            "DAY_HOUR" => IntervalUnit::DayHour,
            "DAY_MINUTE" => IntervalUnit::DayMinute,
            "DAY_SECOND" => IntervalUnit::DaySecond,
            "HOUR_MINUTE" => IntervalUnit::HourMinute,
            "HOUR_SECOND" => IntervalUnit::HourSecond,
            "MINUTE_SECOND" => IntervalUnit::MinuteSecond,
            "YEAR_MONTH" => IntervalUnit::YearMonth,
            other => {
                return Err(RefractError::InvalidArgument(format!(
                    "invalid interval unit: {}",
                    other
                )))
            }
        };
        Ok(unit)
    }

    pub fn name(&self) -> &'static str {
        match self {
            IntervalUnit::Microsecond => "MICROSECOND",
            IntervalUnit::Second => "SECOND",
            IntervalUnit::Minute => "MINUTE",
            IntervalUnit::Hour => "HOUR",
            IntervalUnit::Day => "DAY",
            IntervalUnit::Week => "WEEK",
            IntervalUnit::Month => "MONTH",
            IntervalUnit::Quarter => "QUARTER",
            IntervalUnit::Year => "YEAR",
            IntervalUnit::DayHour => "DAY_HOUR",
            IntervalUnit::DayMinute => "DAY_MINUTE",
            IntervalUnit::DaySecond => "DAY_SECOND",
            IntervalUnit::HourMinute => "HOUR_MINUTE",
            IntervalUnit::HourSecond => "HOUR_SECOND",
            IntervalUnit::MinuteSecond => "MINUTE_SECOND",
            IntervalUnit::YearMonth => "YEAR_MONTH",
        }
    }

    /// Units that never move the time of day
    pub fn is_date_only(&self) -> bool {
        matches!(
            self,
            IntervalUnit::Day
                | IntervalUnit::Week
                | IntervalUnit::Month
                | IntervalUnit::Quarter
                | IntervalUnit::Year
                | IntervalUnit::YearMonth
        )
    }

    fn compound_fields(&self) -> Option<&'static [Field]> {
        use Field::*;
        match self {
            IntervalUnit::DayHour => Some(&[Day, Hour]),
            IntervalUnit::DayMinute => Some(&[Day, Hour, Minute]),
            IntervalUnit::DaySecond => Some(&[Day, Hour, Minute, Second]),
            IntervalUnit::HourMinute => Some(&[Hour, Minute]),
            IntervalUnit::HourSecond => Some(&[Hour, Minute, Second]),
            IntervalUnit::MinuteSecond => Some(&[Minute, Second]),
            IntervalUnit::YearMonth => Some(&[Year, Month]),
            _ => None,
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calendar amount an interval stands for. Months and years are applied
/// with month arithmetic, the rest as an exact duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalDelta {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub microseconds: i64,
}

impl IntervalDelta {
    fn set(&mut self, field: Field, amount: i64) {
        match field {
            Field::Year => self.years = amount,
            Field::Month => self.months = amount,
            Field::Day => self.days = amount,
            Field::Hour => self.hours = amount,
            Field::Minute => self.minutes = amount,
            Field::Second => self.seconds = amount,
        }
    }

    fn total_months(&self) -> Option<i64> {
        self.years.checked_mul(12)?.checked_add(self.months)
    }

    fn total_microseconds(&self) -> Option<i64> {
        let hours = self.days.checked_mul(24)?.checked_add(self.hours)?;
        let minutes = hours.checked_mul(60)?.checked_add(self.minutes)?;
        let seconds = minutes.checked_mul(60)?.checked_add(self.seconds)?;
        seconds
            .checked_mul(1_000_000)?
            .checked_add(self.microseconds)
    }

    /// Shift `at` forwards, or backwards when `subtract`. `None` when the
    /// result leaves the supported calendar range.
    pub fn apply(&self, at: NaiveDateTime, subtract: bool) -> Option<NaiveDateTime> {
        let sign = if subtract { -1 } else { 1 };
        let months = self.total_months()?.checked_mul(sign)?;
        let micros = self.total_microseconds()?.checked_mul(sign)?;

        let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
        let shifted = if months >= 0 {
            at.checked_add_months(magnitude)?
        } else {
            at.checked_sub_months(magnitude)?
        };
        shifted.checked_add_signed(Duration::microseconds(micros))
    }
}

/// Split `"1 2:30:05"` style text into signed integer parts
fn split_compound(text: &str) -> Option<Vec<i64>> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let parts: Vec<i64> = body
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<i64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.is_empty() {
        return None;
    }
    Some(
        parts
            .into_iter()
            .map(|p| if negative { -p } else { p })
            .collect(),
    )
}

/// `INTERVAL child unit`. Only meaningful as an operand of `+`/`-`.
#[derive(Debug, Clone)]
pub struct Interval {
    unary: UnaryExpression,
    unit: IntervalUnit,
}

impl Interval {
    pub fn new(child: ExpressionRef, unit: IntervalUnit) -> Self {
        Self {
            unary: UnaryExpression::new(child),
            unit,
        }
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    /// Amount this interval stands for on `row`, `None` for a NULL amount
    /// or a compound amount that does not parse
    pub fn evaluate_delta(
        &self,
        ctx: &ExecutionContext,
        row: &Row,
    ) -> RefractResult<Option<IntervalDelta>> {
        let value = self.unary.child.evaluate(ctx, row)?;
        if value.is_null() {
            return Ok(None);
        }

        let mut delta = IntervalDelta::default();
        if let Some(fields) = self.unit.compound_fields() {
            let text = LogicalType::text().convert(&value)?.try_as_str()?.to_string();
            let Some(parts) = split_compound(&text) else {
                return Ok(None);
            };
            if parts.len() > fields.len() {
                return Ok(None);
            }
            // short forms fill the least significant fields
            let offset = fields.len() - parts.len();
            for (field, amount) in fields[offset..].iter().zip(parts) {
                delta.set(*field, amount);
            }
            return Ok(Some(delta));
        }

        let amount = convert_lenient(ctx, &LogicalType::BigInt, &value)?.try_as_i64()?;
        let overflow = || RefractError::OutOfRange("INTERVAL".to_string());
        match self.unit {
            IntervalUnit::Microsecond => delta.microseconds = amount,
            IntervalUnit::Second => delta.seconds = amount,
            IntervalUnit::Minute => delta.minutes = amount,
            IntervalUnit::Hour => delta.hours = amount,
            IntervalUnit::Day => delta.days = amount,
            IntervalUnit::Week => delta.days = amount.checked_mul(7).ok_or_else(overflow)?,
            IntervalUnit::Month => delta.months = amount,
            IntervalUnit::Quarter => delta.months = amount.checked_mul(3).ok_or_else(overflow)?,
            IntervalUnit::Year => delta.years = amount,
            compound => return Err(internal_err!("{} is a compound unit", compound)),
        }
        Ok(Some(delta))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INTERVAL {} {}", self.unary.child, self.unit)
    }
}

impl Expression for Interval {
    /// Intervals carry no SQL type of their own
    fn return_type(&self) -> LogicalType {
        LogicalType::Null
    }

    fn evaluate(&self, _ctx: &ExecutionContext, _row: &Row) -> RefractResult<Value> {
        panic!("interval is only an operand of date arithmetic, but evaluate was called")
    }

    fn is_nullable(&self) -> bool {
        self.unary.is_nullable()
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let child = UnaryExpression::child_from(self, children)?;
        Ok(Arc::new(Interval::new(child, self.unit)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
