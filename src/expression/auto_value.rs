//! Values filled in on insert: AUTO_INCREMENT ids and generated UUIDs
//!
//! Both nodes publish the first value they produce to the session's
//! last-query info (`LAST_INSERT_ID`, `LAST_INSERT_UUID`). Publication is a
//! one-shot per node instance, so later rows of the same statement never
//! overwrite it.

use crate::common::constants::{LAST_INSERT_ID, LAST_INSERT_UUID};
use crate::common::error::RefractResult;
use crate::execution::{AutoIncrementTable, ExecutionContext};
use crate::expression::shape::UnaryExpression;
use crate::expression::{Expression, ExpressionRef};
use crate::types::{LogicalType, Row, Value};
use std::any::Any;
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Claim the one-shot flag; true only for the first caller
fn first_capture(flag: &AtomicBool) -> bool {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// Value supplied for an AUTO_INCREMENT column. NULL or zero allocates the
/// table's next id; anything larger than the table's last id raises the
/// table's high-water mark and is kept as supplied.
#[derive(Debug)]
pub struct AutoIncrement {
    unary: UnaryExpression,
    column_type: LogicalType,
    table: Arc<dyn AutoIncrementTable>,
    captured: AtomicBool,
}

impl AutoIncrement {
    pub fn new(
        child: ExpressionRef,
        column_type: LogicalType,
        table: Arc<dyn AutoIncrementTable>,
    ) -> Self {
        Self {
            unary: UnaryExpression::new(child),
            column_type,
            table,
            captured: AtomicBool::new(false),
        }
    }

    fn allocate(&self, ctx: &ExecutionContext) -> RefractResult<Value> {
        let next = self.table.next_auto_increment(ctx)?;
        tracing::debug!(table = self.table.name(), id = next, "allocated auto-increment id");
        if first_capture(&self.captured) {
            ctx.session()
                .set_last_query_info(LAST_INSERT_ID, Value::UBigInt(next));
        }
        self.column_type.convert(&Value::UBigInt(next))
    }
}

impl fmt::Display for AutoIncrement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AutoIncrement({})", self.unary.child)
    }
}

impl Expression for AutoIncrement {
    fn return_type(&self) -> LogicalType {
        self.column_type.clone()
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let supplied = self.unary.child.evaluate(ctx, row)?;
        if supplied.is_null() {
            return self.allocate(ctx);
        }

        let supplied = self.column_type.convert(&supplied)?;
        let zero = self.column_type.zero();
        if self.column_type.compare(&supplied, &zero)? == CmpOrdering::Equal {
            return self.allocate(ctx);
        }

        // negative ids never move the counter
        if let Ok(Value::UBigInt(id)) = LogicalType::UBigInt.convert(&supplied) {
            if id > self.table.last_auto_increment(ctx)? {
                self.table.observe_auto_increment(ctx, id)?;
            }
        }
        Ok(supplied)
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        let child = UnaryExpression::child_from(self, children)?;
        Ok(Arc::new(AutoIncrement::new(
            child,
            self.column_type.clone(),
            self.table.clone(),
        )))
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Value supplied for a UUID-defaulted column: a random v4 UUID when the
/// supplied value is NULL. Binary columns receive the 16 raw bytes, text
/// columns the hyphenated form.
#[derive(Debug)]
pub struct AutoUuid {
    unary: UnaryExpression,
    captured: AtomicBool,
}

impl AutoUuid {
    pub fn new(child: ExpressionRef) -> Self {
        Self {
            unary: UnaryExpression::new(child),
            captured: AtomicBool::new(false),
        }
    }

    /// Whether this node already published its value
    pub fn has_captured(&self) -> bool {
        self.captured.load(Ordering::Acquire)
    }

    fn generate(&self) -> (Value, String) {
        let uuid = Uuid::new_v4();
        let text = uuid.hyphenated().to_string();
        let value = match self.unary.child.return_type() {
            LogicalType::Blob | LogicalType::Binary { .. } => Value::blob(uuid.as_bytes().to_vec()),
            _ => Value::varchar(text.clone()),
        };
        (value, text)
    }
}

/// Text published for a supplied value; 16-byte binary values are read as UUIDs
fn uuid_text(value: &Value) -> String {
    match value {
        Value::Blob(bytes) => Uuid::from_slice(bytes)
            .map(|uuid| uuid.hyphenated().to_string())
            .unwrap_or_else(|_| hex::encode(bytes)),
        other => other.to_sql_string(),
    }
}

impl fmt::Display for AutoUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AutoUuid({})", self.unary.child)
    }
}

impl Expression for AutoUuid {
    fn return_type(&self) -> LogicalType {
        self.unary.child.return_type()
    }

    fn evaluate(&self, ctx: &ExecutionContext, row: &Row) -> RefractResult<Value> {
        let supplied = self.unary.child.evaluate(ctx, row)?;
        let (value, text) = if supplied.is_null() {
            self.generate()
        } else {
            let text = uuid_text(&supplied);
            (supplied, text)
        };

        if first_capture(&self.captured) {
            tracing::debug!(uuid = %text, "captured last insert uuid");
            ctx.session()
                .set_last_query_info(LAST_INSERT_UUID, Value::varchar(text));
        }
        Ok(value)
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn children(&self) -> Vec<ExpressionRef> {
        self.unary.children()
    }

    fn with_children(&self, children: Vec<ExpressionRef>) -> RefractResult<ExpressionRef> {
        Ok(Arc::new(AutoUuid::new(UnaryExpression::child_from(self, children)?)))
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
