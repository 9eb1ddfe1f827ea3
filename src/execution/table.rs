//! Table-side capabilities used by auto-values and full-text matching

use crate::common::error::RefractResult;
use crate::execution::context::ExecutionContext;
use crate::execution::iterator::{RowIter, RowsIter};
use crate::types::{Row, Value};
use parking_lot::RwLock;
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A table with an auto-increment column. Implementations own the
/// concurrency guarantees of allocation.
pub trait AutoIncrementTable: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Allocate the next auto-increment value
    fn next_auto_increment(&self, ctx: &ExecutionContext) -> RefractResult<u64>;

    /// Highest value allocated or observed so far
    fn last_auto_increment(&self, ctx: &ExecutionContext) -> RefractResult<u64>;

    /// Raise the high-water mark to at least `value`
    fn observe_auto_increment(&self, ctx: &ExecutionContext, value: u64) -> RefractResult<()>;
}

/// In-memory auto-increment counter
#[derive(Debug)]
pub struct MemoryAutoIncrementTable {
    name: String,
    last: AtomicU64,
}

impl MemoryAutoIncrementTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self::starting_after(name, 0)
    }

    /// Counter whose next allocation is `last + 1`
    pub fn starting_after(name: impl Into<String>, last: u64) -> Self {
        Self {
            name: name.into(),
            last: AtomicU64::new(last),
        }
    }
}

impl AutoIncrementTable for MemoryAutoIncrementTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_auto_increment(&self, ctx: &ExecutionContext) -> RefractResult<u64> {
        ctx.check_cancelled()?;
        Ok(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn last_auto_increment(&self, _ctx: &ExecutionContext) -> RefractResult<u64> {
        Ok(self.last.load(Ordering::SeqCst))
    }

    fn observe_auto_increment(&self, ctx: &ExecutionContext, value: u64) -> RefractResult<()> {
        ctx.check_cancelled()?;
        self.last.fetch_max(value, Ordering::SeqCst);
        Ok(())
    }
}

/// Exact-match range: every indexed column pinned to one value
#[derive(Debug, Clone, PartialEq)]
pub struct ExactRange {
    pub values: Vec<Value>,
}

impl ExactRange {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// A table addressable through an index keyed by exact-match ranges
pub trait IndexedTable: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Rows whose leading index columns equal the range's values
    fn lookup(&self, ctx: &ExecutionContext, range: &ExactRange) -> RefractResult<Box<dyn RowIter>>;
}

pub type IndexedTableRef = Arc<dyn IndexedTable>;

/// In-memory indexed table; lookups scan and compare with each value's own type
#[derive(Debug, Default)]
pub struct MemoryIndexedTable {
    name: String,
    rows: RwLock<Vec<Row>>,
}

impl MemoryIndexedTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn insert(&self, row: Row) {
        self.rows.write().push(row);
    }

    fn matches(row: &Row, range: &ExactRange) -> RefractResult<bool> {
        for (i, expected) in range.values.iter().enumerate() {
            let Some(actual) = row.get(i) else {
                return Ok(false);
            };
            if actual.is_null() || expected.is_null() {
                return Ok(false);
            }
            if expected.compare(actual)? != CmpOrdering::Equal {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl IndexedTable for MemoryIndexedTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, ctx: &ExecutionContext, range: &ExactRange) -> RefractResult<Box<dyn RowIter>> {
        ctx.check_cancelled()?;
        let rows = self.rows.read();
        let mut matched = Vec::new();
        for row in rows.iter() {
            if Self::matches(row, range)? {
                matched.push(row.clone());
            }
        }
        Ok(Box::new(RowsIter::new(matched)))
    }
}
