//! Row iteration contract
//!
//! Subqueries run nested plans through `QueryPlan::open` and drain the
//! returned [`RowIter`] with `next` until it reports `None`, then `close`.

use crate::common::error::RefractResult;
use crate::execution::context::ExecutionContext;
use crate::expression::ExpressionRef;
use crate::types::Row;
use std::fmt;
use std::sync::Arc;

/// A stream of rows produced by an opened plan
pub trait RowIter: Send {
    /// Next row, or `None` once exhausted
    fn next(&mut self, ctx: &ExecutionContext) -> RefractResult<Option<Row>>;

    /// Release resources; called exactly once
    fn close(&mut self, ctx: &ExecutionContext) -> RefractResult<()>;
}

/// A plan that can be executed repeatedly against a scope row
pub trait QueryPlan: fmt::Debug + fmt::Display + Send + Sync {
    /// Number of columns each output row carries
    fn schema_len(&self) -> usize;

    /// Start executing with `scope` as the outer row
    fn open(&self, ctx: &ExecutionContext, scope: &Row) -> RefractResult<Box<dyn RowIter>>;
}

pub type QueryPlanRef = Arc<dyn QueryPlan>;

/// Drain `iter`, closing it whether or not iteration failed
pub fn collect_rows(ctx: &ExecutionContext, mut iter: Box<dyn RowIter>) -> RefractResult<Vec<Row>> {
    let mut rows = Vec::new();
    let drained = loop {
        match iter.next(ctx) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    let closed = iter.close(ctx);
    drained?;
    closed?;
    Ok(rows)
}

/// Iterator over materialized rows
#[derive(Debug, Default)]
pub struct RowsIter {
    rows: std::vec::IntoIter<Row>,
}

impl RowsIter {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowIter for RowsIter {
    fn next(&mut self, ctx: &ExecutionContext) -> RefractResult<Option<Row>> {
        ctx.check_cancelled()?;
        Ok(self.rows.next())
    }

    fn close(&mut self, _ctx: &ExecutionContext) -> RefractResult<()> {
        Ok(())
    }
}

/// A plan over a fixed set of rows, ignoring the scope row
#[derive(Debug, Clone)]
pub struct ValuesPlan {
    rows: Vec<Row>,
    width: usize,
}

impl ValuesPlan {
    pub fn new(width: usize, rows: Vec<Row>) -> Self {
        Self { rows, width }
    }
}

impl fmt::Display for ValuesPlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Values({} rows)", self.rows.len())
    }
}

impl QueryPlan for ValuesPlan {
    fn schema_len(&self) -> usize {
        self.width
    }

    fn open(&self, _ctx: &ExecutionContext, _scope: &Row) -> RefractResult<Box<dyn RowIter>> {
        Ok(Box::new(RowsIter::new(self.rows.clone())))
    }
}

/// Evaluates projections over each row of a source plan. Projections see
/// the scope row followed by the source row, so outer columns keep their
/// indexes.
#[derive(Debug)]
pub struct ProjectPlan {
    source: QueryPlanRef,
    projections: Vec<ExpressionRef>,
}

impl ProjectPlan {
    pub fn new(source: QueryPlanRef, projections: Vec<ExpressionRef>) -> Self {
        Self {
            source,
            projections,
        }
    }
}

impl fmt::Display for ProjectPlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let columns: Vec<String> = self.projections.iter().map(|p| p.to_string()).collect();
        write!(f, "Project({}) <- {}", columns.join(", "), self.source)
    }
}

impl QueryPlan for ProjectPlan {
    fn schema_len(&self) -> usize {
        self.projections.len()
    }

    fn open(&self, ctx: &ExecutionContext, scope: &Row) -> RefractResult<Box<dyn RowIter>> {
        let source = self.source.open(ctx, scope)?;
        Ok(Box::new(ProjectIter {
            source,
            scope: scope.clone(),
            projections: self.projections.clone(),
        }))
    }
}

struct ProjectIter {
    source: Box<dyn RowIter>,
    scope: Row,
    projections: Vec<ExpressionRef>,
}

impl RowIter for ProjectIter {
    fn next(&mut self, ctx: &ExecutionContext) -> RefractResult<Option<Row>> {
        let Some(row) = self.source.next(ctx)? else {
            return Ok(None);
        };
        let input = self.scope.append(&row);
        self.projections
            .iter()
            .map(|p| p.evaluate(ctx, &input))
            .collect::<RefractResult<Row>>()
            .map(Some)
    }

    fn close(&mut self, ctx: &ExecutionContext) -> RefractResult<()> {
        self.source.close(ctx)
    }
}
