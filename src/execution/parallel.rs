//! Partitioned aggregation
//!
//! Input rows are split into contiguous partitions that rayon aggregates
//! concurrently. Every partition owns its own buffers; no buffer is shared
//! across threads. Partial buffers are then merged in partition order, so
//! order-sensitive aggregates such as FIRST see the same result as a
//! sequential pass.

use crate::common::error::{RefractError, RefractResult};
use crate::execution::context::ExecutionContext;
use crate::expression::{Aggregation, ExpressionRef};
use crate::types::Row;
use rayon::prelude::*;

/// Inputs smaller than this are aggregated on the calling thread
pub const MIN_PARTITION_ROWS: usize = 4096;

/// A contiguous slice of the input handled by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// Starting offset in the input
    pub offset: usize,
    /// Number of rows in this partition
    pub count: usize,
    pub id: usize,
}

impl Partition {
    pub fn new(offset: usize, count: usize, id: usize) -> Self {
        Self { offset, count, id }
    }

    pub fn rows<'a>(&self, rows: &'a [Row]) -> &'a [Row] {
        &rows[self.offset..self.offset + self.count]
    }
}

/// Split `total_rows` into at most `partition_count` near-equal partitions
pub fn partitions(total_rows: usize, partition_count: usize) -> Vec<Partition> {
    if total_rows == 0 {
        return vec![];
    }
    let size = total_rows.div_ceil(partition_count.max(1));
    (0..total_rows.div_ceil(size))
        .map(|id| {
            let offset = id * size;
            Partition::new(offset, size.min(total_rows - offset), id)
        })
        .collect()
}

fn aggregations(aggregates: &[ExpressionRef]) -> RefractResult<Vec<&dyn Aggregation>> {
    aggregates
        .iter()
        .map(|expr| {
            expr.as_aggregation().ok_or_else(|| {
                RefractError::InvalidArgument(format!("{} is not an aggregate", expr))
            })
        })
        .collect()
}

fn fresh_buffers(aggs: &[&dyn Aggregation]) -> RefractResult<Vec<Row>> {
    aggs.iter().map(|agg| agg.new_buffer()).collect()
}

fn aggregate_partition(
    ctx: &ExecutionContext,
    aggs: &[&dyn Aggregation],
    rows: &[Row],
) -> RefractResult<Vec<Row>> {
    ctx.check_cancelled()?;
    let mut buffers = fresh_buffers(aggs)?;
    for row in rows {
        for (agg, buffer) in aggs.iter().zip(buffers.iter_mut()) {
            agg.update(ctx, buffer, row)?;
        }
    }
    Ok(buffers)
}

/// Aggregate `rows` over `partition_count` partitions and return one
/// finalized value per aggregate. The first error from any partition fails
/// the whole aggregation.
pub fn aggregate_partitioned(
    ctx: &ExecutionContext,
    aggregates: &[ExpressionRef],
    rows: &[Row],
    partition_count: usize,
) -> RefractResult<Row> {
    let aggs = aggregations(aggregates)?;
    let parts = partitions(rows.len(), partition_count);
    tracing::debug!(
        rows = rows.len(),
        partitions = parts.len(),
        aggregates = aggs.len(),
        "partitioned aggregation"
    );

    let partials = parts
        .par_iter()
        .map(|part| aggregate_partition(ctx, &aggs, part.rows(rows)))
        .collect::<RefractResult<Vec<_>>>()?;

    let mut buffers = fresh_buffers(&aggs)?;
    for partial in &partials {
        for ((agg, buffer), part) in aggs.iter().zip(buffers.iter_mut()).zip(partial) {
            agg.merge(ctx, buffer, part)?;
        }
    }

    aggs.iter()
        .zip(&buffers)
        .map(|(agg, buffer)| agg.evaluate(ctx, buffer))
        .collect()
}

/// [`aggregate_partitioned`] with the configured parallelism; small inputs
/// stay on the calling thread
pub fn aggregate(
    ctx: &ExecutionContext,
    aggregates: &[ExpressionRef],
    rows: &[Row],
) -> RefractResult<Row> {
    let partition_count = if rows.len() < MIN_PARTITION_ROWS {
        1
    } else {
        ctx.config().parallelism
    };
    aggregate_partitioned(ctx, aggregates, rows, partition_count)
}
