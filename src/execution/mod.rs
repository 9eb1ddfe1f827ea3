//! Execution support for the expression core
//!
//! Everything an expression needs from the outside world at evaluation
//! time lives here: the per-statement [`ExecutionContext`], the session
//! capability trait, the row-iteration contract nested plans implement,
//! table capabilities for auto-increment and full-text lookups, and
//! partitioned aggregation over row batches.

pub mod context;
pub mod iterator;
pub mod parallel;
pub mod session;
pub mod table;

pub use context::*;
pub use iterator::*;
pub use parallel::*;
pub use session::*;
pub use table::*;
