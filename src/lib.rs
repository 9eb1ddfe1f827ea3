//! refract - SQL expression evaluation core
//!
//! refract evaluates bound SQL expression trees one row at a time with
//! MySQL semantics: three-valued logic, lenient conversions that degrade to
//! warnings, decimal-exact arithmetic, aggregates with mergeable buffers
//! and a sort comparator that latches the first evaluation error.
//!
//! ```
//! use refract::expression::{field, lit, Comparison, Expression};
//! use refract::{row, ExecutionContext, LogicalType, Value};
//!
//! let ctx = ExecutionContext::with_default_session();
//! let expr = Comparison::greater_than(field(0, LogicalType::BigInt, "x"), lit(10i64));
//! assert_eq!(expr.evaluate(&ctx, &row![42i64]).unwrap(), Value::Boolean(true));
//! ```

pub mod common;
pub mod execution;
pub mod expression;
pub mod types;

// Re-export common types for convenience
pub use common::{EngineConfig, RefractError, RefractResult};

// Re-export type system for convenience
pub use types::{Collation, LogicalType, Row, Value};

// Re-export execution entry points for convenience
pub use execution::{BaseSession, ExecutionContext, Session, SessionRef, VariableScope};

// Re-export expression system for convenience
pub use expression::{Aggregation, Expression, ExpressionRef};
