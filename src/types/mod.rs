//! Type system module
//!
//! This module contains the core type system components:
//! - Value: closed sum type of runtime cell values
//! - LogicalType: SQL-level types with compare, convert and zero
//! - Collation: string ordering rules and their character sets
//! - Row: positional value sequences (also used as aggregate buffers)

pub mod collation;
pub mod conversion;
pub mod logical_type;
pub mod row;
pub mod value;

// Re-export main types for convenience
pub use collation::{CharacterSet, Collation};
pub use conversion::{numeric_prefix, parse_date, parse_datetime};
pub use logical_type::{compare_nulls, LogicalType};
pub use row::Row;
pub use value::Value;
