//! Constants used throughout refract

/// MySQL warning code for a value truncated during an implicit conversion
pub const ER_TRUNCATED_WRONG_VALUE: u16 = 1292;

/// Warning level reported alongside `ER_TRUNCATED_WRONG_VALUE`
pub const WARNING_LEVEL: &str = "Warning";

/// Largest decimal precision accepted by DECIMAL(p, s)
pub const MAX_DECIMAL_PRECISION: u8 = 65;

/// Largest scale `rust_decimal` can carry
pub const MAX_DECIMAL_SCALE: u8 = 28;

/// Default extra digits of scale produced by `/`
pub const DEFAULT_DIV_PRECISION_INCREMENT: u8 = 4;

/// Name of the system variable controlling `/` scale
pub const DIV_PRECISION_INCREMENT: &str = "div_precision_increment";

/// Last-query info key holding the first auto-generated id of a statement
pub const LAST_INSERT_ID: &str = "last_insert_id";

/// Last-query info key holding the first auto-generated UUID of a statement
pub const LAST_INSERT_UUID: &str = "last_insert_uuid";

/// Default collation for text values
pub const DEFAULT_COLLATION: &str = "utf8mb4_0900_bin";

/// Date layout used for DATE parsing and display
pub const DATE_LAYOUT: &str = "%Y-%m-%d";

/// Datetime layout used for DATETIME display
pub const DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Largest TIME magnitude in seconds, 838:59:59
pub const MAX_TIME_SECONDS: i64 = 838 * 3600 + 59 * 60 + 59;

/// MySQL warning code for a division whose divisor is zero
pub const ER_DIVISION_BY_ZERO: u16 = 1365;
