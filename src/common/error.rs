//! Error handling for the refract expression core

use thiserror::Error;

/// Main error type for expression construction and evaluation
#[derive(Error, Debug)]
pub enum RefractError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// `WithChildren` received the wrong number of children
    #[error("invalid children number for {expression}: got {got}, expected {expected}")]
    InvalidChildrenNumber {
        expression: String,
        got: usize,
        expected: usize,
    },

    /// A field read past the end of the row
    #[error("field index {index} out of bounds (row length: {len})")]
    FieldIndexOutOfBounds { index: usize, len: usize },

    #[error("Unable to cast between types: {0}")]
    UnableToCast(String),

    #[error("{0} value is out of range")]
    OutOfRange(String),

    #[error("invalid JSON text: {0}")]
    InvalidJson(String),

    #[error("too many rows")]
    TooManyRows,

    #[error("Unknown system variable '{0}'")]
    UnknownSystemVariable(String),

    #[error("COLLATE clause requires a string expression, found {0}")]
    CollatedExprWrongType(String),

    #[error("COLLATION '{collation}' is not valid for CHARACTER SET '{charset}'")]
    CollationInvalidForCharset { collation: String, charset: String },

    #[error("Unknown collation: '{0}'")]
    UnknownCollation(String),

    #[error("query cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RefractError>;

/// Result type alias for refract operations (alias for Result)
pub type RefractResult<T> = std::result::Result<T, RefractError>;

impl RefractError {
    /// Arity error for `with_children` on the expression rendered as `expression`
    pub fn invalid_children(expression: impl ToString, got: usize, expected: usize) -> Self {
        RefractError::InvalidChildrenNumber {
            expression: expression.to_string(),
            got,
            expected,
        }
    }
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_err {
    ($msg:expr) => {
        $crate::common::error::RefractError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::RefractError::Internal(format!($fmt, $($arg)*))
    };
}

/// Macro for creating not implemented errors
#[macro_export]
macro_rules! not_implemented_err {
    ($msg:expr) => {
        $crate::common::error::RefractError::NotImplemented($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::RefractError::NotImplemented(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_error_message() {
        let err = RefractError::invalid_children("NOT(a)", 2, 1);
        assert_eq!(
            err.to_string(),
            "invalid children number for NOT(a): got 2, expected 1"
        );
    }

    #[test]
    fn test_macros() {
        let err = internal_err!("slot {} missing", 3);
        assert!(matches!(err, RefractError::Internal(ref m) if m == "slot 3 missing"));
        let err = not_implemented_err!("'IN BOOLEAN MODE' has not yet been implemented");
        assert_eq!(
            err.to_string(),
            "Not implemented: 'IN BOOLEAN MODE' has not yet been implemented"
        );
    }
}
