//! Execution Context
//!
//! Per-statement object threaded through every `evaluate` call. It owns the
//! session handle, the engine configuration and cancellation signaling, and
//! nothing that belongs to the expression tree itself.

use crate::common::config::EngineConfig;
use crate::common::constants::{DIV_PRECISION_INCREMENT, ER_TRUNCATED_WRONG_VALUE};
use crate::common::error::{RefractError, RefractResult};
use crate::execution::session::{BaseSession, SessionRef, VariableScope, Warning};
use crate::types::{LogicalType, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Execution context for one statement
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Session the statement runs in
    session: SessionRef,
    /// Engine configuration
    config: Arc<EngineConfig>,
    /// Set when the statement is cancelled
    cancelled: Arc<AtomicBool>,
    /// Point in time after which the statement is abandoned
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// Create a new execution context
    pub fn new(session: SessionRef, config: Arc<EngineConfig>) -> Self {
        Self {
            session,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Context over a fresh default session, mostly for tests and tools
    pub fn with_default_session() -> Self {
        let config = EngineConfig::default();
        let session: SessionRef = Arc::new(BaseSession::from_config(&config));
        Self::new(session, Arc::new(config))
    }

    /// Abandon the statement once `timeout` has elapsed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn session(&self) -> &SessionRef {
        &self.session
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Signal cancellation to every clone of this context
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if the statement was cancelled or ran past its deadline
    pub fn check_cancelled(&self) -> RefractResult<()> {
        if self.is_cancelled() {
            return Err(RefractError::Cancelled("statement cancelled".to_string()));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(RefractError::Cancelled("deadline exceeded".to_string()));
            }
        }
        Ok(())
    }

    /// Record a warning on the session
    pub fn warn(&self, code: u16, message: impl Into<String>) {
        self.session.warn(Warning::new(code, message));
    }

    /// Record the standard "Truncated incorrect <type> value" warning
    pub fn warn_truncated(&self, target: &LogicalType, value: &Value) {
        self.warn(
            ER_TRUNCATED_WRONG_VALUE,
            format!(
                "Truncated incorrect {} value: '{}'",
                target,
                value.to_sql_string()
            ),
        );
    }

    /// Scale increment for `/`, read from the session with the configured default
    pub fn div_precision_increment(&self) -> u8 {
        self.session
            .system_variable(DIV_PRECISION_INCREMENT, VariableScope::Session)
            .ok()
            .and_then(|v| LogicalType::UTinyInt.convert(&v).ok())
            .and_then(|v| v.try_as_u64().ok())
            .map(|n| n.min(30) as u8)
            .unwrap_or(self.config.div_precision_increment)
    }
}
