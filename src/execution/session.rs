//! Session state read and written by expressions
//!
//! Expressions only talk to the session through the [`Session`] trait:
//! variable reads/writes, warnings, and the last-query info that
//! auto-values hand back to the client. [`BaseSession`] is the in-process
//! implementation; every accessor takes `&self` and synchronizes
//! internally, so one session can be shared by concurrent row batches.

use crate::common::config::EngineConfig;
use crate::common::constants::WARNING_LEVEL;
use crate::common::error::{RefractError, RefractResult};
use crate::types::Value;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Scope of a system variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableScope {
    Session,
    Global,
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VariableScope::Session => write!(f, "SESSION"),
            VariableScope::Global => write!(f, "GLOBAL"),
        }
    }
}

/// A warning attached to the statement that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub level: String,
    pub code: u16,
    pub message: String,
}

impl Warning {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            level: WARNING_LEVEL.to_string(),
            code,
            message: message.into(),
        }
    }
}

/// Session capabilities the expression core depends on
pub trait Session: fmt::Debug + Send + Sync {
    /// Connection id of this session
    fn id(&self) -> u32;

    /// Read a system variable; unknown names are an error
    fn system_variable(&self, name: &str, scope: VariableScope) -> RefractResult<Value>;

    /// Write a system variable; unknown names are an error
    fn set_system_variable(
        &self,
        name: &str,
        scope: VariableScope,
        value: Value,
    ) -> RefractResult<()>;

    /// Read a user variable; unset variables read as NULL
    fn user_variable(&self, name: &str) -> Value;

    fn set_user_variable(&self, name: &str, value: Value);

    /// Record a warning for the current statement
    fn warn(&self, warning: Warning);

    fn warnings(&self) -> Vec<Warning>;

    fn warning_count(&self) -> usize {
        self.warnings().len()
    }

    fn clear_warnings(&self);

    /// Last-query info such as LAST_INSERT_ID / LAST_INSERT_UUID
    fn last_query_info(&self, key: &str) -> Value;

    fn set_last_query_info(&self, key: &str, value: Value);
}

/// Shared handle to a session
pub type SessionRef = Arc<dyn Session>;

static NEXT_SESSION_ID: AtomicU32 = AtomicU32::new(1);

/// Global system variables shared by every session created from them
#[derive(Debug, Default)]
pub struct GlobalVariables {
    values: RwLock<HashMap<String, Value>>,
}

impl GlobalVariables {
    /// Seed global variables from configuration defaults
    pub fn from_config(config: &EngineConfig) -> Arc<Self> {
        let values = config
            .system_variables
            .iter()
            .map(|(name, value)| (name.to_lowercase(), Value::from_json_scalar(value)))
            .collect();
        Arc::new(Self {
            values: RwLock::new(values),
        })
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) -> bool {
        let mut values = self.values.write();
        match values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> HashMap<String, Value> {
        self.values.read().clone()
    }
}

/// In-process session
#[derive(Debug)]
pub struct BaseSession {
    id: u32,
    globals: Arc<GlobalVariables>,
    system_variables: RwLock<HashMap<String, Value>>,
    user_variables: RwLock<HashMap<String, Value>>,
    warnings: Mutex<Vec<Warning>>,
    last_query_info: RwLock<HashMap<String, Value>>,
}

impl BaseSession {
    /// New session whose SESSION variables start as a copy of `globals`
    pub fn new(globals: Arc<GlobalVariables>) -> Self {
        let system_variables = globals.snapshot();
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            globals,
            system_variables: RwLock::new(system_variables),
            user_variables: RwLock::new(HashMap::new()),
            warnings: Mutex::new(Vec::new()),
            last_query_info: RwLock::new(HashMap::new()),
        }
    }

    /// New session with its own globals seeded from `config`
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(GlobalVariables::from_config(config))
    }
}

impl Default for BaseSession {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl Session for BaseSession {
    fn id(&self) -> u32 {
        self.id
    }

    fn system_variable(&self, name: &str, scope: VariableScope) -> RefractResult<Value> {
        let key = name.to_lowercase();
        let value = match scope {
            VariableScope::Session => self.system_variables.read().get(&key).cloned(),
            VariableScope::Global => self.globals.get(&key),
        };
        value.ok_or_else(|| RefractError::UnknownSystemVariable(name.to_string()))
    }

    fn set_system_variable(
        &self,
        name: &str,
        scope: VariableScope,
        value: Value,
    ) -> RefractResult<()> {
        let key = name.to_lowercase();
        let known = match scope {
            VariableScope::Session => {
                let mut values = self.system_variables.write();
                match values.get_mut(&key) {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None => false,
                }
            }
            VariableScope::Global => self.globals.set(&key, value),
        };
        if known {
            Ok(())
        } else {
            Err(RefractError::UnknownSystemVariable(name.to_string()))
        }
    }

    fn user_variable(&self, name: &str) -> Value {
        self.user_variables
            .read()
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn set_user_variable(&self, name: &str, value: Value) {
        self.user_variables.write().insert(name.to_lowercase(), value);
    }

    fn warn(&self, warning: Warning) {
        tracing::debug!(
            session = self.id,
            code = warning.code,
            message = %warning.message,
            "statement warning"
        );
        self.warnings.lock().push(warning);
    }

    fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    fn warning_count(&self) -> usize {
        self.warnings.lock().len()
    }

    fn clear_warnings(&self) {
        self.warnings.lock().clear();
    }

    fn last_query_info(&self, key: &str) -> Value {
        self.last_query_info
            .read()
            .get(key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn set_last_query_info(&self, key: &str, value: Value) {
        self.last_query_info.write().insert(key.to_string(), value);
    }
}
