use crate::common::error::{RefractError, RefractResult};
use crate::types::value::Value;
use std::fmt;
use std::ops::{Index, IndexMut};

/// An ordered, fixed-length sequence of values addressed by position.
///
/// Rows are also the storage for aggregate buffers: each slot is one
/// accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Row with no columns
    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    /// Row of `len` NULLs
    pub fn nulls(len: usize) -> Self {
        Self {
            values: vec![Value::Null; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Positional read that fails instead of panicking
    pub fn field(&self, index: usize) -> RefractResult<&Value> {
        self.values
            .get(index)
            .ok_or(RefractError::FieldIndexOutOfBounds {
                index,
                len: self.values.len(),
            })
    }

    /// Positional write that fails instead of panicking
    pub fn set(&mut self, index: usize, value: Value) -> RefractResult<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(RefractError::FieldIndexOutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// This row followed by `other`
    pub fn append(&self, other: &Row) -> Row {
        let mut values = Vec::with_capacity(self.len() + other.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Row { values }
    }

    /// Copy of this row extended with NULLs up to `len` columns. Rows already
    /// at least `len` long are returned unchanged.
    pub fn pad_to(&self, len: usize) -> Row {
        let mut values = self.values.clone();
        if values.len() < len {
            values.resize(len, Value::Null);
        }
        Row { values }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Row::new(iter.into_iter().collect())
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl IndexMut<usize> for Row {
    fn index_mut(&mut self, index: usize) -> &mut Value {
        &mut self.values[index]
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

/// Build a `Row` from values convertible into `Value`
#[macro_export]
macro_rules! row {
    () => {
        $crate::types::Row::empty()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::types::Row::new(vec![$($crate::types::Value::from($value)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_bounds() -> RefractResult<()> {
        let row = crate::row![1i32, "a"];
        assert_eq!(row.field(1)?, &Value::varchar("a"));
        assert!(matches!(
            row.field(2),
            Err(RefractError::FieldIndexOutOfBounds { index: 2, len: 2 })
        ));
        Ok(())
    }

    #[test]
    fn test_pad_and_append() {
        let row = crate::row![1i32];
        let padded = row.pad_to(3);
        assert_eq!(padded.len(), 3);
        assert!(padded[2].is_null());
        assert_eq!(row.pad_to(0), row);
        assert_eq!(row.append(&crate::row![2i32]).len(), 2);
    }

    #[test]
    fn test_set_slot() -> RefractResult<()> {
        let mut buffer = Row::nulls(2);
        buffer.set(1, Value::BigInt(4))?;
        assert_eq!(buffer[1], Value::BigInt(4));
        assert!(buffer.set(5, Value::Null).is_err());
        Ok(())
    }
}
