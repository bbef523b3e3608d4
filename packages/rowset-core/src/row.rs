//! Rows and stable row identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Stable row identifier assigned by the store at creation.
///
/// Independent of the row's position in any result window and never reused
/// within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered column values identified by a row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(id: RowId, values: Vec<Value>) -> Self {
        Self { id, values }
    }

    /// Returns a row holding only the columns at `indices`, in that order.
    pub fn project(&self, indices: &[usize]) -> Row {
        Row {
            id: self.id,
            values: indices
                .iter()
                .map(|&i| self.values.get(i).cloned().unwrap_or_default())
                .collect(),
        }
    }
}
