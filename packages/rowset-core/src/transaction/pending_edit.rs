use crate::row::{Row, RowId};
use crate::value::Value;

/// A single mutation staged against a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingEdit {
    /// Replace one column value of an existing row
    ColumnUpdate {
        /// Table holding the row
        table: String,
        /// Row being updated
        row: RowId,
        /// Column name as declared in the table schema
        column: String,
        /// New value
        value: Value,
    },
    /// Append a new row with a freshly allocated id
    InsertRow {
        /// Target table
        table: String,
        /// Full row in table column order
        row: Row,
    },
    /// Remove an existing row
    DeleteRow {
        /// Table holding the row
        table: String,
        /// Row being removed
        row: RowId,
    },
}

impl PendingEdit {
    /// Returns the table the edit targets.
    pub fn table(&self) -> &str {
        match self {
            PendingEdit::ColumnUpdate { table, .. }
            | PendingEdit::InsertRow { table, .. }
            | PendingEdit::DeleteRow { table, .. } => table,
        }
    }

    /// Returns the id of the row the edit touches.
    pub fn row_id(&self) -> RowId {
        match self {
            PendingEdit::ColumnUpdate { row, .. } | PendingEdit::DeleteRow { row, .. } => *row,
            PendingEdit::InsertRow { row, .. } => row.id,
        }
    }
}
