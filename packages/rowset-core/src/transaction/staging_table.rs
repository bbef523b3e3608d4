use std::collections::BTreeMap;

use crate::error::DbError;
use crate::row::{Row, RowId};
use crate::store::TableSchema;
use crate::value::Value;

use super::pending_edit::PendingEdit;

/// Staged effect on one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOverlay {
    /// Column assignments replayed over the committed row
    Updated(Vec<(usize, Value)>),
    /// Row created by this transaction
    Inserted(Vec<Value>),
    /// Row removed by this transaction
    Deleted,
}

/// Holds the transaction's staged effects on a single table.
///
/// Only touched rows are recorded. Reads combine them with whatever the
/// store has committed at read time, so commits by other sessions stay
/// visible for every row and column this transaction did not write.
#[derive(Debug, Clone)]
pub struct StagingTable {
    /// Schema of the table the overlay belongs to
    pub schema: TableSchema,
    rows: BTreeMap<RowId, RowOverlay>,
}

impl StagingTable {
    /// Creates an empty overlay for a table.
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
        }
    }

    /// Validates an edit and normalizes it.
    ///
    /// Values are coerced to the column type and column names are replaced
    /// by their declared spelling. Key uniqueness is left to the store.
    ///
    /// # Arguments
    /// * `edit` - Edit to validate
    /// * `exists` - Whether the edit's row is visible to the transaction
    ///
    /// # Returns
    /// `Result<PendingEdit, DbError>` containing the normalized edit.
    pub fn check(&self, edit: PendingEdit, exists: bool) -> Result<PendingEdit, DbError> {
        match edit {
            PendingEdit::ColumnUpdate {
                table,
                row,
                column,
                value,
            } => {
                self.ensure_row(row, exists)?;
                let index = self
                    .schema
                    .column_index(&column)
                    .ok_or(DbError::UnknownColumn(column))?;
                let value = self.schema.check_value(index, value)?;
                Ok(PendingEdit::ColumnUpdate {
                    table,
                    row,
                    column: self.schema.columns[index].name.clone(),
                    value,
                })
            }
            PendingEdit::InsertRow { table, row } => {
                if exists {
                    return Err(DbError::ConstraintViolation(format!(
                        "row {} already exists in table '{}'",
                        row.id, self.schema.name
                    )));
                }
                let values = self.schema.check_row(row.values)?;
                Ok(PendingEdit::InsertRow {
                    table,
                    row: Row::new(row.id, values),
                })
            }
            PendingEdit::DeleteRow { table, row } => {
                self.ensure_row(row, exists)?;
                Ok(PendingEdit::DeleteRow { table, row })
            }
        }
    }

    /// Records a checked edit.
    ///
    /// # Returns
    /// The row's previous overlay, for undoing the edit.
    pub fn apply(&mut self, edit: &PendingEdit) -> Option<RowOverlay> {
        let id = edit.row_id();
        let previous = self.rows.get(&id).cloned();
        match edit {
            PendingEdit::ColumnUpdate { column, value, .. } => {
                let Some(index) = self.schema.column_index(column) else {
                    return previous;
                };
                match self
                    .rows
                    .entry(id)
                    .or_insert_with(|| RowOverlay::Updated(Vec::new()))
                {
                    RowOverlay::Updated(updates) => {
                        match updates.iter_mut().find(|(i, _)| *i == index) {
                            Some(slot) => slot.1 = value.clone(),
                            None => updates.push((index, value.clone())),
                        }
                    }
                    RowOverlay::Inserted(values) => values[index] = value.clone(),
                    RowOverlay::Deleted => {}
                }
            }
            PendingEdit::InsertRow { row, .. } => {
                self.rows.insert(id, RowOverlay::Inserted(row.values.clone()));
            }
            PendingEdit::DeleteRow { .. } => {
                self.rows.insert(id, RowOverlay::Deleted);
            }
        }
        previous
    }

    /// Puts back the overlay `apply` returned.
    pub fn restore(&mut self, id: RowId, previous: Option<RowOverlay>) {
        match previous {
            Some(overlay) => self.rows.insert(id, overlay),
            None => self.rows.remove(&id),
        };
    }

    /// Combines one committed row with the staged effects on it.
    pub fn overlay(&self, id: RowId, committed: Option<Row>) -> Option<Row> {
        match self.rows.get(&id) {
            None => committed,
            Some(RowOverlay::Deleted) => None,
            Some(RowOverlay::Inserted(values)) => Some(Row::new(id, values.clone())),
            Some(RowOverlay::Updated(updates)) => committed.map(|mut row| {
                for (index, value) in updates {
                    if let Some(slot) = row.values.get_mut(*index) {
                        *slot = value.clone();
                    }
                }
                row
            }),
        }
    }

    /// Combines a committed scan with the staged effects, ordered by row id.
    pub fn merge(&self, committed: Vec<Row>) -> Vec<Row> {
        let mut rows: Vec<Row> = committed
            .into_iter()
            .filter_map(|row| self.overlay(row.id, Some(row)))
            .collect();
        let inserted = self.rows.iter().filter_map(|(id, overlay)| match overlay {
            RowOverlay::Inserted(values) => Some(Row::new(*id, values.clone())),
            _ => None,
        });
        rows.extend(inserted);
        rows.sort_by_key(|row| row.id);
        rows
    }

    /// Returns the number of rows with staged effects.
    pub fn touched_rows(&self) -> usize {
        self.rows.len()
    }

    fn ensure_row(&self, row: RowId, exists: bool) -> Result<(), DbError> {
        if exists {
            Ok(())
        } else {
            Err(DbError::RowNotFound {
                table: self.schema.name.clone(),
                row,
            })
        }
    }
}
