//! In-memory rows visible to a result window.

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::row::{Row, RowId};
use crate::value::Value;

/// Whether a result window reflects changes made after its creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    /// Materialized once, never reflects external mutations
    #[default]
    Insensitive,
    /// Re-fetched from the transaction view on refresh or after rollback
    Sensitive,
}

/// A buffered row plus its deletion mark.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedRow {
    pub row: Row,
    pub deleted: bool,
}

/// Ordered rows of a result window, projected to the window's columns.
#[derive(Debug, Clone)]
pub struct RowBuffer {
    sensitivity: Sensitivity,
    /// Table column indices backing each window column
    projection: Vec<usize>,
    rows: Vec<BufferedRow>,
    /// Transaction epoch the rows were last synchronized with
    epoch: u64,
}

impl RowBuffer {
    /// Creates a buffer from full table rows.
    ///
    /// # Arguments
    /// * `sensitivity` - Snapshot semantics of the buffer
    /// * `projection` - Table column index for each window column
    /// * `rows` - Rows in table column order
    /// * `epoch` - Transaction epoch at creation
    pub fn new(sensitivity: Sensitivity, projection: Vec<usize>, rows: Vec<Row>, epoch: u64) -> Self {
        let rows = rows
            .iter()
            .map(|row| BufferedRow {
                row: row.project(&projection),
                deleted: false,
            })
            .collect();
        Self {
            sensitivity,
            projection,
            rows,
            epoch,
        }
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitivity == Sensitivity::Sensitive
    }

    pub fn projection(&self) -> &[usize] {
        &self.projection
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row at a 1-based position.
    pub fn get(&self, position: usize) -> Option<&BufferedRow> {
        position.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    fn get_mut(&mut self, position: usize) -> Result<&mut BufferedRow, DbError> {
        let count = self.rows.len();
        if position == 0 || position > count {
            return Err(DbError::InvalidCursorPosition(format!(
                "position {} outside 1..={}",
                position, count
            )));
        }
        Ok(&mut self.rows[position - 1])
    }

    /// Writes confirmed values into the row at `position`.
    pub fn apply_updates(&mut self, position: usize, updates: &[(usize, Value)]) -> Result<(), DbError> {
        let entry = self.get_mut(position)?;
        for (column, value) in updates {
            if let Some(slot) = entry.row.values.get_mut(*column) {
                *slot = value.clone();
            }
        }
        Ok(())
    }

    /// Marks the row at `position` deleted. It stays addressable.
    pub fn mark_deleted(&mut self, position: usize) -> Result<RowId, DbError> {
        let entry = self.get_mut(position)?;
        entry.deleted = true;
        Ok(entry.row.id)
    }

    /// Appends a full table row, projecting it to the window columns.
    pub fn append(&mut self, row: &Row) {
        self.rows.push(BufferedRow {
            row: row.project(&self.projection),
            deleted: false,
        });
    }

    /// Replaces the row at `position` with freshly fetched values. A row
    /// that no longer exists is marked deleted.
    pub fn refresh(&mut self, position: usize, fetched: Option<Row>) -> Result<(), DbError> {
        let projection = self.projection.clone();
        let entry = self.get_mut(position)?;
        match fetched {
            Some(row) => {
                entry.row = row.project(&projection);
                entry.deleted = false;
            }
            None => entry.deleted = true,
        }
        Ok(())
    }

    /// Re-fetches every row and records the new epoch. Rows the fetcher no
    /// longer finds are dropped.
    pub fn resync<F>(&mut self, epoch: u64, mut fetch: F) -> Result<(), DbError>
    where
        F: FnMut(RowId) -> Result<Option<Row>, DbError>,
    {
        let mut rows = Vec::with_capacity(self.rows.len());
        for entry in &self.rows {
            if let Some(row) = fetch(entry.row.id)? {
                rows.push(BufferedRow {
                    row: row.project(&self.projection),
                    deleted: false,
                });
            }
        }
        tracing::debug!(
            "Resynchronized row buffer: {} of {} rows remain",
            rows.len(),
            self.rows.len()
        );
        self.rows = rows;
        self.epoch = epoch;
        Ok(())
    }

    /// Records an epoch without re-fetching.
    pub fn set_epoch(&mut self, epoch: u64) {
        self.epoch = epoch;
    }
}
