//! Result windows: a cursor over a row buffer plus row mutation verbs.
//!
//! A window is produced by executing a query and stays bound to the session
//! that produced it. Mutations never touch the store directly; they are
//! turned into pending edits and handed to the session's transaction
//! context, which applies them at commit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::connection::Session;
use crate::cursor::Cursor;
use crate::error::DbError;
use crate::row::Row;
use crate::row_buffer::{RowBuffer, Sensitivity};
use crate::store::{ColumnDef, TableSchema};
use crate::transaction::PendingEdit;
use crate::value::{DataType, Value};

/// Whether a window accepts row mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    #[default]
    ReadOnly,
    Updatable,
}

/// Options a window is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    pub concurrency: Concurrency,
    pub sensitivity: Sensitivity,
    /// Bidirectional navigation when true, forward-only otherwise
    pub scrollable: bool,
}

impl WindowOptions {
    pub fn new(concurrency: Concurrency, sensitivity: Sensitivity, scrollable: bool) -> Self {
        Self {
            concurrency,
            sensitivity,
            scrollable,
        }
    }
}

/// Observable state of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// On a row, before-first or after-last
    Normal,
    /// Collecting values for a new row
    InsertStaging,
    /// The current row was just deleted through the window
    AfterDelete,
}

#[derive(Debug)]
enum Mode {
    Normal,
    InsertStaging {
        /// Cursor position to return to
        saved: usize,
        /// One slot per window column; `None` means not set
        values: Vec<Option<Value>>,
    },
    AfterDelete,
}

/// Unconfirmed updates to the row at `position`.
#[derive(Debug)]
struct RowEdit {
    position: usize,
    updates: Vec<(usize, Value)>,
}

/// Addresses a window column by name or by 1-based index.
pub trait ColumnKey {
    /// Resolves to a 0-based window column index.
    fn resolve(&self, window: &ResultWindow) -> Result<usize, DbError>;
}

impl ColumnKey for &str {
    fn resolve(&self, window: &ResultWindow) -> Result<usize, DbError> {
        window
            .find_column(self)
            .map(|index| index - 1)
    }
}

impl ColumnKey for String {
    fn resolve(&self, window: &ResultWindow) -> Result<usize, DbError> {
        self.as_str().resolve(window)
    }
}

impl ColumnKey for usize {
    fn resolve(&self, window: &ResultWindow) -> Result<usize, DbError> {
        if *self == 0 || *self > window.columns.len() {
            return Err(DbError::UnknownColumn(self.to_string()));
        }
        Ok(self - 1)
    }
}

/// Rows produced by a query, navigated with a cursor.
#[derive(Debug)]
pub struct ResultWindow {
    session: Arc<Session>,
    schema: TableSchema,
    /// Window columns, in projection order
    columns: Vec<ColumnDef>,
    buffer: RowBuffer,
    cursor: Cursor,
    options: WindowOptions,
    mode: Mode,
    row_edit: Option<RowEdit>,
}

impl ResultWindow {
    /// Wraps query rows into a window.
    ///
    /// # Arguments
    /// * `session` - Session the window belongs to
    /// * `schema` - Schema of the queried table
    /// * `projection` - Table column index for each window column
    /// * `rows` - Full table rows in result order
    /// * `options` - Concurrency, sensitivity and scrollability
    /// * `epoch` - Transaction epoch the rows were read at
    pub(crate) fn new(
        session: Arc<Session>,
        schema: TableSchema,
        projection: Vec<usize>,
        rows: Vec<Row>,
        options: WindowOptions,
        epoch: u64,
    ) -> Self {
        let columns = projection
            .iter()
            .filter_map(|&i| schema.columns.get(i).cloned())
            .collect();
        let buffer = RowBuffer::new(options.sensitivity, projection, rows, epoch);
        let cursor = Cursor::new(buffer.len(), options.scrollable);
        Self {
            session,
            schema,
            columns,
            buffer,
            cursor,
            options,
            mode: Mode::Normal,
            row_edit: None,
        }
    }

    /// Checks the session and brings a sensitive buffer back in line with
    /// the transaction after a rollback.
    fn sync(&mut self) -> Result<(), DbError> {
        self.session.ensure_open()?;
        let session = self.session.clone();
        let table = self.schema.name.clone();
        let buffer = &mut self.buffer;
        let resynced = session.with_transaction(|tx, store| {
            if tx.epoch() == buffer.epoch() {
                return Ok(false);
            }
            if !buffer.is_sensitive() {
                buffer.set_epoch(tx.epoch());
                return Ok(false);
            }
            let epoch = tx.epoch();
            buffer.resync(epoch, |id| tx.fetch(store, &table, id))?;
            Ok(true)
        })?;
        if resynced {
            if self.row_edit.take().is_some() {
                tracing::debug!("Discarded unconfirmed row edit after rollback");
            }
            self.cursor.set_row_count(self.buffer.len());
        }
        Ok(())
    }

    fn require_updatable(&self, operation: &str) -> Result<(), DbError> {
        if self.options.concurrency != Concurrency::Updatable {
            return Err(DbError::UnsupportedOperation(format!(
                "{} on a read-only result window",
                operation
            )));
        }
        Ok(())
    }

    /// Returns the current row position, failing when the cursor is not on
    /// a row or the window is staging an insert.
    fn current_position(&self) -> Result<usize, DbError> {
        if let Mode::InsertStaging { .. } = self.mode {
            return Err(DbError::InvalidCursorPosition(
                "cursor is on the insert row".to_string(),
            ));
        }
        if !self.cursor.on_row() {
            return Err(DbError::InvalidCursorPosition(format!(
                "no current row at position {}",
                self.cursor.position()
            )));
        }
        Ok(self.cursor.position())
    }

    /// Discards unconfirmed edits and leaves insert staging before the
    /// cursor moves.
    fn leave_row(&mut self) {
        if let Some(edit) = self.row_edit.take() {
            tracing::debug!(
                "Discarded {} unconfirmed updates on row {} after cursor move",
                edit.updates.len(),
                edit.position
            );
        }
        if let Mode::InsertStaging { saved, .. } = self.mode {
            self.cursor.restore(saved);
        }
        self.mode = Mode::Normal;
    }

    fn prepare_move(&mut self) -> Result<(), DbError> {
        self.sync()?;
        self.leave_row();
        Ok(())
    }

    /// Like `prepare_move`, but rejects forward-only windows before any
    /// unconfirmed state is discarded.
    fn prepare_scroll(&mut self, operation: &str) -> Result<(), DbError> {
        self.sync()?;
        if !self.cursor.is_scrollable() {
            return Err(DbError::UnsupportedOperation(format!(
                "{} on a forward-only result window",
                operation
            )));
        }
        self.leave_row();
        Ok(())
    }

    /// Advances to the next row. Returns whether the cursor is on a row.
    pub fn next(&mut self) -> Result<bool, DbError> {
        self.prepare_move()?;
        Ok(self.cursor.next())
    }

    /// Moves back one row. Requires a scrollable window.
    pub fn previous(&mut self) -> Result<bool, DbError> {
        self.prepare_scroll("previous")?;
        self.cursor.previous()
    }

    /// Moves to row `n`, counting from the end when negative. Out-of-range
    /// targets clamp to before-first or after-last.
    pub fn absolute(&mut self, n: i64) -> Result<bool, DbError> {
        self.prepare_scroll("absolute")?;
        self.cursor.absolute(n)
    }

    /// Moves by a signed offset, clamping at the edges.
    pub fn relative(&mut self, n: i64) -> Result<bool, DbError> {
        self.prepare_scroll("relative")?;
        self.cursor.relative(n)
    }

    pub fn first(&mut self) -> Result<bool, DbError> {
        self.prepare_scroll("first")?;
        self.cursor.first()
    }

    pub fn last(&mut self) -> Result<bool, DbError> {
        self.prepare_scroll("last")?;
        self.cursor.last()
    }

    pub fn before_first(&mut self) -> Result<(), DbError> {
        self.prepare_scroll("before_first")?;
        self.cursor.before_first()
    }

    pub fn after_last(&mut self) -> Result<(), DbError> {
        self.prepare_scroll("after_last")?;
        self.cursor.after_last()
    }

    /// Current row number, or 0 when not on a row.
    pub fn row(&mut self) -> Result<usize, DbError> {
        self.sync()?;
        Ok(self.cursor.row())
    }

    pub fn is_first(&mut self) -> Result<bool, DbError> {
        self.sync()?;
        Ok(self.cursor.is_first())
    }

    pub fn is_last(&mut self) -> Result<bool, DbError> {
        self.sync()?;
        Ok(self.cursor.is_last())
    }

    pub fn is_before_first(&mut self) -> Result<bool, DbError> {
        self.sync()?;
        Ok(self.cursor.is_before_first())
    }

    pub fn is_after_last(&mut self) -> Result<bool, DbError> {
        self.sync()?;
        Ok(self.cursor.is_after_last())
    }

    pub fn state(&self) -> WindowState {
        match self.mode {
            Mode::Normal => WindowState::Normal,
            Mode::InsertStaging { .. } => WindowState::InsertStaging,
            Mode::AfterDelete => WindowState::AfterDelete,
        }
    }

    /// Reads a column of the current row.
    ///
    /// Unconfirmed updates are not visible here; they show up once
    /// `confirm_row` succeeds.
    pub fn get<K: ColumnKey>(&mut self, column: K) -> Result<Value, DbError> {
        self.sync()?;
        let position = self.current_position()?;
        let index = column.resolve(self)?;
        let entry = self.buffer.get(position).ok_or_else(|| {
            DbError::InvalidCursorPosition(format!("no row at position {}", position))
        })?;
        if entry.deleted {
            return Err(DbError::RowDeleted { row: entry.row.id });
        }
        Ok(entry.row.values.get(index).cloned().unwrap_or_default())
    }

    fn get_as<K: ColumnKey>(&mut self, column: K, data_type: DataType) -> Result<Option<Value>, DbError> {
        let value = self.get(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value.coerce(data_type).map(Some)
    }

    pub fn get_int<K: ColumnKey>(&mut self, column: K) -> Result<Option<i64>, DbError> {
        Ok(match self.get_as(column, DataType::Integer)? {
            Some(Value::Integer(i)) => Some(i),
            _ => None,
        })
    }

    pub fn get_float<K: ColumnKey>(&mut self, column: K) -> Result<Option<f64>, DbError> {
        Ok(match self.get_as(column, DataType::Float)? {
            Some(Value::Float(f)) => Some(f),
            _ => None,
        })
    }

    pub fn get_string<K: ColumnKey>(&mut self, column: K) -> Result<Option<String>, DbError> {
        Ok(match self.get_as(column, DataType::Text)? {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        })
    }

    pub fn get_bool<K: ColumnKey>(&mut self, column: K) -> Result<Option<bool>, DbError> {
        Ok(match self.get_as(column, DataType::Boolean)? {
            Some(Value::Boolean(b)) => Some(b),
            _ => None,
        })
    }

    /// Sets a column of the current row or of the insert row.
    ///
    /// On a regular row the update stays local to the window until
    /// `confirm_row`; moving the cursor first discards it.
    pub fn update<K: ColumnKey>(&mut self, column: K, value: impl Into<Value>) -> Result<(), DbError> {
        self.sync()?;
        self.require_updatable("update")?;
        let index = column.resolve(self)?;
        let value = value.into().coerce(self.columns[index].data_type)?;

        if let Mode::InsertStaging { values, .. } = &mut self.mode {
            values[index] = Some(value);
            return Ok(());
        }

        let position = self.current_position()?;
        if let Some(entry) = self.buffer.get(position) {
            if entry.deleted {
                return Err(DbError::RowDeleted { row: entry.row.id });
            }
        }
        let edit = self.row_edit.get_or_insert_with(|| RowEdit {
            position,
            updates: Vec::new(),
        });
        match edit.updates.iter_mut().find(|(i, _)| *i == index) {
            Some(slot) => slot.1 = value,
            None => edit.updates.push((index, value)),
        }
        Ok(())
    }

    /// Applies the unconfirmed updates of the current row.
    ///
    /// The updates are staged into the transaction as one group and, once
    /// accepted, written into the buffer. A no-op without updates.
    pub fn confirm_row(&mut self) -> Result<(), DbError> {
        self.sync()?;
        self.require_updatable("confirm_row")?;
        let position = self.current_position()?;
        let Some(edit) = &self.row_edit else {
            return Ok(());
        };

        let entry = self.buffer.get(position).ok_or_else(|| {
            DbError::InvalidCursorPosition(format!("no row at position {}", position))
        })?;
        if entry.deleted {
            return Err(DbError::RowDeleted { row: entry.row.id });
        }
        let row = entry.row.id;
        let edits = edit
            .updates
            .iter()
            .map(|(index, value)| PendingEdit::ColumnUpdate {
                table: self.schema.name.clone(),
                row,
                column: self.columns[*index].name.clone(),
                value: value.clone(),
            })
            .collect();

        self.session.stage(edits)?;
        let Some(edit) = self.row_edit.take() else {
            return Ok(());
        };
        self.buffer.apply_updates(position, &edit.updates)?;
        tracing::debug!(
            "Confirmed {} updates on row {} of {}",
            edit.updates.len(),
            row,
            self.schema.name
        );
        Ok(())
    }

    /// Discards unconfirmed updates of the current row.
    ///
    /// # Returns
    /// `Ok(true)` when updates were discarded, `Ok(false)` when there was
    /// nothing to cancel, including after `confirm_row`.
    pub fn cancel_pending_edits(&mut self) -> Result<bool, DbError> {
        self.sync()?;
        self.require_updatable("cancel_pending_edits")?;
        if let Mode::InsertStaging { .. } = self.mode {
            return Err(DbError::InvalidCursorPosition(
                "cannot cancel edits on the insert row".to_string(),
            ));
        }
        Ok(self.row_edit.take().is_some())
    }

    /// Enters insert staging with every column unset.
    pub fn move_to_insert_row(&mut self) -> Result<(), DbError> {
        self.sync()?;
        self.require_updatable("move_to_insert_row")?;
        if self.row_edit.take().is_some() {
            tracing::debug!("Discarded unconfirmed row edit on move to insert row");
        }
        let saved = match self.mode {
            Mode::InsertStaging { saved, .. } => saved,
            _ => self.cursor.position(),
        };
        self.mode = Mode::InsertStaging {
            saved,
            values: vec![None; self.columns.len()],
        };
        Ok(())
    }

    /// Leaves insert staging and returns to the remembered position.
    /// A no-op outside insert staging.
    pub fn move_to_current_row(&mut self) -> Result<(), DbError> {
        self.sync()?;
        self.require_updatable("move_to_current_row")?;
        if let Mode::InsertStaging { saved, .. } = self.mode {
            self.cursor.restore(saved);
            self.mode = Mode::Normal;
        }
        Ok(())
    }

    /// Inserts the staged values as a new row.
    ///
    /// Unset columns are NULL. The row gets a fresh id, is staged into the
    /// transaction and appended to the buffer. The window stays in insert
    /// staging with all columns unset again.
    pub fn insert_row(&mut self) -> Result<(), DbError> {
        self.sync()?;
        self.require_updatable("insert_row")?;
        let Mode::InsertStaging { saved, values } = &self.mode else {
            return Err(DbError::InvalidCursorPosition(
                "insert_row requires the insert row".to_string(),
            ));
        };
        let saved = *saved;

        let mut full = vec![Value::Null; self.schema.columns.len()];
        for (index, value) in values.iter().enumerate() {
            if let (Some(value), Some(&column)) = (value, self.buffer.projection().get(index)) {
                full[column] = value.clone();
            }
        }
        let full = self.schema.check_row(full)?;

        let id = self.session.store().allocate_row_id(&self.schema.name)?;
        let row = Row::new(id, full);
        self.session.stage(vec![PendingEdit::InsertRow {
            table: self.schema.name.clone(),
            row: row.clone(),
        }])?;

        let was_after_last = saved == self.cursor.row_count() + 1;
        self.buffer.append(&row);
        self.cursor.set_row_count(self.buffer.len());
        let saved = if was_after_last {
            self.buffer.len() + 1
        } else {
            saved
        };
        self.mode = Mode::InsertStaging {
            saved,
            values: vec![None; self.columns.len()],
        };
        tracing::debug!("Inserted row {} into {}", id, self.schema.name);
        Ok(())
    }

    /// Deletes the current row. It stays addressable by position but reads
    /// fail with `RowDeleted`.
    pub fn delete_row(&mut self) -> Result<(), DbError> {
        self.sync()?;
        self.require_updatable("delete_row")?;
        let position = self.current_position()?;
        let entry = self.buffer.get(position).ok_or_else(|| {
            DbError::InvalidCursorPosition(format!("no row at position {}", position))
        })?;
        if entry.deleted {
            return Err(DbError::RowDeleted { row: entry.row.id });
        }
        let row = entry.row.id;

        self.session.stage(vec![PendingEdit::DeleteRow {
            table: self.schema.name.clone(),
            row,
        }])?;
        self.row_edit = None;
        self.buffer.mark_deleted(position)?;
        self.mode = Mode::AfterDelete;
        tracing::debug!("Deleted row {} from {}", row, self.schema.name);
        Ok(())
    }

    /// Re-reads the current row through the transaction view, discarding
    /// unconfirmed updates. Only sensitive windows support this.
    pub fn refresh_row(&mut self) -> Result<(), DbError> {
        self.sync()?;
        if !self.buffer.is_sensitive() {
            return Err(DbError::UnsupportedOperation(
                "refresh_row on an insensitive result window".to_string(),
            ));
        }
        let position = self.current_position()?;
        let Some(entry) = self.buffer.get(position) else {
            return Err(DbError::InvalidCursorPosition(format!(
                "no row at position {}",
                position
            )));
        };
        let id = entry.row.id;
        let table = self.schema.name.clone();
        let fetched = self
            .session
            .with_transaction(|tx, store| tx.fetch(store, &table, id))?;
        self.row_edit = None;
        self.buffer.refresh(position, fetched)
    }

    /// Returns whether the current row was deleted.
    pub fn row_deleted(&mut self) -> Result<bool, DbError> {
        self.sync()?;
        let position = self.current_position()?;
        Ok(self.buffer.get(position).is_some_and(|entry| entry.deleted))
    }

    /// Window columns in order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the 1-based index of a column. Names are case-insensitive
    /// and may be qualified with the table name.
    pub fn find_column(&self, name: &str) -> Result<usize, DbError> {
        let unqualified = match name.split_once('.') {
            Some((table, column)) if table.eq_ignore_ascii_case(&self.schema.name) => column,
            Some(_) => return Err(DbError::UnknownColumn(name.to_string())),
            None => name,
        };
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(unqualified))
            .map(|index| index + 1)
            .ok_or_else(|| DbError::UnknownColumn(name.to_string()))
    }

    /// Number of buffered rows, deleted ones included.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn concurrency(&self) -> Concurrency {
        self.options.concurrency
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.options.sensitivity
    }

    pub fn is_scrollable(&self) -> bool {
        self.options.scrollable
    }

    pub fn options(&self) -> WindowOptions {
        self.options
    }

    /// Name of the table the window reads.
    pub fn table(&self) -> &str {
        &self.schema.name
    }
}
