//! Cursor position over a row sequence.
//!
//! Position 0 is before-first, `row_count + 1` is after-last, and rows live
//! at positions `1..=row_count`.

use crate::error::DbError;

/// Logical pointer to the current row.
#[derive(Debug, Clone)]
pub struct Cursor {
    position: usize,
    row_count: usize,
    scrollable: bool,
}

impl Cursor {
    /// Creates a cursor positioned before the first row.
    pub fn new(row_count: usize, scrollable: bool) -> Self {
        Self {
            position: 0,
            row_count,
            scrollable,
        }
    }

    fn require_scrollable(&self, operation: &str) -> Result<(), DbError> {
        if !self.scrollable {
            return Err(DbError::UnsupportedOperation(format!(
                "{} on a forward-only cursor",
                operation
            )));
        }
        Ok(())
    }

    fn after_last_position(&self) -> usize {
        self.row_count + 1
    }

    /// Advances by one row. Returns whether the cursor is on a row.
    pub fn next(&mut self) -> bool {
        if self.position <= self.row_count {
            self.position += 1;
        }
        self.on_row()
    }

    /// Moves back by one row. Returns whether the cursor is on a row.
    pub fn previous(&mut self) -> Result<bool, DbError> {
        self.require_scrollable("previous")?;
        self.position = self.position.saturating_sub(1);
        Ok(self.on_row())
    }

    /// Moves to row `n` counted from the first row when positive, or from
    /// the last row when negative. Out-of-range targets clamp to
    /// before-first or after-last; `absolute(0)` is before-first.
    pub fn absolute(&mut self, n: i64) -> Result<bool, DbError> {
        self.require_scrollable("absolute")?;
        let count = self.row_count as i64;
        let target = if n >= 0 { n } else { count + 1 + n };
        self.position = target.clamp(0, count + 1) as usize;
        Ok(self.on_row())
    }

    /// Moves by a signed offset from the current position, clamping at the
    /// before-first and after-last edges.
    pub fn relative(&mut self, n: i64) -> Result<bool, DbError> {
        self.require_scrollable("relative")?;
        let count = self.row_count as i64;
        let target = (self.position as i64).saturating_add(n);
        self.position = target.clamp(0, count + 1) as usize;
        Ok(self.on_row())
    }

    pub fn first(&mut self) -> Result<bool, DbError> {
        self.require_scrollable("first")?;
        self.position = 1.min(self.after_last_position());
        Ok(self.on_row())
    }

    pub fn last(&mut self) -> Result<bool, DbError> {
        self.require_scrollable("last")?;
        self.position = self.row_count;
        Ok(self.on_row())
    }

    pub fn before_first(&mut self) -> Result<(), DbError> {
        self.require_scrollable("before_first")?;
        self.position = 0;
        Ok(())
    }

    pub fn after_last(&mut self) -> Result<(), DbError> {
        self.require_scrollable("after_last")?;
        self.position = self.after_last_position();
        Ok(())
    }

    /// Returns the current row number, or 0 when not on a row.
    pub fn row(&self) -> usize {
        if self.on_row() {
            self.position
        } else {
            0
        }
    }

    /// Returns the raw position in `0..=row_count + 1`.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_scrollable(&self) -> bool {
        self.scrollable
    }

    /// Returns whether the cursor is on a valid row.
    pub fn on_row(&self) -> bool {
        self.position >= 1 && self.position <= self.row_count
    }

    pub fn is_first(&self) -> bool {
        self.row_count > 0 && self.position == 1
    }

    pub fn is_last(&self) -> bool {
        self.row_count > 0 && self.position == self.row_count
    }

    pub fn is_before_first(&self) -> bool {
        self.position == 0
    }

    pub fn is_after_last(&self) -> bool {
        self.position == self.after_last_position()
    }

    /// Restores a position saved earlier, clamped to the current range.
    pub(crate) fn restore(&mut self, position: usize) {
        self.position = position.min(self.after_last_position());
    }

    /// Adjusts to a new row count. A cursor that was after-last stays
    /// after-last; any other position is clamped.
    pub(crate) fn set_row_count(&mut self, row_count: usize) {
        let was_after_last = self.is_after_last();
        self.row_count = row_count;
        if was_after_last {
            self.position = self.after_last_position();
        } else {
            self.position = self.position.min(self.after_last_position());
        }
    }
}
