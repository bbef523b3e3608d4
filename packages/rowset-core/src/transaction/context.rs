use std::collections::HashMap;

use crate::error::DbError;
use crate::row::{Row, RowId};
use crate::store::Store;

use super::pending_edit::PendingEdit;
use super::staging_table::{RowOverlay, StagingTable};

/// Lifecycle state of a transaction context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Every staging call commits immediately
    AutoCommit,
    /// Edits accumulate until `commit` or `rollback`
    ManualPending,
    /// A manual commit failed; only `reset` leaves this state
    Ended,
}

/// Transaction context holding the ordered edit log of one session.
///
/// Edits are isolated from the store until commit. Reads replay the staged
/// effects over the store's current committed rows, so the session observes
/// its own staged state alongside other sessions' commits.
#[derive(Debug)]
pub struct TransactionContext {
    /// Current lifecycle state
    state: TransactionState,
    /// Edits in staging order
    edits: Vec<PendingEdit>,
    /// Map of normalized table name to staged row effects
    staging: HashMap<String, StagingTable>,
    /// Bumped whenever staged state is discarded
    epoch: u64,
}

fn table_key(name: &str) -> String {
    name.to_ascii_uppercase()
}

impl TransactionContext {
    /// Creates a new context with no staged edits.
    pub fn new(auto_commit: bool) -> Self {
        Self {
            state: if auto_commit {
                TransactionState::AutoCommit
            } else {
                TransactionState::ManualPending
            },
            edits: Vec::new(),
            staging: HashMap::new(),
            epoch: 0,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns whether auto-commit is enabled.
    pub fn auto_commit(&self) -> bool {
        self.state == TransactionState::AutoCommit
    }

    /// Returns the discard epoch. Sensitive row buffers compare against it
    /// to notice a rollback.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns the staged edits in staging order.
    pub fn pending_edits(&self) -> &[PendingEdit] {
        &self.edits
    }

    /// Returns whether any edits are waiting for commit.
    pub fn has_pending_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    fn ensure_active(&self) -> Result<(), DbError> {
        if self.state == TransactionState::Ended {
            return Err(DbError::TransactionEnded);
        }
        Ok(())
    }

    /// Gets or creates the overlay for the given table.
    fn staging_table(
        &mut self,
        store: &dyn Store,
        table: &str,
    ) -> Result<&mut StagingTable, DbError> {
        let key = table_key(table);
        if !self.staging.contains_key(&key) {
            let overlay = StagingTable::new(store.schema(table)?);
            self.staging.insert(key.clone(), overlay);
        }
        self.staging.get_mut(&key).ok_or_else(|| DbError::TableNotFound {
            table: table.to_string(),
        })
    }

    /// Checks one edit against the current view of its row and records it.
    ///
    /// # Returns
    /// The normalized edit and the row's previous overlay.
    fn record(
        &mut self,
        store: &dyn Store,
        edit: PendingEdit,
    ) -> Result<(PendingEdit, Option<RowOverlay>), DbError> {
        let id = edit.row_id();
        let committed = store.fetch(edit.table(), id)?;
        let overlay = self.staging_table(store, edit.table())?;
        let exists = overlay.overlay(id, committed).is_some();
        let edit = overlay.check(edit, exists)?;
        let previous = overlay.apply(&edit);
        Ok((edit, previous))
    }

    /// Returns the rows of a table as seen by this transaction.
    pub fn rows(&self, store: &dyn Store, table: &str) -> Result<Vec<Row>, DbError> {
        self.ensure_active()?;
        let committed = store.scan(table)?;
        Ok(match self.staging.get(&table_key(table)) {
            Some(overlay) => overlay.merge(committed),
            None => committed,
        })
    }

    /// Re-fetches one row as seen by this transaction.
    pub fn fetch(&self, store: &dyn Store, table: &str, id: RowId) -> Result<Option<Row>, DbError> {
        self.ensure_active()?;
        let committed = store.fetch(table, id)?;
        Ok(match self.staging.get(&table_key(table)) {
            Some(overlay) => overlay.overlay(id, committed),
            None => committed,
        })
    }

    /// Drops the overlay of a table whose definition changed. Staged edits
    /// against it are kept and meet the new definition at commit.
    pub fn forget_table(&mut self, table: &str) {
        self.staging.remove(&table_key(table));
    }

    /// Stages a group of edits.
    ///
    /// Each edit is checked against the view left by the edits before it.
    /// A rejected group is undone, leaving the log untouched. In auto-commit
    /// mode the group is committed before returning.
    ///
    /// # Arguments
    /// * `store` - Store the edits will eventually be applied to
    /// * `edits` - Edits in the order they must be applied
    ///
    /// # Returns
    /// `Result<(), DbError>` indicating success or failure.
    pub fn stage(&mut self, store: &dyn Store, edits: Vec<PendingEdit>) -> Result<(), DbError> {
        self.ensure_active()?;
        if edits.is_empty() {
            return Ok(());
        }

        let mut checked = Vec::with_capacity(edits.len());
        let mut undo = Vec::with_capacity(edits.len());
        for edit in edits {
            match self.record(store, edit) {
                Ok((edit, previous)) => {
                    undo.push((table_key(edit.table()), edit.row_id(), previous));
                    checked.push(edit);
                }
                Err(err) => {
                    for (key, id, previous) in undo.into_iter().rev() {
                        if let Some(overlay) = self.staging.get_mut(&key) {
                            overlay.restore(id, previous);
                        }
                    }
                    return Err(err);
                }
            }
        }
        tracing::debug!(
            "Staged {} edits ({} pending)",
            checked.len(),
            self.edits.len() + checked.len()
        );
        self.edits.extend(checked);

        if self.state == TransactionState::AutoCommit {
            self.commit(store)?;
        }
        Ok(())
    }

    /// Applies all staged edits to the store in staging order.
    ///
    /// On failure the edits before the failing one stay applied, the rest
    /// are discarded, and a manual transaction is left `Ended`.
    ///
    /// # Returns
    /// `Result<(), DbError>` indicating success or `CommitFailed`.
    pub fn commit(&mut self, store: &dyn Store) -> Result<(), DbError> {
        self.ensure_active()?;

        let edits = std::mem::take(&mut self.edits);
        self.staging.clear();
        if edits.is_empty() {
            return Ok(());
        }

        match store.apply_batch(&edits) {
            Ok(()) => {
                tracing::debug!("Committed {} edits", edits.len());
                Ok(())
            }
            Err(failure) => {
                tracing::error!(
                    "Commit failed at edit {} of {}: {}",
                    failure.index,
                    edits.len(),
                    failure.error
                );
                self.epoch += 1;
                if self.state == TransactionState::ManualPending {
                    self.state = TransactionState::Ended;
                }
                Err(DbError::CommitFailed {
                    index: failure.index,
                    source: Box::new(failure.error),
                })
            }
        }
    }

    /// Discards all staged edits.
    pub fn rollback(&mut self) -> Result<(), DbError> {
        self.ensure_active()?;
        if self.state == TransactionState::AutoCommit {
            return Ok(());
        }
        tracing::debug!("Rolling back {} edits", self.edits.len());
        self.edits.clear();
        self.staging.clear();
        self.epoch += 1;
        Ok(())
    }

    /// Switches auto-commit on or off.
    ///
    /// Enabling auto-commit while edits are pending commits them first.
    pub fn set_auto_commit(&mut self, store: &dyn Store, auto_commit: bool) -> Result<(), DbError> {
        self.ensure_active()?;
        match (self.state, auto_commit) {
            (TransactionState::ManualPending, true) => {
                self.commit(store)?;
                self.state = TransactionState::AutoCommit;
            }
            (TransactionState::AutoCommit, false) => {
                self.state = TransactionState::ManualPending;
            }
            _ => {}
        }
        Ok(())
    }

    /// Drops all staged state and starts over, leaving `Ended` if needed.
    pub fn reset(&mut self, auto_commit: bool) {
        self.edits.clear();
        self.staging.clear();
        self.epoch += 1;
        self.state = if auto_commit {
            TransactionState::AutoCommit
        } else {
            TransactionState::ManualPending
        };
    }
}
