//! Connections and the session state they share with their statements and
//! result windows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::DbConfig;
use crate::error::DbError;
use crate::executor::{PreparedStatement, Statement};
use crate::result_window::WindowOptions;
use crate::store::Store;
use crate::transaction::{PendingEdit, TransactionContext, TransactionState};

/// State of one logical session.
///
/// Statements and result windows hold an `Arc` to it, so closing the
/// connection is observed by everything the connection produced.
#[derive(Debug)]
pub(crate) struct Session {
    id: u64,
    store: Arc<dyn Store>,
    tx: Mutex<TransactionContext>,
    closed: AtomicBool,
    config: DbConfig,
}

impl Session {
    pub(crate) fn new(id: u64, store: Arc<dyn Store>, config: DbConfig) -> Self {
        Self {
            id,
            store,
            tx: Mutex::new(TransactionContext::new(config.auto_commit)),
            closed: AtomicBool::new(false),
            config,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn config(&self) -> &DbConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> Result<(), DbError> {
        if self.is_closed() {
            return Err(DbError::ConnectionClosed);
        }
        Ok(())
    }

    /// Runs `f` against the transaction context of an open session.
    pub(crate) fn with_transaction<R>(
        &self,
        f: impl FnOnce(&mut TransactionContext, &dyn Store) -> Result<R, DbError>,
    ) -> Result<R, DbError> {
        self.ensure_open()?;
        let mut tx = self.tx.lock();
        f(&mut tx, self.store.as_ref())
    }

    /// Stages a group of edits. Commits immediately in auto-commit mode.
    pub(crate) fn stage(&self, edits: Vec<PendingEdit>) -> Result<(), DbError> {
        self.with_transaction(|tx, store| tx.stage(store, edits))
    }

    /// Discards staged state and marks the session closed. Idempotent.
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut tx = self.tx.lock();
        if tx.has_pending_edits() {
            tracing::debug!(
                "Session {} closed with {} pending edits, rolling back",
                self.id,
                tx.pending_edits().len()
            );
        }
        let auto_commit = tx.auto_commit();
        tx.reset(auto_commit);
        tracing::debug!("Session {} closed", self.id);
    }
}

/// A session against a [`Database`](crate::Database).
///
/// Each connection owns its own transaction context. Dropping a connection
/// closes it, discarding uncommitted edits.
#[derive(Debug)]
pub struct Connection {
    session: Arc<Session>,
}

impl Connection {
    pub(crate) fn new(session: Session) -> Self {
        tracing::debug!(
            "Opened session {} (auto_commit={})",
            session.id(),
            session.config().auto_commit
        );
        Self {
            session: Arc::new(session),
        }
    }

    /// Session identifier, unique within its database.
    pub fn id(&self) -> u64 {
        self.session.id()
    }

    /// Creates a statement producing windows with the configured default
    /// options.
    pub fn create_statement(&self) -> Result<Statement, DbError> {
        self.create_statement_with(self.session.config().default_options)
    }

    /// Creates a statement producing windows with the given options.
    pub fn create_statement_with(&self, options: WindowOptions) -> Result<Statement, DbError> {
        self.session.ensure_open()?;
        Ok(Statement::new(self.session.clone(), options))
    }

    /// Parses `sql` once and returns a statement accepting `?` parameters.
    pub fn prepare_statement(&self, sql: &str) -> Result<PreparedStatement, DbError> {
        self.prepare_statement_with(sql, self.session.config().default_options)
    }

    pub fn prepare_statement_with(
        &self,
        sql: &str,
        options: WindowOptions,
    ) -> Result<PreparedStatement, DbError> {
        self.session.ensure_open()?;
        PreparedStatement::new(self.session.clone(), sql, options)
    }

    pub fn auto_commit(&self) -> Result<bool, DbError> {
        self.session.with_transaction(|tx, _| Ok(tx.auto_commit()))
    }

    /// Switches auto-commit mode. Enabling it commits pending edits first.
    pub fn set_auto_commit(&self, auto_commit: bool) -> Result<(), DbError> {
        self.session
            .with_transaction(|tx, store| tx.set_auto_commit(store, auto_commit))
    }

    /// Applies all staged edits in staging order.
    ///
    /// # Returns
    /// `Result<(), DbError>` with `CommitFailed` carrying the index of the
    /// first failing edit. Edits before it stay applied.
    pub fn commit(&self) -> Result<(), DbError> {
        self.session.with_transaction(|tx, store| tx.commit(store))
    }

    /// Discards all staged edits. A no-op in auto-commit mode.
    pub fn rollback(&self) -> Result<(), DbError> {
        self.session.with_transaction(|tx, _| tx.rollback())
    }

    /// Leaves the ended state after a failed commit, discarding any staged
    /// state. The connection continues in manual mode.
    pub fn reset(&self) -> Result<(), DbError> {
        self.session.with_transaction(|tx, _| {
            let auto_commit = tx.auto_commit();
            tx.reset(auto_commit);
            Ok(())
        })
    }

    pub fn transaction_state(&self) -> Result<TransactionState, DbError> {
        self.session.with_transaction(|tx, _| Ok(tx.state()))
    }

    pub fn pending_edit_count(&self) -> Result<usize, DbError> {
        self.session
            .with_transaction(|tx, _| Ok(tx.pending_edits().len()))
    }

    /// Returns whether the connection can still be used.
    pub fn is_valid(&self) -> bool {
        !self.session.is_closed()
    }

    /// Rolls back pending edits and closes the connection. Later calls on
    /// the connection, its statements and its windows fail with
    /// `ConnectionClosed`.
    pub fn close(&self) {
        self.session.close();
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.session.close();
    }
}
