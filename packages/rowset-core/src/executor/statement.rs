use std::sync::Arc;

use super::{parse, Execution, QueryExecutor};
use crate::connection::Session;
use crate::error::DbError;
use crate::result_window::{ResultWindow, WindowOptions};

/// Executes statement text on behalf of a connection.
#[derive(Debug)]
pub struct Statement {
    session: Arc<Session>,
    options: WindowOptions,
    /// Row cap for queries, 0 defers to the database configuration
    max_rows: usize,
    batch: Vec<String>,
}

impl Statement {
    pub(crate) fn new(session: Arc<Session>, options: WindowOptions) -> Self {
        Self {
            session,
            options,
            max_rows: 0,
            batch: Vec::new(),
        }
    }

    /// Executes any statement.
    pub fn execute(&self, sql: &str) -> Result<Execution, DbError> {
        self.session.ensure_open()?;
        let statement = parse(sql)?;
        QueryExecutor::new(&self.session, self.max_rows).execute(&statement, &[], self.options)
    }

    /// Executes a query and returns its result window.
    pub fn execute_query(&self, sql: &str) -> Result<ResultWindow, DbError> {
        self.execute(sql)?.into_window()
    }

    /// Executes a data or definition change and returns the number of
    /// affected rows (0 for definitions). Queries are rejected before
    /// running.
    pub fn execute_update(&self, sql: &str) -> Result<usize, DbError> {
        self.session.ensure_open()?;
        let statement = parse(sql)?;
        if statement.is_query() {
            return Err(DbError::ExecutionError(
                "query passed to execute_update".to_string(),
            ));
        }
        QueryExecutor::new(&self.session, self.max_rows)
            .execute(&statement, &[], self.options)?
            .into_count()
    }

    pub fn set_max_rows(&mut self, max_rows: usize) {
        self.max_rows = max_rows;
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn options(&self) -> WindowOptions {
        self.options
    }

    /// Queues statement text for `execute_batch`.
    pub fn add_batch(&mut self, sql: impl Into<String>) -> Result<(), DbError> {
        self.session.ensure_open()?;
        self.batch.push(sql.into());
        Ok(())
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// Runs the queued statements in order and empties the queue.
    ///
    /// # Returns
    /// Update counts in queue order, or `BatchFailed` with the index of the
    /// failing statement and the counts of those before it.
    pub fn execute_batch(&mut self) -> Result<Vec<usize>, DbError> {
        self.session.ensure_open()?;
        let batch = std::mem::take(&mut self.batch);
        let mut counts = Vec::with_capacity(batch.len());
        for (index, sql) in batch.iter().enumerate() {
            match self.execute_update(sql) {
                Ok(count) => counts.push(count),
                Err(source) => {
                    tracing::warn!("Batch stopped at statement {}: {}", index, source);
                    return Err(DbError::BatchFailed {
                        index,
                        counts,
                        source: Box::new(source),
                    });
                }
            }
        }
        tracing::debug!("Executed batch of {} statements", counts.len());
        Ok(counts)
    }
}
