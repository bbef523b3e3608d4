use std::sync::Arc;

use super::{parse, Execution, QueryExecutor};
use crate::connection::Session;
use crate::error::DbError;
use crate::result_window::{ResultWindow, WindowOptions};
use crate::sql::ast;
use crate::value::Value;

/// A statement parsed once and executed with positional `?` parameters.
#[derive(Debug)]
pub struct PreparedStatement {
    session: Arc<Session>,
    options: WindowOptions,
    max_rows: usize,
    statement: ast::Statement,
    /// One slot per placeholder; `None` until set
    parameters: Vec<Option<Value>>,
    batch: Vec<Vec<Value>>,
}

impl PreparedStatement {
    pub(crate) fn new(session: Arc<Session>, sql: &str, options: WindowOptions) -> Result<Self, DbError> {
        let statement = parse(sql)?;
        let parameters = vec![None; statement.parameter_count()];
        Ok(Self {
            session,
            options,
            max_rows: 0,
            statement,
            parameters,
            batch: Vec::new(),
        })
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Binds the parameter at 1-based `index`.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<(), DbError> {
        let count = self.parameters.len();
        let slot = index
            .checked_sub(1)
            .and_then(|i| self.parameters.get_mut(i))
            .ok_or_else(|| {
                DbError::ExecutionError(format!(
                    "parameter index {} out of range 1..={}",
                    index, count
                ))
            })?;
        *slot = Some(value.into());
        Ok(())
    }

    pub fn clear_parameters(&mut self) {
        self.parameters.iter_mut().for_each(|p| *p = None);
    }

    fn bound(&self) -> Result<Vec<Value>, DbError> {
        self.parameters
            .iter()
            .enumerate()
            .map(|(i, p)| {
                p.clone().ok_or_else(|| {
                    DbError::ExecutionError(format!("parameter {} is not set", i + 1))
                })
            })
            .collect()
    }

    fn run(&self, params: &[Value]) -> Result<Execution, DbError> {
        self.session.ensure_open()?;
        QueryExecutor::new(&self.session, self.max_rows).execute(&self.statement, params, self.options)
    }

    pub fn execute(&self) -> Result<Execution, DbError> {
        self.run(&self.bound()?)
    }

    pub fn execute_query(&self) -> Result<ResultWindow, DbError> {
        self.execute()?.into_window()
    }

    pub fn execute_update(&self) -> Result<usize, DbError> {
        if self.statement.is_query() {
            return Err(DbError::ExecutionError(
                "query passed to execute_update".to_string(),
            ));
        }
        self.execute()?.into_count()
    }

    pub fn set_max_rows(&mut self, max_rows: usize) {
        self.max_rows = max_rows;
    }

    /// Queues the currently bound parameters as one batch entry.
    pub fn add_batch(&mut self) -> Result<(), DbError> {
        self.session.ensure_open()?;
        let params = self.bound()?;
        self.batch.push(params);
        Ok(())
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// Executes the statement once per queued parameter set.
    ///
    /// # Returns
    /// Update counts in queue order, or `BatchFailed` carrying the index of
    /// the failing entry and the counts of those before it.
    pub fn execute_batch(&mut self) -> Result<Vec<usize>, DbError> {
        self.session.ensure_open()?;
        let batch = std::mem::take(&mut self.batch);
        if self.statement.is_query() && !batch.is_empty() {
            return Err(DbError::BatchFailed {
                index: 0,
                counts: Vec::new(),
                source: Box::new(DbError::ExecutionError(
                    "query cannot be batched".to_string(),
                )),
            });
        }
        let mut counts = Vec::with_capacity(batch.len());
        for (index, params) in batch.iter().enumerate() {
            match self.run(params).and_then(Execution::into_count) {
                Ok(count) => counts.push(count),
                Err(source) => {
                    tracing::warn!("Batch stopped at entry {}: {}", index, source);
                    return Err(DbError::BatchFailed {
                        index,
                        counts,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(counts)
    }
}
