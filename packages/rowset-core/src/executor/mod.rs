//! Statement execution against a session.
//!
//! Queries read the transaction's view of a table and are wrapped into a
//! [`ResultWindow`]. Data changes are translated into pending edits and
//! staged into the session's transaction context. Table definitions go
//! straight to the store.

mod prepared;
mod statement;

pub use prepared::PreparedStatement;
pub use statement::Statement;

use std::sync::Arc;

use crate::connection::Session;
use crate::error::DbError;
use crate::result_window::{ResultWindow, WindowOptions};
use crate::row::Row;
use crate::sql::ast::{self, ColumnRef, Comparison, Direction, Expression};
use crate::sql::Parser;
use crate::store::TableSchema;
use crate::transaction::PendingEdit;
use crate::value::Value;

/// Outcome of executing one statement.
#[derive(Debug)]
pub enum Execution {
    /// A query produced a result window
    Rows(ResultWindow),
    /// A data or definition change, with the number of affected rows
    Count(usize),
}

impl Execution {
    pub fn into_window(self) -> Result<ResultWindow, DbError> {
        match self {
            Execution::Rows(window) => Ok(window),
            Execution::Count(_) => Err(DbError::ExecutionError(
                "statement does not return rows".to_string(),
            )),
        }
    }

    pub fn into_count(self) -> Result<usize, DbError> {
        match self {
            Execution::Count(count) => Ok(count),
            Execution::Rows(_) => Err(DbError::ExecutionError(
                "statement returns rows".to_string(),
            )),
        }
    }
}

/// Parses statement text, rejecting blank input.
pub(crate) fn parse(text: &str) -> Result<ast::Statement, DbError> {
    if text.trim().is_empty() {
        return Err(DbError::ExecutionError("empty statement".to_string()));
    }
    Parser::parse(text)
}

/// Runs parsed statements for one session.
pub(crate) struct QueryExecutor<'a> {
    session: &'a Arc<Session>,
    /// Row cap for queries, 0 for unlimited
    max_rows: usize,
}

impl<'a> QueryExecutor<'a> {
    pub(crate) fn new(session: &'a Arc<Session>, max_rows: usize) -> Self {
        let max_rows = if max_rows == 0 {
            session.config().max_rows
        } else {
            max_rows
        };
        Self { session, max_rows }
    }

    /// Executes a statement with positional parameters already bound.
    ///
    /// # Arguments
    /// * `statement` - Parsed statement
    /// * `params` - Values for `?` placeholders in source order
    /// * `options` - Options for the window a query produces
    ///
    /// # Returns
    /// `Result<Execution, DbError>` with a window for queries and an affected
    /// row count otherwise.
    pub(crate) fn execute(
        &self,
        statement: &ast::Statement,
        params: &[Value],
        options: WindowOptions,
    ) -> Result<Execution, DbError> {
        self.session.ensure_open()?;
        match statement {
            ast::Statement::CreateTable { name, columns } => {
                let schema = TableSchema::new(name.clone(), columns.clone())?;
                self.session.store().create_table(schema)?;
                self.session.with_transaction(|tx, _| {
                    tx.forget_table(name);
                    Ok(())
                })?;
                tracing::info!("Created table {}", name);
                Ok(Execution::Count(0))
            }
            ast::Statement::DropTable { name, if_exists } => {
                match self.session.store().drop_table(name) {
                    Ok(()) => tracing::info!("Dropped table {}", name),
                    Err(DbError::TableNotFound { .. }) if *if_exists => {}
                    Err(err) => return Err(err),
                }
                self.session.with_transaction(|tx, _| {
                    tx.forget_table(name);
                    Ok(())
                })?;
                Ok(Execution::Count(0))
            }
            ast::Statement::Insert {
                table,
                columns,
                values,
            } => self.insert(table, columns.as_deref(), values, params),
            ast::Statement::Update { table, set, filter } => self.update(table, set, filter, params),
            ast::Statement::Delete { table, filter } => self.delete(table, filter, params),
            ast::Statement::Select {
                table,
                columns,
                filter,
                order_by,
            } => self.select(table, columns.as_deref(), filter, order_by, params, options),
        }
    }

    fn insert(
        &self,
        table: &str,
        columns: Option<&[String]>,
        values: &[Vec<Expression>],
        params: &[Value],
    ) -> Result<Execution, DbError> {
        let store = self.session.store();
        let schema = store.schema(table)?;
        let targets = match columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    schema
                        .column_index(name)
                        .ok_or_else(|| DbError::UnknownColumn(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => (0..schema.columns.len()).collect(),
        };

        let mut edits = Vec::with_capacity(values.len());
        for row in values {
            if row.len() != targets.len() {
                return Err(DbError::ExecutionError(format!(
                    "expected {} values, got {}",
                    targets.len(),
                    row.len()
                )));
            }
            let mut full = vec![Value::Null; schema.columns.len()];
            for (&column, expr) in targets.iter().zip(row) {
                full[column] = bind(expr, params)?;
            }
            let full = schema.check_row(full)?;
            let id = store.allocate_row_id(table)?;
            edits.push(PendingEdit::InsertRow {
                table: schema.name.clone(),
                row: Row::new(id, full),
            });
        }

        let count = edits.len();
        self.session.stage(edits)?;
        Ok(Execution::Count(count))
    }

    fn update(
        &self,
        table: &str,
        set: &[(ColumnRef, Expression)],
        filter: &[Comparison],
        params: &[Value],
    ) -> Result<Execution, DbError> {
        let schema = self.session.store().schema(table)?;
        let assignments = set
            .iter()
            .map(|(column, expr)| {
                let index = resolve_column(&schema, column)?;
                Ok((schema.columns[index].name.clone(), bind(expr, params)?))
            })
            .collect::<Result<Vec<_>, DbError>>()?;
        let predicate = Predicate::new(&schema, filter, params)?;

        self.session.with_transaction(|tx, store| {
            let matched: Vec<Row> = tx
                .rows(store, table)?
                .into_iter()
                .filter(|row| predicate.matches(row))
                .collect();
            let mut edits = Vec::with_capacity(matched.len() * assignments.len());
            for row in &matched {
                for (column, value) in &assignments {
                    edits.push(PendingEdit::ColumnUpdate {
                        table: schema.name.clone(),
                        row: row.id,
                        column: column.clone(),
                        value: value.clone(),
                    });
                }
            }
            tx.stage(store, edits)?;
            Ok(Execution::Count(matched.len()))
        })
    }

    fn delete(&self, table: &str, filter: &[Comparison], params: &[Value]) -> Result<Execution, DbError> {
        let schema = self.session.store().schema(table)?;
        let predicate = Predicate::new(&schema, filter, params)?;

        self.session.with_transaction(|tx, store| {
            let edits: Vec<PendingEdit> = tx
                .rows(store, table)?
                .into_iter()
                .filter(|row| predicate.matches(row))
                .map(|row| PendingEdit::DeleteRow {
                    table: schema.name.clone(),
                    row: row.id,
                })
                .collect();
            let count = edits.len();
            tx.stage(store, edits)?;
            Ok(Execution::Count(count))
        })
    }

    fn select(
        &self,
        table: &str,
        columns: Option<&[ColumnRef]>,
        filter: &[Comparison],
        order_by: &[(ColumnRef, Direction)],
        params: &[Value],
        options: WindowOptions,
    ) -> Result<Execution, DbError> {
        let schema = self.session.store().schema(table)?;
        let projection = match columns {
            Some(columns) => columns
                .iter()
                .map(|c| resolve_column(&schema, c))
                .collect::<Result<Vec<_>, _>>()?,
            None => (0..schema.columns.len()).collect(),
        };
        let order = order_by
            .iter()
            .map(|(c, direction)| Ok((resolve_column(&schema, c)?, *direction)))
            .collect::<Result<Vec<_>, DbError>>()?;
        let predicate = Predicate::new(&schema, filter, params)?;

        let (mut rows, epoch) = self.session.with_transaction(|tx, store| {
            let rows: Vec<Row> = tx
                .rows(store, table)?
                .into_iter()
                .filter(|row| predicate.matches(row))
                .collect();
            Ok((rows, tx.epoch()))
        })?;

        if !order.is_empty() {
            rows.sort_by(|a, b| {
                order
                    .iter()
                    .map(|&(i, direction)| {
                        let ordering = a.values[i].sort_cmp(&b.values[i]);
                        match direction {
                            Direction::Ascending => ordering,
                            Direction::Descending => ordering.reverse(),
                        }
                    })
                    .find(|o| o.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        if self.max_rows > 0 {
            rows.truncate(self.max_rows);
        }
        tracing::debug!("Query on {} returned {} rows", schema.name, rows.len());

        Ok(Execution::Rows(ResultWindow::new(
            self.session.clone(),
            schema,
            projection,
            rows,
            options,
            epoch,
        )))
    }
}

/// Resolves a possibly qualified column reference against a table.
fn resolve_column(schema: &TableSchema, column: &ColumnRef) -> Result<usize, DbError> {
    if let Some(qualifier) = &column.table {
        if !qualifier.eq_ignore_ascii_case(&schema.name) {
            return Err(DbError::UnknownColumn(column.to_string()));
        }
    }
    schema
        .column_index(&column.name)
        .ok_or_else(|| DbError::UnknownColumn(column.to_string()))
}

fn bind(expr: &Expression, params: &[Value]) -> Result<Value, DbError> {
    match expr {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Parameter(index) => params.get(*index).cloned().ok_or_else(|| {
            DbError::ExecutionError(format!("no value bound for parameter {}", index + 1))
        }),
    }
}

/// WHERE clause with columns resolved and parameters bound.
struct Predicate {
    terms: Vec<(usize, ast::Operator, Value)>,
}

impl Predicate {
    fn new(schema: &TableSchema, filter: &[Comparison], params: &[Value]) -> Result<Self, DbError> {
        let terms = filter
            .iter()
            .map(|c| Ok((resolve_column(schema, &c.column)?, c.operator, bind(&c.value, params)?)))
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(Self { terms })
    }

    /// NULL and incomparable operands never match.
    fn matches(&self, row: &Row) -> bool {
        self.terms.iter().all(|(index, operator, value)| {
            row.values
                .get(*index)
                .and_then(|v| v.compare(value))
                .is_some_and(|ordering| operator.matches(ordering))
        })
    }
}
