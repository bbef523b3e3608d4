//! In-memory store holding every table behind a single lock.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::DbError;
use crate::row::{Row, RowId};
use crate::transaction::PendingEdit;

use super::table::{Table, TableSchema};
use super::{BatchFailure, Store};

/// In-memory store. Table names are case-insensitive.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Map of normalized table name to table instance
    tables: RwLock<HashMap<String, Table>>,
}

fn table_key(name: &str) -> String {
    name.to_ascii_uppercase()
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the names of all tables.
    pub fn table_names(&self) -> Result<Vec<String>, DbError> {
        let tables = self.tables.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(tables.values().map(|t| t.schema.name.clone()).collect())
    }

    /// Executes a closure with a read-only table.
    fn with_table<F, R>(&self, name: &str, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&Table) -> R,
    {
        let tables = self.tables.read().map_err(|_| DbError::LockPoisoned)?;
        let table = tables
            .get(&table_key(name))
            .ok_or_else(|| DbError::TableNotFound {
                table: name.to_string(),
            })?;
        Ok(f(table))
    }
}

impl Store for MemoryStore {
    fn create_table(&self, schema: TableSchema) -> Result<(), DbError> {
        let mut tables = self.tables.write().map_err(|_| DbError::LockPoisoned)?;
        let key = table_key(&schema.name);
        if tables.contains_key(&key) {
            return Err(DbError::TableAlreadyExists(schema.name));
        }
        tracing::info!(
            "Creating table {} with {} columns",
            schema.name,
            schema.columns.len()
        );
        tables.insert(key, Table::new(schema));
        Ok(())
    }

    fn drop_table(&self, name: &str) -> Result<(), DbError> {
        let mut tables = self.tables.write().map_err(|_| DbError::LockPoisoned)?;
        tables
            .remove(&table_key(name))
            .ok_or_else(|| DbError::TableNotFound {
                table: name.to_string(),
            })?;
        tracing::info!("Dropped table {}", name);
        Ok(())
    }

    fn schema(&self, table: &str) -> Result<TableSchema, DbError> {
        self.with_table(table, |t| t.schema.clone())
    }

    fn scan(&self, table: &str) -> Result<Vec<Row>, DbError> {
        self.with_table(table, Table::scan)
    }

    fn fetch(&self, table: &str, id: RowId) -> Result<Option<Row>, DbError> {
        self.with_table(table, |t| t.fetch(id))
    }

    fn allocate_row_id(&self, table: &str) -> Result<RowId, DbError> {
        self.with_table(table, Table::next_id)
    }

    fn apply_batch(&self, edits: &[PendingEdit]) -> Result<(), BatchFailure> {
        let mut tables = self.tables.write().map_err(|_| BatchFailure {
            index: 0,
            error: DbError::LockPoisoned,
        })?;

        for (index, edit) in edits.iter().enumerate() {
            let result = match tables.get_mut(&table_key(edit.table())) {
                Some(table) => table.apply(edit),
                None => Err(DbError::TableNotFound {
                    table: edit.table().to_string(),
                }),
            };
            if let Err(error) = result {
                tracing::debug!("Edit {} of {} rejected: {}", index, edits.len(), error);
                return Err(BatchFailure { index, error });
            }
        }
        Ok(())
    }
}
