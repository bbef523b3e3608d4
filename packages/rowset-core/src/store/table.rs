//! Table schema and row storage.
//!
//! Each table has:
//! - Fixed schema with column definitions
//! - Rows ordered by row id
//! - Row ID sequence generator

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::row::{Row, RowId};
use crate::transaction::PendingEdit;
use crate::value::{DataType, Value};

/// Column definition within a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Declared type
    pub data_type: DataType,
    /// Whether NULL is accepted
    pub nullable: bool,
    /// Whether this column is the primary key
    pub primary_key: bool,
}

impl ColumnDef {
    /// Creates a nullable, non-key column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            primary_key: false,
        }
    }

    /// Marks the column as primary key. Primary keys are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Table schema: name plus columns in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Creates a validated schema.
    ///
    /// # Arguments
    /// * `name` - Table name
    /// * `columns` - Column definitions
    ///
    /// # Returns
    /// `Result<TableSchema, DbError>` containing the schema or the reason it was rejected.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Result<Self, DbError> {
        let name = name.into();
        if columns.is_empty() {
            return Err(DbError::ExecutionError(format!(
                "table '{}' must have at least one column",
                name
            )));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.to_ascii_uppercase()) {
                return Err(DbError::ExecutionError(format!(
                    "duplicate column '{}' in table '{}'",
                    column.name, name
                )));
            }
        }

        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(DbError::ExecutionError(format!(
                "table '{}' declares more than one primary key",
                name
            )));
        }

        Ok(Self { name, columns })
    }

    /// Returns the index of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Returns the index of the primary key column, if any.
    pub fn primary_key(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.primary_key)
    }

    /// Coerces a value to a column's type and enforces nullability.
    pub fn check_value(&self, index: usize, value: Value) -> Result<Value, DbError> {
        let column = self
            .columns
            .get(index)
            .ok_or_else(|| DbError::UnknownColumn(format!("{}[{}]", self.name, index)))?;
        let value = value.coerce(column.data_type)?;
        if value.is_null() && !column.nullable {
            return Err(DbError::ConstraintViolation(format!(
                "column '{}.{}' does not accept NULL",
                self.name, column.name
            )));
        }
        Ok(value)
    }

    /// Checks a full row in column order.
    pub fn check_row(&self, values: Vec<Value>) -> Result<Vec<Value>, DbError> {
        if values.len() != self.columns.len() {
            return Err(DbError::ExecutionError(format!(
                "table '{}' has {} columns but {} values were supplied",
                self.name,
                self.columns.len(),
                values.len()
            )));
        }
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| self.check_value(i, v))
            .collect()
    }
}

/// Committed rows of one table.
#[derive(Debug)]
pub(crate) struct Table {
    pub schema: TableSchema,
    pub rows: BTreeMap<RowId, Vec<Value>>,
    /// Next row ID to assign (atomic counter)
    next_id: AtomicU64,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_id: AtomicU64::new(1), // Start IDs at 1
        }
    }

    /// Atomically increments and returns the next row ID.
    pub fn next_id(&self) -> RowId {
        RowId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub fn fetch(&self, id: RowId) -> Option<Row> {
        self.rows.get(&id).map(|values| Row::new(id, values.clone()))
    }

    pub fn scan(&self) -> Vec<Row> {
        self.rows
            .iter()
            .map(|(id, values)| Row::new(*id, values.clone()))
            .collect()
    }

    /// Applies one edit, enforcing every constraint of the schema.
    pub fn apply(&mut self, edit: &PendingEdit) -> Result<(), DbError> {
        match edit {
            PendingEdit::InsertRow { row, .. } => {
                if self.rows.contains_key(&row.id) {
                    return Err(DbError::ConstraintViolation(format!(
                        "row {} already exists in table '{}'",
                        row.id, self.schema.name
                    )));
                }
                let values = self.schema.check_row(row.values.clone())?;
                if let Some(pk) = self.schema.primary_key() {
                    self.check_unique(pk, &values[pk], None)?;
                }
                self.rows.insert(row.id, values);
                self.next_id.fetch_max(row.id.0 + 1, Ordering::SeqCst);
            }
            PendingEdit::ColumnUpdate {
                row, column, value, ..
            } => {
                if !self.rows.contains_key(row) {
                    return Err(DbError::RowNotFound {
                        table: self.schema.name.clone(),
                        row: *row,
                    });
                }
                let index = self
                    .schema
                    .column_index(column)
                    .ok_or_else(|| DbError::UnknownColumn(column.clone()))?;
                let value = self.schema.check_value(index, value.clone())?;
                if self.schema.primary_key() == Some(index) {
                    self.check_unique(index, &value, Some(*row))?;
                }
                if let Some(values) = self.rows.get_mut(row) {
                    values[index] = value;
                }
            }
            PendingEdit::DeleteRow { row, .. } => {
                self.rows.remove(row).ok_or_else(|| DbError::RowNotFound {
                    table: self.schema.name.clone(),
                    row: *row,
                })?;
            }
        }
        Ok(())
    }

    fn check_unique(&self, index: usize, value: &Value, except: Option<RowId>) -> Result<(), DbError> {
        let duplicate = self
            .rows
            .iter()
            .filter(|(id, _)| Some(**id) != except)
            .any(|(_, values)| values[index].compare(value) == Some(std::cmp::Ordering::Equal));
        if duplicate {
            return Err(DbError::ConstraintViolation(format!(
                "duplicate primary key {} in table '{}'",
                value, self.schema.name
            )));
        }
        Ok(())
    }
}
