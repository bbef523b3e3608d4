//! Embedded store behind the result-set core.
//!
//! The core never touches table storage directly: it reads rows through
//! [`Store::scan`] and [`Store::fetch`] and writes only by handing staged
//! edits to [`Store::apply_batch`] at commit.

mod memory;
mod table;

pub use memory::MemoryStore;
pub use table::{ColumnDef, TableSchema};

use crate::error::DbError;
use crate::row::{Row, RowId};
use crate::transaction::PendingEdit;

/// First failing edit of a batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// Position of the failing edit in the batch
    pub index: usize,
    /// Why the store rejected it
    pub error: DbError,
}

/// Storage collaborator used by sessions.
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Creates a table. Fails if the name is taken.
    fn create_table(&self, schema: TableSchema) -> Result<(), DbError>;

    /// Drops a table and all its rows.
    fn drop_table(&self, name: &str) -> Result<(), DbError>;

    /// Returns the schema of a table.
    fn schema(&self, table: &str) -> Result<TableSchema, DbError>;

    /// Returns every committed row of a table ordered by row id.
    fn scan(&self, table: &str) -> Result<Vec<Row>, DbError>;

    /// Re-fetches the committed values of one row.
    fn fetch(&self, table: &str, id: RowId) -> Result<Option<Row>, DbError>;

    /// Reserves a fresh row id. Ids are never handed out twice.
    fn allocate_row_id(&self, table: &str) -> Result<RowId, DbError>;

    /// Applies edits in order, stopping at the first failure.
    ///
    /// Edits before the failing index remain applied.
    fn apply_batch(&self, edits: &[PendingEdit]) -> Result<(), BatchFailure>;
}
