//! Transaction context, staged edits, and ordered commit.

mod context;
mod pending_edit;
mod staging_table;

pub use context::{TransactionContext, TransactionState};
pub use pending_edit::PendingEdit;
pub use staging_table::{RowOverlay, StagingTable};
