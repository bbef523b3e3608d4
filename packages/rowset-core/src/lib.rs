//! Transactional result-set core over an embedded in-memory store.
//!
//! Provides cursor navigation, updatable and scrollable result windows,
//! staged edits with ordered commit and rollback, and the statement layer
//! that produces windows.

pub mod config;
pub mod connection;
pub mod cursor;
pub mod database;
pub mod error;
pub mod executor;
pub mod result_window;
pub mod row;
pub mod row_buffer;
pub mod sql;
pub mod store;
pub mod transaction;
pub mod value;

pub use config::DbConfig;
pub use connection::Connection;
pub use database::Database;
pub use error::DbError;
pub use executor::{Execution, PreparedStatement, Statement};
pub use result_window::{ColumnKey, Concurrency, ResultWindow, WindowOptions, WindowState};
pub use row::{Row, RowId};
pub use row_buffer::Sensitivity;
pub use transaction::TransactionState;
pub use value::{DataType, Value};
