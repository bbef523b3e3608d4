//! Integration test suite.
//!
//! Tests are organized by area:
//! 1. Statements and prepared statements
//! 2. Transactions
//! 3. Scrollable and sensitive result windows
//! 4. Updatable result windows
//! 5. Batch updates

pub mod batch_tests;
pub mod helpers;
pub mod scrollable_tests;
pub mod statements_tests;
pub mod updatable_tests;
