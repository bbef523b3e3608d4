//! Cursor navigation and sensitivity.

use ntest::timeout;
use rowset_core::{Concurrency, DbError, Sensitivity, WindowOptions};

use super::helpers::{TestContext, TABLE_C3};

fn scroll(sensitivity: Sensitivity) -> WindowOptions {
    WindowOptions::new(Concurrency::ReadOnly, sensitivity, true)
}

#[timeout(2000)]
#[test]
fn test_forward_only_rejects_previous() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement()
        .unwrap()
        .execute_query("SELECT * FROM TABLE_C3")
        .unwrap();
    assert!(!window.is_scrollable());
    window.next().unwrap();
    assert!(matches!(
        window.previous(),
        Err(DbError::UnsupportedOperation(_))
    ));
    assert!(matches!(
        window.absolute(1),
        Err(DbError::UnsupportedOperation(_))
    ));
    assert!(matches!(
        window.relative(1),
        Err(DbError::UnsupportedOperation(_))
    ));
    // The failed moves leave the cursor where it was
    assert_eq!(window.row().unwrap(), 1);
}

#[timeout(2000)]
#[test]
fn test_scrollable_allows_previous() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(scroll(Sensitivity::Insensitive))
        .unwrap()
        .execute_query("SELECT * FROM TABLE_C3")
        .unwrap();
    window.next().unwrap();
    assert!(!window.previous().unwrap());
    assert!(window.is_before_first().unwrap());
}

#[timeout(2000)]
#[test]
fn test_insensitive_window_ignores_later_updates() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(scroll(Sensitivity::Insensitive))
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    ctx.conn
        .create_statement()
        .unwrap()
        .execute_update(
            "UPDATE TABLE_C3 SET TABLE_C3.NAME = 'UPDATED_NAME' WHERE TABLE_C3.NAME = 'NAME_1'",
        )
        .unwrap();
    window.next().unwrap();
    assert_ne!(window.get_string("NAME").unwrap().as_deref(), Some("UPDATED_NAME"));
    assert!(matches!(
        window.refresh_row(),
        Err(DbError::UnsupportedOperation(_))
    ));
}

#[timeout(2000)]
#[test]
fn test_sensitive_window_sees_refreshed_row() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(scroll(Sensitivity::Sensitive))
        .unwrap()
        .execute_query("SELECT NAME, ID FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    ctx.conn
        .create_statement()
        .unwrap()
        .execute_update("UPDATE TABLE_C3 SET TABLE_C3.NAME = 'UPDATED_NAME' WHERE TABLE_C3.ID = 1")
        .unwrap();
    window.next().unwrap();
    window.refresh_row().unwrap();
    assert_eq!(window.get_string("NAME").unwrap().as_deref(), Some("UPDATED_NAME"));
}

#[timeout(2000)]
#[test]
fn test_sensitive_refresh_sees_other_connection_commit() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(scroll(Sensitivity::Sensitive))
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3 ORDER BY ID")
        .unwrap();

    let other = ctx.connect();
    other
        .create_statement()
        .unwrap()
        .execute_update("DELETE FROM TABLE_C3 WHERE ID = 2")
        .unwrap();

    window.absolute(2).unwrap();
    assert_eq!(window.get_int("ID").unwrap(), Some(2));
    window.refresh_row().unwrap();
    assert!(window.row_deleted().unwrap());
    assert!(matches!(window.get("ID"), Err(DbError::RowDeleted { .. })));
}

#[timeout(2000)]
#[test]
fn test_moving_the_cursor() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(scroll(Sensitivity::Insensitive))
        .unwrap()
        .execute_query("SELECT NAME, ID FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    window.next().unwrap();
    window.next().unwrap();
    assert_eq!(window.get_int("ID").unwrap(), Some(2));
    window.previous().unwrap();
    assert_eq!(window.get_int("ID").unwrap(), Some(1));
}

#[timeout(2000)]
#[test]
fn test_moving_to_designated_rows() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(scroll(Sensitivity::Insensitive))
        .unwrap()
        .execute_query("SELECT NAME, ID FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    window.absolute(2).unwrap();
    assert_eq!(window.row().unwrap(), 2);
    assert_eq!(window.get_int("ID").unwrap(), Some(2));
    window.relative(-1).unwrap();
    assert_eq!(window.row().unwrap(), 1);
    assert_eq!(window.get_int("ID").unwrap(), Some(1));
    window.absolute(-1).unwrap();
    assert_eq!(window.row().unwrap(), 3);
    assert!(window.is_last().unwrap());

    // Clamping never errors
    assert!(!window.relative(10).unwrap());
    assert!(window.is_after_last().unwrap());
    assert!(matches!(
        window.get("ID"),
        Err(DbError::InvalidCursorPosition(_))
    ));
    assert!(!window.absolute(-10).unwrap());
    assert!(window.is_before_first().unwrap());
    assert!(window.first().unwrap());
    assert!(window.is_first().unwrap());
    window.after_last().unwrap();
    assert_eq!(window.row().unwrap(), 0);
}

#[timeout(2000)]
#[test]
fn test_empty_window() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(scroll(Sensitivity::Insensitive))
        .unwrap()
        .execute_query("SELECT * FROM TABLE_C3 WHERE ID > 100")
        .unwrap();
    assert!(window.is_empty());
    assert!(!window.absolute(-1).unwrap());
    assert!(!window.is_last().unwrap());
    assert!(!window.next().unwrap());
    assert!(window.is_after_last().unwrap());
}
