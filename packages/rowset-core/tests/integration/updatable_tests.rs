//! Updatable result windows.

use ntest::timeout;
use rowset_core::{Concurrency, DbError, Sensitivity, WindowOptions, WindowState};

use super::helpers::{TestContext, TABLE_C3};

const SCROLL_SENSITIVE_UPDATABLE: WindowOptions = WindowOptions {
    concurrency: Concurrency::Updatable,
    sensitivity: Sensitivity::Sensitive,
    scrollable: true,
};

#[timeout(2000)]
#[test]
fn test_creating_updatable_window() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let window = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3")
        .unwrap();
    assert_eq!(window.concurrency(), Concurrency::Updatable);
}

#[timeout(2000)]
#[test]
fn test_updating_programmatically() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    window.next().unwrap();
    window.update("NAME", "UPDATED!").unwrap();
    window.confirm_row().unwrap();
    assert_eq!(window.get_string("NAME").unwrap().as_deref(), Some("UPDATED!"));

    window.next().unwrap();
    window.update("NAME", "UPDATED!").unwrap();
    assert!(window.cancel_pending_edits().unwrap());
    assert_ne!(window.get_string("NAME").unwrap().as_deref(), Some("UPDATED!"));

    let names = ctx.committed_column("SELECT NAME FROM TABLE_C3 ORDER BY ID", "NAME");
    assert_eq!(names[0].as_deref(), Some("UPDATED!"));
    assert_eq!(names[1].as_deref(), Some("NAME_2"));
}

#[timeout(2000)]
#[test]
fn test_update_lost_when_cursor_moves() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    window.absolute(1).unwrap();
    window.update(2usize, "LOST").unwrap();
    window.next().unwrap();
    window.previous().unwrap();
    window.confirm_row().unwrap();
    assert_eq!(window.get_string("NAME").unwrap().as_deref(), Some("NAME_1"));
    assert_eq!(ctx.conn.pending_edit_count().unwrap(), 0);
    let names = ctx.committed_column("SELECT NAME FROM TABLE_C3 ORDER BY ID", "NAME");
    assert_eq!(names[0].as_deref(), Some("NAME_1"));
}

#[timeout(2000)]
#[test]
fn test_rejected_scroll_keeps_pending_update() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let forward_only = WindowOptions::new(Concurrency::Updatable, Sensitivity::Insensitive, false);
    let mut window = ctx
        .conn
        .create_statement_with(forward_only)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    window.next().unwrap();
    window.update("NAME", "KEPT").unwrap();
    assert!(matches!(
        window.previous(),
        Err(DbError::UnsupportedOperation(_))
    ));
    assert!(matches!(
        window.relative(1),
        Err(DbError::UnsupportedOperation(_))
    ));
    assert_eq!(window.row().unwrap(), 1);
    window.confirm_row().unwrap();

    window.move_to_insert_row().unwrap();
    assert!(matches!(
        window.first(),
        Err(DbError::UnsupportedOperation(_))
    ));
    assert_eq!(window.state(), WindowState::InsertStaging);

    let names = ctx.committed_column("SELECT NAME FROM TABLE_C3 ORDER BY ID", "NAME");
    assert_eq!(names[0].as_deref(), Some("KEPT"));
}

#[timeout(2000)]
#[test]
fn test_rejected_confirm_keeps_updates_for_retry() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    window.absolute(2).unwrap();
    window.update("NAME", "RETRIED").unwrap();
    window.update("ID", rowset_core::Value::Null).unwrap();
    assert!(matches!(
        window.confirm_row(),
        Err(DbError::ConstraintViolation(_))
    ));
    assert_eq!(ctx.conn.pending_edit_count().unwrap(), 0);

    // Fix the offending column and confirm the same row again
    window.update("ID", 20).unwrap();
    window.confirm_row().unwrap();
    assert_eq!(window.get_string("NAME").unwrap().as_deref(), Some("RETRIED"));
    assert_eq!(window.get_int("ID").unwrap(), Some(20));
    let names = ctx.committed_column("SELECT NAME FROM TABLE_C3 ORDER BY ID", "NAME");
    assert_eq!(names[2].as_deref(), Some("RETRIED"));
}

#[timeout(2000)]
#[test]
fn test_update_rejects_bad_type_and_position() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    assert!(matches!(
        window.update("NAME", "X"),
        Err(DbError::InvalidCursorPosition(_))
    ));
    window.next().unwrap();
    assert!(matches!(
        window.update("ID", "not a number"),
        Err(DbError::TypeMismatch { .. })
    ));
    assert!(matches!(
        window.update("MISSING", 1),
        Err(DbError::UnknownColumn(_))
    ));
}

#[timeout(2000)]
#[test]
fn test_inserting_row_programmatically() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let stmt = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap();
    let mut window = stmt.execute_query("SELECT ID, NAME FROM TABLE_C3").unwrap();
    window.last().unwrap();
    assert_eq!(window.row().unwrap(), 3);
    window.before_first().unwrap();
    window.move_to_insert_row().unwrap();
    window.update("ID", 4).unwrap();
    window.update("NAME", "INSERTED_ROW").unwrap();
    window.insert_row().unwrap();

    let mut fresh = stmt.execute_query("SELECT ID, NAME FROM TABLE_C3").unwrap();
    fresh.last().unwrap();
    assert_eq!(fresh.row().unwrap(), 4);
    assert_eq!(fresh.get_int("ID").unwrap(), Some(4));

    window.move_to_current_row().unwrap();
    assert!(window.is_before_first().unwrap());
}

#[timeout(2000)]
#[test]
fn test_leaving_insert_row_discards_values() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    window.absolute(2).unwrap();
    window.move_to_insert_row().unwrap();
    window.update("ID", 10).unwrap();
    assert!(matches!(
        window.confirm_row(),
        Err(DbError::InvalidCursorPosition(_))
    ));
    assert!(matches!(
        window.cancel_pending_edits(),
        Err(DbError::InvalidCursorPosition(_))
    ));
    // Moving restores the saved position before applying the move
    assert!(window.next().unwrap());
    assert_eq!(window.state(), WindowState::Normal);
    assert_eq!(window.row().unwrap(), 3);
    assert_eq!(window.len(), 3);
    assert_eq!(
        ctx.committed_column("SELECT NAME FROM TABLE_C3", "NAME").len(),
        3
    );
}

#[timeout(2000)]
#[test]
fn test_insert_missing_key_is_rejected() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3")
        .unwrap();
    window.move_to_insert_row().unwrap();
    window.update("NAME", "NO_KEY").unwrap();
    assert!(matches!(
        window.insert_row(),
        Err(DbError::ConstraintViolation(_))
    ));
    assert_eq!(window.len(), 3);
}

#[timeout(2000)]
#[test]
fn test_deleting_row_programmatically() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let stmt = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap();
    let mut window = stmt.execute_query("SELECT ID, NAME FROM TABLE_C3").unwrap();
    window.next().unwrap();
    window.delete_row().unwrap();
    assert!(window.row_deleted().unwrap());
    assert!(matches!(window.get("NAME"), Err(DbError::RowDeleted { .. })));

    let mut fresh = stmt.execute_query("SELECT ID, NAME FROM TABLE_C3").unwrap();
    fresh.last().unwrap();
    assert_eq!(fresh.row().unwrap(), 2);
}

#[timeout(2000)]
#[test]
fn test_window_mutations_share_the_transaction() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    ctx.conn.set_auto_commit(false).unwrap();
    let mut window = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3 ORDER BY ID")
        .unwrap();
    window.first().unwrap();
    window.update("NAME", "A").unwrap();
    window.confirm_row().unwrap();
    window.next().unwrap();
    window.delete_row().unwrap();
    assert_eq!(ctx.conn.pending_edit_count().unwrap(), 2);

    // A statement on the same connection sees the staged state
    let seen = ctx
        .conn
        .create_statement()
        .unwrap()
        .execute_query("SELECT ID FROM TABLE_C3")
        .unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(
        ctx.committed_column("SELECT NAME FROM TABLE_C3", "NAME").len(),
        3
    );

    ctx.conn.commit().unwrap();
    let names = ctx.committed_column("SELECT NAME FROM TABLE_C3 ORDER BY ID", "NAME");
    assert_eq!(names, vec![Some("A".to_string()), Some("NAME_3".to_string())]);
}

#[timeout(2000)]
#[test]
fn test_window_fails_after_close() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut window = ctx
        .conn
        .create_statement_with(SCROLL_SENSITIVE_UPDATABLE)
        .unwrap()
        .execute_query("SELECT ID, NAME FROM TABLE_C3")
        .unwrap();
    window.next().unwrap();
    ctx.conn.close();
    assert!(matches!(
        window.update("NAME", "X"),
        Err(DbError::ConnectionClosed)
    ));
    assert!(matches!(window.confirm_row(), Err(DbError::ConnectionClosed)));
    assert!(matches!(window.previous(), Err(DbError::ConnectionClosed)));
}
