//! Statement and prepared statement behavior.

use ntest::timeout;
use rowset_core::{DbError, Execution, Value};

use super::helpers::{column_strings, TestContext};

const TABLE_C2: &[&str] = &[
    "CREATE TABLE TABLE_C2 (ID INT PRIMARY KEY, NAME VARCHAR(32) NOT NULL)",
    "INSERT INTO TABLE_C2 VALUES (1, 'NAME_1'), (2, 'NAME_1'), (3, 'NAME_3')",
];

#[timeout(2000)]
#[test]
fn test_execute_update_returns_affected_rows() {
    let ctx = TestContext::with_fixture(TABLE_C2);
    let stmt = ctx.conn.create_statement().unwrap();
    let count = stmt
        .execute_update("UPDATE TABLE_C2 SET NAME = 'NAME_2' WHERE NAME = 'NAME_1'")
        .unwrap();
    assert_eq!(count, 2);
}

#[timeout(2000)]
#[test]
fn test_execute_distinguishes_queries_and_updates() {
    let ctx = TestContext::with_fixture(TABLE_C2);
    let stmt = ctx.conn.create_statement().unwrap();
    match stmt.execute("SELECT * FROM TABLE_C2").unwrap() {
        Execution::Rows(window) => assert_eq!(window.len(), 3),
        other => panic!("Expected rows, got {:?}", other),
    }
    match stmt.execute("DELETE FROM TABLE_C2 WHERE ID = 3").unwrap() {
        Execution::Count(count) => assert_eq!(count, 1),
        other => panic!("Expected count, got {:?}", other),
    }
    assert!(matches!(
        stmt.execute_update("SELECT * FROM TABLE_C2"),
        Err(DbError::ExecutionError(_))
    ));
    assert!(matches!(
        stmt.execute_query("DELETE FROM TABLE_C2"),
        Err(DbError::ExecutionError(_))
    ));
}

#[timeout(2000)]
#[test]
fn test_malformed_statement_is_execution_error() {
    let ctx = TestContext::with_fixture(TABLE_C2);
    let stmt = ctx.conn.create_statement().unwrap();
    for sql in ["", "   ", "SELECT FROM", "UPDATE TABLE_C2 NAME = 'x'"] {
        assert!(
            matches!(stmt.execute(sql), Err(DbError::ExecutionError(_))),
            "{:?}",
            sql
        );
    }
}

#[timeout(2000)]
#[test]
fn test_not_null_rejected_by_store() {
    let ctx = TestContext::with_fixture(TABLE_C2);
    let stmt = ctx.conn.create_statement().unwrap();
    assert!(matches!(
        stmt.execute_update("INSERT INTO TABLE_C2 (ID) VALUES (9)"),
        Err(DbError::ConstraintViolation(_))
    ));
}

#[timeout(2000)]
#[test]
fn test_prepared_update_with_parameters() {
    let ctx = TestContext::with_fixture(TABLE_C2);
    let mut update = ctx
        .conn
        .prepare_statement("UPDATE TABLE_C2 SET NAME = ? WHERE ID = ?")
        .unwrap();
    assert_eq!(update.parameter_count(), 2);
    update.set(1, "NAME_X").unwrap();
    update.set(2, 1).unwrap();
    assert_ne!(update.execute_update().unwrap(), 0);

    // Parameters stay bound between executions
    update.set(2, 3).unwrap();
    assert_eq!(update.execute_update().unwrap(), 1);

    let names = ctx.committed_column("SELECT NAME FROM TABLE_C2 ORDER BY ID", "NAME");
    assert_eq!(
        names,
        vec![
            Some("NAME_X".to_string()),
            Some("NAME_1".to_string()),
            Some("NAME_X".to_string())
        ]
    );
}

#[timeout(2000)]
#[test]
fn test_prepared_query_coerces_parameter() {
    let ctx = TestContext::with_fixture(TABLE_C2);
    let mut select = ctx
        .conn
        .prepare_statement("SELECT ID, NAME FROM TABLE_C2 WHERE ID >= ? ORDER BY ID DESC")
        .unwrap();
    select.set(1, Value::Float(2.0)).unwrap();
    let mut window = select.execute_query().unwrap();
    assert_eq!(
        column_strings(&mut window, "ID"),
        vec![Some("3".to_string()), Some("2".to_string())]
    );
}

#[timeout(2000)]
#[test]
fn test_statement_fails_after_connection_closed() {
    let ctx = TestContext::with_fixture(TABLE_C2);
    let stmt = ctx.conn.create_statement().unwrap();
    let prepared = ctx.conn.prepare_statement("SELECT * FROM TABLE_C2").unwrap();
    ctx.conn.close();
    assert!(matches!(
        stmt.execute_query("SELECT * FROM TABLE_C2"),
        Err(DbError::ConnectionClosed)
    ));
    assert!(matches!(prepared.execute_query(), Err(DbError::ConnectionClosed)));
}
