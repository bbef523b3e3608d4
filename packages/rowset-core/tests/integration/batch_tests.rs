//! Batch updates.

use ntest::timeout;
use rowset_core::DbError;

use super::helpers::{TestContext, TABLE_C3};

#[timeout(2000)]
#[test]
fn test_statement_batch_returns_counts_in_order() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    ctx.conn.set_auto_commit(false).unwrap();
    let mut stmt = ctx.conn.create_statement().unwrap();
    stmt.add_batch("INSERT INTO TABLE_C3 VALUES (4, 'NAME_4')").unwrap();
    stmt.add_batch("UPDATE TABLE_C3 SET NAME = 'X' WHERE ID >= 3").unwrap();
    stmt.add_batch("DELETE FROM TABLE_C3 WHERE ID = 1").unwrap();
    assert_eq!(stmt.execute_batch().unwrap(), vec![1, 2, 1]);
    ctx.conn.commit().unwrap();

    let names = ctx.committed_column("SELECT NAME FROM TABLE_C3 ORDER BY ID", "NAME");
    assert_eq!(
        names,
        vec![
            Some("NAME_2".to_string()),
            Some("X".to_string()),
            Some("X".to_string())
        ]
    );
    // The queue is emptied by execution
    assert!(stmt.execute_batch().unwrap().is_empty());
}

#[timeout(2000)]
#[test]
fn test_statement_batch_stops_at_failure() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut stmt = ctx.conn.create_statement().unwrap();
    stmt.add_batch("DELETE FROM TABLE_C3 WHERE ID = 3").unwrap();
    stmt.add_batch("SELECT * FROM TABLE_C3").unwrap();
    stmt.add_batch("DELETE FROM TABLE_C3").unwrap();
    match stmt.execute_batch() {
        Err(DbError::BatchFailed {
            index,
            counts,
            source,
        }) => {
            assert_eq!(index, 1);
            assert_eq!(counts, vec![1]);
            assert!(matches!(*source, DbError::ExecutionError(_)));
        }
        other => panic!("Expected BatchFailed, got {:?}", other),
    }
    assert_eq!(
        ctx.committed_column("SELECT NAME FROM TABLE_C3", "NAME").len(),
        2
    );
}

#[timeout(2000)]
#[test]
fn test_clear_batch() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut stmt = ctx.conn.create_statement().unwrap();
    stmt.add_batch("DELETE FROM TABLE_C3").unwrap();
    stmt.clear_batch();
    assert!(stmt.execute_batch().unwrap().is_empty());
    assert_eq!(
        ctx.committed_column("SELECT NAME FROM TABLE_C3", "NAME").len(),
        3
    );
}

#[timeout(2000)]
#[test]
fn test_prepared_batch() {
    let ctx = TestContext::with_fixture(TABLE_C3);
    let mut insert = ctx
        .conn
        .prepare_statement("INSERT INTO TABLE_C3 (ID, NAME) VALUES (?, ?)")
        .unwrap();
    for (id, name) in [(4, "NAME_4"), (5, "NAME_5")] {
        insert.set(1, id).unwrap();
        insert.set(2, name).unwrap();
        insert.add_batch().unwrap();
    }
    insert.clear_parameters();
    assert!(matches!(insert.add_batch(), Err(DbError::ExecutionError(_))));

    insert.set(1, 1).unwrap();
    insert.set(2, "DUPLICATE").unwrap();
    insert.add_batch().unwrap();

    match insert.execute_batch() {
        Err(DbError::BatchFailed { index, counts, source }) => {
            assert_eq!(index, 2);
            assert_eq!(counts, vec![1, 1]);
            assert_eq!(source.commit_failed_index(), Some(0));
        }
        other => panic!("Expected BatchFailed, got {:?}", other),
    }
    assert_eq!(
        ctx.committed_column("SELECT NAME FROM TABLE_C3", "NAME").len(),
        5
    );
}
