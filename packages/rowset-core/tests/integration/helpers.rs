//! Per-test database provisioning.

use rowset_core::{Connection, Database, DbConfig, ResultWindow};

/// Two-column table used by most tests.
pub const TABLE_C3: &[&str] = &[
    "CREATE TABLE TABLE_C3 (ID INT PRIMARY KEY, NAME VARCHAR(32))",
    "INSERT INTO TABLE_C3 VALUES (1, 'NAME_1'), (2, 'NAME_2'), (3, 'NAME_3')",
];

/// Fresh database plus one connection. The connection is rolled back and
/// closed when the context is dropped.
pub struct TestContext {
    pub db: Database,
    pub conn: Connection,
}

impl TestContext {
    /// Creates a database, applies `fixture` through a separate auto-commit
    /// connection and opens the test connection.
    pub fn with_fixture(fixture: &[&str]) -> Self {
        Self::with_config(DbConfig::default(), fixture)
    }

    pub fn with_config(config: DbConfig, fixture: &[&str]) -> Self {
        let db = Database::new().with_config(DbConfig {
            auto_commit: true,
            ..config.clone()
        });
        {
            let setup = db.connect();
            let stmt = setup.create_statement().unwrap();
            for sql in fixture {
                stmt.execute_update(sql)
                    .unwrap_or_else(|e| panic!("fixture statement {:?} failed: {}", sql, e));
            }
        }
        let db = db.with_config(config);
        let conn = db.connect();
        Self { db, conn }
    }

    /// Opens another connection on the same database.
    pub fn connect(&self) -> Connection {
        self.db.connect()
    }

    /// Reads one column of a query on a fresh connection, which sees only
    /// committed data.
    pub fn committed_column(&self, sql: &str, column: &str) -> Vec<Option<String>> {
        let conn = self.db.connect();
        let mut window = conn.create_statement().unwrap().execute_query(sql).unwrap();
        column_strings(&mut window, column)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if !self.conn.is_closed() {
            let _ = self.conn.rollback();
            self.conn.close();
        }
    }
}

/// Collects one column of every remaining row as strings.
pub fn column_strings(window: &mut ResultWindow, column: &str) -> Vec<Option<String>> {
    let mut values = Vec::new();
    while window.next().unwrap() {
        values.push(window.get_string(column).unwrap());
    }
    values
}
