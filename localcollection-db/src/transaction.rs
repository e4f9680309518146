//! Scoped `BEGIN IMMEDIATE` transactions.

use std::ops::Deref;

use rusqlite::Connection;

use crate::error::{OperationContext, StoreError};

/// A guarded write transaction on a borrowed connection.
///
/// Resolve it with [`commit`](Self::commit) or [`rollback`](Self::rollback).
/// A scope dropped unresolved, including on an early `?` return, issues
/// `ROLLBACK` exactly once.
///
/// Scopes do not nest. SQLite refuses `BEGIN` inside an open transaction, so
/// beginning a second scope on the same connection fails with
/// [`StoreError::QueryFailed`].
///
/// Derefs to [`Connection`], so store functions taking `&Connection` can be
/// handed `&scope` directly.
#[must_use = "a transaction scope rolls back when dropped without commit"]
pub struct TransactionScope<'conn> {
    conn: &'conn Connection,
    resolved: bool,
}

impl<'conn> TransactionScope<'conn> {
    /// Start an immediate (write-locking) transaction.
    pub fn begin(conn: &'conn Connection) -> Result<Self, StoreError> {
        conn.execute_batch("BEGIN IMMEDIATE")
            .during("transaction_begin")?;
        Ok(Self {
            conn,
            resolved: false,
        })
    }

    /// Commit everything written inside the scope.
    ///
    /// If `COMMIT` fails the scope is still unresolved and rolls back on drop.
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("COMMIT")
            .during("transaction_commit")?;
        self.resolved = true;
        Ok(())
    }

    /// Discard everything written inside the scope.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.resolved = true;
        self.conn
            .execute_batch("ROLLBACK")
            .during("transaction_rollback")
    }
}

impl Deref for TransactionScope<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        log::debug!("Rolling back abandoned transaction");
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            log::warn!("Rollback of abandoned transaction failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn_with_table() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn commit_persists_writes() {
        let conn = conn_with_table();
        let tx = TransactionScope::begin(&conn).unwrap();
        tx.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();
        tx.commit().unwrap();
        assert_eq!(count(&conn), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn drop_without_commit_rolls_back() {
        let conn = conn_with_table();
        {
            let tx = TransactionScope::begin(&conn).unwrap();
            tx.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();
        }
        assert_eq!(count(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn explicit_rollback_discards_writes() {
        let conn = conn_with_table();
        let tx = TransactionScope::begin(&conn).unwrap();
        tx.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();
        tx.rollback().unwrap();
        assert_eq!(count(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn error_unwind_rolls_back() {
        fn failing_write(conn: &Connection) -> Result<(), StoreError> {
            let tx = TransactionScope::begin(conn)?;
            tx.execute("INSERT INTO t (x) VALUES (1)", [])
                .during("failing_write")?;
            tx.execute("INSERT INTO missing (x) VALUES (1)", [])
                .during("failing_write")?;
            tx.commit()
        }

        let conn = conn_with_table();
        let err = failing_write(&conn).unwrap_err();
        assert_eq!(err.operation(), Some("failing_write"));
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn nested_scopes_are_refused() {
        let conn = conn_with_table();
        let outer = TransactionScope::begin(&conn).unwrap();
        let inner = TransactionScope::begin(&conn);
        assert!(matches!(
            inner,
            Err(StoreError::QueryFailed {
                operation: "transaction_begin",
                ..
            })
        ));
        outer.commit().unwrap();
    }
}
