use crate::engine::error::EvalError;
use rusqlite::Connection;
use std::path::Path;

pub type Row = Vec<i64>;

/// The request/response surface the evaluator needs from a SQL engine. The
/// dialect has to support `CREATE TABLE IF NOT EXISTS`, `ALTER TABLE ...
/// RENAME TO`, `INSERT INTO ... SELECT`, `SELECT DISTINCT`, inner joins and
/// set-semantics `EXCEPT`.
pub trait SqlChannel {
    /// Runs one statement; statements without result columns return no rows.
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>, EvalError>;
    fn commit(&mut self) -> Result<(), EvalError>;
    fn close(&mut self) -> Result<(), EvalError>;
}

pub struct SqliteChannel {
    conn: Connection,
}

impl SqliteChannel {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EvalError> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, EvalError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl SqlChannel for SqliteChannel {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>, EvalError> {
        let mut statement = self.conn.prepare(sql)?;
        let column_count = statement.column_count();

        if column_count == 0 {
            statement.execute([])?;
            return Ok(vec![]);
        }

        let rows = statement
            .query_map([], |row| {
                (0..column_count)
                    .map(|idx| row.get::<_, i64>(idx))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect::<rusqlite::Result<Vec<Row>>>()?;

        Ok(rows)
    }

    // The connection runs in autocommit mode: every statement is durable once
    // execute returns.
    fn commit(&mut self) -> Result<(), EvalError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), EvalError> {
        Ok(())
    }
}
