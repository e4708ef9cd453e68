use crate::engine::error::EvalError;
use crate::engine::sql_channel::{Row, SqlChannel};
use serde::Serialize;
use std::time::Instant;
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    FactCount,
    CompilerInit,
    MatNonrec,
    MatRec,
    Drain,
    SpjSelect,
    SpjJoin,
    SpjProject,
    SpjClear,
}

impl Tag {
    pub fn name(&self) -> &'static str {
        match self {
            Tag::FactCount => "FACT_COUNT",
            Tag::CompilerInit => "COMPILER_INIT",
            Tag::MatNonrec => "MAT_NONREC",
            Tag::MatRec => "MAT_REC",
            Tag::Drain => "DRAIN",
            Tag::SpjSelect => "SPJ_SELECT",
            Tag::SpjJoin => "SPJ_JOIN",
            Tag::SpjProject => "SPJ_PROJECT",
            Tag::SpjClear => "SPJ_CLEAR",
        }
    }
}

/// One trace row per executed statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatementRecord {
    pub test_run: u32,
    pub iter: i64,
    pub tag: &'static str,
    pub elapsed_ms: u64,
    pub rule: String,
}

/// Wraps a channel and times every statement. The iteration counter starts at
/// -1 so the first `increment_iter` labels the nonrecursive pass as 0.
pub struct ConnectionProfiler<C: SqlChannel> {
    conn: C,
    test_run: u32,
    iter: i64,
    statements: Vec<StatementRecord>,
}

impl<C: SqlChannel> ConnectionProfiler<C> {
    pub fn new(conn: C, test_run: u32) -> Self {
        Self {
            conn,
            test_run,
            iter: -1,
            statements: vec![],
        }
    }

    pub fn execute(&mut self, tag: Tag, sql: &str) -> Result<Vec<Row>, EvalError> {
        self.execute_labelled(tag, sql, "")
    }

    pub fn execute_labelled(
        &mut self,
        tag: Tag,
        sql: &str,
        rule: &str,
    ) -> Result<Vec<Row>, EvalError> {
        let started = Instant::now();
        let rows = self.conn.execute(sql)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        trace!(tag = tag.name(), elapsed_ms, sql, "statement executed");
        self.statements.push(StatementRecord {
            test_run: self.test_run,
            iter: self.iter,
            tag: tag.name(),
            elapsed_ms,
            rule: rule.to_string(),
        });

        Ok(rows)
    }

    pub fn increment_iter(&mut self) {
        self.iter += 1;
    }

    pub fn commit(&mut self) -> Result<(), EvalError> {
        self.conn.commit()
    }

    pub fn close(&mut self) -> Result<(), EvalError> {
        self.conn.close()
    }

    pub fn statements(&self) -> &[StatementRecord] {
        &self.statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sql_channel::SqliteChannel;

    #[test]
    fn test_statements_are_traced_with_iter_and_tag() {
        let channel = SqliteChannel::open_in_memory().unwrap();
        let mut profiler = ConnectionProfiler::new(channel, 7);

        profiler
            .execute(Tag::CompilerInit, "CREATE TABLE E (E_0 INTEGER)")
            .unwrap();
        profiler.increment_iter();
        profiler
            .execute_labelled(Tag::FactCount, "SELECT COUNT(*) FROM E", "T(?x) <- [E(?x)]")
            .unwrap();

        let records = profiler.statements();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].test_run, 7);
        assert_eq!(records[0].iter, -1);
        assert_eq!(records[0].tag, "COMPILER_INIT");
        assert_eq!(records[1].iter, 0);
        assert_eq!(records[1].tag, "FACT_COUNT");
        assert_eq!(records[1].rule, "T(?x) <- [E(?x)]");
    }
}
