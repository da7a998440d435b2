use super::{with_timeout, ResultTable, SqlExecutor, SqlValue};
use crate::errors::diagnostic::{codes, Diagnostic};
use crate::sql::ResolvedStatement;
use anyhow::Context;
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection};
use std::time::Duration;

pub const PREFIX: &str = "sqlite:";
const MEMORY: &str = ":memory:";

/// Embedded backend for `sqlite:<path>` and `sqlite::memory:` targets.
pub struct SqliteExecutor;

impl SqliteExecutor {
    fn open(target: &str) -> anyhow::Result<Connection> {
        let location = target
            .trim()
            .strip_prefix(PREFIX)
            .with_context(|| format!("not a sqlite target: {}", target))?;
        if location == MEMORY {
            return Connection::open_in_memory().context("failed to open in-memory sqlite db");
        }
        Connection::open(location).with_context(|| format!("failed to open sqlite db {}", location))
    }

    async fn run(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
        keep_rows: bool,
    ) -> anyhow::Result<(Vec<ResultTable>, u64)> {
        if !statement.params.is_empty() {
            return Err(Diagnostic::new(
                codes::E_SETUP_SQL_UNSUPPORTED,
                "parameter_sql forwarding needs a SQL Server target",
            )
            .with_source("executor")
            .with_context(serde_json::json!({ "sql": statement.text }))
            .with_fix_step("Inline the setup statements into the case sql for sqlite targets")
            .into());
        }

        let conn = Self::open(target)?;
        let interrupt = conn.get_interrupt_handle();
        let sql = statement.text.clone();
        let task = tokio::task::spawn_blocking(move || execute_all(&conn, &sql, keep_rows));

        let res = with_timeout(timeout, async {
            task.await.context("sqlite worker panicked")?
        })
        .await;
        if res.is_err() {
            interrupt.interrupt();
        }
        res
    }
}

fn execute_all(
    conn: &Connection,
    sql: &str,
    keep_rows: bool,
) -> anyhow::Result<(Vec<ResultTable>, u64)> {
    let mut tables = Vec::new();
    let mut total = 0u64;
    let mut batch = Batch::new(conn, sql);

    while let Some(mut stmt) = batch.next()? {
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        if columns.is_empty() {
            stmt.raw_execute()?;
            continue;
        }

        let mut table = ResultTable {
            columns,
            rows: Vec::new(),
        };
        let width = table.columns.len();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            total += 1;
            if !keep_rows {
                continue;
            }
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_value(row.get_ref(i)?));
            }
            table.rows.push(values);
        }
        tables.push(table);
    }
    Ok((tables, total))
}

fn to_value(v: ValueRef<'_>) -> SqlValue {
    match v {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Int(i),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Bytes(b.to_vec()),
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn query(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Vec<ResultTable>> {
        Ok(self.run(target, statement, timeout, true).await?.0)
    }

    async fn drain(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<u64> {
        Ok(self.run(target, statement, timeout, false).await?.1)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
