use crate::sql::ResolvedStatement;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

pub mod fake;
#[cfg(feature = "mssql")]
pub mod mssql;
pub mod sqlite;

/// A single cell as read from a result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultTable {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<SqlValue>) -> Self {
        self.rows.push(row);
        self
    }
}

/// Runs resolved statements against a connection target. Every call opens
/// its own connection and closes it before returning.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Executes and materialises every result table, in execution order.
    async fn query(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Vec<ResultTable>>;

    /// Executes and reads every row of every result table without keeping
    /// them. Returns the number of rows read.
    async fn drain(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<u64>;

    fn backend_name(&self) -> &'static str;
}

/// `0` disables the limit.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Raised when a statement outlives its time limit.
#[derive(Debug, thiserror::Error)]
#[error("query timed out after {}s", .limit.as_secs_f64())]
pub struct QueryTimeout {
    pub limit: Duration,
}

pub(crate) async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match limit {
        Some(d) => match tokio::time::timeout(d, fut).await {
            Ok(res) => res,
            Err(_) => Err(QueryTimeout { limit: d }.into()),
        },
        None => fut.await,
    }
}

pub fn is_sqlite_target(target: &str) -> bool {
    target.trim_start().starts_with(sqlite::PREFIX)
}

/// Picks a backend per connection target: `sqlite:` targets go to the
/// embedded engine, everything else is treated as a SQL Server connection
/// string.
pub struct RoutingExecutor {
    sqlite: sqlite::SqliteExecutor,
    #[cfg(feature = "mssql")]
    mssql: mssql::MssqlExecutor,
}

impl Default for RoutingExecutor {
    fn default() -> Self {
        Self {
            sqlite: sqlite::SqliteExecutor,
            #[cfg(feature = "mssql")]
            mssql: mssql::MssqlExecutor,
        }
    }
}

impl RoutingExecutor {
    fn route(&self, target: &str) -> anyhow::Result<&dyn SqlExecutor> {
        if is_sqlite_target(target) {
            return Ok(&self.sqlite);
        }
        #[cfg(feature = "mssql")]
        return Ok(&self.mssql);
        #[cfg(not(feature = "mssql"))]
        anyhow::bail!(
            "connection target {} needs SQL Server support; rebuild with the `mssql` feature",
            crate::redaction::redact_connection_target(target)
        );
    }
}

#[async_trait]
impl SqlExecutor for RoutingExecutor {
    async fn query(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Vec<ResultTable>> {
        self.route(target)?.query(target, statement, timeout).await
    }

    async fn drain(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<u64> {
        self.route(target)?.drain(target, statement, timeout).await
    }

    fn backend_name(&self) -> &'static str {
        "routing"
    }
}
