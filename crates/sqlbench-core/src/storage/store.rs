use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

/// A row of `benchmark_runs` as written.
#[derive(Debug, Clone)]
pub struct NewRun<'a> {
    pub run_key: &'a str,
    pub name: &'a str,
    pub connection_target: &'a str,
    pub sql: &'a str,
    pub params_json: &'a str,
    pub results_json: &'a str,
    pub run_at: &'a str,
}

/// A row of `benchmark_runs` as read back. `results_json` is left unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub id: i64,
    pub run_key: String,
    pub name: String,
    pub connection_target: String,
    pub sql: String,
    pub params_json: String,
    pub results_json: String,
    pub run_at: String,
}

const RUN_COLUMNS: &str =
    "id, run_key, name, connection_target, sql, params_json, results_json, run_at";

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open run store {}", path.display()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(crate::storage::schema::DDL)
            .context("failed to create run store schema")?;
        Ok(())
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("run store connection lock poisoned"))
    }

    pub fn insert_run(&self, run: &NewRun<'_>) -> anyhow::Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO benchmark_runs(
                run_key, name, connection_target, sql, params_json, results_json, run_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.run_key,
                run.name,
                run.connection_target,
                run.sql,
                run.params_json,
                run.results_json,
                run.run_at
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recently inserted row for a run key.
    pub fn latest_run(&self, run_key: &str) -> anyhow::Result<Option<StoredRun>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM benchmark_runs WHERE run_key = ?1 ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![run_key], map_run)
            .optional()?;
        Ok(row)
    }

    pub fn runs_for_case(&self, name: &str, target: &str) -> anyhow::Result<Vec<StoredRun>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM benchmark_runs
             WHERE name = ?1 AND connection_target = ?2
             ORDER BY id DESC",
            RUN_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![name, target], map_run)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn delete_runs_for_case(&self, name: &str, target: &str) -> anyhow::Result<usize> {
        let conn = self.lock()?;
        let n = conn.execute(
            "DELETE FROM benchmark_runs WHERE name = ?1 AND connection_target = ?2",
            params![name, target],
        )?;
        Ok(n)
    }

    pub fn count_runs(&self) -> anyhow::Result<u64> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM benchmark_runs", [], |r| r.get(0))?;
        Ok(n.max(0) as u64)
    }
}

fn map_run(row: &Row<'_>) -> rusqlite::Result<StoredRun> {
    Ok(StoredRun {
        id: row.get(0)?,
        run_key: row.get(1)?,
        name: row.get(2)?,
        connection_target: row.get(3)?,
        sql: row.get(4)?,
        params_json: row.get(5)?,
        results_json: row.get(6)?,
        run_at: row.get(7)?,
    })
}
