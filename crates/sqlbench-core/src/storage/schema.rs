pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS benchmark_runs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  run_key TEXT NOT NULL,
  name TEXT NOT NULL,
  connection_target TEXT NOT NULL,
  sql TEXT NOT NULL,
  params_json TEXT NOT NULL DEFAULT '[]',
  results_json TEXT NOT NULL,
  run_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_benchmark_runs_key ON benchmark_runs(run_key);
CREATE INDEX IF NOT EXISTS idx_benchmark_runs_case ON benchmark_runs(name, connection_target);
"#;
