pub mod key;

use crate::model::{CachedRun, TrialSample};
use crate::redaction::redact_connection_target;
use crate::sql::ResolvedStatement;
use crate::storage::{NewRun, Store, StoredRun};
use chrono::{DateTime, SecondsFormat, Utc};

/// Append-only log of recorded sample sets. Only the newest row for a key
/// is ever read back; older rows stay until the case is invalidated.
#[derive(Clone)]
pub struct RunCache {
    store: Store,
}

impl RunCache {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Forgets every recorded run of the case on this target, whatever SQL
    /// it was recorded with.
    pub fn invalidate(&self, name: &str, target: &str) -> anyhow::Result<usize> {
        let deleted = self.store.delete_runs_for_case(name, target)?;
        tracing::debug!(
            event = "sqlbench.cache.invalidate",
            case = %name,
            target = %redact_connection_target(target),
            deleted,
        );
        Ok(deleted)
    }

    pub fn fetch_latest(
        &self,
        name: &str,
        target: &str,
        statement: &ResolvedStatement,
    ) -> anyhow::Result<Option<CachedRun>> {
        let key = key::run_key(name, target, &statement.cache_text());
        let row = match self.store.latest_run(&key)? {
            Some(row)
                if row.name == name
                    && row.connection_target == target
                    && row.sql == statement.text =>
            {
                row
            }
            _ => {
                tracing::debug!(event = "sqlbench.cache.miss", case = %name);
                return Ok(None);
            }
        };

        match decode(row) {
            Some(run) => {
                tracing::debug!(
                    event = "sqlbench.cache.hit",
                    case = %name,
                    samples = run.samples.len(),
                    run_at = %run.run_at,
                );
                Ok(Some(run))
            }
            None => {
                tracing::debug!(event = "sqlbench.cache.corrupt", case = %name, run_key = %key);
                Ok(None)
            }
        }
    }

    pub fn record(
        &self,
        name: &str,
        target: &str,
        statement: &ResolvedStatement,
        samples: &[TrialSample],
        at: DateTime<Utc>,
    ) -> anyhow::Result<i64> {
        let key = key::run_key(name, target, &statement.cache_text());
        let results_json = serde_json::to_string(samples)?;
        let params_json = statement.params_json();
        let run_at = at.to_rfc3339_opts(SecondsFormat::Micros, true);
        self.store.insert_run(&NewRun {
            run_key: &key,
            name,
            connection_target: target,
            sql: &statement.text,
            params_json: &params_json,
            results_json: &results_json,
            run_at: &run_at,
        })
    }

    /// Every readable recorded run of a case, newest first.
    pub fn history(&self, name: &str, target: &str) -> anyhow::Result<Vec<CachedRun>> {
        let rows = self.store.runs_for_case(name, target)?;
        Ok(rows.into_iter().filter_map(decode).collect())
    }
}

fn decode(row: StoredRun) -> Option<CachedRun> {
    let samples: Vec<TrialSample> = serde_json::from_str(&row.results_json).ok()?;
    if samples.is_empty() {
        return None;
    }
    Some(CachedRun {
        id: row.id,
        name: row.name,
        connection_target: row.connection_target,
        samples,
        run_at: row.run_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cache() -> RunCache {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        RunCache::new(store)
    }

    fn ms(v: &[u64]) -> Vec<TrialSample> {
        v.iter().map(|m| TrialSample::new(Duration::from_millis(*m))).collect()
    }

    #[test]
    fn test_different_sql_is_a_miss() {
        let c = cache();
        let one = ResolvedStatement::raw("select 1");
        c.record("x", "t", &one, &ms(&[5]), Utc::now()).unwrap();

        assert!(c.fetch_latest("x", "t", &one).unwrap().is_some());
        assert!(c
            .fetch_latest("x", "t", &ResolvedStatement::raw("select 2"))
            .unwrap()
            .is_none());
        assert!(c.fetch_latest("x", "other", &one).unwrap().is_none());
    }

    #[test]
    fn test_hit_requires_same_name_and_target() {
        let c = cache();
        let s = ResolvedStatement::raw("select 1");
        c.record("a\nb", "t", &s, &ms(&[5]), Utc::now()).unwrap();
        assert!(c.fetch_latest("a", "b\nt", &s).unwrap().is_none());

        // A row filed under this key for another case is not adopted.
        let key = key::run_key("a", "t", &s.cache_text());
        c.store
            .insert_run(&NewRun {
                run_key: &key,
                name: "other",
                connection_target: "t",
                sql: &s.text,
                params_json: "[]",
                results_json: r#"[{"duration_ns":5000000}]"#,
                run_at: "2024-01-01T00:00:00.000000Z",
            })
            .unwrap();
        assert!(c.fetch_latest("a", "t", &s).unwrap().is_none());
    }

    #[test]
    fn test_latest_record_wins_without_merging() {
        let c = cache();
        let s = ResolvedStatement::raw("select 1");
        c.record("x", "t", &s, &ms(&[1, 2]), Utc::now()).unwrap();
        c.record("x", "t", &s, &ms(&[3]), Utc::now()).unwrap();
        c.record("x", "t", &s, &ms(&[4, 5, 6]), Utc::now()).unwrap();

        let hit = c.fetch_latest("x", "t", &s).unwrap().unwrap();
        assert_eq!(hit.samples, ms(&[4, 5, 6]));
        assert_eq!(c.history("x", "t").unwrap().len(), 3);
    }

    #[test]
    fn test_corrupt_and_empty_payloads_are_misses() {
        let c = cache();
        let s = ResolvedStatement::raw("select 1");
        let key = key::run_key("x", "t", &s.cache_text());
        for payload in ["{not json", "[]"] {
            c.store
                .insert_run(&NewRun {
                    run_key: &key,
                    name: "x",
                    connection_target: "t",
                    sql: &s.text,
                    params_json: "[]",
                    results_json: payload,
                    run_at: "2026-01-01T00:00:00.000000Z",
                })
                .unwrap();
            assert!(c.fetch_latest("x", "t", &s).unwrap().is_none());
        }
    }

    #[test]
    fn test_invalidate_ignores_sql() {
        let c = cache();
        c.record("x", "t", &ResolvedStatement::raw("select 1"), &ms(&[1]), Utc::now())
            .unwrap();
        c.record("x", "t", &ResolvedStatement::raw("select 2"), &ms(&[1]), Utc::now())
            .unwrap();
        c.record("y", "t", &ResolvedStatement::raw("select 1"), &ms(&[1]), Utc::now())
            .unwrap();

        assert_eq!(c.invalidate("x", "t").unwrap(), 2);
        assert!(c.history("x", "t").unwrap().is_empty());
        assert_eq!(c.history("y", "t").unwrap().len(), 1);
    }
}
