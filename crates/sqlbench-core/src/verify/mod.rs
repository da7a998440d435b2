pub mod diff;
pub mod normalize;

use crate::engine::progress::ProgressSink;
use crate::engine::PlannedCase;
use crate::errors::exec_failed;
use crate::executor::SqlExecutor;
use diff::DiffEntry;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    pub baseline: String,
    pub candidate: String,
    pub candidate_index: usize,
    pub diff: Vec<DiffEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub ok: bool,
    pub divergences: Vec<Divergence>,
}

/// Checks that every case returns the same normalized result as the first
/// one. Each case is compared against case 0 only, and every case is
/// checked even after a divergence.
pub struct EqualityVerifier<'a> {
    executor: &'a dyn SqlExecutor,
    timeout: Option<Duration>,
}

impl<'a> EqualityVerifier<'a> {
    pub fn new(executor: &'a dyn SqlExecutor, timeout: Option<Duration>) -> Self {
        Self { executor, timeout }
    }

    pub async fn verify(
        &self,
        plan: &[PlannedCase],
        progress: &dyn ProgressSink,
    ) -> anyhow::Result<VerificationReport> {
        let mut divergences = Vec::new();
        let Some((baseline, rest)) = plan.split_first() else {
            return Ok(VerificationReport {
                ok: true,
                divergences,
            });
        };

        let total = plan.len();
        progress.verifying(0, total, &baseline.case.name);
        let expected = self.normalized(baseline).await?;

        for (offset, candidate) in rest.iter().enumerate() {
            let index = offset + 1;
            progress.verifying(index, total, &candidate.case.name);
            let actual = self.normalized(candidate).await?;
            let entries = diff::diff(&expected, &actual);
            if entries.is_empty() {
                continue;
            }
            tracing::warn!(
                event = "sqlbench.verify.divergence",
                baseline = %baseline.case.name,
                candidate = %candidate.case.name,
                differences = entries.len(),
            );
            divergences.push(Divergence {
                baseline: baseline.case.name.clone(),
                candidate: candidate.case.name.clone(),
                candidate_index: index,
                diff: entries,
            });
        }

        Ok(VerificationReport {
            ok: divergences.is_empty(),
            divergences,
        })
    }

    async fn normalized(&self, planned: &PlannedCase) -> anyhow::Result<serde_json::Value> {
        let case = &planned.case;
        let tables = self
            .executor
            .query(&case.connection_target, &planned.statement, self.timeout)
            .await
            .map_err(|e| {
                exec_failed(&case.name, &case.connection_target, &planned.statement.text, &e)
            })?;
        normalize::normalize(&tables).map_err(|e| {
            exec_failed(&case.name, &case.connection_target, &planned.statement.text, &e).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::NoopProgress;
    use crate::executor::fake::FakeExecutor;
    use crate::executor::{ResultTable, SqlValue};
    use crate::model::BenchmarkCase;
    use crate::sql::ResolvedStatement;

    fn planned(name: &str, sql: &str) -> PlannedCase {
        PlannedCase {
            case: BenchmarkCase::new(name, sql, "fake"),
            statement: ResolvedStatement::raw(sql),
        }
    }

    fn one_row(v: i64) -> Vec<ResultTable> {
        vec![ResultTable::new(&["n"]).with_row(vec![SqlValue::Int(v)])]
    }

    #[tokio::test]
    async fn test_empty_and_single_case_are_ok() {
        let exec = FakeExecutor::new();
        let v = EqualityVerifier::new(&exec, None);
        assert!(v.verify(&[], &NoopProgress).await.unwrap().ok);
        assert!(v.verify(&[planned("a", "q1")], &NoopProgress).await.unwrap().ok);
    }

    #[tokio::test]
    async fn test_every_candidate_is_compared_to_the_first() {
        let exec = FakeExecutor::new()
            .with_response("q0", one_row(1))
            .with_response("q1", one_row(2))
            .with_response("q2", one_row(2));
        let report = EqualityVerifier::new(&exec, None)
            .verify(
                &[planned("a", "q0"), planned("b", "q1"), planned("c", "q2")],
                &NoopProgress,
            )
            .await
            .unwrap();

        assert!(!report.ok);
        assert_eq!(report.divergences.len(), 2);
        assert_eq!(report.divergences[1].candidate, "c");
        assert_eq!(report.divergences[1].candidate_index, 2);
        assert_eq!(exec.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_execution_errors_carry_case_context() {
        let exec = FakeExecutor::new().with_failure("boom", "Invalid object name 'nope'");
        let err = EqualityVerifier::new(&exec, None)
            .verify(&[planned("a", "q0"), planned("broken", "boom")], &NoopProgress)
            .await
            .unwrap_err();
        let d = crate::errors::try_map_error(&err).unwrap();
        assert!(d.message.contains("broken"));
        assert_eq!(d.context["sql"], "boom");
    }
}
