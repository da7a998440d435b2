use super::{with_timeout, ResultTable, SqlExecutor};
use crate::sql::ResolvedStatement;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCall {
    pub target: String,
    pub text: String,
    pub drained: bool,
}

/// In-process executor for tests: serves canned result tables keyed by
/// statement text and records every call.
#[derive(Default)]
pub struct FakeExecutor {
    responses: HashMap<String, Vec<ResultTable>>,
    failures: HashMap<String, String>,
    latency: Option<Duration>,
    calls: Mutex<Vec<ExecutedCall>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, text: &str, tables: Vec<ResultTable>) -> Self {
        self.responses.insert(text.to_string(), tables);
        self
    }

    pub fn with_failure(mut self, text: &str, message: &str) -> Self {
        self.failures.insert(text.to_string(), message.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<ExecutedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn drain_count(&self) -> usize {
        self.calls().iter().filter(|c| c.drained).count()
    }

    async fn respond(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        drained: bool,
    ) -> anyhow::Result<Vec<ResultTable>> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ExecutedCall {
                target: target.to_string(),
                text: statement.text.clone(),
                drained,
            });
        if let Some(d) = self.latency {
            tokio::time::sleep(d).await;
        }
        if let Some(msg) = self.failures.get(&statement.text) {
            anyhow::bail!("{}", msg);
        }
        Ok(self
            .responses
            .get(&statement.text)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SqlExecutor for FakeExecutor {
    async fn query(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Vec<ResultTable>> {
        with_timeout(timeout, self.respond(target, statement, false)).await
    }

    async fn drain(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<u64> {
        let tables = with_timeout(timeout, self.respond(target, statement, true)).await?;
        Ok(tables.iter().map(|t| t.rows.len() as u64).sum())
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}
