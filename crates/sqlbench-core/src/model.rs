use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A loaded, validated benchmark definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkSuite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_sql: Option<String>,
    pub cases: Vec<BenchmarkCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkCase {
    pub name: String,
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_sql: Option<String>,
    pub connection_target: String,
}

impl BenchmarkCase {
    pub fn new(name: impl Into<String>, sql: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            parameter_sql: None,
            connection_target: target.into(),
        }
    }

    pub fn with_parameter_sql(mut self, sql: impl Into<String>) -> Self {
        self.parameter_sql = Some(sql.into());
        self
    }
}

/// One timed execution of a resolved statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSample {
    #[serde(with = "duration_ns", rename = "duration_ns")]
    pub duration: Duration,
}

impl TrialSample {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn millis(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

mod duration_ns {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_nanos(u64::deserialize(d)?))
    }
}

/// A persisted sample set, as read back from the run store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRun {
    pub id: i64,
    pub name: String,
    pub connection_target: String,
    pub samples: Vec<TrialSample>,
    pub run_at: String,
}

/// Per-case aggregate for one pass: cache-hydrated samples plus fresh ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub case: BenchmarkCase,
    pub samples: Vec<TrialSample>,
    pub cached: bool,
}

impl BenchmarkResult {
    pub fn mean_ms(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(TrialSample::millis).sum();
        Some(total / self.samples.len() as f64)
    }
}
