use crate::errors::diagnostic::{codes, Diagnostic};
use crate::model::{BenchmarkCase, BenchmarkSuite};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("invalid {}:\n  {}", .path.display(), .problems.join("\n  "))]
    Invalid {
        path: PathBuf,
        code: &'static str,
        problems: Vec<String>,
    },
}

impl ConfigError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ConfigError::Read { path, source } => {
                Diagnostic::new(codes::E_CFG_INVALID, format!("cannot read {}", path.display()))
                    .with_source("config")
                    .with_context(serde_json::json!({
                        "file": path.display().to_string(),
                        "reason": source.to_string(),
                    }))
                    .with_fix_step("Run `sqlbench init` to create Config.toml and BenchCases.toml")
            }
            ConfigError::Parse { path, message } => {
                Diagnostic::new(codes::E_CFG_PARSE, format!("{} is not valid TOML", path.display()))
                    .with_source("config")
                    .with_context(serde_json::json!({
                        "file": path.display().to_string(),
                        "reason": message,
                    }))
            }
            ConfigError::Invalid {
                path,
                code,
                problems,
            } => Diagnostic::new(
                code,
                format!("{} has {} problem(s)", path.display(), problems.len()),
            )
            .with_source("config")
            .with_context(serde_json::json!({
                "file": path.display().to_string(),
                "errors": problems,
            })),
        }
    }
}

/// Tool settings from `Config.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub connection_string: String,
}

#[derive(Deserialize)]
struct RawSettings {
    #[serde(default, alias = "ConnectionString", alias = "connectionString")]
    connection_string: Option<String>,
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn warn_ignored(path: &Path, ignored: &[String]) {
    if !ignored.is_empty() {
        tracing::warn!(
            event = "sqlbench.config.unknown_keys",
            file = %path.display(),
            keys = ?ignored,
            "ignoring unknown keys"
        );
    }
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = read(path)?;
    let mut ignored = Vec::new();
    let parsed: RawSettings =
        serde_ignored::deserialize(toml::Deserializer::new(&raw), |p| ignored.push(p.to_string()))
            .map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
    warn_ignored(path, &ignored);

    match parsed.connection_string {
        Some(s) if !s.trim().is_empty() => Ok(Settings {
            connection_string: s.trim().to_string(),
        }),
        _ => Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            code: codes::E_CFG_INVALID,
            problems: vec!["connection_string is missing or blank".to_string()],
        }),
    }
}

#[derive(Deserialize)]
struct RawSuite {
    #[serde(default, alias = "parameterSql", alias = "ParameterSql")]
    parameter_sql: Option<String>,
    #[serde(default)]
    cases: Vec<RawCase>,
}

#[derive(Deserialize)]
struct RawCase {
    #[serde(default, alias = "Name")]
    name: Option<String>,
    #[serde(default, alias = "Sql")]
    sql: Option<String>,
    #[serde(default, alias = "parameterSql", alias = "ParameterSql")]
    parameter_sql: Option<String>,
    #[serde(
        default,
        alias = "connectionString",
        alias = "ConnectionString",
        alias = "connectionTarget",
        alias = "connection_target"
    )]
    connection_string: Option<String>,
}

const SUITE_KEYS: &[&str] = &["cases", "parameter_sql", "parameterSql", "ParameterSql"];

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// Loads a benchmark definition file. Accepts the `[[cases]]` layout and the
/// older layout where each top-level table is a case named by its key.
/// Cases without their own connection string use `default_target`.
pub fn load_suite(path: &Path, default_target: &str) -> Result<BenchmarkSuite, ConfigError> {
    let raw = read(path)?;
    let table: toml::Table = raw.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let structured = SUITE_KEYS.iter().any(|k| table.contains_key(*k));
    let mut problems = Vec::new();
    let suite = if structured {
        structured_suite(path, table, default_target, &mut problems)?
    } else {
        legacy_suite(table, default_target, &mut problems)
    };

    if problems.is_empty() && suite.cases.is_empty() {
        problems.push("no benchmark cases defined".to_string());
    }
    if !problems.is_empty() {
        return Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            code: codes::E_CASE_INVALID,
            problems,
        });
    }
    Ok(suite)
}

fn structured_suite(
    path: &Path,
    table: toml::Table,
    default_target: &str,
    problems: &mut Vec<String>,
) -> Result<BenchmarkSuite, ConfigError> {
    let mut ignored = Vec::new();
    let parsed: RawSuite = serde_ignored::deserialize(toml::Value::Table(table), |p| {
        ignored.push(p.to_string())
    })
    .map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    warn_ignored(path, &ignored);

    let mut cases = Vec::with_capacity(parsed.cases.len());
    for (i, rc) in parsed.cases.into_iter().enumerate() {
        let name = non_blank(rc.name);
        let label = match &name {
            Some(n) => format!("cases[{}] '{}'", i, n),
            None => format!("cases[{}]", i),
        };
        if name.is_none() {
            problems.push(format!("{}: name is required", label));
        }
        let sql = non_blank(rc.sql);
        if sql.is_none() {
            problems.push(format!("{}: sql is required", label));
        }
        if let (Some(name), Some(sql)) = (name, sql) {
            let target =
                non_blank(rc.connection_string).unwrap_or_else(|| default_target.to_string());
            cases.push(BenchmarkCase {
                name,
                sql,
                parameter_sql: non_blank(rc.parameter_sql),
                connection_target: target,
            });
        }
    }

    Ok(BenchmarkSuite {
        parameter_sql: non_blank(parsed.parameter_sql),
        cases,
    })
}

fn legacy_suite(
    table: toml::Table,
    default_target: &str,
    problems: &mut Vec<String>,
) -> BenchmarkSuite {
    let mut cases = Vec::new();
    for (name, value) in table {
        let toml::Value::Table(entry) = value else {
            problems.push(format!("'{}': expected each top-level key to be a table", name));
            continue;
        };
        match entry.get("sql").and_then(|v| v.as_str()) {
            Some(sql) if !sql.trim().is_empty() => cases.push(BenchmarkCase::new(
                name,
                sql,
                default_target,
            )),
            _ => problems.push(format!("'{}': expected a non-empty \"sql\" key", name)),
        }
    }
    BenchmarkSuite {
        parameter_sql: None,
        cases,
    }
}
