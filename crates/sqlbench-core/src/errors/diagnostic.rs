use serde::{Deserialize, Serialize};
use std::fmt;

pub mod codes {
    pub const E_CFG_PARSE: &str = "E_CFG_PARSE";
    pub const E_CFG_INVALID: &str = "E_CFG_INVALID";
    pub const E_CASE_INVALID: &str = "E_CASE_INVALID";
    pub const E_SETUP_SQL_PARSE: &str = "E_SETUP_SQL_PARSE";
    pub const E_SETUP_SQL_UNSUPPORTED: &str = "E_SETUP_SQL_UNSUPPORTED";
    pub const E_EXEC_FAILED: &str = "E_EXEC_FAILED";
    pub const E_EXEC_TIMEOUT: &str = "E_EXEC_TIMEOUT";
}

/// A user-facing problem report, meant to be printed as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: String,
    pub message: String,
    pub source: String,
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fix_steps: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity: "error".to_string(),
            message: message.into(),
            source: "sqlbench".to_string(),
            context: serde_json::json!({}),
            fix_steps: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_fix_step(mut self, step: impl Into<String>) -> Self {
        self.fix_steps.push(step.into());
        self
    }

    /// Adds one key to the context object, keeping entries already present.
    pub fn with_context_entry(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        if !self.context.is_object() {
            self.context = serde_json::json!({});
        }
        if let serde_json::Value::Object(map) = &mut self.context {
            map.entry(key.to_string()).or_insert_with(|| value.into());
        }
        self
    }

    /// Multi-line rendering for stderr. Context string values that span
    /// several lines (SQL text, parser diagnostics) are printed verbatim.
    pub fn format_terminal(&self) -> String {
        let mut out = format!("[{}] {}: {}", self.code, self.source, self.message);
        if let serde_json::Value::Object(map) = &self.context {
            for (k, v) in map {
                match v {
                    serde_json::Value::String(s) if s.contains('\n') => {
                        out.push_str(&format!("\n  {}:\n", k));
                        for line in s.lines() {
                            out.push_str(&format!("    {}\n", line));
                        }
                        out.pop();
                    }
                    serde_json::Value::String(s) => out.push_str(&format!("\n  {}: {}", k, s)),
                    serde_json::Value::Array(items) => {
                        out.push_str(&format!("\n  {}:", k));
                        for item in items {
                            match item.as_str() {
                                Some(s) => out.push_str(&format!("\n    - {}", s)),
                                None => out.push_str(&format!("\n    - {}", item)),
                            }
                        }
                    }
                    other => out.push_str(&format!("\n  {}: {}", k, other)),
                }
            }
        }
        if !self.fix_steps.is_empty() {
            out.push_str("\n  fix:");
            for step in &self.fix_steps {
                out.push_str(&format!("\n    → {}", step));
            }
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_terminal())
    }
}

impl std::error::Error for Diagnostic {}
