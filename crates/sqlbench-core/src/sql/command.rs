use super::params::{DeclaredParameter, ParameterExtractor};
use crate::errors::diagnostic::{codes, Diagnostic};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundParam {
    pub name: String,
    pub value: String,
}

/// The exact text submitted for one case, plus any string parameters bound
/// alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStatement {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<BoundParam>,
}

impl ResolvedStatement {
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Text identity of the work, used as part of the run cache key. The case
    /// SQL travels as a bound parameter in the wrapped form, so parameter
    /// values are part of it.
    pub fn cache_text(&self) -> String {
        let mut s = self.text.clone();
        for p in &self.params {
            s.push_str(&format!("\n-- {} = {}", p.name, p.value));
        }
        s
    }

    /// Bound parameters as a JSON array, stored next to the text in the run store.
    pub fn params_json(&self) -> String {
        serde_json::to_string(&self.params).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Turns a case into its executable statement.
///
/// Without setup SQL the case SQL is used verbatim. With setup SQL the
/// statement becomes the setup preamble followed by an `sp_executesql` call
/// that receives the case SQL (`@P1`) and a parameter signature (`@P2`) as
/// bound strings and forwards every declared variable by name.
#[derive(Default)]
pub struct CommandBuilder {
    extractor: ParameterExtractor,
}

pub const SQL_PARAM: &str = "@P1";
pub const SIGNATURE_PARAM: &str = "@P2";

impl CommandBuilder {
    pub fn new(extractor: ParameterExtractor) -> Self {
        Self { extractor }
    }

    pub fn build(
        &mut self,
        suite_setup: Option<&str>,
        case_setup: Option<&str>,
        case_sql: &str,
    ) -> anyhow::Result<ResolvedStatement> {
        let fragments: Vec<&str> = [suite_setup, case_setup]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();

        if fragments.is_empty() {
            return Ok(ResolvedStatement::raw(case_sql));
        }

        let mut declared: Vec<DeclaredParameter> = Vec::new();
        for fragment in &fragments {
            declared.extend(self.extractor.extract(fragment)?);
        }
        check_forwardable(&declared)?;

        let signature = declared
            .iter()
            .map(|p| format!("{} {}", p.name, p.data_type))
            .collect::<Vec<_>>()
            .join(", ");

        let mut exec = format!("EXEC sp_executesql {}, {}", SQL_PARAM, SIGNATURE_PARAM);
        for p in &declared {
            exec.push_str(&format!(", {0} = {0}", p.name));
        }
        exec.push(';');

        let mut text = fragments.join("\n");
        text.push('\n');
        text.push_str(&exec);

        Ok(ResolvedStatement {
            text,
            params: vec![
                BoundParam {
                    name: SQL_PARAM.to_string(),
                    value: case_sql.to_string(),
                },
                BoundParam {
                    name: SIGNATURE_PARAM.to_string(),
                    value: signature,
                },
            ],
        })
    }

    pub fn extractor(&self) -> &ParameterExtractor {
        &self.extractor
    }
}

fn check_forwardable(declared: &[DeclaredParameter]) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for p in declared {
        if !seen.insert(p.name.to_ascii_lowercase()) {
            return Err(Diagnostic::new(
                codes::E_SETUP_SQL_PARSE,
                format!("variable {} is declared more than once in setup SQL", p.name),
            )
            .with_source("sql")
            .with_context(serde_json::json!({ "variable": p.name }))
            .with_fix_step(
                "Declare each variable once, either in the suite or in the case parameter_sql",
            )
            .into());
        }
        if p.is_table() {
            return Err(Diagnostic::new(
                codes::E_SETUP_SQL_UNSUPPORTED,
                format!("table variable {} cannot be forwarded to the case SQL", p.name),
            )
            .with_source("sql")
            .with_context(serde_json::json!({ "variable": p.name }))
            .with_fix_step("Use a temp table (#name) instead of a table variable")
            .into());
        }
        if p.is_cursor() {
            return Err(Diagnostic::new(
                codes::E_SETUP_SQL_UNSUPPORTED,
                format!("cursor variable {} cannot be forwarded to the case SQL", p.name),
            )
            .with_source("sql")
            .with_context(serde_json::json!({ "variable": p.name }))
            .with_fix_step("Declare and open the cursor inside the case sql")
            .into());
        }
    }
    Ok(())
}
