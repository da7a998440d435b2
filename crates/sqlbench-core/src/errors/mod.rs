pub mod diagnostic;

use crate::config::ConfigError;
use crate::executor::QueryTimeout;
use crate::sql::params::ParseError;
use diagnostic::{codes, Diagnostic};

/// Finds a user-facing diagnostic anywhere in an error chain.
///
/// Typed user errors (setup SQL parse failures, config problems) are
/// converted on the fly; anything else yields `None` and should be reported
/// as an unexpected failure.
pub fn try_map_error(err: &anyhow::Error) -> Option<Diagnostic> {
    for cause in err.chain() {
        if let Some(d) = cause.downcast_ref::<Diagnostic>() {
            return Some(d.clone());
        }
        if let Some(p) = cause.downcast_ref::<ParseError>() {
            return Some(p.to_diagnostic());
        }
        if let Some(c) = cause.downcast_ref::<ConfigError>() {
            return Some(c.to_diagnostic());
        }
    }
    None
}

/// Attaches the offending case to a setup SQL problem. Errors that carry no
/// diagnostic keep their chain and gain a context line instead.
pub(crate) fn prepare_failed(case: &str, err: anyhow::Error) -> anyhow::Error {
    match try_map_error(&err) {
        Some(d) => d.with_context_entry("case", case).into(),
        None => err.context(format!("failed to prepare case '{}'", case)),
    }
}

pub(crate) fn exec_failed(case: &str, target: &str, sql: &str, err: &anyhow::Error) -> Diagnostic {
    let target = crate::redaction::redact_connection_target(target);
    if let Some(d) = try_map_error(err) {
        return d
            .with_context_entry("case", case)
            .with_context_entry("connection_target", &*target)
            .with_context_entry("sql", sql);
    }

    let code = if err.chain().any(|c| c.downcast_ref::<QueryTimeout>().is_some()) {
        codes::E_EXEC_TIMEOUT
    } else {
        codes::E_EXEC_FAILED
    };
    Diagnostic::new(code, format!("case '{}' failed: {:#}", case, err))
        .with_source("executor")
        .with_context(serde_json::json!({
            "case": case,
            "connection_target": target,
            "sql": sql,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_try_map_error_finds_diagnostic_behind_context() {
        let base: anyhow::Result<()> =
            Err(Diagnostic::new(codes::E_CFG_INVALID, "connection_string cannot be blank").into());
        let err = base.context("loading Config.toml").unwrap_err();
        let d = try_map_error(&err).unwrap();
        assert_eq!(d.code, codes::E_CFG_INVALID);
    }

    #[test]
    fn test_try_map_error_none_for_plain_errors() {
        let err = anyhow::anyhow!("disk on fire");
        assert!(try_map_error(&err).is_none());
    }

    #[test]
    fn test_exec_failed_detects_timeout_and_redacts() {
        let err: anyhow::Error = QueryTimeout {
            limit: std::time::Duration::from_secs(1),
        }
        .into();
        let d = exec_failed("slow", "Server=db;Password=hunter2", "select 1", &err);
        assert_eq!(d.code, codes::E_EXEC_TIMEOUT);
        assert!(!d.format_terminal().contains("hunter2"));
    }

    #[test]
    fn test_server_message_mentioning_timeouts_is_not_a_timeout() {
        let err = anyhow::anyhow!("Lock request timed out waiting for resource");
        let d = exec_failed("q", "Server=db", "select 1", &err);
        assert_eq!(d.code, codes::E_EXEC_FAILED);
    }

    #[test]
    fn test_exec_failed_keeps_inner_diagnostic_code() {
        let inner: anyhow::Error = Diagnostic::new(codes::E_SETUP_SQL_UNSUPPORTED, "no forwarding")
            .with_context(serde_json::json!({ "sql": "EXEC sp_executesql @P1" }))
            .into();
        let err = inner.context("while draining");
        let d = exec_failed("c", "sqlite::memory:", "EXEC sp_executesql @P1", &err);
        assert_eq!(d.code, codes::E_SETUP_SQL_UNSUPPORTED);
        assert_eq!(d.message, "no forwarding");
        assert_eq!(d.context["case"], "c");
        assert_eq!(d.context["connection_target"], "sqlite::memory:");
        assert_eq!(d.format_terminal().matches("sp_executesql").count(), 1);
    }

    #[test]
    fn test_prepare_failed_names_the_case() {
        let err: anyhow::Error = Diagnostic::new(codes::E_SETUP_SQL_PARSE, "bad setup").into();
        let d = try_map_error(&prepare_failed("my_case", err)).unwrap();
        assert_eq!(d.code, codes::E_SETUP_SQL_PARSE);
        assert_eq!(d.context["case"], "my_case");

        let plain = prepare_failed("my_case", anyhow::anyhow!("boom"));
        assert!(format!("{:#}", plain).contains("failed to prepare case 'my_case'"));
    }
}
