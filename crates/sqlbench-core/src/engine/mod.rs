pub mod bench;
pub mod progress;
pub mod scheduler;

use crate::model::{BenchmarkCase, BenchmarkSuite};
use crate::sql::{CommandBuilder, ResolvedStatement};
use crate::errors::prepare_failed;

/// A case paired with the statement that will actually be submitted for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCase {
    pub case: BenchmarkCase,
    pub statement: ResolvedStatement,
}

/// Resolves every case of the suite once, in declared order.
pub fn plan(
    suite: &BenchmarkSuite,
    builder: &mut CommandBuilder,
) -> anyhow::Result<Vec<PlannedCase>> {
    suite
        .cases
        .iter()
        .map(|case| {
            let statement = builder
                .build(
                    suite.parameter_sql.as_deref(),
                    case.parameter_sql.as_deref(),
                    &case.sql,
                )
                .map_err(|e| prepare_failed(&case.name, e))?;
            Ok(PlannedCase {
                case: case.clone(),
                statement,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_keeps_order_and_shares_suite_setup() {
        let suite = BenchmarkSuite {
            parameter_sql: Some("DECLARE @n int = 1;".into()),
            cases: vec![
                BenchmarkCase::new("b", "select @n", "t"),
                BenchmarkCase::new("a", "select @n + 0", "t"),
            ],
        };
        let mut builder = CommandBuilder::default();
        let planned = plan(&suite, &mut builder).unwrap();
        assert_eq!(planned[0].case.name, "b");
        assert_eq!(planned[1].statement.params[0].value, "select @n + 0");
        assert_eq!(builder.extractor().memo_len(), 1);
    }

    #[test]
    fn test_plan_errors_name_the_case() {
        let suite = BenchmarkSuite {
            parameter_sql: None,
            cases: vec![
                BenchmarkCase::new("ok", "select 1", "t"),
                BenchmarkCase::new("bad", "select 1", "t").with_parameter_sql("DECLARE @x"),
            ],
        };
        let err = plan(&suite, &mut CommandBuilder::default()).unwrap_err();
        let d = crate::errors::try_map_error(&err).unwrap();
        assert_eq!(d.code, crate::errors::diagnostic::codes::E_SETUP_SQL_PARSE);
        assert_eq!(d.context["case"], "bad");
        assert!(d.format_terminal().contains("case: bad"));
    }
}
