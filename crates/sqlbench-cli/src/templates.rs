pub const CONFIG_TOML: &str = r#"# Connection used by every case that does not set its own connection_string.
#
# SQL Server (ADO.NET style):
# connection_string = "Server=tcp:localhost,1433;Database=master;User Id=sa;Password=...;TrustServerCertificate=true"
#
# SQLite file or in-memory database:
connection_string = "sqlite:sqlbench-demo.db"
"#;

pub const BENCH_CASES_TOML: &str = r#"# Setup SQL shared by every case. Variables it declares are passed to each
# case through sp_executesql, so this only works against SQL Server.
# parameter_sql = """
# DECLARE @since datetime2 = DATEADD(day, -30, SYSUTCDATETIME());
# """

[[cases]]
name = "recursive_cte"
sql = """
WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 10000)
SELECT SUM(i) AS total FROM n
"""

[[cases]]
name = "recursive_cte_filtered"
sql = """
WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 10000)
SELECT SUM(i) AS total FROM n WHERE i > 0
"""

# [[cases]]
# name = "other_server"
# sql = "SELECT COUNT(*) FROM sys.objects"
# parameter_sql = "DECLARE @top int = 10;"
# connection_string = "Server=tcp:replica,1433;Database=master;User Id=sa;Password=..."
"#;
