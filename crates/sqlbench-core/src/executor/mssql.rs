use super::{with_timeout, ResultTable, SqlExecutor, SqlValue};
use crate::redaction::redact_connection_target;
use crate::sql::ResolvedStatement;
use anyhow::Context;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use std::time::Duration;
use tiberius::{Client, ColumnData, Config, FromSql, Query, QueryItem};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;

/// SQL Server backend. Targets are ADO.NET style connection strings
/// (`Server=tcp:host,1433;Database=db;User Id=..;Password=..`).
pub struct MssqlExecutor;

impl MssqlExecutor {
    async fn run(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        keep_rows: bool,
    ) -> anyhow::Result<(Vec<ResultTable>, u64)> {
        let config = Config::from_ado_string(target).with_context(|| {
            format!(
                "invalid SQL Server connection string: {}",
                redact_connection_target(target)
            )
        })?;
        let addr = config.get_addr();
        let tcp = TcpStream::connect(&addr)
            .await
            .with_context(|| format!("failed to connect to {}", addr))?;
        tcp.set_nodelay(true)?;
        let mut client = Client::connect(config, tcp.compat_write())
            .await
            .context("SQL Server login failed")?;

        let mut query = Query::new(statement.text.as_str());
        for p in &statement.params {
            query.bind(p.value.as_str());
        }

        let mut tables: Vec<ResultTable> = Vec::new();
        let mut total = 0u64;
        let mut stream = query.query(&mut client).await?;
        while let Some(item) = stream.try_next().await? {
            match item {
                QueryItem::Metadata(meta) => tables.push(ResultTable {
                    columns: meta.columns().iter().map(|c| c.name().to_string()).collect(),
                    rows: Vec::new(),
                }),
                QueryItem::Row(row) => {
                    total += 1;
                    if !keep_rows {
                        continue;
                    }
                    let values = row
                        .into_iter()
                        .map(|data| to_value(&data))
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    if let Some(table) = tables.last_mut() {
                        table.rows.push(values);
                    }
                }
            }
        }
        drop(stream);
        client.close().await?;
        Ok((tables, total))
    }
}

fn text<T: ToString>(v: Option<T>) -> SqlValue {
    v.map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string()))
}

fn to_value(data: &ColumnData<'static>) -> anyhow::Result<SqlValue> {
    let v = match data {
        ColumnData::U8(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into())),
        ColumnData::I16(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into())),
        ColumnData::I32(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into())),
        ColumnData::I64(v) => v.map_or(SqlValue::Null, SqlValue::Int),
        ColumnData::F32(v) => v.map_or(SqlValue::Null, |v| SqlValue::Float(v.into())),
        ColumnData::F64(v) => v.map_or(SqlValue::Null, SqlValue::Float),
        ColumnData::Bit(v) => v.map_or(SqlValue::Null, SqlValue::Bool),
        ColumnData::String(v) => text(v.as_deref()),
        ColumnData::Guid(v) => text(v.as_ref()),
        ColumnData::Numeric(v) => text(v.as_ref()),
        ColumnData::Binary(v) => v
            .as_deref()
            .map_or(SqlValue::Null, |b| SqlValue::Text(format!("0x{}", hex::encode_upper(b)))),
        ColumnData::Xml(v) => v
            .as_ref()
            .map_or(SqlValue::Null, |x| SqlValue::Text(x.clone().into_owned().into_string())),
        ColumnData::Date(_) => text(chrono::NaiveDate::from_sql(data)?),
        ColumnData::Time(_) => text(chrono::NaiveTime::from_sql(data)?),
        ColumnData::DateTimeOffset(_) => {
            text(chrono::DateTime::<chrono::FixedOffset>::from_sql(data)?.map(|d| d.to_rfc3339()))
        }
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            text(chrono::NaiveDateTime::from_sql(data)?)
        }
    };
    Ok(v)
}

#[async_trait]
impl SqlExecutor for MssqlExecutor {
    async fn query(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Vec<ResultTable>> {
        let (tables, _) = with_timeout(timeout, self.run(target, statement, true)).await?;
        Ok(tables)
    }

    async fn drain(
        &self,
        target: &str,
        statement: &ResolvedStatement,
        timeout: Option<Duration>,
    ) -> anyhow::Result<u64> {
        let (_, rows) = with_timeout(timeout, self.run(target, statement, false)).await?;
        Ok(rows)
    }

    fn backend_name(&self) -> &'static str {
        "mssql"
    }
}
