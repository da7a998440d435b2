use crate::executor::{ResultTable, SqlValue};
use anyhow::Context;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Column name SQL Server gives to `FOR JSON` output. A result made of this
/// single column is taken as a ready-made JSON document.
pub const JSON_SENTINEL: &str = "JSON_F52E2B61-18A1-11d1-B105-00805F49916B";

/// Canonical comparable form of everything a statement returned.
pub fn normalize(tables: &[ResultTable]) -> anyhow::Result<Value> {
    if let [table] = tables {
        if table.columns.len() == 1 && table.columns[0] == JSON_SENTINEL {
            return parse_json_column(table);
        }
    }

    match tables {
        [] => Ok(Value::Array(Vec::new())),
        [table] => Ok(normalize_table(table)),
        many => Ok(Value::Array(many.iter().map(normalize_table).collect())),
    }
}

fn parse_json_column(table: &ResultTable) -> anyhow::Result<Value> {
    let mut doc = String::new();
    for (i, row) in table.rows.iter().enumerate() {
        match row.first().and_then(SqlValue::as_text) {
            Some(s) => doc.push_str(s),
            None => anyhow::bail!(
                "row {} of the {} column is not text: {:?}",
                i + 1,
                JSON_SENTINEL,
                row.first()
            ),
        }
    }
    if doc.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&doc).context("FOR JSON output is not valid JSON")
}

fn normalize_table(table: &ResultTable) -> Value {
    let names = unique_column_names(&table.columns);
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let obj: Map<String, Value> = names
                .iter()
                .cloned()
                .zip(row.iter().map(to_json))
                .collect();
            Value::Object(obj)
        })
        .collect();
    Value::Array(rows)
}

/// Renames repeated column names `col`, `col2`, `col3`, ... The first
/// occurrence keeps its name and a suffix never reuses a name that appears
/// anywhere in the column list.
pub fn unique_column_names(columns: &[String]) -> Vec<String> {
    let originals: HashSet<&str> = columns.iter().map(String::as_str).collect();
    let mut used: HashSet<String> = HashSet::with_capacity(columns.len());
    let mut out = Vec::with_capacity(columns.len());

    for name in columns {
        if used.insert(name.clone()) {
            out.push(name.clone());
            continue;
        }
        let mut n = 2u32;
        let renamed = loop {
            let candidate = format!("{}{}", name, n);
            if !originals.contains(candidate.as_str()) && !used.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        used.insert(renamed.clone());
        out.push(renamed);
    }
    out
}

pub fn to_json(v: &SqlValue) -> Value {
    match v {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Bool(*b),
        SqlValue::Int(i) => Value::from(*i),
        SqlValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        SqlValue::Text(s) => Value::String(s.clone()),
        SqlValue::Bytes(b) => Value::String(format!("0x{}", hex::encode_upper(b))),
    }
}
