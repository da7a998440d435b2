use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

/// One difference between two JSON trees. `path` is a JSON pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub path: String,
    pub kind: DiffKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<Value>,
}

/// Structural diff of `right` against `left`. Arrays are compared by
/// position, objects by key.
pub fn diff(left: &Value, right: &Value) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    walk(String::new(), left, right, &mut out);
    out
}

fn walk(path: String, left: &Value, right: &Value, out: &mut Vec<DiffEntry>) {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            for (k, lv) in l {
                let child = format!("{}/{}", path, escape(k));
                match r.get(k) {
                    Some(rv) => walk(child, lv, rv, out),
                    None => out.push(removed(child, lv)),
                }
            }
            for (k, rv) in r {
                if !l.contains_key(k) {
                    out.push(added(format!("{}/{}", path, escape(k)), rv));
                }
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            for (i, lv) in l.iter().enumerate() {
                let child = format!("{}/{}", path, i);
                match r.get(i) {
                    Some(rv) => walk(child, lv, rv, out),
                    None => out.push(removed(child, lv)),
                }
            }
            for (i, rv) in r.iter().enumerate().skip(l.len()) {
                out.push(added(format!("{}/{}", path, i), rv));
            }
        }
        _ if left != right => out.push(DiffEntry {
            path,
            kind: DiffKind::Changed,
            left: Some(left.clone()),
            right: Some(right.clone()),
        }),
        _ => {}
    }
}

fn added(path: String, v: &Value) -> DiffEntry {
    DiffEntry {
        path,
        kind: DiffKind::Added,
        left: None,
        right: Some(v.clone()),
    }
}

fn removed(path: String, v: &Value) -> DiffEntry {
    DiffEntry {
        path,
        kind: DiffKind::Removed,
        left: Some(v.clone()),
        right: None,
    }
}

fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
