use super::summary::SummaryRow;
use crate::verify::diff::{DiffEntry, DiffKind};
use crate::verify::VerificationReport;
use serde_json::Value;

pub const CHART_TITLE: &str = "Time taken in ms";
const BAR: char = '█';

pub fn display_label(name: &str) -> String {
    name.replace('_', " ")
}

/// Horizontal bar chart of mean durations. `width` is the length of the
/// longest bar.
pub fn render_bar_chart(rows: &[SummaryRow], width: usize) -> String {
    let mut out = String::from(CHART_TITLE);
    if rows.is_empty() {
        out.push_str("\n  (no results)");
        return out;
    }

    let labels: Vec<String> = rows.iter().map(|r| display_label(&r.label)).collect();
    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max = rows.iter().map(|r| r.mean_ms).fold(0.0_f64, f64::max);

    for (row, label) in rows.iter().zip(&labels) {
        let len = if max > 0.0 {
            ((row.mean_ms / max) * width as f64).round() as usize
        } else {
            0
        };
        let bar: String = std::iter::repeat(BAR).take(len.max(1)).collect();
        out.push_str(&format!(
            "\n  {:<lw$}  {} {}",
            label,
            bar,
            row.mean_ms.round(),
            lw = label_width
        ));
    }
    out
}

pub fn render_verification(report: &VerificationReport) -> String {
    if report.ok {
        return "All results were equal".to_string();
    }
    let mut out = String::new();
    for d in &report.divergences {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!(
            "Results of '{}' differ from '{}' ({} difference{}):",
            d.candidate,
            d.baseline,
            d.diff.len(),
            if d.diff.len() == 1 { "" } else { "s" }
        ));
        for entry in &d.diff {
            out.push('\n');
            out.push_str(&render_entry(entry));
        }
    }
    out
}

fn render_entry(e: &DiffEntry) -> String {
    let path = if e.path.is_empty() { "/" } else { &e.path };
    match e.kind {
        DiffKind::Added => format!("  + {}: {}", path, pretty(e.right.as_ref())),
        DiffKind::Removed => format!("  - {}: {}", path, pretty(e.left.as_ref())),
        DiffKind::Changed => format!(
            "  ~ {}: {} -> {}",
            path,
            pretty(e.left.as_ref()),
            pretty(e.right.as_ref())
        ),
    }
}

fn pretty(v: Option<&Value>) -> String {
    let Some(v) = v else {
        return "null".to_string();
    };
    match v {
        Value::Object(_) | Value::Array(_) => serde_json::to_string_pretty(v)
            .unwrap_or_else(|_| v.to_string())
            .replace('\n', "\n      "),
        _ => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Divergence;
    use serde_json::json;

    fn row(label: &str, mean_ms: f64) -> SummaryRow {
        SummaryRow {
            label: label.into(),
            mean_ms,
            samples: 3,
            cached: false,
        }
    }

    #[test]
    fn test_bar_chart_scales_and_relabels() {
        let chart = render_bar_chart(&[row("full_scan", 20.4), row("seek", 5.0)], 20);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "Time taken in ms");
        assert!(lines[1].starts_with("  full scan  "));
        assert_eq!(lines[1].matches('█').count(), 20);
        assert!(lines[1].ends_with(" 20"));
        assert_eq!(lines[2].matches('█').count(), 5);
        assert!(lines[2].ends_with(" 5"));
    }

    #[test]
    fn test_verification_output() {
        let ok = VerificationReport {
            ok: true,
            divergences: vec![],
        };
        assert_eq!(render_verification(&ok), "All results were equal");

        let bad = VerificationReport {
            ok: false,
            divergences: vec![Divergence {
                baseline: "a".into(),
                candidate: "b".into(),
                candidate_index: 1,
                diff: crate::verify::diff::diff(&json!([{"n": 1}]), &json!([{"n": 2}, {"n": 3}])),
            }],
        };
        let text = render_verification(&bad);
        assert!(text.starts_with("Results of 'b' differ from 'a' (2 differences):"));
        assert!(text.contains("  ~ /0/n: 1 -> 2"));
        assert!(text.contains("  + /1: {"));
    }
}
