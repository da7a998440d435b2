use super::summary::SummaryRow;
use crate::model::BenchmarkResult;
use crate::redaction::redact_connection_target;
use crate::verify::VerificationReport;
use std::path::Path;

/// Writes the outcome of a pass as pretty JSON. Connection targets are
/// redacted.
pub fn write_run_json(
    out: &Path,
    summary: &[SummaryRow],
    results: &[BenchmarkResult],
    verification: Option<&VerificationReport>,
    seed: u64,
) -> anyhow::Result<()> {
    let cases: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.case.name,
                "connection_target": redact_connection_target(&r.case.connection_target),
                "cached": r.cached,
                "mean_ms": r.mean_ms(),
                "samples_ms": r.samples.iter().map(|s| s.millis()).collect::<Vec<_>>(),
            })
        })
        .collect();

    let doc = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "seed": seed,
        "summary": summary,
        "cases": cases,
        "verification": verification,
    });

    std::fs::write(out, serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}
