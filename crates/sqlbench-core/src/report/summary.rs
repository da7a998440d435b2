use crate::model::BenchmarkResult;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Declared,
    MeanAscending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub mean_ms: f64,
    pub samples: usize,
    pub cached: bool,
}

/// Mean duration per case, in milliseconds. Cases without samples are left
/// out. Sorting is stable, so equal means keep declared order.
pub fn summarize(results: &[BenchmarkResult], order: SortOrder) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = results
        .iter()
        .filter_map(|r| {
            Some(SummaryRow {
                label: r.case.name.clone(),
                mean_ms: r.mean_ms()?,
                samples: r.samples.len(),
                cached: r.cached,
            })
        })
        .collect();

    if order == SortOrder::MeanAscending {
        rows.sort_by(|a, b| a.mean_ms.total_cmp(&b.mean_ms));
    }
    rows
}
