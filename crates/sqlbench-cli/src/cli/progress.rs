use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use sqlbench_core::engine::progress::ProgressSink;
use sqlbench_core::model::BenchmarkCase;
use sqlbench_core::report::console::display_label;
use std::collections::HashMap;
use std::sync::Mutex;

/// One bar per case on stderr. Hidden automatically when stderr is not a
/// terminal.
#[derive(Default)]
pub struct BarProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
    verify: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<24} [{bar:40.cyan/blue}] {pos}/{len} {percent:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl ProgressSink for BarProgress {
    fn case_started(&self, index: usize, case: &BenchmarkCase, total: usize) {
        let bar = self.multi.add(ProgressBar::new(total as u64));
        bar.set_style(Self::style());
        bar.set_message(display_label(&case.name));
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(index, bar);
        }
    }

    fn trial_completed(&self, index: usize, completed: usize, _total: usize) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(bar) = bars.get(&index) {
                bar.set_position(completed as u64);
            }
        }
    }

    fn verifying(&self, index: usize, total: usize, name: &str) {
        let Ok(mut slot) = self.verify.lock() else {
            return;
        };
        let bar = slot.get_or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(total as u64));
            bar.set_style(Self::style());
            bar
        });
        bar.set_message(format!("verifying {}", display_label(name)));
        bar.set_position(index as u64 + 1);
        if index + 1 == total {
            bar.finish_with_message("verified");
        }
    }

    fn finished(&self) {
        if let Ok(bars) = self.bars.lock() {
            for bar in bars.values() {
                bar.finish();
            }
        }
    }
}
