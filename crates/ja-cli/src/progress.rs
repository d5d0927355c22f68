//! Terminal progress for the converter.

use std::path::Path;
use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use ja_store::{ChunkProgress, ConvertProgress, TableSummary};

/// One progress bar per table, fed by converter callbacks.
pub struct ConvertSpinner {
    hidden: bool,
    bar: Option<ProgressBar>,
}

impl ConvertSpinner {
    pub fn new(hidden: bool) -> Self {
        Self { hidden, bar: None }
    }

    fn style(total_known: bool) -> ProgressStyle {
        if total_known {
            ProgressStyle::with_template(
                "{spinner:.green} {prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} rows {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
        } else {
            ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {pos} rows {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        }
    }
}

impl ConvertProgress for ConvertSpinner {
    fn on_table_start(&mut self, table: &str, _source: &Path, total_rows: u64) {
        let bar = if self.hidden {
            ProgressBar::with_draw_target(Some(total_rows), ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new(total_rows)
        };
        bar.set_style(Self::style(total_rows > 0));
        bar.set_prefix(table.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    fn on_chunk(&mut self, progress: &ChunkProgress<'_>) {
        if let Some(bar) = &self.bar {
            bar.set_position(progress.rows_written);
            bar.set_message(format!(
                "chunk {} · {}",
                progress.chunk_index + 1,
                HumanBytes(progress.database_bytes)
            ));
        }
    }

    fn on_table_finish(&mut self, summary: &TableSummary) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        if !self.hidden {
            eprintln!(
                "✓ {} ({} rows, {} chunks)",
                summary.table, summary.rows, summary.chunks
            );
        }
    }
}
