//! 📊 progress.rs — "Are we there yet?" — every batch, every time, forever.
//!
//! 🚀 Two jobs: a live `indicatif` bar while a batch runs (keys done / keys listed), and a
//! `BatchReport` per batch afterwards, rendered into a `comfy-table` so comfy it has lumbar support.
//!
//! ⚠️ Watching this progress bar will not make the S3 round-trips go faster.
//! Neither will refreshing it. We've tried. Science says no.

use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use indicatif::{ProgressBar, ProgressStyle};

use crate::transforms::RejectReason;

/// 🔢 "1000000" → "1,000,000" — you're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS if you should probably call your mom. It's been a while.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 🧾 What one batch did. One per split per job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// 🏷️ `preprocess`, `augment` or `relocate`
    pub job: &'static str,
    /// 📥 listing prefix (or manifest path, for relocation)
    pub source: String,
    /// 📤 destination prefix (or directory)
    pub destination: String,
    pub listed: u64,
    pub written: u64,
    pub rejected_mostly_empty: u64,
    pub rejected_too_narrow: u64,
    /// 🙈 undecodable images passed over under the `skip` decode policy
    pub skipped_undecodable: u64,
    /// 👻 manifest entries that weren't on disk (relocation only)
    pub missing: u64,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn new(job: &'static str, destination: &str) -> Self {
        Self {
            job,
            destination: destination.to_string(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn rejected(&self) -> u64 {
        self.rejected_mostly_empty + self.rejected_too_narrow
    }

    pub(crate) fn record_rejection(&mut self, reason: &RejectReason) {
        match reason {
            RejectReason::MostlyEmpty { .. } => self.rejected_mostly_empty += 1,
            RejectReason::TooNarrow { .. } => self.rejected_too_narrow += 1,
        }
    }
}

/// 🍽️ All the reports of a run, one row each.
pub fn render_reports(reports: &[BatchReport]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "job",
        "source",
        "destination",
        "listed",
        "written",
        "rejected (empty)",
        "rejected (narrow)",
        "skipped",
        "missing",
        "elapsed",
    ]);

    for report in reports {
        let right = |n: u64| Cell::new(format_number(n)).set_alignment(CellAlignment::Right);
        table.add_row(vec![
            Cell::new(report.job),
            Cell::new(&report.source),
            Cell::new(&report.destination),
            right(report.listed),
            right(report.written),
            right(report.rejected_mostly_empty),
            right(report.rejected_too_narrow),
            right(report.skipped_undecodable),
            right(report.missing),
            Cell::new(format_duration(report.elapsed)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

/// 📊 The live bar for one batch. Drawn to stderr; hidden when stderr isn't a terminal.
#[derive(Debug)]
pub(crate) struct BatchProgress {
    progress_bar: ProgressBar,
    start_time: Instant,
}

impl BatchProgress {
    pub(crate) fn new(label: &str, total: u64) -> Self {
        let progress_bar = ProgressBar::new(total);
        // -- 🎨 cyan because it's classy, blue because it's calm. Fallback if the template ever rots.
        let style = ProgressStyle::with_template(
            "{prefix} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed_precise}) {wide_msg}",
        )
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style);
        progress_bar.set_prefix(label.to_string());
        Self {
            progress_bar,
            start_time: Instant::now(),
        }
    }

    /// 🔄 One key done. `key` shows up as the message so a stuck bar says where it's stuck.
    pub(crate) fn advance(&self, key: &str) {
        self.progress_bar.set_message(key.to_string());
        self.progress_bar.inc(1);
    }

    /// ✅ Stop drawing and hand back how long the batch took.
    pub(crate) fn finish(self) -> Duration {
        self.progress_bar.finish_and_clear();
        self.start_time.elapsed()
    }
}
