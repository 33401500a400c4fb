use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::models::{format_bytes, format_duration, SyncEvent, SyncOutcome, SyncReport};

const BAR_TEMPLATE: &str = "{prefix:.bold} [{bar:30.cyan/blue}] {wide_msg}";

/// Terminal rendering of [`SyncEvent`]s: one bar per transfer.
pub struct ProgressReporter {
    target_visible: bool,
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            target_visible: true,
            bar: None,
        }
    }

    /// Reporter that draws nothing, for non-interactive runs.
    pub fn hidden() -> Self {
        Self {
            target_visible: false,
            bar: None,
        }
    }

    pub fn handle(&mut self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::Started {
                kind,
                name,
                total_bytes,
                ..
            } => {
                let bar = ProgressBar::with_draw_target(
                    Some(total_bytes),
                    if self.target_visible {
                        ProgressDrawTarget::stderr()
                    } else {
                        ProgressDrawTarget::hidden()
                    },
                );
                if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                    bar.set_style(style.progress_chars("=> "));
                }
                bar.set_prefix(format!("{kind} {name}"));
                self.bar = Some(bar);
            }
            SyncEvent::Progress { stats, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_position(stats.downloaded_bytes);
                    bar.set_message(format!(
                        "{} / {} - {} - {:.2}%",
                        format_bytes(stats.downloaded_bytes),
                        format_bytes(stats.total_bytes),
                        format_duration(stats.eta),
                        stats.percent
                    ));
                }
            }
            SyncEvent::Completed { name, bytes, .. } => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_with_message(format!("{name}: {}", format_bytes(bytes)));
                }
            }
            SyncEvent::Failed { .. } => {
                if let Some(bar) = self.bar.take() {
                    bar.abandon();
                }
            }
            SyncEvent::Checking { .. } | SyncEvent::UpToDate { .. } | SyncEvent::Rejected { .. } => {}
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-paragraph summary printed after a download run.
pub fn summarize(report: &SyncReport) -> String {
    let mut lines = vec![format!(
        "{} downloaded, {} up to date, {} unavailable, {} failed",
        report.downloaded(),
        report.up_to_date(),
        report.rejected(),
        report.failures().count()
    )];
    for record in &report.records {
        match &record.result {
            Ok(SyncOutcome::Rejected { status }) => {
                lines.push(format!("  {} {}: HTTP {status}", record.kind, record.name));
            }
            Err(error) => lines.push(format!("  {} {}: {error}", record.kind, record.name)),
            Ok(_) => {}
        }
    }
    lines.join("\n")
}
