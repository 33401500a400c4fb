use std::time::{Duration, Instant};

use serde::Serialize;

/// Snapshot of a running transfer, recomputed after every written chunk.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferStats {
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub remaining_bytes: u64,
    pub percent: f64,
    pub elapsed: Duration,
    /// Bytes per second.
    pub throughput: f64,
    pub eta: Duration,
}

impl TransferStats {
    pub fn compute(downloaded_bytes: u64, total_bytes: u64, elapsed: Duration) -> Self {
        let percent = if total_bytes > 0 {
            downloaded_bytes as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };
        let seconds = elapsed.as_secs_f64();
        let throughput = if seconds > 0.0 {
            downloaded_bytes as f64 / seconds
        } else {
            0.0
        };
        let remaining_bytes = total_bytes.saturating_sub(downloaded_bytes);
        let eta = if throughput > 0.0 {
            Duration::from_secs_f64(remaining_bytes as f64 / throughput)
        } else {
            Duration::ZERO
        };

        Self {
            downloaded_bytes,
            total_bytes,
            remaining_bytes,
            percent,
            elapsed,
            throughput,
            eta,
        }
    }
}

#[derive(Debug)]
pub struct ProgressTracker {
    started: Instant,
    total_bytes: u64,
    downloaded_bytes: u64,
}

impl ProgressTracker {
    pub fn start(total_bytes: u64) -> Self {
        Self {
            started: Instant::now(),
            total_bytes,
            downloaded_bytes: 0,
        }
    }

    pub fn record(&mut self, chunk_len: usize) -> TransferStats {
        self.downloaded_bytes += chunk_len as u64;
        TransferStats::compute(self.downloaded_bytes, self.total_bytes, self.started.elapsed())
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes
    }
}

const BYTE_UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];

/// Human readable size using decimal (1000) steps, e.g. `1.5 MB`.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in BYTE_UNITS {
        if value < 1000.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1000.0;
    }
    format!("{value:.1} PB")
}

/// `HH:MM:SS`, hours are not wrapped.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, rest) = (total / 3600, total % 3600);
    format!("{:02}:{:02}:{:02}", hours, rest / 60, rest % 60)
}
