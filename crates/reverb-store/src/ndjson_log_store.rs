use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reverb_domain::{validate_reply_log, ReplyLog, ReplyStatus};
use reverb_engine::ReplyLogStore;
use serde::Serialize;

#[derive(Debug, Clone)]
/// Append-only reply log: one JSON line per decision outcome. Records are
/// immutable once written; the file is the audit trail operators query.
pub struct NdjsonReplyLogStore {
    path: PathBuf,
}

impl NdjsonReplyLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Scans the log and aggregates outcome counts and latency for one
    /// account. A missing file yields zeroed stats; unreadable lines are
    /// counted, not fatal.
    pub fn stats(&self, account_id: &str) -> Result<ReplyLogStats> {
        let mut stats = ReplyLogStats {
            account_id: account_id.to_string(),
            ..ReplyLogStats::default()
        };
        if !self.path.exists() {
            return Ok(stats);
        }

        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read reply log {}", self.path.display()))?;
        let mut latency_total: u64 = 0;
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let log = match serde_json::from_str::<ReplyLog>(line) {
                Ok(log) => log,
                Err(_) => {
                    stats.malformed_lines = stats.malformed_lines.saturating_add(1);
                    continue;
                }
            };
            if log.account_id != account_id {
                continue;
            }
            stats.total_logs = stats.total_logs.saturating_add(1);
            latency_total = latency_total.saturating_add(log.latency_ms);
            match log.status {
                ReplyStatus::Success => {
                    stats.success_count = stats.success_count.saturating_add(1);
                }
                ReplyStatus::Failed => {
                    stats.failed_count = stats.failed_count.saturating_add(1);
                }
                ReplyStatus::RateLimited => {
                    stats.rate_limited_count = stats.rate_limited_count.saturating_add(1);
                }
                ReplyStatus::TimeWindowBlocked => {
                    stats.time_window_blocked_count =
                        stats.time_window_blocked_count.saturating_add(1);
                }
            }
        }
        if stats.total_logs > 0 {
            stats.average_latency_ms = latency_total / stats.total_logs as u64;
        }
        Ok(stats)
    }
}

#[async_trait]
impl ReplyLogStore for NdjsonReplyLogStore {
    async fn save(&self, log: ReplyLog) -> Result<()> {
        validate_reply_log(&log)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let encoded = serde_json::to_string(&log).context("failed to encode reply log")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(encoded.as_bytes())
            .with_context(|| format!("failed to append {}", self.path.display()))?;
        file.write_all(b"\n")
            .with_context(|| format!("failed to append newline {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
/// Aggregated reply log statistics for one account.
pub struct ReplyLogStats {
    pub account_id: String,
    pub total_logs: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub rate_limited_count: usize,
    pub time_window_blocked_count: usize,
    pub malformed_lines: usize,
    pub average_latency_ms: u64,
}

pub fn render_reply_log_stats_report(stats: &ReplyLogStats) -> String {
    format!(
        "reply log stats: account_id={} total_logs={} success_count={} failed_count={} rate_limited_count={} time_window_blocked_count={} malformed_lines={} average_latency_ms={}",
        stats.account_id,
        stats.total_logs,
        stats.success_count,
        stats.failed_count,
        stats.rate_limited_count,
        stats.time_window_blocked_count,
        stats.malformed_lines,
        stats.average_latency_ms,
    )
}
