//! 终端输出

use pupper_driver::{MetricsSnapshot, PositionSample, RunSummary};
use std::time::Instant;

/// 一行位置输出：`t=+1.234s  [ 512  512 ... ]`
pub fn format_positions(sample: &PositionSample, origin: Instant) -> String {
    let t = sample.timestamp.saturating_duration_since(origin).as_secs_f64();
    let channels: Vec<String> = sample.channels.iter().map(|v| format!("{:4}", v)).collect();
    format!("t=+{:.3}s  [{}]", t, channels.join(" "))
}

/// 窗口摘要：样本数、窗口跨度、最新位置
pub fn format_window(window: &[PositionSample], origin: Instant) -> Option<String> {
    let (first, last) = (window.first()?, window.last()?);
    let span = last.timestamp.saturating_duration_since(first.timestamp);
    Some(format!(
        "{}  ({} samples over {:.0} ms)",
        format_positions(last, origin),
        window.len(),
        span.as_secs_f64() * 1000.0
    ))
}

pub fn format_summary(summary: &RunSummary, metrics: &MetricsSnapshot) -> String {
    format!(
        "{} samples, {} windows in {:.2}s ({:.1} Hz achieved, {} evicted)",
        summary.samples,
        summary.notifications,
        summary.elapsed.as_secs_f64(),
        metrics.sample_rate(summary.elapsed),
        metrics.evictions
    )
}
