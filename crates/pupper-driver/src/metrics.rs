//! 采样循环指标
//!
//! 原子计数器，采样线程写、任意线程读，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 采样循环实时指标
///
/// # 使用示例
///
/// ```rust
/// use pupper_driver::SamplerMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = SamplerMetrics::new();
/// metrics.samples_recorded.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().samples_recorded, 1);
/// ```
#[derive(Debug, Default)]
pub struct SamplerMetrics {
    /// 调度器 tick 总数
    pub ticks: AtomicU64,

    /// 未到采样时刻也未到通知时刻的 tick 数
    pub idle_ticks: AtomicU64,

    /// 写入缓冲区的样本数
    pub samples_recorded: AtomicU64,

    /// 可视化通知次数（每次通知所有 sink）
    pub notifications: AtomicU64,

    /// 缓冲区满导致的淘汰次数
    pub evictions: AtomicU64,

    /// 采样失败次数（失败后循环停止，正常情况下最多为 1）
    pub sample_errors: AtomicU64,
}

impl SamplerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
            samples_recorded: self.samples_recorded.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            sample_errors: self.sample_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
        self.idle_ticks.store(0, Ordering::Relaxed);
        self.samples_recorded.store(0, Ordering::Relaxed);
        self.notifications.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.sample_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub samples_recorded: u64,
    pub notifications: u64,
    pub evictions: u64,
    pub sample_errors: u64,
}

impl MetricsSnapshot {
    /// 空闲 tick 占比（百分比）；`ticks` 为 0 时返回 0.0
    pub fn idle_rate(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        (self.idle_ticks as f64 / self.ticks as f64) * 100.0
    }

    /// 给定运行时长内的平均采样频率（Hz）
    pub fn sample_rate(&self, elapsed: std::time::Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.samples_recorded as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_metrics_default() {
        let snapshot = SamplerMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.idle_rate(), 0.0);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = SamplerMetrics::new();
        metrics.ticks.fetch_add(10, Ordering::Relaxed);
        metrics.idle_ticks.fetch_add(4, Ordering::Relaxed);
        assert_eq!(metrics.snapshot().idle_rate(), 40.0);

        metrics.reset();
        assert_eq!(metrics.snapshot().ticks, 0);
    }

    #[test]
    fn test_sample_rate() {
        let snapshot = MetricsSnapshot {
            samples_recorded: 500,
            ..Default::default()
        };
        assert_eq!(snapshot.sample_rate(Duration::from_millis(500)), 1000.0);
        assert_eq!(snapshot.sample_rate(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_metrics_concurrent_reads() {
        let metrics = Arc::new(SamplerMetrics::new());
        let writer = metrics.clone();
        let handle = thread::spawn(move || {
            for _ in 0..1000 {
                writer.samples_recorded.fetch_add(1, Ordering::Relaxed);
            }
        });
        while !handle.is_finished() {
            let _ = metrics.snapshot();
        }
        handle.join().unwrap();
        assert_eq!(metrics.snapshot().samples_recorded, 1000);
    }
}
