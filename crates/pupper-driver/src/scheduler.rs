//! 定频采样调度器
//!
//! 单线程协作循环：每个 tick 检查“是否到采样时刻”和“是否到通知时刻”，
//! 每个 tick 至多执行一次同步交换，从不并发请求。
//!
//! # 节奏
//!
//! - 采样：`now - last_sample >= 1 / read_freq` 时采一次。最小间隔轮询，
//!   不是固定相位定时器：早到的 tick 什么也不做，错过的周期不补采
//! - 通知：缓冲区非空且 `now - last_notify >= 1 / plot_freq` 时通知所有 sink
//! - 两个计时器都从激活时刻（`start()` 或第一次 `tick()`）开始计
//!
//! # 停止
//!
//! 取消标志每个 tick 检查一次；采样失败立即停止并把错误返回给调用者，
//! 不重连、不重试，停止后不再通知 sink。停止时关闭样本来源。

use crate::buffer::SharedBuffer;
use crate::cancel::CancelFlag;
use crate::clock::{Clock, SystemClock};
use crate::error::{ClientError, ConfigError};
use crate::metrics::SamplerMetrics;
use crate::sink::VisualizationSink;
use crate::source::SampleSource;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// 采样配置
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// 采样频率（Hz）
    pub read_freq: f64,
    /// 可视化通知频率（Hz）
    pub plot_freq: f64,
    /// 缓冲区容量（样本数）
    pub buffer_capacity: usize,
    /// 每次通知时 sink 取的最近样本数
    pub window_len: usize,
    /// `run()` 两次 tick 之间的休眠
    pub tick_interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::with_rates(1000.0, 30.0)
    }
}

impl SamplerConfig {
    /// 以给定频率构造，容量和窗口为 10 秒的数据量
    pub fn with_rates(read_freq: f64, plot_freq: f64) -> Self {
        let ten_seconds = if read_freq.is_finite() && read_freq > 0.0 {
            ((read_freq * 10.0).round() as usize).max(1)
        } else {
            1
        };
        Self {
            read_freq,
            plot_freq,
            buffer_capacity: ten_seconds,
            window_len: ten_seconds,
            tick_interval: Duration::from_micros(100),
        }
    }

    /// 校验：频率为有限正数且周期可表示为 `Duration`，容量和窗口非零
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.read_interval()?;
        self.plot_interval()?;
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.window_len == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(())
    }

    /// 采样周期 `1 / read_freq`
    pub fn read_interval(&self) -> Result<Duration, ConfigError> {
        interval_of("read_freq", self.read_freq)
    }

    /// 通知周期 `1 / plot_freq`
    pub fn plot_interval(&self) -> Result<Duration, ConfigError> {
        interval_of("plot_freq", self.plot_freq)
    }
}

/// 频率换算为周期；非正、非有限或周期超出 `Duration` 范围时报错
fn interval_of(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::InvalidFrequency { name, value });
    }
    Duration::try_from_secs_f64(1.0 / value)
        .map_err(|_| ConfigError::InvalidFrequency { name, value })
}

/// 调度器状态：`Idle → Running → Stopped`，不可逆
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// 单个 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// 本 tick 记录了一个样本
    pub sampled: bool,
    /// 本 tick 通知了 sink
    pub notified: bool,
    /// 调度器已停止（本 tick 观察到取消，或之前已停止）
    pub stopped: bool,
}

impl TickOutcome {
    pub fn is_idle(&self) -> bool {
        !self.sampled && !self.notified && !self.stopped
    }

    fn stopped() -> Self {
        Self {
            stopped: true,
            ..Self::default()
        }
    }
}

/// 一次 `run()` 的汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub samples: u64,
    pub notifications: u64,
    pub elapsed: Duration,
    pub state: SchedulerState,
}

/// 定频采样调度器
pub struct SamplingScheduler<S: SampleSource, C: Clock = SystemClock> {
    source: S,
    clock: C,
    config: SamplerConfig,
    read_interval: Duration,
    plot_interval: Duration,
    buffer: SharedBuffer<S::Sample>,
    sinks: Vec<Box<dyn VisualizationSink<S::Sample>>>,
    cancel: CancelFlag,
    metrics: Arc<SamplerMetrics>,
    state: SchedulerState,
    last_sample: Instant,
    last_notify: Instant,
}

impl<S: SampleSource> SamplingScheduler<S, SystemClock> {
    /// 使用系统时钟创建调度器
    pub fn new(source: S, config: SamplerConfig) -> Result<Self, ConfigError> {
        Self::with_clock(source, SystemClock, config)
    }
}

impl<S: SampleSource, C: Clock> SamplingScheduler<S, C> {
    /// 使用指定时钟创建调度器
    ///
    /// 调度器把自己的取消标志安装到样本来源上，使等待中的交换也能被取消。
    pub fn with_clock(mut source: S, clock: C, config: SamplerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let read_interval = config.read_interval()?;
        let plot_interval = config.plot_interval()?;

        let cancel = CancelFlag::new();
        source.set_cancel_flag(cancel.clone());
        let now = clock.now();

        Ok(Self {
            source,
            clock,
            read_interval,
            plot_interval,
            buffer: SharedBuffer::new(config.buffer_capacity),
            config,
            sinks: Vec::new(),
            cancel,
            metrics: Arc::new(SamplerMetrics::new()),
            state: SchedulerState::Idle,
            last_sample: now,
            last_notify: now,
        })
    }

    /// 注册一个可视化 sink
    pub fn add_sink(&mut self, sink: impl VisualizationSink<S::Sample> + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// 缓冲区句柄（可交给其他线程读取）
    pub fn buffer(&self) -> SharedBuffer<S::Sample> {
        self.buffer.clone()
    }

    /// 取消标志（可交给 Ctrl+C 处理函数或其他线程）
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn metrics(&self) -> Arc<SamplerMetrics> {
        self.metrics.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 拆出样本来源（已停止时来源已关闭；未停止时由来源自身的 `Drop` 负责释放）
    pub fn into_source(self) -> S {
        self.source
    }

    /// 激活：`Idle → Running`，两个计时器从此刻开始计
    ///
    /// 非 `Idle` 状态下调用无效果。
    pub fn start(&mut self) {
        if self.state != SchedulerState::Idle {
            return;
        }
        let now = self.clock.now();
        self.last_sample = now;
        self.last_notify = now;
        self.state = SchedulerState::Running;
        info!(
            "Sampling started: read_freq={} Hz, plot_freq={} Hz, capacity={}",
            self.config.read_freq, self.config.plot_freq, self.config.buffer_capacity
        );
    }

    /// 执行一个调度步
    ///
    /// 采样失败时调度器进入 `Stopped` 并返回错误；之后的 tick 只返回 `stopped`。
    pub fn tick(&mut self) -> Result<TickOutcome, ClientError> {
        match self.state {
            SchedulerState::Stopped => return Ok(TickOutcome::stopped()),
            SchedulerState::Idle => self.start(),
            SchedulerState::Running => {},
        }

        self.metrics.ticks.fetch_add(1, Ordering::Relaxed);

        if self.cancel.is_cancelled() {
            debug!("Cancellation observed, stopping sampler");
            self.stop();
            return Ok(TickOutcome::stopped());
        }

        let mut outcome = TickOutcome::default();

        let now = self.clock.now();
        if now.saturating_duration_since(self.last_sample) >= self.read_interval {
            match self.source.sample() {
                Ok(sample) => {
                    if self.buffer.append(sample).is_some() {
                        self.metrics.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                    self.metrics.samples_recorded.fetch_add(1, Ordering::Relaxed);
                    self.last_sample = self.clock.now();
                    outcome.sampled = true;
                },
                Err(e) => {
                    if e.is_cancelled() {
                        debug!("Sample cancelled, stopping sampler");
                        self.stop();
                        return Ok(TickOutcome::stopped());
                    }
                    self.metrics.sample_errors.fetch_add(1, Ordering::Relaxed);
                    error!("Sampling failed, stopping: {}", e);
                    self.stop();
                    return Err(e);
                },
            }
        }

        let now = self.clock.now();
        if !self.buffer.is_empty()
            && now.saturating_duration_since(self.last_notify) >= self.plot_interval
        {
            for sink in &mut self.sinks {
                sink.on_window_ready(&self.buffer);
            }
            self.last_notify = now;
            self.metrics.notifications.fetch_add(1, Ordering::Relaxed);
            outcome.notified = true;
        }

        if outcome.is_idle() {
            self.metrics.idle_ticks.fetch_add(1, Ordering::Relaxed);
        }
        trace!("Tick: {:?}", outcome);
        Ok(outcome)
    }

    /// 运行直到取消或失败
    pub fn run(&mut self) -> Result<RunSummary, ClientError> {
        self.run_until(None)
    }

    /// 运行直到本次记录满 `n` 个样本、取消或失败
    pub fn run_for_samples(&mut self, n: u64) -> Result<RunSummary, ClientError> {
        self.run_until(Some(n))
    }

    /// 进入 `Stopped` 并关闭样本来源（幂等）
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Stopped {
            return;
        }
        self.state = SchedulerState::Stopped;
        self.source.close();
        let snapshot = self.metrics.snapshot();
        info!(
            "Sampling stopped: {} samples, {} notifications",
            snapshot.samples_recorded, snapshot.notifications
        );
    }

    fn run_until(&mut self, limit: Option<u64>) -> Result<RunSummary, ClientError> {
        let started = self.clock.now();
        let base = self.metrics.snapshot();

        self.start();
        loop {
            let outcome = self.tick()?;
            if outcome.stopped {
                break;
            }

            let recorded = self.metrics.snapshot().samples_recorded - base.samples_recorded;
            if limit.is_some_and(|n| recorded >= n) {
                self.stop();
                break;
            }

            if outcome.is_idle() {
                spin_sleep::sleep(self.config.tick_interval);
            }
        }

        let end = self.metrics.snapshot();
        Ok(RunSummary {
            samples: end.samples_recorded - base.samples_recorded,
            notifications: end.notifications - base.notifications,
            elapsed: self.clock.now().saturating_duration_since(started),
            state: self.state,
        })
    }
}
