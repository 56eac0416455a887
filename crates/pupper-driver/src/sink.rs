//! 可视化通知
//!
//! 调度器按 `plot_freq` 节奏调用 [`VisualizationSink::on_window_ready`]，
//! sink 在采样线程内执行，必须快速返回：
//!
//! - [`ChannelSink`]: 复制最近窗口并 `try_send` 到有界通道，通道满时丢弃并计数
//! - [`FnSink`]: 直接调用闭包（适合打印、轻量统计）

use crate::buffer::SharedBuffer;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, warn};

/// 可视化回调
pub trait VisualizationSink<S>: Send {
    fn on_window_ready(&mut self, buffer: &SharedBuffer<S>);
}

impl<S, K: VisualizationSink<S> + ?Sized> VisualizationSink<S> for Box<K> {
    fn on_window_ready(&mut self, buffer: &SharedBuffer<S>) {
        (**self).on_window_ready(buffer)
    }
}

/// 闭包 sink
pub struct FnSink<F> {
    f: F,
}

impl<F> FnSink<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<S, F> VisualizationSink<S> for FnSink<F>
where
    F: FnMut(&SharedBuffer<S>) + Send,
{
    fn on_window_ready(&mut self, buffer: &SharedBuffer<S>) {
        (self.f)(buffer)
    }
}

/// 把窗口快照转发到有界通道的 sink
///
/// 消费端（绘图线程）处理不过来时丢弃新窗口，不阻塞采样线程。
pub struct ChannelSink<S> {
    tx: Sender<Vec<S>>,
    window_len: usize,
    dropped: Arc<AtomicU64>,
    disconnected: bool,
}

impl<S: Clone + Send> ChannelSink<S> {
    /// 创建 sink 及其接收端
    ///
    /// `window_len` 为每次转发的最近样本数，`queue_size` 为通道容量。
    pub fn new(window_len: usize, queue_size: usize) -> (Self, Receiver<Vec<S>>) {
        let (tx, rx) = bounded(queue_size);
        (
            Self {
                tx,
                window_len,
                dropped: Arc::new(AtomicU64::new(0)),
                disconnected: false,
            },
            rx,
        )
    }

    /// 被丢弃窗口数的共享计数器
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }
}

impl<S: Clone + Send> VisualizationSink<S> for ChannelSink<S> {
    fn on_window_ready(&mut self, buffer: &SharedBuffer<S>) {
        if self.disconnected {
            return;
        }

        let window = buffer.recent_window(self.window_len);
        match self.tx.try_send(window) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    warn!("Visualization queue full, {} windows dropped so far", dropped);
                }
            },
            Err(TrySendError::Disconnected(_)) => {
                error!("Visualization receiver dropped, sink disabled");
                self.disconnected = true;
            },
        }
    }
}
