//! 协作式取消标志

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 共享取消标志
///
/// 调度器每个 tick 检查一次；客户端在等待应答的每个 poll 间隙检查一次。
/// 不会抢占正在进行的系统调用。
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消（可从任意线程、信号处理函数中调用）
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }
}
