//! 有界时间序列缓冲区
//!
//! # 设计
//!
//! - **FIFO 淘汰**：满时追加只淘汰最旧的一个元素
//! - **时间有序**：插入顺序即时间顺序，不排序
//! - **环形结构**：基于 `VecDeque`，追加 O(1)
//!
//! [`SharedBuffer`] 是跨线程句柄：采样线程独占写入，可视化侧通过读锁
//! 取窗口快照，读写互斥由 `parking_lot::RwLock` 保证。

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// 构造时最多预分配的元素数，超出部分随追加增长
const PREALLOCATE_LIMIT: usize = 16 * 1024;

/// 有界时间序列缓冲区
#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> TimeSeriesBuffer<T> {
    /// 创建容量为 `capacity` 的缓冲区
    ///
    /// # Panics
    ///
    /// `capacity == 0` 时 panic。
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "TimeSeriesBuffer capacity must be non-zero");
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
        }
    }

    /// 追加一个元素；已满时先淘汰最旧的元素并返回它
    pub fn append(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// 最近 `min(n, len)` 个元素（旧 → 新）
    pub fn recent(&self, n: usize) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        let skip = self.items.len().saturating_sub(n);
        self.items.range(skip..)
    }

    /// 最近 `min(n, len)` 个元素的副本（旧 → 新），不修改缓冲区
    pub fn recent_window(&self, n: usize) -> Vec<T>
    where
        T: Clone,
    {
        self.recent(n).cloned().collect()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// 跨线程共享的缓冲区句柄
#[derive(Debug)]
pub struct SharedBuffer<T> {
    inner: Arc<RwLock<TimeSeriesBuffer<T>>>,
}

impl<T> Clone for SharedBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> SharedBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TimeSeriesBuffer::new(capacity))),
        }
    }

    /// 追加（写锁），返回被淘汰的元素
    pub fn append(&self, item: T) -> Option<T> {
        self.inner.write().append(item)
    }

    /// 最近窗口的快照（读锁）
    pub fn recent_window(&self, n: usize) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.read().recent_window(n)
    }

    pub fn latest(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.read().latest().cloned()
    }

    /// 在读锁下访问缓冲区，避免复制整个窗口
    pub fn with_read<R>(&self, f: impl FnOnce(&TimeSeriesBuffer<T>) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn test_append_evicts_single_oldest() {
        let mut buffer = TimeSeriesBuffer::new(3);
        assert_eq!(buffer.append(1), None);
        assert_eq!(buffer.append(2), None);
        assert_eq!(buffer.append(3), None);
        assert!(buffer.is_full());
        assert_eq!(buffer.append(4), Some(1));
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(buffer.oldest(), Some(&2));
        assert_eq!(buffer.latest(), Some(&4));
    }

    #[test]
    fn test_recent_window() {
        let mut buffer = TimeSeriesBuffer::new(5);
        for i in 0..4 {
            buffer.append(i);
        }
        assert_eq!(buffer.recent_window(2), vec![2, 3]);
        assert_eq!(buffer.recent_window(10), vec![0, 1, 2, 3]);
        assert!(buffer.recent_window(0).is_empty());
        // 读取不改变缓冲区
        assert_eq!(buffer.len(), 4);
    }

    /// 容量超过预分配上限时仍按容量淘汰
    #[test]
    fn test_capacity_beyond_preallocation() {
        let capacity = PREALLOCATE_LIMIT + 1;
        let mut buffer = TimeSeriesBuffer::new(capacity);
        for i in 0..capacity {
            assert_eq!(buffer.append(i), None);
        }
        assert!(buffer.is_full());
        assert_eq!(buffer.append(capacity), Some(0));
        assert_eq!(buffer.len(), capacity);

        let mut huge = TimeSeriesBuffer::new(usize::MAX);
        assert_eq!(huge.append(1u8), None);
        assert_eq!(huge.recent_window(usize::MAX), vec![1]);
    }

    #[test]
    fn test_recent_window_empty() {
        let buffer: TimeSeriesBuffer<u32> = TimeSeriesBuffer::new(2);
        assert!(buffer.recent_window(5).is_empty());
        assert_eq!(buffer.latest(), None);
    }

    #[test]
    #[should_panic(expected = "capacity must be non-zero")]
    fn test_zero_capacity_panics() {
        let _ = TimeSeriesBuffer::<u8>::new(0);
    }

    #[test]
    fn test_shared_buffer_concurrent_reader() {
        let shared = SharedBuffer::new(100);
        let reader = shared.clone();

        let handle = thread::spawn(move || {
            for _ in 0..200 {
                let window = reader.recent_window(50);
                // 窗口内始终保持插入顺序
                assert!(window.windows(2).all(|w| w[0] < w[1]));
                assert!(window.len() <= 50);
            }
        });

        for i in 0..1000u32 {
            shared.append(i);
        }
        handle.join().unwrap();

        assert_eq!(shared.len(), 100);
        assert_eq!(shared.latest(), Some(999));
        assert_eq!(shared.with_read(|b| b.oldest().copied()), Some(900));
    }

    proptest! {
        /// 容量 k、追加 k + m 个元素后，恰好保留最后 k 个且顺序不变
        #[test]
        fn prop_keeps_last_k_in_order(k in 1usize..64, m in 0usize..200) {
            let mut buffer = TimeSeriesBuffer::new(k);
            for i in 0..(k + m) {
                buffer.append(i);
            }
            prop_assert_eq!(buffer.len(), k);
            let expected: Vec<usize> = (m..k + m).collect();
            prop_assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), expected);
        }

        #[test]
        fn prop_len_never_exceeds_capacity(k in 1usize..32, n in 0usize..100) {
            let mut buffer = TimeSeriesBuffer::new(k);
            for i in 0..n {
                buffer.append(i);
                prop_assert!(buffer.len() <= k);
            }
        }
    }
}
