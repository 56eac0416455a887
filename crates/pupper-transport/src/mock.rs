//! Mock 传输（脚本化应答）
//!
//! 测试用：按顺序弹出预先排好的应答，并记录所有已发送的请求。
//! 应答队列为空时表现为一个不回应的端点（短暂休眠后返回 `Timeout`），
//! 即使调用方要求无限等待也不会真正阻塞。

use crate::{MessageTransport, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// 空队列时单次等待的上限
const SILENT_WAIT_CAP: Duration = Duration::from_millis(2);

/// 一次脚本化的接收结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// 返回一条消息
    Message(Vec<u8>),
    /// 本次接收超时
    Timeout,
    /// 对端关闭
    Hangup,
    /// IO 错误
    IoError(io::ErrorKind),
}

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    sent: Vec<Vec<u8>>,
    receive_calls: usize,
    shutdown_calls: usize,
    fail_send: Option<io::ErrorKind>,
}

/// 测试侧句柄：排队应答、检查已发送请求
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    pub fn push_reply(&self, reply: MockReply) {
        self.state.lock().replies.push_back(reply);
    }

    pub fn push_message(&self, message: impl Into<Vec<u8>>) {
        self.push_reply(MockReply::Message(message.into()));
    }

    /// 之后的 `send` 都以给定错误失败
    pub fn fail_sends(&self, kind: io::ErrorKind) {
        self.state.lock().fail_send = Some(kind);
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    pub fn pending_replies(&self) -> usize {
        self.state.lock().replies.len()
    }

    pub fn receive_calls(&self) -> usize {
        self.state.lock().receive_calls
    }

    pub fn shutdown_calls(&self) -> usize {
        self.state.lock().shutdown_calls
    }
}

/// Mock 传输
#[derive(Debug)]
pub struct MockTransport {
    handle: MockHandle,
    open: bool,
}

impl MockTransport {
    /// 创建 mock 传输及其测试句柄
    pub fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        (
            Self {
                handle: handle.clone(),
                open: true,
            },
            handle,
        )
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn not_connected() -> TransportError {
        TransportError::Io(io::Error::from(io::ErrorKind::NotConnected))
    }
}

impl MessageTransport for MockTransport {
    fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(Self::not_connected());
        }
        let mut state = self.handle.state.lock();
        if let Some(kind) = state.fail_send {
            return Err(TransportError::Io(io::Error::from(kind)));
        }
        state.sent.push(message.to_vec());
        Ok(())
    }

    fn receive_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError> {
        if !self.open {
            return Err(Self::not_connected());
        }

        let next = {
            let mut state = self.handle.state.lock();
            state.receive_calls += 1;
            state.replies.pop_front()
        };

        match next {
            Some(MockReply::Message(message)) => {
                // 与 SEQPACKET 一致：超出缓冲区的部分被丢弃
                let n = message.len().min(buf.len());
                buf[..n].copy_from_slice(&message[..n]);
                if n == 0 {
                    return Err(TransportError::Closed);
                }
                Ok(n)
            },
            Some(MockReply::Timeout) => Err(TransportError::Timeout),
            Some(MockReply::Hangup) => Err(TransportError::Closed),
            Some(MockReply::IoError(kind)) => Err(TransportError::Io(io::Error::from(kind))),
            None => {
                let wait = timeout.unwrap_or(SILENT_WAIT_CAP).min(SILENT_WAIT_CAP);
                std::thread::sleep(wait);
                Err(TransportError::Timeout)
            },
        }
    }

    fn shutdown(&mut self) -> Result<(), TransportError> {
        if self.open {
            self.open = false;
            self.handle.state.lock().shutdown_calls += 1;
        }
        Ok(())
    }
}
