//! # Pupper Transport Layer
//!
//! 面向消息的本地套接字抽象。
//!
//! 控制器端点是一个 `SOCK_SEQPACKET` Unix 套接字：每次 `send` 恰好对应对端一次
//! `recv`，消息边界由内核保留，因此这一层不做任何分隔符分帧。

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod seqpacket;

#[cfg(target_os = "linux")]
pub use seqpacket::SeqPacketTransport;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockHandle, MockReply, MockTransport};

/// 传输层错误
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Read timeout")]
    Timeout,
    /// 对端已关闭连接（读到 0 字节）
    #[error("Connection closed by peer")]
    Closed,
    #[error("Short write: sent {sent} of {expected} bytes")]
    ShortWrite { expected: usize, sent: usize },
}

/// 建立连接失败
///
/// 携带端点路径和底层系统错误文本。不做任何隐式重试。
#[derive(Error, Debug)]
#[error("Cannot connect to {}: {source}", endpoint.display())]
pub struct ConnectionError {
    pub endpoint: PathBuf,
    #[source]
    pub source: io::Error,
}

impl ConnectionError {
    pub fn new(endpoint: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// 底层错误类别（NotFound / ConnectionRefused 等）
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

/// 面向消息的可靠传输
///
/// 实现必须保证：一次 `send` 对应对端收到的一条完整消息，一次 `receive`
/// 只返回下一条消息（最多 `buf.len()` 字节）。
pub trait MessageTransport {
    /// 发送一条完整消息
    fn send(&mut self, message: &[u8]) -> Result<(), TransportError>;

    /// 接收下一条消息，最多等待 `timeout`（`None` 表示无限等待）
    ///
    /// 返回写入 `buf` 的字节数。超时返回 `TransportError::Timeout`，
    /// 对端关闭返回 `TransportError::Closed`。
    fn receive_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError>;

    /// 阻塞接收下一条消息
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.receive_timeout(buf, None)
    }

    /// 主动关闭连接（幂等）
    fn shutdown(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: MessageTransport + ?Sized> MessageTransport for Box<T> {
    fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        (**self).send(message)
    }

    fn receive_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError> {
        (**self).receive_timeout(buf, timeout)
    }

    fn shutdown(&mut self) -> Result<(), TransportError> {
        (**self).shutdown()
    }
}
